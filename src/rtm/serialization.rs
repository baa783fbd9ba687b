use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// 生成消息 ID
pub fn generate_msg_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 当前毫秒时间戳
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 序列化为 JSON 字符串，失败时记录日志并返回空对象
pub fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        warn!("[Serialization] ⚠️ JSON 序列化失败: {}", e);
        "{}".to_string()
    })
}
