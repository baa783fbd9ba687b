//! 消息模型定义

use crate::rtm::serialization::{generate_msg_id, now_millis};
use crate::rtm::types::UserId;
use serde::{Deserialize, Serialize};

/// RTM 消息
///
/// 对离线存储而言，除 `is_offline_message` 外的字段都是透传的负载。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtmMessage {
    #[serde(rename = "messageID")]
    pub message_id: String,
    #[serde(rename = "senderID")]
    pub sender_id: UserId,
    pub text: String,
    /// 毫秒时间戳
    pub timestamp: i64,
    /// 由传输层设置：对端离线期间暂存、登录后才投递的消息
    #[serde(rename = "isOfflineMessage")]
    pub is_offline_message: bool,
}

impl RtmMessage {
    /// 创建一条在线消息
    pub fn new(sender_id: impl Into<UserId>, text: impl Into<String>) -> Self {
        Self {
            message_id: generate_msg_id(),
            sender_id: sender_id.into(),
            text: text.into(),
            timestamp: now_millis(),
            is_offline_message: false,
        }
    }

    /// 标记为离线消息
    pub fn into_offline(mut self) -> Self {
        self.is_offline_message = true;
        self
    }
}
