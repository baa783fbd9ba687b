//! RTM 事件监听器与事件总线
//!
//! 传输层事件统一转换为 [`RtmEvent`]，通过 [`EventBus`] 分发给所有订阅者。
//! 任意组件都可以随时订阅和退订，不再依赖单一的可变 delegate。

use crate::rtm::message::RtmMessage;
use crate::rtm::types::{ConnectionChangeReason, ConnectionState, Member, UserId};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// RTM 事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RtmEvent {
    /// 连接状态变化
    ConnectionStateChanged {
        state: ConnectionState,
        reason: ConnectionChangeReason,
    },
    /// 有成员加入频道
    MemberJoined(Member),
    /// 有成员离开频道
    MemberLeft(Member),
    /// 收到消息；`channel_id` 为 `None` 时为单聊消息
    MessageReceived {
        #[serde(rename = "channelID")]
        channel_id: Option<String>,
        from: UserId,
        message: RtmMessage,
    },
}

/// RTM 事件监听器
#[async_trait]
pub trait RtmEventListener: Send + Sync {
    async fn on_event(&self, event: RtmEvent);
}

/// 空的事件监听器实现
pub struct EmptyRtmEventListener;

#[async_trait]
impl RtmEventListener for EmptyRtmEventListener {
    async fn on_event(&self, _event: RtmEvent) {}
}

/// 订阅 ID，用于退订
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// 事件总线
///
/// 按订阅顺序依次通知监听器；分发时不持有锁，监听器内可以再订阅或退订。
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<SubscriptionId, Arc<dyn RtmEventListener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SubscriptionId, Arc<dyn RtmEventListener>>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 订阅事件
    pub fn subscribe(&self, listener: Arc<dyn RtmEventListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, listener);
        debug!("[EventBus] ➕ 新增订阅: {:?}", id);
        id
    }

    /// 退订；返回该订阅是否存在
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!("[EventBus] ➖ 退订: {:?}", id);
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    /// 分发事件给当前全部订阅者
    pub async fn publish(&self, event: RtmEvent) {
        let listeners: Vec<Arc<dyn RtmEventListener>> = self.lock().values().cloned().collect();
        debug!(
            "[EventBus] 📣 分发事件: {:?}, listeners={}",
            event,
            listeners.len()
        );
        for listener in listeners {
            listener.on_event(event.clone()).await;
        }
    }
}
