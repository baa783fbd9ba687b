//! 离线消息存储
//!
//! 按用户 ID 缓存无法实时投递的消息，待对端可达后一次性取出。
//! 只有 `is_offline_message == true` 的消息才会入队；同一用户下保持插入顺序，不去重。

use crate::rtm::message::models::RtmMessage;
use crate::rtm::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 离线存储容量策略
///
/// 两项都为 `None` 时不做任何限制。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineStoreConfig {
    /// 每个用户最多缓存的消息数，超出时淘汰最旧的
    #[serde(default)]
    pub max_per_recipient: Option<usize>,
    /// 消息最长缓存时间（秒），过期消息在下次访问时清理
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl OfflineStoreConfig {
    fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

struct Entry {
    message: RtmMessage,
    recorded_at: Instant,
}

/// 离线消息存储（进程内，线程安全）
pub struct OfflineMessageStore {
    pending: Mutex<HashMap<UserId, VecDeque<Entry>>>,
    max_per_recipient: Option<usize>,
    ttl: Option<Duration>,
}

impl Default for OfflineMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineMessageStore {
    /// 创建不限容量的存储
    pub fn new() -> Self {
        Self::with_config(&OfflineStoreConfig::default())
    }

    pub fn with_config(config: &OfflineStoreConfig) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            max_per_recipient: config.max_per_recipient,
            ttl: config.ttl(),
        }
    }

    /// 直接指定 TTL（测试中需要亚秒级过期）
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    // 所有操作都不会在持锁期间 panic，中毒时直接取回内部数据
    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, VecDeque<Entry>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 记录一条离线消息
    ///
    /// 非离线消息直接丢弃（调用方应已实时投递）。
    pub fn record(&self, message: RtmMessage, recipient: &str) {
        if !message.is_offline_message {
            debug!(
                "[OfflineStore] 忽略在线消息: recipient={}, msg_id={}",
                recipient, message.message_id
            );
            return;
        }

        let now = Instant::now();
        let mut pending = self.lock();
        let queue = pending.entry(recipient.to_string()).or_default();
        self.purge_expired(queue, now);

        debug!(
            "[OfflineStore] 📥 缓存离线消息: recipient={}, msg_id={}",
            recipient, message.message_id
        );
        queue.push_back(Entry {
            message,
            recorded_at: now,
        });

        if let Some(max) = self.max_per_recipient {
            let mut evicted = 0usize;
            while queue.len() > max {
                queue.pop_front();
                evicted += 1;
            }
            if evicted > 0 {
                info!(
                    "[OfflineStore] 🗑️ 超出容量淘汰最旧消息: recipient={}, evicted={}, max={}",
                    recipient, evicted, max
                );
            }
        }

        // max_per_recipient == Some(0) 时队列可能为空
        if queue.is_empty() {
            pending.remove(recipient);
        }
    }

    /// 查看某用户的离线消息（不移除），无缓存时返回空列表
    pub fn drain(&self, recipient: &str) -> Vec<RtmMessage> {
        let now = Instant::now();
        let mut pending = self.lock();
        let Some(queue) = pending.get_mut(recipient) else {
            return Vec::new();
        };
        self.purge_expired(queue, now);
        if queue.is_empty() {
            pending.remove(recipient);
            return Vec::new();
        }
        queue.iter().map(|e| e.message.clone()).collect()
    }

    /// 清空某用户的离线消息（幂等）
    pub fn clear(&self, recipient: &str) {
        if let Some(queue) = self.lock().remove(recipient) {
            debug!(
                "[OfflineStore] 清空离线消息: recipient={}, count={}",
                recipient,
                queue.len()
            );
        }
    }

    /// 原子地取出并移除某用户的全部离线消息
    ///
    /// 与 `drain` + `clear` 不同，取出与移除在同一临界区内完成，并发的 `record`
    /// 要么出现在本次结果中，要么留给下一次。
    pub fn take_all(&self, recipient: &str) -> Vec<RtmMessage> {
        let now = Instant::now();
        let Some(queue) = self.lock().remove(recipient) else {
            return Vec::new();
        };
        let ttl = self.ttl;
        let messages: Vec<RtmMessage> = queue
            .into_iter()
            .filter(|e| !Self::is_expired(ttl, e, now))
            .map(|e| e.message)
            .collect();
        info!(
            "[OfflineStore] 📤 取出离线消息: recipient={}, count={}",
            recipient,
            messages.len()
        );
        messages
    }

    /// 某用户当前缓存的消息数
    pub fn pending_count(&self, recipient: &str) -> usize {
        let now = Instant::now();
        let mut pending = self.lock();
        let Some(queue) = pending.get_mut(recipient) else {
            return 0;
        };
        self.purge_expired(queue, now);
        let count = queue.len();
        if count == 0 {
            pending.remove(recipient);
        }
        count
    }

    /// 当前有缓存消息的用户列表（按 ID 排序）
    pub fn recipients(&self) -> Vec<UserId> {
        let now = Instant::now();
        let mut pending = self.lock();
        for queue in pending.values_mut() {
            self.purge_expired(queue, now);
        }
        pending.retain(|_, q| !q.is_empty());
        let mut ids: Vec<UserId> = pending.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.recipients().is_empty()
    }

    fn is_expired(ttl: Option<Duration>, entry: &Entry, now: Instant) -> bool {
        match ttl {
            Some(ttl) => now.saturating_duration_since(entry.recorded_at) >= ttl,
            None => false,
        }
    }

    // 队列按插入时间有序，过期的只可能在队首
    fn purge_expired(&self, queue: &mut VecDeque<Entry>, now: Instant) {
        while let Some(front) = queue.front() {
            if Self::is_expired(self.ttl, front, now) {
                queue.pop_front();
            } else {
                break;
            }
        }
    }
}
