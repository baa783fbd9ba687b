//! 聊天界面的消息列表
//!
//! 只保留最近的 [`CHAT_LOG_CAPACITY`] 条，超出时丢弃最旧的。

use crate::rtm::types::UserId;
use std::collections::VecDeque;

pub const CHAT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub user_id: UserId,
    pub text: String,
}

/// 消息显示在哪一侧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSide {
    /// 自己发出的消息（右侧）
    Outgoing,
    /// 别人发来的消息（左侧）
    Incoming,
}

#[derive(Debug)]
pub struct ChatLog {
    current_user: UserId,
    capacity: usize,
    entries: VecDeque<ChatEntry>,
}

impl ChatLog {
    pub fn new(current_user: impl Into<UserId>) -> Self {
        Self::with_capacity(current_user, CHAT_LOG_CAPACITY)
    }

    pub fn with_capacity(current_user: impl Into<UserId>, capacity: usize) -> Self {
        Self {
            current_user: current_user.into(),
            capacity,
            entries: VecDeque::with_capacity(capacity.min(CHAT_LOG_CAPACITY)),
        }
    }

    pub fn append(&mut self, user_id: impl Into<UserId>, text: impl Into<String>) {
        self.entries.push_back(ChatEntry {
            user_id: user_id.into(),
            text: text.into(),
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn side(&self, entry: &ChatEntry) -> MessageSide {
        if entry.user_id == self.current_user {
            MessageSide::Outgoing
        } else {
            MessageSide::Incoming
        }
    }
}
