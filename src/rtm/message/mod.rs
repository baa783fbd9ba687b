//! 消息模块
//!
//! 消息模型与离线消息存储

pub mod models;
pub mod offline_store;

// 重新导出主要类型
pub use models::RtmMessage;
pub use offline_store::{OfflineMessageStore, OfflineStoreConfig};
