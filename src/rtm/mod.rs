pub mod chat_log;
pub mod client;
pub mod error;
pub mod listener;
pub mod message;
pub mod serialization;
pub mod transport;
pub mod types;

// 重新导出常用类型
pub use client::{ClientConfig, RtmClient};
pub use error::{RtmError, RtmResult};
pub use listener::{EmptyRtmEventListener, EventBus, RtmEvent, RtmEventListener, SubscriptionId};
