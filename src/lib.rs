pub mod rtm;

// 重新导出常用类型，方便外部使用
pub use rtm::{
    chat_log::ChatLog,
    client::{ClientConfig, RtmClient},
    error::{RtmError, RtmResult},
    listener::{RtmEvent, RtmEventListener},
    message::{OfflineMessageStore, OfflineStoreConfig, RtmMessage},
    transport::{LoopbackHub, RtmTransport},
};
