//! 传输层接口
//!
//! 实时传输、连接握手、在线状态与频道扇出都由服务商 SDK 负责，本 crate 只通过
//! [`RtmTransport`] 调用它，并消费它推送的 [`TransportEvent`]。

pub mod loopback;

use crate::rtm::error::RtmResult;
use crate::rtm::message::RtmMessage;
use crate::rtm::types::{ConnectionChangeReason, ConnectionState, Member, UserId};
use async_trait::async_trait;
use tokio::sync::mpsc;

pub use loopback::{LoopbackHub, LoopbackTransport};

/// 传输层推送的原始事件
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    ConnectionStateChanged {
        state: ConnectionState,
        reason: ConnectionChangeReason,
    },
    MemberJoined(Member),
    MemberLeft(Member),
    /// 频道消息
    ChannelMessage {
        channel_id: String,
        from: UserId,
        message: RtmMessage,
    },
    /// 单聊消息；`message.is_offline_message` 标识是否为离线期间暂存的消息
    PeerMessage { from: UserId, message: RtmMessage },
}

/// 登录后获得的事件流，登出或被踢后关闭
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// 服务商传输层
#[async_trait]
pub trait RtmTransport: Send + Sync {
    /// 登录，返回本次登录会话的事件流
    async fn login(&self, user_id: &str, token: Option<&str>) -> RtmResult<TransportEvents>;

    /// 登出
    async fn logout(&self) -> RtmResult<()>;

    async fn join_channel(&self, channel_id: &str) -> RtmResult<()>;

    async fn leave_channel(&self, channel_id: &str) -> RtmResult<()>;

    async fn send_channel_message(&self, channel_id: &str, message: RtmMessage) -> RtmResult<()>;

    /// 发送单聊消息；`enable_offline` 为 true 时对端离线也会暂存并在其登录后投递
    async fn send_peer_message(
        &self,
        peer_id: &str,
        message: RtmMessage,
        enable_offline: bool,
    ) -> RtmResult<()>;
}
