//! RTM 会话错误类型
//!
//! 离线消息存储本身不会失败；这里的错误全部来自服务商（传输层）或调用方用法。

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtmError {
    /// 尚未登录
    #[error("尚未登录")]
    NotLoggedIn,

    /// 重复登录
    #[error("用户 {0} 已登录")]
    AlreadyLoggedIn(String),

    /// 登录失败（服务商返回的错误码）
    #[error("登录失败，错误码: {code}")]
    LoginFailed { code: i32 },

    /// 未加入频道
    #[error("未加入频道: {0}")]
    ChannelNotJoined(String),

    /// 加入频道失败
    #[error("加入频道 {channel_id} 失败，错误码: {code}")]
    JoinChannelFailed { channel_id: String, code: i32 },

    /// 对端不在线且未开启离线消息
    #[error("对端不可达: {0}")]
    PeerUnreachable(String),

    /// 消息发送失败
    #[error("消息发送失败，错误码: {code}")]
    SendFailed { code: i32 },

    /// 空消息
    #[error("消息内容为空")]
    EmptyMessage,

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

pub type RtmResult<T> = Result<T, RtmError>;
