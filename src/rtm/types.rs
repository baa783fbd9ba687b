use serde::{Deserialize, Serialize};

/// 用户 ID（对端用户或当前登录用户）
pub type UserId = String;

/// 登录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginStatus {
    Online,
    #[default]
    Offline,
}

/// 单聊消息发送方式
///
/// `Offline` 表示发送时开启离线消息：对端不在线时由服务商暂存，待对端登录后投递。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OneToOneMessageType {
    #[default]
    Normal,
    Offline,
}

impl OneToOneMessageType {
    pub fn enable_offline(self) -> bool {
        matches!(self, OneToOneMessageType::Offline)
    }
}

/// SDK 与服务商之间的连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Aborted,
}

impl ConnectionState {
    /// 该连接状态对应的登录状态；连接中、重连中不改变登录状态
    pub fn login_status(self) -> Option<LoginStatus> {
        match self {
            ConnectionState::Connected => Some(LoginStatus::Online),
            ConnectionState::Disconnected | ConnectionState::Aborted => Some(LoginStatus::Offline),
            ConnectionState::Connecting | ConnectionState::Reconnecting => None,
        }
    }
}

/// 连接状态变化原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionChangeReason {
    Login,
    LoginSuccess,
    LoginFailure,
    LoginTimeout,
    Interrupted,
    Logout,
    BannedByServer,
    /// 同一账号在其他地方登录
    RemoteLogin,
}

/// 频道成员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    #[serde(rename = "channelID")]
    pub channel_id: String,
}

impl Member {
    pub fn new(user_id: impl Into<UserId>, channel_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            channel_id: channel_id.into(),
        }
    }
}
