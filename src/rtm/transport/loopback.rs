//! 进程内回环传输
//!
//! 用一个共享的 [`LoopbackHub`] 模拟服务商：多个 [`LoopbackTransport`] 登录到同一个
//! hub 后可以互发单聊消息、加入同一频道聊天。只用于测试和 CLI 演示，不涉及网络。

use crate::rtm::error::{RtmError, RtmResult};
use crate::rtm::message::RtmMessage;
use crate::rtm::transport::{RtmTransport, TransportEvent, TransportEvents};
use crate::rtm::types::{ConnectionChangeReason, ConnectionState, Member, UserId};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 参数非法（对应服务商登录错误码）
const LOGIN_ERR_INVALID_ARGUMENT: i32 = 3;
/// 频道 ID 非法（对应服务商加入频道错误码）
const JOIN_CHANNEL_ERR_INVALID_ARGUMENT: i32 = 2;
/// 消息过长（对应服务商发送消息错误码）
const SEND_MESSAGE_ERR_TOO_LONG: i32 = 5;

/// 频道 ID 最大长度（字节）
pub const MAX_CHANNEL_ID_BYTES: usize = 64;
/// 单条消息最大长度（字节）
pub const MAX_MESSAGE_BYTES: usize = 32 * 1024;

struct Session {
    id: u64,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

#[derive(Default)]
struct HubState {
    next_session_id: u64,
    sessions: HashMap<UserId, Session>,
    channels: HashMap<String, BTreeSet<UserId>>,
    /// 服务端暂存的离线单聊消息
    offline: HashMap<UserId, Vec<RtmMessage>>,
}

impl HubState {
    fn emit(&self, user_id: &str, event: TransportEvent) {
        if let Some(session) = self.sessions.get(user_id) {
            // 接收端已关闭时直接丢弃
            let _ = session.tx.send(event);
        }
    }

    fn is_current(&self, user_id: &str, session_id: u64) -> bool {
        self.sessions
            .get(user_id)
            .is_some_and(|s| s.id == session_id)
    }

    fn is_member(&self, channel_id: &str, user_id: &str) -> bool {
        self.channels
            .get(channel_id)
            .is_some_and(|members| members.contains(user_id))
    }

    fn notify_members(&self, channel_id: &str, except: &str, event: TransportEvent) {
        if let Some(members) = self.channels.get(channel_id) {
            for member in members.iter().filter(|m| m.as_str() != except) {
                self.emit(member, event.clone());
            }
        }
    }

    /// 将用户移出所有频道并通知其他成员
    fn leave_all_channels(&mut self, user_id: &str) {
        let joined: Vec<String> = self
            .channels
            .iter()
            .filter(|(_, members)| members.contains(user_id))
            .map(|(id, _)| id.clone())
            .collect();
        for channel_id in joined {
            if let Some(members) = self.channels.get_mut(&channel_id) {
                members.remove(user_id);
                if members.is_empty() {
                    self.channels.remove(&channel_id);
                }
            }
            self.notify_members(
                &channel_id,
                user_id,
                TransportEvent::MemberLeft(Member::new(user_id, channel_id.as_str())),
            );
        }
    }
}

/// 模拟的服务商
#[derive(Default)]
pub struct LoopbackHub {
    state: Mutex<HubState>,
}

impl LoopbackHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 为某个客户端创建一个传输实例
    pub fn transport(self: &Arc<Self>) -> LoopbackTransport {
        LoopbackTransport {
            hub: self.clone(),
            login: Mutex::new(None),
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.lock().sessions.contains_key(user_id)
    }

    /// 频道当前成员（按 ID 排序）
    pub fn channel_members(&self, channel_id: &str) -> Vec<UserId> {
        self.lock()
            .channels
            .get(channel_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 服务端为某用户暂存的离线消息数
    pub fn queued_offline_count(&self, user_id: &str) -> usize {
        self.lock().offline.get(user_id).map_or(0, Vec::len)
    }
}

/// 绑定到 [`LoopbackHub`] 的传输实例，对应一个客户端
pub struct LoopbackTransport {
    hub: Arc<LoopbackHub>,
    login: Mutex<Option<(UserId, u64)>>,
}

impl LoopbackTransport {
    fn current(&self) -> Option<(UserId, u64)> {
        self.login.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_current(&self, value: Option<(UserId, u64)>) {
        *self.login.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }
}

fn check_channel_id(channel_id: &str) -> RtmResult<()> {
    if channel_id.trim().is_empty() || channel_id.len() > MAX_CHANNEL_ID_BYTES {
        return Err(RtmError::JoinChannelFailed {
            channel_id: channel_id.to_string(),
            code: JOIN_CHANNEL_ERR_INVALID_ARGUMENT,
        });
    }
    Ok(())
}

fn check_message_size(message: &RtmMessage) -> RtmResult<()> {
    if message.text.len() > MAX_MESSAGE_BYTES {
        return Err(RtmError::SendFailed {
            code: SEND_MESSAGE_ERR_TOO_LONG,
        });
    }
    Ok(())
}

impl LoopbackTransport {
    /// 校验当前登录会话仍然有效（可能已被异地登录顶掉）
    fn require_login(&self, state: &HubState) -> RtmResult<UserId> {
        match self.current() {
            Some((user_id, session_id)) if state.is_current(&user_id, session_id) => Ok(user_id),
            _ => Err(RtmError::NotLoggedIn),
        }
    }
}

#[async_trait]
impl RtmTransport for LoopbackTransport {
    async fn login(&self, user_id: &str, _token: Option<&str>) -> RtmResult<TransportEvents> {
        if user_id.trim().is_empty() {
            return Err(RtmError::LoginFailed {
                code: LOGIN_ERR_INVALID_ARGUMENT,
            });
        }

        let mut state = self.hub.lock();
        if let Ok(current) = self.require_login(&state) {
            return Err(RtmError::AlreadyLoggedIn(current));
        }

        // 同一账号已在其他客户端登录：顶掉旧会话
        if let Some(old) = state.sessions.remove(user_id) {
            warn!("[Loopback] ⚠️ 用户 {} 异地登录，旧会话被踢下线", user_id);
            let _ = old.tx.send(TransportEvent::ConnectionStateChanged {
                state: ConnectionState::Aborted,
                reason: ConnectionChangeReason::RemoteLogin,
            });
            state.leave_all_channels(user_id);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.next_session_id += 1;
        let session_id = state.next_session_id;
        let _ = tx.send(TransportEvent::ConnectionStateChanged {
            state: ConnectionState::Connecting,
            reason: ConnectionChangeReason::Login,
        });
        let _ = tx.send(TransportEvent::ConnectionStateChanged {
            state: ConnectionState::Connected,
            reason: ConnectionChangeReason::LoginSuccess,
        });

        let queued = state.offline.remove(user_id).unwrap_or_default();
        if !queued.is_empty() {
            info!(
                "[Loopback] 📬 投递离线消息: user={}, count={}",
                user_id,
                queued.len()
            );
        }
        for message in queued {
            let _ = tx.send(TransportEvent::PeerMessage {
                from: message.sender_id.clone(),
                message,
            });
        }

        state.sessions.insert(
            user_id.to_string(),
            Session { id: session_id, tx },
        );
        // 持有 hub 锁时写入，同一传输实例上的并发登录只会有一个成功
        self.set_current(Some((user_id.to_string(), session_id)));
        drop(state);
        info!("[Loopback] ✅ 用户登录: {}", user_id);
        Ok(rx)
    }

    async fn logout(&self) -> RtmResult<()> {
        let mut state = self.hub.lock();
        let user_id = self.require_login(&state)?;
        state.leave_all_channels(&user_id);
        if let Some(session) = state.sessions.remove(&user_id) {
            let _ = session.tx.send(TransportEvent::ConnectionStateChanged {
                state: ConnectionState::Disconnected,
                reason: ConnectionChangeReason::Logout,
            });
        }
        self.set_current(None);
        drop(state);
        info!("[Loopback] 👋 用户登出: {}", user_id);
        Ok(())
    }

    async fn join_channel(&self, channel_id: &str) -> RtmResult<()> {
        let mut state = self.hub.lock();
        let user_id = self.require_login(&state)?;
        check_channel_id(channel_id)?;
        if state.is_member(channel_id, &user_id) {
            return Ok(());
        }
        state
            .channels
            .entry(channel_id.to_string())
            .or_default()
            .insert(user_id.clone());
        state.notify_members(
            channel_id,
            &user_id,
            TransportEvent::MemberJoined(Member::new(user_id.as_str(), channel_id)),
        );
        debug!("[Loopback] {} 加入频道 {}", user_id, channel_id);
        Ok(())
    }

    async fn leave_channel(&self, channel_id: &str) -> RtmResult<()> {
        let mut state = self.hub.lock();
        let user_id = self.require_login(&state)?;
        if !state.is_member(channel_id, &user_id) {
            return Err(RtmError::ChannelNotJoined(channel_id.to_string()));
        }
        if let Some(members) = state.channels.get_mut(channel_id) {
            members.remove(&user_id);
            if members.is_empty() {
                state.channels.remove(channel_id);
            }
        }
        state.notify_members(
            channel_id,
            &user_id,
            TransportEvent::MemberLeft(Member::new(user_id.as_str(), channel_id)),
        );
        debug!("[Loopback] {} 离开频道 {}", user_id, channel_id);
        Ok(())
    }

    async fn send_channel_message(&self, channel_id: &str, message: RtmMessage) -> RtmResult<()> {
        let state = self.hub.lock();
        let user_id = self.require_login(&state)?;
        if !state.is_member(channel_id, &user_id) {
            return Err(RtmError::ChannelNotJoined(channel_id.to_string()));
        }
        check_message_size(&message)?;
        state.notify_members(
            channel_id,
            &user_id,
            TransportEvent::ChannelMessage {
                channel_id: channel_id.to_string(),
                from: user_id.clone(),
                message,
            },
        );
        Ok(())
    }

    async fn send_peer_message(
        &self,
        peer_id: &str,
        message: RtmMessage,
        enable_offline: bool,
    ) -> RtmResult<()> {
        let mut state = self.hub.lock();
        let user_id = self.require_login(&state)?;
        check_message_size(&message)?;

        if state.sessions.contains_key(peer_id) {
            state.emit(
                peer_id,
                TransportEvent::PeerMessage {
                    from: user_id,
                    message,
                },
            );
            return Ok(());
        }

        if !enable_offline {
            return Err(RtmError::PeerUnreachable(peer_id.to_string()));
        }

        debug!("[Loopback] 📥 对端离线，暂存消息: {} -> {}", user_id, peer_id);
        state
            .offline
            .entry(peer_id.to_string())
            .or_default()
            .push(message.into_offline());
        Ok(())
    }
}
