//! RTM 客户端核心实现模块
//!
//! [`RtmClient`] 是一次登录会话的管理者：持有传输层、登录状态、已加入的频道、
//! 离线消息存储和事件总线。由应用在组合根显式创建，并按需传给各个界面。

use crate::rtm::error::{RtmError, RtmResult};
use crate::rtm::listener::{EventBus, RtmEvent, RtmEventListener, SubscriptionId};
use crate::rtm::message::{OfflineMessageStore, OfflineStoreConfig, RtmMessage};
use crate::rtm::transport::{RtmTransport, TransportEvent, TransportEvents};
use crate::rtm::types::{ConnectionState, LoginStatus, OneToOneMessageType, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 客户端配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// 服务商分配的 App ID
    pub app_id: String,
    /// 当前登录用户 ID
    pub user_id: UserId,
    /// 登录 token，测试环境可不填
    #[serde(default)]
    pub token: Option<String>,
    /// 单聊消息发送方式
    #[serde(default)]
    pub one_to_one_message_type: OneToOneMessageType,
    /// 离线消息存储容量策略
    #[serde(default)]
    pub offline_store: OfflineStoreConfig,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(app_id: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self {
            app_id: app_id.into(),
            user_id: user_id.into(),
            token: None,
            one_to_one_message_type: OneToOneMessageType::Normal,
            offline_store: OfflineStoreConfig::default(),
        }
    }

    /// 从 TOML 文本解析配置
    pub fn from_toml_str(text: &str) -> RtmResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| RtmError::Config(format!("解析配置失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置
    pub fn from_file(path: impl AsRef<Path>) -> RtmResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RtmError::Config(format!("读取配置文件 {} 失败: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> RtmResult<()> {
        if self.app_id.trim().is_empty() {
            return Err(RtmError::Config("app_id 不能为空".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(RtmError::Config("user_id 不能为空".to_string()));
        }
        Ok(())
    }
}

/// 事件泵任务与客户端共享的状态
struct SessionState {
    user_id: UserId,
    status: Mutex<LoginStatus>,
    one_to_one_message_type: Mutex<OneToOneMessageType>,
    channels: Mutex<BTreeSet<String>>,
    offline_store: OfflineMessageStore,
    event_bus: EventBus,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl SessionState {
    /// 处理传输层事件：更新本地状态、缓存离线消息，再分发给订阅者
    async fn handle_transport_event(&self, event: TransportEvent) {
        let event = match event {
            TransportEvent::ConnectionStateChanged { state, reason } => {
                info!(
                    "[Client] 🔗 连接状态变化: user={}, state={:?}, reason={:?}",
                    self.user_id, state, reason
                );
                if let Some(status) = state.login_status() {
                    *lock(&self.status) = status;
                }
                if matches!(
                    state,
                    ConnectionState::Disconnected | ConnectionState::Aborted
                ) {
                    lock(&self.channels).clear();
                }
                RtmEvent::ConnectionStateChanged { state, reason }
            }
            TransportEvent::MemberJoined(member) => {
                debug!(
                    "[Client] ➕ {} 加入频道 {}",
                    member.user_id, member.channel_id
                );
                RtmEvent::MemberJoined(member)
            }
            TransportEvent::MemberLeft(member) => {
                debug!(
                    "[Client] ➖ {} 离开频道 {}",
                    member.user_id, member.channel_id
                );
                RtmEvent::MemberLeft(member)
            }
            TransportEvent::ChannelMessage {
                channel_id,
                from,
                message,
            } => {
                debug!(
                    "[Client] 📨 频道消息: channel={}, from={}, msg_id={}",
                    channel_id, from, message.message_id
                );
                RtmEvent::MessageReceived {
                    channel_id: Some(channel_id),
                    from,
                    message,
                }
            }
            TransportEvent::PeerMessage { from, message } => {
                if message.is_offline_message {
                    info!(
                        "[Client] 📬 收到离线单聊消息: from={}, msg_id={}",
                        from, message.message_id
                    );
                } else {
                    debug!(
                        "[Client] 💬 收到单聊消息: from={}, msg_id={}",
                        from, message.message_id
                    );
                }
                // 在线消息由 record 直接忽略
                self.offline_store.record(message.clone(), &from);
                RtmEvent::MessageReceived {
                    channel_id: None,
                    from,
                    message,
                }
            }
        };
        self.event_bus.publish(event).await;
    }

    fn require_online(&self) -> RtmResult<()> {
        match *lock(&self.status) {
            LoginStatus::Online => Ok(()),
            LoginStatus::Offline => Err(RtmError::NotLoggedIn),
        }
    }
}

/// RTM 客户端
#[derive(Clone)]
pub struct RtmClient {
    config: ClientConfig,
    transport: Arc<dyn RtmTransport>,
    state: Arc<SessionState>,
    pump: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RtmClient {
    /// 创建新的客户端
    pub fn new(config: ClientConfig, transport: Arc<dyn RtmTransport>) -> Self {
        let state = SessionState {
            user_id: config.user_id.clone(),
            status: Mutex::new(LoginStatus::Offline),
            one_to_one_message_type: Mutex::new(config.one_to_one_message_type),
            channels: Mutex::new(BTreeSet::new()),
            offline_store: OfflineMessageStore::with_config(&config.offline_store),
            event_bus: EventBus::new(),
        };
        Self {
            config,
            transport,
            state: Arc::new(state),
            pump: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    pub fn status(&self) -> LoginStatus {
        *lock(&self.state.status)
    }

    pub fn one_to_one_message_type(&self) -> OneToOneMessageType {
        *lock(&self.state.one_to_one_message_type)
    }

    /// 切换单聊消息发送方式
    pub fn set_one_to_one_message_type(&self, message_type: OneToOneMessageType) {
        *lock(&self.state.one_to_one_message_type) = message_type;
    }

    /// 已加入的频道（按 ID 排序）
    pub fn joined_channels(&self) -> Vec<String> {
        lock(&self.state.channels).iter().cloned().collect()
    }

    /// 订阅事件
    pub fn subscribe(&self, listener: Arc<dyn RtmEventListener>) -> SubscriptionId {
        self.state.event_bus.subscribe(listener)
    }

    /// 退订事件
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.event_bus.unsubscribe(id)
    }

    /// 登录并开始处理传输层事件
    pub async fn login(&self) -> RtmResult<()> {
        if self.status() == LoginStatus::Online {
            return Err(RtmError::AlreadyLoggedIn(self.config.user_id.clone()));
        }

        info!("[Client] 🔐 正在登录: user={}", self.config.user_id);
        let events = self
            .transport
            .login(&self.config.user_id, self.config.token.as_deref())
            .await
            .map_err(|e| {
                error!("[Client] ❌ 登录失败: {}", e);
                e
            })?;

        *lock(&self.state.status) = LoginStatus::Online;
        let handle = self.spawn_event_pump(events);
        if let Some(old) = lock(&*self.pump).replace(handle) {
            old.abort();
        }
        info!("[Client] ✅ 登录成功: user={}", self.config.user_id);
        Ok(())
    }

    // 单个任务按传输层的投递顺序依次处理事件
    fn spawn_event_pump(&self, mut events: TransportEvents) -> JoinHandle<()> {
        let state = self.state.clone();
        tokio::spawn(async move {
            info!("[Client] 📥 开始处理传输层事件: user={}", state.user_id);
            while let Some(event) = events.recv().await {
                state.handle_transport_event(event).await;
            }
            debug!("[Client] 事件流已关闭: user={}", state.user_id);
        })
    }

    /// 登出；等待剩余事件处理完毕后返回
    pub async fn logout(&self) -> RtmResult<()> {
        self.state.require_online()?;

        let transport_result = self.transport.logout().await;

        let pump = lock(&*self.pump).take();
        match (transport_result, pump) {
            (Ok(()), Some(handle)) => {
                // 传输层登出成功后会关闭事件流，等待剩余事件处理完
                if let Err(e) = handle.await {
                    warn!("[Client] ⚠️ 事件处理任务异常结束: {}", e);
                }
            }
            (Err(e), pump) => {
                // 事件流不一定会关闭，直接停止事件处理，本地状态照常清理
                warn!("[Client] ⚠️ 传输层登出失败: {}", e);
                if let Some(handle) = pump {
                    handle.abort();
                }
            }
            (Ok(()), None) => {}
        }

        *lock(&self.state.status) = LoginStatus::Offline;
        lock(&self.state.channels).clear();
        info!("[Client] 👋 已登出: user={}", self.config.user_id);
        Ok(())
    }

    /// 加入频道
    pub async fn join_channel(&self, channel_id: &str) -> RtmResult<()> {
        self.state.require_online()?;
        self.transport.join_channel(channel_id).await.map_err(|e| {
            error!("[Client] ❌ 加入频道 {} 失败: {}", channel_id, e);
            e
        })?;
        lock(&self.state.channels).insert(channel_id.to_string());
        info!("[Client] ✅ 已加入频道: {}", channel_id);
        Ok(())
    }

    /// 离开频道
    pub async fn leave_channel(&self, channel_id: &str) -> RtmResult<()> {
        self.state.require_online()?;
        if !lock(&self.state.channels).contains(channel_id) {
            return Err(RtmError::ChannelNotJoined(channel_id.to_string()));
        }
        self.transport.leave_channel(channel_id).await?;
        lock(&self.state.channels).remove(channel_id);
        info!("[Client] 已离开频道: {}", channel_id);
        Ok(())
    }

    /// 发送频道消息，成功后返回已发送的消息
    pub async fn send_channel_message(&self, channel_id: &str, text: &str) -> RtmResult<RtmMessage> {
        self.state.require_online()?;
        if text.trim().is_empty() {
            return Err(RtmError::EmptyMessage);
        }
        if !lock(&self.state.channels).contains(channel_id) {
            return Err(RtmError::ChannelNotJoined(channel_id.to_string()));
        }

        let message = RtmMessage::new(self.config.user_id.as_str(), text);
        self.transport
            .send_channel_message(channel_id, message.clone())
            .await?;
        debug!(
            "[Client] 📤 频道消息已发送: channel={}, msg_id={}",
            channel_id, message.message_id
        );
        Ok(message)
    }

    /// 发送单聊消息，按当前的单聊消息发送方式决定是否开启离线消息
    pub async fn send_peer_message(&self, peer_id: &str, text: &str) -> RtmResult<RtmMessage> {
        self.state.require_online()?;
        if text.trim().is_empty() {
            return Err(RtmError::EmptyMessage);
        }

        let enable_offline = self.one_to_one_message_type().enable_offline();
        let message = RtmMessage::new(self.config.user_id.as_str(), text);
        self.transport
            .send_peer_message(peer_id, message.clone(), enable_offline)
            .await?;
        debug!(
            "[Client] 📤 单聊消息已发送: peer={}, offline={}, msg_id={}",
            peer_id, enable_offline, message.message_id
        );
        Ok(message)
    }

    /// 取出并移除来自某用户的离线消息
    pub fn take_offline_messages(&self, peer_id: &str) -> Vec<RtmMessage> {
        self.state.offline_store.take_all(peer_id)
    }

    /// 查看来自某用户的离线消息（不移除）
    pub fn peek_offline_messages(&self, peer_id: &str) -> Vec<RtmMessage> {
        self.state.offline_store.drain(peer_id)
    }

    pub fn clear_offline_messages(&self, peer_id: &str) {
        self.state.offline_store.clear(peer_id)
    }

    pub fn offline_store(&self) -> &OfflineMessageStore {
        &self.state.offline_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtm::transport::LoopbackHub;
    use crate::rtm::types::{ConnectionChangeReason, Member};
    use async_trait::async_trait;
    use std::sync::Once;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    static INIT_LOGGER: Once = Once::new();

    fn init_test_logger() {
        INIT_LOGGER.call_once(|| {
            use tracing_subscriber::prelude::*;
            use tracing_subscriber::EnvFilter;

            let filter_layer = EnvFilter::new("info,rtm_sdk_core_rust=debug");

            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_test_writer();

            tracing_subscriber::registry()
                .with(filter_layer)
                .with(fmt_layer)
                .init();
        });
    }

    /// 把事件转发到 channel，方便测试中等待
    struct ForwardListener(mpsc::UnboundedSender<RtmEvent>);

    #[async_trait]
    impl RtmEventListener for ForwardListener {
        async fn on_event(&self, event: RtmEvent) {
            let _ = self.0.send(event);
        }
    }

    fn client(hub: &Arc<LoopbackHub>, user_id: &str) -> RtmClient {
        RtmClient::new(
            ClientConfig::new("test-app", user_id),
            Arc::new(hub.transport()),
        )
    }

    fn subscribe(client: &RtmClient) -> mpsc::UnboundedReceiver<RtmEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        client.subscribe(Arc::new(ForwardListener(tx)));
        rx
    }

    async fn next_message(rx: &mut mpsc::UnboundedReceiver<RtmEvent>) -> (Option<String>, String, RtmMessage) {
        loop {
            let event = timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("timed out waiting for event")
                .expect("event stream closed");
            if let RtmEvent::MessageReceived {
                channel_id,
                from,
                message,
            } = event
            {
                return (channel_id, from, message);
            }
        }
    }

    #[tokio::test]
    async fn login_and_logout_update_status() {
        init_test_logger();
        let hub = LoopbackHub::new();
        let alice = client(&hub, "alice");
        let mut events = subscribe(&alice);

        assert_eq!(alice.status(), LoginStatus::Offline);
        alice.login().await.unwrap();
        assert_eq!(alice.status(), LoginStatus::Online);
        assert_eq!(
            alice.login().await.unwrap_err(),
            RtmError::AlreadyLoggedIn("alice".to_string())
        );

        alice.join_channel("lobby").await.unwrap();
        assert_eq!(alice.joined_channels(), vec!["lobby".to_string()]);

        alice.logout().await.unwrap();
        assert_eq!(alice.status(), LoginStatus::Offline);
        assert!(alice.joined_channels().is_empty());
        assert_eq!(alice.logout().await.unwrap_err(), RtmError::NotLoggedIn);

        let mut states = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let RtmEvent::ConnectionStateChanged { state, .. } = event {
                states.push(state);
            }
        }
        assert_eq!(
            states,
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnected
            ]
        );
    }

    #[tokio::test]
    async fn operations_require_login() {
        let hub = LoopbackHub::new();
        let alice = client(&hub, "alice");
        assert_eq!(
            alice.join_channel("lobby").await.unwrap_err(),
            RtmError::NotLoggedIn
        );
        assert_eq!(
            alice.send_peer_message("bob", "hi").await.unwrap_err(),
            RtmError::NotLoggedIn
        );
    }

    #[tokio::test]
    async fn offline_peer_messages_are_buffered_until_taken() {
        init_test_logger();
        let hub = LoopbackHub::new();
        let alice = client(&hub, "alice");
        let bob = client(&hub, "bob");
        alice.login().await.unwrap();

        assert_eq!(
            alice.send_peer_message("bob", "lost").await.unwrap_err(),
            RtmError::PeerUnreachable("bob".to_string())
        );

        alice.set_one_to_one_message_type(OneToOneMessageType::Offline);
        alice.send_peer_message("bob", "hi").await.unwrap();
        alice.send_peer_message("bob", "yo").await.unwrap();

        let mut events = subscribe(&bob);
        bob.login().await.unwrap();
        for expected in ["hi", "yo"] {
            let (channel_id, from, message) = next_message(&mut events).await;
            assert_eq!(channel_id, None);
            assert_eq!(from, "alice");
            assert_eq!(message.text, expected);
            assert!(message.is_offline_message);
        }

        assert_eq!(bob.peek_offline_messages("alice").len(), 2);
        let taken: Vec<String> = bob
            .take_offline_messages("alice")
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(taken, vec!["hi", "yo"]);
        assert!(bob.take_offline_messages("alice").is_empty());

        // 对端在线时的消息不进入离线存储
        alice.send_peer_message("bob", "live").await.unwrap();
        let (_, _, message) = next_message(&mut events).await;
        assert_eq!(message.text, "live");
        assert!(!message.is_offline_message);
        assert!(bob.peek_offline_messages("alice").is_empty());
    }

    #[tokio::test]
    async fn channel_chat_publishes_member_and_message_events() {
        let hub = LoopbackHub::new();
        let alice = client(&hub, "alice");
        let bob = client(&hub, "bob");
        let mut alice_events = subscribe(&alice);
        alice.login().await.unwrap();
        bob.login().await.unwrap();
        alice.join_channel("lobby").await.unwrap();
        bob.join_channel("lobby").await.unwrap();

        assert_eq!(
            bob.send_channel_message("lobby", "   ").await.unwrap_err(),
            RtmError::EmptyMessage
        );
        assert_eq!(
            bob.send_channel_message("other", "hi").await.unwrap_err(),
            RtmError::ChannelNotJoined("other".to_string())
        );
        let sent = bob.send_channel_message("lobby", "hello").await.unwrap();
        assert_eq!(sent.sender_id, "bob");

        let mut joined = None;
        loop {
            let event = timeout(Duration::from_secs(2), alice_events.recv())
                .await
                .unwrap()
                .unwrap();
            match event {
                RtmEvent::MemberJoined(member) => joined = Some(member),
                RtmEvent::MessageReceived {
                    channel_id,
                    from,
                    message,
                } => {
                    assert_eq!(channel_id.as_deref(), Some("lobby"));
                    assert_eq!(from, "bob");
                    assert_eq!(message, sent);
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(joined, Some(Member::new("bob", "lobby")));

        bob.leave_channel("lobby").await.unwrap();
        assert_eq!(
            bob.leave_channel("lobby").await.unwrap_err(),
            RtmError::ChannelNotJoined("lobby".to_string())
        );
    }

    #[tokio::test]
    async fn remote_login_moves_old_client_offline() {
        let hub = LoopbackHub::new();
        let first = client(&hub, "alice");
        let second = client(&hub, "alice");
        let mut events = subscribe(&first);
        first.login().await.unwrap();
        second.login().await.unwrap();

        loop {
            let event = timeout(Duration::from_secs(2), events.recv())
                .await
                .unwrap()
                .unwrap();
            if let RtmEvent::ConnectionStateChanged { state, reason } = event {
                if state == ConnectionState::Aborted {
                    assert_eq!(reason, ConnectionChangeReason::RemoteLogin);
                    break;
                }
            }
        }
        assert_eq!(first.status(), LoginStatus::Offline);
        assert_eq!(second.status(), LoginStatus::Online);
    }

    #[test]
    fn config_parses_from_toml() {
        let config = ClientConfig::from_toml_str(
            r#"
            app_id = "demo"
            user_id = "alice"
            one_to_one_message_type = "offline"

            [offline_store]
            max_per_recipient = 100
            ttl_secs = 86400
            "#,
        )
        .unwrap();
        assert_eq!(config.user_id, "alice");
        assert_eq!(config.token, None);
        assert_eq!(config.one_to_one_message_type, OneToOneMessageType::Offline);
        assert_eq!(config.offline_store.max_per_recipient, Some(100));
        assert_eq!(config.offline_store.ttl_secs, Some(86400));
    }

    #[test]
    fn config_rejects_empty_user() {
        let err = ClientConfig::from_toml_str("app_id = \"demo\"\nuser_id = \"\"").unwrap_err();
        assert!(matches!(err, RtmError::Config(_)));
    }

    const STUB_ERR_CODE: i32 = 101;

    /// 登录成功后其余调用全部失败的传输层；登出失败时事件流保持打开
    #[derive(Default)]
    struct FailingTransport {
        events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    }

    #[async_trait]
    impl RtmTransport for FailingTransport {
        async fn login(&self, _user_id: &str, _token: Option<&str>) -> RtmResult<TransportEvents> {
            let (tx, rx) = mpsc::unbounded_channel();
            let _ = tx.send(TransportEvent::ConnectionStateChanged {
                state: ConnectionState::Connected,
                reason: ConnectionChangeReason::LoginSuccess,
            });
            *lock(&self.events) = Some(tx);
            Ok(rx)
        }

        async fn logout(&self) -> RtmResult<()> {
            Err(RtmError::SendFailed { code: STUB_ERR_CODE })
        }

        async fn join_channel(&self, channel_id: &str) -> RtmResult<()> {
            Err(RtmError::JoinChannelFailed {
                channel_id: channel_id.to_string(),
                code: STUB_ERR_CODE,
            })
        }

        async fn leave_channel(&self, _channel_id: &str) -> RtmResult<()> {
            Err(RtmError::SendFailed { code: STUB_ERR_CODE })
        }

        async fn send_channel_message(&self, _channel_id: &str, _message: RtmMessage) -> RtmResult<()> {
            Err(RtmError::SendFailed { code: STUB_ERR_CODE })
        }

        async fn send_peer_message(
            &self,
            _peer_id: &str,
            _message: RtmMessage,
            _enable_offline: bool,
        ) -> RtmResult<()> {
            Err(RtmError::SendFailed { code: STUB_ERR_CODE })
        }
    }

    fn failing_client() -> (RtmClient, Arc<FailingTransport>) {
        let transport = Arc::new(FailingTransport::default());
        let client = RtmClient::new(ClientConfig::new("test-app", "alice"), transport.clone());
        (client, transport)
    }

    #[tokio::test]
    async fn logout_returns_when_transport_logout_fails() {
        init_test_logger();
        let (c, transport) = failing_client();
        c.login().await.unwrap();

        timeout(Duration::from_secs(2), c.logout())
            .await
            .expect("logout hung on an open event stream")
            .unwrap();
        assert_eq!(c.status(), LoginStatus::Offline);
        assert!(c.joined_channels().is_empty());

        // 事件处理任务已停止，事件流的接收端随之释放
        let tx = lock(&transport.events).clone().unwrap();
        timeout(Duration::from_secs(2), tx.closed())
            .await
            .expect("event pump still running after logout");
    }

    #[tokio::test]
    async fn failed_join_leaves_channels_unchanged() {
        init_test_logger();
        let (c, _transport) = failing_client();
        c.login().await.unwrap();

        let err = c.join_channel("lobby").await.unwrap_err();
        assert_eq!(
            err,
            RtmError::JoinChannelFailed {
                channel_id: "lobby".to_string(),
                code: STUB_ERR_CODE,
            }
        );
        assert!(c.joined_channels().is_empty());
        assert_eq!(
            c.send_channel_message("lobby", "hi").await.unwrap_err(),
            RtmError::ChannelNotJoined("lobby".to_string())
        );
        assert_eq!(c.status(), LoginStatus::Online);
    }

    #[tokio::test]
    async fn transport_send_errors_propagate() {
        init_test_logger();
        let (c, _transport) = failing_client();
        c.login().await.unwrap();

        for message_type in [OneToOneMessageType::Normal, OneToOneMessageType::Offline] {
            c.set_one_to_one_message_type(message_type);
            assert_eq!(
                c.send_peer_message("bob", "hi").await.unwrap_err(),
                RtmError::SendFailed { code: STUB_ERR_CODE }
            );
        }
        assert_eq!(c.offline_store().pending_count("bob"), 0);
        assert_eq!(c.status(), LoginStatus::Online);
    }
}
