//! RTM CLI 客户端（演示版）
//!
//! 非交互式 CLI，基于进程内回环传输演示单聊登录、离线消息和频道聊天。
//! 启动时通过命令行参数指定用户，自动完成整个流程并输出收到的事件。

use anyhow::{Context, Result};
use clap::Parser;
use rtm_sdk_core_rust::rtm::chat_log::MessageSide;
use rtm_sdk_core_rust::rtm::serialization::to_json_string;
use rtm_sdk_core_rust::rtm::message::RtmMessage;
use rtm_sdk_core_rust::rtm::types::OneToOneMessageType;
use rtm_sdk_core_rust::{ChatLog, ClientConfig, LoopbackHub, RtmClient, RtmEvent, RtmEventListener};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, timeout, Duration};
use tracing::{error, info, warn};

/// 等待消息送达的超时时间（秒）
const MESSAGE_WAIT_SECS: u64 = 5;

/// RTM CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "rtm-cli")]
#[command(about = "RTM CLI 客户端 - 演示单聊、离线消息与频道聊天", long_about = None)]
struct Args {
    /// 配置文件（TOML），不指定时使用默认配置
    #[arg(short, long)]
    config: Option<String>,

    /// 当前用户 ID（覆盖配置文件）
    #[arg(short, long)]
    user: Option<String>,

    /// 对端用户 ID
    #[arg(short, long, default_value = "bob")]
    peer: String,

    /// 频道 ID
    #[arg(long, default_value = "lobby")]
    channel: String,

    /// 演示结束后继续运行的时长（秒）
    #[arg(short, long, default_value = "0")]
    duration: u64,

    /// 日志级别（默认: info,rtm_sdk_core_rust=debug）
    #[arg(long, default_value = "info,rtm_sdk_core_rust=debug")]
    log_level: String,
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG，否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .context("无法创建日志文件 debug.log")?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("[CLI] 📝 日志已同时输出到控制台和文件: debug.log");
    Ok(())
}

/// 输出所有收到的事件
struct CliEventListener {
    user_id: String,
}

#[async_trait::async_trait]
impl RtmEventListener for CliEventListener {
    async fn on_event(&self, event: RtmEvent) {
        let json = to_json_string(&event);
        match &event {
            RtmEvent::ConnectionStateChanged { .. } => {
                info!("[CLI/{}] 🔗 连接状态: {}", self.user_id, json)
            }
            RtmEvent::MemberJoined(_) => info!("[CLI/{}] ➕ 成员加入: {}", self.user_id, json),
            RtmEvent::MemberLeft(_) => info!("[CLI/{}] ➖ 成员离开: {}", self.user_id, json),
            RtmEvent::MessageReceived { message, .. } if message.is_offline_message => {
                info!("[CLI/{}] 📬 离线消息: {}", self.user_id, json)
            }
            RtmEvent::MessageReceived { .. } => {
                info!("[CLI/{}] 📨 收到消息: {}", self.user_id, json)
            }
        }
    }
}

/// 把收到的消息追加到聊天记录
struct ChatLogListener {
    log: Arc<Mutex<ChatLog>>,
}

#[async_trait::async_trait]
impl RtmEventListener for ChatLogListener {
    async fn on_event(&self, event: RtmEvent) {
        if let RtmEvent::MessageReceived { from, message, .. } = event {
            // 离线消息由取出离线消息时统一追加
            if !message.is_offline_message {
                self.log.lock().await.append(from, message.text);
            }
        }
    }
}

/// 把收到的消息转发到 channel，演示流程据此等待消息送达
struct MessageWaiter {
    tx: mpsc::UnboundedSender<RtmMessage>,
}

#[async_trait::async_trait]
impl RtmEventListener for MessageWaiter {
    async fn on_event(&self, event: RtmEvent) {
        if let RtmEvent::MessageReceived { message, .. } = event {
            let _ = self.tx.send(message);
        }
    }
}

fn message_waiter(client: &RtmClient) -> mpsc::UnboundedReceiver<RtmMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.subscribe(Arc::new(MessageWaiter { tx }));
    rx
}

/// 等待收到指定条数的消息
async fn wait_for_messages(
    rx: &mut mpsc::UnboundedReceiver<RtmMessage>,
    user_id: &str,
    count: usize,
) -> Result<()> {
    for received in 0..count {
        timeout(Duration::from_secs(MESSAGE_WAIT_SECS), rx.recv())
            .await
            .with_context(|| format!("{} 等待消息超时（已收到 {}/{} 条）", user_id, received, count))?
            .with_context(|| format!("{} 的事件流已关闭", user_id))?;
    }
    Ok(())
}

fn print_chat_log(title: &str, log: &ChatLog) {
    info!("[CLI] 📋 {}（共 {} 条）:", title, log.len());
    for entry in log.entries() {
        let arrow = match log.side(entry) {
            MessageSide::Outgoing => "→",
            MessageSide::Incoming => "←",
        };
        info!("[CLI]   {} {}: {}", arrow, entry.user_id, entry.text);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(&args.log_level)?;

    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path).context("加载配置失败")?,
        None => ClientConfig::new("rtm-demo", "alice"),
    };
    if let Some(user) = &args.user {
        config.user_id = user.clone();
    }
    config.validate().context("配置无效")?;
    if config.user_id == args.peer {
        anyhow::bail!("对端用户不能与当前用户相同: {}", args.peer);
    }

    info!("[CLI] 🚀 RTM CLI 客户端（演示模式）");
    info!("[CLI] 👤 用户: {}, 对端: {}, 频道: {}", config.user_id, args.peer, args.channel);

    let hub = LoopbackHub::new();
    let peer_config = ClientConfig {
        user_id: args.peer.clone(),
        ..config.clone()
    };

    let me = RtmClient::new(config, Arc::new(hub.transport()));
    let peer = RtmClient::new(peer_config, Arc::new(hub.transport()));
    me.subscribe(Arc::new(CliEventListener {
        user_id: me.user_id().to_string(),
    }));
    peer.subscribe(Arc::new(CliEventListener {
        user_id: peer.user_id().to_string(),
    }));
    let my_log = Arc::new(Mutex::new(ChatLog::new(me.user_id())));
    let peer_log = Arc::new(Mutex::new(ChatLog::new(peer.user_id())));
    me.subscribe(Arc::new(ChatLogListener {
        log: my_log.clone(),
    }));
    peer.subscribe(Arc::new(ChatLogListener {
        log: peer_log.clone(),
    }));
    let mut my_inbox = message_waiter(&me);
    let mut peer_inbox = message_waiter(&peer);

    // 1. 对端不在线时发送单聊消息
    me.login().await.context("登录失败")?;
    if let Err(e) = me.send_peer_message(&args.peer, "这条消息不会送达").await {
        warn!("[CLI] ⚠️ 普通单聊发送失败（预期）: {}", e);
    }
    me.set_one_to_one_message_type(OneToOneMessageType::Offline);
    let offline_texts = ["你好", "上线后记得回复"];
    for text in offline_texts {
        me.send_peer_message(&args.peer, text)
            .await
            .context("发送离线消息失败")?;
    }

    // 2. 对端登录，取出离线消息
    peer.login().await.context("对端登录失败")?;
    wait_for_messages(&mut peer_inbox, peer.user_id(), offline_texts.len()).await?;
    let offline = peer.take_offline_messages(me.user_id());
    info!("[CLI] 📬 对端取出离线消息 {} 条", offline.len());
    {
        let mut log = peer_log.lock().await;
        for message in offline {
            log.append(message.sender_id, message.text);
        }
    }

    // 3. 频道聊天
    me.join_channel(&args.channel).await.context("加入频道失败")?;
    peer.join_channel(&args.channel).await.context("对端加入频道失败")?;

    let chat = [
        (&me, &my_log, "大家好"),
        (&peer, &peer_log, "欢迎！"),
        (&me, &my_log, "一起聊聊"),
    ];
    // 各自等待对方发来的频道消息
    let (mut my_expected, mut peer_expected) = (0, 0);
    for (client, log, text) in chat {
        match client.send_channel_message(&args.channel, text).await {
            Ok(message) => {
                if message.sender_id == me.user_id() {
                    peer_expected += 1;
                } else {
                    my_expected += 1;
                }
                log.lock().await.append(message.sender_id, message.text);
            }
            Err(e) => error!("[CLI] ❌ 频道消息发送失败: {}", e),
        }
    }
    wait_for_messages(&mut my_inbox, me.user_id(), my_expected).await?;
    wait_for_messages(&mut peer_inbox, peer.user_id(), peer_expected).await?;

    print_chat_log(&format!("{} 的聊天记录", me.user_id()), &*my_log.lock().await);
    print_chat_log(&format!("{} 的聊天记录", peer.user_id()), &*peer_log.lock().await);

    if args.duration > 0 {
        info!("[CLI] ⏰ {} 秒后自动退出", args.duration);
        sleep(Duration::from_secs(args.duration)).await;
    }

    peer.logout().await.context("对端登出失败")?;
    me.logout().await.context("登出失败")?;
    info!("[CLI] 👋 程序退出");
    Ok(())
}
