//! slircbot - a small IRC bot built on slirc-bot.
//!
//! Answers `version` and `source` queries, replies to CTCP VERSION and
//! joins channels it is invited to.

use slirc_bot::{Action, Bot, Config, CtcpKind, Message};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();
    slirc_bot::telemetry::install_panic_hook();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "slircbot.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        nickname = %config.bot.nickname,
        server = %config.server.endpoint(),
        "Starting slircbot"
    );

    let bot = Bot::new(config.bot.nickname.clone(), config.bot.attention);

    let version = config.bot.version.clone();
    let source = config.bot.source.clone();
    bot.set_privmsg_handler(move |query: &str, _: &Message| {
        match query.trim().to_ascii_lowercase().as_str() {
            "version" => version.clone(),
            "source" => source.clone(),
            _ => "Huh?".to_string(),
        }
    })?;

    // CTCP VERSION, then everything else to the router.
    let router = bot.actions().get("PRIVMSG");
    let ctcp_version = config.bot.version.clone();
    bot.register("PRIVMSG", move |bot: &Bot, msg: &Message| {
        if msg.ctcp_kind() == Some(CtcpKind::Version) {
            let sender = msg.sender();
            if sender.is_empty() {
                return None;
            }
            return Some(Message::ctcp_reply(sender, "VERSION", ctcp_version.clone()));
        }
        router.as_ref().and_then(|r| r.call(bot, msg))
    });

    bot.register("INVITE", |_: &Bot, msg: &Message| {
        let channel = if msg.trailing.is_empty() {
            msg.arg(1)?
        } else {
            msg.trailing.as_str()
        };
        info!(channel = %channel, by = %msg.sender(), "Invited");
        Some(Message::join(channel))
    });

    let joined = bot.connect(config.network_options()).await?;
    info!(joined, "Connected");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    bot.close_all().await;

    Ok(())
}
