use std::sync::Arc;

use signup_bot::bot::Bot;
use signup_bot::channels::{Channel, ChannelManager, CliChannel, TelegramChannel};
use signup_bot::config::BotConfig;
use signup_bot::registration::{Registrar, RegistrationClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export WORDPRESS_API_URL=https://example.com/wp-json/custom/v1/register");
        eprintln!("  export WORDPRESS_API_USERNAME=... WORDPRESS_API_PASSWORD=...");
        std::process::exit(1);
    });

    eprintln!("📝 Signup Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Endpoint: {}", config.registration.endpoint);
    eprintln!("   Flow: {}", config.flow);
    eprintln!(
        "   Session idle timeout: {}s",
        config.session_idle_timeout.as_secs()
    );

    let registrar: Arc<dyn Registrar> = Arc::new(RegistrationClient::new(
        config.registration.clone(),
    )?);
    let flow = config.flow.build();

    // Set up channels
    let mut channels = ChannelManager::new();
    let mut active_channels = Vec::new();

    if let Some(token) = config.telegram_token.clone() {
        eprintln!(
            "   Telegram: enabled (allowed: {})",
            if config.allows_everyone() {
                "everyone".to_string()
            } else {
                config.allowed_users.join(", ")
            }
        );
        let telegram = TelegramChannel::new(token, config.allowed_users.clone());
        if let Err(e) = telegram.health_check().await {
            tracing::warn!("Telegram health check failed: {e}");
        }
        channels.add(Box::new(telegram));
        active_channels.push("telegram");
    }

    if config.cli_enabled {
        channels.add(Box::new(CliChannel::new()));
        active_channels.push("cli");
        eprintln!("   Type /start and press Enter to register.");
    }

    eprintln!("   Channels: {}\n", active_channels.join(", "));

    let bot = Bot::new(channels, flow, registrar, config.session_idle_timeout);
    bot.run().await?;

    Ok(())
}
