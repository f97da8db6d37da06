//! TV Remote GW - touch remote-control gateway
//!
//! Serves the device API and joystick sessions to the touch client.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tvremote_gw::api::{self, ApiState, SessionSettings};
use tvremote_gw::config::{AppConfig, ConfigWatcher, ServerConfig};
use tvremote_gw::devices::{console_factory, DeviceRegistry};
use tvremote_gw::mapping::RemoteKey;

/// TV Remote Gateway - drive TVs and media boxes from a touch screen
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Override the HTTP port from the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// List accepted key names
    #[arg(long)]
    list_keys: bool,

    /// Load and validate the configuration, then exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    if args.list_keys {
        print_keys();
        return Ok(());
    }

    if args.check_config {
        return check_config(&args.config).await;
    }

    info!("Starting TV Remote GW...");
    info!("Configuration file: {}", args.config);

    // Hot reload only makes sense for a file that exists
    let (config_watcher, mut config) = if Path::new(&args.config).exists() {
        let (watcher, config) = ConfigWatcher::new(args.config.clone()).await?;
        info!("Configuration loaded successfully with hot-reload enabled");
        (Some(watcher), config)
    } else {
        warn!("⚠️  {} not found, using default configuration", args.config);
        (None, AppConfig::default())
    };

    let listen = ListenSettings::new(config.server.clone(), args.port);
    if args.port.is_some() {
        config.server = listen.effective();
        config.validate().context("Invalid --port override")?;
    }

    let devices = Arc::new(DeviceRegistry::new(console_factory()));
    register_devices(&devices, &config).await;

    let mut state = ApiState::new(devices.clone(), SessionSettings::from_config(&config));
    if let Some(dir) = &config.server.static_dir {
        if Path::new(dir).is_dir() {
            info!("📁 Serving touch client from {}", dir);
            state = state.with_static_dir(dir);
        } else {
            warn!("⚠️  Touch client directory {} not found, serving the API only", dir);
        }
    }

    run_app(Arc::new(state), listen, config_watcher, shutdown_signal()).await?;

    devices.shutdown_all().await;
    info!("TV Remote GW shutdown complete");
    Ok(())
}

/// Listener settings as read from the file, plus the `--port` override
#[derive(Debug, Clone)]
struct ListenSettings {
    from_file: ServerConfig,
    port_override: Option<u16>,
}

impl ListenSettings {
    fn new(from_file: ServerConfig, port_override: Option<u16>) -> Self {
        Self {
            from_file,
            port_override,
        }
    }

    /// What the server actually binds and serves
    fn effective(&self) -> ServerConfig {
        let mut server = self.from_file.clone();
        if let Some(port) = self.port_override {
            server.port = port;
        }
        server
    }

    /// Whether a reload edited the server section of the file.
    /// The override is not part of the file, so it never counts as an edit.
    fn restart_required(&self, reloaded: &AppConfig) -> bool {
        reloaded.server != self.from_file
    }
}

async fn run_app(
    state: Arc<ApiState>,
    listen: ListenSettings,
    mut config_watcher: Option<ConfigWatcher>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let server_state = state.clone();
    let ServerConfig { host, port, .. } = listen.effective();
    let mut server = tokio::spawn(async move { api::start_server(server_state, &host, port).await });

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(new_config) = next_config(&mut config_watcher) => {
                info!("📝 Configuration file changed, applying...");
                apply_config(&state, &new_config).await;

                if listen.restart_required(&new_config) {
                    warn!("⚠️  Server address changes take effect after restart");
                }
            }

            result = &mut server => {
                return match result {
                    Ok(inner) => inner,
                    Err(e) => Err(anyhow::Error::new(e).context("API server task failed")),
                };
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping server");
                server.abort();
                break;
            }
        }
    }

    Ok(())
}

/// Next reloaded config; never resolves when hot reload is off
async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<AppConfig> {
    match watcher {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

/// Apply a reloaded config: new sessions pick up the joystick settings,
/// newly listed devices are registered
async fn apply_config(state: &ApiState, config: &AppConfig) {
    *state.settings.write() = SessionSettings::from_config(config);

    for device in &config.devices {
        if state.devices.contains(&device.ip) {
            continue;
        }
        if let Err(e) = state.devices.add(&device.ip, device.port).await {
            warn!("⚠️  Failed to register device {}: {}", device.ip, e);
        }
    }

    info!("✅ Configuration applied ({} devices registered)", state.devices.len());
}

async fn register_devices(devices: &DeviceRegistry, config: &AppConfig) {
    for device in &config.devices {
        if let Err(e) = devices.add(&device.ip, device.port).await {
            warn!("⚠️  Failed to register device {}: {}", device.ip, e);
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn print_keys() {
    use colored::*;

    println!("\n{}", "=== Accepted Keys ===".bold().cyan());
    for key in RemoteKey::ALL {
        let line = key.as_str();
        if key.is_directional() || key == RemoteKey::DpadCenter {
            println!("  {}", line.yellow());
        } else {
            println!("  {}", line.green());
        }
    }
    println!(
        "\n  {} media_play_pause, media_stop, media_next, media_previous",
        "aliases:".bold()
    );
}

async fn check_config(path: &str) -> Result<()> {
    use colored::*;

    match AppConfig::load_or_default(path).await {
        Ok(config) => {
            println!("{} {}", "✅ Configuration OK:".green().bold(), path);
            println!(
                "  server {}:{}, joystick size {} ({:?} anchor), {} devices",
                config.server.host,
                config.server.port,
                config.joystick.size,
                config.joystick.anchor,
                config.devices.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "❌ Configuration invalid:".red().bold(), path);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_server() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            ..ServerConfig::default()
        }
    }

    fn reloaded(server: ServerConfig) -> AppConfig {
        AppConfig {
            server,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_port_override_applies_to_listener() {
        let listen = ListenSettings::new(file_server(), Some(9100));
        let effective = listen.effective();
        assert_eq!(effective.port, 9100);
        assert_eq!(effective.host, "127.0.0.1");

        let listen = ListenSettings::new(file_server(), None);
        assert_eq!(listen.effective(), file_server());
    }

    #[test]
    fn test_port_override_is_not_a_server_change() {
        let listen = ListenSettings::new(file_server(), Some(9100));

        // Same file contents (e.g. only the joystick section edited)
        assert!(!listen.restart_required(&reloaded(file_server())));
    }

    #[test]
    fn test_server_edit_requires_restart() {
        let listen = ListenSettings::new(file_server(), Some(9100));

        let mut moved = file_server();
        moved.port = 8080;
        assert!(listen.restart_required(&reloaded(moved)));

        let mut rehosted = file_server();
        rehosted.host = "0.0.0.0".to_string();
        assert!(listen.restart_required(&reloaded(rehosted)));

        let mut no_client = file_server();
        no_client.static_dir = None;
        assert!(listen.restart_required(&reloaded(no_client)));
    }
}
