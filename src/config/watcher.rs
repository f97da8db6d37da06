//! Configuration file watcher for hot-reload support
//!
//! Editors rarely save in one write: a save shows up as a burst of modify
//! events. The notify callback only signals "something changed"; a single
//! task collects the burst and re-reads the file once it has been quiet for
//! [`RELOAD_DEBOUNCE`].

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Quiet period after the last file event before the config is re-read
pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the config file and yields each successfully reloaded config
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    reloads: mpsc::Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Load the config file and start watching it
    ///
    /// # Returns
    /// The watcher and the initially loaded configuration
    pub async fn new(config_path: String) -> Result<(Self, AppConfig)> {
        let initial_config = AppConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;

        let (change_tx, change_rx) = mpsc::unbounded_channel::<()>();
        let (reload_tx, reloads) = mpsc::channel(10);

        // Runs on notify's own thread: signal only, never block
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                    debug!("Config file event: {:?}", event.kind);
                    let _ = change_tx.send(());
                }
                Ok(_) => {}
                Err(e) => error!("Watch error: {}", e),
            }
        })?;

        watcher
            .watch(Path::new(&config_path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", config_path))?;

        tokio::spawn(reload_loop(config_path.clone(), change_rx, reload_tx));

        info!("👀 Config file watcher started for: {}", config_path);

        Ok((
            Self {
                _watcher: watcher,
                reloads,
            },
            initial_config,
        ))
    }

    /// Wait for the next config update
    /// Returns None if the watcher has been closed
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.reloads.recv().await
    }
}

/// Coalesce change bursts into one reload each
async fn reload_loop(
    config_path: String,
    mut changes: mpsc::UnboundedReceiver<()>,
    reloads: mpsc::Sender<AppConfig>,
) {
    while changes.recv().await.is_some() {
        // Every further event inside the window restarts the wait
        loop {
            match tokio::time::timeout(RELOAD_DEBOUNCE, changes.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        match AppConfig::load(&config_path).await {
            Ok(new_config) => {
                info!("🔄 Configuration reloaded");
                if reloads.send(new_config).await.is_err() {
                    debug!("Config watcher dropped, stopping reload task");
                    return;
                }
            }
            Err(e) => {
                warn!("Failed to reload config (keeping old config): {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_watcher_basic() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("test-config.yaml");

        fs::write(&config_path, "joystick:\n  size: 150\n")?;

        let (mut watcher, config) =
            ConfigWatcher::new(config_path.to_string_lossy().to_string()).await?;

        assert_eq!(config.joystick.size, 150.0);

        let modified_config = r#"
joystick:
  size: 200
navigation:
  deadzone: 0.5
devices:
  - ip: "192.168.1.20"
"#;

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&config_path, modified_config)?;

        let new_config =
            tokio::time::timeout(Duration::from_secs(2), watcher.next_config()).await?;

        let new_config = new_config.expect("watcher closed");
        assert_eq!(new_config.joystick.size, 200.0);
        assert_eq!(new_config.navigation.deadzone, 0.5);
        assert_eq!(new_config.devices.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_burst_of_writes_reloads_once() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("burst.yaml");
        fs::write(&config_path, "joystick:\n  size: 150\n")?;

        let (mut watcher, _) =
            ConfigWatcher::new(config_path.to_string_lossy().to_string()).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Five truncating writes, closer together than the debounce window
        for size in [160, 170, 180, 190, 200] {
            fs::write(&config_path, format!("joystick:\n  size: {}\n", size))?;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let first = tokio::time::timeout(Duration::from_secs(2), watcher.next_config()).await?;
        assert_eq!(first.expect("watcher closed").joystick.size, 200.0);

        let extra = tokio::time::timeout(Duration::from_millis(500), watcher.next_config()).await;
        assert!(extra.is_err(), "burst produced more than one reload");

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_reload_is_skipped() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("skip.yaml");
        fs::write(&config_path, "joystick:\n  size: 150\n")?;

        let (mut watcher, _) =
            ConfigWatcher::new(config_path.to_string_lossy().to_string()).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&config_path, "joystick:\n  size: -1\n")?;
        let skipped = tokio::time::timeout(Duration::from_millis(500), watcher.next_config()).await;
        assert!(skipped.is_err());

        fs::write(&config_path, "joystick:\n  size: 120\n")?;
        let next = tokio::time::timeout(Duration::from_secs(2), watcher.next_config()).await?;
        assert_eq!(next.expect("watcher closed").joystick.size, 120.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_config_watcher_requires_valid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.yaml");
        fs::write(&config_path, "joystick: { size: -1 }").unwrap();

        let result = ConfigWatcher::new(config_path.to_string_lossy().to_string()).await;
        assert!(result.is_err());
    }
}
