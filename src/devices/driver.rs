//! Device drivers
//!
//! A driver turns [`RemoteKey`] presses and text input into whatever the
//! target device understands. The registry owns one driver per device.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::DeviceAddress;
use crate::mapping::RemoteKey;

/// Driver trait - every device integration implements this
///
/// Note: All methods take &self (not &mut self) to support Arc<dyn RemoteDriver>.
/// Drivers should use interior mutability for mutable state.
#[async_trait]
pub trait RemoteDriver: Send + Sync {
    /// Get the driver name (e.g., "console")
    fn name(&self) -> &str;

    /// Connect to the device
    async fn init(&self) -> Result<()>;

    /// Send one key press
    async fn send_key(&self, key: RemoteKey) -> Result<()>;

    /// Send a text string (on-screen keyboard input)
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Disconnect gracefully
    async fn shutdown(&self) -> Result<()>;
}

/// Builds the driver for a newly registered device
pub type DriverFactory = Arc<dyn Fn(&DeviceAddress) -> Arc<dyn RemoteDriver> + Send + Sync>;

/// Factory producing a [`ConsoleDriver`] per device
pub fn console_factory() -> DriverFactory {
    Arc::new(|address: &DeviceAddress| -> Arc<dyn RemoteDriver> {
        Arc::new(ConsoleDriver::new(address.to_string()))
    })
}

/// ConsoleDriver logs every command instead of talking to a device
///
/// This is useful for:
/// - Driving the touch client without a TV on the network
/// - Checking joystick repeat timing from the logs
pub struct ConsoleDriver {
    name: String,
    initialized: Arc<RwLock<bool>>,
    /// Command counter for debugging
    command_count: Arc<RwLock<u64>>,
}

impl ConsoleDriver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initialized: Arc::new(RwLock::new(false)),
            command_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Number of commands logged since init
    pub async fn command_count(&self) -> u64 {
        *self.command_count.read().await
    }

    async fn log_command(&self, command: &str, detail: &str) {
        if !*self.initialized.read().await {
            warn!("⚠️  ConsoleDriver '{}' not initialized, dropping {}", self.name, command);
            return;
        }

        let mut count = self.command_count.write().await;
        *count += 1;
        let command_num = *count;
        drop(count);

        info!(
            "📺 [{}] Device '{}' → {} {} [cmd #{}]",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.name,
            command,
            detail,
            command_num
        );

        debug!(
            device = self.name,
            command = command,
            detail = detail,
            command_count = command_num,
            "ConsoleDriver command"
        );
    }
}

#[async_trait]
impl RemoteDriver for ConsoleDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self) -> Result<()> {
        *self.initialized.write().await = true;
        *self.command_count.write().await = 0;

        info!("✅ ConsoleDriver '{}' connected", self.name);
        Ok(())
    }

    async fn send_key(&self, key: RemoteKey) -> Result<()> {
        self.log_command("key", key.as_str()).await;
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.log_command("text", &format!("{:?}", text)).await;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if *self.initialized.read().await {
            let final_count = *self.command_count.read().await;
            info!(
                "🛑 ConsoleDriver '{}' disconnecting (sent {} commands)",
                self.name, final_count
            );
        }

        *self.initialized.write().await = false;
        Ok(())
    }
}
