//! Device registry
//!
//! In-memory map of controllable devices keyed by IPv4 address. Each entry
//! owns its driver; removing a device shuts its driver down.

pub mod driver;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::mapping::RemoteKey;
pub use driver::{console_factory, ConsoleDriver, DriverFactory, RemoteDriver};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("invalid device address '{0}' (expected IPv4)")]
    InvalidAddress(String),

    #[error("invalid port {0}")]
    InvalidPort(u16),

    #[error("device {0} not found")]
    NotFound(String),

    #[error("device {ip}: {message}")]
    Driver { ip: String, message: String },
}

/// Network address of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAddress {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl DeviceAddress {
    /// Parse and validate an address as received from the API or config
    pub fn parse(ip: &str, port: u16) -> Result<Self, DeviceError> {
        let ip = parse_ip(ip)?;
        if port == 0 {
            return Err(DeviceError::InvalidPort(port));
        }
        Ok(Self { ip, port })
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

fn parse_ip(ip: &str) -> Result<Ipv4Addr, DeviceError> {
    ip.trim()
        .parse()
        .map_err(|_| DeviceError::InvalidAddress(ip.to_string()))
}

/// Public view of a registered device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub ip: String,
    pub port: u16,
    pub added_at: DateTime<Utc>,
}

struct DeviceEntry {
    address: DeviceAddress,
    added_at: DateTime<Utc>,
    driver: Arc<dyn RemoteDriver>,
}

/// Registry of devices, shared between API handlers and sessions
pub struct DeviceRegistry {
    devices: RwLock<BTreeMap<Ipv4Addr, DeviceEntry>>,
    factory: DriverFactory,
}

impl DeviceRegistry {
    pub fn new(factory: DriverFactory) -> Self {
        Self {
            devices: RwLock::new(BTreeMap::new()),
            factory,
        }
    }

    /// Register a device, replacing any entry with the same ip
    ///
    /// # Arguments
    /// * `ip` - IPv4 address as text
    /// * `port` - Control port on the device
    ///
    /// # Returns
    /// The registered device, or an error if the address is invalid or the
    /// driver fails to connect
    pub async fn add(&self, ip: &str, port: u16) -> Result<DeviceInfo, DeviceError> {
        let address = DeviceAddress::parse(ip, port)?;
        let driver = (self.factory)(&address);

        driver.init().await.map_err(|e| DeviceError::Driver {
            ip: address.ip.to_string(),
            message: format!("{:#}", e),
        })?;

        let entry = DeviceEntry {
            address,
            added_at: Utc::now(),
            driver,
        };
        let info = entry.info();

        let replaced = self.devices.write().insert(address.ip, entry);
        match replaced {
            Some(old) => {
                info!("🔁 Device {} replaced ({} → {})", address.ip, old.address, address);
                shutdown_driver(&old.driver).await;
            }
            None => info!("➕ Device {} added", address),
        }

        Ok(info)
    }

    /// Unregister a device and shut its driver down
    pub async fn remove(&self, ip: &str) -> Result<(), DeviceError> {
        let key = parse_ip(ip)?;
        let entry = self
            .devices
            .write()
            .remove(&key)
            .ok_or_else(|| DeviceError::NotFound(ip.to_string()))?;

        info!("➖ Device {} removed", entry.address);
        shutdown_driver(&entry.driver).await;
        Ok(())
    }

    /// Registered ips, sorted
    pub fn list(&self) -> Vec<String> {
        self.devices.read().keys().map(|ip| ip.to_string()).collect()
    }

    pub fn get(&self, ip: &str) -> Result<DeviceInfo, DeviceError> {
        let key = parse_ip(ip)?;
        self.devices
            .read()
            .get(&key)
            .map(DeviceEntry::info)
            .ok_or_else(|| DeviceError::NotFound(ip.to_string()))
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.get(ip).is_ok()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Driver handle for a device (the lock is not held while it is used)
    pub fn driver(&self, ip: &str) -> Result<Arc<dyn RemoteDriver>, DeviceError> {
        let key = parse_ip(ip)?;
        self.devices
            .read()
            .get(&key)
            .map(|entry| entry.driver.clone())
            .ok_or_else(|| DeviceError::NotFound(ip.to_string()))
    }

    pub async fn send_key(&self, ip: &str, key: RemoteKey) -> Result<(), DeviceError> {
        let driver = self.driver(ip)?;
        driver.send_key(key).await.map_err(|e| DeviceError::Driver {
            ip: ip.to_string(),
            message: format!("{:#}", e),
        })
    }

    pub async fn send_text(&self, ip: &str, text: &str) -> Result<(), DeviceError> {
        let driver = self.driver(ip)?;
        driver.send_text(text).await.map_err(|e| DeviceError::Driver {
            ip: ip.to_string(),
            message: format!("{:#}", e),
        })
    }

    /// Shut down every driver (process exit)
    pub async fn shutdown_all(&self) {
        let drivers: Vec<_> = std::mem::take(&mut *self.devices.write())
            .into_values()
            .map(|entry| entry.driver)
            .collect();

        for driver in drivers {
            shutdown_driver(&driver).await;
        }
    }
}

impl DeviceEntry {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            ip: self.address.ip.to_string(),
            port: self.address.port,
            added_at: self.added_at,
        }
    }
}

async fn shutdown_driver(driver: &Arc<dyn RemoteDriver>) {
    if let Err(e) = driver.shutdown().await {
        warn!("⚠️  Driver '{}' shutdown failed: {:#}", driver.name(), e);
    }
}
