//! TV Remote GW
//!
//! Remote-control gateway for network-connected TV and media devices. A
//! touch client talks to the gateway over HTTP and a WebSocket; the gateway
//! keeps a device registry, sends named keys, and hosts the touch joystick
//! that turns drags into repeated D-pad presses.

pub mod api;
pub mod config;
pub mod devices;
pub mod input;
pub mod joystick;
pub mod mapping;
