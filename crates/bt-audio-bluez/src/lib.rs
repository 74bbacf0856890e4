//! # bt-audio-bluez
//!
//! BlueZ D-Bus backends for the bt-audio A2DP sink.
//!
//! [`BluezBus`] implements every Bluetooth-side collaborator trait of
//! `bt-audio-core` over one system bus connection:
//!
//! - `PathEventSource`: `GetManagedObjects` plus the ObjectManager and
//!   Properties signals, translated to typed events
//! - `RemoteProperty`: `org.freedesktop.DBus.Properties` Get/Set
//! - `MediaControl`: `Media1.RegisterEndpoint`, serving `MediaEndpoint1`
//! - `AgentManager`: `AgentManager1`, serving `Agent1`
//!
//! ## Requirements
//!
//! This crate is Linux-only and requires the BlueZ daemon. Use
//! `SystemSetup::check()` to verify the host.

#![cfg(target_os = "linux")]

pub mod agent;
pub mod bus;
pub mod error;
pub mod events;
pub mod media;
pub mod properties;
pub mod setup;

pub use bus::BluezBus;
pub use error::{BluezError, Result};
pub use setup::{ComponentStatus, SetupIssue, SetupStatus, SystemSetup};
