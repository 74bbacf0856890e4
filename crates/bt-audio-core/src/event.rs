//! Typed bus events.
//!
//! BlueZ reports objects as loosely-typed maps of interface name to property
//! map. Backends translate those into the closed types here at the boundary so
//! the registry can match exhaustively.

use std::collections::BTreeSet;

use crate::path::ObjectPath;

/// BlueZ interfaces the sink reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interface {
    /// `org.bluez.Adapter1`
    Adapter,
    /// `org.bluez.Device1`
    Device,
    /// `org.bluez.MediaTransport1`
    MediaTransport,
    /// `org.bluez.Media1`
    Media,
}

impl Interface {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Adapter => "org.bluez.Adapter1",
            Self::Device => "org.bluez.Device1",
            Self::MediaTransport => "org.bluez.MediaTransport1",
            Self::Media => "org.bluez.Media1",
        }
    }

    /// Parse a D-Bus interface name. Unrecognized names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "org.bluez.Adapter1" => Some(Self::Adapter),
            "org.bluez.Device1" => Some(Self::Device),
            "org.bluez.MediaTransport1" => Some(Self::MediaTransport),
            "org.bluez.Media1" => Some(Self::Media),
            _ => None,
        }
    }
}

/// Set of interfaces carried by an added or removed object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(BTreeSet<Interface>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, interface: Interface) -> bool {
        self.0.contains(&interface)
    }
}

impl FromIterator<Interface> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Interface>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Interface; N]> for CapabilitySet {
    fn from(interfaces: [Interface; N]) -> Self {
        interfaces.into_iter().collect()
    }
}

/// `State` property of a media transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Not streaming.
    Idle,
    /// Streaming requested by the remote, waiting for us to acquire.
    Pending,
    /// Acquired and streaming.
    Active,
}

impl TransportState {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "idle" => Some(Self::Idle),
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            _ => None,
        }
    }
}

/// Properties the sink understands. Anything else is dropped by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    /// `Adapter1.Powered`
    pub powered: Option<bool>,
    /// `Adapter1.Discoverable`
    pub discoverable: Option<bool>,
    /// `Device1.Connected`
    pub connected: Option<bool>,
    /// `Adapter1.Alias` / `Device1.Alias`
    pub alias: Option<String>,
    /// `MediaTransport1.Codec`
    pub codec: Option<u8>,
    /// `MediaTransport1.State`
    pub state: Option<TransportState>,
}

impl PropertySet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay every value present in `other`.
    pub fn merge(&mut self, other: PropertySet) {
        if other.powered.is_some() {
            self.powered = other.powered;
        }
        if other.discoverable.is_some() {
            self.discoverable = other.discoverable;
        }
        if other.connected.is_some() {
            self.connected = other.connected;
        }
        if other.alias.is_some() {
            self.alias = other.alias;
        }
        if other.codec.is_some() {
            self.codec = other.codec;
        }
        if other.state.is_some() {
            self.state = other.state;
        }
    }
}

/// Value written through [`RemoteProperty`](crate::traits::RemoteProperty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    Byte(u8),
    Str(String),
}

/// One object from the stack's snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObject {
    pub path: ObjectPath,
    pub capabilities: CapabilitySet,
    pub properties: PropertySet,
}

/// Notification from the event source, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// Interfaces appeared on an object.
    ObjectAdded {
        path: ObjectPath,
        capabilities: CapabilitySet,
        properties: PropertySet,
    },
    /// Interfaces disappeared from an object.
    ObjectRemoved {
        path: ObjectPath,
        capabilities: CapabilitySet,
    },
    /// Properties of one interface changed.
    PropertiesChanged {
        interface: Interface,
        changed: PropertySet,
        invalidated: Vec<String>,
        path: ObjectPath,
    },
}
