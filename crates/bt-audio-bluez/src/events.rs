//! Object snapshot and change notifications from BlueZ.
//!
//! `GetManagedObjects` and the `InterfacesAdded`, `InterfacesRemoved` and
//! `PropertiesChanged` signals carry string-keyed maps of variants. They are
//! translated into [`BusEvent`]s here; unknown interfaces and properties are
//! dropped.

use std::collections::HashMap;

use async_trait::async_trait;
use bt_audio_core::{
    BusEvent, BusEventStream, CapabilitySet, Interface, ManagedObject, ObjectPath, PathEventSource,
    PropertySet, TransportState,
};
use dbus::arg::{prop_cast, PropMap};
use dbus::blocking::stdintf::org_freedesktop_dbus::{
    ObjectManagerInterfacesAdded, ObjectManagerInterfacesRemoved, PropertiesPropertiesChanged,
};
use dbus::message::SignalArgs;
use dbus::nonblock::stdintf::org_freedesktop_dbus::ObjectManager;
use futures::StreamExt;
use tracing::{debug, trace};

use crate::bus::{BluezBus, BLUEZ_SERVICE, CALL_TIMEOUT};
use crate::error::BluezError;

/// Capabilities among the interface names of one object.
pub fn capabilities<'a>(names: impl IntoIterator<Item = &'a String>) -> CapabilitySet {
    names
        .into_iter()
        .filter_map(|name| Interface::from_name(name))
        .collect()
}

/// Recognized properties in one interface's property map.
pub fn properties(map: &PropMap) -> PropertySet {
    PropertySet {
        powered: prop_cast::<bool>(map, "Powered").copied(),
        discoverable: prop_cast::<bool>(map, "Discoverable").copied(),
        connected: prop_cast::<bool>(map, "Connected").copied(),
        alias: prop_cast::<String>(map, "Alias").cloned(),
        codec: prop_cast::<u8>(map, "Codec").copied(),
        state: prop_cast::<String>(map, "State").and_then(|s| TransportState::parse(s)),
    }
}

/// Merge the properties of every recognized interface on one object.
pub fn object_properties(interfaces: &HashMap<String, PropMap>) -> PropertySet {
    let mut merged = PropertySet::default();
    for (name, map) in interfaces {
        if Interface::from_name(name).is_some() {
            merged.merge(properties(map));
        }
    }
    merged
}

pub fn managed_object(path: &str, interfaces: &HashMap<String, PropMap>) -> ManagedObject {
    ManagedObject {
        path: ObjectPath::new(path),
        capabilities: capabilities(interfaces.keys()),
        properties: object_properties(interfaces),
    }
}

pub fn interfaces_added(signal: ObjectManagerInterfacesAdded) -> BusEvent {
    BusEvent::ObjectAdded {
        path: ObjectPath::new(signal.object.to_string()),
        capabilities: capabilities(signal.interfaces.keys()),
        properties: object_properties(&signal.interfaces),
    }
}

pub fn interfaces_removed(signal: ObjectManagerInterfacesRemoved) -> BusEvent {
    BusEvent::ObjectRemoved {
        path: ObjectPath::new(signal.object.to_string()),
        capabilities: capabilities(signal.interfaces.iter()),
    }
}

/// `None` for interfaces the sink does not track.
pub fn properties_changed(path: &str, signal: PropertiesPropertiesChanged) -> Option<BusEvent> {
    let interface = Interface::from_name(&signal.interface_name)?;
    Some(BusEvent::PropertiesChanged {
        interface,
        changed: properties(&signal.changed_properties),
        invalidated: signal.invalidated_properties,
        path: ObjectPath::new(path),
    })
}

#[async_trait]
impl PathEventSource for BluezBus {
    async fn snapshot(&self) -> bt_audio_core::Result<Vec<ManagedObject>> {
        let connection = self.connection().clone();
        let proxy = dbus::nonblock::Proxy::new(BLUEZ_SERVICE, "/", CALL_TIMEOUT, connection);
        let objects = proxy
            .get_managed_objects()
            .await
            .map_err(|e| BluezError::call("GetManagedObjects", e))?;

        debug!("BlueZ manages {} object(s)", objects.len());
        Ok(objects
            .iter()
            .map(|(path, interfaces)| managed_object(path, interfaces))
            .collect())
    }

    async fn subscribe(&self) -> bt_audio_core::Result<BusEventStream> {
        let conn = self.connection();

        let added_rule = ObjectManagerInterfacesAdded::match_rule(None, None).static_clone();
        let (added_match, added) = conn
            .add_match(added_rule)
            .await
            .map_err(|e| BluezError::call("AddMatch", e))?
            .stream::<ObjectManagerInterfacesAdded>();

        let removed_rule = ObjectManagerInterfacesRemoved::match_rule(None, None).static_clone();
        let (removed_match, removed) = conn
            .add_match(removed_rule)
            .await
            .map_err(|e| BluezError::call("AddMatch", e))?
            .stream::<ObjectManagerInterfacesRemoved>();

        let changed_rule = PropertiesPropertiesChanged::match_rule(None, None).static_clone();
        let (changed_match, changed) = conn
            .add_match(changed_rule)
            .await
            .map_err(|e| BluezError::call("AddMatch", e))?
            .stream::<PropertiesPropertiesChanged>();

        self.keep_match(added_match);
        self.keep_match(removed_match);
        self.keep_match(changed_match);

        let added = added.map(|(_, signal)| Some(interfaces_added(signal)));
        let removed = removed.map(|(_, signal)| Some(interfaces_removed(signal)));
        let changed = changed.map(|(msg, signal)| {
            let path = msg.path()?.to_string();
            trace!("PropertiesChanged {} {}", path, signal.interface_name);
            properties_changed(&path, signal)
        });

        let events = futures::stream::select(added, futures::stream::select(removed, changed))
            .filter_map(|event| async move { event });
        Ok(events.boxed())
    }
}
