//! `org.freedesktop.DBus.Properties` reads and writes on BlueZ objects.

use async_trait::async_trait;
use bt_audio_core::{Interface, ObjectPath, PropertyValue, RemoteProperty};
use dbus::arg::{cast, RefArg, Variant};
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;
use tracing::debug;

use crate::bus::BluezBus;
use crate::error::BluezError;

/// Typed view of a property variant.
pub fn property_value(
    name: &str,
    value: &Variant<Box<dyn RefArg>>,
) -> Result<PropertyValue, BluezError> {
    let inner: &(dyn RefArg + 'static) = &*value.0;
    if let Some(v) = cast::<bool>(inner) {
        Ok(PropertyValue::Bool(*v))
    } else if let Some(v) = cast::<u8>(inner) {
        Ok(PropertyValue::Byte(*v))
    } else if let Some(v) = cast::<String>(inner) {
        Ok(PropertyValue::Str(v.clone()))
    } else {
        Err(BluezError::UnsupportedValue(name.to_string()))
    }
}

#[async_trait]
impl RemoteProperty for BluezBus {
    async fn get(
        &self,
        object: &ObjectPath,
        interface: Interface,
        name: &str,
    ) -> bt_audio_core::Result<PropertyValue> {
        let proxy = self.proxy(object)?;
        let value: Variant<Box<dyn RefArg>> = proxy
            .get(interface.name(), name)
            .await
            .map_err(|e| BluezError::call(name, e))?;
        Ok(property_value(name, &value)?)
    }

    async fn set(
        &self,
        object: &ObjectPath,
        interface: Interface,
        name: &str,
        value: PropertyValue,
    ) -> bt_audio_core::Result<()> {
        let proxy = self.proxy(object)?;
        debug!("Set {}.{} on {} to {:?}", interface.name(), name, object, value);

        let reply = match value {
            PropertyValue::Bool(v) => proxy.set(interface.name(), name, v),
            PropertyValue::Byte(v) => proxy.set(interface.name(), name, v),
            PropertyValue::Str(v) => proxy.set(interface.name(), name, v),
        };
        reply.await.map_err(|e| BluezError::call(name, e))?;
        Ok(())
    }
}
