//! Media endpoint registration (`org.bluez.Media1`) and the exported
//! `org.bluez.MediaEndpoint1` object.

use std::sync::Arc;

use async_trait::async_trait;
use bt_audio_core::{EndpointProperties, EndpointService, MediaControl, ObjectPath};
use dbus::arg::{PropMap, RefArg, Variant};
use dbus_crossroads::{Crossroads, IfaceBuilder, IfaceToken};
use tracing::info;

use crate::bus::{dbus_path, BluezBus};
use crate::error::BluezError;

pub const MEDIA_INTERFACE: &str = "org.bluez.Media1";
pub const ENDPOINT_INTERFACE: &str = "org.bluez.MediaEndpoint1";

/// `a{sv}` argument of `RegisterEndpoint`.
pub fn endpoint_record(properties: &EndpointProperties) -> PropMap {
    let mut record = PropMap::new();
    record.insert("UUID".to_string(), variant(properties.uuid.clone()));
    record.insert("Codec".to_string(), variant(properties.codec.id()));
    record.insert("DelayReporting".to_string(), variant(properties.delay_reporting));
    record.insert("Capabilities".to_string(), variant(properties.capabilities.clone()));
    record
}

fn variant<T: RefArg + 'static>(value: T) -> Variant<Box<dyn RefArg>> {
    Variant(Box::new(value))
}

type SetConfigurationArgs = (dbus::Path<'static>, PropMap);

/// Declare `MediaEndpoint1`, dispatching each call to the endpoint stored at
/// the called path.
pub fn register_endpoint_interface(cr: &mut Crossroads) -> IfaceToken<Arc<EndpointService>> {
    cr.register(ENDPOINT_INTERFACE, |b: &mut IfaceBuilder<Arc<EndpointService>>| {
        b.method(
            "SelectConfiguration",
            ("capabilities",),
            ("configuration",),
            |_, endpoint: &mut Arc<EndpointService>, (capabilities,): (Vec<u8>,)| {
                Ok((endpoint.select_configuration(&capabilities),))
            },
        );
        b.method(
            "SetConfiguration",
            ("transport", "properties"),
            (),
            |_, endpoint: &mut Arc<EndpointService>, (transport, _): SetConfigurationArgs| {
                endpoint.set_configuration(&ObjectPath::new(transport.to_string()));
                Ok(())
            },
        );
        b.method(
            "ClearConfiguration",
            ("transport",),
            (),
            |_, endpoint: &mut Arc<EndpointService>, (transport,): (dbus::Path<'static>,)| {
                endpoint.clear_configuration(&ObjectPath::new(transport.to_string()));
                Ok(())
            },
        );
        b.method("Release", (), (), |_, endpoint: &mut Arc<EndpointService>, ()| {
            endpoint.release();
            Ok(())
        });
    })
}

#[async_trait]
impl MediaControl for BluezBus {
    async fn register_endpoint(
        &self,
        adapter: &ObjectPath,
        endpoint: &ObjectPath,
        properties: EndpointProperties,
        responder: Arc<EndpointService>,
    ) -> bt_audio_core::Result<()> {
        self.export_endpoint(endpoint, responder)?;

        let proxy = self.proxy(adapter)?;
        let reply = proxy.method_call::<(), _, _, _>(
            MEDIA_INTERFACE,
            "RegisterEndpoint",
            (dbus_path(endpoint)?, endpoint_record(&properties)),
        );
        reply
            .await
            .map_err(|e| BluezError::call("RegisterEndpoint", e))?;

        info!("Registered {} endpoint {} with {}", properties.codec, endpoint, adapter);
        Ok(())
    }
}
