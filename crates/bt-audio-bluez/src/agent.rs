//! Pairing agent: `org.bluez.AgentManager1` calls and the exported
//! `org.bluez.Agent1` object.

use std::sync::Arc;

use async_trait::async_trait;
use bt_audio_core::{AgentCapability, AgentManager, AgentService, ObjectPath};
use dbus_crossroads::{Crossroads, IfaceBuilder, IfaceToken, MethodErr};
use tracing::info;

use crate::bus::{dbus_path, BluezBus};
use crate::error::BluezError;

pub const AGENT_MANAGER_INTERFACE: &str = "org.bluez.AgentManager1";
pub const AGENT_INTERFACE: &str = "org.bluez.Agent1";

/// Error name BlueZ expects when an agent refuses a request.
pub const REJECTED: &str = "org.bluez.Error.Rejected";

/// Declare `Agent1`, dispatching each call to the agent stored at the called path.
pub fn register_agent_interface(cr: &mut Crossroads) -> IfaceToken<Arc<AgentService>> {
    cr.register(AGENT_INTERFACE, |b: &mut IfaceBuilder<Arc<AgentService>>| {
        b.method(
            "AuthorizeService",
            ("device", "uuid"),
            (),
            |_, agent: &mut Arc<AgentService>, (device, uuid): (dbus::Path<'static>, String)| {
                agent
                    .authorize_service(&ObjectPath::new(device.to_string()), &uuid)
                    .map_err(|e| MethodErr::from((REJECTED, e.to_string())))
            },
        );
        b.method("Release", (), (), |_, agent: &mut Arc<AgentService>, ()| {
            agent.release();
            Ok(())
        });
        b.method("Cancel", (), (), |_, agent: &mut Arc<AgentService>, ()| {
            agent.cancel();
            Ok(())
        });
    })
}

#[async_trait]
impl AgentManager for BluezBus {
    async fn register_agent(
        &self,
        agent: &ObjectPath,
        capability: AgentCapability,
        responder: Arc<AgentService>,
    ) -> bt_audio_core::Result<()> {
        self.export_agent(agent, responder)?;

        let proxy = self.proxy(&ObjectPath::new("/org/bluez"))?;
        let reply = proxy.method_call::<(), _, _, _>(
            AGENT_MANAGER_INTERFACE,
            "RegisterAgent",
            (dbus_path(agent)?, capability.as_str()),
        );
        reply.await.map_err(|e| BluezError::call("RegisterAgent", e))?;

        info!("Registered {} agent {}", capability, agent);
        Ok(())
    }

    async fn request_default_agent(&self, agent: &ObjectPath) -> bt_audio_core::Result<()> {
        let proxy = self.proxy(&ObjectPath::new("/org/bluez"))?;
        let reply = proxy.method_call::<(), _, _, _>(
            AGENT_MANAGER_INTERFACE,
            "RequestDefaultAgent",
            (dbus_path(agent)?,),
        );
        reply
            .await
            .map_err(|e| BluezError::call("RequestDefaultAgent", e))?;
        Ok(())
    }
}
