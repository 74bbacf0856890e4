//! System bus connection shared by every BlueZ backend.
//!
//! One `SyncConnection` carries both the outgoing calls to `org.bluez` and the
//! incoming calls to the endpoint and agent objects we export. Exported
//! objects live in a single `Crossroads` tree fed by the connection's
//! method-call receiver.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bt_audio_core::{AgentService, EndpointService, ObjectPath};
use dbus::channel::MatchingReceiver;
use dbus::message::MatchRule;
use dbus::nonblock::{MsgMatch, Proxy, SyncConnection};
use dbus_crossroads::{Crossroads, IfaceToken};
use tracing::{debug, error, info};

use crate::agent::register_agent_interface;
use crate::error::{BluezError, Result};
use crate::media::register_endpoint_interface;

/// Well-known bus name of the BlueZ daemon.
pub const BLUEZ_SERVICE: &str = "org.bluez";

/// Timeout for calls to BlueZ.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection to the system bus plus the objects we serve on it.
pub struct BluezBus {
    conn: Arc<SyncConnection>,
    server: Arc<Mutex<Crossroads>>,
    endpoint_iface: IfaceToken<Arc<EndpointService>>,
    agent_iface: IfaceToken<Arc<AgentService>>,
    matches: Mutex<Vec<MsgMatch>>,
}

impl BluezBus {
    /// Connect to the system bus and start serving exported objects.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect() -> Result<Self> {
        let (resource, conn) = dbus_tokio::connection::new_system_sync()
            .map_err(|e| BluezError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            let err = resource.await;
            error!("Lost connection to D-Bus: {}", err);
        });

        let mut cr = Crossroads::new();
        let endpoint_iface = register_endpoint_interface(&mut cr);
        let agent_iface = register_agent_interface(&mut cr);
        let server = Arc::new(Mutex::new(cr));

        let handler = server.clone();
        conn.start_receive(
            MatchRule::new_method_call(),
            Box::new(move |msg, conn| {
                match handler.lock() {
                    Ok(mut cr) => {
                        if cr.handle_message(msg, conn).is_err() {
                            debug!("Unhandled method call");
                        }
                    }
                    Err(_) => error!("Object server lock poisoned"),
                }
                true
            }),
        );

        info!("Connected to system bus as {}", conn.unique_name());

        Ok(Self {
            conn,
            server,
            endpoint_iface,
            agent_iface,
            matches: Mutex::new(Vec::new()),
        })
    }

    pub fn connection(&self) -> &Arc<SyncConnection> {
        &self.conn
    }

    /// Proxy for a BlueZ object.
    pub fn proxy(&self, path: &ObjectPath) -> Result<Proxy<'static, Arc<SyncConnection>>> {
        Ok(Proxy::new(BLUEZ_SERVICE, dbus_path(path)?, CALL_TIMEOUT, self.conn.clone()))
    }

    /// Serve `MediaEndpoint1` at `path`, replacing anything already there.
    pub fn export_endpoint(&self, path: &ObjectPath, endpoint: Arc<EndpointService>) -> Result<()> {
        let path = dbus_path(path)?;
        let mut cr = self.lock_server()?;
        cr.remove::<Arc<EndpointService>>(&path);
        cr.insert(path, [&self.endpoint_iface], endpoint);
        Ok(())
    }

    /// Serve `Agent1` at `path`, replacing anything already there.
    pub fn export_agent(&self, path: &ObjectPath, agent: Arc<AgentService>) -> Result<()> {
        let path = dbus_path(path)?;
        let mut cr = self.lock_server()?;
        cr.remove::<Arc<AgentService>>(&path);
        cr.insert(path, [&self.agent_iface], agent);
        Ok(())
    }

    /// Keep a signal match alive for as long as the bus.
    pub(crate) fn keep_match(&self, msg_match: MsgMatch) {
        if let Ok(mut matches) = self.matches.lock() {
            matches.push(msg_match);
        }
    }

    fn lock_server(&self) -> Result<std::sync::MutexGuard<'_, Crossroads>> {
        self.server
            .lock()
            .map_err(|_| BluezError::Connection("object server lock poisoned".to_string()))
    }
}

/// Convert an object path for the wire.
pub fn dbus_path(path: &ObjectPath) -> Result<dbus::Path<'static>> {
    dbus::Path::new(path.as_str().to_string()).map_err(BluezError::InvalidPath)
}
