use std::sync::Arc;

use rsmux_transport::{connector_for, Connector, DuplexTransport, StatusBroadcast, TransportConfig};
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::reconnect::ReconnectState;
use crate::session::Session;

/// Start a client for `config.url`. Connecting happens in the background.
///
/// Must be called from within a Tokio runtime.
pub fn connect(config: ClientConfig) -> Result<Client> {
    let (connector, framing) = connector_for(&config.url)?;
    let transport = TransportConfig {
        framing,
        max_frame_size: config.max_frame_size,
    };
    Ok(connect_with(config, connector, transport))
}

/// Start a client over an explicit connector.
///
/// Must be called from within a Tokio runtime.
pub fn connect_with(
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    transport_config: TransportConfig,
) -> Client {
    let status = StatusBroadcast::new();
    let transport = DuplexTransport::with_status(connector, transport_config, status.clone());
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (reconnect_tx, reconnect_rx) = watch::channel(ReconnectState::default());

    info!(
        endpoint = transport.endpoint(),
        serializer = config.data_serializer.name(),
        "starting client session"
    );
    let client = Client::new(
        transport.endpoint().to_string(),
        commands,
        status,
        reconnect_rx,
        &config,
    );
    tokio::spawn(Session::new(config, transport, command_rx, reconnect_tx).run());
    client
}
