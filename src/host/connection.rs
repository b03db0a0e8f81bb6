//! WebSocket connection to the host application
//!
//! The host launches the plugin with a port and a registration token. We
//! connect, register, then shuttle JSON both ways until either side closes:
//! inbound events go to the engine handle, engine output goes to the socket.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use super::protocol::{encode_outbound, HostEvent, RegisterMessage};
use crate::engine::{Outbound, VolumeActorHandle};

/// Connection parameters handed over by the host on the command line
#[derive(Debug, Clone)]
pub struct HostConnection {
    pub port: u16,
    pub plugin_uuid: String,
    pub register_event: String,
}

impl HostConnection {
    pub fn new(port: u16, plugin_uuid: impl Into<String>, register_event: impl Into<String>) -> Self {
        Self {
            port,
            plugin_uuid: plugin_uuid.into(),
            register_event: register_event.into(),
        }
    }

    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Run the connection until the host closes it or the outbound channel ends
    pub async fn run(
        &self,
        engine: VolumeActorHandle,
        mut outbound: mpsc::Receiver<Outbound>,
    ) -> Result<()> {
        let url = self.url();
        let (ws_stream, _) = connect_async(&url)
            .await
            .with_context(|| format!("Failed to connect to host websocket: {}", url))?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let register = serde_json::to_string(&RegisterMessage {
            event: &self.register_event,
            uuid: &self.plugin_uuid,
        })?;
        ws_writer
            .send(Message::Text(register))
            .await
            .context("Failed to send registration to host")?;

        info!("🔌 Connected to host on {} ({})", url, self.register_event);

        loop {
            tokio::select! {
                incoming = ws_reader.next() => match incoming {
                    Some(Ok(Message::Text(text))) => handle_text(&text, &engine),
                    Some(Ok(Message::Ping(data))) => {
                        ws_writer.send(Message::Pong(data)).await.context("Failed to answer ping")?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Host closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(e).context("Host websocket receive failed");
                    }
                },
                message = outbound.recv() => match message {
                    Some(message) => {
                        let text = encode_outbound(&message)?;
                        trace!(%text, "→ host");
                        ws_writer
                            .send(Message::Text(text))
                            .await
                            .context("Failed to send message to host")?;
                    }
                    None => {
                        debug!("Outbound channel closed, leaving host connection");
                        break;
                    }
                },
            }
        }

        let _ = ws_writer.close().await;
        Ok(())
    }
}

fn handle_text(text: &str, engine: &VolumeActorHandle) {
    match serde_json::from_str::<HostEvent>(text) {
        Ok(event) => {
            trace!(?event, "← host");
            event.dispatch(engine);
        }
        Err(e) => warn!("Ignoring malformed host event: {} ({})", e, text),
    }
}
