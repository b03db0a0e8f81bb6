//! Host wire protocol (Stream Deck style JSON events)
//!
//! Inbound events are tagged by `event` and addressed by `context` (one per
//! dial instance). Only the events the engine reacts to are modelled; the rest
//! deserialize to `HostEvent::Other` and are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::engine::{Outbound, VolumeActorHandle};

/// Settings key a rotation event may carry to override the stored step
const STEP_KEY: &str = "step";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SettingsPayload {
    #[serde(default)]
    pub settings: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RotatePayload {
    pub ticks: i64,
    #[serde(default)]
    pub settings: Value,
}

/// Event received from the host
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    /// A dial became visible
    WillAppear {
        context: String,
        #[serde(default)]
        payload: SettingsPayload,
    },
    /// A dial went away (page switch, profile change, removal)
    WillDisappear { context: String },
    /// Settings of a dial changed in the property inspector
    DidReceiveSettings {
        context: String,
        #[serde(default)]
        payload: SettingsPayload,
    },
    DialRotate {
        context: String,
        payload: RotatePayload,
    },
    DialDown { context: String },
    KeyDown { context: String },
    TouchTap { context: String },
    #[serde(other)]
    Other,
}

impl HostEvent {
    /// Forward the event to the engine
    pub fn dispatch(self, engine: &VolumeActorHandle) {
        match self {
            HostEvent::WillAppear { context, payload } => {
                engine.register(context, payload.settings);
            }
            HostEvent::WillDisappear { context } => {
                engine.unregister(context);
            }
            HostEvent::DidReceiveSettings { context, payload } => {
                engine.update_config(context, payload.settings);
            }
            HostEvent::DialRotate { context, payload } => {
                let step_override = payload.settings.get(STEP_KEY).cloned();
                engine.rotate(context, payload.ticks, step_override);
            }
            HostEvent::DialDown { context }
            | HostEvent::KeyDown { context }
            | HostEvent::TouchTap { context } => {
                engine.toggle_mute(context);
            }
            HostEvent::Other => trace!("Ignoring host event"),
        }
    }
}

/// First message sent after connecting
#[derive(Debug, Serialize)]
pub struct RegisterMessage<'a> {
    pub event: &'a str,
    pub uuid: &'a str,
}

#[derive(Debug, Serialize)]
struct Indicator {
    value: u8,
    opacity: f32,
}

#[derive(Debug, Serialize)]
struct FeedbackPayload<'a> {
    value: &'a str,
    indicator: Indicator,
}

#[derive(Debug, Serialize)]
struct LogPayload<'a> {
    message: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum WireMessage<'a> {
    SetFeedback {
        context: &'a str,
        payload: FeedbackPayload<'a>,
    },
    LogMessage {
        payload: LogPayload<'a>,
    },
}

/// Encode an engine message for the host
pub fn encode_outbound(message: &Outbound) -> serde_json::Result<String> {
    let wire = match message {
        Outbound::Feedback { session, display } => WireMessage::SetFeedback {
            context: session,
            payload: FeedbackPayload {
                value: &display.text,
                indicator: Indicator {
                    value: display.indicator,
                    opacity: display.opacity,
                },
            },
        },
        Outbound::Diagnostic(line) => WireMessage::LogMessage {
            payload: LogPayload { message: line },
        },
    };
    serde_json::to_string(&wire)
}
