//! ---
//! fleet_section: "02-messaging-data-model"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Wire formats for telemetry messages."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::{Message, Result};

/// Encoding applied to messages before they reach a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// UTF-8 JSON; newline-delimited on stream transports.
    #[default]
    Json,
    /// CBOR; length-prefixed on stream transports.
    Cbor,
}

impl WireFormat {
    /// Serialize a message.
    pub fn encode(self, message: &Message) -> Result<Vec<u8>> {
        Ok(match self {
            WireFormat::Json => serde_json::to_vec(message)?,
            WireFormat::Cbor => serde_cbor::to_vec(message)?,
        })
    }

    /// Deserialize a message previously produced by [`encode`](Self::encode).
    pub fn decode(self, bytes: &[u8]) -> Result<Message> {
        Ok(match self {
            WireFormat::Json => serde_json::from_slice(bytes)?,
            WireFormat::Cbor => serde_cbor::from_slice(bytes)?,
        })
    }

    /// Short name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            WireFormat::Json => "json",
            WireFormat::Cbor => "cbor",
        }
    }
}

impl std::str::FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(WireFormat::Json),
            "cbor" => Ok(WireFormat::Cbor),
            other => Err(format!("unknown wire format: {}", other)),
        }
    }
}
