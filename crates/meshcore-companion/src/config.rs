//! Protocol configuration.
//!
//! All fields have defaults matching stock companion firmware, so an empty
//! document is a valid configuration:
//!
//! ```yaml
//! transport: delimited        # or "transparent" for BLE
//! inbound_marker: ">"
//! outbound_marker: "<"
//! max_frame_len: 172          # optional desync guard
//! discovery_key: prefix       # or "full"
//! dispatch:
//!   channel_message: [8]
//!   channel_message_echo: [17]
//! ```

use serde::{Deserialize, Serialize};

use crate::builders::Command;
use crate::constants::*;
use crate::decode::ChannelMessageVariant;
use crate::frame::{
    encode_delimited_with_marker, encode_transparent, FrameReassembler, TransportMode,
};
use crate::types::DiscoveryKeyLength;

/// Settings shared by a reassembler, the encoders and the message dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Framing used on the link.
    pub transport: TransportMode,
    /// Start marker of device→host frames.
    #[serde(with = "marker")]
    pub inbound_marker: u8,
    /// Start marker of host→device frames.
    #[serde(with = "marker")]
    pub outbound_marker: u8,
    /// Largest declared frame length accepted before resynchronising.
    pub max_frame_len: Option<usize>,
    /// Key length carried by discovery responses, matching the requests sent.
    pub discovery_key: DiscoveryKeyLength,
    /// Opcode routing for payload decoders.
    pub dispatch: DispatchTable,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            transport: TransportMode::default(),
            inbound_marker: FRAME_MARKER_INBOUND,
            outbound_marker: FRAME_MARKER_OUTBOUND,
            max_frame_len: None,
            discovery_key: DiscoveryKeyLength::default(),
            dispatch: DispatchTable::default(),
        }
    }
}

impl ProtocolConfig {
    /// A fresh reassembler for one connection.
    pub fn reassembler(&self) -> FrameReassembler {
        FrameReassembler::from_config(self)
    }

    /// Encode a command for the configured transport and outbound marker.
    pub fn encode(&self, command: &Command) -> Vec<u8> {
        match self.transport {
            TransportMode::Delimited => {
                encode_delimited_with_marker(self.outbound_marker, command.opcode, &command.payload)
            }
            TransportMode::Transparent => encode_transparent(command.opcode, &command.payload),
        }
    }
}

/// Decoder selected for an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Contact record.
    Contact,
    /// Channel descriptor.
    ChannelInfo,
    /// Channel text message in the given layout.
    ChannelMessage(ChannelMessageVariant),
    /// Raw RX log record.
    RadioLog,
    /// Control data push.
    ControlData,
}

/// Which opcodes carry which payload layout.
///
/// Channel text messages use a firmware-specific layout, so no opcode is
/// routed to that decoder unless configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchTable {
    /// Opcodes carrying a contact record.
    pub contact: Vec<u8>,
    /// Opcodes carrying a channel descriptor.
    pub channel_info: Vec<u8>,
    /// Opcodes carrying a plain channel text message.
    pub channel_message: Vec<u8>,
    /// Opcodes carrying an echo-prefixed channel text message.
    pub channel_message_echo: Vec<u8>,
    /// Opcodes carrying a raw RX log record.
    pub radio_log: Vec<u8>,
    /// Opcodes carrying a control data push.
    pub control_data: Vec<u8>,
}

impl Default for DispatchTable {
    fn default() -> Self {
        DispatchTable {
            contact: vec![RESP_CODE_CONTACT, PUSH_CODE_NEW_ADVERT],
            channel_info: vec![RESP_CODE_CHANNEL_INFO],
            channel_message: Vec::new(),
            channel_message_echo: Vec::new(),
            radio_log: vec![PUSH_CODE_LOG_RX_DATA],
            control_data: vec![PUSH_CODE_CONTROL_DATA],
        }
    }
}

impl DispatchTable {
    /// Find the decoder for an opcode.
    ///
    /// Channel message routes are checked first so they can take over an
    /// opcode that also has a built-in meaning.
    pub fn route(&self, opcode: u8) -> Option<Route> {
        let routes = [
            (&self.channel_message_echo, Route::ChannelMessage(ChannelMessageVariant::Echo)),
            (&self.channel_message, Route::ChannelMessage(ChannelMessageVariant::Plain)),
            (&self.contact, Route::Contact),
            (&self.channel_info, Route::ChannelInfo),
            (&self.radio_log, Route::RadioLog),
            (&self.control_data, Route::ControlData),
        ];
        routes
            .into_iter()
            .find(|(opcodes, _)| opcodes.contains(&opcode))
            .map(|(_, route)| route)
    }
}

/// Markers are written as one-character strings in configuration files.
mod marker {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(char::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(D::Error::custom(format!(
                "marker must be a single ASCII character, got {:?}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        let config: ProtocolConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ProtocolConfig::default());
        assert_eq!(config.inbound_marker, b'>');
        assert_eq!(config.outbound_marker, b'<');
        assert_eq!(config.transport, TransportMode::Delimited);
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r##"
transport: transparent
inbound_marker: "#"
max_frame_len: 172
discovery_key: full
dispatch:
  channel_message_echo: [17]
"##;
        let config: ProtocolConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.transport, TransportMode::Transparent);
        assert_eq!(config.inbound_marker, b'#');
        assert_eq!(config.outbound_marker, b'<');
        assert_eq!(config.max_frame_len, Some(172));
        assert_eq!(config.discovery_key, DiscoveryKeyLength::Full);
        assert_eq!(config.dispatch.channel_message_echo, vec![17]);
        // Unlisted dispatch entries keep their defaults.
        assert_eq!(config.dispatch.radio_log, vec![PUSH_CODE_LOG_RX_DATA]);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(serde_yaml::from_str::<ProtocolConfig>("transprot: delimited").is_err());
        assert!(serde_yaml::from_str::<ProtocolConfig>("dispatch: {contacts: [3]}").is_err());
    }

    #[test]
    fn test_bad_marker_rejected() {
        assert!(serde_yaml::from_str::<ProtocolConfig>("inbound_marker: \">>\"").is_err());
        assert!(serde_yaml::from_str::<ProtocolConfig>("inbound_marker: \"é\"").is_err());
    }

    #[test]
    fn test_config_yaml_round_trip() {
        let config = ProtocolConfig {
            max_frame_len: Some(300),
            ..ProtocolConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: ProtocolConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_default_routes() {
        let table = DispatchTable::default();
        assert_eq!(table.route(RESP_CODE_CONTACT), Some(Route::Contact));
        assert_eq!(table.route(PUSH_CODE_NEW_ADVERT), Some(Route::Contact));
        assert_eq!(table.route(RESP_CODE_CHANNEL_INFO), Some(Route::ChannelInfo));
        assert_eq!(table.route(PUSH_CODE_LOG_RX_DATA), Some(Route::RadioLog));
        assert_eq!(table.route(PUSH_CODE_CONTROL_DATA), Some(Route::ControlData));
        assert_eq!(table.route(RESP_CODE_CHANNEL_MSG_RECV), None);
        assert_eq!(table.route(RESP_CODE_OK), None);
    }

    #[test]
    fn test_channel_message_route_takes_precedence() {
        let table = DispatchTable {
            channel_message: vec![RESP_CODE_CONTACT],
            ..DispatchTable::default()
        };
        assert_eq!(
            table.route(RESP_CODE_CONTACT),
            Some(Route::ChannelMessage(ChannelMessageVariant::Plain))
        );
    }

    #[test]
    fn test_encode_uses_outbound_marker() {
        let config = ProtocolConfig {
            outbound_marker: b'$',
            ..ProtocolConfig::default()
        };
        let command = crate::builders::get_channel(1);
        assert_eq!(config.encode(&command), vec![b'$', 2, 0, CMD_GET_CHANNEL, 1]);

        let ble = ProtocolConfig {
            transport: TransportMode::Transparent,
            ..ProtocolConfig::default()
        };
        assert_eq!(ble.encode(&command), vec![CMD_GET_CHANNEL, 1]);
    }
}
