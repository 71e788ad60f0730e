//! Builders for outgoing command payloads.
//!
//! Payload builders return the bytes that follow the opcode. The `Command`
//! helpers pair a payload with its opcode so it can be framed for either
//! transport.

use bytes::BufMut;

use crate::constants::*;
use crate::error::BuildError;
use crate::frame::{encode_delimited, encode_transparent, TransportMode};
use crate::types::{DiscoveryKeyLength, TextType};

/// Maximum latitude magnitude in degrees.
const MAX_LATITUDE: f64 = 90.0;
/// Maximum longitude magnitude in degrees.
const MAX_LONGITUDE: f64 = 180.0;

/// An outgoing command: opcode plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command code (`CMD_*`).
    pub opcode: u8,
    /// Bytes following the opcode.
    pub payload: Vec<u8>,
}

impl Command {
    /// Create a command from an opcode and payload.
    pub fn new(opcode: u8, payload: Vec<u8>) -> Self {
        Command { opcode, payload }
    }

    /// Encode for a delimited link.
    pub fn to_delimited(&self) -> Vec<u8> {
        encode_delimited(self.opcode, &self.payload)
    }

    /// Encode for a transparent link.
    pub fn to_transparent(&self) -> Vec<u8> {
        encode_transparent(self.opcode, &self.payload)
    }

    /// Encode for the given transport.
    pub fn encode(&self, mode: TransportMode) -> Vec<u8> {
        mode.encode(self.opcode, &self.payload)
    }
}

/// Build a channel configuration payload: index, 32-byte name, 16-byte secret.
///
/// The name is truncated to 31 bytes (on a character boundary) so the field
/// always keeps a terminating zero.
pub fn channel_config(index: u8, name: &str, secret: &[u8]) -> Result<Vec<u8>, BuildError> {
    if secret.len() != CHANNEL_SECRET_SIZE {
        return Err(BuildError::KeyLength {
            expected: CHANNEL_SECRET_SIZE,
            actual: secret.len(),
        });
    }

    let mut buf = Vec::with_capacity(1 + NAME_FIELD_SIZE + CHANNEL_SECRET_SIZE);
    buf.push(index);
    buf.extend_from_slice(&name_field(name));
    buf.extend_from_slice(secret);
    Ok(buf)
}

/// `CMD_SET_CHANNEL` with a channel configuration payload.
pub fn set_channel(index: u8, name: &str, secret: &[u8]) -> Result<Command, BuildError> {
    Ok(Command::new(CMD_SET_CHANNEL, channel_config(index, name, secret)?))
}

fn name_field(name: &str) -> [u8; NAME_FIELD_SIZE] {
    let mut len = name.len().min(NAME_FIELD_SIZE - 1);
    while !name.is_char_boundary(len) {
        len -= 1;
    }
    let mut field = [0u8; NAME_FIELD_SIZE];
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    field
}

/// Build a position update payload: latitude and longitude as microdegrees,
/// plus an optional altitude in metres.
pub fn position_update(
    latitude: f64,
    longitude: f64,
    altitude: Option<i32>,
) -> Result<Vec<u8>, BuildError> {
    let lat = to_micro_degrees(latitude, MAX_LATITUDE)?;
    let lon = to_micro_degrees(longitude, MAX_LONGITUDE)?;

    let mut buf = Vec::with_capacity(12);
    buf.put_i32_le(lat);
    buf.put_i32_le(lon);
    if let Some(alt) = altitude {
        buf.put_i32_le(alt);
    }
    Ok(buf)
}

/// `CMD_SET_ADVERT_LATLON` with a position update payload.
pub fn set_position(
    latitude: f64,
    longitude: f64,
    altitude: Option<i32>,
) -> Result<Command, BuildError> {
    Ok(Command::new(
        CMD_SET_ADVERT_LATLON,
        position_update(latitude, longitude, altitude)?,
    ))
}

fn to_micro_degrees(value: f64, limit: f64) -> Result<i32, BuildError> {
    if !value.is_finite() || value.abs() > limit {
        return Err(BuildError::CoordinateOutOfRange { value, limit });
    }
    Ok((value * COORD_SCALE).round() as i32)
}

/// Build a channel text message payload: type, channel, timestamp, text, zero.
pub fn channel_text_message(
    text_type: TextType,
    channel_index: u8,
    timestamp: u32,
    text: &str,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(7 + text.len());
    buf.push(text_type.into());
    buf.push(channel_index);
    buf.put_u32_le(timestamp);
    buf.extend_from_slice(text.as_bytes());
    buf.push(0);
    buf
}

/// Plain channel text message stamped with the current time.
pub fn channel_text_message_now(channel_index: u8, text: &str) -> Vec<u8> {
    channel_text_message(TextType::Plain, channel_index, now_secs(), text)
}

/// `CMD_SEND_CHANNEL_TXT_MSG` for a plain message stamped with the current time.
pub fn send_channel_text(channel_index: u8, text: &str) -> Command {
    Command::new(
        CMD_SEND_CHANNEL_TXT_MSG,
        channel_text_message_now(channel_index, text),
    )
}

fn now_secs() -> u32 {
    u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX)
}

/// Parameters of a node discovery request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryRequest {
    /// Bitmask of node types that should answer (bit n = `ADV_TYPE` n).
    pub type_filter: u8,
    /// Correlation tag echoed back in every response.
    pub tag: u32,
    /// Reserved; only nodes modified since this time answer. 0 = all.
    pub since: u32,
    /// Ask responders for an 8-byte key prefix instead of the full key.
    pub prefix_only: bool,
}

impl DiscoveryRequest {
    /// A prefix-only request for the given node types.
    pub fn new(type_filter: u8, tag: u32) -> Self {
        DiscoveryRequest {
            type_filter,
            tag,
            since: 0,
            prefix_only: true,
        }
    }

    /// Ask for full public keys.
    pub fn full_keys(mut self) -> Self {
        self.prefix_only = false;
        self
    }

    /// Set the reserved "since" field.
    pub fn with_since(mut self, since: u32) -> Self {
        self.since = since;
        self
    }

    /// Key length that responses to this request will carry.
    pub fn key_length(&self) -> DiscoveryKeyLength {
        DiscoveryKeyLength::for_request(self.prefix_only)
    }

    /// The control payload for this request.
    pub fn payload(&self) -> Vec<u8> {
        discovery_request(self.type_filter, self.tag, self.since, self.prefix_only)
    }

    /// `CMD_SEND_CONTROL_DATA` carrying this request.
    pub fn to_command(&self) -> Command {
        Command::new(CMD_SEND_CONTROL_DATA, self.payload())
    }
}

/// Build a discovery request control payload.
pub fn discovery_request(type_filter: u8, tag: u32, since: u32, prefix_only: bool) -> Vec<u8> {
    let mut flags = CTL_TYPE_DISCOVER_REQ << 4;
    if prefix_only {
        flags |= DISCOVER_FLAG_PREFIX_ONLY;
    }

    let mut buf = Vec::with_capacity(10);
    buf.push(flags);
    buf.push(type_filter);
    buf.put_u32_le(tag);
    buf.put_u32_le(since);
    buf
}

/// Query device information. First command to send.
pub fn device_query(app_version: u8) -> Command {
    Command::new(CMD_DEVICE_QUERY, vec![app_version])
}

/// Start the app session: 7 reserved bytes then the app name.
pub fn app_start(app_name: &str) -> Command {
    let mut payload = vec![0u8; 7];
    payload.extend_from_slice(app_name.as_bytes());
    Command::new(CMD_APP_START, payload)
}

/// Request one channel descriptor.
pub fn get_channel(index: u8) -> Command {
    Command::new(CMD_GET_CHANNEL, vec![index])
}

/// Request the contact list, optionally only contacts modified after `since`.
pub fn get_contacts(since: Option<u32>) -> Command {
    let payload = since.map(|s| s.to_le_bytes().to_vec()).unwrap_or_default();
    Command::new(CMD_GET_CONTACTS, payload)
}

/// Fetch the next queued message.
pub fn sync_next_message() -> Command {
    Command::new(CMD_SYNC_NEXT_MESSAGE, Vec::new())
}

/// Send a self-advertisement, flooded or zero-hop.
pub fn send_self_advert(flood: bool) -> Command {
    Command::new(CMD_SEND_SELF_ADVERT, vec![u8::from(flood)])
}
