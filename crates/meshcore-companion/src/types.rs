//! Typed records decoded from companion payloads.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::constants::*;

/// A 32-byte public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicKey(pub [u8; PUB_KEY_SIZE]);

impl PublicKey {
    /// Create a new public key from bytes.
    pub fn new(bytes: [u8; PUB_KEY_SIZE]) -> Self {
        PublicKey(bytes)
    }

    /// Create from a slice. Returns None if slice is wrong length.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; PUB_KEY_SIZE] = slice.try_into().ok()?;
        Some(PublicKey(bytes))
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; PUB_KEY_SIZE] {
        &self.0
    }

    /// The first `n` bytes, as used for prefix-only addressing.
    pub fn prefix(&self, n: usize) -> &[u8] {
        &self.0[..n.min(PUB_KEY_SIZE)]
    }

    /// Get the bytes as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Serialize any byte container as a lowercase hex string.
pub(crate) fn serialize_hex<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Build from the firmware's fixed-point microdegree representation.
    pub fn from_micro_degrees(lat: i32, lon: i32) -> Self {
        GeoPoint {
            latitude: lat as f64 / COORD_SCALE,
            longitude: lon as f64 / COORD_SCALE,
        }
    }
}

/// Route type (bits 0-1 of a radio packet header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RouteType {
    /// Flood routing with transport codes.
    TransportFlood = ROUTE_TYPE_TRANSPORT_FLOOD,
    /// Flood routing (path is built up hop by hop).
    Flood = ROUTE_TYPE_FLOOD,
    /// Direct route (path is supplied by the sender).
    Direct = ROUTE_TYPE_DIRECT,
    /// Direct route with transport codes.
    TransportDirect = ROUTE_TYPE_TRANSPORT_DIRECT,
}

impl RouteType {
    /// Extract the route type from a packet header byte.
    pub fn from_header(header: u8) -> Self {
        match header & 0x03 {
            ROUTE_TYPE_TRANSPORT_FLOOD => RouteType::TransportFlood,
            ROUTE_TYPE_FLOOD => RouteType::Flood,
            ROUTE_TYPE_DIRECT => RouteType::Direct,
            _ => RouteType::TransportDirect,
        }
    }

    /// Returns true if 4 transport-code bytes follow the header.
    pub fn has_transport_codes(self) -> bool {
        matches!(self, RouteType::TransportFlood | RouteType::TransportDirect)
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteType::TransportFlood => write!(f, "TRANSPORT_FLOOD"),
            RouteType::Flood => write!(f, "FLOOD"),
            RouteType::Direct => write!(f, "DIRECT"),
            RouteType::TransportDirect => write!(f, "TRANSPORT_DIRECT"),
        }
    }
}

/// A contact entry, as returned by `RESP_CODE_CONTACT` or `PUSH_CODE_NEW_ADVERT`.
///
/// Only the key, type, flags and out-path are mandatory. The trailing fields
/// are present when the firmware sent enough bytes for them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactRecord {
    /// Contact's public key.
    pub public_key: PublicKey,
    /// Advertisement type (`ADV_TYPE_*`).
    pub advert_type: u8,
    /// Contact flags.
    pub flags: u8,
    /// Outbound path length (-1 if unknown/flood).
    pub out_path_len: i8,
    /// Outbound path buffer; only the first `out_path_len` bytes are meaningful.
    #[serde(serialize_with = "serialize_hex")]
    pub out_path: [u8; MAX_PATH_SIZE],
    /// Display name.
    pub name: Option<String>,
    /// Timestamp of the last advertisement.
    pub last_advert: Option<u32>,
    /// Advertised position.
    pub position: Option<GeoPoint>,
    /// Last modification timestamp on the device.
    pub lastmod: Option<u32>,
}

impl ContactRecord {
    /// Check if the contact has a known direct path.
    pub fn has_direct_path(&self) -> bool {
        self.out_path_len >= 0
    }

    /// The meaningful part of the out-path buffer.
    pub fn path(&self) -> &[u8] {
        let len = usize::try_from(self.out_path_len).unwrap_or(0);
        &self.out_path[..len.min(MAX_PATH_SIZE)]
    }
}

/// Channel configuration, as returned by `RESP_CODE_CHANNEL_INFO`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelDescriptor {
    /// Channel index (0-based).
    pub index: u8,
    /// Channel name (up to 31 chars).
    pub name: String,
    /// Channel secret.
    #[serde(serialize_with = "serialize_hex")]
    pub secret: [u8; CHANNEL_SECRET_SIZE],
}

/// Prefix carried by the echo variant of a channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EchoHeader {
    /// Sequence number of the echoed transmission.
    pub sequence: u16,
    /// Echo flags.
    pub flags: u8,
}

/// A channel text message with its sender and reception metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelTextMessage {
    /// Present on the echo variant only.
    pub echo: Option<EchoHeader>,
    /// Channel index.
    pub channel_index: u8,
    /// Sender's public key.
    pub sender: PublicKey,
    /// Number of hops the message travelled.
    pub path_len: i8,
    /// Key of the first repeater on the path.
    pub first_hop: Option<PublicKey>,
    /// Signal-to-noise ratio in dB.
    pub snr: Option<i16>,
    /// Received signal strength in dBm.
    pub rssi: Option<i16>,
    /// Message text.
    pub text: Option<String>,
}

/// A raw RX log record (`PUSH_CODE_LOG_RX_DATA`).
///
/// Only routing metadata is extracted from the logged packet; the payload
/// itself is kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioLogRecord {
    /// Signal-to-noise ratio in dB, rounded.
    pub snr: i8,
    /// Received signal strength in dBm.
    pub rssi: i8,
    /// Route type from the packet header.
    pub route_type: RouteType,
    /// Payload type (bits 2-5 of the header).
    pub payload_type: u8,
    /// Payload version (bits 6-7 of the header).
    pub payload_version: u8,
    /// Declared path length, if the packet was long enough to carry it.
    pub path_len: Option<i8>,
    /// Path bytes, when fully present.
    #[serde(serialize_with = "serialize_hex")]
    pub path: Vec<u8>,
    /// Last-hop repeater key prefix as two uppercase hex digits (flood only).
    pub repeater_hint: Option<String>,
    /// The logged packet, starting at its header byte.
    #[serde(serialize_with = "serialize_hex")]
    pub raw: Vec<u8>,
}

/// A control data push (`PUSH_CODE_CONTROL_DATA`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlDataPush {
    /// Signal-to-noise ratio in dB, rounded.
    pub snr: i8,
    /// Received signal strength in dBm.
    pub rssi: i8,
    /// Number of hops the packet travelled.
    pub path_len: u8,
    /// Control payload following the path.
    #[serde(serialize_with = "serialize_hex")]
    pub payload: Vec<u8>,
}

impl ControlDataPush {
    /// Control sub-type (high nibble of the first payload byte).
    pub fn sub_type(&self) -> Option<u8> {
        self.payload.first().map(|flags| flags >> 4)
    }
}

/// How much of a responder's key a discovery response carries.
///
/// The response does not say which form it uses; the caller has to remember
/// what the matching request asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryKeyLength {
    /// 8-byte key prefix (request sent with the prefix-only flag).
    #[default]
    Prefix,
    /// Full 32-byte public key.
    Full,
}

impl DiscoveryKeyLength {
    /// Number of key bytes in the response.
    pub fn byte_len(self) -> usize {
        match self {
            DiscoveryKeyLength::Prefix => DISCOVER_KEY_PREFIX_SIZE,
            DiscoveryKeyLength::Full => PUB_KEY_SIZE,
        }
    }

    /// The length implied by a request's prefix-only flag.
    pub fn for_request(prefix_only: bool) -> Self {
        if prefix_only {
            DiscoveryKeyLength::Prefix
        } else {
            DiscoveryKeyLength::Full
        }
    }
}

/// Identity returned by a discovered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveredKey {
    /// First 8 bytes of the node's public key.
    Prefix([u8; DISCOVER_KEY_PREFIX_SIZE]),
    /// Full public key.
    Full(PublicKey),
}

impl DiscoveredKey {
    /// Key bytes as received.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            DiscoveredKey::Prefix(prefix) => prefix,
            DiscoveredKey::Full(key) => key.as_bytes(),
        }
    }

    /// Returns true if `key` starts with the bytes received.
    pub fn matches(&self, key: &PublicKey) -> bool {
        key.as_bytes().starts_with(self.as_bytes())
    }
}

impl Serialize for DiscoveredKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_hex(&self.as_bytes(), serializer)
    }
}

/// A node discovery response carried in a control data push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiscoveryResponse {
    /// Responder's node type (`ADV_TYPE_*`).
    pub node_type: u8,
    /// SNR of the request as heard by the responder, in dB, rounded.
    pub snr: i8,
    /// Correlation tag reflected from the request.
    pub tag: u32,
    /// Responder's key, prefix or full depending on the request.
    pub key: DiscoveredKey,
}

/// Message type for outgoing text messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextType {
    /// Plain text message.
    Plain,
    /// CLI/command data.
    CliData,
    /// Signed plain text.
    SignedPlain,
    /// Unknown type.
    Unknown(u8),
}

impl From<u8> for TextType {
    fn from(value: u8) -> Self {
        match value {
            TXT_TYPE_PLAIN => TextType::Plain,
            TXT_TYPE_CLI_DATA => TextType::CliData,
            TXT_TYPE_SIGNED_PLAIN => TextType::SignedPlain,
            _ => TextType::Unknown(value),
        }
    }
}

impl From<TextType> for u8 {
    fn from(value: TextType) -> Self {
        match value {
            TextType::Plain => TXT_TYPE_PLAIN,
            TextType::CliData => TXT_TYPE_CLI_DATA,
            TextType::SignedPlain => TXT_TYPE_SIGNED_PLAIN,
            TextType::Unknown(v) => v,
        }
    }
}

/// The three opcode bands of the companion protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpcodeBand {
    /// Host → device command.
    Command,
    /// Device → host reply to a command.
    Response,
    /// Device → host unsolicited notification.
    Push,
}

impl OpcodeBand {
    /// Classify an opcode received from the device.
    pub fn classify_inbound(opcode: u8) -> Self {
        if is_push(opcode) {
            OpcodeBand::Push
        } else {
            OpcodeBand::Response
        }
    }
}

/// Returns true if the opcode is in the push band (high bit set).
pub fn is_push(opcode: u8) -> bool {
    opcode & PUSH_CODE_BASE != 0
}
