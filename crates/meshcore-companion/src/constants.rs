//! Protocol constants
//!
//! Opcodes, wire markers and field sizes shared with the MeshCore companion
//! firmware. The numeric assignments mirror the firmware's contract and must
//! not be renumbered.

// ============================================================================
// Wire markers
// ============================================================================

/// Start marker for delimited frames sent by the device.
pub const FRAME_MARKER_INBOUND: u8 = b'>';
/// Start marker for delimited frames sent by the host.
pub const FRAME_MARKER_OUTBOUND: u8 = b'<';
/// Marker byte plus the 2-byte length prefix.
pub const DELIMITED_HEADER_SIZE: usize = 3;

// ============================================================================
// Host → device commands built by this crate
// ============================================================================

/// Start the app session; the device answers with its self info.
pub const CMD_APP_START: u8 = 1;
/// Send a text message on a channel.
pub const CMD_SEND_CHANNEL_TXT_MSG: u8 = 3;
/// List contacts, optionally only those modified since a timestamp.
pub const CMD_GET_CONTACTS: u8 = 4;
/// Read the device clock.
pub const CMD_GET_DEVICE_TIME: u8 = 5;
/// Broadcast our own advertisement.
pub const CMD_SEND_SELF_ADVERT: u8 = 7;
/// Pop the next message from the device's offline queue.
pub const CMD_SYNC_NEXT_MESSAGE: u8 = 10;
/// Set the advertised position.
pub const CMD_SET_ADVERT_LATLON: u8 = 14;
/// Protocol version handshake.
pub const CMD_DEVICE_QUERY: u8 = 22;
/// Read one channel slot.
pub const CMD_GET_CHANNEL: u8 = 31;
/// Write one channel slot.
pub const CMD_SET_CHANNEL: u8 = 32;
/// Transmit a control packet (discovery and friends).
pub const CMD_SEND_CONTROL_DATA: u8 = 55;

// ============================================================================
// Device → host responses
// ============================================================================

/// Generic success.
pub const RESP_CODE_OK: u8 = 0;
/// Generic failure; one `ERR_CODE_*` byte follows.
pub const RESP_CODE_ERR: u8 = 1;
/// Contact listing begins; u32 count follows.
pub const RESP_CODE_CONTACTS_START: u8 = 2;
/// One contact record.
pub const RESP_CODE_CONTACT: u8 = 3;
/// Contact listing ends; u32 most recent lastmod follows.
pub const RESP_CODE_END_OF_CONTACTS: u8 = 4;
/// Outgoing message accepted.
pub const RESP_CODE_SENT: u8 = 6;
/// Channel message from the offline queue.
pub const RESP_CODE_CHANNEL_MSG_RECV: u8 = 8;
/// Device clock; u32 seconds follows.
pub const RESP_CODE_CURR_TIME: u8 = 9;
/// Offline queue is empty.
pub const RESP_CODE_NO_MORE_MESSAGES: u8 = 10;
/// Channel message from the offline queue, with signal metadata.
pub const RESP_CODE_CHANNEL_MSG_RECV_V3: u8 = 17;
/// One channel descriptor.
pub const RESP_CODE_CHANNEL_INFO: u8 = 18;

// ============================================================================
// Device → host pushes (high bit set)
// ============================================================================

/// Lowest push code; every opcode with this bit set is a push.
pub const PUSH_CODE_BASE: u8 = 0x80;
/// A known contact re-advertised.
pub const PUSH_CODE_ADVERT: u8 = 0x80;
/// Messages are waiting in the offline queue.
pub const PUSH_CODE_MSG_WAITING: u8 = 0x83;
/// Raw packet heard by the radio.
pub const PUSH_CODE_LOG_RX_DATA: u8 = 0x88;
/// Trace path result.
pub const PUSH_CODE_TRACE_DATA: u8 = 0x89;
/// Advertisement from a node not yet in the contact table.
pub const PUSH_CODE_NEW_ADVERT: u8 = 0x8A;
/// Control packet received.
pub const PUSH_CODE_CONTROL_DATA: u8 = 0x8E;

// ============================================================================
// Error Codes
// ============================================================================

/// Unsupported command.
pub const ERR_CODE_UNSUPPORTED_CMD: u8 = 1;
/// Contact/item not found.
pub const ERR_CODE_NOT_FOUND: u8 = 2;
/// Table (contacts, packets, etc.) is full.
pub const ERR_CODE_TABLE_FULL: u8 = 3;
/// Bad state for this operation.
pub const ERR_CODE_BAD_STATE: u8 = 4;
/// File I/O error.
pub const ERR_CODE_FILE_IO_ERROR: u8 = 5;
/// Illegal argument.
pub const ERR_CODE_ILLEGAL_ARG: u8 = 6;

// ============================================================================
// Text Types
// ============================================================================

/// Plain text message.
pub const TXT_TYPE_PLAIN: u8 = 0;
/// CLI/command data.
pub const TXT_TYPE_CLI_DATA: u8 = 1;
/// Signed plain text message.
pub const TXT_TYPE_SIGNED_PLAIN: u8 = 2;

// ============================================================================
// Advertisement Types
// ============================================================================

/// Chat node advertisement type.
pub const ADV_TYPE_CHAT: u8 = 1;
/// Repeater node advertisement type.
pub const ADV_TYPE_REPEATER: u8 = 2;
/// Room server advertisement type.
pub const ADV_TYPE_ROOM_SERVER: u8 = 3;
/// Sensor node advertisement type.
pub const ADV_TYPE_SENSOR: u8 = 4;

// ============================================================================
// Control data sub-types (high nibble of the control flags byte)
// ============================================================================

/// Node discovery request.
pub const CTL_TYPE_DISCOVER_REQ: u8 = 0x8;
/// Node discovery response.
pub const CTL_TYPE_DISCOVER_RESP: u8 = 0x9;
/// Request flag asking responders to send only an 8-byte key prefix.
pub const DISCOVER_FLAG_PREFIX_ONLY: u8 = 0x01;

// ============================================================================
// Route types (bits 0-1 of a radio packet header)
// ============================================================================

/// Flood routing with transport codes.
pub const ROUTE_TYPE_TRANSPORT_FLOOD: u8 = 0x00;
/// Flood routing.
pub const ROUTE_TYPE_FLOOD: u8 = 0x01;
/// Direct routing.
pub const ROUTE_TYPE_DIRECT: u8 = 0x02;
/// Direct routing with transport codes.
pub const ROUTE_TYPE_TRANSPORT_DIRECT: u8 = 0x03;
/// Size of the transport code block that follows the header for transport routes.
pub const TRANSPORT_CODES_SIZE: usize = 4;

// ============================================================================
// Sizes
// ============================================================================

/// Size of a public key in bytes.
pub const PUB_KEY_SIZE: usize = 32;
/// Size of the key prefix returned by prefix-only discovery.
pub const DISCOVER_KEY_PREFIX_SIZE: usize = 8;
/// Maximum path size in bytes.
pub const MAX_PATH_SIZE: usize = 64;
/// Fixed width of name fields (31 characters plus terminator).
pub const NAME_FIELD_SIZE: usize = 32;
/// Size of a channel secret.
pub const CHANNEL_SECRET_SIZE: usize = 16;
/// Fixed-point scale for latitude and longitude.
pub const COORD_SCALE: f64 = 1_000_000.0;
