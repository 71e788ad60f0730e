//! MeshCore companion protocol engine.
//!
//! Turns the raw byte stream from a companion radio (serial, USB or BLE) into
//! typed records, and builds the payloads a host sends back.
//!
//! # Protocol Overview
//!
//! Every message is an opcode byte followed by a payload. Opcodes fall into
//! three bands:
//!
//! - **Commands** (host → device): `CMD_*`
//! - **Responses** (device → host): `RESP_CODE_*`
//! - **Push notifications** (device → host): `PUSH_CODE_*` (0x80+)
//!
//! On byte-stream links frames are delimited by a start marker and a 16-bit
//! length; on BLE each notification is one frame. See [`FrameReassembler`].
//!
//! # Example
//!
//! ```rust
//! use meshcore_companion::{get_channel, Message, ProtocolConfig};
//!
//! let config = ProtocolConfig::default();
//! let mut reassembler = config.reassembler();
//!
//! // RESP_CODE_CURR_TIME, split across two reads.
//! assert!(reassembler.feed(&[b'>', 5, 0]).is_empty());
//! let frames = reassembler.feed(&[0x09, 0x00, 0xF1, 0x53, 0x65]);
//!
//! let message = Message::decode(&frames[0], &config).unwrap();
//! assert_eq!(message, Message::CurrentTime { time_secs: 0x6553_F100 });
//!
//! // Outgoing: build a command and frame it for the link.
//! let bytes = config.encode(&get_channel(0));
//! assert_eq!(bytes, vec![b'<', 2, 0, 31, 0]);
//! ```

mod builders;
mod config;
mod constants;
mod decode;
mod error;
mod frame;
mod message;
mod reader;
mod types;

pub use builders::*;
pub use config::*;
pub use constants::*;
pub use decode::*;
pub use error::*;
pub use frame::*;
pub use message::*;
pub use types::*;
