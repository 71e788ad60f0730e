//! Frame reassembly and encoding.
//!
//! The companion firmware speaks one of two framings depending on the link:
//!
//! **Delimited** (serial/USB byte streams), where frame boundaries have to be
//! recovered from the stream:
//!
//! ```text
//! +--------+--------+--------+--------+---------------------+
//! | marker | len_lo | len_hi | opcode | payload[0..len-1]   |
//! +--------+--------+--------+--------+---------------------+
//! ```
//!
//! The device prefixes its frames with `>` and expects `<` on frames from the
//! host.
//!
//! **Transparent** (BLE characteristic writes/notifications), where every
//! physical delivery is exactly one frame:
//!
//! ```text
//! +--------+---------------------+
//! | opcode | payload             |
//! +--------+---------------------+
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::config::ProtocolConfig;
use crate::constants::*;
use crate::types::serialize_hex;

/// Initial capacity of the accumulation buffer.
const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// One opcode + payload unit exchanged with the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Command, response or push code.
    pub opcode: u8,
    /// Bytes following the opcode.
    #[serde(serialize_with = "serialize_hex")]
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame from an opcode and payload.
    pub fn new(opcode: u8, payload: impl Into<Bytes>) -> Self {
        Frame {
            opcode,
            payload: payload.into(),
        }
    }

    /// Split a frame body into opcode and payload. An empty body is not a frame.
    pub fn from_body(body: Bytes) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        Some(Frame {
            opcode: body[0],
            payload: body.slice(1..),
        })
    }

    /// Encode for a delimited link using the host→device marker.
    pub fn to_delimited(&self) -> Vec<u8> {
        encode_delimited(self.opcode, &self.payload)
    }

    /// Encode for a transparent link.
    pub fn to_transparent(&self) -> Vec<u8> {
        encode_transparent(self.opcode, &self.payload)
    }
}

/// How frames are carried on the underlying link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Start marker + 2-byte length prefix on a byte stream.
    #[default]
    Delimited,
    /// One physical delivery is one frame.
    Transparent,
}

impl TransportMode {
    /// Encode an outgoing frame for this transport.
    pub fn encode(self, opcode: u8, payload: &[u8]) -> Vec<u8> {
        match self {
            TransportMode::Delimited => encode_delimited(opcode, payload),
            TransportMode::Transparent => encode_transparent(opcode, payload),
        }
    }
}

/// Turns raw byte chunks from the transport into complete [`Frame`]s.
///
/// One reassembler belongs to one physical connection. Chunk boundaries do
/// not need to line up with frame boundaries: partial frames are held until
/// the rest arrives, several frames in one chunk are all returned, and bytes
/// outside a frame are discarded until the next start marker.
#[derive(Debug)]
pub struct FrameReassembler {
    mode: TransportMode,
    marker: u8,
    max_frame_len: Option<usize>,
    buffer: BytesMut,
}

impl FrameReassembler {
    /// Create a reassembler for device→host traffic in the given mode.
    pub fn new(mode: TransportMode) -> Self {
        FrameReassembler {
            mode,
            marker: FRAME_MARKER_INBOUND,
            max_frame_len: None,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Create a reassembler from a protocol configuration.
    pub fn from_config(config: &ProtocolConfig) -> Self {
        FrameReassembler {
            mode: config.transport,
            marker: config.inbound_marker,
            max_frame_len: config.max_frame_len,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Override the start marker recognised in delimited mode.
    pub fn with_marker(mut self, marker: u8) -> Self {
        self.marker = marker;
        self
    }

    /// Treat declared lengths above `max` as corruption instead of waiting for them.
    ///
    /// The marker byte of an oversized header is dropped and scanning resumes
    /// at the next marker.
    pub fn with_max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = Some(max);
        self
    }

    /// The transport mode fixed at construction.
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Number of bytes held waiting for the rest of a frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially received data.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Append a chunk and return every frame it completes, in stream order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        match self.mode {
            TransportMode::Transparent => {
                let body = self.buffer.split().freeze();
                if let Some(frame) = Frame::from_body(body) {
                    trace!(
                        "frame opcode=0x{:02X} payload={}B (transparent)",
                        frame.opcode,
                        frame.payload.len()
                    );
                    frames.push(frame);
                }
            }
            TransportMode::Delimited => self.drain_delimited(&mut frames),
        }
        frames
    }

    fn drain_delimited(&mut self, frames: &mut Vec<Frame>) {
        loop {
            if self.buffer.is_empty() {
                return;
            }

            match self.buffer.iter().position(|&b| b == self.marker) {
                None => {
                    debug!(
                        "no start marker in {} buffered bytes, discarding",
                        self.buffer.len()
                    );
                    self.buffer.clear();
                    return;
                }
                Some(0) => {}
                Some(skip) => {
                    debug!("skipping {} bytes before start marker", skip);
                    self.buffer.advance(skip);
                    continue;
                }
            }

            if self.buffer.len() < DELIMITED_HEADER_SIZE {
                return;
            }

            let len = u16::from_le_bytes([self.buffer[1], self.buffer[2]]) as usize;

            if let Some(max) = self.max_frame_len {
                if len > max {
                    debug!(
                        "declared frame length {} exceeds limit {}, resynchronising",
                        len, max
                    );
                    self.buffer.advance(1);
                    continue;
                }
            }

            if self.buffer.len() < DELIMITED_HEADER_SIZE + len {
                return;
            }

            self.buffer.advance(DELIMITED_HEADER_SIZE);
            let body = self.buffer.split_to(len).freeze();
            match Frame::from_body(body) {
                Some(frame) => {
                    trace!(
                        "frame opcode=0x{:02X} payload={}B",
                        frame.opcode,
                        frame.payload.len()
                    );
                    frames.push(frame);
                }
                None => trace!("empty frame body"),
            }
        }
    }
}

/// Encode a host→device frame for a delimited link.
///
/// # Panics
///
/// Panics if the opcode plus payload does not fit the 16-bit length field.
pub fn encode_delimited(opcode: u8, payload: &[u8]) -> Vec<u8> {
    encode_delimited_with_marker(FRAME_MARKER_OUTBOUND, opcode, payload)
}

/// Encode a delimited frame with an explicit start marker.
///
/// # Panics
///
/// Panics if the opcode plus payload does not fit the 16-bit length field.
pub fn encode_delimited_with_marker(marker: u8, opcode: u8, payload: &[u8]) -> Vec<u8> {
    let body_len = 1 + payload.len();
    assert!(
        body_len <= u16::MAX as usize,
        "frame body of {} bytes exceeds the 16-bit length field",
        body_len
    );

    let mut buf = Vec::with_capacity(DELIMITED_HEADER_SIZE + body_len);
    buf.put_u8(marker);
    buf.put_u16_le(body_len as u16);
    buf.put_u8(opcode);
    buf.extend_from_slice(payload);
    buf
}

/// Encode a frame for a transparent link: the opcode followed by the payload.
pub fn encode_transparent(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(opcode);
    buf.extend_from_slice(payload);
    buf
}
