//! Protocol error types.

use std::fmt;

use thiserror::Error;

/// The message layouts this crate knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Contact record (`RESP_CODE_CONTACT`, `PUSH_CODE_NEW_ADVERT`).
    Contact,
    /// Channel descriptor (`RESP_CODE_CHANNEL_INFO`).
    ChannelInfo,
    /// Channel text message, plain or echo variant.
    ChannelMessage,
    /// Raw RX log record (`PUSH_CODE_LOG_RX_DATA`).
    RadioLog,
    /// Control data push (`PUSH_CODE_CONTROL_DATA`).
    ControlData,
    /// Node discovery response carried in control data.
    DiscoveryResponse,
    /// Fixed-size response with no dedicated record type.
    Response(u8),
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Contact => write!(f, "contact"),
            MessageKind::ChannelInfo => write!(f, "channel info"),
            MessageKind::ChannelMessage => write!(f, "channel message"),
            MessageKind::RadioLog => write!(f, "radio log"),
            MessageKind::ControlData => write!(f, "control data"),
            MessageKind::DiscoveryResponse => write!(f, "discovery response"),
            MessageKind::Response(code) => write!(f, "response 0x{:02X}", code),
        }
    }
}

/// Errors returned by payload decoders.
///
/// None of these are fatal to the stream: the frame that produced the error
/// is dropped or logged by the caller and reassembly carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is shorter than the minimum layout for its kind.
    #[error("{kind} payload too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Layout being decoded.
        kind: MessageKind,
        /// Minimum payload length.
        expected: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// Control sub-type does not match the decoder it was routed to.
    #[error("control sub-type mismatch: expected 0x{expected:X}, got 0x{actual:X}")]
    SubTypeMismatch {
        /// Expected sub-type nibble.
        expected: u8,
        /// Sub-type nibble found in the payload.
        actual: u8,
    },

    /// A declared path runs past the end of the payload.
    #[error("path length {declared} exceeds the {available} bytes available")]
    TruncatedPath {
        /// Path length declared in the payload.
        declared: usize,
        /// Bytes left after the path length field.
        available: usize,
    },
}

impl DecodeError {
    /// Shorthand for [`DecodeError::TooShort`].
    pub fn too_short(kind: MessageKind, expected: usize, actual: usize) -> Self {
        DecodeError::TooShort {
            kind,
            expected,
            actual,
        }
    }

    /// Returns true if the error is a length failure rather than a semantic one.
    pub fn is_length_error(&self) -> bool {
        matches!(
            self,
            DecodeError::TooShort { .. } | DecodeError::TruncatedPath { .. }
        )
    }
}

/// Errors returned by payload builders when given malformed input.
///
/// These indicate a caller bug, never an environmental condition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Key material has the wrong length.
    #[error("key length mismatch: expected {expected} bytes, got {actual}")]
    KeyLength {
        /// Required key length.
        expected: usize,
        /// Supplied key length.
        actual: usize,
    },

    /// Coordinate is not a finite value inside the valid range.
    #[error("coordinate out of range: {value} (limit ±{limit})")]
    CoordinateOutOfRange {
        /// Supplied value in degrees.
        value: f64,
        /// Absolute limit in degrees.
        limit: f64,
    },
}

/// Error codes returned by the firmware in `RESP_CODE_ERR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FirmwareErrorCode {
    /// Command not supported.
    UnsupportedCommand,
    /// Contact or item not found.
    NotFound,
    /// Table (contacts, packets, etc.) is full.
    TableFull,
    /// Bad state for this operation.
    BadState,
    /// File I/O error.
    FileIoError,
    /// Illegal argument.
    IllegalArg,
    /// Unknown error code.
    Unknown(u8),
}

impl fmt::Display for FirmwareErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareErrorCode::UnsupportedCommand => write!(f, "unsupported command"),
            FirmwareErrorCode::NotFound => write!(f, "not found"),
            FirmwareErrorCode::TableFull => write!(f, "table full"),
            FirmwareErrorCode::BadState => write!(f, "bad state"),
            FirmwareErrorCode::FileIoError => write!(f, "file I/O error"),
            FirmwareErrorCode::IllegalArg => write!(f, "illegal argument"),
            FirmwareErrorCode::Unknown(code) => write!(f, "unknown error (0x{:02X})", code),
        }
    }
}

impl From<u8> for FirmwareErrorCode {
    fn from(code: u8) -> Self {
        use crate::constants::*;
        match code {
            ERR_CODE_UNSUPPORTED_CMD => FirmwareErrorCode::UnsupportedCommand,
            ERR_CODE_NOT_FOUND => FirmwareErrorCode::NotFound,
            ERR_CODE_TABLE_FULL => FirmwareErrorCode::TableFull,
            ERR_CODE_BAD_STATE => FirmwareErrorCode::BadState,
            ERR_CODE_FILE_IO_ERROR => FirmwareErrorCode::FileIoError,
            ERR_CODE_ILLEGAL_ARG => FirmwareErrorCode::IllegalArg,
            _ => FirmwareErrorCode::Unknown(code),
        }
    }
}
