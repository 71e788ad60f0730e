//! Frame dispatch: map a reassembled frame to a typed message.

use log::trace;
use serde::Serialize;

use crate::config::{ProtocolConfig, Route};
use crate::constants::*;
use crate::decode::*;
use crate::error::{DecodeError, FirmwareErrorCode, MessageKind};
use crate::frame::Frame;
use crate::reader::PayloadReader;
use crate::types::*;

/// A decoded device→host message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    /// Contact record.
    Contact(ContactRecord),
    /// Channel descriptor.
    ChannelInfo(ChannelDescriptor),
    /// Channel text message.
    ChannelMessage(ChannelTextMessage),
    /// Raw RX log record.
    RadioLog(RadioLogRecord),
    /// Control data push that is not a discovery response.
    ControlData(ControlDataPush),
    /// Node discovery response.
    DiscoveryResponse(DiscoveryResponse),
    /// Command succeeded.
    Ok,
    /// Command failed.
    Error(FirmwareErrorCode),
    /// Start of a contact list.
    ContactsStart {
        /// Number of contacts that follow.
        total_count: u32,
    },
    /// End of a contact list.
    EndOfContacts {
        /// Most recent modification time among the contacts sent.
        most_recent_lastmod: u32,
    },
    /// Message was queued for transmission.
    Sent {
        /// Sent as flood (vs direct).
        is_flood: bool,
        /// Expected ACK code.
        expected_ack: u32,
        /// Estimated timeout in milliseconds.
        est_timeout_ms: u32,
    },
    /// Device clock.
    CurrentTime {
        /// Unix timestamp in seconds.
        time_secs: u32,
    },
    /// Message queue is empty.
    NoMoreMessages,
    /// A message is waiting to be synced.
    MessageWaiting,
    /// Opcode with no decoder; the frame is passed through.
    Unhandled(Frame),
}

impl Message {
    /// Decode a frame using the opcode routing in `config`.
    ///
    /// Control data pushes carrying the discovery-response sub-type are
    /// decoded as [`Message::DiscoveryResponse`] with the configured key length.
    pub fn decode(frame: &Frame, config: &ProtocolConfig) -> Result<Self, DecodeError> {
        let payload = &frame.payload[..];

        if let Some(route) = config.dispatch.route(frame.opcode) {
            return Ok(match route {
                Route::Contact => Message::Contact(decode_contact(payload)?),
                Route::ChannelInfo => Message::ChannelInfo(decode_channel_info(payload)?),
                Route::ChannelMessage(variant) => {
                    Message::ChannelMessage(decode_channel_message(payload, variant)?)
                }
                Route::RadioLog => Message::RadioLog(decode_radio_log(payload)?),
                Route::ControlData => {
                    let push = decode_control_data(payload)?;
                    if push.sub_type() == Some(CTL_TYPE_DISCOVER_RESP) {
                        Message::DiscoveryResponse(push.discovery_response(config.discovery_key)?)
                    } else {
                        Message::ControlData(push)
                    }
                }
            });
        }

        let kind = MessageKind::Response(frame.opcode);
        let short = |expected: usize| DecodeError::too_short(kind, expected, payload.len());
        let mut reader = PayloadReader::new(payload);

        let message = match frame.opcode {
            RESP_CODE_OK => Message::Ok,
            RESP_CODE_ERR => Message::Error(reader.u8().ok_or_else(|| short(1))?.into()),
            RESP_CODE_CONTACTS_START => Message::ContactsStart {
                total_count: reader.u32_le().ok_or_else(|| short(4))?,
            },
            RESP_CODE_END_OF_CONTACTS => Message::EndOfContacts {
                most_recent_lastmod: reader.u32_le().ok_or_else(|| short(4))?,
            },
            RESP_CODE_SENT => {
                if payload.len() < 9 {
                    return Err(short(9));
                }
                Message::Sent {
                    is_flood: reader.u8().ok_or_else(|| short(9))? != 0,
                    expected_ack: reader.u32_le().ok_or_else(|| short(9))?,
                    est_timeout_ms: reader.u32_le().ok_or_else(|| short(9))?,
                }
            }
            RESP_CODE_CURR_TIME => Message::CurrentTime {
                time_secs: reader.u32_le().ok_or_else(|| short(4))?,
            },
            RESP_CODE_NO_MORE_MESSAGES => Message::NoMoreMessages,
            PUSH_CODE_MSG_WAITING => Message::MessageWaiting,
            opcode => {
                trace!(
                    "no decoder for {:?} opcode 0x{:02X}",
                    OpcodeBand::classify_inbound(opcode),
                    opcode
                );
                Message::Unhandled(frame.clone())
            }
        };
        Ok(message)
    }

    /// The layout this message was decoded from, if it has a dedicated record.
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Message::Contact(_) => Some(MessageKind::Contact),
            Message::ChannelInfo(_) => Some(MessageKind::ChannelInfo),
            Message::ChannelMessage(_) => Some(MessageKind::ChannelMessage),
            Message::RadioLog(_) => Some(MessageKind::RadioLog),
            Message::ControlData(_) => Some(MessageKind::ControlData),
            Message::DiscoveryResponse(_) => Some(MessageKind::DiscoveryResponse),
            _ => None,
        }
    }
}

/// Decode a frame with the default configuration.
impl TryFrom<&Frame> for Message {
    type Error = DecodeError;

    fn try_from(frame: &Frame) -> Result<Self, DecodeError> {
        Message::decode(frame, &ProtocolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchTable;

    fn decode(opcode: u8, payload: &[u8]) -> Result<Message, DecodeError> {
        Message::try_from(&Frame::new(opcode, payload.to_vec()))
    }

    #[test]
    fn test_simple_responses() {
        assert_eq!(decode(RESP_CODE_OK, &[]).unwrap(), Message::Ok);
        assert_eq!(
            decode(RESP_CODE_ERR, &[ERR_CODE_TABLE_FULL]).unwrap(),
            Message::Error(FirmwareErrorCode::TableFull)
        );
        assert_eq!(
            decode(RESP_CODE_CURR_TIME, &1_700_000_000u32.to_le_bytes()).unwrap(),
            Message::CurrentTime {
                time_secs: 1_700_000_000
            }
        );
        assert_eq!(decode(PUSH_CODE_MSG_WAITING, &[]).unwrap(), Message::MessageWaiting);
        assert_eq!(decode(RESP_CODE_NO_MORE_MESSAGES, &[]).unwrap(), Message::NoMoreMessages);
    }

    #[test]
    fn test_sent_response() {
        let mut payload = vec![1];
        payload.extend_from_slice(&0xDEADBEEFu32.to_le_bytes());
        payload.extend_from_slice(&5000u32.to_le_bytes());
        assert_eq!(
            decode(RESP_CODE_SENT, &payload).unwrap(),
            Message::Sent {
                is_flood: true,
                expected_ack: 0xDEADBEEF,
                est_timeout_ms: 5000
            }
        );

        let err = decode(RESP_CODE_SENT, &payload[..8]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::too_short(MessageKind::Response(RESP_CODE_SENT), 9, 8)
        );
    }

    #[test]
    fn test_fixed_responses_too_short() {
        assert!(decode(RESP_CODE_ERR, &[]).unwrap_err().is_length_error());
        assert!(decode(RESP_CODE_CONTACTS_START, &[1, 0]).is_err());
        assert!(decode(RESP_CODE_END_OF_CONTACTS, &[]).is_err());
    }

    #[test]
    fn test_unknown_opcode_passes_through() {
        let frame = Frame::new(PUSH_CODE_TRACE_DATA, vec![1, 2, 3]);
        let message = Message::try_from(&frame).unwrap();
        assert_eq!(message, Message::Unhandled(frame));
        assert_eq!(message.kind(), None);
    }

    #[test]
    fn test_routed_decoders() {
        let mut log = vec![0x28, 0xB0, 0x11, 0x01, 0xAB];
        log.extend_from_slice(b"payload");
        match decode(PUSH_CODE_LOG_RX_DATA, &log).unwrap() {
            Message::RadioLog(record) => {
                assert_eq!(record.snr, 10);
                assert_eq!(record.repeater_hint.as_deref(), Some("AB"));
            }
            other => panic!("expected radio log, got {:?}", other),
        }

        let err = decode(RESP_CODE_CONTACT, &[0; 10]).unwrap_err();
        assert_eq!(err, DecodeError::too_short(MessageKind::Contact, 99, 10));
    }

    #[test]
    fn test_control_data_discovery_response() {
        let mut payload = vec![0x14, 0xC4, 0x00, 0x92, 0x0C];
        payload.extend_from_slice(&7u32.to_le_bytes());
        payload.extend_from_slice(&[0x55; 8]);

        let message = decode(PUSH_CODE_CONTROL_DATA, &payload).unwrap();
        assert_eq!(message.kind(), Some(MessageKind::DiscoveryResponse));
        match message {
            Message::DiscoveryResponse(resp) => {
                assert_eq!(resp.node_type, ADV_TYPE_REPEATER);
                assert_eq!(resp.snr, 3);
                assert_eq!(resp.tag, 7);
            }
            other => panic!("expected discovery response, got {:?}", other),
        }
    }

    #[test]
    fn test_control_data_other_sub_type() {
        let payload = [0x14, 0xC4, 0x00, 0x81, 0xFF];
        let message = decode(PUSH_CODE_CONTROL_DATA, &payload).unwrap();
        assert!(matches!(
            message,
            Message::ControlData(ref push) if push.payload == vec![0x81, 0xFF]
        ));
    }

    #[test]
    fn test_configured_channel_message_opcode() {
        let config = ProtocolConfig {
            dispatch: DispatchTable {
                channel_message_echo: vec![RESP_CODE_CHANNEL_MSG_RECV_V3],
                ..DispatchTable::default()
            },
            ..ProtocolConfig::default()
        };

        let mut payload = vec![0x01, 0x00, 0x00, 5];
        payload.extend_from_slice(&[0x42; PUB_KEY_SIZE]);
        payload.push(0);
        let frame = Frame::new(RESP_CODE_CHANNEL_MSG_RECV_V3, payload);

        match Message::decode(&frame, &config).unwrap() {
            Message::ChannelMessage(msg) => {
                assert_eq!(msg.echo.map(|e| e.sequence), Some(1));
                assert_eq!(msg.channel_index, 5);
            }
            other => panic!("expected channel message, got {:?}", other),
        }

        // Without the routing entry the same frame is passed through.
        assert!(matches!(
            Message::try_from(&frame).unwrap(),
            Message::Unhandled(_)
        ));
    }
}
