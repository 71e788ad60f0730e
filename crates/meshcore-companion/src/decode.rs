//! Payload decoders.
//!
//! Each decoder takes the payload that follows the opcode byte and returns a
//! typed record. A payload shorter than the fixed part of its layout is a
//! [`DecodeError`]; trailing sections beyond the fixed part are filled in only
//! as far as the payload reaches.

use crate::constants::*;
use crate::error::{DecodeError, MessageKind};
use crate::reader::{c_str, PayloadReader};
use crate::types::*;

/// Minimum contact payload: key(32) + type(1) + flags(1) + path_len(1) + path(64).
pub const CONTACT_MIN_LEN: usize = PUB_KEY_SIZE + 3 + MAX_PATH_SIZE;
/// Channel info payload: index(1) + name(32) + secret(16).
pub const CHANNEL_INFO_LEN: usize = 1 + NAME_FIELD_SIZE + CHANNEL_SECRET_SIZE;
/// Minimum channel message payload: channel(1) + sender key(32) + path_len(1).
pub const CHANNEL_MESSAGE_MIN_LEN: usize = 1 + PUB_KEY_SIZE + 1;
/// Size of the echo prefix: sequence(2) + flags(1).
pub const ECHO_HEADER_LEN: usize = 3;
/// Minimum radio log payload: snr(1) + rssi(1) + packet header(1).
pub const RADIO_LOG_MIN_LEN: usize = 3;
/// Minimum control data payload: snr(1) + rssi(1) + path_len(1).
pub const CONTROL_DATA_MIN_LEN: usize = 3;
/// Fixed part of a discovery response: flags(1) + snr(1) + tag(4).
pub const DISCOVERY_RESPONSE_HEADER_LEN: usize = 6;

/// Layout variant of a channel text message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelMessageVariant {
    /// Common layout only.
    #[default]
    Plain,
    /// Common layout preceded by a sequence number and flags.
    Echo,
}

/// Convert a quantized SNR byte (dB × 4, signed) to whole dB.
pub fn snr_from_quantized(raw: u8) -> i8 {
    ((raw as i8) as f32 / 4.0).round() as i8
}

fn ensure_len(kind: MessageKind, payload: &[u8], expected: usize) -> Result<(), DecodeError> {
    if payload.len() < expected {
        return Err(DecodeError::too_short(kind, expected, payload.len()));
    }
    Ok(())
}

/// Decode a contact record.
pub fn decode_contact(payload: &[u8]) -> Result<ContactRecord, DecodeError> {
    ensure_len(MessageKind::Contact, payload, CONTACT_MIN_LEN)?;
    let short = || DecodeError::too_short(MessageKind::Contact, CONTACT_MIN_LEN, payload.len());

    let mut reader = PayloadReader::new(payload);
    let public_key = PublicKey::new(reader.array().ok_or_else(short)?);
    let advert_type = reader.u8().ok_or_else(short)?;
    let flags = reader.u8().ok_or_else(short)?;
    let out_path_len = reader.i8().ok_or_else(short)?;
    let out_path = reader.array().ok_or_else(short)?;

    // Trailing fields come in order; stop at the first one that does not fit.
    let name = reader.fixed_str(NAME_FIELD_SIZE);
    let last_advert = name.as_ref().and_then(|_| reader.u32_le());
    let position = match last_advert {
        Some(_) if reader.remaining() >= 8 => {
            let lat = reader.i32_le().ok_or_else(short)?;
            let lon = reader.i32_le().ok_or_else(short)?;
            Some(GeoPoint::from_micro_degrees(lat, lon))
        }
        _ => None,
    };
    let lastmod = position.as_ref().and_then(|_| reader.u32_le());

    Ok(ContactRecord {
        public_key,
        advert_type,
        flags,
        out_path_len,
        out_path,
        name,
        last_advert,
        position,
        lastmod,
    })
}

/// Decode a channel descriptor.
pub fn decode_channel_info(payload: &[u8]) -> Result<ChannelDescriptor, DecodeError> {
    ensure_len(MessageKind::ChannelInfo, payload, CHANNEL_INFO_LEN)?;

    let index = payload[0];
    let name = c_str(&payload[1..1 + NAME_FIELD_SIZE]);
    let mut secret = [0u8; CHANNEL_SECRET_SIZE];
    secret.copy_from_slice(&payload[1 + NAME_FIELD_SIZE..CHANNEL_INFO_LEN]);

    Ok(ChannelDescriptor {
        index,
        name,
        secret,
    })
}

/// Decode a channel text message in the given layout variant.
pub fn decode_channel_message(
    payload: &[u8],
    variant: ChannelMessageVariant,
) -> Result<ChannelTextMessage, DecodeError> {
    let min_len = match variant {
        ChannelMessageVariant::Plain => CHANNEL_MESSAGE_MIN_LEN,
        ChannelMessageVariant::Echo => ECHO_HEADER_LEN + CHANNEL_MESSAGE_MIN_LEN,
    };
    ensure_len(MessageKind::ChannelMessage, payload, min_len)?;
    let short = || DecodeError::too_short(MessageKind::ChannelMessage, min_len, payload.len());

    let mut reader = PayloadReader::new(payload);
    let echo = match variant {
        ChannelMessageVariant::Plain => None,
        ChannelMessageVariant::Echo => Some(EchoHeader {
            sequence: reader.u16_le().ok_or_else(short)?,
            flags: reader.u8().ok_or_else(short)?,
        }),
    };

    let channel_index = reader.u8().ok_or_else(short)?;
    let sender = PublicKey::new(reader.array().ok_or_else(short)?);
    let path_len = reader.i8().ok_or_else(short)?;

    let first_hop = if path_len > 0 {
        reader.array().map(PublicKey::new)
    } else {
        None
    };

    // SNR and RSSI come as a pair; the text only follows them.
    let (snr, rssi, text) = if reader.remaining() >= 4 {
        let snr = reader.i16_le();
        let rssi = reader.i16_le();
        let text = match reader.rest() {
            [] => None,
            rest => Some(c_str(rest)),
        };
        (snr, rssi, text)
    } else {
        (None, None, None)
    };

    Ok(ChannelTextMessage {
        echo,
        channel_index,
        sender,
        path_len,
        first_hop,
        snr,
        rssi,
        text,
    })
}

/// Decode a raw RX log record and extract routing metadata from the logged packet.
///
/// The repeater hint is only derived for flood-routed packets, where the last
/// path byte is the hash prefix of the repeater that was heard. Direct-routed
/// packets, empty paths and packets cut off before the path yield no hint.
pub fn decode_radio_log(payload: &[u8]) -> Result<RadioLogRecord, DecodeError> {
    ensure_len(MessageKind::RadioLog, payload, RADIO_LOG_MIN_LEN)?;
    let short = || DecodeError::too_short(MessageKind::RadioLog, RADIO_LOG_MIN_LEN, payload.len());

    let mut reader = PayloadReader::new(payload);
    let snr = snr_from_quantized(reader.u8().ok_or_else(short)?);
    let rssi = reader.i8().ok_or_else(short)?;
    let raw = payload[2..].to_vec();

    let header = reader.u8().ok_or_else(short)?;
    let route_type = RouteType::from_header(header);
    let payload_type = (header >> 2) & 0x0F;
    let payload_version = header >> 6;

    let transport_ok = !route_type.has_transport_codes()
        || reader.skip(TRANSPORT_CODES_SIZE).is_some();
    let path_len = if transport_ok { reader.i8() } else { None };

    let path = match path_len {
        Some(len) if len > 0 => reader
            .bytes(len as usize)
            .map(<[u8]>::to_vec)
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let repeater_hint = match (route_type, path.last()) {
        (RouteType::Flood, Some(last)) => Some(format!("{:02X}", last)),
        _ => None,
    };

    Ok(RadioLogRecord {
        snr,
        rssi,
        route_type,
        payload_type,
        payload_version,
        path_len,
        path,
        repeater_hint,
        raw,
    })
}

/// Decode a control data push. The path bytes are skipped.
pub fn decode_control_data(payload: &[u8]) -> Result<ControlDataPush, DecodeError> {
    ensure_len(MessageKind::ControlData, payload, CONTROL_DATA_MIN_LEN)?;
    let short =
        || DecodeError::too_short(MessageKind::ControlData, CONTROL_DATA_MIN_LEN, payload.len());

    let mut reader = PayloadReader::new(payload);
    let snr = snr_from_quantized(reader.u8().ok_or_else(short)?);
    let rssi = reader.i8().ok_or_else(short)?;
    let path_len = reader.u8().ok_or_else(short)?;

    let available = reader.remaining();
    reader
        .skip(path_len as usize)
        .ok_or(DecodeError::TruncatedPath {
            declared: path_len as usize,
            available,
        })?;

    Ok(ControlDataPush {
        snr,
        rssi,
        path_len,
        payload: reader.rest().to_vec(),
    })
}

/// Decode a node discovery response from a control payload.
///
/// `key_len` must match what the originating request asked for; the response
/// itself does not say.
pub fn decode_discovery_response(
    payload: &[u8],
    key_len: DiscoveryKeyLength,
) -> Result<DiscoveryResponse, DecodeError> {
    let expected = DISCOVERY_RESPONSE_HEADER_LEN + key_len.byte_len();
    let short = || DecodeError::too_short(MessageKind::DiscoveryResponse, expected, payload.len());
    if payload.len() < DISCOVERY_RESPONSE_HEADER_LEN {
        return Err(short());
    }

    let mut reader = PayloadReader::new(payload);
    let flags = reader.u8().ok_or_else(short)?;
    let sub_type = flags >> 4;
    if sub_type != CTL_TYPE_DISCOVER_RESP {
        return Err(DecodeError::SubTypeMismatch {
            expected: CTL_TYPE_DISCOVER_RESP,
            actual: sub_type,
        });
    }
    ensure_len(MessageKind::DiscoveryResponse, payload, expected)?;

    let snr = snr_from_quantized(reader.u8().ok_or_else(short)?);
    let tag = reader.u32_le().ok_or_else(short)?;
    let key = match key_len {
        DiscoveryKeyLength::Prefix => DiscoveredKey::Prefix(reader.array().ok_or_else(short)?),
        DiscoveryKeyLength::Full => {
            DiscoveredKey::Full(PublicKey::new(reader.array().ok_or_else(short)?))
        }
    };

    Ok(DiscoveryResponse {
        node_type: flags & 0x0F,
        snr,
        tag,
        key,
    })
}

impl ControlDataPush {
    /// Decode the control payload as a discovery response.
    pub fn discovery_response(
        &self,
        key_len: DiscoveryKeyLength,
    ) -> Result<DiscoveryResponse, DecodeError> {
        decode_discovery_response(&self.payload, key_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_payload(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[..PUB_KEY_SIZE].copy_from_slice(&[0xC1; PUB_KEY_SIZE]);
        data[32] = ADV_TYPE_REPEATER;
        data[33] = 0x01;
        data[34] = 0x02; // out_path_len
        data[35] = 0xAA;
        data[36] = 0xBB;
        if len >= 131 {
            data[99..99 + 8].copy_from_slice(b"Repeat1\0");
        }
        if len >= 135 {
            data[131..135].copy_from_slice(&1_700_000_000u32.to_le_bytes());
        }
        if len >= 143 {
            data[135..139].copy_from_slice(&47_777_600i32.to_le_bytes());
            data[139..143].copy_from_slice(&(-122_424_700i32).to_le_bytes());
        }
        if len >= 147 {
            data[143..147].copy_from_slice(&1_700_000_100u32.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_contact_too_short() {
        let err = decode_contact(&contact_payload(98)).unwrap_err();
        assert_eq!(err, DecodeError::too_short(MessageKind::Contact, 99, 98));
    }

    #[test]
    fn test_contact_minimum_has_no_optional_fields() {
        let contact = decode_contact(&contact_payload(99)).unwrap();
        assert_eq!(contact.public_key, PublicKey::new([0xC1; PUB_KEY_SIZE]));
        assert_eq!(contact.advert_type, ADV_TYPE_REPEATER);
        assert_eq!(contact.flags, 0x01);
        assert_eq!(contact.path(), &[0xAA, 0xBB]);
        assert_eq!(contact.name, None);
        assert_eq!(contact.last_advert, None);
        assert_eq!(contact.position, None);
        assert_eq!(contact.lastmod, None);
    }

    #[test]
    fn test_contact_optional_chain_truncates() {
        let contact = decode_contact(&contact_payload(133)).unwrap();
        assert_eq!(contact.name.as_deref(), Some("Repeat1"));
        assert_eq!(contact.last_advert, None);

        let contact = decode_contact(&contact_payload(140)).unwrap();
        assert_eq!(contact.last_advert, Some(1_700_000_000));
        assert_eq!(contact.position, None);
    }

    #[test]
    fn test_contact_full() {
        let contact = decode_contact(&contact_payload(147)).unwrap();
        let position = contact.position.unwrap();
        assert!((position.latitude - 47.7776).abs() < 1e-9);
        assert!((position.longitude + 122.4247).abs() < 1e-9);
        assert_eq!(contact.lastmod, Some(1_700_000_100));
    }

    #[test]
    fn test_contact_flood_path_len() {
        let mut data = contact_payload(99);
        data[34] = 0xFF;
        let contact = decode_contact(&data).unwrap();
        assert_eq!(contact.out_path_len, -1);
        assert!(!contact.has_direct_path());
    }

    #[test]
    fn test_channel_info() {
        let mut data = vec![0u8; CHANNEL_INFO_LEN];
        data[0] = 2;
        data[1..6].copy_from_slice(b"#test");
        data[33..49].copy_from_slice(&[0x42; 16]);

        let channel = decode_channel_info(&data).unwrap();
        assert_eq!(channel.index, 2);
        assert_eq!(channel.name, "#test");
        assert_eq!(channel.secret, [0x42; 16]);

        let err = decode_channel_info(&data[..48]).unwrap_err();
        assert_eq!(err, DecodeError::too_short(MessageKind::ChannelInfo, 49, 48));
    }

    #[test]
    fn test_channel_info_unterminated_name() {
        let mut data = vec![b'x'; CHANNEL_INFO_LEN];
        data[0] = 0;
        let channel = decode_channel_info(&data).unwrap();
        assert_eq!(channel.name.len(), NAME_FIELD_SIZE);
    }

    fn channel_message_common(path_len: u8, with_hop: bool) -> Vec<u8> {
        let mut data = vec![1u8];
        data.extend_from_slice(&[0x5E; PUB_KEY_SIZE]);
        data.push(path_len);
        if with_hop {
            data.extend_from_slice(&[0x77; PUB_KEY_SIZE]);
        }
        data
    }

    #[test]
    fn test_channel_message_full() {
        let mut data = channel_message_common(2, true);
        data.extend_from_slice(&(-7i16).to_le_bytes());
        data.extend_from_slice(&(-101i16).to_le_bytes());
        data.extend_from_slice(b"hello mesh\0junk");

        let msg = decode_channel_message(&data, ChannelMessageVariant::Plain).unwrap();
        assert_eq!(msg.echo, None);
        assert_eq!(msg.channel_index, 1);
        assert_eq!(msg.sender, PublicKey::new([0x5E; PUB_KEY_SIZE]));
        assert_eq!(msg.path_len, 2);
        assert_eq!(msg.first_hop, Some(PublicKey::new([0x77; PUB_KEY_SIZE])));
        assert_eq!(msg.snr, Some(-7));
        assert_eq!(msg.rssi, Some(-101));
        assert_eq!(msg.text.as_deref(), Some("hello mesh"));
    }

    #[test]
    fn test_channel_message_zero_path_has_no_first_hop() {
        let mut data = channel_message_common(0, false);
        data.extend_from_slice(&12i16.to_le_bytes());
        data.extend_from_slice(&(-60i16).to_le_bytes());
        data.extend_from_slice(b"direct");

        let msg = decode_channel_message(&data, ChannelMessageVariant::Plain).unwrap();
        assert_eq!(msg.first_hop, None);
        assert_eq!(msg.snr, Some(12));
        assert_eq!(msg.text.as_deref(), Some("direct"));
    }

    #[test]
    fn test_channel_message_minimal() {
        let data = channel_message_common(3, false);
        let msg = decode_channel_message(&data, ChannelMessageVariant::Plain).unwrap();
        assert_eq!(msg.first_hop, None);
        assert_eq!(msg.snr, None);
        assert_eq!(msg.rssi, None);
        assert_eq!(msg.text, None);

        let err = decode_channel_message(&data[..33], ChannelMessageVariant::Plain).unwrap_err();
        assert!(err.is_length_error());
    }

    #[test]
    fn test_channel_message_echo_prefix() {
        let mut data = vec![0x34, 0x12, 0x01];
        data.extend(channel_message_common(0, false));
        data.extend_from_slice(&[0x10, 0x00, 0x9C, 0xFF]);

        let msg = decode_channel_message(&data, ChannelMessageVariant::Echo).unwrap();
        assert_eq!(
            msg.echo,
            Some(EchoHeader {
                sequence: 0x1234,
                flags: 0x01
            })
        );
        assert_eq!(msg.channel_index, 1);
        assert_eq!(msg.snr, Some(16));
        assert_eq!(msg.rssi, Some(-100));
        assert_eq!(msg.text, None);

        let err = decode_channel_message(&data[..36], ChannelMessageVariant::Echo).unwrap_err();
        assert_eq!(err, DecodeError::too_short(MessageKind::ChannelMessage, 37, 36));
    }

    #[test]
    fn test_snr_quantization() {
        assert_eq!(snr_from_quantized(40), 10);
        assert_eq!(snr_from_quantized(0xF6), -3); // -10 / 4 = -2.5
        assert_eq!(snr_from_quantized(0x80), -32);
        assert_eq!(snr_from_quantized(5), 1);
    }

    fn radio_log(header: u8, transport: bool, path: &[u8]) -> Vec<u8> {
        let mut data = vec![0x2C, 0xA6, header]; // snr 11, rssi -90
        if transport {
            data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        }
        data.push(path.len() as u8);
        data.extend_from_slice(path);
        data.extend_from_slice(&[0x01, 0x02, 0x03]);
        data
    }

    #[test]
    fn test_radio_log_flood_has_hint() {
        let record = decode_radio_log(&radio_log(0x11, false, &[0x3A, 0x7F, 0xC4])).unwrap();
        assert_eq!(record.snr, 11);
        assert_eq!(record.rssi, -90);
        assert_eq!(record.route_type, RouteType::Flood);
        assert_eq!(record.payload_type, 0x04);
        assert_eq!(record.path_len, Some(3));
        assert_eq!(record.repeater_hint.as_deref(), Some("C4"));
    }

    #[test]
    fn test_radio_log_direct_has_no_hint() {
        let record = decode_radio_log(&radio_log(0x12, false, &[0x3A, 0x7F, 0xC4])).unwrap();
        assert_eq!(record.route_type, RouteType::Direct);
        assert_eq!(record.path, vec![0x3A, 0x7F, 0xC4]);
        assert_eq!(record.repeater_hint, None);
    }

    #[test]
    fn test_radio_log_transport_codes_skipped() {
        let record = decode_radio_log(&radio_log(0x00, true, &[0x0B])).unwrap();
        assert_eq!(record.route_type, RouteType::TransportFlood);
        assert_eq!(record.path_len, Some(1));
        assert_eq!(record.path, vec![0x0B]);
        // Only plain flood packets carry a hint.
        assert_eq!(record.repeater_hint, None);

        let record = decode_radio_log(&radio_log(0x03, true, &[0x0B, 0x0C])).unwrap();
        assert_eq!(record.route_type, RouteType::TransportDirect);
        assert_eq!(record.path, vec![0x0B, 0x0C]);
    }

    #[test]
    fn test_radio_log_empty_or_truncated_path() {
        let record = decode_radio_log(&radio_log(0x01, false, &[])).unwrap();
        assert_eq!(record.path_len, Some(0));
        assert_eq!(record.repeater_hint, None);

        // Path length claims 5 bytes but only 2 follow.
        let record = decode_radio_log(&[0x00, 0x00, 0x01, 0x05, 0xAA, 0xBB]).unwrap();
        assert_eq!(record.path_len, Some(5));
        assert!(record.path.is_empty());
        assert_eq!(record.repeater_hint, None);

        // Transport codes cut off.
        let record = decode_radio_log(&[0x00, 0x00, 0x00, 0x01]).unwrap();
        assert_eq!(record.path_len, None);
    }

    #[test]
    fn test_radio_log_negative_path_len() {
        let record = decode_radio_log(&[0x00, 0x00, 0x01, 0xFF, 0xAA]).unwrap();
        assert_eq!(record.path_len, Some(-1));
        assert_eq!(record.repeater_hint, None);
    }

    #[test]
    fn test_radio_log_too_short() {
        let err = decode_radio_log(&[0x10, 0xB0]).unwrap_err();
        assert_eq!(err, DecodeError::too_short(MessageKind::RadioLog, 3, 2));
    }

    #[test]
    fn test_control_data_skips_path() {
        let data = [0xF4, 0xB5, 0x02, 0x11, 0x22, 0x93, 0x18];
        let push = decode_control_data(&data).unwrap();
        assert_eq!(push.snr, -3);
        assert_eq!(push.rssi, -75);
        assert_eq!(push.path_len, 2);
        assert_eq!(push.payload, vec![0x93, 0x18]);
        assert_eq!(push.sub_type(), Some(CTL_TYPE_DISCOVER_RESP));
    }

    #[test]
    fn test_control_data_truncated_path() {
        let err = decode_control_data(&[0x00, 0x00, 0x04, 0x11]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedPath {
                declared: 4,
                available: 1
            }
        );
        assert!(decode_control_data(&[0x00, 0x00]).is_err());
    }

    fn discovery_payload(flags: u8, key: &[u8]) -> Vec<u8> {
        let mut data = vec![flags, 0x1C];
        data.extend_from_slice(&0xCAFEBABEu32.to_le_bytes());
        data.extend_from_slice(key);
        data
    }

    #[test]
    fn test_discovery_response_prefix() {
        let data = discovery_payload(0x92, &[0x11; 8]);
        let resp = decode_discovery_response(&data, DiscoveryKeyLength::Prefix).unwrap();
        assert_eq!(resp.node_type, ADV_TYPE_REPEATER);
        assert_eq!(resp.snr, 7);
        assert_eq!(resp.tag, 0xCAFEBABE);
        assert_eq!(resp.key, DiscoveredKey::Prefix([0x11; 8]));
    }

    #[test]
    fn test_discovery_response_full_key() {
        let data = discovery_payload(0x91, &[0x22; 32]);
        let resp = decode_discovery_response(&data, DiscoveryKeyLength::Full).unwrap();
        assert_eq!(resp.key, DiscoveredKey::Full(PublicKey::new([0x22; 32])));

        let err = decode_discovery_response(&data[..20], DiscoveryKeyLength::Full).unwrap_err();
        assert_eq!(
            err,
            DecodeError::too_short(MessageKind::DiscoveryResponse, 38, 20)
        );
    }

    #[test]
    fn test_discovery_response_sub_type_mismatch() {
        let data = discovery_payload(0x82, &[0x11; 32]);
        let err = decode_discovery_response(&data, DiscoveryKeyLength::Prefix).unwrap_err();
        assert_eq!(
            err,
            DecodeError::SubTypeMismatch {
                expected: CTL_TYPE_DISCOVER_RESP,
                actual: CTL_TYPE_DISCOVER_REQ
            }
        );
        assert!(!err.is_length_error());
    }

    #[test]
    fn test_discovery_response_via_control_push() {
        let mut data = vec![0x10, 0xC0, 0x00];
        data.extend(discovery_payload(0x92, &[0x33; 8]));
        let push = decode_control_data(&data).unwrap();
        let resp = push.discovery_response(DiscoveryKeyLength::Prefix).unwrap();
        assert_eq!(resp.key.as_bytes(), &[0x33; 8]);
    }
}
