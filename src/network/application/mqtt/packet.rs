//! MQTT control packet construction and inbound classification.
//!
//! Every outbound packet is assembled from three parts, each with an explicit
//! length:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────┬─────────────────────┐
//! │ fixed header (2..=5) │ variable header      │ payload             │
//! │ type|flags, RemLen   │ per packet type      │ per packet type     │
//! └──────────────────────┴──────────────────────┴─────────────────────┘
//!                          └──────── Remaining Length ────────────────┘
//! ```
//!
//! The Remaining Length written into the fixed header always equals the
//! variable header length plus the payload length.

use super::length::{decode_remaining_length, encode_remaining_length};
use super::session::{MAX_STRING_LEN, Session};
use crate::network::error::Error;
use heapless::Vec;

/// Largest PUBLISH payload the client will encode.
pub const MAX_PAYLOAD_LEN: usize = 512;

const VARIABLE_HEADER_CAPACITY: usize = 2 + MAX_STRING_LEN;
// CONNECT carries three length-prefixed strings, the largest payload built.
const PAYLOAD_CAPACITY: usize = 3 * (2 + MAX_STRING_LEN);

/// Size of the scratch buffer a serialized packet needs in the worst case.
pub const MAX_PACKET_LEN: usize = 5 + VARIABLE_HEADER_CAPACITY + PAYLOAD_CAPACITY;

/// The CONNECT variable header used by this deployment.
///
/// Protocol name "MQTT", level 4 (3.1.1), flags username + password + clean
/// session, keepalive 50 seconds. None of these are negotiated.
pub const CONNECT_VARIABLE_HEADER: [u8; 10] =
    [0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0xC2, 0x00, 0x32];

/// MQTT control packet types, as carried in the top nibble of byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum MessageType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
}

impl MessageType {
    /// Map a type nibble to a message type. `0` and `15` are reserved.
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        Some(match nibble {
            1 => Self::Connect,
            2 => Self::ConnAck,
            3 => Self::Publish,
            4 => Self::PubAck,
            5 => Self::PubRec,
            6 => Self::PubRel,
            7 => Self::PubComp,
            8 => Self::Subscribe,
            9 => Self::SubAck,
            10 => Self::Unsubscribe,
            11 => Self::UnsubAck,
            12 => Self::PingReq,
            13 => Self::PingResp,
            14 => Self::Disconnect,
            _ => return None,
        })
    }
}

/// One outbound control packet, split into its three wire sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    kind: MessageType,
    fixed_header: Vec<u8, 5>,
    variable_header: Vec<u8, VARIABLE_HEADER_CAPACITY>,
    payload: Vec<u8, PAYLOAD_CAPACITY>,
}

impl Packet {
    /// The control packet type.
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    /// Type/flags byte followed by the encoded Remaining Length.
    pub fn fixed_header(&self) -> &[u8] {
        &self.fixed_header
    }

    /// The type-specific variable header.
    pub fn variable_header(&self) -> &[u8] {
        &self.variable_header
    }

    /// The type-specific payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Bytes after the fixed header.
    pub fn remaining_length(&self) -> usize {
        self.variable_header.len() + self.payload.len()
    }

    /// Total size on the wire.
    pub fn len(&self) -> usize {
        self.fixed_header.len() + self.remaining_length()
    }

    /// Always `false`: even PINGREQ carries a two-byte fixed header.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenate fixed header, variable header and payload.
    pub fn to_bytes(&self) -> Result<Vec<u8, MAX_PACKET_LEN>, Error> {
        let mut bytes = Vec::new();
        for part in [self.fixed_header(), self.variable_header(), self.payload()] {
            bytes
                .extend_from_slice(part)
                .map_err(|_| Error::EncodingOverflow)?;
        }
        Ok(bytes)
    }
}

/// Build an outbound packet of type `kind` for `session`.
///
/// `data` is the application payload and is only used by PUBLISH; the other
/// packet types take everything they need from the session.
///
/// # Errors
///
/// * [`Error::EncodingOverflow`] if a string field is longer than 255 bytes
///   or `data` is longer than [`MAX_PAYLOAD_LEN`].
/// * [`Error::UnsupportedMessageType`] for packet types a client never sends
///   at QoS 0 (acknowledgements, CONNACK, PINGRESP).
///
/// # Examples
///
/// ```rust
/// use libmqtt::network::application::mqtt::packet::{encode, MessageType};
/// use libmqtt::network::application::mqtt::{Config, Session};
///
/// let session = Session::new(&Config::default()).unwrap();
/// let packet = encode(&session, MessageType::Publish, b"42").unwrap();
///
/// assert_eq!(packet.fixed_header(), &[0x30, 0x08]);
/// assert_eq!(packet.variable_header(), b"\x00\x04test");
/// assert_eq!(packet.payload(), b"42");
/// ```
pub fn encode(session: &Session, kind: MessageType, data: &[u8]) -> Result<Packet, Error> {
    let mut packet = Packet {
        kind,
        fixed_header: Vec::new(),
        variable_header: Vec::new(),
        payload: Vec::new(),
    };
    let mut flags = 0u8;

    match kind {
        MessageType::Connect => {
            packet
                .variable_header
                .extend_from_slice(&CONNECT_VARIABLE_HEADER)
                .map_err(|_| Error::EncodingOverflow)?;
            put_string(&mut packet.payload, session.client_id())?;
            put_string(&mut packet.payload, session.username())?;
            put_string(&mut packet.payload, session.password())?;
        }
        MessageType::Publish => {
            // QoS 0: no packet identifier after the topic.
            put_string(&mut packet.variable_header, session.topic())?;
            if data.len() > MAX_PAYLOAD_LEN {
                return Err(Error::EncodingOverflow);
            }
            packet
                .payload
                .extend_from_slice(data)
                .map_err(|_| Error::EncodingOverflow)?;
        }
        MessageType::Subscribe | MessageType::Unsubscribe => {
            flags = 0x02;
            packet
                .variable_header
                .extend_from_slice(&[0x00, 0x00])
                .map_err(|_| Error::EncodingOverflow)?;
            put_string(&mut packet.payload, session.topic())?;
            if kind == MessageType::Subscribe {
                packet
                    .payload
                    .push(session.qos() as u8)
                    .map_err(|_| Error::EncodingOverflow)?;
            }
        }
        MessageType::PingReq | MessageType::Disconnect => {}
        other => {
            error!("refusing to encode message type {}", other);
            return Err(Error::UnsupportedMessageType(other as u8));
        }
    }

    packet
        .fixed_header
        .push(((kind as u8) << 4) | flags)
        .map_err(|_| Error::EncodingOverflow)?;
    let remaining = encode_remaining_length(packet.remaining_length() as u32)?;
    packet
        .fixed_header
        .extend_from_slice(&remaining[1..])
        .map_err(|_| Error::EncodingOverflow)?;

    trace!("encoded {} ({} bytes)", kind, packet.len());
    Ok(packet)
}

/// Write `value` with a zero MSB and a single-byte length.
fn put_string<const N: usize>(buf: &mut Vec<u8, N>, value: &[u8]) -> Result<(), Error> {
    let len = u8::try_from(value.len()).map_err(|_| Error::EncodingOverflow)?;
    buf.extend_from_slice(&[0x00, len])
        .map_err(|_| Error::EncodingOverflow)?;
    buf.extend_from_slice(value)
        .map_err(|_| Error::EncodingOverflow)
}

/// CONNACK return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectReturnCode {
    /// Connection accepted.
    Accepted,
    /// The broker does not support protocol level 4.
    BadProtocolVersion,
    /// The client identifier was rejected.
    BadIdentifier,
    /// The broker is offline or unavailable.
    ServerUnavailable,
    /// Bad username or password.
    BadCredentials,
    /// The client is not authorized to connect.
    NotAuthorized,
    /// A return code outside the MQTT 3.1.1 range.
    Unknown(u8),
}

impl From<u8> for ConnectReturnCode {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Accepted,
            1 => Self::BadProtocolVersion,
            2 => Self::BadIdentifier,
            3 => Self::ServerUnavailable,
            4 => Self::BadCredentials,
            5 => Self::NotAuthorized,
            other => Self::Unknown(other),
        }
    }
}

/// A classified inbound packet, borrowing from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Incoming<'a> {
    /// Broker's answer to CONNECT.
    ConnAck(ConnectReturnCode),
    /// An application message on a subscribed topic.
    Publish {
        /// Topic name bytes.
        topic: &'a [u8],
        /// Application payload.
        payload: &'a [u8],
    },
    /// Subscription acknowledged.
    SubAck,
    /// Unsubscription acknowledged.
    UnsubAck,
    /// Answer to PINGREQ.
    PingResp,
    /// The broker is closing the session.
    Disconnect,
    /// Any other type nibble; ignored by the client.
    Other(u8),
}

/// Classify the first packet in `buf`.
///
/// Returns the packet and the number of bytes it occupied, so a buffer that
/// carries several packets can be walked packet by packet.
///
/// PUBLISH is parsed in full: the topic length prefix is honoured, and a
/// packet identifier is skipped when the QoS bits are non-zero.
///
/// # Errors
///
/// [`Error::MalformedInboundPacket`] when the buffer is empty, its Remaining
/// Length is truncated, it holds fewer bytes than the Remaining Length
/// announces, or a CONNACK/PUBLISH body is too short for its own fields.
pub fn decode(buf: &[u8]) -> Result<(Incoming<'_>, usize), Error> {
    let first = *buf.first().ok_or(Error::MalformedInboundPacket)?;
    let (remaining, len_bytes) = decode_remaining_length(&buf[1..])?;
    let body_start = 1 + len_bytes;
    let total = body_start + remaining as usize;
    let body = buf
        .get(body_start..total)
        .ok_or(Error::MalformedInboundPacket)?;

    let nibble = first >> 4;
    let incoming = match MessageType::from_nibble(nibble) {
        Some(MessageType::ConnAck) => {
            // Byte 3 of the packet: acknowledge flags come first.
            let code = *body.get(1).ok_or(Error::MalformedInboundPacket)?;
            Incoming::ConnAck(ConnectReturnCode::from(code))
        }
        Some(MessageType::Publish) => decode_publish(first, body)?,
        Some(MessageType::SubAck) => Incoming::SubAck,
        Some(MessageType::UnsubAck) => Incoming::UnsubAck,
        Some(MessageType::PingResp) => Incoming::PingResp,
        Some(MessageType::Disconnect) => Incoming::Disconnect,
        _ => Incoming::Other(nibble),
    };

    Ok((incoming, total))
}

fn decode_publish(first: u8, body: &[u8]) -> Result<Incoming<'_>, Error> {
    let len_field = body.get(..2).ok_or(Error::MalformedInboundPacket)?;
    let topic_end = 2 + u16::from_be_bytes([len_field[0], len_field[1]]) as usize;
    let topic = body.get(2..topic_end).ok_or(Error::MalformedInboundPacket)?;

    let qos = (first >> 1) & 0x03;
    let payload_start = if qos > 0 { topic_end + 2 } else { topic_end };
    let payload = body
        .get(payload_start..)
        .ok_or(Error::MalformedInboundPacket)?;

    Ok(Incoming::Publish { topic, payload })
}
