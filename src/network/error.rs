//! Common error types for network operations

use core::fmt;

/// The error type shared by the transport layer and the MQTT engine.
///
/// Every variant is recoverable from the point of view of the connection
/// lifecycle: the client either schedules a retry or drops the offending
/// message and waits for the next timer cycle. It is `Copy` and carries no
/// heap data so it can be returned from interrupt-adjacent code in `no_std`
/// environments.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// A send was attempted while the session has no valid connection.
    ///
    /// Nothing was handed to the transport. The caller should treat the
    /// message as dropped.
    NoConnection,
    /// The transport rejected a connect request.
    TransportConnectFailed,
    /// The transport refused to accept outbound bytes.
    TransportSendFailed,
    /// An inbound buffer was too short, or inconsistent with its own
    /// Remaining Length, to be classified.
    MalformedInboundPacket,
    /// An encode was requested for a control packet type this client never
    /// builds (the raw type nibble is attached).
    ///
    /// This points at a programming error at the call site.
    UnsupportedMessageType(u8),
    /// A length-prefixed field is longer than 255 bytes, a payload is larger
    /// than the packet buffer, or a Remaining Length is above the MQTT
    /// maximum of 268,435,455.
    EncodingOverflow,
    /// The configuration document could not be parsed.
    InvalidConfig,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoConnection => write!(f, "no connection"),
            Error::TransportConnectFailed => write!(f, "transport connect failed"),
            Error::TransportSendFailed => write!(f, "transport send failed"),
            Error::MalformedInboundPacket => write!(f, "malformed inbound packet"),
            Error::UnsupportedMessageType(t) => write!(f, "unsupported message type: {}", t),
            Error::EncodingOverflow => write!(f, "encoding overflow"),
            Error::InvalidConfig => write!(f, "invalid configuration"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NoConnection => defmt::write!(f, "NoConnection"),
            Error::TransportConnectFailed => defmt::write!(f, "TransportConnectFailed"),
            Error::TransportSendFailed => defmt::write!(f, "TransportSendFailed"),
            Error::MalformedInboundPacket => defmt::write!(f, "MalformedInboundPacket"),
            Error::UnsupportedMessageType(t) => defmt::write!(f, "UnsupportedMessageType({})", t),
            Error::EncodingOverflow => defmt::write!(f, "EncodingOverflow"),
            Error::InvalidConfig => defmt::write!(f, "InvalidConfig"),
        }
    }
}
