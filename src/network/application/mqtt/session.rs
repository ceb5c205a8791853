//! The in-memory record of one broker connection.

use super::config::Config;
use crate::network::ConnectionHandle;
use crate::network::error::Error;
use core::fmt::Write as _;
use core::net::{Ipv4Addr, SocketAddrV4};
use heapless::{String, Vec};

/// Longest client identifier, username, password or topic the client accepts.
///
/// Strings are written with a single-byte length, so this is a hard limit of
/// the encoder rather than a tunable.
pub const MAX_STRING_LEN: usize = 255;

/// A length-bounded byte string held by the session.
pub type Field = Vec<u8, MAX_STRING_LEN>;

/// Quality of Service levels for MQTT messages.
///
/// Only "at most once" is spoken by this client: no packet identifiers are
/// tracked and nothing is acknowledged.
///
/// ```rust
/// use libmqtt::network::application::mqtt::QoS;
///
/// assert_eq!(QoS::AtMostOnce as u8, 0);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QoS {
    /// **QoS 0**: At most once delivery.
    AtMostOnce = 0,
}

/// A sensor value staged for the next PUBLISH.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// Rendered as a decimal, zero-padded to four digits (`7` becomes `"0007"`).
    Integer(i32),
    /// Rendered with two decimals (`21.5` becomes `"21.50"`).
    Float(f32),
}

impl Reading {
    /// Render the reading as the ASCII payload of a PUBLISH.
    ///
    /// ```rust
    /// use libmqtt::network::application::mqtt::Reading;
    ///
    /// assert_eq!(Reading::Integer(1).render().unwrap().as_str(), "0001");
    /// assert_eq!(Reading::Float(34.2).render().unwrap().as_str(), "34.20");
    /// ```
    pub fn render(&self) -> Result<String<48>, Error> {
        let mut out = String::new();
        match self {
            Reading::Integer(value) => write!(out, "{:04}", value),
            Reading::Float(value) => write!(out, "{:.2}", value),
        }
        .map_err(|_| Error::EncodingOverflow)?;
        Ok(out)
    }
}

/// Identity, credentials and live state of the broker connection.
///
/// The session is built once from a [`Config`] and lives as long as the
/// client. Its connection state moves through three stages:
///
/// 1. no handle: nothing in flight;
/// 2. handle attached: a transport connect was issued but has not completed;
/// 3. established: the transport reported success and sends are allowed.
#[derive(Debug, Clone)]
pub struct Session {
    broker: SocketAddrV4,
    client_id: Field,
    username: Field,
    password: Field,
    topic: Field,
    qos: QoS,
    connection_valid: bool,
    handle: Option<ConnectionHandle>,
    pending: Option<Reading>,
}

impl Session {
    /// Build a session from configuration.
    ///
    /// # Errors
    ///
    /// [`Error::EncodingOverflow`] if the client id, username, password or
    /// topic is longer than [`MAX_STRING_LEN`] bytes.
    pub fn new(config: &Config<'_>) -> Result<Self, Error> {
        Ok(Self {
            broker: SocketAddrV4::new(Ipv4Addr::from(config.broker_addr), config.broker_port),
            client_id: field(config.client_id)?,
            username: field(config.username)?,
            password: field(config.password)?,
            topic: field(config.topic)?,
            qos: QoS::AtMostOnce,
            connection_valid: false,
            handle: None,
            pending: None,
        })
    }

    /// Broker address and port.
    pub fn broker(&self) -> SocketAddrV4 {
        self.broker
    }

    /// Client identifier bytes.
    pub fn client_id(&self) -> &[u8] {
        &self.client_id
    }

    /// Username bytes, empty when the broker needs no credentials.
    pub fn username(&self) -> &[u8] {
        &self.username
    }

    /// Password bytes, empty when the broker needs no credentials.
    pub fn password(&self) -> &[u8] {
        &self.password
    }

    /// The single topic used for both SUBSCRIBE and PUBLISH.
    pub fn topic(&self) -> &[u8] {
        &self.topic
    }

    /// Requested QoS, always [`QoS::AtMostOnce`].
    pub fn qos(&self) -> QoS {
        self.qos
    }

    /// `true` once the transport has reported a completed connect and until
    /// it reports a disconnect.
    pub fn is_connected(&self) -> bool {
        self.connection_valid
    }

    /// Handle of the connection in flight or established, if any.
    pub fn handle(&self) -> Option<ConnectionHandle> {
        self.handle
    }

    /// The reading waiting for the next publish cycle.
    pub fn pending(&self) -> Option<Reading> {
        self.pending
    }

    pub(crate) fn attach(&mut self, handle: ConnectionHandle) {
        self.handle = Some(handle);
    }

    pub(crate) fn establish(&mut self, handle: ConnectionHandle) {
        self.handle = Some(handle);
        self.connection_valid = true;
    }

    /// Drop the connection state, returning the handle that was held.
    pub(crate) fn invalidate(&mut self) -> Option<ConnectionHandle> {
        self.connection_valid = false;
        self.handle.take()
    }

    pub(crate) fn stage(&mut self, reading: Reading) {
        self.pending = Some(reading);
    }

    pub(crate) fn take_pending(&mut self) -> Option<Reading> {
        self.pending.take()
    }
}

fn field(value: &str) -> Result<Field, Error> {
    Vec::from_slice(value.as_bytes()).map_err(|_| Error::EncodingOverflow)
}
