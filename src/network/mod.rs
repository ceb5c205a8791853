//! A network abstraction layer for event-driven embedded stacks
//!
//! The MQTT engine never touches sockets or radios directly. The firmware
//! supplies two small collaborators instead:
//!
//! - a [`Transport`], which issues TCP connects and queues outbound bytes,
//!   reporting completion later through [`TransportEvent`]s;
//! - a [`NetworkStatus`] probe, which answers whether the station currently
//!   holds an address.
//!
//! Both are synchronous and must return immediately. Anything asynchronous in
//! the underlying stack is reported back as an event on the next turn of the
//! firmware's event loop.

#![deny(unsafe_code)]

use core::net::SocketAddrV4;

/// Common error types for network operations
pub mod error;

/// Protocol-specific client implementations
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{NetworkStatus, Transport};
}

/// Opaque identifier of one open transport connection.
///
/// Handed out by [`Transport::connect`] and echoed back in every
/// [`TransportEvent`] that concerns that connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionHandle(pub u16);

/// A non-blocking, callback-style TCP transport.
pub trait Transport {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Start connecting to `remote`.
    ///
    /// Returning `Ok` only means the request was accepted; the outcome is
    /// delivered later as [`TransportEvent::Connected`] or
    /// [`TransportEvent::Reconnect`].
    fn connect(&mut self, remote: SocketAddrV4) -> Result<ConnectionHandle, Self::Error>;

    /// Queue `bytes` for transmission on `handle`.
    ///
    /// The buffer only has to live for the duration of the call.
    fn send(&mut self, handle: ConnectionHandle, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Tear down the connection behind `handle`.
    fn close(&mut self, handle: ConnectionHandle) -> Result<(), Self::Error>;
}

/// Reports whether the link layer is ready to carry traffic.
pub trait NetworkStatus {
    /// `true` once the station is associated and holds a non-zero address.
    fn has_address(&self) -> bool;
}

/// Lifecycle and data events reported by a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportEvent<'a> {
    /// The connect request completed.
    Connected(ConnectionHandle),
    /// The connection attempt or an established connection failed with the
    /// stack's error code.
    Reconnect(ConnectionHandle, i8),
    /// The connection was closed.
    Disconnected(ConnectionHandle),
    /// Bytes arrived from the peer.
    Received(ConnectionHandle, &'a [u8]),
    /// A previous send was flushed. Purely advisory.
    Sent(ConnectionHandle),
}
