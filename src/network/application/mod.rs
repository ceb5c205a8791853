//! # Application Layer Network Protocols
//!
//! Application layer (OSI Layer 7) protocols built on top of the
//! [`Transport`](crate::network::Transport) abstraction.
//!
//! ## Available Protocols
//!
//! - **[`mqtt`]**: MQTT 3.1.1 client (QoS 0) for periodic sensor publishing
//!
//! ## Design Principles
//!
//! - **Transport Agnostic**: Work with any type implementing [`Transport`](crate::network::Transport)
//! - **No-std Compatible**: Designed for embedded systems without heap allocation
//! - **Resource Conscious**: Use fixed-size buffers and minimal memory
//! - **Non-blocking**: Every operation returns immediately; progress is driven
//!   by timer and transport events

/// MQTT client implementation.
///
/// Provides the packet codec, the session model and the timer-driven
/// connection lifecycle of a publish-mostly MQTT 3.1.1 client.
pub mod mqtt;
