//! # libmqtt - timer-driven MQTT for sensor nodes
//!
//! A small MQTT 3.1.1 client for single-threaded, event-driven embedded
//! devices. It connects to one broker over TCP, subscribes to one topic and
//! periodically publishes the latest sensor reading to that topic at QoS 0.
//! The crate is `no_std`, allocation-free and never blocks.
//!
//! ## Features
//!
//! ### Protocol
//! - **Packet codec**: CONNECT, PUBLISH, SUBSCRIBE, UNSUBSCRIBE, PINGREQ and
//!   DISCONNECT builders with explicit fixed header, variable header and payload
//! - **Remaining Length**: the MQTT variable-length integer, both directions
//! - **Inbound classification**: CONNACK return codes, SUBACK, PINGRESP and
//!   application PUBLISH messages
//!
//! ### Lifecycle
//! - Network readiness polling, TCP connect with retry, CONNACK-gated
//!   subscribe, periodic publish and idle keepalive
//! - Timer intents returned as data, plus a software alarm table for
//!   firmware without hardware timer callbacks
//! - Optional reconnect after the connection drops
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libmqtt = "0.1.0"
//! ```
//!
//! ### Encoding a packet
//!
//! ```rust
//! use libmqtt::network::application::mqtt::{Config, Session};
//! use libmqtt::network::application::mqtt::packet::{encode, MessageType};
//!
//! let session = Session::new(&Config::default()).unwrap();
//! let packet = encode(&session, MessageType::PingReq, &[]).unwrap();
//! assert_eq!(packet.to_bytes().unwrap().as_slice(), &[0xC0, 0x00]);
//! ```
//!
//! ### Driving the lifecycle
//!
//! See [`network::application::mqtt::client`] for a complete walk from
//! network polling to steady state.
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, Xtensa)
//! - Linux hosts, for testing against a real broker
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![doc(html_root_url = "https://shishir-dey.github.io/libmqtt/")]

// Must come first so the logging macros are visible to every module below.
mod fmt;

/// Network abstraction layer and the MQTT client built on it.
///
/// Holds the [`Transport`](network::Transport) and
/// [`NetworkStatus`](network::NetworkStatus) seams the firmware implements,
/// the shared error type and the MQTT application protocol.
pub mod network;
