//! A minimal MQTT 3.1.1 client for single-threaded, timer-driven devices.
//!
//! The client connects to one broker over TCP, subscribes to one topic and
//! periodically publishes the most recent sensor reading on that same topic,
//! always at QoS 0. It keeps the connection alive with PINGREQ whenever
//! nothing has been sent for a keepalive interval.
//!
//! # Layout
//!
//! - [`length`]: the Remaining Length variable-length integer
//! - [`packet`]: building outbound control packets and classifying inbound ones
//! - [`session`]: identity, credentials and connection state
//! - [`config`]: options with defaults and JSON loading
//! - [`timer`]: timer identities, timer intents and a software alarm table
//! - [`client`]: the connection lifecycle state machine
//!
//! # Usage
//!
//! ```rust
//! use libmqtt::network::application::mqtt::{Config, ConnectMode, QoS, Reading, Session};
//! use libmqtt::network::application::mqtt::packet::{encode, MessageType};
//!
//! let config = Config {
//!     client_id: "dev1",
//!     username: "u",
//!     password: "p",
//!     connect_mode: ConnectMode::AwaitConnAck,
//!     ..Config::default()
//! };
//! let session = Session::new(&config).unwrap();
//! assert_eq!(session.qos(), QoS::AtMostOnce);
//!
//! let connect = encode(&session, MessageType::Connect, &[]).unwrap();
//! assert_eq!(connect.fixed_header(), &[0x10, 0x16]);
//!
//! let payload = Reading::Integer(42).render().unwrap();
//! let publish = encode(&session, MessageType::Publish, payload.as_bytes()).unwrap();
//! assert_eq!(publish.payload(), b"0042");
//! ```

pub mod client;
pub mod config;
pub mod length;
pub mod packet;
pub mod session;
pub mod timer;

pub use client::{Client, Event, Handler, State, Transition};
pub use config::{Config, ConnectMode};
pub use packet::{ConnectReturnCode, Incoming, MessageType, Packet};
pub use session::{QoS, Reading, Session};
pub use timer::{Intents, Mode, TimerCommand, TimerId, Timers};
