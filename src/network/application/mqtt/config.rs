//! Client configuration.
//!
//! Every option has a default matching the stock sensor firmware, so a device
//! only has to override what differs (typically the broker address, the client
//! id and the credentials). Configuration can be built in code or loaded from
//! a JSON document without an allocator:
//!
//! ```rust
//! use libmqtt::network::application::mqtt::{Config, ConnectMode};
//!
//! let json = r#"{
//!     "broker_addr": [192, 168, 1, 10],
//!     "client_id": "greenhouse-7",
//!     "topic": "greenhouse/7/temperature",
//!     "publish_interval_ms": 60000
//! }"#;
//!
//! let config = Config::from_json(json).unwrap();
//! assert_eq!(config.broker_port, 1883);
//! assert_eq!(config.publish_interval_ms, 60_000);
//! assert_eq!(config.connect_mode, ConnectMode::AwaitConnAck);
//! ```

use crate::network::error::Error;
use serde::Deserialize;

/// Default broker address.
pub const DEFAULT_BROKER_ADDR: [u8; 4] = [10, 0, 81, 146];
/// Default broker port (plain MQTT).
pub const DEFAULT_BROKER_PORT: u16 = 1883;
/// Default topic for both subscribe and publish.
pub const DEFAULT_TOPIC: &str = "test";
/// Default publish cadence.
pub const DEFAULT_PUBLISH_INTERVAL_MS: u32 = 20_000;
/// Default idle time before a PINGREQ is sent.
pub const DEFAULT_KEEPALIVE_INTERVAL_MS: u32 = 30_000;
/// Default network readiness poll period.
pub const DEFAULT_NETWORK_POLL_INTERVAL_MS: u32 = 2_000;
/// Default delay before a failed TCP connect is retried.
pub const DEFAULT_CONNECT_RETRY_INTERVAL_MS: u32 = 1_000;

/// When the client subscribes relative to the broker's CONNACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum ConnectMode {
    /// Send SUBSCRIBE only after an accepted CONNACK, and start publishing
    /// after the SUBACK.
    #[serde(rename = "await_connack")]
    AwaitConnAck,
    /// Pipeline CONNECT and SUBSCRIBE as soon as TCP is up and start
    /// publishing immediately, without waiting for any acknowledgement.
    Optimistic,
}

/// Options recognised by the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config<'a> {
    /// Broker IPv4 address.
    pub broker_addr: [u8; 4],
    /// Broker TCP port.
    pub broker_port: u16,
    /// Client identifier. May be empty.
    #[serde(borrow)]
    pub client_id: &'a str,
    /// Username. Empty when the broker allows anonymous access.
    #[serde(borrow)]
    pub username: &'a str,
    /// Password. Empty when the broker allows anonymous access.
    #[serde(borrow)]
    pub password: &'a str,
    /// The single subscribe/publish topic.
    #[serde(borrow)]
    pub topic: &'a str,
    /// Period of the publish timer.
    pub publish_interval_ms: u32,
    /// Idle time after the last send before a PINGREQ goes out.
    pub keepalive_interval_ms: u32,
    /// Period of the network readiness poll.
    pub network_poll_interval_ms: u32,
    /// Delay before retrying a failed TCP connect.
    pub connect_retry_interval_ms: u32,
    /// CONNACK-gated or pipelined subscribe.
    pub connect_mode: ConnectMode,
    /// Go back to polling the network after a disconnect instead of stopping.
    pub reconnect: bool,
}

impl Default for Config<'_> {
    fn default() -> Self {
        Self {
            broker_addr: DEFAULT_BROKER_ADDR,
            broker_port: DEFAULT_BROKER_PORT,
            client_id: "",
            username: "",
            password: "",
            topic: DEFAULT_TOPIC,
            publish_interval_ms: DEFAULT_PUBLISH_INTERVAL_MS,
            keepalive_interval_ms: DEFAULT_KEEPALIVE_INTERVAL_MS,
            network_poll_interval_ms: DEFAULT_NETWORK_POLL_INTERVAL_MS,
            connect_retry_interval_ms: DEFAULT_CONNECT_RETRY_INTERVAL_MS,
            connect_mode: ConnectMode::AwaitConnAck,
            reconnect: true,
        }
    }
}

impl<'a> Config<'a> {
    /// Parse a JSON configuration document. Missing keys take their defaults.
    ///
    /// Strings are borrowed from `json`, so they must not contain escape
    /// sequences.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] for malformed JSON, unknown enum values or a
    /// zero interval.
    pub fn from_json(json: &'a str) -> Result<Self, Error> {
        let (config, _): (Self, _) =
            serde_json_core::from_str(json).map_err(|_| Error::InvalidConfig)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the options that cannot be expressed in the type.
    ///
    /// Every timer period must be non-zero; a zero period would make a
    /// repeating timer fire forever within a single poll.
    pub fn validate(&self) -> Result<(), Error> {
        let intervals = [
            self.publish_interval_ms,
            self.keepalive_interval_ms,
            self.network_poll_interval_ms,
            self.connect_retry_interval_ms,
        ];
        if intervals.contains(&0) {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}
