//! The connection lifecycle of a publish-mostly MQTT 3.1.1 client.
//!
//! [`Client`] is the explicit context that owns everything the lifecycle
//! touches: the [`Session`], the [`Timers`] table, the [`Transport`], the
//! [`NetworkStatus`] probe and the user's [`Handler`]. It is driven by a single
//! dispatcher, [`Client::handle`], fed with timer expirations and transport
//! events by the firmware's event loop. Nothing blocks; every call returns a
//! [`Transition`] describing the timer changes it made and whether it hit an
//! error.
//!
//! # States
//!
//! ```text
//!                 ┌──────────────────────── NetworkPoll (reconnect) ─────────────────┐
//!                 ▼                                                                  │
//! WaitingForNetwork ──ready──▶ ConnectingTransport ──Connected──▶ AwaitingConnAck    │
//!   ▲      │ not ready              │  ▲                              │ CONNACK ok   │
//!   └──────┘ (re-arm poll)          └──┘ ConnectRetry               ▼              │
//!                                                                  Subscribing       │
//!                                                                       │ SUBACK     │
//!                                                                       ▼            │
//!                                      any state ──Disconnected──▶ Disconnected ─────┘
//!                                                                  ▲
//!                                                      SteadyState ┘ (publish + ping)
//! ```
//!
//! With [`ConnectMode::Optimistic`] the client goes straight from
//! `ConnectingTransport` to `SteadyState`, pipelining CONNECT and SUBSCRIBE.
//!
//! # Example
//!
//! ```rust
//! use core::net::SocketAddrV4;
//! use libmqtt::network::{ConnectionHandle, NetworkStatus, Transport, TransportEvent};
//! use libmqtt::network::application::mqtt::{Client, Config, Event, Reading, State};
//!
//! struct Radio;
//! impl NetworkStatus for Radio {
//!     fn has_address(&self) -> bool { true }
//! }
//!
//! struct Tcp;
//! impl Transport for Tcp {
//!     type Error = ();
//!     fn connect(&mut self, _remote: SocketAddrV4) -> Result<ConnectionHandle, ()> {
//!         Ok(ConnectionHandle(1))
//!     }
//!     fn send(&mut self, _handle: ConnectionHandle, _bytes: &[u8]) -> Result<(), ()> { Ok(()) }
//!     fn close(&mut self, _handle: ConnectionHandle) -> Result<(), ()> { Ok(()) }
//! }
//!
//! let config = Config { client_id: "dev1", ..Config::default() };
//! let mut client = Client::new(&config, Tcp, Radio, ()).unwrap();
//!
//! let _ = client.start(0);
//! while client.poll(2_000).is_some() {}
//! assert_eq!(client.state(), State::ConnectingTransport);
//!
//! let _ = client.handle(2_050, Event::Transport(TransportEvent::Connected(ConnectionHandle(1))));
//! let _ = client.handle(2_080, Event::Transport(TransportEvent::Received(
//!     ConnectionHandle(1),
//!     &[0x20, 0x02, 0x00, 0x00],
//! )));
//! let _ = client.handle(2_100, Event::Transport(TransportEvent::Received(
//!     ConnectionHandle(1),
//!     &[0x90, 0x03, 0x00, 0x00, 0x00],
//! )));
//! assert_eq!(client.state(), State::SteadyState);
//!
//! client.stage(Reading::Float(21.5));
//! ```

use super::config::{Config, ConnectMode};
use super::packet::{self, ConnectReturnCode, Incoming, MessageType};
use super::session::{Reading, Session};
use super::timer::{Intents, Mode, TimerCommand, TimerId, Timers};
use crate::network::error::Error;
use crate::network::{ConnectionHandle, NetworkStatus, Transport, TransportEvent};

/// Notifications the application may subscribe to.
///
/// Both methods default to doing nothing, so an implementor only provides
/// the capabilities it needs. `()` is the handler that ignores everything.
pub trait Handler {
    /// A CONNACK arrived. Called for every return code, accepted or not.
    fn on_connack(&mut self, code: ConnectReturnCode) {
        let _ = code;
    }

    /// An application message arrived on a subscribed topic.
    fn on_publish(&mut self, topic: &[u8], payload: &[u8]) {
        let _ = (topic, payload);
    }
}

impl Handler for () {}

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Built but not started.
    Idle,
    /// Polling the network for an address.
    WaitingForNetwork,
    /// A TCP connect has been issued.
    ConnectingTransport,
    /// CONNECT sent, waiting for the broker's CONNACK.
    AwaitingConnAck,
    /// SUBSCRIBE sent, waiting for the SUBACK.
    Subscribing,
    /// Connected and subscribed; publishing and keeping the link alive.
    SteadyState,
    /// The connection is gone. Terminal unless reconnect is enabled.
    Disconnected,
}

/// Input to [`Client::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event<'a> {
    /// An alarm fired.
    TimerExpired(TimerId),
    /// The transport reported something.
    Transport(TransportEvent<'a>),
}

/// What one call into the client did.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Net timer changes, already applied to the client's [`Timers`].
    pub intents: Intents,
    /// `Err` if the step hit an error; the lifecycle has already recovered
    /// (retry scheduled or message dropped).
    pub outcome: Result<(), Error>,
}

/// An MQTT client session driven by timer and transport events.
///
/// # Type Parameters
///
/// * `T` - the transport implementing [`Transport`]
/// * `N` - the readiness probe implementing [`NetworkStatus`]
/// * `H` - the application callbacks implementing [`Handler`]
#[derive(Debug)]
pub struct Client<T: Transport, N: NetworkStatus, H: Handler> {
    session: Session,
    timers: Timers,
    state: State,
    transport: T,
    network: N,
    handler: H,
    connect_mode: ConnectMode,
    reconnect: bool,
    publish_interval_ms: u32,
    keepalive_interval_ms: u32,
    network_poll_interval_ms: u32,
    connect_retry_interval_ms: u32,
    now_ms: u64,
    intents: Intents,
}

impl<T: Transport, N: NetworkStatus, H: Handler> Client<T, N, H> {
    /// Build a client from configuration. Nothing happens until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidConfig`] if an interval is zero.
    /// * [`Error::EncodingOverflow`] if a string option is longer than 255 bytes.
    pub fn new(config: &Config<'_>, transport: T, network: N, handler: H) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            session: Session::new(config)?,
            timers: Timers::new(),
            state: State::Idle,
            transport,
            network,
            handler,
            connect_mode: config.connect_mode,
            reconnect: config.reconnect,
            publish_interval_ms: config.publish_interval_ms,
            keepalive_interval_ms: config.keepalive_interval_ms,
            network_poll_interval_ms: config.network_poll_interval_ms,
            connect_retry_interval_ms: config.connect_retry_interval_ms,
            now_ms: 0,
            intents: Intents::new(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The session record.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The alarm table, for firmware that sleeps until the next deadline.
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The readiness probe.
    pub fn network(&self) -> &N {
        &self.network
    }

    /// Mutable access to the readiness probe.
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// The application handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutable access to the application handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Stage `reading` for the next publish cycle, replacing any reading that
    /// has not been published yet.
    pub fn stage(&mut self, reading: Reading) {
        self.session.stage(reading);
    }

    /// Begin polling the network. Restarts the lifecycle from any state.
    pub fn start(&mut self, now_ms: u64) -> Transition {
        self.begin(now_ms);
        info!("waiting for network");
        self.state = State::WaitingForNetwork;
        self.arm(TimerId::NetworkPoll, self.network_poll_interval_ms, Mode::Repeating);
        self.finish(Ok(()))
    }

    /// Fire the next alarm due at `now_ms`, if any.
    ///
    /// Call in a loop until it returns `None` to drain everything that is due.
    pub fn poll(&mut self, now_ms: u64) -> Option<Transition> {
        let timer = self.timers.pop_expired(now_ms)?;
        Some(self.handle(now_ms, Event::TimerExpired(timer)))
    }

    /// Feed one event into the state machine.
    pub fn handle(&mut self, now_ms: u64, event: Event<'_>) -> Transition {
        self.begin(now_ms);
        let outcome = match event {
            Event::TimerExpired(timer) => self.on_timer(timer),
            Event::Transport(event) => self.on_transport(event),
        };
        self.finish(outcome)
    }

    /// Send `data` as a PUBLISH on the session topic.
    pub fn publish(&mut self, now_ms: u64, data: &[u8]) -> Transition {
        self.send(now_ms, MessageType::Publish, data)
    }

    /// Send a PINGREQ.
    pub fn ping(&mut self, now_ms: u64) -> Transition {
        self.send(now_ms, MessageType::PingReq, &[])
    }

    /// Send a SUBSCRIBE for the session topic.
    pub fn subscribe(&mut self, now_ms: u64) -> Transition {
        self.send(now_ms, MessageType::Subscribe, &[])
    }

    /// Send an UNSUBSCRIBE for the session topic.
    pub fn unsubscribe(&mut self, now_ms: u64) -> Transition {
        self.send(now_ms, MessageType::Unsubscribe, &[])
    }

    /// Encode and send one control packet.
    ///
    /// Rejected with [`Error::NoConnection`], without touching the transport,
    /// unless the session is connected. Every successful send other than
    /// DISCONNECT re-arms the keepalive.
    pub fn send(&mut self, now_ms: u64, kind: MessageType, data: &[u8]) -> Transition {
        self.begin(now_ms);
        let outcome = self.send_packet(kind, data);
        self.finish(outcome)
    }

    /// Say goodbye to the broker and close the transport.
    ///
    /// Ping and publish timers are disarmed. The client stays in
    /// [`State::Disconnected`] until [`start`](Self::start) is called again,
    /// whatever the reconnect setting.
    pub fn disconnect(&mut self, now_ms: u64) -> Transition {
        self.begin(now_ms);
        let outcome = self.send_packet(MessageType::Disconnect, &[]);
        self.disarm(TimerId::KeepAlive);
        self.disarm(TimerId::Publish);
        self.disarm(TimerId::ConnectRetry);
        self.disarm(TimerId::NetworkPoll);
        if let Some(handle) = self.session.invalidate() {
            self.close(handle);
        }
        self.state = State::Disconnected;
        info!("disconnected from broker");
        self.finish(outcome)
    }

    fn begin(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        self.intents.clear();
    }

    fn finish(&mut self, outcome: Result<(), Error>) -> Transition {
        Transition {
            intents: core::mem::take(&mut self.intents),
            outcome,
        }
    }

    fn arm(&mut self, timer: TimerId, after_ms: u32, mode: Mode) {
        self.record(TimerCommand::Arm {
            timer,
            after_ms,
            mode,
        });
    }

    fn disarm(&mut self, timer: TimerId) {
        self.record(TimerCommand::Disarm(timer));
    }

    fn record(&mut self, command: TimerCommand) {
        self.timers.apply(self.now_ms, command);
        // Only the last command per alarm matters: arming implies disarming.
        self.intents.retain(|pending| pending.timer() != command.timer());
        if self.intents.push(command).is_err() {
            error!("timer intent list full");
        }
    }

    fn on_timer(&mut self, timer: TimerId) -> Result<(), Error> {
        match timer {
            TimerId::NetworkPoll => self.poll_network(),
            TimerId::ConnectRetry => self.retry_connect(),
            TimerId::KeepAlive => {
                debug!("keepalive due");
                self.send_packet(MessageType::PingReq, &[])
            }
            TimerId::Publish => self.publish_staged(),
        }
    }

    fn poll_network(&mut self) -> Result<(), Error> {
        match self.state {
            State::WaitingForNetwork | State::Disconnected => {}
            other => {
                debug!("stale network poll in state {}", other);
                self.disarm(TimerId::NetworkPoll);
                return Ok(());
            }
        }

        self.state = State::WaitingForNetwork;
        if !self.network.has_address() {
            trace!("no address yet");
            self.arm(TimerId::NetworkPoll, self.network_poll_interval_ms, Mode::Repeating);
            return Ok(());
        }

        info!("network ready, connecting to broker");
        self.disarm(TimerId::NetworkPoll);
        self.state = State::ConnectingTransport;
        self.connect_transport()
    }

    fn retry_connect(&mut self) -> Result<(), Error> {
        if self.state != State::ConnectingTransport {
            debug!("stale connect retry in state {}", self.state);
            return Ok(());
        }
        if let Some(handle) = self.session.invalidate() {
            warn!("connect on {} did not complete, abandoning it", handle);
            self.close(handle);
        }
        if !self.network.has_address() {
            debug!("network lost, waiting before reconnecting");
            self.arm(TimerId::ConnectRetry, self.connect_retry_interval_ms, Mode::OneShot);
            return Ok(());
        }
        self.connect_transport()
    }

    fn connect_transport(&mut self) -> Result<(), Error> {
        match self.transport.connect(self.session.broker()) {
            Ok(handle) => {
                debug!("connect issued on {}", handle);
                self.session.attach(handle);
                // Cancelled by the Connected event.
                self.arm(TimerId::ConnectRetry, self.connect_retry_interval_ms, Mode::OneShot);
                Ok(())
            }
            Err(_) => {
                warn!(
                    "transport connect failed, retrying in {} ms",
                    self.connect_retry_interval_ms
                );
                self.arm(TimerId::ConnectRetry, self.connect_retry_interval_ms, Mode::OneShot);
                Err(Error::TransportConnectFailed)
            }
        }
    }

    fn publish_staged(&mut self) -> Result<(), Error> {
        if !self.session.is_connected() {
            warn!("publish due without a connection");
            return Err(Error::NoConnection);
        }
        let Some(reading) = self.session.take_pending() else {
            debug!("publish due, nothing staged");
            return Ok(());
        };
        let text = reading.render()?;
        self.send_packet(MessageType::Publish, text.as_bytes())
    }

    fn send_packet(&mut self, kind: MessageType, data: &[u8]) -> Result<(), Error> {
        let handle = match self.session.handle() {
            Some(handle) if self.session.is_connected() => handle,
            _ => {
                warn!("no connection, dropping {}", kind);
                return Err(Error::NoConnection);
            }
        };

        let bytes = packet::encode(&self.session, kind, data)?.to_bytes()?;
        self.transport
            .send(handle, &bytes)
            .map_err(|_| Error::TransportSendFailed)?;
        debug!("sent {} ({} bytes)", kind, bytes.len());

        if kind != MessageType::Disconnect {
            self.arm(TimerId::KeepAlive, self.keepalive_interval_ms, Mode::OneShot);
        }
        Ok(())
    }

    fn on_transport(&mut self, event: TransportEvent<'_>) -> Result<(), Error> {
        let handle = match event {
            TransportEvent::Connected(handle)
            | TransportEvent::Reconnect(handle, _)
            | TransportEvent::Disconnected(handle)
            | TransportEvent::Received(handle, _)
            | TransportEvent::Sent(handle) => handle,
        };
        if self.session.handle() != Some(handle) {
            debug!("ignoring event for stale connection {}", handle);
            return Ok(());
        }

        match event {
            TransportEvent::Connected(handle) => self.on_connected(handle),
            TransportEvent::Reconnect(handle, code) => {
                warn!("transport error {} on {}", code, handle);
                if self.state == State::ConnectingTransport {
                    let _ = self.session.invalidate();
                    self.arm(TimerId::ConnectRetry, self.connect_retry_interval_ms, Mode::OneShot);
                    Err(Error::TransportConnectFailed)
                } else {
                    self.connection_lost();
                    Ok(())
                }
            }
            TransportEvent::Disconnected(handle) => {
                info!("transport disconnected on {}", handle);
                self.connection_lost();
                Ok(())
            }
            TransportEvent::Received(_, bytes) => self.receive(bytes),
            TransportEvent::Sent(handle) => {
                trace!("send completed on {}", handle);
                Ok(())
            }
        }
    }

    fn on_connected(&mut self, handle: ConnectionHandle) -> Result<(), Error> {
        if self.state != State::ConnectingTransport {
            warn!("unexpected connect on {} in state {}", handle, self.state);
            return Ok(());
        }

        info!("transport connected on {}", handle);
        self.session.establish(handle);
        self.disarm(TimerId::ConnectRetry);

        match self.connect_mode {
            ConnectMode::AwaitConnAck => {
                self.state = State::AwaitingConnAck;
                self.bring_up_send(MessageType::Connect)
            }
            ConnectMode::Optimistic => {
                self.bring_up_send(MessageType::Connect)?;
                self.bring_up_send(MessageType::Subscribe)?;
                self.enter_steady_state();
                Ok(())
            }
        }
    }

    /// Send CONNECT or SUBSCRIBE; a session that cannot be set up is torn
    /// down so the reconnect path takes over.
    fn bring_up_send(&mut self, kind: MessageType) -> Result<(), Error> {
        let result = self.send_packet(kind, &[]);
        if result.is_err() {
            warn!("could not send {} during setup, dropping connection", kind);
            self.drop_connection();
        }
        result
    }

    /// Close the transport and handle it as a lost connection.
    fn drop_connection(&mut self) {
        if let Some(handle) = self.session.handle() {
            self.close(handle);
        }
        self.connection_lost();
    }

    fn close(&mut self, handle: ConnectionHandle) {
        if self.transport.close(handle).is_err() {
            warn!("transport refused to close connection {}", handle);
        }
    }

    fn connection_lost(&mut self) {
        if self.session.handle().is_none() {
            debug!("no connection to tear down");
            return;
        }

        self.disarm(TimerId::KeepAlive);
        self.disarm(TimerId::Publish);
        self.disarm(TimerId::ConnectRetry);
        let _ = self.session.invalidate();
        self.state = State::Disconnected;

        if self.reconnect {
            info!("connection lost, polling network again");
            self.arm(TimerId::NetworkPoll, self.network_poll_interval_ms, Mode::Repeating);
        } else {
            info!("connection lost, stopping");
        }
    }

    fn enter_steady_state(&mut self) {
        info!("session established, publishing every {} ms", self.publish_interval_ms);
        self.state = State::SteadyState;
        self.arm(TimerId::Publish, self.publish_interval_ms, Mode::Repeating);
    }

    /// Dispatch every packet in `bytes`. A packet whose handling fails does
    /// not stop the ones after it; the first error is returned.
    fn receive(&mut self, mut bytes: &[u8]) -> Result<(), Error> {
        let mut outcome = Ok(());
        while !bytes.is_empty() {
            let (incoming, used) = match packet::decode(bytes) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!("dropping {} bytes of malformed inbound data", bytes.len());
                    return outcome.and(Err(e));
                }
            };
            if let Err(e) = self.dispatch(incoming) {
                warn!("inbound packet failed: {}", e);
                outcome = outcome.and(Err(e));
            }
            bytes = &bytes[used..];
        }
        outcome
    }

    fn dispatch(&mut self, incoming: Incoming<'_>) -> Result<(), Error> {
        match incoming {
            Incoming::ConnAck(code) => {
                log_connack(code);
                self.handler.on_connack(code);
                if self.state != State::AwaitingConnAck {
                    return Ok(());
                }
                if code == ConnectReturnCode::Accepted {
                    self.state = State::Subscribing;
                    self.bring_up_send(MessageType::Subscribe)
                } else {
                    self.drop_connection();
                    Ok(())
                }
            }
            Incoming::Publish { topic, payload } => {
                debug!("application message, {} bytes", payload.len());
                self.handler.on_publish(topic, payload);
                Ok(())
            }
            Incoming::SubAck => {
                info!("subscription acknowledged");
                if self.state == State::Subscribing {
                    self.enter_steady_state();
                }
                Ok(())
            }
            Incoming::UnsubAck => {
                info!("unsubscription acknowledged");
                Ok(())
            }
            Incoming::PingResp => {
                debug!("pong");
                Ok(())
            }
            Incoming::Disconnect => {
                info!("broker sent DISCONNECT");
                Ok(())
            }
            Incoming::Other(nibble) => {
                debug!("ignoring message type {}", nibble);
                Ok(())
            }
        }
    }
}

fn log_connack(code: ConnectReturnCode) {
    match code {
        ConnectReturnCode::Accepted => info!("connection accepted"),
        ConnectReturnCode::BadProtocolVersion => {
            warn!("connection refused: unacceptable protocol version")
        }
        ConnectReturnCode::BadIdentifier => warn!("connection refused: identifier rejected"),
        ConnectReturnCode::ServerUnavailable => warn!("connection refused: broker unavailable"),
        ConnectReturnCode::BadCredentials => warn!("connection refused: bad username or password"),
        ConnectReturnCode::NotAuthorized => warn!("connection refused: not authorized"),
        ConnectReturnCode::Unknown(raw) => {
            warn!("connection refused: illegal CONNACK return code {}", raw)
        }
    }
}
