use core::cell::Cell;
use core::net::SocketAddrV4;
use libmqtt::network::application::mqtt::{Client, Config, ConnectReturnCode, Handler};
use libmqtt::network::{ConnectionHandle, NetworkStatus, Transport};
use std::rc::Rc;

pub const HANDLE: ConnectionHandle = ConnectionHandle(7);

/// Records every request made to the transport.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub connects: Vec<SocketAddrV4>,
    pub sent: Vec<Vec<u8>>,
    pub closed: Vec<ConnectionHandle>,
    pub refuse_connect: bool,
    pub refuse_send: bool,
}

impl MockTransport {
    /// Type nibble of every packet sent so far.
    pub fn kinds(&self) -> Vec<u8> {
        self.sent.iter().map(|packet| packet[0] >> 4).collect()
    }
}

impl Transport for MockTransport {
    type Error = ();

    fn connect(&mut self, remote: SocketAddrV4) -> Result<ConnectionHandle, ()> {
        self.connects.push(remote);
        if self.refuse_connect {
            Err(())
        } else {
            Ok(HANDLE)
        }
    }

    fn send(&mut self, _handle: ConnectionHandle, bytes: &[u8]) -> Result<(), ()> {
        if self.refuse_send {
            return Err(());
        }
        self.sent.push(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self, handle: ConnectionHandle) -> Result<(), ()> {
        self.closed.push(handle);
        Ok(())
    }
}

/// Readiness flag shared with the test body.
#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    pub ready: Rc<Cell<bool>>,
    pub polls: Rc<Cell<usize>>,
}

impl NetworkStatus for MockNetwork {
    fn has_address(&self) -> bool {
        self.polls.set(self.polls.get() + 1);
        self.ready.get()
    }
}

/// Collects callbacks.
#[derive(Debug, Default)]
pub struct Recorder {
    pub connacks: Vec<ConnectReturnCode>,
    pub messages: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Handler for Recorder {
    fn on_connack(&mut self, code: ConnectReturnCode) {
        self.connacks.push(code);
    }

    fn on_publish(&mut self, topic: &[u8], payload: &[u8]) {
        self.messages.push((topic.to_vec(), payload.to_vec()));
    }
}

pub type TestClient = Client<MockTransport, MockNetwork, Recorder>;

pub fn dev1_config() -> Config<'static> {
    Config {
        client_id: "dev1",
        username: "u",
        password: "p",
        ..Config::default()
    }
}

pub fn client_with(config: &Config<'_>) -> (TestClient, MockNetwork) {
    let network = MockNetwork::default();
    let client = Client::new(
        config,
        MockTransport::default(),
        network.clone(),
        Recorder::default(),
    )
    .unwrap();
    (client, network)
}
