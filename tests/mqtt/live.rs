use core::net::SocketAddrV4;
use dotenvy::dotenv;
use libmqtt::network::application::mqtt::{Client, Config, Event, Reading, State};
use libmqtt::network::{ConnectionHandle, NetworkStatus, Transport, TransportEvent};
use std::env;
use std::io::{Read as StdRead, Write as StdWrite};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

struct TcpTransport {
    stream: Option<TcpStream>,
}

impl Transport for TcpTransport {
    type Error = std::io::ErrorKind;

    fn connect(&mut self, remote: SocketAddrV4) -> Result<ConnectionHandle, Self::Error> {
        let stream = TcpStream::connect(remote).map_err(|e| e.kind())?;
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .map_err(|e| e.kind())?;
        self.stream = Some(stream);
        Ok(ConnectionHandle(1))
    }

    fn send(&mut self, _handle: ConnectionHandle, bytes: &[u8]) -> Result<(), Self::Error> {
        let stream = self.stream.as_mut().ok_or(std::io::ErrorKind::NotConnected)?;
        stream.write_all(bytes).map_err(|e| e.kind())
    }

    fn close(&mut self, _handle: ConnectionHandle) -> Result<(), Self::Error> {
        self.stream = None;
        Ok(())
    }
}

struct Host;

impl NetworkStatus for Host {
    fn has_address(&self) -> bool {
        true
    }
}

fn broker() -> SocketAddrV4 {
    dotenv().ok();
    let address = env::var("TEST_MQTT_ADDRESS").unwrap_or("test.mosquitto.org:1883".to_string());
    address
        .to_socket_addrs()
        .expect("Failed to resolve broker")
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .expect("Broker has no IPv4 address")
}

fn receive(client: &mut Client<TcpTransport, Host, ()>, now: u64) {
    let mut buf = [0u8; 256];
    let stream = client.transport_mut().stream.as_mut().expect("Not connected");
    let n = stream.read(&mut buf).expect("Failed to read from broker");
    let transition = client.handle(
        now,
        Event::Transport(TransportEvent::Received(ConnectionHandle(1), &buf[..n])),
    );
    assert_eq!(transition.outcome, Ok(()));
}

#[test]
#[ignore = "needs a reachable MQTT broker"]
fn test_publish_to_public_broker() {
    let broker = broker();
    let octets = broker.ip().octets();
    let config = Config {
        broker_addr: octets,
        broker_port: broker.port(),
        client_id: "libmqtt-test-client-4711",
        topic: "libmqtt/test",
        ..Config::default()
    };
    let mut client = Client::new(&config, TcpTransport { stream: None }, Host, ()).unwrap();

    let _ = client.start(0);
    while client.poll(2_000).is_some() {}
    assert_eq!(client.state(), State::ConnectingTransport);

    let _ = client.handle(
        2_000,
        Event::Transport(TransportEvent::Connected(ConnectionHandle(1))),
    );
    receive(&mut client, 2_100);
    assert_eq!(client.state(), State::Subscribing);
    receive(&mut client, 2_200);
    assert_eq!(client.state(), State::SteadyState);

    client.stage(Reading::Float(21.5));
    let transition = client.poll(22_200).expect("Publish timer did not fire");
    assert_eq!(transition.outcome, Ok(()));

    let _ = client.disconnect(23_000);
    assert_eq!(client.state(), State::Disconnected);
}
