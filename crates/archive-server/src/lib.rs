//! ARCHIVE production server.
//!
//! Terminates ARCHIVE sessions over WebSocket. The [`ServerDriver`] is pure
//! logic in the sans-IO action style (see [`archive_core`]); this crate's
//! [`Server`] is the production runtime that executes driver actions with
//! real sockets, real time, and OS randomness.
//!
//! # Architecture
//!
//! One reader task per connection feeds `FrameReceived` events into the
//! shared driver; one writer task per connection owns the WebSocket sink so
//! outbound frames are written atomically and in order. A periodic tick task
//! drives retransmission deadlines. Broadcast fan-out forwards the original
//! frame bytes verbatim - the server never re-encodes a frame on the way
//! through.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use archive_core::{Environment, ErrorEvent, ErrorKind};
use bytes::Bytes;
use tokio::sync::{Mutex, RwLock, mpsc};

mod driver;
mod error;
mod registry;
mod rooms;
mod system_env;
mod tokens;
mod transport;

pub use archive_core::SendOptions;
pub use driver::{LogLevel, ServerAction, ServerConfig as DriverConfig, ServerDriver, ServerEvent};
pub use error::ServerError;
pub use registry::{Session, SessionRegistry};
pub use rooms::{RoomError, RoomManager};
pub use system_env::SystemEnv;
pub use tokens::{TokenTable, generate_token};
pub use transport::{WsConnection, WsListener, WsSink, WsSource};

/// How often retransmission deadlines are checked.
///
/// Far below the minimum practical retransmission timeout, so observable
/// spacing is governed by per-send options, not the tick.
const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g. "0.0.0.0:8080")
    pub bind_address: String,
    /// Driver configuration (connection cap, retransmission defaults)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:8080".to_string(), driver: DriverConfig::default() }
    }
}

/// Messages for a connection's writer task.
enum Outbound {
    /// One encoded frame
    Frame(Bytes),
    /// Graceful close with a reason
    Close(String),
}

/// Shared routing state: connection id to writer-task handle.
#[derive(Default)]
struct SharedState {
    outbound: RwLock<HashMap<u32, mpsc::UnboundedSender<Outbound>>>,
}

/// Production ARCHIVE server.
pub struct Server {
    driver: ServerDriver<SystemEnv>,
    listener: WsListener,
    env: SystemEnv,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let driver = ServerDriver::new(env.clone(), config.driver);
        let listener = WsListener::bind(&config.bind_address).await?;

        Ok(Self { driver, listener, env })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr()
    }

    /// Run the server: accept connections and process frames until the
    /// process is stopped.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("server listening on {}", self.listener.local_addr()?);

        let driver = Arc::new(Mutex::new(self.driver));
        let shared = Arc::new(SharedState::default());
        let env = self.env;

        // Retransmission tick driver
        {
            let driver = Arc::clone(&driver);
            let shared = Arc::clone(&shared);
            let env = env.clone();
            tokio::spawn(async move {
                loop {
                    env.sleep(TICK_INTERVAL).await;
                    let result = {
                        let mut driver = driver.lock().await;
                        driver.process_event(ServerEvent::Tick)
                    };
                    match result {
                        Ok(actions) => execute_actions(actions, &shared).await,
                        Err(e) => tracing::error!("tick processing error: {e}"),
                    }
                }
            });
        }

        let next_conn_id = AtomicU32::new(1);
        loop {
            match self.listener.accept().await {
                Ok((conn, peer)) => {
                    let conn_id = next_conn_id.fetch_add(1, Ordering::Relaxed);
                    let driver = Arc::clone(&driver);
                    let shared = Arc::clone(&shared);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn_id, conn, peer, driver, shared).await
                        {
                            tracing::error!("connection {conn_id} error: {e}");
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("accept error: {e}");
                },
            }
        }
    }
}

/// Drive one accepted WebSocket session: writer task, read loop, cleanup.
async fn handle_connection(
    conn_id: u32,
    conn: WsConnection,
    peer: SocketAddr,
    driver: Arc<Mutex<ServerDriver<SystemEnv>>>,
    shared: Arc<SharedState>,
) -> Result<(), ServerError> {
    let (mut sink, mut source) = conn.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    shared.outbound.write().await.insert(conn_id, tx);

    // Single writer task per connection serialises outbound writes
    let writer = tokio::spawn(async move {
        let mut reason = String::from("connection closed");
        while let Some(out) = rx.recv().await {
            match out {
                Outbound::Frame(bytes) => {
                    if let Err(e) = sink.send(bytes).await {
                        tracing::debug!("write to connection {conn_id} failed: {e}");
                        break;
                    }
                },
                Outbound::Close(explicit) => {
                    reason = explicit;
                    break;
                },
            }
        }
        sink.close(&reason).await;
    });

    let actions = {
        let mut driver = driver.lock().await;
        driver.process_event(ServerEvent::ConnectionAccepted { conn_id, remote_addr: peer })?
    };
    execute_actions(actions, &shared).await;

    let reason = loop {
        match source.recv().await {
            Ok(Some(bytes)) => {
                let result = {
                    let mut driver = driver.lock().await;
                    driver.process_event(ServerEvent::FrameReceived { conn_id, bytes })
                };
                match result {
                    Ok(actions) => execute_actions(actions, &shared).await,
                    Err(e) => tracing::warn!("frame processing error on {conn_id}: {e}"),
                }
            },
            Ok(None) => break "connection closed".to_string(),
            Err(e) => {
                // Terminal for this session
                let event = ErrorEvent::new(ErrorKind::ConnectionError, e.to_string());
                tracing::warn!("connection {conn_id}: {event}");
                break e.to_string();
            },
        }
    };

    // Dropping the sender ends the writer task once its queue drains
    shared.outbound.write().await.remove(&conn_id);

    let actions = {
        let mut driver = driver.lock().await;
        driver.process_event(ServerEvent::ConnectionClosed { conn_id, reason })?
    };
    execute_actions(actions, &shared).await;

    let _ = writer.await;
    Ok(())
}

/// Execute driver actions against the shared routing state.
async fn execute_actions(actions: Vec<ServerAction>, shared: &SharedState) {
    if actions.is_empty() {
        return;
    }

    let outbound = shared.outbound.read().await;
    for action in actions {
        match action {
            ServerAction::Transmit { conn_id, bytes } => match outbound.get(&conn_id) {
                Some(tx) => {
                    if tx.send(Outbound::Frame(bytes)).is_err() {
                        tracing::debug!("writer for connection {conn_id} is gone");
                    }
                },
                None => tracing::debug!("transmit to unknown connection {conn_id} dropped"),
            },

            ServerAction::CloseConnection { conn_id, reason } => {
                tracing::info!("closing connection {conn_id}: {reason}");
                if let Some(tx) = outbound.get(&conn_id) {
                    let _ = tx.send(Outbound::Close(reason));
                }
            },

            ServerAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{message}"),
                LogLevel::Info => tracing::info!("{message}"),
                LogLevel::Warn => tracing::warn!("{message}"),
                LogLevel::Error => tracing::error!("{message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use archive_proto::{Frame, MessageType, ParamCode, Params, RoomOp, SystemOp, Value};
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio_tungstenite::{
        MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
    };

    use super::*;

    type ClientWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start_server() -> SocketAddr {
        let config = ServerRuntimeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            ..Default::default()
        };
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    async fn connect_client(addr: SocketAddr) -> ClientWs {
        let (client, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        client
    }

    async fn send_frame(client: &mut ClientWs, frame: &Frame) {
        let wire = frame.encode().unwrap();
        client.send(Message::binary(wire)).await.unwrap();
    }

    async fn recv_frame(client: &mut ClientWs) -> Frame {
        loop {
            match client.next().await.expect("stream open").expect("read ok") {
                Message::Binary(data) => return Frame::decode(&data).unwrap(),
                _ => continue,
            }
        }
    }

    /// CONNECT/AUTH handshake over the real wire.
    async fn authenticate(client: &mut ClientWs, player_id: u32) {
        send_frame(client, &Frame::new(MessageType::System, SystemOp::Connect.to_u8(), Params::new()))
            .await;
        let reply = recv_frame(client).await;
        assert_eq!(reply.op_code(), SystemOp::Auth.to_u8());
        let token = reply
            .params()
            .get(ParamCode::Properties)
            .and_then(Value::as_str)
            .unwrap()
            .to_string();

        let mut params = Params::new();
        params.insert(ParamCode::Properties, token);
        params.insert(ParamCode::PlayerId, Value::UInt(player_id));
        send_frame(client, &Frame::new(MessageType::System, SystemOp::Auth.to_u8(), params)).await;

        let reply = recv_frame(client).await;
        assert_eq!(reply.params().get(ParamCode::Properties), Some(&Value::Bool(true)));
        assert_eq!(reply.params().get(ParamCode::PlayerId), Some(&Value::UInt(player_id)));
    }

    #[tokio::test]
    async fn auth_handshake_over_the_wire() {
        let addr = start_server().await;
        let mut client = connect_client(addr).await;
        authenticate(&mut client, 42).await;
    }

    #[tokio::test]
    async fn ping_echo_over_the_wire() {
        let addr = start_server().await;
        let mut client = connect_client(addr).await;

        send_frame(&mut client, &Frame::new(MessageType::Ping, 0x01, Params::new())).await;
        let reply = recv_frame(&mut client).await;

        assert_eq!(reply.message_type(), Some(MessageType::Ping));
        assert!(reply.params().contains(ParamCode::Timestamp));
    }

    #[tokio::test]
    async fn room_flow_and_event_fan_out() {
        let addr = start_server().await;

        let mut alice = connect_client(addr).await;
        authenticate(&mut alice, 1).await;
        let mut bob = connect_client(addr).await;
        authenticate(&mut bob, 2).await;

        // Alice creates the room
        let mut params = Params::new();
        params.insert(ParamCode::RoomId, "arena");
        send_frame(&mut alice, &Frame::new(MessageType::Room, RoomOp::Create.to_u8(), params))
            .await;
        let reply = recv_frame(&mut alice).await;
        assert_eq!(reply.op_code(), RoomOp::Create.to_u8());
        assert_eq!(reply.params().get(ParamCode::Properties), Some(&Value::Bool(true)));

        // Bob joins; Alice is notified with Bob's player id
        let mut params = Params::new();
        params.insert(ParamCode::RoomId, "arena");
        send_frame(&mut bob, &Frame::new(MessageType::Room, RoomOp::Join.to_u8(), params)).await;

        let join_reply = recv_frame(&mut bob).await;
        assert_eq!(join_reply.params().get(ParamCode::Properties), Some(&Value::Bool(true)));

        let notification = recv_frame(&mut alice).await;
        assert_eq!(notification.op_code(), RoomOp::Join.to_u8());
        assert_eq!(notification.params().get(ParamCode::PlayerId), Some(&Value::UInt(2)));

        // Alice raises an event; Bob receives the identical bytes
        let mut params = Params::new();
        params.insert(ParamCode::Action, Value::Byte(7));
        params.insert(ParamCode::Position, [10.5f32, 0.0, -3.2]);
        let event = Frame::new(MessageType::Event, 0x01, params);
        let wire = event.encode().unwrap();
        alice.send(Message::binary(wire.clone())).await.unwrap();

        let received = loop {
            match bob.next().await.unwrap().unwrap() {
                Message::Binary(data) => break data,
                _ => continue,
            }
        };
        assert_eq!(&received[..], &wire[..], "fan-out forwards verbatim bytes");
    }

    #[tokio::test]
    async fn unauthenticated_event_has_no_effect() {
        let addr = start_server().await;
        let mut client = connect_client(addr).await;

        let mut params = Params::new();
        params.insert(ParamCode::Action, Value::Byte(1));
        send_frame(&mut client, &Frame::new(MessageType::Event, 0x01, params)).await;

        // The connection stays usable and no reply arrives for the event:
        // the next frame we see is the heartbeat echo
        send_frame(
            &mut client,
            &Frame::new(MessageType::System, SystemOp::Heartbeat.to_u8(), Params::new()),
        )
        .await;
        let reply = recv_frame(&mut client).await;
        assert_eq!(reply.op_code(), SystemOp::Heartbeat.to_u8());
    }
}
