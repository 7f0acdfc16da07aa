//! Server driver.
//!
//! The dispatcher: routes decoded messages by `(messageType, operationCode)`
//! into system handling, room operations, or room fan-out. Ties together the
//! per-connection state machines, the session registry, the room manager,
//! and the auth-token table.
//!
//! Like the connection layer, the driver is pure: it consumes
//! [`ServerEvent`]s and returns [`ServerAction`]s for the production runtime
//! (or a test) to execute. All I/O lives in the runtime.

use std::{collections::HashMap, net::SocketAddr};

use archive_core::{Connection, ConnectionAction, Environment, SendOptions};
use archive_proto::{Frame, MessageType, ParamCode, Params, RoomOp, SystemOp, Value};
use bytes::Bytes;

use crate::{
    error::ServerError,
    registry::{Session, SessionRegistry},
    rooms::RoomManager,
    tokens::{self, TokenTable},
};

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections; accepts beyond this are closed
    pub max_connections: usize,
    /// Default reliability options for server-side sends and forwards
    pub send_options: SendOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_connections: 10_000, send_options: SendOptions::default() }
    }
}

/// Events the driver processes, produced by the runtime.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new transport session was accepted
    ConnectionAccepted {
        /// Server-assigned connection id, unique process-wide
        conn_id: u32,
        /// Remote peer address
        remote_addr: SocketAddr,
    },

    /// One complete binary message arrived from a connection
    FrameReceived {
        /// Originating connection
        conn_id: u32,
        /// Raw frame bytes as read from the transport
        bytes: Bytes,
    },

    /// A transport session terminated (peer close or error)
    ConnectionClosed {
        /// Connection that went away
        conn_id: u32,
        /// Reason for closure
        reason: String,
    },

    /// Periodic tick driving retransmission deadlines
    Tick,
}

/// Actions the driver produces, executed by the runtime.
#[derive(Debug, Clone)]
pub enum ServerAction {
    /// Write these bytes to a connection's transport
    Transmit {
        /// Target connection
        conn_id: u32,
        /// Encoded frame bytes
        bytes: Bytes,
    },

    /// Close a connection's transport
    CloseConnection {
        /// Connection to close
        conn_id: u32,
        /// Human-readable reason, logged and sent in the transport close
        reason: String,
    },

    /// Emit a log record
    Log {
        /// Severity
        level: LogLevel,
        /// Message text
        message: String,
    },
}

/// Log severities for driver actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Diagnostic detail
    Debug,
    /// Normal operation
    Info,
    /// Recoverable protocol violations and failures
    Warn,
    /// Internal errors
    Error,
}

/// Action-based server driver.
pub struct ServerDriver<E: Environment> {
    /// Connection state machines, keyed by connection id
    connections: HashMap<u32, Connection<E::Instant>>,
    /// Live sessions
    registry: SessionRegistry,
    /// Live rooms
    rooms: RoomManager,
    /// Outstanding auth tokens
    tokens: TokenTable,
    /// Time and randomness
    env: E,
    /// Configuration
    config: ServerConfig,
}

impl<E: Environment> ServerDriver<E> {
    /// Create a new driver.
    pub fn new(env: E, config: ServerConfig) -> Self {
        Self {
            connections: HashMap::new(),
            registry: SessionRegistry::new(),
            rooms: RoomManager::new(),
            tokens: TokenTable::new(),
            env,
            config,
        }
    }

    /// Process one event and return the actions to execute.
    ///
    /// This is the only entry point; the runtime calls it for accepts,
    /// inbound frames, closures, and periodic ticks.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, ServerError> {
        match event {
            ServerEvent::ConnectionAccepted { conn_id, remote_addr } => {
                Ok(self.handle_connection_accepted(conn_id, remote_addr))
            },
            ServerEvent::FrameReceived { conn_id, bytes } => {
                self.handle_frame_received(conn_id, &bytes)
            },
            ServerEvent::ConnectionClosed { conn_id, reason } => {
                Ok(self.handle_connection_closed(conn_id, &reason))
            },
            ServerEvent::Tick => Ok(self.handle_tick()),
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Session record for a connection.
    #[must_use]
    pub fn session(&self, conn_id: u32) -> Option<&Session> {
        self.registry.lookup(conn_id)
    }

    /// Whether a room is live.
    #[must_use]
    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.has_room(room_id)
    }

    /// Members of a room, sorted.
    #[must_use]
    pub fn room_members(&self, room_id: &str) -> Vec<u32> {
        self.rooms.members(room_id)
    }

    /// Sorted snapshot of live room ids.
    #[must_use]
    pub fn room_list(&self) -> Vec<String> {
        self.rooms.list()
    }

    fn handle_connection_accepted(
        &mut self,
        conn_id: u32,
        remote_addr: SocketAddr,
    ) -> Vec<ServerAction> {
        if self.connections.len() >= self.config.max_connections {
            return vec![ServerAction::CloseConnection {
                conn_id,
                reason: "max connections exceeded".to_string(),
            }];
        }

        self.connections.insert(conn_id, Connection::new(self.env.now()));
        self.registry.register(conn_id, Session::new(remote_addr));

        vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("connection {conn_id} accepted from {remote_addr}"),
        }]
    }

    fn handle_frame_received(
        &mut self,
        conn_id: u32,
        bytes: &Bytes,
    ) -> Result<Vec<ServerAction>, ServerError> {
        let now = self.env.now();
        let mut actions = Vec::new();

        let core_actions = {
            let conn = self
                .connections
                .get_mut(&conn_id)
                .ok_or(ServerError::SessionNotFound(conn_id))?;
            conn.handle_incoming(bytes, now)
        };

        for action in core_actions {
            match action {
                // The connection layer's synthesized ACK for inbound
                // RELIABLE frames, emitted before anything else we send
                ConnectionAction::Transmit(ack) => {
                    actions.push(ServerAction::Transmit { conn_id, bytes: ack });
                },
                ConnectionAction::Error(event) => {
                    actions.push(ServerAction::Log {
                        level: LogLevel::Warn,
                        message: format!("connection {conn_id}: {event}"),
                    });
                },
                ConnectionAction::Deliver(frame) => {
                    self.dispatch(conn_id, bytes, &frame, &mut actions);
                },
            }
        }

        Ok(actions)
    }

    /// Route one decoded message by message type.
    fn dispatch(
        &mut self,
        conn_id: u32,
        raw: &Bytes,
        frame: &Frame,
        actions: &mut Vec<ServerAction>,
    ) {
        let Some(message_type) = frame.message_type() else {
            actions.push(ServerAction::Log {
                level: LogLevel::Warn,
                message: format!(
                    "connection {conn_id}: unknown message type {:#04x}, dropping",
                    frame.type_code()
                ),
            });
            return;
        };

        match message_type {
            MessageType::System => self.handle_system(conn_id, frame, actions),

            // Consumed by the connection layer; never delivered
            MessageType::Ack => {},

            MessageType::Ping => {
                let mut params = Params::new();
                params.insert(ParamCode::Timestamp, Value::Long(self.env.wall_clock_ms() as i64));
                self.send_frame(
                    conn_id,
                    &Frame::new(MessageType::Ping, frame.op_code(), params),
                    actions,
                );
            },

            MessageType::Fragment => {
                actions.push(ServerAction::Log {
                    level: LogLevel::Debug,
                    message: format!("connection {conn_id}: FRAGMENT is reserved, dropping"),
                });
            },

            MessageType::Reliable | MessageType::Unreliable => {
                if !self.require_auth(conn_id, message_type, actions) {
                    return;
                }
                let room = self.registry.lookup(conn_id).and_then(|s| s.current_room.clone());
                if let Some(room_id) = room {
                    self.broadcast(&room_id, raw, Some(conn_id), actions);
                }
            },

            MessageType::Event => {
                if !self.require_auth(conn_id, message_type, actions) {
                    return;
                }
                let room = self.registry.lookup(conn_id).and_then(|s| s.current_room.clone());
                let Some(room_id) = room else {
                    actions.push(ServerAction::Log {
                        level: LogLevel::Warn,
                        message: format!("connection {conn_id}: EVENT outside a room, dropping"),
                    });
                    return;
                };
                self.broadcast(&room_id, raw, Some(conn_id), actions);
            },

            MessageType::Room => {
                if !self.require_auth(conn_id, message_type, actions) {
                    return;
                }
                self.handle_room(conn_id, frame, actions);
            },
        }
    }

    /// Auth gate for privileged message types: log and drop, no reply.
    fn require_auth(
        &self,
        conn_id: u32,
        message_type: MessageType,
        actions: &mut Vec<ServerAction>,
    ) -> bool {
        let authenticated = self.registry.lookup(conn_id).is_some_and(|s| s.authenticated);
        if !authenticated {
            actions.push(ServerAction::Log {
                level: LogLevel::Info,
                message: format!(
                    "unauthenticated connection {conn_id} sent {}, dropping",
                    message_type.name()
                ),
            });
        }
        authenticated
    }

    /// SYSTEM sub-dispatch: connect, auth, disconnect, heartbeat.
    fn handle_system(&mut self, conn_id: u32, frame: &Frame, actions: &mut Vec<ServerAction>) {
        match SystemOp::from_u8(frame.op_code()) {
            Some(SystemOp::Connect) => {
                let token = tokens::generate_token(&self.env);
                self.tokens.issue(token.clone(), conn_id);

                let mut params = Params::new();
                params.insert(ParamCode::PlayerId, Value::UInt(conn_id));
                params.insert(ParamCode::Timestamp, Value::Long(self.env.wall_clock_ms() as i64));
                params.insert(ParamCode::Properties, Value::Str(token));
                self.send_frame(
                    conn_id,
                    &Frame::new(MessageType::System, SystemOp::Auth.to_u8(), params),
                    actions,
                );

                actions.push(ServerAction::Log {
                    level: LogLevel::Debug,
                    message: format!("issued auth token to connection {conn_id}"),
                });
            },

            Some(SystemOp::Auth) => {
                let token = frame.params().get(ParamCode::Properties).and_then(Value::as_str);
                let claimed = frame.params().get(ParamCode::PlayerId).and_then(Value::as_u32);
                let granted = token.is_some_and(|t| self.tokens.consume(t, conn_id));

                let mut params = Params::new();
                if granted {
                    let player_id = claimed.unwrap_or(conn_id);
                    if let Some(session) = self.registry.lookup_mut(conn_id) {
                        session.authenticate(player_id);
                    }
                    params.insert(ParamCode::PlayerId, Value::UInt(player_id));
                    params
                        .insert(ParamCode::Timestamp, Value::Long(self.env.wall_clock_ms() as i64));
                    params.insert(ParamCode::Properties, Value::Bool(true));

                    actions.push(ServerAction::Log {
                        level: LogLevel::Info,
                        message: format!("connection {conn_id} authenticated as player {player_id}"),
                    });
                } else {
                    params
                        .insert(ParamCode::Timestamp, Value::Long(self.env.wall_clock_ms() as i64));
                    params.insert(ParamCode::Properties, Value::Bool(false));

                    actions.push(ServerAction::Log {
                        level: LogLevel::Warn,
                        message: format!("auth rejected for connection {conn_id}"),
                    });
                }
                self.send_frame(
                    conn_id,
                    &Frame::new(MessageType::System, SystemOp::Auth.to_u8(), params),
                    actions,
                );
            },

            Some(SystemOp::Disconnect) => {
                actions.push(ServerAction::CloseConnection {
                    conn_id,
                    reason: "client disconnect".to_string(),
                });
            },

            Some(SystemOp::Heartbeat) => {
                let now_ms = self.env.wall_clock_ms();
                if let Some(session) = self.registry.lookup_mut(conn_id) {
                    session.last_heartbeat_ms = Some(now_ms);
                }

                let mut params = Params::new();
                params.insert(ParamCode::Timestamp, Value::Long(now_ms as i64));
                self.send_frame(
                    conn_id,
                    &Frame::new(MessageType::System, SystemOp::Heartbeat.to_u8(), params),
                    actions,
                );
            },

            None => {
                actions.push(ServerAction::Log {
                    level: LogLevel::Warn,
                    message: format!(
                        "connection {conn_id}: unknown SYSTEM opcode {:#04x}",
                        frame.op_code()
                    ),
                });
            },
        }
    }

    /// ROOM sub-dispatch: create, join, leave, list, properties.
    fn handle_room(&mut self, conn_id: u32, frame: &Frame, actions: &mut Vec<ServerAction>) {
        match RoomOp::from_u8(frame.op_code()) {
            Some(RoomOp::Create) => self.handle_room_create(conn_id, frame, actions),
            Some(RoomOp::Join) => self.handle_room_join(conn_id, frame, actions),
            Some(RoomOp::Leave) => self.handle_room_leave(conn_id, actions),
            Some(RoomOp::List) => self.handle_room_list(conn_id, actions),
            Some(RoomOp::Properties) => self.handle_room_properties(conn_id, frame, actions),
            None => {
                actions.push(ServerAction::Log {
                    level: LogLevel::Warn,
                    message: format!(
                        "connection {conn_id}: unknown ROOM opcode {:#04x}",
                        frame.op_code()
                    ),
                });
            },
        }
    }

    fn handle_room_create(&mut self, conn_id: u32, frame: &Frame, actions: &mut Vec<ServerAction>) {
        let Some(room_id) = param_string(frame, ParamCode::RoomId) else {
            self.room_reject(conn_id, RoomOp::Create, None, "missing ROOM_ID", actions);
            return;
        };

        match self.rooms.create(&room_id, conn_id) {
            Ok(()) => {
                // Creating implies joining, so an existing membership ends
                // first, with its leave notification
                self.leave_current_room(conn_id, actions);
                if let Some(session) = self.registry.lookup_mut(conn_id) {
                    session.current_room = Some(room_id.clone());
                }

                let mut params = Params::new();
                params.insert(ParamCode::RoomId, Value::Str(room_id.clone()));
                params.insert(ParamCode::Properties, Value::Bool(true));
                self.send_frame(
                    conn_id,
                    &Frame::new(MessageType::Room, RoomOp::Create.to_u8(), params),
                    actions,
                );

                actions.push(ServerAction::Log {
                    level: LogLevel::Info,
                    message: format!("room {room_id:?} created by connection {conn_id}"),
                });
            },
            Err(e) => {
                self.room_reject(conn_id, RoomOp::Create, Some(&room_id), &e.to_string(), actions);
            },
        }
    }

    fn handle_room_join(&mut self, conn_id: u32, frame: &Frame, actions: &mut Vec<ServerAction>) {
        let Some(room_id) = param_string(frame, ParamCode::RoomId) else {
            self.room_reject(conn_id, RoomOp::Join, None, "missing ROOM_ID", actions);
            return;
        };

        if !self.rooms.has_room(&room_id) {
            self.room_reject(conn_id, RoomOp::Join, Some(&room_id), "room not found", actions);
            return;
        }

        let already_member =
            self.registry.lookup(conn_id).and_then(|s| s.current_room.as_deref())
                == Some(room_id.as_str());

        if !already_member {
            // Implicit leave of the previous room, notifying its members
            self.leave_current_room(conn_id, actions);

            // Room existence was checked above; a failure here means it
            // emptied out during the implicit leave, which cannot happen to
            // a room this session was not in
            if self.rooms.join(&room_id, conn_id).is_err() {
                self.room_reject(conn_id, RoomOp::Join, Some(&room_id), "room not found", actions);
                return;
            }

            let player_id = self
                .registry
                .lookup_mut(conn_id)
                .map(|session| {
                    session.current_room = Some(room_id.clone());
                    session.player_id.unwrap_or(conn_id)
                })
                .unwrap_or(conn_id);

            // Notify the room, excluding the joiner
            let mut notify = Params::new();
            notify.insert(ParamCode::PlayerId, Value::UInt(player_id));
            notify.insert(ParamCode::RoomId, Value::Str(room_id.clone()));
            self.broadcast_frame(
                &room_id,
                &Frame::new(MessageType::Room, RoomOp::Join.to_u8(), notify),
                Some(conn_id),
                actions,
            );
        }

        let mut params = Params::new();
        params.insert(ParamCode::RoomId, Value::Str(room_id));
        params.insert(ParamCode::Properties, Value::Bool(true));
        self.send_frame(
            conn_id,
            &Frame::new(MessageType::Room, RoomOp::Join.to_u8(), params),
            actions,
        );
    }

    fn handle_room_leave(&mut self, conn_id: u32, actions: &mut Vec<ServerAction>) {
        match self.leave_current_room(conn_id, actions) {
            Some(room_id) => {
                let mut params = Params::new();
                params.insert(ParamCode::RoomId, Value::Str(room_id));
                params.insert(ParamCode::Properties, Value::Bool(true));
                self.send_frame(
                    conn_id,
                    &Frame::new(MessageType::Room, RoomOp::Leave.to_u8(), params),
                    actions,
                );
            },
            None => {
                self.room_reject(conn_id, RoomOp::Leave, None, "not in a room", actions);
            },
        }
    }

    fn handle_room_list(&mut self, conn_id: u32, actions: &mut Vec<ServerAction>) {
        // JSON array of room ids inside a BYTE_ARRAY, for compatibility
        let ids = self.rooms.list();
        match serde_json::to_vec(&ids) {
            Ok(json) => {
                let mut params = Params::new();
                params.insert(ParamCode::Properties, Value::Bytes(json));
                self.send_frame(
                    conn_id,
                    &Frame::new(MessageType::Room, RoomOp::List.to_u8(), params),
                    actions,
                );
            },
            Err(e) => {
                actions.push(ServerAction::Log {
                    level: LogLevel::Error,
                    message: format!("failed to encode room list: {e}"),
                });
            },
        }
    }

    fn handle_room_properties(
        &mut self,
        conn_id: u32,
        frame: &Frame,
        actions: &mut Vec<ServerAction>,
    ) {
        let Some(room_id) = param_string(frame, ParamCode::RoomId) else {
            self.room_reject(conn_id, RoomOp::Properties, None, "missing ROOM_ID", actions);
            return;
        };

        let Some(pairs) = frame.params().get(ParamCode::Properties).and_then(Value::as_dict)
        else {
            self.room_reject(
                conn_id,
                RoomOp::Properties,
                Some(&room_id),
                "missing PROPERTIES dictionary",
                actions,
            );
            return;
        };

        // Only string keys name properties; anything else is ignored
        let updates: Vec<(String, Value)> = pairs
            .iter()
            .filter_map(|(key, val)| key.as_str().map(|k| (k.to_string(), val.clone())))
            .collect();

        // Replicate the full bag, sorted by key for a deterministic wire shape
        let merged = self.rooms.set_properties(&room_id, updates).map(|bag| {
            let mut entries: Vec<(String, Value)> =
                bag.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            entries
        });

        let entries = match merged {
            Ok(entries) => entries,
            Err(e) => {
                self.room_reject(
                    conn_id,
                    RoomOp::Properties,
                    Some(&room_id),
                    &e.to_string(),
                    actions,
                );
                return;
            },
        };

        let dict: Vec<(Value, Value)> =
            entries.into_iter().map(|(k, v)| (Value::Str(k), v)).collect();

        let mut params = Params::new();
        params.insert(ParamCode::RoomId, Value::Str(room_id.clone()));
        params.insert(ParamCode::Properties, Value::Dict(dict));
        self.broadcast_frame(
            &room_id,
            &Frame::new(MessageType::Room, RoomOp::Properties.to_u8(), params),
            None,
            actions,
        );
    }

    /// Negative reply for a room operation: `PROPERTIES = BOOL false`.
    fn room_reject(
        &mut self,
        conn_id: u32,
        op: RoomOp,
        room_id: Option<&str>,
        reason: &str,
        actions: &mut Vec<ServerAction>,
    ) {
        actions.push(ServerAction::Log {
            level: LogLevel::Warn,
            message: format!("ROOM.{} rejected for connection {conn_id}: {reason}", op.name()),
        });

        let mut params = Params::new();
        if let Some(room_id) = room_id {
            params.insert(ParamCode::RoomId, Value::Str(room_id.to_string()));
        }
        params.insert(ParamCode::Properties, Value::Bool(false));
        self.send_frame(conn_id, &Frame::new(MessageType::Room, op.to_u8(), params), actions);
    }

    /// Remove the session from its current room, notifying the remaining
    /// members with a ROOM.LEAVE frame. Returns the room left, if any.
    fn leave_current_room(
        &mut self,
        conn_id: u32,
        actions: &mut Vec<ServerAction>,
    ) -> Option<String> {
        let (room_id, player_id) = {
            let session = self.registry.lookup_mut(conn_id)?;
            let room_id = session.current_room.take()?;
            (room_id, session.player_id.unwrap_or(conn_id))
        };

        self.rooms.leave(&room_id, conn_id);

        if self.rooms.has_room(&room_id) {
            let mut params = Params::new();
            params.insert(ParamCode::PlayerId, Value::UInt(player_id));
            params.insert(ParamCode::RoomId, Value::Str(room_id.clone()));
            self.broadcast_frame(
                &room_id,
                &Frame::new(MessageType::Room, RoomOp::Leave.to_u8(), params),
                None,
                actions,
            );
        }

        Some(room_id)
    }

    fn handle_connection_closed(&mut self, conn_id: u32, reason: &str) -> Vec<ServerAction> {
        let mut actions = Vec::new();

        if let Some(mut conn) = self.connections.remove(&conn_id) {
            conn.close();
        }

        // Room cleanup needs the session record, so it runs before unregister
        self.leave_current_room(conn_id, &mut actions);
        self.tokens.purge(conn_id);

        if let Some(session) = self.registry.unregister(conn_id) {
            actions.push(ServerAction::Log {
                level: LogLevel::Info,
                message: format!(
                    "connection {conn_id} ({}) closed: {reason}",
                    session.remote_addr
                ),
            });
        }

        actions
    }

    fn handle_tick(&mut self) -> Vec<ServerAction> {
        let now = self.env.now();
        let mut actions = Vec::new();

        let mut conn_ids: Vec<u32> = self.connections.keys().copied().collect();
        conn_ids.sort_unstable();

        for conn_id in conn_ids {
            let Some(conn) = self.connections.get_mut(&conn_id) else {
                continue;
            };
            for action in conn.tick(now) {
                match action {
                    ConnectionAction::Transmit(bytes) => {
                        actions.push(ServerAction::Transmit { conn_id, bytes });
                    },
                    ConnectionAction::Error(event) => {
                        actions.push(ServerAction::Log {
                            level: LogLevel::Warn,
                            message: format!("connection {conn_id}: {event}"),
                        });
                    },
                    ConnectionAction::Deliver(_) => {},
                }
            }
        }

        actions
    }

    /// Forward the same encoded bytes to every member of a room except
    /// `exclude`. Frames are never re-encoded on the way through.
    fn broadcast(
        &mut self,
        room_id: &str,
        bytes: &Bytes,
        exclude: Option<u32>,
        actions: &mut Vec<ServerAction>,
    ) {
        let now = self.env.now();
        for member in self.rooms.members(room_id) {
            if Some(member) == exclude {
                continue;
            }
            self.send_raw(member, bytes.clone(), now, actions);
        }
    }

    /// Encode a server-originated frame once and fan it out to a room.
    fn broadcast_frame(
        &mut self,
        room_id: &str,
        frame: &Frame,
        exclude: Option<u32>,
        actions: &mut Vec<ServerAction>,
    ) {
        match frame.encode() {
            Ok(bytes) => self.broadcast(room_id, &bytes, exclude, actions),
            Err(e) => {
                actions.push(ServerAction::Log {
                    level: LogLevel::Error,
                    message: format!("failed to encode {} broadcast: {e}", frame.operation_name()),
                });
            },
        }
    }

    /// Encode and send a server-originated frame to one connection.
    fn send_frame(&mut self, conn_id: u32, frame: &Frame, actions: &mut Vec<ServerAction>) {
        match frame.encode() {
            Ok(bytes) => {
                let now = self.env.now();
                self.send_raw(conn_id, bytes, now, actions);
            },
            Err(e) => {
                actions.push(ServerAction::Log {
                    level: LogLevel::Error,
                    message: format!("failed to encode {} reply: {e}", frame.operation_name()),
                });
            },
        }
    }

    /// Send bytes through a connection's send path so reliable frames get
    /// their pending-ack entry and retransmission schedule.
    fn send_raw(
        &mut self,
        conn_id: u32,
        bytes: Bytes,
        now: E::Instant,
        actions: &mut Vec<ServerAction>,
    ) {
        let Some(conn) = self.connections.get_mut(&conn_id) else {
            actions.push(ServerAction::Log {
                level: LogLevel::Warn,
                message: format!("send to unknown connection {conn_id} dropped"),
            });
            return;
        };

        for action in conn.send(bytes, self.config.send_options, now) {
            match action {
                ConnectionAction::Transmit(out) => {
                    actions.push(ServerAction::Transmit { conn_id, bytes: out });
                },
                ConnectionAction::Error(event) => {
                    actions.push(ServerAction::Log {
                        level: LogLevel::Warn,
                        message: format!("connection {conn_id}: {event}"),
                    });
                },
                ConnectionAction::Deliver(_) => {},
            }
        }
    }
}

impl<E: Environment> std::fmt::Debug for ServerDriver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("connection_count", &self.connections.len())
            .field("room_count", &self.rooms.room_count())
            .finish()
    }
}

/// A required STRING parameter, cloned out of the frame.
fn param_string(frame: &Frame, code: ParamCode) -> Option<String> {
    frame.params().get(code).and_then(Value::as_str).map(str::to_string)
}
