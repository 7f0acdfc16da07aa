//! Session registry.
//!
//! Process-wide mapping from connection id to session record. Connection ids
//! are server-assigned, unique for the lifetime of the process; the registry
//! itself never invents them. Sessions enter unauthenticated and acquire a
//! player identity through the SYSTEM.AUTH exchange.

use std::{collections::HashMap, net::SocketAddr};

use archive_proto::Value;

/// Per-connection session record.
#[derive(Debug, Clone)]
pub struct Session {
    /// Remote peer address at accept time
    pub remote_addr: SocketAddr,
    /// Whether SYSTEM.AUTH completed successfully
    pub authenticated: bool,
    /// Player identity; always present once authenticated
    pub player_id: Option<u32>,
    /// Room this session is currently a member of
    pub current_room: Option<String>,
    /// Custom per-session property bag
    pub properties: HashMap<String, Value>,
    /// Wall-clock milliseconds of the last SYSTEM.HEARTBEAT
    pub last_heartbeat_ms: Option<u64>,
}

impl Session {
    /// Create a fresh unauthenticated session.
    #[must_use]
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr,
            authenticated: false,
            player_id: None,
            current_room: None,
            properties: HashMap::new(),
            last_heartbeat_ms: None,
        }
    }

    /// Mark the session authenticated as `player_id`.
    pub fn authenticate(&mut self, player_id: u32) {
        self.authenticated = true;
        self.player_id = Some(player_id);
    }
}

/// Registry of live sessions, keyed by connection id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<u32, Session>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session. Returns `false` if the id is already live.
    pub fn register(&mut self, conn_id: u32, session: Session) -> bool {
        if self.sessions.contains_key(&conn_id) {
            return false;
        }
        self.sessions.insert(conn_id, session);
        true
    }

    /// Session record for `conn_id`.
    #[must_use]
    pub fn lookup(&self, conn_id: u32) -> Option<&Session> {
        self.sessions.get(&conn_id)
    }

    /// Mutable session record for `conn_id`.
    pub fn lookup_mut(&mut self, conn_id: u32) -> Option<&mut Session> {
        self.sessions.get_mut(&conn_id)
    }

    /// Remove and return the session for `conn_id`.
    pub fn unregister(&mut self, conn_id: u32) -> Option<Session> {
        self.sessions.remove(&conn_id)
    }

    /// Whether `conn_id` has a live session.
    #[must_use]
    pub fn contains(&self, conn_id: u32) -> bool {
        self.sessions.contains_key(&conn_id)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True if no sessions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
