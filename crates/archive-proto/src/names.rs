//! Message type, operation, and parameter code tables.
//!
//! Compile-time tables replacing runtime reflection: every namespace is a
//! plain enum with `from_u8`/`to_u8` and a canonical name. Wire behaviour
//! never depends on names - they exist for logging and the name-view
//! accessors on decoded messages.

/// Top-level frame classification (first header byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Connection lifecycle: connect, auth, heartbeat, disconnect
    System = 0x01,
    /// Sequence-tracked payload, acknowledged and retransmitted
    Reliable = 0x02,
    /// Fire-and-forget payload
    Unreliable = 0x03,
    /// Reserved for oversized payload reassembly
    Fragment = 0x04,
    /// Acknowledgement of a reliable sequence number
    Ack = 0x05,
    /// Latency probe, echoed with a timestamp
    Ping = 0x06,
    /// Room lifecycle and property replication
    Room = 0x07,
    /// Application events fanned out to the current room
    Event = 0x08,
}

impl MessageType {
    /// Look up a message type from its wire byte. `None` if unrecognized.
    #[must_use]
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::System),
            0x02 => Some(Self::Reliable),
            0x03 => Some(Self::Unreliable),
            0x04 => Some(Self::Fragment),
            0x05 => Some(Self::Ack),
            0x06 => Some(Self::Ping),
            0x07 => Some(Self::Room),
            0x08 => Some(Self::Event),
            _ => None,
        }
    }

    /// Wire byte for this message type.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::Reliable => "RELIABLE",
            Self::Unreliable => "UNRELIABLE",
            Self::Fragment => "FRAGMENT",
            Self::Ack => "ACK",
            Self::Ping => "PING",
            Self::Room => "ROOM",
            Self::Event => "EVENT",
        }
    }
}

/// Operation codes within the SYSTEM namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemOp {
    /// Client requests a session; server replies with an auth token
    Connect = 0x01,
    /// Graceful teardown, equivalent to a transport close
    Disconnect = 0x02,
    /// Token exchange completing authentication
    Auth = 0x03,
    /// Keepalive, echoed with the server timestamp
    Heartbeat = 0x04,
}

impl SystemOp {
    /// Look up a SYSTEM operation from its wire byte.
    #[must_use]
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Connect),
            0x02 => Some(Self::Disconnect),
            0x03 => Some(Self::Auth),
            0x04 => Some(Self::Heartbeat),
            _ => None,
        }
    }

    /// Wire byte for this operation.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Disconnect => "DISCONNECT",
            Self::Auth => "AUTH",
            Self::Heartbeat => "HEARTBEAT",
        }
    }
}

/// Operation codes within the ROOM namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RoomOp {
    /// Create a room and join it as owner
    Create = 0x01,
    /// Join an existing room
    Join = 0x02,
    /// Leave the current room
    Leave = 0x03,
    /// Snapshot of all room ids
    List = 0x04,
    /// Shallow-merge property updates
    Properties = 0x05,
}

impl RoomOp {
    /// Look up a ROOM operation from its wire byte.
    #[must_use]
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Create),
            0x02 => Some(Self::Join),
            0x03 => Some(Self::Leave),
            0x04 => Some(Self::List),
            0x05 => Some(Self::Properties),
            _ => None,
        }
    }

    /// Wire byte for this operation.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Join => "JOIN",
            Self::Leave => "LEAVE",
            Self::List => "LIST",
            Self::Properties => "PROPERTIES",
        }
    }
}

/// Operation codes within the EVENT namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventOp {
    /// Application-defined event
    Raise = 0x01,
    /// Incremental state update
    State = 0x02,
    /// Full state snapshot
    Snapshot = 0x03,
}

impl EventOp {
    /// Look up an EVENT operation from its wire byte.
    #[must_use]
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Raise),
            0x02 => Some(Self::State),
            0x03 => Some(Self::Snapshot),
            _ => None,
        }
    }

    /// Wire byte for this operation.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Raise => "RAISE",
            Self::State => "STATE",
            Self::Snapshot => "SNAPSHOT",
        }
    }
}

/// Canonical parameter codes.
///
/// The payload may carry arbitrary codes; these are the ones with a
/// well-known meaning and a name alias on the decoded view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParamCode {
    /// Player identity (connection-scoped until authenticated)
    PlayerId = 0x01,
    /// Room identifier string
    RoomId = 0x02,
    /// Wall-clock milliseconds since the Unix epoch
    Timestamp = 0x03,
    /// Reliable sequence number
    Sequence = 0x04,
    /// World position (VECTOR3)
    Position = 0x05,
    /// Orientation (QUATERNION)
    Rotation = 0x06,
    /// Velocity (VECTOR3)
    Velocity = 0x07,
    /// Application action discriminator
    Action = 0x08,
    /// Target player of an action
    TargetId = 0x09,
    /// Health scalar
    Health = 0x0A,
    /// Property bag payload (DICTIONARY, or opaque per operation)
    Properties = 0x0B,
}

impl ParamCode {
    /// Look up a canonical code from its wire byte.
    #[must_use]
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::PlayerId),
            0x02 => Some(Self::RoomId),
            0x03 => Some(Self::Timestamp),
            0x04 => Some(Self::Sequence),
            0x05 => Some(Self::Position),
            0x06 => Some(Self::Rotation),
            0x07 => Some(Self::Velocity),
            0x08 => Some(Self::Action),
            0x09 => Some(Self::TargetId),
            0x0A => Some(Self::Health),
            0x0B => Some(Self::Properties),
            _ => None,
        }
    }

    /// Canonical code for a name. `None` for names outside the table.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PLAYER_ID" => Some(Self::PlayerId),
            "ROOM_ID" => Some(Self::RoomId),
            "TIMESTAMP" => Some(Self::Timestamp),
            "SEQUENCE" => Some(Self::Sequence),
            "POSITION" => Some(Self::Position),
            "ROTATION" => Some(Self::Rotation),
            "VELOCITY" => Some(Self::Velocity),
            "ACTION" => Some(Self::Action),
            "TARGET_ID" => Some(Self::TargetId),
            "HEALTH" => Some(Self::Health),
            "PROPERTIES" => Some(Self::Properties),
            _ => None,
        }
    }

    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::PlayerId => "PLAYER_ID",
            Self::RoomId => "ROOM_ID",
            Self::Timestamp => "TIMESTAMP",
            Self::Sequence => "SEQUENCE",
            Self::Position => "POSITION",
            Self::Rotation => "ROTATION",
            Self::Velocity => "VELOCITY",
            Self::Action => "ACTION",
            Self::TargetId => "TARGET_ID",
            Self::Health => "HEALTH",
            Self::Properties => "PROPERTIES",
        }
    }
}

impl From<ParamCode> for u8 {
    fn from(code: ParamCode) -> Self {
        code as Self
    }
}

/// Canonical operation name within a message type's namespace.
///
/// Returns `"UNKNOWN"` for opcodes outside the namespace and for message
/// types without named operations (RELIABLE, UNRELIABLE, FRAGMENT carry no
/// sub-operations; ACK and PING have a single implicit operation 0x01).
#[must_use]
pub fn operation_name(message_type: MessageType, op_code: u8) -> &'static str {
    match message_type {
        MessageType::System => SystemOp::from_u8(op_code).map_or("UNKNOWN", SystemOp::name),
        MessageType::Room => RoomOp::from_u8(op_code).map_or("UNKNOWN", RoomOp::name),
        MessageType::Event => EventOp::from_u8(op_code).map_or("UNKNOWN", EventOp::name),
        MessageType::Ack | MessageType::Ping if op_code == 0x01 => "DEFAULT",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_round_trip() {
        for byte in 0x01..=0x08u8 {
            let mt = MessageType::from_u8(byte).unwrap();
            assert_eq!(mt.to_u8(), byte);
        }
        assert_eq!(MessageType::from_u8(0x00), None);
        assert_eq!(MessageType::from_u8(0x09), None);
    }

    #[test]
    fn operation_names_resolve_per_namespace() {
        assert_eq!(operation_name(MessageType::System, 0x01), "CONNECT");
        assert_eq!(operation_name(MessageType::Room, 0x01), "CREATE");
        assert_eq!(operation_name(MessageType::Event, 0x01), "RAISE");
        assert_eq!(operation_name(MessageType::Room, 0x7F), "UNKNOWN");
        assert_eq!(operation_name(MessageType::Reliable, 0x01), "UNKNOWN");
    }

    #[test]
    fn param_code_names_are_bijective() {
        for byte in 0x01..=0x0Bu8 {
            let code = ParamCode::from_u8(byte).unwrap();
            assert_eq!(ParamCode::from_name(code.name()), Some(code));
        }
        assert_eq!(ParamCode::from_u8(0x0C), None);
        assert_eq!(ParamCode::from_name("NO_SUCH_PARAM"), None);
    }
}
