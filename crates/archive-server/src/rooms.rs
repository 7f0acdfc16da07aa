//! Room manager.
//!
//! Rooms are string-keyed membership groups with a shared property bag.
//! Rooms must be explicitly created (no lazy creation); creation joins the
//! owner atomically, and a room is deleted the moment its member set becomes
//! empty, so a live room always has at least one member.
//!
//! The manager is a pure store: notification frames and broadcast fan-out
//! are built by the dispatcher, which owns the per-connection send paths.

use std::collections::{HashMap, HashSet};

use archive_proto::Value;
use thiserror::Error;

/// Errors from room operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// CREATE named a room id that already exists
    #[error("room already exists: {0}")]
    Exists(String),

    /// JOIN/LEAVE/PROPERTIES named a room id with no live room
    #[error("room not found: {0}")]
    NotFound(String),

    /// Room ids are arbitrary but non-empty
    #[error("room id must be non-empty")]
    InvalidId,
}

/// One live room.
#[derive(Debug, Default)]
struct Room {
    /// Connection ids of current members
    members: HashSet<u32>,
    /// Shared property bag, replicated via ROOM.PROPERTIES
    properties: HashMap<String, Value>,
}

/// Process-wide room registry.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: HashMap<String, Room>,
}

impl RoomManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `room_id` names a live room.
    #[must_use]
    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Create `room_id` and join `owner` atomically.
    pub fn create(&mut self, room_id: &str, owner: u32) -> Result<(), RoomError> {
        if room_id.is_empty() {
            return Err(RoomError::InvalidId);
        }
        if self.has_room(room_id) {
            return Err(RoomError::Exists(room_id.to_string()));
        }

        let mut room = Room::default();
        room.members.insert(owner);
        self.rooms.insert(room_id.to_string(), room);
        Ok(())
    }

    /// Add `conn_id` to the member set of `room_id`.
    pub fn join(&mut self, room_id: &str, conn_id: u32) -> Result<(), RoomError> {
        let room =
            self.rooms.get_mut(room_id).ok_or_else(|| RoomError::NotFound(room_id.to_string()))?;
        room.members.insert(conn_id);
        Ok(())
    }

    /// Remove `conn_id` from `room_id`, deleting the room if it empties.
    ///
    /// Returns `true` if the member was present.
    pub fn leave(&mut self, room_id: &str, conn_id: u32) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };

        let removed = room.members.remove(&conn_id);
        if room.members.is_empty() {
            self.rooms.remove(room_id);
        }
        removed
    }

    /// Members of `room_id`, sorted for deterministic fan-out order.
    #[must_use]
    pub fn members(&self, room_id: &str) -> Vec<u32> {
        let mut members: Vec<u32> =
            self.rooms.get(room_id).map(|r| r.members.iter().copied().collect()).unwrap_or_default();
        members.sort_unstable();
        members
    }

    /// Number of members in `room_id` (0 if the room does not exist).
    #[must_use]
    pub fn member_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |r| r.members.len())
    }

    /// Snapshot of live room ids, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rooms.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Shallow-merge `updates` into the property bag of `room_id`.
    ///
    /// Returns the full bag after the merge, which is what a PROPERTIES
    /// broadcast carries.
    pub fn set_properties(
        &mut self,
        room_id: &str,
        updates: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<&HashMap<String, Value>, RoomError> {
        let room =
            self.rooms.get_mut(room_id).ok_or_else(|| RoomError::NotFound(room_id.to_string()))?;
        room.properties.extend(updates);
        Ok(&room.properties)
    }

    /// Property bag of `room_id`.
    #[must_use]
    pub fn properties(&self, room_id: &str) -> Option<&HashMap<String, Value>> {
        self.rooms.get(room_id).map(|r| &r.properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_joins_owner_atomically() {
        let mut rooms = RoomManager::new();
        rooms.create("R", 1).unwrap();

        assert!(rooms.has_room("R"));
        assert_eq!(rooms.members("R"), vec![1]);
    }

    #[test]
    fn create_duplicate_fails_with_exists() {
        let mut rooms = RoomManager::new();
        rooms.create("R", 1).unwrap();
        assert_eq!(rooms.create("R", 2), Err(RoomError::Exists("R".to_string())));
        // Original membership untouched
        assert_eq!(rooms.members("R"), vec![1]);
    }

    #[test]
    fn empty_room_id_is_invalid() {
        let mut rooms = RoomManager::new();
        assert_eq!(rooms.create("", 1), Err(RoomError::InvalidId));
    }

    #[test]
    fn join_missing_room_fails_with_not_found() {
        let mut rooms = RoomManager::new();
        assert_eq!(rooms.join("ghost", 1), Err(RoomError::NotFound("ghost".to_string())));
    }

    #[test]
    fn members_are_sorted() {
        let mut rooms = RoomManager::new();
        rooms.create("R", 30).unwrap();
        rooms.join("R", 10).unwrap();
        rooms.join("R", 20).unwrap();
        assert_eq!(rooms.members("R"), vec![10, 20, 30]);
    }

    #[test]
    fn last_leave_deletes_room() {
        let mut rooms = RoomManager::new();
        rooms.create("R", 1).unwrap();
        rooms.join("R", 2).unwrap();

        assert!(rooms.leave("R", 1));
        assert!(rooms.has_room("R"));

        assert!(rooms.leave("R", 2));
        assert!(!rooms.has_room("R"));
        assert!(rooms.list().is_empty());
    }

    #[test]
    fn leave_of_non_member_is_false() {
        let mut rooms = RoomManager::new();
        rooms.create("R", 1).unwrap();
        assert!(!rooms.leave("R", 99));
        assert!(!rooms.leave("ghost", 1));
        assert!(rooms.has_room("R"));
    }

    #[test]
    fn list_is_sorted_snapshot() {
        let mut rooms = RoomManager::new();
        rooms.create("zeta", 1).unwrap();
        rooms.create("alpha", 2).unwrap();
        assert_eq!(rooms.list(), vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn set_properties_is_shallow_merge() {
        let mut rooms = RoomManager::new();
        rooms.create("R", 1).unwrap();

        rooms
            .set_properties("R", [("map".to_string(), Value::Str("dust".to_string()))])
            .unwrap();
        let bag = rooms
            .set_properties("R", [
                ("map".to_string(), Value::Str("cache".to_string())),
                ("max".to_string(), Value::Byte(8)),
            ])
            .unwrap();

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("map"), Some(&Value::Str("cache".to_string())));
        assert_eq!(bag.get("max"), Some(&Value::Byte(8)));
    }

    #[test]
    fn set_properties_on_missing_room_fails() {
        let mut rooms = RoomManager::new();
        let err = rooms.set_properties("ghost", []).unwrap_err();
        assert_eq!(err, RoomError::NotFound("ghost".to_string()));
    }
}
