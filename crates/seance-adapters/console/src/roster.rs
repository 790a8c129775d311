//! In-memory world state backing the console platform.
//!
//! A [`Roster`] plays the part a chat service's API plays for a networked
//! platform: it is what the query methods ask about users, rooms, and
//! memberships. Seed it with the builder methods at startup and mutate it
//! through the `&self` methods as the simulated world changes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::event::ConsoleUser;

/// A room as the platform reports it.
#[derive(Debug, Clone)]
pub struct Room {
    /// Room id.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// One user's membership in one room.
#[derive(Debug, Clone)]
pub struct RoomMember {
    /// The member's user id.
    pub user_id: String,
    /// Room-local nickname.
    pub nick: Option<String>,
    /// Role key: `"owner"`, `"admin"`, or `"member"`.
    pub role: String,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
    /// Remaining mute, in seconds, when the member is muted.
    pub mute_secs: Option<u64>,
}

struct RoomState {
    info: Room,
    members: HashMap<String, RoomMember>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, ConsoleUser>,
    rooms: HashMap<String, RoomState>,
}

/// Shared, mutable state of the simulated console world.
#[derive(Default)]
pub struct Roster {
    inner: RwLock<Inner>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Seeding builders
    // ------------------------------------------------------------------

    /// Adds a user (builder form).
    pub fn with_user(self, user: ConsoleUser) -> Self {
        self.add_user(user);
        self
    }

    /// Adds a room (builder form).
    pub fn with_room(self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.add_room(id, name);
        self
    }

    /// Adds a membership (builder form).
    pub fn with_membership(
        self,
        room_id: &str,
        user_id: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        self.join(room_id, user_id, role);
        self
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Adds or replaces a user.
    pub fn add_user(&self, user: ConsoleUser) {
        self.inner.write().users.insert(user.id.clone(), user);
    }

    /// Adds or replaces a room; members of a replaced room are kept.
    pub fn add_room(&self, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        let mut inner = self.inner.write();
        match inner.rooms.get_mut(&id) {
            Some(state) => state.info.name = name.into(),
            None => {
                inner.rooms.insert(
                    id.clone(),
                    RoomState {
                        info: Room {
                            id,
                            name: name.into(),
                        },
                        members: HashMap::new(),
                    },
                );
            }
        }
    }

    /// Records a user joining a room. No-op when the room does not exist.
    pub fn join(&self, room_id: &str, user_id: impl Into<String>, role: impl Into<String>) {
        let user_id = user_id.into();
        if let Some(state) = self.inner.write().rooms.get_mut(room_id) {
            state.members.insert(
                user_id.clone(),
                RoomMember {
                    user_id,
                    nick: None,
                    role: role.into(),
                    joined_at: Utc::now(),
                    mute_secs: None,
                },
            );
        }
    }

    /// Records a user leaving a room.
    pub fn leave(&self, room_id: &str, user_id: &str) {
        if let Some(state) = self.inner.write().rooms.get_mut(room_id) {
            state.members.remove(user_id);
        }
    }

    /// Sets a member's room-local nickname.
    pub fn set_nick(&self, room_id: &str, user_id: &str, nick: impl Into<String>) {
        if let Some(member) = self
            .inner
            .write()
            .rooms
            .get_mut(room_id)
            .and_then(|state| state.members.get_mut(user_id))
        {
            member.nick = Some(nick.into());
        }
    }

    /// Mutes a member for the given number of seconds.
    pub fn mute(&self, room_id: &str, user_id: &str, secs: u64) {
        if let Some(member) = self
            .inner
            .write()
            .rooms
            .get_mut(room_id)
            .and_then(|state| state.members.get_mut(user_id))
        {
            member.mute_secs = Some(secs);
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Looks up a user by id.
    pub fn user(&self, id: &str) -> Option<ConsoleUser> {
        self.inner.read().users.get(id).cloned()
    }

    /// All users, ordered by id.
    pub fn users(&self) -> Vec<ConsoleUser> {
        let inner = self.inner.read();
        let mut users: Vec<_> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    /// Looks up a room by id.
    pub fn room(&self, id: &str) -> Option<Room> {
        self.inner.read().rooms.get(id).map(|s| s.info.clone())
    }

    /// All rooms, ordered by id.
    pub fn rooms(&self) -> Vec<Room> {
        let inner = self.inner.read();
        let mut rooms: Vec<_> = inner.rooms.values().map(|s| s.info.clone()).collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    /// Looks up one membership.
    pub fn member(&self, room_id: &str, user_id: &str) -> Option<RoomMember> {
        self.inner
            .read()
            .rooms
            .get(room_id)
            .and_then(|state| state.members.get(user_id))
            .cloned()
    }

    /// All members of a room, ordered by user id. Empty for unknown rooms.
    pub fn members(&self, room_id: &str) -> Vec<RoomMember> {
        let inner = self.inner.read();
        let Some(state) = inner.rooms.get(room_id) else {
            return Vec::new();
        };
        let mut members: Vec<_> = state.members.values().cloned().collect();
        members.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        members
    }
}

impl std::fmt::Debug for Roster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Roster")
            .field("users", &inner.users.len())
            .field("rooms", &inner.rooms.len())
            .finish()
    }
}
