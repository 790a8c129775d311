//! Console events, modeled parent-in-child so derived events deref to their base.
//!
//! # Hierarchy
//!
//! ```text
//! ConsoleEvent { time, self_id, user }
//! ├── MessageEvent { text }
//! │   ├── PrivateMessageEvent {}
//! │   └── RoomMessageEvent    { room_id }
//! ├── RoomJoinEvent  { room_id, operator }
//! └── RoomLeaveEvent { room_id, operator }
//! ```
//!
//! Each child embeds its parent and `Deref`s to it, so `msg.text` and
//! `msg.user` both work on a [`RoomMessageEvent`]. The [`Event`] impls
//! declare the same ancestry through `type_chain`/`as_level`, which is what
//! the resolver routes on; registering a supplier for [`MessageEvent`]
//! covers both message kinds.

use std::any::{Any, TypeId};
use std::ops::Deref;

use chrono::{DateTime, Utc};
use seance_core::Event;

// ============================================================================
// Console User
// ============================================================================

/// An account as the console platform reports it in events.
///
/// The avatar is an emoji; [`ConsoleUser::avatar_url`] turns it into a
/// renderable image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleUser {
    /// User id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Avatar emoji, e.g. `"🦀"`.
    pub emoji: String,
}

impl ConsoleUser {
    /// Creates a console user.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        emoji: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            emoji: emoji.into(),
        }
    }

    /// Image URL rendering the avatar emoji.
    pub fn avatar_url(&self) -> String {
        format!("https://emojicdn.elk.sh/{}?style=twitter", self.emoji)
    }
}

// ============================================================================
// ConsoleEvent
// ============================================================================

/// Base console event carrying the fields every event shares.
#[derive(Debug, Clone)]
pub struct ConsoleEvent {
    /// When the event happened.
    pub time: DateTime<Utc>,
    /// The receiving bot's account id.
    pub self_id: String,
    /// The acting user.
    pub user: ConsoleUser,
}

impl ConsoleEvent {
    /// Creates a base event timestamped now.
    pub fn new(self_id: impl Into<String>, user: ConsoleUser) -> Self {
        Self {
            time: Utc::now(),
            self_id: self_id.into(),
            user,
        }
    }
}

impl Event for ConsoleEvent {
    fn event_name(&self) -> &'static str {
        "console"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// MessageEvent
// ============================================================================

/// A message typed into the console.
///
/// `Deref` → [`ConsoleEvent`], so `msg.time` and `msg.user` work directly.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Embedded parent fields (time, self_id, user).
    pub parent: ConsoleEvent,
    /// Message text.
    pub text: String,
}

impl MessageEvent {
    /// Creates a message event on top of an existing base event.
    pub fn new(parent: ConsoleEvent, text: impl Into<String>) -> Self {
        Self {
            parent,
            text: text.into(),
        }
    }
}

impl Deref for MessageEvent {
    type Target = ConsoleEvent;

    fn deref(&self) -> &Self::Target {
        &self.parent
    }
}

impl Event for MessageEvent {
    fn event_name(&self) -> &'static str {
        "console.message"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_chain(&self) -> Vec<TypeId> {
        vec![TypeId::of::<MessageEvent>(), TypeId::of::<ConsoleEvent>()]
    }

    fn as_level(&self, level: TypeId) -> Option<&dyn Any> {
        if level == TypeId::of::<MessageEvent>() {
            Some(self)
        } else if level == TypeId::of::<ConsoleEvent>() {
            Some(&self.parent)
        } else {
            None
        }
    }
}

// ============================================================================
// PrivateMessageEvent
// ============================================================================

/// A direct message to the bot.
///
/// `Deref` chain: `PrivateMessageEvent` → [`MessageEvent`] → [`ConsoleEvent`].
#[derive(Debug, Clone)]
pub struct PrivateMessageEvent {
    /// Embedded parent fields (text, time, self_id, user).
    pub parent: MessageEvent,
}

impl PrivateMessageEvent {
    /// Creates a private message event from scratch.
    pub fn new(self_id: impl Into<String>, user: ConsoleUser, text: impl Into<String>) -> Self {
        Self {
            parent: MessageEvent::new(ConsoleEvent::new(self_id, user), text),
        }
    }
}

impl Deref for PrivateMessageEvent {
    type Target = MessageEvent;

    fn deref(&self) -> &Self::Target {
        &self.parent
    }
}

impl Event for PrivateMessageEvent {
    fn event_name(&self) -> &'static str {
        "console.message.private"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_chain(&self) -> Vec<TypeId> {
        vec![
            TypeId::of::<PrivateMessageEvent>(),
            TypeId::of::<MessageEvent>(),
            TypeId::of::<ConsoleEvent>(),
        ]
    }

    fn as_level(&self, level: TypeId) -> Option<&dyn Any> {
        if level == TypeId::of::<PrivateMessageEvent>() {
            Some(self)
        } else if level == TypeId::of::<MessageEvent>() {
            Some(&self.parent)
        } else if level == TypeId::of::<ConsoleEvent>() {
            Some(&self.parent.parent)
        } else {
            None
        }
    }

    fn session_key(&self) -> Option<String> {
        Some(format!("private_{}", self.user.id))
    }
}

// ============================================================================
// RoomMessageEvent
// ============================================================================

/// A message in a shared room.
///
/// `Deref` chain: `RoomMessageEvent` → [`MessageEvent`] → [`ConsoleEvent`].
#[derive(Debug, Clone)]
pub struct RoomMessageEvent {
    /// Embedded parent fields (text, time, self_id, user).
    pub parent: MessageEvent,
    /// Room the message was sent in.
    pub room_id: String,
}

impl RoomMessageEvent {
    /// Creates a room message event from scratch.
    pub fn new(
        self_id: impl Into<String>,
        user: ConsoleUser,
        room_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            parent: MessageEvent::new(ConsoleEvent::new(self_id, user), text),
            room_id: room_id.into(),
        }
    }
}

impl Deref for RoomMessageEvent {
    type Target = MessageEvent;

    fn deref(&self) -> &Self::Target {
        &self.parent
    }
}

impl Event for RoomMessageEvent {
    fn event_name(&self) -> &'static str {
        "console.message.room"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_chain(&self) -> Vec<TypeId> {
        vec![
            TypeId::of::<RoomMessageEvent>(),
            TypeId::of::<MessageEvent>(),
            TypeId::of::<ConsoleEvent>(),
        ]
    }

    fn as_level(&self, level: TypeId) -> Option<&dyn Any> {
        if level == TypeId::of::<RoomMessageEvent>() {
            Some(self)
        } else if level == TypeId::of::<MessageEvent>() {
            Some(&self.parent)
        } else if level == TypeId::of::<ConsoleEvent>() {
            Some(&self.parent.parent)
        } else {
            None
        }
    }

    fn session_key(&self) -> Option<String> {
        Some(format!("room_{}_{}", self.room_id, self.user.id))
    }
}

// ============================================================================
// Room Notices
// ============================================================================

/// A user joined a room, possibly added by an operator.
///
/// `Deref` → [`ConsoleEvent`].
#[derive(Debug, Clone)]
pub struct RoomJoinEvent {
    /// Embedded parent fields (time, self_id, user).
    pub parent: ConsoleEvent,
    /// Room that was joined.
    pub room_id: String,
    /// Who added the user, when not self-joined.
    pub operator: Option<ConsoleUser>,
}

impl RoomJoinEvent {
    /// Creates a self-join event.
    pub fn new(
        self_id: impl Into<String>,
        user: ConsoleUser,
        room_id: impl Into<String>,
    ) -> Self {
        Self {
            parent: ConsoleEvent::new(self_id, user),
            room_id: room_id.into(),
            operator: None,
        }
    }

    /// Sets the operator who performed the addition.
    pub fn with_operator(mut self, operator: ConsoleUser) -> Self {
        self.operator = Some(operator);
        self
    }
}

impl Deref for RoomJoinEvent {
    type Target = ConsoleEvent;

    fn deref(&self) -> &Self::Target {
        &self.parent
    }
}

impl Event for RoomJoinEvent {
    fn event_name(&self) -> &'static str {
        "console.room.join"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_chain(&self) -> Vec<TypeId> {
        vec![TypeId::of::<RoomJoinEvent>(), TypeId::of::<ConsoleEvent>()]
    }

    fn as_level(&self, level: TypeId) -> Option<&dyn Any> {
        if level == TypeId::of::<RoomJoinEvent>() {
            Some(self)
        } else if level == TypeId::of::<ConsoleEvent>() {
            Some(&self.parent)
        } else {
            None
        }
    }

    fn session_key(&self) -> Option<String> {
        Some(format!("room_{}_{}", self.room_id, self.user.id))
    }
}

/// A user left a room, possibly removed by an operator.
///
/// `Deref` → [`ConsoleEvent`].
#[derive(Debug, Clone)]
pub struct RoomLeaveEvent {
    /// Embedded parent fields (time, self_id, user).
    pub parent: ConsoleEvent,
    /// Room that was left.
    pub room_id: String,
    /// Who removed the user, when not self-left.
    pub operator: Option<ConsoleUser>,
}

impl RoomLeaveEvent {
    /// Creates a self-leave event.
    pub fn new(
        self_id: impl Into<String>,
        user: ConsoleUser,
        room_id: impl Into<String>,
    ) -> Self {
        Self {
            parent: ConsoleEvent::new(self_id, user),
            room_id: room_id.into(),
            operator: None,
        }
    }

    /// Sets the operator who performed the removal.
    pub fn with_operator(mut self, operator: ConsoleUser) -> Self {
        self.operator = Some(operator);
        self
    }
}

impl Deref for RoomLeaveEvent {
    type Target = ConsoleEvent;

    fn deref(&self) -> &Self::Target {
        &self.parent
    }
}

impl Event for RoomLeaveEvent {
    fn event_name(&self) -> &'static str {
        "console.room.leave"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_chain(&self) -> Vec<TypeId> {
        vec![TypeId::of::<RoomLeaveEvent>(), TypeId::of::<ConsoleEvent>()]
    }

    fn as_level(&self, level: TypeId) -> Option<&dyn Any> {
        if level == TypeId::of::<RoomLeaveEvent>() {
            Some(self)
        } else if level == TypeId::of::<ConsoleEvent>() {
            Some(&self.parent)
        } else {
            None
        }
    }

    fn session_key(&self) -> Option<String> {
        Some(format!("room_{}_{}", self.room_id, self.user.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seance_core::BoxedEvent;

    fn crab() -> ConsoleUser {
        ConsoleUser::new("u1", "Ferris", "🦀")
    }

    #[test]
    fn deref_reaches_through_the_chain() {
        let event = RoomMessageEvent::new("bot-1", crab(), "lobby", "hello");

        // Fields from every level are visible on the leaf.
        assert_eq!(event.room_id, "lobby");
        assert_eq!(event.text, "hello");
        assert_eq!(event.user.id, "u1");
        assert_eq!(event.self_id, "bot-1");
    }

    #[test]
    fn type_chain_is_most_derived_first() {
        let event = RoomMessageEvent::new("bot-1", crab(), "lobby", "hello");
        assert_eq!(
            event.type_chain(),
            vec![
                TypeId::of::<RoomMessageEvent>(),
                TypeId::of::<MessageEvent>(),
                TypeId::of::<ConsoleEvent>(),
            ]
        );
    }

    #[test]
    fn boxed_event_projects_to_every_level() {
        let event = BoxedEvent::new(PrivateMessageEvent::new("bot-1", crab(), "hi"));

        assert_eq!(event.view::<PrivateMessageEvent>().unwrap().text, "hi");
        assert_eq!(event.view::<MessageEvent>().unwrap().text, "hi");
        assert_eq!(event.view::<ConsoleEvent>().unwrap().user.id, "u1");
        assert!(event.view::<RoomMessageEvent>().is_none());
    }

    #[test]
    fn session_keys_identify_the_conversation() {
        let private = PrivateMessageEvent::new("bot-1", crab(), "hi");
        assert_eq!(private.session_key().unwrap(), "private_u1");

        let room = RoomMessageEvent::new("bot-1", crab(), "lobby", "hi");
        assert_eq!(room.session_key().unwrap(), "room_lobby_u1");

        let join = RoomJoinEvent::new("bot-1", crab(), "lobby");
        assert_eq!(join.session_key().unwrap(), "room_lobby_u1");

        // The base event is not a conversation by itself.
        let base = ConsoleEvent::new("bot-1", crab());
        assert!(base.session_key().is_none());
    }

    #[test]
    fn avatar_url_renders_the_emoji() {
        assert_eq!(
            crab().avatar_url(),
            "https://emojicdn.elk.sh/🦀?style=twitter"
        );
    }
}
