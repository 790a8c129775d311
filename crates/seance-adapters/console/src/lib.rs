//! # Seance Console Adapter
//!
//! An in-process platform for driving the resolution pipeline without a
//! network: events are plain constructors and the "platform API" is an
//! in-memory [`Roster`] shared between the bot and your test or demo.
//!
//! Everything a networked adapter would have is here in miniature:
//!
//! - a typed event hierarchy ([`event`]) with messages, room messages and
//!   room join/leave notices,
//! - suppliers wired into a ready-made resolver ([`resolver`]),
//! - pure extractors and roster-backed queries ([`ConsolePlatform`]).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use seance_adapter_console as console;
//! use seance_core::{BoxedBot, BoxedEvent};
//!
//! let ferris = console::ConsoleUser::new("u1", "Ferris", "🦀");
//! let roster = Arc::new(
//!     console::Roster::new()
//!         .with_user(ferris.clone())
//!         .with_room("lobby", "The Lobby")
//!         .with_membership("lobby", "u1", "owner"),
//! );
//!
//! let resolver = console::resolver();
//! let bot: BoxedBot = Arc::new(console::ConsoleBot::new("bot", roster));
//! let event = BoxedEvent::new(console::RoomMessageEvent::new("bot", ferris, "lobby", "hi"));
//!
//! let session = resolver.fetch(&bot, &event).await?;
//! assert_eq!(session.id(), "lobby_u1");
//! ```

pub mod bot;
pub mod event;
pub mod platform;
pub mod roster;

/// Canonical adapter name, also the [`ConsolePlatform`] name.
pub const ADAPTER: &str = "console";

/// Scope label stamped on every console session.
pub const SCOPE: &str = "Console";

pub use bot::ConsoleBot;
pub use event::{
    ConsoleEvent, ConsoleUser, MessageEvent, PrivateMessageEvent, RoomJoinEvent, RoomLeaveEvent,
    RoomMessageEvent,
};
pub use platform::{ConsolePlatform, resolver};
pub use roster::{Room, RoomMember, Roster};
