//! # Seance
//!
//! Canonical user, scene and session metadata resolved from chat platform
//! events.
//!
//! ## Overview
//!
//! Chat platforms disagree about everything: what a "group" is, where the
//! sender's nickname lives, how an operator is reported. Seance gives every
//! platform one contract to implement and every consumer one shape to read:
//!
//! ```text
//! ┌───────────┐   events    ┌──────────┐  suppliers   ┌───────────┐
//! │  Adapter  │────────────▶│ Resolver │─────────────▶│  Session  │
//! │ (per bot) │             │ (+cache) │  extractors  │ (uniform) │
//! └───────────┘             └──────────┘              └───────────┘
//!        │                        ▲
//!        │ queries   ┌───────────┐│
//!        └──────────▶│ Interface │┘
//!                    └───────────┘
//! ```
//!
//! - **Adapters**: platform integrations emitting typed events
//! - **Resolver**: routes an event to a supplier, runs the platform's
//!   extractors, caches the resulting session
//! - **Interface**: active lookups (user, scene, member) with cache,
//!   point-query and bulk-scan fallbacks
//! - **Registry**: maps adapter names to resolvers for multi-platform
//!   deployments
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use seance::prelude::*;
//! use seance_adapter_console as console;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ferris = console::ConsoleUser::new("u1", "Ferris", "🦀");
//!     let roster = Arc::new(console::Roster::new().with_user(ferris.clone()));
//!
//!     let registry = ResolverRegistry::new();
//!     registry.register(console::ADAPTER, Arc::new(console::resolver()));
//!
//!     let bot: BoxedBot = Arc::new(console::ConsoleBot::new("bot", roster));
//!     let event = BoxedEvent::new(console::PrivateMessageEvent::new("bot", ferris, "hello"));
//!
//!     if let Some(session) = registry.resolve(&bot, &event).await {
//!         println!("talking to {} in {}", session.user.id, session.id());
//!     }
//! }
//! ```

pub use seance_core as core;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use seance::prelude::*;
/// ```
pub mod prelude {
    // Entity model - the uniform session shape
    pub use seance_core::model::{
        BotIdentity, Member, MuteInfo, Role, Scene, SceneType, Session, User,
    };

    // Resolution - events in, sessions out
    pub use seance_core::bag::{DataBag, Value};
    pub use seance_core::event::{BoxedEvent, Event, EventSet};
    pub use seance_core::registry::ResolverRegistry;
    pub use seance_core::resolver::Resolver;

    // Platform contract - for writing adapters
    pub use seance_core::bot::{Bot, BoxedBot};
    pub use seance_core::error::{FetchError, FetchResult};
    pub use seance_core::platform::Platform;

    // Active queries
    pub use seance_core::interface::Interface;

    // Cache tuning
    pub use seance_core::cache::CacheConfig;
}
