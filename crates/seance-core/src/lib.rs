//! # Seance Core
//!
//! The session resolution engine of the Seance toolkit.
//!
//! Chat platforms disagree about everything: what a "group" is, where a
//! channel's guild lives, how an operator is attached to a notice. Seance
//! normalizes platform-native events into one canonical [`Session`] so the
//! code consuming them never has to know which platform it is on.
//!
//! ## Layers
//!
//! ### Entity Model
//!
//! Canonical, platform-neutral entities:
//! - **Identity**: who is acting ([`User`], [`Member`], [`Role`], [`MuteInfo`])
//! - **Location**: where it happens ([`Scene`], [`SceneType`])
//! - **The whole picture**: one event's resolved context ([`Session`])
//!
//! ### Resolution
//!
//! Turning raw events into sessions:
//! - **Event Erasure**: type-erased events with level projection ([`Event`], [`BoxedEvent`])
//! - **Suppliers**: per-event-type data gathering ([`Resolver::supply`])
//! - **Extraction**: platform-specific entity parsing ([`Platform`])
//! - **Caching**: TTL-bounded re-resolution ([`SessionCache`], [`CacheConfig`])
//!
//! ### Queries
//!
//! Looking entities up outside of event flow:
//! - **Point and bulk queries**: per-bot facade ([`Interface`])
//! - **Multi-platform routing**: adapter-keyed registry ([`ResolverRegistry`])
//!
//! ## Resolution Pipeline
//!
//! Every event flows through one platform's [`Resolver`]:
//!
//! ```text
//! ┌─────────────┐     ┌──────────┐     ┌────────────┐
//! │   Adapter   │────▶│ Resolver │────▶│  Session   │
//! │   (event)   │     │  (cache, │     │ (scene,    │
//! └─────────────┘     │ supplier,│     │  user,     │
//!                     │ extract) │     │  member)   │
//!                     └──────────┘     └────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use seance_core::{BoxedEvent, DataBag, Event, Resolver};
//! use std::any::Any;
//!
//! // A platform-native event
//! #[derive(Clone)]
//! struct MessageEvent {
//!     user_id: String,
//! }
//!
//! impl Event for MessageEvent {
//!     fn event_name(&self) -> &'static str {
//!         "message"
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//!
//!     fn session_key(&self) -> Option<String> {
//!         Some(format!("private_{}", self.user_id))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> FetchResult<()> {
//!     let resolver = Resolver::new(MyPlatform::default())
//!         .supply::<MessageEvent, _, _>(|_bot, event| async move {
//!             Ok(DataBag::new().with("user_id", event.user_id))
//!         });
//!
//!     let event = BoxedEvent::new(MessageEvent {
//!         user_id: "42".into(),
//!     });
//!     let session = resolver.fetch(&bot, &event).await?;
//!     println!("session at {}", session.scene_path());
//!     Ok(())
//! }
//! ```

pub mod bag;
pub mod bot;
pub mod cache;
pub mod error;
pub mod event;
pub mod interface;
pub mod model;
pub mod platform;
pub mod registry;
pub mod resolver;

// Re-export model types
pub use model::{BotIdentity, Member, MuteInfo, Role, Scene, SceneType, Session, User};

// Re-export resolution types
pub use bag::{DataBag, Value};
pub use bot::{Bot, BoxedBot, downcast_bot};
pub use cache::{CacheConfig, ExpiringMap, SessionCache};
pub use error::{FetchError, FetchResult};
pub use event::{BoxedEvent, Event, EventSet};
pub use platform::{Platform, unsupported_stream};
pub use resolver::{BoxedSupplier, Resolver};

// Re-export query types
pub use interface::Interface;
pub use registry::ResolverRegistry;

/// Prelude for common imports.
pub mod prelude {
    pub use super::bag::{DataBag, Value};
    pub use super::bot::{Bot, BoxedBot};
    pub use super::error::{FetchError, FetchResult};
    pub use super::event::{BoxedEvent, Event, EventSet};
    pub use super::interface::Interface;
    pub use super::model::{
        BotIdentity, Member, MuteInfo, Role, Scene, SceneType, Session, User,
    };
    pub use super::platform::Platform;
    pub use super::registry::ResolverRegistry;
    pub use super::resolver::Resolver;
}
