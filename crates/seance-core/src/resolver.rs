//! Event-to-session resolution for one platform.
//!
//! A [`Resolver`] owns three things: an ordered supplier table mapping
//! event types to data-gathering closures, at most one wildcard supplier,
//! and the platform's cache tiers. Resolution walks the event's type chain
//! from most to least specific, runs the first supplier that accepts the
//! level, and hands the merged data to the platform's extractors:
//!
//! ```rust,ignore
//! let resolver = Resolver::new(ConsolePlatform::default())
//!     .supply::<MessageEvent, _, _>(|bot, event| async move {
//!         Ok(DataBag::new().with("user_id", event.user_id))
//!     })
//!     .supply_wildcard(|bot, event| async move {
//!         // ...
//!     });
//!
//! let session = resolver.fetch(&bot, &event).await?;
//! ```
//!
//! Suppliers are the only place platform I/O happens during resolution;
//! everything after the supplier future completes is pure and synchronous.

use std::any::TypeId;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{Level, debug, span};

use crate::bag::DataBag;
use crate::bot::BoxedBot;
use crate::cache::{CacheConfig, SessionCache};
use crate::error::{FetchError, FetchResult};
use crate::event::{BoxedEvent, Event, EventSet};
use crate::model::{BotIdentity, Session};
use crate::platform::Platform;

/// A type-erased supplier stored in the resolver's table.
///
/// Internally a closure that captures the registered function and bridges
/// it to the erased (bot, event) calling convention.
pub type BoxedSupplier =
    Arc<dyn Fn(BoxedBot, BoxedEvent) -> BoxFuture<'static, FetchResult<DataBag>> + Send + Sync>;

/// One supplier registration: the event levels it serves, in declaration
/// order, and the erased closure.
struct SupplierEntry {
    targets: Vec<TypeId>,
    supplier: BoxedSupplier,
}

/// The session resolution engine of one platform.
///
/// Built once at startup with the builder-style `supply*` methods, then
/// shared behind an `Arc`. Suppliers are scanned in registration order
/// within each type-chain level, so the most specific registration that
/// accepts the event wins, regardless of when it was registered relative
/// to broader ones.
pub struct Resolver {
    platform: Arc<dyn Platform>,
    suppliers: Vec<SupplierEntry>,
    wildcard: Option<BoxedSupplier>,
    cache: SessionCache,
}

impl Resolver {
    /// Creates a resolver for the given platform with default cache
    /// settings.
    pub fn new(platform: impl Platform + 'static) -> Self {
        Self {
            platform: Arc::new(platform),
            suppliers: Vec::new(),
            wildcard: None,
            cache: SessionCache::new(&CacheConfig::default()),
        }
    }

    /// Replaces the cache tiers with ones built from `config`.
    ///
    /// Call before any fetch; existing cached entries are discarded.
    pub fn with_cache_config(mut self, config: &CacheConfig) -> Self {
        self.cache = SessionCache::new(config);
        self
    }

    /// Registers a typed supplier for event type `E`.
    ///
    /// The supplier receives the event viewed at level `E`, so registering
    /// for a base event type also covers every derived event that projects
    /// to it.
    pub fn supply<E, F, Fut>(mut self, f: F) -> Self
    where
        E: Event + Clone,
        F: Fn(BoxedBot, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FetchResult<DataBag>> + Send + 'static,
    {
        let supplier: BoxedSupplier = Arc::new(
            move |bot: BoxedBot, event: BoxedEvent| -> BoxFuture<'static, FetchResult<DataBag>> {
                match event.view::<E>() {
                    Some(typed) => Box::pin(f(bot, typed.clone())),
                    None => {
                        let kind = event.event_name().to_string();
                        Box::pin(async move { Err(FetchError::unsupported_event(kind)) })
                    }
                }
            },
        );
        self.suppliers.push(SupplierEntry {
            targets: vec![TypeId::of::<E>()],
            supplier,
        });
        self
    }

    /// Registers one supplier under every member of the event set `S`.
    ///
    /// The supplier receives the erased event and is expected to sort out
    /// the members itself, typically via [`BoxedEvent::view`].
    pub fn supply_for<S, F, Fut>(mut self, f: F) -> Self
    where
        S: EventSet,
        F: Fn(BoxedBot, BoxedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FetchResult<DataBag>> + Send + 'static,
    {
        let supplier: BoxedSupplier = Arc::new(
            move |bot: BoxedBot, event: BoxedEvent| -> BoxFuture<'static, FetchResult<DataBag>> {
                Box::pin(f(bot, event))
            },
        );
        self.suppliers.push(SupplierEntry {
            targets: S::members(),
            supplier,
        });
        self
    }

    /// Registers the wildcard supplier, consulted when no typed supplier
    /// accepts an event. A second call replaces the first.
    pub fn supply_wildcard<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(BoxedBot, BoxedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FetchResult<DataBag>> + Send + 'static,
    {
        self.wildcard = Some(Arc::new(
            move |bot: BoxedBot, event: BoxedEvent| -> BoxFuture<'static, FetchResult<DataBag>> {
                Box::pin(f(bot, event))
            },
        ));
        self
    }

    /// The platform this resolver serves.
    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// The platform's cache tiers.
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Number of registered supplier entries (excluding the wildcard).
    pub fn supplier_count(&self) -> usize {
        self.suppliers.len()
    }

    /// Drops every cache entry belonging to one bot.
    pub fn purge_bot(&self, self_id: &str) {
        self.cache.purge_bot(self_id);
    }

    /// Picks the supplier for an event: the first registration accepting
    /// the most specific chain level, else the wildcard.
    fn route(&self, event: &BoxedEvent) -> Option<&BoxedSupplier> {
        for level in event.type_chain() {
            for entry in &self.suppliers {
                if entry.targets.contains(&level) {
                    return Some(&entry.supplier);
                }
            }
        }
        self.wildcard.as_ref()
    }

    /// Resolves `(bot, event)` into a [`Session`].
    ///
    /// Checks the session cache first when the event carries a session
    /// key, then routes to a supplier, merges its data over the bot's base
    /// identity (supplier entries win), and runs the platform extractors.
    /// A supplier signalling "unsupported" ends resolution; the wildcard
    /// only backs up events no typed supplier accepts, not failing ones.
    pub async fn fetch(&self, bot: &BoxedBot, event: &BoxedEvent) -> FetchResult<Session> {
        let span = span!(Level::DEBUG, "fetch", event_name = %event.event_name());
        let _enter = span.enter();

        let session_key = event.session_key();
        if let Some(key) = &session_key
            && let Some(hit) = self.cache.session(bot.self_id(), key)
        {
            debug!(session_key = %key, "Session cache hit");
            return Ok(hit);
        }

        let supplier = self
            .route(event)
            .ok_or_else(|| FetchError::unsupported_event(event.event_name()))?;

        let base = self.platform.supply_self(bot);
        let mut data = DataBag::new()
            .with("self_id", base.self_id)
            .with("adapter", base.adapter)
            .with("scope", base.scope);

        let supplied = match supplier(bot.clone(), event.clone()).await {
            Ok(bag) => bag,
            Err(e) if e.is_unsupported() => {
                return Err(FetchError::unsupported_event(event.event_name()));
            }
            Err(e) => return Err(e),
        };
        data.merge(supplied);

        let session = self.parse(&data)?;
        if let Some(key) = &session_key {
            self.cache.store_session(bot.self_id(), key, &session);
        }
        Ok(session)
    }

    /// Builds a session from fully merged data.
    fn parse(&self, data: &DataBag) -> FetchResult<Session> {
        let user = self.platform.extract_user(data)?;
        let scene = self.platform.extract_scene(data)?;
        let member = self.platform.extract_member(data, Some(&user))?;
        let operator = match data.map("operator") {
            Some(op) => self.platform.extract_member(op, None)?,
            None => None,
        };

        let identity = BotIdentity::new(
            data.require_str("self_id")?,
            data.require_str("adapter")?,
            data.require_str("scope")?,
        );
        let mut session = Session::new(identity, scene, user);
        session.member = member;
        session.operator = operator;
        Ok(session)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("platform", &self.platform.name())
            .field("supplier_count", &self.suppliers.len())
            .field("wildcard", &self.wildcard.is_some())
            .finish()
    }
}
