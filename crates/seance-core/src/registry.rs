//! Adapter-to-resolver registry.
//!
//! A [`ResolverRegistry`] maps adapter names to their [`Resolver`]s and is
//! the usual entry point for applications hosting several platforms: hand
//! it `(bot, event)` pairs and it routes by the bot's adapter name. There
//! is no ambient global; construct one at startup and pass it (behind an
//! `Arc`) to whatever consumes sessions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::bot::BoxedBot;
use crate::error::FetchError;
use crate::event::BoxedEvent;
use crate::interface::Interface;
use crate::model::Session;
use crate::resolver::Resolver;

/// Routes bots to the resolver registered for their adapter.
pub struct ResolverRegistry {
    resolvers: RwLock<HashMap<String, Arc<Resolver>>>,
}

impl ResolverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            resolvers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a resolver under an adapter name, replacing any previous
    /// registration for that name.
    pub fn register(&self, adapter: impl Into<String>, resolver: Arc<Resolver>) {
        let adapter = adapter.into();
        debug!(
            adapter = %adapter,
            platform = resolver.platform().name(),
            "Registered resolver"
        );
        self.resolvers.write().insert(adapter, resolver);
    }

    /// Gets the resolver registered for an adapter name.
    pub fn resolver(&self, adapter: &str) -> Option<Arc<Resolver>> {
        self.resolvers.read().get(adapter).cloned()
    }

    /// Returns all registered adapter names.
    pub fn adapter_names(&self) -> Vec<String> {
        self.resolvers.read().keys().cloned().collect()
    }

    /// Number of registered resolvers.
    pub fn count(&self) -> usize {
        self.resolvers.read().len()
    }

    /// Resolves `(bot, event)` through the bot's adapter.
    ///
    /// Returns `None` when no resolver is registered for the adapter, when
    /// the event is not supported, or when resolution fails upstream;
    /// failures are logged rather than surfaced, so event-loop callers can
    /// treat "no session" as a single case.
    pub async fn resolve(&self, bot: &BoxedBot, event: &BoxedEvent) -> Option<Session> {
        let adapter = bot.adapter_name();
        let Some(resolver) = self.resolver(adapter) else {
            debug!(adapter = %adapter, "No resolver registered for adapter");
            return None;
        };

        match resolver.fetch(bot, event).await {
            Ok(session) => Some(session),
            Err(FetchError::UnsupportedEvent { kind }) => {
                debug!(adapter = %adapter, event_name = %kind, "Event carries no session");
                None
            }
            Err(e) => {
                warn!(
                    adapter = %adapter,
                    event_name = %event.event_name(),
                    error = %e,
                    "Session resolution failed"
                );
                None
            }
        }
    }

    /// Creates a query facade for `bot`, if its adapter has a resolver.
    pub fn interface(&self, bot: &BoxedBot) -> Option<Interface> {
        let resolver = self.resolver(bot.adapter_name())?;
        Some(Interface::new(bot.clone(), resolver))
    }

    /// Drops every cache entry for one bot, across all resolvers.
    pub fn purge_bot(&self, self_id: &str) {
        for resolver in self.resolvers.read().values() {
            resolver.purge_bot(self_id);
        }
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut adapters = self.adapter_names();
        adapters.sort();
        f.debug_struct("ResolverRegistry")
            .field("adapters", &adapters)
            .finish()
    }
}
