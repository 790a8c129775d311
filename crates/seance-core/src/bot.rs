//! Bot trait and related types.
//!
//! A [`Bot`] is the engine's view of one connected account: just enough
//! identity to route to the right resolver and scope cache entries, plus a
//! downcast hook so platform modules can reach their concrete bot type for
//! real API calls.

use std::any::Any;
use std::sync::Arc;

/// The engine-facing bot surface.
///
/// Platform crates implement this on their concrete bot types; suppliers
/// and query methods recover the concrete type with [`downcast_bot`] when
/// they need platform APIs.
pub trait Bot: Send + Sync {
    /// Returns the bot's account id on its platform.
    fn self_id(&self) -> &str;

    /// Returns the adapter name this bot belongs to.
    fn adapter_name(&self) -> &str;

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    ///
    /// Implementors should simply return `self`.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A boxed Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

/// Attempts to downcast a [`BoxedBot`] to a specific concrete type.
///
/// ```rust,ignore
/// async fn query_user(bot: &BoxedBot, user_id: &str) -> FetchResult<Option<User>> {
///     let Some(console) = downcast_bot::<ConsoleBot>(bot.clone()) else {
///         return Err(FetchError::UnsupportedOperation);
///     };
///     Ok(console.lookup_user(user_id))
/// }
/// ```
pub fn downcast_bot<T: Bot + 'static>(bot: BoxedBot) -> Option<Arc<T>> {
    let any_arc = bot.as_any();
    Arc::downcast::<T>(any_arc).ok()
}
