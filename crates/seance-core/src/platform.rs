//! The per-platform contract consumed by the resolver and the query facade.
//!
//! A platform module implements [`Platform`] once: pure extractors that read
//! a [`DataBag`] back into model entities, a cheap [`Platform::supply_self`]
//! identity, and optional query methods backed by real platform APIs. Every
//! query method defaults to the "not supported" signal, so a minimal
//! platform only implements the extractors and still resolves sessions.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};

use crate::bag::DataBag;
use crate::bot::BoxedBot;
use crate::error::{FetchError, FetchResult};
use crate::model::{BotIdentity, Member, Scene, SceneType, User};

/// A one-shot stream carrying the "not supported" signal.
///
/// Platform modules return this from bulk queries they do not implement;
/// the facade turns it into an empty iteration.
pub fn unsupported_stream<T: Send + 'static>() -> BoxStream<'static, FetchResult<T>> {
    Box::pin(stream::once(async { Err(FetchError::UnsupportedOperation) }))
}

/// The extractor and query contract of one chat platform.
///
/// Extractors must be pure: no I/O, no mutation, same bag in, same entity
/// out. Anything requiring a platform call happens earlier, in a supplier,
/// which records the results into the bag. Query methods receive the erased
/// bot and recover their concrete type via
/// [`downcast_bot`](crate::bot::downcast_bot).
#[async_trait]
pub trait Platform: Send + Sync {
    /// Canonical adapter name of this platform.
    fn name(&self) -> &'static str;

    /// Builds the acting [`User`] from supplied data.
    fn extract_user(&self, data: &DataBag) -> FetchResult<User>;

    /// Builds the [`Scene`] (including its parent link) from supplied data.
    fn extract_scene(&self, data: &DataBag) -> FetchResult<Scene>;

    /// Builds the acting user's [`Member`] standing from supplied data.
    ///
    /// Returns `Ok(None)` when the data carries no membership context (e.g.
    /// a plain private chat). When `user` is `None` the implementation
    /// constructs the wrapped user from the data itself; this is how
    /// operator records are extracted.
    fn extract_member(&self, data: &DataBag, user: Option<&User>) -> FetchResult<Option<Member>>;

    /// Returns the identity triple of the given bot. Cheap and synchronous.
    fn supply_self(&self, bot: &BoxedBot) -> BotIdentity;

    /// Looks up a user by id.
    async fn query_user(&self, bot: &BoxedBot, user_id: &str) -> FetchResult<Option<User>> {
        let _ = (bot, user_id);
        Err(FetchError::UnsupportedOperation)
    }

    /// Looks up a scene by kind and id, within `parent_id` when given.
    async fn query_scene(
        &self,
        bot: &BoxedBot,
        kind: SceneType,
        scene_id: &str,
        parent_id: Option<&str>,
    ) -> FetchResult<Option<Scene>> {
        let _ = (bot, kind, scene_id, parent_id);
        Err(FetchError::UnsupportedOperation)
    }

    /// Looks up a member by scene and user id.
    async fn query_member(
        &self,
        bot: &BoxedBot,
        kind: SceneType,
        scene_id: &str,
        user_id: &str,
    ) -> FetchResult<Option<Member>> {
        let _ = (bot, kind, scene_id, user_id);
        Err(FetchError::UnsupportedOperation)
    }

    /// Streams every user visible to the bot.
    fn query_users<'a>(&'a self, bot: &'a BoxedBot) -> BoxStream<'a, FetchResult<User>> {
        let _ = bot;
        unsupported_stream()
    }

    /// Streams scenes visible to the bot, optionally filtered by kind
    /// and/or parent scene.
    fn query_scenes<'a>(
        &'a self,
        bot: &'a BoxedBot,
        kind: Option<SceneType>,
        parent_id: Option<&'a str>,
    ) -> BoxStream<'a, FetchResult<Scene>> {
        let _ = (bot, kind, parent_id);
        unsupported_stream()
    }

    /// Streams the members of one scene.
    fn query_members<'a>(
        &'a self,
        bot: &'a BoxedBot,
        kind: SceneType,
        scene_id: &'a str,
    ) -> BoxStream<'a, FetchResult<Member>> {
        let _ = (bot, kind, scene_id);
        unsupported_stream()
    }
}
