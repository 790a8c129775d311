//! Per-bot query facade over a platform's resolver.
//!
//! [`Interface`] pairs one bot with its platform's [`Resolver`] and layers
//! the lookup strategy on top of the raw platform queries:
//!
//! 1. cache tier (point lookups only)
//! 2. direct point query, caching a success
//! 3. linear scan over the matching bulk query, never cached
//!
//! The "not supported" signal never escapes this facade: a platform without
//! point queries degrades to scans, and a platform without bulk queries
//! degrades to empty iterations. Only real upstream failures surface.

use std::sync::Arc;

use futures::StreamExt;
use futures::future;
use futures::stream::BoxStream;
use tracing::warn;

use crate::bot::BoxedBot;
use crate::error::FetchResult;
use crate::model::{Member, Scene, SceneType, User};
use crate::resolver::Resolver;

/// Absorbs the result layer of a bulk query stream.
///
/// The "not supported" signal ends the stream silently; any other error
/// ends it with a warning. Items already yielded stay yielded.
fn absorb_results<'a, T: Send + 'a>(stream: BoxStream<'a, FetchResult<T>>) -> BoxStream<'a, T> {
    Box::pin(
        stream
            .take_while(|item| {
                let keep = match item {
                    Ok(_) => true,
                    Err(e) if e.is_unsupported() => false,
                    Err(e) => {
                        warn!(error = %e, "Bulk query failed mid-stream");
                        false
                    }
                };
                future::ready(keep)
            })
            .filter_map(|item| future::ready(item.ok())),
    )
}

/// Point and bulk queries for everything one bot can see.
#[derive(Clone)]
pub struct Interface {
    bot: BoxedBot,
    resolver: Arc<Resolver>,
}

impl Interface {
    /// Creates a facade for `bot` over its platform's resolver.
    pub fn new(bot: BoxedBot, resolver: Arc<Resolver>) -> Self {
        Self { bot, resolver }
    }

    /// The bot this facade queries through.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Looks up a user by id.
    pub async fn get_user(&self, user_id: &str) -> FetchResult<Option<User>> {
        let self_id = self.bot.self_id();
        let cache = self.resolver.cache();
        if let Some(hit) = cache.user(self_id, user_id) {
            return Ok(Some(hit));
        }

        match self
            .resolver
            .platform()
            .query_user(&self.bot, user_id)
            .await
        {
            Ok(Some(user)) => {
                cache.store_user(self_id, &user);
                return Ok(Some(user));
            }
            Ok(None) => return Ok(None),
            Err(e) if e.is_unsupported() => {}
            Err(e) => return Err(e),
        }

        let mut users = self.iter_users();
        while let Some(user) = users.next().await {
            if user.id == user_id {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    /// Looks up a scene by kind and id, within `parent_id` when given.
    pub async fn get_scene(
        &self,
        kind: SceneType,
        scene_id: &str,
        parent_id: Option<&str>,
    ) -> FetchResult<Option<Scene>> {
        let self_id = self.bot.self_id();
        let cache = self.resolver.cache();
        if let Some(hit) = cache.scene(self_id, kind, scene_id, parent_id) {
            return Ok(Some(hit));
        }

        match self
            .resolver
            .platform()
            .query_scene(&self.bot, kind, scene_id, parent_id)
            .await
        {
            Ok(Some(scene)) => {
                cache.store_scene(self_id, kind, scene_id, parent_id, &scene);
                return Ok(Some(scene));
            }
            Ok(None) => return Ok(None),
            Err(e) if e.is_unsupported() => {}
            Err(e) => return Err(e),
        }

        let mut scenes = self.iter_scenes(Some(kind), parent_id);
        while let Some(scene) = scenes.next().await {
            if scene.kind == kind && scene.id == scene_id {
                return Ok(Some(scene));
            }
        }
        Ok(None)
    }

    /// Looks up a member by scene and user id.
    pub async fn get_member(
        &self,
        kind: SceneType,
        scene_id: &str,
        user_id: &str,
    ) -> FetchResult<Option<Member>> {
        let self_id = self.bot.self_id();
        let cache = self.resolver.cache();
        if let Some(hit) = cache.member(self_id, kind, scene_id, user_id) {
            return Ok(Some(hit));
        }

        match self
            .resolver
            .platform()
            .query_member(&self.bot, kind, scene_id, user_id)
            .await
        {
            Ok(Some(member)) => {
                cache.store_member(self_id, kind, scene_id, user_id, &member);
                return Ok(Some(member));
            }
            Ok(None) => return Ok(None),
            Err(e) if e.is_unsupported() => {}
            Err(e) => return Err(e),
        }

        let mut members = self.iter_members(kind, scene_id);
        while let Some(member) = members.next().await {
            if member.user.id == user_id {
                return Ok(Some(member));
            }
        }
        Ok(None)
    }

    /// Streams every user visible to the bot. Each call restarts the
    /// underlying bulk query; results are never cached.
    pub fn iter_users(&self) -> BoxStream<'_, User> {
        absorb_results(self.resolver.platform().query_users(&self.bot))
    }

    /// Streams scenes visible to the bot, optionally filtered by kind
    /// and/or parent scene.
    pub fn iter_scenes<'a>(
        &'a self,
        kind: Option<SceneType>,
        parent_id: Option<&'a str>,
    ) -> BoxStream<'a, Scene> {
        absorb_results(
            self.resolver
                .platform()
                .query_scenes(&self.bot, kind, parent_id),
        )
    }

    /// Streams the members of one scene.
    pub fn iter_members<'a>(
        &'a self,
        kind: SceneType,
        scene_id: &'a str,
    ) -> BoxStream<'a, Member> {
        absorb_results(
            self.resolver
                .platform()
                .query_members(&self.bot, kind, scene_id),
        )
    }

    /// Collects every visible user into a vector.
    pub async fn users(&self) -> Vec<User> {
        self.iter_users().collect().await
    }

    /// Collects matching scenes into a vector.
    pub async fn scenes(&self, kind: Option<SceneType>, parent_id: Option<&str>) -> Vec<Scene> {
        self.iter_scenes(kind, parent_id).collect().await
    }

    /// Collects one scene's members into a vector.
    pub async fn members(&self, kind: SceneType, scene_id: &str) -> Vec<Member> {
        self.iter_members(kind, scene_id).collect().await
    }
}

impl std::fmt::Debug for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface")
            .field("self_id", &self.bot.self_id())
            .field("platform", &self.resolver.platform().name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::DataBag;
    use crate::bot::Bot;
    use crate::cache::CacheConfig;
    use crate::error::FetchError;
    use crate::model::{BotIdentity, Role};
    use crate::platform::Platform;
    use async_trait::async_trait;
    use futures::stream;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockBot;

    impl Bot for MockBot {
        fn self_id(&self) -> &str {
            "bot-1"
        }

        fn adapter_name(&self) -> &str {
            "test"
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn mock_bot() -> BoxedBot {
        Arc::new(MockBot)
    }

    struct NamedBot(&'static str);

    impl Bot for NamedBot {
        fn self_id(&self) -> &str {
            self.0
        }

        fn adapter_name(&self) -> &str {
            "test"
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    /// Platform double with a fixed roster and switchable capabilities.
    /// Counters are shared so tests keep a handle after the platform
    /// moves into the resolver.
    struct QueryPlatform {
        users: Vec<User>,
        members: Vec<Member>,
        point_supported: bool,
        fail_mid_stream: bool,
        point_calls: Arc<AtomicUsize>,
        bulk_calls: Arc<AtomicUsize>,
    }

    impl QueryPlatform {
        fn new(users: Vec<User>) -> Self {
            Self {
                users,
                members: Vec::new(),
                point_supported: true,
                fail_mid_stream: false,
                point_calls: Arc::new(AtomicUsize::new(0)),
                bulk_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn without_point_queries(mut self) -> Self {
            self.point_supported = false;
            self
        }

        fn failing_mid_stream(mut self) -> Self {
            self.fail_mid_stream = true;
            self
        }

        fn with_members(mut self, members: Vec<Member>) -> Self {
            self.members = members;
            self
        }

        fn counters(&self) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
            (
                Arc::clone(&self.point_calls),
                Arc::clone(&self.bulk_calls),
            )
        }
    }

    #[async_trait]
    impl Platform for QueryPlatform {
        fn name(&self) -> &'static str {
            "test"
        }

        fn extract_user(&self, data: &DataBag) -> FetchResult<User> {
            Ok(User::new(data.require_str("user_id")?))
        }

        fn extract_scene(&self, data: &DataBag) -> FetchResult<Scene> {
            Ok(Scene::new(data.require_str("user_id")?, SceneType::Private))
        }

        fn extract_member(
            &self,
            _data: &DataBag,
            _user: Option<&User>,
        ) -> FetchResult<Option<Member>> {
            Ok(None)
        }

        fn supply_self(&self, bot: &BoxedBot) -> BotIdentity {
            BotIdentity::new(bot.self_id(), "test", "Test")
        }

        async fn query_user(&self, _bot: &BoxedBot, user_id: &str) -> FetchResult<Option<User>> {
            self.point_calls.fetch_add(1, Ordering::SeqCst);
            if !self.point_supported {
                return Err(FetchError::UnsupportedOperation);
            }
            Ok(self.users.iter().find(|u| u.id == user_id).cloned())
        }

        async fn query_scene(
            &self,
            _bot: &BoxedBot,
            kind: SceneType,
            scene_id: &str,
            _parent_id: Option<&str>,
        ) -> FetchResult<Option<Scene>> {
            self.point_calls.fetch_add(1, Ordering::SeqCst);
            if !self.point_supported {
                return Err(FetchError::UnsupportedOperation);
            }
            Ok(Some(Scene::new(scene_id, kind)))
        }

        async fn query_member(
            &self,
            _bot: &BoxedBot,
            _kind: SceneType,
            _scene_id: &str,
            user_id: &str,
        ) -> FetchResult<Option<Member>> {
            self.point_calls.fetch_add(1, Ordering::SeqCst);
            if !self.point_supported {
                return Err(FetchError::UnsupportedOperation);
            }
            Ok(self.members.iter().find(|m| m.user.id == user_id).cloned())
        }

        fn query_users<'a>(&'a self, _bot: &'a BoxedBot) -> BoxStream<'a, FetchResult<User>> {
            self.bulk_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_mid_stream {
                let first = self.users[0].clone();
                return Box::pin(stream::iter(vec![
                    Ok(first),
                    Err(FetchError::upstream("connection reset")),
                ]));
            }
            Box::pin(stream::iter(self.users.clone().into_iter().map(Ok)))
        }

        fn query_scenes<'a>(
            &'a self,
            _bot: &'a BoxedBot,
            kind: Option<SceneType>,
            _parent_id: Option<&'a str>,
        ) -> BoxStream<'a, FetchResult<Scene>> {
            self.bulk_calls.fetch_add(1, Ordering::SeqCst);
            let scenes = vec![
                Scene::new("room-1", SceneType::Group),
                Scene::new("room-2", SceneType::Group),
            ];
            Box::pin(stream::iter(
                scenes
                    .into_iter()
                    .filter(move |s| kind.is_none_or(|k| s.kind == k))
                    .map(Ok),
            ))
        }

        fn query_members<'a>(
            &'a self,
            _bot: &'a BoxedBot,
            _kind: SceneType,
            _scene_id: &'a str,
        ) -> BoxStream<'a, FetchResult<Member>> {
            self.bulk_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(stream::iter(self.members.clone().into_iter().map(Ok)))
        }
    }

    fn interface(platform: QueryPlatform) -> Interface {
        Interface::new(mock_bot(), Arc::new(Resolver::new(platform)))
    }

    #[tokio::test]
    async fn point_query_hit_is_cached() {
        let platform = QueryPlatform::new(vec![User::new("u1")]);
        let (point_calls, bulk_calls) = platform.counters();
        let iface = interface(platform);

        assert_eq!(iface.get_user("u1").await.unwrap().unwrap().id, "u1");
        assert_eq!(iface.get_user("u1").await.unwrap().unwrap().id, "u1");

        assert_eq!(point_calls.load(Ordering::SeqCst), 1);
        assert_eq!(bulk_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_user_cache_entry_queries_again() {
        let platform = QueryPlatform::new(vec![User::new("u1")]);
        let (point_calls, _) = platform.counters();
        let iface = interface(platform);

        assert!(iface.get_user("u1").await.unwrap().is_some());
        assert!(iface.get_user("u1").await.unwrap().is_some());
        assert_eq!(point_calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(iface.get_user("u1").await.unwrap().is_some());
        assert_eq!(point_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn user_cache_is_scoped_to_the_bot() {
        let platform = QueryPlatform::new(vec![User::new("u1")]);
        let (point_calls, _) = platform.counters();
        let resolver = Arc::new(Resolver::new(platform));

        let iface_a = Interface::new(Arc::new(NamedBot("bot-a")), Arc::clone(&resolver));
        let iface_b = Interface::new(Arc::new(NamedBot("bot-b")), Arc::clone(&resolver));

        assert!(iface_a.get_user("u1").await.unwrap().is_some());
        assert!(iface_b.get_user("u1").await.unwrap().is_some());

        // The first bot's cached entry is not visible to the second.
        assert_eq!(point_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn point_query_none_does_not_scan() {
        let platform = QueryPlatform::new(vec![User::new("u1")]);
        let (point_calls, bulk_calls) = platform.counters();
        let iface = interface(platform);

        assert!(iface.get_user("missing").await.unwrap().is_none());

        assert_eq!(point_calls.load(Ordering::SeqCst), 1);
        assert_eq!(bulk_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsupported_point_query_falls_back_to_scan() {
        let platform =
            QueryPlatform::new(vec![User::new("u1"), User::new("u2")]).without_point_queries();
        let (_, bulk_calls) = platform.counters();
        let iface = interface(platform);

        assert_eq!(iface.get_user("u2").await.unwrap().unwrap().id, "u2");
        // Scan results are never cached, so a second lookup scans again.
        assert_eq!(iface.get_user("u2").await.unwrap().unwrap().id, "u2");

        assert_eq!(bulk_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn scan_miss_is_ok_none() {
        let iface = interface(QueryPlatform::new(vec![User::new("u1")]).without_point_queries());
        assert!(iface.get_user("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scene_cache_is_keyed_by_request() {
        let platform = QueryPlatform::new(Vec::new());
        let (point_calls, _) = platform.counters();
        let iface = interface(platform);

        iface
            .get_scene(SceneType::ChannelText, "ch", Some("g1"))
            .await
            .unwrap()
            .unwrap();
        iface
            .get_scene(SceneType::ChannelText, "ch", Some("g1"))
            .await
            .unwrap()
            .unwrap();
        // Different parent filter misses the cache.
        iface
            .get_scene(SceneType::ChannelText, "ch", None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(point_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn member_scan_matches_by_user_id() {
        let members = vec![
            Member::new(User::new("u1")).with_role(Role::new("MEMBER")),
            Member::new(User::new("u2")).with_role(Role::new("OWNER")),
        ];
        let iface = interface(
            QueryPlatform::new(Vec::new())
                .with_members(members)
                .without_point_queries(),
        );

        let member = iface
            .get_member(SceneType::Group, "room-1", "u2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(member.role.unwrap().id, "OWNER");
    }

    #[tokio::test]
    async fn iterations_absorb_unsupported_into_empty() {
        struct Bare;

        #[async_trait]
        impl Platform for Bare {
            fn name(&self) -> &'static str {
                "bare"
            }

            fn extract_user(&self, data: &DataBag) -> FetchResult<User> {
                Ok(User::new(data.require_str("user_id")?))
            }

            fn extract_scene(&self, data: &DataBag) -> FetchResult<Scene> {
                Ok(Scene::new(data.require_str("user_id")?, SceneType::Private))
            }

            fn extract_member(
                &self,
                _data: &DataBag,
                _user: Option<&User>,
            ) -> FetchResult<Option<Member>> {
                Ok(None)
            }

            fn supply_self(&self, bot: &BoxedBot) -> BotIdentity {
                BotIdentity::new(bot.self_id(), "bare", "Bare")
            }
        }

        let iface = Interface::new(mock_bot(), Arc::new(Resolver::new(Bare)));
        assert!(iface.users().await.is_empty());
        assert!(iface.scenes(None, None).await.is_empty());
        assert!(iface.members(SceneType::Group, "room-1").await.is_empty());
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_earlier_items() {
        let iface = interface(
            QueryPlatform::new(vec![User::new("u1"), User::new("u2")]).failing_mid_stream(),
        );

        let users = iface.users().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "u1");
    }

    #[tokio::test]
    async fn scenes_filter_by_kind() {
        let iface = interface(QueryPlatform::new(Vec::new()));

        let groups = iface.scenes(Some(SceneType::Group), None).await;
        assert_eq!(groups.len(), 2);

        let guilds = iface.scenes(Some(SceneType::Guild), None).await;
        assert!(guilds.is_empty());
    }

    #[tokio::test]
    async fn disabled_cache_repeats_point_queries() {
        let platform = QueryPlatform::new(vec![User::new("u1")]);
        let (point_calls, _) = platform.counters();
        let resolver = Arc::new(Resolver::new(platform).with_cache_config(&CacheConfig {
            enabled: false,
            ttl_secs: 300,
        }));
        let iface = Interface::new(mock_bot(), resolver);

        iface.get_user("u1").await.unwrap().unwrap();
        iface.get_user("u1").await.unwrap().unwrap();

        assert_eq!(point_calls.load(Ordering::SeqCst), 2);
    }
}
