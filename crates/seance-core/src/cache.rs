//! Time-expiring caches for resolved entities.
//!
//! The engine keeps four cache tiers, all scoped by the observing bot's
//! `self_id` so two bots on the same platform never see each other's data:
//!
//! - session - written only by a full resolve, keyed by the event's
//!   platform-native session key
//! - user / scene / member - written only by successful direct point
//!   queries
//!
//! Expiry is implemented with removal tickets instead of timers: every
//! insert pushes a `(deadline, key)` ticket onto a min-heap, and due
//! tickets are drained on every access. A ticket removes its key
//! unconditionally, so overwriting an entry does not extend the original
//! deadline; the first insert's ticket still evicts the key on schedule.
//! That keeps inserts O(log n) with no per-entry bookkeeping, at the cost
//! of re-fetching an overwritten entry one TTL early.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::model::{Member, Scene, SceneType, Session, User};

// ============================================================================
// Cache Configuration
// ============================================================================

/// Cache behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether resolved entities are cached at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds an entry stays valid after its insert.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    300
}

impl CacheConfig {
    /// The configured TTL as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ============================================================================
// Expiring Map
// ============================================================================

/// A scheduled removal of one key.
///
/// Ordered by deadline, then by insertion sequence so same-instant tickets
/// drain deterministically. The key does not participate in ordering.
struct Ticket<K> {
    deadline: Instant,
    seq: u64,
    key: K,
}

impl<K> PartialEq for Ticket<K> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<K> Eq for Ticket<K> {}

impl<K> PartialOrd for Ticket<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Ticket<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// A hash map whose entries disappear a fixed TTL after insertion.
///
/// Uses the tokio clock, so tests drive expiry with `start_paused` and
/// `tokio::time::advance`. All operations drain due tickets first, which
/// bounds the heap by the number of inserts within one TTL window.
pub struct ExpiringMap<K, V> {
    ttl: Duration,
    entries: HashMap<K, V>,
    tickets: BinaryHeap<Reverse<Ticket<K>>>,
    seq: u64,
}

impl<K: Eq + Hash + Clone, V> ExpiringMap<K, V> {
    /// Creates an empty map with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            tickets: BinaryHeap::new(),
            seq: 0,
        }
    }

    fn drain_due(&mut self) {
        let now = Instant::now();
        loop {
            match self.tickets.peek() {
                Some(Reverse(next)) if next.deadline <= now => {
                    if let Some(Reverse(ticket)) = self.tickets.pop() {
                        self.entries.remove(&ticket.key);
                    }
                }
                _ => break,
            }
        }
    }

    /// Inserts `value` under `key` and schedules its removal.
    ///
    /// An existing entry is replaced, but its earlier removal ticket keeps
    /// standing; the new value inherits the old deadline.
    pub fn insert(&mut self, key: K, value: V) {
        self.drain_due();
        self.tickets.push(Reverse(Ticket {
            deadline: Instant::now() + self.ttl,
            seq: self.seq,
            key: key.clone(),
        }));
        self.seq += 1;
        self.entries.insert(key, value);
    }

    /// Returns the live entry under `key`, if any.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.drain_due();
        self.entries.get(key)
    }

    /// Keeps only the entries matching the predicate.
    pub fn retain(&mut self, f: impl FnMut(&K, &mut V) -> bool) {
        self.drain_due();
        self.entries.retain(f);
    }

    /// Number of live entries.
    pub fn len(&mut self) -> usize {
        self.drain_due();
        self.entries.len()
    }

    /// Whether the map holds no live entries.
    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Session Cache Tiers
// ============================================================================

/// Scene-tier key: requested kind, scene id, and parent filter.
type SceneKey = (String, SceneType, String, Option<String>);

/// Member-tier key: scene kind, scene id, user id.
type MemberKey = (String, SceneType, String, String);

/// The four per-resolver cache tiers, each independently locked.
///
/// Locks are short `parking_lot` critical sections and are never held
/// across an await; values are cloned out on hit. When disabled, every
/// lookup misses and every store is dropped.
pub struct SessionCache {
    enabled: bool,
    sessions: Mutex<ExpiringMap<(String, String), Session>>,
    users: Mutex<ExpiringMap<(String, String), User>>,
    scenes: Mutex<ExpiringMap<SceneKey, Scene>>,
    members: Mutex<ExpiringMap<MemberKey, Member>>,
}

impl SessionCache {
    /// Creates the tiers from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let ttl = config.ttl();
        Self {
            enabled: config.enabled,
            sessions: Mutex::new(ExpiringMap::new(ttl)),
            users: Mutex::new(ExpiringMap::new(ttl)),
            scenes: Mutex::new(ExpiringMap::new(ttl)),
            members: Mutex::new(ExpiringMap::new(ttl)),
        }
    }

    /// Whether caching is active.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Looks up a resolved session by the event's session key.
    pub fn session(&self, self_id: &str, session_key: &str) -> Option<Session> {
        if !self.enabled {
            return None;
        }
        self.sessions
            .lock()
            .get(&(self_id.to_string(), session_key.to_string()))
            .cloned()
    }

    /// Stores a resolved session under the event's session key.
    pub fn store_session(&self, self_id: &str, session_key: &str, session: &Session) {
        if !self.enabled {
            return;
        }
        self.sessions.lock().insert(
            (self_id.to_string(), session_key.to_string()),
            session.clone(),
        );
    }

    /// Looks up a point-queried user.
    pub fn user(&self, self_id: &str, user_id: &str) -> Option<User> {
        if !self.enabled {
            return None;
        }
        self.users
            .lock()
            .get(&(self_id.to_string(), user_id.to_string()))
            .cloned()
    }

    /// Stores a point-queried user.
    pub fn store_user(&self, self_id: &str, user: &User) {
        if !self.enabled {
            return;
        }
        self.users
            .lock()
            .insert((self_id.to_string(), user.id.clone()), user.clone());
    }

    /// Looks up a point-queried scene under the exact requested key.
    pub fn scene(
        &self,
        self_id: &str,
        kind: SceneType,
        scene_id: &str,
        parent_id: Option<&str>,
    ) -> Option<Scene> {
        if !self.enabled {
            return None;
        }
        self.scenes
            .lock()
            .get(&(
                self_id.to_string(),
                kind,
                scene_id.to_string(),
                parent_id.map(str::to_string),
            ))
            .cloned()
    }

    /// Stores a point-queried scene under the requested key.
    pub fn store_scene(
        &self,
        self_id: &str,
        kind: SceneType,
        scene_id: &str,
        parent_id: Option<&str>,
        scene: &Scene,
    ) {
        if !self.enabled {
            return;
        }
        self.scenes.lock().insert(
            (
                self_id.to_string(),
                kind,
                scene_id.to_string(),
                parent_id.map(str::to_string),
            ),
            scene.clone(),
        );
    }

    /// Looks up a point-queried member.
    pub fn member(
        &self,
        self_id: &str,
        kind: SceneType,
        scene_id: &str,
        user_id: &str,
    ) -> Option<Member> {
        if !self.enabled {
            return None;
        }
        self.members
            .lock()
            .get(&(
                self_id.to_string(),
                kind,
                scene_id.to_string(),
                user_id.to_string(),
            ))
            .cloned()
    }

    /// Stores a point-queried member under the requested key.
    pub fn store_member(
        &self,
        self_id: &str,
        kind: SceneType,
        scene_id: &str,
        user_id: &str,
        member: &Member,
    ) {
        if !self.enabled {
            return;
        }
        self.members.lock().insert(
            (
                self_id.to_string(),
                kind,
                scene_id.to_string(),
                user_id.to_string(),
            ),
            member.clone(),
        );
    }

    /// Drops every entry belonging to one bot, across all tiers.
    ///
    /// Outstanding removal tickets for the dropped keys stay in the heaps
    /// and drain harmlessly later.
    pub fn purge_bot(&self, self_id: &str) {
        self.sessions.lock().retain(|(id, _), _| id != self_id);
        self.users.lock().retain(|(id, _), _| id != self_id);
        self.scenes.lock().retain(|(id, _, _, _), _| id != self_id);
        self.members.lock().retain(|(id, _, _, _), _| id != self_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BotIdentity;

    fn session(user_id: &str) -> Session {
        Session::new(
            BotIdentity::new("bot-1", "console", "Console"),
            Scene::new(user_id, SceneType::Private),
            User::new(user_id),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let mut map: ExpiringMap<String, u32> = ExpiringMap::new(Duration::from_secs(300));
        map.insert("a".into(), 1);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(map.get(&"a".to_string()), Some(&1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(map.get(&"a".to_string()), None);
        assert!(map.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_keeps_earlier_deadline() {
        let mut map: ExpiringMap<String, u32> = ExpiringMap::new(Duration::from_secs(300));
        map.insert("a".into(), 1);

        tokio::time::advance(Duration::from_secs(200)).await;
        map.insert("a".into(), 2);

        // The first insert's ticket still fires at t=300 and takes the
        // overwritten value with it.
        tokio::time::advance(Duration::from_secs(101)).await;
        assert_eq!(map.get(&"a".to_string()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_keys_survive_each_other() {
        let mut map: ExpiringMap<String, u32> = ExpiringMap::new(Duration::from_secs(300));
        map.insert("a".into(), 1);

        tokio::time::advance(Duration::from_secs(200)).await;
        map.insert("b".into(), 2);

        tokio::time::advance(Duration::from_secs(101)).await;
        assert_eq!(map.get(&"a".to_string()), None);
        assert_eq!(map.get(&"b".to_string()), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn tiers_are_scoped_by_bot() {
        let cache = SessionCache::new(&CacheConfig::default());
        cache.store_user("bot-1", &User::new("u1"));

        assert!(cache.user("bot-1", "u1").is_some());
        assert!(cache.user("bot-2", "u1").is_none());

        cache.purge_bot("bot-1");
        assert!(cache.user("bot-1", "u1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_bot_leaves_other_bots_alone() {
        let cache = SessionCache::new(&CacheConfig::default());
        cache.store_session("bot-1", "private_u1", &session("u1"));
        cache.store_session("bot-2", "private_u1", &session("u1"));

        cache.purge_bot("bot-1");
        assert!(cache.session("bot-1", "private_u1").is_none());
        assert!(cache.session("bot-2", "private_u1").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_cache_never_stores() {
        let config = CacheConfig {
            enabled: false,
            ttl_secs: 300,
        };
        let cache = SessionCache::new(&config);
        cache.store_user("bot-1", &User::new("u1"));
        assert!(cache.user("bot-1", "u1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn scene_key_includes_parent_filter() {
        let cache = SessionCache::new(&CacheConfig::default());
        let scene = Scene::new("ch", SceneType::ChannelText);
        cache.store_scene("bot-1", SceneType::ChannelText, "ch", Some("g1"), &scene);

        assert!(
            cache
                .scene("bot-1", SceneType::ChannelText, "ch", Some("g1"))
                .is_some()
        );
        assert!(
            cache
                .scene("bot-1", SceneType::ChannelText, "ch", None)
                .is_none()
        );
    }

    #[test]
    fn config_defaults_match_documented_values() {
        let config: CacheConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.ttl_secs, 300);
        assert_eq!(config.ttl(), Duration::from_secs(300));
    }
}
