//! Canonical entity model for normalized sessions.
//!
//! This module provides the platform-independent shapes every resolved
//! event is normalized into:
//!
//! - [`User`] - The acting account
//! - [`Scene`] - Where the action happened (private chat, group, guild, channel)
//! - [`Member`] - A user's standing inside a scene ([`Role`], [`MuteInfo`])
//! - [`Session`] - The complete resolved picture, with derived identity strings
//! - [`BotIdentity`] - The observing bot (`self_id` / `adapter` / `scope`)
//!
//! All entities are immutable value objects: construct with `new` plus the
//! consuming `with_*` builders, then read fields directly. Identity-carrying
//! entities ([`User`], [`Scene`], [`Session`]) compare and hash by identity
//! alone, so renames and avatar changes do not split cache keys.

use std::hash::{Hash, Hasher};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Bot Identity
// ============================================================================

/// Identity of the bot a session was resolved through.
///
/// `adapter` names the protocol implementation; `scope` names the actual
/// platform behind it, which matters when one adapter bridges several
/// networks. Both are open strings so new platform crates never require a
/// change here; platform modules export their canonical values as constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotIdentity {
    /// Bot account id on the platform.
    pub self_id: String,
    /// Adapter name (e.g. "console", "onebot").
    pub adapter: String,
    /// Platform scope the adapter is bridging to.
    pub scope: String,
}

impl BotIdentity {
    /// Creates a new identity triple.
    pub fn new(
        self_id: impl Into<String>,
        adapter: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            self_id: self_id.into(),
            adapter: adapter.into(),
            scope: scope.into(),
        }
    }
}

// ============================================================================
// Scene Type
// ============================================================================

/// Classification of conversation scenes.
///
/// The discriminants are stable and ordered: everything at or above
/// [`SceneType::ChannelText`] is a channel inside a guild. Serialized as the
/// bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SceneType {
    /// One-on-one conversation.
    Private = 0,
    /// Flat group chat.
    Group = 1,
    /// Guild/server containing channels.
    Guild = 2,
    /// Text channel inside a guild.
    ChannelText = 3,
    /// Category grouping channels inside a guild.
    ChannelCategory = 4,
    /// Voice channel inside a guild.
    ChannelVoice = 5,
}

impl From<SceneType> for u8 {
    fn from(value: SceneType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for SceneType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => SceneType::Private,
            1 => SceneType::Group,
            2 => SceneType::Guild,
            3 => SceneType::ChannelText,
            4 => SceneType::ChannelCategory,
            5 => SceneType::ChannelVoice,
            other => return Err(format!("unknown scene type {other}")),
        })
    }
}

// ============================================================================
// User
// ============================================================================

/// A platform account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User id, unique within one platform scope.
    pub id: String,
    /// Account name.
    pub name: Option<String>,
    /// Display nickname, if distinct from the name.
    pub nick: Option<String>,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Reported gender, `"unknown"` when the platform has no notion of it.
    #[serde(default = "default_gender")]
    pub gender: String,
}

fn default_gender() -> String {
    "unknown".to_string()
}

impl User {
    /// Creates a user with only the required id set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            nick: None,
            avatar: None,
            gender: default_gender(),
        }
    }

    /// Sets the account name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the display nickname.
    pub fn with_nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self
    }

    /// Sets the avatar URL.
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Sets the reported gender.
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = gender.into();
        self
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// Role & Mute
// ============================================================================

/// A member's role within a scene.
///
/// Pure value with structural equality; `level` orders roles so permission
/// checks can compare across platforms (higher means more privileged).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Platform-independent role id (e.g. "OWNER", "ADMINISTRATOR", "MEMBER").
    pub id: String,
    /// Privilege level, higher is more privileged.
    pub level: i64,
    /// Platform-native role name.
    pub name: Option<String>,
}

impl Role {
    /// Creates a role with level 0 and no name.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level: 0,
            name: None,
        }
    }

    /// Sets the privilege level.
    pub fn with_level(mut self, level: i64) -> Self {
        self.level = level;
        self
    }

    /// Sets the platform-native name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Mute (timeout) state of a member.
///
/// Construction normalizes the `muted` flag: a duration under one second
/// counts as not muted, and a mute whose start time plus duration is already
/// in the past counts as expired. Build with [`MuteInfo::new`] and
/// [`MuteInfo::with_start_at`] so the flag stays consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteInfo {
    /// Whether the member is currently muted.
    pub muted: bool,
    /// Total mute duration.
    pub duration: Duration,
    /// When the mute started, if the platform reports it.
    pub start_at: Option<DateTime<Utc>>,
}

impl MuteInfo {
    /// Creates mute state with no known start time, normalizing `muted`.
    pub fn new(muted: bool, duration: Duration) -> Self {
        let mut info = Self {
            muted,
            duration,
            start_at: None,
        };
        info.normalize();
        info
    }

    /// Sets the mute start time and re-normalizes `muted`.
    pub fn with_start_at(mut self, start_at: DateTime<Utc>) -> Self {
        self.start_at = Some(start_at);
        self.normalize();
        self
    }

    fn normalize(&mut self) {
        if self.duration < Duration::from_secs(1) {
            self.muted = false;
        }
        if let Some(start) = self.start_at
            && let Ok(elapsed) = (Utc::now() - start).to_std()
            && elapsed > self.duration
        {
            self.muted = false;
        }
    }
}

// ============================================================================
// Member
// ============================================================================

/// A user's standing inside a particular scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// The account this membership belongs to.
    pub user: User,
    /// Scene-local nickname, overriding the user's own.
    pub nick: Option<String>,
    /// Role within the scene.
    pub role: Option<Role>,
    /// Mute state within the scene.
    pub mute: Option<MuteInfo>,
    /// When the user joined the scene.
    pub joined_at: Option<DateTime<Utc>>,
}

impl Member {
    /// Creates a membership for the given user with no extra standing.
    pub fn new(user: User) -> Self {
        Self {
            user,
            nick: None,
            role: None,
            mute: None,
            joined_at: None,
        }
    }

    /// Sets the scene-local nickname.
    pub fn with_nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self
    }

    /// Sets the member's role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Sets the member's mute state.
    pub fn with_mute(mut self, mute: MuteInfo) -> Self {
        self.mute = Some(mute);
        self
    }

    /// Sets the join time.
    pub fn with_joined_at(mut self, joined_at: DateTime<Utc>) -> Self {
        self.joined_at = Some(joined_at);
        self
    }

    /// The member's id, delegating to the wrapped user.
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

// ============================================================================
// Scene
// ============================================================================

/// A conversation scene: private chat, group, guild, or a channel within one.
///
/// Scenes form at most a two-level tree. Attaching a parent through
/// [`Scene::with_parent`] strips the parent's own parent, so a channel links
/// to its guild but never to a deeper chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Scene id, unique within one platform scope and scene type.
    pub id: String,
    /// What kind of scene this is.
    pub kind: SceneType,
    /// Scene name.
    pub name: Option<String>,
    /// Scene avatar/icon URL.
    pub avatar: Option<String>,
    /// Containing scene, e.g. the guild a channel belongs to.
    pub parent: Option<Box<Scene>>,
}

impl Scene {
    /// Creates a scene of the given kind with only the id set.
    pub fn new(id: impl Into<String>, kind: SceneType) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            avatar: None,
            parent: None,
        }
    }

    /// Sets the scene name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the avatar/icon URL.
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Attaches a containing scene, flattening it to depth one.
    pub fn with_parent(mut self, mut parent: Scene) -> Self {
        parent.parent = None;
        self.parent = Some(Box::new(parent));
        self
    }

    /// Whether this is a one-on-one conversation.
    pub fn is_private(&self) -> bool {
        self.kind == SceneType::Private
    }

    /// Whether this is a flat group chat.
    pub fn is_group(&self) -> bool {
        self.kind == SceneType::Group
    }

    /// Whether this is a guild/server.
    pub fn is_guild(&self) -> bool {
        self.kind == SceneType::Guild
    }

    /// Whether this is any kind of channel inside a guild.
    pub fn is_channel(&self) -> bool {
        self.kind >= SceneType::ChannelText
    }
}

impl PartialEq for Scene {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Scene {}

impl Hash for Scene {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// Session
// ============================================================================

/// The complete resolved picture of one event: who acted, where, and with
/// what standing, as seen by one bot.
///
/// The derived strings [`Session::scene_path`] and [`Session::id`] are the
/// stable keys downstream systems store sessions under. They are pure
/// functions of the fields, so a session deserialized elsewhere recomputes
/// the same keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bot account id the session was observed by.
    pub self_id: String,
    /// Adapter name the session was resolved through.
    pub adapter: String,
    /// Platform scope behind the adapter.
    pub scope: String,
    /// Where the action happened.
    pub scene: Scene,
    /// The acting account.
    pub user: User,
    /// The actor's standing in the scene, when the scene has membership.
    pub member: Option<Member>,
    /// The second party that acted on the actor (e.g. the admin who muted).
    pub operator: Option<Member>,
}

impl Session {
    /// Creates a session for the given bot identity, scene, and user.
    pub fn new(identity: BotIdentity, scene: Scene, user: User) -> Self {
        Self {
            self_id: identity.self_id,
            adapter: identity.adapter,
            scope: identity.scope,
            scene,
            user,
            member: None,
            operator: None,
        }
    }

    /// Sets the actor's membership.
    pub fn with_member(mut self, member: Member) -> Self {
        self.member = Some(member);
        self
    }

    /// Sets the operator's membership.
    pub fn with_operator(mut self, operator: Member) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Unique id of this conversation-participant pair.
    ///
    /// Equal to [`Session::scene_path`] for private scenes; otherwise the
    /// scene path with the user id appended.
    pub fn id(&self) -> String {
        if self.scene.is_private() {
            self.scene_path()
        } else {
            format!("{}_{}", self.scene_path(), self.user.id)
        }
    }

    /// Path identifying the conversation itself.
    ///
    /// Private scenes collapse onto the user id (prefixed with the parent
    /// scene id for scoped private chats like guild DMs); group scenes use
    /// the scene id; any other scene with a parent is `parent_scene`.
    pub fn scene_path(&self) -> String {
        if self.scene.is_private() {
            return match &self.scene.parent {
                Some(parent) => format!("{}_{}", parent.id, self.user.id),
                None => self.user.id.clone(),
            };
        }
        if self.scene.is_group() {
            return self.scene.id.clone();
        }
        match &self.scene.parent {
            Some(parent) => format!("{}_{}", parent.id, self.scene.id),
            None => self.scene.id.clone(),
        }
    }

    /// The guild this session happened in, directly or via a channel.
    pub fn guild(&self) -> Option<&Scene> {
        if self.scene.is_guild() {
            Some(&self.scene)
        } else if self.scene.is_channel() {
            self.scene.parent.as_deref()
        } else {
            None
        }
    }

    /// The channel this session happened in.
    pub fn channel(&self) -> Option<&Scene> {
        self.scene.is_channel().then_some(&self.scene)
    }

    /// The group this session happened in.
    pub fn group(&self) -> Option<&Scene> {
        self.scene.is_group().then_some(&self.scene)
    }

    /// The private scene this session happened in.
    pub fn friend(&self) -> Option<&Scene> {
        self.scene.is_private().then_some(&self.scene)
    }

    /// The identity triple of the observing bot.
    pub fn identity(&self) -> BotIdentity {
        BotIdentity::new(&self.self_id, &self.adapter, &self.scope)
    }

    /// Serializes the session to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserializes a session from a JSON string.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Session {}

impl Hash for Session {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}
