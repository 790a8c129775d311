//! Console platform: extractors, roster-backed queries, and the resolver
//! wiring that connects them.
//!
//! Suppliers and extractors meet over a small fixed key vocabulary:
//! `user_id`/`name`/`avatar` for the acting user, `room_id`/`room_name`
//! for room scenes, `nick`/`role`/`join_time`/`mute_secs` for room
//! standing, and a nested `operator` bag on moderation notices. A key the
//! supplier could not fill is simply absent, and the extractors leave the
//! matching field empty.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use futures::stream::{self, BoxStream};
use seance_core::{
    BotIdentity, BoxedBot, BoxedEvent, DataBag, FetchError, FetchResult, Member, MuteInfo,
    Platform, Resolver, Role, Scene, SceneType, User, downcast_bot,
};
use tracing::debug;

use crate::bot::ConsoleBot;
use crate::event::{
    ConsoleEvent, ConsoleUser, MessageEvent, RoomJoinEvent, RoomLeaveEvent, RoomMessageEvent,
};
use crate::roster::{Room, RoomMember};

// ============================================================================
// Bag builders
// ============================================================================

/// User fields shared by every console bag.
fn user_bag(user: &ConsoleUser) -> DataBag {
    DataBag::new()
        .with("user_id", user.id.clone())
        .with("name", user.name.clone())
        .with("avatar", user.avatar_url())
}

/// Room-scene fields for a known room.
fn room_scene_bag(room: &Room) -> DataBag {
    DataBag::new()
        .with("room_id", room.id.clone())
        .with("room_name", room.name.clone())
}

/// Writes one member's room standing into a bag.
fn merge_membership(bag: &mut DataBag, member: &RoomMember) {
    if let Some(nick) = &member.nick {
        bag.set("nick", nick.clone());
    }
    bag.set("role", member.role.clone());
    bag.set("join_time", member.joined_at.timestamp());
    if let Some(secs) = member.mute_secs {
        bag.set("mute_secs", secs as i64);
    }
}

/// User plus room fields, enriched with whatever the bot's roster knows.
///
/// Degrades gracefully: an unknown room still yields a resolvable bag,
/// just without a room name or member standing.
fn room_bag(bot: &BoxedBot, user: &ConsoleUser, room_id: &str) -> DataBag {
    let mut bag = user_bag(user).with("room_id", room_id);
    if let Some(bot) = downcast_bot::<ConsoleBot>(bot.clone()) {
        match bot.roster().room(room_id) {
            Some(room) => bag.set("room_name", room.name),
            None => debug!(room_id, "Room not in roster, resolving without room info"),
        }
        if let Some(member) = bot.roster().member(room_id, &user.id) {
            merge_membership(&mut bag, &member);
        }
    }
    bag
}

/// Membership record plus the member's profile, for query answers.
fn member_bag(room_id: &str, member: &RoomMember, profile: Option<&ConsoleUser>) -> DataBag {
    let mut bag = DataBag::new()
        .with("room_id", room_id)
        .with("user_id", member.user_id.clone());
    if let Some(user) = profile {
        bag.set("name", user.name.clone());
        bag.set("avatar", user.avatar_url());
    }
    merge_membership(&mut bag, member);
    bag
}

/// Maps a roster role key onto a canonical room role.
fn room_role(key: &str) -> Role {
    let (id, level) = match key {
        "owner" => ("OWNER", 100),
        "admin" => ("ADMINISTRATOR", 10),
        _ => ("MEMBER", 1),
    };
    Role::new(id).with_level(level).with_name(key)
}

/// Recovers the concrete console bot behind the erased handle.
fn console_bot(bot: &BoxedBot) -> FetchResult<Arc<ConsoleBot>> {
    downcast_bot::<ConsoleBot>(bot.clone())
        .ok_or_else(|| FetchError::upstream("bot is not a console bot"))
}

// ============================================================================
// Platform
// ============================================================================

/// The console platform contract.
///
/// Extractors read the bag keys written by the suppliers in [`resolver`];
/// queries downcast the bot to [`ConsoleBot`] and answer from its roster.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePlatform;

#[async_trait]
impl Platform for ConsolePlatform {
    fn name(&self) -> &'static str {
        crate::ADAPTER
    }

    fn extract_user(&self, data: &DataBag) -> FetchResult<User> {
        let mut user = User::new(data.require_str("user_id")?);
        if let Some(name) = data.str("name") {
            user = user.with_name(name);
        }
        if let Some(avatar) = data.str("avatar") {
            user = user.with_avatar(avatar);
        }
        Ok(user)
    }

    fn extract_scene(&self, data: &DataBag) -> FetchResult<Scene> {
        if let Some(room_id) = data.str("room_id") {
            let mut scene = Scene::new(room_id, SceneType::Group);
            if let Some(name) = data.str("room_name") {
                scene = scene.with_name(name);
            }
            return Ok(scene);
        }
        let mut scene = Scene::new(data.require_str("user_id")?, SceneType::Private);
        if let Some(name) = data.str("name") {
            scene = scene.with_name(name);
        }
        if let Some(avatar) = data.str("avatar") {
            scene = scene.with_avatar(avatar);
        }
        Ok(scene)
    }

    fn extract_member(&self, data: &DataBag, user: Option<&User>) -> FetchResult<Option<Member>> {
        if !data.contains("room_id") {
            return Ok(None);
        }
        let user = match user {
            Some(user) => user.clone(),
            None => self.extract_user(data)?,
        };
        let mut member = Member::new(user);
        if let Some(nick) = data.str("nick") {
            member = member.with_nick(nick);
        }
        if let Some(role) = data.str("role") {
            member = member.with_role(room_role(role));
        }
        if let Some(ts) = data.int("join_time")
            && let Some(at) = DateTime::from_timestamp(ts, 0)
        {
            member = member.with_joined_at(at);
        }
        if let Some(secs) = data.int("mute_secs") {
            let duration = Duration::from_secs(u64::try_from(secs).unwrap_or(0));
            member = member.with_mute(MuteInfo::new(true, duration));
        }
        Ok(Some(member))
    }

    fn supply_self(&self, bot: &BoxedBot) -> BotIdentity {
        BotIdentity::new(bot.self_id(), crate::ADAPTER, crate::SCOPE)
    }

    async fn query_user(&self, bot: &BoxedBot, user_id: &str) -> FetchResult<Option<User>> {
        let bot = console_bot(bot)?;
        match bot.roster().user(user_id) {
            Some(user) => self.extract_user(&user_bag(&user)).map(Some),
            None => Ok(None),
        }
    }

    async fn query_scene(
        &self,
        bot: &BoxedBot,
        kind: SceneType,
        scene_id: &str,
        _parent_id: Option<&str>,
    ) -> FetchResult<Option<Scene>> {
        let bot = console_bot(bot)?;
        match kind {
            // A private scene is the user it is held with.
            SceneType::Private => match bot.roster().user(scene_id) {
                Some(user) => self.extract_scene(&user_bag(&user)).map(Some),
                None => Ok(None),
            },
            SceneType::Group => match bot.roster().room(scene_id) {
                Some(room) => self.extract_scene(&room_scene_bag(&room)).map(Some),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    async fn query_member(
        &self,
        bot: &BoxedBot,
        kind: SceneType,
        scene_id: &str,
        user_id: &str,
    ) -> FetchResult<Option<Member>> {
        if kind != SceneType::Group {
            return Ok(None);
        }
        let bot = console_bot(bot)?;
        match bot.roster().member(scene_id, user_id) {
            Some(member) => {
                let profile = bot.roster().user(user_id);
                self.extract_member(&member_bag(scene_id, &member, profile.as_ref()), None)
            }
            None => Ok(None),
        }
    }

    fn query_users<'a>(&'a self, bot: &'a BoxedBot) -> BoxStream<'a, FetchResult<User>> {
        let bot = match console_bot(bot) {
            Ok(bot) => bot,
            Err(e) => return Box::pin(stream::once(async move { Err(e) })),
        };
        let users: Vec<FetchResult<User>> = bot
            .roster()
            .users()
            .iter()
            .map(|user| self.extract_user(&user_bag(user)))
            .collect();
        Box::pin(stream::iter(users))
    }

    fn query_scenes<'a>(
        &'a self,
        bot: &'a BoxedBot,
        kind: Option<SceneType>,
        _parent_id: Option<&'a str>,
    ) -> BoxStream<'a, FetchResult<Scene>> {
        let bot = match console_bot(bot) {
            Ok(bot) => bot,
            Err(e) => return Box::pin(stream::once(async move { Err(e) })),
        };
        let mut scenes = Vec::new();
        if kind.is_none_or(|k| k == SceneType::Private) {
            for user in bot.roster().users() {
                scenes.push(self.extract_scene(&user_bag(&user)));
            }
        }
        if kind.is_none_or(|k| k == SceneType::Group) {
            for room in bot.roster().rooms() {
                scenes.push(self.extract_scene(&room_scene_bag(&room)));
            }
        }
        Box::pin(stream::iter(scenes))
    }

    fn query_members<'a>(
        &'a self,
        bot: &'a BoxedBot,
        kind: SceneType,
        scene_id: &'a str,
    ) -> BoxStream<'a, FetchResult<Member>> {
        if kind != SceneType::Group {
            return Box::pin(stream::empty());
        }
        let bot = match console_bot(bot) {
            Ok(bot) => bot,
            Err(e) => return Box::pin(stream::once(async move { Err(e) })),
        };
        let mut members = Vec::new();
        for record in bot.roster().members(scene_id) {
            let profile = bot.roster().user(&record.user_id);
            match self.extract_member(&member_bag(scene_id, &record, profile.as_ref()), None) {
                Ok(Some(member)) => members.push(Ok(member)),
                Ok(None) => {}
                Err(e) => members.push(Err(e)),
            }
        }
        Box::pin(stream::iter(members))
    }
}

// ============================================================================
// Resolver wiring
// ============================================================================

/// Pulls the shared (user, room, operator) triple out of either room notice.
fn membership_notice(event: &BoxedEvent) -> Option<(ConsoleUser, String, Option<ConsoleUser>)> {
    if let Some(join) = event.view::<RoomJoinEvent>() {
        return Some((
            join.user.clone(),
            join.room_id.clone(),
            join.operator.clone(),
        ));
    }
    event.view::<RoomLeaveEvent>().map(|leave| {
        (
            leave.user.clone(),
            leave.room_id.clone(),
            leave.operator.clone(),
        )
    })
}

/// Builds a resolver wired with the console suppliers.
///
/// Registration covers the hierarchy at three grains: room messages by
/// concrete type, every other message at the [`MessageEvent`] level, the
/// two room notices as a set, and a wildcard that shapes any remaining
/// console event into a private conversation.
pub fn resolver() -> Resolver {
    Resolver::new(ConsolePlatform)
        .supply::<RoomMessageEvent, _, _>(|bot, event| async move {
            Ok(room_bag(&bot, &event.user, &event.room_id))
        })
        .supply::<MessageEvent, _, _>(|_bot, event| async move { Ok(user_bag(&event.user)) })
        .supply_for::<(RoomJoinEvent, RoomLeaveEvent), _, _>(|bot, event| {
            let notice = membership_notice(&event);
            async move {
                let Some((user, room_id, operator)) = notice else {
                    return Err(FetchError::unsupported_event(event.event_name()));
                };
                let mut bag = room_bag(&bot, &user, &room_id);
                if let Some(op) = operator {
                    bag.set("operator", room_bag(&bot, &op, &room_id));
                }
                Ok(bag)
            }
        })
        .supply_wildcard(|_bot, event| {
            let user = event.view::<ConsoleEvent>().map(|base| base.user.clone());
            async move {
                match user {
                    Some(user) => Ok(user_bag(&user)),
                    None => Err(FetchError::unsupported_event(event.event_name())),
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PrivateMessageEvent;
    use crate::roster::Roster;
    use seance_core::Interface;

    fn crab() -> ConsoleUser {
        ConsoleUser::new("u1", "Ferris", "🦀")
    }

    fn lobster() -> ConsoleUser {
        ConsoleUser::new("u2", "Corro", "🦞")
    }

    fn seeded_roster() -> Arc<Roster> {
        Arc::new(
            Roster::new()
                .with_user(crab())
                .with_user(lobster())
                .with_room("lobby", "The Lobby")
                .with_membership("lobby", "u1", "owner")
                .with_membership("lobby", "u2", "member"),
        )
    }

    fn console_setup() -> (Arc<Roster>, Resolver, BoxedBot) {
        let roster = seeded_roster();
        let bot: BoxedBot = Arc::new(ConsoleBot::new("console-bot", Arc::clone(&roster)));
        (roster, resolver(), bot)
    }

    #[tokio::test]
    async fn private_message_resolves_to_a_private_session() {
        let (_roster, resolver, bot) = console_setup();
        // No supplier is registered for the concrete private type; routing
        // finds the MessageEvent registration one chain level up.
        let event = BoxedEvent::new(PrivateMessageEvent::new("console-bot", crab(), "hi"));

        let session = resolver.fetch(&bot, &event).await.unwrap();
        assert_eq!(session.id(), "u1");
        assert_eq!(session.adapter, "console");
        assert_eq!(session.scope, "Console");
        assert!(session.scene.is_private());
        assert_eq!(session.user.name.as_deref(), Some("Ferris"));
        assert_eq!(
            session.user.avatar.as_deref(),
            Some("https://emojicdn.elk.sh/🦀?style=twitter")
        );
        assert!(session.member.is_none());
    }

    #[tokio::test]
    async fn room_message_carries_member_standing() {
        let (roster, resolver, bot) = console_setup();
        roster.set_nick("lobby", "u1", "boss");
        let event = BoxedEvent::new(RoomMessageEvent::new("console-bot", crab(), "lobby", "hey"));

        let session = resolver.fetch(&bot, &event).await.unwrap();
        assert_eq!(session.id(), "lobby_u1");
        assert!(session.scene.is_group());
        assert_eq!(session.scene.name.as_deref(), Some("The Lobby"));

        let member = session.member.unwrap();
        assert_eq!(member.nick.as_deref(), Some("boss"));
        assert!(member.joined_at.is_some());
        let role = member.role.unwrap();
        assert_eq!(role.id, "OWNER");
        assert_eq!(role.level, 100);
    }

    #[tokio::test]
    async fn room_join_extracts_the_operator() {
        let (_roster, resolver, bot) = console_setup();
        let event = BoxedEvent::new(
            RoomJoinEvent::new("console-bot", lobster(), "lobby").with_operator(crab()),
        );

        let session = resolver.fetch(&bot, &event).await.unwrap();
        assert_eq!(session.user.id, "u2");
        assert_eq!(session.member.unwrap().role.unwrap().id, "MEMBER");

        let operator = session.operator.unwrap();
        assert_eq!(operator.user.id, "u1");
        assert_eq!(operator.role.unwrap().id, "OWNER");
    }

    #[tokio::test]
    async fn unknown_room_still_resolves() {
        let (_roster, resolver, bot) = console_setup();
        let event = BoxedEvent::new(RoomMessageEvent::new("console-bot", crab(), "attic", "..?"));

        let session = resolver.fetch(&bot, &event).await.unwrap();
        assert_eq!(session.scene.id, "attic");
        assert!(session.scene.name.is_none());

        // Present in the room, but with no recorded standing.
        let member = session.member.unwrap();
        assert!(member.role.is_none());
        assert!(member.joined_at.is_none());
    }

    #[tokio::test]
    async fn bare_console_events_fall_back_to_the_wildcard() {
        let (_roster, resolver, bot) = console_setup();
        let event = BoxedEvent::new(ConsoleEvent::new("console-bot", lobster()));

        let session = resolver.fetch(&bot, &event).await.unwrap();
        assert!(session.scene.is_private());
        assert_eq!(session.id(), "u2");
    }

    #[tokio::test]
    async fn facade_queries_answer_from_the_roster() {
        let (roster, resolver, bot) = console_setup();
        roster.mute("lobby", "u2", 600);
        let interface = Interface::new(bot, Arc::new(resolver));

        let user = interface.get_user("u2").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Corro"));

        let scene = interface
            .get_scene(SceneType::Group, "lobby", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(scene.name.as_deref(), Some("The Lobby"));

        let member = interface
            .get_member(SceneType::Group, "lobby", "u2")
            .await
            .unwrap()
            .unwrap();
        let mute = member.mute.unwrap();
        assert!(mute.muted);
        assert_eq!(mute.duration, Duration::from_secs(600));

        // Two private conversations plus one room.
        let scenes = interface.scenes(None, None).await;
        assert_eq!(scenes.len(), 3);
        assert_eq!(scenes.iter().filter(|s| s.is_group()).count(), 1);

        let members = interface.members(SceneType::Group, "lobby").await;
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].user.id, "u1");
    }

    #[tokio::test]
    async fn private_scene_queries_delegate_to_the_user_lookup() {
        let (_roster, resolver, bot) = console_setup();
        let interface = Interface::new(bot, Arc::new(resolver));

        let scene = interface
            .get_scene(SceneType::Private, "u1", None)
            .await
            .unwrap()
            .unwrap();
        assert!(scene.is_private());
        assert_eq!(scene.name.as_deref(), Some("Ferris"));
        assert_eq!(
            scene.avatar.as_deref(),
            Some("https://emojicdn.elk.sh/🦀?style=twitter")
        );
    }

    #[tokio::test]
    async fn member_queries_only_serve_rooms() {
        let (_roster, _resolver, bot) = console_setup();
        let platform = ConsolePlatform;

        let none = platform
            .query_member(&bot, SceneType::Private, "u1", "u1")
            .await
            .unwrap();
        assert!(none.is_none());

        let guild = platform
            .query_scene(&bot, SceneType::Guild, "g1", None)
            .await
            .unwrap();
        assert!(guild.is_none());
    }

    #[tokio::test]
    async fn foreign_bots_are_rejected_by_queries() {
        use seance_core::Bot;
        use std::any::Any;

        struct ForeignBot;

        impl Bot for ForeignBot {
            fn self_id(&self) -> &str {
                "other"
            }

            fn adapter_name(&self) -> &str {
                "other"
            }

            fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
                self
            }
        }

        let bot: BoxedBot = Arc::new(ForeignBot);
        let err = ConsolePlatform.query_user(&bot, "u1").await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream(_)));
    }
}
