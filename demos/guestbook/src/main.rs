//! Guestbook Demo
//!
//! A scripted walk through session resolution on the console platform:
//! seed a roster, register a resolver, replay a handful of events and then
//! read the world back through the query facade.
//!
//! Every resolved [`Session`] has the same shape no matter which event
//! produced it. A real deployment would hand these to its plugins instead
//! of logging them.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package guestbook
//! ```
//!
//! Set `RUST_LOG=seance_core=debug` to watch the cache and routing
//! decisions underneath the script.

use std::sync::Arc;

use anyhow::Result;
use seance::prelude::*;
use seance_adapter_console as console;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Logs one resolved session the way a plugin would consume it.
fn greet(session: &Session) {
    let name = session.user.name.as_deref().unwrap_or(&session.user.id);
    let place = if session.scene.is_private() {
        "a private chat"
    } else {
        session.scene.name.as_deref().unwrap_or(&session.scene.id)
    };
    info!(session = %session.id(), "Welcome {}, writing from {}", name, place);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ========================================================================
    // Seed the world
    // ========================================================================

    let ferris = console::ConsoleUser::new("u1", "Ferris", "🦀");
    let corro = console::ConsoleUser::new("u2", "Corro", "🦞");
    let roster = Arc::new(
        console::Roster::new()
            .with_user(ferris.clone())
            .with_user(corro.clone())
            .with_room("lobby", "The Lobby")
            .with_membership("lobby", "u1", "owner"),
    );

    // One resolver per adapter, looked up by adapter name.
    let registry = ResolverRegistry::new();
    registry.register(console::ADAPTER, Arc::new(console::resolver()));

    let bot: BoxedBot = Arc::new(console::ConsoleBot::new("guestbook-bot", Arc::clone(&roster)));

    // ========================================================================
    // Replay events
    // ========================================================================

    // A visitor writes in privately.
    let event = BoxedEvent::new(console::PrivateMessageEvent::new(
        "guestbook-bot",
        ferris.clone(),
        "hello there",
    ));
    if let Some(session) = registry.resolve(&bot, &event).await {
        greet(&session);
    }

    // Corro is let into the lobby by Ferris.
    roster.join("lobby", "u2", "member");
    let event = BoxedEvent::new(
        console::RoomJoinEvent::new("guestbook-bot", corro.clone(), "lobby")
            .with_operator(ferris.clone()),
    );
    if let Some(session) = registry.resolve(&bot, &event).await {
        let operator = session
            .operator
            .as_ref()
            .and_then(|op| op.user.name.as_deref())
            .unwrap_or("someone");
        info!(session = %session.id(), "{} was let in by {}", session.user.id, operator);
    }

    // Corro signs the book; the second resolve is answered from the
    // session cache.
    let event = BoxedEvent::new(console::RoomMessageEvent::new(
        "guestbook-bot",
        corro.clone(),
        "lobby",
        "Corro was here",
    ));
    for _ in 0..2 {
        if let Some(session) = registry.resolve(&bot, &event).await {
            greet(&session);
        }
    }

    // ========================================================================
    // Query the world back
    // ========================================================================

    let interface = registry
        .interface(&bot)
        .ok_or_else(|| anyhow::anyhow!("no resolver registered for {}", bot.adapter_name()))?;

    let guests = interface.users().await;
    info!(count = guests.len(), "Guests known to the roster");

    if let Some(member) = interface.get_member(SceneType::Group, "lobby", "u1").await? {
        let role = member.role.map(|role| role.id).unwrap_or_default();
        info!(user = %member.user.id, role = %role, "Lobby owner standing");
    }

    for scene in interface.scenes(None, None).await {
        info!(scene = %scene.id, kind = ?scene.kind, "Visible scene");
    }

    // The bot signs off; its cached sessions go with it.
    registry.purge_bot(bot.self_id());

    Ok(())
}
