//! Event abstraction for the resolution engine.
//!
//! The engine never sees platform wire formats; it sees values implementing
//! [`Event`], type-erased into [`BoxedEvent`]. Platform crates model their
//! events as a parent-in-child hierarchy (a derived event embeds its base
//! event as a field) and declare that hierarchy through two methods:
//!
//! - [`Event::type_chain`] - the ancestry, most-derived first
//! - [`Event::as_level`] - projection of the event onto one ancestor level
//!
//! The resolver walks the chain to find the most specific supplier that
//! accepts the event, so registering a supplier for a base event type also
//! covers every derived event that names it as an ancestor.

use std::any::{Any, TypeId};
use std::ops::Deref;
use std::sync::Arc;

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events entering the resolution engine.
///
/// The default method bodies describe a flat event with no ancestors; a
/// derived event overrides [`Event::type_chain`] and [`Event::as_level`] to
/// expose its embedded base:
///
/// ```rust,ignore
/// impl Event for GroupMessageEvent {
///     fn event_name(&self) -> &'static str {
///         "group_message"
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
///
///     fn type_chain(&self) -> Vec<TypeId> {
///         vec![
///             TypeId::of::<GroupMessageEvent>(),
///             TypeId::of::<MessageEvent>(),
///         ]
///     }
///
///     fn as_level(&self, level: TypeId) -> Option<&dyn Any> {
///         if level == TypeId::of::<GroupMessageEvent>() {
///             Some(self)
///         } else if level == TypeId::of::<MessageEvent>() {
///             Some(&self.parent)
///         } else {
///             None
///         }
///     }
/// }
/// ```
pub trait Event: Any + Send + Sync {
    /// Returns the human-readable name of this event type, used in
    /// diagnostics and "unsupported event" errors.
    fn event_name(&self) -> &'static str;

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns this event's ancestry as type ids, most-derived first.
    ///
    /// The chain must start with the concrete type and list every ancestor
    /// [`Event::as_level`] can project to, in order of decreasing
    /// specificity.
    fn type_chain(&self) -> Vec<TypeId> {
        vec![self.as_any().type_id()]
    }

    /// Projects this event onto one of its ancestor levels.
    ///
    /// Returns `None` for a type id outside [`Event::type_chain`].
    fn as_level(&self, level: TypeId) -> Option<&dyn Any> {
        (level == self.as_any().type_id()).then(|| self.as_any())
    }

    /// Returns the platform-native conversation key for this event.
    ///
    /// Used as the session-tier cache key; `None` opts the event out of
    /// session caching entirely.
    fn session_key(&self) -> Option<String> {
        None
    }
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased, cheaply clonable container for events.
#[derive(Clone)]
pub struct BoxedEvent {
    inner: Arc<dyn Event>,
}

impl BoxedEvent {
    /// Creates a new `BoxedEvent` from any type implementing `Event`.
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            inner: Arc::new(event),
        }
    }

    /// Returns the inner `Arc<dyn Event>`.
    pub fn inner(&self) -> &Arc<dyn Event> {
        &self.inner
    }

    /// Attempts to downcast to the concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }

    /// Views the event at ancestor level `E`, if `E` is in its type chain.
    ///
    /// Unlike [`BoxedEvent::downcast_ref`], this succeeds for any level the
    /// event projects to, not just the concrete type.
    pub fn view<E: Event>(&self) -> Option<&E> {
        self.inner
            .as_level(TypeId::of::<E>())
            .and_then(|any| any.downcast_ref())
    }
}

impl Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("event_name", &self.event_name())
            .finish()
    }
}

// ============================================================================
// Event Sets
// ============================================================================

/// A set of event types sharing one supplier registration.
///
/// Implemented for tuples of event types, so a single supplier can be
/// registered under several concrete events at once:
///
/// ```rust,ignore
/// let resolver = resolver.supply_for::<(GroupMessageEvent, GroupBanEvent), _, _>(
///     |bot, event| async move {
///         // ...
///     },
/// );
/// ```
pub trait EventSet {
    /// The type ids this set registers under, in declaration order.
    fn members() -> Vec<TypeId>;
}

/// Macro to generate EventSet implementations for tuples of event types.
macro_rules! impl_event_set {
    (
        $($ty:ident),+
    ) => {
        impl<$($ty: Event,)+> EventSet for ($($ty,)+) {
            fn members() -> Vec<TypeId> {
                vec![$(TypeId::of::<$ty>(),)+]
            }
        }
    };
}

impl_event_set!(T1);
impl_event_set!(T1, T2);
impl_event_set!(T1, T2, T3);
impl_event_set!(T1, T2, T3, T4);
impl_event_set!(T1, T2, T3, T4, T5);
impl_event_set!(T1, T2, T3, T4, T5, T6);
impl_event_set!(T1, T2, T3, T4, T5, T6, T7);
impl_event_set!(T1, T2, T3, T4, T5, T6, T7, T8);
