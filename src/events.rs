//! Game events and the consumer-side dispatch bus.
//!
//! Events are a closed tagged union, produced by the hardware thread and
//! carried over a crossbeam channel. The [`EventBus`] is the subscribe /
//! dispatch layer on the receiving side: it runs only on the consumer
//! thread, after the channel has been drained, so handlers may freely
//! mutate consumer-owned state.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Why a round ended. Checked in this order at round end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    /// The configured game duration elapsed.
    TimeUp,
    /// The fortress was reduced to zero health.
    Defeat,
    /// Every ship in the roster was destroyed.
    Victory,
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TimeUp => "time_up",
            Self::Defeat => "defeat",
            Self::Victory => "victory",
        };
        f.write_str(s)
    }
}

/// Everything the hardware loop can tell the rest of the game.
///
/// Immutable value objects; each subscriber sees the same event.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Back on the start screen, waiting for the start button.
    StartScreen,
    /// The countdown sequence began.
    CountdownStart,
    /// The countdown finished; play begins now.
    CountdownFinished,
    /// A new mole was lit.
    MoleSpawned {
        /// Light index of the new mole.
        light: usize,
    },
    /// The active mole outlived its window without being pressed.
    MoleEscaped,
    /// The player pressed the lit button.
    PlayerHit {
        /// Score after the hit.
        score: f32,
    },
    /// The player pressed an unlit button.
    PlayerMiss {
        /// Score after the penalty.
        score: f32,
    },
    /// A ship's health reached zero (consumer-side mechanics).
    ShipDestroyed {
        /// Name of the destroyed ship.
        name: String,
    },
    /// The round ended.
    GameOver {
        /// Final score.
        score: f32,
        /// Which stop condition fired.
        reason: GameOverReason,
    },
}

/// Field-less discriminant of [`GameEvent`], used as the dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`GameEvent::StartScreen`].
    StartScreen,
    /// See [`GameEvent::CountdownStart`].
    CountdownStart,
    /// See [`GameEvent::CountdownFinished`].
    CountdownFinished,
    /// See [`GameEvent::MoleSpawned`].
    MoleSpawned,
    /// See [`GameEvent::MoleEscaped`].
    MoleEscaped,
    /// See [`GameEvent::PlayerHit`].
    PlayerHit,
    /// See [`GameEvent::PlayerMiss`].
    PlayerMiss,
    /// See [`GameEvent::ShipDestroyed`].
    ShipDestroyed,
    /// See [`GameEvent::GameOver`].
    GameOver,
}

impl GameEvent {
    /// The discriminant of this event.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::StartScreen => EventKind::StartScreen,
            Self::CountdownStart => EventKind::CountdownStart,
            Self::CountdownFinished => EventKind::CountdownFinished,
            Self::MoleSpawned { .. } => EventKind::MoleSpawned,
            Self::MoleEscaped => EventKind::MoleEscaped,
            Self::PlayerHit { .. } => EventKind::PlayerHit,
            Self::PlayerMiss { .. } => EventKind::PlayerMiss,
            Self::ShipDestroyed { .. } => EventKind::ShipDestroyed,
            Self::GameOver { .. } => EventKind::GameOver,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

type Handler = Box<dyn FnMut(&GameEvent)>;

/// Synchronous subscribe/dispatch bus.
///
/// Not `Send`: the bus lives on the consumer thread and is only fed
/// events that were handed over through the channel. Handlers run in
/// subscription order; a panicking handler is caught and logged without
/// stopping the remaining handlers.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<EventKind, Vec<(SubscriberId, Handler)>>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&GameEvent) + 'static,
    ) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Remove a previously registered handler.
    ///
    /// Unknown ids are ignored.
    pub fn unsubscribe(&mut self, kind: EventKind, id: SubscriberId) {
        if let Some(handlers) = self.listeners.get_mut(&kind) {
            handlers.retain(|(handler_id, _)| *handler_id != id);
        }
    }

    /// Invoke every handler registered for the event's kind.
    pub fn dispatch(&mut self, event: &GameEvent) {
        let Some(handlers) = self.listeners.get_mut(&event.kind()) else {
            return;
        };
        for (id, handler) in handlers.iter_mut() {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!(kind = ?event.kind(), subscriber = id.0, "event handler panicked");
            }
        }
    }

    /// Drop every registered handler.
    pub fn clear_all(&mut self) {
        self.listeners.clear();
    }

    /// Number of handlers registered for a kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }
}
