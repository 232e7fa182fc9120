//! # Broadside
//!
//! The game core of a hardware whack-a-mole battle cabinet: a 3x3 LED
//! button deck where the lit button is the "mole", and every correct
//! press fires a broadside into a fleet of pirate ships.
//!
//! ## Core Concepts
//!
//! - **Hardware loop**: a producer thread polls the button matrix and
//!   drives the light strip at millisecond granularity, independent of
//!   the frame rate.
//! - **Event channel**: the producer publishes immutable [`GameEvent`]s
//!   over a crossbeam channel; it never blocks on consumption.
//! - **Consumer tick**: the frame loop drains the channel once per
//!   frame, dispatches on the [`EventBus`], and advances the
//!   [`GameStateMachine`], so all in-round battle mutation happens on
//!   one thread.
//! - **Hardware abstraction**: the same loop runs against a Raspberry
//!   Pi LED strip + evdev buttons (feature `rpi`) or a deterministic
//!   in-memory mock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use broadside::{Game, GameConfig};
//!
//! let config = GameConfig { mock_hardware: true, ..GameConfig::default() };
//! let mut game = Game::new(config).expect("valid config");
//!
//! loop {
//!     game.tick();
//!     // ...draw using game.battle(), game.score(), game.phase()...
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod battle;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod hardware;
pub mod producer;
pub mod state;
pub mod webhook;

// Re-exports for convenience
pub use battle::{BattleState, DamageOutcome, Ship, TargetRef};
pub use config::{GameConfig, ShipSpec, WebhookConfig};
pub use error::GameError;
pub use events::{EventBus, EventKind, GameEvent, GameOverReason, SubscriberId};
pub use game::Game;
pub use hardware::{create_hardware, Hardware, KeyEvent, MockHandle, Rgb};
pub use producer::HardwareLoop;
pub use state::{GamePhase, GameStateMachine, Surface};
pub use webhook::AutomationClient;
