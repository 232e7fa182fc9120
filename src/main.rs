//! Broadside cabinet binary.
//!
//! Wires the config, hardware factory, hardware loop, and consumer
//! frame tick together, with a console surface standing in for the
//! projector UI. Rendering proper lives outside the game core; this
//! frontend only logs phase banners and score changes.

use broadside::{Game, GameConfig, GameOverReason, Surface};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// ~60 Hz frame cadence for the consumer tick.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

const DEFAULT_CONFIG_PATH: &str = "broadside.toml";

/// Console stand-in for the render surface: logs each phase banner
/// once and score changes as they happen.
#[derive(Default)]
struct ConsoleSurface {
    last_banner: Option<String>,
    last_score: f32,
}

impl ConsoleSurface {
    fn banner(&mut self, banner: String) {
        if self.last_banner.as_deref() != Some(banner.as_str()) {
            info!("{banner}");
            self.last_banner = Some(banner);
        }
    }
}

impl Surface for ConsoleSurface {
    fn draw_start_screen(&mut self) {
        self.banner("PRESS 5 TO START BATTLE".to_string());
    }

    fn draw_countdown(&mut self) {
        self.banner("GET READY...".to_string());
    }

    fn draw_playing(&mut self, score: f32) {
        self.banner("BATTLE UNDERWAY".to_string());
        if (score - self.last_score).abs() > f32::EPSILON {
            info!(score, "score");
            self.last_score = score;
        }
    }

    fn draw_game_over(&mut self, score: f32, reason: GameOverReason) {
        self.banner(format!("GAME OVER ({reason}), FINAL SCORE {score}"));
    }
}

fn load_config() -> Result<GameConfig, broadside::GameError> {
    match std::env::args().nth(1) {
        // An explicit path must exist and parse.
        Some(path) => GameConfig::load(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => GameConfig::load(DEFAULT_CONFIG_PATH),
        None => {
            info!("no {DEFAULT_CONFIG_PATH}, using built-in defaults");
            Ok(GameConfig::default())
        }
    }
}

fn run() -> Result<(), broadside::GameError> {
    let config = load_config()?;
    let mut game = Game::new(config)?;
    let mut surface = ConsoleSurface::default();

    info!("broadside up; frame loop running");
    loop {
        game.tick();
        game.draw(&mut surface);
        std::thread::sleep(FRAME_INTERVAL);
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run() {
        // Config failures are the only fatal startup path.
        error!(error = %e, "fatal startup error");
        std::process::exit(1);
    }
}
