//! Game configuration: timing windows, hardware layout, webhook target.
//!
//! All values are fixed inputs loaded once at startup from a TOML file
//! (or defaulted). Nothing here is computed at runtime; validation
//! failures are fatal before the hardware loop starts.

use crate::error::GameError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Linux evdev key code for the `1` key. Buttons `1`..`9` map to
/// light indices `0`..`8`.
pub const KEY_1: u16 = 2;

/// Linux evdev key code for the `9` key.
pub const KEY_9: u16 = 10;

/// The designated start button (`5`, the center of the 3x3 deck).
pub const START_KEY: u16 = 6;

/// One enemy ship in the fixed roster.
#[derive(Debug, Clone, Deserialize)]
pub struct ShipSpec {
    /// Display name.
    pub name: String,
    /// Hit points; one correct press removes one point.
    pub max_health: i32,
}

/// Automation webhook settings (Ansible AWX / Tower job launch).
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Job-template launch URL.
    pub url: String,
    /// Bearer token for the `Authorization` header.
    pub token: String,
    /// Maximum POST attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay; doubles on each subsequent attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_backoff_base_ms() -> u64 {
    500
}

const fn default_webhook_timeout_secs() -> u64 {
    5
}

/// Top-level game configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Force the in-memory mock backend even when real hardware
    /// support is compiled in.
    pub mock_hardware: bool,
    /// Input device path on the Raspberry Pi.
    pub device_path: String,
    /// Number of logical button lights.
    pub num_lights: usize,
    /// Addressable pixels behind each button.
    pub pixels_per_light: usize,
    /// LED brightness, `0.0..=1.0`.
    pub brightness: f32,
    /// Length of one play phase, in seconds.
    pub game_duration_secs: f64,
    /// How long a mole stays lit before it escapes, in seconds.
    pub mole_duration_secs: f64,
    /// All-red flash after a wrong press, in seconds.
    pub penalty_flash_secs: f64,
    /// Per-step flash length of the 3-2-1 countdown, in seconds.
    pub countdown_flash_secs: f64,
    /// Producer polling cadence, in milliseconds.
    pub poll_interval_ms: u64,
    /// Discrete key presses required to leave the game-over screen.
    pub restart_presses: u32,
    /// Fortress hit points.
    pub player_max_health: f32,
    /// Automation webhook; `None` disables the round-end notification.
    pub webhook: Option<WebhookConfig>,
    /// Enemy roster, in targeting order.
    pub ships: Vec<ShipSpec>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mock_hardware: false,
            device_path: "/dev/input/event0".to_string(),
            num_lights: 9,
            pixels_per_light: 4,
            brightness: 0.25,
            game_duration_secs: 30.0,
            mole_duration_secs: 0.75,
            penalty_flash_secs: 0.2,
            countdown_flash_secs: 0.5,
            poll_interval_ms: 1,
            restart_presses: 2,
            player_max_health: 10.0,
            webhook: None,
            ships: default_roster(),
        }
    }
}

/// The classic pirate fleet, weakest first.
fn default_roster() -> Vec<ShipSpec> {
    [
        ("Sloop", 5),
        ("Brigantine", 10),
        ("Frigate", 15),
        ("Man-of-War", 15),
        ("Dreadnought", 5),
    ]
    .into_iter()
    .map(|(name, max_health)| ShipSpec {
        name: name.to_string(),
        max_health,
    })
    .collect()
}

impl GameConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`] when the file cannot be read,
    /// parsed, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GameError::config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| GameError::config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every constant for sanity.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.num_lights == 0 {
            return Err(GameError::config("num_lights must be at least 1"));
        }
        if self.pixels_per_light == 0 {
            return Err(GameError::config("pixels_per_light must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.brightness) {
            return Err(GameError::config("brightness must be within 0.0..=1.0"));
        }
        if self.game_duration_secs <= 0.0 {
            return Err(GameError::config("game_duration_secs must be positive"));
        }
        if self.mole_duration_secs <= 0.0 {
            return Err(GameError::config("mole_duration_secs must be positive"));
        }
        if self.penalty_flash_secs <= 0.0 {
            return Err(GameError::config("penalty_flash_secs must be positive"));
        }
        if self.countdown_flash_secs <= 0.0 {
            return Err(GameError::config("countdown_flash_secs must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(GameError::config("poll_interval_ms must be at least 1"));
        }
        if self.restart_presses == 0 {
            return Err(GameError::config("restart_presses must be at least 1"));
        }
        if self.player_max_health <= 0.0 {
            return Err(GameError::config("player_max_health must be positive"));
        }
        if self.ships.is_empty() {
            return Err(GameError::config("ship roster must not be empty"));
        }
        if let Some(ship) = self.ships.iter().find(|s| s.max_health <= 0) {
            return Err(GameError::config(format!(
                "ship {:?} must have positive max_health",
                ship.name
            )));
        }
        if let Some(webhook) = &self.webhook {
            if webhook.url.is_empty() {
                return Err(GameError::config("webhook.url must not be empty"));
            }
            if webhook.max_attempts == 0 {
                return Err(GameError::config("webhook.max_attempts must be at least 1"));
            }
        }
        Ok(())
    }

    /// Total pixel count of the strip.
    pub const fn num_pixels(&self) -> usize {
        self.num_lights * self.pixels_per_light
    }

    /// Map an evdev key code to a light index, if the key is one of
    /// the mapped buttons.
    pub fn light_for_key(&self, code: u16) -> Option<usize> {
        if (KEY_1..=KEY_9).contains(&code) {
            let index = usize::from(code - KEY_1);
            (index < self.num_lights).then_some(index)
        } else {
            None
        }
    }

    /// Light index behind the start button.
    pub fn start_light(&self) -> usize {
        self.light_for_key(START_KEY).unwrap_or(0)
    }

    /// Length of one play phase.
    pub fn game_duration(&self) -> Duration {
        Duration::from_secs_f64(self.game_duration_secs)
    }

    /// Mole lifetime before it escapes.
    pub fn mole_duration(&self) -> Duration {
        Duration::from_secs_f64(self.mole_duration_secs)
    }

    /// Length of the all-red penalty flash.
    pub fn penalty_flash(&self) -> Duration {
        Duration::from_secs_f64(self.penalty_flash_secs)
    }

    /// Per-step countdown flash length.
    pub fn countdown_flash(&self) -> Duration {
        Duration::from_secs_f64(self.countdown_flash_secs)
    }

    /// Producer polling cadence.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_pixels(), 36);
        assert_eq!(config.ships.len(), 5);
        assert_eq!(config.ships[0].name, "Sloop");
        assert_eq!(config.ships[0].max_health, 5);
    }

    #[test]
    fn test_key_mapping() {
        let config = GameConfig::default();
        assert_eq!(config.light_for_key(KEY_1), Some(0));
        assert_eq!(config.light_for_key(START_KEY), Some(4));
        assert_eq!(config.light_for_key(KEY_9), Some(8));
        // ESC, space, and friends are not mapped
        assert_eq!(config.light_for_key(1), None);
        assert_eq!(config.light_for_key(57), None);
        assert_eq!(config.start_light(), 4);
    }

    #[test]
    fn test_key_mapping_respects_num_lights() {
        let config = GameConfig {
            num_lights: 4,
            ..GameConfig::default()
        };
        assert_eq!(config.light_for_key(KEY_1), Some(0));
        assert_eq!(config.light_for_key(KEY_1 + 3), Some(3));
        assert_eq!(config.light_for_key(KEY_9), None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad = GameConfig {
            num_lights: 0,
            ..GameConfig::default()
        };
        assert!(bad.validate().is_err());

        let bad = GameConfig {
            game_duration_secs: 0.0,
            ..GameConfig::default()
        };
        assert!(bad.validate().is_err());

        let bad = GameConfig {
            restart_presses: 0,
            ..GameConfig::default()
        };
        assert!(bad.validate().is_err());

        let bad = GameConfig {
            ships: vec![],
            ..GameConfig::default()
        };
        assert!(bad.validate().is_err());

        let bad = GameConfig {
            webhook: Some(WebhookConfig {
                url: String::new(),
                token: "tok".to_string(),
                max_attempts: 3,
                backoff_base_ms: 500,
                timeout_secs: 5,
            }),
            ..GameConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let raw = r#"
            mock_hardware = true
            game_duration_secs = 45.0
            restart_presses = 3

            [[ships]]
            name = "Cutter"
            max_health = 3

            [webhook]
            url = "https://awx.example.com/api/v2/job_templates/7/launch/"
            token = "secret"
        "#;
        let config: GameConfig = toml::from_str(raw).expect("parse");
        assert!(config.mock_hardware);
        assert!((config.game_duration_secs - 45.0).abs() < f64::EPSILON);
        assert_eq!(config.restart_presses, 3);
        assert_eq!(config.ships.len(), 1);
        let webhook = config.webhook.as_ref().expect("webhook");
        assert_eq!(webhook.max_attempts, 3);
        assert_eq!(webhook.backoff_base_ms, 500);
        assert!(config.validate().is_ok());
    }
}
