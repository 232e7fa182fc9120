//! Hardware abstraction: LED pixel strip + button matrix.
//!
//! Two backends implement the [`Hardware`] trait:
//! - [`MockHardware`]: in-memory light state plus synthetic input
//!   injection, used for tests and desktop development.
//! - `RpiHardware` (feature `rpi`): a WS2812 strip over SPI and a
//!   Linux evdev input device opened in non-blocking mode.
//!
//! The factory never fails the process: when the real backend cannot
//! initialize, it logs the degradation and hands back a mock.

mod mock;
#[cfg(feature = "rpi")]
mod rpi;

pub use mock::{MockHandle, MockHardware};
#[cfg(feature = "rpi")]
pub use rpi::RpiHardware;

use crate::config::GameConfig;
use crate::error::GameError;
use tracing::{info, warn};

/// An RGB color for the light strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// All channels off.
    pub const OFF: Self = Self::new(0, 0, 0);
    /// The lit mole.
    pub const MOLE_GREEN: Self = Self::new(0, 255, 0);
    /// Countdown flash.
    pub const COUNTDOWN_BLUE: Self = Self::new(30, 144, 255);
    /// Wrong-press penalty flash.
    pub const PENALTY_RED: Self = Self::new(200, 0, 0);
    /// Game-over wash.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Construct a color.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// True when every channel is zero.
    pub const fn is_off(self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }
}

/// One key transition read from the input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// evdev key code.
    pub code: u16,
    /// True on press, false on release.
    pub pressed: bool,
}

/// Capability interface over the physical light strip and button input.
///
/// All methods are called from the hardware loop thread. `read_input_events`
/// must never block; an empty result is not an error.
pub trait Hardware: Send {
    /// Bring the device up. Called once before the round loop starts.
    fn initialize(&mut self) -> Result<(), GameError>;

    /// Stage a color for one logical light (a contiguous pixel range).
    fn set_light(&mut self, index: usize, color: Rgb, brightness: f32) -> Result<(), GameError>;

    /// Stage a color for every light.
    fn set_all_lights(&mut self, color: Rgb, brightness: f32) -> Result<(), GameError>;

    /// Commit pending pixel writes to the strip.
    fn show(&mut self) -> Result<(), GameError>;

    /// Drain pending key transitions without blocking.
    fn read_input_events(&mut self) -> Result<Vec<KeyEvent>, GameError>;

    /// Whether a real device is attached.
    fn is_available(&self) -> bool;

    /// Extinguish outputs and release the device.
    fn cleanup(&mut self);
}

/// Build the hardware backend for this configuration.
///
/// Returns the backend plus a [`MockHandle`] when the mock was chosen,
/// so tests and dev tools can inject input and inspect light state.
/// Real-hardware initialization failure degrades to the mock rather
/// than crashing startup.
pub fn create_hardware(config: &GameConfig) -> (Box<dyn Hardware>, Option<MockHandle>) {
    if config.mock_hardware {
        info!("mock hardware selected by configuration");
        return boxed_mock(config);
    }

    #[cfg(feature = "rpi")]
    {
        let mut hw = RpiHardware::new(config);
        match hw.initialize() {
            Ok(()) => {
                info!(device = %config.device_path, "hardware initialized");
                return (Box::new(hw), None);
            }
            Err(e) => {
                warn!(error = %e, "hardware unavailable, falling back to mock");
            }
        }
    }
    #[cfg(not(feature = "rpi"))]
    {
        warn!("built without the `rpi` feature, falling back to mock hardware");
    }

    boxed_mock(config)
}

fn boxed_mock(config: &GameConfig) -> (Box<dyn Hardware>, Option<MockHandle>) {
    let (hw, handle) = MockHardware::new(config.num_lights);
    (Box::new(hw), Some(handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_constants() {
        assert!(Rgb::OFF.is_off());
        assert!(!Rgb::MOLE_GREEN.is_off());
        assert_eq!(Rgb::COUNTDOWN_BLUE, Rgb::new(30, 144, 255));
    }

    #[test]
    fn test_factory_honors_mock_flag() {
        let config = GameConfig {
            mock_hardware: true,
            ..GameConfig::default()
        };
        let (hw, handle) = create_hardware(&config);
        assert!(hw.is_available());
        assert!(handle.is_some());
    }

    #[cfg(not(feature = "rpi"))]
    #[test]
    fn test_factory_degrades_without_rpi_feature() {
        let config = GameConfig::default();
        let (_, handle) = create_hardware(&config);
        assert!(handle.is_some(), "expected mock fallback");
    }
}
