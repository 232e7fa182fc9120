//! In-memory hardware backend for tests and desktop development.
//!
//! Light writes are recorded per logical light; a [`MockHandle`] shares
//! the same state so a test harness can inject key events while the
//! hardware loop owns the backend.

use super::{Hardware, KeyEvent, Rgb};
use crate::error::GameError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct Shared {
    lights: Vec<Rgb>,
    brightness: f32,
    pending: VecDeque<KeyEvent>,
    shows: u64,
}

/// Test-side handle onto a [`MockHardware`] backend.
#[derive(Debug, Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MockHandle {
    /// Queue a key press (press transition only).
    pub fn press(&self, code: u16) {
        self.inject(code, true);
    }

    /// Queue an arbitrary key transition.
    pub fn inject(&self, code: u16, pressed: bool) {
        self.shared
            .lock()
            .pending
            .push_back(KeyEvent { code, pressed });
    }

    /// Current color of one light, or `None` when out of range.
    pub fn light(&self, index: usize) -> Option<Rgb> {
        self.shared.lock().lights.get(index).copied()
    }

    /// Indices of every light that is currently lit.
    pub fn lit_lights(&self) -> Vec<usize> {
        self.shared
            .lock()
            .lights
            .iter()
            .enumerate()
            .filter(|(_, color)| !color.is_off())
            .map(|(index, _)| index)
            .collect()
    }

    /// How many times `show()` committed pending writes.
    pub fn show_count(&self) -> u64 {
        self.shared.lock().shows
    }
}

/// Mock light strip + button matrix.
#[derive(Debug)]
pub struct MockHardware {
    shared: Arc<Mutex<Shared>>,
}

impl MockHardware {
    /// Create a mock with `num_lights` logical lights, all off, and
    /// the handle a harness uses to drive it.
    pub fn new(num_lights: usize) -> (Self, MockHandle) {
        let shared = Arc::new(Mutex::new(Shared {
            lights: vec![Rgb::OFF; num_lights],
            brightness: 0.0,
            pending: VecDeque::new(),
            shows: 0,
        }));
        let handle = MockHandle {
            shared: Arc::clone(&shared),
        };
        (Self { shared }, handle)
    }
}

impl Hardware for MockHardware {
    fn initialize(&mut self) -> Result<(), GameError> {
        debug!("mock hardware initialized");
        Ok(())
    }

    fn set_light(&mut self, index: usize, color: Rgb, brightness: f32) -> Result<(), GameError> {
        let mut shared = self.shared.lock();
        shared.brightness = brightness;
        if let Some(light) = shared.lights.get_mut(index) {
            *light = color;
            Ok(())
        } else {
            Err(GameError::hardware(format!(
                "light index {index} out of range"
            )))
        }
    }

    fn set_all_lights(&mut self, color: Rgb, brightness: f32) -> Result<(), GameError> {
        let mut shared = self.shared.lock();
        shared.brightness = brightness;
        shared.lights.fill(color);
        Ok(())
    }

    fn show(&mut self) -> Result<(), GameError> {
        self.shared.lock().shows += 1;
        Ok(())
    }

    fn read_input_events(&mut self) -> Result<Vec<KeyEvent>, GameError> {
        let mut shared = self.shared.lock();
        Ok(shared.pending.drain(..).collect())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn cleanup(&mut self) {
        let mut shared = self.shared.lock();
        shared.lights.fill(Rgb::OFF);
        shared.pending.clear();
        debug!("mock hardware cleanup complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_light_state() {
        let (mut hw, handle) = MockHardware::new(9);
        hw.set_light(3, Rgb::MOLE_GREEN, 0.25).expect("in range");
        hw.show().expect("show");

        assert_eq!(handle.light(3), Some(Rgb::MOLE_GREEN));
        assert_eq!(handle.lit_lights(), vec![3]);
        assert_eq!(handle.show_count(), 1);

        hw.set_all_lights(Rgb::OFF, 0.25).expect("set all");
        assert!(handle.lit_lights().is_empty());
    }

    #[test]
    fn test_mock_rejects_out_of_range() {
        let (mut hw, _handle) = MockHardware::new(4);
        assert!(hw.set_light(4, Rgb::WHITE, 0.25).is_err());
    }

    #[test]
    fn test_injected_events_drain_in_order() {
        let (mut hw, handle) = MockHardware::new(9);
        handle.press(2);
        handle.inject(3, false);

        let events = hw.read_input_events().expect("events");
        assert_eq!(
            events,
            vec![
                KeyEvent {
                    code: 2,
                    pressed: true
                },
                KeyEvent {
                    code: 3,
                    pressed: false
                },
            ]
        );

        // Nothing pending is not an error.
        assert!(hw.read_input_events().expect("empty").is_empty());
    }

    #[test]
    fn test_cleanup_extinguishes_lights() {
        let (mut hw, handle) = MockHardware::new(9);
        hw.set_all_lights(Rgb::WHITE, 0.25).expect("set all");
        handle.press(2);
        hw.cleanup();
        assert!(handle.lit_lights().is_empty());
        assert!(hw.read_input_events().expect("empty").is_empty());
    }
}
