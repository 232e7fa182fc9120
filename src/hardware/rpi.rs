//! Raspberry Pi backend: WS2812 pixel strip over SPI + evdev buttons.
//!
//! Each logical light owns a contiguous run of `pixels_per_light`
//! pixels. Pixel writes are staged in memory and committed by `show()`,
//! which encodes the strip into the SPI bitstream (3 SPI bits per data
//! bit at 2.4 MHz, GRB byte order). The input device is opened in
//! non-blocking mode; `WouldBlock` means "no events this tick".

use super::{Hardware, KeyEvent, Rgb};
use crate::config::GameConfig;
use crate::error::GameError;
use evdev::{Device, EventType};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::io::ErrorKind;
use tracing::{debug, info};

const SPI_CLOCK_HZ: u32 = 2_400_000;
// Zero bytes appended after the frame so the strip latches.
const LATCH_BYTES: usize = 15;

/// Real hardware: SPI-driven light strip plus an evdev button matrix.
pub struct RpiHardware {
    device_path: String,
    num_lights: usize,
    pixels_per_light: usize,
    pixels: Vec<Rgb>,
    spi: Option<Spi>,
    input: Option<Device>,
    available: bool,
}

impl RpiHardware {
    /// Prepare an uninitialized backend for this configuration.
    pub fn new(config: &GameConfig) -> Self {
        Self {
            device_path: config.device_path.clone(),
            num_lights: config.num_lights,
            pixels_per_light: config.pixels_per_light,
            pixels: vec![Rgb::OFF; config.num_pixels()],
            spi: None,
            input: None,
            available: false,
        }
    }

    fn pixel_range(&self, light: usize) -> std::ops::Range<usize> {
        let start = light * self.pixels_per_light;
        start..start + self.pixels_per_light
    }

    fn stage(&mut self, light: usize, color: Rgb, brightness: f32) {
        let scaled = scale(color, brightness);
        let range = self.pixel_range(light);
        for pixel in &mut self.pixels[range] {
            *pixel = scaled;
        }
    }

    /// Expand one color byte into the SPI bitstream: bit 1 -> 110,
    /// bit 0 -> 100.
    fn encode_byte(byte: u8, out: &mut Vec<u8>) {
        let mut bits = 0u32;
        for i in (0..8).rev() {
            let pattern = if byte >> i & 1 == 1 { 0b110 } else { 0b100 };
            bits = bits << 3 | pattern;
        }
        // 24 SPI bits per color byte.
        out.push((bits >> 16) as u8);
        out.push((bits >> 8) as u8);
        out.push(bits as u8);
    }
}

fn scale(color: Rgb, brightness: f32) -> Rgb {
    let factor = brightness.clamp(0.0, 1.0);
    let apply = |channel: u8| -> u8 {
        let value = f32::from(channel) * factor;
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgb::new(apply(color.r), apply(color.g), apply(color.b))
}

impl Hardware for RpiHardware {
    fn initialize(&mut self) -> Result<(), GameError> {
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| GameError::hardware(format!("SPI open failed: {e}")))?;

        let mut input = Device::open(&self.device_path).map_err(|e| {
            GameError::hardware(format!("input device {} open failed: {e}", self.device_path))
        })?;
        input
            .set_nonblocking(true)
            .map_err(|e| GameError::hardware(format!("non-blocking mode failed: {e}")))?;

        self.spi = Some(spi);
        self.input = Some(input);
        self.available = true;

        // Start dark.
        self.set_all_lights(Rgb::OFF, 0.0)?;
        self.show()?;
        info!(device = %self.device_path, lights = self.num_lights, "rpi hardware up");
        Ok(())
    }

    fn set_light(&mut self, index: usize, color: Rgb, brightness: f32) -> Result<(), GameError> {
        if index >= self.num_lights {
            return Err(GameError::hardware(format!(
                "light index {index} out of range"
            )));
        }
        self.stage(index, color, brightness);
        Ok(())
    }

    fn set_all_lights(&mut self, color: Rgb, brightness: f32) -> Result<(), GameError> {
        let scaled = scale(color, brightness);
        self.pixels.fill(scaled);
        Ok(())
    }

    fn show(&mut self) -> Result<(), GameError> {
        let Some(spi) = self.spi.as_mut() else {
            return Err(GameError::hardware("strip not initialized"));
        };
        let mut frame = Vec::with_capacity(self.pixels.len() * 9 + LATCH_BYTES);
        for pixel in &self.pixels {
            // WS2812 expects GRB.
            Self::encode_byte(pixel.g, &mut frame);
            Self::encode_byte(pixel.r, &mut frame);
            Self::encode_byte(pixel.b, &mut frame);
        }
        frame.extend(std::iter::repeat(0u8).take(LATCH_BYTES));
        spi.write(&frame)
            .map_err(|e| GameError::hardware(format!("SPI write failed: {e}")))?;
        Ok(())
    }

    fn read_input_events(&mut self) -> Result<Vec<KeyEvent>, GameError> {
        let Some(input) = self.input.as_mut() else {
            return Ok(Vec::new());
        };
        match input.fetch_events() {
            Ok(events) => Ok(events
                .filter(|event| event.event_type() == EventType::KEY)
                // value 1 = press, 0 = release; 2 (auto-repeat) is dropped.
                .filter(|event| event.value() == 0 || event.value() == 1)
                .map(|event| KeyEvent {
                    code: event.code(),
                    pressed: event.value() == 1,
                })
                .collect()),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) => Err(GameError::hardware(format!("input read failed: {e}"))),
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn cleanup(&mut self) {
        if self.spi.is_some() {
            let _ = self.set_all_lights(Rgb::OFF, 0.0);
            let _ = self.show();
        }
        self.input = None;
        self.available = false;
        debug!("rpi hardware cleanup complete");
    }
}
