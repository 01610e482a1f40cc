//! Paddle inputs INPT0-INPT3.
//!
//! Each paddle is a potentiometer charging a capacitor. The chip reports bit 7
//! once the capacitor voltage crosses a threshold; VBLANK bit 7 dumps all four
//! capacitors to ground. The voltage is modelled analytically and only
//! recomputed when the potentiometer value changes or the port is read.

use emu_core::types::VideoStandard;
use serde::{Deserialize, Serialize};

/// Capacitor, farad
const C: f64 = 68e-9;
/// Full potentiometer resistance, ohm
const RPOT: f64 = 1e6;
/// Series resistor, ohm
const R0: f64 = 1.8e3;
/// Supply voltage
const USUPP: f64 = 5.0;

/// A paddle turned to maximum resistance trips after this many lines
const TRIPPOINT_LINES: f64 = 380.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaddleReader {
    /// Normalized resistance, negative while grounded by the controller
    value: f64,
    /// Capacitor voltage at `timestamp`
    u: f64,
    u_thresh: f64,
    timestamp: u64,
    video_standard: VideoStandard,
    clock_freq: f64,
    is_dumped: bool,
}

impl Default for PaddleReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PaddleReader {
    pub fn new() -> Self {
        let mut reader = Self {
            value: 0.0,
            u: 0.0,
            u_thresh: 0.0,
            timestamp: 0,
            video_standard: VideoStandard::Ntsc,
            clock_freq: 0.0,
            is_dumped: false,
        };
        reader.set_video_standard(VideoStandard::Ntsc);
        reader
    }

    pub fn reset(&mut self, timestamp: u64) {
        self.u = 0.0;
        self.value = 0.0;
        self.timestamp = timestamp;
        self.is_dumped = false;
        self.set_video_standard(VideoStandard::Ntsc);
    }

    /// VBLANK write; bit 7 grounds the capacitor
    pub fn vblank(&mut self, value: u8, timestamp: u64) {
        let old_dumped = self.is_dumped;

        if value & 0x80 != 0 {
            self.is_dumped = true;
            self.u = 0.0;
        } else if old_dumped {
            self.is_dumped = false;
        }

        self.timestamp = timestamp;
    }

    /// Feed the current potentiometer value; returns the INPTx bit
    pub fn inpt(&mut self, timestamp: u64) -> u8 {
        self.update_charge(timestamp);

        if !self.is_dumped && self.u > self.u_thresh {
            0x80
        } else {
            0x00
        }
    }

    pub fn update(&mut self, value: f64, timestamp: u64, video_standard: VideoStandard) {
        if video_standard != self.video_standard {
            self.set_video_standard(video_standard);
        }

        if value != self.value {
            self.update_charge(timestamp);
            self.value = value;
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    fn set_video_standard(&mut self, video_standard: VideoStandard) {
        self.video_standard = video_standard;
        self.clock_freq = video_standard.color_clock_hz();
        self.u_thresh =
            USUPP * (1.0 - (-TRIPPOINT_LINES * 228.0 / self.clock_freq / (RPOT + R0) / C).exp());
    }

    fn update_charge(&mut self, timestamp: u64) {
        if self.is_dumped {
            self.timestamp = timestamp;
            return;
        }

        if self.value < 0.0 {
            // Grounded by the controller
            self.u = 0.0;
        } else if self.value <= 1.0 {
            let dt = timestamp.saturating_sub(self.timestamp) as f64;
            self.u = USUPP
                * (1.0
                    - (1.0 - self.u / USUPP)
                        * (-dt / (self.value * RPOT + R0) / C / self.clock_freq).exp());
        }

        self.timestamp = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: u64 = 228;

    #[test]
    fn test_dumped_paddle_reads_low() {
        let mut paddle = PaddleReader::new();
        paddle.update(0.0, 0, VideoStandard::Ntsc);
        paddle.vblank(0x80, 0);
        assert_eq!(paddle.inpt(100 * LINE), 0x00);
    }

    #[test]
    fn test_zero_resistance_charges_within_a_line() {
        let mut paddle = PaddleReader::new();
        paddle.vblank(0x80, 0);
        paddle.update(0.0, 0, VideoStandard::Ntsc);
        paddle.vblank(0x00, 0);
        assert_eq!(paddle.inpt(LINE), 0x80);
    }

    #[test]
    fn test_full_resistance_trips_near_380_lines() {
        let mut paddle = PaddleReader::new();
        paddle.update(1.0, 0, VideoStandard::Ntsc);
        paddle.vblank(0x80, 0);
        paddle.vblank(0x00, 0);
        assert_eq!(paddle.inpt(370 * LINE), 0x00);
        assert_eq!(paddle.inpt(390 * LINE), 0x80);
    }

    #[test]
    fn test_pal_trips_at_same_line_count() {
        let mut paddle = PaddleReader::new();
        paddle.update(1.0, 0, VideoStandard::Pal);
        paddle.vblank(0x80, 0);
        paddle.vblank(0x00, 0);
        assert_eq!(paddle.inpt(370 * LINE), 0x00);
        assert_eq!(paddle.inpt(390 * LINE), 0x80);
    }

    #[test]
    fn test_grounded_pin_never_charges() {
        let mut paddle = PaddleReader::new();
        paddle.update(-1.0, 0, VideoStandard::Ntsc);
        assert_eq!(paddle.inpt(1000 * LINE), 0x00);
    }

    #[test]
    fn test_open_circuit_stays_low() {
        let mut paddle = PaddleReader::new();
        paddle.update(f64::MAX, 0, VideoStandard::Ntsc);
        assert_eq!(paddle.inpt(10_000 * LINE), 0x00);
    }
}
