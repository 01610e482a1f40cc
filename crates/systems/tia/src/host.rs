//! Collaborators the TIA talks to: the CPU side of the bus, the controllers
//! plugged into the ports and the audio backend.

use serde::{Deserialize, Serialize};

/// CPU / system bus as seen by the TIA.
///
/// The TIA is lazy: it only runs when the bus accesses one of its registers,
/// and then catches up to `cycles()`. One CPU cycle is three color clocks.
pub trait TiaHost {
    /// CPU cycles elapsed; must never run backwards
    fn cycles(&self) -> u64;

    /// Last value seen on the data bus, used for undriven read bits
    fn data_bus_state(&self) -> u8;

    /// Stall the CPU (WSYNC)
    fn increment_cycles(&mut self, cycles: u64);

    /// A complete frame has been emitted; the host should stop its CPU loop
    fn on_frame_complete(&mut self);
}

/// Minimal host: a free-running cycle counter and a fixed bus value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandaloneHost {
    cycles: u64,
    data_bus: u8,
    frames_completed: u64,
    stalled_cycles: u64,
}

impl StandaloneHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the CPU run for `cycles` more cycles
    pub fn advance(&mut self, cycles: u64) {
        self.cycles += cycles;
    }

    pub fn set_cycles(&mut self, cycles: u64) {
        self.cycles = cycles;
    }

    pub fn set_data_bus(&mut self, value: u8) {
        self.data_bus = value;
    }

    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Total cycles spent stalled on WSYNC
    pub fn stalled_cycles(&self) -> u64 {
        self.stalled_cycles
    }
}

impl TiaHost for StandaloneHost {
    fn cycles(&self) -> u64 {
        self.cycles
    }

    fn data_bus_state(&self) -> u8 {
        self.data_bus
    }

    fn increment_cycles(&mut self, cycles: u64) {
        self.cycles += cycles;
        self.stalled_cycles += cycles;
    }

    fn on_frame_complete(&mut self) {
        self.frames_completed += 1;
    }
}

/// Analog pins of a controller port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogPin {
    /// INPT0 on the left port, INPT2 on the right
    Nine,
    /// INPT1 on the left port, INPT3 on the right
    Five,
}

/// Something plugged into a controller port
pub trait Controller: Send {
    /// Level of the fire button pin; low (`false`) while pressed
    fn read_digital_pin(&self) -> bool;

    /// Normalized potentiometer resistance on `pin`: 0.0..=1.0, negative when
    /// the pin is grounded, above 1.0 for an open circuit
    fn read_analog_resistance(&self, pin: AnalogPin) -> f64;
}

/// Empty port: button released, analog pins open
#[derive(Debug, Clone, Copy, Default)]
pub struct Unplugged;

impl Controller for Unplugged {
    fn read_digital_pin(&self) -> bool {
        true
    }

    fn read_analog_resistance(&self, _pin: AnalogPin) -> f64 {
        f64::MAX
    }
}

/// The six audio registers, forwarded untouched to the sound backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioRegister {
    Audc0,
    Audc1,
    Audf0,
    Audf1,
    Audv0,
    Audv1,
}

impl AudioRegister {
    /// Map a write address (`address & 0x3F`) to its audio register
    pub fn from_address(address: u8) -> Option<Self> {
        match address {
            0x15 => Some(AudioRegister::Audc0),
            0x16 => Some(AudioRegister::Audc1),
            0x17 => Some(AudioRegister::Audf0),
            0x18 => Some(AudioRegister::Audf1),
            0x19 => Some(AudioRegister::Audv0),
            0x1A => Some(AudioRegister::Audv1),
            _ => None,
        }
    }
}

/// Sound generation backend
pub trait AudioSink: Send {
    /// Register write at CPU cycle `cpu_cycles`
    fn write(&mut self, register: AudioRegister, value: u8, cpu_cycles: u64);

    fn reset(&mut self);

    /// The host rebased its cycle counter by `delta` cycles
    fn adjust_cycle_counter(&mut self, delta: i64);
}

/// Discards all audio
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn write(&mut self, _register: AudioRegister, _value: u8, _cpu_cycles: u64) {}

    fn reset(&mut self) {}

    fn adjust_cycle_counter(&mut self, _delta: i64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_host_tracks_stalls() {
        let mut host = StandaloneHost::new();
        host.advance(10);
        host.increment_cycles(5);
        assert_eq!(host.cycles(), 15);
        assert_eq!(host.stalled_cycles(), 5);

        host.on_frame_complete();
        assert_eq!(host.frames_completed(), 1);
    }

    #[test]
    fn test_unplugged_port() {
        let port = Unplugged;
        assert!(port.read_digital_pin());
        assert!(port.read_analog_resistance(AnalogPin::Nine) > 1.0);
    }

    #[test]
    fn test_audio_register_addresses() {
        assert_eq!(AudioRegister::from_address(0x15), Some(AudioRegister::Audc0));
        assert_eq!(AudioRegister::from_address(0x1A), Some(AudioRegister::Audv1));
        assert_eq!(AudioRegister::from_address(0x1B), None);
    }
}
