//! TIA (Television Interface Adapter) - the video chip of the 2600.
//!
//! The chip has no framebuffer. It draws the picture one color clock at a
//! time while the CPU races the beam, so the emulation has to be exact to the
//! clock: every register write lands at a precise horizontal position, some of
//! them only after a few clocks of latch delay.
//!
//! Emulation is lazy. Nothing runs until the CPU touches a TIA register; then
//! [`Tia::read`] / [`Tia::write`] first catch up to the CPU's cycle count
//! (3 color clocks per CPU cycle) and only then perform the access.
//!
//! # Line structure
//!
//! ```text
//! hctr  0 ............ 68 ........................................ 228
//!       |   HBLANK     |          160 visible clocks                |
//! ```
//!
//! An HMOVE extends HBLANK by 8 clocks and leaves the "comb": the first 8
//! pixels of the line are painted in the blank color.

pub mod ball;
pub mod collision;
pub mod debug;
pub mod delay_queue;
pub mod draw_counter;
pub mod graphics_object;
pub mod missile;
pub mod player;
pub mod playfield;
pub mod registers;

use emu_core::logging::{log, LogCategory, LogLevel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::TiaConfig;
use crate::frame_manager::{FrameEvent, FrameManager, FrameSync};
use crate::host::{AnalogPin, AudioRegister, AudioSink, Controller, NullAudio, TiaHost, Unplugged};
use crate::latched_input::LatchedInput;
use crate::paddle_reader::PaddleReader;
use crate::TiaError;

use ball::Ball;
use debug::{apply_toggle, DebugOverlay, FixedColors, TiaBits, Toggle, HBLANK_DEBUG_COLOR};
use delay_queue::{DelayQueue, DelayedRegister};
use graphics_object::{GraphicsObject, MovableObject};
use missile::Missile;
use player::Player;
use playfield::{Background, Playfield};
use registers::*;

/// Color clocks per scanline
pub const CLOCKS_PER_LINE: u32 = 228;
/// Color clocks of horizontal blank without HMOVE
pub const HBLANK_CLOCKS: u32 = 68;
/// Visible pixels per line
pub const FRAME_WIDTH: usize = 160;
/// Lines the pixel buffers can hold
pub const FRAME_HEIGHT: usize = 320;

const FRAME_BUFFER_SIZE: usize = FRAME_WIDTH * FRAME_HEIGHT;

const STATE_TAG: &str = "TIA";
const STATE_VERSION: u64 = 1;

/// Horizontal beam state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HState {
    Blank,
    Frame,
}

/// Compositing order selected by CTRLPF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    /// Players and missiles in front of playfield and ball
    Normal,
    /// Playfield and ball in front (CTRLPF bit 2)
    Playfield,
    /// Playfield drawn in the player colors (CTRLPF bit 1)
    Score,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChipState {
    hstate: HState,
    hctr: u32,
    /// Negative while an HMOVE stretches the blank
    hblank_ctr: i32,
    fresh_line: bool,
    extended_hblank: bool,
    /// HMOVE applied outside HBLANK; the next line gets the extended blank
    pending_extended_hblank: bool,

    movement_in_progress: bool,
    movement_clock: u32,

    lines_since_change: u32,
    collision_update_required: bool,
    collision_mask: u16,
    priority: Priority,
    color_hblank: u8,

    timestamp: u64,
    last_cycle: u64,
    /// Color clocks owed to the next catch up (WSYNC remainder)
    sub_clock: u64,
    driven_pins_state: u64,
}

impl ChipState {
    fn new(driven_pins_seed: u64) -> Self {
        Self {
            hstate: HState::Blank,
            hctr: 0,
            hblank_ctr: 0,
            fresh_line: true,
            extended_hblank: false,
            pending_extended_hblank: false,
            movement_in_progress: false,
            movement_clock: 0,
            lines_since_change: 0,
            collision_update_required: false,
            collision_mask: 0,
            priority: Priority::Normal,
            color_hblank: 0,
            timestamp: 0,
            last_cycle: 0,
            sub_clock: 0,
            driven_pins_state: driven_pins_seed,
        }
    }
}

/// Indexed pixel output, one byte per color clock of the visible area
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrameBuffers {
    current: Vec<u8>,
    previous: Vec<u8>,
}

impl FrameBuffers {
    fn new() -> Self {
        Self {
            current: vec![0; FRAME_BUFFER_SIZE],
            previous: vec![0; FRAME_BUFFER_SIZE],
        }
    }

    fn clear(&mut self) {
        self.current.fill(0);
        self.previous.fill(0);
    }

    fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }
}

pub struct Tia<F: FrameSync = FrameManager> {
    state: ChipState,
    delay_queue: DelayQueue,

    background: Background,
    playfield: Playfield,
    missile0: Missile,
    missile1: Missile,
    player0: Player,
    player1: Player,
    ball: Ball,

    paddles: [PaddleReader; 4],
    inputs: [LatchedInput; 2],

    frame_sync: F,
    buffers: FrameBuffers,

    left_port: Box<dyn Controller>,
    right_port: Box<dyn Controller>,
    audio: Box<dyn AudioSink>,

    config: TiaConfig,
    debug: DebugOverlay,
}

impl Tia<FrameManager> {
    /// TIA with the built-in frame manager
    pub fn new(config: TiaConfig) -> Self {
        let frame_manager = FrameManager::new(config.video_standard.fixed());
        Self::with_frame_sync(config, frame_manager)
    }
}

impl Default for Tia<FrameManager> {
    fn default() -> Self {
        Self::new(TiaConfig::default())
    }
}

impl<F: FrameSync> Tia<F> {
    pub fn with_frame_sync(config: TiaConfig, frame_sync: F) -> Self {
        let mut tia = Self {
            state: ChipState::new(config.driven_pins_seed),
            delay_queue: DelayQueue::new(),
            background: Background::new(),
            playfield: Playfield::new(collision::inactive(collision::PLAYFIELD)),
            missile0: Missile::new(collision::inactive(collision::MISSILE0)),
            missile1: Missile::new(collision::inactive(collision::MISSILE1)),
            player0: Player::new(collision::inactive(collision::PLAYER0)),
            player1: Player::new(collision::inactive(collision::PLAYER1)),
            ball: Ball::new(collision::inactive(collision::BALL)),
            paddles: Default::default(),
            inputs: Default::default(),
            frame_sync,
            buffers: FrameBuffers::new(),
            left_port: Box::new(Unplugged),
            right_port: Box::new(Unplugged),
            audio: Box::new(NullAudio),
            config,
            debug: DebugOverlay::default(),
        };
        tia.reset();
        tia
    }

    /// Power-on state. Debug visibility and collision overrides survive.
    pub fn reset(&mut self) {
        self.state = ChipState::new(self.config.driven_pins_seed);
        self.delay_queue.reset();

        self.background.reset();
        self.playfield.reset();
        self.missile0.reset();
        self.missile1.reset();
        self.player0.reset();
        self.player1.reset();
        self.ball.reset();

        for input in &mut self.inputs {
            input.reset();
        }
        for paddle in &mut self.paddles {
            paddle.reset(0);
        }

        self.audio.reset();
        self.frame_sync.reset();
        self.toggle_fixed_colors(Toggle::Off);
        self.buffers.clear();

        log(LogCategory::State, LogLevel::Info, || "TIA: reset".to_string());
    }

    pub fn set_left_controller(&mut self, controller: Box<dyn Controller>) {
        self.left_port = controller;
    }

    pub fn set_right_controller(&mut self, controller: Box<dyn Controller>) {
        self.right_port = controller;
    }

    pub fn set_audio_sink(&mut self, audio: Box<dyn AudioSink>) {
        self.audio = audio;
    }

    pub fn config(&self) -> &TiaConfig {
        &self.config
    }

    pub fn frame_sync(&self) -> &F {
        &self.frame_sync
    }

    pub fn frame_sync_mut(&mut self) -> &mut F {
        &mut self.frame_sync
    }

    /// Run the chip up to the host's current cycle
    pub fn catch_up<H: TiaHost + ?Sized>(&mut self, host: &mut H) {
        self.update_emulation(host);
    }

    /// The host subtracted `cycles` from its cycle counter
    pub fn system_cycles_reset(&mut self, cycles: u64) {
        self.state.last_cycle = match self.state.last_cycle.checked_sub(cycles) {
            Some(last_cycle) => last_cycle,
            None => panic!(
                "TIA: cycle counter rebased by {} but only {} cycles elapsed",
                cycles, self.state.last_cycle
            ),
        };
        self.audio.adjust_cycle_counter(-(cycles as i64));
    }

    pub fn read<H: TiaHost + ?Sized>(&mut self, address: u16, host: &mut H) -> u8 {
        self.update_emulation(host);

        let bus = host.data_bus_state();
        let register = (address & 0x0F) as u8;

        let result = match register {
            CXM0P..=CXPPMM => {
                collision::read_register(self.state.collision_mask, usize::from(register))
            }
            INPT0..=INPT3 => {
                let index = usize::from(register - INPT0);
                self.update_paddle(index);
                self.paddles[index].inpt(self.state.timestamp)
            }
            INPT4 => {
                let pressed = !self.left_port.read_digital_pin();
                self.inputs[0].inpt(pressed)
            }
            INPT5 => {
                let pressed = !self.right_port.read_digital_pin();
                self.inputs[1].inpt(pressed)
            }
            _ => {
                log(LogCategory::Bus, LogLevel::Debug, || {
                    format!("TIA: read from unmapped register {:#06x}", address)
                });
                return bus;
            }
        };

        let undriven = if self.config.tia_driven_pins {
            self.next_driven_bits()
        } else {
            bus
        };

        (result & 0xC0) | (undriven & 0x3F)
    }

    /// Register write. Always accepted; unmapped registers are ignored.
    pub fn write<H: TiaHost + ?Sized>(&mut self, address: u16, value: u8, host: &mut H) -> bool {
        self.update_emulation(host);

        let register = (address & 0x3F) as u8;
        match register {
            VSYNC => {
                log(LogCategory::Timing, LogLevel::Trace, || {
                    format!(
                        "TIA: VSYNC {} at hctr={}",
                        if value & 0x02 != 0 { "on" } else { "off" },
                        self.state.hctr
                    )
                });
                let event = self.frame_sync.set_vsync(value & 0x02 != 0);
                self.handle_frame_event(event, host);
            }

            VBLANK => {
                for input in &mut self.inputs {
                    input.vblank(value);
                }
                for paddle in &mut self.paddles {
                    paddle.vblank(value, self.state.timestamp);
                }
                self.delay_queue.push(DelayedRegister::Vblank, value);
            }

            WSYNC => {
                // Stall the CPU until the start of the next line
                self.state.sub_clock += u64::from((CLOCKS_PER_LINE - self.state.hctr) % CLOCKS_PER_LINE);
                host.increment_cycles(self.state.sub_clock / 3);
                self.state.sub_clock %= 3;
            }

            RSYNC => {
                log(LogCategory::Timing, LogLevel::Debug, || {
                    "TIA: RSYNC ignored".to_string()
                });
            }

            NUSIZ0 => {
                self.missile0.nusiz(value);
                self.player0.nusiz(value);
                self.state.lines_since_change = 0;
            }

            NUSIZ1 => {
                self.missile1.nusiz(value);
                self.player1.nusiz(value);
                self.state.lines_since_change = 0;
            }

            COLUP0 => {
                self.player0.set_color(value);
                self.missile0.set_color(value);
                self.playfield.set_color_p0(value);
                self.state.lines_since_change = 0;
            }

            COLUP1 => {
                self.player1.set_color(value);
                self.missile1.set_color(value);
                self.playfield.set_color_p1(value);
                self.state.lines_since_change = 0;
            }

            COLUPF => {
                self.playfield.set_color(value);
                self.ball.set_color(value);
                self.state.lines_since_change = 0;
            }

            COLUBK => {
                self.background.set_color(value);
                self.state.lines_since_change = 0;
            }

            CTRLPF => {
                self.state.priority = if value & 0x04 != 0 {
                    Priority::Playfield
                } else if value & 0x02 != 0 {
                    Priority::Score
                } else {
                    Priority::Normal
                };
                self.playfield.ctrlpf(value);
                self.ball.ctrlpf(value);
                self.state.lines_since_change = 0;
            }

            REFP0 => self.delay_queue.push(DelayedRegister::Refp0, value),
            REFP1 => self.delay_queue.push(DelayedRegister::Refp1, value),

            PF0 => self.delay_queue.push(DelayedRegister::Pf0, value),
            PF1 => self.delay_queue.push(DelayedRegister::Pf1, value),
            PF2 => self.delay_queue.push(DelayedRegister::Pf2, value),

            RESP0 | RESP1 | RESM0 | RESM1 | RESBL => {
                let hblank = self.state.hstate == HState::Blank;
                match register {
                    RESP0 => self.player0.strobe(hblank),
                    RESP1 => self.player1.strobe(hblank),
                    RESM0 => self.missile0.strobe(hblank),
                    RESM1 => self.missile1.strobe(hblank),
                    _ => self.ball.strobe(hblank),
                }
                self.state.lines_since_change = 0;
            }

            AUDC0..=AUDV1 => {
                if let Some(audio_register) = AudioRegister::from_address(register) {
                    self.audio.write(audio_register, value, host.cycles());
                }
            }

            GRP0 => {
                self.delay_queue.push(DelayedRegister::Grp0, value);
                self.delay_queue.push(DelayedRegister::ShuffleP1, 0);
            }

            GRP1 => {
                self.delay_queue.push(DelayedRegister::Grp1, value);
                self.delay_queue.push(DelayedRegister::ShuffleP0, 0);
                self.ball.shuffle_status();
                self.state.lines_since_change = 0;
            }

            ENAM0 => {
                self.missile0.enam(value);
                self.state.lines_since_change = 0;
            }

            ENAM1 => {
                self.missile1.enam(value);
                self.state.lines_since_change = 0;
            }

            ENABL => {
                self.ball.enabl(value);
                self.state.lines_since_change = 0;
            }

            HMP0 => self.delay_queue.push(DelayedRegister::Hmp0, value),
            HMP1 => self.delay_queue.push(DelayedRegister::Hmp1, value),
            HMM0 => self.delay_queue.push(DelayedRegister::Hmm0, value),
            HMM1 => self.delay_queue.push(DelayedRegister::Hmm1, value),
            HMBL => self.delay_queue.push(DelayedRegister::Hmbl, value),

            VDELP0 => {
                self.player0.vdelp(value);
                self.state.lines_since_change = 0;
            }

            VDELP1 => {
                self.player1.vdelp(value);
                self.state.lines_since_change = 0;
            }

            VDELBL => {
                self.ball.vdelbl(value);
                self.state.lines_since_change = 0;
            }

            RESMP0 => {
                self.missile0.resmp(value, &self.player0);
                self.state.lines_since_change = 0;
            }

            RESMP1 => {
                self.missile1.resmp(value, &self.player1);
                self.state.lines_since_change = 0;
            }

            HMOVE => {
                log(LogCategory::Timing, LogLevel::Trace, || {
                    format!("TIA: HMOVE at hctr={}", self.state.hctr)
                });
                self.delay_queue.push(DelayedRegister::Hmove, value);
            }

            HMCLR => self.delay_queue.push(DelayedRegister::Hmclr, value),

            CXCLR => {
                log(LogCategory::Video, LogLevel::Trace, || {
                    format!("TIA: CXCLR, latches were {:#06x}", self.state.collision_mask)
                });
                self.state.collision_mask = 0;
                self.state.lines_since_change = 0;
            }

            _ => {
                log(LogCategory::Bus, LogLevel::Debug, || {
                    format!(
                        "TIA: write {:#04x} to unmapped register {:#06x}",
                        value, address
                    )
                });
            }
        }

        true
    }

    /// Sample the potentiometer behind INPT`index` into its reader
    pub fn update_paddle(&mut self, index: usize) {
        let resistance = match index {
            0 => self.left_port.read_analog_resistance(AnalogPin::Nine),
            1 => self.left_port.read_analog_resistance(AnalogPin::Five),
            2 => self.right_port.read_analog_resistance(AnalogPin::Nine),
            3 => self.right_port.read_analog_resistance(AnalogPin::Five),
            _ => panic!("TIA: invalid paddle index {}", index),
        };

        log(LogCategory::Input, LogLevel::Trace, || {
            format!("TIA: paddle {} resistance {:.3}", index, resistance)
        });

        self.paddles[index].update(
            resistance,
            self.state.timestamp,
            self.frame_sync.video_standard(),
        );
    }

    fn update_emulation<H: TiaHost + ?Sized>(&mut self, host: &mut H) {
        let system_cycles = host.cycles();

        assert!(
            self.state.sub_clock <= 2,
            "TIA: sub clock {} out of range",
            self.state.sub_clock
        );
        assert!(
            system_cycles >= self.state.last_cycle,
            "TIA: host cycle counter went backwards ({} < {})",
            system_cycles,
            self.state.last_cycle
        );

        let clocks = 3 * (system_cycles - self.state.last_cycle) + self.state.sub_clock;
        self.state.sub_clock = 0;
        self.state.last_cycle = system_cycles;

        self.cycle(clocks, host);
    }

    fn cycle<H: TiaHost + ?Sized>(&mut self, clocks: u64, host: &mut H) {
        for _ in 0..clocks {
            for (register, value) in self.delay_queue.execute() {
                self.apply_delayed_write(register, value);
            }

            self.state.collision_update_required = false;

            self.tick_movement();

            if self.state.hstate == HState::Blank {
                self.tick_hblank();
            } else {
                self.tick_hframe(host);
            }

            if self.state.collision_update_required {
                self.update_collision();
            }

            self.state.timestamp += 1;
        }
    }

    fn tick_movement(&mut self) {
        if !self.state.movement_in_progress {
            return;
        }

        // The ripple counter steps every fourth clock
        if self.state.hctr & 0x03 == 0 {
            self.state.lines_since_change = 0;

            let apply = self.state.hstate == HState::Blank;
            let clock = self.state.movement_clock;

            // Non-short-circuiting: every object must see the step
            let moving = self.missile0.movement_tick(clock, apply)
                | self.missile1.movement_tick(clock, apply)
                | self.player0.movement_tick(clock, apply)
                | self.player1.movement_tick(clock, apply)
                | self.ball.movement_tick(clock, apply);

            self.state.movement_in_progress = moving;
            self.state.collision_update_required = moving;
            self.state.movement_clock += 1;
        }
    }

    fn tick_hblank(&mut self) {
        if self.state.fresh_line {
            if self.state.pending_extended_hblank {
                self.state.pending_extended_hblank = false;
                self.state.hblank_ctr = -8;
                self.state.extended_hblank = true;
                self.clear_hmove_comb();
                self.start_movement();
            } else {
                self.state.hblank_ctr = 0;
            }
            self.state.fresh_line = false;
        }

        self.state.hblank_ctr += 1;
        if self.state.hblank_ctr >= HBLANK_CLOCKS as i32 {
            self.state.hstate = HState::Frame;
        }

        self.state.hctr += 1;
    }

    fn tick_hframe<H: TiaHost + ?Sized>(&mut self, host: &mut H) {
        let y = self.frame_sync.current_line();
        let line_not_cached =
            !self.config.line_caching || self.state.lines_since_change < 2 || y == 0;
        let x = self.state.hctr - HBLANK_CLOCKS;

        self.state.collision_update_required = line_not_cached;

        self.playfield.tick(x);

        if line_not_cached {
            self.render_sprites();
        }
        self.tick_sprites();

        if self.frame_sync.is_visible_line() {
            self.render_pixel(x as usize, y as usize, line_not_cached);
        }

        self.state.hctr += 1;
        if self.state.hctr >= CLOCKS_PER_LINE {
            self.next_line(host);
        }
    }

    fn render_sprites(&mut self) {
        self.player0.render();
        self.player1.render();
        self.missile0.render();
        self.missile1.render();
        self.ball.render();
    }

    fn tick_sprites(&mut self) {
        self.missile0.tick();
        self.missile1.tick();
        self.player0.tick();
        self.player1.tick();
        self.ball.tick();
    }

    fn next_line<H: TiaHost + ?Sized>(&mut self, host: &mut H) {
        self.state.hctr = 0;
        self.state.lines_since_change = self.state.lines_since_change.saturating_add(1);
        self.state.hstate = HState::Blank;
        self.state.fresh_line = true;
        self.state.extended_hblank = false;

        let event = self.frame_sync.advance_line();
        self.handle_frame_event(event, host);
    }

    fn handle_frame_event<H: TiaHost + ?Sized>(&mut self, event: FrameEvent, host: &mut H) {
        match event {
            FrameEvent::None => {}
            FrameEvent::NewFrame => {
                self.buffers.swap();
                for index in 0..self.paddles.len() {
                    self.update_paddle(index);
                }
            }
            FrameEvent::FrameComplete => {
                log(LogCategory::Video, LogLevel::Debug, || {
                    format!(
                        "TIA: frame complete at timestamp {}",
                        self.state.timestamp
                    )
                });
                host.on_frame_complete();
            }
        }
    }

    fn update_collision(&mut self) {
        self.state.collision_mask |= self.player0.collision()
            & self.player1.collision()
            & self.missile0.collision()
            & self.missile1.collision()
            & self.ball.collision()
            & self.playfield.collision()
            & 0x7FFF;
    }

    fn render_pixel(&mut self, x: usize, y: usize, line_not_cached: bool) {
        if y >= FRAME_HEIGHT {
            return;
        }
        let index = y * FRAME_WIDTH + x;

        if line_not_cached {
            let color = if self.frame_sync.is_vblank() {
                0
            } else {
                self.composite_pixel()
            };
            self.buffers.current[index] = color;
        } else {
            // y > 0 here, line 0 is never cached
            self.buffers.current[index] = self.buffers.current[index - FRAME_WIDTH];
        }
    }

    /// Objects applied from lowest to highest priority
    fn composite_pixel(&self) -> u8 {
        let color = self.background.color();

        match self.state.priority {
            Priority::Playfield => {
                let color = self.missile1.get_pixel(color);
                let color = self.player1.get_pixel(color);
                let color = self.missile0.get_pixel(color);
                let color = self.player0.get_pixel(color);
                let color = self.playfield.get_pixel(color);
                self.ball.get_pixel(color)
            }
            Priority::Score => {
                let color = self.ball.get_pixel(color);
                let color = self.missile1.get_pixel(color);
                let color = self.player1.get_pixel(color);
                let color = self.playfield.get_pixel(color);
                let color = self.missile0.get_pixel(color);
                self.player0.get_pixel(color)
            }
            Priority::Normal => {
                let color = self.playfield.get_pixel(color);
                let color = self.ball.get_pixel(color);
                let color = self.missile1.get_pixel(color);
                let color = self.player1.get_pixel(color);
                let color = self.missile0.get_pixel(color);
                self.player0.get_pixel(color)
            }
        }
    }

    fn clear_hmove_comb(&mut self) {
        if !self.frame_sync.is_visible_line() || self.state.hstate != HState::Blank {
            return;
        }

        let y = self.frame_sync.current_line() as usize;
        if y < FRAME_HEIGHT {
            let start = y * FRAME_WIDTH;
            self.buffers.current[start..start + 8].fill(self.state.color_hblank);
        }
    }

    fn apply_delayed_write(&mut self, register: DelayedRegister, value: u8) {
        match register {
            DelayedRegister::Vblank => {
                self.frame_sync.set_vblank(value & 0x02 != 0);
                self.state.lines_since_change = 0;
            }

            DelayedRegister::Hmove => {
                if self.state.extended_hblank {
                    self.start_movement();
                } else if self.state.hstate == HState::Blank && !self.state.fresh_line {
                    self.state.hblank_ctr -= 8;
                    self.clear_hmove_comb();
                    self.state.extended_hblank = true;
                    self.start_movement();
                } else {
                    // The blank counter restarts on a fresh line. The extension
                    // and the ripple both move to the next line's blank, where
                    // the extra clocks make up for the 8 lost ones.
                    self.state.pending_extended_hblank = true;
                }
            }

            DelayedRegister::Pf0 => {
                self.playfield.pf0(value);
                self.state.lines_since_change = 0;
            }
            DelayedRegister::Pf1 => {
                self.playfield.pf1(value);
                self.state.lines_since_change = 0;
            }
            DelayedRegister::Pf2 => {
                self.playfield.pf2(value);
                self.state.lines_since_change = 0;
            }

            DelayedRegister::Grp0 => {
                self.player0.grp(value);
                self.state.lines_since_change = 0;
            }
            DelayedRegister::Grp1 => {
                self.player1.grp(value);
                self.state.lines_since_change = 0;
            }
            DelayedRegister::ShuffleP0 => {
                self.player0.shuffle_patterns();
                self.state.lines_since_change = 0;
            }
            DelayedRegister::ShuffleP1 => {
                self.player1.shuffle_patterns();
                self.state.lines_since_change = 0;
            }

            DelayedRegister::Hmp0 => {
                self.player0.hm(value);
                self.state.lines_since_change = 0;
            }
            DelayedRegister::Hmp1 => {
                self.player1.hm(value);
                self.state.lines_since_change = 0;
            }
            DelayedRegister::Hmm0 => {
                self.missile0.hm(value);
                self.state.lines_since_change = 0;
            }
            DelayedRegister::Hmm1 => {
                self.missile1.hm(value);
                self.state.lines_since_change = 0;
            }
            DelayedRegister::Hmbl => {
                self.ball.hm(value);
                self.state.lines_since_change = 0;
            }

            DelayedRegister::Hmclr => {
                self.player0.hm(0);
                self.player1.hm(0);
                self.missile0.hm(0);
                self.missile1.hm(0);
                self.ball.hm(0);
                self.state.lines_since_change = 0;
            }

            DelayedRegister::Refp0 => {
                self.player0.refp(value);
                self.state.lines_since_change = 0;
            }
            DelayedRegister::Refp1 => {
                self.player1.refp(value);
                self.state.lines_since_change = 0;
            }
        }
    }

    fn start_movement(&mut self) {
        self.state.movement_clock = 0;
        self.state.movement_in_progress = true;

        self.missile0.start_movement();
        self.missile1.start_movement();
        self.player0.start_movement();
        self.player1.start_movement();
        self.ball.start_movement();
    }

    fn next_driven_bits(&mut self) -> u8 {
        let mut rng = StdRng::seed_from_u64(self.state.driven_pins_state);
        let next: u64 = rng.gen();
        self.state.driven_pins_state = next;
        (next & 0x3F) as u8
    }

    // Debugging

    fn graphics_objects_mut(&mut self) -> [(TiaBits, &mut dyn GraphicsObject); 6] {
        [
            (TiaBits::P0, &mut self.player0),
            (TiaBits::M0, &mut self.missile0),
            (TiaBits::P1, &mut self.player1),
            (TiaBits::M1, &mut self.missile1),
            (TiaBits::BL, &mut self.ball),
            (TiaBits::PF, &mut self.playfield),
        ]
    }

    /// Show or hide objects. Returns whether the selected objects are now
    /// visible.
    pub fn toggle_bit(&mut self, bits: TiaBits, toggle: Toggle) -> bool {
        let on = apply_toggle(&mut self.debug.sprite_bits, bits, toggle);
        let enabled = self.debug.sprite_bits;
        for (bit, object) in self.graphics_objects_mut() {
            object.toggle_enabled(enabled.contains(bit));
        }
        self.state.lines_since_change = 0;
        on
    }

    /// Hide all objects if any is visible, otherwise show all
    pub fn toggle_bits(&mut self) -> bool {
        let toggle = if self.debug.sprite_bits.0 != 0 {
            Toggle::Off
        } else {
            Toggle::On
        };
        self.toggle_bit(TiaBits::ALL, toggle);
        self.debug.sprite_bits.0 != 0
    }

    /// Include or exclude objects from collision detection
    pub fn toggle_collision(&mut self, bits: TiaBits, toggle: Toggle) -> bool {
        let on = apply_toggle(&mut self.debug.collision_bits, bits, toggle);
        let enabled = self.debug.collision_bits;
        for (bit, object) in self.graphics_objects_mut() {
            object.toggle_collisions(enabled.contains(bit));
        }
        on
    }

    pub fn toggle_collisions(&mut self) -> bool {
        let toggle = if self.debug.collision_bits.0 != 0 {
            Toggle::Off
        } else {
            Toggle::On
        };
        self.toggle_collision(TiaBits::ALL, toggle);
        self.debug.collision_bits.0 != 0
    }

    /// Paint every object in a fixed color. Returns the new state.
    pub fn toggle_fixed_colors(&mut self, toggle: Toggle) -> bool {
        let on = match toggle {
            Toggle::Off => false,
            Toggle::On => true,
            Toggle::Flip => !self.debug.fixed_colors,
        };

        let colors = FixedColors::for_standard(self.frame_sync.video_standard());
        for (bit, object) in self.graphics_objects_mut() {
            let color = match bit {
                TiaBits::P0 => colors.p0,
                TiaBits::M0 => colors.m0,
                TiaBits::P1 => colors.p1,
                TiaBits::M1 => colors.m1,
                TiaBits::BL => colors.bl,
                _ => colors.pf,
            };
            object.set_debug_color(color);
            object.enable_debug_colors(on);
        }
        self.background.set_debug_color(colors.bk);
        self.background.enable_debug_colors(on);

        self.debug.fixed_colors = on;
        self.state.color_hblank = if on { HBLANK_DEBUG_COLOR } else { 0x00 };
        self.state.lines_since_change = 0;
        on
    }

    /// Set (`Some`) or query (`None`) random driving of the undriven read bits
    pub fn drive_unused_pins_random(&mut self, enabled: Option<bool>) -> bool {
        if let Some(enabled) = enabled {
            self.config.tia_driven_pins = enabled;
        }
        self.config.tia_driven_pins
    }

    pub fn debug_overlay(&self) -> &DebugOverlay {
        &self.debug
    }

    fn apply_debug_overlay(&mut self) {
        let sprites = self.debug.sprite_bits;
        let collisions = self.debug.collision_bits;
        for (bit, object) in self.graphics_objects_mut() {
            object.toggle_enabled(sprites.contains(bit));
            object.toggle_collisions(collisions.contains(bit));
        }
        let fixed = if self.debug.fixed_colors {
            Toggle::On
        } else {
            Toggle::Off
        };
        self.toggle_fixed_colors(fixed);
    }

    // Accessors

    /// Height of the displayed picture
    pub fn height(&self) -> u32 {
        self.frame_sync.visible_height()
    }

    /// Scanlines of the frame in progress
    pub fn scanlines(&self) -> u32 {
        self.frame_sync.scanline_count()
    }

    /// A frame is being drawn right now
    pub fn partial_frame(&self) -> bool {
        self.frame_sync.is_visible_line()
    }

    pub fn clocks_this_line(&self) -> u32 {
        self.state.hctr
    }

    /// Beam position inside the picture, if the beam is on a visible line
    pub fn scanline_pos(&self) -> Option<(u32, u32)> {
        if !self.frame_sync.is_visible_line() {
            return None;
        }
        let x = self.state.hctr.saturating_sub(HBLANK_CLOCKS);
        Some((x, self.frame_sync.current_line()))
    }

    pub fn is_pal(&self) -> bool {
        self.frame_sync.video_standard() == emu_core::types::VideoStandard::Pal
    }

    /// Frame being drawn, 160 palette indices per line
    pub fn current_frame_buffer(&self) -> &[u8] {
        &self.buffers.current
    }

    /// Last completed frame
    pub fn previous_frame_buffer(&self) -> &[u8] {
        &self.buffers.previous
    }

    pub fn collision_mask(&self) -> u16 {
        self.state.collision_mask
    }

    pub fn hstate(&self) -> HState {
        self.state.hstate
    }

    pub fn hctr(&self) -> u32 {
        self.state.hctr
    }

    pub fn timestamp(&self) -> u64 {
        self.state.timestamp
    }

    // Save states

    pub fn save_state(&self) -> Value {
        serde_json::json!({
            "tag": STATE_TAG,
            "version": STATE_VERSION,
            "chip": self.state,
            "delay_queue": self.delay_queue,
            "background": self.background,
            "playfield": self.playfield,
            "missile0": self.missile0,
            "missile1": self.missile1,
            "player0": self.player0,
            "player1": self.player1,
            "ball": self.ball,
            "paddles": self.paddles,
            "inputs": self.inputs,
            "frame_sync": self.frame_sync.save_state(),
            "buffers": self.buffers,
        })
    }

    /// Restore a state from [`Tia::save_state`]. Nothing changes on error.
    pub fn load_state(&mut self, state: &Value) -> Result<(), TiaError> {
        let result = self.try_load_state(state);
        if let Err(e) = &result {
            log(LogCategory::State, LogLevel::Error, || {
                format!("TIA: failed to load state: {}", e)
            });
        }
        result
    }

    fn try_load_state(&mut self, state: &Value) -> Result<(), TiaError> {
        let tag = state["tag"].as_str().unwrap_or("");
        if tag != STATE_TAG {
            return Err(TiaError::WrongStateTag(tag.to_string()));
        }

        let version = state["version"].as_u64().unwrap_or(0);
        if version != STATE_VERSION {
            return Err(TiaError::UnsupportedVersion(version));
        }

        let chip: ChipState = section(state, "chip")?;
        let delay_queue: DelayQueue = section(state, "delay_queue")?;
        let background: Background = section(state, "background")?;
        let playfield: Playfield = section(state, "playfield")?;
        let missile0: Missile = section(state, "missile0")?;
        let missile1: Missile = section(state, "missile1")?;
        let player0: Player = section(state, "player0")?;
        let player1: Player = section(state, "player1")?;
        let ball: Ball = section(state, "ball")?;
        let paddles: [PaddleReader; 4] = section(state, "paddles")?;
        let inputs: [LatchedInput; 2] = section(state, "inputs")?;
        let buffers: FrameBuffers = section(state, "buffers")?;

        for buffer in [&buffers.current, &buffers.previous] {
            if buffer.len() != FRAME_BUFFER_SIZE {
                return Err(TiaError::InvalidBufferSize(buffer.len()));
            }
        }

        let frame_sync = state
            .get("frame_sync")
            .ok_or(TiaError::MissingSection("frame_sync"))?;
        self.frame_sync.load_state(frame_sync)?;

        self.state = chip;
        self.delay_queue = delay_queue;
        self.background = background;
        self.playfield = playfield;
        self.missile0 = missile0;
        self.missile1 = missile1;
        self.player0 = player0;
        self.player1 = player1;
        self.ball = ball;
        self.paddles = paddles;
        self.inputs = inputs;
        self.buffers = buffers;

        // Debug overrides belong to the session, not to the state
        self.apply_debug_overlay();

        log(LogCategory::State, LogLevel::Info, || {
            format!("TIA: state loaded at timestamp {}", self.state.timestamp)
        });
        Ok(())
    }
}

fn section<T: DeserializeOwned>(state: &Value, name: &'static str) -> Result<T, TiaError> {
    let value = state.get(name).ok_or(TiaError::MissingSection(name))?;
    Ok(serde_json::from_value(value.clone())?)
}
