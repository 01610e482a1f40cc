//! Whole-frame scenarios driven the way a 2600 kernel drives the chip:
//! VSYNC, VBLANK and WSYNC writes from a CPU that spends 3 cycles per store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use emu_tia::tia::registers::*;
use emu_tia::{
    AnalogPin, Controller, StandaloneHost, Tia, TiaConfig, TiaHost, VideoStandardSetting,
};

const WIDTH: usize = 160;

struct Timing {
    vsync: u32,
    vblank: u32,
    kernel: u32,
    overscan: u32,
}

const NTSC: Timing = Timing {
    vsync: 3,
    vblank: 37,
    kernel: 192,
    overscan: 30,
};

const PAL: Timing = Timing {
    vsync: 3,
    vblank: 45,
    kernel: 228,
    overscan: 36,
};

fn store(tia: &mut Tia, host: &mut StandaloneHost, register: u8, value: u8) {
    host.advance(3);
    tia.write(u16::from(register), value, host);
}

fn load(tia: &mut Tia, host: &mut StandaloneHost, register: u8) -> u8 {
    host.advance(3);
    tia.read(u16::from(register), host)
}

fn wsync(tia: &mut Tia, host: &mut StandaloneHost, lines: u32) {
    for _ in 0..lines {
        store(tia, host, WSYNC, 0);
    }
}

fn run_frame<L>(tia: &mut Tia, host: &mut StandaloneHost, timing: &Timing, mut line: L)
where
    L: FnMut(&mut Tia, &mut StandaloneHost, u32),
{
    store(tia, host, VSYNC, 0x02);
    wsync(tia, host, timing.vsync);
    store(tia, host, VSYNC, 0x00);

    store(tia, host, VBLANK, 0x02);
    wsync(tia, host, timing.vblank);
    store(tia, host, VBLANK, 0x00);

    for y in 0..timing.kernel {
        line(tia, host, y);
        wsync(tia, host, 1);
    }

    store(tia, host, VBLANK, 0x02);
    wsync(tia, host, timing.overscan);
}

fn row(buffer: &[u8], y: usize) -> &[u8] {
    &buffer[y * WIDTH..(y + 1) * WIDTH]
}

#[test]
fn test_frame_completes_and_buffers_swap() {
    let mut tia: Tia = Tia::default();
    let mut host = StandaloneHost::new();

    for _ in 0..2 {
        run_frame(&mut tia, &mut host, &NTSC, |tia, host, y| {
            if y == 0 {
                store(tia, host, COLUBK, 0x44);
            }
        });
    }

    assert_eq!(host.frames_completed(), 2);
    assert_eq!(tia.height(), 212);
    assert!(!tia.is_pal());

    let frame = tia.previous_frame_buffer();
    assert!(row(frame, 0).iter().all(|&c| c == 0x44));
    assert!(row(frame, 150).iter().all(|&c| c == 0x44));
    // Visible overscan has VBLANK on
    assert!(row(frame, 205).iter().all(|&c| c == 0x00));
}

#[test]
fn test_pal_detected_from_line_count() {
    let mut tia: Tia = Tia::default();
    let mut host = StandaloneHost::new();

    for _ in 0..10 {
        run_frame(&mut tia, &mut host, &PAL, |_, _, _| {});
    }

    assert!(tia.is_pal());
    assert_eq!(tia.height(), 248);
}

#[test]
fn test_fixed_standard_disables_detection() {
    let config = TiaConfig {
        video_standard: VideoStandardSetting::Ntsc,
        ..TiaConfig::default()
    };
    let mut tia = Tia::new(config);
    let mut host = StandaloneHost::new();

    for _ in 0..12 {
        run_frame(&mut tia, &mut host, &PAL, |_, _, _| {});
    }

    assert!(!tia.is_pal());
}

#[test]
fn test_player_hits_playfield_wall() {
    let mut tia: Tia = Tia::default();
    let mut host = StandaloneHost::new();

    run_frame(&mut tia, &mut host, &NTSC, |tia, host, y| match y {
        0 => {
            store(tia, host, COLUP0, 0x1E);
            store(tia, host, COLUPF, 0x84);
            store(tia, host, PF0, 0x10);
            store(tia, host, RESP0, 0);
        }
        50 => store(tia, host, GRP0, 0xFF),
        60 => store(tia, host, GRP0, 0x00),
        _ => {}
    });

    // One more frame so the picture lands in the previous buffer
    run_frame(&mut tia, &mut host, &NTSC, |_, _, _| {});
    let frame = tia.previous_frame_buffer();

    let player_pixels = |y: usize| row(frame, y).iter().filter(|&&c| c == 0x1E).count();
    assert_eq!(player_pixels(40), 0);
    assert_eq!(player_pixels(55), 8);
    assert!(row(frame, 40)[..4].iter().all(|&c| c == 0x84));

    assert_eq!(load(&mut tia, &mut host, CXP0FB), 0x80);
    assert_eq!(load(&mut tia, &mut host, CXM0P), 0x00);

    store(&mut tia, &mut host, CXCLR, 0);
    assert_eq!(tia.collision_mask(), 0);
    assert_eq!(load(&mut tia, &mut host, CXP0FB), 0x00);
}

struct Paddle(f64);

impl Controller for Paddle {
    fn read_digital_pin(&self) -> bool {
        true
    }

    fn read_analog_resistance(&self, pin: AnalogPin) -> f64 {
        match pin {
            AnalogPin::Nine => self.0,
            AnalogPin::Five => f64::MAX,
        }
    }
}

/// Lines until INPT0 reads high after the capacitor dump is released
fn paddle_charge_lines(resistance: f64, max_lines: u32) -> Option<u32> {
    let mut tia: Tia = Tia::default();
    let mut host = StandaloneHost::new();
    tia.set_left_controller(Box::new(Paddle(resistance)));

    store(&mut tia, &mut host, VBLANK, 0x80);
    assert_eq!(load(&mut tia, &mut host, INPT0) & 0x80, 0);
    store(&mut tia, &mut host, VBLANK, 0x00);

    for line in 1..=max_lines {
        host.advance(76);
        tia.catch_up(&mut host);
        if tia.read(u16::from(INPT0), &mut host) & 0x80 != 0 {
            return Some(line);
        }
    }
    None
}

#[test]
fn test_paddle_charge_time_tracks_resistance() {
    assert_eq!(paddle_charge_lines(0.0, 5), Some(1));

    let slow = paddle_charge_lines(1.0, 400).expect("trips eventually");
    assert!((370..=390).contains(&slow), "tripped after {} lines", slow);

    let mid = paddle_charge_lines(0.5, 400).expect("trips eventually");
    assert!(mid > 1 && mid < slow);
}

#[test]
fn test_unplugged_paddle_never_charges() {
    let mut tia: Tia = Tia::default();
    let mut host = StandaloneHost::new();

    host.advance(500 * 76);
    assert_eq!(load(&mut tia, &mut host, INPT1) & 0x80, 0);
}

#[derive(Clone, Default)]
struct Joystick {
    fire: Arc<AtomicBool>,
}

impl Controller for Joystick {
    fn read_digital_pin(&self) -> bool {
        !self.fire.load(Ordering::Relaxed)
    }

    fn read_analog_resistance(&self, _pin: AnalogPin) -> f64 {
        f64::MAX
    }
}

#[test]
fn test_fire_button_latch() {
    let mut tia: Tia = Tia::default();
    let mut host = StandaloneHost::new();
    let joystick = Joystick::default();
    tia.set_right_controller(Box::new(joystick.clone()));

    assert_eq!(load(&mut tia, &mut host, INPT5) & 0x80, 0x80);
    assert_eq!(load(&mut tia, &mut host, INPT4) & 0x80, 0x80);

    store(&mut tia, &mut host, VBLANK, 0x40);
    joystick.fire.store(true, Ordering::Relaxed);
    assert_eq!(load(&mut tia, &mut host, INPT5) & 0x80, 0x00);

    // Latched until the latch is disabled
    joystick.fire.store(false, Ordering::Relaxed);
    assert_eq!(load(&mut tia, &mut host, INPT5) & 0x80, 0x00);

    store(&mut tia, &mut host, VBLANK, 0x00);
    assert_eq!(load(&mut tia, &mut host, INPT5) & 0x80, 0x80);
}

fn scripted_frame(tia: &mut Tia, host: &mut StandaloneHost) {
    run_frame(tia, host, &NTSC, |tia, host, y| {
        let y = y as u8;
        store(tia, host, COLUBK, y);
        if y % 16 == 0 {
            store(tia, host, PF1, y.wrapping_mul(7));
            store(tia, host, RESP1, 0);
            store(tia, host, GRP1, 0x3C);
            store(tia, host, HMP1, 0x70);
            store(tia, host, HMOVE, 0);
        }
    });
}

#[test]
fn test_emulation_is_deterministic() {
    let mut a: Tia = Tia::default();
    let mut b: Tia = Tia::default();
    let mut host_a = StandaloneHost::new();
    let mut host_b = StandaloneHost::new();

    for _ in 0..3 {
        scripted_frame(&mut a, &mut host_a);
        scripted_frame(&mut b, &mut host_b);
    }

    assert_eq!(a.timestamp(), b.timestamp());
    assert_eq!(a.collision_mask(), b.collision_mask());
    assert_eq!(a.previous_frame_buffer(), b.previous_frame_buffer());
}

/// Mostly static picture, so line caching actually kicks in between changes
fn sparse_frame(tia: &mut Tia, host: &mut StandaloneHost) {
    run_frame(tia, host, &NTSC, |tia, host, y| match y {
        0 => {
            store(tia, host, COLUPF, 0x84);
            store(tia, host, COLUP0, 0x1E);
            store(tia, host, COLUP1, 0x36);
            store(tia, host, PF0, 0x30);
            store(tia, host, PF2, 0x81);
            store(tia, host, GRP0, 0x3C);
            store(tia, host, ENABL, 0x02);
            store(tia, host, RESP0, 0);
            store(tia, host, RESBL, 0);
        }
        40 => {
            store(tia, host, HMP0, 0xF0);
            store(tia, host, HMOVE, 0);
        }
        64 => {
            store(tia, host, GRP1, 0xFF);
            store(tia, host, RESP1, 0);
        }
        100 => store(tia, host, CXCLR, 0),
        120 => {
            // HMOVE well inside the visible part of the line
            host.advance(30);
            store(tia, host, HMOVE, 0);
        }
        160 => store(tia, host, GRP0, 0x00),
        _ => {}
    });
}

#[test]
fn test_line_caching_matches_full_rendering() {
    let mut tias: Vec<Tia> = [false, true]
        .iter()
        .map(|&line_caching| {
            Tia::new(TiaConfig {
                line_caching,
                ..TiaConfig::default()
            })
        })
        .collect();

    let mut masks = Vec::new();
    for tia in &mut tias {
        let mut host = StandaloneHost::new();
        for _ in 0..2 {
            sparse_frame(tia, &mut host);
        }
        masks.push(tia.collision_mask());
    }

    assert_ne!(masks[0], 0);
    assert_eq!(masks[0], masks[1]);
    assert_eq!(tias[0].previous_frame_buffer(), tias[1].previous_frame_buffer());
}

#[test]
fn test_save_state_resumes_mid_frame() {
    let mut tia: Tia = Tia::default();
    let mut host = StandaloneHost::new();
    scripted_frame(&mut tia, &mut host);

    store(&mut tia, &mut host, VSYNC, 0x02);
    wsync(&mut tia, &mut host, 3);
    store(&mut tia, &mut host, VSYNC, 0x00);
    host.advance(17);
    tia.catch_up(&mut host);

    let saved = tia.save_state();
    let mut restored_host = host.clone();
    let mut restored: Tia = Tia::default();
    restored.load_state(&saved).expect("state loads");

    for (tia, host) in [(&mut tia, &mut host), (&mut restored, &mut restored_host)] {
        store(tia, host, VBLANK, 0x02);
        wsync(tia, host, 37);
        scripted_frame(tia, host);
    }

    assert_eq!(restored.timestamp(), tia.timestamp());
    assert_eq!(restored.scanlines(), tia.scanlines());
    assert_eq!(restored.previous_frame_buffer(), tia.previous_frame_buffer());
    assert_eq!(restored_host.frames_completed(), host.frames_completed());
}

#[test]
fn test_wsync_aligns_next_store_to_line_start() {
    let mut tia: Tia = Tia::default();
    let mut host = StandaloneHost::new();

    host.advance(20);
    store(&mut tia, &mut host, WSYNC, 0);
    tia.catch_up(&mut host);
    assert_eq!(tia.clocks_this_line(), 0);
    assert_eq!(host.cycles(), 76);
}
