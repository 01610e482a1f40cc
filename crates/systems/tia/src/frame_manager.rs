//! Vertical timing: where a frame starts and ends, which lines are shown.
//!
//! The TIA has no notion of a frame. Programs generate VSYNC and VBLANK
//! themselves, and the frame manager reconstructs the picture from those
//! signals and the line count, the way a television would.

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::types::VideoStandard;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TiaError;

/// What happened on a line advance or VSYNC change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    None,
    /// Rendering of a new frame begins; the pixel buffers swap
    NewFrame,
    /// The frame that was being rendered is finished
    FrameComplete,
}

/// Vertical sync collaborator of the TIA
pub trait FrameSync {
    fn reset(&mut self);

    /// Called once per scanline when the horizontal counter wraps
    fn advance_line(&mut self) -> FrameEvent;

    fn set_vsync(&mut self, vsync: bool) -> FrameEvent;

    fn set_vblank(&mut self, vblank: bool);

    /// The current line belongs to the displayed picture
    fn is_visible_line(&self) -> bool;

    fn is_vblank(&self) -> bool;

    /// Line within the displayed picture; only meaningful on visible lines
    fn current_line(&self) -> u32;

    /// Lines of the frame in progress
    fn scanline_count(&self) -> u32;

    fn visible_height(&self) -> u32;

    fn video_standard(&self) -> VideoStandard;

    fn save_state(&self) -> Value;

    fn load_state(&mut self, state: &Value) -> Result<(), TiaError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameState {
    WaitForVsyncStart,
    WaitForVsyncEnd,
    WaitForFrameStart,
    Frame,
    Overscan,
}

/// Nominal line counts of one television standard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub vblank: u32,
    pub kernel: u32,
    pub overscan: u32,
}

impl Metrics {
    pub fn for_standard(standard: VideoStandard) -> Self {
        match standard {
            VideoStandard::Ntsc => Metrics {
                vblank: 37,
                kernel: 192,
                overscan: 30,
            },
            VideoStandard::Pal => Metrics {
                vblank: 45,
                kernel: 228,
                overscan: 36,
            },
        }
    }
}

/// Overscan lines still shown below the kernel
const VISIBLE_OVERSCAN: u32 = 20;
/// How many lines early a frame may start while VBLANK is already off
const MAX_UNDERSCAN: u32 = 10;
/// Longest VSYNC pulse accepted before giving up on it
const MAX_LINES_VSYNC: u32 = 50;
/// Lines after which a frame without VSYNC is assumed
const MAX_LINES_WITHOUT_VSYNC: u32 = 150;
/// Frames rendered before the standard is guessed from the line count
const TV_MODE_DETECTION_FRAMES: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameManager {
    state: FrameState,
    line_in_state: u32,
    /// Line within the rendered picture
    y: u32,
    /// Lines of the frame in progress
    frame_lines: u32,
    /// Line count of the last completed frame
    last_frame_lines: u32,
    frames: u32,

    vsync: bool,
    vblank: bool,
    wait_for_vsync: bool,

    video_standard: VideoStandard,
    /// Standard forced by configuration, disables detection
    fixed_standard: Option<VideoStandard>,
}

impl Default for FrameManager {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FrameManager {
    pub fn new(fixed_standard: Option<VideoStandard>) -> Self {
        Self {
            state: FrameState::WaitForVsyncStart,
            line_in_state: 0,
            y: 0,
            frame_lines: 0,
            last_frame_lines: 0,
            frames: 0,
            vsync: false,
            vblank: false,
            wait_for_vsync: true,
            video_standard: fixed_standard.unwrap_or_default(),
            fixed_standard,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Completed frames since reset
    pub fn frame_count(&self) -> u32 {
        self.frames
    }

    pub fn last_frame_lines(&self) -> u32 {
        self.last_frame_lines
    }

    fn metrics(&self) -> Metrics {
        Metrics::for_standard(self.video_standard)
    }

    fn set_state(&mut self, state: FrameState) -> FrameEvent {
        if self.state == state {
            return FrameEvent::None;
        }

        log(LogCategory::Video, LogLevel::Trace, || {
            format!(
                "FrameManager: {:?} -> {:?} after {} lines",
                self.state, state, self.line_in_state
            )
        });

        self.state = state;
        self.line_in_state = 0;

        if state == FrameState::Frame {
            self.y = 0;
            FrameEvent::NewFrame
        } else {
            FrameEvent::None
        }
    }

    fn finalize_frame(&mut self) {
        self.last_frame_lines = self.frame_lines;
        self.frame_lines = 0;
        self.frames += 1;

        log(LogCategory::Video, LogLevel::Debug, || {
            format!(
                "FrameManager: frame {} complete, {} lines",
                self.frames, self.last_frame_lines
            )
        });

        if self.fixed_standard.is_none() && self.frames == TV_MODE_DETECTION_FRAMES {
            let ntsc = VideoStandard::Ntsc.lines_per_frame();
            let pal = VideoStandard::Pal.lines_per_frame();
            let detected = if self.last_frame_lines > (ntsc + pal) / 2 {
                VideoStandard::Pal
            } else {
                VideoStandard::Ntsc
            };

            if detected != self.video_standard {
                log(LogCategory::Video, LogLevel::Info, || {
                    format!(
                        "FrameManager: detected {:?} ({} lines)",
                        detected, self.last_frame_lines
                    )
                });
            }
            self.video_standard = detected;
        }
    }
}

impl FrameSync for FrameManager {
    fn reset(&mut self) {
        *self = Self::new(self.fixed_standard);
    }

    fn advance_line(&mut self) -> FrameEvent {
        self.frame_lines += 1;
        self.line_in_state += 1;
        if self.state == FrameState::Frame {
            self.y += 1;
        }

        let metrics = self.metrics();
        match self.state {
            FrameState::WaitForVsyncStart => {
                if self.line_in_state > MAX_LINES_WITHOUT_VSYNC {
                    self.wait_for_vsync = false;
                    return self.set_state(FrameState::WaitForFrameStart);
                }
            }
            FrameState::WaitForVsyncEnd => {
                if self.line_in_state > MAX_LINES_VSYNC {
                    return self.set_state(FrameState::WaitForFrameStart);
                }
            }
            FrameState::WaitForFrameStart => {
                let start = if self.wait_for_vsync {
                    let threshold = if self.vblank {
                        metrics.vblank
                    } else {
                        metrics.vblank - MAX_UNDERSCAN
                    };
                    self.line_in_state >= threshold
                } else {
                    !self.vblank
                };
                if start {
                    return self.set_state(FrameState::Frame);
                }
            }
            FrameState::Frame => {
                if self.line_in_state >= metrics.kernel + VISIBLE_OVERSCAN {
                    self.finalize_frame();
                    self.set_state(FrameState::Overscan);
                    return FrameEvent::FrameComplete;
                }
            }
            FrameState::Overscan => {
                if self.line_in_state >= metrics.overscan - VISIBLE_OVERSCAN {
                    let next = if self.wait_for_vsync {
                        FrameState::WaitForVsyncStart
                    } else {
                        FrameState::WaitForFrameStart
                    };
                    return self.set_state(next);
                }
            }
        }

        FrameEvent::None
    }

    fn set_vsync(&mut self, vsync: bool) -> FrameEvent {
        if vsync == self.vsync {
            return FrameEvent::None;
        }
        self.vsync = vsync;

        if vsync {
            self.wait_for_vsync = true;
        }

        match self.state {
            FrameState::WaitForVsyncStart
            | FrameState::WaitForFrameStart
            | FrameState::Overscan => {
                if vsync {
                    self.set_state(FrameState::WaitForVsyncEnd);
                }
                FrameEvent::None
            }
            FrameState::WaitForVsyncEnd => {
                if !vsync {
                    self.set_state(FrameState::WaitForFrameStart);
                }
                FrameEvent::None
            }
            FrameState::Frame => {
                if vsync {
                    self.finalize_frame();
                    self.set_state(FrameState::WaitForVsyncEnd);
                    FrameEvent::FrameComplete
                } else {
                    FrameEvent::None
                }
            }
        }
    }

    fn set_vblank(&mut self, vblank: bool) {
        self.vblank = vblank;
    }

    fn is_visible_line(&self) -> bool {
        self.state == FrameState::Frame
    }

    fn is_vblank(&self) -> bool {
        self.vblank
    }

    fn current_line(&self) -> u32 {
        self.y
    }

    fn scanline_count(&self) -> u32 {
        self.frame_lines
    }

    fn visible_height(&self) -> u32 {
        self.metrics().kernel + VISIBLE_OVERSCAN
    }

    fn video_standard(&self) -> VideoStandard {
        self.video_standard
    }

    fn save_state(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn load_state(&mut self, state: &Value) -> Result<(), TiaError> {
        let restored: FrameManager = serde_json::from_value(state.clone())?;
        *self = restored;
        Ok(())
    }
}
