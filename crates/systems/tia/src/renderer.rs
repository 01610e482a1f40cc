//! Software renderer turning TIA palette indices into an ARGB frame.
//!
//! ```text
//! Tia (160 x lines of palette indices) -> SoftwareTiaRenderer -> Frame
//! ```
//!
//! The chip keeps drawing into its current buffer while a frame is shown, so
//! hosts render from [`Tia::previous_frame_buffer`], the last complete frame.

use emu_core::renderer::Renderer;
use emu_core::types::{Frame, VideoStandard};

use crate::frame_manager::FrameSync;
use crate::palette;
use crate::tia::{Tia, FRAME_HEIGHT, FRAME_WIDTH};

/// Default picture height (NTSC kernel plus overscan)
const DEFAULT_HEIGHT: u32 = 212;

pub struct SoftwareTiaRenderer {
    framebuffer: Frame,
}

impl SoftwareTiaRenderer {
    pub fn new() -> Self {
        Self {
            framebuffer: Frame::new(FRAME_WIDTH as u32, DEFAULT_HEIGHT),
        }
    }

    /// Convert `height` lines of indexed pixels. The frame is resized when
    /// the height changes.
    pub fn render_frame(&mut self, pixels: &[u8], height: u32, standard: VideoStandard) {
        let height = height.min(FRAME_HEIGHT as u32);
        if self.framebuffer.height != height || self.framebuffer.width != FRAME_WIDTH as u32 {
            self.resize(FRAME_WIDTH as u32, height);
        }

        let count = (height as usize * FRAME_WIDTH).min(pixels.len());
        for (out, &color) in self.framebuffer.pixels.iter_mut().zip(&pixels[..count]) {
            *out = palette::to_argb(color, standard);
        }
    }

    /// Render the last completed frame of `tia`
    pub fn render_tia<F: FrameSync>(&mut self, tia: &Tia<F>) {
        let standard = tia.frame_sync().video_standard();
        self.render_frame(tia.previous_frame_buffer(), tia.height(), standard);
    }
}

impl Default for SoftwareTiaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for SoftwareTiaRenderer {
    fn get_frame(&self) -> &Frame {
        &self.framebuffer
    }

    fn clear(&mut self, color: u32) {
        self.framebuffer.pixels.fill(color);
    }

    fn reset(&mut self) {
        self.clear(0xFF000000);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.framebuffer = Frame::new(width, height);
    }

    fn name(&self) -> &str {
        "TIA Software Renderer"
    }
}
