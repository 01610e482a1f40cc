//! Core primitives shared by the TIA emulation crates.

pub mod logging;
pub mod renderer;

pub mod types {
    use serde::{Deserialize, Serialize};

    /// An ARGB8888 framebuffer produced by a renderer.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; (width * height) as usize],
            }
        }
    }

    /// Television standard the console is wired for.
    ///
    /// The chip itself runs the same 228-clock line on both standards; what
    /// differs is the number of lines per frame and therefore the color-clock
    /// rate seen by anything that measures real time (paddle RC networks,
    /// palette selection).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum VideoStandard {
        #[default]
        Ntsc,
        Pal,
    }

    impl VideoStandard {
        /// Nominal field rate in Hz
        pub fn frame_rate(&self) -> u32 {
            match self {
                VideoStandard::Ntsc => 60,
                VideoStandard::Pal => 50,
            }
        }

        /// Total scanlines in a nominal frame
        pub fn lines_per_frame(&self) -> u32 {
            match self {
                VideoStandard::Ntsc => 262,
                VideoStandard::Pal => 312,
            }
        }

        /// Color clocks per second (228 clocks per line)
        pub fn color_clock_hz(&self) -> f64 {
            f64::from(self.frame_rate() * 228 * self.lines_per_frame())
        }
    }
}
