//! Cycle-accurate Atari 2600 TIA video core

#![allow(clippy::upper_case_acronyms)]

pub mod config;
pub mod frame_manager;
pub mod host;
pub mod latched_input;
pub mod paddle_reader;
pub mod palette;
pub mod renderer;
pub mod tia;

use thiserror::Error;

pub use config::{TiaConfig, VideoStandardSetting};
pub use frame_manager::{FrameEvent, FrameManager, FrameSync};
pub use host::{
    AnalogPin, AudioRegister, AudioSink, Controller, NullAudio, StandaloneHost, TiaHost, Unplugged,
};
pub use renderer::SoftwareTiaRenderer;
pub use tia::debug::{TiaBits, Toggle};
pub use tia::{HState, Priority, Tia};

#[derive(Debug, Error)]
pub enum TiaError {
    #[error("State belongs to `{0}`, not the TIA")]
    WrongStateTag(String),
    #[error("Unsupported state version {0}")]
    UnsupportedVersion(u64),
    #[error("Save state is missing `{0}`")]
    MissingSection(&'static str),
    #[error("Invalid frame buffer size {0}")]
    InvalidBufferSize(usize),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
