//! Process-wide logging for the chip emulation.
//!
//! Emulated hardware produces events at megahertz rates, so logging here is
//! built around three rules:
//!
//! - **Lazy**: messages are closures, formatted only when the category and
//!   level are enabled.
//! - **Bounded**: each category is rate limited with a one second sliding
//!   window; dropped messages are summarised instead of flooding the sink.
//! - **Off the hot path**: file output is handed to a background writer
//!   thread, stderr is used otherwise.
//!
//! # Usage
//!
//! ```rust
//! use emu_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Timing, LogLevel::Debug, || {
//!     format!("HMOVE applied at hctr={}", 12)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Subsystem a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Register reads and writes, open-bus accesses
    Bus,
    /// Graphics objects, collisions, pixel output
    Video,
    /// Horizontal/vertical timing: HMOVE, WSYNC, frame boundaries
    Timing,
    /// Paddles and latched digital inputs
    Input,
    /// Writes forwarded to the audio collaborator
    Audio,
    /// Save-state and configuration handling
    State,
}

impl LogCategory {
    /// Number of categories; sizes the per-category tables
    pub const COUNT: usize = 6;

    pub const ALL: [LogCategory; Self::COUNT] = [
        LogCategory::Bus,
        LogCategory::Video,
        LogCategory::Timing,
        LogCategory::Input,
        LogCategory::Audio,
        LogCategory::State,
    ];

    fn index(self) -> usize {
        match self {
            LogCategory::Bus => 0,
            LogCategory::Video => 1,
            LogCategory::Timing => 2,
            LogCategory::Input => 3,
            LogCategory::Audio => 4,
            LogCategory::State => 5,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while logging must not take logging down with it
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-category state of the sliding window limiter
#[derive(Default)]
struct Window {
    timestamps: VecDeque<Instant>,
    dropped: usize,
    last_drop_report: Option<Instant>,
}

/// Sliding-window rate limiter, one window per category
struct RateLimiter {
    max_logs_per_second: AtomicUsize,
    window_duration: Duration,
    windows: Mutex<[Window; LogCategory::COUNT]>,
}

impl RateLimiter {
    fn new(max_logs_per_second: usize) -> Self {
        Self {
            max_logs_per_second: AtomicUsize::new(max_logs_per_second),
            window_duration: Duration::from_secs(1),
            windows: Mutex::new(Default::default()),
        }
    }

    fn set_max_logs_per_second(&self, max: usize) {
        self.max_logs_per_second.store(max, Ordering::Relaxed);
    }

    fn max_logs_per_second(&self) -> usize {
        self.max_logs_per_second.load(Ordering::Relaxed)
    }

    /// Returns whether the message may be emitted, and a count of dropped
    /// messages when it is time to report them.
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let mut windows = lock(&self.windows);
        let window = &mut windows[category.index()];

        while let Some(&front) = window.timestamps.front() {
            if now.duration_since(front) > self.window_duration {
                window.timestamps.pop_front();
            } else {
                break;
            }
        }

        if window.timestamps.len() < self.max_logs_per_second() {
            window.timestamps.push_back(now);
            if window.dropped > 0 {
                let dropped = std::mem::take(&mut window.dropped);
                window.last_drop_report = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        window.dropped += 1;
        let report_due = window
            .last_drop_report
            .map_or(true, |last| now.duration_since(last) >= Duration::from_secs(1));
        if report_due {
            window.last_drop_report = Some(now);
            (false, Some(std::mem::take(&mut window.dropped)))
        } else {
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    /// Level used by categories without their own setting
    global_level: AtomicU8,
    /// Per-category overrides; `Off` means "use the global level"
    category_levels: [AtomicU8; LogCategory::COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category-specific level wins over the global one
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    /// Set the maximum logs per second per category
    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter.set_max_logs_per_second(max_logs_per_second);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_logs_per_second()
    }

    /// Route output to `path` through a background writer thread.
    ///
    /// A previously configured file is closed when its sender is replaced.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("tia-log-writer".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    // Logging must never take the emulator down
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
            })?;

        *lock(&self.log_sender) = Some(sender);
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop logging to file; the writer thread exits when its channel closes
    pub fn clear_log_file(&self) {
        *lock(&self.log_sender) = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, message: &str) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            if let Some(sender) = lock(&self.log_sender).as_ref() {
                if sender.send(message.to_string()).is_ok() {
                    return;
                }
            }
        }
        eprintln!("{}", message);
    }
}

/// Log a lazily formatted message.
///
/// The closure only runs when `category` is enabled at `level` and the
/// category is within its rate limit. When messages had to be dropped, a
/// one-line summary is written before the next allowed message.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped.filter(|&n| n > 0) {
        config.write_message(&format!(
            "[{:?}] WARNING: rate limit exceeded, {} message(s) dropped",
            category, count
        ));
    }
    if allowed {
        config.write_message(&message_fn());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("ERR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("Warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("3"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("loud"), None);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Timing, LogLevel::Debug);

        assert!(config.should_log(LogCategory::Timing, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::Timing, LogLevel::Trace));
        assert!(config.should_log(LogCategory::Bus, LogLevel::Error));
        assert!(!config.should_log(LogCategory::Bus, LogLevel::Warn));
    }

    #[test]
    fn test_reset_turns_everything_off() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Video, LogLevel::Info);

        config.reset();

        assert_eq!(config.get_global_level(), LogLevel::Off);
        for category in LogCategory::ALL {
            assert_eq!(config.get_level(category), LogLevel::Off);
        }
    }

    #[test]
    fn test_rate_limiter_is_per_category() {
        let limiter = RateLimiter::new(10);
        for _ in 0..10 {
            assert!(limiter.should_allow(LogCategory::Video).0);
        }
        assert!(!limiter.should_allow(LogCategory::Video).0);
        assert!(limiter.should_allow(LogCategory::Input).0);
    }

    #[test]
    fn test_rate_limiter_reports_drops_after_window() {
        let limiter = RateLimiter::new(3);
        for _ in 0..3 {
            limiter.should_allow(LogCategory::Bus);
        }
        // First drop is reported immediately, the rest accumulate
        let (allowed, first) = limiter.should_allow(LogCategory::Bus);
        assert!(!allowed);
        assert_eq!(first, Some(1));
        for _ in 0..4 {
            assert_eq!(limiter.should_allow(LogCategory::Bus), (false, None));
        }

        thread::sleep(Duration::from_millis(1100));

        let (allowed, dropped) = limiter.should_allow(LogCategory::Bus);
        assert!(allowed);
        assert_eq!(dropped, Some(4));
    }

    #[test]
    fn test_disabled_message_is_never_formatted() {
        LogConfig::global().set_level(LogCategory::State, LogLevel::Off);
        log(LogCategory::State, LogLevel::Trace, || {
            panic!("closure must not run while the category is off")
        });
    }
}
