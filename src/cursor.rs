//! Persisted task-time cursor.
//!
//! The scene scheduler deduplicates tasks by their time-of-day, so every
//! invocation must mint a time value that has not been used before. The
//! cursor remembers the last value in a side file and advances it by one
//! minute per read, wrapping at 24:00. The file is a durability aid only:
//! a missing or corrupt file falls back to "now + 1 minute".

use std::fmt;
use std::path::PathBuf;

use chrono::Timelike;
use tracing::debug;

/// Cursor file name, written next to the executable.
pub const CURSOR_FILE: &str = ".task_time_cache";

/// A 24-hour wall-clock schedule time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTime {
    pub hour: u8,
    pub minute: u8,
}

impl TaskTime {
    /// Advance by one minute, wrapping `23:59 -> 0:0`.
    pub fn advance(self) -> Self {
        let mut hour = self.hour;
        let mut minute = self.minute + 1;
        if minute >= 60 {
            minute = 0;
            hour += 1;
            if hour >= 24 {
                hour = 0;
            }
        }
        TaskTime { hour, minute }
    }

    /// Parse `H:M` (no leading zeros required). Out-of-range or malformed
    /// input yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let (h, m) = s.split_once(':')?;
        let hour: u8 = h.trim().parse().ok()?;
        let minute: u8 = m.trim().parse().ok()?;
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Some(TaskTime { hour, minute })
    }

    /// One minute from now, on the local clock.
    pub fn now_plus_one_minute() -> Self {
        let t = chrono::Local::now() + chrono::Duration::minutes(1);
        TaskTime {
            hour: t.hour() as u8,
            minute: t.minute() as u8,
        }
    }
}

impl fmt::Display for TaskTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The device expects unpadded "H:M"
        write!(f, "{}:{}", self.hour, self.minute)
    }
}

/// On-disk store for the cursor. Primary location is next to the
/// executable; writes fall back to the working directory.
pub struct CursorStore {
    primary: PathBuf,
    fallback: PathBuf,
}

impl CursorStore {
    pub fn new(primary: PathBuf, fallback: PathBuf) -> Self {
        CursorStore { primary, fallback }
    }

    /// Store rooted at the executable's directory, falling back to the
    /// working directory when the executable path is unavailable.
    pub fn at_default_location() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(PathBuf::from))
            .unwrap_or_else(|| cwd.clone());
        CursorStore::new(exe_dir.join(CURSOR_FILE), cwd.join(CURSOR_FILE))
    }

    /// Read the persisted cursor, trying the primary then fallback path.
    /// Any read or parse failure is treated as "no cursor".
    pub fn read(&self) -> Option<TaskTime> {
        for path in [&self.primary, &self.fallback] {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    if let Some(t) = TaskTime::parse(content.trim()) {
                        return Some(t);
                    }
                    debug!("cursor file {} is corrupt, ignoring", path.display());
                }
                Err(e) => debug!("cursor file {} unreadable: {}", path.display(), e),
            }
        }
        None
    }

    /// Persist the cursor, best-effort. A failed primary write retries at
    /// the fallback path; failure of both is logged and swallowed.
    pub fn write(&self, time: &TaskTime) {
        let value = time.to_string();
        if let Err(e) = std::fs::write(&self.primary, &value) {
            debug!("writing cursor to {} failed: {}", self.primary.display(), e);
            if let Err(e) = std::fs::write(&self.fallback, &value) {
                debug!("writing cursor to {} failed: {}", self.fallback.display(), e);
            }
        }
    }

    /// Mint the next schedule time: persisted cursor advanced by one
    /// minute, or "now + 1 minute" when no usable cursor exists. The new
    /// value is written back before being returned.
    pub fn next(&self) -> TaskTime {
        let next = match self.read() {
            Some(t) => t.advance(),
            None => TaskTime::now_plus_one_minute(),
        };
        self.write(&next);
        debug!("using task time {}", next);
        next
    }
}
