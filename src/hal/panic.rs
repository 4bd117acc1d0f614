//! Crash log formatting for the modem panic handler.

use std::fmt::{self, Write};

/// Size of the crash log buffer the modem library reserves.
pub const CRASH_LOG_SIZE: usize = 255;

/// Fixed-capacity `"<func>:<line> <message>"` record.
///
/// Formatting past the capacity is truncated on a character boundary.
pub struct CrashLog {
    buf: [u8; CRASH_LOG_SIZE],
    len: usize,
}

impl CrashLog {
    pub fn new() -> Self {
        Self {
            buf: [0; CRASH_LOG_SIZE],
            len: 0,
        }
    }

    /// Format a panic record.
    pub fn format(func: &str, line: u32, args: fmt::Arguments<'_>) -> Self {
        let mut log = Self::new();
        // Truncation is reported as fmt::Error; the prefix is kept.
        let _ = write!(log, "{}:{} {}", func, line, args);
        log
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn as_str(&self) -> &str {
        // Only whole chars are ever copied in.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for CrashLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for CrashLog {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = CRASH_LOG_SIZE - self.len;
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        if take < s.len() {
            Err(fmt::Error)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for CrashLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CrashLog").field(&self.as_str()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_record() {
        let log = CrashLog::format("lr11xx_hal_write", 212, format_args!("bus error {}", -5));
        assert_eq!(log.as_str(), "lr11xx_hal_write:212 bus error -5");
    }

    #[test]
    fn test_truncates_at_capacity() {
        let long = "x".repeat(400);
        let log = CrashLog::format("f", 1, format_args!("{}", long));
        assert_eq!(log.len(), CRASH_LOG_SIZE);
        assert!(log.as_str().starts_with("f:1 xxx"));
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        // 'é' is two bytes; 200 of them overflow the buffer mid-character
        let msg = "é".repeat(200);
        let log = CrashLog::format("f", 1, format_args!("{}", msg));
        assert!(log.len() <= CRASH_LOG_SIZE);
        assert!(std::str::from_utf8(log.as_bytes()).is_ok());
        assert_eq!(log.len(), 4 + 250);
    }

    #[test]
    fn test_empty_message() {
        let log = CrashLog::format("main", 0, format_args!(""));
        assert_eq!(log.as_str(), "main:0 ");
    }
}
