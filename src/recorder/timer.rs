//! Elapsed-time clock with a hard cap

/// Result of one clock tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// New elapsed value, in seconds
    Elapsed(u32),
    /// The tick would have reached the cap; the value was not published
    LimitReached,
}

/// Whole-second recording clock
#[derive(Debug, Clone)]
pub struct ElapsedTimer {
    elapsed_secs: u32,
    max_secs: u32,
}

impl ElapsedTimer {
    pub fn new(max_secs: u32) -> Self {
        Self {
            elapsed_secs: 0,
            max_secs,
        }
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn max_secs(&self) -> u32 {
        self.max_secs
    }

    pub fn reset(&mut self) {
        self.elapsed_secs = 0;
    }

    /// Advance by one second. The increment that would reach the cap is
    /// withheld, so the last published value is `max - 1`.
    pub fn tick(&mut self) -> Tick {
        let next = self.elapsed_secs.saturating_add(1);
        if next >= self.max_secs {
            return Tick::LimitReached;
        }
        self.elapsed_secs = next;
        Tick::Elapsed(next)
    }
}

/// Render seconds as `MM:SS`.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
