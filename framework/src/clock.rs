//! Millisecond clock arithmetic
//!
//! Timestamps are `u32` milliseconds from a free-running counter, which wraps
//! after ~49.7 days. Differences are taken modulo 2^32 and read as signed, so
//! an interval that spans the wrap is still positive, while a timestamp that
//! is genuinely earlier (clock stepped back, stale reading) clamps to zero.
//! Valid for intervals up to ~24.8 days.

/// Milliseconds from `since` to `now`, zero if `now` is before `since`
pub fn elapsed_ms(now_ms: u32, since_ms: u32) -> u32 {
    let delta = now_ms.wrapping_sub(since_ms) as i32;
    delta.max(0) as u32
}
