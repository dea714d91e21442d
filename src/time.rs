//! Tick units and delay conversions.

/// Milliseconds elapsed since the run-loop clock was initialized.
///
/// Saturates at `u32::MAX` (roughly 49.7 days) instead of wrapping, so the
/// value seen by the main loop never decreases.
pub type Ticks = u32;

/// Converts a delay in seconds to ticks, rounding to the nearest millisecond.
///
/// Negative and NaN delays map to zero; delays past the tick range saturate.
pub fn seconds_to_ticks(seconds: f32) -> Ticks {
    let millis = libm::roundf(seconds * 1000.0);
    if millis.is_nan() || millis <= 0.0 {
        0
    } else if millis >= Ticks::MAX as f32 {
        Ticks::MAX
    } else {
        millis as Ticks
    }
}

/// Returns the tick value `delay` ticks after `now`, saturating on overflow.
#[inline]
pub fn deadline(now: Ticks, delay: Ticks) -> Ticks {
    now.saturating_add(delay)
}
