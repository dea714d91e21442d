//! Hardware access traits.
//!
//! The run-loop never touches registers itself. Boards implement [`TickTimer`]
//! for the timer that drives the clock and [`PinIo`] for their GPIO ports.

use crate::types::{IoMode, PortPin};

/// The 16-bit overflow timer driving the tick interrupt.
///
/// The timer counts up from the reload value and raises its interrupt on
/// overflow. The interrupt handler must call
/// [`TickCounter::on_tick`](crate::TickCounter::on_tick); timers without
/// hardware auto-reload also rewrite the reload value there, taken from
/// [`TickCounter::reload`](crate::TickCounter::reload).
pub trait TickTimer {
    /// Loads the reload value and enables the overflow interrupt.
    fn arm(&mut self, reload: u16);

    /// Starts counting.
    fn start(&mut self);

    /// Stops counting. Counter registers and reload value are left as is.
    fn stop(&mut self);
}

/// Digital pin access for polled inputs.
///
/// Polarity, pull-ups and any per-port restrictions are owned by the
/// implementation.
pub trait PinIo {
    /// Number of ports on the platform.
    const PORTS: u8;

    /// Width of each port.
    const PINS_PER_PORT: u8 = 8;

    /// Reads the current digital level of `pin`.
    fn read_pin(&mut self, pin: PortPin) -> bool;

    /// Configures `pin` for the given mode.
    fn configure_pin(&mut self, pin: PortPin, mode: IoMode);

    /// Configures every pin of `port` whose bit is set in `mask`.
    fn configure_mask(&mut self, port: u8, mask: u8, mode: IoMode) {
        for pin in 0..Self::PINS_PER_PORT.min(8) {
            if mask & (1 << pin) != 0 {
                self.configure_pin(PortPin::new(port, pin), mode);
            }
        }
    }
}
