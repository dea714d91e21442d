//! Interrupt-driven millisecond clock with drift correction.
//!
//! [`TimerReload`] derives the 16-bit reload value for a requested tick
//! granularity. When the timer cannot hit the granularity exactly, the reload
//! value is rounded so each interrupt period runs slightly long, and the
//! counter compensates by adding one extra tick every `N` interrupts.
//!
//! [`TickCounter`] is the state shared with the interrupt handler. It lives in
//! a `static` and is only ever accessed inside a critical section, so reads
//! from the main loop are consistent on targets without 32-bit atomics.
//!
//! [`Clock`] is the main-loop handle pairing a counter with its timer.

use core::cell::Cell;
use core::num::NonZeroU32;

use critical_section::Mutex;

use crate::hardware::TickTimer;
use crate::time::Ticks;

/// Counts in one full period of a 16-bit timer.
pub const TIMER_RANGE: u32 = 1 << 16;

/// Timer reload parameters for a tick granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerReload {
    value: u16,
    counts_per_tick: u32,
    granularity_ms: u16,
    correction_interval: Option<NonZeroU32>,
}

impl TimerReload {
    /// Computes reload parameters for a timer clocked at
    /// `system_clock_hz / prescaler` that should interrupt every
    /// `granularity_ms` milliseconds.
    ///
    /// # Panics
    /// Panics on a zero argument, when one tick needs more than a full 16-bit
    /// timer period, or when the timer is too coarse for the correction to
    /// work. Evaluate it in a `const` item to turn these into build errors:
    ///
    /// ```
    /// use mcu_runloop::TimerReload;
    ///
    /// const RELOAD: TimerReload = TimerReload::new(22_118_400, 12, 1);
    /// assert_eq!(RELOAD.value(), 63_692);
    /// ```
    pub const fn new(system_clock_hz: u32, prescaler: u32, granularity_ms: u16) -> Self {
        assert!(system_clock_hz > 0, "system clock must be non-zero");
        assert!(prescaler > 0, "timer prescaler must be non-zero");
        assert!(granularity_ms > 0, "tick granularity must be non-zero");

        // Timer counts per tick as the fraction wanted / scale
        let wanted = granularity_ms as u64 * system_clock_hz as u64;
        let scale = prescaler as u64 * 1000;

        let counts = wanted.div_ceil(scale);
        assert!(
            counts <= TIMER_RANGE as u64,
            "tick period does not fit a 16-bit timer"
        );

        // Each interrupt runs `overrun / wanted` of a tick long
        let overrun = counts * scale - wanted;
        let correction_interval = if overrun == 0 {
            None
        } else {
            let interval = (2 * wanted + overrun) / (2 * overrun);
            assert!(interval > 0, "timer too coarse for tick granularity");
            if interval > u32::MAX as u64 {
                None
            } else {
                NonZeroU32::new(interval as u32)
            }
        };

        Self {
            value: (TIMER_RANGE - counts as u32) as u16,
            counts_per_tick: counts as u32,
            granularity_ms,
            correction_interval,
        }
    }

    /// Value loaded into the timer so it overflows after one tick.
    #[inline]
    pub const fn value(&self) -> u16 {
        self.value
    }

    /// Timer counts between two interrupts.
    #[inline]
    pub const fn counts_per_tick(&self) -> u32 {
        self.counts_per_tick
    }

    /// Milliseconds added to the counter per interrupt.
    #[inline]
    pub const fn granularity_ms(&self) -> u16 {
        self.granularity_ms
    }

    /// Interrupts between two correction ticks, `None` when the reload is exact.
    #[inline]
    pub const fn correction_interval(&self) -> Option<NonZeroU32> {
        self.correction_interval
    }
}

#[derive(Debug, Clone, Copy)]
struct TickState {
    millis: Ticks,
    countdown: u32,
}

impl TickState {
    const fn start(reload: &TimerReload) -> Self {
        Self {
            millis: 0,
            countdown: match reload.correction_interval {
                Some(interval) => interval.get(),
                None => 0,
            },
        }
    }
}

/// Millisecond counter shared between the tick interrupt and the main loop.
///
/// ```ignore
/// static COUNTER: TickCounter = TickCounter::new(TimerReload::new(22_118_400, 12, 1));
///
/// #[interrupt]
/// fn TIMER0() {
///     COUNTER.on_tick();
/// }
/// ```
pub struct TickCounter {
    reload: TimerReload,
    state: Mutex<Cell<TickState>>,
}

impl TickCounter {
    /// Creates a counter at zero.
    pub const fn new(reload: TimerReload) -> Self {
        Self {
            state: Mutex::new(Cell::new(TickState::start(&reload))),
            reload,
        }
    }

    /// Advances the counter by one timer period.
    ///
    /// Call this from the timer overflow interrupt and nowhere else.
    pub fn on_tick(&self) {
        let step = self.reload.granularity_ms as Ticks;

        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();

            state.millis = state.millis.saturating_add(step);

            if let Some(interval) = self.reload.correction_interval {
                state.countdown -= 1;
                if state.countdown == 0 {
                    state.millis = state.millis.saturating_add(step);
                    state.countdown = interval.get();
                }
            }

            cell.set(state);
        });
    }

    /// Milliseconds counted since the last reset.
    pub fn now(&self) -> Ticks {
        critical_section::with(|cs| self.state.borrow(cs).get().millis)
    }

    /// Reload parameters this counter was built with.
    #[inline]
    pub fn reload(&self) -> &TimerReload {
        &self.reload
    }

    /// Zeroes the counter and restarts the correction countdown.
    pub fn reset(&self) {
        critical_section::with(|cs| {
            self.state.borrow(cs).set(TickState::start(&self.reload));
        });
    }
}

/// Main-loop side of the clock: a counter plus the timer that drives it.
pub struct Clock<'c, T: TickTimer> {
    counter: &'c TickCounter,
    timer: T,
    paused: bool,
}

impl<'c, T: TickTimer> Clock<'c, T> {
    /// Pairs a counter with its timer. Nothing is armed until [`init`](Self::init).
    pub fn new(counter: &'c TickCounter, timer: T) -> Self {
        Self {
            counter,
            timer,
            paused: false,
        }
    }

    /// Resets the counter, loads the reload value and starts the timer.
    pub fn init(&mut self) {
        let reload = *self.counter.reload();

        self.counter.reset();
        self.timer.arm(reload.value());
        self.timer.start();
        self.paused = false;

        match reload.correction_interval() {
            Some(interval) => info!(
                "clock: reload {}, {} ms ticks, +1 tick every {} interrupts",
                reload.value(),
                reload.granularity_ms(),
                interval.get()
            ),
            None => info!(
                "clock: reload {}, {} ms ticks, exact",
                reload.value(),
                reload.granularity_ms()
            ),
        }
    }

    /// Stops the timer. The counter holds its value until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if !self.paused {
            self.timer.stop();
            self.paused = true;
            debug!("clock: paused at {}", self.counter.now());
        }
    }

    /// Restarts a paused timer.
    pub fn resume(&mut self) {
        if self.paused {
            self.timer.start();
            self.paused = false;
            debug!("clock: resumed at {}", self.counter.now());
        }
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn now(&self) -> Ticks {
        self.counter.now()
    }

    /// The shared counter.
    #[inline]
    pub fn counter(&self) -> &'c TickCounter {
        self.counter
    }

    /// The underlying timer.
    #[inline]
    pub fn timer(&self) -> &T {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct MockTimer {
        armed: Option<u16>,
        running: bool,
        starts: u32,
        stops: u32,
    }

    impl TickTimer for MockTimer {
        fn arm(&mut self, reload: u16) {
            self.armed = Some(reload);
        }

        fn start(&mut self) {
            self.running = true;
            self.starts += 1;
        }

        fn stop(&mut self) {
            self.running = false;
            self.stops += 1;
        }
    }

    // |reported - wall| <= one tick, all scaled by the system clock
    fn assert_within_one_tick(
        reload: &TimerReload,
        system_clock_hz: u32,
        prescaler: u32,
        interrupts: u64,
        reported: Ticks,
    ) {
        let wall_scaled =
            interrupts as i128 * reload.counts_per_tick() as i128 * prescaler as i128 * 1000;
        let reported_scaled = reported as i128 * system_clock_hz as i128;
        let tick_scaled = reload.granularity_ms() as i128 * system_clock_hz as i128;
        assert!(
            (reported_scaled - wall_scaled).abs() <= tick_scaled,
            "drift over {} interrupts: reported {} ms",
            interrupts,
            reported
        );
    }

    #[test]
    fn exact_reload_disables_correction() {
        let reload = TimerReload::new(12_000_000, 12, 10);
        assert_eq!(reload.counts_per_tick(), 10_000);
        assert_eq!(reload.value(), 55_536);
        assert_eq!(reload.correction_interval(), None);

        let counter = TickCounter::new(reload);
        for _ in 0..1000 {
            counter.on_tick();
        }
        assert_eq!(counter.now(), 10_000);
    }

    #[test]
    fn fractional_reload_gets_correction_interval() {
        // 22.1184 MHz / 12 gives 1843.2 counts per millisecond
        let reload = TimerReload::new(22_118_400, 12, 1);
        assert_eq!(reload.counts_per_tick(), 1844);
        assert_eq!(reload.value(), 63_692);
        assert_eq!(reload.correction_interval(), NonZeroU32::new(2304));
    }

    #[test]
    fn correction_adds_one_extra_tick_per_interval() {
        let reload = TimerReload::new(22_118_400, 12, 1);
        let counter = TickCounter::new(reload);

        for _ in 0..2303 {
            counter.on_tick();
        }
        assert_eq!(counter.now(), 2303);

        counter.on_tick();
        assert_eq!(counter.now(), 2305);

        for _ in 0..2304 {
            counter.on_tick();
        }
        assert_eq!(counter.now(), 4610);
    }

    #[test]
    fn corrected_clock_tracks_wall_time_within_one_tick() {
        for &(clock_hz, prescaler, granularity) in &[
            (22_118_400u32, 12u32, 1u16),
            (1_234_567, 1, 1),
            (24_500_000, 12, 10),
            (16_000_000, 12, 1),
            (11_059_200, 12, 5),
        ] {
            let reload = TimerReload::new(clock_hz, prescaler, granularity);
            let window = reload.correction_interval().map_or(1000, |n| n.get() as u64);
            let counter = TickCounter::new(reload);

            for _ in 0..window {
                counter.on_tick();
            }

            assert_within_one_tick(&reload, clock_hz, prescaler, window, counter.now());
        }
    }

    #[test]
    fn counter_saturates_instead_of_wrapping() {
        let counter = TickCounter::new(TimerReload::new(12_000_000, 12, 10));
        critical_section::with(|cs| {
            counter.state.borrow(cs).set(TickState {
                millis: Ticks::MAX - 5,
                countdown: 0,
            });
        });

        counter.on_tick();
        assert_eq!(counter.now(), Ticks::MAX);
        counter.on_tick();
        assert_eq!(counter.now(), Ticks::MAX);
    }

    #[test]
    fn reset_restarts_countdown() {
        let counter = TickCounter::new(TimerReload::new(22_118_400, 12, 1));
        for _ in 0..2000 {
            counter.on_tick();
        }
        counter.reset();
        assert_eq!(counter.now(), 0);

        for _ in 0..2304 {
            counter.on_tick();
        }
        assert_eq!(counter.now(), 2305);
    }

    #[test]
    #[should_panic(expected = "16-bit timer")]
    fn period_longer_than_timer_panics() {
        let _ = TimerReload::new(12_000_000, 1, 10);
    }

    #[test]
    #[should_panic(expected = "system clock")]
    fn zero_system_clock_panics() {
        let _ = TimerReload::new(0, 12, 1);
    }

    #[test]
    fn init_arms_and_starts_timer() {
        let counter = TickCounter::new(TimerReload::new(12_000_000, 12, 10));
        counter.on_tick();

        let mut clock = Clock::new(&counter, MockTimer::default());
        clock.init();

        assert_eq!(clock.now(), 0);
        assert_eq!(clock.timer().armed, Some(55_536));
        assert!(clock.timer().running);
        assert!(!clock.is_paused());
    }

    #[test]
    fn pause_and_resume_keep_counter() {
        let counter = TickCounter::new(TimerReload::new(12_000_000, 12, 10));
        let mut clock = Clock::new(&counter, MockTimer::default());
        clock.init();

        counter.on_tick();
        counter.on_tick();
        clock.pause();
        assert!(clock.is_paused());
        assert!(!clock.timer().running);
        assert_eq!(clock.now(), 20);

        // A second pause does not touch the timer again
        clock.pause();
        assert_eq!(clock.timer().stops, 1);

        clock.resume();
        assert!(!clock.is_paused());
        assert!(clock.timer().running);
        assert_eq!(clock.timer().starts, 2);
        assert_eq!(clock.timer().armed, Some(55_536));
        assert_eq!(clock.now(), 20);
    }
}
