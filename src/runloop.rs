//! The cooperative run-loop driver.
//!
//! [`RunLoop`] owns the clock, the timed-callback queue and the event
//! registry. Each [`cycle`](RunLoop::cycle) polls the registered pins (rate
//! limited) and then fires the timed callbacks that have come due.
//!
//! All methods take `&self`, so callbacks can capture a reference to the loop
//! and schedule, register, pause or resume from inside a callback. No internal
//! borrow is held while a callback runs.

use core::cell::{Cell, RefCell};

use crate::clock::{Clock, TickCounter};
use crate::hardware::{PinIo, TickTimer};
use crate::queue::TimedQueue;
use crate::registry::EventRegistry;
use crate::slots::DEFAULT_CAPACITY;
use crate::time::{Ticks, deadline, seconds_to_ticks};
use crate::types::{Callback, IoMode, LoopState, PortPin, RegisterError};

/// Ticks between two pin scans while the clock runs.
pub const DEFAULT_POLL_INTERVAL: Ticks = 100;

/// Run-loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunLoopConfig {
    /// Minimum ticks between pin scans. Ignored while the clock is paused.
    pub poll_interval: Ticks,

    /// Initial capacity of both the timed queue and the event registry.
    pub initial_capacity: usize,
}

impl RunLoopConfig {
    /// Creates the default configuration.
    pub const fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            initial_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Sets the minimum ticks between pin scans.
    pub const fn with_poll_interval(mut self, ticks: Ticks) -> Self {
        self.poll_interval = ticks;
        self
    }

    /// Sets the initial storage capacity.
    pub const fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A cooperative run-loop servicing timed callbacks and pin-change events.
///
/// # Type Parameters
/// * `'a` - Lifetime of the tick counter and of every registered callback
/// * `T` - Timer driving the tick interrupt
/// * `P` - GPIO access for polled pins
pub struct RunLoop<'a, T: TickTimer, P: PinIo> {
    clock: RefCell<Clock<'a, T>>,
    pins: RefCell<P>,
    queue: RefCell<TimedQueue<'a>>,
    registry: RefCell<EventRegistry<'a>>,
    state: Cell<LoopState>,
    last_scan: Cell<Ticks>,
    config: RunLoopConfig,
}

impl<'a, T: TickTimer, P: PinIo> RunLoop<'a, T, P> {
    /// Creates an uninitialized run-loop.
    ///
    /// Storage is allocated here, so callbacks can be scheduled and pins
    /// registered before [`start`](Self::start). The timer is not touched
    /// until [`init`](Self::init).
    pub fn new(counter: &'a TickCounter, timer: T, pins: P, config: RunLoopConfig) -> Self {
        Self {
            clock: RefCell::new(Clock::new(counter, timer)),
            pins: RefCell::new(pins),
            queue: RefCell::new(TimedQueue::with_capacity(config.initial_capacity)),
            registry: RefCell::new(EventRegistry::with_capacity(config.initial_capacity)),
            state: Cell::new(LoopState::Uninitialized),
            last_scan: Cell::new(0),
            config,
        }
    }

    /// Arms the clock. Does nothing once the loop is running.
    pub fn init(&self) {
        if self.state.get() != LoopState::Uninitialized {
            return;
        }

        let mut clock = self.clock.borrow_mut();
        clock.init();
        self.last_scan.set(clock.now());
        self.state.set(LoopState::Running);
    }

    /// Initializes the loop and cycles forever.
    pub fn start(&self) -> ! {
        self.init();
        loop {
            self.cycle();
        }
    }

    /// Runs one iteration: pin poll first, then due timed callbacks.
    pub fn cycle(&self) {
        self.init();

        let now = self.now();
        self.poll_pins(now);
        self.service_due(now);
    }

    /// Scans the registered pins if the poll interval has elapsed or the
    /// clock is paused, firing the callback of every pin whose level changed.
    ///
    /// Returns the number of callbacks fired.
    pub fn poll_pins(&self, now: Ticks) -> usize {
        let paused = self.clock.borrow().is_paused();
        if !paused && now.saturating_sub(self.last_scan.get()) < self.config.poll_interval {
            return 0;
        }
        self.last_scan.set(now);

        // Pins registered by a callback during this scan wait for the next one
        let count = self.registry.borrow().len();
        let mut fired = 0;
        for index in 0..count {
            let changed = {
                let mut registry = self.registry.borrow_mut();
                registry.pin(index).and_then(|pin| {
                    let level = self.pins.borrow_mut().read_pin(pin);
                    registry.observe(index, level)
                })
            };

            if let Some(callback) = changed {
                callback.fire();
                fired += 1;
            }
        }
        fired
    }

    /// Fires the timed callbacks due at `now`, soonest first.
    ///
    /// Callbacks scheduled while this runs fire on a later pass, even with a
    /// zero delay. Returns the number of callbacks fired.
    pub fn service_due(&self, now: Ticks) -> usize {
        let due = self.queue.borrow().due_count(now);
        for _ in 0..due {
            let next = self.queue.borrow_mut().pop_due(now);
            if let Some(callback) = next {
                callback.fire();
            }
        }
        due
    }

    /// Schedules `callback` to fire `seconds` from now, rounded to the nearest
    /// millisecond.
    ///
    /// # Panics
    /// Panics when the queue cannot grow any further. Never call from an
    /// interrupt handler.
    pub fn schedule(&self, callback: &'a dyn Callback, seconds: f32) {
        self.schedule_millis(callback, seconds_to_ticks(seconds));
    }

    /// Schedules `callback` to fire `millis` ticks from now.
    pub fn schedule_millis(&self, callback: &'a dyn Callback, millis: Ticks) {
        let due = deadline(self.now(), millis);
        self.queue.borrow_mut().schedule_at(callback, due);
    }

    /// Watches `pin` of `port` and fires `callback` whenever its level changes.
    ///
    /// The pin is configured as a digital input and its current level is
    /// recorded, so only later changes fire the callback. With
    /// `fire_immediately` the callback also runs once before returning.
    ///
    /// # Errors
    /// Rejects ports and pins outside the platform range; nothing is
    /// registered in that case.
    ///
    /// # Panics
    /// Panics when the registry cannot grow any further.
    pub fn register(
        &self,
        callback: &'a dyn Callback,
        port: u8,
        pin: u8,
        fire_immediately: bool,
    ) -> Result<(), RegisterError> {
        let pin = match PortPin::new(port, pin).validate(P::PORTS, P::PINS_PER_PORT) {
            Ok(pin) => pin,
            Err(err) => {
                warn!("register: rejected port {} pin {}", port, pin);
                return Err(err);
            }
        };

        let level = {
            let mut pins = self.pins.borrow_mut();
            pins.configure_pin(pin, IoMode::DigitalInput);
            pins.read_pin(pin)
        };
        self.registry.borrow_mut().register(pin, callback, level);

        if fire_immediately {
            callback.fire();
        }
        Ok(())
    }

    /// Stops the clock. Pins are then polled on every cycle.
    pub fn pause(&self) {
        if self.state.get() == LoopState::Running {
            self.clock.borrow_mut().pause();
            self.state.set(LoopState::Paused);
        }
    }

    /// Restarts a paused clock.
    pub fn resume(&self) {
        if self.state.get() == LoopState::Paused {
            self.clock.borrow_mut().resume();
            self.state.set(LoopState::Running);
        }
    }

    /// Spins until `seconds` have elapsed on the tick counter.
    ///
    /// Nothing else runs meanwhile: scheduled callbacks and pin scans wait
    /// until the next cycle. Never returns while the clock is paused.
    pub fn wait_for(&self, seconds: f32) {
        self.wait_for_millis(seconds_to_ticks(seconds));
    }

    /// Spins until `millis` ticks have elapsed.
    pub fn wait_for_millis(&self, millis: Ticks) {
        let counter = self.clock.borrow().counter();
        let until = deadline(counter.now(), millis);
        while counter.now() < until {
            core::hint::spin_loop();
        }
    }

    /// Current tick count.
    pub fn now(&self) -> Ticks {
        self.clock.borrow().now()
    }

    pub fn state(&self) -> LoopState {
        self.state.get()
    }

    /// Number of timed callbacks waiting to fire.
    pub fn pending_callbacks(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Number of watched pins.
    pub fn registered_pins(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn config(&self) -> &RunLoopConfig {
        &self.config
    }

    /// Runs `f` with the timed queue borrowed.
    pub fn with_queue<R>(&self, f: impl FnOnce(&TimedQueue<'a>) -> R) -> R {
        f(&self.queue.borrow())
    }

    /// Runs `f` with the event registry borrowed.
    pub fn with_registry<R>(&self, f: impl FnOnce(&EventRegistry<'a>) -> R) -> R {
        f(&self.registry.borrow())
    }

    /// Runs `f` with the pin hardware borrowed.
    pub fn with_pins<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut self.pins.borrow_mut())
    }

    /// Runs `f` with the tick timer borrowed.
    pub fn with_timer<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(self.clock.borrow().timer())
    }
}
