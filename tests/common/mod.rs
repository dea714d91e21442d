//! Shared test infrastructure for mcu-runloop integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use core::cell::{Cell, RefCell};

use mcu_runloop::{
    IoMode, PinIo, PortPin, RunLoop, RunLoopConfig, TickCounter, TickTimer, TimerReload,
};

// ============================================================================
// Clock
// ============================================================================

/// 12 MHz with a /12 prescaler: exactly 1000 timer counts per millisecond
pub const TEN_MS: TimerReload = TimerReload::new(12_000_000, 12, 10);
pub const ONE_MS: TimerReload = TimerReload::new(12_000_000, 12, 1);

/// Simulates timer interrupts until the counter reaches `target`
pub fn advance_to(counter: &TickCounter, target: u32) {
    while counter.now() < target {
        counter.on_tick();
    }
}

/// Run-loop over fresh mocks with the default configuration
pub fn test_loop(counter: &TickCounter) -> RunLoop<'_, MockTimer, MockPins> {
    RunLoop::new(counter, MockTimer::new(), MockPins::new(), RunLoopConfig::default())
}

// ============================================================================
// Mock Timer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCall {
    Arm(u16),
    Start,
    Stop,
}

/// Mock timer that records every call
#[derive(Debug, Default)]
pub struct MockTimer {
    calls: heapless::Vec<TimerCall, 32>,
    running: bool,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[TimerCall] {
        &self.calls
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl TickTimer for MockTimer {
    fn arm(&mut self, reload: u16) {
        let _ = self.calls.push(TimerCall::Arm(reload));
    }

    fn start(&mut self) {
        self.running = true;
        let _ = self.calls.push(TimerCall::Start);
    }

    fn stop(&mut self) {
        self.running = false;
        let _ = self.calls.push(TimerCall::Stop);
    }
}

// ============================================================================
// Mock Pins
// ============================================================================

/// Four 8-bit ports whose levels the test sets directly
pub struct MockPins {
    levels: [u8; 4],
    configured: heapless::Vec<(PortPin, IoMode), 32>,
    reads: usize,
}

impl MockPins {
    pub fn new() -> Self {
        Self {
            levels: [0; 4],
            configured: heapless::Vec::new(),
            reads: 0,
        }
    }

    pub fn with_levels(levels: [u8; 4]) -> Self {
        Self {
            levels,
            ..Self::new()
        }
    }

    pub fn set(&mut self, port: u8, pin: u8, high: bool) {
        let mask = PortPin::new(port, pin).mask();
        if high {
            self.levels[port as usize] |= mask;
        } else {
            self.levels[port as usize] &= !mask;
        }
    }

    pub fn configured(&self) -> &[(PortPin, IoMode)] {
        &self.configured
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl PinIo for MockPins {
    const PORTS: u8 = 4;

    fn read_pin(&mut self, pin: PortPin) -> bool {
        self.reads += 1;
        self.levels[pin.port as usize] & pin.mask() != 0
    }

    fn configure_pin(&mut self, pin: PortPin, mode: IoMode) {
        let _ = self.configured.push((pin, mode));
    }
}

// ============================================================================
// Firing log
// ============================================================================

/// Records which callback fired at which tick
pub struct FireLog<'c> {
    counter: &'c TickCounter,
    entries: RefCell<heapless::Vec<(&'static str, u32), 64>>,
}

impl<'c> FireLog<'c> {
    pub fn new(counter: &'c TickCounter) -> Self {
        Self {
            counter,
            entries: RefCell::new(heapless::Vec::new()),
        }
    }

    pub fn record(&self, name: &'static str) {
        let _ = self.entries.borrow_mut().push((name, self.counter.now()));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.borrow().iter().map(|(name, _)| *name).collect()
    }

    pub fn entries(&self) -> Vec<(&'static str, u32)> {
        self.entries.borrow().to_vec()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

/// Counts how many times it fired
#[derive(Default)]
pub struct Counter {
    hits: Cell<u32>,
}

impl Counter {
    pub fn hits(&self) -> u32 {
        self.hits.get()
    }
}

impl mcu_runloop::Callback for Counter {
    fn fire(&self) {
        self.hits.set(self.hits.get() + 1);
    }
}
