#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`TimerReload`**: Reload value and drift correction for a 16-bit tick timer, computed at compile time
//! - **`TickCounter`**: Millisecond counter shared between the tick interrupt and the main loop
//! - **`Clock`**: Main-loop handle that arms, pauses and resumes the tick timer
//! - **`TimedQueue`**: Due-time ordered callbacks, soonest first, growing on demand
//! - **`EventRegistry`**: Watched pins with a packed one-bit-per-pin level cache
//! - **`RunLoop`**: Ties the above together; `cycle()` polls pins, then fires due callbacks
//! - **`TickTimer`** / **`PinIo`**: Traits to implement for your timer and GPIO hardware
//! - **`Callback`**: Anything callable with no arguments, including plain closures
//!
//! Queue and registry capacity doubles when exhausted, up to `MAX_ENTRIES`.
//! Growing past that limit or failing to allocate panics.

extern crate alloc;

mod fmt;

pub mod clock;
pub mod hardware;
pub mod queue;
pub mod registry;
pub mod runloop;
pub mod slots;
pub mod time;
pub mod types;

pub use clock::{Clock, TIMER_RANGE, TickCounter, TimerReload};
pub use hardware::{PinIo, TickTimer};
pub use queue::{ScheduledCallback, TimedQueue};
pub use registry::{EventRegistry, PinStateCache};
pub use runloop::{DEFAULT_POLL_INTERVAL, RunLoop, RunLoopConfig};
pub use slots::{DEFAULT_CAPACITY, MAX_ENTRIES, next_capacity};
pub use time::{Ticks, seconds_to_ticks};
pub use types::{Callback, IoMode, LoopState, PortPin, RegisterError};
