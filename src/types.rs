//! Core types shared by the queue, registry and driver.

/// A user action fired by the run-loop.
///
/// Callbacks take no arguments and return nothing. Every `Fn()` closure or
/// function pointer is a `Callback`; implement it directly for stateful
/// handlers.
pub trait Callback {
    /// Runs the callback to completion.
    fn fire(&self);
}

impl<F: Fn()> Callback for F {
    #[inline]
    fn fire(&self) {
        self()
    }
}

/// A single digital pin, addressed by port number and bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortPin {
    /// Port number.
    pub port: u8,

    /// Bit position within the port.
    pub pin: u8,
}

impl PortPin {
    /// Creates a new port/pin pair without range checks.
    #[inline]
    pub const fn new(port: u8, pin: u8) -> Self {
        Self { port, pin }
    }

    /// Checks the pair against a platform with `ports` ports of
    /// `pins_per_port` pins each.
    pub fn validate(self, ports: u8, pins_per_port: u8) -> Result<Self, RegisterError> {
        if self.port >= ports {
            return Err(RegisterError::PortOutOfRange {
                port: self.port,
                ports,
            });
        }

        if self.pin >= pins_per_port {
            return Err(RegisterError::PinOutOfRange {
                pin: self.pin,
                pins_per_port,
            });
        }

        Ok(self)
    }

    /// Single-bit mask selecting this pin within its port register.
    #[inline]
    pub const fn mask(self) -> u8 {
        1 << (self.pin & 0x07)
    }
}

/// Pin configuration requested from the hardware layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoMode {
    /// Open-drain digital input.
    DigitalInput,

    /// Analog input feeding the ADC.
    AnalogInput,

    /// Push-pull digital output.
    DigitalOutput,
}

/// Lifecycle of a run-loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopState {
    /// Constructed, clock not yet armed. Callbacks may already be scheduled.
    Uninitialized,
    /// Clock ticking, cycles servicing callbacks and pins.
    Running,
    /// Clock stopped. Pins are polled every cycle.
    Paused,
}

/// Rejected pin registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// Port number past the last port of the platform.
    PortOutOfRange {
        /// Requested port
        port: u8,
        /// Number of ports on the platform
        ports: u8,
    },

    /// Pin number past the width of a port.
    PinOutOfRange {
        /// Requested pin
        pin: u8,
        /// Pins per port on the platform
        pins_per_port: u8,
    },
}

impl core::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RegisterError::PortOutOfRange { port, ports } => {
                write!(f, "port {} out of range (platform has {} ports)", port, ports)
            }
            RegisterError::PinOutOfRange { pin, pins_per_port } => {
                write!(
                    f,
                    "pin {} out of range (ports have {} pins)",
                    pin, pins_per_port
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RegisterError {}
