//! Configuration and lifecycle-state types for the transfer engine.

/// Lifecycle state of one engine handle.
///
/// The state field is the single source of truth for which operations are
/// legal; every transfer-initiating call checks it on entry and no two
/// transfers can be accepted concurrently on the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Not yet initialized, or de-initialized
    #[default]
    Reset,
    /// Initialized and idle; transfers may be started
    Ready,
    /// A transmit transfer is in flight
    BusyTx,
    /// A receive transfer is in flight
    BusyRx,
    /// Both directions in flight (reserved for duplex peripherals)
    BusyTxRx,
    /// A mid-transfer error latched; re-init or abort to recover
    Error,
    /// Reserved timeout state; the engine reports timeouts via `error_code`
    Timeout,
}

impl State {
    /// Check whether a transfer in `direction` is currently in flight.
    #[inline]
    pub const fn is_busy(self, direction: crate::hal::Direction) -> bool {
        use crate::hal::Direction;
        match direction {
            Direction::Tx => matches!(self, State::BusyTx | State::BusyTxRx),
            Direction::Rx => matches!(self, State::BusyRx | State::BusyTxRx),
        }
    }

    /// Check whether any transfer is currently in flight.
    #[inline]
    pub const fn is_transfer_active(self) -> bool {
        matches!(self, State::BusyTx | State::BusyRx | State::BusyTxRx)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Engine configuration applied by `init`.
///
/// Peripheral-specific settings (bit rates, voltage classes, buffering
/// modes) belong to the register-bus implementation; the engine only
/// carries what it acts on itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Route the transmitter into the receiver for self-test
    pub loopback: bool,
    /// Analog settle time applied before the handle becomes Ready, in
    /// microseconds (0 to skip)
    pub settle_us: u32,
}

impl Config {
    /// Create a configuration with loopback off and no settle delay.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            loopback: false,
            settle_us: 0,
        }
    }

    /// Set the loopback routing.
    #[must_use]
    pub const fn with_loopback(mut self, enable: bool) -> Self {
        self.loopback = enable;
        self
    }

    /// Set the settle delay in microseconds.
    #[must_use]
    pub const fn with_settle_us(mut self, settle_us: u32) -> Self {
        self.settle_us = settle_us;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
