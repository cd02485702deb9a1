//! Error types for the transfer engine.
//!
//! Two complementary views of failure exist:
//!
//! - [`Error`]: the synchronous result of an API call. `Busy`,
//!   `InvalidState` and `InvalidParameter` are rejected at the API boundary
//!   with no side effects; `Timeout`, `Hardware` and `Dma` describe a
//!   transfer that started and then failed.
//! - [`code`]: bit constants latched into the handle's `error_code`
//!   accumulator for mid-transfer failures. Bits accumulate across
//!   transfers and are cleared only by `clear_errors` or a successful
//!   re-init.

/// Unified error type returned by engine operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A transfer is already in flight, or the re-entrancy lock is held
    Busy,
    /// Operation not legal in the current lifecycle state
    InvalidState,
    /// Empty buffer, or no DMA channel bound for the requested direction
    InvalidParameter,
    /// A flag did not assert within the timeout budget
    Timeout,
    /// A hardware error flag latched mid-transfer (overrun/underrun/framing)
    Hardware,
    /// The DMA channel reported a transfer error. DMA transfers have no
    /// synchronous result to carry this, so it reaches callers through the
    /// Error callback and the latched [`code::DMA`] bit rather than a
    /// return value.
    Dma,
}

impl Error {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Error::Busy => "transfer already in flight",
            Error::InvalidState => "invalid state for operation",
            Error::InvalidParameter => "invalid parameter",
            Error::Timeout => "operation timed out",
            Error::Hardware => "hardware error flag latched",
            Error::Dma => "DMA transfer error",
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for engine operations
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// Latched Error Codes
// =============================================================================

/// Bit constants for the handle's latched `error_code` accumulator.
pub mod code {
    /// No error latched
    pub const NONE: u32 = 0;
    /// A wait on a hardware flag expired
    pub const TIMEOUT: u32 = 1 << 0;
    /// Receive overrun reported by hardware
    pub const OVERRUN: u32 = 1 << 1;
    /// Transmit underrun reported by hardware
    pub const UNDERRUN: u32 = 1 << 2;
    /// Framing/CRC error reported by hardware
    pub const FRAME: u32 = 1 << 3;
    /// DMA channel transfer error
    pub const DMA: u32 = 1 << 4;
}

// =============================================================================
// Unit Tests
// =============================================================================
