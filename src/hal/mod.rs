//! Hardware abstraction for the transfer engine.
//!
//! The engine never touches a register map directly. Everything it needs
//! from the peripheral goes through three narrow traits:
//!
//! - [`RegisterBus`]: flag/interrupt/data-register access on the
//!   peripheral's own register block
//! - [`DmaChannel`]: start/stop control of an externally-owned DMA channel
//! - [`TickSource`]: a monotonic millisecond counter for timeout arithmetic
//!
//! Implementations are supplied by the target HAL (or by a simulation when
//! testing on the host). All trait operations are non-blocking; the engine
//! owns every wait loop.

// =============================================================================
// Vocabulary Types
// =============================================================================

/// Transfer direction, as seen from the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Memory to peripheral
    Tx,
    /// Peripheral to memory
    Rx,
}

/// Status flags latched by the peripheral.
///
/// The first three report data-path progress; the remaining three are the
/// hardware error causes the engine recognizes. All flags are sticky until
/// cleared through [`RegisterBus::clear_flag`], except where an
/// implementation documents read-to-clear behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flag {
    /// Transmit data register empty - a unit may be written
    TxEmpty,
    /// Receive data register not empty - a unit may be read
    RxNotEmpty,
    /// The peripheral has flushed the last unit of the transfer
    TransferComplete,
    /// Receive overrun - a unit arrived before the previous one was read
    Overrun,
    /// Transmit underrun - the peripheral needed a unit that was not supplied
    Underrun,
    /// Framing/CRC error on a received unit
    FrameError,
}

impl Flag {
    /// Every flag, in the priority order the interrupt entry point uses
    /// (errors first).
    pub const ALL: [Flag; 6] = [
        Flag::Overrun,
        Flag::Underrun,
        Flag::FrameError,
        Flag::RxNotEmpty,
        Flag::TxEmpty,
        Flag::TransferComplete,
    ];

    /// Check whether this flag reports a hardware error.
    #[inline]
    pub const fn is_error(self) -> bool {
        matches!(self, Flag::Overrun | Flag::Underrun | Flag::FrameError)
    }
}

/// Interrupt sources the engine arms and disarms on the peripheral.
///
/// The three error flags share one source; the engine re-reads the
/// individual flags to find the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqSource {
    /// Interrupt on [`Flag::TxEmpty`]
    TxEmpty,
    /// Interrupt on [`Flag::RxNotEmpty`]
    RxNotEmpty,
    /// Interrupt on [`Flag::TransferComplete`]
    TransferComplete,
    /// Interrupt on any of the error flags
    Error,
}

impl IrqSource {
    /// Every interrupt source.
    pub const ALL: [IrqSource; 4] = [
        IrqSource::TxEmpty,
        IrqSource::RxNotEmpty,
        IrqSource::TransferComplete,
        IrqSource::Error,
    ];
}

// =============================================================================
// Register Bus
// =============================================================================

/// Access to one peripheral instance's register block.
///
/// An implementation wraps the CMSIS-style register map of a concrete
/// peripheral and is exclusively owned by the engine handle; it must never
/// alias another live accessor for the same instance.
pub trait RegisterBus {
    /// Enable the peripheral (set its activation bit). Idempotent.
    fn activate(&mut self);

    /// Disable the peripheral. Idempotent.
    fn deactivate(&mut self);

    /// Read a status flag.
    fn read_flag(&self, flag: Flag) -> bool;

    /// Clear a sticky status flag.
    fn clear_flag(&mut self, flag: Flag);

    /// Arm an interrupt source.
    fn enable_interrupt(&mut self, source: IrqSource);

    /// Disarm an interrupt source.
    fn disable_interrupt(&mut self, source: IrqSource);

    /// Check whether an interrupt source is currently armed.
    fn is_interrupt_enabled(&self, source: IrqSource) -> bool;

    /// Write one unit to the transmit data register.
    fn write_data(&mut self, unit: u8);

    /// Read one unit from the receive data register.
    fn read_data(&mut self) -> u8;

    /// Enable the DMA request line for one direction.
    fn enable_dma_request(&mut self, direction: Direction);

    /// Disable the DMA request line for one direction.
    fn disable_dma_request(&mut self, direction: Direction);

    /// Route the transmitter back into the receiver for self-test.
    fn set_loopback(&mut self, enable: bool);
}

// =============================================================================
// DMA Channel
// =============================================================================

/// Control surface of an externally-owned DMA channel.
///
/// The channel's completion, half-complete and error notifications are not
/// part of this trait; platform glue forwards them to
/// [`Engine::dma_event`](crate::Engine::dma_event) from whatever interrupt
/// or task context the target provides.
pub trait DmaChannel {
    /// Start a transfer between `buffer` and the peripheral data register.
    ///
    /// For [`Direction::Tx`] the buffer is only read; the pointer is `*mut`
    /// so one signature covers both directions.
    fn start(&mut self, direction: Direction, buffer: *mut u8, len: usize);

    /// Request the channel to stop. May complete asynchronously; the engine
    /// treats its own state as authoritative once a stop is issued.
    fn stop(&mut self);
}

/// Placeholder channel type for engines used without DMA.
///
/// Satisfies the type parameter when no channel is ever bound; its methods
/// are never reached because unbound channels fail parameter validation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDma;

impl DmaChannel for NoDma {
    fn start(&mut self, _direction: Direction, _buffer: *mut u8, _len: usize) {}
    fn stop(&mut self) {}
}

// =============================================================================
// Tick Source
// =============================================================================

/// Monotonic millisecond counter used for timeout arithmetic.
///
/// The engine only ever computes `now().wrapping_sub(start)`, so the counter
/// may wrap freely.
pub trait TickSource {
    /// Current tick value in milliseconds.
    fn now(&self) -> u32;
}

// =============================================================================
// Unit Tests
// =============================================================================
