//! Core transfer engine: handle lifecycle and blocking transfers.
//!
//! One [`Engine`] drives one peripheral instance. The `state` field is the
//! single source of truth for which operations are legal; at most one
//! transfer of any mode is in flight per handle. Interrupt-driven and
//! DMA-offloaded entry points live in the sibling `interrupt` and `dma`
//! modules, but every mode funnels completion and failure through the
//! same terminal helpers here, so exactly one terminal callback fires per
//! initiated transfer.

use embedded_hal::delay::DelayNs;

use super::buffer::{RxView, TxView};
use super::callbacks::{CallbackId, CallbackTable};
use super::config::{Config, State};
use super::error::{Error, Result, code};
use crate::hal::{Direction, DmaChannel, Flag, IrqSource, RegisterBus, TickSource};

/// Transfer engine handle for one peripheral instance.
///
/// Generic over the register bus `B`, the DMA channel type `D` (use
/// [`NoDma`](crate::hal::NoDma) when no channel is ever bound) and the
/// tick source `T`. `new` is const, so a handle can live in a `static`
/// when wrapped in a suitable cell.
pub struct Engine<B: RegisterBus, D: DmaChannel, T: TickSource> {
    pub(crate) bus: B,
    pub(crate) clock: T,
    pub(crate) dma_tx: Option<D>,
    pub(crate) dma_rx: Option<D>,
    pub(crate) state: State,
    pub(crate) error_code: u32,
    pub(crate) config: Config,
    pub(crate) tx: TxView,
    pub(crate) rx: RxView,
    pub(crate) callbacks: CallbackTable<B, D, T>,
    pub(crate) locked: bool,
}

// SAFETY: the raw pointers inside the buffer views refer to caller-owned
// regions whose validity is tied to the in-flight transfer contract of the
// non-blocking entry points, not to the thread the handle lives on. All
// other fields are owned values.
unsafe impl<B, D, T> Send for Engine<B, D, T>
where
    B: RegisterBus + Send,
    D: DmaChannel + Send,
    T: TickSource + Send,
{
}

impl<B: RegisterBus, D: DmaChannel, T: TickSource> Engine<B, D, T> {
    /// Create a handle in the `Reset` state. No hardware is touched until
    /// [`Self::init`].
    #[must_use]
    pub const fn new(bus: B, clock: T) -> Self {
        Self {
            bus,
            clock,
            dma_tx: None,
            dma_rx: None,
            state: State::Reset,
            error_code: code::NONE,
            config: Config::new(),
            tx: TxView::new(),
            rx: RxView::new(),
            callbacks: CallbackTable::new(),
            locked: false,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Initialize the peripheral and move the handle to `Ready`.
    ///
    /// On the `Reset` edge this resets the data-path callback slots and
    /// runs the `MspInit` hook before touching the peripheral. Re-init
    /// from an idle state re-applies the configuration without re-running
    /// the hook; `error_code` is cleared either way.
    ///
    /// # Errors
    /// - `Busy` - a transfer is in flight
    pub fn init<DL: DelayNs>(&mut self, config: Config, delay: &mut DL) -> Result<()> {
        if self.state.is_transfer_active() {
            return Err(Error::Busy);
        }

        if self.state == State::Reset {
            self.locked = false;
            self.callbacks.reset_data_path();
            self.dispatch(CallbackId::MspInit);
        }

        self.bus.deactivate();
        self.disarm_all();
        for flag in Flag::ALL {
            self.bus.clear_flag(flag);
        }
        self.bus.set_loopback(config.loopback);
        if config.settle_us > 0 {
            delay.delay_us(config.settle_us);
        }

        self.config = config;
        self.error_code = code::NONE;
        self.tx.reset();
        self.rx.reset();
        self.state = State::Ready;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "engine initialized (loopback={}, settle={}us)",
            config.loopback,
            config.settle_us
        );

        Ok(())
    }

    /// Tear the peripheral down and return the handle to `Reset`.
    ///
    /// Runs the `MspDeInit` hook on the edge out of an initialized state.
    /// A handle already in `Reset` is left untouched.
    ///
    /// # Errors
    /// - `Busy` - a transfer is in flight
    pub fn deinit(&mut self) -> Result<()> {
        if self.state.is_transfer_active() {
            return Err(Error::Busy);
        }
        if self.state == State::Reset {
            return Ok(());
        }

        self.bus.deactivate();
        self.disarm_all();
        self.dispatch(CallbackId::MspDeInit);

        self.error_code = code::NONE;
        self.tx.reset();
        self.rx.reset();
        self.state = State::Reset;
        self.locked = false;

        #[cfg(feature = "defmt")]
        defmt::info!("engine deinitialized");

        Ok(())
    }

    /// Bind the transmit DMA channel. Presence of a channel is what makes
    /// the handle DMA-capable in that direction.
    ///
    /// # Errors
    /// - `Busy` - a transfer is in flight
    pub fn bind_dma_tx(&mut self, channel: D) -> Result<()> {
        if self.state.is_transfer_active() {
            return Err(Error::Busy);
        }
        self.dma_tx = Some(channel);
        Ok(())
    }

    /// Bind the receive DMA channel.
    ///
    /// # Errors
    /// - `Busy` - a transfer is in flight
    pub fn bind_dma_rx(&mut self, channel: D) -> Result<()> {
        if self.state.is_transfer_active() {
            return Err(Error::Busy);
        }
        self.dma_rx = Some(channel);
        Ok(())
    }

    /// Route the transmitter into the receiver for self-test.
    ///
    /// # Errors
    /// - `InvalidState` - handle is not `Ready`
    pub fn enable_loopback(&mut self) -> Result<()> {
        if self.state != State::Ready {
            return Err(Error::InvalidState);
        }
        self.bus.set_loopback(true);
        self.config.loopback = true;
        Ok(())
    }

    /// Restore normal transmit/receive routing.
    ///
    /// # Errors
    /// - `InvalidState` - handle is not `Ready`
    pub fn disable_loopback(&mut self) -> Result<()> {
        if self.state != State::Ready {
            return Err(Error::InvalidState);
        }
        self.bus.set_loopback(false);
        self.config.loopback = false;
        Ok(())
    }

    // =========================================================================
    // Blocking Transfers
    // =========================================================================

    /// Transmit `data`, polling the hardware until done or `timeout`
    /// milliseconds elapse.
    ///
    /// The terminal callback (`TxComplete` or `Error`) fires before this
    /// returns, same as in the non-blocking modes. On timeout the handle
    /// returns to `Ready` with `code::TIMEOUT` latched; the units already
    /// moved are not rolled back, inspect [`Self::tx_count`].
    ///
    /// # Errors
    /// - `Busy` - handle not `Ready`, or re-entered
    /// - `InvalidParameter` - empty buffer
    /// - `Timeout` - a hardware flag never asserted within `timeout`
    /// - `Hardware` - an error flag latched mid-transfer (handle goes to
    ///   `Error`)
    pub fn transmit(&mut self, data: &[u8], timeout: u32) -> Result<()> {
        self.accept(data.len())?;
        self.state = State::BusyTx;
        self.tx.load(data.as_ptr(), data.len());
        self.bus.activate();

        let start = self.clock.now();
        while !self.tx.is_done() {
            if let Err(err) = self.wait_flag(Flag::TxEmpty, start, timeout) {
                return self.finish_blocking_failure(Direction::Tx, err);
            }
            if let Some(unit) = self.tx.next_unit() {
                self.bus.write_data(unit);
            }
        }
        if let Err(err) = self.wait_flag(Flag::TransferComplete, start, timeout) {
            return self.finish_blocking_failure(Direction::Tx, err);
        }
        self.bus.clear_flag(Flag::TransferComplete);

        self.unlock();
        self.end_tx();
        Ok(())
    }

    /// Receive into `buffer`, polling the hardware until done or `timeout`
    /// milliseconds elapse.
    ///
    /// Mirrors [`Self::transmit`]; see there for the failure contract.
    ///
    /// # Errors
    /// - `Busy` - handle not `Ready`, or re-entered
    /// - `InvalidParameter` - empty buffer
    /// - `Timeout` - a hardware flag never asserted within `timeout`
    /// - `Hardware` - an error flag latched mid-transfer
    pub fn receive(&mut self, buffer: &mut [u8], timeout: u32) -> Result<()> {
        self.accept(buffer.len())?;
        self.state = State::BusyRx;
        self.rx.load(buffer.as_mut_ptr(), buffer.len());
        self.bus.activate();

        let start = self.clock.now();
        while !self.rx.is_done() {
            if let Err(err) = self.wait_flag(Flag::RxNotEmpty, start, timeout) {
                return self.finish_blocking_failure(Direction::Rx, err);
            }
            let unit = self.bus.read_data();
            self.rx.store(unit);
        }
        if let Err(err) = self.wait_flag(Flag::TransferComplete, start, timeout) {
            return self.finish_blocking_failure(Direction::Rx, err);
        }
        self.bus.clear_flag(Flag::TransferComplete);

        self.unlock();
        self.end_rx();
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Latched error bits (`error::code` constants). Accumulates across
    /// transfers until [`Self::clear_errors`] or a successful re-init.
    #[inline]
    pub fn error_code(&self) -> u32 {
        self.error_code
    }

    /// Clear the latched error bits.
    #[inline]
    pub fn clear_errors(&mut self) {
        self.error_code = code::NONE;
    }

    /// Units moved by the current or most recent transmit transfer.
    #[inline]
    pub fn tx_count(&self) -> usize {
        self.tx.count()
    }

    /// Units moved by the current or most recent receive transfer.
    #[inline]
    pub fn rx_count(&self) -> usize {
        self.rx.count()
    }

    /// Active configuration as applied by the last `init` (loopback
    /// toggles update it).
    #[inline]
    pub fn config(&self) -> Config {
        self.config
    }

    /// Borrow the register bus, e.g. for platform glue.
    #[inline]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Gate for every transfer-initiating entry point. Nothing is mutated
    /// unless the transfer is accepted.
    pub(crate) fn accept(&mut self, len: usize) -> Result<()> {
        if self.locked {
            return Err(Error::Busy);
        }
        if self.state != State::Ready {
            return Err(Error::Busy);
        }
        if len == 0 {
            return Err(Error::InvalidParameter);
        }
        self.locked = true;
        Ok(())
    }

    pub(crate) fn unlock(&mut self) {
        self.locked = false;
    }

    pub(crate) fn disarm_all(&mut self) {
        for source in IrqSource::ALL {
            self.bus.disable_interrupt(source);
        }
    }

    /// Read-and-clear the hardware error flags, returning their latched
    /// `error::code` bits (0 when clean).
    pub(crate) fn sample_error_flags(&mut self) -> u32 {
        let mut bits = code::NONE;
        for flag in [Flag::Overrun, Flag::Underrun, Flag::FrameError] {
            if self.bus.read_flag(flag) {
                self.bus.clear_flag(flag);
                bits |= error_bit(flag);
            }
        }
        bits
    }

    /// Poll until `flag` asserts, an error flag latches, or the budget
    /// runs out. Error causes are latched into `error_code` before the
    /// error return; a latched error flag beats a simultaneously-ready
    /// data flag.
    pub(crate) fn wait_flag(&mut self, flag: Flag, start: u32, timeout: u32) -> Result<()> {
        loop {
            let bits = self.sample_error_flags();
            if bits != code::NONE {
                self.error_code |= bits;
                return Err(Error::Hardware);
            }
            if self.bus.read_flag(flag) {
                return Ok(());
            }
            if self.clock.now().wrapping_sub(start) > timeout {
                self.error_code |= code::TIMEOUT;
                return Err(Error::Timeout);
            }
        }
    }

    /// Terminal success path for a transmit transfer: idle state first,
    /// then the callback.
    pub(crate) fn end_tx(&mut self) {
        self.tx.clear();
        self.state = State::Ready;
        self.dispatch(CallbackId::TxComplete);
    }

    /// Terminal success path for a receive transfer.
    pub(crate) fn end_rx(&mut self) {
        self.rx.clear();
        self.state = State::Ready;
        self.dispatch(CallbackId::RxComplete);
    }

    /// Terminal failure path for the asynchronous modes: latch `bits`,
    /// disarm everything, go to `Error` and fire the Error callback.
    pub(crate) fn fail(&mut self, bits: u32) {
        self.error_code |= bits;
        self.disarm_all();
        self.tx.clear();
        self.rx.clear();
        self.state = State::Error;

        #[cfg(feature = "defmt")]
        defmt::warn!("transfer failed, error_code={=u32:#x}", self.error_code);

        self.dispatch(CallbackId::Error);
    }

    /// Terminal failure path for the blocking loops. Timeouts leave the
    /// handle `Ready` (the caller got the error as a return value and may
    /// retry directly); hardware errors park it in `Error` until re-init.
    fn finish_blocking_failure(&mut self, direction: Direction, err: Error) -> Result<()> {
        match direction {
            Direction::Tx => self.tx.clear(),
            Direction::Rx => self.rx.clear(),
        }
        self.disarm_all();
        self.state = if err == Error::Timeout {
            State::Ready
        } else {
            State::Error
        };
        self.unlock();

        #[cfg(feature = "defmt")]
        defmt::warn!(
            "blocking transfer failed ({}), error_code={=u32:#x}",
            err,
            self.error_code
        );

        self.dispatch(CallbackId::Error);
        Err(err)
    }
}

/// Map a hardware error flag to its latched `error::code` bit.
pub(crate) const fn error_bit(flag: Flag) -> u32 {
    match flag {
        Flag::Overrun => code::OVERRUN,
        Flag::Underrun => code::UNDERRUN,
        Flag::FrameError => code::FRAME,
        _ => code::NONE,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
