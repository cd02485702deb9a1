//! Interrupt-driven transfers.
//!
//! The non-blocking entry points arm the relevant interrupt sources and
//! return immediately; progress happens when the platform's interrupt
//! vector calls [`Engine::handle_interrupt`]. That routine inspects the
//! latched flags in a fixed priority order (error flags first, then
//! data-ready, then transfer-complete) and feeds the matching [`Event`]
//! into [`Engine::process_event`], the synchronous transition function.
//! Targets without a conventional vector (task queues, channels) can
//! deliver events straight to `process_event`.

use super::config::State;
use super::engine::Engine;
use super::error::{Error, Result};
use crate::hal::{DmaChannel, Flag, IrqSource, RegisterBus, TickSource};

/// Peripheral event delivered to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The transmit data register can take a unit
    TxReady,
    /// The receive data register holds a unit
    RxReady,
    /// The peripheral flushed the last unit of the transfer
    Complete,
    /// One or more hardware error flags latched
    ErrorFlag,
}

impl<B: RegisterBus, D: DmaChannel, T: TickSource> Engine<B, D, T> {
    /// Start an interrupt-driven transmit and return immediately.
    ///
    /// Completion is reported through the `TxComplete` callback, failure
    /// through the `Error` callback; exactly one of the two fires.
    ///
    /// # Safety
    /// `buffer..buffer+len` must stay valid and unmodified until the
    /// terminal callback fires or the transfer is stopped via
    /// [`Self::dma_stop`].
    ///
    /// # Errors
    /// - `Busy` - handle not `Ready`, or re-entered
    /// - `InvalidParameter` - null or empty buffer
    pub unsafe fn transmit_it(&mut self, buffer: *const u8, len: usize) -> Result<()> {
        if buffer.is_null() {
            return Err(Error::InvalidParameter);
        }
        self.accept(len)?;

        self.state = State::BusyTx;
        self.tx.load(buffer, len);
        self.bus.enable_interrupt(IrqSource::Error);
        self.bus.enable_interrupt(IrqSource::TxEmpty);
        self.bus.activate();
        self.unlock();
        Ok(())
    }

    /// Start an interrupt-driven receive and return immediately.
    ///
    /// # Safety
    /// `buffer..buffer+len` must stay valid and not be read until the
    /// terminal callback fires or the transfer is stopped via
    /// [`Self::dma_stop`].
    ///
    /// # Errors
    /// - `Busy` - handle not `Ready`, or re-entered
    /// - `InvalidParameter` - null or empty buffer
    pub unsafe fn receive_it(&mut self, buffer: *mut u8, len: usize) -> Result<()> {
        if buffer.is_null() {
            return Err(Error::InvalidParameter);
        }
        self.accept(len)?;

        self.state = State::BusyRx;
        self.rx.load(buffer, len);
        self.bus.enable_interrupt(IrqSource::Error);
        self.bus.enable_interrupt(IrqSource::RxNotEmpty);
        self.bus.activate();
        self.unlock();
        Ok(())
    }

    /// Interrupt-vector entry point.
    ///
    /// Call from the peripheral's interrupt handler. Error flags win over
    /// simultaneously-latched data flags, since a corrupted data register
    /// must not be consumed as valid data.
    pub fn handle_interrupt(&mut self) {
        if self.bus.is_interrupt_enabled(IrqSource::Error) {
            let pending = Flag::ALL
                .iter()
                .any(|flag| flag.is_error() && self.bus.read_flag(*flag));
            if pending {
                self.process_event(Event::ErrorFlag);
                return;
            }
        }

        if self.bus.is_interrupt_enabled(IrqSource::RxNotEmpty)
            && self.bus.read_flag(Flag::RxNotEmpty)
        {
            self.process_event(Event::RxReady);
        }

        if self.bus.is_interrupt_enabled(IrqSource::TxEmpty) && self.bus.read_flag(Flag::TxEmpty) {
            self.process_event(Event::TxReady);
        }

        if self.bus.is_interrupt_enabled(IrqSource::TransferComplete)
            && self.bus.read_flag(Flag::TransferComplete)
        {
            self.process_event(Event::Complete);
        }
    }

    /// Feed one peripheral event into the state machine.
    ///
    /// Events that do not match an in-flight transfer are stale and are
    /// discarded after clearing the flag they refer to.
    pub fn process_event(&mut self, event: Event) {
        match event {
            Event::TxReady => self.tx_step(),
            Event::RxReady => self.rx_step(),
            Event::Complete => self.complete_step(),
            Event::ErrorFlag => {
                let bits = self.sample_error_flags();
                if self.state.is_transfer_active() {
                    self.fail(bits);
                } else {
                    // Stale: flags already cleared by the sample, keep the
                    // cause latched for inspection.
                    self.error_code |= bits;
                    #[cfg(feature = "defmt")]
                    defmt::trace!("stale error event discarded");
                }
            }
        }
    }

    /// Move one unit out of the transmit view. After the last unit, the
    /// unit-ready source is swapped for the transfer-complete source.
    fn tx_step(&mut self) {
        if self.state != State::BusyTx || !self.tx.in_flight() {
            #[cfg(feature = "defmt")]
            defmt::trace!("stale tx event discarded");
            return;
        }

        if let Some(unit) = self.tx.next_unit() {
            self.bus.write_data(unit);
        }
        if self.tx.is_done() {
            self.bus.disable_interrupt(IrqSource::TxEmpty);
            self.bus.enable_interrupt(IrqSource::TransferComplete);
        }
    }

    /// Move one unit into the receive view; the last unit terminates the
    /// transfer.
    fn rx_step(&mut self) {
        if self.state != State::BusyRx || !self.rx.in_flight() {
            #[cfg(feature = "defmt")]
            defmt::trace!("stale rx event discarded");
            return;
        }

        let unit = self.bus.read_data();
        self.rx.store(unit);
        if self.rx.is_done() {
            self.bus.disable_interrupt(IrqSource::RxNotEmpty);
            self.bus.disable_interrupt(IrqSource::Error);
            self.bus.clear_flag(Flag::TransferComplete);
            self.end_rx();
        }
    }

    /// Finish a transmit once the peripheral confirms the flush.
    fn complete_step(&mut self) {
        self.bus.clear_flag(Flag::TransferComplete);
        if self.state != State::BusyTx || !self.tx.is_done() {
            #[cfg(feature = "defmt")]
            defmt::trace!("stale completion event discarded");
            return;
        }

        self.bus.disable_interrupt(IrqSource::TransferComplete);
        self.bus.disable_interrupt(IrqSource::Error);
        self.end_tx();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
