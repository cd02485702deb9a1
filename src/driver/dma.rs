//! DMA-offloaded transfers.
//!
//! The engine never owns the channel's interrupt plumbing; platform glue
//! forwards the channel's notifications to [`Engine::dma_event`] as a
//! [`DmaEvent`]. The `state` field is the authoritative record of whether
//! a transfer is still in flight: once an abort has moved the handle to
//! `Error` (or a stop has returned it to `Ready`), any late notification
//! for the old transfer no longer matches a Busy state and is silently
//! discarded. That is what makes the abort sequence safe to race against
//! an in-flight completion.

use super::callbacks::CallbackId;
use super::config::State;
use super::engine::Engine;
use super::error::{Error, Result, code};
use crate::hal::{Direction, DmaChannel, Flag, RegisterBus, TickSource};

/// Budget for the peripheral's own transfer-complete flag to corroborate
/// a DMA channel completion, in milliseconds. A channel can finish before
/// the peripheral has flushed its last unit; this only needs to cover
/// that gap.
pub const DMA_COMPLETE_TIMEOUT_MS: u32 = 25;

/// Notification forwarded from a DMA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaEvent {
    /// The channel moved the full length
    Complete,
    /// The channel passed the half-way mark
    HalfComplete,
    /// The channel reported a transfer error
    Error,
}

impl<B: RegisterBus, D: DmaChannel, T: TickSource> Engine<B, D, T> {
    /// Start a DMA-offloaded transmit and return immediately.
    ///
    /// # Safety
    /// `buffer..buffer+len` must stay valid and unmodified until the
    /// terminal callback fires or the transfer is stopped via
    /// [`Self::dma_stop`].
    ///
    /// # Errors
    /// - `Busy` - handle not `Ready`, or re-entered
    /// - `InvalidParameter` - null or empty buffer, or no transmit channel
    ///   bound
    pub unsafe fn transmit_dma(&mut self, buffer: *mut u8, len: usize) -> Result<()> {
        if buffer.is_null() || self.dma_tx.is_none() {
            return Err(Error::InvalidParameter);
        }
        self.accept(len)?;

        self.state = State::BusyTx;
        self.tx.load(buffer, len);
        if let Some(channel) = self.dma_tx.as_mut() {
            channel.start(Direction::Tx, buffer, len);
        }
        self.bus.enable_dma_request(Direction::Tx);
        self.bus.activate();
        self.unlock();
        Ok(())
    }

    /// Start a DMA-offloaded receive and return immediately.
    ///
    /// # Safety
    /// `buffer..buffer+len` must stay valid and not be read until the
    /// terminal callback fires or the transfer is stopped via
    /// [`Self::dma_stop`].
    ///
    /// # Errors
    /// - `Busy` - handle not `Ready`, or re-entered
    /// - `InvalidParameter` - null or empty buffer, or no receive channel
    ///   bound
    pub unsafe fn receive_dma(&mut self, buffer: *mut u8, len: usize) -> Result<()> {
        if buffer.is_null() || self.dma_rx.is_none() {
            return Err(Error::InvalidParameter);
        }
        self.accept(len)?;

        self.state = State::BusyRx;
        self.rx.load(buffer, len);
        if let Some(channel) = self.dma_rx.as_mut() {
            channel.start(Direction::Rx, buffer, len);
        }
        self.bus.enable_dma_request(Direction::Rx);
        self.bus.activate();
        self.unlock();
        Ok(())
    }

    /// Deliver a DMA channel notification for one direction.
    ///
    /// Call from the channel's interrupt handler or task. Notifications
    /// that do not match an in-flight transfer in that direction are
    /// stale and are dropped.
    pub fn dma_event(&mut self, direction: Direction, event: DmaEvent) {
        if !self.state.is_busy(direction) {
            #[cfg(feature = "defmt")]
            defmt::trace!("stale dma event discarded ({})", event);
            return;
        }

        match event {
            DmaEvent::HalfComplete => {
                // Transfer still in flight, no state change; this feeds
                // double-buffering schemes.
                let id = match direction {
                    Direction::Tx => CallbackId::TxHalfComplete,
                    Direction::Rx => CallbackId::RxHalfComplete,
                };
                self.dispatch(id);
            }
            DmaEvent::Complete => self.dma_complete(direction),
            DmaEvent::Error => self.dma_abort(direction),
        }
    }

    /// Cooperative cancellation of an in-flight transfer.
    ///
    /// Disarms interrupt sources and DMA request lines, stops both bound
    /// channels, deactivates the peripheral and returns the handle to
    /// `Ready`. No callback fires; the cursors stay readable through
    /// [`Self::tx_count`]/[`Self::rx_count`].
    ///
    /// # Errors
    /// - `InvalidState` - handle is in `Reset`
    pub fn dma_stop(&mut self) -> Result<()> {
        if self.state == State::Reset {
            return Err(Error::InvalidState);
        }

        self.disarm_all();
        self.bus.disable_dma_request(Direction::Tx);
        self.bus.disable_dma_request(Direction::Rx);
        if let Some(channel) = self.dma_tx.as_mut() {
            channel.stop();
        }
        if let Some(channel) = self.dma_rx.as_mut() {
            channel.stop();
        }
        self.bus.deactivate();

        self.tx.clear();
        self.rx.clear();
        self.state = State::Ready;
        self.locked = false;
        Ok(())
    }

    /// Channel completion. The channel finishing does not mean the
    /// peripheral has flushed its last unit, so corroborate against the
    /// transfer-complete flag with a short budget before finalizing.
    fn dma_complete(&mut self, direction: Direction) {
        self.bus.disable_dma_request(direction);

        let start = self.clock.now();
        match self.wait_flag(Flag::TransferComplete, start, DMA_COMPLETE_TIMEOUT_MS) {
            Ok(()) => {
                self.bus.clear_flag(Flag::TransferComplete);
                match direction {
                    Direction::Tx => {
                        self.tx.finish();
                        self.end_tx();
                    }
                    Direction::Rx => {
                        self.rx.finish();
                        self.end_rx();
                    }
                }
            }
            // Cause bits already latched by the wait.
            Err(_) => self.fail(code::NONE),
        }
    }

    /// Channel error: abort and resynchronize. The move to `Error` is the
    /// single authoritative signal that no completion callback may fire
    /// for this transfer.
    fn dma_abort(&mut self, direction: Direction) {
        self.bus.disable_dma_request(direction);
        let channel = match direction {
            Direction::Tx => self.dma_tx.as_mut(),
            Direction::Rx => self.dma_rx.as_mut(),
        };
        if let Some(channel) = channel {
            // The stop may complete asynchronously; state is authoritative
            // from here on.
            channel.stop();
        }
        self.fail(code::DMA);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
