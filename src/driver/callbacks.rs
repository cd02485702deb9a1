//! Callback registry for the transfer engine.
//!
//! The legacy "weak default function, optionally overridden" pattern is
//! modeled as a table of named slots, each holding either a caller-supplied
//! function or the built-in no-op. A slot is never null, so the engine may
//! invoke any slot unconditionally.
//!
//! Registration policy:
//! - `MspInit`/`MspDeInit`: registerable in `Reset` or `Ready`, so a
//!   hardware bring-up hook can be installed before the first `init`.
//! - The five data-path slots: registerable in `Ready` only.
//!
//! `init` resets the five data-path slots to the no-op default whenever it
//! runs from the `Reset` state, but leaves the Msp slots alone - a
//! pre-registered bring-up hook survives re-initialization.

use super::engine::Engine;
use super::error::{Error, Result};
use crate::driver::config::State;
use crate::hal::{DmaChannel, RegisterBus, TickSource};

/// Identifier for one callback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallbackId {
    /// Terminal callback for a completed transmit transfer
    TxComplete,
    /// Transmit DMA channel passed the half-way mark
    TxHalfComplete,
    /// Terminal callback for a completed receive transfer
    RxComplete,
    /// Receive DMA channel passed the half-way mark
    RxHalfComplete,
    /// Terminal callback for a failed transfer
    Error,
    /// Hardware bring-up hook, run on the Reset-to-Ready edge
    MspInit,
    /// Hardware tear-down hook, run on the any-to-Reset edge
    MspDeInit,
}

/// Callback slot signature. The engine hands the callback exclusive access
/// to itself, so a handler may start a follow-up transfer directly.
pub type Callback<B, D, T> = fn(&mut Engine<B, D, T>);

/// Built-in default installed in every unregistered slot.
pub(crate) fn noop<B: RegisterBus, D: DmaChannel, T: TickSource>(_engine: &mut Engine<B, D, T>) {}

/// The seven named slots of one handle.
pub(crate) struct CallbackTable<B: RegisterBus, D: DmaChannel, T: TickSource> {
    pub(crate) tx_complete: Callback<B, D, T>,
    pub(crate) tx_half_complete: Callback<B, D, T>,
    pub(crate) rx_complete: Callback<B, D, T>,
    pub(crate) rx_half_complete: Callback<B, D, T>,
    pub(crate) error: Callback<B, D, T>,
    pub(crate) msp_init: Callback<B, D, T>,
    pub(crate) msp_deinit: Callback<B, D, T>,
}

impl<B: RegisterBus, D: DmaChannel, T: TickSource> CallbackTable<B, D, T> {
    pub(crate) const fn new() -> Self {
        Self {
            tx_complete: noop,
            tx_half_complete: noop,
            rx_complete: noop,
            rx_half_complete: noop,
            error: noop,
            msp_init: noop,
            msp_deinit: noop,
        }
    }

    /// Reset the five data-path slots to the built-in default.
    pub(crate) fn reset_data_path(&mut self) {
        self.tx_complete = noop;
        self.tx_half_complete = noop;
        self.rx_complete = noop;
        self.rx_half_complete = noop;
        self.error = noop;
    }

    fn slot_mut(&mut self, id: CallbackId) -> &mut Callback<B, D, T> {
        match id {
            CallbackId::TxComplete => &mut self.tx_complete,
            CallbackId::TxHalfComplete => &mut self.tx_half_complete,
            CallbackId::RxComplete => &mut self.rx_complete,
            CallbackId::RxHalfComplete => &mut self.rx_half_complete,
            CallbackId::Error => &mut self.error,
            CallbackId::MspInit => &mut self.msp_init,
            CallbackId::MspDeInit => &mut self.msp_deinit,
        }
    }
}

impl<B: RegisterBus, D: DmaChannel, T: TickSource> Engine<B, D, T> {
    /// Register a user callback in the given slot.
    ///
    /// # Errors
    /// - `InvalidState` - data-path slots require `Ready`; Msp slots
    ///   require `Ready` or `Reset`. Nothing changes on failure.
    pub fn register_callback(&mut self, id: CallbackId, callback: Callback<B, D, T>) -> Result<()> {
        self.check_slot_mutable(id)?;
        *self.callbacks.slot_mut(id) = callback;
        Ok(())
    }

    /// Reset a slot to the built-in no-op default.
    ///
    /// The slot is never nulled, so it remains safe to invoke.
    ///
    /// # Errors
    /// - `InvalidState` - same state policy as [`Self::register_callback`].
    pub fn unregister_callback(&mut self, id: CallbackId) -> Result<()> {
        self.check_slot_mutable(id)?;
        *self.callbacks.slot_mut(id) = noop;
        Ok(())
    }

    fn check_slot_mutable(&self, id: CallbackId) -> Result<()> {
        let permitted = match id {
            CallbackId::MspInit | CallbackId::MspDeInit => {
                matches!(self.state, State::Reset | State::Ready)
            }
            _ => self.state == State::Ready,
        };
        if permitted { Ok(()) } else { Err(Error::InvalidState) }
    }

    /// Invoke a callback slot. Every terminal event, however reached,
    /// funnels through here after the handle has been restored to an idle
    /// state.
    pub(crate) fn dispatch(&mut self, id: CallbackId) {
        let callback = match id {
            CallbackId::TxComplete => self.callbacks.tx_complete,
            CallbackId::TxHalfComplete => self.callbacks.tx_half_complete,
            CallbackId::RxComplete => self.callbacks.rx_complete,
            CallbackId::RxHalfComplete => self.callbacks.rx_half_complete,
            CallbackId::Error => self.callbacks.error,
            CallbackId::MspInit => self.callbacks.msp_init,
            CallbackId::MspDeInit => self.callbacks.msp_deinit,
        };
        callback(self);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::test_utils::{SimDelay, SimEngine, sim_engine};

    #[test]
    fn data_path_registration_rejected_in_reset() {
        let (mut engine, _bus, _clock) = sim_engine();

        let result = engine.register_callback(CallbackId::TxComplete, noop);
        assert_eq!(result, Err(Error::InvalidState));
    }

    #[test]
    fn data_path_registration_allowed_in_ready() {
        let (mut engine, _bus, _clock) = sim_engine();
        engine
            .init(crate::Config::new(), &mut SimDelay::new())
            .unwrap();

        assert!(
            engine
                .register_callback(CallbackId::RxComplete, noop)
                .is_ok()
        );
        assert!(engine.unregister_callback(CallbackId::RxComplete).is_ok());
    }

    #[test]
    fn msp_slots_registerable_in_reset_and_ready() {
        let (mut engine, _bus, _clock) = sim_engine();

        assert!(engine.register_callback(CallbackId::MspInit, noop).is_ok());
        engine
            .init(crate::Config::new(), &mut SimDelay::new())
            .unwrap();
        assert!(
            engine
                .register_callback(CallbackId::MspDeInit, noop)
                .is_ok()
        );
    }

    #[test]
    fn unregister_restores_noop_default() {
        static FIRED: AtomicU32 = AtomicU32::new(0);
        fn on_error(_engine: &mut SimEngine) {
            FIRED.fetch_add(1, Ordering::Relaxed);
        }

        let (mut engine, _bus, _clock) = sim_engine();
        engine
            .init(crate::Config::new(), &mut SimDelay::new())
            .unwrap();

        engine
            .register_callback(CallbackId::Error, on_error)
            .unwrap();
        engine.unregister_callback(CallbackId::Error).unwrap();

        engine.dispatch(CallbackId::Error);
        assert_eq!(FIRED.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn msp_init_hook_survives_reinit() {
        static HOOK_RUNS: AtomicU32 = AtomicU32::new(0);
        fn bring_up(_engine: &mut SimEngine) {
            HOOK_RUNS.fetch_add(1, Ordering::Relaxed);
        }

        let (mut engine, _bus, _clock) = sim_engine();
        engine
            .register_callback(CallbackId::MspInit, bring_up)
            .unwrap();

        engine
            .init(crate::Config::new(), &mut SimDelay::new())
            .unwrap();
        assert_eq!(HOOK_RUNS.load(Ordering::Relaxed), 1);

        // Re-init from Ready: no Reset edge, hook not re-run but still
        // installed.
        engine
            .init(crate::Config::new(), &mut SimDelay::new())
            .unwrap();
        assert_eq!(HOOK_RUNS.load(Ordering::Relaxed), 1);

        // Full cycle through deinit re-runs the preserved hook.
        engine.deinit().unwrap();
        engine
            .init(crate::Config::new(), &mut SimDelay::new())
            .unwrap();
        assert_eq!(HOOK_RUNS.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn init_resets_data_path_slots_on_reset_edge() {
        static FIRED: AtomicU32 = AtomicU32::new(0);
        fn on_tx(_engine: &mut SimEngine) {
            FIRED.fetch_add(1, Ordering::Relaxed);
        }

        let (mut engine, _bus, _clock) = sim_engine();
        engine
            .init(crate::Config::new(), &mut SimDelay::new())
            .unwrap();
        engine
            .register_callback(CallbackId::TxComplete, on_tx)
            .unwrap();

        engine.deinit().unwrap();
        engine
            .init(crate::Config::new(), &mut SimDelay::new())
            .unwrap();

        // Slot went back to the default during the Reset-to-Ready init.
        engine.dispatch(CallbackId::TxComplete);
        assert_eq!(FIRED.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn registration_has_no_effect_on_failure() {
        static FIRED: AtomicU32 = AtomicU32::new(0);
        fn on_rx(_engine: &mut SimEngine) {
            FIRED.fetch_add(1, Ordering::Relaxed);
        }

        let (mut engine, _bus, _clock) = sim_engine();
        // Still in Reset: data-path registration must not take effect.
        let _ = engine.register_callback(CallbackId::RxComplete, on_rx);

        engine
            .init(crate::Config::new(), &mut SimDelay::new())
            .unwrap();
        engine.dispatch(CallbackId::RxComplete);
        assert_eq!(FIRED.load(Ordering::Relaxed), 0);
    }
}
