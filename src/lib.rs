//! Peripheral Transfer Engine
//!
//! A `no_std`, `no_alloc` transfer engine for memory-mapped serial
//! peripherals: one reusable state machine that drives a peripheral
//! through blocking (polling), interrupt-driven and DMA-offloaded
//! transfers with a uniform callback and error-reporting contract.
//!
//! # Architecture
//!
//! The crate is organized into two layers:
//!
//! 1. **Engine Layer** ([`driver`]): the [`Engine`] handle, its state
//!    machine, interrupt stepping, DMA orchestration and callback registry
//! 2. **HAL Layer** ([`hal`]): narrow traits the target supplies - a
//!    register bus ([`RegisterBus`]), DMA channels ([`DmaChannel`]) and a
//!    millisecond tick source ([`TickSource`])
//!
//! The engine owns every wait loop; all HAL trait operations return
//! immediately. Per handle, at most one transfer is in flight at a time,
//! and exactly one terminal callback (`TxComplete`/`RxComplete` or
//! `Error`) fires per initiated transfer - in every mode, including
//! blocking.
//!
//! # Execution models
//!
//! - **Blocking**: [`Engine::transmit`]/[`Engine::receive`] poll the
//!   ready flags with a wall-clock timeout budget.
//! - **Interrupt-driven**: [`Engine::transmit_it`]/[`Engine::receive_it`]
//!   arm interrupt sources and return; the platform's vector calls
//!   [`Engine::handle_interrupt`], which steps one unit per event.
//! - **DMA-offloaded**: [`Engine::transmit_dma`]/[`Engine::receive_dma`]
//!   start a bound [`DmaChannel`]; channel notifications come back through
//!   [`Engine::dma_event`]. [`Engine::dma_stop`] is the cooperative
//!   cancellation path.
//!
//! # Features
//!
//! - `defmt`: Enable defmt formatting and trace output
//! - `critical-section`: Enable the ISR-safe [`sync::SharedEngine`]
//!   wrapper
//!
//! # Example
//!
//! ```ignore
//! use ph_xfer_engine::{CallbackId, Config, Engine};
//!
//! // MyBus, MyChannel, MyClock implement the hal traits for the target.
//! let mut engine = Engine::<MyBus, MyChannel, MyClock>::new(bus, clock);
//! engine.init(Config::new().with_settle_us(300), &mut delay)?;
//!
//! engine.register_callback(CallbackId::RxComplete, |engine| {
//!     // runs with the handle back in Ready; may chain a transfer
//! })?;
//!
//! // blocking round trip through the peripheral's loopback path
//! engine.enable_loopback()?;
//! engine.transmit(&[0x01, 0x02, 0x03], 100)?;
//! let mut echoed = [0u8; 3];
//! engine.receive(&mut echoed, 100)?;
//! ```

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live in Cargo.toml; this block only pins the ones the
// sources rely on being errors.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::unwrap_used,
    clippy::expect_used
)]

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod hal;

#[cfg(feature = "critical-section")]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
pub(crate) mod test_utils;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::callbacks::{Callback, CallbackId};
pub use driver::config::{Config, State};
pub use driver::dma::{DMA_COMPLETE_TIMEOUT_MS, DmaEvent};
pub use driver::engine::Engine;
pub use driver::error::{Error, Result, code};
pub use driver::interrupt::Event;
pub use hal::{Direction, DmaChannel, Flag, IrqSource, NoDma, RegisterBus, TickSource};

// Re-export sync types when critical-section is enabled
#[cfg(feature = "critical-section")]
pub use sync::{CriticalSectionCell, SharedEngine};
