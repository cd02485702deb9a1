//! Transfer engine core.
//!
//! The [`Engine`] handle and its supporting types. The engine proper is
//! split by concern: lifecycle and blocking transfers in `engine`,
//! interrupt-driven stepping in `interrupt`, DMA orchestration in `dma`,
//! and the callback registry in `callbacks`.

mod buffer;
pub mod callbacks;
pub mod config;
pub mod dma;
pub mod engine;
pub mod error;
pub mod interrupt;

pub use callbacks::{Callback, CallbackId};
pub use config::{Config, State};
pub use dma::{DMA_COMPLETE_TIMEOUT_MS, DmaEvent};
pub use engine::Engine;
pub use error::{Error, Result, code};
pub use interrupt::Event;
