//! ISR-safe engine wrapper using critical sections.
//!
//! The transfer engine is driven from two contexts: API calls on the main
//! thread of control and event delivery from interrupt handlers
//! ([`Engine::handle_interrupt`](crate::Engine::handle_interrupt),
//! [`Engine::dma_event`](crate::Engine::dma_event)). [`SharedEngine`]
//! serializes both through `critical_section::with()`.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::driver::engine::Engine;
use crate::hal::{DmaChannel, RegisterBus, TickSource};

/// Cell providing interior mutability with critical section protection.
///
/// Combines `critical_section::Mutex` with `RefCell` for safe mutable
/// access from both normal code and interrupt handlers.
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Create a new cell (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Execute a closure with exclusive mutable access.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            let mut value = self.inner.borrow_ref_mut(cs);
            f(&mut value)
        })
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut value| f(&mut value))
        })
    }
}

// SAFETY: CriticalSectionCell uses critical sections to protect all access.
unsafe impl<T: Send> Sync for CriticalSectionCell<T> {}

/// ISR-safe engine wrapper using critical sections.
///
/// # Example
///
/// ```ignore
/// static ENGINE: SharedEngine<MyBus, MyChannel, MyClock> =
///     SharedEngine::new(Engine::new(MyBus::new(), MyClock::new()));
///
/// // main thread
/// ENGINE.with(|engine| engine.transmit(&data, 100)).ok();
///
/// // peripheral interrupt vector
/// ENGINE.with(|engine| engine.handle_interrupt());
/// ```
pub struct SharedEngine<B: RegisterBus, D: DmaChannel, T: TickSource> {
    inner: CriticalSectionCell<Engine<B, D, T>>,
}

impl<B: RegisterBus, D: DmaChannel, T: TickSource> SharedEngine<B, D, T> {
    /// Wrap an engine (const, suitable for static initialization).
    pub const fn new(engine: Engine<B, D, T>) -> Self {
        Self {
            inner: CriticalSectionCell::new(engine),
        }
    }

    /// Execute a closure with exclusive access to the engine.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut Engine<B, D, T>) -> R,
    {
        self.inner.with(f)
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Engine<B, D, T>) -> R,
    {
        self.inner.try_with(f)
    }
}
