//! Simulated hardware for host tests.
//!
//! The simulated bus behaves like a cooperative peripheral: the transmit
//! register is always ready, written units land in a log (and echo into
//! the receive FIFO when loopback is on), and the transfer-complete flag
//! asserts when the peripheral would have flushed. Tests inject faults by
//! latching error flags or sticking the transmit-ready flag low. Handles
//! are cheap clones over shared state, so a test can keep one while the
//! engine owns another.

#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::driver::engine::Engine;
use crate::hal::{Direction, DmaChannel, Flag, IrqSource, RegisterBus, TickSource};

pub(crate) type SimEngine = Engine<SimBus, SimDma, SimClock>;

/// Build an engine over fresh simulated hardware, returning the bus and
/// clock handles for the test to poke at.
pub(crate) fn sim_engine() -> (SimEngine, SimBus, SimClock) {
    let bus = SimBus::new();
    let clock = SimClock::new();
    let engine = Engine::new(bus.clone(), clock.clone());
    (engine, bus, clock)
}

// =============================================================================
// Simulated Register Bus
// =============================================================================

#[derive(Default)]
struct BusState {
    active: bool,
    loopback: bool,
    tx_empty: bool,
    transfer_complete: bool,
    overrun: bool,
    underrun: bool,
    frame_error: bool,
    irq: [bool; 4],
    dma_req_tx: bool,
    dma_req_rx: bool,
    tx_log: Vec<u8>,
    rx_fifo: VecDeque<u8>,
}

/// Cloneable simulated register bus.
#[derive(Clone)]
pub(crate) struct SimBus {
    state: Rc<RefCell<BusState>>,
}

impl SimBus {
    pub(crate) fn new() -> Self {
        let state = BusState {
            tx_empty: true,
            ..BusState::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Queue units on the receive side, as if the far end sent them.
    pub(crate) fn push_rx(&self, units: &[u8]) {
        let mut s = self.state.borrow_mut();
        s.rx_fifo.extend(units.iter().copied());
    }

    /// Latch a flag, e.g. to inject a hardware error.
    pub(crate) fn set_flag(&self, flag: Flag) {
        let mut s = self.state.borrow_mut();
        match flag {
            Flag::TxEmpty => s.tx_empty = true,
            Flag::RxNotEmpty => {}
            Flag::TransferComplete => s.transfer_complete = true,
            Flag::Overrun => s.overrun = true,
            Flag::Underrun => s.underrun = true,
            Flag::FrameError => s.frame_error = true,
        }
    }

    /// Force the transmit-ready flag high or low; `false` simulates a
    /// peripheral that never drains.
    pub(crate) fn stick_tx_empty(&self, ready: bool) {
        self.state.borrow_mut().tx_empty = ready;
    }

    pub(crate) fn tx_log(&self) -> Vec<u8> {
        self.state.borrow().tx_log.clone()
    }

    pub(crate) fn active(&self) -> bool {
        self.state.borrow().active
    }

    pub(crate) fn loopback(&self) -> bool {
        self.state.borrow().loopback
    }

    pub(crate) fn irq_enabled(&self, source: IrqSource) -> bool {
        self.state.borrow().irq[irq_index(source)]
    }

    pub(crate) fn dma_request(&self, direction: Direction) -> bool {
        let s = self.state.borrow();
        match direction {
            Direction::Tx => s.dma_req_tx,
            Direction::Rx => s.dma_req_rx,
        }
    }
}

fn irq_index(source: IrqSource) -> usize {
    match source {
        IrqSource::TxEmpty => 0,
        IrqSource::RxNotEmpty => 1,
        IrqSource::TransferComplete => 2,
        IrqSource::Error => 3,
    }
}

impl RegisterBus for SimBus {
    fn activate(&mut self) {
        self.state.borrow_mut().active = true;
    }

    fn deactivate(&mut self) {
        self.state.borrow_mut().active = false;
    }

    fn read_flag(&self, flag: Flag) -> bool {
        let s = self.state.borrow();
        match flag {
            Flag::TxEmpty => s.tx_empty,
            Flag::RxNotEmpty => !s.rx_fifo.is_empty(),
            Flag::TransferComplete => s.transfer_complete,
            Flag::Overrun => s.overrun,
            Flag::Underrun => s.underrun,
            Flag::FrameError => s.frame_error,
        }
    }

    fn clear_flag(&mut self, flag: Flag) {
        let mut s = self.state.borrow_mut();
        match flag {
            Flag::TxEmpty | Flag::RxNotEmpty => {}
            Flag::TransferComplete => s.transfer_complete = false,
            Flag::Overrun => s.overrun = false,
            Flag::Underrun => s.underrun = false,
            Flag::FrameError => s.frame_error = false,
        }
    }

    fn enable_interrupt(&mut self, source: IrqSource) {
        self.state.borrow_mut().irq[irq_index(source)] = true;
    }

    fn disable_interrupt(&mut self, source: IrqSource) {
        self.state.borrow_mut().irq[irq_index(source)] = false;
    }

    fn is_interrupt_enabled(&self, source: IrqSource) -> bool {
        self.state.borrow().irq[irq_index(source)]
    }

    fn write_data(&mut self, unit: u8) {
        let mut s = self.state.borrow_mut();
        s.tx_log.push(unit);
        if s.loopback {
            s.rx_fifo.push_back(unit);
        }
        // The simulated peripheral flushes instantly.
        s.transfer_complete = true;
    }

    fn read_data(&mut self) -> u8 {
        let mut s = self.state.borrow_mut();
        let unit = s.rx_fifo.pop_front().unwrap_or(0);
        if s.rx_fifo.is_empty() {
            s.transfer_complete = true;
        }
        unit
    }

    fn enable_dma_request(&mut self, direction: Direction) {
        let mut s = self.state.borrow_mut();
        match direction {
            Direction::Tx => s.dma_req_tx = true,
            Direction::Rx => s.dma_req_rx = true,
        }
    }

    fn disable_dma_request(&mut self, direction: Direction) {
        let mut s = self.state.borrow_mut();
        match direction {
            Direction::Tx => s.dma_req_tx = false,
            Direction::Rx => s.dma_req_rx = false,
        }
    }

    fn set_loopback(&mut self, enable: bool) {
        self.state.borrow_mut().loopback = enable;
    }
}

// =============================================================================
// Simulated DMA Channel
// =============================================================================

#[derive(Default)]
struct DmaState {
    starts: Vec<(Direction, usize)>,
    stops: u32,
}

/// Cloneable simulated DMA channel recording start/stop requests.
#[derive(Clone)]
pub(crate) struct SimDma {
    state: Rc<RefCell<DmaState>>,
}

impl SimDma {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(DmaState::default())),
        }
    }

    pub(crate) fn starts(&self) -> Vec<(Direction, usize)> {
        self.state.borrow().starts.clone()
    }

    pub(crate) fn stops(&self) -> u32 {
        self.state.borrow().stops
    }
}

impl DmaChannel for SimDma {
    fn start(&mut self, direction: Direction, _buffer: *mut u8, len: usize) {
        self.state.borrow_mut().starts.push((direction, len));
    }

    fn stop(&mut self) {
        self.state.borrow_mut().stops += 1;
    }
}

// =============================================================================
// Simulated Clock and Delay
// =============================================================================

struct ClockState {
    now: u32,
    step: u32,
}

/// Cloneable tick source that advances by `step` on every read, so polling
/// loops always make wall-clock progress.
#[derive(Clone)]
pub(crate) struct SimClock {
    state: Rc<RefCell<ClockState>>,
}

impl SimClock {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ClockState { now: 0, step: 1 })),
        }
    }

    /// Current tick without advancing.
    pub(crate) fn value(&self) -> u32 {
        self.state.borrow().now
    }

    pub(crate) fn advance(&self, ticks: u32) {
        let mut s = self.state.borrow_mut();
        s.now = s.now.wrapping_add(ticks);
    }
}

impl TickSource for SimClock {
    fn now(&self) -> u32 {
        let mut s = self.state.borrow_mut();
        let now = s.now;
        s.now = s.now.wrapping_add(s.step);
        now
    }
}

/// Delay provider that only records how long it was asked to wait.
pub(crate) struct SimDelay {
    total_ns: u64,
}

impl SimDelay {
    pub(crate) fn new() -> Self {
        Self { total_ns: 0 }
    }

    pub(crate) fn total_ns(&self) -> u64 {
        self.total_ns
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_echoes_in_loopback() {
        let mut bus = SimBus::new();
        bus.set_loopback(true);
        bus.write_data(0x42);

        assert!(bus.read_flag(Flag::RxNotEmpty));
        assert_eq!(bus.read_data(), 0x42);
        assert!(!bus.read_flag(Flag::RxNotEmpty));
    }

    #[test]
    fn bus_flags_latch_and_clear() {
        let mut bus = SimBus::new();
        bus.set_flag(Flag::Overrun);
        assert!(bus.read_flag(Flag::Overrun));
        bus.clear_flag(Flag::Overrun);
        assert!(!bus.read_flag(Flag::Overrun));
    }

    #[test]
    fn bus_clones_share_state() {
        let mut a = SimBus::new();
        let b = a.clone();
        a.write_data(7);
        assert_eq!(b.tx_log(), [7]);
    }

    #[test]
    fn clock_advances_on_read() {
        let clock = SimClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second > first);

        clock.advance(100);
        assert!(clock.value() >= 102);
    }

    #[test]
    fn dma_channel_records_activity() {
        let mut channel = SimDma::new();
        channel.start(Direction::Rx, core::ptr::null_mut(), 9);
        channel.stop();

        assert_eq!(channel.starts(), [(Direction::Rx, 9)]);
        assert_eq!(channel.stops(), 1);
    }

    #[test]
    fn delay_accumulates() {
        let mut delay = SimDelay::new();
        delay.delay_us(3);
        assert_eq!(delay.total_ns(), 3_000);
    }
}
