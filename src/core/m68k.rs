// genesis-bus-rs/src/core/m68k.rs

//! 68000 clock source
//!
//! The bus only needs the primary CPU's cycle odometer: bus arbitration
//! timestamps requests with it and converts what is left of the current
//! line into Z80 cycles.

use std::cell::Cell;
use std::rc::Rc;

/// Read-only view of the 68000 cycle odometer
pub trait M68kClock {
    /// Cycles executed since the start of the frame
    fn read_odometer(&self) -> i32;
}

/// Odometer shared between the CPU core (writer) and the bus (reader)
#[derive(Debug, Clone, Default)]
pub struct SharedOdometer(Rc<Cell<i32>>);

impl SharedOdometer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> i32 {
        self.0.get()
    }

    pub fn set(&self, cycles: i32) {
        self.0.set(cycles);
    }

    /// Account for executed cycles
    pub fn add(&self, cycles: i32) {
        self.0.set(self.0.get().wrapping_add(cycles));
    }
}

impl M68kClock for SharedOdometer {
    fn read_odometer(&self) -> i32 {
        self.get()
    }
}

/// Clock that never advances
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClock;

impl M68kClock for NullClock {
    fn read_odometer(&self) -> i32 {
        0
    }
}
