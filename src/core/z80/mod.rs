// genesis-bus-rs/src/core/z80/mod.rs

//! Z80 coprocessor as seen from the 68000 side
//!
//! The interpreter itself is external. The 68000 bus needs to run it up to
//! a cycle target, move its odometer, reset it, and reach its 8 KB RAM /
//! sound window through `$A00000-$A0FFFF`.

pub mod arbiter;

pub use arbiter::{BusArbiter, Z80State};

/// Z80 interpreter entry points
pub trait Z80Cpu {
    /// Run until the odometer reaches `target`
    fn exec(&mut self, target: i32);
    fn read_odometer(&self) -> i32;
    fn set_odometer(&mut self, odometer: i32);
    /// Reset line asserted
    fn soft_reset(&mut self);
    /// Z80 address space read (68000 window access)
    fn read_byte(&mut self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, data: u8);
}

/// Stand-in Z80: executes instantly and has no address space
#[derive(Debug, Clone, Default)]
pub struct NullZ80 {
    odometer: i32,
}

impl Z80Cpu for NullZ80 {
    fn exec(&mut self, target: i32) {
        if target > self.odometer {
            self.odometer = target;
        }
    }

    fn read_odometer(&self) -> i32 {
        self.odometer
    }

    fn set_odometer(&mut self, odometer: i32) {
        self.odometer = odometer;
    }

    fn soft_reset(&mut self) {}

    fn read_byte(&mut self, _addr: u16) -> u8 {
        0xFF
    }

    fn write_byte(&mut self, _addr: u16, _data: u8) {}
}
