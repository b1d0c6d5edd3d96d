// genesis-bus-rs/src/core/system.rs

//! Console configuration and the hardware attached around the bus

use crate::core::m68k::{M68kClock, NullClock};
use crate::core::snd::{NullSound, SoundChips};
use crate::core::vdp::{NullVdp, VdpPort};
use crate::core::z80::{NullZ80, Z80Cpu};

/// Master clocks per scanline
pub const MASTER_CLOCKS_PER_LINE: i32 = 3420;
/// Master clock divider of the 68000
pub const M68K_CLOCK_DIVIDER: i32 = 7;
/// Master clock divider of the Z80
pub const Z80_CLOCK_DIVIDER: i32 = 15;

pub const LINES_PER_FRAME_NTSC: u32 = 262;
pub const LINES_PER_FRAME_PAL: u32 = 313;

/// Console region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    JapanNtsc,
    JapanPal,
    #[default]
    Usa,
    Europe,
}

impl Region {
    pub fn is_overseas(self) -> bool {
        matches!(self, Region::Usa | Region::Europe)
    }

    pub fn is_pal(self) -> bool {
        matches!(self, Region::JapanPal | Region::Europe)
    }
}

/// Session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemConfig {
    pub region: Region,
    /// TMSS boot ROM fitted (forces hardware version 1)
    pub tmss: bool,
    /// Hardware version nibble reported at $A10001
    pub hw_version: u8,
    /// Run the Z80; when false the line helpers only move its odometer
    pub z80_enabled: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            region: Region::Usa,
            tmss: false,
            hw_version: 0,
            z80_enabled: true,
        }
    }
}

impl SystemConfig {
    /// Version register ($A10001)
    ///
    /// bit 7: overseas, bit 6: PAL, bit 5: no expansion unit,
    /// bits 3-0: hardware version.
    pub fn version_register(&self) -> u8 {
        let version = if self.tmss { 1 } else { self.hw_version & 0x0F };
        0x20 | ((self.region.is_overseas() as u8) << 7)
            | ((self.region.is_pal() as u8) << 6)
            | version
    }

    pub fn frame_timing(&self) -> FrameTiming {
        FrameTiming::new(self.region.is_pal())
    }
}

/// Per-line cycle budgets for both CPUs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    pub m68k_cycles_per_line: i32,
    pub z80_cycles_per_line: i32,
    pub lines_per_frame: u32,
}

impl FrameTiming {
    pub fn new(pal: bool) -> Self {
        Self {
            m68k_cycles_per_line: MASTER_CLOCKS_PER_LINE / M68K_CLOCK_DIVIDER,
            z80_cycles_per_line: MASTER_CLOCKS_PER_LINE / Z80_CLOCK_DIVIDER,
            lines_per_frame: if pal { LINES_PER_FRAME_PAL } else { LINES_PER_FRAME_NTSC },
        }
    }

    pub fn m68k_cycles_per_frame(&self) -> i32 {
        self.m68k_cycles_per_line * self.lines_per_frame as i32
    }

    pub fn z80_cycles_per_frame(&self) -> i32 {
        self.z80_cycles_per_line * self.lines_per_frame as i32
    }
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Hardware outside the bus that the bus calls into
pub struct Peripherals {
    pub m68k: Box<dyn M68kClock>,
    pub z80: Box<dyn Z80Cpu>,
    pub vdp: Box<dyn VdpPort>,
    pub sound: Box<dyn SoundChips>,
}

impl Default for Peripherals {
    fn default() -> Self {
        Self {
            m68k: Box::new(NullClock),
            z80: Box::new(NullZ80::default()),
            vdp: Box::new(NullVdp),
            sound: Box::new(NullSound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_register() {
        let mut config = SystemConfig::default();
        assert_eq!(config.version_register(), 0xA0);

        config.region = Region::Europe;
        assert_eq!(config.version_register(), 0xE0);

        config.region = Region::JapanNtsc;
        config.tmss = true;
        assert_eq!(config.version_register(), 0x21);
    }

    #[test]
    fn test_frame_timing() {
        let ntsc = FrameTiming::new(false);
        assert_eq!(ntsc.m68k_cycles_per_line, 488);
        assert_eq!(ntsc.z80_cycles_per_line, 228);
        assert_eq!(ntsc.lines_per_frame, 262);
        assert_eq!(ntsc.m68k_cycles_per_frame(), 488 * 262);

        let pal = SystemConfig { region: Region::Europe, ..SystemConfig::default() }.frame_timing();
        assert_eq!(pal.lines_per_frame, 313);
        assert_eq!(pal.z80_cycles_per_frame(), 228 * 313);
    }
}
