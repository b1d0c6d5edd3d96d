// genesis-bus-rs/src/core/z80/arbiter.rs

//! Z80 bus arbitration ($A11100 / $A11200)
//!
//! The 68000 takes the Z80 bus by raising BUSREQ and gives it back by
//! lowering it. Both CPUs are emulated on one thread, so on every edge the
//! Z80 is brought up to the exact point in the line where the 68000 is,
//! converting the remaining 68000 cycles into Z80 cycles.

use crate::core::m68k::M68kClock;
use crate::core::snd::SoundChips;
use crate::core::system::FrameTiming;
use crate::core::z80::Z80Cpu;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use log::debug;

/// 68000 cycles after a bus request during which $A11100 still reads
/// "not taken yet"
pub const CYCLE_FOR_TAKE_Z80_BUS_GENESIS: i32 = 16;

/// Entries in the 68000 -> Z80 cycle conversion table
pub const CYCLE_TABLE_SIZE: usize = 512;

bitflags! {
    /// Z80 line state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Z80State: u8 {
        /// Z80 emulation enabled
        const ENABLED = 0x01;
        /// Z80 owns its bus and is running (68000 has not requested it)
        const BUSREQ = 0x02;
        /// Z80 held in reset
        const RESET = 0x04;
    }
}

/// Savestate snapshot of the arbiter
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ArbiterState {
    pub last_busreq_cnt: i32,
    pub cycles_m68k: i32,
    pub cycles_z80: i32,
    pub z80_state: u8,
    pub last_busreq_st: u8,
    pub fake_fetch: u8,
    pub reserved: u8,
}

/// Bus ownership between the 68000 and the Z80
pub struct BusArbiter {
    state: Z80State,
    /// 68000 odometer at the last bus request
    last_busreq_cnt: i32,
    /// 1 if the Z80 was running when the bus was last requested
    last_busreq_st: u8,
    fake_fetch: u8,
    /// 68000 cycle target for the current line (frame-relative)
    cycles_m68k: i32,
    /// Z80 cycle target for the current line (frame-relative)
    cycles_z80: i32,
    timing: FrameTiming,
    cycle_table: [i32; CYCLE_TABLE_SIZE],
}

impl BusArbiter {
    pub fn new(timing: FrameTiming, z80_enabled: bool) -> Self {
        let mut cycle_table = [0; CYCLE_TABLE_SIZE];
        for (x, entry) in cycle_table.iter_mut().enumerate() {
            *entry = (x as i32 * 7) / 15;
        }

        Self {
            state: Self::power_on_state(z80_enabled),
            last_busreq_cnt: 0,
            last_busreq_st: 0,
            fake_fetch: 0,
            cycles_m68k: 0,
            cycles_z80: 0,
            timing,
            cycle_table,
        }
    }

    fn power_on_state(z80_enabled: bool) -> Z80State {
        let mut state = Z80State::BUSREQ | Z80State::RESET;
        state.set(Z80State::ENABLED, z80_enabled);
        state
    }

    /// Hard reset: Z80 running but held in reset, frame targets cleared
    pub fn reset_system(&mut self) {
        self.state = Self::power_on_state(self.state.contains(Z80State::ENABLED));
        self.last_busreq_cnt = 0;
        self.last_busreq_st = 0;
        self.fake_fetch = 0;
        self.reset_frame();
    }

    pub fn z80_state(&self) -> Z80State {
        self.state
    }

    pub fn timing(&self) -> FrameTiming {
        self.timing
    }

    /// Convert 68000 cycles into Z80 cycles (x * 7 / 15), clamped to the table
    #[inline]
    pub fn m68k_to_z80_cycles(&self, m68k_cycles: i32) -> i32 {
        let index = m68k_cycles.clamp(0, CYCLE_TABLE_SIZE as i32 - 1) as usize;
        self.cycle_table[index]
    }

    pub fn is_secondary_running(&self) -> bool {
        self.state.contains(Z80State::BUSREQ)
    }

    pub fn is_reset_asserted(&self) -> bool {
        self.state.contains(Z80State::RESET)
    }

    /// The 68000 may touch Z80 space only while it holds the bus and the
    /// Z80 is out of reset
    pub fn z80_window_accessible(&self) -> bool {
        !self.state.intersects(Z80State::BUSREQ | Z80State::RESET)
    }

    /// Bus request line. `want_running == false` takes the bus from the Z80.
    pub fn request_release(
        &mut self,
        want_running: bool,
        m68k: &dyn M68kClock,
        z80: &mut dyn Z80Cpu,
    ) {
        if !want_running {
            let odometer = m68k.read_odometer();
            self.last_busreq_cnt = odometer;
            self.last_busreq_st = self.is_secondary_running() as u8;

            if self.is_secondary_running() {
                self.state.remove(Z80State::BUSREQ);

                // Run the Z80 up to where the 68000 is now
                let target = self.cycles_z80 - self.m68k_to_z80_cycles(self.cycles_m68k - odometer);
                debug!("Z80 BUSREQ: 68000 @ {}, Z80 runs to {}", odometer, target);
                z80.exec(target);
            }
        } else if !self.is_secondary_running() {
            self.state.insert(Z80State::BUSREQ);

            let odometer = m68k.read_odometer();
            let target = self.cycles_z80 - self.m68k_to_z80_cycles(self.cycles_m68k - odometer);
            debug!("Z80 bus released: 68000 @ {}, Z80 odometer {}", odometer, target);
            z80.set_odometer(target);
        }
    }

    /// Reset line. Asserting resets the Z80 and the YM2612 tied to it.
    pub fn reset(&mut self, assert_reset: bool, z80: &mut dyn Z80Cpu, sound: &mut dyn SoundChips) {
        if assert_reset {
            if !self.is_reset_asserted() {
                debug!("Z80 RESET asserted");
                z80.soft_reset();
                self.state.insert(Z80State::RESET);
                sound.ym2612_reset();
            }
        } else if self.is_reset_asserted() {
            debug!("Z80 RESET released");
            self.state.remove(Z80State::RESET);
        }
    }

    /// $A11100 byte read: bit 0 set while the Z80 still owns the bus
    pub fn status_byte(&self, m68k: &dyn M68kClock) -> u8 {
        if self.is_secondary_running() {
            return 0x81;
        }

        if m68k.read_odometer() - self.last_busreq_cnt <= CYCLE_FOR_TAKE_Z80_BUS_GENESIS {
            self.last_busreq_st | 0x80
        } else {
            0x80
        }
    }

    /// $A11100 word read. The low byte is the Z80's next opcode fetch on
    /// hardware; it alternates between $00 and $FF here.
    pub fn status_word(&mut self, m68k: &dyn M68kClock) -> u16 {
        self.fake_fetch ^= 0xFF;
        ((self.status_byte(m68k) as u16) << 8) | self.fake_fetch as u16
    }

    /// Start of frame: both cycle targets back to zero
    pub fn reset_frame(&mut self) {
        self.cycles_m68k = 0;
        self.cycles_z80 = 0;
    }

    /// Start of line: move both targets one line forward
    pub fn advance_line(&mut self) {
        self.cycles_m68k += self.timing.m68k_cycles_per_line;
        self.cycles_z80 += self.timing.z80_cycles_per_line;
    }

    /// End of line: let a free-running Z80 catch up, otherwise just move
    /// its odometer to the line target
    pub fn end_line(&mut self, z80: &mut dyn Z80Cpu) {
        if self.state == Z80State::ENABLED | Z80State::BUSREQ {
            z80.exec(self.cycles_z80);
        } else {
            z80.set_odometer(self.cycles_z80);
        }
    }

    pub fn cycles_m68k(&self) -> i32 {
        self.cycles_m68k
    }

    pub fn cycles_z80(&self) -> i32 {
        self.cycles_z80
    }

    pub fn last_busreq(&self) -> (i32, u8) {
        (self.last_busreq_cnt, self.last_busreq_st)
    }

    pub fn state(&self) -> ArbiterState {
        ArbiterState {
            last_busreq_cnt: self.last_busreq_cnt,
            cycles_m68k: self.cycles_m68k,
            cycles_z80: self.cycles_z80,
            z80_state: self.state.bits(),
            last_busreq_st: self.last_busreq_st,
            fake_fetch: self.fake_fetch,
            reserved: 0,
        }
    }

    pub fn set_state(&mut self, state: &ArbiterState) {
        self.last_busreq_cnt = state.last_busreq_cnt;
        self.cycles_m68k = state.cycles_m68k;
        self.cycles_z80 = state.cycles_z80;
        self.state = Z80State::from_bits_truncate(state.z80_state);
        self.last_busreq_st = state.last_busreq_st & 1;
        self.fake_fetch = state.fake_fetch;
    }

    pub fn save_state(&self) -> Vec<u8> {
        bytemuck::bytes_of(&self.state()).to_vec()
    }

    pub fn load_state(&mut self, data: &[u8]) -> bool {
        let size = std::mem::size_of::<ArbiterState>();
        match data.get(..size) {
            Some(bytes) => {
                let state: ArbiterState = bytemuck::pod_read_unaligned(bytes);
                self.set_state(&state);
                true
            }
            None => false,
        }
    }
}

impl Default for BusArbiter {
    fn default() -> Self {
        Self::new(FrameTiming::default(), true)
    }
}
