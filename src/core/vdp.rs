// genesis-bus-rs/src/core/vdp.rs

//! VDP register façade
//!
//! Rendering lives elsewhere; the bus forwards decoded port accesses here
//! and returns whatever the VDP answers.

/// VDP port entry points used by the 68000 bus
pub trait VdpPort {
    /// Data port read ($C00000)
    fn read_data(&mut self) -> u16;
    /// Control port read ($C00004): status register
    fn read_status(&mut self) -> u16;
    fn read_h_counter(&mut self) -> u8;
    fn read_v_counter(&mut self) -> u8;
    /// Byte write to the data port
    fn write_data_byte(&mut self, data: u8);
    /// Word write to the data port
    fn write_data_word(&mut self, data: u16);
    /// Control port write ($C00004)
    fn write_ctrl(&mut self, data: u16);
}

/// No VDP attached: ports read zero and writes vanish
#[derive(Debug, Clone, Copy, Default)]
pub struct NullVdp;

impl VdpPort for NullVdp {
    fn read_data(&mut self) -> u16 {
        0
    }

    fn read_status(&mut self) -> u16 {
        0
    }

    fn read_h_counter(&mut self) -> u8 {
        0
    }

    fn read_v_counter(&mut self) -> u8 {
        0
    }

    fn write_data_byte(&mut self, _data: u8) {}

    fn write_data_word(&mut self, _data: u16) {}

    fn write_ctrl(&mut self, _data: u16) {}
}
