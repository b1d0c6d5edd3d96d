// genesis-bus-rs/src/core/cartridge/mapper/mapper_const.rs

/// Constant-register protection mapper
///
/// Some unlicensed cartridges check for fixed values at $400000. Bytes in
/// the 16-byte window with their mask bit set return the register value;
/// everything else falls through to ordinary ROM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstMapper {
    byte_read_mask: u16,
    regs: [u8; 16],
}

impl ConstMapper {
    /// Physical bank holding the register window ($400000)
    pub const PHYS_BANK: usize = 8;

    /// Base address of the register window
    pub const BASE: u32 = 0x400000;

    pub fn new() -> Self {
        Self {
            byte_read_mask: 0,
            regs: [0; 16],
        }
    }

    /// Install a constant at `$400000 + index`
    pub fn set_register(&mut self, index: usize, value: u8) {
        if index < self.regs.len() {
            self.regs[index] = value;
            self.byte_read_mask |= 1 << index;
        }
    }

    pub fn byte_read_mask(&self) -> u16 {
        self.byte_read_mask
    }

    /// Constant for `addr`, or None to read ROM instead
    #[inline]
    pub fn read(&self, addr: u32) -> Option<u8> {
        let offset = addr.wrapping_sub(Self::BASE);
        if offset >= 0x10 {
            return None;
        }
        let index = offset as usize;
        if self.byte_read_mask & (1 << index) != 0 {
            Some(self.regs[index])
        } else {
            None
        }
    }

    pub fn save_state(&self) -> Vec<u8> {
        let mut state = self.byte_read_mask.to_le_bytes().to_vec();
        state.extend_from_slice(&self.regs);
        state
    }

    pub fn load_state(data: &[u8]) -> Option<Self> {
        if data.len() < 2 + 16 {
            return None;
        }
        let mut mapper = Self::new();
        mapper.byte_read_mask = u16::from_le_bytes([data[0], data[1]]);
        mapper.regs.copy_from_slice(&data[2..18]);
        Some(mapper)
    }
}

impl Default for ConstMapper {
    fn default() -> Self {
        Self::new()
    }
}
