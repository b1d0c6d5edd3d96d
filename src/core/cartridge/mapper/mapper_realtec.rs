// genesis-bus-rs/src/core/cartridge/mapper/mapper_realtec.rs

use log::info;

/// Offset of the 8 KB boot ROM inside the image
const BOOT_ROM_OFFSET: usize = 0x7E000;
const BOOT_ROM_MASK: u32 = 0x1FFF;

/// Realtec mapper implementation
///
/// On reset an 8 KB boot ROM is mirrored over the whole 4 MB area. Writing
/// bit 0 of $400000 switches to 64 KB paging; from then on the mapping is
/// locked until the next reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtecMapper {
    boot_rom_mapped: bool,
    rom_access_enabled: bool,
    fixed_bank_size: u8,
    fixed_bank_selection: u8,
}

impl RealtecMapper {
    pub fn new() -> Self {
        Self {
            boot_rom_mapped: true,
            rom_access_enabled: false,
            fixed_bank_size: 0,
            fixed_bank_selection: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_boot_rom_mapped(&self) -> bool {
        self.boot_rom_mapped
    }

    /// Register write; returns true when `address` is a Realtec register
    pub fn write_register(&mut self, address: u32, data: u8) -> bool {
        match address {
            0x400000 => {
                if data & 0x01 != 0 && !self.rom_access_enabled {
                    info!(
                        "Realtec: ROM access enabled (size {:X}, selection {:X})",
                        self.fixed_bank_size, self.fixed_bank_selection
                    );
                    self.rom_access_enabled = true;
                    self.boot_rom_mapped = false;
                }
                true
            }
            0x402000 => {
                if !self.rom_access_enabled {
                    // Bits 0-1 control which address pins are forced
                    self.fixed_bank_size = data & 3;
                }
                true
            }
            0x404000 => {
                if !self.rom_access_enabled {
                    self.fixed_bank_selection = data & 3;
                }
                true
            }
            _ => false,
        }
    }

    /// Image byte offset for a 68000 address in the ROM area
    pub fn rom_offset(&self, addr: u32) -> usize {
        if self.boot_rom_mapped {
            return BOOT_ROM_OFFSET | (addr & BOOT_ROM_MASK) as usize;
        }

        // $000000-$07FFFF is mirrored across the 4 MB range
        let page = (addr >> 16) & 7;
        let size = self.fixed_bank_size as u32;
        let base = (page & !size) | (self.fixed_bank_selection as u32 & size);
        ((base << 16) | (addr & 0xFFFF)) as usize
    }

    pub fn save_state(&self) -> Vec<u8> {
        vec![
            self.boot_rom_mapped as u8,
            self.rom_access_enabled as u8,
            self.fixed_bank_size,
            self.fixed_bank_selection,
        ]
    }

    pub fn load_state(data: &[u8]) -> Option<Self> {
        match *data.get(..4)? {
            [boot, enabled, size, selection] => Some(Self {
                boot_rom_mapped: boot != 0,
                rom_access_enabled: enabled != 0,
                fixed_bank_size: size & 3,
                fixed_bank_selection: selection & 3,
            }),
            _ => None,
        }
    }
}

impl Default for RealtecMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_rom_mirrored() {
        let mapper = RealtecMapper::new();
        assert_eq!(mapper.rom_offset(0x000000), 0x7E000);
        assert_eq!(mapper.rom_offset(0x002000), 0x7E000);
        assert_eq!(mapper.rom_offset(0x3F1234), 0x7F234);
    }

    #[test]
    fn test_fixed_bank_paging() {
        let mut mapper = RealtecMapper::new();
        assert!(mapper.write_register(0x402000, 0x03));
        assert!(mapper.write_register(0x404000, 0x02));
        assert!(mapper.write_register(0x400000, 0x01));
        assert!(!mapper.is_boot_rom_mapped());

        // Low two page bits forced to the selection
        assert_eq!(mapper.rom_offset(0x001234), 0x21234);
        assert_eq!(mapper.rom_offset(0x051234), 0x61234);
    }

    #[test]
    fn test_mapping_locked_after_enable() {
        let mut mapper = RealtecMapper::new();
        mapper.write_register(0x400000, 0x01);
        mapper.write_register(0x402000, 0x03);
        assert_eq!(mapper.rom_offset(0x031234), 0x31234);
        assert!(!mapper.write_register(0x406000, 0x00));
    }
}
