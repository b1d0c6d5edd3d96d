// genesis-bus-rs/src/core/cartridge/mapper/mapper_ssf2.rs

use super::NUM_ROM_AREA_BANKS;
use log::debug;

/// Register value meaning "use the power-on bank"
pub const SSF2_BANK_DEFAULT: u8 = 0xFF;

/// Highest virtual page a bank register can select
const SSF2_MAX_PAGE: u8 = 0x1F;

/// Super Street Fighter II mapper
///
/// Eight bank registers, one per 512 KB physical bank of the ROM area,
/// written through /TIME at $A130F3-$A130FF. Bank 0 is hard-wired to page 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ssf2Mapper {
    banks: [u8; NUM_ROM_AREA_BANKS],
}

impl Ssf2Mapper {
    pub fn new() -> Self {
        Self {
            banks: [SSF2_BANK_DEFAULT; NUM_ROM_AREA_BANKS],
        }
    }

    pub fn reset(&mut self) {
        self.banks = [SSF2_BANK_DEFAULT; NUM_ROM_AREA_BANKS];
    }

    pub fn banks(&self) -> &[u8; NUM_ROM_AREA_BANKS] {
        &self.banks
    }

    /// Physical bank selected by a /TIME register offset ($F3-$FF, odd only)
    pub fn bank_for_time_register(addr: u8) -> Option<usize> {
        if addr >= 0xF3 && addr & 1 != 0 {
            Some(((addr & 0x0F) >> 1) as usize)
        } else {
            None
        }
    }

    /// Write a bank register. Bank 0 cannot be remapped.
    pub fn set_bank(&mut self, phys: usize, virt: u8) {
        if phys == 0 || phys >= NUM_ROM_AREA_BANKS {
            return;
        }
        debug!("SSF2: bank {} -> page ${:02X}", phys, virt);
        self.banks[phys] = virt;
    }

    /// Virtual page backing `phys`. Out-of-range selections fall back to the
    /// identity page.
    pub fn virtual_page(&self, phys: usize, rom_pages: usize) -> u8 {
        let virt = self.banks.get(phys).copied().unwrap_or(SSF2_BANK_DEFAULT);
        if phys != 0 && virt <= SSF2_MAX_PAGE && (virt as usize) < rom_pages {
            virt
        } else {
            phys as u8
        }
    }

    pub fn save_state(&self) -> Vec<u8> {
        self.banks.to_vec()
    }

    pub fn load_state(data: &[u8]) -> Option<Self> {
        let banks = data.get(..NUM_ROM_AREA_BANKS)?;
        let mut mapper = Self::new();
        mapper.banks.copy_from_slice(banks);
        Some(mapper)
    }
}

impl Default for Ssf2Mapper {
    fn default() -> Self {
        Self::new()
    }
}
