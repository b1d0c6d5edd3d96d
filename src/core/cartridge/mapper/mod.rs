// genesis-bus-rs/src/core/cartridge/mapper/mod.rs

//! Cartridge mapper module
//!
//! Mega Drive cartridges are seen through 20 physical banks of 512 KB
//! ($000000-$9FFFFF). The active mapper decides what each physical bank
//! resolves to; the cartridge caches the result in a bank table that is
//! rebuilt whenever a bank register changes.

pub mod mapper_const;
pub mod mapper_database;
pub mod mapper_realtec;
pub mod mapper_ssf2;

pub use mapper_const::ConstMapper;
pub use mapper_database::{detect_mapper, const_fixup, CartridgeDatabaseEntry};
pub use mapper_realtec::RealtecMapper;
pub use mapper_ssf2::Ssf2Mapper;

/// Size of a physical cartridge bank
pub const CART_BANK_SIZE: usize = 0x80000;

/// Shift from address to physical bank index
pub const CART_BANK_SHIFT: u32 = 19;

/// Physical banks covering $000000-$9FFFFF
pub const NUM_CART_BANKS: usize = 20;

/// Physical banks covering the official 4 MB ROM area ($000000-$3FFFFF)
pub const NUM_ROM_AREA_BANKS: usize = 8;

/// Mapper type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperType {
    /// Flat addressing up to $9FFFFF
    Flat,
    /// Super Street Fighter II bank switching
    Ssf2,
    /// Constant registers at $400000 (unlicensed protection)
    Const400000,
    /// Realtec mapper (Earth Defense, Balloon Boy, etc.)
    Realtec,
}

impl std::fmt::Display for MapperType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapperType::Flat => write!(f, "Flat"),
            MapperType::Ssf2 => write!(f, "SSF2"),
            MapperType::Const400000 => write!(f, "Constant $400000"),
            MapperType::Realtec => write!(f, "Realtec"),
        }
    }
}

/// What a physical bank resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartBank {
    /// Open bus ($FF)
    Unused,
    /// 512 KB virtual ROM page
    Rom(u8),
    /// Constant register area at $400000
    Const400000,
    /// Realtec 64 KB paging (resolved per access)
    Realtec,
}

/// Active mapper and its state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapper {
    Flat,
    Ssf2(Ssf2Mapper),
    Const400000(ConstMapper),
    Realtec(RealtecMapper),
}

impl Mapper {
    /// Create a mapper in its power-on state
    pub fn new(mapper_type: MapperType) -> Self {
        match mapper_type {
            MapperType::Flat => Mapper::Flat,
            MapperType::Ssf2 => Mapper::Ssf2(Ssf2Mapper::new()),
            MapperType::Const400000 => Mapper::Const400000(ConstMapper::new()),
            MapperType::Realtec => Mapper::Realtec(RealtecMapper::new()),
        }
    }

    pub fn mapper_type(&self) -> MapperType {
        match self {
            Mapper::Flat => MapperType::Flat,
            Mapper::Ssf2(_) => MapperType::Ssf2,
            Mapper::Const400000(_) => MapperType::Const400000,
            Mapper::Realtec(_) => MapperType::Realtec,
        }
    }

    /// Reset bank registers. Constant registers are cartridge wiring and survive.
    pub fn reset(&mut self) {
        match self {
            Mapper::Flat | Mapper::Const400000(_) => {}
            Mapper::Ssf2(m) => m.reset(),
            Mapper::Realtec(m) => m.reset(),
        }
    }

    /// Resolve one physical bank for a ROM of `rom_pages` 512 KB pages
    pub fn resolve_bank(&self, phys: usize, rom_pages: usize) -> CartBank {
        match self {
            Mapper::Flat => flat_bank(phys, rom_pages),
            Mapper::Ssf2(m) => {
                if phys < NUM_ROM_AREA_BANKS && rom_pages > 0 {
                    CartBank::Rom(m.virtual_page(phys, rom_pages))
                } else {
                    CartBank::Unused
                }
            }
            Mapper::Const400000(_) => {
                if phys == ConstMapper::PHYS_BANK {
                    CartBank::Const400000
                } else {
                    flat_bank(phys, rom_pages)
                }
            }
            Mapper::Realtec(_) => {
                if phys < NUM_ROM_AREA_BANKS && rom_pages > 0 {
                    CartBank::Realtec
                } else {
                    CartBank::Unused
                }
            }
        }
    }

    /// Save mapper state
    pub fn save_state(&self) -> Vec<u8> {
        let mut state = vec![self.mapper_type() as u8];
        match self {
            Mapper::Flat => {}
            Mapper::Ssf2(m) => state.extend_from_slice(&m.save_state()),
            Mapper::Const400000(m) => state.extend_from_slice(&m.save_state()),
            Mapper::Realtec(m) => state.extend_from_slice(&m.save_state()),
        }
        state
    }

    /// Load mapper state; the variant is restored along with its payload
    pub fn load_state(data: &[u8]) -> Option<Self> {
        let (&tag, payload) = data.split_first()?;
        let mapper = match tag {
            t if t == MapperType::Flat as u8 => Mapper::Flat,
            t if t == MapperType::Ssf2 as u8 => Mapper::Ssf2(Ssf2Mapper::load_state(payload)?),
            t if t == MapperType::Const400000 as u8 => {
                Mapper::Const400000(ConstMapper::load_state(payload)?)
            }
            t if t == MapperType::Realtec as u8 => {
                Mapper::Realtec(RealtecMapper::load_state(payload)?)
            }
            _ => return None,
        };
        Some(mapper)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Mapper::Flat
    }
}

/// Flat addressing: the 4 MB ROM area mirrors the image, the area above it
/// is only backed when the image is large enough.
fn flat_bank(phys: usize, rom_pages: usize) -> CartBank {
    if rom_pages == 0 {
        CartBank::Unused
    } else if phys < NUM_ROM_AREA_BANKS {
        CartBank::Rom((phys % rom_pages) as u8)
    } else if phys < rom_pages {
        CartBank::Rom(phys as u8)
    } else {
        CartBank::Unused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_mirrors_small_rom_in_rom_area() {
        let mapper = Mapper::Flat;
        assert_eq!(mapper.resolve_bank(0, 2), CartBank::Rom(0));
        assert_eq!(mapper.resolve_bank(1, 2), CartBank::Rom(1));
        assert_eq!(mapper.resolve_bank(2, 2), CartBank::Rom(0));
        assert_eq!(mapper.resolve_bank(7, 2), CartBank::Rom(1));
        assert_eq!(mapper.resolve_bank(8, 2), CartBank::Unused);
    }

    #[test]
    fn test_flat_large_rom_above_4mb() {
        let mapper = Mapper::Flat;
        assert_eq!(mapper.resolve_bank(9, 12), CartBank::Rom(9));
        assert_eq!(mapper.resolve_bank(12, 12), CartBank::Unused);
    }

    #[test]
    fn test_const_mapper_owns_bank_8() {
        let mapper = Mapper::new(MapperType::Const400000);
        assert_eq!(mapper.resolve_bank(8, 1), CartBank::Const400000);
        assert_eq!(mapper.resolve_bank(0, 1), CartBank::Rom(0));
    }

    #[test]
    fn test_state_restores_variant() {
        let mut ssf2 = Ssf2Mapper::new();
        ssf2.set_bank(3, 9);
        let saved = Mapper::Ssf2(ssf2.clone()).save_state();

        assert_eq!(Mapper::load_state(&saved), Some(Mapper::Ssf2(ssf2)));
        assert_eq!(Mapper::load_state(&[]), None);
        assert_eq!(Mapper::load_state(&[0x7F]), None);
    }
}
