// genesis-bus-rs/src/core/cartridge/mapper/mapper_database.rs

use crate::core::cartridge::rom::RomInfo;
use super::{ConstMapper, MapperType};

/// Cartridge database entry
#[derive(Debug, Clone)]
pub struct CartridgeDatabaseEntry {
    pub product_id: &'static str,
    pub checksum: u16,
    pub real_checksum: u16,
    pub mapper_type: MapperType,
}

/// Database of known cartridges and their mappers
static CARTRIDGE_DATABASE: &[CartridgeDatabaseEntry] = &[
    // Realtec mapper games
    CartridgeDatabaseEntry {
        product_id: "",
        checksum: 0x0000,
        real_checksum: 0x06AB,
        mapper_type: MapperType::Realtec,
    },
    CartridgeDatabaseEntry {
        product_id: "",
        checksum: 0xFFFF,
        real_checksum: 0xF863,
        mapper_type: MapperType::Realtec,
    },
    // Super Bubble Bobble
    CartridgeDatabaseEntry {
        product_id: "",
        checksum: 0x0000,
        real_checksum: 0x16CD,
        mapper_type: MapperType::Const400000,
    },
    // Super Street Fighter II
    CartridgeDatabaseEntry {
        product_id: "T-12056",
        checksum: 0,
        real_checksum: 0,
        mapper_type: MapperType::Ssf2,
    },
    CartridgeDatabaseEntry {
        product_id: "MK-12056",
        checksum: 0,
        real_checksum: 0,
        mapper_type: MapperType::Ssf2,
    },
];

/// Constants installed at $400000 for protected cartridges
struct ConstFixup {
    real_checksum: u16,
    regs: &'static [(usize, u8)],
}

static CONST_FIXUPS: &[ConstFixup] = &[
    // Super Bubble Bobble
    ConstFixup {
        real_checksum: 0x16CD,
        regs: &[(0, 0x55), (2, 0x0F)],
    },
];

/// Detect mapper type from ROM information
pub fn detect_mapper(rom_info: &RomInfo) -> MapperType {
    for entry in CARTRIDGE_DATABASE {
        if entry.product_id.is_empty() || rom_info.serial.contains(entry.product_id) {
            if (entry.checksum == 0 || entry.checksum == rom_info.checksum)
                && (entry.real_checksum == 0 || entry.real_checksum == rom_info.real_checksum)
            {
                return entry.mapper_type;
            }
        }
    }

    if rom_info.console.starts_with("SEGA SSF") {
        return MapperType::Ssf2;
    }

    MapperType::Flat
}

/// Constant-register mapper preloaded for this cartridge
pub fn const_fixup(rom_info: &RomInfo) -> ConstMapper {
    let mut mapper = ConstMapper::new();
    for fixup in CONST_FIXUPS
        .iter()
        .filter(|f| f.real_checksum == rom_info.real_checksum)
    {
        for &(index, value) in fixup.regs {
            mapper.set_register(index, value);
        }
    }
    mapper
}
