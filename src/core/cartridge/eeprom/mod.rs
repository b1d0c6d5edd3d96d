// genesis-bus-rs/src/core/cartridge/eeprom/mod.rs

//! EEPROM support module
//!
//! Serial EEPROMs (I2C 24Cxx) used as save memory by a handful of Sega,
//! EA, Acclaim and Codemasters cartridges. The chip is driven by bit-banging
//! SDA/SCL through cartridge addresses, so each board wires the lines to
//! different address/bit pairs.

pub mod eeprom_i2c;

pub use eeprom_i2c::{EepromI2C, EepromI2CState, EepromI2CType};

use log::info;

/// Cartridge address/bit assignment of the I2C lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromWiring {
    pub sda_in_addr: u32,
    pub sda_in_bit: u8,
    pub scl_addr: u32,
    pub scl_bit: u8,
    pub sda_out_addr: u32,
    pub sda_out_bit: u8,
}

/// Sega boards: everything on $200001, SCL bit 1, SDA bit 0
pub const WIRING_SEGA: EepromWiring = EepromWiring {
    sda_in_addr: 0x200001,
    sda_in_bit: 0,
    scl_addr: 0x200001,
    scl_bit: 1,
    sda_out_addr: 0x200001,
    sda_out_bit: 0,
};

/// Electronic Arts boards: SCL bit 6, SDA bit 7
pub const WIRING_EA: EepromWiring = EepromWiring {
    sda_in_addr: 0x200001,
    sda_in_bit: 7,
    scl_addr: 0x200001,
    scl_bit: 6,
    sda_out_addr: 0x200001,
    sda_out_bit: 7,
};

/// Acclaim 16M boards (NBA Jam)
pub const WIRING_ACCLAIM_16M: EepromWiring = EepromWiring {
    sda_in_addr: 0x200000,
    sda_in_bit: 0,
    scl_addr: 0x200000,
    scl_bit: 1,
    sda_out_addr: 0x200001,
    sda_out_bit: 1,
};

/// Acclaim 32M boards: SCL on its own byte
pub const WIRING_ACCLAIM_32M: EepromWiring = EepromWiring {
    sda_in_addr: 0x200001,
    sda_in_bit: 0,
    scl_addr: 0x200000,
    scl_bit: 0,
    sda_out_addr: 0x200001,
    sda_out_bit: 0,
};

/// Codemasters boards
pub const WIRING_CODEMASTERS: EepromWiring = EepromWiring {
    sda_in_addr: 0x300000,
    sda_in_bit: 0,
    scl_addr: 0x300000,
    scl_bit: 1,
    sda_out_addr: 0x380001,
    sda_out_bit: 7,
};

/// Known EEPROM cartridges, keyed on the header serial
static EEPROM_DATABASE: &[(&str, EepromI2CType, EepromWiring)] = &[
    ("T-50176", EepromI2CType::X24C01, WIRING_EA), // Rings of Power
    ("T-50396", EepromI2CType::X24C01, WIRING_EA), // NHLPA Hockey 93
    ("T-50446", EepromI2CType::X24C01, WIRING_EA), // John Madden Football 93
    ("T-50516", EepromI2CType::X24C01, WIRING_EA), // John Madden Football 93 (Championship Ed.)
    ("T-50606", EepromI2CType::X24C01, WIRING_EA), // Bill Walsh College Football
    ("T-12046", EepromI2CType::X24C01, WIRING_SEGA), // Megaman - The Wily Wars
    ("T-12053", EepromI2CType::X24C01, WIRING_SEGA), // Rockman Mega World
    ("MK-1215", EepromI2CType::X24C01, WIRING_SEGA), // Evander 'Real Deal' Holyfield's Boxing
    ("MK-1228", EepromI2CType::X24C01, WIRING_SEGA), // Greatest Heavyweights of the Ring (U)(E)
    ("G-5538", EepromI2CType::X24C01, WIRING_SEGA), // Greatest Heavyweights of the Ring (J)
    // Greatest Heavyweights of the Ring (Prototype)
    ("PR-1993", EepromI2CType::X24C01, WIRING_SEGA),
    ("G-4060", EepromI2CType::X24C01, WIRING_SEGA), // Wonderboy in Monster World
    ("00001211", EepromI2CType::X24C01, WIRING_SEGA), // Sports Talk Baseball
    ("00004076", EepromI2CType::X24C01, WIRING_SEGA), // Honoo no Toukyuuji Dodge Danpei
    ("G-4524", EepromI2CType::X24C01, WIRING_SEGA), // Ninja Burai Densetsu
    ("00054503", EepromI2CType::X24C01, WIRING_SEGA), // Game Toshokan
    ("T-81033", EepromI2CType::X24C02, WIRING_ACCLAIM_16M), // NBA Jam (J)
    ("T-081326", EepromI2CType::X24C02, WIRING_ACCLAIM_16M), // NBA Jam (UE)
    ("T-081276", EepromI2CType::C24C02, WIRING_ACCLAIM_32M), // NFL Quarterback Club
    ("T-81406", EepromI2CType::C24C04, WIRING_ACCLAIM_32M), // NBA Jam TE
    ("T-081586", EepromI2CType::C24C16, WIRING_ACCLAIM_32M), // NFL Quarterback Club '96
    ("T-81476", EepromI2CType::C24C65, WIRING_ACCLAIM_32M), // Frank Thomas Big Hurt Baseball
    ("T-81576", EepromI2CType::C24C65, WIRING_ACCLAIM_32M), // College Slam
    ("T-120106", EepromI2CType::C24C08, WIRING_CODEMASTERS), // Brian Lara Cricket
    ("T-120096", EepromI2CType::C24C16, WIRING_CODEMASTERS), // Micro Machines 2 - Turbo Tournament
    // Brian Lara Cricket 96 / Shane Warne Cricket
    ("T-120146", EepromI2CType::C24C65, WIRING_CODEMASTERS),
];

/// Look up the EEPROM fitted to a cartridge from its header serial
pub fn detect_eeprom(serial: &str) -> Option<EepromI2C> {
    EEPROM_DATABASE
        .iter()
        .find(|(id, _, _)| serial.contains(id))
        .map(|&(id, chip, wiring)| {
            info!("EEPROM detected for {}: {:?}", id, chip);
            EepromI2C::new(chip, wiring)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_eeprom() {
        let eeprom = detect_eeprom("GM T-081326 -00").unwrap();
        assert_eq!(eeprom.chip_type(), EepromI2CType::X24C02);
        assert_eq!(eeprom.wiring(), WIRING_ACCLAIM_16M);

        let eeprom = detect_eeprom("GM T-50396 -00").unwrap();
        assert_eq!(eeprom.wiring().scl_bit, 6);
        assert_eq!(eeprom.wiring().sda_in_bit, 7);

        assert!(detect_eeprom("GM 00001009-00").is_none());
    }
}
