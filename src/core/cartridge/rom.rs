// genesis-bus-rs/src/core/cartridge/rom.rs

use crate::core::memory::sram::{SRAM_DEFAULT_END, SRAM_DEFAULT_START};

/// Header field offsets
const HEADER_CONSOLE: usize = 0x100;
const HEADER_DOMESTIC: usize = 0x120;
const HEADER_INTERNATIONAL: usize = 0x150;
const HEADER_SERIAL: usize = 0x180;
const HEADER_CHECKSUM: usize = 0x18E;
const HEADER_SRAM: usize = 0x1B0;
const HEADER_REGION: usize = 0x1F0;

/// Checksum covers everything after the header
const CHECKSUM_START: usize = 0x200;

/// Information parsed from a Mega Drive ROM header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomInfo {
    pub console: String,
    pub domestic: String,
    pub international: String,
    pub serial: String,
    pub checksum: u16,
    pub real_checksum: u16,
    /// SRAM window declared with an "RA" descriptor
    pub sram_window: Option<(u32, u32)>,
    pub region: String,
    pub rom_size: usize,
}

impl RomInfo {
    /// Parse the header of a big-endian ROM image. Short images yield
    /// empty fields.
    pub fn parse(data: &[u8]) -> Self {
        let sram_window = match data.get(HEADER_SRAM..HEADER_SRAM + 12) {
            Some(desc) if &desc[0..2] == b"RA" => {
                let start = u32::from_be_bytes([desc[4], desc[5], desc[6], desc[7]]);
                let end = u32::from_be_bytes([desc[8], desc[9], desc[10], desc[11]]);
                if start <= end {
                    Some((start & 0xFFFFFF, end & 0xFFFFFF))
                } else {
                    None
                }
            }
            _ => None,
        };

        Self {
            console: header_string(data, HEADER_CONSOLE, 16),
            domestic: header_string(data, HEADER_DOMESTIC, 48),
            international: header_string(data, HEADER_INTERNATIONAL, 48),
            serial: header_string(data, HEADER_SERIAL, 14),
            checksum: data
                .get(HEADER_CHECKSUM..HEADER_CHECKSUM + 2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .unwrap_or(0),
            real_checksum: real_checksum(data),
            sram_window,
            region: header_string(data, HEADER_REGION, 3),
            rom_size: data.len(),
        }
    }

    /// SRAM window to use: the header descriptor, or $200000-$20FFFF
    pub fn sram_range(&self) -> (u32, u32) {
        self.sram_window.unwrap_or((SRAM_DEFAULT_START, SRAM_DEFAULT_END))
    }
}

fn header_string(data: &[u8], offset: usize, len: usize) -> String {
    data.get(offset..offset + len)
        .map(|bytes| {
            bytes
                .iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
                .collect::<String>()
                .trim()
                .to_string()
        })
        .unwrap_or_default()
}

/// Sum of big-endian words from $200 to the end of the image
pub fn real_checksum(data: &[u8]) -> u16 {
    data.get(CHECKSUM_START..)
        .unwrap_or(&[])
        .chunks(2)
        .map(|pair| match *pair {
            [hi, lo] => u16::from_be_bytes([hi, lo]),
            [hi] => (hi as u16) << 8,
            _ => 0,
        })
        .fold(0u16, |acc, w| acc.wrapping_add(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u8> {
        let mut rom = vec![0u8; 0x400];
        rom[0x100..0x110].copy_from_slice(b"SEGA MEGA DRIVE ");
        rom[0x180..0x18E].copy_from_slice(b"GM T-12056 -00");
        rom
    }

    #[test]
    fn test_parse_header() {
        let mut rom = header();
        rom[0x18E] = 0x12;
        rom[0x18F] = 0x34;
        rom[0x200] = 0x01;
        rom[0x201] = 0x02;
        rom[0x3FE] = 0x00;
        rom[0x3FF] = 0x03;

        let info = RomInfo::parse(&rom);
        assert_eq!(info.console, "SEGA MEGA DRIVE");
        assert_eq!(info.serial, "GM T-12056 -00");
        assert_eq!(info.checksum, 0x1234);
        assert_eq!(info.real_checksum, 0x0105);
        assert_eq!(info.rom_size, 0x400);
    }

    #[test]
    fn test_sram_descriptor() {
        let mut rom = header();
        assert_eq!(RomInfo::parse(&rom).sram_range(), (0x200000, 0x20FFFF));

        rom[0x1B0..0x1BC].copy_from_slice(&[
            b'R', b'A', 0xF8, 0x20, 0x00, 0x20, 0x00, 0x01, 0x00, 0x20, 0x3F, 0xFF,
        ]);
        assert_eq!(RomInfo::parse(&rom).sram_range(), (0x200001, 0x203FFF));
    }

    #[test]
    fn test_short_image() {
        let info = RomInfo::parse(&[0xFF; 16]);
        assert!(info.console.is_empty());
        assert_eq!(info.real_checksum, 0);
    }
}
