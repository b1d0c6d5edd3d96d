// genesis-bus-rs/src/core/cartridge/mod.rs

//! Cartridge slot
//!
//! Holds the ROM image, resolves the 20 physical 512 KB banks through the
//! active mapper, and services the /TIME register window ($A130xx) as well
//! as battery-backed SRAM and serial EEPROM save memory.

pub mod eeprom;
pub mod mapper;
pub mod rom;

use crate::core::memory::{
    byte_lane, sram::SaveRam, words_from_be_bytes, MemoryError, MemoryResult, ADDRESS_MASK,
    MAX_ROM_SIZE,
};
use eeprom::EepromI2C;
use mapper::{
    CartBank, Mapper, MapperType, Ssf2Mapper, CART_BANK_SHIFT, CART_BANK_SIZE, NUM_CART_BANKS,
};
use rom::RomInfo;

use log::{debug, info, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// /TIME register controlling SRAM mapping
pub const TIME_SRAM_CONTROL: u8 = 0xF1;

/// Cartridge inserted in the console
pub struct RomCartridge {
    /// Image as native 16-bit words
    rom: Vec<u16>,
    rom_pages: usize,
    info: RomInfo,
    mapper: Mapper,
    cart_banks: [CartBank; NUM_CART_BANKS],
    sram: SaveRam,
    eeprom: Option<EepromI2C>,
}

impl RomCartridge {
    /// Empty slot: every cartridge access reads open bus
    pub fn new() -> Self {
        Self {
            rom: Vec::new(),
            rom_pages: 0,
            info: RomInfo::default(),
            mapper: Mapper::Flat,
            cart_banks: [CartBank::Unused; NUM_CART_BANKS],
            sram: SaveRam::default(),
            eeprom: None,
        }
    }

    /// Load a ROM image from disk
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> MemoryResult<Self> {
        let mut file = File::open(path).map_err(|_| MemoryError::InvalidCartridge)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).map_err(|_| MemoryError::InvalidCartridge)?;

        Self::load_from_buffer(&buffer)
    }

    /// Load a big-endian ROM image and detect its mapper and save memory
    pub fn load_from_buffer(buffer: &[u8]) -> MemoryResult<Self> {
        if buffer.is_empty() {
            return Err(MemoryError::InvalidCartridge);
        }
        if buffer.len() > MAX_ROM_SIZE {
            return Err(MemoryError::RomTooLarge);
        }

        let info = RomInfo::parse(buffer);
        let mapper = match mapper::detect_mapper(&info) {
            MapperType::Const400000 => Mapper::Const400000(mapper::const_fixup(&info)),
            other => Mapper::new(other),
        };

        let (sram_start, sram_end) = info.sram_range();
        let mut sram = SaveRam::new(sram_start, sram_end);
        let eeprom = eeprom::detect_eeprom(&info.serial);

        // SRAM above the image is mapped at power-on; games whose SRAM
        // overlaps ROM enable it through $A130F1.
        if eeprom.is_none() && buffer.len() <= sram.start() as usize {
            sram.set_enabled(true);
        }

        info!(
            "Cartucho carregado: {} bytes, Mapper: {}, SRAM: ${:06X}-${:06X} ({}), EEPROM: {}",
            buffer.len(),
            mapper.mapper_type(),
            sram.start(),
            sram.end(),
            if sram.is_enabled() { "on" } else { "off" },
            eeprom.is_some()
        );

        let mut cart = Self {
            rom: words_from_be_bytes(buffer),
            rom_pages: (buffer.len() + CART_BANK_SIZE - 1) / CART_BANK_SIZE,
            info,
            mapper,
            cart_banks: [CartBank::Unused; NUM_CART_BANKS],
            sram,
            eeprom,
        };
        cart.update_mapping();
        Ok(cart)
    }

    pub fn info(&self) -> &RomInfo {
        &self.info
    }

    pub fn is_loaded(&self) -> bool {
        !self.rom.is_empty()
    }

    pub fn rom_pages(&self) -> usize {
        self.rom_pages
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Replace mapper state and rebuild the bank table
    pub fn set_mapper(&mut self, mapper: Mapper) {
        self.mapper = mapper;
        self.update_mapping();
    }

    pub fn cart_banks(&self) -> &[CartBank; NUM_CART_BANKS] {
        &self.cart_banks
    }

    pub fn sram(&self) -> &SaveRam {
        &self.sram
    }

    pub fn sram_mut(&mut self) -> &mut SaveRam {
        &mut self.sram
    }

    pub fn eeprom(&self) -> Option<&EepromI2C> {
        self.eeprom.as_ref()
    }

    pub fn eeprom_mut(&mut self) -> Option<&mut EepromI2C> {
        self.eeprom.as_mut()
    }

    /// Console reset: bank registers return to power-on values
    pub fn reset(&mut self) {
        self.mapper.reset();
        if let Some(eeprom) = self.eeprom.as_mut() {
            eeprom.reset();
        }
        self.update_mapping();
    }

    /// Recompute what every physical bank resolves to
    pub fn update_mapping(&mut self) {
        for (phys, bank) in self.cart_banks.iter_mut().enumerate() {
            *bank = self.mapper.resolve_bank(phys, self.rom_pages);
        }
    }

    #[inline]
    fn cart_bank(&self, addr: u32) -> CartBank {
        self.cart_banks
            .get((addr >> CART_BANK_SHIFT) as usize)
            .copied()
            .unwrap_or(CartBank::Unused)
    }

    /// Byte offset into the image, mirrored when past the end
    #[inline]
    fn image_offset(&self, page: usize, addr: u32) -> usize {
        let offset = page * CART_BANK_SIZE + (addr as usize & (CART_BANK_SIZE - 1));
        offset % (self.rom.len() * 2)
    }

    #[inline]
    fn image_byte(&self, offset: usize) -> u8 {
        let bytes: &[u8] = bytemuck::cast_slice(&self.rom);
        bytes[byte_lane(offset)]
    }

    #[inline]
    fn image_word(&self, offset: usize) -> u16 {
        self.rom[offset >> 1]
    }

    /// Image offset for a ROM-area address, if the bank is backed
    fn rom_offset(&self, addr: u32) -> Option<usize> {
        if self.rom.is_empty() {
            return None;
        }
        match self.cart_bank(addr) {
            CartBank::Rom(page) => Some(self.image_offset(page as usize, addr)),
            CartBank::Realtec => match &self.mapper {
                Mapper::Realtec(m) => Some(m.rom_offset(addr) % (self.rom.len() * 2)),
                _ => None,
            },
            CartBank::Const400000 => {
                // Fall through to ordinary flat addressing
                let phys = (addr >> CART_BANK_SHIFT) as usize;
                match Mapper::Flat.resolve_bank(phys, self.rom_pages) {
                    CartBank::Rom(page) => Some(self.image_offset(page as usize, addr)),
                    _ => None,
                }
            }
            CartBank::Unused => None,
        }
    }

    /// Cartridge byte read ($000000-$9FFFFF)
    pub fn read_byte(&self, addr: u32) -> u8 {
        let addr = addr & ADDRESS_MASK;

        if let Some(eeprom) = &self.eeprom {
            if eeprom.is_mapped(addr) {
                return eeprom.read_byte(addr);
            }
        }
        if self.sram.contains(addr) {
            return self.sram.read_byte(addr);
        }
        if let (CartBank::Const400000, Mapper::Const400000(m)) =
            (self.cart_bank(addr), &self.mapper)
        {
            if let Some(value) = m.read(addr) {
                return value;
            }
        }

        match self.rom_offset(addr) {
            Some(offset) => self.image_byte(offset),
            None => 0xFF,
        }
    }

    /// Cartridge word read; `addr` is word aligned
    pub fn read_word(&self, addr: u32) -> u16 {
        let addr = addr & ADDRESS_MASK & !1;

        let special = self.sram.contains(addr)
            || self.sram.contains(addr | 1)
            || self.cart_bank(addr) == CartBank::Const400000
            || self
                .eeprom
                .as_ref()
                .map_or(false, |e| e.is_mapped(addr) || e.is_mapped(addr | 1));

        if special {
            return ((self.read_byte(addr) as u16) << 8) | self.read_byte(addr | 1) as u16;
        }

        match self.rom_offset(addr) {
            Some(offset) => self.image_word(offset),
            None => 0xFFFF,
        }
    }

    /// Cartridge byte write. ROM itself is read-only.
    pub fn write_byte(&mut self, addr: u32, data: u8) {
        let addr = addr & ADDRESS_MASK;

        if let Mapper::Realtec(m) = &mut self.mapper {
            if m.write_register(addr, data) {
                self.update_mapping();
                return;
            }
        }
        self.write_save_memory(addr, data);
    }

    /// Cartridge word write
    pub fn write_word(&mut self, addr: u32, data: u16) {
        let addr = addr & ADDRESS_MASK & !1;

        if let Mapper::Realtec(m) = &mut self.mapper {
            if m.write_register(addr, data as u8) {
                self.update_mapping();
                return;
            }
        }
        self.write_save_memory(addr, (data >> 8) as u8);
        self.write_save_memory(addr | 1, data as u8);
    }

    fn write_save_memory(&mut self, addr: u32, data: u8) {
        if let Some(eeprom) = self.eeprom.as_mut() {
            if eeprom.is_mapped(addr) {
                eeprom.write_byte(addr, data);
                return;
            }
        }
        if self.sram.contains(addr) {
            self.sram.write_byte(addr, data);
        } else {
            debug!("Escrita ignorada na ROM: ${:06X} = ${:02X}", addr, data);
        }
    }

    /// /TIME byte read ($A130xx). Nothing on the supported boards drives it.
    pub fn read_byte_time(&self, _addr: u8) -> u8 {
        0xFF
    }

    /// /TIME word read
    pub fn read_word_time(&self, _addr: u8) -> u16 {
        0xFFFF
    }

    /// /TIME byte write ($A130xx)
    pub fn write_byte_time(&mut self, addr: u8, data: u8) {
        if addr == TIME_SRAM_CONTROL {
            if self.eeprom.is_none() {
                self.sram.set_enabled(data & 0x01 != 0);
                self.sram.set_write_protect(data & 0x02 != 0);
                debug!("SRAM control: ${:02X}", data);
            }
            return;
        }

        if let Mapper::Ssf2(m) = &mut self.mapper {
            if let Some(phys) = Ssf2Mapper::bank_for_time_register(addr) {
                m.set_bank(phys, data);
                self.update_mapping();
                return;
            }
        }

        warn!("/TIME: escrita ignorada em $A130{:02X} = ${:02X}", addr, data);
    }

    /// /TIME word write: the register sits on the odd (low) byte
    pub fn write_word_time(&mut self, addr: u8, data: u16) {
        self.write_byte_time(addr | 1, data as u8);
    }

    /// Serialize mapper, SRAM and EEPROM state
    pub fn save_state(&self) -> Vec<u8> {
        let mut state = Vec::new();

        let mapper = self.mapper.save_state();
        state.extend_from_slice(&(mapper.len() as u32).to_le_bytes());
        state.extend_from_slice(&mapper);

        state.push(self.sram.is_enabled() as u8);
        state.push(self.sram.is_write_protected() as u8);
        state.extend_from_slice(&(self.sram.size() as u32).to_le_bytes());
        state.extend_from_slice(self.sram.data());

        if let Some(eeprom) = &self.eeprom {
            state.extend_from_slice(&eeprom.save_state());
        }

        state
    }

    /// Restore state saved from the same cartridge
    pub fn load_state(&mut self, data: &[u8]) -> bool {
        let mut pos = 0;

        let mapper_len = match read_u32(data, &mut pos) {
            Some(len) => len as usize,
            None => return false,
        };
        let mapper = match data.get(pos..pos + mapper_len).and_then(Mapper::load_state) {
            Some(mapper) => mapper,
            None => return false,
        };
        pos += mapper_len;

        let (enabled, write_protect) = match data.get(pos..pos + 2) {
            Some(flags) => (flags[0] != 0, flags[1] != 0),
            None => return false,
        };
        pos += 2;

        let sram_len = match read_u32(data, &mut pos) {
            Some(len) if len as usize == self.sram.size() => len as usize,
            _ => return false,
        };
        let sram_data = match data.get(pos..pos + sram_len) {
            Some(bytes) => bytes,
            None => return false,
        };
        pos += sram_len;

        if let Some(eeprom) = self.eeprom.as_mut() {
            match data.get(pos..) {
                Some(rest) if eeprom.load_state(rest) => {}
                _ => return false,
            }
        }

        self.sram.load_from_buffer(sram_data);
        self.sram.set_enabled(enabled);
        self.sram.set_write_protect(write_protect);
        self.set_mapper(mapper);
        true
    }
}

impl Default for RomCartridge {
    fn default() -> Self {
        Self::new()
    }
}

fn read_u32(data: &[u8], pos: &mut usize) -> Option<u32> {
    let bytes = data.get(*pos..*pos + 4)?;
    *pos += 4;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Image of `pages` 512 KB pages; every word holds its page number in
    /// the high byte and the low address bits in the low byte.
    fn paged_rom(pages: usize) -> Vec<u8> {
        let mut rom = vec![0u8; pages * CART_BANK_SIZE];
        for (i, pair) in rom.chunks_mut(2).enumerate() {
            let offset = i * 2;
            pair[0] = (offset / CART_BANK_SIZE) as u8;
            pair[1] = (offset & 0xFF) as u8;
        }
        rom
    }

    fn with_console(mut rom: Vec<u8>, console: &[u8; 16]) -> Vec<u8> {
        rom[0x100..0x110].copy_from_slice(console);
        rom
    }

    fn with_serial(mut rom: Vec<u8>, serial: &[u8; 14]) -> Vec<u8> {
        rom[0x180..0x18E].copy_from_slice(serial);
        rom
    }

    // Acclaim 32M board: SCL on $200000 bit 0, SDA on $200001 bit 0
    fn eeprom_sda(cart: &mut RomCartridge, level: u8) {
        cart.write_byte(0x200001, level);
    }

    fn eeprom_scl(cart: &mut RomCartridge, level: u8) {
        cart.write_byte(0x200000, level);
    }

    fn eeprom_start(cart: &mut RomCartridge) {
        eeprom_sda(cart, 1);
        eeprom_scl(cart, 1);
        eeprom_sda(cart, 0);
        eeprom_scl(cart, 0);
    }

    fn eeprom_stop(cart: &mut RomCartridge) {
        eeprom_sda(cart, 0);
        eeprom_scl(cart, 1);
        eeprom_sda(cart, 1);
    }

    fn eeprom_send(cart: &mut RomCartridge, byte: u8) {
        // Eight data bits, then the ACK clock with SDA released
        for bit in (0..8).rev().map(|i| (byte >> i) & 1).chain([1]) {
            eeprom_sda(cart, bit);
            eeprom_scl(cart, 1);
            eeprom_scl(cart, 0);
        }
    }

    fn eeprom_recv(cart: &mut RomCartridge) -> u8 {
        let mut value = 0;
        for _ in 0..8 {
            value = (value << 1) | (cart.read_byte(0x200001) & 1);
            eeprom_scl(cart, 1);
            eeprom_scl(cart, 0);
        }
        value
    }

    #[test]
    fn test_empty_slot_reads_open_bus() {
        let cart = RomCartridge::new();
        assert_eq!(cart.read_byte(0x000100), 0xFF);
        assert_eq!(cart.read_word(0x000100), 0xFFFF);
    }

    #[test]
    fn test_load_rejects_bad_images() {
        assert_eq!(RomCartridge::load_from_buffer(&[]).err(), Some(MemoryError::InvalidCartridge));
        let huge = vec![0u8; MAX_ROM_SIZE + 2];
        assert_eq!(RomCartridge::load_from_buffer(&huge).err(), Some(MemoryError::RomTooLarge));
    }

    #[test]
    fn test_flat_rom_reads_and_mirrors() {
        let cart = RomCartridge::load_from_buffer(&paged_rom(2)).unwrap();
        assert_eq!(cart.mapper().mapper_type(), MapperType::Flat);
        assert_eq!(cart.read_word(0x080010), 0x0110);
        assert_eq!(cart.read_byte(0x080010), 0x01);
        assert_eq!(cart.read_byte(0x080011), 0x10);
        // 1 MB image mirrored in the 4 MB area
        assert_eq!(cart.read_word(0x180010), 0x0110);
        // Nothing at $400000 for a small image
        assert_eq!(cart.read_word(0x400000), 0xFFFF);
    }

    #[test]
    fn test_odd_sized_image_wraps() {
        let rom = vec![0x12, 0x34, 0x56];
        let cart = RomCartridge::load_from_buffer(&rom).unwrap();
        assert_eq!(cart.read_word(0x000000), 0x1234);
        assert_eq!(cart.read_word(0x000002), 0x56FF);
        assert_eq!(cart.read_word(0x000004), 0x1234);
    }

    #[test]
    fn test_ssf2_banking_through_time() {
        let rom = with_console(paged_rom(10), b"SEGA SSF        ");
        let mut cart = RomCartridge::load_from_buffer(&rom).unwrap();
        assert_eq!(cart.mapper().mapper_type(), MapperType::Ssf2);

        // Bank 7 -> page 9
        cart.write_byte_time(0xFF, 9);
        assert_eq!(cart.read_word(0x380000) >> 8, 9);

        // Bank 0 stays on page 0
        cart.write_byte_time(0xF1 + 2, 5);
        assert_eq!(cart.read_word(0x080000) >> 8, 5);
        assert_eq!(cart.read_word(0x000000) >> 8, 0);

        // Page past the image: identity
        cart.write_word_time(0xFE, 0x0040);
        assert_eq!(cart.read_word(0x380000) >> 8, 7);

        // Nothing above 4 MB
        assert_eq!(cart.read_word(0x480000), 0xFFFF);

        cart.reset();
        assert_eq!(cart.read_word(0x080000) >> 8, 1);
    }

    #[test]
    fn test_const_window_falls_through_to_rom() {
        let mut rom = paged_rom(10);
        // Give the image the Super Bubble Bobble detection checksum
        let sum = rom::real_checksum(&rom);
        let fix = 0x16CDu16.wrapping_sub(sum);
        let last = rom.len() - 2;
        let old = u16::from_be_bytes([rom[last], rom[last + 1]]);
        rom[last..].copy_from_slice(&old.wrapping_add(fix).to_be_bytes());
        assert_eq!(rom::real_checksum(&rom), 0x16CD);

        let cart = RomCartridge::load_from_buffer(&rom).unwrap();
        assert_eq!(cart.mapper().mapper_type(), MapperType::Const400000);
        assert_eq!(cart.read_byte(0x400000), 0x55);
        assert_eq!(cart.read_byte(0x400002), 0x0F);
        // Unmasked byte in the window reads ROM page 8
        assert_eq!(cart.read_byte(0x400004), 0x08);
        assert_eq!(cart.read_word(0x400000), 0x5500);
    }

    #[test]
    fn test_sram_control_register() {
        // 4 MB image overlapping the default SRAM window
        let mut cart = RomCartridge::load_from_buffer(&paged_rom(8)).unwrap();
        assert!(!cart.sram().is_enabled());
        assert_eq!(cart.read_byte(0x200001), 0x00);

        cart.write_byte_time(TIME_SRAM_CONTROL, 0x01);
        cart.write_byte(0x200001, 0x5A);
        assert_eq!(cart.read_byte(0x200001), 0x5A);

        // Write protect
        cart.write_word_time(0xF0, 0x0003);
        cart.write_byte(0x200001, 0x00);
        assert_eq!(cart.read_byte(0x200001), 0x5A);

        // Unmapped again: ROM shows through
        cart.write_byte_time(TIME_SRAM_CONTROL, 0x00);
        assert_eq!(cart.read_byte(0x200000), 0x04);
        assert_eq!(cart.read_byte(0x200001), 0x00);
    }

    #[test]
    fn test_small_rom_maps_sram_at_power_on() {
        let mut cart = RomCartridge::load_from_buffer(&paged_rom(1)).unwrap();
        assert!(cart.sram().is_enabled());
        cart.write_word(0x200000, 0x1234);
        assert_eq!(cart.read_word(0x200000), 0x1234);
    }

    #[test]
    fn test_realtec_boot_then_paging() {
        let mut rom = paged_rom(1);
        rom[0x7E000] = 0xB0;
        rom[0x7E001] = 0x07;
        let mut cart = RomCartridge::load_from_buffer(&rom).unwrap();
        cart.set_mapper(Mapper::new(MapperType::Realtec));

        assert_eq!(cart.read_word(0x000000), 0xB007);
        assert_eq!(cart.read_word(0x102000), 0xB007);

        cart.write_byte(0x400000, 0x01);
        assert_eq!(cart.read_word(0x010010), 0x0010);
    }

    #[test]
    fn test_state_round_trip() {
        let rom = with_console(paged_rom(10), b"SEGA SSF        ");
        let mut cart = RomCartridge::load_from_buffer(&rom).unwrap();
        cart.write_byte_time(0xF3, 8);
        let saved = cart.save_state();

        let mut other = RomCartridge::load_from_buffer(&rom).unwrap();
        assert!(other.load_state(&saved));
        assert_eq!(other.read_word(0x080000) >> 8, 8);
        assert!(!other.load_state(&saved[..3]));
    }

    #[test]
    fn test_eeprom_cartridge() {
        let rom = with_serial(paged_rom(1), b"GM T-81406 -00");
        let mut cart = RomCartridge::load_from_buffer(&rom).unwrap();
        assert_eq!(
            cart.eeprom().map(EepromI2C::chip_type),
            Some(eeprom::EepromI2CType::C24C04)
        );
        // Small image, but the EEPROM owns the save window
        assert!(!cart.sram().is_enabled());

        // Upper 256-byte block (P0 set), word $45
        eeprom_start(&mut cart);
        eeprom_send(&mut cart, 0xA2);
        eeprom_send(&mut cart, 0x45);
        eeprom_send(&mut cart, 0x3C);
        eeprom_stop(&mut cart);
        assert_eq!(cart.eeprom().unwrap().data()[0x145], 0x3C);

        // SRAM control has no effect on EEPROM boards
        cart.write_byte_time(TIME_SRAM_CONTROL, 0x01);
        assert!(!cart.sram().is_enabled());

        // EEPROM lines take priority over an enabled SRAM window
        cart.sram_mut().set_enabled(true);
        eeprom_start(&mut cart);
        eeprom_send(&mut cart, 0xA2);
        eeprom_send(&mut cart, 0x45);
        eeprom_start(&mut cart);
        eeprom_send(&mut cart, 0xA3);
        assert_eq!(eeprom_recv(&mut cart), 0x3C);
        assert!(cart.sram().data().iter().all(|&b| b == 0xFF));
        // SDA output only drives bit 0
        assert_eq!(cart.read_byte(0x200001) & !1, 0);

        // Save state carries the EEPROM array
        let saved = cart.save_state();
        let mut other = RomCartridge::load_from_buffer(&rom).unwrap();
        assert!(other.load_state(&saved));
        assert_eq!(other.eeprom().unwrap().data()[0x145], 0x3C);
        assert!(!other.load_state(&saved[..saved.len() - 1]));
    }
}
