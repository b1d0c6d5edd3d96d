// genesis-bus-rs/src/core/cartridge/eeprom/eeprom_i2c.rs

use super::EepromWiring;
use log::debug;

/// I2C EEPROM state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EepromI2CState {
    StandBy,
    WaitStop,
    GetDeviceAdr,
    GetWordAdr7Bits,
    GetWordAdrHigh,
    GetWordAdrLow,
    WriteData,
    ReadData,
}

impl EepromI2CState {
    fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => EepromI2CState::StandBy,
            1 => EepromI2CState::WaitStop,
            2 => EepromI2CState::GetDeviceAdr,
            3 => EepromI2CState::GetWordAdr7Bits,
            4 => EepromI2CState::GetWordAdrHigh,
            5 => EepromI2CState::GetWordAdrLow,
            6 => EepromI2CState::WriteData,
            7 => EepromI2CState::ReadData,
            _ => return None,
        })
    }
}

/// I2C EEPROM type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EepromI2CType {
    X24C01,
    X24C02,
    C24C02,
    C24C04,
    C24C08,
    C24C16,
    C24C65,
}

/// I2C EEPROM specifications
#[derive(Debug, Clone, Copy)]
struct EepromI2CSpec {
    address_bits: u8,
    size_mask: u16,
    pagewrite_mask: u16,
}

impl EepromI2CSpec {
    fn from_type(eeprom_type: EepromI2CType) -> Self {
        match eeprom_type {
            EepromI2CType::X24C01 => {
                Self { address_bits: 7, size_mask: 0x7F, pagewrite_mask: 0x03 }
            }
            EepromI2CType::X24C02 => {
                Self { address_bits: 8, size_mask: 0xFF, pagewrite_mask: 0x03 }
            }
            EepromI2CType::C24C02 => {
                Self { address_bits: 8, size_mask: 0xFF, pagewrite_mask: 0x07 }
            }
            EepromI2CType::C24C04 => {
                Self { address_bits: 8, size_mask: 0x1FF, pagewrite_mask: 0x0F }
            }
            EepromI2CType::C24C08 => {
                Self { address_bits: 8, size_mask: 0x3FF, pagewrite_mask: 0x0F }
            }
            EepromI2CType::C24C16 => {
                Self { address_bits: 8, size_mask: 0x7FF, pagewrite_mask: 0x0F }
            }
            EepromI2CType::C24C65 => {
                Self { address_bits: 16, size_mask: 0x1FFF, pagewrite_mask: 0x3F }
            }
        }
    }
}

/// I2C EEPROM structure
///
/// Owns its memory array and knows which cartridge address/bit pairs carry
/// SDA and SCL.
#[derive(Debug, Clone)]
pub struct EepromI2C {
    sda: u8,                // Current SDA line state
    scl: u8,                // Current SCL line state
    old_sda: u8,            // Previous SDA line state
    old_scl: u8,            // Previous SCL line state
    cycles: u8,             // Operation internal cycle (0-9)
    rw: bool,               // Operation type (true: READ, false: WRITE)
    device_address: u16,    // Device address
    word_address: u16,      // Memory address
    buffer: u8,             // Write buffer
    state: EepromI2CState,  // Current operation state
    chip: EepromI2CType,
    spec: EepromI2CSpec,    // EEPROM characteristics
    wiring: EepromWiring,
    data: Vec<u8>,
    dirty: bool,
}

impl EepromI2C {
    pub fn new(chip: EepromI2CType, wiring: EepromWiring) -> Self {
        let spec = EepromI2CSpec::from_type(chip);
        Self {
            sda: 1,
            scl: 1,
            old_sda: 1,
            old_scl: 1,
            cycles: 0,
            rw: false,
            device_address: 0,
            word_address: 0,
            buffer: 0,
            state: EepromI2CState::StandBy,
            chip,
            spec,
            wiring,
            data: vec![0xFF; spec.size_mask as usize + 1],
            dirty: false,
        }
    }

    pub fn chip_type(&self) -> EepromI2CType {
        self.chip
    }

    pub fn wiring(&self) -> EepromWiring {
        self.wiring
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Restore the memory array from battery data
    pub fn load_from_buffer(&mut self, buffer: &[u8]) {
        let len = buffer.len().min(self.data.len());
        self.data[..len].copy_from_slice(&buffer[..len]);
        self.dirty = false;
    }

    /// Reset the serial interface; the array is preserved
    pub fn reset(&mut self) {
        self.sda = 1;
        self.scl = 1;
        self.old_sda = 1;
        self.old_scl = 1;
        self.cycles = 0;
        self.rw = false;
        self.device_address = 0;
        self.word_address = 0;
        self.buffer = 0;
        self.state = EepromI2CState::StandBy;
    }

    /// True if `addr` is one of the wired line addresses
    #[inline]
    pub fn is_mapped(&self, addr: u32) -> bool {
        addr == self.wiring.sda_in_addr
            || addr == self.wiring.scl_addr
            || addr == self.wiring.sda_out_addr
    }

    /// Bus byte write; latches whichever lines live at `addr`
    pub fn write_byte(&mut self, addr: u32, data: u8) {
        let mut touched = false;
        if addr == self.wiring.sda_in_addr {
            self.sda = (data >> self.wiring.sda_in_bit) & 1;
            touched = true;
        }
        if addr == self.wiring.scl_addr {
            self.scl = (data >> self.wiring.scl_bit) & 1;
            touched = true;
        }
        if touched {
            self.update();
        }
    }

    /// Bus byte read; only the SDA output bit is driven
    pub fn read_byte(&self, addr: u32) -> u8 {
        if addr == self.wiring.sda_out_addr {
            self.out() << self.wiring.sda_out_bit
        } else {
            0
        }
    }

    /// Drive both lines directly
    pub fn write_lines(&mut self, sda: u8, scl: u8) {
        self.sda = sda & 1;
        self.scl = scl & 1;
        self.update();
    }

    /// Current SDA output
    pub fn out(&self) -> u8 {
        // Check EEPROM state
        if self.state == EepromI2CState::ReadData {
            // READ cycle
            if self.cycles < 9 {
                // Return memory array DATA bits
                let address = self.array_address();
                return (self.data[address] >> (8 - self.cycles)) & 1;
            }
        } else if self.cycles == 9 {
            // ACK cycle
            return 0;
        }

        // Return latched /SDA input by default
        self.sda
    }

    #[inline]
    fn array_address(&self) -> usize {
        ((self.device_address | self.word_address) & self.spec.size_mask) as usize
    }

    #[inline]
    fn scl_falling(&self) -> bool {
        self.old_scl != 0 && self.scl == 0
    }

    #[inline]
    fn scl_rising(&self) -> bool {
        self.old_scl == 0 && self.scl != 0
    }

    /// Update EEPROM state based on SCL/SDA changes
    fn update(&mut self) {
        match self.state {
            EepromI2CState::StandBy => {
                self.detect_start();
            }

            EepromI2CState::WaitStop => {
                self.detect_stop();
            }

            EepromI2CState::GetWordAdr7Bits => {
                self.detect_start();
                self.detect_stop();

                if self.scl_falling() {
                    if self.cycles < 9 {
                        self.cycles += 1;
                    } else {
                        self.cycles = 1;
                        self.state = if self.rw {
                            EepromI2CState::ReadData
                        } else {
                            EepromI2CState::WriteData
                        };
                        self.buffer = 0;
                    }
                } else if self.scl_rising() {
                    if self.cycles < 8 {
                        // Latch Word Address bits 6-0
                        self.word_address |= (self.sda as u16) << (7 - self.cycles);
                    } else if self.cycles == 8 {
                        self.rw = self.sda != 0;
                    }
                }
            }

            EepromI2CState::GetDeviceAdr => {
                self.detect_start();
                self.detect_stop();

                if self.scl_falling() {
                    if self.cycles < 9 {
                        self.cycles += 1;
                    } else {
                        // Device Address bits sit above the word address;
                        // 16-bit parts use them as chip select only
                        self.device_address = if self.spec.address_bits >= 16 {
                            0
                        } else {
                            self.device_address << self.spec.address_bits
                        };

                        self.cycles = 1;
                        if self.rw {
                            self.state = EepromI2CState::ReadData;
                        } else {
                            self.word_address = 0;
                            self.state = if self.spec.address_bits == 16 {
                                EepromI2CState::GetWordAdrHigh
                            } else {
                                EepromI2CState::GetWordAdrLow
                            };
                        }
                    }
                } else if self.scl_rising() {
                    if self.cycles > 4 && self.cycles < 8 {
                        // Latch Device Address bits
                        self.device_address |= (self.sda as u16) << (7 - self.cycles);
                    } else if self.cycles == 8 {
                        self.rw = self.sda != 0;
                    }
                }
            }

            EepromI2CState::GetWordAdrHigh => {
                self.detect_start();
                self.detect_stop();

                if self.scl_falling() {
                    if self.cycles < 9 {
                        self.cycles += 1;
                    } else {
                        self.cycles = 1;
                        self.state = EepromI2CState::GetWordAdrLow;
                    }
                } else if self.scl_rising() && self.cycles > 0 && self.cycles < 9 {
                    if (self.spec.size_mask as u32) < (1u32 << (16 - self.cycles)) {
                        // Ignored bit: Device Address bits should be right-shifted
                        self.device_address >>= 1;
                    } else {
                        self.word_address |= (self.sda as u16) << (16 - self.cycles);
                    }
                }
            }

            EepromI2CState::GetWordAdrLow => {
                self.detect_start();
                self.detect_stop();

                if self.scl_falling() {
                    if self.cycles < 9 {
                        self.cycles += 1;
                    } else {
                        self.cycles = 1;
                        self.state = EepromI2CState::WriteData;
                        self.buffer = 0;
                    }
                } else if self.scl_rising() && self.cycles > 0 && self.cycles < 9 {
                    if (self.spec.size_mask as u32) < (1u32 << (8 - self.cycles)) {
                        self.device_address >>= 1;
                    } else {
                        self.word_address |= (self.sda as u16) << (8 - self.cycles);
                    }
                }
            }

            EepromI2CState::ReadData => {
                self.detect_start();
                self.detect_stop();

                if self.scl_falling() {
                    if self.cycles < 9 {
                        self.cycles += 1;
                    } else {
                        self.cycles = 1;
                    }
                } else if self.scl_rising() && self.cycles == 9 {
                    if self.sda != 0 {
                        // No ACK from master: end of read sequence
                        self.state = EepromI2CState::WaitStop;
                    } else {
                        // Roll up at maximum array size
                        self.word_address = (self.word_address + 1) & self.spec.size_mask;
                    }
                }
            }

            EepromI2CState::WriteData => {
                self.detect_start();
                self.detect_stop();

                if self.scl_falling() {
                    if self.cycles < 9 {
                        self.cycles += 1;
                    } else {
                        self.cycles = 1;
                    }
                } else if self.scl_rising() && self.cycles > 0 {
                    if self.cycles < 9 {
                        // Latch DATA bits 7-0 to write buffer
                        self.buffer |= self.sda << (8 - self.cycles);
                    } else {
                        let address = self.array_address();
                        debug!("EEPROM: write ${:02X} at ${:04X}", self.buffer, address);
                        self.data[address] = self.buffer;
                        self.dirty = true;
                        self.buffer = 0;

                        // Roll over at maximum page size
                        self.word_address = (self.word_address & !self.spec.pagewrite_mask)
                            | ((self.word_address + 1) & self.spec.pagewrite_mask);
                    }
                }
            }
        }

        self.old_scl = self.scl;
        self.old_sda = self.sda;
    }

    /// Detect START condition (SDA HIGH to LOW while SCL is HIGH)
    fn detect_start(&mut self) {
        if self.old_scl != 0 && self.scl != 0 && self.old_sda != 0 && self.sda == 0 {
            self.cycles = 0;

            if self.spec.address_bits == 7 {
                self.word_address = 0;
                self.state = EepromI2CState::GetWordAdr7Bits;
            } else {
                self.device_address = 0;
                self.state = EepromI2CState::GetDeviceAdr;
            }
        }
    }

    /// Detect STOP condition (SDA LOW to HIGH while SCL is HIGH)
    fn detect_stop(&mut self) {
        if self.old_scl != 0 && self.scl != 0 && self.old_sda == 0 && self.sda != 0 {
            self.state = EepromI2CState::StandBy;
        }
    }

    /// Save interface state followed by the memory array
    pub fn save_state(&self) -> Vec<u8> {
        let mut state = Vec::with_capacity(12 + self.data.len());

        state.push(self.sda);
        state.push(self.scl);
        state.push(self.old_sda);
        state.push(self.old_scl);
        state.push(self.cycles);
        state.push(self.rw as u8);
        state.extend_from_slice(&self.device_address.to_le_bytes());
        state.extend_from_slice(&self.word_address.to_le_bytes());
        state.push(self.buffer);
        state.push(self.state as u8);
        state.extend_from_slice(&self.data);

        state
    }

    /// Load state saved by the same chip type
    pub fn load_state(&mut self, data: &[u8]) -> bool {
        if data.len() < 12 + self.data.len() {
            return false;
        }
        let state = match EepromI2CState::from_u8(data[11]) {
            Some(state) => state,
            None => return false,
        };

        self.sda = data[0];
        self.scl = data[1];
        self.old_sda = data[2];
        self.old_scl = data[3];
        self.cycles = data[4];
        self.rw = data[5] != 0;
        self.device_address = u16::from_le_bytes([data[6], data[7]]);
        self.word_address = u16::from_le_bytes([data[8], data[9]]);
        self.buffer = data[10];
        self.state = state;
        let len = self.data.len();
        self.data.copy_from_slice(&data[12..12 + len]);

        true
    }

    /// Size of `save_state` output
    pub fn state_size(&self) -> usize {
        12 + self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cartridge::eeprom::{WIRING_ACCLAIM_32M, WIRING_SEGA};

    fn start(eeprom: &mut EepromI2C) {
        eeprom.write_lines(1, 1);
        eeprom.write_lines(0, 1);
        eeprom.write_lines(0, 0);
    }

    fn stop(eeprom: &mut EepromI2C) {
        eeprom.write_lines(0, 0);
        eeprom.write_lines(0, 1);
        eeprom.write_lines(1, 1);
    }

    fn send_bit(eeprom: &mut EepromI2C, bit: u8) {
        eeprom.write_lines(bit, 0);
        eeprom.write_lines(bit, 1);
        eeprom.write_lines(bit, 0);
    }

    fn send_byte(eeprom: &mut EepromI2C, byte: u8) {
        for i in (0..8).rev() {
            send_bit(eeprom, (byte >> i) & 1);
        }
        // ACK clock
        send_bit(eeprom, 1);
    }

    fn recv_byte(eeprom: &mut EepromI2C) -> u8 {
        let mut value = 0;
        for _ in 0..8 {
            eeprom.write_lines(1, 0);
            value = (value << 1) | eeprom.out();
            eeprom.write_lines(1, 1);
            eeprom.write_lines(1, 0);
        }
        value
    }

    #[test]
    fn test_x24c01_write_then_read() {
        let mut eeprom = EepromI2C::new(EepromI2CType::X24C01, WIRING_SEGA);

        // 7-bit word address 0x05, write
        start(&mut eeprom);
        send_byte(&mut eeprom, 0x05 << 1);
        send_byte(&mut eeprom, 0xA7);
        stop(&mut eeprom);
        assert_eq!(eeprom.data()[0x05], 0xA7);
        assert!(eeprom.is_dirty());

        // Read back
        start(&mut eeprom);
        send_byte(&mut eeprom, (0x05 << 1) | 1);
        assert_eq!(recv_byte(&mut eeprom), 0xA7);
    }

    #[test]
    fn test_c24c65_two_byte_address() {
        let mut eeprom = EepromI2C::new(EepromI2CType::C24C65, WIRING_ACCLAIM_32M);

        // Chip select A0 set, word address $1234
        start(&mut eeprom);
        send_byte(&mut eeprom, 0xA2);
        send_byte(&mut eeprom, 0x12);
        send_byte(&mut eeprom, 0x34);
        send_byte(&mut eeprom, 0x5E);
        stop(&mut eeprom);
        assert_eq!(eeprom.data()[0x1234], 0x5E);
        assert_eq!(eeprom.data()[0x1235], 0xFF);

        // Random read: dummy write of the address, repeated START, read
        start(&mut eeprom);
        send_byte(&mut eeprom, 0xA2);
        send_byte(&mut eeprom, 0x12);
        send_byte(&mut eeprom, 0x34);
        start(&mut eeprom);
        send_byte(&mut eeprom, 0xA3);
        assert_eq!(recv_byte(&mut eeprom), 0x5E);
    }

    #[test]
    fn test_bus_wiring() {
        let mut eeprom = EepromI2C::new(EepromI2CType::X24C01, WIRING_SEGA);
        assert!(eeprom.is_mapped(0x200001));
        assert!(!eeprom.is_mapped(0x200003));

        // SDA=1, SCL=1 idle: output echoes SDA on bit 0
        eeprom.write_byte(0x200001, 0x03);
        assert_eq!(eeprom.read_byte(0x200001), 0x01);
        eeprom.write_byte(0x200001, 0x02);
        assert_eq!(eeprom.read_byte(0x200001), 0x00);
    }

    #[test]
    fn test_state_round_trip() {
        let mut eeprom = EepromI2C::new(EepromI2CType::X24C02, WIRING_SEGA);
        eeprom.load_from_buffer(&[1, 2, 3]);
        let saved = eeprom.save_state();
        assert_eq!(saved.len(), eeprom.state_size());

        let mut restored = EepromI2C::new(EepromI2CType::X24C02, WIRING_SEGA);
        assert!(restored.load_state(&saved));
        assert_eq!(&restored.data()[..3], &[1, 2, 3]);
        assert!(!restored.load_state(&saved[..4]));
    }
}
