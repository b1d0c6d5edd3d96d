//! Barramento principal do 68000 - funções READ/WRITE.
//! Decodifica cada acesso pelo tipo do banco (3 bits superiores) e encaminha
//! para o cartucho, RAM, registradores de I/O, Z80 ou VDP.

use crate::core::cartridge::RomCartridge;
use crate::core::io::{IoManager, PhysPort};
use crate::core::memory::map::{BankMap, BankType, NUM_BANKS};
use crate::core::memory::{byte_lane, ADDRESS_MASK, RAM_SIZE};
use crate::core::system::{Peripherals, SystemConfig};
use crate::core::z80::BusArbiter;
use log::trace;

/// Fim da janela do Z80 ($A00000-$A0FFFF)
const Z80_WINDOW_END: u32 = 0xA0_FFFF;
/// Registrador BUSREQ do Z80
const Z80_BUSREQ: u32 = 0xA1_1100;
/// Registrador RESET do Z80
const Z80_RESET: u32 = 0xA1_1200;
/// Janela /TIME ($A130xx)
const TIME_WINDOW: u32 = 0xA1_3000;
/// Último registrador de I/O ($A1001F)
const IO_REGS_END: u32 = 0xA1_001F;
/// Bits que precisam ser zero para um endereço válido do VDP
const VDP_ADDR_MASK: u32 = 0x7_00E0;

/// Largura de um acesso
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessWidth {
    Byte,
    Word,
}

/// Barramento de memória principal (uma sessão de emulação)
pub struct MemoryBus {
    banks: BankMap,
    /// RAM de trabalho em palavras nativas
    ram: Vec<u16>,
    cart: RomCartridge,
    io: IoManager,
    arbiter: BusArbiter,
    config: SystemConfig,
    hw: Peripherals,
}

impl MemoryBus {
    /// Cria o barramento do Mega Drive com o cartucho e o hardware externo
    pub fn new(config: SystemConfig, cart: RomCartridge, hw: Peripherals) -> Self {
        Self {
            banks: BankMap::default(),
            ram: vec![0; RAM_SIZE / 2],
            cart,
            io: IoManager::new(),
            arbiter: BusArbiter::new(config.frame_timing(), config.z80_enabled),
            config,
            hw,
        }
    }

    /// Reset de hardware: RAM zerada, Z80 em reset, controles reiniciados
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.cart.reset();
        self.io.reset();
        self.arbiter.reset_system();
    }

    // --- Funções principais de acesso à memória (chamadas pela CPU) ---

    /// Lê um byte (8-bit) do endereço especificado
    pub fn read_byte(&mut self, addr: u32) -> u8 {
        let addr = addr & ADDRESS_MASK;
        match self.banks.bank_type(addr) {
            BankType::Rom0 | BankType::Rom1 | BankType::Rom2 | BankType::Rom3 | BankType::Rom4 => {
                self.cart.read_byte(addr)
            }
            BankType::Io => self.read_byte_misc(addr),
            BankType::Vdp => self.read_byte_vdp(addr),
            BankType::Ram => self.read_byte_ram(addr),
            BankType::Unused => {
                trace!("RB banco sem uso: ${:06X}", addr);
                0xFF
            }
        }
    }

    /// Lê uma palavra (16-bit) do endereço especificado
    pub fn read_word(&mut self, addr: u32) -> u16 {
        let addr = addr & ADDRESS_MASK;
        match self.banks.bank_type(addr) {
            BankType::Rom0 | BankType::Rom1 | BankType::Rom2 | BankType::Rom3 | BankType::Rom4 => {
                self.cart.read_word(addr)
            }
            BankType::Io => self.read_word_misc(addr),
            BankType::Vdp => self.read_word_vdp(addr),
            BankType::Ram => self.ram[((addr & 0xFFFE) >> 1) as usize],
            BankType::Unused => {
                trace!("RW banco sem uso: ${:06X}", addr);
                0xFFFF
            }
        }
    }

    /// Escreve um byte no endereço especificado
    pub fn write_byte(&mut self, addr: u32, data: u8) {
        let addr = addr & ADDRESS_MASK;
        match self.banks.bank_type(addr) {
            BankType::Rom0 | BankType::Rom1 | BankType::Rom2 | BankType::Rom3 | BankType::Rom4 => {
                self.cart.write_byte(addr, data)
            }
            BankType::Io => self.write_byte_misc(addr, data),
            BankType::Vdp => self.write_byte_vdp(addr, data),
            BankType::Ram => {
                let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.ram[..]);
                bytes[byte_lane((addr & 0xFFFF) as usize)] = data;
            }
            BankType::Unused => trace!("WB banco sem uso: ${:06X} = ${:02X}", addr, data),
        }
    }

    /// Escreve uma palavra no endereço especificado
    pub fn write_word(&mut self, addr: u32, data: u16) {
        let addr = addr & ADDRESS_MASK;
        match self.banks.bank_type(addr) {
            BankType::Rom0 | BankType::Rom1 | BankType::Rom2 | BankType::Rom3 | BankType::Rom4 => {
                self.cart.write_word(addr, data)
            }
            BankType::Io => self.write_word_misc(addr, data),
            BankType::Vdp => self.write_word_vdp(addr, data),
            BankType::Ram => self.ram[((addr & 0xFFFE) >> 1) as usize] = data,
            BankType::Unused => trace!("WW banco sem uso: ${:06X} = ${:04X}", addr, data),
        }
    }

    /// Leitura com largura escolhida; bytes vêm no LSB
    pub fn read(&mut self, addr: u32, width: AccessWidth) -> u16 {
        match width {
            AccessWidth::Byte => self.read_byte(addr) as u16,
            AccessWidth::Word => self.read_word(addr),
        }
    }

    /// Escrita com largura escolhida; bytes usam o LSB de `data`
    pub fn write(&mut self, addr: u32, width: AccessWidth, data: u16) {
        match width {
            AccessWidth::Byte => self.write_byte(addr, data as u8),
            AccessWidth::Word => self.write_word(addr, data),
        }
    }

    // --- RAM ($E00000-$FFFFFF, espelhada a cada 64KB) ---

    #[inline]
    fn read_byte_ram(&self, addr: u32) -> u8 {
        let bytes: &[u8] = bytemuck::cast_slice(&self.ram[..]);
        bytes[byte_lane((addr & 0xFFFF) as usize)]
    }

    // --- Banco diverso ($A00000-$BFFFFF): Z80, I/O, arbitragem, /TIME ---

    fn read_byte_misc(&mut self, addr: u32) -> u8 {
        if addr <= Z80_WINDOW_END {
            // Z80 rodando ou em reset: o 68000 não alcança o barramento dele
            if !self.arbiter.z80_window_accessible() {
                return 0;
            }
            return self.hw.z80.read_byte((addr & 0xFFFF) as u16);
        }
        if addr == Z80_BUSREQ {
            return self.arbiter.status_byte(self.hw.m68k.as_ref());
        }
        if (addr & 0xFF_FF00) == TIME_WINDOW {
            return self.cart.read_byte_time(addr as u8);
        }
        if addr > IO_REGS_END {
            trace!("RB registrador inválido: ${:06X}", addr);
            return 0;
        }
        self.read_io_register(addr)
    }

    fn read_word_misc(&mut self, addr: u32) -> u16 {
        if addr <= Z80_WINDOW_END {
            if !self.arbiter.z80_window_accessible() {
                return 0;
            }
            // O byte do Z80 aparece nas duas metades
            let data = self.hw.z80.read_byte((addr & 0xFFFF) as u16) as u16;
            return (data << 8) | data;
        }
        if addr == Z80_BUSREQ {
            return self.arbiter.status_word(self.hw.m68k.as_ref());
        }
        if (addr & 0xFF_FF00) == TIME_WINDOW {
            return self.cart.read_word_time(addr as u8);
        }
        if addr > IO_REGS_END {
            trace!("RW registrador inválido: ${:06X}", addr);
            return 0;
        }
        let data = self.read_io_register(addr) as u16;
        (data << 8) | data
    }

    fn write_byte_misc(&mut self, addr: u32, data: u8) {
        if addr <= Z80_WINDOW_END {
            if self.arbiter.z80_window_accessible() {
                self.hw.z80.write_byte((addr & 0xFFFF) as u16, data);
            }
            return;
        }
        match addr {
            Z80_BUSREQ => self.write_busreq(data & 0x01 != 0),
            Z80_RESET => self.write_z80_reset(data & 0x01 != 0),
            _ if (addr & 0xFF_FF00) == TIME_WINDOW => self.cart.write_byte_time(addr as u8, data),
            _ if addr > IO_REGS_END => {
                trace!("WB registrador inválido: ${:06X} = ${:02X}", addr, data)
            }
            _ => self.write_io_register(addr, data),
        }
    }

    fn write_word_misc(&mut self, addr: u32, data: u16) {
        if addr <= Z80_WINDOW_END {
            // Só o byte alto chega ao Z80
            if self.arbiter.z80_window_accessible() {
                self.hw.z80.write_byte((addr & 0xFFFF) as u16, (data >> 8) as u8);
            }
            return;
        }
        // 68000 big-endian: o bit de controle fica no byte alto
        match addr {
            Z80_BUSREQ => self.write_busreq(data & 0x0100 != 0),
            Z80_RESET => self.write_z80_reset(data & 0x0100 != 0),
            _ if (addr & 0xFF_FF00) == TIME_WINDOW => self.cart.write_word_time(addr as u8, data),
            _ if addr > IO_REGS_END => {
                trace!("WW registrador inválido: ${:06X} = ${:04X}", addr, data)
            }
            _ => self.write_io_register(addr, data as u8),
        }
    }

    /// Bit em 1 pede o barramento do Z80 ao 68000
    fn write_busreq(&mut self, request: bool) {
        self.arbiter
            .request_release(!request, self.hw.m68k.as_ref(), self.hw.z80.as_mut());
    }

    /// Bit em 1 libera o RESET do Z80
    fn write_z80_reset(&mut self, release: bool) {
        self.arbiter
            .reset(!release, self.hw.z80.as_mut(), self.hw.sound.as_mut());
    }

    /// Registradores $A10001-$A1001F; o bit 0 do endereço é ignorado
    fn read_io_register(&self, addr: u32) -> u8 {
        match addr & 0x1E {
            0x00 => self.config.version_register(),
            0x02 => self.io.read_data(PhysPort::Port1),
            0x04 => self.io.read_data(PhysPort::Port2),
            0x06 => self.io.read_data(PhysPort::Ext),
            0x08 => self.io.read_ctrl(PhysPort::Port1),
            0x0A => self.io.read_ctrl(PhysPort::Port2),
            0x0C => self.io.read_ctrl(PhysPort::Ext),
            0x0E => self.io.read_ser_tx(PhysPort::Port1),
            0x10 => self.io.read_ser_rx(PhysPort::Port1),
            0x12 => self.io.read_ser_ctrl(PhysPort::Port1),
            0x14 => self.io.read_ser_tx(PhysPort::Port2),
            0x16 => self.io.read_ser_rx(PhysPort::Port2),
            0x18 => self.io.read_ser_ctrl(PhysPort::Port2),
            0x1A => self.io.read_ser_tx(PhysPort::Ext),
            0x1C => self.io.read_ser_rx(PhysPort::Ext),
            _ => self.io.read_ser_ctrl(PhysPort::Ext),
        }
    }

    fn write_io_register(&mut self, addr: u32, data: u8) {
        match addr & 0x1E {
            0x02 => self.io.write_data(PhysPort::Port1, data),
            0x04 => self.io.write_data(PhysPort::Port2, data),
            0x06 => self.io.write_data(PhysPort::Ext, data),
            0x08 => self.io.write_ctrl(PhysPort::Port1, data),
            0x0A => self.io.write_ctrl(PhysPort::Port2, data),
            0x0C => self.io.write_ctrl(PhysPort::Ext, data),
            0x0E => self.io.write_ser_tx(PhysPort::Port1, data),
            0x12 => self.io.write_ser_ctrl(PhysPort::Port1, data),
            0x14 => self.io.write_ser_tx(PhysPort::Port2, data),
            0x18 => self.io.write_ser_ctrl(PhysPort::Port2, data),
            0x1A => self.io.write_ser_tx(PhysPort::Ext, data),
            0x1E => self.io.write_ser_ctrl(PhysPort::Ext, data),
            // Versão e RxData são somente leitura
            _ => trace!("WB registrador somente leitura: ${:06X} = ${:02X}", addr, data),
        }
    }

    // --- VDP ($C00000-$DFFFFF) ---

    #[inline]
    fn vdp_address_valid(addr: u32) -> bool {
        (addr & VDP_ADDR_MASK) == 0
    }

    fn read_byte_vdp(&mut self, addr: u32) -> u8 {
        if !Self::vdp_address_valid(addr) {
            trace!("RB VDP inválido: ${:06X}", addr);
            return 0xFF;
        }
        let vdp = self.hw.vdp.as_mut();
        match addr & 0x1F {
            0x00..=0x03 => high_or_low(vdp.read_data(), addr),
            0x04..=0x07 => high_or_low(vdp.read_status(), addr),
            0x08 => vdp.read_v_counter(),
            0x09 => vdp.read_h_counter(),
            _ => 0,
        }
    }

    fn read_word_vdp(&mut self, addr: u32) -> u16 {
        if !Self::vdp_address_valid(addr) {
            trace!("RW VDP inválido: ${:06X}", addr);
            return 0xFFFF;
        }
        let vdp = self.hw.vdp.as_mut();
        match addr & 0x1E {
            0x00 | 0x02 => vdp.read_data(),
            0x04 | 0x06 => vdp.read_status(),
            0x08 => ((vdp.read_v_counter() as u16) << 8) | vdp.read_h_counter() as u16,
            _ => 0,
        }
    }

    fn write_byte_vdp(&mut self, addr: u32, data: u8) {
        if !Self::vdp_address_valid(addr) {
            trace!("WB VDP inválido: ${:06X} = ${:02X}", addr, data);
            return;
        }
        match addr & 0x1F {
            0x00..=0x03 => self.hw.vdp.write_data_byte(data),
            // O byte é visto nas duas metades do barramento
            0x04..=0x07 => self.hw.vdp.write_ctrl(((data as u16) << 8) | data as u16),
            0x11 | 0x13 | 0x15 | 0x17 => self.hw.sound.psg_write(data),
            _ => trace!("WB porta VDP sem uso: ${:06X} = ${:02X}", addr, data),
        }
    }

    fn write_word_vdp(&mut self, addr: u32, data: u16) {
        if !Self::vdp_address_valid(addr) {
            trace!("WW VDP inválido: ${:06X} = ${:04X}", addr, data);
            return;
        }
        match addr & 0x1E {
            0x00 | 0x02 => self.hw.vdp.write_data_word(data),
            0x04 | 0x06 => self.hw.vdp.write_ctrl(data),
            0x10..=0x16 => self.hw.sound.psg_write(data as u8),
            _ => trace!("WW porta VDP sem uso: ${:06X} = ${:04X}", addr, data),
        }
    }

    // --- Agendamento por linha ---

    /// Início de quadro
    pub fn start_frame(&mut self) {
        self.arbiter.reset_frame();
    }

    /// Início de linha: avança as metas de ciclos das duas CPUs
    pub fn start_line(&mut self) {
        self.arbiter.advance_line();
    }

    /// Fim de linha: o Z80 alcança o 68000 e os controles contam a linha
    pub fn end_line(&mut self) {
        self.arbiter.end_line(self.hw.z80.as_mut());
        self.io.advance_scanline();
    }

    // --- Acesso aos componentes ---

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn bank_types(&self) -> [BankType; NUM_BANKS] {
        self.banks.types()
    }

    pub fn set_bank_types(&mut self, types: [BankType; NUM_BANKS]) {
        self.banks.set_types(types);
    }

    pub fn ram(&self) -> &[u16] {
        &self.ram
    }

    pub fn cart(&self) -> &RomCartridge {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut RomCartridge {
        &mut self.cart
    }

    /// Troca o cartucho; o restante do sistema não é reiniciado
    pub fn insert_cart(&mut self, cart: RomCartridge) -> RomCartridge {
        std::mem::replace(&mut self.cart, cart)
    }

    pub fn io(&self) -> &IoManager {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IoManager {
        &mut self.io
    }

    pub fn arbiter(&self) -> &BusArbiter {
        &self.arbiter
    }

    pub fn arbiter_mut(&mut self) -> &mut BusArbiter {
        &mut self.arbiter
    }

    pub fn peripherals_mut(&mut self) -> &mut Peripherals {
        &mut self.hw
    }

    // --- Estado salvo ---

    /// Tipos de banco, RAM, arbitragem, controles e cartucho
    pub fn save_state(&self) -> Vec<u8> {
        let mut state = Vec::new();
        state.extend(self.banks.types().iter().map(|&t| t as u8));
        state.extend_from_slice(bytemuck::cast_slice(&self.ram[..]));
        for part in [self.arbiter.save_state(), self.io.save_state(), self.cart.save_state()] {
            state.extend_from_slice(&(part.len() as u32).to_le_bytes());
            state.extend_from_slice(&part);
        }
        state
    }

    /// Restaura um estado; em caso de erro nada é alterado
    pub fn load_state(&mut self, data: &[u8]) -> bool {
        let types = data.get(..NUM_BANKS);
        let ram = data.get(NUM_BANKS..NUM_BANKS + RAM_SIZE);
        let (types, ram) = match (types, ram) {
            (Some(types), Some(ram)) => (types, ram),
            _ => return false,
        };

        let rest = &data[NUM_BANKS + RAM_SIZE..];
        let (arbiter_state, rest) = match take_block(rest) {
            Some(split) => split,
            None => return false,
        };
        let (io_state, rest) = match take_block(rest) {
            Some(split) => split,
            None => return false,
        };
        let (cart_state, _) = match take_block(rest) {
            Some(split) => split,
            None => return false,
        };

        if arbiter_state.len() != self.arbiter.save_state().len() {
            return false;
        }
        let mut io = self.io.clone();
        if !io.load_state(io_state) {
            return false;
        }
        if !self.cart.load_state(cart_state) {
            return false;
        }

        let mut bank_types = [BankType::Unused; NUM_BANKS];
        for (slot, &value) in bank_types.iter_mut().zip(types) {
            *slot = BankType::from_u8(value);
        }
        self.banks.set_types(bank_types);
        bytemuck::cast_slice_mut::<u16, u8>(&mut self.ram[..]).copy_from_slice(ram);
        self.arbiter.load_state(arbiter_state);
        self.io = io;
        true
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(SystemConfig::default(), RomCartridge::new(), Peripherals::default())
    }
}

/// Byte alto em endereço par, baixo em ímpar
#[inline]
fn high_or_low(word: u16, addr: u32) -> u8 {
    if addr & 1 == 0 {
        (word >> 8) as u8
    } else {
        word as u8
    }
}

/// Bloco prefixado por tamanho (u32 LE)
fn take_block(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let len = data.get(..4)?;
    let len = u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize;
    let block = data.get(4..4 + len)?;
    Some((block, &data[4 + len..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::m68k::SharedOdometer;
    use crate::core::snd::SoundChips;
    use crate::core::system::Region;
    use crate::core::vdp::VdpPort;
    use crate::core::z80::Z80Cpu;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        DataByte(u8),
        DataWord(u16),
        Ctrl(u16),
        Psg(u8),
        YmReset,
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct RecordingVdp {
        log: Log,
    }

    impl VdpPort for RecordingVdp {
        fn read_data(&mut self) -> u16 {
            0xABCD
        }

        fn read_status(&mut self) -> u16 {
            0x3608
        }

        fn read_h_counter(&mut self) -> u8 {
            0x42
        }

        fn read_v_counter(&mut self) -> u8 {
            0x17
        }

        fn write_data_byte(&mut self, data: u8) {
            self.log.borrow_mut().push(Event::DataByte(data));
        }

        fn write_data_word(&mut self, data: u16) {
            self.log.borrow_mut().push(Event::DataWord(data));
        }

        fn write_ctrl(&mut self, data: u16) {
            self.log.borrow_mut().push(Event::Ctrl(data));
        }
    }

    struct RecordingSound {
        log: Log,
    }

    impl SoundChips for RecordingSound {
        fn ym2612_reset(&mut self) {
            self.log.borrow_mut().push(Event::YmReset);
        }

        fn psg_write(&mut self, data: u8) {
            self.log.borrow_mut().push(Event::Psg(data));
        }
    }

    struct RamZ80 {
        ram: Rc<RefCell<Vec<u8>>>,
        odometer: i32,
    }

    impl Z80Cpu for RamZ80 {
        fn exec(&mut self, target: i32) {
            self.odometer = target;
        }

        fn read_odometer(&self) -> i32 {
            self.odometer
        }

        fn set_odometer(&mut self, odometer: i32) {
            self.odometer = odometer;
        }

        fn soft_reset(&mut self) {}

        fn read_byte(&mut self, addr: u16) -> u8 {
            self.ram.borrow()[(addr & 0x1FFF) as usize]
        }

        fn write_byte(&mut self, addr: u16, data: u8) {
            self.ram.borrow_mut()[(addr & 0x1FFF) as usize] = data;
        }
    }

    struct Rig {
        bus: MemoryBus,
        clock: SharedOdometer,
        log: Log,
        z80_ram: Rc<RefCell<Vec<u8>>>,
    }

    fn test_rom() -> RomCartridge {
        let mut image = vec![0u8; 0x20000];
        image[0x100..0x110].copy_from_slice(b"SEGA MEGA DRIVE ");
        RomCartridge::load_from_buffer(&image).unwrap()
    }

    fn rig() -> Rig {
        let clock = SharedOdometer::new();
        let log: Log = Rc::default();
        let z80_ram = Rc::new(RefCell::new(vec![0u8; 0x2000]));
        let hw = Peripherals {
            m68k: Box::new(clock.clone()),
            z80: Box::new(RamZ80 { ram: z80_ram.clone(), odometer: 0 }),
            vdp: Box::new(RecordingVdp { log: log.clone() }),
            sound: Box::new(RecordingSound { log: log.clone() }),
        };
        let bus = MemoryBus::new(SystemConfig::default(), test_rom(), hw);
        Rig { bus, clock, log, z80_ram }
    }

    #[test]
    fn test_unused_bank_sentinel() {
        let mut bus = MemoryBus::default();
        let mut types = bus.bank_types();
        types[2] = BankType::Unused;
        bus.set_bank_types(types);

        assert_eq!(bus.read_byte(0x400001), 0xFF);
        assert_eq!(bus.read_word(0x400000), 0xFFFF);
        bus.write_word(0x400000, 0x1234);
        assert_eq!(bus.read_word(0x400000), 0xFFFF);
    }

    #[test]
    fn test_ram_byte_lanes_and_mirror() {
        let mut bus = MemoryBus::default();
        bus.write_word(0xFF0000, 0x1234);
        assert_eq!(bus.read_byte(0xFF0000), 0x12);
        assert_eq!(bus.read_byte(0xFF0001), 0x34);
        assert_eq!(bus.read_word(0xE00000), 0x1234);

        bus.write_byte(0xFFFFFF, 0xAB);
        assert_eq!(bus.read_word(0xEFFFFE), 0x00AB);

        bus.write(0xFF0010, AccessWidth::Byte, 0x5612);
        assert_eq!(bus.read(0xFF0010, AccessWidth::Word), 0x1200);
        assert_eq!(bus.read(0xFF0010, AccessWidth::Byte), 0x12);
    }

    #[test]
    fn test_rom_through_bus() {
        let mut r = rig();
        assert_eq!(r.bus.read_word(0x000100), u16::from_be_bytes(*b"SE"));
        assert_eq!(r.bus.read_byte(0x000103), b'A');
        r.bus.write_word(0x000100, 0xFFFF);
        assert_eq!(r.bus.read_byte(0x000100), b'S');
    }

    #[test]
    fn test_z80_window_gating() {
        let mut r = rig();

        // Power-on: Z80 running and held in reset
        r.bus.write_byte(0xA00010, 0x5A);
        assert_eq!(r.bus.read_byte(0xA00010), 0);
        assert_eq!(r.z80_ram.borrow()[0x10], 0);

        r.bus.write_byte(Z80_RESET, 0x01);
        // Still running: window closed
        assert_eq!(r.bus.read_byte(0xA00010), 0);

        r.bus.write_word(Z80_BUSREQ, 0x0100);
        r.bus.write_byte(0xA00010, 0x5A);
        assert_eq!(r.bus.read_byte(0xA00010), 0x5A);
        assert_eq!(r.bus.read_word(0xA00010), 0x5A5A);

        r.bus.write_word(0xA00020, 0xBEEF);
        assert_eq!(r.z80_ram.borrow()[0x20], 0xBE);

        // Reset asserted again: closed, YM2612 reset once
        r.bus.write_word(Z80_RESET, 0x0000);
        r.bus.write_byte(Z80_RESET, 0x00);
        assert_eq!(r.bus.read_byte(0xA00010), 0);
        let resets = r.log.borrow().iter().filter(|e| **e == Event::YmReset).count();
        assert_eq!(resets, 1);
    }

    #[test]
    fn test_busreq_status() {
        let mut r = rig();
        r.bus.start_frame();
        r.bus.start_line();

        assert_eq!(r.bus.read_byte(Z80_BUSREQ), 0x81);

        r.clock.set(100);
        r.bus.write_byte(Z80_BUSREQ, 0x01);
        assert!(!r.bus.arbiter().is_secondary_running());
        assert_eq!(r.bus.read_byte(Z80_BUSREQ), 0x81);

        r.clock.set(117);
        assert_eq!(r.bus.read_byte(Z80_BUSREQ), 0x80);
        assert_eq!(r.bus.read_word(Z80_BUSREQ), 0x80FF);
        assert_eq!(r.bus.read_word(Z80_BUSREQ), 0x8000);

        r.bus.write_word(Z80_BUSREQ, 0x0000);
        assert!(r.bus.arbiter().is_secondary_running());
        assert_eq!(r.bus.read_byte(Z80_BUSREQ), 0x81);

        // Odd byte of the register is not decoded
        assert_eq!(r.bus.read_byte(Z80_BUSREQ + 1), 0);
    }

    #[test]
    fn test_vdp_ports() {
        let mut r = rig();

        r.bus.write_word(0xC00004, 0x8F02);
        r.bus.write_byte(0xC00005, 0x81);
        r.bus.write_word(0xC00000, 0x1234);
        r.bus.write_byte(0xC00001, 0x56);
        r.bus.write_byte(0xC00011, 0x9F);
        r.bus.write_word(0xC00010, 0x00DF);
        // Invalid addresses are dropped
        r.bus.write_word(0xC00020, 0x1111);
        r.bus.write_word(0xC10004, 0x2222);
        // Mirror at $C80000 is valid
        r.bus.write_word(0xC80006, 0x3333);

        assert_eq!(
            *r.log.borrow(),
            vec![
                Event::Ctrl(0x8F02),
                Event::Ctrl(0x8181),
                Event::DataWord(0x1234),
                Event::DataByte(0x56),
                Event::Psg(0x9F),
                Event::Psg(0xDF),
                Event::Ctrl(0x3333),
            ]
        );

        assert_eq!(r.bus.read_word(0xC00004), 0x3608);
        assert_eq!(r.bus.read_byte(0xC00006), 0x36);
        assert_eq!(r.bus.read_byte(0xC00007), 0x08);
        assert_eq!(r.bus.read_byte(0xC00001), 0xCD);
        assert_eq!(r.bus.read_word(0xC00008), 0x1742);
        assert_eq!(r.bus.read_byte(0xC00009), 0x42);
        assert_eq!(r.bus.read_byte(0xC0000C), 0);
        assert_eq!(r.bus.read_word(0xC00020), 0xFFFF);
        assert_eq!(r.bus.read_byte(0xC10004), 0xFF);
    }

    #[test]
    fn test_io_registers() {
        let mut r = rig();

        assert_eq!(r.bus.read_byte(0xA10001), 0xA0);
        assert_eq!(r.bus.read_word(0xA10000), 0xA0A0);

        r.bus.write_byte(0xA10009, 0x40);
        assert_eq!(r.bus.read_byte(0xA10009), 0x40);
        r.bus.write_byte(0xA10003, 0x40);
        assert_eq!(r.bus.read_byte(0xA10003), 0x7F);
        r.bus.write_word(0xA10002, 0x0000);
        assert_eq!(r.bus.read_byte(0xA10003), 0x33);
        // LSB of the address is ignored
        assert_eq!(r.bus.read_byte(0xA10002), 0x33);

        r.bus.write_byte(0xA1000F, 0x12);
        assert_eq!(r.bus.read_byte(0xA1000F), 0x12);
        assert_eq!(r.bus.read_byte(0xA10011), 0xFF);
        r.bus.write_word(0xA10012, 0x00FF);
        assert_eq!(r.bus.read_byte(0xA10013), 0xF8);

        // Version register is read-only
        r.bus.write_byte(0xA10001, 0x00);
        assert_eq!(r.bus.read_byte(0xA10001), 0xA0);
        assert_eq!(r.bus.read_byte(0xA10021), 0);
    }

    #[test]
    fn test_version_register_follows_config() {
        let config = SystemConfig { region: Region::Europe, tmss: true, ..SystemConfig::default() };
        let mut bus = MemoryBus::new(config, RomCartridge::new(), Peripherals::default());
        assert_eq!(bus.read_byte(0xA10001), 0xE1);
    }

    #[test]
    fn test_time_window() {
        let mut r = rig();
        assert!(r.bus.cart().sram().is_enabled());

        assert_eq!(r.bus.read_byte(0xA130F1), 0xFF);
        assert_eq!(r.bus.read_word(0xA130F0), 0xFFFF);

        r.bus.write_word(0xA130F0, 0x0003);
        assert!(r.bus.cart().sram().is_write_protected());

        r.bus.write_byte(0xA130F1, 0x00);
        assert!(!r.bus.cart().sram().is_enabled());
    }

    #[test]
    fn test_line_helpers() {
        let mut r = rig();
        r.bus.write_byte(Z80_RESET, 0x01);
        r.bus.start_frame();
        r.bus.start_line();
        r.bus.end_line();
        assert_eq!(r.bus.arbiter().cycles_z80(), 228);
        assert_eq!(r.bus.arbiter().cycles_m68k(), 488);
    }

    #[test]
    fn test_state_round_trip() {
        let mut r = rig();
        r.bus.write_word(0xFF1234, 0xCAFE);
        r.bus.write_byte(0xA10009, 0x40);
        r.clock.set(50);
        r.bus.write_byte(Z80_BUSREQ, 0x01);
        let saved = r.bus.save_state();

        let mut other = rig();
        assert!(other.bus.load_state(&saved));
        assert_eq!(other.bus.read_word(0xFF1234), 0xCAFE);
        assert_eq!(other.bus.read_byte(0xA10009), 0x40);
        assert_eq!(other.bus.arbiter().state(), r.bus.arbiter().state());
        assert_eq!(other.bus.bank_types(), r.bus.bank_types());

        let mut fresh = rig();
        assert!(!fresh.bus.load_state(&saved[..saved.len() - 1]));
        assert_eq!(fresh.bus.read_word(0xFF1234), 0);
    }
}
