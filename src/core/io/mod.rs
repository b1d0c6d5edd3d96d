// genesis-bus-rs/src/core/io/mod.rs

//! Controller ports ($A10003-$A1001F)
//!
//! Three physical connectors (port 1, port 2, EXT) each show one virtual
//! device. Multi-tap adapters own a further set of virtual ports for the
//! pads plugged into them and pick which one answers by a handshake on
//! the host connector.

pub mod buttons;
pub mod device;
mod multitap;

pub use buttons::{IoPins, KeyCode, MouseButtons, PadButtons, SerCtrl, BTNI_MAX, KEY_NONE};
pub use device::{IoDevice, IoDeviceState, IoType, SCANLINE_COUNT_MAX_6BTN};

use log::{info, warn};

pub const VIRTPORT_1: usize = 0;
pub const VIRTPORT_2: usize = 1;
pub const VIRTPORT_EXT: usize = 2;
/// Team Player on port 1, pads A-D
pub const VIRTPORT_TP1A: usize = 3;
/// Team Player on port 2, pads A-D
pub const VIRTPORT_TP2A: usize = 7;
/// 4-Way Play, pads A-D
pub const VIRTPORT_4WPA: usize = 11;
pub const VIRTPORT_MAX: usize = 15;

/// Physical connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PhysPort {
    Port1 = 0,
    Port2 = 1,
    Ext = 2,
}

impl PhysPort {
    pub const ALL: [PhysPort; 3] = [PhysPort::Port1, PhysPort::Port2, PhysPort::Ext];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Virtual port shown on this connector
    #[inline]
    pub fn virt(self) -> usize {
        self as usize
    }
}

/// Virtual controller port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VirtPort {
    Port1 = 0,
    Port2 = 1,
    Ext = 2,
    Tp1A = 3,
    Tp1B = 4,
    Tp1C = 5,
    Tp1D = 6,
    Tp2A = 7,
    Tp2B = 8,
    Tp2C = 9,
    Tp2D = 10,
    FourWpA = 11,
    FourWpB = 12,
    FourWpC = 13,
    FourWpD = 14,
}

impl VirtPort {
    pub fn from_index(index: usize) -> Option<Self> {
        Some(match index {
            0 => VirtPort::Port1,
            1 => VirtPort::Port2,
            2 => VirtPort::Ext,
            3 => VirtPort::Tp1A,
            4 => VirtPort::Tp1B,
            5 => VirtPort::Tp1C,
            6 => VirtPort::Tp1D,
            7 => VirtPort::Tp2A,
            8 => VirtPort::Tp2B,
            9 => VirtPort::Tp2C,
            10 => VirtPort::Tp2D,
            11 => VirtPort::FourWpA,
            12 => VirtPort::FourWpB,
            13 => VirtPort::FourWpC,
            14 => VirtPort::FourWpD,
            _ => return None,
        })
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pad behind a multi-tap
    pub fn is_multitap_member(self) -> bool {
        self.index() >= VIRTPORT_TP1A
    }

    /// Device types this port can hold
    pub fn allows(self, io_type: IoType) -> bool {
        match io_type {
            IoType::None | IoType::ThreeButton | IoType::SixButton => true,
            _ if self.is_multitap_member() => false,
            IoType::TwoButton | IoType::MegaMouse => true,
            IoType::TeamPlayer => matches!(self, VirtPort::Port1 | VirtPort::Port2),
            IoType::FourWayPlayMaster => self == VirtPort::Port2,
            IoType::FourWayPlaySlave => self == VirtPort::Port1,
        }
    }
}

/// Controller configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// Device type id out of range
    UnsupportedDeviceType(u8),
    /// Virtual port index out of range
    InvalidPort(usize),
    /// The device type cannot be attached to that port
    DeviceNotAllowed(VirtPort, IoType),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::UnsupportedDeviceType(id) => write!(f, "unsupported device type {}", id),
            IoError::InvalidPort(index) => write!(f, "invalid virtual port {}", index),
            IoError::DeviceNotAllowed(port, io_type) => {
                write!(f, "{:?} cannot be attached to {:?}", io_type, port)
            }
        }
    }
}

impl std::error::Error for IoError {}

/// All controller devices and the three connectors they appear on
#[derive(Debug, Clone)]
pub struct IoManager {
    devices: [IoDevice; VIRTPORT_MAX],
}

impl IoManager {
    /// Pads on ports 1 and 2, nothing on EXT
    pub fn new() -> Self {
        let devices = std::array::from_fn(|index| {
            if index == VIRTPORT_EXT {
                IoDevice::new(IoType::None)
            } else {
                IoDevice::new(IoType::ThreeButton)
            }
        });
        let mut manager = Self { devices };
        manager.update();
        manager
    }

    /// Power-on line state for every device; types and keymaps stay
    pub fn reset(&mut self) {
        for device in self.devices.iter_mut() {
            device.reset();
        }
        self.update();
    }

    pub fn device(&self, virt: VirtPort) -> &IoDevice {
        &self.devices[virt.index()]
    }

    pub fn devices(&self) -> &[IoDevice] {
        &self.devices
    }

    pub fn device_type(&self, virt: VirtPort) -> IoType {
        self.devices[virt.index()].io_type()
    }

    // Register access

    pub fn read_data(&self, phys: PhysPort) -> u8 {
        self.devices[phys.virt()].read_data()
    }

    pub fn write_data(&mut self, phys: PhysPort, data: u8) {
        self.write_lines(phys, |device| device.md_data = data);
    }

    pub fn read_ctrl(&self, phys: PhysPort) -> u8 {
        self.devices[phys.virt()].ctrl()
    }

    pub fn write_ctrl(&mut self, phys: PhysPort, ctrl: u8) {
        self.write_lines(phys, |device| device.ctrl = ctrl);
    }

    pub fn read_ser_tx(&self, phys: PhysPort) -> u8 {
        self.devices[phys.virt()].ser_last_tx()
    }

    pub fn write_ser_tx(&mut self, phys: PhysPort, data: u8) {
        self.devices[phys.virt()].write_ser_tx(data);
    }

    pub fn read_ser_rx(&self, phys: PhysPort) -> u8 {
        self.devices[phys.virt()].ser_rx()
    }

    pub fn read_ser_ctrl(&self, phys: PhysPort) -> u8 {
        self.devices[phys.virt()].ser_ctrl()
    }

    pub fn write_ser_ctrl(&mut self, phys: PhysPort, data: u8) {
        self.devices[phys.virt()].write_ser_ctrl(data);
    }

    fn write_lines(&mut self, phys: PhysPort, apply: impl FnOnce(&mut IoDevice)) {
        let device = &mut self.devices[phys.virt()];
        let old_select = device.is_select();
        let old_lines = device.lines;
        apply(device);
        device.update_select_line();
        self.update_port(phys, old_select, old_lines, true);
    }

    /// Run the protocol of the device on `phys`. With `edge == false` only
    /// the current line levels are latched.
    fn update_port(&mut self, phys: PhysPort, old_select: bool, old_lines: u8, edge: bool) {
        let virt = phys.virt();
        let device = &mut self.devices[virt];
        match device.io_type() {
            IoType::None => device.latch_none(),
            IoType::ThreeButton => device.latch_3btn(),
            IoType::SixButton => device.update_6btn(old_select),
            IoType::TwoButton => device.latch_2btn(),
            IoType::MegaMouse => device.update_mouse(old_lines),
            IoType::TeamPlayer => {
                let first_member =
                    if phys == PhysPort::Port1 { VIRTPORT_TP1A } else { VIRTPORT_TP2A };
                multitap::update_team_player(&mut self.devices, virt, first_member, old_lines);
                return;
            }
            IoType::FourWayPlayMaster => {
                multitap::update_4wp_master(&mut self.devices);
                return;
            }
            IoType::FourWayPlaySlave => {
                multitap::update_4wp_slave(&mut self.devices, edge);
                return;
            }
        }
        device.lines = device.output_lines();
    }

    /// Re-latch every connector from the current line levels and buttons
    pub fn update(&mut self) {
        for phys in PhysPort::ALL {
            let device = &self.devices[phys.virt()];
            let (select, lines) = (device.is_select(), device.lines);
            self.update_port(phys, select, lines, false);
        }
    }

    /// Once per scanline: 6-button pads drop back to phase 0 when TH has
    /// not risen for `SCANLINE_COUNT_MAX_6BTN` lines
    pub fn advance_scanline(&mut self) {
        let mut relatch = false;
        for device in self.devices.iter_mut() {
            if device.io_type() == IoType::SixButton && device.tick_scanline() {
                device.latch_6btn();
                relatch = true;
            }
        }
        if relatch {
            self.update();
        }
    }

    // Configuration

    /// Attach a device. Rejected types leave the port untouched.
    pub fn set_device_type(&mut self, virt: VirtPort, io_type: IoType) -> Result<(), IoError> {
        if !virt.allows(io_type) {
            warn!("IO: {:?} not allowed on {:?}", io_type, virt);
            return Err(IoError::DeviceNotAllowed(virt, io_type));
        }

        let device = &mut self.devices[virt.index()];
        if device.io_type() != io_type {
            info!("IO: {:?} -> {:?}", virt, io_type);
            device.set_io_type(io_type);
            self.update();
        }
        Ok(())
    }

    /// `set_device_type` with raw indices, as stored in configuration files
    pub fn set_device_type_id(&mut self, virt: usize, id: u8) -> Result<(), IoError> {
        let port = VirtPort::from_index(virt).ok_or_else(|| {
            warn!("IO: invalid virtual port {}", virt);
            IoError::InvalidPort(virt)
        })?;
        let io_type = IoType::from_u8(id).ok_or_else(|| {
            warn!("IO: unsupported device type {}", id);
            IoError::UnsupportedDeviceType(id)
        })?;
        self.set_device_type(port, io_type)
    }

    /// Bind host keys to the buttons of one device; returns how many were kept
    pub fn set_keymap(&mut self, virt: VirtPort, keys: &[KeyCode]) -> usize {
        self.devices[virt.index()].set_keymap(keys)
    }

    pub fn keymap(&self, virt: VirtPort) -> &[KeyCode; BTNI_MAX] {
        self.devices[virt.index()].keymap()
    }

    pub fn key_down(&mut self, key: KeyCode) {
        self.set_key(key, true);
    }

    pub fn key_up(&mut self, key: KeyCode) {
        self.set_key(key, false);
    }

    fn set_key(&mut self, key: KeyCode, pressed: bool) {
        for device in self.devices.iter_mut() {
            device.set_key(key, pressed);
        }
        self.update();
    }

    pub fn mouse_move(&mut self, virt: VirtPort, dx: i32, dy: i32) {
        self.devices[virt.index()].mouse_move(dx, dy);
    }

    // Savestate

    pub fn device_state(&self, virt: VirtPort) -> IoDeviceState {
        self.devices[virt.index()].state()
    }

    pub fn set_device_state(&mut self, virt: VirtPort, state: &IoDeviceState) -> bool {
        self.devices[virt.index()].set_state(state)
    }

    pub fn save_state(&self) -> Vec<u8> {
        let states: Vec<IoDeviceState> = self.devices.iter().map(IoDevice::state).collect();
        bytemuck::cast_slice(&states).to_vec()
    }

    /// All devices or none
    pub fn load_state(&mut self, data: &[u8]) -> bool {
        let size = std::mem::size_of::<IoDeviceState>();
        if data.len() < size * VIRTPORT_MAX {
            warn!("IO: savestate too short ({} bytes)", data.len());
            return false;
        }

        let states: Vec<IoDeviceState> = data
            .chunks_exact(size)
            .take(VIRTPORT_MAX)
            .map(bytemuck::pod_read_unaligned)
            .collect();
        if states.iter().any(|state| IoType::from_u8(state.io_type).is_none()) {
            warn!("IO: savestate holds an unknown device type");
            return false;
        }

        for (device, state) in self.devices.iter_mut().zip(&states) {
            device.set_state(state);
        }
        true
    }
}

impl Default for IoManager {
    fn default() -> Self {
        Self::new()
    }
}
