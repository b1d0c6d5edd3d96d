// genesis-bus-rs/src/core/io/device.rs

//! Controller devices and their line protocols

use super::buttons::{IoPins, KeyCode, SerCtrl, BTNI_MAX, KEY_NONE};
use bytemuck::{Pod, Zeroable};

/// Scanlines without a TH rising edge before a 6-button pad resets its counter
pub const SCANLINE_COUNT_MAX_6BTN: i32 = 25;

/// Largest mouse motion reported in one sample
const MOUSE_MAX_DELTA: i32 = 255;

/// Device type attached to a virtual port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum IoType {
    None = 0,
    #[default]
    ThreeButton = 1,
    SixButton = 2,
    TwoButton = 3,
    MegaMouse = 4,
    TeamPlayer = 5,
    FourWayPlayMaster = 6,
    FourWayPlaySlave = 7,
}

impl IoType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => IoType::None,
            1 => IoType::ThreeButton,
            2 => IoType::SixButton,
            3 => IoType::TwoButton,
            4 => IoType::MegaMouse,
            5 => IoType::TeamPlayer,
            6 => IoType::FourWayPlayMaster,
            7 => IoType::FourWayPlaySlave,
            _ => return None,
        })
    }

    /// Number of mappable buttons
    pub fn num_buttons(self) -> usize {
        match self {
            IoType::ThreeButton => 8,
            IoType::SixButton => 12,
            IoType::TwoButton => 6,
            IoType::MegaMouse => 4,
            IoType::None
            | IoType::TeamPlayer
            | IoType::FourWayPlayMaster
            | IoType::FourWayPlaySlave => 0,
        }
    }

    /// Mouse buttons are active high, pads active low
    pub fn active_high(self) -> bool {
        self == IoType::MegaMouse
    }

    /// Button field with nothing pressed
    pub fn idle_buttons(self) -> u32 {
        if self.active_high() {
            0
        } else {
            !0
        }
    }
}

/// Savestate snapshot of one device
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct IoDeviceState {
    pub counter: i32,
    pub scanlines: i32,
    pub buttons: u32,
    pub mouse_dx: i32,
    pub mouse_dy: i32,
    pub mouse_sample_x: i32,
    pub mouse_sample_y: i32,
    pub io_type: u8,
    pub ctrl: u8,
    pub md_data: u8,
    pub device_data: u8,
    pub select: u8,
    pub ser_ctrl: u8,
    pub ser_last_tx: u8,
    pub lines: u8,
}

/// One controller device
#[derive(Debug, Clone)]
pub struct IoDevice {
    io_type: IoType,
    /// Handshake counter
    pub(super) counter: i32,
    /// Scanlines since the last TH rising edge
    scanlines: i32,
    /// Tristate control: 1 == output from the console
    pub(super) ctrl: u8,
    /// Data written from the console
    pub(super) md_data: u8,
    /// Data driven by the device
    pub(super) device_data: u8,
    /// TH line state
    select: bool,
    buttons: u32,
    ser_ctrl: SerCtrl,
    ser_last_tx: u8,
    keymap: [KeyCode; BTNI_MAX],
    /// TH/TR as last seen by the device
    pub(super) lines: u8,
    mouse_dx: i32,
    mouse_dy: i32,
    mouse_sample_x: i32,
    mouse_sample_y: i32,
}

impl IoDevice {
    pub fn new(io_type: IoType) -> Self {
        let mut device = Self {
            io_type,
            counter: 0,
            scanlines: 0,
            ctrl: 0,
            md_data: 0xFF,
            device_data: 0xFF,
            select: false,
            buttons: io_type.idle_buttons(),
            ser_ctrl: SerCtrl::empty(),
            ser_last_tx: 0xFF,
            keymap: [KEY_NONE; BTNI_MAX],
            lines: 0,
            mouse_dx: 0,
            mouse_dy: 0,
            mouse_sample_x: 0,
            mouse_sample_y: 0,
        };
        device.update_select_line();
        device.lines = device.output_lines();
        device
    }

    /// Back to power-on state; type and keymap are kept
    pub fn reset(&mut self) {
        let keymap = self.keymap;
        *self = Self::new(self.io_type);
        self.keymap = keymap;
    }

    pub fn io_type(&self) -> IoType {
        self.io_type
    }

    pub(super) fn set_io_type(&mut self, io_type: IoType) {
        self.io_type = io_type;
        self.reset();
    }

    pub fn counter(&self) -> i32 {
        self.counter
    }

    pub fn scanlines(&self) -> i32 {
        self.scanlines
    }

    pub fn buttons(&self) -> u32 {
        self.buttons
    }

    /// Replace the whole button field (device polarity)
    pub fn set_buttons(&mut self, buttons: u32) {
        self.buttons = buttons;
    }

    pub fn keymap(&self) -> &[KeyCode; BTNI_MAX] {
        &self.keymap
    }

    /// Bind keys to button indices. Extra keys are dropped, missing ones
    /// leave their buttons unbound. Returns the number of keys kept.
    pub fn set_keymap(&mut self, keys: &[KeyCode]) -> usize {
        let count = keys.len().min(self.io_type.num_buttons());
        self.keymap = [KEY_NONE; BTNI_MAX];
        self.keymap[..count].copy_from_slice(&keys[..count]);
        count
    }

    /// Press or release every button bound to `key`
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if key == KEY_NONE {
            return;
        }
        let active_high = self.io_type.active_high();
        for index in 0..self.io_type.num_buttons() {
            if self.keymap[index] != key {
                continue;
            }
            let bit = 1u32 << index;
            if pressed == active_high {
                self.buttons |= bit;
            } else {
                self.buttons &= !bit;
            }
        }
    }

    pub fn is_select(&self) -> bool {
        self.select
    }

    /// TH is high when it is an input (pulled up) or driven high
    pub(super) fn update_select_line(&mut self) {
        let th = IoPins::TH.bits();
        self.select = (self.ctrl & th) == 0 || (self.md_data & th) != 0;
    }

    /// TH/TR levels seen on the connector
    pub(super) fn output_lines(&self) -> u8 {
        let mask = (IoPins::TH | IoPins::TR).bits();
        ((self.md_data & self.ctrl) | !self.ctrl) & mask
    }

    /// Last device data with the tristate settings applied
    #[inline]
    pub fn read_data(&self) -> u8 {
        self.apply_tristate(self.device_data)
    }

    /// Output pins show what the console wrote, inputs show the device
    #[inline]
    pub fn apply_tristate(&self, data: u8) -> u8 {
        let mut data = data & (!self.ctrl & 0x7F);
        data |= self.md_data & (self.ctrl | 0x80);
        data
    }

    pub fn ctrl(&self) -> u8 {
        self.ctrl
    }

    pub fn md_data(&self) -> u8 {
        self.md_data
    }

    pub fn device_data(&self) -> u8 {
        self.device_data
    }

    // Serial I/O

    pub fn ser_ctrl(&self) -> u8 {
        self.ser_ctrl.bits()
    }

    /// Status bits 0-2 are read-only
    pub fn write_ser_ctrl(&mut self, data: u8) {
        let status = self.ser_ctrl & SerCtrl::STATUS;
        self.ser_ctrl = status | (SerCtrl::from_bits_retain(data) - SerCtrl::STATUS);
    }

    pub fn ser_last_tx(&self) -> u8 {
        self.ser_last_tx
    }

    pub fn write_ser_tx(&mut self, data: u8) {
        self.ser_last_tx = data;
    }

    /// Nothing is ever received
    pub fn ser_rx(&self) -> u8 {
        0xFF
    }

    // Protocols

    /// 3-button pad: TH selects between two row layouts
    pub(super) fn latch_3btn(&mut self) {
        self.device_data = if self.select {
            Self::row_th_high(self.buttons)
        } else {
            Self::row_th_low(self.buttons)
        };
    }

    #[inline]
    fn row_th_high(buttons: u32) -> u8 {
        // ?1CBRLDU
        ((buttons & 0x3F) | 0x40) as u8
    }

    #[inline]
    fn row_th_low(buttons: u32) -> u8 {
        // ?0SA00DU
        (((buttons & 0xC0) >> 2) | (buttons & 0x03)) as u8
    }

    /// 6-button pad: TH rising edges step through four phases
    pub(super) fn update_6btn(&mut self, old_select: bool) {
        if !old_select && self.select {
            self.counter = (self.counter + 2) & 6;
            self.scanlines = 0;
        }
        self.latch_6btn();
    }

    pub(super) fn latch_6btn(&mut self) {
        let b = self.buttons;
        let phase = self.counter | (!self.select) as i32;
        self.device_data = match phase {
            // TH high, phases 0-2: regular row
            0 | 2 | 4 => Self::row_th_high(b),
            // TH low, phases 0-1
            1 | 3 => Self::row_th_low(b),
            // TH low, phase 2: D0-D3 low identifies the pad
            5 => ((b & 0xC0) >> 2) as u8,
            // TH high, phase 3: ?1CBMXYZ
            6 => ((b & 0x30) | 0x40 | ((b & 0xF00) >> 8)) as u8,
            // TH low, phase 3: D0-D3 high
            _ => (((b & 0xC0) >> 2) | 0x0F) as u8,
        };
    }

    /// Counts scanlines; returns true when the handshake timed out
    pub(super) fn tick_scanline(&mut self) -> bool {
        self.scanlines += 1;
        if self.scanlines >= SCANLINE_COUNT_MAX_6BTN {
            self.scanlines = 0;
            if self.counter != 0 {
                self.counter = 0;
                return true;
            }
        }
        false
    }

    /// 2-button pad: no multiplexing
    pub(super) fn latch_2btn(&mut self) {
        self.device_data = (0xC0 | (self.buttons & 0x3F)) as u8;
    }

    /// Nothing connected: pulled-up lines
    pub(super) fn latch_none(&mut self) {
        self.device_data = 0x7F;
    }

    /// Accumulate relative mouse motion
    pub fn mouse_move(&mut self, dx: i32, dy: i32) {
        self.mouse_dx = self.mouse_dx.saturating_add(dx);
        self.mouse_dy = self.mouse_dy.saturating_add(dy);
    }

    /// Mega Mouse: TH low starts a transfer, each TR toggle shifts out the
    /// next nibble, TL acknowledges by following TR.
    pub(super) fn update_mouse(&mut self, old_lines: u8) {
        let th = IoPins::TH.bits();
        let tr = IoPins::TR.bits();
        let lines = self.output_lines();

        if (old_lines & th) != 0 && (lines & th) == 0 {
            // Start of transfer: latch the motion accumulated so far
            self.counter = 1;
            self.mouse_sample_x = self.mouse_dx;
            self.mouse_sample_y = self.mouse_dy;
            self.mouse_dx = 0;
            self.mouse_dy = 0;
        } else if (lines & th) != 0 {
            self.counter = 0;
        } else if (old_lines & tr) != (lines & tr) && self.counter > 0 && self.counter < 9 {
            self.counter += 1;
        }
        self.lines = lines;
        self.latch_mouse();
    }

    fn latch_mouse(&mut self) {
        let x = self.mouse_sample_x.clamp(-MOUSE_MAX_DELTA, MOUSE_MAX_DELTA);
        let y = self.mouse_sample_y.clamp(-MOUSE_MAX_DELTA, MOUSE_MAX_DELTA);
        let x_byte = (x & 0xFF) as u8;
        let y_byte = (y & 0xFF) as u8;

        let nibble = match self.counter {
            0 => 0x00,
            1 => 0x0B,
            2 | 3 => 0x0F,
            4 => {
                (x < 0) as u8
                    | ((y < 0) as u8) << 1
                    | ((self.mouse_sample_x.unsigned_abs() > MOUSE_MAX_DELTA as u32) as u8) << 2
                    | ((self.mouse_sample_y.unsigned_abs() > MOUSE_MAX_DELTA as u32) as u8) << 3
            }
            5 => (self.buttons & 0x0F) as u8,
            6 => x_byte >> 4,
            7 => x_byte & 0x0F,
            8 => y_byte >> 4,
            _ => y_byte & 0x0F,
        };

        // TL follows TR while a transfer is running
        let tl = if self.counter == 0 {
            IoPins::TL.bits()
        } else {
            (self.lines & IoPins::TR.bits()) >> 1
        };
        self.device_data = nibble | tl | IoPins::TR.bits() | IoPins::TH.bits();
    }

    pub fn state(&self) -> IoDeviceState {
        IoDeviceState {
            counter: self.counter,
            scanlines: self.scanlines,
            buttons: self.buttons,
            mouse_dx: self.mouse_dx,
            mouse_dy: self.mouse_dy,
            mouse_sample_x: self.mouse_sample_x,
            mouse_sample_y: self.mouse_sample_y,
            io_type: self.io_type as u8,
            ctrl: self.ctrl,
            md_data: self.md_data,
            device_data: self.device_data,
            select: self.select as u8,
            ser_ctrl: self.ser_ctrl.bits(),
            ser_last_tx: self.ser_last_tx,
            lines: self.lines,
        }
    }

    /// Restore a snapshot; false if the device type is unknown
    pub fn set_state(&mut self, state: &IoDeviceState) -> bool {
        let io_type = match IoType::from_u8(state.io_type) {
            Some(io_type) => io_type,
            None => return false,
        };
        self.io_type = io_type;
        self.counter = state.counter;
        self.scanlines = state.scanlines;
        self.buttons = state.buttons;
        self.mouse_dx = state.mouse_dx;
        self.mouse_dy = state.mouse_dy;
        self.mouse_sample_x = state.mouse_sample_x;
        self.mouse_sample_y = state.mouse_sample_y;
        self.ctrl = state.ctrl;
        self.md_data = state.md_data;
        self.device_data = state.device_data;
        self.select = state.select != 0;
        self.ser_ctrl = SerCtrl::from_bits_retain(state.ser_ctrl);
        self.ser_last_tx = state.ser_last_tx;
        self.lines = state.lines;
        true
    }
}

impl Default for IoDevice {
    fn default() -> Self {
        Self::new(IoType::default())
    }
}
