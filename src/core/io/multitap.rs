// genesis-bus-rs/src/core/io/multitap.rs

//! Multi-tap adapters: Sega Team Player and EA 4-Way Play.
//!
//! Both fan one or two connectors out to four pads. Which pad is being
//! read is decided by a handshake on the host port, so these work on the
//! whole device table instead of a single device.

use super::buttons::IoPins;
use super::device::{IoDevice, IoType};
use super::{VIRTPORT_1, VIRTPORT_2, VIRTPORT_4WPA};

/// Team Player ID nibble of an attached pad
fn team_player_type_nibble(io_type: IoType) -> u8 {
    match io_type {
        IoType::ThreeButton => 0x0,
        IoType::SixButton => 0x1,
        _ => 0xF,
    }
}

/// Button nibbles transferred for each attached pad, in order
fn team_player_data_nibble(devices: &[IoDevice], first_member: usize, index: usize) -> u8 {
    let mut remaining = index;
    for device in &devices[first_member..first_member + 4] {
        let nibbles = match device.io_type() {
            IoType::ThreeButton => 2,
            IoType::SixButton => 3,
            _ => 0,
        };
        if remaining < nibbles {
            return ((device.buttons() >> (remaining * 4)) & 0x0F) as u8;
        }
        remaining -= nibbles;
    }
    // Past the last pad
    0x0F
}

/// Team Player on `virt`, members starting at `first_member`
pub(super) fn update_team_player(
    devices: &mut [IoDevice],
    virt: usize,
    first_member: usize,
    old_lines: u8,
) {
    let lines = devices[virt].output_lines();
    let th = IoPins::TH.bits();

    if lines != old_lines {
        let tap = &mut devices[virt];
        if lines & th != 0 {
            tap.counter = 0;
        } else {
            tap.counter += 1;
        }
    }

    // TL acknowledges by following TR
    let tl = (lines & IoPins::TR.bits()) >> 1;
    let counter = devices[virt].counter;
    let data = match counter {
        0 => 0x73,
        1 => 0x3F,
        2 | 3 => tl,
        4..=7 => {
            let member = first_member + (counter - 4) as usize;
            team_player_type_nibble(devices[member].io_type()) | tl
        }
        n => team_player_data_nibble(devices, first_member, (n - 8) as usize) | tl,
    };

    let tap = &mut devices[virt];
    tap.device_data = data;
    tap.lines = lines;
}

/// 4-Way Play master on port 2: latches which pad port 1 reads
pub(super) fn update_4wp_master(devices: &mut [IoDevice]) {
    let master = &mut devices[VIRTPORT_2];
    if master.ctrl & 0x70 == 0x70 {
        master.counter = ((master.md_data & 0x70) >> 4) as i32;
    }
    master.device_data = 0x7F;

    if devices[VIRTPORT_1].io_type() == IoType::FourWayPlaySlave {
        update_4wp_slave(devices, false);
    }
}

/// 4-Way Play slave on port 1. With `edge == false` the selected pad only
/// picks up the port lines; with `edge == true` TH transitions count.
pub(super) fn update_4wp_slave(devices: &mut [IoDevice], edge: bool) {
    let latch = if devices[VIRTPORT_2].io_type() == IoType::FourWayPlayMaster {
        devices[VIRTPORT_2].counter
    } else {
        4
    };

    if latch & 4 != 0 {
        // No pad selected: adapter ID
        devices[VIRTPORT_1].device_data = 0x7C;
        return;
    }

    let (ctrl, md_data) = (devices[VIRTPORT_1].ctrl, devices[VIRTPORT_1].md_data);
    let index = VIRTPORT_4WPA + (latch & 3) as usize;
    let pad = &mut devices[index];

    let old_select = pad.is_select();
    pad.ctrl = ctrl;
    pad.md_data = md_data;
    pad.update_select_line();
    let old_select = if edge { old_select } else { pad.is_select() };

    match pad.io_type() {
        IoType::ThreeButton => pad.latch_3btn(),
        IoType::SixButton => pad.update_6btn(old_select),
        _ => pad.latch_none(),
    }
    pad.lines = pad.output_lines();

    let data = pad.device_data;
    devices[VIRTPORT_1].device_data = data;
}
