// genesis-bus-rs/src/core/snd.rs

/// Sound chips reachable from the 68000 bus
pub trait SoundChips {
    /// YM2612 /IC line, tied to the Z80 reset line
    fn ym2612_reset(&mut self);
    /// SN76489 write through the VDP window ($C00011)
    fn psg_write(&mut self, data: u8);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSound;

impl SoundChips for NullSound {
    fn ym2612_reset(&mut self) {}

    fn psg_write(&mut self, _data: u8) {}
}
