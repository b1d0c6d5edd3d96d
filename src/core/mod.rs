//! Núcleo do sistema: barramento, cartucho, controles e as interfaces do
//! hardware externo (CPUs, VDP e som).

pub mod cartridge;
pub mod io;
pub mod m68k;
pub mod memory;
pub mod snd;
pub mod system;
pub mod vdp;
pub mod z80;
