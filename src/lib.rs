// Ponto de entrada da biblioteca: barramento do 68000 do Mega Drive,
// arbitragem do Z80 e portas de controle.

// Módulos principais do projeto.
pub mod core;

// Re-exportações para facilitar o uso.
pub use crate::core::cartridge::RomCartridge;
pub use crate::core::io::{IoError, IoManager, IoType, PhysPort, VirtPort};
pub use crate::core::memory::bus::AccessWidth;
pub use crate::core::memory::{MemoryBus, MemoryError, MemoryResult};
pub use crate::core::system::{Peripherals, Region, SystemConfig};
pub use crate::core::z80::BusArbiter;

/// Versão da biblioteca.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cria um barramento com o cartucho informado e hardware externo nulo.
pub fn create_bus(config: SystemConfig, cart: RomCartridge) -> MemoryBus {
    MemoryBus::new(config, cart, Peripherals::default())
}
