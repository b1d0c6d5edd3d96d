//! Sistema de Memória do Genesis/Mega Drive.
//! Gerencia o barramento de endereços de 24-bit do 68000, a tabela de bancos
//! de 2MB, a RAM de trabalho e o roteamento para cartucho, I/O e VDP.

pub mod bus;
pub mod map;
pub mod sram;

// Re-exportações para facilitar o uso
pub use bus::MemoryBus;
pub use map::{BankType, SysId};
pub use sram::SaveRam;

use cfg_if::cfg_if;

/// Máscara de endereço válido para o barramento Genesis (24-bit = 16 MB)
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Tamanho máximo de ROM suportado (20 bancos físicos de 512KB, $000000-$9FFFFF)
pub const MAX_ROM_SIZE: usize = 10 * 1024 * 1024;

/// Tamanho máximo de Save RAM
pub const MAX_SRAM_SIZE: usize = 64 * 1024;

/// Tamanho da RAM do 68000 (64KB, espelhada em $E00000-$FFFFFF)
pub const RAM_SIZE: usize = 64 * 1024;

/// Erros do sistema de memória
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    InvalidAddress,
    RomTooLarge,
    InvalidCartridge,
    SaveError,
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::InvalidAddress => write!(f, "invalid address"),
            MemoryError::RomTooLarge => write!(f, "ROM image exceeds {} bytes", MAX_ROM_SIZE),
            MemoryError::InvalidCartridge => write!(f, "invalid cartridge image"),
            MemoryError::SaveError => write!(f, "save memory I/O failed"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Tipo de resultado para operações de memória
pub type MemoryResult<T> = Result<T, MemoryError>;

cfg_if! {
    if #[cfg(target_endian = "little")] {
        /// Inversão do bit 0 para acesso a byte em armazenamento de 16 bits.
        const BYTE_ADDR_INVERT: usize = 1;
    } else {
        const BYTE_ADDR_INVERT: usize = 0;
    }
}

/// Converte um endereço de byte do barramento (big-endian) no índice do byte
/// dentro de um armazenamento mantido em palavras de 16 bits nativas do host.
///
/// Em hosts little-endian o byte par (MSB) de cada palavra fica no índice
/// ímpar, então o bit 0 é invertido. Em hosts big-endian o índice é o mesmo.
#[inline(always)]
pub const fn byte_lane(address: usize) -> usize {
    address ^ BYTE_ADDR_INVERT
}

/// Converte uma imagem big-endian (formato do cartucho) em palavras nativas.
/// Um byte final ímpar é completado com $FF (barramento aberto).
pub fn words_from_be_bytes(data: &[u8]) -> Vec<u16> {
    data.chunks(2)
        .map(|pair| match *pair {
            [hi, lo] => u16::from_be_bytes([hi, lo]),
            [hi] => u16::from_be_bytes([hi, 0xFF]),
            _ => 0xFFFF,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_lane_matches_big_endian_bus() {
        let words: Vec<u16> = vec![0x1234, 0xABCD];
        let bytes: &[u8] = bytemuck::cast_slice(&words);

        assert_eq!(bytes[byte_lane(0)], 0x12);
        assert_eq!(bytes[byte_lane(1)], 0x34);
        assert_eq!(bytes[byte_lane(2)], 0xAB);
        assert_eq!(bytes[byte_lane(3)], 0xCD);
    }

    #[test]
    fn test_byte_lane_stays_inside_word() {
        for address in 0..64usize {
            assert_eq!(byte_lane(address) & !1, address & !1);
        }
    }

    #[test]
    fn test_words_from_be_bytes_pads_odd_tail() {
        let words = words_from_be_bytes(&[0x01, 0x02, 0x03]);
        assert_eq!(words, vec![0x0102, 0x03FF]);
    }
}
