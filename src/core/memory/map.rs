//! Tabela de tipos de banco do 68000.
//! O espaço de 24 bits é dividido em 8 bancos de 2MB; cada banco recebe um
//! tipo fixo na inicialização do sistema.

use crate::core::memory::ADDRESS_MASK;
use log::error;

/// Número de bancos de 2MB no espaço do 68000
pub const NUM_BANKS: usize = 8;

/// Deslocamento do índice de banco (bits 23-21)
pub const BANK_SHIFT: u32 = 21;

/// Tipo do dispositivo mapeado em um banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BankType {
    #[default]
    Unused = 0,
    Rom0 = 1,
    Rom1 = 2,
    Rom2 = 3,
    Rom3 = 4,
    Rom4 = 5,
    Io = 6,
    Vdp = 7,
    Ram = 8,
}

impl BankType {
    /// Converte o identificador salvo em estado; valores desconhecidos viram `Unused`
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => BankType::Rom0,
            2 => BankType::Rom1,
            3 => BankType::Rom2,
            4 => BankType::Rom3,
            5 => BankType::Rom4,
            6 => BankType::Io,
            7 => BankType::Vdp,
            8 => BankType::Ram,
            _ => BankType::Unused,
        }
    }
}

/// Identificador do sistema emulado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysId {
    MegaDrive,
    /// Nenhum dispositivo mapeado (todos os bancos sem uso)
    Unknown,
}

/// Tabela padrão do Mega Drive
pub const BANK_TYPES_MD: [BankType; NUM_BANKS] = [
    // $000000 - $3FFFFF: ROM
    BankType::Rom0,
    BankType::Rom1,
    // $400000 - $9FFFFF: sem uso no MD, alguns cartuchos não licenciados usam como ROM
    BankType::Rom2,
    BankType::Rom3,
    BankType::Rom4,
    // $A00000 - $BFFFFF: I/O (Z80, portas de controle, /TIME)
    BankType::Io,
    // $C00000 - $DFFFFF: VDP (espelhamento especial)
    BankType::Vdp,
    // $E00000 - $FFFFFF: RAM (espelhada a cada 64KB)
    BankType::Ram,
];

/// Tabela de bancos de uma sessão
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankMap {
    types: [BankType; NUM_BANKS],
}

impl BankMap {
    /// Cria a tabela para o sistema especificado
    pub fn new(system: SysId) -> Self {
        match system {
            SysId::MegaDrive => Self { types: BANK_TYPES_MD },
            SysId::Unknown => {
                error!("ID de sistema desconhecido: {:?}", system);
                Self { types: [BankType::Unused; NUM_BANKS] }
            }
        }
    }

    /// Índice do banco de um endereço (3 bits superiores)
    #[inline(always)]
    pub fn bank_index(addr: u32) -> usize {
        (((addr & ADDRESS_MASK) >> BANK_SHIFT) & 0x7) as usize
    }

    /// Obtém o tipo do banco para um endereço específico
    #[inline(always)]
    pub fn bank_type(&self, addr: u32) -> BankType {
        self.types[Self::bank_index(addr)]
    }

    pub fn types(&self) -> [BankType; NUM_BANKS] {
        self.types
    }

    /// Restaura os tipos a partir de um estado salvo
    pub fn set_types(&mut self, types: [BankType; NUM_BANKS]) {
        self.types = types;
    }
}

impl Default for BankMap {
    fn default() -> Self {
        Self::new(SysId::MegaDrive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md_bank_table() {
        let map = BankMap::new(SysId::MegaDrive);
        assert_eq!(map.bank_type(0x000000), BankType::Rom0);
        assert_eq!(map.bank_type(0x3FFFFF), BankType::Rom1);
        assert_eq!(map.bank_type(0xA11100), BankType::Io);
        assert_eq!(map.bank_type(0xC00004), BankType::Vdp);
        assert_eq!(map.bank_type(0xFF0000), BankType::Ram);
        // Bits acima de 24 são ignorados
        assert_eq!(map.bank_type(0x01FF_0000), BankType::Ram);
    }

    #[test]
    fn test_unknown_system_is_unmapped() {
        let map = BankMap::new(SysId::Unknown);
        assert!(map.types().iter().all(|&t| t == BankType::Unused));
    }

    #[test]
    fn test_bank_type_from_u8() {
        for t in BANK_TYPES_MD {
            assert_eq!(BankType::from_u8(t as u8), t);
        }
        assert_eq!(BankType::from_u8(0x42), BankType::Unused);
    }
}
