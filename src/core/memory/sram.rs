//! Gerenciamento de Save RAM (bateria).
//! A janela de endereços vem do cabeçalho da ROM; o mapeamento pode ser
//! ligado/desligado pelo registrador $A130F1.

use crate::core::memory::{MemoryError, MemoryResult, MAX_SRAM_SIZE};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use log::{error, info};

/// Início padrão da janela de SRAM
pub const SRAM_DEFAULT_START: u32 = 0x200000;
/// Fim padrão da janela de SRAM (inclusivo)
pub const SRAM_DEFAULT_END: u32 = 0x20FFFF;

/// Save RAM com suporte a persistência
pub struct SaveRam {
    data: Vec<u8>,
    start: u32,
    end: u32,
    enabled: bool,
    write_protect: bool,
    dirty: bool,
    file_path: Option<String>,
}

impl SaveRam {
    /// Cria uma nova Save RAM cobrindo `start..=end`
    pub fn new(start: u32, end: u32) -> Self {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        let size = ((end - start) as usize + 1).min(MAX_SRAM_SIZE);

        Self {
            // SRAM apagada lê $FF
            data: vec![0xFF; size],
            start,
            end: start + size as u32 - 1,
            enabled: false,
            write_protect: false,
            dirty: false,
            file_path: None,
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_write_protected(&self) -> bool {
        self.write_protect
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Verifica se o endereço cai na janela mapeada
    #[inline]
    pub fn contains(&self, addr: u32) -> bool {
        self.enabled && addr >= self.start && addr <= self.end
    }

    /// Carrega Save RAM de um arquivo
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> MemoryResult<()> {
        let mut file = File::open(&path).map_err(|_| MemoryError::SaveError)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).map_err(|_| MemoryError::SaveError)?;

        self.load_from_buffer(&buffer);
        self.file_path = Some(path.as_ref().to_string_lossy().into_owned());
        info!("Save RAM carregada: {} bytes", buffer.len().min(self.data.len()));
        Ok(())
    }

    /// Copia o conteúdo salvo; bytes além do tamanho são ignorados
    pub fn load_from_buffer(&mut self, buffer: &[u8]) {
        let len = buffer.len().min(self.data.len());
        self.data[..len].copy_from_slice(&buffer[..len]);
        self.dirty = false;
    }

    /// Salva Save RAM em um arquivo
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> MemoryResult<()> {
        let path = path.as_ref();
        let mut file = File::create(path).map_err(|_| MemoryError::SaveError)?;
        file.write_all(&self.data).map_err(|_| MemoryError::SaveError)?;
        self.file_path = Some(path.to_string_lossy().into_owned());
        self.dirty = false;
        info!("Save RAM salva: {} bytes", self.data.len());
        Ok(())
    }

    /// Salva automaticamente se suja
    pub fn auto_save(&mut self) {
        if self.dirty {
            if let Some(path) = self.file_path.clone() {
                if let Err(e) = self.save_to_file(&path) {
                    error!("Falha ao salvar Save RAM: {}", e);
                }
            }
        }
    }

    /// Lê um byte (endereço absoluto do 68000)
    pub fn read_byte(&self, addr: u32) -> u8 {
        if self.contains(addr) {
            self.data[self.offset(addr)]
        } else {
            0xFF
        }
    }

    /// Escreve um byte (endereço absoluto do 68000)
    pub fn write_byte(&mut self, addr: u32, value: u8) {
        if self.contains(addr) && !self.write_protect {
            let offset = self.offset(addr);
            self.data[offset] = value;
            self.dirty = true;
        }
    }

    #[inline]
    fn offset(&self, addr: u32) -> usize {
        (addr - self.start) as usize % self.data.len()
    }

    /// Habilita/desabilita
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Habilita/desabilita proteção contra escrita
    pub fn set_write_protect(&mut self, protect: bool) {
        self.write_protect = protect;
    }
}

impl Default for SaveRam {
    fn default() -> Self {
        Self::new(SRAM_DEFAULT_START, SRAM_DEFAULT_END)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_sram_reads_open_bus() {
        let mut sram = SaveRam::default();
        sram.write_byte(0x200001, 0x12);
        assert_eq!(sram.read_byte(0x200001), 0xFF);
        assert!(!sram.is_dirty());
    }

    #[test]
    fn test_write_protect() {
        let mut sram = SaveRam::default();
        sram.set_enabled(true);
        sram.write_byte(0x200001, 0x12);
        sram.set_write_protect(true);
        sram.write_byte(0x200001, 0x34);
        assert_eq!(sram.read_byte(0x200001), 0x12);
        assert!(sram.is_dirty());
    }

    #[test]
    fn test_window_bounds() {
        let mut sram = SaveRam::new(0x200001, 0x203FFF);
        sram.set_enabled(true);
        assert_eq!(sram.size(), 0x3FFF);
        assert!(!sram.contains(0x200000));
        assert!(sram.contains(0x203FFF));
        assert!(!sram.contains(0x204000));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("genesis_bus_sram_{}.srm", std::process::id()));

        let mut sram = SaveRam::default();
        sram.set_enabled(true);
        sram.write_byte(0x200010, 0xA5);
        sram.save_to_file(&path).unwrap();
        assert!(!sram.is_dirty());

        let mut restored = SaveRam::default();
        restored.set_enabled(true);
        restored.load_from_file(&path).unwrap();
        assert_eq!(restored.read_byte(0x200010), 0xA5);

        // Dirty data goes back to the file it was loaded from
        restored.auto_save();
        restored.write_byte(0x200011, 0x5A);
        restored.auto_save();
        assert!(!restored.is_dirty());
        let written = std::fs::read(&path).unwrap();
        assert_eq!(&written[0x10..0x12], &[0xA5, 0x5A]);

        let _ = std::fs::remove_file(&path);
    }
}
