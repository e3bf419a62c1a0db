// Assembler configuration, loaded from TOML
//
//     base_address = 0x00400000
//     check_displacement_overflow = true
//     endian = "big"
//     listing = false

use crate::error::AssemblyError;
use crate::stream::{Endian, WORD_SIZE};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssemblerConfig {
    /// Address of the first instruction
    pub base_address: u32,
    /// Reject branch displacements and jump targets that do not fit their field
    pub check_displacement_overflow: bool,
    /// Byte order of the written binary
    pub endian: Endian,
    /// Print a disassembly listing after assembling
    pub listing: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            base_address: 0,
            check_displacement_overflow: true,
            endian: Endian::Little,
            listing: false,
        }
    }
}

impl AssemblerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, AssemblyError> {
        let config: AssemblerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AssemblyError> {
        let path = path.as_ref();
        log::debug!("Loading assembler config from {}", path.display());
        let text = fs::read_to_string(path).map_err(|e| {
            AssemblyError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), AssemblyError> {
        if self.base_address % WORD_SIZE != 0 {
            return Err(AssemblyError::Config(format!(
                "base_address 0x{:08x} is not word-aligned",
                self.base_address
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
