/// Assembler context
///
/// Owns the instruction stream, the symbol table and the configuration for one
/// assembly run, and enforces the two-phase protocol: every definition and reference
/// is recorded first, then `patch_all` runs exactly once, and only then can the final
/// words be read.
use crate::config::AssemblerConfig;
use crate::error::{Diagnostics, PatchError};
use crate::instruction::Instruction;
use crate::patcher::{PatchReport, ReferencePatcher};
use crate::stream::{InstructionHandle, InstructionStream};
use crate::symbols::{ReferenceKind, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collecting,
    Patched,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Assembler {
    config: AssemblerConfig,
    stream: InstructionStream,
    symbols: SymbolTable,
    phase: Phase,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}

impl Assembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            stream: InstructionStream::with_base_address(config.base_address),
            symbols: SymbolTable::new(),
            phase: Phase::Collecting,
            config,
        }
    }

    fn ensure_collecting(&self, operation: &'static str) -> Result<(), PatchError> {
        match self.phase {
            Phase::Collecting => Ok(()),
            Phase::Patched | Phase::Failed => Err(PatchError::PhaseViolation(operation)),
        }
    }

    pub fn append_instruction(&mut self, word: u32) -> Result<InstructionHandle, PatchError> {
        self.ensure_collecting("append an instruction")?;
        self.stream.append(word)
    }

    pub fn define_label(&mut self, name: &str, address: u32) -> Result<(), PatchError> {
        self.ensure_collecting("define a label")?;
        self.symbols.define(name, address)
    }

    /// Define `name` at the address of the next instruction
    pub fn define_label_here(&mut self, name: &str) -> Result<(), PatchError> {
        self.ensure_collecting("define a label")?;
        let address = self.stream.next_address()?;
        self.symbols.define(name, address)
    }

    /// Record that the instruction behind `handle` uses `name` as its target.
    ///
    /// The instruction must already carry a jump or branch opcode; its kind is fixed
    /// here and not re-read during patching. `current_address` must be the address
    /// the stream gave the instruction.
    pub fn reference_label(
        &mut self,
        handle: InstructionHandle,
        current_address: u32,
        name: &str,
    ) -> Result<(), PatchError> {
        self.ensure_collecting("reference a label")?;
        let word = self.stream.get(handle)?;
        let actual = self.stream.address_of(handle)?;
        if current_address != actual {
            return Err(PatchError::AddressMismatch(current_address, actual));
        }
        let kind = ReferenceKind::classify(word, current_address)?;
        self.symbols.add_reference(handle, current_address, name, kind)
    }

    /// Append a jump or branch and reference `name` from it in one step
    pub fn append_reference(
        &mut self,
        word: u32,
        name: &str,
    ) -> Result<InstructionHandle, PatchError> {
        self.ensure_collecting("append an instruction")?;
        let address = self.stream.next_address()?;
        let kind = ReferenceKind::classify(word, address)?;
        let handle = self.stream.append(word)?;
        self.symbols.add_reference(handle, address, name, kind)?;
        Ok(handle)
    }

    /// Resolve every recorded reference. Single-use per run.
    pub fn patch_all(&mut self) -> Result<PatchReport, Diagnostics> {
        match self.phase {
            Phase::Collecting => {}
            Phase::Patched | Phase::Failed => return Err(PatchError::AlreadyPatched.into()),
        }

        let patcher =
            ReferencePatcher::with_range_checks(self.config.check_displacement_overflow);
        match patcher.patch_all(&mut self.symbols, &mut self.stream) {
            Ok(report) => {
                self.phase = Phase::Patched;
                Ok(report)
            }
            Err(diagnostics) => {
                self.phase = Phase::Failed;
                Err(diagnostics)
            }
        }
    }

    pub fn final_instruction_words(&self) -> Result<&[u32], PatchError> {
        match self.phase {
            Phase::Patched => Ok(self.stream.words()),
            Phase::Collecting | Phase::Failed => Err(PatchError::NotPatched),
        }
    }

    pub fn final_bytes(&self) -> Result<Vec<u8>, PatchError> {
        self.final_instruction_words()?;
        Ok(self.stream.to_bytes(self.config.endian))
    }

    /// One line per instruction: address, word, disassembly, and any label defined there
    pub fn listing(&self) -> Vec<String> {
        self.stream
            .iter()
            .map(|(address, word)| {
                let labels: Vec<&str> = self
                    .symbols
                    .labels()
                    .filter(|label| label.address == Some(address))
                    .map(|label| label.name.as_str())
                    .collect();
                let prefix = if labels.is_empty() {
                    String::new()
                } else {
                    format!("{}:", labels.join(": "))
                };
                format!(
                    "0x{:08x}  {:08x}  {:<12} {}",
                    address,
                    word,
                    prefix,
                    Instruction::new(word)
                )
            })
            .collect()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn stream(&self) -> &InstructionStream {
        &self.stream
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn current_address(&self) -> Result<u32, PatchError> {
        self.stream.next_address()
    }
}

#[cfg(test)]
#[path = "assembler_tests.rs"]
mod tests;
