/// Symbol table for label definitions and deferred label references
///
/// Labels are created on first mention. A reference to a label that has not been
/// defined yet creates a placeholder entry with no address; the later definition
/// fills the address in. Nothing is patched here: the table only collects what the
/// [`crate::patcher::ReferencePatcher`] needs once every address is known.
use crate::error::PatchError;
use crate::instruction::Instruction;
use crate::stream::{InstructionHandle, WORD_SIZE};
use indexmap::IndexMap;

/// How a reference is encoded into its instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// 26-bit word index OR-ed into a `j`/`jal`
    AbsoluteJump,
    /// 16-bit signed word displacement from the delay slot, OR-ed into a branch
    RelativeBranch,
}

impl ReferenceKind {
    /// Classify a partially encoded instruction by its opcode.
    pub fn classify(word: u32, instruction_address: u32) -> Result<Self, PatchError> {
        match Instruction::new(word).opcode() {
            Some(opcode) if opcode.is_jump() => Ok(ReferenceKind::AbsoluteJump),
            Some(opcode) if opcode.is_branch() => Ok(ReferenceKind::RelativeBranch),
            _ => Err(PatchError::NotJumpOrBranch(instruction_address, word)),
        }
    }
}

/// A pending use of a label by one instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub handle: InstructionHandle,
    pub address: u32, // Address of the referencing instruction
    pub kind: ReferenceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub address: Option<u32>, // None until defined
    pub references: Vec<Reference>,
}

impl Label {
    fn placeholder(name: &str) -> Self {
        Label {
            name: name.to_string(),
            address: None,
            references: Vec::new(),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.address.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    labels: IndexMap<String, Label>,
}

fn check_aligned(name: &str, address: u32) -> Result<(), PatchError> {
    if address % WORD_SIZE != 0 {
        return Err(PatchError::MisalignedAddress(name.to_string(), address));
    }
    Ok(())
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            labels: IndexMap::new(),
        }
    }

    /// Give `name` a concrete address.
    ///
    /// Fills in a placeholder left by a forward reference. Redefining a label at the
    /// address it already holds is accepted; any other redefinition is a
    /// `DuplicateLabel`.
    pub fn define(&mut self, name: &str, address: u32) -> Result<(), PatchError> {
        check_aligned(name, address)?;

        let label = self
            .labels
            .entry(name.to_string())
            .or_insert_with(|| Label::placeholder(name));

        match label.address {
            None => {
                log::debug!("define: '{}' = 0x{:08x}", name, address);
                label.address = Some(address);
                Ok(())
            }
            Some(existing) if existing == address => {
                log::debug!("define: '{}' repeated at 0x{:08x}", name, address);
                Ok(())
            }
            Some(existing) => {
                log::warn!(
                    "define: '{}' already at 0x{:08x}, rejected 0x{:08x}",
                    name,
                    existing,
                    address
                );
                Err(PatchError::DuplicateLabel(name.to_string()))
            }
        }
    }

    /// Record that the instruction at `referencing_address` uses `name`.
    ///
    /// Creates a placeholder when the label has not been seen yet.
    pub fn add_reference(
        &mut self,
        handle: InstructionHandle,
        referencing_address: u32,
        name: &str,
        kind: ReferenceKind,
    ) -> Result<(), PatchError> {
        check_aligned(name, referencing_address)?;

        let label = self
            .labels
            .entry(name.to_string())
            .or_insert_with(|| Label::placeholder(name));

        log::debug!(
            "add_reference: {:?} to '{}' from 0x{:08x}{}",
            kind,
            name,
            referencing_address,
            if label.is_defined() { "" } else { " (forward)" }
        );

        label.references.push(Reference {
            handle,
            address: referencing_address,
            kind,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Label> {
        self.labels.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.labels.get(name).is_some_and(Label::is_defined)
    }

    pub fn address_of(&self, name: &str) -> Option<u32> {
        self.labels.get(name).and_then(|label| label.address)
    }

    /// Every label entry, in first-mention order
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }

    pub(crate) fn labels_mut(&mut self) -> impl Iterator<Item = &mut Label> {
        self.labels.values_mut()
    }

    /// Placeholders that are still referenced
    pub fn undefined_labels(&self) -> Vec<&str> {
        self.labels
            .values()
            .filter(|label| !label.is_defined() && !label.references.is_empty())
            .map(|label| label.name.as_str())
            .collect()
    }

    pub fn pending_reference_count(&self) -> usize {
        self.labels.values().map(|label| label.references.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
#[path = "symbols_tests.rs"]
mod tests;
