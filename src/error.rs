// Assembler Error Handling

use std::fmt;

/// Failures raised while recording labels and references or while patching.
///
/// Every variant carries enough context (label name, instruction address) to be
/// reported on its own line by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    // Symbol table errors
    DuplicateLabel(String),
    MisalignedAddress(String, u32), // label, address

    // Patch errors
    UndefinedLabel(String),
    DisplacementOverflow(String, u32), // label, instruction address
    JumpOutOfRegion(String, u32),      // label, instruction address
    ConflictingReference(u32),         // instruction address

    // Stream errors
    UnknownHandle(usize),
    NotJumpOrBranch(u32, u32),   // instruction address, word
    AddressMismatch(u32, u32),   // recorded address, actual address of the instruction
    AddressOverflow(u32, usize), // base address, instruction count

    // Phase errors
    PhaseViolation(&'static str),
    AlreadyPatched,
    NotPatched,
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PatchError::DuplicateLabel(name) => {
                write!(f, "Duplicate label '{}'", name)
            }
            PatchError::MisalignedAddress(name, address) => {
                write!(
                    f,
                    "Address 0x{:08x} for label '{}' is not word-aligned",
                    address, name
                )
            }
            PatchError::UndefinedLabel(name) => {
                write!(f, "Undefined label '{}'", name)
            }
            PatchError::DisplacementOverflow(name, address) => {
                write!(
                    f,
                    "Branch at 0x{:08x} to label '{}' does not fit in a 16-bit displacement",
                    address, name
                )
            }
            PatchError::JumpOutOfRegion(name, address) => {
                write!(
                    f,
                    "Jump at 0x{:08x} cannot reach label '{}' outside its 256 MiB region",
                    address, name
                )
            }
            PatchError::ConflictingReference(address) => {
                write!(
                    f,
                    "Instruction at 0x{:08x} references more than one label",
                    address
                )
            }
            PatchError::UnknownHandle(index) => {
                write!(f, "Instruction handle {} does not belong to this stream", index)
            }
            PatchError::NotJumpOrBranch(address, word) => {
                write!(
                    f,
                    "Instruction 0x{:08x} at 0x{:08x} is neither a jump nor a branch",
                    word, address
                )
            }
            PatchError::AddressMismatch(given, actual) => {
                write!(
                    f,
                    "Reference recorded at 0x{:08x} but the instruction is at 0x{:08x}",
                    given, actual
                )
            }
            PatchError::AddressOverflow(base, count) => {
                write!(
                    f,
                    "{} instructions from base 0x{:08x} run past the end of the 32-bit address space",
                    count, base
                )
            }
            PatchError::PhaseViolation(operation) => {
                write!(f, "Cannot {} after references have been patched", operation)
            }
            PatchError::AlreadyPatched => {
                write!(f, "References have already been patched for this run")
            }
            PatchError::NotPatched => {
                write!(f, "Instruction words requested before references were patched")
            }
        }
    }
}

impl std::error::Error for PatchError {}

/// Ordered collection of patch failures. Assembly fails when it is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<PatchError>);

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics(Vec::new())
    }

    pub fn push(&mut self, error: PatchError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatchError> {
        self.0.iter()
    }

    pub fn contains(&self, error: &PatchError) -> bool {
        self.0.contains(error)
    }

    pub fn into_vec(self) -> Vec<PatchError> {
        self.0
    }
}

impl From<PatchError> for Diagnostics {
    fn from(error: PatchError) -> Self {
        Diagnostics(vec![error])
    }
}

impl IntoIterator for Diagnostics {
    type Item = PatchError;
    type IntoIter = std::vec::IntoIter<PatchError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "error: {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

/// Driver-level failures: parsing source, loading configuration, file IO, patching.
#[derive(Debug, Clone)]
pub enum AssemblyError {
    Parse(Vec<(usize, String)>), // (1-based line, message)
    Patch(Diagnostics),
    Config(String),
    Io(String),
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssemblyError::Parse(errors) => {
                for (i, (line, msg)) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "error: line {}: {}", line, msg)?;
                }
                Ok(())
            }
            AssemblyError::Patch(diagnostics) => write!(f, "{}", diagnostics),
            AssemblyError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AssemblyError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AssemblyError {}

impl From<Diagnostics> for AssemblyError {
    fn from(diagnostics: Diagnostics) -> Self {
        AssemblyError::Patch(diagnostics)
    }
}

impl From<PatchError> for AssemblyError {
    fn from(error: PatchError) -> Self {
        AssemblyError::Patch(Diagnostics::from(error))
    }
}

impl From<std::io::Error> for AssemblyError {
    fn from(error: std::io::Error) -> Self {
        AssemblyError::Io(error.to_string())
    }
}

impl From<toml::de::Error> for AssemblyError {
    fn from(error: toml::de::Error) -> Self {
        AssemblyError::Config(error.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
