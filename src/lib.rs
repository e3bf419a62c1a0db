#![crate_name = "mipspatch"]

pub mod assembler;
pub mod config;
pub mod error;
pub mod instruction;
pub mod patcher;
pub mod source;
pub mod stream;
pub mod symbols;

pub use assembler::Assembler;
pub use config::AssemblerConfig;
pub use error::{AssemblyError, Diagnostics, PatchError};
pub use patcher::{PatchReport, ReferencePatcher};
pub use source::assemble_source;
pub use stream::{Endian, InstructionHandle, InstructionStream};
pub use symbols::{Label, Reference, ReferenceKind, SymbolTable};
