/// Reference patcher - second pass of assembly
///
/// Once every label has an address, each pending reference is turned into a bit
/// pattern and OR-ed into its instruction word:
///
/// - **Absolute jump**: `(label >> 2) & 0x3FFFFFF` into the 26-bit target field
/// - **Relative branch**: `((label - reference - 4) >> 2) & 0xFFFF` into the low
///   16 bits, a signed word count measured from the delay slot
///
/// Patching works in two steps. All patches are computed and validated first, and
/// instruction words are only written when no diagnostic was raised, so a failed run
/// leaves the stream untouched. Pending lists are drained afterwards, so the pass is
/// single-use: OR-ing the same patch into an already patched word is not idempotent.
use crate::error::{Diagnostics, PatchError};
use crate::stream::{InstructionHandle, InstructionStream, WORD_SIZE};
use crate::symbols::{ReferenceKind, SymbolTable};
use indexmap::IndexMap;

pub const JUMP_TARGET_MASK: u32 = 0x03FF_FFFF;
pub const BRANCH_DISPLACEMENT_MASK: u32 = 0x0000_FFFF;
const JUMP_REGION_MASK: u32 = 0xF000_0000;

/// Counts from a successful patch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub labels: usize,
    pub jumps: usize,
    pub branches: usize,
}

impl PatchReport {
    pub fn references(&self) -> usize {
        self.jumps + self.branches
    }
}

/// 26-bit word index for an absolute jump to `label_address`
pub fn jump_target_field(label_address: u32) -> u32 {
    (label_address >> 2) & JUMP_TARGET_MASK
}

/// Signed word displacement from the instruction after the branch
pub fn branch_displacement(label_address: u32, referencing_address: u32) -> i64 {
    (label_address as i64 - referencing_address as i64 - WORD_SIZE as i64) >> 2
}

/// Low 16 bits of the branch displacement, two's complement
pub fn branch_displacement_field(label_address: u32, referencing_address: u32) -> u32 {
    branch_displacement(label_address, referencing_address) as u32 & BRANCH_DISPLACEMENT_MASK
}

pub fn displacement_fits(displacement: i64) -> bool {
    (i16::MIN as i64..=i16::MAX as i64).contains(&displacement)
}

/// A jump can only reach the 256 MiB region of its delay slot
pub fn jump_reachable(label_address: u32, referencing_address: u32) -> bool {
    let delay_slot = referencing_address.wrapping_add(WORD_SIZE);
    delay_slot & JUMP_REGION_MASK == label_address & JUMP_REGION_MASK
}

#[derive(Debug, Clone)]
pub struct ReferencePatcher {
    check_ranges: bool,
}

impl Default for ReferencePatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferencePatcher {
    pub fn new() -> Self {
        Self { check_ranges: true }
    }

    /// With range checks off, out-of-range displacements are silently truncated
    /// to their field width.
    pub fn with_range_checks(check_ranges: bool) -> Self {
        Self { check_ranges }
    }

    /// Patch every pending reference in `symbols` into `stream`.
    ///
    /// Must run once, after the last label definition. On failure every diagnostic
    /// found is returned and neither the stream nor the table is modified.
    pub fn patch_all(
        &self,
        symbols: &mut SymbolTable,
        stream: &mut InstructionStream,
    ) -> Result<PatchReport, Diagnostics> {
        log::info!(
            "Patching {} references across {} labels",
            symbols.pending_reference_count(),
            symbols.len()
        );

        let mut diagnostics = Diagnostics::new();
        let mut report = PatchReport::default();
        // One instruction holds one label operand
        let mut patches: IndexMap<InstructionHandle, (&str, ReferenceKind, u32)> =
            IndexMap::new();

        for label in symbols.labels() {
            report.labels += 1;

            let label_address = match label.address {
                Some(address) => address,
                None => {
                    if !label.references.is_empty() {
                        log::debug!(
                            "Label '{}' has {} references but no definition",
                            label.name,
                            label.references.len()
                        );
                        diagnostics.push(PatchError::UndefinedLabel(label.name.clone()));
                    }
                    continue;
                }
            };

            for reference in &label.references {
                match stream.address_of(reference.handle) {
                    Ok(actual) if actual == reference.address => {}
                    Ok(actual) => {
                        diagnostics.push(PatchError::AddressMismatch(reference.address, actual));
                        continue;
                    }
                    Err(e) => {
                        diagnostics.push(e);
                        continue;
                    }
                }

                let bits = match reference.kind {
                    ReferenceKind::AbsoluteJump => {
                        if self.check_ranges && !jump_reachable(label_address, reference.address)
                        {
                            diagnostics.push(PatchError::JumpOutOfRegion(
                                label.name.clone(),
                                reference.address,
                            ));
                            continue;
                        }
                        jump_target_field(label_address)
                    }
                    ReferenceKind::RelativeBranch => {
                        let displacement = branch_displacement(label_address, reference.address);
                        if self.check_ranges && !displacement_fits(displacement) {
                            diagnostics.push(PatchError::DisplacementOverflow(
                                label.name.clone(),
                                reference.address,
                            ));
                            continue;
                        }
                        branch_displacement_field(label_address, reference.address)
                    }
                };

                // Only an exact repeat is a duplicate; a different label or a
                // different recorded address yields different bits
                match patches.get(&reference.handle) {
                    Some((other, _, other_bits))
                        if *other == label.name && *other_bits == bits =>
                    {
                        log::debug!(
                            "Skipping duplicate reference to '{}' at 0x{:08x}",
                            label.name,
                            reference.address
                        );
                    }
                    Some((other, _, other_bits)) => {
                        log::warn!(
                            "Instruction at 0x{:08x} patched as '{}' (0x{:x}) and '{}' (0x{:x})",
                            reference.address,
                            other,
                            other_bits,
                            label.name,
                            bits
                        );
                        diagnostics
                            .push(PatchError::ConflictingReference(reference.address));
                    }
                    None => {
                        match reference.kind {
                            ReferenceKind::AbsoluteJump => report.jumps += 1,
                            ReferenceKind::RelativeBranch => report.branches += 1,
                        }
                        patches.insert(
                            reference.handle,
                            (label.name.as_str(), reference.kind, bits),
                        );
                    }
                }
            }
        }

        if !diagnostics.is_empty() {
            log::info!(
                "Patching aborted with {} diagnostics, no instructions written",
                diagnostics.len()
            );
            return Err(diagnostics);
        }

        for (&handle, &(name, kind, bits)) in &patches {
            let word = stream.get(handle)?;
            let field_mask = match kind {
                ReferenceKind::AbsoluteJump => JUMP_TARGET_MASK,
                ReferenceKind::RelativeBranch => BRANCH_DISPLACEMENT_MASK,
            };
            if word & field_mask != 0 {
                log::warn!(
                    "Instruction 0x{:08x} (handle {}) already has bits in its '{}' field",
                    word,
                    handle.index(),
                    name
                );
            }
            let patched = word | bits;
            log::debug!(
                "patch: handle {} '{}' 0x{:08x} -> 0x{:08x}",
                handle.index(),
                name,
                word,
                patched
            );
            stream.set(handle, patched)?;
        }

        for label in symbols.labels_mut() {
            label.references.clear();
        }

        log::info!(
            "Patched {} jumps and {} branches",
            report.jumps,
            report.branches
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "patcher_tests.rs"]
mod tests;
