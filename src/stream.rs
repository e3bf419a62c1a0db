// Instruction Stream
//
// Ordered, append-only storage for instruction words. Words are addressed by
// handle so earlier instructions can be rewritten in place once label addresses
// are known.

use crate::error::PatchError;

/// Width of every instruction in bytes
pub const WORD_SIZE: u32 = 4;

/// Byte order used when serializing the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Stable reference to one instruction in an [`InstructionStream`].
///
/// Handles are indices, so appending never invalidates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionHandle(usize);

impl InstructionHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstructionStream {
    base_address: u32,
    words: Vec<u32>,
}

impl InstructionStream {
    pub fn new() -> Self {
        Self::with_base_address(0)
    }

    /// `base_address` is expected to be word-aligned; the config layer checks it.
    pub fn with_base_address(base_address: u32) -> Self {
        Self {
            base_address,
            words: Vec::new(),
        }
    }

    pub fn base_address(&self) -> u32 {
        self.base_address
    }

    fn address_at(&self, index: usize) -> Result<u32, PatchError> {
        u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_mul(WORD_SIZE))
            .and_then(|offset| self.base_address.checked_add(offset))
            .ok_or(PatchError::AddressOverflow(self.base_address, index + 1))
    }

    /// Address the next appended instruction will occupy. Fails once the stream
    /// reaches the top of the 32-bit address space.
    pub fn next_address(&self) -> Result<u32, PatchError> {
        self.address_at(self.words.len())
    }

    pub fn append(&mut self, word: u32) -> Result<InstructionHandle, PatchError> {
        let address = self.next_address()?;
        let handle = InstructionHandle(self.words.len());
        log::trace!(
            "append: 0x{:08x} at 0x{:08x} (handle {})",
            word,
            address,
            handle.0
        );
        self.words.push(word);
        Ok(handle)
    }

    pub fn get(&self, handle: InstructionHandle) -> Result<u32, PatchError> {
        self.words
            .get(handle.0)
            .copied()
            .ok_or(PatchError::UnknownHandle(handle.0))
    }

    pub fn set(&mut self, handle: InstructionHandle, word: u32) -> Result<(), PatchError> {
        let slot = self
            .words
            .get_mut(handle.0)
            .ok_or(PatchError::UnknownHandle(handle.0))?;
        *slot = word;
        Ok(())
    }

    pub fn address_of(&self, handle: InstructionHandle) -> Result<u32, PatchError> {
        if handle.0 < self.words.len() {
            self.address_at(handle.0)
        } else {
            Err(PatchError::UnknownHandle(handle.0))
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// `(address, word)` pairs in program order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        // `append` guarantees every stored word has an in-range address
        let base = self.base_address;
        self.words
            .iter()
            .enumerate()
            .map(move |(i, &word)| (base + i as u32 * WORD_SIZE, word))
    }

    pub fn to_bytes(&self, endian: Endian) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.words.len() * WORD_SIZE as usize);
        for &word in &self.words {
            match endian {
                Endian::Little => bytes.extend_from_slice(&word.to_le_bytes()),
                Endian::Big => bytes.extend_from_slice(&word.to_be_bytes()),
            }
        }
        bytes
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
