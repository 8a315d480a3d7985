use thiserror::Error;

use crate::constants::{Address, Word, MEMORY_SIZE};

/// Represents errors related to memory manipulations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The given address was out of bounds
    #[error("invalid address {0:#04x}")]
    InvalidAddress(Address),

    /// A push tried to move the stack pointer below address 0
    #[error("stack overflow below address 0x00")]
    StackOverflow,
}

/// Holds the memory cells of the computer.
///
/// It has 256 cells, all zeroed on startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    inner: Box<[Word; MEMORY_SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            inner: Box::new([0; MEMORY_SIZE]),
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.inner.iter().filter(|&&cell| cell != 0).count();
        write!(f, "Memory {{ size: {MEMORY_SIZE}, non_zero: {used} }}")
    }
}

impl Memory {
    /// Get the value of a cell
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get(&self, address: Address) -> Result<Word, MemoryError> {
        self.inner
            .get(usize::from(address))
            .copied()
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Get a mutable reference to a cell
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get_mut(&mut self, address: Address) -> Result<&mut Word, MemoryError> {
        self.inner
            .get_mut(usize::from(address))
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Set the value of a cell
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn set(&mut self, address: Address, value: Word) -> Result<(), MemoryError> {
        *self.get_mut(address)? = value;
        Ok(())
    }

    /// Copy a whole image in memory, starting at `offset`.
    ///
    /// Bytes are written in order; the first one that does not fit stops the
    /// copy and is reported.
    ///
    /// # Errors
    ///
    /// It fails if the image does not fit in memory.
    pub fn load(&mut self, offset: Address, image: &[Word]) -> Result<(), MemoryError> {
        let mut address = offset;
        for &byte in image {
            self.set(address, byte)?;
            address = address
                .checked_add(1)
                .ok_or(MemoryError::InvalidAddress(Address::MAX))?;
        }
        Ok(())
    }

    /// Raw view of the whole memory
    #[must_use]
    pub fn as_slice(&self) -> &[Word] {
        &self.inner[..]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starts_zeroed_test() {
        let memory = Memory::default();
        assert!(memory.as_slice().iter().all(|&cell| cell == 0));
        assert_eq!(memory.as_slice().len(), MEMORY_SIZE);
    }

    #[test]
    fn read_write_test() {
        let mut memory = Memory::default();
        memory.set(0, 0x42).unwrap();
        memory.set(255, 0xFF).unwrap();
        assert_eq!(memory.get(0), Ok(0x42));
        assert_eq!(memory.get(255), Ok(0xFF));
        assert_eq!(memory.get(1), Ok(0));
    }

    #[test]
    fn out_of_bounds_test() {
        let mut memory = Memory::default();
        assert_eq!(memory.get(256), Err(MemoryError::InvalidAddress(256)));
        assert_eq!(memory.set(300, 1), Err(MemoryError::InvalidAddress(300)));
        assert!(memory.get_mut(Address::MAX).is_err());
    }

    #[test]
    fn load_test() {
        let mut memory = Memory::default();
        memory.load(0, &[1, 2, 3]).unwrap();
        assert_eq!(&memory.as_slice()[..4], &[1, 2, 3, 0]);

        // An image that does not fit is rejected at the first byte past the end
        let mut memory = Memory::default();
        let image = vec![0xAA; MEMORY_SIZE + 1];
        assert_eq!(memory.load(0, &image), Err(MemoryError::InvalidAddress(256)));
        assert!(memory.as_slice().iter().all(|&cell| cell == 0xAA));
    }
}
