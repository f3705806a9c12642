//! Main memory.
//!
//! A flat array of 16-bit words covering the whole 16-bit address space.
//! Every `u16` is a valid address, so reads and writes cannot fail.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of memory cells (the full 16-bit address space).
pub const MEMORY_SIZE: usize = 1 << 16;

/// Keyboard status register address. Reserved, but an ordinary cell here.
pub const KBSR: u16 = 0xFE00;

/// Keyboard data register address. Reserved, but an ordinary cell here.
pub const KBDR: u16 = 0xFE02;

/// Main memory: 65536 sixteen-bit cells, zeroed at creation.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a cell.
    #[inline]
    pub fn read(&self, addr: u16) -> u16 {
        self.cells[usize::from(addr)]
    }

    /// Write a cell.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[usize::from(addr)] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a program into memory starting at `origin`.
    ///
    /// The program must fit between `origin` and the top of the address
    /// space; it is never wrapped around to address zero.
    pub fn load_program(&mut self, origin: u16, program: &[u16]) -> Result<(), MemoryError> {
        let start = usize::from(origin);
        let available = MEMORY_SIZE - start;
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Iterate over every nonzero cell as `(address, value)`.
    pub fn nonzero(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value != 0)
            .map(|(addr, &value)| (addr as u16, value))
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("non_zero_cells", &self.nonzero().count())
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur while placing data in memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Program does not fit between its origin and the top of memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
