//! Diagnostics: state dumps and a disassembler.
//!
//! This module provides:
//! - Listings of nonzero memory and of all registers (text or JSON)
//! - A disassembler used to annotate the memory listing

pub mod disasm;
pub mod dump;

pub use disasm::{disassemble, disassemble_instruction};
pub use dump::{write_dump, DumpFormat, DumpStage, Snapshot};
