//! CPU emulation.
//!
//! This module implements the complete machine:
//! - 65536 sixteen-bit memory cells
//! - 10 registers: R0..R7, PC, COND
//! - 16 opcodes, with TRAP dispatching to six character I/O routines

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod trap;

pub use memory::{Memory, MemoryError};
pub use registers::{CondFlag, Registers};
pub use decode::{decode, encode, Instruction, JsrTarget, Opcode, Operand};
pub use execute::{Cpu, CpuError, CpuState, PC_START};
pub use trap::TrapVector;
