//! # LC-3 Virtual Machine
//!
//! An emulator for a 16-bit register machine: eight general purpose
//! registers, condition flags, a 16-bit address space and a small trap
//! table for character I/O.
//!
//! A program image is copied to `0x3000` and run until it executes the
//! HALT trap.

pub mod cpu;
pub mod console;
pub mod image;
pub mod diag;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, CondFlag, Instruction, PC_START};
pub use console::{Console, StdConsole, BufferConsole};
pub use image::{load_image, ImageError};
pub use diag::{disassemble, write_dump, DumpFormat, DumpStage};
