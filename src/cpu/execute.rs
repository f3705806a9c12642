//! CPU execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::console::Console;
use crate::cpu::{Memory, Registers};
use crate::cpu::decode::{self, Instruction, JsrTarget, Operand};
use crate::cpu::memory::MemoryError;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Address programs are loaded at and execution starts from.
pub const PC_START: u16 = 0x3000;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed the HALT trap).
    Halted,
}

/// The machine: registers, memory and run state.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Retired instruction count.
    pub cycles: u64,
}

impl Cpu {
    /// Create a new CPU with zeroed memory and PC at [`PC_START`].
    pub fn new() -> Self {
        let mut regs = Registers::new();
        regs.pc = PC_START;
        Self {
            regs,
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.regs.pc = PC_START;
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
    }

    /// Load a program into memory at [`PC_START`].
    pub fn load_program(&mut self, program: &[u16]) -> Result<(), MemoryError> {
        self.mem.load_program(PC_START, program)?;
        debug!(words = program.len(), origin = PC_START, "program loaded");
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error.
    pub fn step<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch, then advance PC before execute (jumps and branches override)
        let pc = self.regs.advance_pc();
        let word = self.mem.read(pc);

        let instr = decode::decode(word);
        trace!(pc, word, ?instr, "execute");

        self.execute(instr, console)?;
        self.cycles += 1;

        Ok(instr)
    }

    /// Run until halt.
    ///
    /// There is no other exit: a program that never halts runs forever.
    /// Returns the number of instructions executed.
    pub fn run<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(console)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited<C: Console + ?Sized>(
        &mut self,
        console: &mut C,
        max_cycles: u64,
    ) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(console)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    fn execute<C: Console + ?Sized>(&mut self, instr: Instruction, console: &mut C) -> Result<(), CpuError> {
        match instr {
            // ==================== Operate ====================

            Instruction::Add { dr, sr1, operand } => {
                let value = self.regs.get(sr1).wrapping_add(self.operand_value(operand));
                self.regs.set_with_flags(dr, value);
            }

            Instruction::And { dr, sr1, operand } => {
                let value = self.regs.get(sr1) & self.operand_value(operand);
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Not { dr, sr } => {
                let value = !self.regs.get(sr);
                self.regs.set_with_flags(dr, value);
            }

            // ==================== Data Movement ====================

            Instruction::Ld { dr, offset } => {
                let value = self.mem.read(self.regs.pc_relative(offset));
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Ldi { dr, offset } => {
                let pointer = self.mem.read(self.regs.pc_relative(offset));
                let value = self.mem.read(pointer);
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Ldr { dr, base, offset } => {
                let addr = self.regs.get(base).wrapping_add_signed(offset);
                let value = self.mem.read(addr);
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Lea { dr, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.regs.set_with_flags(dr, addr);
            }

            Instruction::St { sr, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.mem.write(addr, self.regs.get(sr));
            }

            Instruction::Sti { sr, offset } => {
                let addr = self.mem.read(self.regs.pc_relative(offset));
                self.mem.write(addr, self.regs.get(sr));
            }

            Instruction::Str { sr, base, offset } => {
                let addr = self.regs.get(base).wrapping_add_signed(offset);
                self.mem.write(addr, self.regs.get(sr));
            }

            // ==================== Control Flow ====================

            Instruction::Br { mask, offset } => {
                if self.regs.cond.bits() & u16::from(mask) != 0 {
                    let target = self.regs.pc_relative(offset);
                    self.regs.jump(target);
                }
            }

            Instruction::Jmp { base } => {
                let target = self.regs.get(base);
                self.regs.jump(target);
            }

            Instruction::Jsr { target } => {
                // Resolve the target first so JSRR R7 uses the old R7
                let target = match target {
                    JsrTarget::Offset(offset) => self.regs.pc_relative(offset),
                    JsrTarget::Register(base) => self.regs.get(base),
                };
                self.regs.set(7, self.regs.pc);
                self.regs.jump(target);
            }

            Instruction::Trap { vector } => {
                self.trap(vector, console)?;
            }

            // ==================== Reserved ====================

            Instruction::Rti | Instruction::Res => {
                debug!(pc = self.regs.pc.wrapping_sub(1), ?instr, "reserved opcode ignored");
            }
        }

        Ok(())
    }

    fn operand_value(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Register(sr2) => self.regs.get(sr2),
            Operand::Immediate(imm) => imm as u16,
        }
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}
