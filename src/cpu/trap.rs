//! Trap table: character I/O service routines invoked by `TRAP`.
//!
//! | vector | name  | effect                                          |
//! |--------|-------|-------------------------------------------------|
//! | x20    | GETC  | read one character into R0, no echo             |
//! | x21    | OUT   | write the low byte of R0                        |
//! | x22    | PUTS  | write one character per word from [R0] up to 0  |
//! | x23    | IN    | prompt, read one character, echo it, R0 := it   |
//! | x24    | PUTSP | write two packed characters per word up to 0    |
//! | x25    | HALT  | stop the execution loop                         |
//!
//! Trap handlers never touch the condition flags.

use crate::console::Console;
use crate::cpu::execute::{Cpu, CpuError, CpuState};
use crate::cpu::memory::MEMORY_SIZE;
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

/// First vector of the trap table.
pub const TRAP_VECTOR_BASE: u8 = 0x20;

/// Prompt written by the IN trap.
pub const IN_PROMPT: &str = "Enter a character: ";

/// Value stored in R0 when GETC or IN hit end of input.
pub const EOF_WORD: u16 = 0xFFFF;

/// The six service routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TrapVector {
    Getc = 0x20,
    Out = 0x21,
    Puts = 0x22,
    In = 0x23,
    Putsp = 0x24,
    Halt = 0x25,
}

impl TrapVector {
    /// All routines in table order.
    pub const ALL: [TrapVector; 6] = [
        TrapVector::Getc,
        TrapVector::Out,
        TrapVector::Puts,
        TrapVector::In,
        TrapVector::Putsp,
        TrapVector::Halt,
    ];

    /// Look up a vector. Anything outside the table yields `None`.
    pub fn from_vector(vector: u8) -> Option<Self> {
        let index = vector.checked_sub(TRAP_VECTOR_BASE)?;
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Assembler name of the routine.
    pub const fn name(self) -> &'static str {
        match self {
            TrapVector::Getc => "GETC",
            TrapVector::Out => "OUT",
            TrapVector::Puts => "PUTS",
            TrapVector::In => "IN",
            TrapVector::Putsp => "PUTSP",
            TrapVector::Halt => "HALT",
        }
    }
}

impl Cpu {
    /// Dispatch a `TRAP` instruction.
    pub(crate) fn trap<C: Console + ?Sized>(&mut self, vector: u8, console: &mut C) -> Result<(), CpuError> {
        let Some(routine) = TrapVector::from_vector(vector) else {
            warn!(vector, pc = self.regs.pc.wrapping_sub(1), "unknown trap vector ignored");
            return Ok(());
        };

        match routine {
            TrapVector::Getc => {
                console.flush()?;
                let value = read_char(console)?;
                self.regs.set(0, value);
            }

            TrapVector::Out => {
                console.write_byte(self.regs.get(0) as u8)?;
            }

            TrapVector::Puts => {
                for word in self.string_words() {
                    console.write_byte(word as u8)?;
                }
            }

            TrapVector::In => {
                console.write_bytes(IN_PROMPT.as_bytes())?;
                console.flush()?;
                let value = read_char(console)?;
                if value != EOF_WORD {
                    console.write_byte(value as u8)?;
                }
                self.regs.set(0, value);
            }

            TrapVector::Putsp => {
                for word in self.string_words() {
                    console.write_byte((word & 0xFF) as u8)?;
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        console.write_byte(high)?;
                    }
                }
                console.flush()?;
            }

            TrapVector::Halt => {
                self.state = CpuState::Halted;
                console.flush()?;
                debug!(pc = self.regs.pc.wrapping_sub(1), cycles = self.cycles + 1, "halted");
            }
        }

        Ok(())
    }

    /// Words of the string at R0, up to the first zero cell.
    ///
    /// Wraps at the top of memory and reads each cell at most once, so a
    /// memory with no zero cell yields exactly `MEMORY_SIZE` words.
    fn string_words(&self) -> impl Iterator<Item = u16> + '_ {
        let start = self.regs.get(0);
        (0..MEMORY_SIZE)
            .map(move |offset| self.mem.read(start.wrapping_add(offset as u16)))
            .take_while(|&word| word != 0)
    }
}

fn read_char<C: Console + ?Sized>(console: &mut C) -> Result<u16, CpuError> {
    Ok(console.read_byte()?.map_or(EOF_WORD, u16::from))
}
