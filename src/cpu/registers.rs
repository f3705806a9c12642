//! Register file.
//!
//! - R0..R7: eight 16-bit general purpose registers
//! - PC: program counter, address of the next instruction
//! - COND: condition flags, exactly one of P, Z, N set

use serde::{Serialize, Deserialize};

/// Condition flag. The COND register always holds exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CondFlag {
    /// Last result was positive.
    Positive = 1 << 0,
    /// Last result was zero.
    Zero = 1 << 1,
    /// Last result was negative (high bit set).
    Negative = 1 << 2,
}

impl CondFlag {
    /// All flags in bit order: P, Z, N
    pub const ALL: [CondFlag; 3] = [CondFlag::Positive, CondFlag::Zero, CondFlag::Negative];

    /// Classify a word by its two's-complement sign.
    #[inline]
    pub const fn from_value(value: u16) -> Self {
        if value == 0 {
            CondFlag::Zero
        } else if value >> 15 == 1 {
            CondFlag::Negative
        } else {
            CondFlag::Positive
        }
    }

    /// The flag's bit within the 3-bit COND field.
    #[inline]
    pub const fn bits(self) -> u16 {
        self as u16
    }

    /// Single-letter name as used in branch mnemonics.
    pub const fn letter(self) -> char {
        match self {
            CondFlag::Positive => 'P',
            CondFlag::Zero => 'Z',
            CondFlag::Negative => 'N',
        }
    }
}

/// The register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0..R7
    pub r: [u16; 8],

    /// Program counter
    pub pc: u16,

    /// Condition flags.
    /// Set from the result of every flag-updating instruction:
    /// P if result > 0, Z if result = 0, N if result < 0
    pub cond: CondFlag,
}

impl Registers {
    /// Number of architectural registers: R0..R7, PC, COND.
    pub const COUNT: usize = 10;

    /// Register names in listing order.
    pub const NAMES: [&'static str; Self::COUNT] = ["R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7", "PC", "COND"];

    /// Create a register file with R0..R7 and PC zeroed and COND = Z.
    pub fn new() -> Self {
        Self {
            r: [0; 8],
            pc: 0,
            cond: CondFlag::Zero,
        }
    }

    /// Reset all registers.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general purpose register. Only the low 3 bits of `index` count.
    #[inline]
    pub fn get(&self, index: u8) -> u16 {
        self.r[usize::from(index & 0x7)]
    }

    /// Write a general purpose register. Only the low 3 bits of `index` count.
    #[inline]
    pub fn set(&mut self, index: u8, value: u16) {
        self.r[usize::from(index & 0x7)] = value;
    }

    /// Set COND from the value currently held in a register.
    pub fn update_flags(&mut self, index: u8) {
        self.cond = CondFlag::from_value(self.get(index));
    }

    /// Write a register and set COND from the written value.
    pub fn set_with_flags(&mut self, index: u8, value: u16) {
        self.set(index, value);
        self.update_flags(index);
    }

    /// Increment the program counter by 1, wrapping at the top of memory.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }

    /// PC plus a signed offset, wrapping.
    #[inline]
    pub fn pc_relative(&self, offset: i16) -> u16 {
        self.pc.wrapping_add_signed(offset)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_state() {
        let regs = Registers::new();
        assert_eq!(regs.r, [0; 8]);
        assert_eq!(regs.pc, 0);
        assert_eq!(regs.cond, CondFlag::Zero);
    }

    #[test]
    fn test_flag_bits() {
        assert_eq!(CondFlag::Positive.bits(), 0b001);
        assert_eq!(CondFlag::Zero.bits(), 0b010);
        assert_eq!(CondFlag::Negative.bits(), 0b100);
    }

    #[test]
    fn test_update_flags_from_value() {
        let mut regs = Registers::new();

        regs.set_with_flags(1, 100);
        assert_eq!(regs.cond, CondFlag::Positive);

        regs.set_with_flags(1, 0xFFFF);
        assert_eq!(regs.cond, CondFlag::Negative);

        regs.set_with_flags(1, 0);
        assert_eq!(regs.cond, CondFlag::Zero);

        regs.set_with_flags(2, 0x8000);
        assert_eq!(regs.cond, CondFlag::Negative);

        regs.set_with_flags(2, 0x7FFF);
        assert_eq!(regs.cond, CondFlag::Positive);
    }

    #[test]
    fn test_register_index_masked() {
        let mut regs = Registers::new();
        regs.set(9, 42);
        assert_eq!(regs.get(1), 42);
    }

    #[test]
    fn test_advance_pc() {
        let mut regs = Registers::new();
        regs.pc = 0x3000;

        let old = regs.advance_pc();
        assert_eq!(old, 0x3000);
        assert_eq!(regs.pc, 0x3001);

        regs.pc = 0xFFFF;
        regs.advance_pc();
        assert_eq!(regs.pc, 0);
    }

    #[test]
    fn test_pc_relative_wraps() {
        let mut regs = Registers::new();
        regs.pc = 0x0001;
        assert_eq!(regs.pc_relative(-2), 0xFFFF);
        regs.pc = 0xFFFF;
        assert_eq!(regs.pc_relative(1), 0x0000);
    }

    proptest! {
        #[test]
        fn property_exactly_one_flag_matches_sign(value in any::<u16>(), index in 0u8..8) {
            let mut regs = Registers::new();
            regs.set_with_flags(index, value);

            let set: Vec<_> = CondFlag::ALL
                .iter()
                .filter(|flag| regs.cond.bits() & flag.bits() != 0)
                .collect();
            prop_assert_eq!(set.len(), 1);

            let signed = value as i16;
            let expected = if signed == 0 {
                CondFlag::Zero
            } else if signed < 0 {
                CondFlag::Negative
            } else {
                CondFlag::Positive
            };
            prop_assert_eq!(regs.cond, expected);
        }
    }
}
