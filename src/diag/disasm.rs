//! Disassembler.
//!
//! Converts instruction words back to readable assembly.

use crate::cpu::decode::{decode, Instruction, JsrTarget, Operand};
use crate::cpu::trap::TrapVector;

/// Disassemble a single word to text.
pub fn disassemble_instruction(word: u16) -> String {
    format_instruction(&decode(word))
}

/// Disassemble a slice of words laid out from `origin`.
pub fn disassemble(origin: u16, words: &[u16]) -> String {
    let mut output = String::new();

    for (i, &word) in words.iter().enumerate() {
        let addr = origin.wrapping_add(i as u16);
        output.push_str(&format!("x{:04X}: {}  ; x{:04X}\n", addr, disassemble_instruction(word), word));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match instr {
        // Operate
        Instruction::Add { dr, sr1, operand } => format!("ADD R{}, R{}, {}", dr, sr1, format_operand(operand)),
        Instruction::And { dr, sr1, operand } => format!("AND R{}, R{}, {}", dr, sr1, format_operand(operand)),
        Instruction::Not { dr, sr } => format!("NOT R{}, R{}", dr, sr),

        // Data movement
        Instruction::Ld { dr, offset } => format!("LD R{}, #{}", dr, offset),
        Instruction::Ldi { dr, offset } => format!("LDI R{}, #{}", dr, offset),
        Instruction::Ldr { dr, base, offset } => format!("LDR R{}, R{}, #{}", dr, base, offset),
        Instruction::Lea { dr, offset } => format!("LEA R{}, #{}", dr, offset),
        Instruction::St { sr, offset } => format!("ST R{}, #{}", sr, offset),
        Instruction::Sti { sr, offset } => format!("STI R{}, #{}", sr, offset),
        Instruction::Str { sr, base, offset } => format!("STR R{}, R{}, #{}", sr, base, offset),

        // Control
        Instruction::Br { mask: 0, .. } => "NOP".to_string(),
        Instruction::Br { mask, offset } => format!("BR{} #{}", branch_suffix(*mask), offset),
        Instruction::Jmp { base: 7 } => "RET".to_string(),
        Instruction::Jmp { base } => format!("JMP R{}", base),
        Instruction::Jsr { target: JsrTarget::Offset(offset) } => format!("JSR #{}", offset),
        Instruction::Jsr { target: JsrTarget::Register(base) } => format!("JSRR R{}", base),
        Instruction::Trap { vector } => match TrapVector::from_vector(*vector) {
            Some(routine) => routine.name().to_string(),
            None => format!("TRAP x{:02X}", vector),
        },

        // Reserved
        Instruction::Rti => "RTI".to_string(),
        Instruction::Res => "RES".to_string(),
    }
}

fn format_operand(operand: &Operand) -> String {
    match operand {
        Operand::Register(r) => format!("R{}", r),
        Operand::Immediate(imm) => format!("#{}", imm),
    }
}

fn branch_suffix(mask: u8) -> String {
    [(0b100, 'n'), (0b010, 'z'), (0b001, 'p')]
        .iter()
        .filter(|(bit, _)| mask & bit != 0)
        .map(|&(_, letter)| letter)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;

    #[test]
    fn test_disassemble_halt() {
        assert_eq!(disassemble_instruction(0xF025), "HALT");
    }

    #[test]
    fn test_disassemble_unknown_trap() {
        assert_eq!(disassemble_instruction(0xF030), "TRAP x30");
    }

    #[test]
    fn test_disassemble_add() {
        assert_eq!(disassemble_instruction(0x107D), "ADD R0, R1, #-3");
        let add = encode(&Instruction::Add { dr: 2, sr1: 3, operand: Operand::Register(4) });
        assert_eq!(disassemble_instruction(add), "ADD R2, R3, R4");
    }

    #[test]
    fn test_disassemble_branches() {
        assert_eq!(disassemble_instruction(0x0DFE), "BRnz #-2");
        assert_eq!(disassemble_instruction(0x0FFF), "BRnzp #-1");
        assert_eq!(disassemble_instruction(0x0000), "NOP");
    }

    #[test]
    fn test_disassemble_control() {
        assert_eq!(disassemble_instruction(0xC1C0), "RET");
        assert_eq!(disassemble_instruction(0xC080), "JMP R2");
        assert_eq!(disassemble_instruction(0x4080), "JSRR R2");
        assert_eq!(disassemble_instruction(0x4FFF), "JSR #-1");
    }

    #[test]
    fn test_disassemble_listing() {
        let listing = disassemble(0x3000, &[0x5020, 0xF025]);
        assert_eq!(listing, "x3000: AND R0, R0, #0  ; x5020\nx3001: HALT  ; xF025\n");
    }
}
