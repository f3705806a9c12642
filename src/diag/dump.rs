//! Memory and register listings.
//!
//! The runner shows machine state at two points: right after the image is
//! loaded (memory only) and once execution ends (memory and registers).
//! Execution ends either at HALT or when a step limit cuts the run short.

use crate::cpu::{Cpu, Memory, Registers};
use crate::diag::disasm::disassemble_instruction;
use serde::Serialize;
use std::io::{self, Write};

/// Output format for a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DumpFormat {
    /// Human-readable listing.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// No dump at all.
    None,
}

/// When a dump is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpStage {
    AfterLoad,
    AfterHalt,
    /// The step limit was reached before HALT.
    Stopped,
}

impl DumpStage {
    fn memory_title(self) -> &'static str {
        match self {
            DumpStage::AfterLoad => "Occupied memory after program load:",
            DumpStage::AfterHalt => "Occupied memory after program execution:",
            DumpStage::Stopped => "Occupied memory when the step limit was reached:",
        }
    }

    fn registers_title(self) -> &'static str {
        match self {
            DumpStage::Stopped => "Registers when the step limit was reached:",
            _ => "Registers after program execution:",
        }
    }

    fn includes_registers(self) -> bool {
        self != DumpStage::AfterLoad
    }

    /// The closing stage for a machine that has finished running.
    pub fn after_run(cpu: &Cpu) -> Self {
        if cpu.is_halted() {
            DumpStage::AfterHalt
        } else {
            DumpStage::Stopped
        }
    }
}

/// A nonzero memory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub address: u16,
    pub value: u16,
}

/// Serializable view of the machine at one dump point.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub stage: DumpStage,
    pub cycles: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registers: Option<&'a Registers>,
    pub memory: Vec<Cell>,
}

impl<'a> Snapshot<'a> {
    pub fn capture(cpu: &'a Cpu, stage: DumpStage) -> Self {
        Self {
            stage,
            cycles: cpu.cycles,
            registers: stage.includes_registers().then_some(&cpu.regs),
            memory: cpu
                .mem
                .nonzero()
                .map(|(address, value)| Cell { address, value })
                .collect(),
        }
    }
}

/// Write a dump of `cpu` in the requested format.
pub fn write_dump<W: Write>(out: &mut W, cpu: &Cpu, stage: DumpStage, format: DumpFormat) -> io::Result<()> {
    match format {
        DumpFormat::None => Ok(()),
        DumpFormat::Json => {
            let snapshot = Snapshot::capture(cpu, stage);
            serde_json::to_writer_pretty(&mut *out, &snapshot)?;
            writeln!(out)
        }
        DumpFormat::Text => {
            write_section(out, stage.memory_title())?;
            write_memory(out, &cpu.mem)?;
            if stage.includes_registers() {
                write_section(out, stage.registers_title())?;
                write_registers(out, &cpu.regs)?;
            }
            Ok(())
        }
    }
}

fn write_section<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    let rule = "-".repeat(title.len());
    writeln!(out, "{}", rule)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", rule)
}

/// List every nonzero cell with its disassembly.
pub fn write_memory<W: Write>(out: &mut W, mem: &Memory) -> io::Result<()> {
    for (addr, value) in mem.nonzero() {
        writeln!(out, "x{:04X}: x{:04X}  {}", addr, value, disassemble_instruction(value))?;
    }
    Ok(())
}

/// List all registers, one per line. Words are shown in hex and as signed
/// decimal; COND is shown as its flag letter.
pub fn write_registers<W: Write>(out: &mut W, regs: &Registers) -> io::Result<()> {
    let words = regs.r.iter().chain(std::iter::once(&regs.pc));
    for (name, &value) in Registers::NAMES.iter().zip(words) {
        writeln!(out, "{:<6}x{:04X}  ({})", format!("{}:", name), value, value as i16)?;
    }
    writeln!(out, "{}: {}", Registers::NAMES[Registers::COUNT - 1], regs.cond.letter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use crate::cpu::{CondFlag, PC_START};

    fn sample_cpu() -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0x5020, 0xF025]).unwrap();
        cpu.regs.set(0, 0xFFFB);
        cpu.regs.cond = CondFlag::Negative;
        cpu
    }

    fn render(cpu: &Cpu, stage: DumpStage, format: DumpFormat) -> String {
        let mut out = Vec::new();
        write_dump(&mut out, cpu, stage, format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_memory_listing() {
        let text = render(&sample_cpu(), DumpStage::AfterLoad, DumpFormat::Text);

        assert!(text.contains("Occupied memory after program load:"));
        assert!(text.contains("x3000: x5020  AND R0, R0, #0"));
        assert!(text.contains("x3001: xF025  HALT"));
        assert!(!text.contains("Registers"));
    }

    #[test]
    fn test_register_listing_after_halt() {
        let text = render(&sample_cpu(), DumpStage::AfterHalt, DumpFormat::Text);

        assert!(text.contains("Occupied memory after program execution:"));
        assert!(text.contains("R0:   xFFFB  (-5)"));
        assert!(text.contains("R7:   x0000  (0)"));
        assert!(text.contains(&format!("PC:   x{:04X}  ({})", PC_START, PC_START)));
        assert!(text.contains("COND: N"));
    }

    #[test]
    fn test_register_listing_shows_every_register_signed() {
        let mut regs = Registers::new();
        regs.set(3, 0x8000);
        regs.pc = 0xFFFE;
        let mut out = Vec::new();
        write_registers(&mut out, &regs).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), Registers::COUNT);
        assert_eq!(lines[3], "R3:   x8000  (-32768)");
        assert_eq!(lines[8], "PC:   xFFFE  (-2)");
        assert_eq!(lines[9], "COND: Z");
    }

    #[test]
    fn test_stopped_stage_is_labelled_as_such() {
        let mut cpu = Cpu::new();
        // BRnzp #-1
        cpu.load_program(&[0x0FFF]).unwrap();
        cpu.run_limited(&mut BufferConsole::default(), 3).unwrap();
        let stage = DumpStage::after_run(&cpu);
        assert_eq!(stage, DumpStage::Stopped);

        let text = render(&cpu, stage, DumpFormat::Text);
        assert!(text.contains("Occupied memory when the step limit was reached:"));
        assert!(text.contains("Registers when the step limit was reached:"));
        assert!(!text.contains("after program execution"));

        let json: serde_json::Value = serde_json::from_str(&render(&cpu, stage, DumpFormat::Json)).unwrap();
        assert_eq!(json["stage"], "stopped");
        assert_eq!(json["cycles"], 3);
        assert!(json.get("registers").is_some());
    }

    #[test]
    fn test_halted_machine_uses_after_halt_stage() {
        let mut cpu = sample_cpu();
        cpu.run(&mut BufferConsole::default()).unwrap();
        assert_eq!(DumpStage::after_run(&cpu), DumpStage::AfterHalt);
    }

    #[test]
    fn test_json_dump() {
        let text = render(&sample_cpu(), DumpStage::AfterHalt, DumpFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["stage"], "after_halt");
        assert_eq!(value["registers"]["r"][0], 0xFFFB);
        assert_eq!(value["registers"]["cond"], "Negative");
        assert_eq!(value["memory"][0]["address"], 0x3000);
        assert_eq!(value["memory"][1]["value"], 0xF025);
    }

    #[test]
    fn test_json_dump_after_load_omits_registers() {
        let text = render(&sample_cpu(), DumpStage::AfterLoad, DumpFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert!(value.get("registers").is_none());
    }

    #[test]
    fn test_none_writes_nothing() {
        assert!(render(&sample_cpu(), DumpStage::AfterHalt, DumpFormat::None).is_empty());
    }
}
