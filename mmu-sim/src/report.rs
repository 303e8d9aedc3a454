use std::{
    fmt::Write as _,
    io::{self, Write},
    str::FromStr,
};

use vm::{
    cost::{CostModel, RunTotals},
    frame::FrameTable,
    process::Process,
    Instruction, Mmu, MmuEvent,
};

use crate::error::SimError;

/// Which sections of the report are printed, selected with `-o OPFS`.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct OutputOptions {
    pub trace: bool,
    pub page_tables: bool,
    pub frame_table: bool,
    pub summary: bool,
}

impl FromStr for OutputOptions {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, SimError> {
        let mut options = OutputOptions::default();

        for option in s.chars() {
            match option {
                'O' => options.trace = true,
                'P' => options.page_tables = true,
                'F' => options.frame_table = true,
                'S' => options.summary = true,
                other => return Err(SimError::OutputOption(other)),
            }
        }

        Ok(options)
    }
}

pub fn instruction_line(index: u64, instruction: &Instruction, current: Option<usize>) -> String {
    // exits name the process they terminate
    let operand = instruction.operand().or(current).unwrap_or_default();

    format!("{}: ==> {} {}", index, instruction.code(), operand)
}

pub fn event_line(event: &MmuEvent) -> String {
    match event {
        MmuEvent::Exit { pid } => format!("EXIT current process {}", pid),
        MmuEvent::Unmap { pid, page_number } => format!(" UNMAP {}:{}", pid, page_number),
        MmuEvent::Out => " OUT".to_string(),
        MmuEvent::FileOut => " FOUT".to_string(),
        MmuEvent::In => " IN".to_string(),
        MmuEvent::FileIn => " FIN".to_string(),
        MmuEvent::Zero => " ZERO".to_string(),
        MmuEvent::Map { frame_index } => format!(" MAP {}", frame_index),
        MmuEvent::SegmentationViolation => " SEGV".to_string(),
        MmuEvent::ProtectionViolation => " SEGPROT".to_string(),
    }
}

pub fn page_table_line(process: &Process) -> String {
    let mut line = format!("PT[{}]:", process.pid());

    for (page_number, entry) in process.page_table().entries().iter().enumerate() {
        if entry.present {
            let _ = write!(
                line,
                " {}:{}{}{}",
                page_number,
                if entry.referenced { 'R' } else { '-' },
                if entry.modified { 'M' } else { '-' },
                if entry.pageout { 'S' } else { '-' },
            );
        } else if entry.pageout {
            line.push_str(" #");
        } else {
            line.push_str(" *");
        }
    }

    line
}

pub fn frame_table_line(frames: &FrameTable) -> String {
    let mut line = String::from("FT:");

    for frame in frames.frames() {
        match frame.owner {
            Some(owner) => {
                let _ = write!(line, " {}:{}", owner.pid, owner.page_number);
            }
            None => line.push_str(" *"),
        }
    }

    line
}

pub fn summary_line(process: &Process) -> String {
    let stats = process.stats();

    format!(
        "PROC[{}]: U={} M={} I={} O={} FI={} FO={} Z={} SV={} SP={}",
        process.pid(),
        stats.unmaps,
        stats.maps,
        stats.ins,
        stats.outs,
        stats.fins,
        stats.fouts,
        stats.zeros,
        stats.segv,
        stats.segprot
    )
}

pub fn totals_line(totals: &RunTotals) -> String {
    format!(
        "TOTALCOST {} {} {} {}",
        totals.instructions, totals.context_switches, totals.process_exits, totals.cost
    )
}

/// Writes the end-of-run sections enabled in `options`.
pub fn write_final<W: Write>(out: &mut W, mmu: &Mmu, options: &OutputOptions) -> io::Result<()> {
    if options.page_tables {
        for process in mmu.processes() {
            writeln!(out, "{}", page_table_line(process))?;
        }
    }

    if options.frame_table {
        writeln!(out, "{}", frame_table_line(mmu.frames()))?;
    }

    if options.summary {
        for process in mmu.processes() {
            writeln!(out, "{}", summary_line(process))?;
        }

        writeln!(out, "{}", totals_line(&mmu.totals(&CostModel::default())))?;
    }

    Ok(())
}
