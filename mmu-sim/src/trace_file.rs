//! Trace file reader.
//!
//! Blank lines and lines starting with `#` are skipped everywhere. The file
//! starts with the process count; each process then lists its VMA count
//! followed by one `start end write_protected file_mapped` line per VMA.
//! Every remaining line is an instruction `<op> <operand>` where `op` is one
//! of `c`, `r`, `w` or `e`.

use std::{fs, path::Path, str::FromStr};

use log::debug;
use vm::{
    page_table::{Vma, PAGE_TABLE_SIZE},
    process::Process,
    Instruction,
};

use crate::error::{Result, SimError};

#[derive(Debug)]
pub struct Trace {
    pub processes: Vec<Process>,
    pub instructions: Vec<Instruction>,
}

struct Lines<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    last_line: usize,
}

impl<'a> Lines<'a> {
    fn new(input: &'a str) -> Self {
        let inner = input
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        Lines {
            inner: Box::new(inner),
            last_line: 0,
        }
    }

    fn next(&mut self) -> Option<(usize, &'a str)> {
        let next = self.inner.next();
        if let Some((line, _)) = next {
            self.last_line = line;
        }
        next
    }

    fn require(&mut self, what: &str) -> Result<(usize, &'a str)> {
        self.next().ok_or_else(|| SimError::Trace {
            line: self.last_line,
            message: format!("unexpected end of file, expected {}", what),
        })
    }
}

fn error(line: usize, message: impl Into<String>) -> SimError {
    SimError::Trace {
        line,
        message: message.into(),
    }
}

fn number<T: FromStr>(line: usize, token: Option<&str>, what: &str) -> Result<T> {
    let token = token.ok_or_else(|| error(line, format!("missing {}", what)))?;

    token
        .parse()
        .map_err(|_| error(line, format!("invalid {} '{}'", what, token)))
}

fn flag(line: usize, token: Option<&str>, what: &str) -> Result<bool> {
    match number::<u8>(line, token, what)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(error(line, format!("{} must be 0 or 1, got {}", what, other))),
    }
}

fn parse_vma(line: usize, text: &str) -> Result<Vma> {
    let mut tokens = text.split_whitespace();

    let start_page: usize = number(line, tokens.next(), "start page")?;
    let end_page: usize = number(line, tokens.next(), "end page")?;
    let write_protected = flag(line, tokens.next(), "write_protected")?;
    let file_mapped = flag(line, tokens.next(), "file_mapped")?;

    if start_page > end_page {
        return Err(error(line, format!("vma start {} after end {}", start_page, end_page)));
    }

    if end_page >= PAGE_TABLE_SIZE {
        return Err(error(line, format!("vma end {} beyond page {}", end_page, PAGE_TABLE_SIZE - 1)));
    }

    Ok(Vma::new(start_page, end_page, write_protected, file_mapped))
}

fn parse_instruction(line: usize, text: &str, process_count: usize) -> Result<Instruction> {
    let mut tokens = text.split_whitespace();
    let op = tokens.next().unwrap_or_default();

    let instruction = match op {
        "c" => {
            let pid = number(line, tokens.next(), "process id")?;
            if pid >= process_count {
                return Err(error(line, format!("no process {}", pid)));
            }
            Instruction::ContextSwitch(pid)
        }
        "r" | "w" => {
            let page: usize = number(line, tokens.next(), "page number")?;
            if page >= PAGE_TABLE_SIZE {
                return Err(error(line, format!("page {} out of range", page)));
            }
            if op == "r" {
                Instruction::Read(page)
            } else {
                Instruction::Write(page)
            }
        }
        "e" => Instruction::Exit,
        other => return Err(error(line, format!("unknown instruction '{}'", other))),
    };

    Ok(instruction)
}

pub fn parse(input: &str) -> Result<Trace> {
    let mut lines = Lines::new(input);

    let (line, text) = lines.require("process count")?;
    let process_count: usize = number(line, text.split_whitespace().next(), "process count")?;

    let mut processes = Vec::with_capacity(process_count);

    for pid in 0..process_count {
        let (line, text) = lines.require("vma count")?;
        let vma_count: usize = number(line, text.split_whitespace().next(), "vma count")?;

        let mut vmas: Vec<Vma> = Vec::with_capacity(vma_count);
        for _ in 0..vma_count {
            let (line, text) = lines.require("vma")?;
            let vma = parse_vma(line, text)?;

            if let Some(other) = vmas.iter().find(|other| other.overlaps(&vma)) {
                return Err(error(
                    line,
                    format!(
                        "vma {}..={} overlaps {}..={} of process {}",
                        vma.start_page, vma.end_page, other.start_page, other.end_page, pid
                    ),
                ));
            }

            vmas.push(vma);
        }

        debug!("trace: process {} with {} vmas", pid, vmas.len());
        processes.push(Process::new(pid, vmas));
    }

    let mut instructions = Vec::new();
    while let Some((line, text)) = lines.next() {
        instructions.push(parse_instruction(line, text, process_count)?);
    }

    debug!("trace: {} instructions", instructions.len());

    Ok(Trace {
        processes,
        instructions,
    })
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<Trace> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).map_err(|source| SimError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&input)
}
