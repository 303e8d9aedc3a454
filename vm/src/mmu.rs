use log::{debug, info};

use crate::{
    cost::{CostModel, RunTotals},
    error::{Result, VmError},
    frame::{FrameOwner, FrameTable, MAX_FRAMES},
    page_replacer::{PageReplacer, PolicyKind, DEFAULT_ROUND},
    page_table::PAGE_TABLE_SIZE,
    process::Process,
    random::RandomSource,
};

/// One line of the instruction trace.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    ContextSwitch(usize),
    Read(usize),
    Write(usize),
    Exit,
}

impl Instruction {
    pub fn code(&self) -> char {
        match self {
            Instruction::ContextSwitch(_) => 'c',
            Instruction::Read(_) => 'r',
            Instruction::Write(_) => 'w',
            Instruction::Exit => 'e',
        }
    }

    /// Process id for a context switch, page number for an access, nothing for an exit.
    pub fn operand(&self) -> Option<usize> {
        match *self {
            Instruction::ContextSwitch(pid) => Some(pid),
            Instruction::Read(page) | Instruction::Write(page) => Some(page),
            Instruction::Exit => None,
        }
    }
}

/// Observable side effects of executing an instruction, in the order they happened.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MmuEvent {
    Exit { pid: usize },
    Unmap { pid: usize, page_number: usize },
    Out,
    FileOut,
    In,
    FileIn,
    Zero,
    Map { frame_index: usize },
    SegmentationViolation,
    ProtectionViolation,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaultOutcome {
    Mapped(usize),
    SegmentationViolation,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MmuConfig {
    pub frame_count: usize,
    pub policy: PolicyKind,
    /// Instruction window for the NRU reset round and the working-set threshold.
    pub round: u64,
}

impl MmuConfig {
    pub fn new(frame_count: usize, policy: PolicyKind) -> Result<Self> {
        Self::with_round(frame_count, policy, DEFAULT_ROUND)
    }

    pub fn with_round(frame_count: usize, policy: PolicyKind, round: u64) -> Result<Self> {
        if frame_count == 0 || frame_count > MAX_FRAMES {
            return Err(VmError::InvalidFrameCount(frame_count));
        }

        if round == 0 {
            return Err(VmError::InvalidRound);
        }

        Ok(MmuConfig {
            frame_count,
            policy,
            round,
        })
    }
}

/// The whole simulation context: physical frames, processes and the replacement policy.
pub struct Mmu {
    frames: FrameTable,
    processes: Vec<Process>,
    replacer: PageReplacer,
    random: RandomSource,
    current: Option<usize>,
    clock: u64,
    context_switches: u64,
    process_exits: u64,
    events: Vec<MmuEvent>,
}

impl Mmu {
    pub fn new(config: MmuConfig, processes: Vec<Process>, random: RandomSource) -> Self {
        info!(
            "mmu: {} frames, {} processes, policy {:?}",
            config.frame_count,
            processes.len(),
            config.policy
        );

        Mmu {
            frames: FrameTable::new(config.frame_count),
            processes,
            replacer: PageReplacer::new(config.policy, config.frame_count, config.round),
            random,
            current: None,
            clock: 0,
            context_switches: 0,
            process_exits: 0,
            events: Vec::new(),
        }
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn replacer(&self) -> &PageReplacer {
        &self.replacer
    }

    pub fn current_process(&self) -> Option<usize> {
        self.current
    }

    /// Number of instructions executed so far.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn totals(&self, model: &CostModel) -> RunTotals {
        RunTotals::compute(
            model,
            self.clock,
            self.context_switches,
            self.process_exits,
            self.processes.iter().map(Process::stats),
        )
    }

    pub fn run<I>(&mut self, instructions: I) -> Result<()>
    where
        I: IntoIterator<Item = Instruction>,
    {
        for instruction in instructions {
            self.execute(instruction)?;
        }

        Ok(())
    }

    pub fn execute(&mut self, instruction: Instruction) -> Result<Vec<MmuEvent>> {
        let index = self.clock;
        self.clock += 1;

        match instruction {
            Instruction::ContextSwitch(pid) => self.context_switch(pid)?,
            Instruction::Exit => self.exit(index)?,
            Instruction::Read(page_number) => self.access(index, page_number, false)?,
            Instruction::Write(page_number) => self.access(index, page_number, true)?,
        }

        Ok(std::mem::take(&mut self.events))
    }

    fn context_switch(&mut self, pid: usize) -> Result<()> {
        if pid >= self.processes.len() {
            return Err(VmError::UnknownProcess(pid));
        }

        self.context_switches += 1;
        self.current = Some(pid);

        Ok(())
    }

    fn exit(&mut self, index: u64) -> Result<()> {
        let pid = self.current.take().ok_or(VmError::NoCurrentProcess(index))?;
        let process = self
            .processes
            .get_mut(pid)
            .ok_or(VmError::UnknownProcess(pid))?;

        debug!("mmu: process {} exits", pid);

        self.process_exits += 1;
        self.events.push(MmuEvent::Exit { pid });

        for page_number in 0..PAGE_TABLE_SIZE {
            let Some(entry) = process.page_table.get_mut(page_number) else {
                continue;
            };

            if entry.present {
                process.stats.unmaps += 1;
                self.events.push(MmuEvent::Unmap { pid, page_number });

                // swap-backed pages are simply dropped
                if entry.modified && entry.file_mapped {
                    process.stats.fouts += 1;
                    self.events.push(MmuEvent::FileOut);
                }

                self.frames.release(entry.frame_index);
            }

            process.page_table.clear(page_number);
        }

        Ok(())
    }

    fn access(&mut self, index: u64, page_number: usize, write: bool) -> Result<()> {
        let pid = self.current.ok_or(VmError::NoCurrentProcess(index))?;

        if page_number >= PAGE_TABLE_SIZE {
            return Err(VmError::PageOutOfRange(page_number));
        }

        let present = self.processes[pid]
            .page_table()
            .get(page_number)
            .is_some_and(|entry| entry.present);

        if !present {
            debug!("mmu: page fault pid={} page={}", pid, page_number);

            if self.handle_page_fault(pid, page_number)? == FaultOutcome::SegmentationViolation {
                return Ok(());
            }
        }

        let process = &mut self.processes[pid];
        let entry = process
            .page_table
            .get_mut(page_number)
            .ok_or(VmError::PageOutOfRange(page_number))?;

        entry.referenced = true;

        if write {
            if entry.write_protected {
                process.stats.segprot += 1;
                self.events.push(MmuEvent::ProtectionViolation);
            } else {
                entry.modified = true;
            }
        }

        Ok(())
    }

    /// Validates the access against the process VMAs, finds a frame and maps the page into it.
    pub fn handle_page_fault(&mut self, pid: usize, page_number: usize) -> Result<FaultOutcome> {
        let process = self
            .processes
            .get_mut(pid)
            .ok_or(VmError::UnknownProcess(pid))?;

        let Some(vma) = process.find_vma(page_number).copied() else {
            debug!("mmu: pid={} page={} outside every vma", pid, page_number);
            process.stats.segv += 1;
            self.events.push(MmuEvent::SegmentationViolation);
            return Ok(FaultOutcome::SegmentationViolation);
        };

        let entry = process
            .entry_mut(page_number)
            .ok_or(VmError::PageOutOfRange(page_number))?;
        entry.file_mapped = vma.file_mapped;
        entry.write_protected = vma.write_protected;
        entry.page_number = page_number;

        let frame_index = self.get_frame()?;
        self.frames.assign(frame_index, FrameOwner { pid, page_number });

        let process = &mut self.processes[pid];
        let entry = process
            .page_table
            .get_mut(page_number)
            .ok_or(VmError::PageOutOfRange(page_number))?;

        if entry.pageout {
            process.stats.ins += 1;
            self.events.push(MmuEvent::In);
        } else if entry.file_mapped {
            process.stats.fins += 1;
            self.events.push(MmuEvent::FileIn);
        } else {
            process.stats.zeros += 1;
            self.events.push(MmuEvent::Zero);
        }

        entry.modified = false;
        entry.referenced = false;
        entry.frame_index = frame_index;
        entry.present = true;

        process.stats.maps += 1;
        self.events.push(MmuEvent::Map { frame_index });

        Ok(FaultOutcome::Mapped(frame_index))
    }

    fn get_frame(&mut self) -> Result<usize> {
        let frame_index = match self.frames.acquire_free_frame() {
            Some(free_index) => free_index,
            None => {
                let victim = self.replacer.select_victim_frame(
                    &mut self.frames,
                    &mut self.processes,
                    self.clock,
                    &mut self.random,
                )?;

                self.evict(victim)?;

                victim
            }
        };

        self.frames.recycle(frame_index, self.clock.saturating_sub(1));

        Ok(frame_index)
    }

    fn evict(&mut self, frame_index: usize) -> Result<()> {
        let FrameOwner { pid, page_number } = self.frames[frame_index]
            .owner
            .ok_or(VmError::FrameNotResident(frame_index))?;

        let process = self
            .processes
            .get_mut(pid)
            .ok_or(VmError::FrameNotResident(frame_index))?;
        let entry = process
            .page_table
            .get_mut(page_number)
            .ok_or(VmError::FrameNotResident(frame_index))?;

        debug!("mmu: evicting pid={} page={} from frame {}", pid, page_number, frame_index);

        entry.present = false;
        process.stats.unmaps += 1;
        self.events.push(MmuEvent::Unmap { pid, page_number });

        if entry.modified {
            if entry.file_mapped {
                process.stats.fouts += 1;
                self.events.push(MmuEvent::FileOut);
            } else {
                entry.pageout = true;
                process.stats.outs += 1;
                self.events.push(MmuEvent::Out);
            }
        }

        Ok(())
    }

    /// Every frame is either free or backs exactly one present page that points back at it.
    pub fn frames_conserved(&self) -> bool {
        let owned_correctly = (0..self.frames.len()).all(|frame_index| {
            let frame = &self.frames[frame_index];

            match frame.owner {
                Some(FrameOwner { pid, page_number }) => {
                    !self.frames.is_free(frame_index)
                        && self
                            .processes
                            .get(pid)
                            .and_then(|process| process.page_table().get(page_number))
                            .is_some_and(|entry| entry.present && entry.frame_index == frame_index)
                }
                None => self.frames.is_free(frame_index),
            }
        });

        let present: usize = self
            .processes
            .iter()
            .map(|process| process.page_table().present_pages().count())
            .sum();

        owned_correctly && present + self.frames.free_count() == self.frames.len()
    }
}
