use crate::page_table::{PageTable, PageTableEntry, Vma, PAGE_TABLE_SIZE};

/// Per-process event counters, accumulated for the whole run.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct ProcessStats {
    pub unmaps: u64,
    pub maps: u64,
    pub ins: u64,
    pub outs: u64,
    pub fins: u64,
    pub fouts: u64,
    pub zeros: u64,
    pub segv: u64,
    pub segprot: u64,
}

#[derive(Clone, Debug)]
pub struct Process {
    pid: usize,
    vmas: Vec<Vma>,
    pub(crate) page_table: PageTable<PAGE_TABLE_SIZE>,
    pub(crate) stats: ProcessStats,
}

impl Process {
    pub fn new(pid: usize, vmas: Vec<Vma>) -> Self {
        Process {
            pid,
            vmas,
            page_table: PageTable::new(),
            stats: ProcessStats::default(),
        }
    }

    pub fn pid(&self) -> usize {
        self.pid
    }

    pub fn vmas(&self) -> &[Vma] {
        &self.vmas
    }

    pub fn page_table(&self) -> &PageTable<PAGE_TABLE_SIZE> {
        &self.page_table
    }

    pub fn stats(&self) -> &ProcessStats {
        &self.stats
    }

    /// First VMA covering `page_number`, if the page is legally addressable at all.
    pub fn find_vma(&self, page_number: usize) -> Option<&Vma> {
        self.vmas.iter().find(|vma| vma.contains(page_number))
    }

    pub(crate) fn entry_mut(&mut self, page_number: usize) -> Option<&mut PageTableEntry> {
        self.page_table.get_mut(page_number)
    }
}
