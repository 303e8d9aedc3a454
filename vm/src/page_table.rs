/// Number of virtual pages in every process address space.
pub const PAGE_TABLE_SIZE: usize = 64;

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct PageTableEntry {
    pub present: bool,
    pub referenced: bool,
    pub modified: bool,
    pub write_protected: bool,
    /// The page was written to swap at some point and must be brought back with an IN.
    pub pageout: bool,
    pub file_mapped: bool,
    /// Only meaningful while `present` is set.
    pub frame_index: usize,
    pub page_number: usize,
}

/// A contiguous range of virtual pages sharing the same permissions and backing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Vma {
    pub start_page: usize,
    pub end_page: usize,
    pub write_protected: bool,
    pub file_mapped: bool,
}

impl Vma {
    pub fn new(start_page: usize, end_page: usize, write_protected: bool, file_mapped: bool) -> Self {
        Vma {
            start_page,
            end_page,
            write_protected,
            file_mapped,
        }
    }

    pub fn contains(&self, page_number: usize) -> bool {
        (self.start_page..=self.end_page).contains(&page_number)
    }

    pub fn overlaps(&self, other: &Vma) -> bool {
        self.start_page <= other.end_page && other.start_page <= self.end_page
    }
}

#[derive(Clone, Debug)]
pub struct PageTable<const ENTRIES: usize> {
    table: [PageTableEntry; ENTRIES],
}

impl<const ENTRIES: usize> PageTable<ENTRIES> {
    pub fn new() -> Self {
        PageTable {
            table: [PageTableEntry::default(); ENTRIES],
        }
    }

    pub fn get(&self, page_number: usize) -> Option<&PageTableEntry> {
        self.table.get(page_number)
    }

    pub fn get_mut(&mut self, page_number: usize) -> Option<&mut PageTableEntry> {
        self.table.get_mut(page_number)
    }

    pub fn entries(&self) -> &[PageTableEntry] {
        &self.table
    }

    /// Iterates over the page numbers currently backed by a frame.
    pub fn present_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.table
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.present)
            .map(|(page_number, _)| page_number)
    }

    pub fn clear(&mut self, page_number: usize) {
        if let Some(entry) = self.table.get_mut(page_number) {
            *entry = PageTableEntry::default();
        }
    }
}

impl<const ENTRIES: usize> Default for PageTable<ENTRIES> {
    fn default() -> Self {
        Self::new()
    }
}
