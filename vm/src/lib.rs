//! Paging engine: processes with 64-entry page tables sharing a fixed pool of
//! physical frames, driven one trace instruction at a time.

pub mod cost;
pub mod error;
pub mod frame;
pub mod mmu;
pub mod page_replacer;
pub mod page_table;
pub mod process;
pub mod random;

pub use error::{Result, VmError};
pub use mmu::{Instruction, Mmu, MmuConfig, MmuEvent};
