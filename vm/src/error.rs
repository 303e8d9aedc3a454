use thiserror::Error;

use crate::page_table::PAGE_TABLE_SIZE;

pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("invalid frame count {0}: expected 1..={}", crate::frame::MAX_FRAMES)]
    InvalidFrameCount(usize),

    #[error("unknown replacement policy '{0}': expected one of f, r, c, e, a, w")]
    UnknownPolicy(String),

    #[error("round length must be greater than zero")]
    InvalidRound,

    #[error("random number source exhausted after {0} values")]
    RandomExhausted(usize),

    #[error("context switch to unknown process {0}")]
    UnknownProcess(usize),

    #[error("instruction {0} issued with no current process")]
    NoCurrentProcess(u64),

    #[error("virtual page {0} out of range: expected 0..{}", PAGE_TABLE_SIZE)]
    PageOutOfRange(usize),

    #[error("frame {0} has no resident page")]
    FrameNotResident(usize),
}
