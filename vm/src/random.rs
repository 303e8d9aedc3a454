use crate::error::{Result, VmError};

/// Pre-loaded sequence of random numbers, consumed front to back and never rewound.
#[derive(Clone, Debug, Default)]
pub struct RandomSource {
    values: Vec<u64>,
    cursor: usize,
}

impl RandomSource {
    pub fn new(values: Vec<u64>) -> Self {
        RandomSource { values, cursor: 0 }
    }

    /// Draws the next value reduced modulo `bound`.
    pub fn next_below(&mut self, bound: usize) -> Result<usize> {
        let value = self
            .values
            .get(self.cursor)
            .copied()
            .ok_or(VmError::RandomExhausted(self.values.len()))?;

        self.cursor += 1;

        Ok((value % bound as u64) as usize)
    }

    pub fn consumed(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.values.len() - self.cursor
    }
}
