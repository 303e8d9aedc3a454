use std::{
    collections::VecDeque,
    ops::{Index, IndexMut},
};

/// Upper bound on the number of physical frames a simulation may configure.
pub const MAX_FRAMES: usize = 128;

/// Index-based back-reference from a frame to the page table entry living in it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameOwner {
    pub pid: usize,
    pub page_number: usize,
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Frame {
    pub owner: Option<FrameOwner>,
    /// Aging shift register.
    pub age: u32,
    /// Instruction index of the last observed use, for the working-set policy.
    pub last_used: u64,
}

impl Frame {
    fn reset(&mut self, last_used: u64) {
        self.owner = None;
        self.age = 0;
        self.last_used = last_used;
    }
}

/// The physical frames plus the FIFO list of frames nobody owns.
#[derive(Clone, Debug)]
pub struct FrameTable {
    frames: Vec<Frame>,
    free_frames: VecDeque<usize>,
}

impl FrameTable {
    pub fn new(frame_count: usize) -> Self {
        let free_frames = (0..frame_count).collect();

        FrameTable {
            frames: vec![Frame::default(); frame_count],
            free_frames,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame_index: usize) -> Option<&Frame> {
        self.frames.get(frame_index)
    }

    pub fn get_mut(&mut self, frame_index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(frame_index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn free_count(&self) -> usize {
        self.free_frames.len()
    }

    pub fn is_free(&self, frame_index: usize) -> bool {
        self.free_frames.contains(&frame_index)
    }

    pub fn acquire_free_frame(&mut self) -> Option<usize> {
        self.free_frames.pop_front()
    }

    /// Clears a frame taken away from its owner so it can be handed to the faulting page.
    pub fn recycle(&mut self, frame_index: usize, now: u64) {
        if let Some(frame) = self.frames.get_mut(frame_index) {
            frame.reset(now);
        }
    }

    /// Returns a frame to the tail of the free list.
    pub fn release(&mut self, frame_index: usize) {
        if let Some(frame) = self.frames.get_mut(frame_index) {
            frame.reset(0);
            self.free_frames.push_back(frame_index);
        }
    }

    pub fn assign(&mut self, frame_index: usize, owner: FrameOwner) {
        if let Some(frame) = self.frames.get_mut(frame_index) {
            frame.owner = Some(owner);
        }
    }
}

impl Index<usize> for FrameTable {
    type Output = Frame;

    fn index(&self, frame_index: usize) -> &Frame {
        &self.frames[frame_index]
    }
}

impl IndexMut<usize> for FrameTable {
    fn index_mut(&mut self, frame_index: usize) -> &mut Frame {
        &mut self.frames[frame_index]
    }
}
