//! Victim selection for the six replacement policies.
//!
//! Every policy keeps its scan position (`hand`) between invocations, so a
//! frame that survived one scan gets a fair chance before it is looked at
//! again. The replacer is only consulted once the free list is empty, which
//! means every frame it scans has a resident page.

use std::str::FromStr;

use log::{debug, trace};

use crate::{
    error::{Result, VmError},
    frame::FrameTable,
    page_table::PageTableEntry,
    process::Process,
    random::RandomSource,
};

/// Default length, in instructions, of the NRU reset round and the working-set window.
pub const DEFAULT_ROUND: u64 = 50;

const AGE_MSB: u32 = 0x8000_0000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PolicyKind {
    Fifo,
    Random,
    Clock,
    Nru,
    Aging,
    WorkingSet,
}

impl PolicyKind {
    pub fn code(self) -> char {
        match self {
            PolicyKind::Fifo => 'f',
            PolicyKind::Random => 'r',
            PolicyKind::Clock => 'c',
            PolicyKind::Nru => 'e',
            PolicyKind::Aging => 'a',
            PolicyKind::WorkingSet => 'w',
        }
    }
}

impl TryFrom<char> for PolicyKind {
    type Error = VmError;

    fn try_from(code: char) -> Result<Self> {
        match code {
            'f' => Ok(PolicyKind::Fifo),
            'r' => Ok(PolicyKind::Random),
            'c' => Ok(PolicyKind::Clock),
            'e' => Ok(PolicyKind::Nru),
            'a' => Ok(PolicyKind::Aging),
            'w' => Ok(PolicyKind::WorkingSet),
            other => Err(VmError::UnknownPolicy(other.to_string())),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = VmError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();

        match (chars.next(), chars.next()) {
            (Some(code), None) => PolicyKind::try_from(code),
            _ => Err(VmError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Scan state owned by a single policy variant.
#[derive(Copy, Clone, Debug)]
enum Policy {
    Fifo,
    Random,
    Clock,
    Nru { last_reset: u64 },
    Aging,
    WorkingSet,
}

#[derive(Clone, Debug)]
pub struct PageReplacer {
    policy: Policy,
    hand: usize,
    frame_count: usize,
    round: u64,
}

fn resident_entry<'p>(
    frames: &FrameTable,
    processes: &'p mut [Process],
    frame_index: usize,
) -> Result<&'p mut PageTableEntry> {
    let owner = frames[frame_index]
        .owner
        .ok_or(VmError::FrameNotResident(frame_index))?;

    processes
        .get_mut(owner.pid)
        .and_then(|process| process.entry_mut(owner.page_number))
        .ok_or(VmError::FrameNotResident(frame_index))
}

impl PageReplacer {
    pub fn new(kind: PolicyKind, frame_count: usize, round: u64) -> Self {
        let policy = match kind {
            PolicyKind::Fifo => Policy::Fifo,
            PolicyKind::Random => Policy::Random,
            PolicyKind::Clock => Policy::Clock,
            PolicyKind::Nru => Policy::Nru { last_reset: 0 },
            PolicyKind::Aging => Policy::Aging,
            PolicyKind::WorkingSet => Policy::WorkingSet,
        };

        PageReplacer {
            policy,
            hand: 0,
            frame_count,
            round,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self.policy {
            Policy::Fifo => PolicyKind::Fifo,
            Policy::Random => PolicyKind::Random,
            Policy::Clock => PolicyKind::Clock,
            Policy::Nru { .. } => PolicyKind::Nru,
            Policy::Aging => PolicyKind::Aging,
            Policy::WorkingSet => PolicyKind::WorkingSet,
        }
    }

    pub fn hand(&self) -> usize {
        self.hand
    }

    /// Picks the frame to evict. `clock` is the number of instructions started so far,
    /// including the one currently faulting.
    pub fn select_victim_frame(
        &mut self,
        frames: &mut FrameTable,
        processes: &mut [Process],
        clock: u64,
        random: &mut RandomSource,
    ) -> Result<usize> {
        let victim = match self.policy {
            Policy::Fifo => self.select_fifo(),
            Policy::Random => random.next_below(self.frame_count)?,
            Policy::Clock => self.select_clock(frames, processes)?,
            Policy::Nru { last_reset } => {
                let (victim, last_reset) = self.select_nru(frames, processes, clock, last_reset)?;
                self.policy = Policy::Nru { last_reset };
                victim
            }
            Policy::Aging => self.select_aging(frames, processes)?,
            Policy::WorkingSet => self.select_working_set(frames, processes, clock)?,
        };

        debug!("{:?} picked frame {} (hand now {})", self.kind(), victim, self.hand);

        Ok(victim)
    }

    fn advance(&self, position: usize) -> usize {
        (position + 1) % self.frame_count
    }

    fn select_fifo(&mut self) -> usize {
        let victim = self.hand;
        self.hand = self.advance(self.hand);
        victim
    }

    fn select_clock(&mut self, frames: &FrameTable, processes: &mut [Process]) -> Result<usize> {
        loop {
            let candidate = self.hand;
            self.hand = self.advance(self.hand);

            let entry = resident_entry(frames, processes, candidate)?;
            if !entry.referenced {
                return Ok(candidate);
            }

            trace!("clock: frame {} referenced, second chance", candidate);
            entry.referenced = false;
        }
    }

    fn select_nru(
        &mut self,
        frames: &FrameTable,
        processes: &mut [Process],
        clock: u64,
        last_reset: u64,
    ) -> Result<(usize, u64)> {
        let reset_due = clock.saturating_sub(last_reset) >= self.round;
        let mut low_class = u8::MAX;
        let mut low_hand = self.hand;

        for _ in 0..self.frame_count {
            let candidate = self.hand;
            let entry = resident_entry(frames, processes, candidate)?;
            let class = 2 * entry.referenced as u8 + entry.modified as u8;

            trace!("nru: frame {} class {}", candidate, class);

            if class < low_class {
                low_class = class;
                low_hand = candidate;
            }

            self.hand = self.advance(self.hand);

            if reset_due {
                entry.referenced = false;
            } else if low_class == 0 {
                break;
            }
        }

        let last_reset = if reset_due {
            debug!("nru: referenced bits reset at instruction {}", clock);
            clock
        } else {
            last_reset
        };

        self.hand = self.advance(low_hand);

        Ok((low_hand, last_reset))
    }

    fn select_aging(&mut self, frames: &mut FrameTable, processes: &mut [Process]) -> Result<usize> {
        let mut low_age = u32::MAX;
        let mut low_hand = self.hand;

        for _ in 0..self.frame_count {
            let candidate = self.hand;
            let entry = resident_entry(frames, processes, candidate)?;
            let referenced = std::mem::take(&mut entry.referenced);

            let frame = &mut frames[candidate];
            frame.age >>= 1;
            if referenced {
                frame.age |= AGE_MSB;
            }

            trace!("aging: frame {} age {}", candidate, hex::encode(frame.age.to_be_bytes()));

            if frame.age < low_age {
                low_age = frame.age;
                low_hand = candidate;
            }

            self.hand = self.advance(self.hand);
        }

        self.hand = self.advance(low_hand);

        Ok(low_hand)
    }

    fn select_working_set(
        &mut self,
        frames: &mut FrameTable,
        processes: &mut [Process],
        clock: u64,
    ) -> Result<usize> {
        let now = clock.saturating_sub(1);
        let mut low_time = u64::MAX;
        let mut low_hand = self.hand;

        for _ in 0..self.frame_count {
            let candidate = self.hand;
            let entry = resident_entry(frames, processes, candidate)?;
            let frame = &mut frames[candidate];

            if entry.referenced {
                entry.referenced = false;
                frame.last_used = now;
            } else if now.saturating_sub(frame.last_used) >= self.round {
                trace!("working set: frame {} idle since {}", candidate, frame.last_used);
                low_hand = candidate;
                break;
            } else if frame.last_used < low_time {
                low_time = frame.last_used;
                low_hand = candidate;
            }

            self.hand = self.advance(self.hand);
        }

        self.hand = self.advance(low_hand);

        Ok(low_hand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::FrameOwner, page_table::Vma};

    /// One process whose page `i` sits in frame `i`, with the given (R, M) bits.
    fn resident(bits: &[(bool, bool)]) -> (FrameTable, Vec<Process>) {
        let mut frames = FrameTable::new(bits.len());
        let mut process = Process::new(0, vec![Vma::new(0, 63, false, false)]);

        for (page_number, &(referenced, modified)) in bits.iter().enumerate() {
            let frame_index = frames.acquire_free_frame().unwrap();
            frames.assign(frame_index, FrameOwner { pid: 0, page_number });

            let entry = process.entry_mut(page_number).unwrap();
            entry.present = true;
            entry.frame_index = frame_index;
            entry.referenced = referenced;
            entry.modified = modified;
        }

        (frames, vec![process])
    }

    fn referenced(processes: &[Process], page_number: usize) -> bool {
        processes[0].page_table().get(page_number).unwrap().referenced
    }

    fn set_referenced(processes: &mut [Process], page_number: usize) {
        processes[0].entry_mut(page_number).unwrap().referenced = true;
    }

    #[test]
    fn policy_codes_parse() {
        for code in ['f', 'r', 'c', 'e', 'a', 'w'] {
            assert_eq!(PolicyKind::try_from(code).unwrap().code(), code);
        }
        assert_eq!("w".parse::<PolicyKind>(), Ok(PolicyKind::WorkingSet));
        assert!("x".parse::<PolicyKind>().is_err());
        assert!("fc".parse::<PolicyKind>().is_err());
        assert!("".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn fifo_ignores_reference_bits() {
        let (mut frames, mut processes) = resident(&[(true, true), (false, false), (true, false)]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::Fifo, 3, DEFAULT_ROUND);

        let victims: Vec<_> = (0..5)
            .map(|_| {
                replacer
                    .select_victim_frame(&mut frames, &mut processes, 1, &mut random)
                    .unwrap()
            })
            .collect();

        assert_eq!(victims, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn random_draws_from_the_source() {
        let (mut frames, mut processes) = resident(&[(false, false); 4]);
        let mut random = RandomSource::new(vec![9, 2]);
        let mut replacer = PageReplacer::new(PolicyKind::Random, 4, DEFAULT_ROUND);

        let mut pick = || replacer.select_victim_frame(&mut frames, &mut processes, 1, &mut random);

        assert_eq!(pick(), Ok(1));
        assert_eq!(pick(), Ok(2));
        assert_eq!(pick(), Err(VmError::RandomExhausted(2)));
    }

    #[test]
    fn clock_gives_second_chances() {
        let (mut frames, mut processes) = resident(&[(true, false), (true, true), (false, true)]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::Clock, 3, DEFAULT_ROUND);

        let victim = replacer
            .select_victim_frame(&mut frames, &mut processes, 1, &mut random)
            .unwrap();

        assert_eq!(victim, 2);
        assert_eq!(replacer.hand(), 0);
        assert!(!referenced(&processes, 0));
        assert!(!referenced(&processes, 1));
    }

    #[test]
    fn clock_terminates_when_everything_is_referenced() {
        let (mut frames, mut processes) = resident(&[(true, false); 4]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::Clock, 4, DEFAULT_ROUND);

        let victim = replacer
            .select_victim_frame(&mut frames, &mut processes, 1, &mut random)
            .unwrap();

        assert_eq!(victim, 0);
        assert_eq!(replacer.hand(), 1);
        assert!(!referenced(&processes, victim));
    }

    #[test]
    fn nru_picks_first_lowest_class() {
        // classes: 3, 1, 2, 1
        let (mut frames, mut processes) =
            resident(&[(true, true), (false, true), (true, false), (false, true)]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::Nru, 4, DEFAULT_ROUND);

        let victim = replacer
            .select_victim_frame(&mut frames, &mut processes, 10, &mut random)
            .unwrap();

        assert_eq!(victim, 1);
        assert_eq!(replacer.hand(), 2);
        // inside the round, bits are left alone
        assert!(referenced(&processes, 0));
        assert!(referenced(&processes, 2));
    }

    #[test]
    fn nru_stops_early_on_class_zero() {
        let (mut frames, mut processes) =
            resident(&[(true, true), (false, false), (false, false), (true, false)]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::Nru, 4, DEFAULT_ROUND);

        let victim = replacer
            .select_victim_frame(&mut frames, &mut processes, 10, &mut random)
            .unwrap();

        assert_eq!(victim, 1);
        assert_eq!(replacer.hand(), 2);
    }

    #[test]
    fn nru_resets_reference_bits_once_per_round() {
        let (mut frames, mut processes) =
            resident(&[(true, true), (false, false), (true, false)]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::Nru, 3, DEFAULT_ROUND);

        let victim = replacer
            .select_victim_frame(&mut frames, &mut processes, 50, &mut random)
            .unwrap();

        // full scan despite the class-0 frame, every R bit cleared
        assert_eq!(victim, 1);
        assert!((0..3).all(|page| !referenced(&processes, page)));

        set_referenced(&mut processes, 2);
        set_referenced(&mut processes, 0);
        replacer
            .select_victim_frame(&mut frames, &mut processes, 60, &mut random)
            .unwrap();

        // 60 - 50 is inside the round again
        assert!(referenced(&processes, 0));
    }

    #[test]
    fn aging_shifts_and_picks_youngest_register() {
        let (mut frames, mut processes) = resident(&[(true, false), (false, false), (true, true)]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::Aging, 3, DEFAULT_ROUND);
        frames[1].age = 0x4000_0000;

        let victim = replacer
            .select_victim_frame(&mut frames, &mut processes, 1, &mut random)
            .unwrap();

        assert_eq!(victim, 1);
        assert_eq!(frames[0].age, 0x8000_0000);
        assert_eq!(frames[1].age, 0x2000_0000);
        assert_eq!(frames[2].age, 0x8000_0000);
        assert_eq!(replacer.hand(), 2);
        assert!(!referenced(&processes, 0));
    }

    #[test]
    fn aging_ties_go_to_first_in_scan_order() {
        let (mut frames, mut processes) = resident(&[(false, false); 3]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::Aging, 3, DEFAULT_ROUND);

        assert_eq!(replacer.select_victim_frame(&mut frames, &mut processes, 1, &mut random), Ok(0));
        // scan now starts at 1, so 1 is first among the equal registers
        assert_eq!(replacer.select_victim_frame(&mut frames, &mut processes, 2, &mut random), Ok(1));
    }

    #[test]
    fn aging_register_monotonicity() {
        let (mut frames, mut processes) = resident(&[(true, false), (false, false)]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::Aging, 2, DEFAULT_ROUND);
        frames[1].age = u32::MAX;

        let mut previous = frames[1].age;
        for clock in 1..40 {
            set_referenced(&mut processes, 0);
            replacer
                .select_victim_frame(&mut frames, &mut processes, clock, &mut random)
                .unwrap();

            assert_ne!(frames[0].age, 0);
            if previous != 0 {
                assert!(frames[1].age < previous);
            }
            previous = frames[1].age;
        }

        assert_eq!(frames[1].age, 0);
    }

    #[test]
    fn working_set_evicts_idle_frame_past_window() {
        let (mut frames, mut processes) = resident(&[(true, false), (false, false), (false, false)]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::WorkingSet, 3, DEFAULT_ROUND);
        frames[0].last_used = 10;
        frames[1].last_used = 70;
        frames[2].last_used = 20;

        let victim = replacer
            .select_victim_frame(&mut frames, &mut processes, 81, &mut random)
            .unwrap();

        assert_eq!(victim, 2);
        assert_eq!(frames[0].last_used, 80);
        assert!(!referenced(&processes, 0));
        assert_eq!(replacer.hand(), 0);
    }

    #[test]
    fn working_set_falls_back_to_least_recently_used() {
        let (mut frames, mut processes) = resident(&[(false, false), (false, false), (true, false)]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::WorkingSet, 3, DEFAULT_ROUND);
        frames[0].last_used = 30;
        frames[1].last_used = 25;
        frames[2].last_used = 5;

        let victim = replacer
            .select_victim_frame(&mut frames, &mut processes, 41, &mut random)
            .unwrap();

        assert_eq!(victim, 1);
        assert_eq!(frames[2].last_used, 40);
        assert_eq!(replacer.hand(), 2);
    }

    #[test]
    fn working_set_with_everything_referenced_takes_the_hand() {
        let (mut frames, mut processes) = resident(&[(true, false); 3]);
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::WorkingSet, 3, DEFAULT_ROUND);

        let victim = replacer
            .select_victim_frame(&mut frames, &mut processes, 5, &mut random)
            .unwrap();

        assert_eq!(victim, 0);
        assert_eq!(replacer.hand(), 1);
    }

    #[test]
    fn scanning_an_unowned_frame_is_an_error() {
        let mut frames = FrameTable::new(2);
        let mut processes = Vec::<Process>::new();
        let mut random = RandomSource::default();
        let mut replacer = PageReplacer::new(PolicyKind::Clock, 2, DEFAULT_ROUND);

        assert_eq!(
            replacer.select_victim_frame(&mut frames, &mut processes, 1, &mut random),
            Err(VmError::FrameNotResident(0))
        );
    }
}
