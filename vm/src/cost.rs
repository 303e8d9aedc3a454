use crate::process::ProcessStats;

/// Simulated cycle cost charged for each kind of event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CostModel {
    pub access: u64,
    pub context_switch: u64,
    pub process_exit: u64,
    pub map: u64,
    pub unmap: u64,
    pub page_in: u64,
    pub page_out: u64,
    pub file_in: u64,
    pub file_out: u64,
    pub zero_fill: u64,
    pub segv: u64,
    pub segprot: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            access: 1,
            context_switch: 130,
            process_exit: 1250,
            map: 300,
            unmap: 400,
            page_in: 3100,
            page_out: 2700,
            file_in: 2800,
            file_out: 2400,
            zero_fill: 140,
            segv: 340,
            segprot: 420,
        }
    }
}

impl CostModel {
    pub fn process_cost(&self, stats: &ProcessStats) -> u64 {
        stats.maps * self.map
            + stats.unmaps * self.unmap
            + stats.ins * self.page_in
            + stats.outs * self.page_out
            + stats.fins * self.file_in
            + stats.fouts * self.file_out
            + stats.zeros * self.zero_fill
            + stats.segv * self.segv
            + stats.segprot * self.segprot
    }
}

/// Run-wide counters reported on the final totals line.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct RunTotals {
    pub instructions: u64,
    pub context_switches: u64,
    pub process_exits: u64,
    pub cost: u64,
}

impl RunTotals {
    pub fn compute<'a>(
        model: &CostModel,
        instructions: u64,
        context_switches: u64,
        process_exits: u64,
        stats: impl IntoIterator<Item = &'a ProcessStats>,
    ) -> Self {
        let accesses = instructions - context_switches - process_exits;

        let cost = context_switches * model.context_switch
            + process_exits * model.process_exit
            + accesses * model.access
            + stats
                .into_iter()
                .map(|stats| model.process_cost(stats))
                .sum::<u64>();

        RunTotals {
            instructions,
            context_switches,
            process_exits,
            cost,
        }
    }
}
