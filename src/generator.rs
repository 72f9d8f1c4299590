//! Instance generators for tests and benchmarks.
//!
//! - [`HomogeneousCase`]: a duplex sheet printer where every page is
//!   loaded, printed twice on the same re-entrant print engine, and
//!   unloaded, with a bounded buffer between the two prints.
//! - [`random_flowshop`] / [`random_line`]: seeded permutation flow shops
//!   with random processing and setup times.

use std::collections::BTreeMap;

use rand::Rng;

use crate::config::ShopConfig;
use crate::error::Result;
use crate::models::{
    Delay, Flowshop, Job, JobId, MachineId, ModuleId, OpKey, OperationId, ProductionLine,
    TransferConstraints,
};

/// Timing parameters of the duplex printer case.
///
/// Operations per page: load (M0), first print (M1), second print (M1),
/// unload (M2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomogeneousCase {
    pub load: Delay,
    pub print_1: Delay,
    pub print_2: Delay,
    pub unload: Delay,
    /// Minimum time between the starts of the two prints.
    pub buffer_min: Delay,
    /// Maximum time between the starts of the two prints.
    pub buffer_max: Delay,
    pub pages: u32,
}

impl Default for HomogeneousCase {
    fn default() -> Self {
        Self {
            load: 1,
            print_1: 10,
            print_2: 10,
            unload: 1,
            buffer_min: 100,
            buffer_max: 150,
            pages: 2,
        }
    }
}

impl HomogeneousCase {
    /// Sets the page (job) count.
    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = pages;
        self
    }

    /// Builds the module.
    pub fn build(&self, id: ModuleId, config: &ShopConfig) -> Flowshop {
        let mut fs = Flowshop::new(id, 3, self.pages as usize, 4, config);
        let route = [
            (self.load, 0),
            (self.print_1, 1),
            (self.print_2, 1),
            (self.unload, 2),
        ];
        for page in 0..self.pages {
            let job = JobId(page);
            fs.add_job(Job::new(job));
            for (op, &(processing, machine)) in route.iter().enumerate() {
                fs.add_operation(job, OperationId(op as u32), processing, 0, MachineId(machine));
            }
            fs.add_setup_independent(
                OpKey::new(page, 1),
                OpKey::new(page, 2),
                self.buffer_min - self.print_1,
            );
            fs.add_due_independent(OpKey::new(page, 2), OpKey::new(page, 1), self.buffer_max);
        }
        fs
    }
}

/// Single-module line of the duplex printer with default timings.
pub fn homogeneous_case(pages: u32, config: &ShopConfig) -> ProductionLine {
    ProductionLine::single(
        HomogeneousCase::default()
            .with_pages(pages)
            .build(ModuleId(0), config),
    )
}

/// Permutation flow shop: every job visits machines `0..machines` in
/// order. Processing times are drawn from `1..=9`; consecutive jobs get a
/// random sequence-dependent setup (`0..=3`) on every machine.
pub fn random_flowshop<R: Rng>(
    rng: &mut R,
    id: ModuleId,
    jobs: u32,
    machines: u32,
    config: &ShopConfig,
) -> Flowshop {
    let mut fs = Flowshop::new(id, machines as usize, jobs as usize, machines as usize, config);
    for j in 0..jobs {
        fs.add_job(Job::new(JobId(j)));
        for m in 0..machines {
            let processing = rng.random_range(1..=9);
            fs.add_operation(JobId(j), OperationId(m), processing, 0, MachineId(m));
        }
    }
    for j in 1..jobs {
        for m in 0..machines {
            let setup = rng.random_range(0..=3);
            fs.setup.set(OpKey::new(j - 1, m), OpKey::new(j, m), setup);
        }
    }
    fs
}

/// Line of `modules` random flow shops with random transfer setups
/// (`0..=2`) for every job.
pub fn random_line<R: Rng>(
    rng: &mut R,
    modules: u32,
    jobs: u32,
    machines: u32,
    config: &ShopConfig,
) -> Result<ProductionLine> {
    let mut shops = BTreeMap::new();
    for m in 0..modules.max(1) {
        shops.insert(ModuleId(m), random_flowshop(rng, ModuleId(m), jobs, machines, config));
    }
    let mut setup = TransferConstraints::new();
    for m in 1..modules {
        let per_job = setup.entry((ModuleId(m - 1), ModuleId(m))).or_default();
        for j in 0..jobs {
            per_job.insert(JobId(j), rng.random_range(0..=2));
        }
    }
    ProductionLine::new(shops, setup, TransferConstraints::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{CpSolver, EnumerationSolver, SolverConfig, SolverStatus};
    use crate::encoder::LineEncoder;
    use crate::verify::verify;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_homogeneous_structure() {
        let line = homogeneous_case(3, &ShopConfig::default());
        let fs = line.last_module();

        assert_eq!(fs.jobs().len(), 3);
        assert_eq!(fs.machine_count(), 3);
        assert!(fs.machine(MachineId(1)).unwrap().is_reentrant());
        assert_eq!(fs.query(OpKey::new(2, 1), OpKey::new(2, 2)), 90);
        assert_eq!(fs.due_date_independent(OpKey::new(2, 2), OpKey::new(2, 1)), Some(150));
    }

    #[test]
    fn test_homogeneous_single_page_makespan() {
        let line = homogeneous_case(1, &ShopConfig::default());
        let encoded = LineEncoder::new(&line).encode();
        let solution = EnumerationSolver::new().solve(encoded.model(), &SolverConfig::default());

        assert_eq!(solution.status, SolverStatus::Optimal);
        // load 1, print at 1, second print at 101, unload at 111
        assert_eq!(solution.objective, Some(112));
    }

    #[test]
    fn test_random_flowshop_is_seeded() {
        let config = ShopConfig::default();
        let a = random_flowshop(&mut StdRng::seed_from_u64(7), ModuleId(0), 3, 2, &config);
        let b = random_flowshop(&mut StdRng::seed_from_u64(7), ModuleId(0), 3, 2, &config);

        assert_eq!(a.operation_count(), 6);
        assert_eq!(a.jobs(), b.jobs());
        assert_eq!(a.setup, b.setup);
        assert!(a.operations().all(|op| (1..=9).contains(&op.processing)));
    }

    #[test]
    fn test_random_lines_solve_feasibly() {
        let config = ShopConfig::default();
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let line = random_line(&mut rng, 2, 2, 2, &config).unwrap();
            let encoded = LineEncoder::new(&line).encode();
            let solution =
                EnumerationSolver::new().solve(encoded.model(), &SolverConfig::default());

            assert_eq!(solution.status, SolverStatus::Optimal, "seed {seed}");
            assert!(verify(encoded.model(), &solution.starts).is_empty(), "seed {seed}");
            assert_eq!(solution.bound, solution.objective);
        }
    }
}
