//! Population store with Pareto ranks.
//!
//! An individual's rank is the number of other members that are no worse in
//! every objective and differ in at least one. Rank 0 is the Pareto set.

use rand::prelude::*;

use crate::schema::Genome;

/// Whether `a` is no worse than `b` everywhere and differs somewhere.
pub fn dominates(a: &[f32], b: &[f32]) -> bool {
    a.iter().zip(b).all(|(x, y)| x <= y) && a != b
}

/// Fixed-size population with cached objectives and ranks.
#[derive(Debug, Clone)]
pub struct Population {
    genomes: Vec<Genome>,
    objectives: Vec<Vec<f32>>,
    ranks: Vec<usize>,
    pareto: Vec<usize>,
}

impl Population {
    /// Build from evaluated individuals and compute all ranks.
    ///
    /// `genomes` and `objectives` must have equal length.
    pub fn new(genomes: Vec<Genome>, objectives: Vec<Vec<f32>>) -> Self {
        debug_assert_eq!(genomes.len(), objectives.len());
        let mut population = Self {
            ranks: vec![0; genomes.len()],
            genomes,
            objectives,
            pareto: Vec::new(),
        };
        population.refresh_ranks();
        population
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn genome(&self, index: usize) -> &Genome {
        &self.genomes[index]
    }

    pub fn objectives(&self, index: usize) -> &[f32] {
        &self.objectives[index]
    }

    pub fn rank(&self, index: usize) -> usize {
        self.ranks[index]
    }

    pub fn ranks(&self) -> &[usize] {
        &self.ranks
    }

    /// Indices at rank 0 as of the last [`refresh_ranks`](Self::refresh_ranks).
    pub fn pareto(&self) -> &[usize] {
        &self.pareto
    }

    /// Number of members dominating `candidate`. O(N).
    pub fn compute_rank(&self, candidate: &[f32]) -> usize {
        self.objectives
            .iter()
            .filter(|member| dominates(member, candidate))
            .count()
    }

    /// Recompute every rank and the Pareto set. O(N^2).
    pub fn refresh_ranks(&mut self) {
        self.ranks = self
            .objectives
            .iter()
            .map(|objectives| self.compute_rank(objectives))
            .collect();
        self.update_pareto();
    }

    /// Recompute the Pareto set from the cached ranks.
    pub fn update_pareto(&mut self) {
        self.pareto = self
            .ranks
            .iter()
            .enumerate()
            .filter(|&(_, &rank)| rank == 0)
            .map(|(index, _)| index)
            .collect();
    }

    /// Slot with the highest rank and that rank; the first one on ties.
    pub fn worst(&self) -> (usize, usize) {
        let mut worst = (0, self.ranks.first().copied().unwrap_or(0));
        for (index, &rank) in self.ranks.iter().enumerate().skip(1) {
            if rank > worst.1 {
                worst = (index, rank);
            }
        }
        worst
    }

    /// Overwrite one slot. Ranks elsewhere are not touched.
    pub fn replace(&mut self, index: usize, genome: Genome, objectives: Vec<f32>) {
        self.genomes[index] = genome;
        self.objectives[index] = objectives;
    }

    /// Recompute `index` exactly plus up to `neighbors` random other slots.
    ///
    /// Neighbours are drawn from a generator seeded with `seed ^ index`, so
    /// the caller's random stream is left untouched.
    pub fn refresh_local(&mut self, index: usize, neighbors: usize, seed: u64) {
        self.ranks[index] = self.compute_rank(&self.objectives[index]);
        let mut rng = StdRng::seed_from_u64(seed ^ index as u64);
        for _ in 0..neighbors {
            let other = rng.gen_range(0..self.len());
            if other != index {
                self.ranks[other] = self.compute_rank(&self.objectives[other]);
            }
        }
    }

    /// Population mean of one objective.
    pub fn average(&self, objective: usize) -> f32 {
        if self.objectives.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.objectives.iter().map(|o| o[objective]).sum();
        sum / self.objectives.len() as f32
    }

    /// Population minimum of one objective.
    pub fn best(&self, objective: usize) -> f32 {
        self.objectives
            .iter()
            .map(|o| o[objective])
            .fold(f32::INFINITY, f32::min)
    }

    /// Pareto member with the lowest value of `objective`; the first on ties.
    pub fn best_pareto(&self, objective: usize) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for &index in &self.pareto {
            let value = self.objectives[index][objective];
            if best.is_none_or(|(_, current)| value < current) {
                best = Some((index, value));
            }
        }
        best.map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn population(objectives: Vec<Vec<f32>>) -> Population {
        let genomes = vec![Genome::default(); objectives.len()];
        Population::new(genomes, objectives)
    }

    #[test]
    fn test_dominates() {
        assert!(dominates(&[1.0, 2.0], &[1.0, 3.0]));
        assert!(!dominates(&[1.0, 2.0], &[1.0, 2.0]));
        assert!(!dominates(&[1.0, 4.0], &[2.0, 3.0]));
    }

    #[test]
    fn test_ranks_and_pareto() {
        let pop = population(vec![
            vec![1.0, 5.0],
            vec![5.0, 1.0],
            vec![3.0, 3.0],
            vec![4.0, 6.0],
            vec![6.0, 6.0],
        ]);
        assert_eq!(pop.ranks(), &[0, 0, 0, 2, 4]);
        assert_eq!(pop.pareto(), &[0, 1, 2]);
        assert_eq!(pop.worst(), (4, 4));
        assert_eq!(pop.best_pareto(1), Some(1));
        assert_eq!(pop.best_pareto(0), Some(0));
    }

    #[test]
    fn test_duplicates_do_not_dominate_each_other() {
        let pop = population(vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![2.0, 2.0]]);
        assert_eq!(pop.ranks(), &[0, 0, 2]);
    }

    #[test]
    fn test_worst_prefers_first_on_ties() {
        let pop = population(vec![vec![0.0], vec![1.0], vec![1.0]]);
        assert_eq!(pop.worst(), (1, 1));
    }

    #[test]
    fn test_replace_then_refresh_local() {
        let mut pop = population(vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);
        let (worst, rank) = pop.worst();
        assert_eq!((worst, rank), (3, 3));

        assert!(pop.compute_rank(&[0.5]) < rank);
        pop.replace(worst, Genome::default(), vec![0.5]);
        pop.refresh_local(worst, 64, 42);
        assert_eq!(pop.rank(3), 0);
        // 64 draws over 4 slots cover every neighbour.
        assert_eq!(pop.ranks(), &[1, 2, 3, 0]);

        // The Pareto set is stale until the next full refresh.
        assert_eq!(pop.pareto(), &[0]);
        pop.refresh_ranks();
        assert_eq!(pop.pareto(), &[3]);
    }

    #[test]
    fn test_average_and_best() {
        let pop = population(vec![vec![1.0, 10.0], vec![3.0, 20.0]]);
        assert_eq!(pop.average(0), 2.0);
        assert_eq!(pop.average(1), 15.0);
        assert_eq!(pop.best(1), 10.0);
    }

    proptest! {
        #[test]
        fn prop_dominated_members_leave_pareto_set(
            objectives in prop::collection::vec(prop::collection::vec(0u8..6, 3), 1..20)
        ) {
            let objectives: Vec<Vec<f32>> = objectives
                .into_iter()
                .map(|o| o.into_iter().map(f32::from).collect())
                .collect();
            let pop = population(objectives.clone());

            prop_assert!(!pop.pareto().is_empty());
            for (a, fa) in objectives.iter().enumerate() {
                for (b, fb) in objectives.iter().enumerate() {
                    if dominates(fa, fb) {
                        prop_assert!(pop.rank(b) >= 1);
                        prop_assert!(!pop.pareto().contains(&b));
                        prop_assert!(a != b);
                    }
                }
            }
        }
    }
}
