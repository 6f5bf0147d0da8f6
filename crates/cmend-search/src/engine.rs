//! The GA driver: population lifecycle from seed variant to best repair.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use cmend_repr::Variant;

use crate::fitness::FitnessEvaluator;
use crate::logger::RunLog;
use crate::operators::{crossover, mutate, MutationWeights};
use crate::sample::sample_universal;
use crate::SearchError;

/// Search-shape knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Population floor per generation.
    pub population: usize,
    /// Generations to run before giving up.
    pub generations: u32,
    pub weights: MutationWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            population: 40,
            generations: 10,
            weights: MutationWeights::default(),
        }
    }
}

/// What a finished run looked like, serialised into the report artefact.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generations_run: u32,
    pub evaluations: u64,
    pub compiles: u64,
    pub cache_hits: u64,
    pub best: Option<BestSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestSummary {
    pub fitness: f64,
    pub diff_size: u64,
    pub evaluation: u64,
    pub found_after_secs: f64,
}

/// Runs the per-generation pipeline against a fitness evaluator.
pub struct RepairEngine {
    config: EngineConfig,
    evaluator: FitnessEvaluator,
}

impl RepairEngine {
    pub fn new(config: EngineConfig, evaluator: FitnessEvaluator) -> Self {
        RepairEngine { config, evaluator }
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// Run the search from a seed variant.
    ///
    /// Per generation: evaluate everyone, drop the zero-fitness members,
    /// double the survivors up to the population floor, sample half the
    /// floor as breeders, pair them for crossover, and give every resulting
    /// entry one mutant sibling. Extinction (no survivor with positive
    /// fitness) aborts the run.
    pub async fn run<R: Rng>(
        &self,
        seed: &Variant,
        rng: &mut R,
        log: &RunLog,
    ) -> Result<RunReport, SearchError> {
        let n = self.config.population.max(2);
        let spread = self.config.weights.doubled();
        let mut population: Vec<Variant> =
            (0..n).map(|_| mutate(seed, &spread, rng)).collect();

        let mut generations_run = 0;
        for generation in 1..=self.config.generations {
            generations_run = generation;
            log.line(format!(
                "generation {generation}: evaluating {} variants",
                population.len()
            ));

            let mut scored = Vec::with_capacity(population.len());
            for variant in population.drain(..) {
                let fitness = self.evaluator.evaluate(&variant, log).await?;
                scored.push((variant, fitness));
            }

            scored.retain(|(_, fitness)| *fitness > 0.0);
            if scored.is_empty() {
                return Err(SearchError::Extinct(generation));
            }
            while scored.len() < n {
                log.line(format!(
                    "generation {generation}: doubling {} survivors",
                    scored.len()
                ));
                scored.extend_from_within(..);
            }

            let mut breeders = sample_universal(&scored, n / 2, rng)?;
            breeders.shuffle(rng);

            let mut next = Vec::with_capacity(2 * n);
            let mut pairs = breeders.chunks_exact(2);
            for pair in &mut pairs {
                let (child_one, child_two) = crossover(&pair[0], &pair[1], rng)?;
                next.push(pair[0].clone());
                next.push(pair[1].clone());
                next.push(child_one);
                next.push(child_two);
            }
            for leftover in pairs.remainder() {
                next.push(leftover.clone());
            }

            population = Vec::with_capacity(2 * next.len());
            for variant in next {
                let mutant = mutate(&variant, &self.config.weights, rng);
                population.push(variant);
                population.push(mutant);
            }

            if let Some(best) = self.evaluator.best() {
                log.line(format!(
                    "generation {generation}: best so far fitness {:.1}, diff {} bytes",
                    best.fitness, best.diff_size
                ));
            }
        }

        Ok(self.report(generations_run))
    }

    fn report(&self, generations_run: u32) -> RunReport {
        RunReport {
            generations_run,
            evaluations: self.evaluator.evaluations(),
            compiles: self.evaluator.compiles(),
            cache_hits: self.evaluator.cache_hits(),
            best: self.evaluator.best().map(|best| BestSummary {
                fitness: best.fitness,
                diff_size: best.diff_size,
                evaluation: best.evaluation,
                found_after_secs: best.found_after.as_secs_f64(),
            }),
        }
    }
}
