//! Stochastic universal sampling.

use rand::Rng;

use crate::SearchError;

/// Draw `k` individuals with probability proportional to fitness.
///
/// One uniform offset in `[0, total/k)` places `k` equally spaced pointers
/// on the cumulative-fitness axis; each pointer selects the individual
/// whose window contains it. Unlike repeated roulette spins this caps the
/// spread of any individual's selection count at one, so a 3:1 fitness
/// ratio yields a 3:1 selection ratio almost exactly even for small `k`.
/// Duplicates are expected and fine.
pub fn sample_universal<T: Clone, R: Rng>(
    population: &[(T, f64)],
    k: usize,
    rng: &mut R,
) -> Result<Vec<T>, SearchError> {
    if population.is_empty() {
        return Err(SearchError::EmptyPopulation);
    }
    let total: f64 = population.iter().map(|(_, f)| f.max(0.0)).sum();
    if total <= 0.0 {
        return Err(SearchError::ZeroTotalFitness);
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let step = total / k as f64;
    let start = rng.gen_range(0.0..step);

    let mut picked = Vec::with_capacity(k);
    let mut cursor = 0usize;
    let mut cumulative = population[0].1.max(0.0);
    for i in 0..k {
        let pointer = start + i as f64 * step;
        while pointer >= cumulative && cursor + 1 < population.len() {
            cursor += 1;
            cumulative += population[cursor].1.max(0.0);
        }
        picked.push(population[cursor].0.clone());
    }
    Ok(picked)
}
