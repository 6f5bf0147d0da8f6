//! The fault-localisation path that weights where mutation may touch.

use std::collections::HashSet;

use cmend_ast::Sid;
use serde::{Deserialize, Serialize};

/// One step of the weighted path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    /// Scales the mutation chance at this statement.
    pub weight: f64,
    pub sid: Sid,
}

/// Ordered, deduplicated sequence of weighted statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPath {
    steps: Vec<PathStep>,
}

impl WeightedPath {
    /// Build from raw steps, keeping the first occurrence of each sid.
    pub fn new(raw: Vec<PathStep>) -> Self {
        let mut seen = HashSet::new();
        let steps = raw
            .into_iter()
            .filter(|step| seen.insert(step.sid))
            .collect();
        WeightedPath { steps }
    }

    /// Every sid at weight 1.0.
    pub fn from_sids(sids: &[Sid]) -> Self {
        Self::new(sids.iter().map(|&sid| PathStep { weight: 1.0, sid }).collect())
    }

    /// Weight 1.0, except sids on the known-good path get `good_weight`.
    pub fn with_good_path(sids: &[Sid], good: &HashSet<Sid>, good_weight: f64) -> Self {
        Self::new(
            sids.iter()
                .map(|&sid| PathStep {
                    weight: if good.contains(&sid) { good_weight } else { 1.0 },
                    sid,
                })
                .collect(),
        )
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_sids_keep_first_weight() {
        let path = WeightedPath::new(vec![
            PathStep { weight: 1.0, sid: 5 },
            PathStep { weight: 0.2, sid: 5 },
            PathStep { weight: 1.0, sid: 6 },
        ]);
        assert_eq!(path.len(), 2);
        assert_eq!(path.steps()[0].weight, 1.0);
    }

    #[test]
    fn good_path_sids_are_down_weighted() {
        let good: HashSet<Sid> = [2].into_iter().collect();
        let path = WeightedPath::with_good_path(&[1, 2, 3], &good, 0.0);
        let weights: Vec<f64> = path.steps().iter().map(|s| s.weight).collect();
        assert_eq!(weights, vec![1.0, 0.0, 1.0]);
    }
}
