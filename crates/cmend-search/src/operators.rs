//! Path-weighted variation operators.

use std::collections::HashSet;

use cmend_ast::Sid;
use rand::Rng;

use cmend_repr::Variant;

use crate::SearchError;

/// Mutation knobs: overall chance plus the relative weights of the three
/// edit kinds.
#[derive(Debug, Clone)]
pub struct MutationWeights {
    /// Baseline per-step mutation probability, scaled by the step weight.
    pub mut_chance: f64,
    /// Relative weight of append edits.
    pub ins: f64,
    /// Relative weight of delete edits.
    pub del: f64,
    /// Relative weight of swap edits.
    pub swap: f64,
}

impl Default for MutationWeights {
    fn default() -> Self {
        MutationWeights {
            mut_chance: 0.2,
            ins: 1.0,
            del: 1.0,
            swap: 1.0,
        }
    }
}

impl MutationWeights {
    /// The same weights at double the overall chance, used to spread the
    /// initial population away from the seed variant.
    pub fn doubled(&self) -> Self {
        MutationWeights {
            mut_chance: (self.mut_chance * 2.0).min(1.0),
            ..self.clone()
        }
    }
}

/// Mutate along the weighted path.
///
/// Each path step mutates with probability `step.weight * mut_chance`. A
/// step that fires draws a uniform replacement statement from the whole
/// program, reserves both sids for the rest of this call, and appends one
/// of swap / delete / append to the child's history.
pub fn mutate<R: Rng>(parent: &Variant, weights: &MutationWeights, rng: &mut R) -> Variant {
    let mut child = parent.clone();
    let count = parent.index().count();
    if count == 0 {
        return child;
    }

    let mut reserved: HashSet<Sid> = HashSet::new();
    let steps: Vec<_> = parent.path().steps().to_vec();
    for step in steps {
        let chance = (step.weight * weights.mut_chance).clamp(0.0, 1.0);
        if !rng.gen_bool(chance) {
            continue;
        }
        let replace_with: Sid = rng.gen_range(0..count);
        if reserved.contains(&step.sid) || reserved.contains(&replace_with) {
            continue;
        }
        reserved.insert(step.sid);
        reserved.insert(replace_with);

        let total = weights.swap + weights.del + weights.ins;
        if total <= 0.0 {
            continue;
        }
        let draw = rng.gen::<f64>() * total;
        if draw < weights.swap {
            child.swap(step.sid, replace_with);
        } else if draw < weights.swap + weights.del {
            child.delete(step.sid);
        } else {
            child.append(step.sid, replace_with);
        }
    }
    child
}

/// One-point crossover over the shared weighted path.
///
/// Picks a cut in `[1, len-1]`; at each later path position, with
/// probability `max(p_mom, p_dad)`, the children exchange the statement
/// visible at that sid. The exchange is realised as paired `put` edits of
/// each parent's post-history kind, so a child's history stays a plain
/// extension of its parent's.
pub fn crossover<R: Rng>(
    mom: &Variant,
    dad: &Variant,
    rng: &mut R,
) -> Result<(Variant, Variant), SearchError> {
    let mom_steps = mom.path().steps();
    let dad_steps = dad.path().steps();
    if mom_steps.len() != dad_steps.len() {
        return Err(SearchError::PathMismatch(mom_steps.len(), dad_steps.len()));
    }

    let mut child_one = mom.clone();
    let mut child_two = dad.clone();
    let len = mom_steps.len();
    if len < 2 {
        return Ok((child_one, child_two));
    }

    let cut = rng.gen_range(1..len);
    for pos in cut..len {
        let sid = mom_steps[pos].sid;
        let chance = mom_steps[pos].weight.max(dad_steps[pos].weight).clamp(0.0, 1.0);
        if !rng.gen_bool(chance) {
            continue;
        }
        let from_dad = dad.get(sid)?;
        let from_mom = mom.get(sid)?;
        child_one.put(sid, from_dad);
        child_two.put(sid, from_mom);
    }
    Ok((child_one, child_two))
}
