//! Cost-based pruning.
//!
//! The total of a state is the weight of its best derivation of the final
//! state, `inside ⊗ outside`; the total of an arc is the best derivation
//! using it. Pruning removes what lies above a cost bound and then the states
//! that are no longer both reached and useful.

use crate::error::{HgError, Result};
use crate::hypergraph::{Hypergraph, StateId, StateIdTranslation};
use crate::inside_outside::{exceeds, inside, outside_relaxation, InsideCosts, OutsideCosts};
use crate::reachability::prune_unreachable;
use crate::weight::{PathSemiring, DEFAULT_DELTA};
use bit_set::BitSet;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct PruneOptions {
    /// Renumber the surviving states contiguously.
    pub pack_states: bool,
}

impl Default for PruneOptions {
    fn default() -> Self {
        PruneOptions { pack_states: true }
    }
}

impl PruneOptions {
    pub fn set_pack_states(&mut self, pack_states: bool) {
        self.pack_states = pack_states
    }
}

fn costs<W: PathSemiring>(hg: &mut Hypergraph<W>, bound: Option<f64>) -> Result<(InsideCosts<W>, OutsideCosts<W>)> {
    hg.force_in_arcs();
    hg.force_some_out_arcs();
    let ins = inside(hg)?;
    let outs = outside_relaxation(hg, &ins, bound.map(W::from_cost))?;
    Ok((ins, outs))
}

fn state_totals<W: PathSemiring>(hg: &Hypergraph<W>, ins: &InsideCosts<W>, outs: &OutsideCosts<W>) -> Vec<W> {
    hg.states()
        .map(|s| ins.value(s).times(outs.value(s)))
        .collect()
}

/// Removes states and arcs whose best total cost exceeds `bound`.
fn prune_by_cost<W: PathSemiring>(hg: &mut Hypergraph<W>, bound: f64, options: &PruneOptions) -> Result<()> {
    let (ins, outs) = costs(hg, Some(bound))?;
    let totals = state_totals(hg, &ins, &outs);
    let kept: BitSet = totals
        .iter()
        .enumerate()
        .filter(|(_, total)| !total.is_zero() && !exceeds(total.cost(), bound))
        .map(|(s, _)| s)
        .collect();

    let size_before = hg.size();
    let keep_arc = |arc: &crate::hypergraph::Hyperarc<W>| {
        let total = arc
            .tails
            .iter()
            .fold(arc.weight.times(outs.value(arc.head)), |acc, t| acc.times(ins.value(*t)));
        !total.is_zero()
            && !exceeds(total.cost(), bound)
            && kept.contains(arc.head.index())
            && arc.tails.iter().all(|t| kept.contains(t.index()))
    };
    let translation = if options.pack_states {
        StateIdTranslation::frozen(kept.iter().map(StateId::new))
    } else {
        StateIdTranslation::identity(hg.size())
    };
    hg.restrict(&translation, |_, arc| keep_arc(arc));
    prune_unreachable(hg, options.pack_states)?;
    debug!(
        bound,
        states_before = size_before,
        states = hg.size(),
        arcs = hg.num_arcs(),
        "pruned by cost"
    );
    Ok(())
}

/// Removes every state and arc whose best derivation of the final state is
/// worse than `bound`.
pub fn prune<W: PathSemiring>(hg: &mut Hypergraph<W>, bound: W, options: &PruneOptions) -> Result<()> {
    prune_by_cost(hg, bound.cost(), options)
}

/// Keeps what lies within `beam` of the cost of the best derivation.
pub fn prune_beam<W: PathSemiring>(hg: &mut Hypergraph<W>, beam: f64, options: &PruneOptions) -> Result<()> {
    if beam.is_nan() || beam < 0.0 {
        return Err(HgError::Config(format!("beam {} is not a non-negative number", beam)));
    }
    hg.force_some_out_arcs();
    let best = inside(hg)?.total(hg);
    if best.is_zero() {
        return prune_unreachable(hg, options.pack_states);
    }
    prune(hg, best.times(&W::from_cost(beam)), options)
}

/// Keeps the states whose total cost is among the `k` best distinct total
/// costs.
pub fn prune_to_nbest<W: PathSemiring>(hg: &mut Hypergraph<W>, k: usize, options: &PruneOptions) -> Result<()> {
    if k == 0 {
        return Err(HgError::Config("pruning to the 0 best is not meaningful".to_string()));
    }
    let (ins, outs) = costs(hg, None)?;
    let mut distinct: Vec<f64> = state_totals(hg, &ins, &outs)
        .iter()
        .filter(|total| !total.is_zero())
        .map(|total| total.cost())
        .collect();
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup_by(|a, b| (*a - *b).abs() <= DEFAULT_DELTA);

    match distinct.get(k - 1).or_else(|| distinct.last()) {
        Some(&bound) => prune_by_cost(hg, bound, options),
        None => prune_unreachable(hg, options.pack_states),
    }
}
