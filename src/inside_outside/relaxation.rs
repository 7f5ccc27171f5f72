use super::{arc_product, InsideCosts, OutsideCosts};
use crate::error::{HgError, Result};
use crate::hypergraph::{ArcId, Hypergraph, StateId};
use crate::weight::{PathSemiring, DEFAULT_DELTA};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, warn};

/// Counts how often each state is taken from the agenda. Without negative
/// cycles no state is improved more often than there are states.
struct Reopenings(Vec<usize>);

impl Reopenings {
    fn count(&mut self, state: StateId) -> Result<()> {
        let n = self.0.len();
        let count = &mut self.0[state.index()];
        *count += 1;
        if *count > n {
            warn!(state = state.0, "negative-cost cycle detected");
            return Err(HgError::NegativeCycle { state });
        }
        Ok(())
    }
}

/// Inside costs of a possibly cyclic hypergraph by best-first relaxation.
/// Only strict improvements are propagated, so cycles of cost `one` are
/// harmless. Needs an out index.
pub fn inside_relaxation<W: PathSemiring>(hg: &Hypergraph<W>) -> Result<InsideCosts<W>> {
    hg.check_endpoints()?;
    let out = hg.out_adjacency()?;
    let n = hg.size();
    let axioms = hg.axioms();

    let mut values = vec![W::zero(); n];
    let mut best_arcs: Vec<Option<ArcId>> = vec![None; n];
    let mut agenda = BinaryHeap::new();
    for s in axioms.iter() {
        values[s] = W::one();
        agenda.push((W::one(), Reverse(StateId::new(s))));
    }

    let mut reopenings = Reopenings(vec![0; n]);
    let mut pops = 0;
    while let Some((value, Reverse(state))) = agenda.pop() {
        if value != values[state.index()] {
            continue;
        }
        pops += 1;
        reopenings.count(state)?;
        for &a in out.arcs(state) {
            let candidate = arc_product(hg, a, &values, None);
            let head = hg.arc(a).head;
            if candidate > values[head.index()] {
                values[head.index()] = candidate.clone();
                best_arcs[head.index()] = Some(a);
                agenda.push((candidate, Reverse(head)));
            }
        }
    }

    debug!(states = n, pops, "inside costs by relaxation");
    Ok(InsideCosts {
        values,
        best_arcs,
        order: None,
    })
}

/// True if `cost` is above `bound` by more than the rounding tolerance.
pub(crate) fn exceeds(cost: f64, bound: f64) -> bool {
    cost > bound + DEFAULT_DELTA
}

/// Outside costs by best-first relaxation from the final state. Needs in
/// arcs.
///
/// With `only_costs_below`, states are not expanded once the cost of their
/// outside weight exceeds the cost of the bound, and a tail is not updated if
/// its best derivation through the arc would exceed it; such states keep the
/// outside weight `zero`.
pub fn outside_relaxation<W: PathSemiring>(
    hg: &Hypergraph<W>,
    inside: &InsideCosts<W>,
    only_costs_below: Option<W>,
) -> Result<OutsideCosts<W>> {
    hg.check_endpoints()?;
    let n = hg.size();
    let mut values = vec![W::zero(); n];
    let goal = match hg.final_state() {
        Some(goal) => goal,
        None => return Ok(OutsideCosts { values }),
    };
    hg.in_arcs(goal)?;

    let bound = only_costs_below.map(|b| b.cost());
    let worse = |w: &W| bound.map_or(false, |b| exceeds(w.cost(), b));
    values[goal.index()] = W::one();
    let mut agenda = BinaryHeap::new();
    agenda.push((W::one(), Reverse(goal)));
    let mut reopenings = Reopenings(vec![0; n]);

    while let Some((value, Reverse(head))) = agenda.pop() {
        if value != values[head.index()] {
            continue;
        }
        if worse(&value) {
            break;
        }
        reopenings.count(head)?;
        for &a in hg.in_arcs(head)? {
            for (i, t) in hg.arc(a).tails.iter().enumerate() {
                let candidate = value.times(&arc_product(hg, a, inside.values(), Some(i)));
                if worse(&candidate.times(inside.value(*t))) {
                    continue;
                }
                if candidate > values[t.index()] {
                    values[t.index()] = candidate.clone();
                    agenda.push((candidate, Reverse(*t)));
                }
            }
        }
    }
    Ok(OutsideCosts { values })
}
