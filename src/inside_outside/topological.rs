use super::{arc_product, InsideCosts, OutsideCosts};
use crate::error::{HgError, Result};
use crate::hypergraph::{ArcId, Hypergraph, StateId};
use crate::weight::Semiring;
use bit_set::BitSet;
use std::collections::VecDeque;
use tracing::debug;

/// Inside costs of an acyclic hypergraph in a single pass over the states
/// in topological order. A state is finished once all arcs into it are.
/// Needs an out index; a cycle is reported as `Unimplemented`.
pub fn inside_topological<W: Semiring>(hg: &Hypergraph<W>) -> Result<InsideCosts<W>> {
    hg.check_endpoints()?;
    let out = hg.out_adjacency()?;
    let n = hg.size();
    let axioms = hg.axioms();

    let mut values: Vec<W> = (0..n)
        .map(|s| if axioms.contains(s) { W::one() } else { W::zero() })
        .collect();
    let mut best_costs: Vec<f64> = values.iter().map(|w| w.cost()).collect();
    let mut best_arcs: Vec<Option<ArcId>> = vec![None; n];
    let mut unfinished_in = hg.in_degrees();
    let mut pending: Vec<usize> = (0..hg.num_arcs()).map(|a| out.triggers(ArcId::new(a))).collect();

    let mut queue: VecDeque<StateId> = hg.states().filter(|s| unfinished_in[s.index()] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(state) = queue.pop_front() {
        order.push(state);
        for &a in out.arcs(state) {
            pending[a.index()] -= 1;
            if pending[a.index()] > 0 {
                continue;
            }
            let value = arc_product(hg, a, &values, None);
            let head = hg.arc(a).head;
            let h = head.index();
            if value.cost() < best_costs[h] {
                best_costs[h] = value.cost();
                best_arcs[h] = Some(a);
            }
            values[h] = values[h].plus(&value);
            unfinished_in[h] -= 1;
            if unfinished_in[h] == 0 {
                queue.push_back(head);
            }
        }
    }

    if order.len() < n {
        let finished: BitSet = order.iter().map(|s| s.index()).collect();
        let state = state_on_cycle(hg, &finished);
        return Err(HgError::Unimplemented(format!(
            "state {} is on a cycle; inside costs of cyclic hypergraphs need relaxation",
            state
        )));
    }

    debug!(states = n, "inside costs in topological order");
    Ok(InsideCosts {
        values,
        best_arcs,
        order: Some(order),
    })
}

/// Walks backwards from an unfinished state along unfinished tails until a
/// state repeats.
fn state_on_cycle<W>(hg: &Hypergraph<W>, finished: &BitSet) -> StateId {
    let mut into: Vec<Vec<ArcId>> = vec![Vec::new(); hg.size()];
    for (id, arc) in hg.arcs() {
        into[arc.head.index()].push(id);
    }
    let unfinished_tail = |s: StateId| {
        into[s.index()]
            .iter()
            .flat_map(|&a| hg.arc(a).tails.iter().cloned())
            .find(|t| !finished.contains(t.index()))
    };

    let mut visited = BitSet::with_capacity(hg.size());
    let mut state = match hg.states().find(|s| !finished.contains(s.index())) {
        Some(s) => s,
        None => return StateId(0),
    };
    while visited.insert(state.index()) {
        match unfinished_tail(state) {
            Some(t) => state = t,
            None => break,
        }
    }
    state
}

/// Outside costs from inside costs that were computed in topological order.
/// Arcs are visited by descending position of their head, so the outside
/// weight of a head is complete before it is passed on to the tails.
pub fn outside_topological<W: Semiring>(hg: &Hypergraph<W>, inside: &InsideCosts<W>) -> Result<OutsideCosts<W>> {
    hg.check_endpoints()?;
    let order = inside.order().ok_or_else(|| {
        HgError::invalid("outside costs in topological order need inside costs in topological order")
    })?;
    let n = hg.size();
    let mut position = vec![0; n];
    for (i, s) in order.iter().enumerate() {
        position[s.index()] = i;
    }

    let mut arcs: Vec<ArcId> = hg.arcs().map(|(id, _)| id).collect();
    arcs.sort_by_key(|&a| std::cmp::Reverse(position[hg.arc(a).head.index()]));

    let mut values = vec![W::zero(); n];
    if let Some(goal) = hg.final_state() {
        values[goal.index()] = W::one();
    }
    for a in arcs {
        let arc = hg.arc(a);
        let head_outside = values[arc.head.index()].clone();
        if head_outside.is_zero() {
            continue;
        }
        for (i, t) in arc.tails.iter().enumerate() {
            let rest = head_outside.times(&arc_product(hg, a, inside.values(), Some(i)));
            values[t.index()] = values[t.index()].plus(&rest);
        }
    }
    Ok(OutsideCosts { values })
}
