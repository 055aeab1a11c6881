use std::collections::BTreeMap;

use pumpkin_solver::variables::DomainId;

use crate::core::Error;
use crate::cp::{Assignment, CpModel, LinearExpr, ReadBack, ValueTree, VarTree};

/// A directed arc between two vertices. An arc from a vertex to itself
/// marks the vertex as skipped by the circuit.
pub type Arc = (usize, usize);

/// Follows selected successor arcs from `start` (or, by default, the
/// smallest vertex with a selected outgoing arc) until a vertex repeats or
/// no successor exists, returning the vertices in visit order. Self-loops
/// are ignored.
///
/// This is a plain successor walk, not a general cycle finder: it assumes
/// the assignment holds at most one simple circuit. Given several disjoint
/// circuits it traces only the component containing the start vertex and
/// silently ignores the rest.
pub fn trace_circuit(selected: &BTreeMap<Arc, bool>, start: Option<usize>) -> Vec<usize> {
    let hops: BTreeMap<usize, usize> = selected
        .iter()
        .filter(|((s, e), on)| **on && s != e)
        .map(|((s, e), _)| (*s, *e))
        .collect();
    let Some(mut at) = start.or_else(|| hops.keys().next().copied()) else {
        return vec![];
    };
    let mut path = vec![at];
    while let Some(&next) = hops.get(&at) {
        if path.contains(&next) {
            break;
        }
        path.push(next);
        at = next;
    }
    path
}

fn is_single_circuit(selected: &BTreeMap<Arc, bool>) -> bool {
    let hops: BTreeMap<usize, usize> = selected
        .iter()
        .filter(|((s, e), on)| **on && s != e)
        .map(|((s, e), _)| (*s, *e))
        .collect();
    if hops.is_empty() {
        // Every vertex skipped itself.
        return true;
    }
    let path = trace_circuit(selected, None);
    let closes = path.last().and_then(|v| hops.get(v)) == path.first();
    closes && path.len() == hops.len()
}

fn unpack(keys: &[Arc], assignment: Assignment) -> BTreeMap<Arc, bool> {
    let values = match assignment {
        Assignment::Tree(ValueTree::Seq(values)) => values,
        other => panic!("unexpected circuit read-back {:?}", other),
    };
    keys.iter()
        .zip(values)
        .map(|(arc, value)| match value {
            ValueTree::Bool(on) => (*arc, on),
            other => panic!("unexpected arc value {:?}", other),
        })
        .collect()
}

/// One 0/1 decision variable per candidate arc, with every vertex required
/// to pick exactly one outgoing and one incoming arc (a self-loop picks
/// both at once and skips the vertex). The engine has no circuit global,
/// so the single-circuit requirement is completed on read-back: solve and
/// solve_all keep only assignments whose selected arcs form one circuit,
/// letting the engine's own enumeration blocking drive the search past
/// everything else.
pub struct CircuitModel {
    model: CpModel,
    arcs: BTreeMap<Arc, DomainId>,
}

impl CircuitModel {
    pub fn new(candidates: &[Arc]) -> Self {
        let mut model = CpModel::new();
        let mut arcs: BTreeMap<Arc, DomainId> = BTreeMap::new();
        for &(s, e) in candidates {
            arcs.entry((s, e))
                .or_insert_with(|| model.new_bool(format!("arc_{}_{}", s, e)));
        }
        let mut outgoing: BTreeMap<usize, Vec<DomainId>> = BTreeMap::new();
        let mut incoming: BTreeMap<usize, Vec<DomainId>> = BTreeMap::new();
        for (&(s, e), &var) in &arcs {
            outgoing.entry(s).or_default().push(var);
            incoming.entry(e).or_default().push(var);
        }
        for (_, vars) in outgoing.iter().chain(incoming.iter()) {
            model.exactly(vars, 1);
        }
        CircuitModel { model, arcs }
    }

    /// Forces the given arcs into every solution.
    pub fn force(&mut self, arcs: &[Arc]) -> Result<(), Error> {
        for arc in arcs {
            let var = *self
                .arcs
                .get(arc)
                .ok_or_else(|| Error::new(format!("unknown arc {:?}", arc)))?;
            self.model.add_eq(&LinearExpr::var(var), 1);
        }
        Ok(())
    }

    /// The decision variable for an arc, for side constraints.
    pub fn arc(&self, arc: Arc) -> Option<DomainId> {
        self.arcs.get(&arc).copied()
    }

    /// The underlying model, for side constraints.
    pub fn model_mut(&mut self) -> &mut CpModel {
        &mut self.model
    }

    fn arc_tree(&self) -> (Vec<Arc>, VarTree) {
        let keys: Vec<Arc> = self.arcs.keys().copied().collect();
        let tree = VarTree::Seq(self.arcs.values().map(|v| VarTree::Bool(*v)).collect());
        (keys, tree)
    }

    /// The first assignment forming a single circuit, or None.
    pub fn solve(&mut self) -> Option<BTreeMap<Arc, bool>> {
        let (keys, tree) = self.arc_tree();
        let mut found = None;
        self.model.for_each_solution(ReadBack::Vars(&tree), |a| {
            let selected = unpack(&keys, a);
            if is_single_circuit(&selected) {
                found = Some(selected);
                false
            } else {
                true
            }
        });
        found
    }

    /// Every assignment forming a single circuit, in engine order.
    pub fn solve_all(&mut self) -> Vec<BTreeMap<Arc, bool>> {
        let (keys, tree) = self.arc_tree();
        let mut found = Vec::new();
        self.model.for_each_solution(ReadBack::Vars(&tree), |a| {
            let selected = unpack(&keys, a);
            if is_single_circuit(&selected) {
                found.push(selected);
            }
            true
        });
        found
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn selection(on: &[Arc], off: &[Arc]) -> BTreeMap<Arc, bool> {
        let mut map = BTreeMap::new();
        for &a in on {
            map.insert(a, true);
        }
        for &a in off {
            map.insert(a, false);
        }
        map
    }

    #[test]
    fn test_trace_circuit_visit_order() {
        let selected = selection(
            &[(0, 2), (2, 3), (3, 1), (1, 0), (4, 4)],
            &[(0, 1), (2, 1), (3, 0)],
        );
        assert_eq!(trace_circuit(&selected, None), vec![0, 2, 3, 1]);
        // Any start on the circuit yields the same cycle, rotated.
        assert_eq!(trace_circuit(&selected, Some(3)), vec![3, 1, 0, 2]);
        assert_eq!(trace_circuit(&selected, Some(1)), vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_trace_circuit_open_path() {
        let selected = selection(&[(0, 1), (1, 2)], &[(2, 0)]);
        assert_eq!(trace_circuit(&selected, None), vec![0, 1, 2]);
    }

    #[test]
    fn test_trace_circuit_empty() {
        let selected = selection(&[(5, 5)], &[]);
        assert_eq!(trace_circuit(&selected, None), Vec::<usize>::new());
    }

    // Vertices 0 1
    //          2 3
    // with both orientations of each side as candidates.
    fn square_arcs() -> Vec<Arc> {
        vec![
            (0, 1),
            (1, 0),
            (1, 3),
            (3, 1),
            (3, 2),
            (2, 3),
            (2, 0),
            (0, 2),
        ]
    }

    #[test]
    fn test_square_has_two_circuits() {
        let mut model = CircuitModel::new(&square_arcs());
        let circuits = model.solve_all();
        assert_eq!(circuits.len(), 2);
        for selected in &circuits {
            let path = trace_circuit(selected, Some(0));
            let mut sorted = path.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted, vec![0, 1, 2, 3]);
        }
        // The two circuits are reversals of each other.
        let (a, b) = (&circuits[0], &circuits[1]);
        for (&(s, e), &on) in a {
            assert_eq!(b.get(&(e, s)), Some(&on));
        }
    }

    #[test]
    fn test_forced_arc_picks_orientation() {
        let mut model = CircuitModel::new(&square_arcs());
        model.force(&[(0, 1)]).unwrap();
        let circuits = model.solve_all();
        assert_eq!(circuits.len(), 1);
        assert_eq!(trace_circuit(&circuits[0], Some(0)), vec![0, 1, 3, 2]);
        assert!(model.force(&[(0, 3)]).is_err());
    }

    #[test]
    fn test_skipped_vertex_takes_self_loop() {
        // A triangle plus a detached vertex that can only skip itself.
        let mut arcs = vec![(0, 1), (1, 2), (2, 0), (3, 3)];
        arcs.extend([(1, 0), (2, 1), (0, 2)]);
        let mut model = CircuitModel::new(&arcs);
        let selected = model.solve().unwrap();
        assert_eq!(selected[&(3, 3)], true);
        let path = trace_circuit(&selected, Some(0));
        assert_eq!(path.len(), 3);
    }
}
