use pumpkin_solver::constraints;
use pumpkin_solver::results::solution_iterator::IteratedSolution;
use pumpkin_solver::results::ProblemSolution;
use pumpkin_solver::termination::Indefinite;
use pumpkin_solver::proof::ConstraintTag;
use pumpkin_solver::variables::{AffineView, DomainId, TransformableVariable};
use pumpkin_solver::Solver;
use std::ops::Add;

use crate::core::Error;

/// Sentinel bounds for unbounded interval ends, mirroring the engine's
/// variable domain limits.
pub const INT_MIN: i64 = i32::MIN as i64;
pub const INT_MAX: i64 = i32::MAX as i64;

/// A union of disjoint closed integer intervals. Interval ends equal to
/// `INT_MIN`/`INT_MAX` act as "unbounded" on that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    intervals: Vec<(i64, i64)>,
}

impl Domain {
    /// A single closed interval [lo, hi]. Empty if lo > hi.
    pub fn interval(lo: i64, hi: i64) -> Self {
        if lo > hi {
            Domain { intervals: vec![] }
        } else {
            Domain { intervals: vec![(lo, hi)] }
        }
    }

    /// Build a domain from a flat [lo1, hi1, lo2, hi2, ...] interval list.
    pub fn from_flat_intervals(flat: &[i64]) -> Result<Self, Error> {
        if flat.len() % 2 != 0 {
            return Err(Error::new_const("flat interval list must have even length"));
        }
        let mut intervals: Vec<(i64, i64)> = flat
            .chunks(2)
            .map(|c| (c[0], c[1]))
            .filter(|(lo, hi)| lo <= hi)
            .collect();
        intervals.sort();
        // Merge overlapping or adjacent intervals so the representation is
        // canonical and complement() stays simple.
        let mut merged: Vec<(i64, i64)> = Vec::new();
        for (lo, hi) in intervals {
            match merged.last_mut() {
                Some((_, prev_hi)) if lo <= prev_hi.saturating_add(1) => {
                    *prev_hi = (*prev_hi).max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        Ok(Domain { intervals: merged })
    }

    /// The complement within [INT_MIN, INT_MAX].
    pub fn complement(&self) -> Domain {
        let mut intervals = Vec::new();
        let mut next = INT_MIN;
        for &(lo, hi) in &self.intervals {
            if next < lo {
                intervals.push((next, lo - 1));
            }
            next = hi.saturating_add(1);
        }
        if next <= INT_MAX {
            intervals.push((next, INT_MAX));
        }
        Domain { intervals }
    }

    pub fn contains(&self, v: i64) -> bool {
        self.intervals.iter().any(|&(lo, hi)| lo <= v && v <= hi)
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[(i64, i64)] {
        &self.intervals
    }
}

/// An integer linear combination of model variables plus a constant offset.
#[derive(Debug, Clone, Default)]
pub struct LinearExpr {
    terms: Vec<(i32, DomainId)>,
    offset: i32,
}

impl LinearExpr {
    pub fn var(v: DomainId) -> Self {
        LinearExpr { terms: vec![(1, v)], offset: 0 }
    }

    pub fn term(coeff: i32, v: DomainId) -> Self {
        LinearExpr { terms: vec![(coeff, v)], offset: 0 }
    }

    pub fn constant(offset: i32) -> Self {
        LinearExpr { terms: vec![], offset }
    }

    pub fn sum(vars: &[DomainId]) -> Self {
        LinearExpr {
            terms: vars.iter().map(|v| (1, *v)).collect(),
            offset: 0,
        }
    }

    pub fn push_term(&mut self, coeff: i32, v: DomainId) {
        self.terms.push((coeff, v));
    }

    fn views(&self) -> Vec<AffineView<DomainId>> {
        self.terms.iter().map(|(c, v)| v.scaled(*c)).collect()
    }

    fn negated(&self) -> LinearExpr {
        LinearExpr {
            terms: self.terms.iter().map(|(c, v)| (-c, *v)).collect(),
            offset: -self.offset,
        }
    }
}

impl From<DomainId> for LinearExpr {
    fn from(v: DomainId) -> Self {
        LinearExpr::var(v)
    }
}

impl std::ops::Add<LinearExpr> for LinearExpr {
    type Output = LinearExpr;
    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self.terms.extend(rhs.terms);
        self.offset += rhs.offset;
        self
    }
}

impl std::ops::Sub<LinearExpr> for LinearExpr {
    type Output = LinearExpr;
    fn sub(self, rhs: LinearExpr) -> LinearExpr {
        self.add(rhs.negated())
    }
}

impl std::ops::Add<i32> for LinearExpr {
    type Output = LinearExpr;
    fn add(mut self, rhs: i32) -> LinearExpr {
        self.offset += rhs;
        self
    }
}

impl std::ops::Sub<i32> for LinearExpr {
    type Output = LinearExpr;
    fn sub(mut self, rhs: i32) -> LinearExpr {
        self.offset -= rhs;
        self
    }
}

/// A linear expression restricted to a union of integer intervals.
#[derive(Debug, Clone)]
pub struct BoundedLinear {
    pub expr: LinearExpr,
    pub domain: Domain,
}

/// An expression handed to the reification helpers. Only the `Bounded`
/// variant carries enough information to be enforced both ways.
#[derive(Debug, Clone)]
pub enum Expr {
    Linear(LinearExpr),
    Bounded(BoundedLinear),
}

/// The condition `lb <= expr <= ub`.
pub fn is_between(expr: LinearExpr, lb: i32, ub: i32) -> Expr {
    Expr::Bounded(BoundedLinear {
        expr,
        domain: Domain::interval(lb as i64, ub as i64),
    })
}

/// The condition `expr < lb || expr > ub`, the exact complement of
/// [`is_between`] over the same interval.
pub fn is_not_between(expr: LinearExpr, lb: i32, ub: i32) -> Expr {
    Expr::Bounded(BoundedLinear {
        expr,
        domain: Domain::interval(lb as i64, ub as i64).complement(),
    })
}

/// Ties a 0/1 variable to a bounded condition: `b = 1` forces the
/// expression into its domain and `b = 0` forces it into the complement.
/// A plain (unbounded) linear expression is rejected.
pub fn equals(b: DomainId, expr: &Expr, model: &mut CpModel) -> Result<(), Error> {
    let bounded = match expr {
        Expr::Bounded(bounded) => bounded,
        Expr::Linear(_) => {
            return Err(Error::new_const("expr must be a bounded linear expression"));
        }
    };
    let not_b = model.new_aux_bool();
    model.add_eq(&(LinearExpr::var(b) + LinearExpr::var(not_b)), 1);
    model.require_in(&bounded.expr, &bounded.domain, Some(b));
    model.require_in(&bounded.expr, &bounded.domain.complement(), Some(not_b));
    Ok(())
}

/// How to read assignments back out of the engine (see the solution
/// helpers on [`CpModel`]):
/// - `Model`: every variable registered with the model, by name, in
///   declaration order.
/// - `Vars`: an externally supplied collection; the result mirrors its
///   shape.
pub enum ReadBack<'a> {
    Model,
    Vars(&'a VarTree),
}

/// A nested collection of model variables supplied by the caller.
#[derive(Debug, Clone)]
pub enum VarTree {
    Int(DomainId),
    /// A 0/1 variable read back as a bool.
    Bool(DomainId),
    Seq(Vec<VarTree>),
    Map(Vec<(String, VarTree)>),
}

/// The values of a [`VarTree`] under one assignment, same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueTree {
    Int(i32),
    Bool(bool),
    Seq(Vec<ValueTree>),
    Map(Vec<(String, ValueTree)>),
}

fn resolve(tree: &VarTree, value_of: &dyn Fn(DomainId) -> i32) -> ValueTree {
    match tree {
        VarTree::Int(v) => ValueTree::Int(value_of(*v)),
        VarTree::Bool(v) => ValueTree::Bool(value_of(*v) != 0),
        VarTree::Seq(items) => {
            ValueTree::Seq(items.iter().map(|t| resolve(t, value_of)).collect())
        }
        VarTree::Map(entries) => ValueTree::Map(
            entries
                .iter()
                .map(|(k, t)| (k.clone(), resolve(t, value_of)))
                .collect(),
        ),
    }
}

/// One solver assignment, read back per [`ReadBack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Named(Vec<(String, i32)>),
    Tree(ValueTree),
}

/// A thin wrapper around the CP engine: variable registry plus constraint
/// posting helpers. Booleans are 0/1 integer variables. The model is meant
/// to be populated once and then solved or enumerated; the engine keeps
/// already-returned solutions blocked, so repeated solve calls step through
/// distinct assignments.
pub struct CpModel {
    solver: Solver,
    tag: ConstraintTag,
    vars: Vec<(String, DomainId, i32, i32)>,
    aux: usize,
}

impl Default for CpModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CpModel {
    pub fn new() -> Self {
        let mut solver = Solver::default();
        let tag = solver.new_constraint_tag();
        CpModel { solver, tag, vars: Vec::new(), aux: 0 }
    }

    pub fn new_int<S: Into<String>>(&mut self, name: S, lb: i32, ub: i32) -> DomainId {
        let v = self.solver.new_bounded_integer(lb, ub);
        self.vars.push((name.into(), v, lb, ub));
        v
    }

    pub fn new_bool<S: Into<String>>(&mut self, name: S) -> DomainId {
        self.new_int(name, 0, 1)
    }

    pub(crate) fn new_aux_bool(&mut self) -> DomainId {
        self.aux += 1;
        self.new_int(format!("aux_{}", self.aux), 0, 1)
    }

    fn bounds_of(&self, var: DomainId) -> (i64, i64) {
        self.vars
            .iter()
            .find(|(_, v, _, _)| *v == var)
            .map(|(_, _, lb, ub)| (*lb as i64, *ub as i64))
            .expect("variable was not created by this model")
    }

    fn expr_bounds(&self, expr: &LinearExpr) -> (i64, i64) {
        let mut min = expr.offset as i64;
        let mut max = expr.offset as i64;
        for &(c, v) in &expr.terms {
            let (lb, ub) = self.bounds_of(v);
            let (a, b) = (c as i64 * lb, c as i64 * ub);
            min += a.min(b);
            max += a.max(b);
        }
        (min, max)
    }

    /// expr == rhs
    pub fn add_eq(&mut self, expr: &LinearExpr, rhs: i32) {
        self.solver
            .add_constraint(constraints::equals(expr.views(), rhs - expr.offset, self.tag))
            .post();
    }

    /// expr <= rhs
    pub fn add_le(&mut self, expr: &LinearExpr, rhs: i32) {
        self.solver
            .add_constraint(constraints::less_than_or_equals(
                expr.views(),
                rhs - expr.offset,
                self.tag,
            ))
            .post();
    }

    /// expr >= rhs
    pub fn add_ge(&mut self, expr: &LinearExpr, rhs: i32) {
        let negated = expr.negated();
        self.add_le(&negated, -rhs);
    }

    /// sum(vars) == k
    pub fn exactly(&mut self, vars: &[DomainId], k: i32) {
        self.add_eq(&LinearExpr::sum(vars), k);
    }

    /// A clause over 0/1 variables: at least one of `pos` is 1 or at least
    /// one of `neg` is 0.
    pub fn add_clause(&mut self, pos: &[DomainId], neg: &[DomainId]) {
        let mut e = LinearExpr::sum(pos);
        for v in neg {
            e = e + (LinearExpr::constant(1) - LinearExpr::var(*v));
        }
        self.add_ge(&e, 1);
    }

    /// Posts `lo <= expr <= hi`, skipping sides that the variable bounds
    /// already imply. With `when`, the bounds only apply if the 0/1
    /// variable is 1 (encoded against the expression's own range, so the
    /// constraint is vacuous when the variable is 0).
    fn post_interval(&mut self, expr: &LinearExpr, lo: i64, hi: i64, when: Option<DomainId>) {
        let (emin, emax) = self.expr_bounds(expr);
        if hi < emax {
            match when {
                None => self.add_le(expr, clamp_i32(hi)),
                Some(b) => {
                    let slack = emax - hi;
                    let mut guarded = expr.clone();
                    guarded.push_term(clamp_i32(slack), b);
                    self.add_le(&guarded, clamp_i32(hi + slack));
                }
            }
        }
        if lo > emin {
            match when {
                None => self.add_ge(expr, clamp_i32(lo)),
                Some(b) => {
                    let slack = lo - emin;
                    let mut guarded = expr.clone();
                    guarded.push_term(clamp_i32(-slack), b);
                    self.add_ge(&guarded, clamp_i32(lo - slack));
                }
            }
        }
    }

    /// Requires the expression to take a value in the domain, always or
    /// (with `when`) whenever the given 0/1 variable is 1. Multi-interval
    /// domains introduce one selector variable per interval.
    pub fn require_in(&mut self, expr: &LinearExpr, domain: &Domain, when: Option<DomainId>) {
        let intervals = domain.intervals().to_vec();
        match intervals.as_slice() {
            [] => match when {
                Some(b) => self.add_eq(&LinearExpr::var(b), 0),
                None => {
                    let z = self.new_aux_bool();
                    self.add_eq(&LinearExpr::var(z), 0);
                    self.add_eq(&LinearExpr::var(z), 1);
                }
            },
            [(lo, hi)] => self.post_interval(expr, *lo, *hi, when),
            _ => {
                let mut selectors = Vec::new();
                for &(lo, hi) in &intervals {
                    let s = self.new_aux_bool();
                    self.post_interval(expr, lo, hi, Some(s));
                    selectors.push(s);
                }
                let picked = LinearExpr::sum(&selectors);
                match when {
                    None => self.add_ge(&picked, 1),
                    Some(b) => self.add_ge(&(picked - LinearExpr::var(b)), 0),
                }
            }
        }
    }

    /// Runs the engine's exhaustive solution iteration and hands every
    /// assignment to the callback; the callback returns whether to keep
    /// going. All search and blocking is the engine's.
    pub fn for_each_solution<F>(&mut self, read: ReadBack<'_>, mut f: F)
    where
        F: FnMut(Assignment) -> bool,
    {
        let CpModel { solver, vars, .. } = self;
        let mut termination = Indefinite;
        let mut brancher = solver.default_brancher();
        let mut iterator = solver.get_solution_iterator(&mut brancher, &mut termination);
        loop {
            match iterator.next_solution() {
                IteratedSolution::Solution(solution, _, _) => {
                    let assignment = match read {
                        ReadBack::Model => Assignment::Named(
                            vars.iter()
                                .map(|(name, v, _, _)| {
                                    (name.clone(), solution.get_integer_value(*v))
                                })
                                .collect(),
                        ),
                        ReadBack::Vars(tree) => {
                            Assignment::Tree(resolve(tree, &|v| solution.get_integer_value(v)))
                        }
                    };
                    if !f(assignment) {
                        break;
                    }
                }
                IteratedSolution::Finished
                | IteratedSolution::Unknown
                | IteratedSolution::Unsatisfiable => break,
            }
        }
    }

    /// All feasible assignments, in engine order.
    pub fn all_solutions(&mut self, read: ReadBack<'_>) -> Vec<Assignment> {
        let mut out = Vec::new();
        self.for_each_solution(read, |a| {
            out.push(a);
            true
        });
        out
    }

    /// One feasible assignment, or None if the model is infeasible (or
    /// every assignment has already been returned).
    pub fn solve(&mut self, read: ReadBack<'_>) -> Option<Assignment> {
        let mut out = None;
        self.for_each_solution(read, |a| {
            out = Some(a);
            false
        });
        out
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(INT_MIN, INT_MAX) as i32
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_domain_flat_intervals() {
        let d = Domain::from_flat_intervals(&[1, 3, 5, 9]).unwrap();
        assert_eq!(d.intervals(), &[(1, 3), (5, 9)]);
        assert!(d.contains(2));
        assert!(!d.contains(4));
        assert!(d.contains(9));
        assert!(Domain::from_flat_intervals(&[1, 2, 3]).is_err());
        // Adjacent intervals merge.
        let d = Domain::from_flat_intervals(&[1, 3, 4, 6]).unwrap();
        assert_eq!(d.intervals(), &[(1, 6)]);
    }

    #[test]
    fn test_domain_complement() {
        let d = Domain::interval(2, 5);
        let c = d.complement();
        assert_eq!(c.intervals(), &[(INT_MIN, 1), (6, INT_MAX)]);
        assert_eq!(c.complement(), d);
        assert!(Domain::interval(5, 2).is_empty());
    }

    #[test]
    fn test_between_and_not_between_are_complementary() {
        let mut model = CpModel::new();
        let x = model.new_int("x", -50, 50);
        let e = LinearExpr::var(x);
        let (inside, outside) = match (
            is_between(e.clone(), -3, 4),
            is_not_between(e, -3, 4),
        ) {
            (Expr::Bounded(a), Expr::Bounded(b)) => (a, b),
            _ => panic!("expected bounded conditions"),
        };
        for v in -20..=20 {
            assert_ne!(
                inside.domain.contains(v),
                outside.domain.contains(v),
                "value {} must be in exactly one of the two domains",
                v,
            );
            assert_eq!(inside.domain.contains(v), (-3..=4).contains(&v));
        }
    }

    #[test]
    fn test_equals_rejects_unbounded_expression() {
        let mut model = CpModel::new();
        let x = model.new_int("x", 0, 9);
        let b = model.new_bool("b");
        let err = equals(b, &Expr::Linear(LinearExpr::var(x)), &mut model).unwrap_err();
        assert_eq!(err.to_string(), "expr must be a bounded linear expression");
    }

    #[test]
    fn test_all_solutions_named() {
        let mut model = CpModel::new();
        let x = model.new_int("x", 1, 2);
        let y = model.new_int("y", 1, 2);
        model.add_eq(&(LinearExpr::var(x) + LinearExpr::var(y)), 3);
        let mut seen: Vec<Vec<(String, i32)>> = model
            .all_solutions(ReadBack::Model)
            .into_iter()
            .map(|a| match a {
                Assignment::Named(pairs) => pairs,
                Assignment::Tree(_) => panic!("expected named read-back"),
            })
            .collect();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                vec![("x".to_string(), 1), ("y".to_string(), 2)],
                vec![("x".to_string(), 2), ("y".to_string(), 1)],
            ],
        );
    }

    #[test]
    fn test_require_in_split_domain() {
        let mut model = CpModel::new();
        let x = model.new_int("x", 0, 5);
        let domain = match is_not_between(LinearExpr::var(x), 1, 4) {
            Expr::Bounded(b) => b.domain,
            Expr::Linear(_) => unreachable!(),
        };
        model.require_in(&LinearExpr::var(x), &domain, None);
        let tree = VarTree::Int(x);
        let mut values: Vec<i32> = model
            .all_solutions(ReadBack::Vars(&tree))
            .into_iter()
            .map(|a| match a {
                Assignment::Tree(ValueTree::Int(v)) => v,
                other => panic!("unexpected read-back {:?}", other),
            })
            .collect();
        values.sort();
        assert_eq!(values, vec![0, 5]);
    }

    #[test]
    fn test_reified_equals_partitions_solutions() {
        let mut model = CpModel::new();
        let x = model.new_int("x", 0, 3);
        let b = model.new_bool("b");
        equals(b, &is_between(LinearExpr::var(x), 1, 2), &mut model).unwrap();
        let tree = VarTree::Seq(vec![VarTree::Int(x), VarTree::Bool(b)]);
        let mut pairs: Vec<(i32, bool)> = model
            .all_solutions(ReadBack::Vars(&tree))
            .into_iter()
            .map(|a| match a {
                Assignment::Tree(ValueTree::Seq(items)) => match items.as_slice() {
                    [ValueTree::Int(v), ValueTree::Bool(flag)] => (*v, *flag),
                    other => panic!("unexpected shape {:?}", other),
                },
                other => panic!("unexpected read-back {:?}", other),
            })
            .collect();
        pairs.sort();
        assert_eq!(pairs, vec![(0, false), (1, true), (2, true), (3, false)]);
    }

    #[test]
    fn test_var_tree_mirrors_shape() {
        let mut model = CpModel::new();
        let x = model.new_int("x", 2, 2);
        let b = model.new_bool("flag");
        model.add_eq(&LinearExpr::var(b), 1);
        let tree = VarTree::Map(vec![
            ("x".to_string(), VarTree::Int(x)),
            ("flags".to_string(), VarTree::Seq(vec![VarTree::Bool(b)])),
        ]);
        let got = model.solve(ReadBack::Vars(&tree)).unwrap();
        assert_eq!(
            got,
            Assignment::Tree(ValueTree::Map(vec![
                ("x".to_string(), ValueTree::Int(2)),
                (
                    "flags".to_string(),
                    ValueTree::Seq(vec![ValueTree::Bool(true)]),
                ),
            ])),
        );
    }
}
