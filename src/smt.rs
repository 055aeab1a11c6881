use z3::ast::{Ast, Bool, Int};
use z3::{Context, Model, SatResult, Solver};

use crate::core::Error;

/// Evaluates an integer term in a model, with model completion.
pub fn eval_i64<'ctx>(model: &Model<'ctx>, term: &Int<'ctx>) -> Result<i64, Error> {
    model
        .eval(term, true)
        .and_then(|v| v.as_i64())
        .ok_or(Error::new_const("term has no integer value in the model"))
}

/// Colors the vertices 0..total of a graph given as an edge list so that
/// adjacent vertices differ, using colors 0..limit. Returns one color per
/// vertex.
pub fn color_graph(
    ctx: &Context,
    edges: &[(usize, usize)],
    total: usize,
    limit: i64,
) -> Result<Vec<i64>, Error> {
    let colors: Vec<Int> = (0..total)
        .map(|p| Int::new_const(ctx, format!("color_{}", p)))
        .collect();
    let solver = Solver::new(ctx);
    for &(a, b) in edges {
        solver.assert(&colors[a]._eq(&colors[b]).not());
    }
    let zero = Int::from_i64(ctx, 0);
    let max = Int::from_i64(ctx, limit);
    for color in &colors {
        solver.assert(&color.ge(&zero));
        solver.assert(&color.lt(&max));
    }
    if solver.check() != SatResult::Sat {
        return Err(Error::new_const("graph has no coloring within the limit"));
    }
    let model = solver
        .get_model()
        .ok_or(Error::new_const("solver produced no model"))?;
    colors.iter().map(|c| eval_i64(&model, c)).collect()
}

/// Asserts that at least one zero-arity declaration takes a different value
/// than in the solver's current model, so the next check moves on.
pub fn block_model(solver: &Solver<'_>) -> Result<(), Error> {
    let ctx = solver.get_context();
    let model = solver
        .get_model()
        .ok_or(Error::new_const("no model to block"))?;
    let mut changed = Vec::new();
    for decl in &model {
        if decl.arity() == 0 {
            let term = decl.apply(&[]);
            if let Some(value) = model.eval(&term, true) {
                changed.push(term._eq(&value).not());
            }
        }
    }
    let refs: Vec<&Bool> = changed.iter().collect();
    solver.assert(&Bool::or(ctx, &refs));
    Ok(())
}

/// Iterates every model of the solver's current assertions by blocking each
/// one as it is produced. The blocking assertions stay on the solver.
pub struct AllSolutions<'ctx, 's> {
    solver: &'s Solver<'ctx>,
}

pub fn all_solutions<'ctx, 's>(solver: &'s Solver<'ctx>) -> AllSolutions<'ctx, 's> {
    AllSolutions { solver }
}

impl<'ctx, 's> Iterator for AllSolutions<'ctx, 's> {
    type Item = Model<'ctx>;

    fn next(&mut self) -> Option<Model<'ctx>> {
        if self.solver.check() != SatResult::Sat {
            return None;
        }
        let model = self.solver.get_model()?;
        block_model(self.solver).ok()?;
        Some(model)
    }
}

/// Visits every model that is distinct on the given terms, using push/pop
/// to explore term-by-term instead of accumulating blocking clauses. The
/// solver's assertion stack is restored before returning.
pub fn all_smt<'ctx, F>(solver: &Solver<'ctx>, terms: &[Int<'ctx>], visit: &mut F) -> Result<(), Error>
where
    F: FnMut(&Model<'ctx>),
{
    if solver.check() != SatResult::Sat {
        return Ok(());
    }
    let model = solver
        .get_model()
        .ok_or(Error::new_const("solver produced no model"))?;
    visit(&model);
    let values: Vec<Int> = terms
        .iter()
        .map(|t| {
            model
                .eval(t, true)
                .ok_or(Error::new_const("term has no value in the model"))
        })
        .collect::<Result<_, _>>()?;
    for i in 0..terms.len() {
        solver.push();
        solver.assert(&terms[i]._eq(&values[i]).not());
        for j in 0..i {
            solver.assert(&terms[j]._eq(&values[j]));
        }
        let result = all_smt(solver, &terms[i..], visit);
        solver.pop(1);
        result?;
    }
    Ok(())
}
