use color_eyre::eyre::{eyre, Result};
use puzzle_kit::smt::{all_smt, color_graph};
use z3::ast::{Ast, Int};
use z3::{Config, Context, Solver};

// The Petersen graph: outer 5-cycle, inner pentagram, spokes.
const PETERSEN: [(usize, usize); 15] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (4, 0),
    (5, 7),
    (7, 9),
    (9, 6),
    (6, 8),
    (8, 5),
    (0, 5),
    (1, 6),
    (2, 7),
    (3, 8),
    (4, 9),
];

fn count_triangle_colorings(ctx: &Context, limit: i64) -> Result<usize> {
    let colors: Vec<Int> = (0..3)
        .map(|p| Int::new_const(ctx, format!("tri_{}", p)))
        .collect();
    let solver = Solver::new(ctx);
    for (a, b) in [(0, 1), (1, 2), (2, 0)] {
        solver.assert(&colors[a]._eq(&colors[b]).not());
    }
    for color in &colors {
        solver.assert(&color.ge(&Int::from_i64(ctx, 0)));
        solver.assert(&color.lt(&Int::from_i64(ctx, limit)));
    }
    let mut count = 0;
    all_smt(&solver, &colors, &mut |_| count += 1)
        .map_err(|e| eyre!("enumeration failed: {}", e))?;
    Ok(count)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let ctx = Context::new(&Config::new());
    let colors = color_graph(&ctx, &PETERSEN, 10, 3)?;
    println!("petersen 3-coloring: {:?}", colors);
    for &(a, b) in &PETERSEN {
        assert_ne!(colors[a], colors[b]);
    }
    let count = count_triangle_colorings(&ctx, 3)?;
    println!("triangle 3-colorings: {}", count);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use puzzle_kit::smt::{all_solutions, eval_i64};

    #[test]
    fn test_petersen_needs_three_colors() {
        let ctx = Context::new(&Config::new());
        assert!(color_graph(&ctx, &PETERSEN, 10, 2).is_err());
        let colors = color_graph(&ctx, &PETERSEN, 10, 3).unwrap();
        for &(a, b) in &PETERSEN {
            assert_ne!(colors[a], colors[b]);
        }
    }

    #[test]
    fn test_triangle_coloring_count() {
        let ctx = Context::new(&Config::new());
        // 3 colors on a triangle: 3! proper colorings.
        assert_eq!(count_triangle_colorings(&ctx, 3).unwrap(), 6);
    }

    #[test]
    fn test_all_solutions_matches_all_smt() {
        let ctx = Context::new(&Config::new());
        let x = Int::new_const(&ctx, "x");
        let solver = Solver::new(&ctx);
        solver.assert(&x.ge(&Int::from_i64(&ctx, 0)));
        solver.assert(&x.lt(&Int::from_i64(&ctx, 4)));
        let mut values: Vec<i64> = all_solutions(&solver)
            .map(|m| eval_i64(&m, &x).unwrap())
            .collect();
        values.sort();
        assert_eq!(values, vec![0, 1, 2, 3]);
    }
}
