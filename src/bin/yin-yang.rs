use std::env;
use std::fs;

use color_eyre::eyre::{eyre, Result};
use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context, SatResult, Solver};

// 'W' and 'B' are given stones, '.' is open. White is encoded as true.
const SAMPLE: &str = "B...\n\
                      .W..\n\
                      ..B.\n\
                      ...W\n";

struct Board<'ctx> {
    rows: usize,
    cols: usize,
    cells: Vec<Bool<'ctx>>,
}

impl<'ctx> Board<'ctx> {
    fn parse(ctx: &'ctx Context, text: &str) -> Result<Board<'ctx>> {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let rows = lines.len();
        let cols = lines.first().map_or(0, |l| l.trim().len());
        let mut cells = Vec::new();
        for (r, line) in lines.iter().enumerate() {
            let line = line.trim();
            if line.len() != cols {
                return Err(eyre!("ragged board line {:?}", line));
            }
            for (c, ch) in line.chars().enumerate() {
                match ch {
                    'W' => cells.push(Bool::from_bool(ctx, true)),
                    'B' => cells.push(Bool::from_bool(ctx, false)),
                    '.' => cells.push(Bool::new_const(ctx, format!("cell_{}_{}", r, c))),
                    other => return Err(eyre!("bad cell {:?}", other)),
                }
            }
        }
        Ok(Board { rows, cols, cells })
    }

    fn at(&self, r: usize, c: usize) -> &Bool<'ctx> {
        &self.cells[r * self.cols + c]
    }
}

// No 2x2 window may be a single color or a diagonal crisscross.
fn assert_windows(solver: &Solver<'_>, board: &Board<'_>) {
    let ctx = solver.get_context();
    for r in 0..board.rows - 1 {
        for c in 0..board.cols - 1 {
            let tl = board.at(r, c);
            let tr = board.at(r, c + 1);
            let bl = board.at(r + 1, c);
            let br = board.at(r + 1, c + 1);
            solver.assert(&Bool::and(ctx, &[tl, tr, bl, br]).not());
            solver.assert(&Bool::or(ctx, &[tl, tr, bl, br]));
            solver.assert(&Bool::and(ctx, &[tl, &tr.not(), &bl.not(), br]).not());
            solver.assert(&Bool::and(ctx, &[&tl.not(), tr, bl, &br.not()]).not());
        }
    }
}

// The colors along the border change at most twice, otherwise one of the
// two regions would be split.
fn assert_border(solver: &Solver<'_>, board: &Board<'_>) {
    let ctx = solver.get_context();
    let mut changes = Vec::new();
    let (h, w) = (board.rows, board.cols);
    for r in 0..h - 1 {
        changes.push(board.at(r, 0)._eq(board.at(r + 1, 0)).not());
        changes.push(board.at(r, w - 1)._eq(board.at(r + 1, w - 1)).not());
    }
    for c in 0..w - 1 {
        changes.push(board.at(0, c)._eq(board.at(0, c + 1)).not());
        changes.push(board.at(h - 1, c)._eq(board.at(h - 1, c + 1)).not());
    }
    let weighted: Vec<(&Bool, i32)> = changes.iter().map(|b| (b, 1)).collect();
    solver.assert(&Bool::pb_le(ctx, &weighted, 2));
}

// Every cell of the given color must reach the root given stone of that
// color through a strictly decreasing distance labelling.
fn assert_connected(solver: &Solver<'_>, board: &Board<'_>, color: bool) -> Result<()> {
    let ctx = solver.get_context();
    let root = board
        .cells
        .iter()
        .position(|cell| cell.as_bool() == Some(color))
        .ok_or_else(|| eyre!("no given {} stone", if color { "white" } else { "black" }))?;
    let zero = Int::from_u64(ctx, 0);
    let far = Int::from_u64(ctx, board.cells.len() as u64);
    let dists: Vec<Int> = (0..board.cells.len())
        .map(|i| Int::new_const(ctx, format!("dist_{}_{}", color, i)))
        .collect();
    for r in 0..board.rows {
        for c in 0..board.cols {
            let idx = r * board.cols + c;
            let dist = &dists[idx];
            if idx == root {
                solver.assert(&dist._eq(&zero));
                continue;
            }
            let mut closer = Vec::new();
            if r > 0 {
                closer.push(dist.gt(&dists[idx - board.cols]));
            }
            if r < board.rows - 1 {
                closer.push(dist.gt(&dists[idx + board.cols]));
            }
            if c > 0 {
                closer.push(dist.gt(&dists[idx - 1]));
            }
            if c < board.cols - 1 {
                closer.push(dist.gt(&dists[idx + 1]));
            }
            let closer: Vec<&Bool> = closer.iter().collect();
            let same_color = Bool::and(ctx, &[&Bool::or(ctx, &closer), &dist.lt(&far)]);
            let other_color = dist._eq(&far);
            solver.assert(
                &board.cells[idx]
                    ._eq(&board.cells[root])
                    .ite(&same_color, &other_color),
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let text = match env::args().nth(1) {
        Some(path) => fs::read_to_string(path)?,
        None => SAMPLE.to_string(),
    };
    let ctx = Context::new(&Config::new());
    let board = Board::parse(&ctx, &text)?;
    let solver = Solver::new(&ctx);
    assert_windows(&solver, &board);
    assert_border(&solver, &board);
    assert_connected(&solver, &board, false)?;
    assert_connected(&solver, &board, true)?;
    if solver.check() != SatResult::Sat {
        return Err(eyre!("board has no yin-yang fill"));
    }
    let model = solver.get_model().ok_or_else(|| eyre!("solver produced no model"))?;
    for r in 0..board.rows {
        for c in 0..board.cols {
            let white = model
                .eval(board.at(r, c), true)
                .and_then(|v| v.as_bool())
                .ok_or_else(|| eyre!("cell has no value in the model"))?;
            print!("{}", if white { "⚪" } else { "⚫" });
        }
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sample_fill_is_valid() {
        let ctx = Context::new(&Config::new());
        let board = Board::parse(&ctx, SAMPLE).unwrap();
        let solver = Solver::new(&ctx);
        assert_windows(&solver, &board);
        assert_border(&solver, &board);
        assert_connected(&solver, &board, false).unwrap();
        assert_connected(&solver, &board, true).unwrap();
        assert_eq!(solver.check(), SatResult::Sat);
        let model = solver.get_model().unwrap();
        let fill: Vec<bool> = board
            .cells
            .iter()
            .map(|cell| model.eval(cell, true).unwrap().as_bool().unwrap())
            .collect();
        // Givens survive.
        assert!(!fill[0]);
        assert!(fill[5]);
        // No monochrome 2x2 window.
        for r in 0..3 {
            for c in 0..3 {
                let window = [
                    fill[r * 4 + c],
                    fill[r * 4 + c + 1],
                    fill[(r + 1) * 4 + c],
                    fill[(r + 1) * 4 + c + 1],
                ];
                assert!(window.iter().any(|&w| w));
                assert!(window.iter().any(|&w| !w));
            }
        }
    }

    #[test]
    fn test_missing_color_given_is_an_error() {
        let ctx = Context::new(&Config::new());
        let board = Board::parse(&ctx, "B.\n..\n").unwrap();
        let solver = Solver::new(&ctx);
        assert!(assert_connected(&solver, &board, true).is_err());
    }
}
