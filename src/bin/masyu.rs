use std::collections::BTreeMap;
use std::env;
use std::fs;

use color_eyre::eyre::{eyre, Result};
use puzzle_kit::circuit::{trace_circuit, Arc, CircuitModel};

// '.' empty, 'W' white pearl (go straight, turn just before or after),
// 'B' black pearl (turn, go straight through both neighbors).
const SAMPLE: &str = "...\n\
                      WW.\n\
                      ...\n";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Board {
    rows: usize,
    cols: usize,
    pearls: Vec<char>,
}

fn parse(text: &str) -> Result<Board> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let rows = lines.len();
    let cols = lines.first().map_or(0, |l| l.trim().len());
    let mut pearls = Vec::new();
    for line in &lines {
        let line = line.trim();
        if line.len() != cols {
            return Err(eyre!("ragged board line {:?}", line));
        }
        for ch in line.chars() {
            match ch {
                '.' | 'W' | 'B' => pearls.push(ch),
                other => return Err(eyre!("bad cell {:?}", other)),
            }
        }
    }
    Ok(Board { rows, cols, pearls })
}

type Cell = (usize, usize);

const DIRS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

fn step(board: &Board, (r, c): Cell, (dr, dc): (isize, isize)) -> Option<Cell> {
    let r2 = r.checked_add_signed(dr)?;
    let c2 = c.checked_add_signed(dc)?;
    (r2 < board.rows && c2 < board.cols).then_some((r2, c2))
}

fn vertex(board: &Board, (r, c): Cell) -> usize {
    r * board.cols + c
}

fn pearl(board: &Board, cell: Cell) -> char {
    board.pearls[vertex(board, cell)]
}

fn candidate_arcs(board: &Board) -> Vec<Arc> {
    let mut arcs = Vec::new();
    for r in 0..board.rows {
        for c in 0..board.cols {
            let v = vertex(board, (r, c));
            // Pearls must lie on the loop, everything else may skip itself.
            if pearl(board, (r, c)) == '.' {
                arcs.push((v, v));
            }
            for dir in DIRS {
                if let Some(n) = step(board, (r, c), dir) {
                    arcs.push((v, vertex(board, n)));
                }
            }
        }
    }
    arcs
}

fn add_pearl_rules(model: &mut CircuitModel, board: &Board) {
    for r in 0..board.rows {
        for c in 0..board.cols {
            let kind = pearl(board, (r, c));
            if kind == '.' {
                continue;
            }
            let at = (r, c);
            let v = vertex(board, at);
            // No doubling back through a pearl.
            for dir in DIRS {
                if let Some(n) = step(board, at, dir) {
                    let nv = vertex(board, n);
                    let (into, out) = (
                        model.arc((nv, v)).unwrap(),
                        model.arc((v, nv)).unwrap(),
                    );
                    model.model_mut().add_clause(&[], &[into, out]);
                }
            }
            for in_dir in DIRS {
                let Some(from) = step(board, at, (-in_dir.0, -in_dir.1)) else {
                    continue;
                };
                let into = model.arc((vertex(board, from), v)).unwrap();
                for out_dir in DIRS {
                    if out_dir == (-in_dir.0, -in_dir.1) {
                        continue; // the u-turn, already banned
                    }
                    let Some(to) = step(board, at, out_dir) else {
                        continue;
                    };
                    let out = model.arc((v, vertex(board, to))).unwrap();
                    let straight = out_dir == in_dir;
                    match (kind, straight) {
                        // White pearls never turn on the pearl itself.
                        ('W', false) => {
                            model.model_mut().add_clause(&[], &[into, out]);
                        }
                        // ...but a straight passage must bend at one end:
                        // four collinear cells around the pearl are banned.
                        ('W', true) => {
                            let before = step(board, from, (-in_dir.0, -in_dir.1));
                            let after = step(board, to, out_dir);
                            if let (Some(before), Some(after)) = (before, after) {
                                let enter_straight = model
                                    .arc((vertex(board, before), vertex(board, from)))
                                    .unwrap();
                                let leave_straight = model
                                    .arc((vertex(board, to), vertex(board, after)))
                                    .unwrap();
                                model.model_mut().add_clause(
                                    &[],
                                    &[into, out, enter_straight, leave_straight],
                                );
                            }
                        }
                        // Black pearls always turn on the pearl...
                        ('B', true) => {
                            model.model_mut().add_clause(&[], &[into, out]);
                        }
                        ('B', false) => {}
                        _ => {}
                    }
                }
                // ...and each black leg runs straight through its neighbor.
                if kind == 'B' {
                    let out = model.arc((v, vertex(board, from))).unwrap();
                    match step(board, from, (-in_dir.0, -in_dir.1)) {
                        Some(beyond) => {
                            let enter_straight = model
                                .arc((vertex(board, beyond), vertex(board, from)))
                                .unwrap();
                            let leave_straight = model
                                .arc((vertex(board, from), vertex(board, beyond)))
                                .unwrap();
                            model.model_mut().add_clause(&[enter_straight], &[into]);
                            model.model_mut().add_clause(&[leave_straight], &[out]);
                        }
                        None => {
                            model.model_mut().add_clause(&[], &[into]);
                            model.model_mut().add_clause(&[], &[out]);
                        }
                    }
                }
            }
        }
    }
}

fn print_board(board: &Board, selected: &BTreeMap<Arc, bool>) {
    for r in 0..board.rows {
        for c in 0..board.cols {
            let v = vertex(board, (r, c));
            let on_loop = selected
                .iter()
                .any(|(&(a, b), &on)| on && a != b && (a == v || b == v));
            let mark = match pearl(board, (r, c)) {
                'W' => '○',
                'B' => '●',
                _ if on_loop => '+',
                _ => '·',
            };
            print!("{} ", mark);
        }
        println!();
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let text = match env::args().nth(1) {
        Some(path) => fs::read_to_string(path)?,
        None => SAMPLE.to_string(),
    };
    let board = parse(&text)?;
    let mut model = CircuitModel::new(&candidate_arcs(&board));
    add_pearl_rules(&mut model, &board);
    let selected = model
        .solve()
        .ok_or_else(|| eyre!("board has no pearl loop"))?;
    print_board(&board, &selected);
    let path: Vec<Cell> = trace_circuit(&selected, None)
        .into_iter()
        .map(|v| (v / board.cols, v % board.cols))
        .collect();
    println!("loop: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_board() {
        let board = parse(SAMPLE).unwrap();
        assert_eq!((board.rows, board.cols), (3, 3));
        assert_eq!(pearl(&board, (1, 0)), 'W');
        assert_eq!(pearl(&board, (1, 1)), 'W');
        assert!(parse("..\n.\n").is_err());
    }

    #[test]
    fn test_sample_loop_passes_straight_through_pearls() {
        let board = parse(SAMPLE).unwrap();
        let mut model = CircuitModel::new(&candidate_arcs(&board));
        add_pearl_rules(&mut model, &board);
        let selected = model.solve().unwrap();
        let path = trace_circuit(&selected, None);
        for (i, &v) in path.iter().enumerate() {
            let (r, c) = (v / board.cols, v % board.cols);
            if pearl(&board, (r, c)) != 'W' {
                continue;
            }
            let prev = path[(i + path.len() - 1) % path.len()];
            let next = path[(i + 1) % path.len()];
            let (pr, pc) = (prev / board.cols, prev % board.cols);
            let (nr, nc) = (next / board.cols, next % board.cols);
            // Straight through: the neighbors on the loop are collinear.
            assert!(pr == nr || pc == nc);
            assert!((pr, pc) != (nr, nc));
        }
    }
}
