use std::collections::BTreeMap;
use std::env;
use std::fs;

use color_eyre::eyre::{eyre, Result};
use plotters::prelude::{BitMapBackend, IntoDrawingArea};
use puzzle_kit::circuit::{trace_circuit, Arc, CircuitModel};
use puzzle_kit::core::Grid;
use puzzle_kit::plot::slither_link_board;
use puzzle_kit::scrape;

// Board saved from https://ja.puzzle-loop.com; pass a file path to solve a
// board of your own.
const SAMPLE_HTML: &str = r#"
<div class="loop-task-cell" style="top: 4px; left: 4px">2</div>
<div class="loop-task-cell" style="top: 4px; left: 24px"></div>
<div class="loop-task-cell" style="top: 4px; left: 44px">1</div>
<div class="loop-task-cell" style="top: 24px; left: 4px"></div>
<div class="loop-task-cell" style="top: 24px; left: 24px">2</div>
<div class="loop-task-cell" style="top: 24px; left: 44px">1</div>
"#;

fn corner(r: usize, c: usize, cols: usize) -> usize {
    r * (cols + 1) + c
}

// Every corner may loop to itself (staying off the circuit); every lattice
// edge is a candidate in both directions.
fn candidate_arcs(board: &Grid) -> Vec<Arc> {
    let (h, w) = (board.rows(), board.cols());
    let mut arcs = Vec::new();
    for r in 0..=h {
        for c in 0..=w {
            let n = corner(r, c, w);
            arcs.push((n, n));
            if r < h {
                arcs.push((n, corner(r + 1, c, w)));
                arcs.push((corner(r + 1, c, w), n));
            }
            if c < w {
                arcs.push((n, corner(r, c + 1, w)));
                arcs.push((corner(r, c + 1, w), n));
            }
        }
    }
    arcs
}

// The four undirected cell sides, as corner pairs.
fn cell_sides(r: usize, c: usize, cols: usize) -> [(usize, usize); 4] {
    let (tl, tr) = (corner(r, c, cols), corner(r, c + 1, cols));
    let (bl, br) = (corner(r + 1, c, cols), corner(r + 1, c + 1, cols));
    [(tl, tr), (bl, br), (tl, bl), (tr, br)]
}

fn build_model(board: &Grid) -> CircuitModel {
    let mut model = CircuitModel::new(&candidate_arcs(board));
    for index in board.indices() {
        let clue = board.get(index);
        if clue < 0 {
            continue;
        }
        let mut sides = Vec::new();
        for (a, b) in cell_sides(index[0], index[1], board.cols()) {
            sides.push(model.arc((a, b)).unwrap());
            sides.push(model.arc((b, a)).unwrap());
        }
        model.model_mut().exactly(&sides, clue as i32);
    }
    model
}

fn on_loop(selected: &BTreeMap<Arc, bool>, a: usize, b: usize) -> bool {
    selected.get(&(a, b)).copied().unwrap_or(false)
        || selected.get(&(b, a)).copied().unwrap_or(false)
}

fn print_board(board: &Grid, selected: &BTreeMap<Arc, bool>) {
    let (h, w) = (board.rows(), board.cols());
    for r in 0..=h {
        for c in 0..w {
            let side = on_loop(selected, corner(r, c, w), corner(r, c + 1, w));
            print!("·{}", if side { "───" } else { "   " });
        }
        println!("·");
        if r == h {
            break;
        }
        for c in 0..=w {
            let side = on_loop(selected, corner(r, c, w), corner(r + 1, c, w));
            print!("{}", if side { "│" } else { " " });
            if c < w {
                let clue = board.get([r, c]);
                if clue >= 0 {
                    print!(" {} ", clue);
                } else {
                    print!("   ");
                }
            }
        }
        println!();
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let html = match env::args().nth(1) {
        Some(path) => fs::read_to_string(path)?,
        None => SAMPLE_HTML.to_string(),
    };
    let board = scrape::slither_link(&html)?;
    println!("{:?}", board);
    let mut model = build_model(&board);
    let selected = model
        .solve()
        .ok_or_else(|| eyre!("board has no single-loop solution"))?;
    print_board(&board, &selected);
    println!("loop: {:?}", trace_circuit(&selected, None));
    fs::create_dir_all("figures")?;
    let size = (
        80 * board.cols() as u32 + 40,
        80 * board.rows() as u32 + 40,
    );
    let area = BitMapBackend::new("figures/slither-link.png", size).into_drawing_area();
    slither_link_board(&area, &board, Some(&selected))
        .map_err(|e| eyre!("rendering failed: {}", e))?;
    area.present().map_err(|e| eyre!("rendering failed: {}", e))?;
    println!("wrote figures/slither-link.png");
    Ok(())
}
