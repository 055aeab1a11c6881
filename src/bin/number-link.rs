use std::collections::BTreeMap;
use std::env;
use std::fs;

use color_eyre::eyre::{eyre, Result};
use plotters::prelude::{BitMapBackend, IntoDrawingArea};
use pumpkin_solver::variables::DomainId;
use puzzle_kit::core::Grid;
use puzzle_kit::cp::{
    is_not_between, Assignment, CpModel, Domain, Expr, LinearExpr, ReadBack, ValueTree, VarTree,
};
use puzzle_kit::plot::{number_link_board, Link};
use puzzle_kit::scrape;

// Paste the clipboard payload into a file and pass its path; without one
// this small instance is solved instead.
const SAMPLE_JSON: &str = r#"{
    "height": 3,
    "width": 3,
    "board": [
        [1, 0, 2],
        [0, 0, 0],
        [1, 0, 2]
    ]
}"#;

struct NumberLinkModel {
    model: CpModel,
    cells: Vec<DomainId>,
    links: Vec<(Link, DomainId)>,
}

fn build_model(board: &Grid) -> NumberLinkModel {
    let (h, w) = (board.rows(), board.cols());
    let labels = board.indices().map(|i| board.get(i)).max().unwrap_or(0) as i32;
    let mut model = CpModel::new();
    let cells: Vec<DomainId> = board
        .indices()
        .map(|[r, c]| model.new_int(format!("cell_{}_{}", r, c), 1, labels.max(1)))
        .collect();
    let at = |r: usize, c: usize| r * w + c;
    for [r, c] in board.indices() {
        let clue = board.get([r, c]);
        if clue > 0 {
            model.add_eq(&LinearExpr::var(cells[at(r, c)]), clue as i32);
        }
    }
    // A selected segment joins equal labels; the reverse is not required,
    // so unlinked same-label neighbors stay legal.
    let mut links: Vec<(Link, DomainId)> = Vec::new();
    for [r, c] in board.indices() {
        for (r2, c2) in [(r + 1, c), (r, c + 1)] {
            if r2 >= h || c2 >= w {
                continue;
            }
            let link = model.new_bool(format!("link_{}_{}_{}_{}", r, c, r2, c2));
            let diff = LinearExpr::var(cells[at(r, c)]) - LinearExpr::var(cells[at(r2, c2)]);
            model.require_in(&diff, &Domain::interval(0, 0), Some(link));
            links.push(((r, c, r2, c2), link));
        }
    }
    // Endpoints have one segment, every other cell none or two.
    for [r, c] in board.indices() {
        let incident: Vec<DomainId> = links
            .iter()
            .filter(|((r1, c1, r2, c2), _)| (*r1, *c1) == (r, c) || (*r2, *c2) == (r, c))
            .map(|(_, v)| *v)
            .collect();
        let degree = LinearExpr::sum(&incident);
        if board.get([r, c]) > 0 {
            model.add_eq(&degree, 1);
        } else {
            let off_path = match is_not_between(degree.clone(), 1, 1) {
                Expr::Bounded(b) => b.domain,
                Expr::Linear(_) => unreachable!(),
            };
            model.require_in(&degree, &off_path, None);
        }
    }
    NumberLinkModel { model, cells, links }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let json = match env::args().nth(1) {
        Some(path) => fs::read_to_string(path)?,
        None => SAMPLE_JSON.to_string(),
    };
    let board = scrape::number_link(&json)?;
    println!("{:?}", board);
    let NumberLinkModel { mut model, cells, links } = build_model(&board);
    let tree = VarTree::Map(vec![
        (
            "cells".to_string(),
            VarTree::Seq(cells.iter().map(|v| VarTree::Int(*v)).collect()),
        ),
        (
            "links".to_string(),
            VarTree::Seq(links.iter().map(|(_, v)| VarTree::Bool(*v)).collect()),
        ),
    ]);
    let solution = model
        .solve(ReadBack::Vars(&tree))
        .ok_or_else(|| eyre!("board has no link routing"))?;
    let (cell_values, link_values) = match solution {
        Assignment::Tree(ValueTree::Map(entries)) => {
            let mut cell_values = Vec::new();
            let mut link_values = Vec::new();
            for (key, value) in entries {
                match (key.as_str(), value) {
                    ("cells", ValueTree::Seq(items)) => cell_values = items,
                    ("links", ValueTree::Seq(items)) => link_values = items,
                    _ => {}
                }
            }
            (cell_values, link_values)
        }
        other => return Err(eyre!("unexpected read-back {:?}", other)),
    };
    let mut labels = Grid::new(board.rows(), board.cols(), 0);
    for (index, value) in board.indices().zip(cell_values) {
        if let ValueTree::Int(v) = value {
            labels.set(index, v as i8);
        }
    }
    let selected: BTreeMap<Link, bool> = links
        .iter()
        .zip(link_values)
        .map(|((link, _), value)| (*link, value == ValueTree::Bool(true)))
        .collect();
    for (&(r1, c1, r2, c2), &on) in &selected {
        if on {
            println!("({}, {}) - ({}, {})", r1, c1, r2, c2);
        }
    }
    fs::create_dir_all("figures")?;
    let size = (
        60 * board.cols() as u32 + 40,
        60 * board.rows() as u32 + 40,
    );
    let area = BitMapBackend::new("figures/number-link.png", size).into_drawing_area();
    number_link_board(&area, &board, Some((&selected, &labels)))
        .map_err(|e| eyre!("rendering failed: {}", e))?;
    area.present().map_err(|e| eyre!("rendering failed: {}", e))?;
    println!("wrote figures/number-link.png");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sample_board_routes_all_pairs() {
        let board = scrape::number_link(SAMPLE_JSON).unwrap();
        let NumberLinkModel { mut model, cells: _, links } = build_model(&board);
        let tree = VarTree::Seq(links.iter().map(|(_, v)| VarTree::Bool(*v)).collect());
        let solution = model.solve(ReadBack::Vars(&tree)).unwrap();
        let values = match solution {
            Assignment::Tree(ValueTree::Seq(items)) => items,
            other => panic!("unexpected read-back {:?}", other),
        };
        // Each endpoint has exactly one selected segment.
        for [r, c] in board.indices() {
            if board.get([r, c]) <= 0 {
                continue;
            }
            let degree = links
                .iter()
                .zip(&values)
                .filter(|(((r1, c1, r2, c2), _), on)| {
                    ((*r1, *c1) == (r, c) || (*r2, *c2) == (r, c))
                        && **on == ValueTree::Bool(true)
                })
                .count();
            assert_eq!(degree, 1);
        }
    }

    #[test]
    fn test_blank_cell_degree_domain() {
        // The degree domain used for blank cells is the exact complement of
        // a one-segment degree.
        let off_path = match is_not_between(LinearExpr::constant(0), 1, 1) {
            Expr::Bounded(b) => b.domain,
            Expr::Linear(_) => unreachable!(),
        };
        for degree in 0..=4 {
            assert_eq!(off_path.contains(degree), degree != 1);
        }
    }
}
