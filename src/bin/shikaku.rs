use std::env;
use std::fs;

use color_eyre::eyre::{eyre, Result};
use pumpkin_solver::variables::DomainId;
use puzzle_kit::core::{Grid, Index};
use puzzle_kit::cp::{Assignment, CpModel, ReadBack, ValueTree, VarTree};
use puzzle_kit::scrape;

// Clue cells carry the area of the rectangle that must cover them; blank
// cells are 0. Same clipboard payload shape as number-link.
const SAMPLE_JSON: &str = r#"{
    "height": 4,
    "width": 4,
    "board": [
        [2, 6, 0, 0],
        [0, 0, 0, 0],
        [4, 0, 0, 0],
        [4, 0, 0, 0]
    ]
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    top: usize,
    left: usize,
    height: usize,
    width: usize,
}

impl Rect {
    fn contains(&self, index: Index) -> bool {
        (self.top..self.top + self.height).contains(&index[0])
            && (self.left..self.left + self.width).contains(&index[1])
    }
}

// All rectangles of the clue's area that contain the clue cell, fit the
// board, and cover no other clue.
fn candidates(board: &Grid, clue_at: Index, area: usize) -> Vec<Rect> {
    let (h, w) = (board.rows(), board.cols());
    let mut rects = Vec::new();
    for height in 1..=area.min(h) {
        if area % height != 0 {
            continue;
        }
        let width = area / height;
        if width > w {
            continue;
        }
        for top in 0..=h - height {
            for left in 0..=w - width {
                let rect = Rect { top, left, height, width };
                if !rect.contains(clue_at) {
                    continue;
                }
                let foreign_clue = board
                    .indices()
                    .any(|i| i != clue_at && board.get(i) > 0 && rect.contains(i));
                if !foreign_clue {
                    rects.push(rect);
                }
            }
        }
    }
    rects
}

fn build_model(board: &Grid) -> (CpModel, Vec<(usize, Rect, DomainId)>) {
    let mut model = CpModel::new();
    let mut choices: Vec<(usize, Rect, DomainId)> = Vec::new();
    let mut clue_no = 0;
    for index in board.indices() {
        let clue = board.get(index);
        if clue <= 0 {
            continue;
        }
        let rects = candidates(board, index, clue as usize);
        let vars: Vec<DomainId> = rects
            .iter()
            .enumerate()
            .map(|(i, _)| model.new_bool(format!("rect_{}_{}", clue_no, i)))
            .collect();
        // One rectangle per clue.
        model.exactly(&vars, 1);
        for (rect, var) in rects.into_iter().zip(vars) {
            choices.push((clue_no, rect, var));
        }
        clue_no += 1;
    }
    // Every cell covered exactly once.
    for index in board.indices() {
        let covering: Vec<DomainId> = choices
            .iter()
            .filter(|(_, rect, _)| rect.contains(index))
            .map(|(_, _, v)| *v)
            .collect();
        model.exactly(&covering, 1);
    }
    (model, choices)
}

fn solve(board: &Grid) -> Option<Vec<(usize, Rect)>> {
    let (mut model, choices) = build_model(board);
    let tree = VarTree::Seq(choices.iter().map(|(_, _, v)| VarTree::Bool(*v)).collect());
    let solution = model.solve(ReadBack::Vars(&tree))?;
    let values = match solution {
        Assignment::Tree(ValueTree::Seq(items)) => items,
        _ => return None,
    };
    Some(
        choices
            .iter()
            .zip(values)
            .filter(|(_, on)| *on == ValueTree::Bool(true))
            .map(|((clue_no, rect, _), _)| (*clue_no, *rect))
            .collect(),
    )
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let json = match env::args().nth(1) {
        Some(path) => fs::read_to_string(path)?,
        None => SAMPLE_JSON.to_string(),
    };
    let board = scrape::number_link(&json)?;
    println!("{:?}", board);
    let rects = solve(&board).ok_or_else(|| eyre!("board has no rectangle cover"))?;
    for r in 0..board.rows() {
        for c in 0..board.cols() {
            let owner = rects
                .iter()
                .find(|(_, rect)| rect.contains([r, c]))
                .map(|(clue_no, _)| *clue_no)
                .expect("every cell is covered exactly once");
            print!("{}", (b'a' + (owner % 26) as u8) as char);
        }
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_candidates_avoid_other_clues() {
        let board = scrape::number_link(SAMPLE_JSON).unwrap();
        for rect in candidates(&board, [0, 0], 2) {
            assert!(rect.contains([0, 0]));
            assert!(!rect.contains([0, 1]));
        }
    }

    #[test]
    fn test_sample_board_partitions() {
        let board = scrape::number_link(SAMPLE_JSON).unwrap();
        let rects = solve(&board).unwrap();
        assert_eq!(rects.len(), 4);
        for index in board.indices() {
            let covers = rects.iter().filter(|(_, r)| r.contains(index)).count();
            assert_eq!(covers, 1);
        }
        // Areas match the clues.
        let mut areas: Vec<usize> = rects
            .iter()
            .map(|(_, r)| r.height * r.width)
            .collect();
        areas.sort();
        assert_eq!(areas, vec![2, 4, 4, 6]);
    }
}
