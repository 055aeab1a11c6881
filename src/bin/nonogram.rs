use std::env;
use std::fs;

use color_eyre::eyre::{eyre, Result};
use plotters::prelude::{BitMapBackend, IntoDrawingArea};
use pumpkin_solver::variables::DomainId;
use puzzle_kit::core::Clues;
use puzzle_kit::cp::{
    equals, is_between, Assignment, CpModel, LinearExpr, ReadBack, ValueTree, VarTree,
};
use puzzle_kit::plot::nonogram_picture;
use puzzle_kit::scrape;

// Clue sections saved from the puzzle page; taskTop carries the column
// groups, taskLeft the row groups. The fallback is a 5x5 heart.
const SAMPLE_HTML: &str = concat!(
    r#"<div id="taskTop">"#,
    r#"<div class="task-group"><div class="task-cell">2</div></div>"#,
    r#"<div class="task-group"><div class="task-cell">4</div></div>"#,
    r#"<div class="task-group"><div class="task-cell">4</div></div>"#,
    r#"<div class="task-group"><div class="task-cell">4</div></div>"#,
    r#"<div class="task-group"><div class="task-cell">2</div></div>"#,
    r#"</div>"#,
    r#"<div id="taskLeft">"#,
    r#"<div class="task-group"><div class="task-cell">1</div><div class="task-cell">1</div></div>"#,
    r#"<div class="task-group"><div class="task-cell">5</div></div>"#,
    r#"<div class="task-group"><div class="task-cell">5</div></div>"#,
    r#"<div class="task-group"><div class="task-cell">3</div></div>"#,
    r#"<div class="task-group"><div class="task-cell">1</div></div>"#,
    r#"</div>"#,
);

// For every line (a row or a column): one gap variable before each block
// and one after the last, interior gaps at least 1, all of it summing to
// the line length. A cell is filled iff some block's start interval covers
// it, which is exactly the reified is_between condition.
fn add_line(
    model: &mut CpModel,
    prefix: &str,
    index: usize,
    blocks: &[i32],
    length: usize,
    cells: &[DomainId],
) {
    if blocks.is_empty() {
        for &cell in cells {
            model.add_clause(&[], &[cell]);
        }
        return;
    }
    let mut gaps = Vec::new();
    for j in 0..=blocks.len() {
        let lb = if j == 0 || j == blocks.len() { 0 } else { 1 };
        gaps.push(model.new_int(
            format!("{}_gap_{}_{}", prefix, index, j),
            lb,
            length as i32,
        ));
    }
    let total: i32 = blocks.iter().sum();
    model.add_eq(&LinearExpr::sum(&gaps), length as i32 - total);
    for (k, &cell) in cells.iter().enumerate() {
        let mut covers = Vec::new();
        for (j, &block) in blocks.iter().enumerate() {
            // start of block j = gaps[0..=j] + blocks before j
            let before: i32 = blocks[..j].iter().sum();
            let start = LinearExpr::sum(&gaps[..=j]) + before;
            let b = model.new_bool(format!("{}_cover_{}_{}_{}", prefix, index, j, k));
            equals(b, &is_between(start, k as i32 - block + 1, k as i32), model)
                .expect("is_between always yields a bounded expression");
            covers.push(b);
        }
        model.add_clause(&covers, &[cell]);
        for &b in &covers {
            model.add_clause(&[cell], &[b]);
        }
    }
}

fn build_model(clues: &Clues) -> (CpModel, Vec<DomainId>) {
    let (h, w) = (clues.height(), clues.width());
    let mut model = CpModel::new();
    let cells: Vec<DomainId> = (0..h)
        .flat_map(|r| (0..w).map(move |c| (r, c)))
        .map(|(r, c)| model.new_bool(format!("cell_{}_{}", r, c)))
        .collect();
    for (r, blocks) in clues.rows.iter().enumerate() {
        let row: Vec<DomainId> = (0..w).map(|c| cells[r * w + c]).collect();
        add_line(&mut model, "row", r, blocks, w, &row);
    }
    for (c, blocks) in clues.cols.iter().enumerate() {
        let col: Vec<DomainId> = (0..h).map(|r| cells[r * w + c]).collect();
        add_line(&mut model, "col", c, blocks, h, &col);
    }
    (model, cells)
}

fn solve(clues: &Clues) -> Option<Vec<Vec<bool>>> {
    let (mut model, cells) = build_model(clues);
    let tree = VarTree::Seq(cells.iter().map(|v| VarTree::Bool(*v)).collect());
    let solution = model.solve(ReadBack::Vars(&tree))?;
    let values = match solution {
        Assignment::Tree(ValueTree::Seq(items)) => items,
        _ => return None,
    };
    let w = clues.width();
    let mut picture = vec![vec![false; w]; clues.height()];
    for (i, value) in values.iter().enumerate() {
        picture[i / w][i % w] = *value == ValueTree::Bool(true);
    }
    Some(picture)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let html = match env::args().nth(1) {
        Some(path) => fs::read_to_string(path)?,
        None => SAMPLE_HTML.to_string(),
    };
    let clues = scrape::nonogram(&html)?;
    let picture = solve(&clues).ok_or_else(|| eyre!("clues admit no picture"))?;
    for row in &picture {
        for &filled in row {
            print!("{}", if filled { "⬛" } else { "⬜" });
        }
        println!();
    }
    fs::create_dir_all("figures")?;
    let size = (
        40 * clues.width() as u32 + 40,
        40 * clues.height() as u32 + 40,
    );
    let area = BitMapBackend::new("figures/nonogram.png", size).into_drawing_area();
    nonogram_picture(&area, &clues, &picture).map_err(|e| eyre!("rendering failed: {}", e))?;
    area.present().map_err(|e| eyre!("rendering failed: {}", e))?;
    println!("wrote figures/nonogram.png");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_heart_sample() {
        let clues = scrape::nonogram(SAMPLE_HTML).unwrap();
        let picture = solve(&clues).unwrap();
        let expected = [
            ".X.X.",
            "XXXXX",
            "XXXXX",
            ".XXX.",
            "..X..",
        ];
        for (row, want) in picture.iter().zip(expected) {
            let got: String = row
                .iter()
                .map(|&filled| if filled { 'X' } else { '.' })
                .collect();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn test_empty_line_clears_cells() {
        let clues = Clues {
            rows: vec![vec![1], vec![]],
            cols: vec![vec![1], vec![]],
        };
        let picture = solve(&clues).unwrap();
        assert_eq!(picture, vec![vec![true, false], vec![false, false]]);
    }
}
