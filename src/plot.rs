use std::collections::BTreeMap;

use plotters::{chart::ChartBuilder, coord::Shift, element::{Circle, PathElement, Rectangle, Text}, prelude::{DrawResult, DrawingArea, DrawingBackend}, style::{Color, IntoFont, Palette, Palette99, RGBColor, ShapeStyle, BLACK, BLUE, GREEN, WHITE}};

use crate::circuit::Arc;
use crate::core::{Clues, Grid};

/// A number-link segment between two orthogonally adjacent cells,
/// (r1, c1, r2, c2).
pub type Link = (usize, usize, usize, usize);

const GRAY: RGBColor = RGBColor(160, 160, 160);

/// Draws a slither-link board: the candidate lattice in gray, clue digits
/// in the cells, and (when given) the solved circuit in green. Arcs are
/// keyed by corner index r * (cols + 1) + c, matching the circuit models
/// built over the board's corner lattice.
pub fn slither_link_board<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    board: &Grid,
    solution: Option<&BTreeMap<Arc, bool>>,
) -> DrawResult<(), DB> {
    area.fill(&WHITE)?;
    let (h, w) = (board.rows(), board.cols());
    let chart = ChartBuilder::on(area).margin(10).build_cartesian_2d(
        -0.5..w as f64 + 0.5,
        -0.5..h as f64 + 0.5,
    )?;
    let plotting = chart.plotting_area();
    // Corner (r, c) in plot coordinates, row 0 on top.
    let corner = |r: usize, c: usize| (c as f64, h as f64 - r as f64);
    let faint: ShapeStyle = GRAY.mix(0.5).stroke_width(1);
    for r in 0..=h {
        for c in 0..=w {
            if r < h {
                plotting.draw(&PathElement::new(vec![corner(r, c), corner(r + 1, c)], faint))?;
            }
            if c < w {
                plotting.draw(&PathElement::new(vec![corner(r, c), corner(r, c + 1)], faint))?;
            }
        }
    }
    if let Some(selected) = solution {
        let line: ShapeStyle = GREEN.stroke_width(3);
        for (&(a, b), &on) in selected {
            if !on || a == b {
                continue;
            }
            let ends = vec![corner(a / (w + 1), a % (w + 1)), corner(b / (w + 1), b % (w + 1))];
            plotting.draw(&PathElement::new(ends, line))?;
        }
    }
    let font = ("sans-serif", 18).into_font().color(&BLACK);
    for index in board.indices() {
        let v = board.get(index);
        if v >= 0 {
            let (x, y) = corner(index[0], index[1]);
            plotting.draw(&Text::new(format!("{}", v), (x + 0.38, y - 0.62), font.clone()))?;
        }
    }
    Ok(())
}

/// Draws a number-link board: a dot per cell, palette-colored badges on the
/// clue endpoints, and (when given) the solved link segments colored by the
/// label of the cells they join. `labels` is the solved per-cell label
/// grid the segment colors are taken from.
pub fn number_link_board<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    board: &Grid,
    solution: Option<(&BTreeMap<Link, bool>, &Grid)>,
) -> DrawResult<(), DB> {
    area.fill(&WHITE)?;
    let (h, w) = (board.rows(), board.cols());
    let chart = ChartBuilder::on(area).margin(10).build_cartesian_2d(
        -0.5..w as f64 - 0.5,
        -0.5..h as f64 - 0.5,
    )?;
    let plotting = chart.plotting_area();
    let center = |r: usize, c: usize| (c as f64, (h - 1 - r) as f64);
    if let Some((links, labels)) = solution {
        for (&(r1, c1, r2, c2), &on) in links {
            if !on {
                continue;
            }
            let label = labels.get([r1, c1]).max(0) as usize;
            let style: ShapeStyle = Palette99::pick(label).stroke_width(4);
            plotting.draw(&PathElement::new(vec![center(r1, c1), center(r2, c2)], style))?;
        }
    }
    for index in board.indices() {
        let (x, y) = center(index[0], index[1]);
        plotting.draw(&Circle::new((x, y), 3, BLUE.filled()))?;
    }
    let font = ("sans-serif", 16).into_font().color(&BLACK);
    for index in board.indices() {
        let v = board.get(index);
        if v > 0 {
            let (x, y) = center(index[0], index[1]);
            let badge = Palette99::pick(v as usize).mix(0.8).filled();
            plotting.draw(&Rectangle::new(
                [(x - 0.3, y - 0.3), (x + 0.3, y + 0.3)],
                badge,
            ))?;
            plotting.draw(&Text::new(format!("{}", v), (x - 0.1, y + 0.12), font.clone()))?;
        }
    }
    Ok(())
}

/// Draws a solved nonogram picture: filled cells black on white, with a
/// faint lattice. `cells[r][c]` says whether the cell is filled; the clue
/// lists only fix the drawing size.
pub fn nonogram_picture<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    clues: &Clues,
    cells: &[Vec<bool>],
) -> DrawResult<(), DB> {
    area.fill(&WHITE)?;
    let (h, w) = (clues.height(), clues.width());
    let chart = ChartBuilder::on(area).margin(10).build_cartesian_2d(
        0.0..w as f64,
        0.0..h as f64,
    )?;
    let plotting = chart.plotting_area();
    let faint: ShapeStyle = GRAY.mix(0.4).stroke_width(1);
    for (r, row) in cells.iter().enumerate().take(h) {
        for (c, &filled) in row.iter().enumerate().take(w) {
            let (x, y) = (c as f64, h as f64 - 1.0 - r as f64);
            let corners = [(x, y), (x + 1.0, y + 1.0)];
            if filled {
                plotting.draw(&Rectangle::new(corners, BLACK.filled()))?;
            }
            plotting.draw(&Rectangle::new(corners, faint))?;
        }
    }
    Ok(())
}
