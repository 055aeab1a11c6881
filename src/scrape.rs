use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde_derive::Deserialize;

use crate::core::{Clues, Error, Grid};

struct RawCell {
    top: i64,
    left: i64,
    label: Option<String>,
}

fn style_offset(style: &str, key: &str) -> Option<i64> {
    for part in style.split(';') {
        if let Some(rest) = part.trim().strip_prefix(key) {
            let rest = rest.trim_start_matches(':').trim();
            return rest.trim_end_matches("px").trim().parse().ok();
        }
    }
    None
}

/// Extracts a slither-link board from saved puzzle-loop.com HTML. Cells are
/// divs with a class starting `loop-task-cell`, positioned by `top`/`left`
/// pixel offsets in their style attribute. Blank cells become -1, labeled
/// cells their digit; rows and columns follow the pixel ordering.
pub fn slither_link(html: &str) -> Result<Grid, Error> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    let mut cells: Vec<RawCell> = Vec::new();
    let mut pending = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let mut class = None;
                let mut style = None;
                for attr in e.attributes() {
                    let attr =
                        attr.map_err(|e| Error::new(format!("malformed attribute: {}", e)))?;
                    match attr.key.as_ref() {
                        b"class" => class = Some(attr.value.into_owned()),
                        b"style" => style = Some(attr.value.into_owned()),
                        _ => {}
                    }
                }
                pending = false;
                if class.is_some_and(|c| c.starts_with(b"loop-task-cell")) {
                    let style = style
                        .map(|s| String::from_utf8_lossy(&s).into_owned())
                        .unwrap_or_default();
                    let (top, left) = match (
                        style_offset(&style, "top"),
                        style_offset(&style, "left"),
                    ) {
                        (Some(top), Some(left)) => (top, left),
                        _ => {
                            return Err(Error::new_const(
                                "task cell is missing top/left pixel offsets",
                            ));
                        }
                    };
                    cells.push(RawCell { top, left, label: None });
                    pending = true;
                }
            }
            Ok(Event::Text(t)) => {
                if pending {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::new(format!("malformed text: {}", e)))?;
                    if let Some(cell) = cells.last_mut() {
                        cell.label = Some(text.into_owned());
                    }
                }
            }
            Ok(Event::End(_)) => pending = false,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::new(format!("malformed html: {}", e))),
        }
    }
    if cells.is_empty() {
        return Err(Error::new_const("no task cells found"));
    }
    cells.sort_by_key(|c| (c.top, c.left));
    let mut rows: Vec<Vec<i8>> = Vec::new();
    let mut row_top = None;
    for cell in cells {
        let value = match &cell.label {
            None => -1,
            Some(s) if s.is_empty() => -1,
            Some(s) => s
                .parse()
                .map_err(|e| Error::new(format!("bad cell label {:?}: {}", s, e)))?,
        };
        if row_top != Some(cell.top) {
            row_top = Some(cell.top);
            rows.push(Vec::new());
        }
        rows.last_mut().unwrap().push(value);
    }
    Grid::from_rows(rows)
}

fn clue_groups(section: &str) -> Result<Vec<Vec<i32>>, Error> {
    let group_re = Regex::new(r#"(?s)<div class="task-group(.*?</div>)</div>"#)
        .map_err(|e| Error::new(format!("bad group pattern: {}", e)))?;
    let cell_re = Regex::new(r#"(?s)<div class="task-cell.*?>(.*?)</div>"#)
        .map_err(|e| Error::new(format!("bad cell pattern: {}", e)))?;
    let mut groups = Vec::new();
    for group in group_re.captures_iter(section) {
        let mut blocks = Vec::new();
        for cell in cell_re.captures_iter(&group[1]) {
            let text = cell[1].trim();
            let value: i32 = text
                .parse()
                .map_err(|e| Error::new(format!("bad clue {:?}: {}", text, e)))?;
            if value > 0 {
                blocks.push(value);
            }
        }
        groups.push(blocks);
    }
    Ok(groups)
}

/// Extracts nonogram clues from saved HTML of the task-cell markup family:
/// column clue groups follow the `taskTop` anchor, row clue groups the
/// `taskLeft` anchor. Zero placeholder cells are dropped.
pub fn nonogram(html: &str) -> Result<Clues, Error> {
    let top = html
        .find(r#"<div id="taskTop""#)
        .ok_or(Error::new_const("no taskTop section"))?;
    let left = top
        + html[top..]
            .find(r#"<div id="taskLeft""#)
            .ok_or(Error::new_const("no taskLeft section"))?;
    let cols = clue_groups(&html[top..left])?;
    let rows = clue_groups(&html[left..])?;
    if rows.is_empty() || cols.is_empty() {
        return Err(Error::new_const("empty clue sections"));
    }
    Ok(Clues { rows, cols })
}

#[derive(Debug, Deserialize)]
struct RawNumberLink {
    height: usize,
    width: usize,
    board: Vec<Vec<i8>>,
}

/// Extracts a number-link board from a clipboard JSON payload of the shape
/// `{"height": .., "width": .., "board": [[..], ..]}` with 0 for blank
/// cells and matching link labels on endpoint pairs.
pub fn number_link(json: &str) -> Result<Grid, Error> {
    let raw: RawNumberLink = serde_json::from_str(json)
        .map_err(|e| Error::new(format!("bad number-link payload: {}", e)))?;
    if raw.board.len() != raw.height {
        return Err(Error::new(format!(
            "payload says {} rows, board has {}",
            raw.height,
            raw.board.len(),
        )));
    }
    if raw.board.iter().any(|r| r.len() != raw.width) {
        return Err(Error::new(format!(
            "payload says {} columns, board disagrees",
            raw.width,
        )));
    }
    Grid::from_rows(raw.board)
}

#[cfg(test)]
mod test {
    use super::*;

    // Cells deliberately out of document order; the pixel offsets decide.
    const SLITHER_HTML: &str = r#"
        <div id="puzzle">
          <div class="loop-task-cell" style="top: 24px; left: 24px">0</div>
          <div class="loop-task-cell selectable" style="top: 4px; left: 4px">3</div>
          <div class="loop-task-cell" style="top: 4px; left: 44px">2</div>
          <div class="loop-task-cell" style="top: 4px; left: 24px"></div>
          <div class="loop-task-cell" style="top: 24px; left: 4px"></div>
          <div class="loop-task-cell" style="top: 24px; left: 44px">1</div>
        </div>"#;

    #[test]
    fn test_slither_link_extraction() {
        let board = slither_link(SLITHER_HTML).unwrap();
        assert_eq!(board.rows(), 2);
        assert_eq!(board.cols(), 3);
        assert_eq!(
            (0..2)
                .map(|r| (0..3).map(|c| board.get([r, c])).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
            vec![vec![3, -1, 2], vec![-1, 0, 1]],
        );
    }

    #[test]
    fn test_slither_link_rejects_junk() {
        assert!(slither_link("<div></div>").is_err());
        let missing_style = r#"<div class="loop-task-cell">1</div>"#;
        assert!(slither_link(missing_style).is_err());
    }

    const NONOGRAM_HTML: &str = concat!(
        r#"<div id="taskTop"><div class="task-group"><div class="task-cell">2</div></div>"#,
        r#"<div class="task-group"><div class="task-cell">0</div><div class="task-cell">1</div></div></div>"#,
        r#"<div id="taskLeft"><div class="task-group"><div class="task-cell">1</div><div class="task-cell">1</div></div>"#,
        r#"<div class="task-group"><div class="task-cell">1</div></div></div>"#,
    );

    #[test]
    fn test_nonogram_extraction() {
        let clues = nonogram(NONOGRAM_HTML).unwrap();
        assert_eq!(clues.cols, vec![vec![2], vec![1]]);
        assert_eq!(clues.rows, vec![vec![1, 1], vec![1]]);
        assert_eq!(clues.width(), 2);
        assert_eq!(clues.height(), 2);
    }

    #[test]
    fn test_nonogram_needs_anchors() {
        assert!(nonogram("<div id=\"taskTop\"></div>").is_err());
        assert!(nonogram("nothing here").is_err());
    }

    #[test]
    fn test_number_link_payload() {
        let board =
            number_link(r#"{"height": 2, "width": 2, "board": [[1, 0], [0, 1]]}"#).unwrap();
        assert_eq!(board.get([0, 0]), 1);
        assert_eq!(board.get([1, 0]), 0);
        assert!(number_link(r#"{"height": 3, "width": 2, "board": [[1, 0]]}"#).is_err());
        assert!(number_link("not json").is_err());
    }
}
