//! Line and cell recovery from positioned text runs.
//!
//! A PDF page places each piece of text at an explicit position. Runs whose baselines are close
//! form one line (top to bottom); within a line, runs are ordered left to right and a horizontal
//! gap wider than [`CELL_GAP_EM`] starts a new cell.

/// Estimated glyph advance, as a fraction of the font size.
///
/// Widths are not read from font metrics, so run extents are approximate.
pub const AVG_GLYPH_EM: f64 = 0.5;

/// Gap (in font-size units) past the estimated end of a run that separates two cells.
pub const CELL_GAP_EM: f64 = 1.0;

/// Baseline distance (in font-size units) within which two runs share a line.
pub const LINE_TOLERANCE_EM: f64 = 0.35;

/// A piece of text shown at one position on a page (PDF user space, y grows upwards).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f64,
    pub y: f64,
    /// Effective font size (font size scaled by the text matrix).
    pub font_size: f64,
    pub text: String,
}

impl TextRun {
    pub fn new(x: f64, y: f64, font_size: f64, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            font_size,
            text: text.into(),
        }
    }

    fn size(&self) -> f64 {
        if self.font_size.is_finite() && self.font_size > 0.0 {
            self.font_size
        } else {
            1.0
        }
    }

    fn estimated_end(&self) -> f64 {
        self.x + self.text.chars().count() as f64 * self.size() * AVG_GLYPH_EM
    }
}

/// Group runs into lines of cells, top line first. Blank runs are ignored.
pub fn layout_lines(runs: &[TextRun]) -> Vec<Vec<String>> {
    let mut runs: Vec<&TextRun> = runs.iter().filter(|r| !r.text.trim().is_empty()).collect();
    runs.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<&TextRun>> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line) if (line[0].y - run.y).abs() <= line[0].size().max(run.size()) * LINE_TOLERANCE_EM => {
                line.push(run)
            }
            _ => lines.push(vec![run]),
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            split_cells(&line)
        })
        .collect()
}

fn split_cells(line: &[&TextRun]) -> Vec<String> {
    let mut cells: Vec<String> = Vec::new();
    let mut end = f64::NEG_INFINITY;
    for run in line {
        let text = run.text.trim();
        match cells.last_mut() {
            Some(cell) if run.x - end <= run.size() * CELL_GAP_EM => {
                cell.push(' ');
                cell.push_str(text);
            }
            _ => cells.push(text.to_string()),
        }
        end = end.max(run.estimated_end());
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::{layout_lines, TextRun};

    #[test]
    fn runs_on_one_baseline_split_on_wide_gaps() {
        let runs = vec![
            TextRun::new(250.0, 700.0, 12.0, "Qty"),
            TextRun::new(50.0, 700.0, 12.0, "Name"),
            TextRun::new(50.0, 685.0, 12.0, "Ada"),
            TextRun::new(250.0, 685.3, 12.0, "1"),
        ];
        assert_eq!(
            layout_lines(&runs),
            vec![vec!["Name".to_string(), "Qty".to_string()], vec!["Ada".to_string(), "1".to_string()]]
        );
    }

    #[test]
    fn close_runs_join_into_one_cell() {
        // "Ada" ends near x=68; "Lovelace" starts 4 units later
        let runs = vec![
            TextRun::new(50.0, 500.0, 12.0, "Ada"),
            TextRun::new(72.0, 500.0, 12.0, "Lovelace"),
            TextRun::new(300.0, 500.0, 12.0, "3"),
        ];
        assert_eq!(layout_lines(&runs), vec![vec!["Ada Lovelace".to_string(), "3".to_string()]]);
    }

    #[test]
    fn blank_runs_are_ignored() {
        let runs = vec![TextRun::new(0.0, 0.0, 12.0, "  "), TextRun::new(10.0, 10.0, 12.0, "x")];
        assert_eq!(layout_lines(&runs), vec![vec!["x".to_string()]]);
    }
}
