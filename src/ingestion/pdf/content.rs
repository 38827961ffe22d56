//! Positioned text runs from a decoded page content stream.
//!
//! Tracks the text and line matrices through `BT`, `Tm`, `Td`, `TD`, `TL`, `T*` and `Tf`, and
//! records a [`TextRun`] for each `Tj`, `TJ`, `'` and `"`. Consecutive show operators with no
//! repositioning in between extend the same run. The graphics CTM (`cm`) is ignored: it moves
//! every run on a page alike, which does not change line grouping.

use lopdf::content::Operation;
use lopdf::Object;

use super::layout::TextRun;

/// `TJ` adjustment (thousandths of an em, negative = move right) treated as a word space.
const TJ_SPACE_ADJUSTMENT: f64 = -250.0;

const DEFAULT_FONT_SIZE: f64 = 12.0;

#[derive(Debug, Clone, Copy)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(self, tx: f64, ty: f64) -> Self {
        let [a, b, c, d, e, f] = self.0;
        Self([a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f])
    }

    fn vertical_scale(self) -> f64 {
        let [_, _, c, d, _, _] = self.0;
        (c * c + d * d).sqrt()
    }
}

#[derive(Debug)]
struct TextState {
    matrix: Matrix,
    line: Matrix,
    leading: f64,
    font_size: f64,
    /// The last run may still be extended by the next show operator.
    open: bool,
    runs: Vec<TextRun>,
}

impl TextState {
    fn new() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line: Matrix::IDENTITY,
            leading: 0.0,
            font_size: DEFAULT_FONT_SIZE,
            open: false,
            runs: Vec::new(),
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line = self.line.translate(tx, ty);
        self.matrix = self.line;
        self.open = false;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn show(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if self.open {
            if let Some(run) = self.runs.last_mut() {
                run.text.push_str(&text);
                return;
            }
        }
        let [_, _, _, _, x, y] = self.matrix.0;
        let size = self.font_size.abs() * self.matrix.vertical_scale();
        self.runs.push(TextRun::new(x, y, size, text));
        self.open = true;
    }
}

/// Interpret a page's content operations and return its text runs in stream order.
pub fn positioned_runs(operations: &[Operation]) -> Vec<TextRun> {
    let mut state = TextState::new();

    for op in operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                state.matrix = Matrix::IDENTITY;
                state.line = Matrix::IDENTITY;
                state.open = false;
            }
            "ET" => state.open = false,
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    state.leading = leading;
                }
            }
            "Tm" => {
                let values: Vec<f64> = operands.iter().filter_map(number).collect();
                if let Ok(m) = <[f64; 6]>::try_from(values) {
                    state.line = Matrix(m);
                    state.matrix = state.line;
                    state.open = false;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (operands.first().and_then(number), operands.get(1).and_then(number)) {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.move_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(text) = operands.first().and_then(string) {
                    state.show(text);
                }
            }
            "'" => {
                state.next_line();
                if let Some(text) = operands.first().and_then(string) {
                    state.show(text);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(text) = operands.get(2).and_then(string) {
                    state.show(text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    state.show(join_tj(items));
                }
            }
            _ => {}
        }
    }

    state.runs
}

fn join_tj(items: &[Object]) -> String {
    let mut text = String::new();
    for item in items {
        if let Some(part) = string(item) {
            text.push_str(&part);
        } else if number(item).is_some_and(|adj| adj <= TJ_SPACE_ADJUSTMENT) && !text.ends_with(' ') {
            text.push(' ');
        }
    }
    text
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Decode a string operand: UTF-16BE with a byte-order mark, otherwise one byte per character.
///
/// Font encodings and `ToUnicode` maps are not consulted, so composite-font text decodes poorly;
/// such pages fall back to the document's own text extraction.
fn string(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Some(String::from_utf16_lossy(&units))
        }
        None => Some(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}
