//! Plain-text board rendering

use buffchess_core::{Board, Coord};

/// Board as text, rank `height` at the top, files labelled a.. along the bottom
///
/// Empty light squares are `.`, empty dark squares `:` and tiles holding a
/// buff are marked with `*`.
pub fn render_board(board: &Board) -> String {
    let mut out = String::new();
    for y in (0..board.height()).rev() {
        out.push_str(&format!("{:>2} ", y + 1));
        for x in 0..board.width() {
            let at = Coord::new(x, y);
            let symbol = match board.piece_at(at) {
                Some(piece) => piece.kind.symbol(piece.color),
                None if board.tile(at).is_some_and(|t| !t.buffs().is_empty()) => '*',
                None if at.is_white() => '.',
                None => ':',
            };
            out.push(' ');
            out.push(symbol);
        }
        out.push('\n');
    }
    out.push_str("   ");
    for x in 0..board.width() {
        out.push(' ');
        out.push(file_label(x));
    }
    out.push('\n');
    out
}

fn file_label(x: i32) -> char {
    char::from_u32('a' as u32 + x as u32).unwrap_or('?')
}
