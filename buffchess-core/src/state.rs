//! Check, checkmate and stalemate detection

use serde::Serialize;

use crate::game::Game;
use crate::pieces::{Color, PieceId, PieceKind};

/// Result of asking whether the side to move can continue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum GameState {
    Ongoing,
    WhiteWins,
    BlackWins,
    Stalemate,
}

impl GameState {
    pub fn is_over(self) -> bool {
        self != GameState::Ongoing
    }

    /// Win for the opponent of `loser`
    fn win_against(loser: Color) -> Self {
        match loser {
            Color::White => GameState::BlackWins,
            Color::Black => GameState::WhiteWins,
        }
    }
}

impl Game {
    /// True if any king of `color` is attacked
    pub fn is_in_check(&self, color: Color) -> bool {
        self.board()
            .kings(color)
            .any(|king| self.king_in_check(king.id))
    }

    /// True if some active enemy piece can move onto this king's tile
    pub fn king_in_check(&self, king: PieceId) -> bool {
        let Some(piece) = self.piece(king).filter(|p| p.active && p.kind == PieceKind::King) else {
            return false;
        };
        let Some(at) = piece.tile else {
            return false;
        };
        let enemy = piece.color.opponent();
        self.board()
            .pieces_of(enemy)
            .any(|p| self.valid_tiles(p.id).contains(&at))
    }

    /// Whether `color`, about to move, has run out of moves
    ///
    /// A side with no moves loses if it is in check and stalemates
    /// otherwise. Moves that leave the mover's own king attacked still count.
    pub fn check_game_state(&self, color: Color) -> GameState {
        let can_move = self
            .board()
            .pieces_of(color)
            .any(|p| !self.valid_tiles(p.id).is_empty());
        if can_move {
            GameState::Ongoing
        } else if self.is_in_check(color) {
            GameState::win_against(color)
        } else {
            GameState::Stalemate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Coord;
    use crate::rules::MoveRule;

    fn c(s: &str) -> Coord {
        s.parse().unwrap()
    }

    fn game_with(pieces: &[(PieceKind, Color, &str)]) -> Game {
        let mut game = Game::new(8, 8).unwrap();
        for &(kind, color, at) in pieces {
            game.spawn_piece(kind, color, c(at), None).unwrap();
        }
        game
    }

    #[test]
    fn test_opening_is_ongoing() {
        let game = Game::standard().unwrap();
        assert_eq!(game.check_game_state(Color::White), GameState::Ongoing);
        assert!(!game.is_in_check(Color::White));
        assert!(!game.is_in_check(Color::Black));
    }

    #[test]
    fn test_rook_gives_check() {
        let game = game_with(&[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::Rook, Color::Black, "e8"),
        ]);
        assert!(game.is_in_check(Color::White));
        assert!(!game.is_in_check(Color::Black));
    }

    #[test]
    fn test_smothered_mate() {
        // Blockers that only step forward and never capture
        let mut game = game_with(&[
            (PieceKind::King, Color::White, "h1"),
            (PieceKind::Knight, Color::Black, "g3"),
            (PieceKind::Pawn, Color::Black, "h3"),
        ]);
        for at in ["g1", "g2", "h2"] {
            let rules = vec![MoveRule::step(0, 1).no_capture()];
            game.spawn_piece(PieceKind::Custom, Color::White, c(at), Some(rules))
                .unwrap();
        }
        assert!(game.is_in_check(Color::White));
        assert_eq!(game.check_game_state(Color::White), GameState::BlackWins);
    }

    #[test]
    fn test_stalemate_without_check() {
        let game = game_with(&[
            (PieceKind::Pawn, Color::White, "a4"),
            (PieceKind::Pawn, Color::Black, "a5"),
        ]);
        assert_eq!(game.check_game_state(Color::White), GameState::Stalemate);
        assert!(GameState::Stalemate.is_over());
    }

    #[test]
    fn test_kingless_side_is_never_in_check() {
        let game = game_with(&[(PieceKind::Queen, Color::Black, "d4")]);
        assert!(!game.is_in_check(Color::White));
        assert_eq!(game.check_game_state(Color::White), GameState::Stalemate);
    }
}
