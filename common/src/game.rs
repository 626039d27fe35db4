use crate::{Agent, Board, Cell, Move, Observation, audit};
use rand::Rng;
use std::fmt;
use tracing::{debug, info};

/// The visible state of a single cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Tile {
    Hidden,
    Revealed(u8), // The u8 is the number of adjacent mines.
    Flagged,
}

/// Represents the current state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// A board, the agent playing it, and everything the player can see.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Game {
    board: Board,
    agent: Agent,
    /// The visible state of the board, indexed `[row][col]`.
    pub tiles: Vec<Vec<Tile>>,
    pub game_state: GameState,
    /// Every count the agent has been told, in order.
    observations: Vec<Observation>,
}

impl Game {
    pub fn new<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> anyhow::Result<Self> {
        Ok(Self::from_board(Board::new(height, width, mines, rng)?))
    }

    pub fn from_board(board: Board) -> Self {
        Game {
            tiles: vec![vec![Tile::Hidden; board.width()]; board.height()],
            agent: Agent::new(board.height(), board.width()),
            board,
            game_state: GameState::Playing,
            observations: Vec::new(),
        }
    }

    pub fn deserialize(bts: &[u8]) -> anyhow::Result<Self> {
        Ok(bcs::from_bytes(bts)?)
    }

    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Lets the agent choose and play one move.
    ///
    /// Returns `None` when the game is over or nothing is left to play.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> anyhow::Result<Option<Move>> {
        if self.game_state != GameState::Playing {
            return Ok(None);
        }

        let Some(mv) = self.agent.next_move(rng) else {
            info!("no moves left to make");
            return Ok(None);
        };
        debug!(?mv, "agent move");

        self.reveal(mv.cell())?;
        Ok(Some(mv))
    }

    /// Reveals `at`, feeding the count to the agent.
    ///
    /// Returns `false` when a mine was hit. Revealing an already revealed
    /// cell does nothing.
    pub fn reveal(&mut self, at: Cell) -> anyhow::Result<bool> {
        if !self.board.in_bounds(at) {
            anyhow::bail!("cell {at} is outside the board");
        }
        if self.game_state != GameState::Playing {
            anyhow::bail!("game_ended");
        }
        if let Tile::Revealed(_) = self.tiles[at.row][at.col] {
            return Ok(true);
        }

        if self.board.is_mine(at) {
            info!(cell = %at, "hit a mine");
            self.game_state = GameState::Lost;
            return Ok(false);
        }

        let count = self.board.neighbor_mine_count(at);
        self.tiles[at.row][at.col] = Tile::Revealed(count);
        self.observations.push(Observation { cell: at, count });
        self.agent.observe(at, count)?;

        self.flag_known_mines();
        if self.check_win_condition() {
            info!(moves = self.observations.len(), "board cleared");
            self.game_state = GameState::Won;
        }

        Ok(true)
    }

    /// Won once every mine is flagged, or every safe cell is revealed.
    pub fn check_win_condition(&self) -> bool {
        let revealed = self
            .tiles
            .iter()
            .flatten()
            .filter(|tile| matches!(tile, Tile::Revealed(_)))
            .count();

        self.agent.known_mines() == self.board.mines()
            || revealed + self.board.mines().len() == self.board.height() * self.board.width()
    }

    /// Checks every deduction the agent has made against the observations.
    pub fn audit(&self) -> anyhow::Result<()> {
        audit(&self.agent, &self.observations)
    }

    fn flag_known_mines(&mut self) {
        for cell in self.agent.known_mines() {
            self.tiles[cell.row][cell.col] = Tile::Flagged;
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header
        write!(f, "   ")?;
        for col in 0..self.board.width() {
            write!(f, "{:^3}", col)?;
        }
        writeln!(f, "\n  +{}", "---".repeat(self.board.width()))?;

        // Rows
        for (row, tiles) in self.tiles.iter().enumerate() {
            write!(f, "{:^2}|", row)?;
            for tile in tiles {
                match tile {
                    Tile::Hidden => write!(f, " ■ ")?,
                    Tile::Flagged => write!(f, " F ")?,
                    Tile::Revealed(n) => write!(f, " {} ", n)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn c(row: usize, col: usize) -> Cell {
        Cell::new(row, col)
    }

    #[test]
    fn test_game_initialization() {
        let mut rng = StdRng::seed_from_u64(3);
        let game = Game::new(5, 4, 3, &mut rng).unwrap();

        assert_eq!(game.tiles.len(), 5);
        assert!(game.tiles.iter().all(|row| row.len() == 4));
        assert!(game.tiles.iter().flatten().all(|&tile| tile == Tile::Hidden));
        assert_eq!(game.game_state, GameState::Playing);
        assert_eq!(game.board().mines().len(), 3);
    }

    #[test]
    fn test_hitting_mine() {
        let board = Board::with_mines(3, 3, [c(0, 0)]).unwrap();
        let mut game = Game::from_board(board);

        assert!(!game.reveal(c(0, 0)).unwrap());
        assert_eq!(game.game_state, GameState::Lost);
        assert!(game.reveal(c(1, 1)).is_err());
    }

    #[test]
    fn test_reveal_feeds_the_agent() {
        let board = Board::with_mines(3, 3, [c(0, 0)]).unwrap();
        let mut game = Game::from_board(board);

        assert!(game.reveal(c(2, 2)).unwrap());
        assert_eq!(game.tiles[2][2], Tile::Revealed(0));
        assert!(game.agent().moves_made().contains(&c(2, 2)));
        assert_eq!(game.agent().known_safe().len(), 4);

        // Revealing twice is harmless
        assert!(game.reveal(c(2, 2)).unwrap());
        assert_eq!(game.observations().len(), 1);
    }

    #[test]
    fn test_agent_clears_board_without_guessing() {
        // X . .
        // . . .
        // . . .
        let board = Board::with_mines(3, 3, [c(0, 0)]).unwrap();
        let mut game = Game::from_board(board);
        let mut rng = StdRng::seed_from_u64(0);

        game.reveal(c(2, 2)).unwrap();
        while game.game_state == GameState::Playing {
            let mv = game.step(&mut rng).unwrap();
            assert!(matches!(mv, Some(Move::Safe(_))), "unexpected {mv:?}");
        }

        assert_eq!(game.game_state, GameState::Won);
        assert_eq!(game.tiles[0][0], Tile::Flagged);
        assert_eq!(game.agent().pick_safe_move(), None);
        game.audit().unwrap();
    }

    #[test]
    fn test_serialize_keeps_knowledge() {
        let board = Board::with_mines(4, 4, [c(0, 0), c(3, 3)]).unwrap();
        let mut game = Game::from_board(board);
        game.reveal(c(1, 1)).unwrap();
        game.reveal(c(2, 2)).unwrap();

        let restored = Game::deserialize(&game.serialize().unwrap()).unwrap();
        assert_eq!(restored.agent(), game.agent());
        assert_eq!(restored.tiles, game.tiles);
        assert_eq!(restored.observations(), game.observations());
    }

    #[test]
    fn test_display() {
        let board = Board::with_mines(2, 2, [c(0, 0)]).unwrap();
        let mut game = Game::from_board(board);
        game.reveal(c(1, 1)).unwrap();

        let rendered = game.to_string();
        assert!(rendered.contains(" ■ "));
        assert!(rendered.contains(" 1 "));
    }
}
