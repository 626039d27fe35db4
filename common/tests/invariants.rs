//! Property tests: whole games on random boards, checking the knowledge
//! base after every move.

use minesweeper_ai::{Agent, Board, Game, GameState};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn check_knowledge(agent: &Agent, board: &Board) -> Result<(), TestCaseError> {
    let mines = agent.known_mines();
    let safe = agent.known_safe();

    prop_assert!(mines.is_disjoint(safe), "a cell is both mine and safe");
    prop_assert!(agent.moves_made().is_subset(safe));

    for constraint in agent.constraints() {
        prop_assert!(!constraint.is_empty());
        prop_assert!(
            constraint.cells().is_disjoint(mines) && constraint.cells().is_disjoint(safe),
            "resolved cell left in {}",
            constraint
        );
        prop_assert!(constraint.count() > 0, "unresolved zero constraint {}", constraint);
        prop_assert!(
            constraint.count() < constraint.len(),
            "unresolved full constraint {}",
            constraint
        );
    }

    // Ground truth: no false positives either way
    for &cell in mines {
        prop_assert!(board.is_mine(cell), "{} flagged but not a mine", cell);
    }
    for &cell in safe {
        prop_assert!(!board.is_mine(cell), "{} marked safe but is a mine", cell);
    }

    Ok(())
}

fn board_params() -> impl Strategy<Value = (usize, usize, usize, u64)> {
    (1usize..=6, 1usize..=6)
        .prop_flat_map(|(height, width)| (Just(height), Just(width), 0..height * width, any::<u64>()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_knowledge_stays_sound((height, width, mines, seed) in board_params()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut game = Game::new(height, width, mines, &mut rng).unwrap();

        while game.game_state == GameState::Playing {
            let before = game.agent().clone();
            let first = before.pick_safe_move();
            prop_assert_eq!(before.pick_safe_move(), first);
            prop_assert_eq!(game.agent(), &before);

            if game.step(&mut rng).unwrap().is_none() {
                break;
            }
            check_knowledge(game.agent(), game.board())?;
        }

        game.audit().unwrap();
    }

    #[test]
    fn prop_full_reveal_is_audited((height, width, mines, seed) in board_params()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let board = Board::new(height, width, mines, &mut rng).unwrap();
        let mut game = Game::from_board(board.clone());

        for cell in board.cells().filter(|&cell| !board.is_mine(cell)) {
            if game.game_state != GameState::Playing {
                break;
            }
            prop_assert!(game.reveal(cell).unwrap());
            check_knowledge(game.agent(), &board)?;
        }

        prop_assert_eq!(game.game_state, GameState::Won);
        game.audit().unwrap();
    }
}
