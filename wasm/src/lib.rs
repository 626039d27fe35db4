use minesweeper_ai as ms;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn create_game(height: u8, width: u8, mines: u8) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let game = ms::Game::new(
        height as usize,
        width as usize,
        mines as usize,
        &mut rand::rng(),
    )
    .map_err(|e| e.to_string())?;
    game.serialize().map_err(|e| e.to_string())
}

/// Lets the agent play one move. The game state is returned unchanged once
/// the game is over or no move is left.
#[wasm_bindgen]
pub fn step(bts: Vec<u8>) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = ms::Game::deserialize(&bts).map_err(|e| e.to_string())?;
    game.step(&mut rand::rng()).map_err(|e| e.to_string())?;
    game.serialize().map_err(|e| e.to_string())
}

/// A move imposed by the player, such as the opening click.
#[wasm_bindgen]
pub fn reveal(bts: Vec<u8>, row: usize, col: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = ms::Game::deserialize(&bts).map_err(|e| e.to_string())?;
    game.reveal(ms::Cell::new(row, col))
        .map_err(|e| e.to_string())?;
    game.serialize().map_err(|e| e.to_string())
}

/// Row-major tiles: -1 hidden, -2 flagged, otherwise the adjacent mine count.
#[wasm_bindgen]
pub fn get_tiles(bts: Vec<u8>) -> Result<Vec<i8>, String> {
    console_error_panic_hook::set_once();

    let game = ms::Game::deserialize(&bts).map_err(|e| e.to_string())?;
    Ok(game
        .tiles
        .into_iter()
        .flat_map(|row| {
            row.into_iter().map(|tile| match tile {
                ms::Tile::Hidden => -1,
                ms::Tile::Flagged => -2,
                ms::Tile::Revealed(n) => n as i8,
            })
        })
        .collect())
}

/// 0 playing, 1 won, 2 lost.
#[wasm_bindgen]
pub fn game_state(bts: Vec<u8>) -> Result<u8, String> {
    console_error_panic_hook::set_once();

    let game = ms::Game::deserialize(&bts).map_err(|e| e.to_string())?;
    Ok(match game.game_state {
        ms::GameState::Playing => 0,
        ms::GameState::Won => 1,
        ms::GameState::Lost => 2,
    })
}
