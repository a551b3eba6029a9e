use minesweeper_kb as ms;
use wasm_bindgen::prelude::*;

fn load(bts: &[u8]) -> Result<ms::Session, String> {
    ms::Session::deserialize(bts).map_err(|e| e.to_string())
}

fn save(session: &ms::Session) -> Result<Vec<u8>, String> {
    session.serialize().map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn create_game(width: u8, height: u8, mines: u16, seed: u64) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let session = ms::Session::new(width as usize, height as usize, mines as usize, seed)
        .map_err(|e| e.to_string())?;
    save(&session)
}

#[wasm_bindgen]
pub fn validate(bts: Vec<u8>) -> Result<bool, String> {
    console_error_panic_hook::set_once();

    let session = load(&bts)?;
    Ok(session.game.check_win_condition())
}

/// Reveals a cell and feeds every opened clue to the knowledge base.
/// The last byte of the result is 0 if the move was safe and 1 on a mine.
#[wasm_bindgen]
pub fn choose_cell(bts: Vec<u8>, row: usize, col: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut session = load(&bts)?;
    let reveal = session
        .reveal(ms::Cell::new(row, col))
        .map_err(|e| e.to_string())?;

    let mut xs = save(&session)?;
    xs.push(if reveal == ms::Reveal::Exploded { 1 } else { 0 });
    Ok(xs)
}

/// A proven-safe cell as `[row, col]`, or empty when none is known.
#[wasm_bindgen]
pub fn hint(bts: Vec<u8>) -> Result<Vec<u32>, String> {
    console_error_panic_hook::set_once();

    let session = load(&bts)?;
    Ok(session
        .knowledge
        .safe_move()
        .map(|cell| vec![cell.row as u32, cell.col as u32])
        .unwrap_or_default())
}

/// Row-major tiles: the clue when open, -2 for a proven mine, -1 otherwise.
#[wasm_bindgen]
pub fn get_cells(bts: Vec<u8>) -> Result<Vec<i8>, String> {
    console_error_panic_hook::set_once();

    let ms::Session { game, knowledge } = load(&bts)?;
    Ok(game
        .board
        .into_iter()
        .enumerate()
        .flat_map(|(row, tiles)| {
            let knowledge = &knowledge;
            tiles.into_iter().enumerate().map(move |(col, tile)| match tile {
                ms::Tile::Revealed(n) => n as i8,
                ms::Tile::Hidden if knowledge.mines().contains(&ms::Cell::new(row, col)) => -2,
                ms::Tile::Hidden => -1,
            })
        })
        .collect())
}
