// ==================== Imports ====================
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

#[macro_use]
mod browser;
mod engine;
mod game;

use game::{CatJourney, CoinChase, HostCommand, ItemChoice};

// ==================== Main Functions ====================
/// Boot the arena variant : coins on a timer, monsters falling in.
/// The loop starts once assets are loaded; play begins on `start_game`.
#[wasm_bindgen]
pub fn boot_chase() -> Result<(), JsValue> {
    boot(CoinChase::new());
    Ok(())
}

/// Boot the side-scrolling variant.
#[wasm_bindgen]
pub fn boot_journey() -> Result<(), JsValue> {
    boot(CatJourney::new());
    Ok(())
}

fn boot(game: impl engine::Game + 'static) {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();

    // spawns a new asynchronous task in local thread, for web assembly
    // environment, using wasm_bindgen_futures
    browser::spawn_local(async move {
        if let Err(err) = engine::GameLoop::start(game).await {
            log!("Could not start game loop : {:#?}", err);
        }
    });
}

// ==================== Host Lifecycle ====================
// Button clicks and dialogue picks land here. Commands queue up and the
// next update drains them, so nothing mutates game state off-frame.

#[wasm_bindgen]
pub fn start_game() {
    game::push_host_command(HostCommand::Start);
}

#[wasm_bindgen]
pub fn choose_item(item: &str) {
    match ItemChoice::from_id(item) {
        Some(choice) => game::push_host_command(HostCommand::Choose(choice)),
        None => log!("Ignoring unknown dialogue item : {:#?}", item),
    }
}

#[wasm_bindgen]
pub fn restart_game() {
    game::push_host_command(HostCommand::Restart);
}
