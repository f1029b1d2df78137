pub mod domain;
pub mod shared;

use wasm_bindgen::prelude::wasm_bindgen;

pub use shared::state::InventoryServices;

#[wasm_bindgen(start)]
pub fn start() {
    // initializes logging using the `log` crate
    _ = console_log::init_with_level(log::Level::Debug);
    console_error_panic_hook::set_once();
    log::info!("inventory consistency layer initialized");
}
