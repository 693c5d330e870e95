mod assets;
mod constants;
mod entities;
mod environment;
mod game;
mod rendering;
mod terminal_io;
mod types;

use std::process;

use log::{error, info};

use crate::assets::Assets;
use crate::constants::*;
use crate::game::{Game, GameError};
use crate::rendering::{RenderService, TerminalWindow};

fn main() -> Result<(), GameError> {
    simple_logging::log_to_file(LOG_FILE, log::LevelFilter::Info)?;
    info!("Starting {}.", WINDOW_TITLE);

    let mut window = TerminalWindow::open(SCREEN_WIDTH, SCREEN_HEIGHT, WINDOW_TITLE)?;
    window.set_target_fps(TARGET_FPS);

    // Without every texture there is nothing to draw.
    let assets = match Assets::load(&mut window) {
        Ok(assets) => assets,
        Err(e) => {
            error!("{}. Exiting...", e);
            window.close_window()?;
            println!("{}. Exiting...", e);
            process::exit(1);
        }
    };

    let mut game = Game::new(window, assets, rand::thread_rng());
    game.run()
}
