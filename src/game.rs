use std::io;

use log::{debug, info};
use rand::Rng;

use crate::assets::Assets;
use crate::constants::*;
use crate::entities::{SkyItem, SkyRegistry, Spaceship};
use crate::environment::{darken, is_space, lighten, Sky, StarField};
use crate::rendering::RenderService;
use crate::types::{Color, Texture};

#[derive(thiserror::Error, Debug)]
pub enum GameError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Everything that changes from frame to frame.
pub struct World {
    pub frame_counter: u64,
    pub drawn_speed: f32,
    pub sky: Sky,
    pub stars: StarField,
    pub sky_items: SkyRegistry,
    pub ship: Spaceship,
}

impl World {
    pub fn new(assets: &Assets, rng: &mut impl Rng) -> Self {
        World {
            frame_counter: 0,
            drawn_speed: 0.0,
            sky: Sky::default(),
            stars: StarField::generate(rng),
            sky_items: SkyRegistry::default(),
            ship: Spaceship::new(&assets.spaceship_off),
        }
    }
}

pub struct Game<S: RenderService, R: Rng> {
    pub render: S,
    pub world: World,
    assets: Assets,
    rng: R,
}

impl<S: RenderService, R: Rng> Game<S, R> {
    pub fn new(render: S, assets: Assets, mut rng: R) -> Self {
        let world = World::new(&assets, &mut rng);
        Game { render, world, assets, rng }
    }

    pub fn run(&mut self) -> Result<(), GameError> {
        info!("Starting game loop.");
        while !self.render.window_should_close()? {
            self.tick()?;
        }
        info!(
            "Window close requested after {} frames ({} sky items).",
            self.world.frame_counter,
            self.world.sky_items.len()
        );
        self.render.close_window()?;
        Ok(())
    }

    fn ground_line(&self) -> i32 {
        SCREEN_HEIGHT - self.assets.spaceship_off.height
    }

    /// Runs one frame: input, physics, sky transition, then drawing.
    pub fn tick(&mut self) -> Result<(), GameError> {
        self.world.stars.update(self.world.ship.speed, &mut self.rng);

        self.render.begin_drawing();
        self.render.clear_background(self.world.sky.color());

        self.world.frame_counter += 1;

        let mut sprite = self.assets.spaceship_off;
        if self.render.is_ascend_down() {
            sprite = self.assets.spaceship;
            self.world.ship.accelerate();
        }
        self.world.ship.apply_gravity();

        let ground_line = self.ground_line();
        self.world.ship.land_if_grounded(ground_line);
        self.world.ship.integrate();

        self.draw_speed();

        let height_over_half = SCREEN_HEIGHT / 2 - self.assets.spaceship_off.height / 2;
        let ship_y = self.world.ship.y;
        let cloud_texture = self.assets.cloud;
        let cloud_vertical = if ship_y > height_over_half {
            self.draw_ground_view(sprite, ground_line);
            0
        } else {
            self.draw_flight_view(sprite, height_over_half);
            self.world.ship.speed as i32
        };

        let cloud = self
            .world
            .sky_items
            .get_or_insert_with(CLOUD_NAME, || SkyItem::new(CLOUD_NAME, CLOUD_START, cloud_texture));
        cloud.move_by(cloud_vertical, &mut self.rng);
        cloud.draw(&mut self.render);

        if is_space(self.world.sky) {
            self.world.stars.draw(&mut self.render);
        }

        self.render.end_drawing()?;
        Ok(())
    }

    /// Ship below the midpoint: the camera rests on the ground.
    fn draw_ground_view(&mut self, sprite: Texture, ground_line: i32) {
        let ship = &self.world.ship;
        self.render
            .draw_rectangle(0, SCREEN_HEIGHT - GROUND_HEIGHT, SCREEN_WIDTH, GROUND_HEIGHT, GROUND_COLOR);
        self.render.draw_texture(sprite, ship.x, ship.y, Color::WHITE);

        if ship.is_lifting_off(ground_line) {
            debug!("Lift-off at frame {}.", self.world.frame_counter);
            self.render.draw_texture(self.assets.dust_cloud, DUST_CLOUD_X, DUST_CLOUD_Y, Color::WHITE);
        }
    }

    /// Ship at or above the midpoint: the camera follows it and the sky reacts to its speed.
    fn draw_flight_view(&mut self, sprite: Texture, height_over_half: i32) {
        let ship = &self.world.ship;
        let ground_y = SCREEN_HEIGHT - (GROUND_HEIGHT + (ship.y - height_over_half));
        self.render.draw_rectangle(0, ground_y, SCREEN_WIDTH, GROUND_HEIGHT, GROUND_COLOR);
        self.render.draw_texture(sprite, ship.x, height_over_half, Color::WHITE);

        let was_space = is_space(self.world.sky);
        if ship.speed > 0.0 {
            self.world.sky = darken(self.world.sky);
        }
        if ship.speed < 0.0 {
            self.world.sky = lighten(self.world.sky);
        }
        match (was_space, is_space(self.world.sky)) {
            (false, true) => info!("Reached space at frame {}.", self.world.frame_counter),
            (true, false) => info!("Left space at frame {}.", self.world.frame_counter),
            _ => {}
        }
    }

    /// Absolute speed, refreshed every few frames, right-aligned at the top.
    fn draw_speed(&mut self) {
        if self.world.frame_counter % SPEED_REFRESH_INTERVAL == 0 {
            self.world.drawn_speed = self.world.ship.speed.abs();
        }
        let speed_text = (self.world.drawn_speed as i32).to_string();
        let text_width = self.render.measure_text(&speed_text, FONT_SIZE);
        let text_x = SCREEN_WIDTH - text_width - TEXT_MARGIN;
        let color = if is_space(self.world.sky) { Color::WHITE } else { Color::BLACK };
        self.render.draw_text(&speed_text, text_x, SPEED_TEXT_Y, FONT_SIZE, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::{DrawCall, RecordingWindow};
    use crate::terminal_io::SimulatedInput;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_game(input: SimulatedInput, max_frames: u64) -> Game<RecordingWindow, StdRng> {
        let mut window = RecordingWindow::new(input, max_frames);
        let assets = Assets {
            spaceship: window.texture(40, 60),
            spaceship_off: window.texture(40, 60),
            cloud: window.texture(30, 20),
            dust_cloud: window.texture(50, 30),
        };
        Game::new(window, assets, StdRng::seed_from_u64(42))
    }

    fn ground_line() -> i32 {
        SCREEN_HEIGHT - 60
    }

    fn text_calls(calls: &[DrawCall]) -> Vec<(String, i32, Color)> {
        calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Text { text, x, color, .. } => Some((text.clone(), *x, *color)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn resting_ship_stays_on_the_ground() {
        let mut game = new_game(SimulatedInput::idle(), 10);
        for _ in 0..10 {
            game.tick().expect("tick");
            assert_eq!(game.world.ship.y, ground_line());
            assert_eq!(game.world.ship.speed, 0.0);
        }
        assert_eq!(game.world.frame_counter, 10);
    }

    #[test]
    fn first_frame_draws_in_order() {
        let mut game = new_game(SimulatedInput::idle(), 1);
        game.tick().expect("tick");
        let calls = &game.render.calls;

        assert_eq!(calls[0], DrawCall::Clear(Sky::default().color()));
        assert!(matches!(calls[1], DrawCall::Text { .. }));
        assert_eq!(
            calls[2],
            DrawCall::Rectangle {
                x: 0,
                y: SCREEN_HEIGHT - GROUND_HEIGHT,
                width: SCREEN_WIDTH,
                height: GROUND_HEIGHT,
                color: GROUND_COLOR,
            }
        );
        assert_eq!(
            calls[3],
            DrawCall::Texture { texture: game.assets.spaceship_off, x: 205, y: ground_line() }
        );
        // Cloud created at its start position and nudged right by its speed.
        assert_eq!(calls[4], DrawCall::Texture { texture: game.assets.cloud, x: 51, y: 50 });
        assert_eq!(calls.len(), 5);
    }

    #[test]
    fn thrust_sprite_and_dust_cloud_on_lift_off() {
        let mut game = new_game(SimulatedInput::new([1]), 1);
        game.tick().expect("tick");
        let calls = &game.render.calls;

        assert!(calls.contains(&DrawCall::Texture { texture: game.assets.spaceship, x: 205, y: ground_line() }));
        assert!(calls.contains(&DrawCall::Texture {
            texture: game.assets.dust_cloud,
            x: DUST_CLOUD_X,
            y: DUST_CLOUD_Y,
        }));
    }

    #[test]
    fn holding_ascend_climbs_without_exceeding_max_speed() {
        let frames = 400;
        let mut game = new_game(SimulatedInput::new(1..=frames), frames);
        let mut last_y = game.world.ship.y;
        let mut rose = false;
        for _ in 0..frames {
            game.tick().expect("tick");
            let ship = &game.world.ship;
            assert!(ship.speed <= MAX_SPEED);
            assert!(ship.y <= last_y);
            rose |= ship.y < last_y;
            last_y = ship.y;
        }
        assert!(rose);
        // Thrust nets 0.05 per frame over gravity until the cap; gravity then
        // pulls one unit back off the capped speed each frame.
        assert!(game.world.ship.speed > MAX_SPEED - GRAVITY_DECREMENT - 0.1);
    }

    #[test]
    fn speed_readout_refreshes_every_fifth_frame() {
        let mut game = new_game(SimulatedInput::idle(), 5);
        game.world.ship = Spaceship { x: 205, y: 300, speed: -7.0 };
        for frame in 1..=5 {
            game.tick().expect("tick");
            let texts = text_calls(&game.render.calls);
            let expected = if frame < 5 { "0" } else { "12" };
            assert_eq!(texts[0].0, expected, "frame {}", frame);
        }
    }

    #[test]
    fn speed_readout_is_right_aligned_and_contrasts_with_sky() {
        let mut game = new_game(SimulatedInput::idle(), 1);
        game.tick().expect("tick");
        let (text, x, color) = text_calls(&game.render.calls).remove(0);
        assert_eq!(text, "0");
        assert_eq!(x, SCREEN_WIDTH - 12 - TEXT_MARGIN);
        assert_eq!(color, Color::BLACK);

        let mut game = new_game(SimulatedInput::idle(), 1);
        game.world.sky = Sky { r: 10, g: 10, b: 10, a: 255 };
        game.tick().expect("tick");
        assert_eq!(text_calls(&game.render.calls)[0].2, Color::WHITE);
    }

    #[test]
    fn climbing_above_midpoint_darkens_sky_and_pins_ship() {
        let mut game = new_game(SimulatedInput::idle(), 1);
        game.world.ship = Spaceship { x: 205, y: 200, speed: 6.0 };
        game.tick().expect("tick");

        // Gravity leaves speed 5: y moves 200 -> 195, sky darkens one step.
        assert_eq!(game.world.ship.y, 195);
        assert_eq!(game.world.sky, darken(Sky::default()));
        let midpoint = SCREEN_HEIGHT / 2 - 30;
        let calls = &game.render.calls;
        assert!(calls.contains(&DrawCall::Texture { texture: game.assets.spaceship_off, x: 205, y: midpoint }));
        assert!(calls.contains(&DrawCall::Rectangle {
            x: 0,
            y: SCREEN_HEIGHT - (GROUND_HEIGHT + (195 - midpoint)),
            width: SCREEN_WIDTH,
            height: GROUND_HEIGHT,
            color: GROUND_COLOR,
        }));
        // Cloud follows the ship's speed downwards.
        let cloud = game.world.sky_items.get(CLOUD_NAME).expect("cloud registered");
        assert_eq!(cloud.position.y, CLOUD_START.y + 5.0);
    }

    #[test]
    fn falling_above_midpoint_lightens_sky() {
        let mut game = new_game(SimulatedInput::idle(), 1);
        game.world.sky = Sky { r: 50, g: 50, b: 50, a: 255 };
        game.world.ship = Spaceship { x: 205, y: 100, speed: -3.0 };
        game.tick().expect("tick");
        assert_eq!(game.world.sky, Sky { r: 51, g: 51, b: 51, a: 255 });
    }

    #[test]
    fn ground_view_leaves_sky_untouched() {
        let mut game = new_game(SimulatedInput::idle(), 1);
        game.world.sky = Sky { r: 50, g: 50, b: 50, a: 255 };
        game.world.ship = Spaceship { x: 205, y: 600, speed: -3.0 };
        game.tick().expect("tick");
        assert_eq!(game.world.sky, Sky { r: 50, g: 50, b: 50, a: 255 });
    }

    #[test]
    fn stars_only_drawn_in_space() {
        let mut game = new_game(SimulatedInput::idle(), 2);
        game.tick().expect("tick");
        assert!(!game.render.calls.iter().any(|c| matches!(c, DrawCall::Pixel { .. })));

        game.world.sky = Sky { r: 0, g: 0, b: 0, a: 255 };
        game.tick().expect("tick");
        let pixels = game.render.calls.iter().filter(|c| matches!(c, DrawCall::Pixel { .. })).count();
        assert_eq!(pixels, STAR_COUNT);
    }

    #[test]
    fn cloud_is_registered_once() {
        let mut game = new_game(SimulatedInput::idle(), 3);
        for _ in 0..3 {
            game.tick().expect("tick");
        }
        assert_eq!(game.world.sky_items.len(), 1);
        let cloud = game.world.sky_items.get(CLOUD_NAME).expect("cloud registered");
        assert_eq!(cloud.position.x, CLOUD_START.x + 3.0 * CLOUD_SPEED);
    }

    #[test]
    fn run_stops_when_window_should_close() {
        let mut game = new_game(SimulatedInput::idle(), 3);
        game.run().expect("run");
        assert_eq!(game.world.frame_counter, 3);
        assert!(game.render.closed);
    }
}
