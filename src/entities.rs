use std::collections::HashMap;

use log::{debug, info};
use rand::Rng;

use crate::constants::*;
use crate::rendering::RenderService;
use crate::types::{Color, Texture, Vector2D};

// --- Spaceship: fixed column, vertical speed in pixels per frame ---
#[derive(Debug, Clone, PartialEq)]
pub struct Spaceship {
    pub x: i32,
    pub y: i32,
    pub speed: f32,
}

impl Spaceship {
    /// Spawns centered horizontally, resting on the ground.
    pub fn new(sprite: &Texture) -> Self {
        Spaceship {
            x: SCREEN_WIDTH / 2 - sprite.width / 2,
            y: SCREEN_HEIGHT - sprite.height,
            speed: 0.0,
        }
    }

    pub fn accelerate(&mut self) {
        if self.speed < MAX_SPEED {
            self.speed = (self.speed + THRUST_INCREMENT).min(MAX_SPEED);
        }
    }

    pub fn apply_gravity(&mut self) {
        if self.speed > TERMINAL_VELOCITY {
            self.speed = (self.speed - GRAVITY_DECREMENT).max(TERMINAL_VELOCITY);
        }
    }

    pub fn land_if_grounded(&mut self, ground_line: i32) {
        if self.y >= ground_line && self.speed < 0.0 {
            self.y = ground_line;
            self.speed = 0.0;
        }
    }

    /// Positive speed moves up the screen.
    pub fn integrate(&mut self) {
        self.y -= self.speed as i32;
    }

    pub fn is_lifting_off(&self, ground_line: i32) -> bool {
        self.y == ground_line && self.speed > 0.0
    }
}

// --- SkyItem: decorative sprite that drifts and wraps around the screen ---
#[derive(Debug, Clone, PartialEq)]
pub struct SkyItem {
    pub name: String,
    pub position: Vector2D,
    pub texture: Texture,
    pub speed: f32,
}

impl SkyItem {
    pub fn new(name: &str, position: Vector2D, texture: Texture) -> Self {
        info!("Creating sky item '{}' at ({}, {}).", name, position.x, position.y);
        SkyItem {
            name: name.to_string(),
            position,
            texture,
            speed: CLOUD_SPEED,
        }
    }

    /// Horizontal drift uses the item's own speed; vertical motion follows the
    /// ship. Leaving through the top or bottom re-scatters the item horizontally.
    pub fn move_by(&mut self, vertical_speed: i32, rng: &mut impl Rng) {
        let width = self.texture.width as f32;
        let height = self.texture.height as f32;

        self.position.x += self.speed;
        if self.position.x > SCREEN_WIDTH as f32 {
            self.position.x = -width;
        } else if self.position.x < -width {
            self.position.x = SCREEN_WIDTH as f32;
        }

        self.position.y += vertical_speed as f32;
        if self.position.y > SCREEN_HEIGHT as f32 {
            self.position.y = -height;
            self.position.x = rng.gen_range(0..=SCREEN_WIDTH) as f32;
            debug!("Sky item '{}' left the bottom, re-scattered to x={}.", self.name, self.position.x);
        } else if self.position.y < -height {
            self.position.y = SCREEN_HEIGHT as f32;
            self.position.x = rng.gen_range(0..=SCREEN_WIDTH) as f32;
            debug!("Sky item '{}' left the top, re-scattered to x={}.", self.name, self.position.x);
        }
    }

    pub fn draw(&self, render: &mut impl RenderService) {
        render.draw_texture(
            self.texture,
            self.position.x.round() as i32,
            self.position.y.round() as i32,
            Color::WHITE,
        );
    }
}

/// Sky items keyed by name; an item is built at most once.
#[derive(Debug, Default)]
pub struct SkyRegistry {
    items: HashMap<String, SkyItem>,
}

impl SkyRegistry {
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&SkyItem> {
        self.items.get(name)
    }

    pub fn get_or_insert_with(&mut self, name: &str, make: impl FnOnce() -> SkyItem) -> &mut SkyItem {
        self.items.entry(name.to_string()).or_insert_with(make)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
