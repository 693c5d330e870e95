use rand::Rng;

use crate::constants::*;
use crate::rendering::RenderService;
use crate::types::{Color, Vector2D};

/// Background color that walks one unit per frame between the bright sky and black.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sky {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Sky {
    fn default() -> Self {
        Sky { r: SKY_R, g: SKY_G, b: SKY_B, a: SKY_ALPHA }
    }
}

impl Sky {
    pub fn color(&self) -> Color {
        Color::new(self.r, self.g, self.b, self.a)
    }
}

pub fn darken(sky: Sky) -> Sky {
    Sky {
        r: sky.r.saturating_sub(1),
        g: sky.g.saturating_sub(1),
        b: sky.b.saturating_sub(1),
        a: sky.a,
    }
}

pub fn lighten(sky: Sky) -> Sky {
    let step = |channel: u8, target: u8| if channel < target { channel + 1 } else { channel };
    Sky {
        r: step(sky.r, SKY_R),
        g: step(sky.g, SKY_G),
        b: step(sky.b, SKY_B),
        a: sky.a,
    }
}

pub fn is_space(sky: Sky) -> bool {
    sky.r < SPACE_THRESHOLD && sky.g < SPACE_THRESHOLD && sky.b < SPACE_THRESHOLD
}

pub struct StarField {
    pub stars: Vec<Vector2D>,
}

impl StarField {
    pub fn generate(rng: &mut impl Rng) -> Self {
        let stars = (0..STAR_COUNT)
            .map(|_| {
                let x = rng.gen_range(0..=SCREEN_WIDTH) as f32;
                let y = rng.gen_range(0..=SCREEN_HEIGHT) as f32;
                Vector2D::new(x, y)
            })
            .collect();
        StarField { stars }
    }

    /// Stars drift down while the ship climbs (or rests) and up while it falls.
    pub fn update(&mut self, ship_speed: f32, rng: &mut impl Rng) {
        let adjusted_speed = if ship_speed < 0.0 { -STAR_SPEED } else { STAR_SPEED };
        for star in &mut self.stars {
            star.y += adjusted_speed;
            if star.y > SCREEN_HEIGHT as f32 {
                star.y = 0.0;
                star.x = rng.gen_range(0..=SCREEN_WIDTH) as f32;
            } else if star.y < 0.0 {
                star.y = SCREEN_HEIGHT as f32;
                star.x = rng.gen_range(0..=SCREEN_WIDTH) as f32;
            }
        }
    }

    pub fn draw(&self, render: &mut impl RenderService) {
        for star in &self.stars {
            render.draw_pixel(star.x as i32, star.y as i32, Color::WHITE);
        }
    }
}
