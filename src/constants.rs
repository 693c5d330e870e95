use crate::types::{Color, Vector2D};

// --- Window ---
pub const SCREEN_WIDTH: i32 = 450;
pub const SCREEN_HEIGHT: i32 = 800;
pub const WINDOW_TITLE: &str = "Bissen til Saturn";
pub const TARGET_FPS: u32 = 60;
pub const LOG_FILE: &str = "bissen-til-saturn.log";
pub const ASCEND_HOLD_WINDOW_MS: u64 = 700; // Longer than the X11 default auto-repeat delay (660 ms)

// --- Spaceship ---
pub const SHIP_SCALE: f32 = 0.05; // Sprites are scaled down to 5% of their source size
pub const MAX_SPEED: f32 = 20.0;
pub const TERMINAL_VELOCITY: f32 = -20.0;
pub const THRUST_INCREMENT: f32 = 1.05;
pub const GRAVITY_DECREMENT: f32 = 1.0;

// --- Sky ---
pub const SKY_R: u8 = 189;
pub const SKY_G: u8 = 245;
pub const SKY_B: u8 = 255;
pub const SKY_ALPHA: u8 = 255;
pub const SPACE_THRESHOLD: u8 = 100;

// --- Stars ---
pub const STAR_COUNT: usize = 100;
pub const STAR_SPEED: f32 = 1.0; // Pixels per frame

// --- Sky items ---
pub const CLOUD_NAME: &str = "cloud1";
pub const CLOUD_START: Vector2D = Vector2D { x: 50.0, y: 50.0 };
pub const CLOUD_SPEED: f32 = 0.5;
pub const CLOUD_SCALE: f32 = 0.1;

pub const DUST_CLOUD_SCALE: f32 = 0.10;
pub const DUST_CLOUD_X: i32 = SCREEN_WIDTH / 2 + 20;
pub const DUST_CLOUD_Y: i32 = SCREEN_HEIGHT - 50;

// --- Ground ---
pub const GROUND_HEIGHT: i32 = 70;
pub const GROUND_COLOR: Color = Color::new(52, 235, 131, 255); // #34eb83

// --- Speed readout ---
pub const SPEED_REFRESH_INTERVAL: u64 = 5; // Frames between readout refreshes
pub const FONT_SIZE: i32 = 20;
pub const TEXT_MARGIN: i32 = 10;
pub const SPEED_TEXT_Y: i32 = 10;

// --- Assets ---
pub const SPACESHIP_TEXTURE: &str = "/graphics/spaceship.png";
pub const SPACESHIP_OFF_TEXTURE: &str = "/graphics/spaceshipOff.png";
pub const CLOUD_TEXTURE: &str = "/graphics/cloud.png";
pub const DUST_CLOUD_TEXTURE: &str = "/graphics/dustCloud.png";
