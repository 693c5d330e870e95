use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen, SetTitle,
    },
    QueueableCommand,
};
use image::RgbaImage;
use log::{error, info};

use crate::terminal_io::KeyboardState;
use crate::types::{Color, Texture};

/// The window, drawing and input primitives a frame needs.
pub trait RenderService {
    fn set_target_fps(&mut self, fps: u32);
    fn window_should_close(&mut self) -> io::Result<bool>;
    fn begin_drawing(&mut self);
    fn end_drawing(&mut self) -> io::Result<()>;
    fn clear_background(&mut self, color: Color);
    fn draw_texture(&mut self, texture: Texture, x: i32, y: i32, tint: Color);
    fn draw_rectangle(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color);
    fn draw_pixel(&mut self, x: i32, y: i32, color: Color);
    fn draw_text(&mut self, text: &str, x: i32, y: i32, font_size: i32, color: Color);
    fn measure_text(&self, text: &str, font_size: i32) -> i32;
    fn is_ascend_down(&self) -> bool;
    /// Takes ownership of the decoded image; the CPU copy is released once uploaded.
    fn load_texture_from_image(&mut self, image: RgbaImage) -> Texture;
    fn close_window(&mut self) -> io::Result<()>;
}

// --- Bitmap font: 3x5 glyphs scaled by font_size / 5 ---
const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
const GLYPH_SPACING: i32 = 1;

fn glyph(ch: char) -> Option<[u8; 5]> {
    let rows = match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        _ => return None,
    };
    Some(rows)
}

fn glyph_scale(font_size: i32) -> i32 {
    (font_size / GLYPH_HEIGHT).max(1)
}

pub fn text_width(text: &str, font_size: i32) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        return 0;
    }
    let scale = glyph_scale(font_size);
    count * (GLYPH_WIDTH + GLYPH_SPACING) * scale - GLYPH_SPACING * scale
}

fn mul_channel(a: u8, b: u8) -> u8 {
    ((a as u16 * b as u16 + 127) / 255) as u8
}

// --- Canvas: RGBA software framebuffer ---
pub struct Canvas {
    width: i32,
    height: i32,
    pixels: Vec<Color>,
}

impl Canvas {
    pub fn new(width: i32, height: i32) -> Self {
        Canvas {
            width,
            height,
            pixels: vec![Color::BLACK; (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn idx(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    #[cfg(test)]
    pub fn get(&self, x: i32, y: i32) -> Option<Color> {
        self.idx(x, y).map(|i| self.pixels[i])
    }

    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(Color { a: 255, ..color });
    }

    pub fn blend_pixel(&mut self, x: i32, y: i32, src: Color) {
        let Some(i) = self.idx(x, y) else { return };
        let dst = self.pixels[i];
        let alpha = src.a as u16;
        let inverse = 255 - alpha;
        let mix = |s: u8, d: u8| ((s as u16 * alpha + d as u16 * inverse + 127) / 255) as u8;
        self.pixels[i] = Color::new(mix(src.r, dst.r), mix(src.g, dst.g), mix(src.b, dst.b), 255);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(width).min(self.width);
        let y1 = y.saturating_add(height).min(self.height);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color);
            }
        }
    }

    pub fn blit(&mut self, image: &RgbaImage, x: i32, y: i32, tint: Color) {
        let (width, height) = image.dimensions();
        for iy in 0..height {
            let py = y + iy as i32;
            if py < 0 || py >= self.height {
                continue;
            }
            for ix in 0..width {
                let px = x + ix as i32;
                if px < 0 || px >= self.width {
                    continue;
                }
                let [r, g, b, a] = image.get_pixel(ix, iy).0;
                let src = Color::new(
                    mul_channel(r, tint.r),
                    mul_channel(g, tint.g),
                    mul_channel(b, tint.b),
                    mul_channel(a, tint.a),
                );
                self.blend_pixel(px, py, src);
            }
        }
    }

    pub fn draw_text(&mut self, text: &str, x: i32, y: i32, font_size: i32, color: Color) {
        let scale = glyph_scale(font_size);
        let advance = (GLYPH_WIDTH + GLYPH_SPACING) * scale;
        for (i, ch) in text.chars().enumerate() {
            let Some(rows) = glyph(ch) else { continue };
            let gx = x + i as i32 * advance;
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                        self.fill_rect(gx + col * scale, y + row as i32 * scale, scale, scale, color);
                    }
                }
            }
        }
    }

    /// Averages the pixels in the block that differ from `background`, so thin
    /// details such as stars and text survive downsampling.
    pub fn sample(&self, x0: i32, y0: i32, x1: i32, y1: i32, background: Color) -> Color {
        let (mut r, mut g, mut b, mut count) = (0u32, 0u32, 0u32, 0u32);
        for y in y0.max(0)..y1.min(self.height) {
            for x in x0.max(0)..x1.min(self.width) {
                let pixel = self.pixels[(y * self.width + x) as usize];
                if pixel.r == background.r && pixel.g == background.g && pixel.b == background.b {
                    continue;
                }
                r += pixel.r as u32;
                g += pixel.g as u32;
                b += pixel.b as u32;
                count += 1;
            }
        }
        if count == 0 {
            return background;
        }
        Color::new((r / count) as u8, (g / count) as u8, (b / count) as u8, 255)
    }
}

// --- Layout: fits the canvas into the terminal using half-block cells ---
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub scale: f32,
    pub cols: u16,
    pub rows: u16,
    pub offset_x: u16,
}

impl Layout {
    /// An empty terminal yields an empty layout.
    pub fn fit(canvas_width: i32, canvas_height: i32, term_cols: u16, term_rows: u16) -> Self {
        if term_cols == 0 || term_rows == 0 || canvas_width <= 0 || canvas_height <= 0 {
            return Layout { scale: 0.0, cols: 0, rows: 0, offset_x: 0 };
        }
        let pixel_rows = term_rows as f32 * 2.0;
        let scale = (term_cols as f32 / canvas_width as f32).min(pixel_rows / canvas_height as f32);
        let cols = ((canvas_width as f32 * scale) as u16).clamp(1, term_cols.max(1));
        let out_pixel_rows = ((canvas_height as f32 * scale) as u16).max(1);
        let rows = out_pixel_rows.div_ceil(2).min(term_rows.max(1));
        Layout {
            scale,
            cols,
            rows,
            offset_x: term_cols.saturating_sub(cols) / 2,
        }
    }

    /// Canvas range `[start, end)` covered by output sample `index`.
    pub fn span(&self, index: u16) -> (i32, i32) {
        if self.scale <= 0.0 {
            return (0, 0);
        }
        let start = (index as f32 / self.scale) as i32;
        let end = ((index as f32 + 1.0) / self.scale) as i32;
        (start, end.max(start.saturating_add(1)))
    }

    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }
}

fn term_color(color: Color) -> TermColor {
    TermColor::Rgb { r: color.r, g: color.g, b: color.b }
}

// --- TerminalWindow: presents the canvas in the terminal ---
pub struct TerminalWindow {
    stdout: io::Stdout,
    canvas: Canvas,
    textures: Vec<RgbaImage>,
    keyboard: KeyboardState,
    background: Color,
    frame_duration: Duration,
    last_frame: Instant,
    last_size: Option<(u16, u16)>,
    keyboard_enhanced: bool,
    open: bool,
}

impl TerminalWindow {
    /// Once raw mode is on the window exists, so a later setup failure is
    /// undone by `Drop`.
    pub fn open(width: i32, height: i32, title: &str) -> io::Result<Self> {
        info!("Opening {}x{} window '{}'.", width, height, title);
        terminal::enable_raw_mode().map_err(|e| {
            error!("Failed to enable raw mode: {}", e);
            e
        })?;

        let mut window = TerminalWindow {
            stdout: io::stdout(),
            canvas: Canvas::new(width, height),
            textures: Vec::new(),
            keyboard: KeyboardState::default(),
            background: Color::BLACK,
            frame_duration: Duration::ZERO,
            last_frame: Instant::now(),
            last_size: None,
            keyboard_enhanced: false,
            open: true,
        };

        execute!(
            window.stdout,
            EnterAlternateScreen,
            Hide,
            DisableLineWrap,
            SetTitle(title)
        )
        .map_err(|e| {
            error!("Failed to prepare terminal: {}", e);
            e
        })?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                window.stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .map_err(|e| {
                error!("Failed to enable key release events: {}", e);
                e
            })?;
            window.keyboard_enhanced = true;
        }
        info!("Keyboard release events supported: {}", window.keyboard_enhanced);

        Ok(window)
    }

    fn present(&mut self) -> io::Result<()> {
        let (cols, rows) = terminal::size().map_err(|e| {
            error!("Failed to get terminal size: {}", e);
            e
        })?;
        if self.last_size != Some((cols, rows)) {
            info!("Terminal size: {}x{}", cols, rows);
            self.stdout.queue(Clear(ClearType::All))?;
            self.last_size = Some((cols, rows));
        }

        let layout = Layout::fit(self.canvas.width(), self.canvas.height(), cols, rows);
        if layout.is_empty() {
            return self.stdout.flush();
        }
        for cy in 0..layout.rows {
            self.stdout.queue(MoveTo(layout.offset_x, cy))?;
            let (top_y0, top_y1) = layout.span(cy * 2);
            let (bottom_y0, bottom_y1) = layout.span(cy * 2 + 1);
            let mut current: Option<(Color, Color)> = None;
            for cx in 0..layout.cols {
                let (x0, x1) = layout.span(cx);
                let top = self.canvas.sample(x0, top_y0, x1, top_y1, self.background);
                let bottom = self.canvas.sample(x0, bottom_y0, x1, bottom_y1, self.background);
                if current != Some((top, bottom)) {
                    self.stdout.queue(SetForegroundColor(term_color(top)))?;
                    self.stdout.queue(SetBackgroundColor(term_color(bottom)))?;
                    current = Some((top, bottom));
                }
                self.stdout.queue(Print('▀'))?;
            }
        }
        self.stdout.queue(ResetColor)?;
        self.stdout.flush()
    }
}

impl RenderService for TerminalWindow {
    fn set_target_fps(&mut self, fps: u32) {
        self.frame_duration = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / fps as f64)
        };
    }

    fn window_should_close(&mut self) -> io::Result<bool> {
        self.keyboard.poll()?;
        Ok(self.keyboard.quit_requested())
    }

    fn begin_drawing(&mut self) {}

    fn end_drawing(&mut self) -> io::Result<()> {
        self.present()?;
        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_duration {
            thread::sleep(self.frame_duration - elapsed);
        }
        self.last_frame = Instant::now();
        Ok(())
    }

    fn clear_background(&mut self, color: Color) {
        self.background = color;
        self.canvas.clear(color);
    }

    fn draw_texture(&mut self, texture: Texture, x: i32, y: i32, tint: Color) {
        if let Some(image) = self.textures.get(texture.id) {
            self.canvas.blit(image, x, y, tint);
        }
    }

    fn draw_rectangle(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        self.canvas.fill_rect(x, y, width, height, color);
    }

    fn draw_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.canvas.blend_pixel(x, y, color);
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, font_size: i32, color: Color) {
        self.canvas.draw_text(text, x, y, font_size, color);
    }

    fn measure_text(&self, text: &str, font_size: i32) -> i32 {
        text_width(text, font_size)
    }

    fn is_ascend_down(&self) -> bool {
        self.keyboard.is_ascend_down(Instant::now())
    }

    fn load_texture_from_image(&mut self, image: RgbaImage) -> Texture {
        let texture = Texture {
            id: self.textures.len(),
            width: image.width() as i32,
            height: image.height() as i32,
        };
        self.textures.push(image);
        texture
    }

    fn close_window(&mut self) -> io::Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.textures.clear();

        // Every restore step runs even if an earlier one fails.
        let pop = if self.keyboard_enhanced {
            execute!(self.stdout, PopKeyboardEnhancementFlags)
        } else {
            Ok(())
        };
        let restore = execute!(self.stdout, ResetColor, EnableLineWrap, Show, LeaveAlternateScreen);
        let raw_mode = terminal::disable_raw_mode();

        pop.and(restore).and(raw_mode).map_err(|e| {
            error!("Failed to restore terminal: {}", e);
            e
        })?;
        info!("Window closed.");
        Ok(())
    }
}

impl Drop for TerminalWindow {
    fn drop(&mut self) {
        let _ = self.close_window();
    }
}

// --- RecordingWindow: headless service that records each frame's draw calls ---
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear(Color),
    Texture { texture: Texture, x: i32, y: i32 },
    Rectangle { x: i32, y: i32, width: i32, height: i32, color: Color },
    Pixel { x: i32, y: i32 },
    Text { text: String, x: i32, y: i32, color: Color },
}

#[cfg(test)]
pub struct RecordingWindow {
    pub calls: Vec<DrawCall>,
    pub frames: u64,
    pub closed: bool,
    max_frames: u64,
    input: crate::terminal_io::SimulatedInput,
    next_texture: usize,
}

#[cfg(test)]
impl RecordingWindow {
    pub fn new(input: crate::terminal_io::SimulatedInput, max_frames: u64) -> Self {
        RecordingWindow {
            calls: Vec::new(),
            frames: 0,
            closed: false,
            max_frames,
            input,
            next_texture: 0,
        }
    }

    pub fn texture(&mut self, width: u32, height: u32) -> Texture {
        self.load_texture_from_image(RgbaImage::new(width, height))
    }
}

#[cfg(test)]
impl RenderService for RecordingWindow {
    fn set_target_fps(&mut self, _fps: u32) {}

    fn window_should_close(&mut self) -> io::Result<bool> {
        Ok(self.frames >= self.max_frames)
    }

    fn begin_drawing(&mut self) {
        self.calls.clear();
        self.input.advance();
    }

    fn end_drawing(&mut self) -> io::Result<()> {
        self.frames += 1;
        Ok(())
    }

    fn clear_background(&mut self, color: Color) {
        self.calls.push(DrawCall::Clear(color));
    }

    fn draw_texture(&mut self, texture: Texture, x: i32, y: i32, _tint: Color) {
        self.calls.push(DrawCall::Texture { texture, x, y });
    }

    fn draw_rectangle(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        self.calls.push(DrawCall::Rectangle { x, y, width, height, color });
    }

    fn draw_pixel(&mut self, x: i32, y: i32, _color: Color) {
        self.calls.push(DrawCall::Pixel { x, y });
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, _font_size: i32, color: Color) {
        self.calls.push(DrawCall::Text { text: text.to_string(), x, y, color });
    }

    fn measure_text(&self, text: &str, font_size: i32) -> i32 {
        text_width(text, font_size)
    }

    fn is_ascend_down(&self) -> bool {
        self.input.is_ascend_down()
    }

    fn load_texture_from_image(&mut self, image: RgbaImage) -> Texture {
        let texture = Texture {
            id: self.next_texture,
            width: image.width() as i32,
            height: image.height() as i32,
        };
        self.next_texture += 1;
        texture
    }

    fn close_window(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}
