use crate::config::{Rgb, PIXELS_PER_CELL};
use std::io::{self, Write};

// Fraction of the way each pixel moves toward the background every frame
const TRAIL_FADE: f32 = 0.12;
const GLOW_STRENGTH: f32 = 0.35;

/// Drawing surface the show paints onto. Coordinates and radii are in
/// simulation pixels.
pub trait Canvas {
    /// Solid disc.
    fn disc(&mut self, x: f32, y: f32, radius: f32, color: Rgb, alpha: f32);
    /// Soft halo, strongest at the center and transparent at `radius`.
    fn glow(&mut self, x: f32, y: f32, radius: f32, color: Rgb, alpha: f32);
}

/// Truecolor half-block canvas. Every terminal cell holds two vertically
/// stacked pixels; the buffer persists between frames so moving particles
/// leave fading trails.
pub struct TerminalCanvas {
    width: usize,
    height: usize,
    bg: Rgb,
    buffer: Vec<[f32; 3]>,
    output_buf: Vec<u8>,
}

impl TerminalCanvas {
    pub fn new(cols: usize, rows: usize, bg: Rgb) -> Self {
        let width = cols;
        let height = rows * 2;
        Self {
            width,
            height,
            bg,
            buffer: vec![to_f32(bg); width * height],
            output_buf: Vec::with_capacity(width * height * 25),
        }
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.width = cols;
        self.height = rows * 2;
        self.buffer = vec![to_f32(self.bg); self.width * self.height];
    }

    /// Size of the drawable area in simulation pixels.
    pub fn extent(&self) -> (f32, f32) {
        (
            self.width as f32 * PIXELS_PER_CELL,
            self.height as f32 * PIXELS_PER_CELL,
        )
    }

    /// Maps a terminal cell to the simulation pixel at its center.
    pub fn cell_center(column: u16, row: u16) -> (f32, f32) {
        (
            (column as f32 + 0.5) * PIXELS_PER_CELL,
            (row as f32 * 2.0 + 1.0) * PIXELS_PER_CELL,
        )
    }

    /// Pulls every pixel part of the way back to the background.
    pub fn fade(&mut self) {
        let bg = to_f32(self.bg);
        for px in &mut self.buffer {
            for c in 0..3 {
                px[c] += (bg[c] - px[c]) * TRAIL_FADE;
            }
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        to_u8(self.buffer[y * self.width + x])
    }

    fn blend(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        let px = &mut self.buffer[y as usize * self.width + x as usize];
        let color = to_f32(color);
        for c in 0..3 {
            px[c] += (color[c] - px[c]) * a;
        }
    }

    pub fn present<W: Write>(&mut self, out: &mut W, counter: usize) -> io::Result<()> {
        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H");

        let mut prev_top: Option<Rgb> = None;
        let mut prev_bot: Option<Rgb> = None;

        // Render using half-blocks
        for y in (0..self.height).step_by(2) {
            for x in 0..self.width {
                let top = self.pixel(x, y);
                let bot = if y + 1 < self.height { self.pixel(x, y + 1) } else { top };

                if prev_top != Some(top) {
                    write!(self.output_buf, "\x1b[48;2;{};{};{}m", top.0, top.1, top.2)?;
                    prev_top = Some(top);
                }
                if prev_bot != Some(bot) {
                    write!(self.output_buf, "\x1b[38;2;{};{};{}m", bot.0, bot.1, bot.2)?;
                    prev_bot = Some(bot);
                }

                self.output_buf.extend_from_slice("▄".as_bytes());
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");
            prev_top = None;
            prev_bot = None;
            if y + 2 < self.height {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        // Live particle counter in the top-left corner
        write!(self.output_buf, "\x1b[H\x1b[0m\x1b[38;2;230;230;230m {} \x1b[0m", counter)?;

        out.write_all(&self.output_buf)?;
        out.flush()?;
        Ok(())
    }
}

impl Canvas for TerminalCanvas {
    fn disc(&mut self, x: f32, y: f32, radius: f32, color: Rgb, alpha: f32) {
        let cx = x / PIXELS_PER_CELL;
        let cy = y / PIXELS_PER_CELL;
        let r = radius / PIXELS_PER_CELL;

        // Anything smaller than a pixel lights the one it falls in
        if r < 0.75 {
            self.blend(cx.floor() as i32, cy.floor() as i32, color, alpha);
            return;
        }

        let (x0, x1) = ((cx - r).floor() as i32, (cx + r).ceil() as i32);
        let (y0, y1) = ((cy - r).floor() as i32, (cy + r).ceil() as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    self.blend(px, py, color, alpha);
                }
            }
        }
    }

    fn glow(&mut self, x: f32, y: f32, radius: f32, color: Rgb, alpha: f32) {
        let cx = x / PIXELS_PER_CELL;
        let cy = y / PIXELS_PER_CELL;
        let r = (radius / PIXELS_PER_CELL).max(1.0);

        let (x0, x1) = ((cx - r).floor() as i32, (cx + r).ceil() as i32);
        let (y0, y1) = ((cy - r).floor() as i32, (cy + r).ceil() as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                if d < r {
                    self.blend(px, py, color, alpha * (1.0 - d / r) * GLOW_STRENGTH);
                }
            }
        }
    }
}

fn to_f32(c: Rgb) -> [f32; 3] {
    [c.0 as f32, c.1 as f32, c.2 as f32]
}

fn to_u8(c: [f32; 3]) -> Rgb {
    (
        c[0].round().clamp(0.0, 255.0) as u8,
        c[1].round().clamp(0.0, 255.0) as u8,
        c[2].round().clamp(0.0, 255.0) as u8,
    )
}
