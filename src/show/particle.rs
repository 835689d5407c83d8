use crate::canvas::Canvas;
use crate::config::Rgb;
use noise::{NoiseFn, Perlin};

// Frames over which alpha ramps down at the end of a particle's life
const FADE_FRAMES: i32 = 15;
const ALPHA_FLOOR: f32 = 0.01;
const RADIUS_FLOOR: f32 = 0.1;

const GRAVITY: f32 = 0.05;
const TRAIL_GRAVITY: f32 = 0.01;
const RESISTANCE: f32 = 0.92;

// Stars never age; only the gather spiral can end them
const STAR_LIFE: i32 = i32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Normal,
    Trail,
    Spark,
    Star,
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub alpha: f32,
    pub life: i32,
    pub kind: ParticleKind,
    pub color: Rgb,
    gravity: f32,
    resistance: f32,
    shrink: f32,
}

impl Particle {
    pub fn new(x: f32, y: f32, color: Rgb, kind: ParticleKind, rng: &mut fastrand::Rng) -> Self {
        let mut particle = Self {
            x,
            y,
            vx: (rng.f32() - 0.5) * 16.0,
            vy: (rng.f32() - 0.5) * 16.0,
            radius: 0.5 + rng.f32() * 1.5,
            alpha: 1.0,
            life: 0,
            kind,
            color,
            gravity: GRAVITY,
            resistance: RESISTANCE,
            shrink: 0.005 + rng.f32() * 0.02,
        };

        match kind {
            ParticleKind::Normal => {
                particle.life = rng.i32(24..48);
            }
            ParticleKind::Trail => {
                // Drifts upward behind the rocket
                particle.vy = -(1.0 + rng.f32() * 3.0);
                particle.gravity = TRAIL_GRAVITY;
                particle.life = rng.i32(16..32);
            }
            ParticleKind::Spark => {
                particle.vx *= 2.0;
                particle.vy *= 2.0;
                particle.shrink = 0.01 + rng.f32() * 0.03;
                particle.life = rng.i32(32..64);
            }
            ParticleKind::Star => {
                particle.vx = 0.0;
                particle.vy = 0.0;
                particle.gravity = 0.0;
                particle.resistance = 0.0;
                particle.shrink = 0.0;
                particle.radius = 0.3 + rng.f32() * 0.9;
                particle.alpha = 0.2 + rng.f32() * 0.8;
                particle.life = STAR_LIFE;
            }
        }

        particle
    }

    /// Advances one frame. Returns whether the particle is still alive.
    pub fn advance(&mut self, sky: &Twinkle) -> bool {
        if self.kind == ParticleKind::Star {
            self.alpha = sky.alpha(self.x);
            return self.is_alive();
        }

        self.vx *= self.resistance;
        self.vy *= self.resistance;
        self.vy += self.gravity;
        self.x += self.vx;
        self.y += self.vy;

        self.life = (self.life - 1).max(0);
        self.alpha = if self.life > FADE_FRAMES {
            1.0
        } else {
            self.life as f32 / FADE_FRAMES as f32
        };

        self.radius = (self.radius - self.shrink).max(0.0);

        self.is_alive()
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0 && self.alpha > ALPHA_FLOOR && self.radius > RADIUS_FLOOR
    }

    pub fn kill(&mut self) {
        self.life = 0;
    }

    // Cancels the next frame's aging while the spiral holds the particle
    pub(crate) fn hold_life(&mut self) {
        self.life = self.life.saturating_add(1);
    }

    pub(crate) fn set_velocity(&mut self, vx: f32, vy: f32) {
        self.vx = vx;
        self.vy = vy;
    }

    pub fn draw<C: Canvas>(&self, canvas: &mut C) {
        canvas.disc(self.x, self.y, self.radius, self.color, self.alpha);
        if self.kind != ParticleKind::Star {
            canvas.glow(self.x, self.y, self.radius * 4.0, self.color, self.alpha);
        }
    }
}

/// Slow flicker field shared by every star in the sky.
pub struct Twinkle {
    perlin: Perlin,
    time: f32,
}

impl Twinkle {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            time: 0.0,
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.time += dt;
        // Wrap time to prevent floating point precision issues
        if self.time > 10000.0 {
            self.time -= 10000.0;
        }
    }

    pub fn alpha(&self, x: f32) -> f32 {
        let n = self.perlin.get([x as f64 * 0.05, self.time as f64 * 2.0]) as f32;
        let wave = (self.time + x).sin() * 0.2;
        (0.5 + wave + (n * 0.5 + 0.5) * 0.3).clamp(0.0, 1.0)
    }
}
