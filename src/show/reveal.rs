use crate::canvas::Canvas;
use crate::config::{Rgb, Tunables};
use crate::picture::PixelBuffer;

const IMAGE_RADIUS: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Spawning,
    Settled,
}

/// One pixel of a revealed picture, flying out from a shared origin to its
/// place in the picture and fading away after a while.
#[derive(Debug, Clone)]
pub struct ImageParticle {
    pub x: f32,
    pub y: f32,
    origin_x: f32,
    origin_y: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub color: Rgb,
    pub radius: f32,
    pub alpha: f32,
    target_alpha: f32,
    pub appear_delay: f32,
    pub disappear_delay: u32,
    life: u32,
    max_life: u32,
    phase: Phase,
}

impl ImageParticle {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advances to reveal frame `frame`. Returns false once fully faded out.
    pub fn advance(&mut self, frame: u32, tunables: &Tunables) -> bool {
        let t = frame as f32 - self.appear_delay;
        if t <= 0.0 {
            self.alpha = 0.0;
            return true;
        }

        let fade_in = (t / tunables.fade_in_frames.max(1) as f32).min(1.0);

        match self.phase {
            Phase::Spawning => {
                let progress = (t / tunables.travel_frames.max(1) as f32).min(1.0);
                if progress >= 1.0 {
                    self.x = self.target_x;
                    self.y = self.target_y;
                    self.phase = Phase::Settled;
                } else {
                    self.x = self.origin_x + (self.target_x - self.origin_x) * progress;
                    self.y = self.origin_y + (self.target_y - self.origin_y) * progress;
                }
                self.alpha = fade_in * self.target_alpha;
                true
            }
            Phase::Settled => {
                self.x = self.target_x;
                self.y = self.target_y;
                self.life = (self.life + 1).min(self.max_life);

                let disappear = self.disappear_delay.max(1);
                let fade_start = self.max_life.saturating_sub(disappear);
                let fade_out = if self.life > fade_start {
                    (1.0 - (self.life - fade_start) as f32 / disappear as f32).max(0.0)
                } else {
                    1.0
                };
                self.alpha = fade_in * fade_out * self.target_alpha;

                self.life < self.max_life
            }
        }
    }

    pub fn draw<C: Canvas>(&self, canvas: &mut C) {
        if self.alpha <= 0.0 {
            return;
        }
        canvas.disc(self.x, self.y, self.radius, self.color, self.alpha);
        canvas.glow(self.x, self.y, self.radius * 4.0, self.color, self.alpha * 0.5);
    }
}

/// Turns every visible pixel of `buf` into an [`ImageParticle`] that flies
/// from `origin` to the pixel's place in a picture centered on `center`.
/// Pixels nearer the picture's middle appear first.
pub fn decompose(
    buf: &PixelBuffer,
    origin: (f32, f32),
    center: (f32, f32),
    tunables: &Tunables,
    rng: &mut fastrand::Rng,
) -> Vec<ImageParticle> {
    if !buf.is_well_formed() {
        log::warn!(
            "ignoring {}x{} picture with {} bytes of pixels",
            buf.width,
            buf.height,
            buf.rgba.len()
        );
        return Vec::new();
    }

    let half_w = buf.width as f32 / 2.0;
    let half_h = buf.height as f32 / 2.0;

    let mut visible = Vec::new();
    let mut max_dist = 0.0f32;
    for y in 0..buf.height {
        for x in 0..buf.width {
            let [r, g, b, a] = buf.pixel(x, y);
            if a <= tunables.image_alpha_floor {
                continue;
            }
            let dx = x as f32 - half_w;
            let dy = y as f32 - half_h;
            let dist = (dx * dx + dy * dy).sqrt();
            max_dist = max_dist.max(dist);
            visible.push((dx, dy, dist, (r, g, b)));
        }
    }

    let disappear = tunables.disappear_min..=tunables.disappear_max.max(tunables.disappear_min);
    let life = tunables.image_life_min..=tunables.image_life_max.max(tunables.image_life_min);

    visible
        .into_iter()
        .map(|(dx, dy, dist, color)| {
            let appear_delay = if max_dist > 0.0 {
                dist / max_dist * tunables.appear_delay_max
            } else {
                0.0
            };

            ImageParticle {
                x: origin.0,
                y: origin.1,
                origin_x: origin.0,
                origin_y: origin.1,
                target_x: center.0 + dx * tunables.image_spacing,
                target_y: center.1 + dy * tunables.image_spacing,
                color,
                radius: IMAGE_RADIUS,
                alpha: 0.0,
                target_alpha: 1.0,
                appear_delay,
                disappear_delay: rng.u32(disappear.clone()),
                life: 0,
                max_life: rng.u32(life.clone()),
                phase: Phase::Spawning,
            }
        })
        .collect()
}

/// The particles of one decomposition together with the frame counter that
/// paces their appearance.
pub struct Reveal {
    frame: u32,
    particles: Vec<ImageParticle>,
}

impl Reveal {
    pub fn new(particles: Vec<ImageParticle>) -> Self {
        Self { frame: 0, particles }
    }

    pub fn advance(&mut self, tunables: &Tunables) {
        self.frame += 1;
        let frame = self.frame;
        self.particles.retain_mut(|p| p.advance(frame, tunables));
    }

    pub fn is_done(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[ImageParticle] {
        &self.particles
    }

    pub fn draw<C: Canvas>(&self, canvas: &mut C) {
        for p in &self.particles {
            p.draw(canvas);
        }
    }
}
