use super::particle::{Particle, ParticleKind};
use crate::canvas::Canvas;
use crate::config::{random_color, Rgb, Tunables};
use crate::error::LaunchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    Flying,
    Finished,
}

#[derive(Debug, Clone)]
pub struct Firework {
    pub x: f32,
    pub y: f32,
    pub target_x: f32,
    pub target_y: f32,
    vx: f32,
    vy: f32,
    distance: f32,
    traveled: f32,
    pub color: Rgb,
    particle_count: usize,
}

impl Firework {
    pub fn new(
        origin: (f32, f32),
        target: (f32, f32),
        color: Rgb,
        tunables: &Tunables,
        rng: &mut fastrand::Rng,
    ) -> Result<Self, LaunchError> {
        let dx = target.0 - origin.0;
        let dy = target.1 - origin.1;
        let distance = (dx * dx + dy * dy).sqrt();
        if !distance.is_finite() || distance <= f32::EPSILON {
            return Err(LaunchError::ZeroDistance);
        }

        let burst = tunables.burst_min..=tunables.burst_max.max(tunables.burst_min);

        Ok(Self {
            x: origin.0,
            y: origin.1,
            target_x: target.0,
            target_y: target.1,
            vx: dx / distance * tunables.launch_speed,
            vy: dy / distance * tunables.launch_speed,
            distance,
            traveled: 0.0,
            color,
            particle_count: rng.usize(burst),
        })
    }

    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    pub fn traveled(&self) -> f32 {
        self.traveled
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Moves one frame, dropping trail particles on the way. Detonates into
    /// `particles` and reports `Finished` once the target is reached.
    pub fn advance(
        &mut self,
        particles: &mut Vec<Particle>,
        tunables: &Tunables,
        rng: &mut fastrand::Rng,
    ) -> Flight {
        self.traveled += (self.vx * self.vx + self.vy * self.vy).sqrt();
        self.x += self.vx;
        self.y += self.vy;

        if rng.f32() < tunables.trail_chance {
            particles.push(Particle::new(self.x, self.y, self.color, ParticleKind::Trail, rng));
        }

        let arrived = (self.x - self.target_x).abs() < tunables.arrival_epsilon
            && (self.y - self.target_y).abs() < tunables.arrival_epsilon;
        let passed = self.traveled >= self.distance;

        if arrived || passed {
            self.detonate(particles, tunables, rng);
            Flight::Finished
        } else {
            Flight::Flying
        }
    }

    pub fn detonate(&self, particles: &mut Vec<Particle>, tunables: &Tunables, rng: &mut fastrand::Rng) {
        let every = tunables.palette_every.max(1);
        particles.reserve(self.particle_count * 2);

        for i in 0..self.particle_count {
            let angle = rng.f32() * std::f32::consts::TAU;
            let speed = (tunables.burst_speed_min
                + rng.f32() * (tunables.burst_speed_max - tunables.burst_speed_min))
                * tunables.burst_intensity;

            // Every few particles take a random palette color for variety
            let color = if i % every == 0 { random_color(rng) } else { self.color };

            let mut particle = Particle::new(self.x, self.y, color, ParticleKind::Normal, rng);
            particle.set_velocity(angle.cos() * speed, angle.sin() * speed);
            particles.push(particle);

            if rng.f32() < tunables.spark_chance {
                particles.push(Particle::new(self.x, self.y, color, ParticleKind::Spark, rng));
            }
        }

        log::trace!(
            "firework burst at ({:.0}, {:.0}): {} shells",
            self.x,
            self.y,
            self.particle_count
        );
    }

    pub fn draw<C: Canvas>(&self, canvas: &mut C) {
        canvas.disc(self.x, self.y, 2.0, self.color, 1.0);
        canvas.glow(self.x, self.y, 6.0, self.color, 1.0);
    }
}
