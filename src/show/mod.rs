pub mod firework;
pub mod particle;
pub mod reveal;

use crate::canvas::Canvas;
use crate::config::{random_color, Tunables, STAR_COLOR};
use crate::error::LaunchError;
use crate::picture::{PictureReply, PictureSource};
use firework::{Firework, Flight};
use particle::{Particle, ParticleKind, Twinkle};
use reveal::{decompose, Reveal};
use std::sync::mpsc::{self, Receiver, TryRecvError};

const FRAME_DT: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Gathering,
}

/// The whole fireworks display: every live particle, projectile and picture
/// reveal, advanced one frame at a time.
pub struct Show {
    width: f32,
    height: f32,
    tunables: Tunables,
    particles: Vec<Particle>,
    fireworks: Vec<Firework>,
    reveals: Vec<Reveal>,
    // Picture requests still waiting for an answer
    pending: Vec<Receiver<PictureReply>>,
    pictures: Box<dyn PictureSource>,
    mode: Mode,
    pressure: u32,
    sky: Twinkle,
    rng: fastrand::Rng,
    auto_launch: bool,
    next_launch: u32,
}

impl Show {
    pub fn new(
        width: f32,
        height: f32,
        tunables: Tunables,
        pictures: Box<dyn PictureSource>,
        seed: u64,
    ) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let sky = Twinkle::new(rng.u32(..));
        let mut show = Self {
            width,
            height,
            tunables,
            particles: Vec::new(),
            fireworks: Vec::new(),
            reveals: Vec::new(),
            pending: Vec::new(),
            pictures,
            mode: Mode::Normal,
            pressure: 0,
            sky,
            rng,
            auto_launch: false,
            next_launch: 30,
        };
        show.scatter_stars();
        show
    }

    pub fn set_auto_launch(&mut self, on: bool) {
        self.auto_launch = on;
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Live particle count, for display.
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn firework_count(&self) -> usize {
        self.fireworks.len()
    }

    pub fn pressure(&self) -> u32 {
        self.pressure
    }

    pub fn reveal_count(&self) -> usize {
        self.reveals.iter().map(Reveal::len).sum()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Fires a rocket from the bottom edge straight up to `(x, y)`.
    pub fn launch(&mut self, x: f32, y: f32) -> Result<(), LaunchError> {
        if self.mode == Mode::Gathering {
            return Err(LaunchError::Gathering);
        }
        if self.particles.len() >= self.tunables.capacity {
            return Err(LaunchError::AtCapacity(self.tunables.capacity));
        }

        let color = random_color(&mut self.rng);
        let firework = Firework::new((x, self.height), (x, y), color, &self.tunables, &mut self.rng)?;
        self.fireworks.push(firework);
        Ok(())
    }

    /// Fires a rocket at a random spot in the upper middle of the sky.
    pub fn launch_random(&mut self) -> Result<(), LaunchError> {
        let x = self.width * (0.25 + self.rng.f32() * 0.5);
        let y = self.height * (1.0 / 6.0 + self.rng.f32() * (2.0 / 5.0 - 1.0 / 6.0));
        self.launch(x, y)
    }

    /// Runs one frame of the simulation.
    pub fn step(&mut self) {
        self.sky.tick(FRAME_DT);
        self.merge_pictures();

        match self.mode {
            Mode::Normal => self.step_normal(),
            Mode::Gathering => self.step_gathering(),
        }

        self.enforce_capacity();

        let tunables = &self.tunables;
        for reveal in &mut self.reveals {
            reveal.advance(tunables);
        }
        self.reveals.retain(|r| !r.is_done());
    }

    fn step_normal(&mut self) {
        if self.particles.len() > self.tunables.gather_threshold {
            self.pressure += 1;
        } else {
            self.pressure = 0;
        }

        if self.pressure >= self.tunables.gather_frames {
            self.mode = Mode::Gathering;
            self.pressure = 0;
            log::info!(
                "gathering {} particles toward the center",
                self.particles.len()
            );
            self.request_picture();
        }

        if self.auto_launch {
            self.tick_auto_launch();
        }

        let (particles, tunables, rng) = (&mut self.particles, &self.tunables, &mut self.rng);
        self.fireworks
            .retain_mut(|fw| fw.advance(particles, tunables, rng) == Flight::Flying);

        let sky = &self.sky;
        self.particles.retain_mut(|p| p.advance(sky));
    }

    fn step_gathering(&mut self) {
        let (cx, cy) = self.center();
        let (sin, cos) = self.tunables.spiral_rotation.sin_cos();
        let tunables = &self.tunables;
        let sky = &self.sky;

        self.particles.retain_mut(|p| {
            let dx = cx - p.x;
            let dy = cy - p.y;
            let dist = (dx * dx + dy * dy).sqrt();

            if dist < tunables.spiral_kill_radius {
                p.kill();
            } else {
                p.x += dx * tunables.spiral_pull;
                p.y += dy * tunables.spiral_pull;

                let rx = p.x - cx;
                let ry = p.y - cy;
                p.x = cx + cos * rx - sin * ry;
                p.y = cy + sin * rx + cos * ry;

                p.hold_life();
                p.radius *= tunables.spiral_shrink;
            }

            p.advance(sky)
        });

        if self.particles.len() < self.tunables.gather_exit_floor {
            self.mode = Mode::Normal;
            self.pressure = 0;
            log::info!("gather finished, back to fireworks");
            self.scatter_stars();
        }
    }

    fn tick_auto_launch(&mut self) {
        if self.next_launch > 0 {
            self.next_launch -= 1;
            return;
        }
        if let Err(e) = self.launch_random() {
            log::trace!("auto launch skipped: {}", e);
        }
        self.next_launch = self.rng.u32(18..66);
    }

    // Oldest particles go first
    fn enforce_capacity(&mut self) {
        if self.particles.len() > self.tunables.capacity {
            let excess = self.particles.len() - self.tunables.capacity;
            self.particles.drain(..excess);
            log::debug!("evicted {} oldest particles", excess);
        }
    }

    fn request_picture(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.pictures.request(tx);
        self.pending.push(rx);
    }

    // Answers are only taken in between frames
    fn merge_pictures(&mut self) {
        let center = self.center();
        let (reveals, tunables, rng) = (&mut self.reveals, &self.tunables, &mut self.rng);

        self.pending.retain(|rx| match rx.try_recv() {
            Ok(Ok(buf)) => {
                let particles = decompose(&buf, center, center, tunables, rng);
                log::debug!(
                    "revealing {}x{} picture as {} particles",
                    buf.width,
                    buf.height,
                    particles.len()
                );
                if !particles.is_empty() {
                    reveals.push(Reveal::new(particles));
                }
                false
            }
            Ok(Err(e)) => {
                log::warn!("skipping picture reveal: {}", e);
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => {
                log::debug!("picture request dropped without an answer");
                false
            }
        });
    }

    fn scatter_stars(&mut self) {
        for _ in 0..self.tunables.star_count {
            let x = self.rng.f32() * self.width;
            let y = self.rng.f32() * self.height / 2.0;
            let star = Particle::new(x, y, STAR_COLOR, ParticleKind::Star, &mut self.rng);
            self.particles.push(star);
        }
    }

    pub fn render<C: Canvas>(&self, canvas: &mut C) {
        for p in &self.particles {
            p.draw(canvas);
        }
        for fw in &self.fireworks {
            fw.draw(canvas);
        }
        for reveal in &self.reveals {
            reveal.draw(canvas);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rgb;
    use crate::error::PictureError;
    use crate::picture::PixelBuffer;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc::Sender;

    /// Holds on to every request so tests decide when and how it is answered.
    #[derive(Clone, Default)]
    struct Scripted {
        replies: Rc<RefCell<Vec<Sender<PictureReply>>>>,
    }

    impl PictureSource for Scripted {
        fn request(&mut self, reply: Sender<PictureReply>) {
            self.replies.borrow_mut().push(reply);
        }
    }

    #[derive(Default)]
    struct Recorder {
        discs: usize,
        glows: usize,
    }

    impl Canvas for Recorder {
        fn disc(&mut self, _x: f32, _y: f32, radius: f32, _color: Rgb, alpha: f32) {
            assert!(radius >= 0.0);
            assert!((0.0..=1.0).contains(&alpha));
            self.discs += 1;
        }

        fn glow(&mut self, _x: f32, _y: f32, _radius: f32, _color: Rgb, _alpha: f32) {
            self.glows += 1;
        }
    }

    fn quiet() -> Tunables {
        Tunables {
            star_count: 0,
            ..Tunables::default()
        }
    }

    fn show_with(tunables: Tunables) -> (Show, Scripted) {
        let source = Scripted::default();
        let show = Show::new(800.0, 600.0, tunables, Box::new(source.clone()), 42);
        (show, source)
    }

    fn add_stars(show: &mut Show, count: usize) {
        for i in 0..count {
            let x = 10.0 + (i % 70) as f32 * 10.0;
            let y = 10.0 + (i / 70) as f32 * 10.0;
            let star = Particle::new(x, y, STAR_COLOR, ParticleKind::Star, &mut show.rng);
            show.particles.push(star);
        }
    }

    fn heart() -> PixelBuffer {
        PixelBuffer::heart(16)
    }

    #[test]
    fn starts_with_a_starry_sky() {
        let (show, _) = show_with(Tunables::default());
        assert_eq!(show.particle_count(), 24);
        assert!(show.particles().iter().all(|p| p.kind == ParticleKind::Star && p.y <= 300.0));
    }

    #[test]
    fn launch_from_bottom_bursts_after_about_fifty_frames() {
        let (mut show, _) = show_with(quiet());
        show.launch(400.0, 300.0).unwrap();
        assert_eq!(show.firework_count(), 1);

        for _ in 0..49 {
            show.step();
        }
        assert_eq!(show.firework_count(), 1);
        show.step();
        assert_eq!(show.firework_count(), 0);
        assert!(show.particle_count() >= 150);
    }

    #[test]
    fn launch_is_rejected_when_degenerate_or_full() {
        let (mut show, _) = show_with(Tunables {
            capacity: 20,
            ..quiet()
        });
        assert_eq!(show.launch(100.0, 600.0), Err(LaunchError::ZeroDistance));

        add_stars(&mut show, 20);
        assert_eq!(show.launch(100.0, 100.0), Err(LaunchError::AtCapacity(20)));
        assert_eq!(show.firework_count(), 0);
    }

    #[test]
    fn gathering_starts_after_exactly_the_configured_frames() {
        let (mut show, source) = show_with(Tunables {
            gather_threshold: 10,
            gather_frames: 5,
            ..quiet()
        });
        add_stars(&mut show, 11);

        for frame in 1..5 {
            show.step();
            assert_eq!(show.mode(), Mode::Normal);
            assert_eq!(show.pressure(), frame);
        }
        assert!(source.replies.borrow().is_empty());

        show.step();
        assert_eq!(show.mode(), Mode::Gathering);
        assert_eq!(show.pressure(), 0);
        assert_eq!(source.replies.borrow().len(), 1);
        assert_eq!(show.launch(400.0, 100.0), Err(LaunchError::Gathering));
    }

    #[test]
    fn pressure_resets_when_population_drops() {
        let (mut show, _) = show_with(Tunables {
            gather_threshold: 10,
            gather_frames: 5,
            ..quiet()
        });
        add_stars(&mut show, 11);
        for _ in 0..3 {
            show.step();
        }
        assert_eq!(show.pressure(), 3);

        show.particles.truncate(5);
        show.step();
        assert_eq!(show.pressure(), 0);
        assert_eq!(show.mode(), Mode::Normal);
    }

    #[test]
    fn eviction_removes_the_oldest() {
        let (mut show, _) = show_with(Tunables {
            capacity: 10,
            ..quiet()
        });
        add_stars(&mut show, 15);
        let survivors: Vec<(f32, f32)> = show.particles[5..].iter().map(|p| (p.x, p.y)).collect();

        show.enforce_capacity();
        let kept: Vec<(f32, f32)> = show.particles.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(kept, survivors);

        show.enforce_capacity();
        assert_eq!(show.particle_count(), 10);
    }

    #[test]
    fn gather_spirals_inward_and_returns_to_normal() {
        let (mut show, _) = show_with(Tunables {
            gather_threshold: 5,
            gather_frames: 1,
            gather_exit_floor: 3,
            ..quiet()
        });
        add_stars(&mut show, 40);
        show.step();
        assert_eq!(show.mode(), Mode::Gathering);

        let (cx, cy) = show.center();
        let dist = |p: &Particle| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt();

        let mut frames = 0;
        while show.mode() == Mode::Gathering {
            let before: Vec<(f32, f32)> = show.particles.iter().map(|p| (dist(p), p.radius)).collect();
            let count = before.len();
            show.step();
            frames += 1;
            assert!(frames < 5000, "gather never ended");

            // Without deaths the order is stable and every survivor moved in
            if show.mode() == Mode::Gathering && show.particle_count() == count {
                for (p, (d, r)) in show.particles.iter().zip(&before) {
                    assert!(dist(p) < *d);
                    assert!(p.radius < *r);
                }
            }
        }

        assert_eq!(show.mode(), Mode::Normal);
        assert_eq!(show.pressure(), 0);
        assert!(show.particle_count() < 3);
        assert!(show.launch(400.0, 100.0).is_ok());
    }

    #[test]
    fn particles_at_the_center_are_removed() {
        let (mut show, _) = show_with(Tunables {
            gather_exit_floor: 0,
            ..quiet()
        });
        show.mode = Mode::Gathering;
        add_stars(&mut show, 1);
        show.particles[0].x = 401.0;
        show.particles[0].y = 300.5;

        show.step();
        assert_eq!(show.particle_count(), 0);
    }

    #[test]
    fn fireworks_freeze_while_gathering() {
        let (mut show, _) = show_with(Tunables {
            gather_exit_floor: 0,
            ..quiet()
        });
        show.launch(400.0, 100.0).unwrap();
        show.step();
        let y = show.fireworks[0].y;

        show.mode = Mode::Gathering;
        add_stars(&mut show, 10);
        for _ in 0..10 {
            show.step();
        }
        assert_eq!(show.firework_count(), 1);
        assert_eq!(show.fireworks[0].y, y);
    }

    #[test]
    fn picture_is_merged_at_the_next_frame() {
        let (mut show, source) = show_with(Tunables {
            gather_threshold: 5,
            gather_frames: 1,
            ..quiet()
        });
        add_stars(&mut show, 40);
        show.step();
        assert_eq!(show.mode(), Mode::Gathering);

        let expected = heart().rgba.chunks_exact(4).filter(|px| px[3] > 0).count();
        source.replies.borrow()[0].send(Ok(heart())).unwrap();
        assert_eq!(show.reveal_count(), 0);

        show.step();
        assert_eq!(show.reveal_count(), expected);
        assert!(show.pending.is_empty());
    }

    #[test]
    fn late_picture_after_gather_ended_still_plays() {
        let (mut show, source) = show_with(Tunables {
            gather_threshold: 5,
            gather_frames: 1,
            gather_exit_floor: 3,
            ..quiet()
        });
        add_stars(&mut show, 40);
        show.step();
        while show.mode() == Mode::Gathering {
            show.step();
        }
        assert_eq!(show.pending.len(), 1);

        source.replies.borrow()[0].send(Ok(heart())).unwrap();
        show.step();
        assert!(show.reveal_count() > 0);

        let mut frames = 0;
        while show.reveal_count() > 0 {
            show.step();
            frames += 1;
            assert!(frames < 10_000);
        }
        assert_eq!(show.mode(), Mode::Normal);
    }

    #[test]
    fn failed_or_abandoned_pictures_are_dropped() {
        let (mut show, source) = show_with(quiet());
        show.request_picture();
        show.request_picture();

        let sender = source.replies.borrow_mut().remove(0);
        sender.send(Err(PictureError::Empty)).unwrap();
        source.replies.borrow_mut().clear();

        show.step();
        assert!(show.pending.is_empty());
        assert_eq!(show.reveal_count(), 0);
    }

    #[test]
    fn malformed_picture_is_skipped_without_panicking() {
        let (mut show, source) = show_with(quiet());
        show.request_picture();
        let short = PixelBuffer {
            width: 4,
            height: 4,
            rgba: vec![255; 8],
        };
        source.replies.borrow()[0].send(Ok(short)).unwrap();

        show.step();
        assert!(show.pending.is_empty());
        assert_eq!(show.reveal_count(), 0);
        assert_eq!(show.mode(), Mode::Normal);
    }

    #[test]
    fn render_draws_every_entity() {
        let (mut show, source) = show_with(Tunables::default());
        show.launch(400.0, 100.0).unwrap();
        show.request_picture();
        source.replies.borrow()[0].send(Ok(heart())).unwrap();
        for _ in 0..80 {
            show.step();
        }

        let visible = show.reveals[0].particles().iter().filter(|p| p.alpha > 0.0).count();
        assert!(visible > 0);

        let non_stars = show
            .particles
            .iter()
            .filter(|p| p.kind != ParticleKind::Star)
            .count();
        let mut recorder = Recorder::default();
        show.render(&mut recorder);
        assert_eq!(
            recorder.discs,
            show.particle_count() + show.firework_count() + visible
        );
        assert_eq!(recorder.glows, non_stars + show.firework_count() + visible);
    }

    #[test]
    fn long_run_keeps_invariants() {
        let (mut show, _) = show_with(Tunables {
            gather_frames: 120,
            ..Tunables::default()
        });
        show.set_auto_launch(true);

        let mut gathered = false;
        for _ in 0..6000 {
            // Rapid clicking on top of the automatic launches
            let _ = show.launch_random();
            show.step();
            gathered |= show.mode() == Mode::Gathering;

            assert!(show.particle_count() <= 2048);
            for p in show.particles() {
                assert!((0.0..=1.0).contains(&p.alpha));
                assert!(p.radius >= 0.0);
            }
        }
        assert!(gathered, "population never triggered a gather");
    }
}
