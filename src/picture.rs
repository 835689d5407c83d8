use crate::error::PictureError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;

pub type PictureReply = Result<PixelBuffer, PictureError>;

/// Decoded RGBA pixels, row major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PixelBuffer {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, PictureError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(PictureError::SizeMismatch {
                expected,
                got: rgba.len(),
            });
        }
        Ok(Self { width, height, rgba })
    }

    /// Whether `rgba` holds exactly `width * height` pixels.
    pub fn is_well_formed(&self) -> bool {
        self.rgba.len() == self.width as usize * self.height as usize * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    /// Scales `img` to fit a `size` x `size` square, centered, with
    /// transparent borders where the aspect ratio leaves room.
    pub fn fit(img: &DynamicImage, size: u32) -> Result<Self, PictureError> {
        let (w, h) = (img.width(), img.height());
        if w == 0 || h == 0 || size == 0 {
            return Err(PictureError::Empty);
        }

        let scale = (size as f32 / w as f32).min(size as f32 / h as f32);
        let nw = ((w as f32 * scale).round() as u32).clamp(1, size);
        let nh = ((h as f32 * scale).round() as u32).clamp(1, size);
        let resized = imageops::resize(&img.to_rgba8(), nw, nh, FilterType::Triangle);

        let mut square = RgbaImage::new(size, size);
        imageops::overlay(
            &mut square,
            &resized,
            ((size - nw) / 2) as i64,
            ((size - nh) / 2) as i64,
        );

        Ok(Self {
            width: size,
            height: size,
            rgba: square.into_raw(),
        })
    }

    /// Built-in emblem shown when no picture files are configured.
    pub fn heart(size: u32) -> Self {
        let mut rgba = vec![0u8; size as usize * size as usize * 4];
        let s = size.max(1) as f32;

        for py in 0..size {
            for px in 0..size {
                // Map into [-1.5, 1.5] with y pointing up
                let x = (px as f32 + 0.5) / s * 3.0 - 1.5;
                let y = 1.4 - (py as f32 + 0.5) / s * 3.0;
                let a = x * x + y * y - 1.0;
                if a * a * a - x * x * y * y * y > 0.0 {
                    continue;
                }

                // Pink at the top fading to deep red at the tip
                let t = py as f32 / s;
                let i = (py as usize * size as usize + px as usize) * 4;
                rgba[i] = 255;
                rgba[i + 1] = (110.0 * (1.0 - t)) as u8 + 30;
                rgba[i + 2] = (160.0 * (1.0 - t)) as u8 + 60;
                rgba[i + 3] = 255;
            }
        }

        Self {
            width: size,
            height: size,
            rgba,
        }
    }
}

pub fn load(path: &Path, size: u32) -> Result<PixelBuffer, PictureError> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    PixelBuffer::fit(&img, size)
}

/// Supplies pictures for the gather reveal. The answer may arrive on any
/// thread, any number of frames later, or never.
pub trait PictureSource {
    fn request(&mut self, reply: Sender<PictureReply>);
}

pub struct PictureLoader {
    paths: Vec<PathBuf>,
    size: u32,
    rng: fastrand::Rng,
}

impl PictureLoader {
    pub fn new(paths: Vec<PathBuf>, size: u32, seed: u64) -> Self {
        Self {
            paths,
            size,
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl PictureSource for PictureLoader {
    fn request(&mut self, reply: Sender<PictureReply>) {
        if self.paths.is_empty() {
            let _ = reply.send(Ok(PixelBuffer::heart(self.size)));
            return;
        }

        let path = self.paths[self.rng.usize(0..self.paths.len())].clone();
        let size = self.size;
        log::debug!("loading picture {}", path.display());

        let spawned = thread::Builder::new()
            .name("picture-loader".into())
            .spawn(move || {
                let result = load(&path, size);
                if let Err(e) = &result {
                    log::warn!("picture {} unavailable: {}", path.display(), e);
                }
                // The show may have quit already
                let _ = reply.send(result);
            });

        if let Err(e) = spawned {
            log::warn!("could not start picture loader: {}", e);
        }
    }
}
