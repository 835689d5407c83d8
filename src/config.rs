use std::path::PathBuf;

pub type Rgb = (u8, u8, u8);

// Burst palette, bright material-style accents
pub const COLORS: [Rgb; 16] = [
    (0xFF, 0x52, 0x52),
    (0xFF, 0x40, 0x81),
    (0xE0, 0x40, 0xFB),
    (0x7C, 0x4D, 0xFF),
    (0x53, 0x6D, 0xFE),
    (0x44, 0x8A, 0xFF),
    (0x40, 0xC4, 0xFF),
    (0x18, 0xFF, 0xFF),
    (0x64, 0xFF, 0xDA),
    (0x69, 0xF0, 0xAE),
    (0xB2, 0xFF, 0x59),
    (0xEE, 0xFF, 0x41),
    (0xFF, 0xFF, 0x00),
    (0xFF, 0xD7, 0x40),
    (0xFF, 0xAB, 0x40),
    (0xFF, 0x6E, 0x40),
];

pub const STAR_COLOR: Rgb = (255, 255, 255);

// Deep night blue, also the color the trail fade converges to
pub const DEFAULT_BG: Rgb = (12, 20, 69);

// Simulation units per terminal cell horizontally; each row holds two half-blocks
pub const PIXELS_PER_CELL: f32 = 4.0;

pub fn random_color(rng: &mut fastrand::Rng) -> Rgb {
    COLORS[rng.usize(0..COLORS.len())]
}

/// Every fixed constant of the show in one table. All distances are in
/// simulation pixels, all durations in frames.
///
/// `*_min`/`*_max` pairs are inclusive ranges. A max below its min is
/// treated as equal to the min.
#[derive(Debug, Clone)]
pub struct Tunables {
    // population pressure
    pub gather_threshold: usize,
    pub gather_frames: u32,
    pub gather_exit_floor: usize,
    pub capacity: usize,

    // projectiles
    pub launch_speed: f32,
    pub arrival_epsilon: f32,
    pub trail_chance: f32,
    pub burst_min: usize,
    pub burst_max: usize,
    pub burst_speed_min: f32,
    pub burst_speed_max: f32,
    pub burst_intensity: f32,
    pub spark_chance: f32,
    pub palette_every: usize,

    // gather spiral
    pub spiral_pull: f32,
    pub spiral_rotation: f32,
    pub spiral_shrink: f32,
    pub spiral_kill_radius: f32,

    // image reveal
    pub image_size: u32,
    pub image_spacing: f32,
    pub image_alpha_floor: u8,
    pub appear_delay_max: f32,
    pub fade_in_frames: u32,
    pub travel_frames: u32,
    pub image_life_min: u32,
    pub image_life_max: u32,
    pub disappear_min: u32,
    pub disappear_max: u32,

    pub star_count: usize,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            gather_threshold: 800,
            gather_frames: 365,
            gather_exit_floor: 30,
            capacity: 2048,

            launch_speed: 6.0,
            arrival_epsilon: 2.0,
            trail_chance: 0.3,
            burst_min: 150,
            burst_max: 300,
            burst_speed_min: 3.0,
            burst_speed_max: 8.0,
            burst_intensity: 2.0,
            spark_chance: 0.7,
            palette_every: 5,

            spiral_pull: 0.01,
            spiral_rotation: 0.02,
            spiral_shrink: 0.995,
            spiral_kill_radius: 2.0,

            image_size: 64,
            image_spacing: 4.0,
            image_alpha_floor: 0,
            appear_delay_max: 60.0,
            fade_in_frames: 40,
            travel_frames: 60,
            image_life_min: 200,
            image_life_max: 400,
            disappear_min: 20,
            disappear_max: 120,

            star_count: 24,
        }
    }
}

/// Command line options.
#[derive(Debug, Clone)]
pub struct Options {
    pub bg_color: Rgb,
    pub auto_launch: bool,
    pub seed: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub images: Vec<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bg_color: DEFAULT_BG,
            auto_launch: false,
            seed: None,
            log_file: None,
            images: Vec::new(),
        }
    }
}

pub enum Command {
    Run(Options),
    Help,
}

pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

pub fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bg-color" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--bg-color requires a hex color value".to_string())?;
                options.bg_color = parse_hex_color(&value).ok_or_else(|| {
                    format!("Invalid hex color: {}\nExpected format: RRGGBB (e.g., 1a1b26)", value)
                })?;
            }
            "--auto" => options.auto_launch = true,
            "--seed" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--seed requires a number".to_string())?;
                let seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid seed: {}", value))?;
                options.seed = Some(seed);
            }
            "--log" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--log requires a file path".to_string())?;
                options.log_file = Some(PathBuf::from(value));
            }
            "help" | "--help" | "-h" => return Ok(Command::Help),
            other if other.starts_with('-') => {
                return Err(format!("Unknown option: {}", other));
            }
            path => options.images.push(PathBuf::from(path)),
        }
    }

    Ok(Command::Run(options))
}
