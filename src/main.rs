use crossterm::{
    cursor::{Hide, Show as ShowCursor},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseButton, MouseEvent,
        MouseEventKind,
    },
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use skyburst::canvas::TerminalCanvas;
use skyburst::config::{self, Command, Options, Tunables};
use skyburst::picture::PictureLoader;
use skyburst::show::Show;
use std::env;
use std::fs::File;
use std::io::{self, stdout, BufWriter, Stdout};
use std::path::Path;
use std::time::{Duration, Instant};

const FIXED_DT: f32 = 1.0 / 60.0;

fn print_usage() {
    eprintln!("skyburst - Terminal fireworks that gather into a picture when the sky gets crowded");
    eprintln!();
    eprintln!("Usage: skyburst [OPTIONS] [IMAGE...]");
    eprintln!();
    eprintln!("Images (PNG or JPEG) are revealed as particles after a gather; without any,");
    eprintln!("a heart is shown.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --bg-color RRGGBB  Set background color as hex (default 0c1445)");
    eprintln!("  --auto             Launch fireworks automatically");
    eprintln!("  --seed N           Seed the random generator");
    eprintln!("  --log FILE         Write logs to FILE (filter with RUST_LOG, default info)");
    eprintln!();
    eprintln!("Click to launch a firework, Space launches one at random.");
    eprintln!("Press 'q', ESC, or Ctrl+C to exit");
}

fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    // The display owns the terminal, so stderr logging is opt-in via RUST_LOG
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .try_init();
        }
        None => {
            let _ = env_logger::Builder::from_default_env().try_init();
        }
    }
    Ok(())
}

fn run(options: Options) -> io::Result<()> {
    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);

    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All), EnableMouseCapture)?;

    let result = event_loop(&mut stdout, &options);

    execute!(stdout, ShowCursor, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal::disable_raw_mode()?;

    result
}

fn event_loop(stdout: &mut BufWriter<Stdout>, options: &Options) -> io::Result<()> {
    let (cols, rows) = terminal::size()?;
    let mut canvas = TerminalCanvas::new(cols as usize, rows as usize, options.bg_color);
    let (width, height) = canvas.extent();

    let seed = options.seed.unwrap_or_else(|| fastrand::u64(..));
    let tunables = Tunables::default();
    let pictures = PictureLoader::new(options.images.clone(), tunables.image_size, seed.rotate_left(17));
    let mut show = Show::new(width, height, tunables, Box::new(pictures), seed);
    show.set_auto_launch(options.auto_launch);
    log::info!(
        "show started on {}x{} cells, seed {}, {} picture(s)",
        cols,
        rows,
        seed,
        options.images.len()
    );

    let mut last_frame = Instant::now();
    let mut accumulator = 0.0f32;

    loop {
        if event::poll(Duration::from_millis(1))? {
            match event::read()? {
                Event::Key(key_event) => {
                    if key_event.code == KeyCode::Char('q')
                        || key_event.code == KeyCode::Esc
                        || (key_event.code == KeyCode::Char('c')
                            && key_event.modifiers.contains(event::KeyModifiers::CONTROL))
                    {
                        break;
                    }
                    if key_event.code == KeyCode::Char(' ') {
                        if let Err(e) = show.launch_random() {
                            log::debug!("random launch rejected: {}", e);
                        }
                    }
                }
                Event::Mouse(MouseEvent {
                    kind: MouseEventKind::Down(MouseButton::Left),
                    column,
                    row,
                    ..
                }) => {
                    let (x, y) = TerminalCanvas::cell_center(column, row);
                    if let Err(e) = show.launch(x, y) {
                        log::debug!("launch at ({:.0}, {:.0}) rejected: {}", x, y, e);
                    }
                }
                Event::Resize(cols, rows) => {
                    canvas.resize(cols as usize, rows as usize);
                    let (width, height) = canvas.extent();
                    show.resize(width, height);
                    execute!(stdout, Clear(ClearType::All))?;
                }
                _ => {}
            }
        }

        let now = Instant::now();
        let frame_time = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        accumulator += frame_time;
        if accumulator > FIXED_DT * 3.0 {
            accumulator = FIXED_DT * 3.0;
        }

        let mut stepped = false;
        while accumulator >= FIXED_DT {
            show.step();
            canvas.fade();
            accumulator -= FIXED_DT;
            stepped = true;
        }

        if stepped {
            show.render(&mut canvas);
            canvas.present(stdout, show.particle_count())?;
        }
    }

    log::info!("show stopped with {} particles alive", show.particle_count());
    Ok(())
}

fn main() -> io::Result<()> {
    let options = match config::parse_args(env::args().skip(1)) {
        Ok(Command::Run(options)) => options,
        Ok(Command::Help) => {
            print_usage();
            return Ok(());
        }
        Err(message) => {
            eprintln!("{}", message);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    init_logging(options.log_file.as_deref())?;
    run(options)
}
