use std::{
    fs,
    io::{self, stdin},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend as TerminalBackend, CrosstermBackend},
    Terminal,
};

use sous::{
    app::{App, Flow},
    app_dirs::AppDirs,
    clock::MonotonicTime,
    config::{Config, ConfigStore, FileConfigStore},
    controller::{Backend, CaptureController, HttpController},
    recipe::{load_recipes, pick, Recipe, SelectionCache},
    runtime::{dispatch, run_command, FixedTicker, Runner, StatusPoller, TerminalEventSource},
    ui::screen::current_screen,
};

/// guided cooking sessions in the terminal, paced against a live clock
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Walks through a recipe timeline step by step, keeping pace with a pausable session clock while a kitchen backend watches the stove and talks back."
)]
pub struct Cli {
    /// recipe file as produced by the generator (single recipe, list, or {"recipes": [...]})
    #[clap(short = 'r', long)]
    recipe: Option<PathBuf>,

    /// which recipe to use when the file holds several (0-based)
    #[clap(short = 'n', long, default_value_t = 0)]
    pick: usize,

    /// use one of the bundled demo recipes
    #[clap(short = 'd', long, conflicts_with = "recipe")]
    demo: Option<String>,

    /// list bundled demo recipes and exit
    #[clap(long)]
    list_demos: bool,

    /// kitchen backend base url
    #[clap(short = 'b', long)]
    backend: Option<String>,

    /// do not start or stop capture on the backend
    #[clap(long)]
    no_capture: bool,

    /// disable talking to the chef
    #[clap(long)]
    no_speech: bool,

    /// persist the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,

    /// forget the remembered recipe selection before starting
    #[clap(long)]
    forget: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(url) = &self.backend {
            config.backend_url = url.clone();
        }
        if self.no_capture {
            config.capture_enabled = false;
        }
        if self.no_speech {
            config.speech_enabled = false;
        }
    }

    /// Explicit file, then named demo, then the last selection, then the first demo
    fn resolve_recipe(&self) -> Result<Recipe> {
        if let Some(path) = &self.recipe {
            return pick(load_recipes(path)?, self.pick);
        }
        if let Some(name) = &self.demo {
            return Recipe::demo(name);
        }
        if let Some(recipe) = SelectionCache::new().and_then(|cache| cache.load()) {
            log::info!("resuming last selected recipe {}", recipe.id);
            return Ok(recipe);
        }
        let first = Recipe::demo_names()
            .into_iter()
            .next()
            .context("no bundled demo recipes")?;
        Recipe::demo(&first)
    }
}

fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();

    // stderr belongs to the terminal UI, so logs only go to the file
    let log_file = AppDirs::log_path().and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match log_file {
        Some(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    if cli.forget {
        if let Some(cache) = SelectionCache::new() {
            cache
                .clear()
                .context("clearing the remembered recipe selection")?;
            log::info!("forgot remembered recipe selection");
        }
    }

    if cli.list_demos {
        for name in Recipe::demo_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply_to(&mut config);
    if cli.save_config {
        store
            .save(&config)
            .with_context(|| format!("saving {}", store.path().display()))?;
    }

    let recipe = match cli.resolve_recipe() {
        Ok(recipe) => recipe,
        Err(err) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, format!("{err:#}")).exit();
        }
    };
    if let Some(cache) = SelectionCache::new() {
        if let Err(err) = cache.store(&recipe) {
            log::warn!("could not remember recipe selection: {err:#}");
        }
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    log::info!("cooking {} against {}", recipe.id, config.backend_url);
    let controller = HttpController::new(
        &config.backend_url,
        config.request_timeout(),
        config.command_timeout(),
    );
    let reachable = match controller.health() {
        Ok(health) => {
            log::info!("backend healthy: {}", health.status);
            true
        }
        Err(err) => {
            log::warn!("backend health check failed: {err:#}");
            false
        }
    };
    let backend: Arc<dyn Backend> = Arc::new(controller);

    let mut app = App::new(recipe, config, MonotonicTime::new());
    app.status.seed(reachable);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(terminal_backend)?;

    let result = start_tui(&mut terminal, &mut app, backend.clone());

    // stop capture even if the loop bailed out
    for command in app.teardown() {
        let outcome = run_command(command, backend.as_ref());
        log::info!("teardown: {outcome:?}");
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: TerminalBackend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    backend: Arc<dyn Backend>,
) -> Result<()> {
    let events = TerminalEventSource::new();
    let tx = events.sender();
    let mut poller = StatusPoller::spawn(
        backend.clone(),
        app.config.status_poll_interval(),
        tx.clone(),
    );
    let mut runner = Runner::new(events, FixedTicker::new(app.config.tick_interval()));

    loop {
        terminal.draw(|f| current_screen(app.state).render(app, f))?;

        if app.handle(runner.step()) == Flow::Quit {
            break;
        }
        for command in app.take_commands() {
            dispatch(command, backend.clone(), tx.clone());
        }
    }

    poller.shutdown();
    Ok(())
}
