use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;

use tapvocab::app::App;
use tapvocab::config::Config;
use tapvocab::error::SessionError;
use tapvocab::event::{AppEvent, EventHandler};
use tapvocab::session::ExerciseKind;
use tapvocab::session::controller::{SessionController, SessionSource};
use tapvocab::ui::command::{self, Command, Flow, help_hint};
use tapvocab::ui::line_input::{InputResult, LineInput};
use tapvocab::ui::status::{SharedStatus, Status, StatusPresenter};
use tapvocab::ui::view;

const TICK_RATE: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "tapvocab", version, about = "Vocabulary trainer: build sentences, conjugate, fill blanks")]
struct Cli {
    #[arg(short, long, default_value = "sentences", help = "Exercise: sentences, conjugation, fill-blank, spelling, choice, flashcards")]
    exercise: ExerciseKind,

    #[arg(short, long, help = "Prompt table (file, http(s) URL or embedded:<name>)")]
    data: Option<String>,

    #[arg(short, long, help = "Only prompts from this category")]
    category: Option<String>,

    #[arg(long, help = "Drill the prompts you missed before")]
    practice: bool,

    #[arg(long, help = "Keep the table order")]
    no_shuffle: bool,

    #[arg(long, help = "Print the coin balance and exit")]
    coins: bool,

    #[arg(long, help = "Empty the practice list and exit")]
    clear_practice: bool,

    #[arg(long, help = "Spend coins on a game and exit")]
    spend: bool,

    #[arg(long, help = "List the sentences and which ones are drilled, then exit")]
    list_sentences: bool,

    #[arg(long, value_name = "SENTENCE", help = "Drill a sentence again (its number from --list-sentences or its text)")]
    enable: Vec<String>,

    #[arg(long, value_name = "SENTENCE", help = "Stop drilling a sentence (its number from --list-sentences or its text)")]
    disable: Vec<String>,

    #[arg(long, help = "Drill every sentence again")]
    enable_all: bool,
}

impl Cli {
    fn manages_sentences(&self) -> bool {
        self.list_sentences || self.enable_all || !self.enable.is_empty() || !self.disable.is_empty()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load();
    let mut config = loaded.as_ref().ok().cloned().unwrap_or_default();
    init_logging(&config.data_dir);
    if let Err(e) = &loaded {
        tracing::warn!(error = %e, "ignoring unreadable config");
    }
    if cli.no_shuffle {
        config.shuffle = false;
    }

    let app = App::new(config);

    if cli.coins {
        println!("{} coins", app.coins().balance());
        return Ok(());
    }
    if cli.clear_practice {
        let mut practice = app.practice();
        let n = practice.len();
        practice.clear();
        println!("Removed {n} prompts from the practice list.");
        return Ok(());
    }
    if cli.spend {
        let mut coins = app.coins();
        if app.spend_for_game(&mut coins) {
            println!("Game unlocked! {} coins left.", coins.balance());
        } else {
            println!(
                "A game costs {} coins; you have {}.",
                app.config.coins_per_game,
                coins.balance()
            );
        }
        return Ok(());
    }
    if cli.manages_sentences() {
        return manage_sentences(&app, &cli);
    }

    let kind = cli.exercise;
    let pool = app.load_pool(kind, cli.data.as_deref())?;
    let source = if cli.practice {
        SessionSource::PracticeList
    } else {
        SessionSource::Pool
    };

    let status: SharedStatus = Rc::new(RefCell::new(Status::new(app.coins().balance())));
    let mut controller = app
        .controller(kind, pool, source)
        .with_presenter(Box::new(StatusPresenter(status.clone())));
    let listener = status.clone();
    controller.on_coins_changed(move |balance| listener.borrow_mut().coins = balance);

    let filter = app.session_filter(kind, cli.category.as_deref());
    match controller.start(filter, Instant::now()) {
        Ok(()) => {}
        Err(SessionError::EmptyQueue) => {
            println!("Nothing to practice here.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    status.borrow_mut().notice = Some(help_hint(kind).to_string());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(TICK_RATE);
    let result = run(&mut terminal, &mut controller, &status, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result?;

    print_summary(&mut controller);
    Ok(())
}

/// Log to a file next to the stores; stderr would draw over the screen.
fn init_logging(data_dir: &str) {
    let path = Path::new(data_dir).join("tapvocab.log");
    let writer: Box<dyn Write + Send> = match fs::create_dir_all(data_dir)
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&path))
    {
        Ok(file) => Box::new(file),
        Err(_) => Box::new(io::sink()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tapvocab=info")),
        )
        .with_writer(Mutex::new(writer))
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut SessionController,
    status: &SharedStatus,
    events: &EventHandler,
) -> Result<()> {
    let mut input = LineInput::default();
    loop {
        input.set_candidates(command::candidates(controller));
        terminal.draw(|frame| view::render(frame, controller, &status.borrow(), &input))?;

        match events.next()? {
            AppEvent::Key(key) => {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }
                match input.handle(key) {
                    InputResult::Continue => {}
                    InputResult::Cancel => {
                        input.take();
                    }
                    InputResult::Submit => {
                        let Some(line) = Command::parse(&input.take()) else {
                            continue;
                        };
                        let flow = command::execute(controller, line, Instant::now());
                        let mut status = status.borrow_mut();
                        match flow {
                            Flow::Quit => return Ok(()),
                            Flow::Render => status.notice = None,
                            Flow::Stay => {}
                            Flow::Help => status.notice = Some(help_hint(controller.kind()).to_string()),
                            Flow::Notice(message) => status.notice = Some(message),
                        }
                    }
                }
            }
            AppEvent::Tick => {
                let now = Instant::now();
                // The advance can finish the run, which reports to the presenter.
                let advanced = controller.tick(now);
                let mut status = status.borrow_mut();
                if advanced {
                    status.notice = None;
                }
                status.expire(now);
            }
            AppEvent::Resize => {}
        }
    }
}

fn manage_sentences(app: &App, cli: &Cli) -> Result<()> {
    let pool = app.sentence_pool(cli.data.as_deref())?;
    if cli.enable_all {
        app.enable_all_sentences(&pool);
    }
    let changed = app.set_sentences_enabled(&pool, &cli.enable, true)
        + app.set_sentences_enabled(&pool, &cli.disable, false);
    if changed > 0 {
        println!("Updated {changed} sentences.");
    }

    let selection = app.selection();
    if cli.list_sentences {
        for (i, p) in pool.iter().enumerate() {
            let mark = if selection.is_enabled(p) { "[x]" } else { "[ ]" };
            println!("{:>3}. {mark} {}  {}", i + 1, p.source, p.target.clone().dark_grey());
        }
    }
    println!(
        "{} of {} sentences enabled.",
        selection.enabled_count(&pool),
        pool.len()
    );
    Ok(())
}

fn print_summary(controller: &mut SessionController) {
    if let Some(summary) = controller.summary() {
        println!(
            "{} correct, {} wrong, {} skipped ({:.0}% accuracy)",
            summary.correct, summary.wrong, summary.skipped, summary.accuracy
        );
    }
    let stats = controller.stats();
    if stats.unlocked {
        println!("{}", "Reward unlocked!".yellow().bold());
    }
    println!("{} coins", controller.coins().balance());
}
