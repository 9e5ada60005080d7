use std::time::Instant;

use crate::error::SessionError;
use crate::session::ExerciseKind;
use crate::session::controller::SessionController;
use crate::session::validator::{Validator, Verdict};

pub const NAV_HINT: &str = "/s skip  /b back  /r reset  /restart  /h help  /q quit";

/// One submitted answer line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    Skip,
    Back,
    Reset,
    Restart,
    Reveal,
    /// Flashcard self-grade.
    Grade(bool),
    /// `x<N>`: take back answer slot N and everything after it.
    Remove(usize),
    /// Tile or choice by its one-based number.
    Pick(usize),
    Answer(String),
}

impl Command {
    /// `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let command = match line {
            "" => return None,
            "/q" | "/quit" => Command::Quit,
            "/h" | "/help" => Command::Help,
            "/s" | "/skip" => Command::Skip,
            "/b" | "/back" => Command::Back,
            "/r" | "/reset" => Command::Reset,
            "/restart" => Command::Restart,
            "/show" => Command::Reveal,
            "/y" => Command::Grade(true),
            "/n" => Command::Grade(false),
            _ => {
                if let Some(n) = line.strip_prefix('x').and_then(|n| n.parse().ok()) {
                    Command::Remove(n)
                } else if let Ok(n) = line.parse() {
                    Command::Pick(n)
                } else {
                    Command::Answer(line.to_string())
                }
            }
        };
        Some(command)
    }
}

/// What the loop does after a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// The screen changed; stale notices go.
    Render,
    /// Solved; the prompt stays up until the auto-advance fires.
    Stay,
    Help,
    Notice(String),
    Quit,
}

pub fn execute(controller: &mut SessionController, command: Command, now: Instant) -> Flow {
    let result = match command {
        Command::Quit => return Flow::Quit,
        Command::Help => return Flow::Help,
        Command::Skip => controller.skip(now).map(|_| Flow::Render),
        Command::Back => controller.go_back(now).map(|_| Flow::Render),
        Command::Reset => controller.reset(now).map(|_| Flow::Render),
        Command::Restart => controller.restart(now).map(|_| Flow::Render),
        Command::Reveal => controller.reveal(now).map(|_| Flow::Render),
        Command::Grade(knew) => controller
            .declare(knew, now)
            .map(|v| after_verdict(controller, v)),
        Command::Remove(n) => one_based(n)
            .and_then(|slot| controller.remove_slot(slot))
            .map(|_| Flow::Render),
        Command::Pick(n) => one_based(n)
            .and_then(|i| pick(controller, i, now))
            .map(|v| after_verdict(controller, v)),
        Command::Answer(text) => answer(controller, &text, now).map(|v| after_verdict(controller, v)),
    };
    match result {
        Ok(flow) => flow,
        Err(SessionError::NoHistory) => Flow::Stay,
        Err(e) => Flow::Notice(e.to_string()),
    }
}

fn one_based(n: usize) -> Result<usize, SessionError> {
    n.checked_sub(1).ok_or(SessionError::OutOfRange(n))
}

fn pick(controller: &mut SessionController, index: usize, now: Instant) -> Result<Verdict, SessionError> {
    if matches!(controller.validator(), Some(Validator::OrderedToken(_))) {
        controller.tap_tile(index, now)
    } else {
        controller.choose_index(index, now)
    }
}

fn answer(controller: &mut SessionController, text: &str, now: Instant) -> Result<Verdict, SessionError> {
    if matches!(controller.validator(), Some(Validator::OrderedToken(_))) {
        controller.submit_token(text, now)
    } else {
        controller.submit_choice(text, now)
    }
}

/// A solved prompt waits for the auto-advance. A prompt mastered off the
/// practice list has already left the run, so whatever follows it must be
/// drawn now.
fn after_verdict(controller: &SessionController, verdict: Verdict) -> Flow {
    match verdict {
        Verdict::Final if controller.is_awaiting_advance() => Flow::Stay,
        Verdict::Final | Verdict::Partial | Verdict::Rejected => Flow::Render,
    }
}

pub fn help_hint(kind: ExerciseKind) -> &'static str {
    match kind {
        ExerciseKind::Sentences | ExerciseKind::Spelling | ExerciseKind::Conjugation => {
            "type a tile number or its text (Tab completes), x<N> takes back slot N"
        }
        ExerciseKind::FillBlank | ExerciseKind::MultipleChoice => {
            "type a choice number or the word (Tab completes)"
        }
        ExerciseKind::Flashcards => "/show reveals the answer, then /y or /n",
    }
}

/// What Tab offers for the attempt on screen.
pub fn candidates(controller: &SessionController) -> Vec<String> {
    match controller.validator() {
        Some(Validator::OrderedToken(tokens)) => {
            let mut free: Vec<String> = tokens
                .tiles()
                .iter()
                .filter(|t| !t.used)
                .map(|t| t.text.clone())
                .collect();
            free.sort();
            free.dedup();
            free
        }
        Some(Validator::AtomicChoice(choice)) => choice
            .choices()
            .iter()
            .enumerate()
            .filter(|(i, _)| !choice.is_ruled_out(*i))
            .map(|(_, c)| c.clone())
            .collect(),
        Some(Validator::SelfReport(card)) if card.is_revealed() => {
            vec!["/y".to_string(), "/n".to_string()]
        }
        Some(Validator::SelfReport(_)) => vec!["/show".to_string()],
        None => vec!["/restart".to_string(), "/q".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::time::Duration;

    use crate::app::App;
    use crate::config::Config;
    use crate::prompt::Prompt;
    use crate::session::controller::SessionSource;
    use crate::session::queue::Current;
    use crate::store::kv::MemoryStore;

    const ADVANCE: Duration = Duration::from_millis(1500);

    fn app() -> App {
        let config = Config {
            shuffle: false,
            ..Config::default()
        };
        App::with_stores(config, Rc::new(MemoryStore::new()), Rc::new(MemoryStore::new()))
    }

    fn colors() -> Vec<Prompt> {
        vec![Prompt::word("colors", "rot", "rojo"), Prompt::word("colors", "blau", "azul")]
    }

    fn run(c: &mut SessionController, line: &str, now: Instant) -> Flow {
        execute(c, Command::parse(line).unwrap(), now)
    }

    fn on_screen(c: &SessionController) -> Option<String> {
        c.current().unwrap().prompt().map(|p| p.target.clone())
    }

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse("   "), None);
        assert_eq!(Command::parse("/q"), Some(Command::Quit));
        assert_eq!(Command::parse(" /y "), Some(Command::Grade(true)));
        assert_eq!(Command::parse("x3"), Some(Command::Remove(3)));
        assert_eq!(Command::parse("12"), Some(Command::Pick(12)));
        assert_eq!(Command::parse("xilófono"), Some(Command::Answer("xilófono".to_string())));
        assert_eq!(Command::parse("café"), Some(Command::Answer("café".to_string())));
    }

    #[test]
    fn test_mastered_practice_prompt_renders_the_next_one() {
        let app = app();
        for p in &colors() {
            app.practice().add(p);
        }
        let mut c = app.controller(ExerciseKind::MultipleChoice, colors(), SessionSource::PracticeList);
        let now = Instant::now();
        c.start(|_| true, now).unwrap();
        assert_eq!(on_screen(&c).as_deref(), Some("rojo"));

        assert_eq!(run(&mut c, "rojo", now), Flow::Render);
        assert!(!c.is_awaiting_advance());
        assert_eq!(on_screen(&c).as_deref(), Some("azul"));

        assert_eq!(run(&mut c, "azul", now), Flow::Render);
        assert_eq!(c.current(), Ok(Current::Completed));
        assert!(app.practice().is_empty());
    }

    #[test]
    fn test_solved_pool_prompt_waits_for_advance() {
        let app = app();
        let mut c = app.controller(ExerciseKind::MultipleChoice, colors(), SessionSource::Pool);
        let now = Instant::now();
        c.start(|_| true, now).unwrap();
        assert_eq!(run(&mut c, "rojo", now), Flow::Stay);
        assert_eq!(on_screen(&c).as_deref(), Some("rojo"));
        assert!(c.tick(now + ADVANCE));
        assert_eq!(on_screen(&c).as_deref(), Some("azul"));
    }

    #[test]
    fn test_errors_become_notices() {
        let app = app();
        let mut c = app.controller(ExerciseKind::MultipleChoice, colors(), SessionSource::Pool);
        let now = Instant::now();
        c.start(|_| true, now).unwrap();
        assert_eq!(run(&mut c, "/b", now), Flow::Stay);
        assert_eq!(run(&mut c, "0", now), Flow::Notice(SessionError::OutOfRange(0).to_string()));
        assert_eq!(run(&mut c, "/show", now), Flow::Notice(SessionError::WrongInput("reveal").to_string()));
        assert_eq!(run(&mut c, "/h", now), Flow::Help);
        assert_eq!(run(&mut c, "/s", now), Flow::Render);
        assert_eq!(on_screen(&c).as_deref(), Some("azul"));
    }

    #[test]
    fn test_numbers_pick_tiles_and_slots() {
        let app = app();
        let pool = vec![Prompt::word("greetings", "guten Tag", "buenos días")];
        let mut c = app.controller(ExerciseKind::Spelling, pool, SessionSource::Pool);
        let now = Instant::now();
        c.start(|_| true, now).unwrap();
        for ch in "buenosd".chars() {
            assert_eq!(run(&mut c, &ch.to_string(), now), Flow::Render);
        }
        // Slot 7 as numbered on screen is the 'd', past the space.
        assert_eq!(run(&mut c, "x7", now), Flow::Render);
        let Some(Validator::OrderedToken(tokens)) = c.validator() else {
            panic!("expected tiles");
        };
        assert_eq!(tokens.expected_next(), Some("d"));

        let d = tokens.tiles().iter().position(|t| t.text == "d").unwrap();
        assert_eq!(run(&mut c, &(d + 1).to_string(), now), Flow::Render);
        assert_eq!(candidates(&c), vec!["a", "s", "í"]);
    }

    #[test]
    fn test_candidates_follow_the_attempt() {
        let app = app();
        let mut c = app.controller(ExerciseKind::MultipleChoice, colors(), SessionSource::Pool);
        let now = Instant::now();
        c.start(|_| true, now).unwrap();
        assert_eq!(run(&mut c, "azul", now), Flow::Render);
        assert_eq!(candidates(&c), vec!["rojo"]);

        let mut cards = app.controller(ExerciseKind::Flashcards, colors(), SessionSource::Pool);
        cards.start(|_| true, now).unwrap();
        assert_eq!(candidates(&cards), vec!["/show"]);
        assert_eq!(run(&mut cards, "/show", now + Duration::from_secs(2)), Flow::Render);
        assert_eq!(candidates(&cards), vec!["/y", "/n"]);
        assert_eq!(run(&mut cards, "/n", now + Duration::from_secs(3)), Flow::Render);
    }
}
