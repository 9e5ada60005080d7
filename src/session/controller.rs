use std::rc::Rc;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::engine::coins::{CoinLedger, SubscriptionId};
use crate::engine::progress::{ProgressTracker, RewardKind, RewardStats};
use crate::error::SessionError;
use crate::prompt::{Prompt, normalize};
use crate::session::deferred::DeferredAdvance;
use crate::session::presenter::{NullPresenter, Presenter};
use crate::session::queue::{Current, SessionQueue};
use crate::session::result::{RunCounters, RunSummary};
use crate::session::validator::{Validator, Verdict};
use crate::session::{ExerciseKind, Outcome};
use crate::store::practice::{PracticeListStore, Reconciled};

const FALLBACK_CHOICES: usize = 3;
const SOLVED_CONFETTI: u32 = 30;
const COMPLETED_CONFETTI: u32 = 50;

pub type PromptPredicate = Rc<dyn Fn(&Prompt) -> bool>;

/// Where a run takes its prompts from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionSource {
    Pool,
    /// The learner's missed prompts; correct answers retire them.
    PracticeList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionTimings {
    pub auto_advance: Duration,
    pub reveal_delay: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            auto_advance: Duration::from_millis(1500),
            reveal_delay: Duration::from_millis(1200),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeferredAction {
    Advance,
}

struct Attempt {
    validator: Validator,
    missed: bool,
    finished: bool,
}

/// Drives one exercise: owns the queue, the attempt at the current prompt,
/// and the pending auto-advance, and routes graded answers to the practice
/// list, reward counters and coins.
///
/// Every navigation cancels a pending auto-advance before it touches the
/// queue.
pub struct SessionController {
    kind: ExerciseKind,
    source: SessionSource,
    pool: Vec<Prompt>,
    timings: SessionTimings,
    shuffle: bool,
    filter: PromptPredicate,
    queue: Option<SessionQueue>,
    attempt: Option<Attempt>,
    deferred: DeferredAdvance<DeferredAction>,
    practice: PracticeListStore,
    progress: ProgressTracker,
    coins: CoinLedger,
    presenter: Box<dyn Presenter>,
    rng: SmallRng,
    counters: RunCounters,
}

impl SessionController {
    pub fn new(
        kind: ExerciseKind,
        pool: Vec<Prompt>,
        practice: PracticeListStore,
        progress: ProgressTracker,
        coins: CoinLedger,
    ) -> Self {
        Self {
            kind,
            source: SessionSource::Pool,
            pool,
            timings: SessionTimings::default(),
            shuffle: true,
            filter: Rc::new(|_| true),
            queue: None,
            attempt: None,
            deferred: DeferredAdvance::new(),
            practice,
            progress,
            coins,
            presenter: Box::new(NullPresenter),
            rng: SmallRng::from_entropy(),
            counters: RunCounters::default(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: SessionSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_timings(mut self, timings: SessionTimings) -> Self {
        self.timings = timings;
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn kind(&self) -> ExerciseKind {
        self.kind
    }

    pub fn source(&self) -> SessionSource {
        self.source
    }

    /// Build a fresh run from the prompts `filter` lets through.
    ///
    /// # Errors
    ///
    /// `EmptyQueue` if nothing is left to practice; the controller then has no
    /// active run.
    pub fn start(
        &mut self,
        filter: impl Fn(&Prompt) -> bool + 'static,
        now: Instant,
    ) -> Result<(), SessionError> {
        self.filter = Rc::new(filter);
        self.rebuild(now)
    }

    /// Rebuild with the last filter, reshuffling.
    pub fn restart(&mut self, now: Instant) -> Result<(), SessionError> {
        self.rebuild(now)
    }

    fn rebuild(&mut self, now: Instant) -> Result<(), SessionError> {
        self.deferred.cancel();
        self.counters = RunCounters::default();

        let kind = self.kind;
        let filter = self.filter.clone();
        let source: &[Prompt] = match self.source {
            SessionSource::Pool => &self.pool,
            SessionSource::PracticeList => self.practice.entries(),
        };
        let candidates: Vec<Prompt> = source
            .iter()
            .filter(|p| kind.accepts(p) && filter(p))
            .cloned()
            .collect();

        match SessionQueue::build(candidates, self.shuffle, &mut self.rng) {
            Ok(queue) => {
                tracing::info!(
                    exercise = %kind,
                    source = ?self.source,
                    prompts = queue.len(),
                    "session started"
                );
                self.queue = Some(queue);
                self.load_attempt(now);
                Ok(())
            }
            Err(e) => {
                tracing::info!(exercise = %kind, source = ?self.source, "nothing to practice");
                self.queue = None;
                self.attempt = None;
                Err(e)
            }
        }
    }

    pub fn current(&self) -> Result<Current<'_>, SessionError> {
        self.queue
            .as_ref()
            .map(SessionQueue::current)
            .ok_or(SessionError::NotStarted)
    }

    pub fn queue(&self) -> Option<&SessionQueue> {
        self.queue.as_ref()
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.attempt.as_ref().map(|a| &a.validator)
    }

    pub fn is_awaiting_advance(&self) -> bool {
        self.deferred.is_armed()
    }

    /// Typed input is NFC-normalized first, like the loaded tables.
    pub fn submit_token(&mut self, token: &str, now: Instant) -> Result<Verdict, SessionError> {
        let token = normalize(token);
        self.submit(now, |v| match v {
            Validator::OrderedToken(o) => o.tap_text(&token),
            _ => Err(SessionError::WrongInput("tile")),
        })
    }

    pub fn tap_tile(&mut self, index: usize, now: Instant) -> Result<Verdict, SessionError> {
        self.submit(now, |v| match v {
            Validator::OrderedToken(o) => o.tap(index),
            _ => Err(SessionError::WrongInput("tile")),
        })
    }

    pub fn submit_choice(&mut self, choice: &str, now: Instant) -> Result<Verdict, SessionError> {
        let choice = normalize(choice);
        self.submit(now, |v| match v {
            Validator::AtomicChoice(c) => c.choose(&choice),
            _ => Err(SessionError::WrongInput("choice")),
        })
    }

    pub fn choose_index(&mut self, index: usize, now: Instant) -> Result<Verdict, SessionError> {
        self.submit(now, |v| match v {
            Validator::AtomicChoice(c) => c.choose_index(index),
            _ => Err(SessionError::WrongInput("choice")),
        })
    }

    /// Self-graded answer for flashcards.
    pub fn declare(&mut self, correct: bool, now: Instant) -> Result<Verdict, SessionError> {
        self.submit(now, |v| match v {
            Validator::SelfReport(s) => s.declare(correct),
            _ => Err(SessionError::WrongInput("self-report")),
        })
    }

    pub fn reveal(&mut self, now: Instant) -> Result<(), SessionError> {
        match &mut self.active_attempt()?.validator {
            Validator::SelfReport(s) => s.reveal(now),
            _ => Err(SessionError::WrongInput("reveal")),
        }
    }

    /// Take back the token in the `open`th answer slot and everything after
    /// it. Separators are not counted.
    pub fn remove_slot(&mut self, open: usize) -> Result<usize, SessionError> {
        match &mut self.active_attempt()?.validator {
            Validator::OrderedToken(o) => o.remove_open(open),
            _ => Err(SessionError::WrongInput("slot")),
        }
    }

    pub fn skip(&mut self, now: Instant) -> Result<(), SessionError> {
        let queue = self.queue.as_ref().ok_or(SessionError::NotStarted)?;
        if queue.is_completed() {
            return Err(SessionError::Completed);
        }
        self.deferred.cancel();

        let answered = self.attempt.as_ref().is_some_and(|a| a.finished);
        if let Some(queue) = self.queue.as_mut() {
            queue.skip();
        }
        if !answered {
            self.counters.skipped += 1;
        }
        self.load_attempt(now);
        Ok(())
    }

    /// Return to the prompt before the last advance. `NoHistory` leaves
    /// everything untouched, including a pending advance.
    pub fn go_back(&mut self, now: Instant) -> Result<(), SessionError> {
        let queue = self.queue.as_ref().ok_or(SessionError::NotStarted)?;
        if !queue.can_go_back() {
            return Err(SessionError::NoHistory);
        }
        self.deferred.cancel();
        if let Some(queue) = self.queue.as_mut() {
            queue.go_back()?;
        }
        self.load_attempt(now);
        Ok(())
    }

    /// Start the current prompt over.
    pub fn reset(&mut self, now: Instant) -> Result<(), SessionError> {
        let queue = self.queue.as_ref().ok_or(SessionError::NotStarted)?;
        if queue.is_completed() {
            return Err(SessionError::Completed);
        }
        self.deferred.cancel();
        self.load_attempt(now);
        Ok(())
    }

    /// Timer hook. Performs the pending advance once due; returns whether it
    /// fired.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(DeferredAction::Advance) = self.deferred.poll(now) else {
            return false;
        };
        if let Some(queue) = self.queue.as_mut() {
            queue.advance();
        }
        self.load_attempt(now);
        true
    }

    pub fn summary(&self) -> Option<RunSummary> {
        self.queue.as_ref().map(|q| {
            RunSummary::new(self.kind.as_str(), self.counters, q.cursor(), q.len())
        })
    }

    pub fn stats(&mut self) -> RewardStats {
        self.progress.stats()
    }

    pub fn coins(&self) -> &CoinLedger {
        &self.coins
    }

    pub fn practice(&self) -> &PracticeListStore {
        &self.practice
    }

    /// Change hook for a coin counter display.
    pub fn on_coins_changed(&mut self, listener: impl FnMut(u64) + 'static) -> SubscriptionId {
        self.coins.subscribe(listener)
    }

    fn active_attempt(&mut self) -> Result<&mut Attempt, SessionError> {
        if self.deferred.is_armed() {
            return Err(SessionError::AwaitingAdvance);
        }
        let queue = self.queue.as_ref().ok_or(SessionError::NotStarted)?;
        if queue.is_completed() {
            return Err(SessionError::Completed);
        }
        let attempt = self.attempt.as_mut().ok_or(SessionError::Completed)?;
        if attempt.finished {
            return Err(SessionError::AlreadyAnswered);
        }
        Ok(attempt)
    }

    fn submit(
        &mut self,
        now: Instant,
        input: impl FnOnce(&mut Validator) -> Result<Verdict, SessionError>,
    ) -> Result<Verdict, SessionError> {
        let attempt = self.active_attempt()?;
        let verdict = input(&mut attempt.validator)?;

        let ends = match verdict {
            Verdict::Final => true,
            Verdict::Rejected => attempt.validator.ends_on_any_verdict(),
            Verdict::Partial => false,
        };
        let first_miss = verdict == Verdict::Rejected && !attempt.missed;
        if verdict == Verdict::Rejected {
            attempt.missed = true;
        }
        let clean = !attempt.missed;
        attempt.finished = ends;

        let mut mastered = false;
        match verdict {
            Verdict::Partial => {}
            Verdict::Rejected => {
                self.presenter.flash_error();
                if first_miss {
                    self.grade(Outcome::Wrong);
                }
            }
            Verdict::Final => {
                self.presenter.flash_success();
                self.presenter.confetti(SOLVED_CONFETTI);
                self.coins.add(1);
                if clean {
                    mastered = self.grade(Outcome::Correct);
                } else if self.kind.reward_kind() == RewardKind::Discrete {
                    // Finished sentences count toward the reward even after a slip.
                    self.progress.record_correct(RewardKind::Discrete);
                }
            }
        }

        if mastered {
            if let Some(queue) = self.queue.as_mut() {
                queue.retire_current();
            }
            self.load_attempt(now);
        } else if ends
            && let Err(e) =
                self.deferred
                    .schedule(now, self.timings.auto_advance, DeferredAction::Advance)
        {
            tracing::warn!(error = %e, "could not schedule advance");
        }
        Ok(verdict)
    }

    /// Record a graded outcome everywhere it matters. Returns true when the
    /// prompt was mastered off the practice list and must leave the run.
    fn grade(&mut self, outcome: Outcome) -> bool {
        let Some(prompt) = self.current_prompt() else {
            return false;
        };
        let reward_kind = self.kind.reward_kind();
        match outcome {
            Outcome::Correct => {
                self.counters.correct += 1;
                self.progress.record_correct(reward_kind);
            }
            Outcome::Wrong => {
                self.counters.wrong += 1;
                self.progress.record_wrong(reward_kind);
            }
        }
        let from_practice = self.source == SessionSource::PracticeList;
        let reconciled = self.practice.reconcile(&prompt, outcome, from_practice);
        tracing::debug!(target_text = %prompt.target, ?outcome, ?reconciled, "graded");
        reconciled == Reconciled::Mastered
    }

    fn current_prompt(&self) -> Option<Prompt> {
        self.queue
            .as_ref()
            .and_then(|q| q.current().prompt().cloned())
    }

    fn load_attempt(&mut self, now: Instant) {
        let Some(prompt) = self.current_prompt() else {
            self.attempt = None;
            if self.queue.is_some() {
                tracing::info!(exercise = %self.kind, "session completed");
                self.presenter.confetti(COMPLETED_CONFETTI);
            }
            return;
        };
        let fallback = fallback_choices(&self.pool, self.kind, &prompt, &mut self.rng);
        let validator = Validator::build(
            self.kind,
            &prompt,
            &fallback,
            now,
            self.timings.reveal_delay,
            &mut self.rng,
        );
        self.attempt = Some(Attempt {
            validator,
            missed: false,
            finished: false,
        });
    }
}

/// Distractors for multiple choice when a prompt brings none: other targets
/// from the same category first, then from anywhere in the pool.
fn fallback_choices<R: Rng + ?Sized>(
    pool: &[Prompt],
    kind: ExerciseKind,
    prompt: &Prompt,
    rng: &mut R,
) -> Vec<String> {
    if kind != ExerciseKind::MultipleChoice || !prompt.distractors.is_empty() {
        return Vec::new();
    }
    let (mut same, mut other): (Vec<&Prompt>, Vec<&Prompt>) = pool
        .iter()
        .filter(|p| kind.accepts(p) && p.target != prompt.target)
        .partition(|p| p.category == prompt.category);
    same.shuffle(rng);
    other.shuffle(rng);

    let mut picked: Vec<String> = Vec::with_capacity(FALLBACK_CHOICES);
    for p in same.into_iter().chain(other) {
        if picked.len() == FALLBACK_CHOICES {
            break;
        }
        if !picked.contains(&p.target) {
            picked.push(p.target.clone());
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::RewardThresholds;
    use crate::store::kv::{KeyValueStore, MemoryStore};
    use std::cell::RefCell;

    const ADVANCE: Duration = Duration::from_millis(1500);

    #[derive(Default)]
    struct Feedback {
        success: usize,
        errors: usize,
        confetti: Vec<u32>,
    }

    struct RecordingPresenter(Rc<RefCell<Feedback>>);

    impl Presenter for RecordingPresenter {
        fn flash_success(&mut self) {
            self.0.borrow_mut().success += 1;
        }
        fn flash_error(&mut self) {
            self.0.borrow_mut().errors += 1;
        }
        fn confetti(&mut self, count: u32) {
            self.0.borrow_mut().confetti.push(count);
        }
    }

    fn words(names: &[&str]) -> Vec<Prompt> {
        names.iter().map(|n| Prompt::word("colors", n, n)).collect()
    }

    fn sentences() -> Vec<Prompt> {
        vec![
            Prompt::word("s", "Ich mag Kaffee.", "Me gusta el café."),
            Prompt::word("s", "Gute Nacht.", "Buenas noches."),
        ]
    }

    fn controller(
        kind: ExerciseKind,
        pool: Vec<Prompt>,
        kv: Rc<dyn KeyValueStore>,
    ) -> SessionController {
        let session_kv: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        SessionController::new(
            kind,
            pool,
            PracticeListStore::open(kv.clone()),
            ProgressTracker::open(session_kv, RewardThresholds::default()),
            CoinLedger::open(kv),
        )
        .with_shuffle(false)
        .with_seed(11)
    }

    fn current_source(c: &SessionController) -> Option<String> {
        c.current().unwrap().prompt().map(|p| p.source.clone())
    }

    fn solve_sentence(c: &mut SessionController, now: Instant) -> Verdict {
        let target = c.current().unwrap().prompt().unwrap().target.clone();
        let mut last = Verdict::Rejected;
        for word in target.split_whitespace() {
            last = c.submit_token(word, now).unwrap();
        }
        last
    }

    #[test]
    fn test_empty_pool_is_empty_queue() {
        let mut c = controller(ExerciseKind::Sentences, words(&["rojo"]), Rc::new(MemoryStore::new()));
        let now = Instant::now();
        assert_eq!(c.start(|_| true, now), Err(SessionError::EmptyQueue));
        assert_eq!(c.current().unwrap_err(), SessionError::NotStarted);
        assert_eq!(c.skip(now), Err(SessionError::NotStarted));
    }

    #[test]
    fn test_correct_answer_advances_after_delay() {
        let mut c = controller(ExerciseKind::Sentences, sentences(), Rc::new(MemoryStore::new()));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        assert_eq!(solve_sentence(&mut c, t0), Verdict::Final);
        assert!(c.is_awaiting_advance());
        assert_eq!(c.coins().balance(), 1);

        // Input during the window is refused.
        assert_eq!(c.submit_token("Buenas", t0), Err(SessionError::AwaitingAdvance));

        assert!(!c.tick(t0 + ADVANCE - Duration::from_millis(1)));
        assert!(c.tick(t0 + ADVANCE));
        assert_eq!(current_source(&c).as_deref(), Some("Gute Nacht."));
        assert_eq!(c.queue().unwrap().cursor(), 1);
    }

    #[test]
    fn test_skip_during_pending_advance_moves_once() {
        let mut c = controller(ExerciseKind::MultipleChoice, words(&["a", "b", "c"]), Rc::new(MemoryStore::new()));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        assert_eq!(c.submit_choice("a", t0), Ok(Verdict::Final));

        c.skip(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(c.queue().unwrap().cursor(), 1);
        // The canceled advance never fires.
        assert!(!c.tick(t0 + ADVANCE * 2));
        assert_eq!(c.queue().unwrap().cursor(), 1);
        // An answered prompt does not count as skipped.
        assert_eq!(c.summary().unwrap().skipped, 0);
    }

    #[test]
    fn test_go_back_cancels_pending_advance() {
        let mut c = controller(ExerciseKind::MultipleChoice, words(&["a", "b", "c"]), Rc::new(MemoryStore::new()));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        c.skip(t0).unwrap();
        assert_eq!(c.submit_choice("b", t0), Ok(Verdict::Final));
        c.go_back(t0 + Duration::from_millis(200)).unwrap();
        assert_eq!(c.queue().unwrap().cursor(), 0);
        assert!(!c.tick(t0 + ADVANCE * 2));
        assert_eq!(c.queue().unwrap().cursor(), 0);
    }

    #[test]
    fn test_go_back_without_history_keeps_pending_advance() {
        let mut c = controller(ExerciseKind::MultipleChoice, words(&["a", "b"]), Rc::new(MemoryStore::new()));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        c.submit_choice("a", t0).unwrap();
        assert_eq!(c.go_back(t0), Err(SessionError::NoHistory));
        assert!(c.tick(t0 + ADVANCE));
        assert_eq!(c.queue().unwrap().cursor(), 1);
    }

    #[test]
    fn test_reset_reloads_current_prompt() {
        let mut c = controller(ExerciseKind::Sentences, sentences(), Rc::new(MemoryStore::new()));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        c.submit_token("Me", t0).unwrap();
        c.reset(t0).unwrap();
        let Some(Validator::OrderedToken(o)) = c.validator() else {
            panic!("expected tiles");
        };
        assert_eq!(o.filled_count(), 0);
        assert_eq!(c.queue().unwrap().cursor(), 0);
    }

    #[test]
    fn test_wrong_answer_adds_to_practice_list_once() {
        let kv: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let mut c = controller(ExerciseKind::Sentences, sentences(), kv);
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        assert_eq!(c.submit_token("gusta", t0), Ok(Verdict::Rejected));
        assert_eq!(c.submit_token("el", t0), Ok(Verdict::Rejected));
        assert_eq!(c.practice().len(), 1);
        assert_eq!(c.summary().unwrap().wrong, 1);

        // Finishing after a slip still earns a coin and a sentence, not a
        // clean correct.
        assert_eq!(solve_sentence(&mut c, t0), Verdict::Final);
        assert_eq!(c.summary().unwrap().correct, 0);
        assert_eq!(c.coins().balance(), 1);
        assert_eq!(c.stats().discrete, 1);
    }

    #[test]
    fn test_practice_list_correct_splices_queue() {
        let kv: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let pool = words(&["a", "b", "c"]);
        {
            let mut list = PracticeListStore::open(kv.clone());
            for p in &pool {
                list.add(p);
            }
        }
        let mut c = controller(ExerciseKind::MultipleChoice, pool.clone(), kv)
            .with_source(SessionSource::PracticeList);
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();

        assert_eq!(c.submit_choice("a", t0), Ok(Verdict::Final));
        let left: Vec<&str> = c
            .queue()
            .unwrap()
            .remaining()
            .iter()
            .map(|p| p.source.as_str())
            .collect();
        assert_eq!(left, ["b", "c"]);
        assert!(!c.practice().contains(&pool[0]));
        assert!(!c.is_awaiting_advance());
        assert_eq!(current_source(&c).as_deref(), Some("b"));
    }

    #[test]
    fn test_practice_list_last_mastered_completes() {
        let kv: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let pool = words(&["a"]);
        PracticeListStore::open(kv.clone()).add(&pool[0]);
        let feedback = Rc::new(RefCell::new(Feedback::default()));
        let mut c = controller(ExerciseKind::MultipleChoice, pool, kv)
            .with_source(SessionSource::PracticeList)
            .with_presenter(Box::new(RecordingPresenter(feedback.clone())));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        c.submit_choice("a", t0).unwrap();
        assert_eq!(c.current(), Ok(Current::Completed));
        assert!(c.practice().is_empty());
        assert_eq!(feedback.borrow().confetti, vec![SOLVED_CONFETTI, COMPLETED_CONFETTI]);
    }

    #[test]
    fn test_pool_correct_does_not_touch_practice_list() {
        let kv: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let pool = words(&["a", "b"]);
        PracticeListStore::open(kv.clone()).add(&pool[0]);
        let mut c = controller(ExerciseKind::MultipleChoice, pool.clone(), kv);
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        c.submit_choice("a", t0).unwrap();
        assert!(c.practice().contains(&pool[0]));
        assert_eq!(c.queue().unwrap().len(), 2);
    }

    #[test]
    fn test_flashcard_flow() {
        let mut c = controller(ExerciseKind::Flashcards, words(&["a", "b"]), Rc::new(MemoryStore::new()));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        assert_eq!(c.declare(true, t0), Err(SessionError::NotRevealed));
        assert!(matches!(c.reveal(t0), Err(SessionError::RevealTooEarly(_))));
        let later = t0 + Duration::from_millis(1200);
        c.reveal(later).unwrap();
        assert_eq!(c.declare(false, later), Ok(Verdict::Rejected));
        assert!(c.is_awaiting_advance());
        assert_eq!(c.practice().len(), 1);
        assert!(c.tick(later + ADVANCE));
        assert_eq!(current_source(&c).as_deref(), Some("b"));
    }

    #[test]
    fn test_wrong_input_kind() {
        let mut c = controller(ExerciseKind::Flashcards, words(&["a"]), Rc::new(MemoryStore::new()));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        assert_eq!(c.submit_token("a", t0), Err(SessionError::WrongInput("tile")));
        assert_eq!(c.submit_choice("a", t0), Err(SessionError::WrongInput("choice")));
        assert_eq!(c.remove_slot(0), Err(SessionError::WrongInput("slot")));
    }

    #[test]
    fn test_completed_run_refuses_input() {
        let feedback = Rc::new(RefCell::new(Feedback::default()));
        let mut c = controller(ExerciseKind::MultipleChoice, words(&["a"]), Rc::new(MemoryStore::new()))
            .with_presenter(Box::new(RecordingPresenter(feedback.clone())));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        c.skip(t0).unwrap();
        assert_eq!(c.current(), Ok(Current::Completed));
        assert_eq!(c.submit_choice("a", t0), Err(SessionError::Completed));
        assert_eq!(c.skip(t0), Err(SessionError::Completed));
        assert_eq!(feedback.borrow().confetti, vec![COMPLETED_CONFETTI]);
        let summary = c.summary().unwrap();
        assert!(summary.completed);
        assert_eq!(summary.skipped, 1);
        // Restart brings the prompts back.
        c.restart(t0).unwrap();
        assert_eq!(current_source(&c).as_deref(), Some("a"));
    }

    #[test]
    fn test_filter_and_kind_shape_both_apply() {
        let mut pool = sentences();
        pool.push(Prompt::word("colors", "rot", "rojo"));
        let mut c = controller(ExerciseKind::Sentences, pool, Rc::new(MemoryStore::new()));
        c.start(|p| p.source.starts_with("Gute"), Instant::now()).unwrap();
        assert_eq!(c.queue().unwrap().len(), 1);
    }

    #[test]
    fn test_coin_listener_fires_on_solve() {
        let mut c = controller(ExerciseKind::MultipleChoice, words(&["a", "b"]), Rc::new(MemoryStore::new()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        c.on_coins_changed(move |b| s.borrow_mut().push(b));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        c.submit_choice("a", t0).unwrap();
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_decomposed_accents_match_loaded_text() {
        let mut c = controller(ExerciseKind::Sentences, sentences(), Rc::new(MemoryStore::new()));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        for word in ["Me", "gusta", "el"] {
            c.submit_token(word, t0).unwrap();
        }
        assert_eq!(c.submit_token("cafe\u{301}.", t0), Ok(Verdict::Final));

        let mut c = controller(
            ExerciseKind::MultipleChoice,
            words(&["café", "té"]),
            Rc::new(MemoryStore::new()),
        );
        c.start(|_| true, t0).unwrap();
        assert_eq!(c.submit_choice(" cafe\u{301} ", t0), Ok(Verdict::Final));
    }

    #[test]
    fn test_remove_slot_counts_open_slots_only() {
        let pool = vec![Prompt::word("greetings", "guten Tag", "buenos días")];
        let mut c = controller(ExerciseKind::Spelling, pool, Rc::new(MemoryStore::new()));
        let t0 = Instant::now();
        c.start(|_| true, t0).unwrap();
        for ch in "buenosd".chars() {
            c.submit_token(&ch.to_string(), t0).unwrap();
        }
        // The seventh letter is the 'd' after the space.
        assert_eq!(c.remove_slot(6), Ok(1));
        let Some(Validator::OrderedToken(tokens)) = c.validator() else {
            panic!("expected tiles");
        };
        assert_eq!(tokens.reconstruction(), "buenos ");
        assert_eq!(tokens.expected_next(), Some("d"));
        assert_eq!(c.remove_slot(10), Err(SessionError::OutOfRange(10)));
    }

    #[test]
    fn test_fallback_choices_prefer_same_category() {
        let mut pool = words(&["rojo", "azul", "verde", "gris"]);
        pool.push(Prompt::word("food", "Brot", "pan"));
        let mut rng = SmallRng::seed_from_u64(5);
        let picked = fallback_choices(&pool, ExerciseKind::MultipleChoice, &pool[0], &mut rng);
        assert_eq!(picked.len(), 3);
        assert!(!picked.contains(&"rojo".to_string()));
        assert!(!picked.contains(&"pan".to_string()));
        assert!(fallback_choices(&pool, ExerciseKind::Flashcards, &pool[0], &mut rng).is_empty());
    }
}
