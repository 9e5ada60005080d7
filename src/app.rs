use std::path::PathBuf;
use std::rc::Rc;

use crate::config::Config;
use crate::engine::coins::CoinLedger;
use crate::engine::progress::ProgressTracker;
use crate::error::LoadError;
use crate::prompt::{Prompt, normalize};
use crate::prompt::filter::PromptFilter;
use crate::prompt::source::{PromptSource, TsvFormat, TsvSource};
use crate::session::ExerciseKind;
use crate::session::controller::{SessionController, SessionSource};
use crate::store::kv::{FileStore, KeyValueStore, MemoryStore};
use crate::store::practice::PracticeListStore;
use crate::store::selection::EnabledSelection;

/// Process-wide wiring: configuration plus the two stores everything else is
/// opened against.
pub struct App {
    pub config: Config,
    /// Survives restarts: practice list, coins, sentence selection.
    store: Rc<dyn KeyValueStore>,
    /// Lives as long as the process: reward counters.
    session_store: Rc<dyn KeyValueStore>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let store: Rc<dyn KeyValueStore> =
            match FileStore::with_base_dir(PathBuf::from(&config.data_dir)) {
                Ok(s) => Rc::new(s),
                Err(e) => {
                    tracing::warn!(
                        dir = %config.data_dir,
                        error = %e,
                        "data directory unavailable, progress will not be saved"
                    );
                    Rc::new(MemoryStore::new())
                }
            };
        Self::with_stores(config, store, Rc::new(MemoryStore::new()))
    }

    pub fn with_stores(
        config: Config,
        store: Rc<dyn KeyValueStore>,
        session_store: Rc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config,
            store,
            session_store,
        }
    }

    /// Table an exercise draws from, and how to read it.
    pub fn data_source(&self, kind: ExerciseKind) -> (&str, TsvFormat) {
        match kind {
            ExerciseKind::Conjugation => (self.config.verbs_path.as_str(), TsvFormat::Verbs),
            ExerciseKind::FillBlank => (self.config.cloze_path.as_str(), TsvFormat::Cloze),
            ExerciseKind::Sentences
            | ExerciseKind::Spelling
            | ExerciseKind::MultipleChoice
            | ExerciseKind::Flashcards => (self.config.words_path.as_str(), TsvFormat::Words),
        }
    }

    /// Load the prompt pool, from `path_override` if given.
    pub fn load_pool(
        &self,
        kind: ExerciseKind,
        path_override: Option<&str>,
    ) -> Result<Vec<Prompt>, LoadError> {
        let (default_path, format) = self.data_source(kind);
        let path = path_override.unwrap_or(default_path);
        let prompts = TsvSource::new(format).load(path)?;
        tracing::info!(exercise = %kind, path, prompts = prompts.len(), "loaded prompts");
        Ok(prompts)
    }

    /// Predicate for `SessionController::start`. Sentence runs also honor the
    /// learner's enabled-sentence selection.
    pub fn session_filter(
        &self,
        kind: ExerciseKind,
        category: Option<&str>,
    ) -> impl Fn(&Prompt) -> bool + use<> {
        let filter = match category {
            Some(name) => PromptFilter::category(name),
            None => PromptFilter::all(),
        };
        let selection =
            (kind == ExerciseKind::Sentences).then(|| EnabledSelection::open(self.store.clone()));
        move |p: &Prompt| {
            filter.is_allowed(p) && selection.as_ref().is_none_or(|s| s.is_enabled(p))
        }
    }

    pub fn controller(
        &self,
        kind: ExerciseKind,
        pool: Vec<Prompt>,
        source: SessionSource,
    ) -> SessionController {
        SessionController::new(
            kind,
            pool,
            self.practice(),
            ProgressTracker::open(self.session_store.clone(), self.config.thresholds()),
            self.coins(),
        )
        .with_source(source)
        .with_timings(self.config.timings())
        .with_shuffle(self.config.shuffle)
    }

    pub fn practice(&self) -> PracticeListStore {
        PracticeListStore::open(self.store.clone())
    }

    pub fn coins(&self) -> CoinLedger {
        CoinLedger::open(self.store.clone())
    }

    pub fn selection(&self) -> EnabledSelection {
        EnabledSelection::open(self.store.clone())
    }

    /// Sentences the learner can switch on and off, in table order.
    pub fn sentence_pool(&self, path_override: Option<&str>) -> Result<Vec<Prompt>, LoadError> {
        let pool = self.load_pool(ExerciseKind::Sentences, path_override)?;
        Ok(pool
            .into_iter()
            .filter(|p| ExerciseKind::Sentences.accepts(p))
            .collect())
    }

    /// Switch the picked sentences on or off and save the selection. A pick is
    /// a one-based position in `pool` or a sentence's source or target text.
    /// Returns how many sentences matched.
    pub fn set_sentences_enabled(&self, pool: &[Prompt], picks: &[String], on: bool) -> usize {
        let mut selection = self.selection();
        let mut matched = 0;
        for pick in picks {
            let hits: Vec<&Prompt> = match pick.trim().parse::<usize>() {
                Ok(n) => n.checked_sub(1).and_then(|i| pool.get(i)).into_iter().collect(),
                Err(_) => {
                    let text = normalize(pick);
                    pool.iter()
                        .filter(|p| p.source == text || p.target == text)
                        .collect()
                }
            };
            if hits.is_empty() {
                tracing::warn!(pick = %pick, "no sentence matches");
            }
            for p in hits {
                selection.set(p, on);
                matched += 1;
            }
        }
        if matched > 0 {
            selection.save();
        }
        matched
    }

    pub fn enable_all_sentences(&self, pool: &[Prompt]) {
        let mut selection = self.selection();
        selection.set_all(pool, true);
        selection.save();
    }

    /// Pay for one game. False leaves the balance untouched.
    pub fn spend_for_game(&self, coins: &mut CoinLedger) -> bool {
        coins.spend(self.config.coins_per_game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    fn app() -> App {
        App::with_stores(
            Config::default(),
            Rc::new(MemoryStore::new()),
            Rc::new(MemoryStore::new()),
        )
    }

    #[test]
    fn test_bundled_pools_load_for_every_exercise() {
        let app = app();
        for kind in ExerciseKind::ALL {
            let pool = app.load_pool(*kind, None).unwrap();
            assert!(pool.iter().any(|p| kind.accepts(p)), "no prompts for {kind}");
        }
    }

    #[test]
    fn test_path_override_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("w.tsv");
        std::fs::write(&path, "category\tes\tde\nx\tuno\teins\n").unwrap();
        let pool = app()
            .load_pool(ExerciseKind::Spelling, path.to_str())
            .unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].target, "uno");
    }

    #[test]
    fn test_session_filter_honors_selection_for_sentences() {
        let app = app();
        let a = Prompt::word("s", "Gute Nacht.", "Buenas noches.");
        let b = Prompt::word("s", "Danke.", "Gracias.");
        let mut selection = app.selection();
        selection.set(&a, false);
        selection.save();

        let filter = app.session_filter(ExerciseKind::Sentences, None);
        assert!(!filter(&a));
        assert!(filter(&b));
        // Other exercises ignore the selection.
        let filter = app.session_filter(ExerciseKind::Flashcards, Some("S"));
        assert!(filter(&a));
        assert!(!filter(&Prompt::word("food", "Brot", "pan")));
    }

    #[test]
    fn test_controllers_share_coins_and_practice() {
        let app = app();
        let pool = vec![Prompt::word("c", "rot", "rojo"), Prompt::word("c", "blau", "azul")];
        let mut first = app
            .controller(ExerciseKind::MultipleChoice, pool.clone(), SessionSource::Pool)
            .with_shuffle(false);
        let now = Instant::now();
        first.start(|_| true, now).unwrap();
        first.submit_choice("azul", now).unwrap();
        first.submit_choice("rojo", now).unwrap();

        assert_eq!(app.coins().balance(), 1);
        assert_eq!(app.practice().len(), 1);

        let mut drill = app.controller(ExerciseKind::MultipleChoice, pool, SessionSource::PracticeList);
        drill.start(|_| true, now).unwrap();
        assert_eq!(drill.queue().unwrap().len(), 1);
    }

    #[test]
    fn test_sentence_selection_edits_feed_the_session_filter() {
        let app = app();
        let pool = app.sentence_pool(None).unwrap();
        assert!(pool.len() >= 2);
        assert!(pool.iter().all(|p| ExerciseKind::Sentences.accepts(p)));

        let by_text = vec![pool[0].source.clone()];
        assert_eq!(app.set_sentences_enabled(&pool, &by_text, false), 1);
        let by_number = vec!["2".to_string(), "0".to_string(), "nonsense".to_string()];
        assert_eq!(app.set_sentences_enabled(&pool, &by_number, false), 1);
        assert_eq!(app.selection().enabled_count(&pool), pool.len() - 2);

        let filter = app.session_filter(ExerciseKind::Sentences, None);
        assert!(!filter(&pool[0]));
        assert!(!filter(&pool[1]));

        let mut drill = app.controller(ExerciseKind::Sentences, pool.clone(), SessionSource::Pool);
        drill.start(filter, Instant::now()).unwrap();
        assert_eq!(drill.queue().unwrap().len(), pool.len() - 2);

        app.enable_all_sentences(&pool);
        assert_eq!(app.selection().enabled_count(&pool), pool.len());
    }

    #[test]
    fn test_spend_for_game() {
        let app = app();
        let mut coins = app.coins();
        coins.add(12);
        assert!(app.spend_for_game(&mut coins));
        assert!(!app.spend_for_game(&mut coins));
        assert_eq!(app.coins().balance(), 2);
    }
}
