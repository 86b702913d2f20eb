//! Golden register scenarios.
//!
//! A scenario is a JSON file listing seed movies, a sequence of steps and the
//! expected register state afterwards. Scenarios live in the crate's
//! `golden/` directory.
//!
//! ```json
//! {
//!   "name": "id_reuse",
//!   "seed": [{ "id": 0, "title": "Heat" }],
//!   "steps": [{ "op": "remove", "id": 0 }, { "op": "create", "title": "Ronin" }],
//!   "expect": { "used": 1, "free": 0, "movies": [{ "id": 0, "title": "Ronin" }] }
//! }
//! ```

use crate::fixtures::{create_movie, remove_movie, retitle_movie, HookCall, HookLog, Movie};
use mmapp_core::{
    CoreError, CoreResult, EntityId, Register, RegisterConfig, ReversibleTransaction, Transaction,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One step of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Create a movie.
    Create {
        /// Title to give it.
        title: String,
    },
    /// Retitle the movie stored at `id`.
    Retitle {
        /// Target id.
        id: EntityId,
        /// New title.
        title: String,
    },
    /// Remove the movie stored at `id`.
    Remove {
        /// Target id.
        id: EntityId,
    },
    /// Roll back the transaction committed by an earlier step.
    Rollback {
        /// Zero-based index of that step.
        step: usize,
    },
}

/// Expected register state after all steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    /// Expected `used_space`.
    pub used: usize,
    /// Expected `free_space`.
    pub free: usize,
    /// Expected stored movies, ordered by id. Omitted means unchecked.
    #[serde(default)]
    pub movies: Option<Vec<Movie>>,
    /// Expected hook calls in order. Omitted means unchecked.
    #[serde(default)]
    pub hooks: Option<Vec<HookCall>>,
}

/// A replayable register scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, used in failure messages.
    pub name: String,
    /// Movies the register starts with.
    #[serde(default)]
    pub seed: Vec<Movie>,
    /// Steps to replay.
    pub steps: Vec<Step>,
    /// State to check afterwards.
    pub expect: Expectation,
}

/// Register state observed after replaying a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Observed `used_space`.
    pub used: usize,
    /// Observed `free_space`.
    pub free: usize,
    /// Stored movies ordered by id.
    pub movies: Vec<Movie>,
    /// Hook calls in order.
    pub hooks: Vec<HookCall>,
}

impl Scenario {
    /// Parses a scenario from JSON text.
    ///
    /// # Panics
    ///
    /// Panics if the text is not a valid scenario.
    pub fn from_json(text: &str) -> Self {
        serde_json::from_str(text).expect("Failed to parse scenario")
    }

    /// Loads a scenario file.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read scenario {path:?}: {e}"));
        Self::from_json(&text)
    }

    /// Replays the steps against a fresh register.
    pub fn run(&self) -> CoreResult<Outcome> {
        let log = HookLog::new();
        let register = log.attach(Register::from_elements(
            Movie::new,
            self.seed.clone(),
            RegisterConfig::default(),
        )?);

        let mut committed: Vec<Option<ReversibleTransaction<Movie>>> = Vec::new();
        for step in &self.steps {
            let txn = match step {
                Step::Create { title } => Some(create_movie(&register, title)?.1),
                Step::Retitle { id, title } => Some(retitle_movie(&register, *id, title)?.1),
                Step::Remove { id } => Some(remove_movie(&register, *id)?.1),
                Step::Rollback { step } => {
                    let mut txn = committed
                        .get_mut(*step)
                        .and_then(Option::take)
                        .ok_or_else(|| {
                            CoreError::illegal_operation(format!(
                                "step {step} has no transaction to roll back"
                            ))
                        })?;
                    txn.rollback()?;
                    None
                }
            };
            committed.push(txn);
        }

        Ok(Outcome {
            used: register.used_space(),
            free: register.free_space(),
            movies: register.elements(),
            hooks: log.take(),
        })
    }

    /// Replays the scenario and asserts the expectation.
    ///
    /// # Panics
    ///
    /// Panics if a step fails or the outcome differs.
    pub fn assert_expected(&self) {
        let outcome = self
            .run()
            .unwrap_or_else(|e| panic!("Scenario '{}' failed: {e}", self.name));

        assert_eq!(
            (outcome.used, outcome.free),
            (self.expect.used, self.expect.free),
            "Scenario '{}': used/free mismatch",
            self.name
        );
        if let Some(movies) = &self.expect.movies {
            assert_eq!(
                &outcome.movies, movies,
                "Scenario '{}': stored movies mismatch",
                self.name
            );
        }
        if let Some(hooks) = &self.expect.hooks {
            assert_eq!(
                &outcome.hooks, hooks,
                "Scenario '{}': hook calls mismatch",
                self.name
            );
        }
    }
}

/// Returns the directory holding the golden scenario files.
pub fn golden_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("golden")
}

/// Loads every `*.json` scenario in [`golden_dir`], sorted by file name.
///
/// # Panics
///
/// Panics if the directory or a file cannot be read.
pub fn load_golden_scenarios() -> Vec<Scenario> {
    let mut paths: Vec<PathBuf> = fs::read_dir(golden_dir())
        .expect("Failed to read golden directory")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    paths.into_iter().map(Scenario::load).collect()
}
