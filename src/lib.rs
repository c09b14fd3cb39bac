pub mod errors;
pub mod leaderboard;
pub mod models;
pub mod quiz;
pub mod reflections;
pub mod store;

pub use crate::errors::{AppError, AppResult};
pub use crate::leaderboard::LeaderboardRepository;
pub use crate::models::{
    HealthResponse, LeaderboardRow, LeaderboardUser, Location, QuizMode, ReflectionEntry,
    ScoreEntry, User,
};
pub use crate::quiz::QuizContent;
pub use crate::reflections::ReflectionRepository;
pub use crate::store::{DataPaths, JsonStore};

use crate::models::{LeaderboardDocument, UsersDocument};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Everything the interface layer needs: the three repositories wired to a
/// shared store over one data root. Construction bootstraps the directory
/// layout and seeds every document with its default content.
#[derive(Debug)]
pub struct Backend {
    pub reflections: ReflectionRepository,
    pub leaderboard: LeaderboardRepository,
    pub quiz: QuizContent,
}

impl Backend {
    pub fn new(root: &Path) -> AppResult<Self> {
        let paths = DataPaths::new(root)?;
        let store = Arc::new(JsonStore::new());

        store.ensure(&paths.reflections, &Vec::<ReflectionEntry>::new())?;
        store.ensure(&paths.users, &UsersDocument::default())?;
        store.ensure(&paths.leaderboard, &LeaderboardDocument::default())?;
        for mode in QuizMode::ALL {
            store.ensure(&paths.quiz(mode), &quiz::empty_quiz_doc(mode))?;
        }
        tracing::info!(root = %root.display(), "backend data root ready");

        Ok(Self {
            reflections: ReflectionRepository::new(Arc::clone(&store), paths.reflections.clone()),
            leaderboard: LeaderboardRepository::new(
                Arc::clone(&store),
                paths.users.clone(),
                paths.leaderboard.clone(),
            ),
            quiz: QuizContent::new(store, paths),
        })
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse { status: "ok" }
    }
}

/// Daily-rolling JSON logs under `<data_dir>/logs`, env-filtered via
/// `RUST_LOG`. Intended to be called once by the embedding process.
pub fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "backend.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
