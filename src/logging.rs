use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

use crate::clock::SessionClock;

/// Environment variable overriding the session log filter (e.g. `debug`).
pub const LOG_ENV: &str = "STROOP_LOG";

/// Chronological per-session event log, `<dir>/<sid>.log`.
///
/// The subscriber is installed for the current thread only and removed when
/// this value is dropped. Timestamps are seconds on the session clock.
pub struct SessionLog {
    path: PathBuf,
    _guard: DefaultGuard,
}

impl SessionLog {
    pub fn path_for<P: AsRef<Path>>(dir: P, sid: &str) -> PathBuf {
        dir.as_ref().join(format!("{}.log", sid))
    }

    pub fn open<P: AsRef<Path>>(dir: P, sid: &str, clock: SessionClock) -> io::Result<Self> {
        let path = Self::path_for(dir, sid);
        let file = File::create(&path)?;

        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_timer(clock)
            .with_env_filter(filter)
            .finish();

        let guard = tracing::subscriber::set_default(subscriber);
        Ok(Self {
            path,
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
