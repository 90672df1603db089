use std::fs;
use std::io::stdin;
use std::path::PathBuf;

use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::tty::IsTty;
use uuid::Uuid;

use stroop::{
    clock::SessionClock,
    config::{Config, ConfigStore, FileConfigStore},
    logging::SessionLog,
    recorder::ResultRecorder,
    runtime::CrosstermEventSource,
    session::SessionContext,
    trial::{load_trials, KeyMap, TrialSpec},
    ui::TerminalSurface,
};

/// colour-word Stroop task in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Runs a colour-word Stroop session in the terminal. Name the ink colour of each word with d (red), f (blue), j (green) or k (yellow). Results are written to <sid>.csv and a session log to <sid>.log."
)]
pub struct Cli {
    /// subject/session id used to name the output files (default: random uuid)
    #[clap(short = 's', long, value_parser = parse_sid)]
    sid: Option<String>,

    /// trial list with `color` and `word` columns
    #[clap(short = 't', long)]
    trials: Option<PathBuf>,

    /// directory for the result file and session log
    #[clap(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// fixation duration in seconds
    #[clap(long)]
    fixation: Option<f64>,

    /// response deadline in seconds
    #[clap(long)]
    deadline: Option<f64>,

    /// inter-trial interval in seconds
    #[clap(long)]
    iti: Option<f64>,

    /// input poll granularity in milliseconds
    #[clap(long)]
    poll_ms: Option<u64>,

    /// persist the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

fn parse_sid(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("sid must not be empty".to_string());
    }
    if s.chars().any(|c| matches!(c, '/' | '\\') || c.is_control()) || s == "." || s == ".." {
        return Err(format!("{:?} cannot be used as a file name", s));
    }
    Ok(s.to_string())
}

impl Cli {
    fn merge_into(&self, config: &mut Config) {
        if let Some(path) = &self.trials {
            config.trials_path = path.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(secs) = self.fixation {
            config.fixation_secs = secs;
        }
        if let Some(secs) = self.deadline {
            config.stroop_secs = secs;
        }
        if let Some(secs) = self.iti {
            config.iti_secs = secs;
        }
        if let Some(ms) = self.poll_ms {
            config.poll_ms = ms;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.merge_into(&mut config);
    let timing = config.timing()?;
    if cli.save_config {
        store
            .save(&config)
            .with_context(|| format!("saving config to {}", store.path().display()))?;
    }

    let sid = cli.sid.unwrap_or_else(|| Uuid::new_v4().to_string());
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let clock = SessionClock::new();
    let log = SessionLog::open(&config.output_dir, &sid, clock)
        .with_context(|| format!("opening session log in {}", config.output_dir.display()))?;

    let (trials, recorder) = match prepare(&config, &sid) {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!(sid = %sid, error = %format!("{:#}", e), "session crashed");
            return Err(e);
        }
    };
    let results_path = recorder.path().to_path_buf();

    let surface = match TerminalSurface::new() {
        Ok(surface) => surface,
        Err(e) => {
            tracing::error!(sid = %sid, error = %e, "session crashed");
            return Err(e.into());
        }
    };

    let mut ctx = SessionContext::new(
        sid.clone(),
        CrosstermEventSource::new(),
        surface,
        recorder,
        timing,
    )
    .with_session_clock(clock)
    .with_log(log);
    let summary = ctx.run(&trials)?;

    println!(
        "{}: {}/{} correct, {} timed out",
        sid, summary.correct, summary.trials, summary.timeouts
    );
    println!("results written to {}", results_path.display());
    Ok(())
}

/// Reads the trial list and opens the result file before the terminal is taken over.
fn prepare(config: &Config, sid: &str) -> anyhow::Result<(Vec<TrialSpec>, ResultRecorder)> {
    let trials = load_trials(&config.trials_path)?;
    let keys = KeyMap::standard();
    tracing::info!(
        trials = trials.len(),
        path = %config.trials_path.display(),
        keys = %keys.keys().collect::<String>(),
        "trial list loaded"
    );
    let recorder = ResultRecorder::open(ResultRecorder::path_for(&config.output_dir, sid))?;
    Ok((trials, recorder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["stroop"]);

        assert_eq!(cli.sid, None);
        assert_eq!(cli.trials, None);
        assert_eq!(cli.output_dir, None);
        assert_eq!(cli.deadline, None);
        assert!(!cli.save_config);
    }

    #[test]
    fn test_cli_paths_and_sid() {
        let cli = Cli::parse_from(["stroop", "-s", "P01", "-t", "list.csv", "-o", "out"]);
        assert_eq!(cli.sid.as_deref(), Some("P01"));
        assert_eq!(cli.trials, Some(PathBuf::from("list.csv")));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));

        let cli = Cli::parse_from(["stroop", "--sid", "P02", "--trials", "other.csv"]);
        assert_eq!(cli.sid.as_deref(), Some("P02"));
        assert_eq!(cli.trials, Some(PathBuf::from("other.csv")));
    }

    #[test]
    fn test_cli_rejects_sid_that_is_not_a_file_name() {
        assert!(Cli::try_parse_from(["stroop", "--sid", ""]).is_err());
        assert!(Cli::try_parse_from(["stroop", "--sid", "a/b"]).is_err());
        assert!(Cli::try_parse_from(["stroop", "--sid", ".."]).is_err());
        assert!(Cli::try_parse_from(["stroop", "--sid", "subject-7"]).is_ok());
    }

    #[test]
    fn test_cli_timing_flags_override_config() {
        let cli = Cli::parse_from([
            "stroop",
            "--fixation",
            "0.5",
            "--deadline",
            "1.5",
            "--iti",
            "0.25",
            "--poll-ms",
            "4",
        ]);
        let mut config = Config::default();
        cli.merge_into(&mut config);

        assert_eq!(config.fixation_secs, 0.5);
        assert_eq!(config.stroop_secs, 1.5);
        assert_eq!(config.iti_secs, 0.25);
        assert_eq!(config.poll_ms, 4);
        assert_eq!(config.trials_path, PathBuf::from("trials.csv"));
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let cli = Cli::parse_from(["stroop"]);
        let mut config = Config {
            stroop_secs: 3.0,
            ..Config::default()
        };
        cli.merge_into(&mut config);
        assert_eq!(config.stroop_secs, 3.0);
    }

    #[test]
    fn test_cli_save_config_flag() {
        let cli = Cli::parse_from(["stroop", "--save-config"]);
        assert!(cli.save_config);
    }
}
