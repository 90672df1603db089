use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrialListError;

/// Ink colour of a stimulus and the answer a key press stands for.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[strum(serialize_all = "lowercase")]
pub enum ColorLabel {
    Red,
    Blue,
    Green,
    Yellow,
}

impl FromStr for ColorLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(ColorLabel::Red),
            "blue" => Ok(ColorLabel::Blue),
            "green" => Ok(ColorLabel::Green),
            "yellow" => Ok(ColorLabel::Yellow),
            other => Err(format!("unknown colour `{}`", other)),
        }
    }
}

impl TryFrom<String> for ColorLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Response keys and the colour each one answers.
pub const KEY_BINDINGS: [(char, ColorLabel); 4] = [
    ('d', ColorLabel::Red),
    ('f', ColorLabel::Blue),
    ('j', ColorLabel::Green),
    ('k', ColorLabel::Yellow),
];

/// Read-only view over [`KEY_BINDINGS`].
#[derive(Clone, Copy, Debug)]
pub struct KeyMap {
    bindings: &'static [(char, ColorLabel)],
}

impl KeyMap {
    pub fn standard() -> Self {
        Self {
            bindings: &KEY_BINDINGS,
        }
    }

    pub fn color_for(&self, key: char) -> Option<ColorLabel> {
        self.bindings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, color)| *color)
    }

    pub fn is_bound(&self, key: char) -> bool {
        self.color_for(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = char> + '_ {
        self.bindings.iter().map(|(k, _)| *k)
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::standard()
    }
}

/// One row of the trial list.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TrialSpec {
    pub color: ColorLabel,
    pub word: String,
}

impl TrialSpec {
    pub fn new(color: ColorLabel, word: impl Into<String>) -> Self {
        Self {
            color,
            word: word.into(),
        }
    }
}

/// A recognised key press and its reaction time in seconds from stimulus onset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Response {
    pub key: char,
    pub rt: f64,
}

/// One row of the result file. Field order is the column order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialResult {
    pub sid: String,
    pub trial: usize,
    pub color: ColorLabel,
    pub word: String,
    pub key: Option<char>,
    pub rt: Option<f64>,
    pub correct: bool,
}

impl TrialResult {
    /// Scores `response` against the ink colour of `spec`.
    pub fn score(
        sid: &str,
        trial: usize,
        spec: &TrialSpec,
        response: Option<Response>,
        keys: &KeyMap,
    ) -> Self {
        let correct = response
            .and_then(|r| keys.color_for(r.key))
            .is_some_and(|c| c == spec.color);

        Self {
            sid: sid.to_string(),
            trial,
            color: spec.color,
            word: spec.word.clone(),
            key: response.map(|r| r.key),
            rt: response.map(|r| r.rt),
            correct,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.key.is_none()
    }
}

/// Reads the ordered trial list. Columns other than `color` and `word` are ignored.
pub fn load_trials<P: AsRef<Path>>(path: P) -> Result<Vec<TrialSpec>, TrialListError> {
    let path = path.as_ref();
    let read_err = |source| TrialListError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(read_err)?;

    reader
        .deserialize::<TrialSpec>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)
}
