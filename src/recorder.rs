use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::RecorderError;
use crate::trial::TrialResult;

/// Column order of the result file.
pub const HEADER: [&str; 7] = ["sid", "trial", "color", "word", "key", "rt", "correct"];

/// Destination for scored trials.
///
/// `append` is a durability boundary: once it returns `Ok`, the row must
/// survive the process dying immediately afterwards.
pub trait ResultSink {
    fn append(&mut self, row: &TrialResult) -> Result<(), RecorderError>;

    /// Release the destination. Must be safe to call more than once.
    fn close(&mut self) -> Result<(), RecorderError>;
}

/// Append-only CSV result file, synced to disk after every row.
pub struct ResultRecorder {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    rows: usize,
}

impl ResultRecorder {
    /// `<dir>/<sid>.csv`
    pub fn path_for<P: AsRef<Path>>(dir: P, sid: &str) -> PathBuf {
        dir.as_ref().join(format!("{}.csv", sid))
    }

    /// Creates or truncates `path` and commits the header before returning.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RecorderError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| RecorderError::Open {
                path: path.clone(),
                source,
            })?;

        // Header is written by hand so an empty session still gets one.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        Ok(Self {
            path,
            writer: Some(writer),
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}

impl ResultSink for ResultRecorder {
    fn append(&mut self, row: &TrialResult) -> Result<(), RecorderError> {
        let writer = self.writer.as_mut().ok_or(RecorderError::Closed)?;
        writer.serialize(row)?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes and releases the file. Closing an already closed recorder is a no-op.
    fn close(&mut self) -> Result<(), RecorderError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

impl fmt::Debug for ResultRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultRecorder")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .field("rows", &self.rows)
            .finish()
    }
}

impl Drop for ResultRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "closing result file on drop failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::ColorLabel;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    fn row(trial: usize, key: Option<char>, rt: Option<f64>, correct: bool) -> TrialResult {
        TrialResult {
            sid: "abc".to_string(),
            trial,
            color: ColorLabel::Red,
            word: "RED".to_string(),
            key,
            rt,
            correct,
        }
    }

    #[test]
    fn header_is_on_disk_right_after_open() {
        let dir = tempdir().unwrap();
        let path = ResultRecorder::path_for(dir.path(), "abc");
        let recorder = ResultRecorder::open(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "sid,trial,color,word,key,rt,correct\n"
        );
        assert_eq!(recorder.rows_written(), 0);
        assert!(path.ends_with("abc.csv"));
    }

    #[test]
    fn each_append_is_visible_before_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.csv");
        let mut recorder = ResultRecorder::open(&path).unwrap();

        recorder
            .append(&row(0, Some('d'), Some(0.3), true))
            .unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert_eq!(contents.lines().nth(1), Some("abc,0,red,RED,d,0.3,true"));

        recorder.append(&row(1, None, None, false)).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().nth(2), Some("abc,1,red,RED,,,false"));
        assert_eq!(recorder.rows_written(), 2);
    }

    #[test]
    fn zero_rt_is_distinct_from_missing_rt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.csv");
        let mut recorder = ResultRecorder::open(&path).unwrap();
        recorder.append(&row(0, Some('d'), Some(0.0), true)).unwrap();
        recorder.close().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().nth(1), Some("abc,0,red,RED,d,0.0,true"));
    }

    #[test]
    fn close_is_idempotent_and_keeps_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.csv");
        let mut recorder = ResultRecorder::open(&path).unwrap();
        recorder.append(&row(0, Some('f'), Some(0.5), false)).unwrap();

        recorder.close().unwrap();
        recorder.close().unwrap();
        assert!(!recorder.is_open());
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn close_without_rows_leaves_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let mut recorder = ResultRecorder::open(&path).unwrap();
        recorder.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn append_after_close_fails() {
        let dir = tempdir().unwrap();
        let mut recorder = ResultRecorder::open(dir.path().join("s.csv")).unwrap();
        recorder.close().unwrap();
        assert_matches!(
            recorder.append(&row(0, None, None, false)),
            Err(RecorderError::Closed)
        );
    }

    #[test]
    fn open_truncates_previous_session_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.csv");
        fs::write(&path, "old,data\n1,2\n3,4\n").unwrap();
        drop(ResultRecorder::open(&path).unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "sid,trial,color,word,key,rt,correct\n"
        );
    }

    #[test]
    fn open_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("s.csv");
        assert_matches!(
            ResultRecorder::open(&path),
            Err(RecorderError::Open { .. })
        );
    }
}
