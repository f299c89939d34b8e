//! Match sink — keyword scoring and threshold-gated flush to output files

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::scanner::Entity;

/// Count non-overlapping occurrences of `needle` in `hay`.
fn count_occurrences(hay: &str, needle: &str) -> usize {
    hay.matches(needle).count()
}

/// Per-writer buffer of matched entity texts.
///
/// Each entity is scored against every keyword in list order; the first
/// hit appends the entire lower-cased text once, newline-prefixed.
/// Crossing the char threshold flushes the buffer to a fresh
/// `<worker_id>_<unix_nanos>.txt` file in the output directory. Exactly
/// one writer ever touches a given sink, so flushes need no coordination.
pub struct MatchSink {
    output_dir: PathBuf,
    worker_id: usize,
    flush_threshold: usize,
    buffer: Vec<String>,
    chars: usize,
    entities_seen: usize,
    entities_matched: usize,
    files_written: usize,
}

impl MatchSink {
    pub fn new(output_dir: impl Into<PathBuf>, worker_id: usize, flush_threshold: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            worker_id,
            flush_threshold,
            buffer: Vec::new(),
            chars: 0,
            entities_seen: 0,
            entities_matched: 0,
            files_written: 0,
        }
    }

    /// Score one entity and buffer it if any keyword matches, flushing
    /// once the running char count exceeds the threshold.
    pub fn push(&mut self, entity: Entity, keywords: &[String]) -> io::Result<()> {
        self.entities_seen += 1;
        let text = entity.text().to_lowercase();

        let mut appended = false;
        for keyword in keywords {
            let hits = count_occurrences(&text, keyword);
            log::trace!("writer-{}: {hits} hits for {keyword:?}", self.worker_id);
            if hits > 0 && !appended {
                self.chars += text.chars().count();
                self.buffer.push(format!("\n{text}"));
                self.entities_matched += 1;
                appended = true;
            }
        }

        if self.chars > self.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Write the buffered texts to a new uniquely named output file and
    /// reset the buffer.
    pub fn flush(&mut self) -> io::Result<()> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(io::Error::other)?
            .as_nanos();
        let path = self
            .output_dir
            .join(format!("{}_{stamp}.txt", self.worker_id));

        // Append mode: a same-nanosecond flush lands in the same file
        // instead of clobbering it.
        let mut file = OpenOptions::new().append(true).create(true).open(&path)?;
        file.write_all(self.buffer.concat().as_bytes())?;

        log::debug!(
            "writer-{}: flushed {} chars to {}",
            self.worker_id,
            self.chars,
            path.display()
        );
        self.buffer.clear();
        self.chars = 0;
        self.files_written += 1;
        Ok(())
    }

    /// Chars currently buffered below the flush threshold.
    pub fn buffered_chars(&self) -> usize {
        self.chars
    }

    pub fn entities_seen(&self) -> usize {
        self.entities_seen
    }

    pub fn entities_matched(&self) -> usize {
        self.entities_matched
    }

    pub fn files_written(&self) -> usize {
        self.files_written
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entity(tokens: &[&str]) -> Entity {
        Entity {
            tokens: tokens.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    fn files_in(dir: &TempDir) -> Vec<PathBuf> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn non_overlapping_counts() {
        assert_eq!(count_occurrences("aaaa", "aa"), 2);
        assert_eq!(count_occurrences("abcabc", "abc"), 2);
        assert_eq!(count_occurrences("abc", "xyz"), 0);
    }

    #[test]
    fn unmatched_entity_is_not_buffered() {
        let dir = TempDir::new().unwrap();
        let mut sink = MatchSink::new(dir.path(), 0, 100);
        sink.push(entity(&["hello", "world"]), &keywords(&["science"]))
            .unwrap();
        assert_eq!(sink.entities_seen(), 1);
        assert_eq!(sink.entities_matched(), 0);
        assert_eq!(sink.buffered_chars(), 0);
    }

    #[test]
    fn scoring_is_case_insensitive_on_lowercased_text() {
        let dir = TempDir::new().unwrap();
        let mut sink = MatchSink::new(dir.path(), 0, 100);
        sink.push(entity(&["Great", "ALGORITHM"]), &keywords(&["algorithm"]))
            .unwrap();
        assert_eq!(sink.entities_matched(), 1);
    }

    #[test]
    fn appends_at_most_once_per_entity() {
        let dir = TempDir::new().unwrap();
        let mut sink = MatchSink::new(dir.path(), 0, 100);
        // Both keywords hit; the 7-char text must be counted once.
        sink.push(entity(&["foo", "bar"]), &keywords(&["foo", "bar"]))
            .unwrap();
        assert_eq!(sink.entities_matched(), 1);
        assert_eq!(sink.buffered_chars(), 7);
    }

    #[test]
    fn no_flush_at_threshold_exactly() {
        let dir = TempDir::new().unwrap();
        let mut sink = MatchSink::new(dir.path(), 0, 10);
        sink.push(entity(&["aaaaaaaaaa"]), &keywords(&["a"])).unwrap();
        assert_eq!(sink.buffered_chars(), 10);
        assert_eq!(sink.files_written(), 0);
        assert!(files_in(&dir).is_empty());
    }

    #[test]
    fn flushes_once_threshold_exceeded() {
        let dir = TempDir::new().unwrap();
        let mut sink = MatchSink::new(dir.path(), 3, 10);
        sink.push(entity(&["aaaaaaaaaa"]), &keywords(&["a"])).unwrap();
        sink.push(entity(&["aaaa"]), &keywords(&["a"])).unwrap();
        assert_eq!(sink.files_written(), 1);
        assert_eq!(sink.buffered_chars(), 0);

        let files = files_in(&dir);
        assert_eq!(files.len(), 1);

        // <worker_id>_<unix_nanos>.txt
        let stem = files[0].file_stem().unwrap().to_str().unwrap();
        let (id, stamp) = stem.split_once('_').unwrap();
        assert_eq!(id, "3");
        assert!(stamp.parse::<u128>().is_ok());
        assert_eq!(files[0].extension().unwrap(), "txt");

        let contents = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(contents, "\naaaaaaaaaa\naaaa");
    }

    #[test]
    fn flush_open_error_propagates_from_push() {
        let dir = TempDir::new().unwrap();
        // Parent directory never created: the flush open must fail and
        // surface through push.
        let mut sink = MatchSink::new(dir.path().join("missing").join("out"), 0, 0);
        let err = sink
            .push(entity(&["science"]), &keywords(&["science"]))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn flushed_text_is_lowercased_and_newline_prefixed() {
        let dir = TempDir::new().unwrap();
        let mut sink = MatchSink::new(dir.path(), 0, 0);
        sink.push(entity(&["<page>FOO", "bar</page>"]), &keywords(&["foo"]))
            .unwrap();
        let files = files_in(&dir);
        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(contents, "\n<page>foo bar</page>");
    }
}
