//! Chunk scanner — delimiter tokenization and marker-bounded entity capture

use std::io::{self, BufRead};

/// Initial capacity for the reusable raw-token buffer (typical dump token:
/// a handful of bytes, markup tokens up to a few hundred)
const TOKEN_BUF_CAPACITY: usize = 256;

/// Tokenization and capture rules for a corpus.
#[derive(Debug, Clone)]
pub struct ScanRules {
    /// Single byte separating tokens.
    pub delimiter: u8,
    /// Literal substring opening an entity capture.
    pub start_marker: String,
    /// Literal substring closing an entity capture (inclusive).
    pub end_marker: String,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            delimiter: b' ',
            start_marker: "<page>".to_string(),
            end_marker: "</page>".to_string(),
        }
    }
}

/// One extracted record: the whitespace-trimmed tokens from the token
/// containing the start marker through the token containing the end
/// marker, inclusive. Moved by value into the entity channel and owned
/// by exactly one writer afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub tokens: Vec<String>,
}

impl Entity {
    /// Tokens rejoined with single spaces.
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Result of scanning one chunk.
#[derive(Debug, PartialEq, Eq)]
pub struct ChunkScan {
    /// Completed entities, in corpus order within the chunk.
    pub entities: Vec<Entity>,
    /// Raw bytes consumed, delimiters included. Excludes any bytes
    /// discarded by word-boundary alignment before the scan.
    pub consumed: u64,
    /// Whether the scan stopped at end-of-corpus rather than at the
    /// chunk budget.
    pub reached_eof: bool,
}

/// One whitespace-trimmed token, or end of input.
enum Token {
    Word { text: String, raw_len: u64 },
    Eof,
}

/// Read the next delimiter-terminated token. A trailing run of bytes
/// without a final delimiter is still a token; `Eof` surfaces on the
/// following call.
fn next_token<R: BufRead>(reader: &mut R, delimiter: u8, buf: &mut Vec<u8>) -> io::Result<Token> {
    buf.clear();
    let n = reader.read_until(delimiter, buf)?;
    if n == 0 {
        return Ok(Token::Eof);
    }
    let text = String::from_utf8_lossy(buf).trim().to_string();
    Ok(Token::Word {
        text,
        raw_len: n as u64,
    })
}

/// Discard bytes up to and including the next delimiter, so a scan that
/// starts mid-token resumes at a word boundary. Returns the number of
/// bytes skipped, or `None` when no delimiter remains before
/// end-of-corpus.
pub fn align_to_delimiter<R: BufRead>(reader: &mut R, delimiter: u8) -> io::Result<Option<u64>> {
    let mut skipped = Vec::with_capacity(TOKEN_BUF_CAPACITY);
    let n = reader.read_until(delimiter, &mut skipped)?;
    if n == 0 || skipped.last() != Some(&delimiter) {
        return Ok(None);
    }
    Ok(Some(n as u64))
}

/// Scan tokens until the consumed-byte count exceeds `budget` or the
/// input ends, capturing every start-marker…end-marker token run as an
/// [`Entity`].
///
/// A capture in progress runs to its end marker even past the budget; a
/// capture still open when the input ends is dropped.
pub fn scan_chunk<R: BufRead>(
    reader: &mut R,
    budget: u64,
    rules: &ScanRules,
) -> io::Result<ChunkScan> {
    let mut buf = Vec::with_capacity(TOKEN_BUF_CAPACITY);
    let mut entities = Vec::new();
    let mut consumed = 0u64;
    let mut reached_eof = false;

    'outer: while consumed <= budget {
        let text = match next_token(reader, rules.delimiter, &mut buf)? {
            Token::Eof => {
                reached_eof = true;
                break;
            }
            Token::Word { text, raw_len } => {
                consumed += raw_len;
                text
            }
        };
        if !text.contains(&rules.start_marker) {
            continue;
        }

        let mut tokens = vec![text];
        loop {
            match next_token(reader, rules.delimiter, &mut buf)? {
                Token::Eof => {
                    // Open capture at end-of-corpus: the partial entity
                    // is dropped.
                    reached_eof = true;
                    break 'outer;
                }
                Token::Word { text, raw_len } => {
                    consumed += raw_len;
                    let closes = text.contains(&rules.end_marker);
                    tokens.push(text);
                    if closes {
                        entities.push(Entity { tokens });
                        break;
                    }
                }
            }
        }
    }

    Ok(ChunkScan {
        entities,
        consumed,
        reached_eof,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan(input: &str, budget: u64) -> ChunkScan {
        scan_chunk(&mut Cursor::new(input), budget, &ScanRules::default()).unwrap()
    }

    fn texts(scan: &ChunkScan) -> Vec<String> {
        scan.entities.iter().map(Entity::text).collect()
    }

    #[test]
    fn align_resumes_at_word_boundary() {
        let mut reader = Cursor::new("bc def gh");
        let skipped = align_to_delimiter(&mut reader, b' ').unwrap();
        assert_eq!(skipped, Some(3));

        let scan = scan_chunk(&mut reader, 1024, &ScanRules::default()).unwrap();
        // "bc" (the tail of a token split at the chunk boundary) is gone.
        assert_eq!(scan.consumed, 6);
        assert!(scan.reached_eof);
    }

    #[test]
    fn align_without_delimiter_hits_eof() {
        let mut reader = Cursor::new("trailing");
        assert_eq!(align_to_delimiter(&mut reader, b' ').unwrap(), None);
    }

    #[test]
    fn align_empty_input_hits_eof() {
        let mut reader = Cursor::new("");
        assert_eq!(align_to_delimiter(&mut reader, b' ').unwrap(), None);
    }

    #[test]
    fn captures_single_entity() {
        let scan = scan("junk <page>alpha beta</page> junk", 1024);
        assert_eq!(texts(&scan), ["<page>alpha beta</page>"]);
        assert!(scan.reached_eof);
        assert_eq!(scan.consumed, 33);
    }

    #[test]
    fn captures_multiple_entities_in_one_chunk() {
        let scan = scan("<page>a b</page> mid <page>c d</page>", 1024);
        assert_eq!(texts(&scan), ["<page>a b</page>", "<page>c d</page>"]);
    }

    #[test]
    fn trailing_token_without_delimiter_closes_entity() {
        // The corpus ends right after the end marker, no trailing space.
        let scan = scan("<page>science rocks</page>", 1024);
        assert_eq!(texts(&scan), ["<page>science rocks</page>"]);
        assert!(scan.reached_eof);
    }

    #[test]
    fn open_entity_at_eof_is_dropped() {
        let scan = scan("<page>alpha beta gamma", 1024);
        assert!(scan.entities.is_empty());
        assert!(scan.reached_eof);
    }

    #[test]
    fn budget_stops_scan_between_tokens() {
        let scan = scan("aa bb cc dd", 1);
        // First token ("aa ", 3 bytes) pushes consumed past the budget;
        // the check runs before each token read.
        assert_eq!(scan.consumed, 3);
        assert!(!scan.reached_eof);
        assert!(scan.entities.is_empty());
    }

    #[test]
    fn capture_ignores_budget_once_started() {
        let scan = scan("x <page>one two three four</page> tail", 4);
        assert_eq!(texts(&scan), ["<page>one two three four</page>"]);
        assert!(!scan.reached_eof);
    }

    #[test]
    fn rescan_of_same_bytes_is_identical() {
        let input = "pre <page>a b</page> <page>c</page> post";
        assert_eq!(scan(input, 16), scan(input, 16));
        assert_eq!(scan(input, 1024), scan(input, 1024));
    }

    #[test]
    fn tokens_are_whitespace_trimmed() {
        let scan = scan("<page>a\nb </page>x", 1024);
        // Newlines live inside tokens and are trimmed off the edges.
        assert_eq!(texts(&scan), ["<page>a\nb </page>x"]);
    }

    #[test]
    fn empty_input_reaches_eof_immediately() {
        let scan = scan("", 1024);
        assert!(scan.entities.is_empty());
        assert_eq!(scan.consumed, 0);
        assert!(scan.reached_eof);
    }
}
