//! Text and path helpers shared by the synthesis backends

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sentence terminator followed by whitespace
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("sentence regex is valid"));

/// Audio containers the players are expected to handle
const SUPPORTED_FORMATS: &[&str] = &["mp3", "wav", "ogg", "aiff"];

/// Split text into chunks no longer than `max_len` characters
///
/// Text that already fits is returned whole. Longer text is split at
/// sentence boundaries, then at word boundaries for sentences that are
/// still too long. A single word longer than `max_len` is cut hard.
pub fn split_into_chunks(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    if char_len(text) <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences(text) {
        if char_len(sentence) <= max_len {
            push_piece(&mut chunks, &mut current, sentence, max_len);
            continue;
        }

        for word in sentence.split_whitespace() {
            for piece in hard_split(word, max_len) {
                push_piece(&mut chunks, &mut current, &piece, max_len);
            }
        }
    }

    flush(&mut chunks, &mut current);
    chunks
}

/// Check if the file extension is a supported audio format
pub fn is_supported_audio_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_FORMATS
                .iter()
                .any(|fmt| fmt.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Append `ext` when the path has no extension at all
pub fn with_default_extension(path: &Path, ext: &str) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(ext)
    }
}

/// Create the parent directory of `path` if it doesn't exist yet
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        // Keep the terminator, drop the whitespace after it
        let sentence = text[start..m.start() + 1].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = m.end();
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

fn hard_split(word: &str, max_len: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_len)
        .map(|piece| piece.iter().collect())
        .collect()
}

fn push_piece(chunks: &mut Vec<String>, current: &mut String, piece: &str, max_len: usize) {
    let needed = if current.is_empty() {
        char_len(piece)
    } else {
        char_len(current) + 1 + char_len(piece)
    };

    if needed > max_len {
        flush(chunks, current);
    }
    if !current.is_empty() {
        current.push(' ');
    }
    current.push_str(piece);
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
}
