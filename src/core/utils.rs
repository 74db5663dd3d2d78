use std::{
    cmp::Ordering,
    fs,
    path::Path,
    sync::OnceLock,
};

use regex::Regex;
use tracing::debug;

pub fn ensure_directory(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

/// Remove every regular file directly inside `directory`. Errors on
/// individual files are ignored; returns how many files were removed.
pub fn cleanup_temp_files(directory: &Path) -> usize {
    if !directory.exists() {
        return 0;
    }

    let Ok(entries) = fs::read_dir(directory) else {
        return 0;
    };

    let mut count = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && fs::remove_file(&path).is_ok() {
            count += 1;
        }
    }

    debug!(count, directory = %directory.display(), "cleaned temp media files");
    count
}

/// Make a string safe to use as a filename: strips path separators, shell
/// metacharacters and control characters, dodges Windows reserved names,
/// and truncates to 255 bytes on a char boundary.
pub fn safe_filename(name: &str) -> String {
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let mut safe: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if INVALID.contains(&c) { '_' } else { c })
        .collect();

    let reserved = {
        let stem = safe.split('.').next().unwrap_or("").to_ascii_uppercase();
        matches!(stem.as_str(), "CON" | "PRN" | "AUX" | "NUL")
            || (stem.len() == 4
                && (stem.starts_with("COM") || stem.starts_with("LPT"))
                && stem.ends_with(|c: char| c.is_ascii_digit()))
    };
    if reserved {
        safe.insert(0, '_');
    }

    while safe.len() > 255 {
        safe.pop();
    }

    if safe.trim().is_empty() {
        safe = "unnamed".to_string();
    }

    safe
}

/// One segment of a natural-sort key. Numeric segments order before text and
/// compare numerically, so "ep2" sorts ahead of "ep10".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortSegment {
    Number(u64),
    Text(String),
}

impl Ord for SortSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortSegment::Number(a), SortSegment::Number(b)) => a.cmp(b),
            (SortSegment::Text(a), SortSegment::Text(b)) => a.cmp(b),
            (SortSegment::Number(_), SortSegment::Text(_)) => Ordering::Less,
            (SortSegment::Text(_), SortSegment::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for SortSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split a string into digit runs and lowercased text runs so that file
/// names sort the way a human expects ("ep1", "ep2", "ep10").
pub fn natural_sort_key(text: &str) -> Vec<SortSegment> {
    static DIGIT_RUNS: OnceLock<Regex> = OnceLock::new();
    let digit_runs = DIGIT_RUNS.get_or_init(|| Regex::new(r"\d+").unwrap());

    let mut segments = Vec::new();
    let mut last = 0;
    for digits in digit_runs.find_iter(text) {
        if digits.start() > last {
            segments.push(SortSegment::Text(text[last..digits.start()].to_lowercase()));
        }
        // Digit runs longer than u64 fall back to text comparison
        match digits.as_str().parse::<u64>() {
            Ok(n) => segments.push(SortSegment::Number(n)),
            Err(_) => segments.push(SortSegment::Text(digits.as_str().to_string())),
        }
        last = digits.end();
    }
    if last < text.len() {
        segments.push(SortSegment::Text(text[last..].to_lowercase()));
    }

    segments
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Directory name of the file's parent, used as a series label in stats.
pub fn parent_dir_name(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_stem_name(path: &Path) -> String {
    path.file_stem().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
