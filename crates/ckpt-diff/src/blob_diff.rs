//! Blob-level diff: line-by-line comparison of file contents.
//!
//! Uses the `similar` crate (Myers diff algorithm) to produce structured
//! hunks with three lines of context.

use similar::{ChangeTag, TextDiff};

/// Lines of context around each change.
pub const CONTEXT_LINES: usize = 3;

/// The result of diffing two blobs (file contents).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobDiff {
    /// The diff hunks. Always empty for binary content.
    pub hunks: Vec<DiffHunk>,
    /// Either side was not valid UTF-8.
    pub binary: bool,
    /// The two sides are byte-for-byte equal.
    pub identical: bool,
}

impl BlobDiff {
    /// Returns `true` if the two blobs are identical.
    pub fn is_empty(&self) -> bool {
        self.identical
    }

    /// Total number of lines added across all hunks.
    pub fn additions(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Added(_)))
    }

    /// Total number of lines removed across all hunks.
    pub fn deletions(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Removed(_)))
    }

    fn count(&self, pred: impl Fn(&DiffLine) -> bool) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| pred(l))
            .count()
    }
}

/// A contiguous region of changes in a diff.
///
/// Starts are 1-based; when a side contributes no lines its start is the
/// line before the hunk (0 for an empty file), as in unified diff output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

/// A single line in a diff hunk, without its trailing newline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffLine {
    /// A line present in both old and new (context).
    Context(String),
    /// A line added in the new content.
    Added(String),
    /// A line removed from the old content.
    Removed(String),
    /// The preceding line had no trailing newline.
    NoNewline,
}

/// Compute a line-by-line diff between two byte slices.
///
/// The content is interpreted as UTF-8 text; anything else is reported as
/// binary with no hunks.
pub fn diff_blobs(old: &[u8], new: &[u8]) -> BlobDiff {
    if old == new {
        return BlobDiff {
            hunks: Vec::new(),
            binary: false,
            identical: true,
        };
    }
    let (Ok(old_str), Ok(new_str)) = (std::str::from_utf8(old), std::str::from_utf8(new)) else {
        return BlobDiff {
            hunks: Vec::new(),
            binary: true,
            identical: false,
        };
    };

    let text_diff = TextDiff::from_lines(old_str, new_str);
    let mut hunks = Vec::new();

    for group in text_diff.grouped_ops(CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;

        let mut lines = Vec::new();
        for op in &group {
            for change in text_diff.iter_changes(op) {
                let raw = change.value();
                let text = raw.strip_suffix('\n').unwrap_or(raw).to_string();
                lines.push(match change.tag() {
                    ChangeTag::Equal => DiffLine::Context(text),
                    ChangeTag::Delete => DiffLine::Removed(text),
                    ChangeTag::Insert => DiffLine::Added(text),
                });
                if !raw.ends_with('\n') {
                    lines.push(DiffLine::NoNewline);
                }
            }
        }

        hunks.push(DiffHunk {
            old_start: hunk_start(old_range.start, old_range.len()),
            old_count: old_range.len(),
            new_start: hunk_start(new_range.start, new_range.len()),
            new_count: new_range.len(),
            lines,
        });
    }

    BlobDiff {
        hunks,
        binary: false,
        identical: false,
    }
}

fn hunk_start(index: usize, count: usize) -> usize {
    if count == 0 {
        index
    } else {
        index + 1
    }
}
