//! Unified patch rendering for a single file.

use std::fmt::Write;

use ckpt_store::EntryMode;

use crate::blob_diff::{diff_blobs, DiffLine};

/// One side of a file comparison.
#[derive(Clone, Copy, Debug)]
pub struct FileVersion<'a> {
    pub mode: EntryMode,
    pub content: &'a [u8],
}

impl<'a> FileVersion<'a> {
    pub fn new(mode: EntryMode, content: &'a [u8]) -> Self {
        Self { mode, content }
    }
}

/// Render a git-style unified diff of `path` between two versions.
///
/// `None` means the file does not exist on that side. Identical versions
/// render as an empty string. Non-UTF-8 content is summarized as
/// "Binary files ... differ".
pub fn render_patch(path: &str, old: Option<FileVersion<'_>>, new: Option<FileVersion<'_>>) -> String {
    let old_content = old.map(|v| v.content).unwrap_or_default();
    let new_content = new.map(|v| v.content).unwrap_or_default();
    let diff = diff_blobs(old_content, new_content);

    let mut out = String::new();
    let _ = writeln!(out, "diff --git a/{path} b/{path}");
    match (old, new) {
        (None, None) => return String::new(),
        (None, Some(n)) => {
            let _ = writeln!(out, "new file mode {}", n.mode);
        }
        (Some(o), None) => {
            let _ = writeln!(out, "deleted file mode {}", o.mode);
        }
        (Some(o), Some(n)) => {
            if o.mode == n.mode && diff.is_empty() {
                return String::new();
            }
            if o.mode != n.mode {
                let _ = writeln!(out, "old mode {}", o.mode);
                let _ = writeln!(out, "new mode {}", n.mode);
            }
        }
    }

    if diff.is_empty() {
        return out;
    }
    let old_label = old.map_or_else(|| "/dev/null".to_string(), |_| format!("a/{path}"));
    let new_label = new.map_or_else(|| "/dev/null".to_string(), |_| format!("b/{path}"));

    if diff.binary {
        let _ = writeln!(out, "Binary files {old_label} and {new_label} differ");
        return out;
    }

    let _ = writeln!(out, "--- {old_label}");
    let _ = writeln!(out, "+++ {new_label}");
    for hunk in &diff.hunks {
        let _ = writeln!(
            out,
            "@@ -{},{} +{},{} @@",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        );
        for line in &hunk.lines {
            let _ = match line {
                DiffLine::Context(text) => writeln!(out, " {text}"),
                DiffLine::Removed(text) => writeln!(out, "-{text}"),
                DiffLine::Added(text) => writeln!(out, "+{text}"),
                DiffLine::NoNewline => writeln!(out, "\\ No newline at end of file"),
            };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: EntryMode = EntryMode::Regular;

    #[test]
    fn modification_patch() {
        let patch = render_patch(
            "notes.txt",
            Some(FileVersion::new(R, b"v1\n")),
            Some(FileVersion::new(R, b"v2\n")),
        );
        assert_eq!(
            patch,
            "diff --git a/notes.txt b/notes.txt\n\
             --- a/notes.txt\n\
             +++ b/notes.txt\n\
             @@ -1,1 +1,1 @@\n\
             -v1\n\
             +v2\n"
        );
    }

    #[test]
    fn addition_patch() {
        let patch = render_patch("new.txt", None, Some(FileVersion::new(R, b"hello\n")));
        assert!(patch.contains("new file mode 100644\n"));
        assert!(patch.contains("--- /dev/null\n+++ b/new.txt\n"));
        assert!(patch.contains("@@ -0,0 +1,1 @@\n+hello\n"));
    }

    #[test]
    fn deletion_patch() {
        let patch = render_patch("old.txt", Some(FileVersion::new(R, b"bye\n")), None);
        assert!(patch.contains("deleted file mode 100644\n"));
        assert!(patch.contains("--- a/old.txt\n+++ /dev/null\n"));
        assert!(patch.contains("-bye\n"));
    }

    #[test]
    fn unchanged_renders_empty() {
        let v = FileVersion::new(R, b"same\n");
        assert_eq!(render_patch("f", Some(v), Some(v)), "");
        assert_eq!(render_patch("f", None, None), "");
    }

    #[test]
    fn mode_only_change() {
        let patch = render_patch(
            "run.sh",
            Some(FileVersion::new(R, b"x\n")),
            Some(FileVersion::new(EntryMode::Executable, b"x\n")),
        );
        assert_eq!(
            patch,
            "diff --git a/run.sh b/run.sh\nold mode 100644\nnew mode 100755\n"
        );
    }

    #[test]
    fn binary_patch() {
        let patch = render_patch(
            "img.bin",
            Some(FileVersion::new(R, &[0xff, 0x00])),
            Some(FileVersion::new(R, &[0xfe, 0x01])),
        );
        assert!(patch.ends_with("Binary files a/img.bin and b/img.bin differ\n"));
    }

    #[test]
    fn empty_new_file_has_header_only() {
        let patch = render_patch("empty", None, Some(FileVersion::new(R, b"")));
        assert_eq!(patch, "diff --git a/empty b/empty\nnew file mode 100644\n");
    }
}
