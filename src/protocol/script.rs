//! Remote script templates for file management.
//!
//! Every file operation is carried out by generating a small program,
//! sending it in raw mode and letting the device's own filesystem
//! primitives do the work. Generation is pure string work: nothing here
//! touches the transport.
//!
//! Listing and reading print their payload between [`BEGIN_MARKER`] and
//! [`END_MARKER`] so a consumer can cut it out of the echo and prompt noise
//! around it. The markers are never stripped by this crate.
//!
//! # Limitations
//!
//! Paths are interpolated verbatim between single quotes and file content
//! verbatim between triple double quotes. Neither is escaped: a path
//! containing `'`, or content containing `"""`, a trailing `"` or a
//! backslash escape, yields a program that fails or writes different text.

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Write as _;

// ============================================================================
// Constants
// ============================================================================

/// Printed before the payload of list and load scripts.
pub const BEGIN_MARKER: &str = "<BEGINREC>";

/// Printed after the payload of list and load scripts.
pub const END_MARKER: &str = "<ENDREC>";

/// Line separator of generated programs.
pub const LINE_END: &str = "\r\n";

/// Line separator that `write_file_script` splits content on.
pub const CONTENT_LINE_BREAK: &str = "\r\n";

// ============================================================================
// FileOperation
// ============================================================================

/// A file management request, consumed immediately by script generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOperation {
    /// List the working directory.
    List,
    /// Print a file's content.
    Load {
        /// Device path.
        path: String,
    },
    /// Replace a file's content.
    Write {
        /// Device path.
        path: String,
        /// Text to write, lines separated by CRLF.
        content: String,
    },
    /// Delete a file.
    Remove {
        /// Device path.
        path: String,
    },
    /// Move a file.
    Rename {
        /// Current device path.
        from: String,
        /// New device path.
        to: String,
    },
}

impl FileOperation {
    /// Returns the operation name used in log fields.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Load { .. } => "load",
            Self::Write { .. } => "write",
            Self::Remove { .. } => "remove",
            Self::Rename { .. } => "rename",
        }
    }

    /// Generates the program that performs this operation.
    #[must_use]
    pub fn to_script(&self) -> String {
        match self {
            Self::List => list_files_script(),
            Self::Load { path } => load_file_script(path),
            Self::Write { path, content } => write_file_script(path, content),
            Self::Remove { path } => remove_file_script(path),
            Self::Rename { from, to } => rename_file_script(from, to),
        }
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Program printing the working directory listing between markers.
#[must_use]
pub fn list_files_script() -> String {
    lines(&[
        "import os",
        &print_marker(BEGIN_MARKER),
        "print(os.listdir())",
        &print_marker(END_MARKER),
    ])
}

/// Program streaming `path` to stdout line by line between markers.
///
/// A missing file raises on the device; the traceback arrives as output.
#[must_use]
pub fn load_file_script(path: &str) -> String {
    lines(&[
        "import sys",
        &print_marker(BEGIN_MARKER),
        &format!("with open('{path}', 'r') as f:"),
        "    for line in f:",
        "        sys.stdout.write(line)",
        &print_marker(END_MARKER),
    ])
}

/// Program deleting `path`.
#[must_use]
pub fn remove_file_script(path: &str) -> String {
    lines(&["import os", &format!("os.remove('{path}')")])
}

/// Program renaming `from` to `to`.
#[must_use]
pub fn rename_file_script(from: &str, to: &str) -> String {
    lines(&["import os", &format!("os.rename('{from}', '{to}')")])
}

/// Program replacing `path` with `content`.
///
/// The device heap is collected before anything is opened. Content is
/// split on CRLF; each line is written as one triple-quoted literal, with
/// a separate newline write between lines and none after the last.
#[must_use]
pub fn write_file_script(path: &str, content: &str) -> String {
    let mut script = String::with_capacity(content.len() + 128);

    push_line(&mut script, "import gc");
    push_line(&mut script, "gc.collect()");
    push_line(&mut script, &format!("f = open('{path}', 'w')"));

    let mut content_lines = content.split(CONTENT_LINE_BREAK).peekable();
    while let Some(line) = content_lines.next() {
        let _ = write!(script, "f.write(\"\"\"{line}\"\"\"){LINE_END}");
        if content_lines.peek().is_some() {
            push_line(&mut script, "f.write('\\n')");
        }
    }

    push_line(&mut script, "f.close()");
    script
}

// ============================================================================
// Helpers
// ============================================================================

fn print_marker(marker: &str) -> String {
    format!("print('{marker}')")
}

fn push_line(script: &mut String, line: &str) {
    script.push_str(line);
    script.push_str(LINE_END);
}

fn lines(parts: &[&str]) -> String {
    let mut script = String::new();
    for part in parts {
        push_line(&mut script, part);
    }
    script
}

// ============================================================================
// Tests
// ============================================================================
