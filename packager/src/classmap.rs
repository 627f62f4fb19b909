//! PHP class map generation.
//!
//! Scans PHP sources for declared classes, interfaces, traits and enums and
//! maps each fully qualified name to the file declaring it. Comments, string
//! literals, heredocs and inline HTML are blanked out before the
//! declarations are matched, so `class` inside a docblock or a string never
//! produces an entry.

use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use walkdir::WalkDir;

/// File extensions scanned inside directories.
pub const PHP_EXTENSIONS: &[&str] = &["php", "inc", "hh"];

/// Words that follow a type name used as a parent or alias, never a
/// declared name.
const NOT_DECLARED_NAMES: &[&str] = &["extends", "implements", "as"];

static DECLARATION_PATTERN: LazyLock<Regex> = LazyLock::new(declaration_pattern);

#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
fn declaration_pattern() -> Regex {
    Regex::new(
        r"(?x)
        \b(?P<namespace_keyword>(?i:namespace))
            (?: \s+ (?P<namespace>\w+ (?: \\ \w+ )* ) )? \s* [;{]
        |
        \b(?i:class|interface|trait|enum) \s+ (?P<symbol>[A-Za-z_\x{80}-\x{10FFFF}][\w\x{80}-\x{10FFFF}]*)
        ",
    )
    .expect("declaration pattern is valid")
}

/// Two scans declared the same class in different files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCollision {
    /// Fully qualified class name.
    pub class: String,
    /// File that declared the class first; it lost.
    pub previous: Utf8PathBuf,
    /// File that declared the class later; it is kept.
    pub replacement: Utf8PathBuf,
}

/// Class name to file mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMap {
    entries: BTreeMap<String, Utf8PathBuf>,
    collisions: Vec<ClassCollision>,
}

impl ClassMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `class` as declared in `file`.
    ///
    /// A class already mapped to a different file is replaced; the collision
    /// is kept and logged.
    pub fn insert(&mut self, class: impl Into<String>, file: impl Into<Utf8PathBuf>) {
        let class = class.into();
        let file = file.into();
        if let Some(previous) = self.entries.get(&class)
            && *previous != file
        {
            log::warn!("class {class} declared in {previous} and {file}; using {file}");
            self.collisions.push(ClassCollision {
                class: class.clone(),
                previous: previous.clone(),
                replacement: file.clone(),
            });
        }
        self.entries.insert(class, file);
    }

    /// Unions `other` into this map; entries of `other` win.
    pub fn merge(&mut self, other: Self) {
        self.collisions.extend(other.collisions);
        for (class, file) in other.entries {
            self.insert(class, file);
        }
    }

    /// Returns the file declaring `class`.
    #[must_use]
    pub fn get(&self, class: &str) -> Option<&Utf8Path> {
        self.entries.get(class).map(Utf8PathBuf::as_path)
    }

    /// Returns the class names in sorted order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the collisions recorded so far.
    #[must_use]
    pub fn collisions(&self) -> &[ClassCollision] {
        &self.collisions
    }

    /// Returns the number of mapped classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no class is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scans a file or directory tree for PHP declarations.
///
/// A file given directly is scanned whatever its extension; inside
/// directories only [`PHP_EXTENSIONS`] are considered. Symlinks are
/// followed and files are visited in name order.
///
/// # Errors
///
/// Returns [`crate::error::PackagerError::Io`] when `path` does not exist or
/// a file cannot be read.
pub fn scan_path(path: &Utf8Path) -> Result<ClassMap> {
    let mut map = ClassMap::new();

    if path.is_file() {
        scan_file(path, &mut map)?;
        return Ok(map);
    }
    if !path.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("cannot scan {path} for classes: not a file or directory"),
        )
        .into());
    }

    for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file) = Utf8Path::from_path(entry.path()) else {
            log::debug!("skipping non UTF-8 path {}", entry.path().display());
            continue;
        };
        if file
            .extension()
            .is_some_and(|ext| PHP_EXTENSIONS.contains(&ext))
        {
            scan_file(file, &mut map)?;
        }
    }

    Ok(map)
}

fn scan_file(file: &Utf8Path, map: &mut ClassMap) -> Result<()> {
    let bytes = std::fs::read(file)?;
    for class in extract_classes(&String::from_utf8_lossy(&bytes)) {
        map.insert(class, file);
    }
    Ok(())
}

/// Returns the fully qualified names declared in PHP `source`, in order.
///
/// # Examples
///
/// ```
/// use contao_packager::classmap::extract_classes;
///
/// let source = "<?php\nnamespace Acme\\Widget;\n\n// class Ignored\nfinal class Renderer {}\ninterface Hook {}\n";
/// assert_eq!(extract_classes(source), vec!["Acme\\Widget\\Renderer", "Acme\\Widget\\Hook"]);
/// ```
#[must_use]
pub fn extract_classes(source: &str) -> Vec<String> {
    let code = strip_non_code(source);
    let mut namespace = String::new();
    let mut classes = Vec::new();

    for captures in DECLARATION_PATTERN.captures_iter(&code) {
        let Some(keyword) = captures.get(0) else {
            continue;
        };
        let before = code.get(..keyword.start()).unwrap_or_default();
        if is_expression_context(before) {
            continue;
        }
        if captures.name("namespace_keyword").is_some() {
            namespace = captures
                .name("namespace")
                .map_or_else(String::new, |declared| declared.as_str().to_owned());
            continue;
        }
        let Some(symbol) = captures.name("symbol") else {
            continue;
        };
        // Qualified keywords like `\Enum` and parent names like `extends Trait implements`.
        if before.ends_with('\\') || is_not_declared_name(symbol.as_str()) {
            continue;
        }
        if namespace.is_empty() {
            classes.push(symbol.as_str().to_owned());
        } else {
            classes.push(format!("{namespace}\\{}", symbol.as_str()));
        }
    }

    classes
}

fn is_not_declared_name(symbol: &str) -> bool {
    NOT_DECLARED_NAMES
        .iter()
        .any(|word| word.eq_ignore_ascii_case(symbol))
}

/// True when the keyword is used as a value (`Foo::class`, `new class`,
/// `$obj->class`, `$class`) rather than a declaration.
fn is_expression_context(before: &str) -> bool {
    if before.ends_with('$') {
        return true;
    }
    let trimmed = before.trim_end();
    if trimmed.ends_with("::") || trimmed.ends_with("->") {
        return true;
    }
    trimmed
        .rsplit(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("new"))
}

/// Replaces inline HTML, comments, string literals and heredocs with blanks.
fn strip_non_code(source: &str) -> String {
    let mut rest = source.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(rest.len());
    let mut in_code = false;

    while let Some(&current) = rest.first() {
        if !in_code {
            let Some(open) = find(rest, b"<?") else {
                break;
            };
            rest = tail(rest, open + 2);
            if rest.starts_with(b"php") {
                rest = tail(rest, 3);
            }
            in_code = true;
            out.push(b'\n');
            continue;
        }

        let skipped = if rest.starts_with(b"?>") {
            in_code = false;
            out.push(b';');
            2
        } else if rest.starts_with(b"/*") {
            out.push(b' ');
            find(rest, b"*/").map_or(rest.len(), |end| end + 2)
        } else if rest.starts_with(b"//") || (current == b'#' && !rest.starts_with(b"#[")) {
            line_comment_len(rest)
        } else if rest.starts_with(b"<<<") {
            out.push(b' ');
            heredoc_len(rest)
        } else if matches!(current, b'\'' | b'"' | b'`') {
            out.extend_from_slice(b"''");
            quoted_len(rest, current)
        } else {
            out.push(current);
            1
        };
        rest = tail(rest, skipped);
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn tail(bytes: &[u8], from: usize) -> &[u8] {
    bytes.get(from..).unwrap_or_default()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn is_label_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte >= 0x80
}

/// A line comment runs to the end of the line or to a closing `?>`.
fn line_comment_len(rest: &[u8]) -> usize {
    let newline = find(rest, b"\n").unwrap_or(rest.len());
    let close = find(rest, b"?>").unwrap_or(rest.len());
    newline.min(close)
}

fn quoted_len(rest: &[u8], quote: u8) -> usize {
    let mut escaped = false;
    for (offset, &byte) in rest.iter().enumerate().skip(1) {
        if escaped {
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else if byte == quote {
            return offset + 1;
        }
    }
    rest.len()
}

/// Length of a heredoc or nowdoc including its closing label.
fn heredoc_len(rest: &[u8]) -> usize {
    let header = tail(rest, 3);
    let blanks = header
        .iter()
        .take_while(|c| **c == b' ' || **c == b'\t')
        .count();
    let header = tail(header, blanks);
    let quoted = matches!(header.first(), Some(b'\'' | b'"'));
    let label_start = tail(header, usize::from(quoted));
    let label_len = label_start.iter().take_while(|c| is_label_byte(**c)).count();
    let label = label_start.get(..label_len).unwrap_or_default();
    if label.is_empty() {
        // A shift followed by `<`, not a heredoc.
        return 3;
    }

    // The closing label starts a line, optionally indented, and is not
    // followed by another label character.
    let Some(first_newline) = find(rest, b"\n") else {
        return rest.len();
    };
    let mut line_start = first_newline + 1;
    while line_start < rest.len() {
        let line = tail(rest, line_start);
        let indent = line
            .iter()
            .take_while(|c| **c == b' ' || **c == b'\t')
            .count();
        let candidate = tail(line, indent);
        let closes = candidate.starts_with(label)
            && !candidate
                .get(label.len())
                .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_');
        if closes {
            return line_start + indent + label.len();
        }
        match find(line, b"\n") {
            Some(end) => line_start += end + 1,
            None => break,
        }
    }
    rest.len()
}
