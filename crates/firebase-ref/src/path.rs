//! Location algebra.
//!
//! A location is an absolute, URL-like address of one node in the tree, such
//! as `https://example.firebaseio.com/users/alice/`. It is split into three
//! parts:
//!
//! - the *origin* (`scheme://authority`), empty for bare paths,
//! - the path *segments*, never empty and never `.`/`..`,
//! - the *suffix* (`?query#fragment`), usually empty.
//!
//! Rendering always produces exactly one leading and one trailing separator
//! around the path, so `https://h` and `https://h//` both render as
//! `https://h/`. Repeated separators collapse.
//!
//! Segments hold node names as given. When a location is rendered, the
//! characters that would change how it parses back (`%`, `/`, `?`, `#`) are
//! percent-encoded; parsing decodes percent escapes, so a rendered location
//! always parses back to the same segments. Everything else is left for the
//! transport to encode.

use std::fmt;

/// Path separator.
pub const SEPARATOR: char = '/';

/// A parsed, normalized tree location.
///
/// # Example
///
/// ```
/// use firebase_ref::path::Location;
///
/// let loc = Location::parse("https://h/a/b");
/// assert_eq!(loc.origin(), "https://h");
/// assert_eq!(loc.segments(), ["a", "b"]);
/// assert_eq!(loc.to_string(), "https://h/a/b/");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    origin: String,
    segments: Vec<String>,
    suffix: String,
}

impl Location {
    /// Parse and normalize a location string.
    ///
    /// Surrounding whitespace is trimmed, percent escapes in the path are
    /// decoded, `.` segments are dropped and `..` segments remove the
    /// preceding segment (never going above the root).
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        let (origin, rest) = split_origin(location);
        let (path, suffix) = split_suffix(rest);
        let mut segments = Vec::new();
        for segment in path.split(SEPARATOR) {
            push_segment(&mut segments, &decode_segment(segment));
        }
        Self {
            origin: origin.to_string(),
            segments,
            suffix: suffix.to_string(),
        }
    }

    /// `scheme://authority`, or an empty string for bare paths.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Query and fragment text including their delimiters.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Name of the addressed node: the last path segment, `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The path component alone, with leading and trailing separators and
    /// reserved characters in segments percent-encoded.
    ///
    /// # Example
    ///
    /// ```
    /// use firebase_ref::path::Location;
    ///
    /// let loc = Location::parse("https://h/").join("what?");
    /// assert_eq!(loc.key(), Some("what?"));
    /// assert_eq!(loc.path(), "/what%3F/");
    /// assert_eq!(Location::parse(&loc.to_string()), loc);
    /// ```
    pub fn path(&self) -> String {
        let mut out = String::with_capacity(
            1 + self.segments.iter().map(|s| s.len() + 1).sum::<usize>(),
        );
        out.push(SEPARATOR);
        for segment in &self.segments {
            encode_segment(&mut out, segment);
            out.push(SEPARATOR);
        }
        out
    }

    /// Resolve `relative` against this location.
    ///
    /// Leading whitespace and leading separators are stripped first, so
    /// `"/foo"` and `"foo"` both address a child. Segments of `relative` are
    /// node names, not URL text: `?`, `#` and `%` in them are kept literally.
    /// Like URL joining, the
    /// query and fragment of the base are dropped unless `relative` is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use firebase_ref::path::Location;
    ///
    /// let base = Location::parse("https://h/a/");
    /// assert_eq!(base.join("b/c").to_string(), "https://h/a/b/c/");
    /// assert_eq!(base.join("..").to_string(), "https://h/");
    /// assert_eq!(base.join("../../..").to_string(), "https://h/");
    /// ```
    pub fn join(&self, relative: &str) -> Self {
        let relative = relative.trim_start().trim_start_matches(SEPARATOR);
        if relative.is_empty() {
            return self.clone();
        }
        let mut segments = self.segments.clone();
        for segment in relative.split(SEPARATOR) {
            push_segment(&mut segments, segment);
        }
        Self {
            origin: self.origin.clone(),
            segments,
            suffix: String::new(),
        }
    }

    /// Location with the last segment removed. The root is its own parent.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self {
            origin: self.origin.clone(),
            segments,
            suffix: self.suffix.clone(),
        }
    }

    /// Location with the path reset to `/`.
    pub fn root(&self) -> Self {
        Self {
            origin: self.origin.clone(),
            segments: Vec::new(),
            suffix: String::new(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.origin)?;
        f.write_str(&self.path())?;
        f.write_str(&self.suffix)
    }
}

impl From<&str> for Location {
    fn from(location: &str) -> Self {
        Self::parse(location)
    }
}

/// Normalize a location string.
///
/// # Example
///
/// ```
/// use firebase_ref::path::normalize_location;
///
/// assert_eq!(normalize_location("https://h"), "https://h/");
/// assert_eq!(normalize_location("  https://h/a  "), "https://h/a/");
/// assert_eq!(normalize_location("https://h//a///b"), "https://h/a/b/");
/// ```
pub fn normalize_location(location: &str) -> String {
    Location::parse(location).to_string()
}

/// Resolve a relative child path against `base`.
///
/// # Example
///
/// ```
/// use firebase_ref::path::resolve_child;
///
/// assert_eq!(resolve_child("https://h/", "a/b"), "https://h/a/b/");
/// assert_eq!(resolve_child("https://h/", "a/b/.."), "https://h/a/");
/// assert_eq!(resolve_child("https://h/", "a/../b"), "https://h/b/");
/// assert_eq!(resolve_child("https://h/x/", "/y"), "https://h/x/y/");
/// ```
pub fn resolve_child(base: &str, relative: &str) -> String {
    Location::parse(base).join(relative).to_string()
}

/// Location one level up from `location`.
///
/// # Example
///
/// ```
/// use firebase_ref::path::parent_location;
///
/// assert_eq!(parent_location("https://h/a/b/"), "https://h/a/");
/// assert_eq!(parent_location("https://h/"), "https://h/");
/// ```
pub fn parent_location(location: &str) -> String {
    Location::parse(location).parent().to_string()
}

/// Root location sharing the origin of `location`.
pub fn root_location(location: &str) -> String {
    Location::parse(location).root().to_string()
}

fn push_segment(segments: &mut Vec<String>, segment: &str) {
    match segment {
        "" | "." => {}
        ".." => {
            segments.pop();
        }
        _ => segments.push(segment.to_string()),
    }
}

fn encode_segment(out: &mut String, segment: &str) {
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
}

/// Decode `%XX` escapes. Malformed escapes stay literal, and a segment that
/// would not decode to UTF-8 is kept as written.
fn decode_segment(raw: &str) -> String {
    if !raw.contains('%') {
        return raw.to_string();
    }
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'%')
            .then(|| raw.get(i + 1..i + 3))
            .flatten()
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8(out).unwrap_or_else(|_| raw.to_string())
}

/// Split `scheme://authority` off the front of `location`.
fn split_origin(location: &str) -> (&str, &str) {
    let Some(idx) = location.find("://") else {
        return ("", location);
    };
    if !is_scheme(&location[..idx]) {
        return ("", location);
    }
    let authority_start = idx + 3;
    let end = location[authority_start..]
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .map_or(location.len(), |i| authority_start + i);
    location.split_at(end)
}

fn split_suffix(rest: &str) -> (&str, &str) {
    match rest.find(|c: char| matches!(c, '?' | '#')) {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_appends_trailing_separator() {
        assert_eq!(normalize_location("https://h"), "https://h/");
        assert_eq!(normalize_location("https://h/"), "https://h/");
        assert_eq!(normalize_location("https://h/a"), "https://h/a/");
        assert_eq!(normalize_location("https://h/a/"), "https://h/a/");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_location("  https://h/a \n"), "https://h/a/");
    }

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize_location("https://h///a//b//"), "https://h/a/b/");
    }

    #[test]
    fn test_normalize_bare_path() {
        assert_eq!(normalize_location(""), "/");
        assert_eq!(normalize_location("a/b"), "/a/b/");
        assert_eq!(normalize_location("/a/b"), "/a/b/");
    }

    #[test]
    fn test_parse_keeps_query_and_fragment() {
        let loc = Location::parse("https://h:8080/a?ns=x#frag");
        assert_eq!(loc.origin(), "https://h:8080");
        assert_eq!(loc.segments(), ["a"]);
        assert_eq!(loc.suffix(), "?ns=x#frag");
        assert_eq!(loc.to_string(), "https://h:8080/a/?ns=x#frag");
    }

    #[test]
    fn test_scheme_separator_inside_path_is_not_an_origin() {
        let loc = Location::parse("/a/b://c");
        assert_eq!(loc.origin(), "");
        assert_eq!(loc.segments(), ["a", "b:", "c"]);
    }

    #[test]
    fn test_join_simple() {
        let base = Location::parse("https://h/");
        assert_eq!(base.join("a").to_string(), "https://h/a/");
        assert_eq!(base.join("a/b").to_string(), "https://h/a/b/");
        assert_eq!(base.join("/a").to_string(), "https://h/a/");
        assert_eq!(base.join("  /a").to_string(), "https://h/a/");
    }

    #[test]
    fn test_join_dot_segments() {
        let base = Location::parse("https://h/");
        assert_eq!(base.join("a/b/..").to_string(), "https://h/a/");
        assert_eq!(base.join("a/../b").to_string(), "https://h/b/");
        assert_eq!(base.join("./a/./b/.").to_string(), "https://h/a/b/");
        assert_eq!(base.join("..").to_string(), "https://h/");
    }

    #[test]
    fn test_join_reserved_names_are_segments() {
        let base = Location::parse("https://h/-Izjg/");
        assert_eq!(base.join(".priority").to_string(), "https://h/-Izjg/.priority/");
        assert_eq!(base.join(".value").key(), Some(".value"));
    }

    #[test]
    fn test_join_empty_keeps_base() {
        let base = Location::parse("https://h/a/?x=1");
        assert_eq!(base.join(""), base);
        assert_eq!(base.join("/"), base);
    }

    #[test]
    fn test_join_drops_suffix() {
        let base = Location::parse("https://h/a/?x=1");
        assert_eq!(base.join("b").to_string(), "https://h/a/b/");
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent_location("https://h/a/b/"), "https://h/a/");
        assert_eq!(parent_location("https://h/a/"), "https://h/");
        assert_eq!(parent_location("https://h/"), "https://h/");
        assert_eq!(parent_location("https://h/a/b/?x=1"), "https://h/a/?x=1");
    }

    #[test]
    fn test_root() {
        assert_eq!(root_location("https://h/a/b/"), "https://h/");
        assert_eq!(root_location("https://h/a/?x=1#f"), "https://h/");
        assert_eq!(root_location("/a/b/"), "/");
    }

    #[test]
    fn test_key() {
        assert_eq!(Location::parse("https://h/a/b").key(), Some("b"));
        assert_eq!(Location::parse("https://h/").key(), None);
        assert!(Location::parse("https://h").is_root());
    }

    #[test]
    fn test_reserved_characters_in_keys_survive_rendering() {
        let base = Location::parse("https://h/");
        for key in ["what?", "a#b", "100%", "50%25", "?", "#"] {
            let loc = base.join(key);
            assert_eq!(loc.key(), Some(key));
            assert_eq!(loc.suffix(), "");
            assert_eq!(Location::parse(&loc.to_string()), loc);
            assert_eq!(Location::parse(&loc.to_string()).parent(), base);
        }
        assert_eq!(base.join("what?").to_string(), "https://h/what%3F/");
        assert_eq!(base.join("a#b/c").to_string(), "https://h/a%23b/c/");
        assert_ne!(base.join("what?"), base.join("what"));
    }

    #[test]
    fn test_parse_decodes_escapes() {
        let loc = Location::parse("https://h/a%20b/c%2Fd/?q=%3F");
        assert_eq!(loc.segments(), ["a b", "c/d"]);
        assert_eq!(loc.suffix(), "?q=%3F");
        assert_eq!(loc.to_string(), "https://h/a b/c%2Fd/?q=%3F");
    }

    #[test]
    fn test_parse_keeps_malformed_escapes() {
        assert_eq!(Location::parse("/100%/").segments(), ["100%"]);
        assert_eq!(Location::parse("/%zz%+f/").segments(), ["%zz%+f"]);
        assert_eq!(Location::parse("/%ff/").segments(), ["%ff"]);
    }

    #[test]
    fn test_path_component() {
        assert_eq!(Location::parse("https://h/a/b").path(), "/a/b/");
        assert_eq!(Location::parse("https://h").path(), "/");
    }
}
