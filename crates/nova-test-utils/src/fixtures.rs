use std::collections::HashMap;

use nova_core::{LineIndex, Position, TextRange, TextSize};

const START_MARKER: &str = "/*start*/";
const END_MARKER: &str = "/*end*/";

/// Extracts a byte range selection from a fixture containing `/*start*/` and
/// `/*end*/` markers.
///
/// Returns the fixture with markers removed and the selection `TextRange`
/// pointing at the extracted region.
pub fn extract_range(fixture: &str) -> (String, TextRange) {
    let start = fixture
        .find(START_MARKER)
        .expect("fixture missing /*start*/ marker");
    let after_start = start + START_MARKER.len();
    let end = fixture
        .find(END_MARKER)
        .expect("fixture missing /*end*/ marker");
    assert!(end >= after_start, "/*end*/ must come after /*start*/");

    let mut text = String::with_capacity(fixture.len());
    text.push_str(&fixture[..start]);
    text.push_str(&fixture[after_start..end]);
    text.push_str(&fixture[end + END_MARKER.len()..]);

    // Range in the marker-stripped text: the start position stays the same;
    // the end shrinks by the length of the start marker.
    let range = TextRange::new(
        TextSize::from(start as u32),
        TextSize::from((end - START_MARKER.len()) as u32),
    );
    (text, range)
}

/// Removes the common leading indentation of all non-blank lines, plus a single leading
/// newline, so fixtures can be written as indented raw strings.
pub fn trim_indent(text: &str) -> String {
    let text = text.strip_prefix('\n').unwrap_or(text);
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if line.len() >= indent && line.is_char_boundary(indent) {
            out.push_str(&line[indent..]);
        } else {
            out.push_str(line.trim_start_matches([' ', '\t']));
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureFile {
    /// Workspace-absolute path, always starting with `/`.
    pub path: String,
    pub text: String,
    /// Selection marked with `/*start*/` and `/*end*/`, if any.
    pub range: Option<TextRange>,
}

/// A multi-file project fixture.
///
/// ```text
/// //- /foo/A.java
/// package foo;
/// public class A { public static String $0field; }
/// //- /bar/B.java
/// package bar;
/// class B { void m() { /*start*/foo.A.field = "x";/*end*/ } }
/// ```
///
/// `$N` markers record offsets and are stripped. Marker IDs must be unique across the
/// entire fixture; duplicate IDs panic during parsing.
#[derive(Debug, Clone)]
pub struct Fixture {
    files: Vec<FixtureFile>,
    markers: HashMap<u32, (usize, usize)>,
}

impl Fixture {
    #[must_use]
    pub fn parse(fixture: &str) -> Self {
        let fixture = trim_indent(fixture);
        let mut raw: Vec<(String, String)> = Vec::new();

        for line in fixture.lines() {
            if let Some(rest) = line.strip_prefix("//-") {
                raw.push((normalize_fixture_path(rest), String::new()));
                continue;
            }
            let Some((_, text)) = raw.last_mut() else {
                assert!(
                    line.trim().is_empty(),
                    "fixture text before the first `//- /path` header: {line:?}"
                );
                continue;
            };
            text.push_str(line);
            text.push('\n');
        }

        let mut files = Vec::with_capacity(raw.len());
        let mut markers: HashMap<u32, (usize, usize)> = HashMap::new();
        for (path, text) in raw {
            assert!(
                files.iter().all(|f: &FixtureFile| f.path != path),
                "duplicate fixture file {path}"
            );
            let idx = files.len();
            let (text, range) = if text.contains(START_MARKER) {
                let (text, range) = extract_range(&text);
                (text, Some(range))
            } else {
                (text, None)
            };
            let (text, file_markers) = strip_markers(&text);
            let range = range.map(|range| shift_range_for_markers(range, &file_markers));
            for (id, offset) in file_markers {
                if let Some((prev_idx, prev_offset)) = markers.insert(id, (idx, offset)) {
                    panic!(
                        "duplicate fixture marker ${id} (first at {}:{prev_offset}, again at {path}:{offset})",
                        files
                            .get(prev_idx)
                            .map(|f: &FixtureFile| f.path.as_str())
                            .unwrap_or(path.as_str())
                    );
                }
            }
            files.push(FixtureFile { path, text, range });
        }

        Self { files, markers }
    }

    pub fn files(&self) -> &[FixtureFile] {
        &self.files
    }

    #[must_use]
    pub fn file(&self, path: &str) -> &FixtureFile {
        let path = normalize_fixture_path(path);
        self.files
            .iter()
            .find(|f| f.path == path)
            .unwrap_or_else(|| panic!("no fixture file {path}"))
    }

    #[must_use]
    pub fn text(&self, path: &str) -> &str {
        &self.file(path).text
    }

    #[must_use]
    pub fn range(&self, path: &str) -> TextRange {
        self.file(path)
            .range
            .unwrap_or_else(|| panic!("fixture file {path} has no /*start*/ marker"))
    }

    #[must_use]
    pub fn marker_path(&self, id: u32) -> &str {
        &self.files[self.marker(id).0].path
    }

    #[must_use]
    pub fn marker_offset(&self, id: u32) -> TextSize {
        TextSize::from(self.marker(id).1 as u32)
    }

    #[must_use]
    pub fn marker_position(&self, id: u32) -> Position {
        let (idx, offset) = self.marker(id);
        let text = &self.files[idx].text;
        LineIndex::new(text).position(text, TextSize::from(offset as u32))
    }

    fn marker(&self, id: u32) -> (usize, usize) {
        *self
            .markers
            .get(&id)
            .unwrap_or_else(|| panic!("no fixture marker ${id}"))
    }
}

fn normalize_fixture_path(path: &str) -> String {
    // Fixtures might use Windows-style separators even when tests run on Unix.
    let path = path.trim().replace('\\', "/");
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

fn strip_markers(text: &str) -> (String, Vec<(u32, usize)>) {
    let mut out = String::with_capacity(text.len());
    let mut markers = Vec::new();

    let bytes = text.as_bytes();
    let mut i = 0usize;
    let mut last = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }

            if j > i + 1 {
                // `$` and ASCII digits are single-byte code points, so `i` and `j` are
                // valid UTF-8 boundaries.
                out.push_str(&text[last..i]);
                if let Ok(id) = text[i + 1..j].parse::<u32>() {
                    markers.push((id, out.len()));
                }
                i = j;
                last = j;
                continue;
            }
        }

        i += 1;
    }

    out.push_str(&text[last..]);

    (out, markers)
}

/// Adjusts a range computed before `$N` markers were stripped.
fn shift_range_for_markers(range: TextRange, markers: &[(u32, usize)]) -> TextRange {
    // `markers` holds offsets in the stripped text; rebuild the removed lengths in order.
    let removed_before = |pos: u32| -> u32 {
        let mut removed = 0u32;
        for (id, stripped_offset) in markers {
            let len = 1 + id.to_string().len() as u32;
            if (*stripped_offset as u32) + removed < pos {
                removed += len;
            }
        }
        removed
    };
    let start = u32::from(range.start());
    let end = u32::from(range.end());
    let new_start = start - removed_before(start);
    let new_end = end - removed_before(end);
    TextRange::new(TextSize::from(new_start), TextSize::from(new_end.max(new_start)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strip_markers_preserves_unicode_and_offsets() {
        let input = "α$0😃β$10";
        let (text, markers) = strip_markers(input);

        assert_eq!(text, "α😃β");
        assert_eq!(markers, vec![(0, "α".len()), (10, "α😃β".len())]);
    }

    #[test]
    fn strip_markers_keeps_invalid_dollar_sequences() {
        // `$x` and `$` at EOF are not markers and should be preserved.
        let input = "a$x$0b$";
        let (text, markers) = strip_markers(input);

        assert_eq!(text, "a$xb$");
        assert_eq!(markers, vec![(0, 3)]);
    }

    #[test]
    fn extract_range_handles_multibyte_chars() {
        let input = "a/*start*/α😃β/*end*/c";
        let (text, range) = extract_range(input);

        assert_eq!(text, "aα😃βc");
        assert_eq!(&text[range], "α😃β");
    }

    #[test]
    fn multi_file_fixture_with_markers_and_ranges() {
        let fixture = Fixture::parse(
            r#"
            //- /foo/A.java
            package foo;
            public class A { public static String $0field; }
            //- bar/B.java
            package bar;
            class B { void m() { /*start*/foo.A.$1field = "x";/*end*/ } }
            "#,
        );

        let paths: Vec<&str> = fixture.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/foo/A.java", "/bar/B.java"]);
        assert_eq!(
            fixture.text("/foo/A.java"),
            "package foo;\npublic class A { public static String field; }\n"
        );

        assert_eq!(fixture.marker_path(0), "/foo/A.java");
        let a = fixture.text("/foo/A.java");
        assert_eq!(&a[usize::from(fixture.marker_offset(0))..][..5], "field");
        assert_eq!(fixture.marker_position(0), Position::new(1, 38));

        let b = fixture.text("/bar/B.java");
        assert_eq!(&b[fixture.range("/bar/B.java")], "foo.A.field = \"x\";");
        assert_eq!(fixture.marker_path(1), "/bar/B.java");
        assert_eq!(&b[usize::from(fixture.marker_offset(1))..][..5], "field");
        assert_eq!(fixture.file("/foo/A.java").range, None);
    }

    #[test]
    fn trim_indent_strips_common_prefix() {
        assert_eq!(trim_indent("\n    a\n      b\n\n    c"), "a\n  b\n\nc");
    }

    #[test]
    #[should_panic(expected = "duplicate fixture marker $0")]
    fn duplicate_marker_ids_panic() {
        let _ = Fixture::parse("//- /a.txt\n$0\n//- /b.txt\n$0");
    }
}
