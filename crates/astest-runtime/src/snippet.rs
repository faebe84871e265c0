//! Source text of an assertion, recovered from its location

use crate::span::Location;

/// Extract the text covered by `location` from `text`
///
/// Lines are 1-indexed and inclusive; columns are character offsets, the
/// end column exclusive. The first line is cut from `column`, the last line
/// up to `endcolumn`, and the lines are joined with `\n`. Locations that
/// reach past the text are clamped.
pub fn extract(text: &str, location: Location) -> String {
    let lines: Vec<&str> = text.lines().collect();
    extract_lines(&lines, location)
}

/// [`extract`] over text that is already split into lines
pub fn extract_lines<L: AsRef<str>>(lines: &[L], location: Location) -> String {
    let first = (location.line.max(1) - 1) as usize;
    let last = (location.endline.max(location.line).max(1) - 1) as usize;
    if first >= lines.len() {
        return String::new();
    }
    let last = last.min(lines.len() - 1);

    let column = location.column as usize;
    let endcolumn = location.endcolumn as usize;

    if first == last {
        return char_slice(lines[first].as_ref(), column, Some(endcolumn));
    }

    let mut parts = Vec::with_capacity(last - first + 1);
    parts.push(char_slice(lines[first].as_ref(), column, None));
    for line in &lines[first + 1..last] {
        parts.push(line.as_ref().to_string());
    }
    parts.push(char_slice(lines[last].as_ref(), 0, Some(endcolumn)));
    parts.join("\n")
}

/// Characters `[start, end)` of `line`, clamped to its length
fn char_slice(line: &str, start: usize, end: Option<usize>) -> String {
    let take = match end {
        Some(end) => end.saturating_sub(start),
        None => usize::MAX,
    };
    line.chars().skip(start).take(take).collect()
}
