//! `${…}` template scanning.

/// A piece of a template string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Expr(&'a str),
}

/// True if `source` contains at least one complete `${…}` placeholder.
pub(crate) fn has_placeholder(source: &str) -> bool {
    segments(source)
        .iter()
        .any(|segment| matches!(segment, Segment::Expr(_)))
}

/// Strips a `${ … }` wrapper that spans the whole (trimmed) source.
pub(crate) fn strip_wrapper(source: &str) -> &str {
    let trimmed = source.trim();
    match segments(trimmed).as_slice() {
        [Segment::Expr(inner)] => inner.trim(),
        _ => trimmed,
    }
}

/// Splits `source` into literal text and placeholder bodies. An unterminated
/// `${` is kept as literal text.
pub(crate) fn segments(source: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("${") {
        let body_start = start + 2;
        let Some(len) = closing_brace(&rest[body_start..]) else {
            break;
        };
        if start > 0 {
            out.push(Segment::Text(&rest[..start]));
        }
        out.push(Segment::Expr(&rest[body_start..body_start + len]));
        rest = &rest[body_start + len + 1..];
    }

    if !rest.is_empty() {
        out.push(Segment::Text(rest));
    }
    out
}

/// Byte length of the placeholder body, skipping braces inside quotes.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
        if let Some(q) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}
