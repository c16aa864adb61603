//! Body markup codec: HTML escaping plus URL linkification.
//!
//! Escaping always runs first; `linkify` then operates on entity-encoded
//! text, so a URL containing `&` carries `&amp;` into its `href` exactly as
//! it appears in the rendered body.

/// Substitutes the five HTML-significant characters with their entities.
///
/// Total over arbitrary input; every other character passes through
/// untouched.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Wraps each maximal `http(s)://` + non-whitespace run in an anchor that
/// opens externally. Everything outside the runs is preserved byte for byte.
///
/// A scheme with nothing after it (`http://` followed by whitespace or end of
/// input) is left as plain text.
pub fn linkify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((start, scheme_len)) = find_scheme(rest) {
        let tail = &rest[start..];
        let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
        if end <= scheme_len {
            // Bare scheme; emit it as-is and keep scanning.
            out.push_str(&rest[..start + scheme_len]);
            rest = &rest[start + scheme_len..];
            continue;
        }
        let url = &tail[..end];
        out.push_str(&rest[..start]);
        out.push_str("<a href=\"");
        out.push_str(url);
        out.push_str("\" target=\"_blank\">");
        out.push_str(url);
        out.push_str("</a>");
        rest = &rest[start + end..];
    }
    out.push_str(rest);
    out
}

/// Escapes, then linkifies. This is the only order that keeps markup safe:
/// the anchors `linkify` emits must survive, everything the user typed must
/// not.
pub fn render_body(text: &str) -> String {
    linkify(&escape(text))
}

/// Earliest scheme occurrence and its length, scanning both spellings.
fn find_scheme(text: &str) -> Option<(usize, usize)> {
    const HTTP: &str = "http://";
    const HTTPS: &str = "https://";
    let http = text.find(HTTP).map(|at| (at, HTTP.len()));
    let https = text.find(HTTPS).map(|at| (at, HTTPS.len()));
    match (http, https) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}
