// HTML sanitization for free-text fields.
//
// Three strip rules, applied before persistence:
//   1. `<script>` elements are removed, body included.
//   2. Inline event-handler attributes (`on*=`) are dropped from tags.
//   3. Attributes whose value is a `javascript:` URI are dropped.
// Tags are otherwise left intact.

/// Sanitize a free-text value that may contain HTML.
pub fn sanitize_html(input: &str) -> String {
    clean_tags(&strip_script_elements(input))
}

/// Remove `<script ...>...</script>` blocks (case-insensitive). An
/// unterminated script element swallows the rest of the input.
fn strip_script_elements(input: &str) -> String {
    // ASCII lowering keeps byte offsets aligned with `input`
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(rel) = lower[pos..].find("<script") {
        let start = pos + rel;
        // Require a real tag boundary, not e.g. "<scripting"
        let after = lower.as_bytes().get(start + 7).copied();
        if !matches!(after, None | Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/')) {
            out.push_str(&input[pos..start + 7]);
            pos = start + 7;
            continue;
        }

        out.push_str(&input[pos..start]);
        match lower[start..].find("</script") {
            Some(close_rel) => {
                let close = start + close_rel;
                match lower[close..].find('>') {
                    Some(gt_rel) => pos = close + gt_rel + 1,
                    None => return out,
                }
            }
            None => return out,
        }
    }

    out.push_str(&input[pos..]);
    out
}

/// Rewrite element tags, dropping unsafe attributes.
fn clean_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }

        // Only element tags get rewritten; comments, closing tags and
        // stray '<' pass through untouched.
        let is_open_tag = matches!(chars.peek(), Some((_, next)) if next.is_ascii_alphabetic());
        if !is_open_tag {
            out.push(c);
            continue;
        }

        match find_tag_end(input, i + 1) {
            Some(end) => {
                out.push_str(&rebuild_tag(&input[i + 1..end]));
                // Skip to the closing '>'
                while let Some((j, _)) = chars.peek().copied() {
                    chars.next();
                    if j == end {
                        break;
                    }
                }
            }
            None => {
                // Unterminated tag: emit as-is
                out.push(c);
            }
        }
    }

    out
}

/// Index of the '>' terminating a tag that starts just after `from`,
/// honoring quoted attribute values.
fn find_tag_end(input: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in input[from..].char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '>' => return Some(from + i),
                _ => {}
            },
        }
    }
    None
}

/// Re-emit a tag (content between '<' and '>'), keeping only safe
/// attributes in their original spelling.
fn rebuild_tag(inner: &str) -> String {
    let inner_trimmed = inner.trim_end();
    let self_closing = inner_trimmed.ends_with('/');
    let body = if self_closing {
        &inner_trimmed[..inner_trimmed.len() - 1]
    } else {
        inner_trimmed
    };

    let name_end = body
        .find(|c: char| c.is_whitespace())
        .unwrap_or(body.len());
    let name = &body[..name_end];

    let mut out = String::with_capacity(inner.len() + 2);
    out.push('<');
    out.push_str(name);

    for attr in parse_attributes(&body[name_end..]) {
        if attribute_is_safe(&attr) {
            out.push(' ');
            out.push_str(attr.raw);
        }
    }

    if self_closing {
        out.push_str(" /");
    }
    out.push('>');
    out
}

struct Attribute<'a> {
    name: &'a str,
    value: Option<&'a str>,
    /// Original source text of the attribute, re-emitted verbatim when kept.
    raw: &'a str,
}

fn attribute_is_safe(attr: &Attribute<'_>) -> bool {
    if attr.name.to_ascii_lowercase().starts_with("on") {
        return false;
    }
    if let Some(value) = attr.value {
        // Browsers ignore control characters and whitespace inside the
        // scheme, so strip them before matching.
        let scheme: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .take(11)
            .collect::<String>()
            .to_ascii_lowercase();
        if scheme == "javascript:" {
            return false;
        }
    }
    true
}

fn parse_attributes(mut rest: &str) -> Vec<Attribute<'_>> {
    let mut attrs = Vec::new();

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let attr_start = rest;
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let mut value = None;
        if let Some(stripped) = rest.strip_prefix('=') {
            rest = stripped.trim_start();
            if let Some(q) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
                let after_quote = &rest[1..];
                let end = after_quote.find(q).unwrap_or(after_quote.len());
                value = Some(&after_quote[..end]);
                rest = after_quote.get(end + 1..).unwrap_or("");
            } else {
                let end = rest
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(rest.len());
                value = Some(&rest[..end]);
                rest = &rest[end..];
            }
        }

        let consumed = attr_start.len() - rest.len();
        if consumed == 0 {
            break;
        }
        attrs.push(Attribute {
            name,
            value,
            raw: attr_start[..consumed].trim_end(),
        });
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_event_handler_leaving_tag_intact() {
        assert_eq!(
            sanitize_html(r#"<img src=x onerror="alert(1)">"#),
            "<img src=x>"
        );
    }

    #[test]
    fn removes_script_elements_with_body() {
        assert_eq!(sanitize_html("before<script>alert(1)</script>after"), "beforeafter");
        assert_eq!(
            sanitize_html(r#"a<script type="text/javascript">x</script>b"#),
            "ab"
        );
    }

    #[test]
    fn unterminated_script_swallows_rest() {
        assert_eq!(sanitize_html("safe<script>alert(1)"), "safe");
    }

    #[test]
    fn neutralizes_javascript_uris() {
        assert_eq!(
            sanitize_html(r#"<a href="javascript:alert(1)">link</a>"#),
            "<a>link</a>"
        );
        // Whitespace inside the scheme does not evade the check
        assert_eq!(
            sanitize_html("<a href=\"java\tscript:alert(1)\">x</a>"),
            "<a>x</a>"
        );
    }

    #[test]
    fn keeps_safe_markup() {
        assert_eq!(
            sanitize_html(r#"<p class="note">Hello <b>world</b></p>"#),
            r#"<p class="note">Hello <b>world</b></p>"#
        );
        assert_eq!(
            sanitize_html(r#"<a href="https://example.org">site</a>"#),
            r#"<a href="https://example.org">site</a>"#
        );
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(sanitize_html("2 < 3 and 4 > 1"), "2 < 3 and 4 > 1");
        assert_eq!(sanitize_html("no markup here"), "no markup here");
    }

    #[test]
    fn mixed_case_handlers_are_stripped() {
        assert_eq!(
            sanitize_html(r#"<div OnClick="evil()" id="ok">x</div>"#),
            r#"<div id="ok">x</div>"#
        );
    }
}
