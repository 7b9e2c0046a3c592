use std::borrow::Cow;

/// Ellipsis appended when post text is cut short
pub const ELLIPSIS: &str = "...";

/// Counts the characters (Unicode scalar values) in a string.
///
/// Post budgets are measured in characters, not bytes, so a title full of
/// multi-byte text is not penalised and truncation never lands mid code point.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Returns the longest prefix of `s` holding at most `max_chars` characters.
///
/// Returns `Cow::Borrowed` when the whole string already fits.
///
/// # Examples
///
/// ```
/// use reddittweeter::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Hello World", 5), "Hello");
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((byte_end, _)) => Cow::Owned(s[..byte_end].to_string()),
        None => Cow::Borrowed(s),
    }
}

/// Decodes HTML/XML character entities (`&amp;`, `&lt;`, `&#39;`, ...).
///
/// Reddit escapes `&`, `<` and `>` in titles and comment bodies. Text that
/// quick-xml refuses to unescape as a whole (a bare `&`, an unknown named
/// entity) is decoded one entity at a time, leaving only the offending `&`
/// sequences as they were.
pub fn unescape_html(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    match quick_xml::escape::unescape(s) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::trace!(error = %e, "Falling back to per-entity decoding");
            Cow::Owned(unescape_each(s))
        }
    }
}

fn unescape_each(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        // An entity runs from `&` to the next `;`, with no space or `&` inside
        let end = tail[1..]
            .find(|c: char| c == ';' || c == '&' || c.is_whitespace())
            .map(|i| i + 1)
            .filter(|&end| tail.as_bytes()[end] == b';');

        match end.map(|end| (end, quick_xml::escape::unescape(&tail[..=end]))) {
            Some((end, Ok(decoded))) => {
                out.push_str(&decoded);
                rest = &tail[end + 1..];
            }
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Removes markup tags and collapses runs of whitespace into single spaces.
///
/// Used for comment bodies delivered as HTML fragments in RSS/Atom entries.
/// Entities are left alone; run [`unescape_html`] on the result.
pub fn strip_markup(s: &str) -> String {
    let mut text = String::with_capacity(s.len());
    let mut in_tag = false;

    for c in s.chars() {
        match c {
            '<' => {
                in_tag = true;
                // Tags separate words ("</p><p>" must not glue paragraphs together)
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            _ => text.push(c),
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// SEC-001: Strip control characters and ANSI escape sequences from text.
///
/// Feed titles and comment bodies are user-controlled; nothing that could
/// manipulate a terminal (when logged) or a post body should survive.
///
/// Strips:
/// - ASCII control chars: 0x00-0x08, 0x0B-0x0C, 0x0E-0x1F, 0x7F
/// - ANSI CSI sequences: `\x1b[` ... (terminal byte 0x40-0x7E)
/// - ANSI OSC sequences: `\x1b]` ... (until BEL 0x07 or ST `\x1b\\`)
/// - Bare ESC (0x1b) not followed by `[` or `]`
///
/// Preserves: tab (0x09), newline (0x0A), carriage return (0x0D).
///
/// Returns `Cow::Borrowed` when the input contains no control characters (common case).
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let len = bytes.len();

    let needs_strip = bytes.iter().any(|&b| is_stripped_byte(b));
    if !needs_strip {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        let b = bytes[i];

        if b == 0x1b {
            if i + 1 < len && bytes[i + 1] == b'[' {
                // CSI: skip parameter/intermediate bytes through the final byte
                i += 2;
                while i < len {
                    let c = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&c) {
                        break;
                    }
                }
            } else if i + 1 < len && bytes[i + 1] == b']' {
                // OSC: skip through BEL or ST
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && i + 1 < len && bytes[i + 1] == b'\\' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            } else {
                i += 1;
            }
        } else if is_stripped_byte(b) {
            i += 1;
        } else {
            let start = i;
            i += 1;
            while i < len && !is_stripped_byte(bytes[i]) {
                i += 1;
            }
            // SAFETY: we only stop on ASCII control bytes, which cannot appear
            // mid-codepoint in valid UTF-8, so s[start..i] is valid UTF-8.
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}

fn is_stripped_byte(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && b != 0x09 && b != 0x0a && b != 0x0d)
}
