//! JSX text and literal helpers shared by the compiler and the patcher.

/// Collapses a raw JSX text child the way React does: lines are trimmed,
/// blank lines dropped, the rest joined with single spaces.
pub fn normalize_jsx_text(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    let last_non_empty = lines
        .iter()
        .rposition(|l| l.chars().any(|c| c != ' ' && c != '\t'));

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let is_first = i == 0;
        let is_last = i == lines.len() - 1;
        let mut trimmed: &str = line;
        if !is_first {
            trimmed = trimmed.trim_start_matches([' ', '\t']);
        }
        if !is_last {
            trimmed = trimmed.trim_end_matches([' ', '\t']);
        }
        if trimmed.is_empty() {
            continue;
        }
        out.push_str(trimmed);
        if Some(i) != last_non_empty {
            out.push(' ');
        }
    }
    decode_entities(&out)
}

/// Decodes the HTML entities JSX accepts in text and string attributes.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';') {
            Some(semi) if semi <= 10 => {
                let entity = &tail[1..semi];
                if let Some(decoded) = decode_entity(entity) {
                    out.push(decoded);
                    rest = &tail[semi + 1..];
                    continue;
                }
                out.push('&');
                rest = &tail[1..];
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

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "copy" => Some('©'),
        "hellip" => Some('…'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Value of a literal JS expression (`"x"`, `'x'`, `` `x` ``, `42`), if it is one.
pub fn literal_expression_value(code: &str) -> Option<String> {
    let code = strip_js_comments(code);
    let code = code.trim();
    let first = code.chars().next()?;
    match first {
        '"' | '\'' => {
            if code.len() < 2 || !code.ends_with(first) {
                return None;
            }
            unescape_js_string(&code[1..code.len() - 1], first)
        }
        '`' => {
            if code.len() < 2 || !code.ends_with('`') || code.contains("${") {
                return None;
            }
            unescape_js_string(&code[1..code.len() - 1], '`')
        }
        '0'..='9' | '-' | '.' => {
            let n: f64 = code.parse().ok()?;
            if n.is_finite() {
                Some(format_number(n))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn unescape_js_string(body: &str, quote: char) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == quote {
            // an unescaped quote means this was not a single literal
            return None;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            other => out.push(other),
        }
    }
    Some(out)
}

/// Removes `//` and `/* */` comments outside of string literals.
pub fn strip_js_comments(code: &str) -> String {
    let bytes = code.as_bytes();
    let mut out = String::with_capacity(code.len());
    let mut i = 0;
    let mut last = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                out.push_str(&code[last..i]);
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                last = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&code[last..i]);
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                last = i;
            }
            _ => i += 1,
        }
    }
    if last < code.len() {
        out.push_str(&code[last.min(code.len())..]);
    }
    out
}

/// Writes `text` as JSX child content. Characters JSX reserves force a
/// string-literal expression container instead of raw text.
pub fn jsx_text_literal(text: &str) -> String {
    if text.contains(['{', '}', '<', '>']) {
        let escaped = text
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n");
        format!("{{\"{}\"}}", escaped)
    } else {
        text.to_string()
    }
}

/// Writes `value` as a quoted JSX attribute string.
pub fn jsx_attribute_literal(value: &str) -> String {
    if value.contains('"') && !value.contains('\'') {
        format!("'{}'", value)
    } else if value.contains('"') {
        format!("{{\"{}\"}}", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        format!("\"{}\"", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_like_react() {
        assert_eq!(normalize_jsx_text("Hi"), "Hi");
        assert_eq!(normalize_jsx_text("\n    Hello\n    world\n  "), "Hello world");
        assert_eq!(normalize_jsx_text("\n   \n"), "");
        assert_eq!(normalize_jsx_text(" a "), " a ");
        assert_eq!(normalize_jsx_text("Tom &amp; Jerry"), "Tom & Jerry");
    }

    #[test]
    fn decodes_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("a & b"), "a & b");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
    }

    #[test]
    fn literal_expressions() {
        assert_eq!(literal_expression_value(r#" "hello" "#), Some("hello".into()));
        assert_eq!(literal_expression_value("'it\\'s'"), Some("it's".into()));
        assert_eq!(literal_expression_value("`plain`"), Some("plain".into()));
        assert_eq!(literal_expression_value("`a ${b}`"), None);
        assert_eq!(literal_expression_value("42"), Some("42".into()));
        assert_eq!(literal_expression_value("1.5"), Some("1.5".into()));
        assert_eq!(literal_expression_value("name"), None);
        assert_eq!(literal_expression_value("'a' + 'b'"), None);
        assert_eq!(literal_expression_value("/* note */ 'x'"), Some("x".into()));
    }

    #[test]
    fn strips_comments_but_not_strings() {
        assert_eq!(strip_js_comments("a /* b */ c // d"), "a  c ");
        assert_eq!(strip_js_comments("'// not a comment'"), "'// not a comment'");
    }

    #[test]
    fn jsx_literals_escape_reserved_characters() {
        assert_eq!(jsx_text_literal("Hello"), "Hello");
        assert_eq!(jsx_text_literal("a < b"), "{\"a < b\"}");
        assert_eq!(jsx_attribute_literal("p-4"), "\"p-4\"");
        assert_eq!(jsx_attribute_literal("say \"hi\""), "'say \"hi\"'");
    }
}
