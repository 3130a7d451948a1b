//! Turns raw rows into [`CanonicalBlipRecord`]s.
//!
//! Descriptions keep a small set of formatting tags; every other field is
//! reduced to plain text.

use crate::domain::{CanonicalBlipRecord, RawRow};

const RELAXED_TAGS: [&str; 10] = ["b", "i", "em", "strong", "a", "p", "br", "ul", "ol", "li"];
const LINK_ATTRIBUTES: [&str; 2] = ["href", "target"];
const LINK_SCHEMES: [&str; 5] = ["http", "https", "ftp", "mailto", "tel"];
const VOID_TAGS: [&str; 1] = ["br"];
/// Tags whose text is dropped along with the tag when not allowed.
const DISCARDED_CONTENT_TAGS: [&str; 5] = ["script", "style", "textarea", "option", "noscript"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    Restricted,
    Relaxed,
}

impl Policy {
    fn allows(self, tag: &str) -> bool {
        match self {
            Self::Restricted => false,
            Self::Relaxed => RELAXED_TAGS.contains(&tag),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RowSanitizer;

impl RowSanitizer {
    pub const fn new() -> Self {
        Self
    }

    /// Sanitizes a keyed row (CSV and JSON sources).
    pub fn sanitize(&self, row: &RawRow) -> CanonicalBlipRecord {
        let trimmed: RawRow = row
            .iter()
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect();
        let field = |key: &str| trimmed.get(key).unwrap_or_default();

        canonical_record(
            field("name"),
            field("ring"),
            field("isNew"),
            field("status"),
            field("quadrant"),
            field("topic"),
            field("description"),
        )
    }

    /// Sanitizes a positional row from a protected sheet, resolving each
    /// field through the header row.
    pub fn sanitize_for_protected_sheet(&self, row: &[String], header: &[String]) -> CanonicalBlipRecord {
        let field = |column: &str| {
            header
                .iter()
                .position(|name| name.trim() == column)
                .and_then(|index| row.get(index))
                .map_or("", |value| value.trim())
        };

        canonical_record(
            field("name"),
            field("ring"),
            field("isNew"),
            field("status"),
            field("quadrant"),
            field("topic"),
            field("description"),
        )
    }
}

pub fn parse_is_new(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn canonical_record(
    name: &str,
    ring: &str,
    is_new: &str,
    status: &str,
    quadrant: &str,
    topic: &str,
    description: &str,
) -> CanonicalBlipRecord {
    CanonicalBlipRecord {
        name: plain_text(name),
        ring: plain_text(ring),
        is_new: parse_is_new(&plain_text(is_new)),
        status: plain_text(status),
        quadrant: plain_text(quadrant),
        topic: plain_text(topic),
        description: rich_text(description),
    }
}

/// Strips every tag and unescapes `&amp;`.
pub fn plain_text(value: &str) -> String {
    clean_html(value, Policy::Restricted)
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Keeps the description allow-list, drops every other tag.
pub fn rich_text(value: &str) -> String {
    clean_html(value, Policy::Relaxed)
}

fn clean_html(input: &str, policy: Policy) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        if let Some(comment) = after.strip_prefix("!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }

        // A bare or unterminated `<` is text.
        let Some((tag, close)) = after
            .find('>')
            .and_then(|close| Tag::parse(&after[..close]).map(|tag| (tag, close)))
        else {
            out.push_str("&lt;");
            rest = after;
            continue;
        };
        rest = &after[close + 1..];

        if policy.allows(&tag.name) {
            out.push_str(&tag.render());
        } else if !tag.closing && DISCARDED_CONTENT_TAGS.contains(&tag.name.as_str()) {
            rest = skip_past_closing_tag(rest, &tag.name);
        }
    }

    out.push_str(rest);
    out
}

fn skip_past_closing_tag<'a>(rest: &'a str, name: &str) -> &'a str {
    let lowered = rest.to_ascii_lowercase();
    let Some(start) = lowered.find(&format!("</{name}")) else {
        return "";
    };
    lowered[start..]
        .find('>')
        .map_or("", |end| &rest[start + end + 1..])
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    name: String,
    closing: bool,
    attributes: Vec<(String, String)>,
}

impl Tag {
    fn parse(inner: &str) -> Option<Self> {
        let (closing, body) = inner
            .strip_prefix('/')
            .map_or((false, inner), |body| (true, body));
        if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }

        let name_end = body
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(body.len());
        let attributes = if closing {
            Vec::new()
        } else {
            parse_attributes(&body[name_end..])
        };

        Some(Self {
            name: body[..name_end].to_ascii_lowercase(),
            closing,
            attributes,
        })
    }

    fn render(&self) -> String {
        if self.closing {
            return format!("</{}>", self.name);
        }

        let mut rendered = format!("<{}", self.name);
        if self.name == "a" {
            for (key, value) in &self.attributes {
                if !LINK_ATTRIBUTES.contains(&key.as_str()) {
                    continue;
                }
                if key == "href" && !is_safe_link(value) {
                    continue;
                }
                rendered.push_str(&format!(" {key}=\"{}\"", value.replace('"', "&quot;")));
            }
        }
        if VOID_TAGS.contains(&self.name.as_str()) {
            rendered.push_str(" />");
        } else {
            rendered.push('>');
        }
        rendered
    }
}

/// Browsers decode entities and skip control characters before reading the
/// scheme, so the check runs on that form. Relative links have no scheme.
fn is_safe_link(value: &str) -> bool {
    let compact: String = decode_entities(value)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let scheme_end = compact.find(':');
    let path_start = compact.find(['/', '?', '#']);
    match (scheme_end, path_start) {
        (Some(colon), Some(path)) if path < colon => true,
        (Some(colon), _) => LINK_SCHEMES.contains(&&compact[..colon]),
        (None, _) => true,
    }
}

/// Decodes numeric references and the named entities that can spell out a
/// scheme. Anything else is left as written.
fn decode_entities(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let end = after
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '#')
            .unwrap_or(after.len());
        let name = &after[..end];

        match entity_char(name) {
            Some(decoded) => {
                out.push(decoded);
                rest = after[end..].strip_prefix(';').unwrap_or(&after[end..]);
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn entity_char(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code);
    }

    match name.to_ascii_lowercase().as_str() {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "colon" => Some(':'),
        "tab" => Some('\t'),
        "newline" => Some('\n'),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

fn parse_attributes(source: &str) -> Vec<(String, String)> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let is_space = |byte: u8| byte.is_ascii_whitespace();
    let mut attributes = Vec::new();
    let mut index = 0;

    loop {
        while index < len && (is_space(bytes[index]) || bytes[index] == b'/') {
            index += 1;
        }
        if index >= len {
            break;
        }

        let key_start = index;
        while index < len && !is_space(bytes[index]) && bytes[index] != b'=' && bytes[index] != b'/' {
            index += 1;
        }
        let key = source[key_start..index].to_ascii_lowercase();

        while index < len && is_space(bytes[index]) {
            index += 1;
        }

        let mut value = "";
        if index < len && bytes[index] == b'=' {
            index += 1;
            while index < len && is_space(bytes[index]) {
                index += 1;
            }
            if index < len && (bytes[index] == b'"' || bytes[index] == b'\'') {
                let quote = bytes[index];
                index += 1;
                let value_start = index;
                while index < len && bytes[index] != quote {
                    index += 1;
                }
                value = &source[value_start..index];
                index = (index + 1).min(len);
            } else {
                let value_start = index;
                while index < len && !is_space(bytes[index]) {
                    index += 1;
                }
                value = &source[value_start..index];
            }
        }

        if !key.is_empty() {
            attributes.push((key, value.to_string()));
        }
    }

    attributes
}
