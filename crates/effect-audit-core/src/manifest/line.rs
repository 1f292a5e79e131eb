//! Line-oriented manifest parser
//!
//! Covers the manifest subset of YAML without a YAML library:
//!
//! ```yaml
//! entries:
//!   - token: "Trans / Blur"
//!     kind: effect
//!     modes:
//!       - light
//!       - heavy
//!   - kind: sentinel
//!     token: 'Unknown Render Object'
//!     modes: []
//! ```
//!
//! Entries are block mappings in any key order; keys may be quoted. Values
//! are single-line scalars (plain, single- or double-quoted) or, for `modes`,
//! a block list or a single-line flow list. Plain scalars resolve the way the
//! YAML core schema does, so `0x1F`, `true` or `~` are not strings.
//!
//! Anything outside the subset (anchors, tags, block scalars, multi-line
//! values, flow mappings as entries) is a format error rather than a guess.

use super::parser::{ManifestParser, ENTRIES_KEY};
use super::types::{RawEntry, RawModes, RawValue};

/// Indentation-tracking state machine over physical lines
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser;

impl ManifestParser for LineParser {
    fn name(&self) -> &'static str {
        "line"
    }

    fn parse(&self, text: &str) -> Result<Vec<RawEntry>, String> {
        let mut reader = Reader::default();
        for (idx, line) in text.lines().enumerate() {
            reader.line(line).map_err(|msg| format!("line {}: {}", idx + 1, msg))?;
        }
        reader.finish()
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
enum Section {
    /// Nothing read yet
    #[default]
    Start,
    /// Inside the block list under `entries:`
    Entries,
    /// After `entries: []` or `entries: ~`
    Inline,
    /// Under some other top-level key
    Other,
}

#[derive(Debug, Default)]
enum Block {
    #[default]
    None,
    /// Block list under `modes:`; items sit at `item_indent` once known
    Modes { key_col: usize, item_indent: Option<usize> },
    /// Nested content of an ignored key
    Skip { deeper_than: usize },
}

#[derive(Debug, Default)]
struct Entry {
    raw: RawEntry,
    keys: Vec<String>,
    /// Column of this entry's keys; unknown until the first key is read
    key_col: Option<usize>,
}

#[derive(Debug, Default)]
struct Reader {
    section: Section,
    top_keys: Vec<String>,
    saw_content: bool,
    entry_indent: Option<usize>,
    current: Option<Entry>,
    block: Block,
    entries: Vec<RawEntry>,
}

impl Reader {
    fn line(&mut self, line: &str) -> Result<(), String> {
        let content = line.trim_start_matches(' ');
        let indent = line.len() - content.len();
        if content.trim().is_empty() || content.starts_with('#') {
            return Ok(());
        }
        if content.starts_with('\t') {
            return Err("tabs are not allowed in indentation".to_string());
        }

        if indent == 0 && is_document_start(content) {
            if self.saw_content {
                return Err("multiple YAML documents are not supported".to_string());
            }
            return Ok(());
        }
        self.saw_content = true;

        if indent == 0 && item_body(content).is_none() {
            return self.top_level(content);
        }

        match self.section {
            Section::Start => Err("manifest root must be a mapping".to_string()),
            Section::Other => Ok(()),
            Section::Inline => Err(format!("unexpected content under inline `{}`", ENTRIES_KEY)),
            Section::Entries => self.entries_line(indent, content),
        }
    }

    fn top_level(&mut self, content: &str) -> Result<(), String> {
        let Some((key, value)) = split_key(content)? else {
            return Err(match self.section {
                Section::Start => "manifest root must be a mapping".to_string(),
                _ => "expected a `key: value` line at the top level".to_string(),
            });
        };
        if self.top_keys.contains(&key) {
            return Err(format!("duplicate top-level key `{}`", key));
        }
        self.top_keys.push(key.clone());
        self.finish_entry();
        self.block = Block::None;

        if key != ENTRIES_KEY {
            self.section = Section::Other;
            return Ok(());
        }

        let value = value.trim_start();
        if strip_comment(value).trim().is_empty() {
            self.section = Section::Entries;
            return Ok(());
        }
        if value.starts_with('[') {
            return match parse_flow_list(value)? {
                RawModes::List(items) if items.is_empty() => {
                    self.section = Section::Inline;
                    Ok(())
                }
                _ => Err(format!("inline `{}` lists are not supported", ENTRIES_KEY)),
            };
        }
        match scalar_value(value)? {
            RawValue::Other("null") => {
                self.section = Section::Inline;
                Ok(())
            }
            _ => Err(format!("`{}` must be a list", ENTRIES_KEY)),
        }
    }

    fn entries_line(&mut self, indent: usize, content: &str) -> Result<(), String> {
        if let Block::Skip { deeper_than } = self.block {
            if indent > deeper_than {
                return Ok(());
            }
            self.block = Block::None;
        }

        let item = item_body(content);
        let Some(entry_indent) = self.entry_indent else {
            let Some(body) = item else {
                return Err(format!("`{}` must be a list", ENTRIES_KEY));
            };
            self.entry_indent = Some(indent);
            return self.start_entry(indent, content, body);
        };

        if indent < entry_indent {
            return Err("unexpected indentation".to_string());
        }
        if indent == entry_indent {
            return match item {
                Some(body) => self.start_entry(indent, content, body),
                None => Err("expected a `- ` list item".to_string()),
            };
        }

        if let Block::Modes { key_col, item_indent } = &mut self.block {
            match item {
                Some(body) if indent >= *key_col && item_indent.map_or(true, |i| i == indent) => {
                    *item_indent = Some(indent);
                    return self.mode_item(body);
                }
                Some(_) => return Err("unexpected indentation in `modes` list".to_string()),
                None => self.block = Block::None,
            }
        }

        let Some(entry) = self.current.as_mut() else {
            return Err("unexpected indentation".to_string());
        };
        if item.is_some() {
            return Err("unexpected list item".to_string());
        }
        let key_col = *entry.key_col.get_or_insert(indent);
        if indent != key_col {
            return Err("multi-line values are not supported".to_string());
        }
        self.entry_field(content)
    }

    fn start_entry(&mut self, indent: usize, content: &str, body: &str) -> Result<(), String> {
        self.finish_entry();
        self.block = Block::None;

        let mut entry = Entry::default();
        if !body.is_empty() {
            entry.key_col = Some(indent + content.len() - body.len());
        }
        self.current = Some(entry);

        if body.is_empty() {
            return Ok(());
        }
        self.entry_field(body)
    }

    fn entry_field(&mut self, text: &str) -> Result<(), String> {
        let number = self.entries.len() + 1;
        if text.starts_with('{') {
            return Err(format!("manifest entry {}: inline mappings are not supported", number));
        }
        let Some((key, value)) = split_key(text)? else {
            return Err(format!("manifest entry {} must be a mapping", number));
        };
        let Some(entry) = self.current.as_mut() else {
            return Err("unexpected indentation".to_string());
        };
        if entry.keys.contains(&key) {
            return Err(format!("duplicate key `{}` in manifest entry {}", key, number));
        }
        entry.keys.push(key.clone());
        let key_col = entry.key_col.unwrap_or_default();

        match key.as_str() {
            "token" => entry.raw.token = Some(scalar_value(value)?),
            "kind" => entry.raw.kind = Some(scalar_value(value)?),
            "modes" => {
                let value = value.trim_start();
                if strip_comment(value).trim().is_empty() {
                    // Null until an item shows up
                    entry.raw.modes = RawModes::Absent;
                    self.block = Block::Modes {
                        key_col,
                        item_indent: None,
                    };
                } else if value.starts_with('[') {
                    entry.raw.modes = parse_flow_list(value)?;
                } else {
                    entry.raw.modes = match scalar_value(value)? {
                        RawValue::Other("null") => RawModes::Absent,
                        _ => RawModes::Invalid,
                    };
                }
            }
            _ => self.block = Block::Skip { deeper_than: key_col },
        }
        Ok(())
    }

    fn mode_item(&mut self, body: &str) -> Result<(), String> {
        let nested = body.is_empty()
            || item_body(body).is_some()
            || body.starts_with(['[', '{'])
            || split_key(body)?.is_some();
        let item = if nested {
            None
        } else {
            match scalar_value(body)? {
                RawValue::Str(mode) => Some(mode),
                RawValue::Other(_) => None,
            }
        };

        let Some(entry) = self.current.as_mut() else {
            return Err("unexpected list item".to_string());
        };
        entry.raw.modes = match (std::mem::take(&mut entry.raw.modes), item) {
            (RawModes::Invalid, _) | (_, None) => RawModes::Invalid,
            (RawModes::List(mut modes), Some(mode)) => {
                modes.push(mode);
                RawModes::List(modes)
            }
            (RawModes::Absent, Some(mode)) => RawModes::List(vec![mode]),
        };
        Ok(())
    }

    fn finish_entry(&mut self) {
        if let Some(entry) = self.current.take() {
            self.entries.push(entry.raw);
        }
    }

    fn finish(mut self) -> Result<Vec<RawEntry>, String> {
        self.finish_entry();
        if !self.top_keys.iter().any(|k| k == ENTRIES_KEY) {
            return Err(format!("missing top-level `{}` list", ENTRIES_KEY));
        }
        Ok(self.entries)
    }
}

fn is_document_start(content: &str) -> bool {
    content
        .strip_prefix("---")
        .is_some_and(|rest| strip_comment(rest).trim().is_empty())
}

/// Text after a block list dash, or `None` when the line is not an item
fn item_body(content: &str) -> Option<&str> {
    let rest = content.strip_prefix('-')?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.starts_with([' ', '\t']).then(|| rest.trim_start())
}

/// Split `key: rest`; `None` when the text is not a mapping key
fn split_key(text: &str) -> Result<Option<(String, &str)>, String> {
    if text.starts_with(['"', '\'']) {
        let (key, rest) = read_quoted(text)?;
        let Some(rest) = rest.trim_start().strip_prefix(':') else {
            return Ok(None);
        };
        if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
            return Ok(None);
        }
        return Ok(Some((key, rest)));
    }
    if text.starts_with(['[', '{']) {
        return Ok(None);
    }
    check_indicator(text)?;

    let mut prev_space = false;
    for (idx, ch) in text.char_indices() {
        if ch == '#' && prev_space {
            return Ok(None);
        }
        if ch == ':' {
            let rest = &text[idx + 1..];
            if rest.is_empty() || rest.starts_with([' ', '\t']) {
                let key = text[..idx].trim_end();
                if key.is_empty() {
                    return Ok(None);
                }
                return Ok(Some((key.to_string(), rest)));
            }
        }
        prev_space = ch == ' ' || ch == '\t';
    }
    Ok(None)
}

/// A single-line scalar, with any trailing comment
fn scalar_value(text: &str) -> Result<RawValue, String> {
    let text = text.trim_start();
    if text.starts_with(['"', '\'']) {
        let (value, rest) = read_quoted(text)?;
        let rest = rest.trim_start();
        if !rest.is_empty() && !rest.starts_with('#') {
            return Err(format!("unexpected text after quoted value: {:?}", rest));
        }
        return Ok(RawValue::Str(value));
    }
    plain_value(strip_comment(text).trim_end())
}

fn plain_value(plain: &str) -> Result<RawValue, String> {
    if plain.is_empty() {
        return Ok(RawValue::Other("null"));
    }
    if plain.starts_with('[') {
        return closed_flow(plain, ']', "sequence");
    }
    if plain.starts_with('{') {
        return closed_flow(plain, '}', "mapping");
    }
    check_indicator(plain)?;
    if plain.contains(": ") || plain.contains(":\t") || plain.ends_with(':') {
        return Err(format!("unexpected `:` in plain value {:?}", plain));
    }
    Ok(match core_schema_type(plain) {
        Some(found) => RawValue::Other(found),
        None => RawValue::Str(plain.to_string()),
    })
}

fn closed_flow(plain: &str, close: char, found: &'static str) -> Result<RawValue, String> {
    if plain.ends_with(close) {
        Ok(RawValue::Other(found))
    } else {
        Err("flow collections must close on the same line".to_string())
    }
}

/// Plain scalars the YAML parser would not start, or that need full YAML
fn check_indicator(text: &str) -> Result<(), String> {
    if let Some(ch) = text.chars().next() {
        if matches!(ch, '&' | '*' | '!' | '|' | '>' | '%' | '@' | '`' | ',' | ']' | '}') {
            return Err(format!("unsupported YAML syntax `{}`", ch));
        }
    }
    if matches!(text, "-" | "?") || text.starts_with("- ") || text.starts_with("? ") {
        return Err(format!("unsupported YAML syntax in {:?}", text));
    }
    Ok(())
}

/// Non-string type a plain scalar resolves to under the YAML core schema
fn core_schema_type(plain: &str) -> Option<&'static str> {
    match plain {
        "~" | "null" | "Null" | "NULL" => return Some("null"),
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => return Some("boolean"),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" | "-.inf" | "-.Inf" | "-.INF" | ".nan" | ".NaN"
        | ".NAN" => return Some("number"),
        _ => {}
    }
    is_number(plain).then_some("number")
}

fn is_number(plain: &str) -> bool {
    let unsigned = plain.strip_prefix(['+', '-']).unwrap_or(plain);
    if unsigned.starts_with(['+', '-']) {
        return false;
    }
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = unsigned.strip_prefix(prefix) {
            return !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
        }
    }
    // Leading zeros keep a digit string a string
    if unsigned.len() > 1 && unsigned.starts_with('0') && unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    // f64 parsing also takes `inf` and `nan` spelled out; those stay strings
    unsigned.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Decode a quoted scalar at the start of `text`; returns it and the rest
fn read_quoted(text: &str) -> Result<(String, &str), String> {
    let mut chars = text.char_indices().peekable();
    let Some((_, quote)) = chars.next() else {
        return Err("expected a quoted value".to_string());
    };

    let mut out = String::new();
    while let Some((idx, ch)) = chars.next() {
        match (quote, ch) {
            ('\'', '\'') => {
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                    out.push('\'');
                } else {
                    return Ok((out, &text[idx + 1..]));
                }
            }
            ('"', '"') => return Ok((out, &text[idx + 1..])),
            ('"', '\\') => {
                let Some((_, escape)) = chars.next() else {
                    break;
                };
                out.push(decode_escape(escape, &mut chars)?);
            }
            _ => out.push(ch),
        }
    }
    Err("quoted values must close on the same line".to_string())
}

fn decode_escape(escape: char, chars: &mut impl Iterator<Item = (usize, char)>) -> Result<char, String> {
    Ok(match escape {
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\x0b',
        'f' => '\x0c',
        'r' => '\r',
        'e' => '\x1b',
        ' ' => ' ',
        '"' => '"',
        '/' => '/',
        '\\' => '\\',
        'N' => '\u{85}',
        '_' => '\u{a0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        'x' => return hex_escape(chars, 2),
        'u' => return hex_escape(chars, 4),
        'U' => return hex_escape(chars, 8),
        other => return Err(format!("unsupported escape `\\{}`", other)),
    })
}

fn hex_escape(chars: &mut impl Iterator<Item = (usize, char)>, len: usize) -> Result<char, String> {
    let digits: String = chars.take(len).map(|(_, c)| c).collect();
    if digits.len() != len || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex escape {:?}", digits));
    }
    u32::from_str_radix(&digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid code point escape {:?}", digits))
}

/// `[a, "b, c"]` on one line; a non-string item makes the list invalid
fn parse_flow_list(text: &str) -> Result<RawModes, String> {
    let Some(mut rest) = text.strip_prefix('[') else {
        return Ok(RawModes::Invalid);
    };
    let mut items: Vec<Option<String>> = Vec::new();

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix(']') {
            let after = after.trim_start();
            if !after.is_empty() && !after.starts_with('#') {
                return Err(format!("unexpected text after flow list: {:?}", after));
            }
            break;
        }
        if rest.is_empty() {
            return Err("flow lists must close on the same line".to_string());
        }

        let (item, remainder) = flow_item(rest)?;
        items.push(item);
        rest = remainder.trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after;
        } else if !rest.starts_with(']') {
            return Err("flow lists must close on the same line".to_string());
        }
    }

    Ok(items
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .map(RawModes::List)
        .unwrap_or(RawModes::Invalid))
}

/// One flow list item and the text after it; `None` for a non-string item
fn flow_item(text: &str) -> Result<(Option<String>, &str), String> {
    if text.starts_with(['"', '\'']) {
        let (value, rest) = read_quoted(text)?;
        if rest.trim_start().starts_with(':') {
            // `"key": value` is a single-pair mapping
            let end = rest.find([',', ']']).unwrap_or(rest.len());
            return Ok((None, &rest[end..]));
        }
        return Ok((Some(value), rest));
    }
    if text.starts_with(['[', '{']) {
        return Ok((None, skip_nested(text)?));
    }

    let end = text.find([',', ']', '[', '{', '}']).unwrap_or(text.len());
    if matches!(text[end..].chars().next(), Some('[' | '{' | '}')) {
        return Err("unexpected bracket in flow list".to_string());
    }
    let plain = text[..end].trim_end();
    if plain.is_empty() {
        return Err("empty item in flow list".to_string());
    }
    if plain.contains(" #") {
        return Err("comments inside flow lists are not supported".to_string());
    }
    if plain.contains(": ") || plain.ends_with(':') {
        return Ok((None, &text[end..]));
    }
    let item = match plain_value(plain)? {
        RawValue::Str(mode) => Some(mode),
        RawValue::Other(_) => None,
    };
    Ok((item, &text[end..]))
}

fn skip_nested(text: &str) -> Result<&str, String> {
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices() {
        match ch {
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(&text[idx + 1..]);
                }
            }
            _ => {}
        }
    }
    Err("flow lists must close on the same line".to_string())
}

/// Cut a ` #` comment from a plain value
fn strip_comment(value: &str) -> &str {
    let mut prev_space = true;
    for (idx, ch) in value.char_indices() {
        if ch == '#' && prev_space {
            return &value[..idx];
        }
        prev_space = ch.is_whitespace();
    }
    value
}
