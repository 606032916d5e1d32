//! Text templates for rendering log entries.
//!
//! Template syntax:
//! - `{name}` - simple token, replaced by an entry field (see [`SIMPLE_TOKENS`])
//! - `{createTime}` / `{createTime(FORMAT)}` - creation time, `FORMAT` in
//!   chrono `strftime` syntax
//! - `{extendedProperties(FRAGMENT)}` - extended properties. `FRAGMENT` holds
//!   one `{value}` placeholder and one key placeholder. A key placeholder named
//!   `key` repeats the fragment for every property; any other name renders the
//!   fragment once for that property. A `?` right after the name (`{name?}`) or
//!   right after the placeholder (`{name}?`) drops the key label. Placeholders
//!   named like simple tokens are expanded as tokens, unless one of them is the
//!   only key candidate (`{extendedProperties({level}={value})}`).
//!
//! Formatting never fails: anything that does not parse as a token is copied to
//! the output unchanged. Substituted values are inserted verbatim and are not
//! scanned for further tokens.

use crate::domain::entry::LogEntry;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::fmt::Write;

/// Value rendered for a keyed property that the entry does not carry.
pub const NOT_DEFINED: &str = "-Not defined-";

/// Full date/time pattern used by `{createTime}` without an explicit format.
pub const DEFAULT_TIME_FORMAT: &str = "%A, %d %B %Y %H:%M:%S";

/// Names accepted as simple `{name}` tokens.
pub const SIMPLE_TOKENS: &[&str] = &[
    "message",
    "applicationId",
    "applicationUserId",
    "environment",
    "machineName",
    "level",
    "uniqueId",
    "exceptionType",
    "exceptionDetails",
    "exceptionContext",
    "exception",
    "throttlingKey",
    "newLine",
];

const TIME_TOKEN: &str = "{createTime";
const PROPERTIES_TOKEN: &str = "{extendedProperties(";
const ARGUMENT_END: &str = ")}";
const VALUE_PLACEHOLDER: &str = "value";
const REPEAT_KEY: &str = "key";

fn simple_token<'a>(name: &str, entry: &'a LogEntry) -> Option<Cow<'a, str>> {
    let value = match name {
        "message" => Cow::Borrowed(entry.message.as_str()),
        "applicationId" => Cow::Borrowed(entry.application_id.as_str()),
        "applicationUserId" => Cow::Borrowed(entry.application_user_id.as_str()),
        "environment" => Cow::Borrowed(entry.environment.as_str()),
        "machineName" => Cow::Borrowed(entry.machine_name.as_str()),
        "level" => Cow::Borrowed(entry.level.as_str()),
        "uniqueId" => Cow::Borrowed(entry.unique_id.as_str()),
        "exceptionType" => Cow::Borrowed(entry.exception_type.as_str()),
        "exceptionDetails" => Cow::Borrowed(entry.exception_details.as_str()),
        "exceptionContext" => Cow::Borrowed(entry.exception_context.as_str()),
        "exception" => {
            let parts: Vec<&str> = [
                entry.exception_type.as_str(),
                entry.exception_details.as_str(),
            ]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();
            Cow::Owned(parts.join("\n"))
        }
        "throttlingKey" => Cow::Owned(entry.throttling_key().to_string()),
        "newLine" => Cow::Borrowed("\n"),
        _ => return None,
    };
    Some(value)
}

fn render_time(time: &DateTime<Utc>, format: &str) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }

    let mut rendered = String::new();
    write!(rendered, "{}", time.format_with_items(items.iter())).ok()?;
    Some(rendered)
}

/// One part of a parsed extended-properties fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece<'t> {
    Text(&'t str),
    Key,
    Value,
}

/// A parsed `{extendedProperties(...)}` fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fragment<'t> {
    pieces: Vec<Piece<'t>>,
    key_name: &'t str,
    hide_key: bool,
}

impl<'t> Fragment<'t> {
    /// Parse a fragment, returning `None` unless it holds exactly one value
    /// placeholder and exactly one key placeholder.
    ///
    /// A placeholder named like a simple token (`{level}`, `{newLine}`, ...)
    /// is expanded as that token, unless it is the only candidate for the key.
    fn parse(fragment: &'t str) -> Option<Self> {
        // (start, end) of the value placeholder and of every key candidate,
        // end exclusive
        let mut values: Vec<(usize, usize)> = Vec::new();
        let mut named: Vec<(usize, usize)> = Vec::new();
        let mut token_named: Vec<(usize, usize)> = Vec::new();

        let mut cursor = 0;
        while let Some(offset) = fragment[cursor..].find('{') {
            let start = cursor + offset;
            let Some(close) = fragment[start..].find('}') else {
                break;
            };
            let end = start + close + 1;
            let inner = &fragment[start + 1..end - 1];

            if inner.contains('{') {
                cursor = start + 1;
                continue;
            }

            if inner == VALUE_PLACEHOLDER {
                values.push((start, end));
            } else if is_token_name(inner) {
                token_named.push((start, end));
            } else {
                named.push((start, end));
            }
            cursor = end;
        }

        if values.len() != 1 {
            return None;
        }
        let (key_start, key_end) = match (named.as_slice(), token_named.as_slice()) {
            ([only], _) | ([], [only]) => *only,
            _ => return None,
        };

        let inner = &fragment[key_start + 1..key_end - 1];
        let (key_name, inline_hide) = match inner.strip_suffix('?') {
            Some(name) => (name, true),
            None => (inner, false),
        };
        if key_name.is_empty() {
            return None;
        }
        let trailing_hide = !inline_hide && fragment[key_end..].starts_with('?');
        let key_end = if trailing_hide { key_end + 1 } else { key_end };

        let mut placeholders = [
            (values[0].0, values[0].1, Piece::Value),
            (key_start, key_end, Piece::Key),
        ];
        placeholders.sort_by_key(|(start, _, _)| *start);

        let mut pieces = Vec::with_capacity(5);
        let mut last = 0;
        for (start, end, piece) in placeholders {
            if start > last {
                pieces.push(Piece::Text(&fragment[last..start]));
            }
            pieces.push(piece);
            last = end;
        }
        if last < fragment.len() {
            pieces.push(Piece::Text(&fragment[last..]));
        }

        Some(Self {
            pieces,
            key_name,
            hide_key: inline_hide || trailing_hide,
        })
    }

    fn repeats(&self) -> bool {
        self.key_name == REPEAT_KEY
    }
}

fn is_token_name(inner: &str) -> bool {
    SIMPLE_TOKENS.contains(&inner) || inner == "createTime" || inner.starts_with("createTime(")
}

/// Bytes of `candidate` to copy verbatim after it failed to expand.
///
/// A failed argument token is skipped whole, through its `)}`, so nothing
/// inside it gets expanded.
fn literal_len(candidate: &str) -> usize {
    let argument = candidate
        .strip_prefix(PROPERTIES_TOKEN)
        .map(|after| (PROPERTIES_TOKEN.len(), after))
        .or_else(|| {
            candidate
                .strip_prefix(TIME_TOKEN)
                .and_then(|after| after.strip_prefix('('))
                .map(|after| (TIME_TOKEN.len() + 1, after))
        });

    match argument {
        Some((prefix, after)) => after
            .find(ARGUMENT_END)
            .map_or(1, |end| prefix + end + ARGUMENT_END.len()),
        None => 1,
    }
}

/// Renders log entries through a text template.
///
/// # Example
/// ```
/// use log_dispatch::{Level, LogEntry, TemplateFormatter};
///
/// let formatter = TemplateFormatter::new("[{level}] {message} {extendedProperties({key}={value};)}");
/// let entry = LogEntry::new(Level::Warning, "disk almost full")
///     .with_property("mount", "/var")
///     .with_property("free", "3%");
///
/// assert_eq!(formatter.format(&entry), "[Warning] disk almost full mount=/var;free=3%;");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFormatter {
    template: String,
    looks_html_encoded: bool,
    repeat_separator: String,
}

impl TemplateFormatter {
    /// Create a formatter for a template.
    pub fn new(template: impl Into<String>) -> Self {
        let mut formatter = Self {
            template: String::new(),
            looks_html_encoded: false,
            repeat_separator: String::new(),
        };
        formatter.set_template(template);
        formatter
    }

    /// Set the separator placed between repeated extended-property renderings.
    ///
    /// Default: empty, so a fragment carries its own delimiter.
    pub fn with_repeat_separator(mut self, separator: impl Into<String>) -> Self {
        self.repeat_separator = separator.into();
        self
    }

    /// Replace the template.
    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = template.into();
        self.looks_html_encoded =
            self.template.contains("&lt;") || self.template.contains("&gt;");
    }

    /// The template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether the template contains HTML-escaped angle brackets.
    ///
    /// Informational only: substituted values are never HTML-escaped.
    pub fn looks_html_encoded(&self) -> bool {
        self.looks_html_encoded
    }

    /// The separator between repeated extended-property renderings.
    pub fn repeat_separator(&self) -> &str {
        &self.repeat_separator
    }

    /// Render an entry.
    pub fn format(&self, entry: &LogEntry) -> String {
        let mut out = String::with_capacity(self.template.len() + entry.message.len());
        self.render_into(&self.template, entry, &mut out);
        out
    }

    fn render_into(&self, text: &str, entry: &LogEntry, out: &mut String) {
        let mut rest = text;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let candidate = &rest[open..];
            match self.expand_token(candidate, entry, out) {
                Some(consumed) => rest = &candidate[consumed..],
                None => {
                    let literal = literal_len(candidate);
                    out.push_str(&candidate[..literal]);
                    rest = &candidate[literal..];
                }
            }
        }
        out.push_str(rest);
    }

    /// Expand the token at the start of `candidate` into `out`, returning the
    /// number of bytes consumed, or `None` (with `out` untouched) when
    /// `candidate` does not start with a valid token.
    fn expand_token(&self, candidate: &str, entry: &LogEntry, out: &mut String) -> Option<usize> {
        if let Some(after) = candidate.strip_prefix(PROPERTIES_TOKEN) {
            let end = after.find(ARGUMENT_END)?;
            let fragment = Fragment::parse(&after[..end])?;
            self.render_properties(&fragment, entry, out);
            return Some(PROPERTIES_TOKEN.len() + end + ARGUMENT_END.len());
        }

        if let Some(after) = candidate.strip_prefix(TIME_TOKEN) {
            if after.starts_with('}') {
                out.push_str(&render_time(&entry.create_time, DEFAULT_TIME_FORMAT)?);
                return Some(TIME_TOKEN.len() + 1);
            }
            if let Some(argument) = after.strip_prefix('(') {
                let end = argument.find(ARGUMENT_END)?;
                out.push_str(&render_time(&entry.create_time, &argument[..end])?);
                return Some(TIME_TOKEN.len() + 1 + end + ARGUMENT_END.len());
            }
        }

        let close = candidate.find('}')?;
        let value = simple_token(&candidate[1..close], entry)?;
        out.push_str(&value);
        Some(close + 1)
    }

    fn render_properties(&self, fragment: &Fragment<'_>, entry: &LogEntry, out: &mut String) {
        if fragment.repeats() {
            for (index, (key, value)) in entry.extended_properties.iter().enumerate() {
                if index > 0 {
                    out.push_str(&self.repeat_separator);
                }
                self.render_fragment(fragment, key, value, entry, out);
            }
        } else {
            let value = entry
                .extended_properties
                .get(fragment.key_name)
                .unwrap_or(NOT_DEFINED);
            self.render_fragment(fragment, fragment.key_name, value, entry, out);
        }
    }

    fn render_fragment(
        &self,
        fragment: &Fragment<'_>,
        key: &str,
        value: &str,
        entry: &LogEntry,
        out: &mut String,
    ) {
        for piece in &fragment.pieces {
            match piece {
                Piece::Text(text) => self.render_into(text, entry, out),
                Piece::Key if fragment.hide_key => {}
                Piece::Key => out.push_str(key),
                Piece::Value => out.push_str(value),
            }
        }
    }
}
