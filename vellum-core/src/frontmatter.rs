//! Frontmatter parsing and rewriting.
//!
//! Documents open with one of three metadata-block delimiter families, each a
//! three-character marker alone on its own line:
//!
//! ```text
//! ---            +++              ;;;
//! title: Hi      title = "Hi"     title: Hi
//! ---            +++              ;;;
//! ```
//!
//! Parsing is a line-oriented state machine (block-open, assignment, list
//! item, multiline continuation, block-close) — deliberately not a YAML/TOML
//! library, so the fallback and quoting semantics stay exact.
//!
//! A document with no recognized marker on its very first line has no
//! metadata block: the whole input is body, the title derives from the first
//! `# ` heading, and every other field defaults. That is a silent fallback,
//! not an error. An *opened* block that is malformed or never closed fails
//! explicitly.

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::types::{FrontMatter, ParsedDocument, RawFields, Value};

// ---------------------------------------------------------------------------
// Delimiter families
// ---------------------------------------------------------------------------

/// Which delimiter family a metadata block was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// `---` ... `---`, colon assignments.
    Dashes,
    /// `+++` ... `+++`, equals assignments.
    Plusses,
    /// `;;;` ... `;;;`, colon assignments.
    Semicolons,
}

impl BlockStyle {
    pub const fn marker(self) -> &'static str {
        match self {
            BlockStyle::Dashes => "---",
            BlockStyle::Plusses => "+++",
            BlockStyle::Semicolons => ";;;",
        }
    }

    const fn separator(self) -> char {
        match self {
            BlockStyle::Plusses => '=',
            _ => ':',
        }
    }

    /// Detect a block opening on the very first line of `raw`.
    fn detect(raw: &str) -> Option<BlockStyle> {
        let first = raw.split('\n').next().unwrap_or("");
        let first = first.strip_suffix('\r').unwrap_or(first);
        match first.trim_end() {
            "---" => Some(BlockStyle::Dashes),
            "+++" => Some(BlockStyle::Plusses),
            ";;;" => Some(BlockStyle::Semicolons),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Field-name mapping
// ---------------------------------------------------------------------------

/// Ordered lookup configuration for field resolution.
///
/// `sources` maps a canonical field name to the source field name carrying it
/// in this site's documents; when the mapped name is absent (or unmapped) the
/// canonical name itself is used. `date_fallbacks` is the ordered list of
/// alternate names tried for the publish date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub sources: BTreeMap<String, String>,
    pub date_fallbacks: Vec<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        FieldMap {
            sources: BTreeMap::new(),
            date_fallbacks: default_date_fallbacks(),
        }
    }
}

/// Built-in alternate names for the publish date, in priority order.
pub fn default_date_fallbacks() -> Vec<String> {
    ["published", "publishDate", "pubDate", "created"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// The frontmatter field carrying the remote identity. Never remapped: later
/// publish phases rewrite it in place, so a rename would orphan the record.
pub const IDENTITY_FIELD: &str = "atUri";

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// Parse raw document text into normalized metadata, raw fields, and body.
pub fn parse(raw: &str, fields: &FieldMap) -> Result<ParsedDocument, ParseError> {
    let Some(style) = BlockStyle::detect(raw) else {
        let raw_fields = RawFields::new();
        let front = normalize(&raw_fields, raw, fields);
        return Ok(ParsedDocument {
            front,
            raw_fields,
            body: raw.to_owned(),
            style: None,
        });
    };

    let (block_lines, body) = split_block(raw, style)?;
    let raw_fields = parse_fields(&block_lines, style)?;
    let front = normalize(&raw_fields, &body, fields);
    Ok(ParsedDocument {
        front,
        raw_fields,
        body,
        style: Some(style),
    })
}

/// Split `raw` into the block's interior lines (with 1-based line numbers)
/// and the body after the closing marker.
fn split_block(raw: &str, style: BlockStyle) -> Result<(Vec<(usize, String)>, String), ParseError> {
    let marker = style.marker();
    let mut pos = match raw.find('\n') {
        Some(i) => i + 1,
        None => return Err(ParseError::Unterminated { marker }),
    };

    let mut lines = Vec::new();
    let mut line_no = 2usize;
    while pos < raw.len() {
        let rest = &raw[pos..];
        let (line, next) = match rest.find('\n') {
            Some(i) => (&rest[..i], Some(pos + i + 1)),
            None => (rest, None),
        };
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.trim_end() == marker {
            let body = match next {
                Some(n) => raw[n..].to_owned(),
                None => String::new(),
            };
            return Ok((lines, body));
        }

        lines.push((line_no, line.to_owned()));
        line_no += 1;
        match next {
            Some(n) => pos = n,
            None => break,
        }
    }
    Err(ParseError::Unterminated { marker })
}

/// In-flight multi-line state while walking block lines.
enum Pending {
    None,
    /// A bare `key:` line — becomes a list if indented `- item` lines follow,
    /// an empty scalar otherwise.
    List { key: String, items: Vec<String> },
    /// A `key: |` (literal) or `key: >` (folded) multi-line string.
    Literal {
        key: String,
        lines: Vec<String>,
        folded: bool,
    },
}

fn parse_fields(
    block_lines: &[(usize, String)],
    style: BlockStyle,
) -> Result<RawFields, ParseError> {
    let sep = style.separator();
    let mut map = RawFields::new();
    let mut pending = Pending::None;

    for (line_no, line) in block_lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if let Pending::Literal { lines, .. } = &mut pending {
                lines.push(String::new());
            }
            continue;
        }

        let indented = line.starts_with(' ') || line.starts_with('\t');
        if indented {
            match &mut pending {
                Pending::List { items, .. } if trimmed.starts_with('-') => {
                    let item = trimmed[1..].trim();
                    items.push(strip_quotes(item).to_owned());
                }
                Pending::Literal { lines, .. } => {
                    lines.push(trimmed.to_owned());
                }
                _ => {
                    return Err(ParseError::MalformedLine {
                        line: *line_no,
                        text: line.clone(),
                    })
                }
            }
            continue;
        }

        commit(&mut pending, &mut map);

        let Some(idx) = line.find(sep) else {
            return Err(ParseError::MalformedLine {
                line: *line_no,
                text: line.clone(),
            });
        };
        let key = line[..idx].trim();
        if key.is_empty() {
            return Err(ParseError::MalformedLine {
                line: *line_no,
                text: line.clone(),
            });
        }
        let value = line[idx + 1..].trim();

        match value {
            "" => {
                pending = Pending::List {
                    key: key.to_owned(),
                    items: Vec::new(),
                };
            }
            "|" => {
                pending = Pending::Literal {
                    key: key.to_owned(),
                    lines: Vec::new(),
                    folded: false,
                };
            }
            ">" => {
                pending = Pending::Literal {
                    key: key.to_owned(),
                    lines: Vec::new(),
                    folded: true,
                };
            }
            v if v.starts_with('[') && v.ends_with(']') => {
                let items = v[1..v.len() - 1]
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| strip_quotes(item).to_owned())
                    .collect();
                map.insert(key.to_owned(), Value::List(items));
            }
            v => {
                map.insert(key.to_owned(), scalar_value(v));
            }
        }
    }

    commit(&mut pending, &mut map);
    Ok(map)
}

fn commit(pending: &mut Pending, map: &mut RawFields) {
    match std::mem::replace(pending, Pending::None) {
        Pending::None => {}
        Pending::List { key, items } => {
            let value = if items.is_empty() {
                Value::Scalar(String::new())
            } else {
                Value::List(items)
            };
            map.insert(key, value);
        }
        Pending::Literal { key, mut lines, folded } => {
            while lines.last().is_some_and(String::is_empty) {
                lines.pop();
            }
            let joined = if folded {
                lines.join(" ")
            } else {
                lines.join("\n")
            };
            map.insert(key, Value::Scalar(joined));
        }
    }
}

/// Unquoted `true`/`false` become booleans; everything else is a string with
/// one layer of surrounding matching quotes stripped.
fn scalar_value(v: &str) -> Value {
    match v {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Scalar(strip_quotes(v).to_owned()),
    }
}

fn strip_quotes(v: &str) -> &str {
    if v.len() >= 2 {
        let bytes = v.as_bytes();
        let (first, last) = (bytes[0], bytes[v.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &v[1..v.len() - 1];
        }
    }
    v
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn normalize(raw_fields: &RawFields, body: &str, fields: &FieldMap) -> FrontMatter {
    let title = resolve(raw_fields, fields, "title")
        .and_then(value_text)
        .or_else(|| first_heading(body))
        .unwrap_or_default();

    let date = resolve(raw_fields, fields, "date")
        .and_then(value_text)
        .or_else(|| {
            fields
                .date_fallbacks
                .iter()
                .find_map(|name| raw_fields.get(name).and_then(value_text))
        })
        .unwrap_or_else(today);

    let tags = match resolve(raw_fields, fields, "tags") {
        Some(Value::List(items)) => items.clone(),
        Some(Value::Scalar(s)) if !s.is_empty() => {
            s.split(',').map(str::trim).map(str::to_owned).collect()
        }
        _ => Vec::new(),
    };

    let draft = match resolve(raw_fields, fields, "draft") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Scalar(s)) => s == "true",
        _ => false,
    };

    FrontMatter {
        title,
        description: resolve(raw_fields, fields, "description").and_then(value_text),
        date,
        cover: resolve(raw_fields, fields, "cover").and_then(value_text),
        tags,
        draft,
        // Verbatim, straight off the raw map — the identity field is exempt
        // from mapping.
        at_uri: raw_fields.get(IDENTITY_FIELD).and_then(value_text),
    }
}

/// Mapped source field first (when present), then the canonical name itself.
fn resolve<'a>(raw: &'a RawFields, fields: &FieldMap, canonical: &str) -> Option<&'a Value> {
    if let Some(source) = fields.sources.get(canonical) {
        if let Some(v) = raw.get(source) {
            return Some(v);
        }
    }
    raw.get(canonical)
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::Scalar(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn first_heading(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        line.strip_prefix("# ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
    })
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

// ---------------------------------------------------------------------------
// Identity rewrite
// ---------------------------------------------------------------------------

/// Rewrite the remote-identity field into `raw`, preserving every other byte.
///
/// With a metadata block: the existing `atUri` line is replaced, or a fresh
/// one is inserted immediately before the closing marker. Without one: a
/// minimal `---` block is synthesized and prepended. The input is returned
/// unchanged only in the (unreachable for parsed documents) case of an
/// unterminated block.
pub fn set_identity(raw: &str, style: Option<BlockStyle>, uri: &str) -> String {
    let Some(style) = style else {
        return format!("---\n{IDENTITY_FIELD}: {uri}\n---\n{raw}");
    };

    let marker = style.marker();
    let assign = match style {
        BlockStyle::Plusses => format!("{IDENTITY_FIELD} = \"{uri}\"\n"),
        _ => format!("{IDENTITY_FIELD}: {uri}\n"),
    };

    let mut out = String::with_capacity(raw.len() + assign.len());
    let mut lines = raw.split_inclusive('\n');

    // Opening marker line passes through untouched.
    match lines.next() {
        Some(first) => out.push_str(first),
        None => return raw.to_owned(),
    }

    let mut closed = false;
    let mut replaced = false;
    for line in lines {
        if closed {
            out.push_str(line);
            continue;
        }
        let content = line.strip_suffix('\n').unwrap_or(line);
        let content = content.strip_suffix('\r').unwrap_or(content);
        if content.trim_end() == marker {
            if !replaced {
                out.push_str(&assign);
            }
            closed = true;
            out.push_str(line);
            continue;
        }
        let key = content
            .split(style.separator())
            .next()
            .unwrap_or("")
            .trim();
        let indented = content.starts_with(' ') || content.starts_with('\t');
        if !replaced && !indented && key == IDENTITY_FIELD {
            out.push_str(&assign);
            replaced = true;
        } else {
            out.push_str(line);
        }
    }

    if closed {
        out
    } else {
        raw.to_owned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
