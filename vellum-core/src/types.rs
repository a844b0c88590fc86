//! Domain types for the Vellum publish pipeline.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::frontmatter::BlockStyle;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed document slug.
///
/// Slugs are `/`-separated relative identifiers ("guides/getting-started"),
/// never filesystem paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(pub String);

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Slug {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Slug {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Slug {
    /// Derive a slug from a content-root-relative path.
    ///
    /// `override_slug` (a `slug` frontmatter field) wins outright. Otherwise:
    /// the `.md`/`.mdx` extension is stripped, a trailing `/index` segment is
    /// dropped, and a leading `YYYY-MM-DD-` date prefix on the final segment
    /// is removed.
    pub fn derive(rel_path: &Path, override_slug: Option<&str>) -> Slug {
        if let Some(s) = override_slug {
            let s = s.trim();
            if !s.is_empty() {
                return Slug(s.to_owned());
            }
        }

        let mut segments: Vec<String> = rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        if let Some(last) = segments.last_mut() {
            for ext in [".mdx", ".md"] {
                if let Some(stripped) = last.strip_suffix(ext) {
                    *last = stripped.to_owned();
                    break;
                }
            }
        }

        // `guides/index` names `guides`; a bare root `index` stays `index`.
        if segments.len() > 1 && segments.last().map(String::as_str) == Some("index") {
            segments.pop();
        }

        if let Some(last) = segments.last_mut() {
            if let Some(stripped) = strip_date_prefix(last) {
                *last = stripped;
            }
        }

        Slug(segments.join("/"))
    }
}

/// `2024-01-15-title` → `title`. Returns `None` when no date prefix is present
/// or stripping would leave nothing.
fn strip_date_prefix(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    if bytes.len() < 12 {
        return None;
    }
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    if digits(0..4)
        && bytes[4] == b'-'
        && digits(5..7)
        && bytes[7] == b'-'
        && digits(8..10)
        && bytes[10] == b'-'
    {
        let rest = &segment[11..];
        if !rest.is_empty() {
            return Some(rest.to_owned());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Record identity
// ---------------------------------------------------------------------------

/// An `at://authority/collection/rkey` record identity.
///
/// Parsing is strict: exactly three non-empty segments after the scheme,
/// anything else fails explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub authority: String,
    pub collection: String,
    pub rkey: String,
}

impl RecordRef {
    /// The same record key under a different collection — used to address the
    /// note record paired 1:1 with a document record.
    pub fn with_collection(&self, collection: &str) -> RecordRef {
        RecordRef {
            authority: self.authority.clone(),
            collection: collection.to_owned(),
            rkey: self.rkey.clone(),
        }
    }
}

impl FromStr for RecordRef {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IdentityError::Malformed {
            input: s.to_owned(),
        };
        let rest = s.strip_prefix("at://").ok_or_else(malformed)?;
        let mut segments = rest.split('/');
        let authority = segments.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;
        let collection = segments.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;
        let rkey = segments.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;
        if segments.next().is_some() {
            return Err(malformed());
        }
        Ok(RecordRef {
            authority: authority.to_owned(),
            collection: collection.to_owned(),
            rkey: rkey.to_owned(),
        })
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at://{}/{}/{}", self.authority, self.collection, self.rkey)
    }
}

// ---------------------------------------------------------------------------
// Frontmatter model
// ---------------------------------------------------------------------------

/// A raw frontmatter field value, before any mapping or defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    Bool(bool),
    List(Vec<String>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

/// Every field of a metadata block keyed by its source name, untouched by the
/// canonical mapping. Ordered so serialization and tests are deterministic.
pub type RawFields = BTreeMap<String, Value>;

/// Normalized document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrontMatter {
    /// Falls back to the first `# ` heading in the body, then `""`.
    pub title: String,
    pub description: Option<String>,
    /// ISO date string; defaults to the current date when absent.
    pub date: String,
    /// Cover image path, relative to the document or the content root.
    pub cover: Option<String>,
    pub tags: Vec<String>,
    pub draft: bool,
    /// Remote identity reference, verbatim. Never renamed or dropped —
    /// the publish engine rewrites this field after a create.
    pub at_uri: Option<String>,
}

/// Parser output: normalized metadata, the raw pre-mapping fields, the body,
/// and which delimiter family (if any) the block was written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub front: FrontMatter,
    pub raw_fields: RawFields,
    pub body: String,
    pub style: Option<BlockStyle>,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One local content file, constructed fresh on every scan.
///
/// Immutable once parsed, except that the publish engine sets `front.at_uri`
/// (and rewrites `raw` on disk) after a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the content root.
    pub rel_path: PathBuf,
    pub slug: Slug,
    pub front: FrontMatter,
    pub raw_fields: RawFields,
    /// Body text after the metadata block.
    pub body: String,
    /// Full file contents, unmodified.
    pub raw: String,
    pub style: Option<BlockStyle>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
