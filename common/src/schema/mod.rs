pub mod coerce;

use serde::{de::DeserializeOwned, Serialize};

use crate::{media::MediaSlot, repository::Entity};

pub use coerce::{coerce, Mode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    /// Trimmed and lower-cased.
    Email,
    /// Trimmed and upper-cased.
    Upper,
    Integer,
    Number,
    Boolean,
    Date,
    /// Array, or a comma separated string.
    List,
    /// Dealership reference.
    Reference,
    Choice(&'static [&'static str]),
    /// Like `Choice`, but only writable through the status endpoint.
    Status(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pattern {
    Phone,
    StrictEmail,
    LooseEmail,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    Min(f64),
    Max(f64),
    /// Upper bound relative to the current year.
    YearsAhead(i32),
    MinLength(usize),
    MaxLength(usize),
    Matches(Pattern),
    NotPast,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub rules: &'static [Rule],
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            rules: &[],
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn rules(self, rules: &'static [Rule]) -> Self {
        Self { rules, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmptyResult {
    Allow,
    NotFound(&'static str),
    NotFoundBeyondFirstPage,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listing {
    pub sort: &'static [(&'static str, i32)],
    /// `None` lists everything unless the caller asks for a limit.
    pub page_size: Option<u64>,
    pub empty: EmptyResult,
}

impl Listing {
    pub const DEFAULT: Listing = Listing {
        sort: &[("createdAt", -1)],
        page_size: Some(10),
        empty: EmptyResult::Allow,
    };
}

pub trait Schema:
    Entity + Serialize + DeserializeOwned + Clone + Unpin + Send + Sync + 'static
{
    const LABEL: &'static str;
    const COLLECTION: &'static str;
    const FIELDS: &'static [Field];
    const MEDIA: &'static [MediaSlot] = &[];
    const UNIQUE: &'static [&'static str] = &[];
    const LISTING: Listing = Listing::DEFAULT;
    /// Accepts arbitrary keys instead of the declared fields.
    const FREE_FORM: bool = false;

    fn field(name: &str) -> Option<&'static Field> {
        Self::FIELDS.iter().find(|field| field.name == name)
    }

    fn reference() -> Option<&'static Field> {
        Self::FIELDS
            .iter()
            .find(|field| field.kind == FieldKind::Reference)
    }

    fn status() -> Option<(&'static str, &'static [&'static str])> {
        Self::FIELDS.iter().find_map(|field| match field.kind {
            FieldKind::Status(values) => Some((field.name, values)),
            _ => None,
        })
    }
}
