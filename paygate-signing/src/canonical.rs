//! Canonicalization of field sets into digest input
//!
//! Two policies are supported:
//!
//! - **Sorted**: fields ordered by name (byte order), emitted as
//!   `name=value` pairs, optionally form-escaped, followed by a
//!   provider-defined secret suffix.
//! - **Template**: a fixed placeholder template such as
//!   `{OrderNumber}{OrderAmount}{MerchantPassword}` where each placeholder is
//!   replaced by the raw field value.

use crate::{FieldSet, Result, SigningError};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left untouched by form escaping: alphanumerics and `-_.~`
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escaping applied to values under the sorted policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlEscape {
    /// Values are emitted verbatim
    #[default]
    None,
    /// application/x-www-form-urlencoded, space becomes `+`
    QueryPlus,
    /// Percent escaping, space becomes `%20`
    QueryPercent20,
}

impl UrlEscape {
    /// Escape a single value
    pub fn apply(self, value: &str) -> String {
        match self {
            UrlEscape::None => value.to_string(),
            UrlEscape::QueryPercent20 => utf8_percent_encode(value, FORM_VALUE).to_string(),
            // '+' itself is escaped as %2B, so only real spaces turn into '+'
            UrlEscape::QueryPlus => utf8_percent_encode(value, FORM_VALUE)
                .to_string()
                .replace("%20", "+"),
        }
    }
}

/// What follows the sorted pairs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SecretSuffix {
    /// Nothing is appended
    #[default]
    None,
    /// The secret is appended with no separator
    Bare,
    /// The secret is appended as one more pair, e.g. `&key=<secret>`
    KeyValue(String),
}

/// Sort-by-key canonicalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedPolicy {
    pair_separator: String,
    kv_separator: String,
    escape: UrlEscape,
    suffix: SecretSuffix,
    reserved: Option<String>,
}

impl Default for SortedPolicy {
    fn default() -> Self {
        Self {
            pair_separator: "&".to_string(),
            kv_separator: "=".to_string(),
            escape: UrlEscape::None,
            suffix: SecretSuffix::None,
            reserved: None,
        }
    }
}

impl SortedPolicy {
    /// `&`-joined `name=value` pairs with no escaping and no suffix
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pair and key/value separators
    pub fn separators(mut self, pair: impl Into<String>, kv: impl Into<String>) -> Self {
        self.pair_separator = pair.into();
        self.kv_separator = kv.into();
        self
    }

    /// Set how values are escaped
    pub fn escape(mut self, escape: UrlEscape) -> Self {
        self.escape = escape;
        self
    }

    /// Set what is appended after the last pair
    pub fn suffix(mut self, suffix: SecretSuffix) -> Self {
        self.suffix = suffix;
        self
    }

    /// Name of the field that carries the signature itself
    pub fn reserved(mut self, name: impl Into<String>) -> Self {
        self.reserved = Some(name.into());
        self
    }

    /// Name of the reserved signature field, if any
    pub fn reserved_name(&self) -> Option<&str> {
        self.reserved.as_deref()
    }

    fn canonicalize(&self, fields: &FieldSet, secret: &str) -> Result<String> {
        check_reserved(fields, self.reserved.as_deref())?;

        let mut out = fields
            .sorted()
            .into_iter()
            .map(|(name, value)| format!("{}{}{}", name, self.kv_separator, self.escape.apply(value)))
            .collect::<Vec<_>>()
            .join(&self.pair_separator);

        match &self.suffix {
            SecretSuffix::None => {}
            SecretSuffix::Bare => out.push_str(secret),
            SecretSuffix::KeyValue(name) => {
                if !out.is_empty() {
                    out.push_str(&self.pair_separator);
                }
                out.push_str(name);
                out.push_str(&self.kv_separator);
                out.push_str(secret);
            }
        }

        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
    Secret,
}

/// Fixed placeholder template
///
/// Placeholders are written `{Name}` or `[Name]`. Text outside placeholders
/// is copied literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
    secret: Option<String>,
    uppercase: bool,
    reserved: Option<String>,
}

impl Template {
    /// Parse a template string
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices();

        while let Some((pos, c)) = chars.next() {
            let close = match c {
                '{' => '}',
                '[' => ']',
                _ => {
                    literal.push(c);
                    continue;
                }
            };

            let mut name = String::new();
            let mut closed = false;
            for (_, n) in chars.by_ref() {
                if n == close {
                    closed = true;
                    break;
                }
                name.push(n);
            }
            if !closed {
                return Err(SigningError::Canonicalization(format!(
                    "unterminated placeholder at {} in template",
                    pos
                )));
            }
            if name.is_empty() {
                return Err(SigningError::Canonicalization(format!(
                    "empty placeholder at {} in template",
                    pos
                )));
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Field(name));
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            segments,
            secret: None,
            uppercase: false,
            reserved: None,
        })
    }

    /// Treat the placeholder `name` as the shared secret
    pub fn with_secret(mut self, name: &str) -> Self {
        for segment in &mut self.segments {
            if matches!(segment, Segment::Field(n) if n == name) {
                *segment = Segment::Secret;
            }
        }
        self.secret = Some(name.to_string());
        self
    }

    /// Upper-case the whole canonical string
    pub fn uppercase(mut self) -> Self {
        self.uppercase = true;
        self
    }

    /// Name of the field that carries the signature itself
    pub fn reserved(mut self, name: impl Into<String>) -> Self {
        self.reserved = Some(name.into());
        self
    }

    /// Name of the reserved signature field, if any
    pub fn reserved_name(&self) -> Option<&str> {
        self.reserved.as_deref()
    }

    /// Field names the template expects, in template order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            _ => None,
        })
    }

    fn canonicalize(&self, fields: &FieldSet, secret: &str) -> Result<String> {
        check_reserved(fields, self.reserved.as_deref())?;
        check_reserved(fields, self.secret.as_deref())?;

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Secret => out.push_str(secret),
                Segment::Field(name) => {
                    let value = fields.get(name).ok_or_else(|| {
                        SigningError::Canonicalization(format!("missing template field: {}", name))
                    })?;
                    out.push_str(value);
                }
            }
        }

        if self.uppercase {
            out = out.to_uppercase();
        }
        Ok(out)
    }
}

/// How a field set becomes a canonical string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizationPolicy {
    Sorted(SortedPolicy),
    Template(Template),
}

impl CanonicalizationPolicy {
    /// Name of the reserved signature field, if any
    pub fn reserved_name(&self) -> Option<&str> {
        match self {
            CanonicalizationPolicy::Sorted(p) => p.reserved_name(),
            CanonicalizationPolicy::Template(t) => t.reserved_name(),
        }
    }
}

impl From<SortedPolicy> for CanonicalizationPolicy {
    fn from(policy: SortedPolicy) -> Self {
        CanonicalizationPolicy::Sorted(policy)
    }
}

impl From<Template> for CanonicalizationPolicy {
    fn from(template: Template) -> Self {
        CanonicalizationPolicy::Template(template)
    }
}

/// Turn a field set into the canonical digest input
pub fn canonicalize(fields: &FieldSet, policy: &CanonicalizationPolicy, secret: &str) -> Result<String> {
    match policy {
        CanonicalizationPolicy::Sorted(p) => p.canonicalize(fields, secret),
        CanonicalizationPolicy::Template(t) => t.canonicalize(fields, secret),
    }
}

fn check_reserved(fields: &FieldSet, reserved: Option<&str>) -> Result<()> {
    match reserved {
        Some(name) if fields.contains(name) => Err(SigningError::Canonicalization(format!(
            "field name collides with reserved name: {}",
            name
        ))),
        _ => Ok(()),
    }
}
