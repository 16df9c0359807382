//! Browser-submitted forms and form-encoded callbacks

use paygate_signing::FieldSet;
use url::form_urlencoded;

/// A form the caller renders so the customer's browser posts it to the
/// provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentForm {
    /// HTTP method, always `POST` for the current providers
    pub method: String,
    /// Absolute URL the form submits to
    pub action: String,
    /// Form fields in submission order
    pub fields: FieldSet,
}

impl PaymentForm {
    pub fn post(action: impl Into<String>, fields: FieldSet) -> Self {
        Self {
            method: "POST".to_string(),
            action: action.into(),
            fields,
        }
    }

    /// Form fields as an `application/x-www-form-urlencoded` body
    pub fn encoded_fields(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.fields.iter() {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }
}

/// Parse a query string or form body into fields; the first of repeated
/// names wins
pub fn parse_form(input: &str) -> FieldSet {
    let input = input.strip_prefix('?').unwrap_or(input);
    let mut fields = FieldSet::new();
    for (name, value) in form_urlencoded::parse(input.as_bytes()) {
        if !fields.contains(&name) {
            fields.insert(name.into_owned(), value.into_owned());
        }
    }
    fields
}

/// Fetch a field, treating a missing field as empty like most form decoders
pub(crate) fn value(fields: &FieldSet, name: &str) -> String {
    fields.get(name).unwrap_or_default().to_string()
}
