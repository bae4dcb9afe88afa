//! Field-level validation shared by the form drafts

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use validator::{ValidationError, ValidationErrors};

/// Validation failures keyed by field path (`customerName`, `items[0].quantity`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self { Self::default() }

    /// Records the first failure for a field; later ones are dropped.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> { self.0.get(field).map(String::as_str) }
    pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }

    /// Folds `validator` derive output in under an optional path prefix.
    pub fn absorb(&mut self, prefix: &str, errors: &ValidationErrors) {
        for (field, errs) in errors.field_errors() {
            if let Some(err) = errs.first() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                self.add(format!("{}{}", prefix, camel_case(field)), message);
            }
        }
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// `validator` reports Rust field names; the wire uses camelCase.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' { upper = true; continue; }
        if upper { out.extend(c.to_uppercase()); upper = false; } else { out.push(c); }
    }
    out
}

/// `validator` custom rule: rejects empty and whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Form {
        #[validate(custom(function = "not_blank", message = "Name is required"))]
        name: String,
        #[validate(email(message = "Email is invalid"))]
        email: String,
    }

    #[test]
    fn test_absorb_keeps_messages() {
        let form = Form { name: "  ".into(), email: "nope".into() };
        let mut errors = FieldErrors::new();
        errors.absorb("", &form.validate().unwrap_err());
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.get("email"), Some("Email is invalid"));
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("customer_name"), "customerName");
        assert_eq!(camel_case("sku"), "sku");
    }

    #[test]
    fn test_first_message_wins() {
        let mut errors = FieldErrors::new();
        errors.add("price", "Price is required");
        errors.add("price", "Price cannot be negative");
        assert_eq!(errors.get("price"), Some("Price is required"));
        assert_eq!(errors.len(), 1);
    }
}
