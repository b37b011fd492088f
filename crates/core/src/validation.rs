//! Field-level validation errors for forms.

/// Ordered collection of per-field error messages.
///
/// Fields keep the order in which errors were added so forms can list them
/// top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<(&'static str, String)>,
}

impl FieldErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Record an error for `field`. Only the first error per field is kept.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.errors.push((field, message.into()));
        }
    }

    /// The error recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.errors.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// The first message, for a summary toast.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.errors.first().map(|(_, message)| message.as_str())
    }

    /// `Ok(value)` when no errors were recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed validation.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let joined: Vec<String> = self
            .errors
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        f.write_str(&joined.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// Trim a form value, turning blank input into `None`.
#[must_use]
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Require a non-blank value no longer than `max` characters.
pub fn required(
    errors: &mut FieldErrors,
    field: &'static str,
    label: &str,
    value: &str,
    max: usize,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, format!("{label} is required"));
    } else if trimmed.chars().count() > max {
        errors.add(field, format!("{label} must be at most {max} characters"));
    }
    trimmed.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_first_error_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("name", "Name is required");
        errors.add("name", "Name is too long");
        errors.add("price", "Price is required");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.first_message(), Some("Name is required"));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(FieldErrors::new().into_result(5), Ok(5));
        let mut errors = FieldErrors::new();
        errors.add("city", "City is required");
        assert!(errors.into_result(5).is_err());
    }

    #[test]
    fn test_required_and_non_blank() {
        let mut errors = FieldErrors::new();
        assert_eq!(required(&mut errors, "name", "Name", "  Ganache ", 20), "Ganache");
        required(&mut errors, "city", "City", "   ", 20);
        required(&mut errors, "line1", "Address", "abcdef", 3);
        assert_eq!(errors.get("city"), Some("City is required"));
        assert_eq!(errors.get("line1"), Some("Address must be at most 3 characters"));
        assert_eq!(non_blank("  "), None);
        assert_eq!(non_blank(" x "), Some("x".to_owned()));
    }
}
