//! Validation report
//!
//! Aggregated, non-fatal validation outcome. A report is a plain value:
//! callers add errors and read the flag, nothing is raised. Adding the
//! first error flips `ok` to false.

use std::collections::BTreeMap;

/// Per-field validation outcome for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    ok: bool,
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationReport {
    /// A passing report with no errors.
    pub fn passing() -> Self {
        Self {
            ok: true,
            errors: BTreeMap::new(),
        }
    }

    /// True when no errors have been recorded.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Records one error against a field.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.ok = false;
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    /// All recorded errors, keyed by field.
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Errors recorded against one field.
    pub fn field_errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Folds another report into this one, keeping its field keys.
    pub fn merge(&mut self, other: ValidationReport) {
        for (field, messages) in other.errors {
            self.ok = false;
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    /// Folds a nested field's report in under the parent field's key.
    ///
    /// Each nested field contributes its first error, prefixed with its own
    /// name, so `address.street` failing "too short" surfaces as
    /// `address: ["street: too short"]`.
    pub fn absorb_nested(&mut self, parent: &str, nested: ValidationReport) {
        for (field, messages) in nested.errors {
            if let Some(first) = messages.into_iter().next() {
                self.add_error(parent, format!("{}: {}", field, first));
            }
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::passing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passing_by_default() {
        let report = ValidationReport::passing();
        assert!(report.is_ok());
        assert!(report.errors().is_empty());
    }

    #[test]
    fn test_first_error_flips_ok() {
        let mut report = ValidationReport::passing();
        report.add_error("name", "too short");
        assert!(!report.is_ok());
        assert_eq!(report.field_errors("name"), ["too short"]);
    }

    #[test]
    fn test_merge_collects_all_messages() {
        let mut a = ValidationReport::passing();
        a.add_error("name", "too short");
        let mut b = ValidationReport::passing();
        b.add_error("name", "not in choices");
        b.add_error("age", "out of range");
        a.merge(b);
        assert_eq!(a.field_errors("name").len(), 2);
        assert_eq!(a.field_errors("age").len(), 1);
    }

    #[test]
    fn test_absorb_nested_keys_under_parent() {
        let mut nested = ValidationReport::passing();
        nested.add_error("street", "too short");
        nested.add_error("street", "second error dropped");
        nested.add_error("zip", "missing");

        let mut parent = ValidationReport::passing();
        parent.absorb_nested("address", nested);

        assert!(!parent.is_ok());
        let errors = parent.field_errors("address");
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&"street: too short".to_string()));
        assert!(errors.contains(&"zip: missing".to_string()));
    }
}
