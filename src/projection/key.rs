//! Physical key codec
//!
//! A physical key is `{field}__v{N}`. The single reserved exception is the
//! bare `id` key, which carries no version. Registry and tag identifiers
//! use the fully qualified form `{doc_type}__{field}__v{N}`.

use std::fmt;

/// The one physical key that carries no version suffix.
pub const ID_KEY: &str = "id";

/// Separator between a field name and its version suffix.
const VERSION_SEP: &str = "__v";

/// A decoded physical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalKey {
    /// Base field name, version suffix stripped
    pub base: String,
    pub version: u32,
}

impl PhysicalKey {
    /// Parses `{field}__v{N}`. Returns `None` for the reserved `id` key
    /// and for keys without a well-formed suffix.
    pub fn parse(key: &str) -> Option<Self> {
        if key == ID_KEY {
            return None;
        }
        let at = key.rfind(VERSION_SEP)?;
        let (base, suffix) = key.split_at(at);
        let version: u32 = suffix[VERSION_SEP.len()..].parse().ok()?;
        if base.is_empty() {
            return None;
        }
        Some(Self {
            base: base.into(),
            version,
        })
    }

    /// Encodes a base field name and version into a physical key.
    pub fn encode(base: &str, version: u32) -> String {
        format!("{}{}{}", base, VERSION_SEP, version)
    }
}

impl fmt::Display for PhysicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.base, VERSION_SEP, self.version)
    }
}

/// A fully qualified field identifier: `{doc_type}__{field}__v{N}`.
///
/// This is the form tags, branches and the registry speak; document keys
/// never carry the doc_type prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedField {
    pub doc_type: String,
    /// Dotted path for nested fields (`author.name`)
    pub field: String,
    pub version: u32,
}

impl QualifiedField {
    /// Parses `{doc_type}__{field}__v{N}`.
    pub fn parse(identifier: &str) -> Option<Self> {
        let key = PhysicalKey::parse(identifier)?;
        let (doc_type, field) = key.base.split_once("__")?;
        if doc_type.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self {
            doc_type: doc_type.into(),
            field: field.into(),
            version: key.version,
        })
    }

    pub fn encode(doc_type: &str, field: &str, version: u32) -> String {
        format!("{}__{}{}{}", doc_type, field, VERSION_SEP, version)
    }

    /// Last segment of the field path; the key a nested document actually
    /// carries at its depth.
    pub fn leaf(&self) -> &str {
        self.field.rsplit('.').next().unwrap_or(&self.field)
    }
}

impl fmt::Display for QualifiedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::encode(&self.doc_type, &self.field, self.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_key() {
        let key = PhysicalKey::parse("name__v2").unwrap();
        assert_eq!(key.base, "name");
        assert_eq!(key.version, 2);
    }

    #[test]
    fn test_parse_rejects_reserved_id() {
        assert!(PhysicalKey::parse("id").is_none());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(PhysicalKey::parse("name").is_none());
        assert!(PhysicalKey::parse("name__v").is_none());
        assert!(PhysicalKey::parse("name__vX").is_none());
        assert!(PhysicalKey::parse("__v1").is_none());
    }

    #[test]
    fn test_encode_round_trip() {
        let encoded = PhysicalKey::encode("created_on", 12);
        assert_eq!(encoded, "created_on__v12");
        let parsed = PhysicalKey::parse(&encoded).unwrap();
        assert_eq!(parsed.base, "created_on");
        assert_eq!(parsed.version, 12);
    }

    #[test]
    fn test_base_with_double_underscores_uses_last_suffix() {
        let key = PhysicalKey::parse("user__name__v2").unwrap();
        assert_eq!(key.base, "user__name");
        assert_eq!(key.version, 2);
    }

    #[test]
    fn test_qualified_parse() {
        let q = QualifiedField::parse("user__name__v2").unwrap();
        assert_eq!(q.doc_type, "user");
        assert_eq!(q.field, "name");
        assert_eq!(q.version, 2);
    }

    #[test]
    fn test_qualified_nested_leaf() {
        let q = QualifiedField::parse("book__author.name__v1").unwrap();
        assert_eq!(q.field, "author.name");
        assert_eq!(q.leaf(), "name");
    }

    #[test]
    fn test_qualified_rejects_unqualified() {
        assert!(QualifiedField::parse("name__v2").is_none());
    }
}
