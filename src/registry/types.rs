//! Registry record types
//!
//! `FieldVersion` is the identity record of one registered field version.
//! `SchemaTag` is a named binding of a document type to a coherent set of
//! field versions - a schema release. Branches share the shape: a branch
//! is the work-in-progress analogue of a tag, looked up under its own
//! document type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::core::Identity;
use crate::field::FieldKind;
use crate::projection::{PhysicalKey, QualifiedField};
use crate::store::{StoreClient, StoreResult};

/// One registered (document type, field, version) combination.
///
/// Immutable once created: deactivation flips `is_active`, nothing is ever
/// deleted or rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldVersion {
    pub doc_type: String,
    /// Dotted path for fields nested under Map/MapList parents
    pub field_name: String,
    pub version: u32,
    pub field_type: FieldKind,
    pub is_active: bool,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl FieldVersion {
    /// A fresh, active, untagged registration created now.
    pub fn new(
        doc_type: impl Into<String>,
        field_name: impl Into<String>,
        version: u32,
        field_type: FieldKind,
    ) -> Self {
        Self {
            doc_type: doc_type.into(),
            field_name: field_name.into(),
            version,
            field_type,
            is_active: true,
            tag: None,
            branch: None,
            created_on: Utc::now(),
            created_by: None,
        }
    }

    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    pub fn created_by(mut self, user_id: Option<Uuid>) -> Self {
        self.created_by = user_id;
        self
    }

    /// Fully qualified identifier: `{doc_type}__{field}__v{N}`.
    pub fn qualified_name(&self) -> String {
        QualifiedField::encode(&self.doc_type, &self.field_name, self.version)
    }

    /// Last segment of the field path.
    pub fn leaf(&self) -> &str {
        self.field_name.rsplit('.').next().unwrap_or(&self.field_name)
    }

    /// The key a document carries for this version at its nesting depth.
    pub fn physical_key(&self) -> String {
        PhysicalKey::encode(self.leaf(), self.version)
    }
}

/// A named binding of a document type to a set of field versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaTag {
    pub slug: String,
    pub doc_type: String,
    /// Fully qualified field identifiers this binding pins
    pub field_versions: Vec<String>,
    /// Users allowed to resolve the binding; empty plus empty groups means
    /// public
    #[serde(default)]
    pub users: Vec<Uuid>,
    /// Groups allowed to resolve the binding
    #[serde(default)]
    pub groups: Vec<String>,
}

impl SchemaTag {
    pub fn new(
        slug: impl Into<String>,
        doc_type: impl Into<String>,
        field_versions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            slug: slug.into(),
            doc_type: doc_type.into(),
            field_versions: field_versions.into_iter().map(Into::into).collect(),
            users: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Restricts visibility to the given users and groups.
    pub fn restrict_to(
        mut self,
        users: impl IntoIterator<Item = Uuid>,
        groups: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.users = users.into_iter().collect();
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// True when the identity may resolve this binding.
    pub fn visible_to(&self, identity: &Identity) -> bool {
        if self.users.is_empty() && self.groups.is_empty() {
            return true;
        }
        if let Some(user_id) = identity.user_id {
            if self.users.contains(&user_id) {
                return true;
            }
        }
        self.groups.iter().any(|group| identity.in_group(group))
    }

    /// True when the binding pins the given qualified identifier.
    pub fn contains(&self, qualified: &str) -> bool {
        self.field_versions.iter().any(|id| id == qualified)
    }

    /// Looks up a binding by slug with one search against the store.
    ///
    /// `doc_type` selects the metadata document type (tag vs branch).
    pub fn fetch(
        client: &dyn StoreClient,
        index: &str,
        doc_type: &str,
        slug: &str,
    ) -> StoreResult<Option<SchemaTag>> {
        let query = json!({ "query": { "term": { "slug": slug } }, "size": 1 });
        let response = client.search(index, doc_type, &query)?;
        Ok(response
            .first()
            .and_then(|hit| serde_json::from_value(hit.clone()).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_and_physical_key() {
        let record = FieldVersion::new("user", "name", 2, FieldKind::String);
        assert_eq!(record.qualified_name(), "user__name__v2");
        assert_eq!(record.physical_key(), "name__v2");
    }

    #[test]
    fn test_nested_field_leaf() {
        let record = FieldVersion::new("book", "author.name", 1, FieldKind::String);
        assert_eq!(record.qualified_name(), "book__author.name__v1");
        assert_eq!(record.physical_key(), "name__v1");
    }

    #[test]
    fn test_record_starts_active() {
        let record = FieldVersion::new("user", "name", 1, FieldKind::String);
        assert!(record.is_active);
        assert!(record.tag.is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let record = FieldVersion::new("user", "name", 1, FieldKind::MapList)
            .with_tag(Some("v2024".into()));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["field_type"], "map_list");
        let back: FieldVersion = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_tag_public_when_unrestricted() {
        let tag = SchemaTag::new("release-1", "user", ["user__name__v1"]);
        assert!(tag.visible_to(&Identity::anonymous()));
    }

    #[test]
    fn test_tag_visibility_by_user_and_group() {
        let insider = Uuid::new_v4();
        let tag = SchemaTag::new("draft", "user", ["user__name__v2"])
            .restrict_to([insider], ["schema-editors"]);

        assert!(!tag.visible_to(&Identity::anonymous()));
        assert!(tag.visible_to(&Identity::user(insider)));
        assert!(tag.visible_to(
            &Identity::user(Uuid::new_v4()).with_groups(["schema-editors"])
        ));
        assert!(!tag.visible_to(&Identity::user(Uuid::new_v4())));
    }

    #[test]
    fn test_fetch_by_slug() {
        use crate::store::MemoryStore;

        let store = MemoryStore::new();
        let tag = SchemaTag::new("release-1", "user", ["user__name__v1"]);
        store.insert(
            "app_meta",
            "tag",
            "release-1",
            serde_json::to_value(&tag).unwrap(),
        );

        let found = SchemaTag::fetch(&store, "app_meta", "tag", "release-1").unwrap();
        assert_eq!(found, Some(tag));
        let missing = SchemaTag::fetch(&store, "app_meta", "tag", "nope").unwrap();
        assert!(missing.is_none());
    }
}
