//! Projection engine
//!
//! Two structural recursions over nested maps and arrays-of-maps:
//!
//! - physical -> logical: strip version suffixes, choosing the maximum
//!   version per field, or exactly the tagged version when a target set
//!   is supplied
//! - logical -> physical: attach version suffixes resolved through the
//!   field version registry, falling back to the engine default when the
//!   registry has never seen the field
//!
//! The engine never mutates the registry; it only reads the resolution
//! handed to it.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::core::EngineConfig;
use crate::registry::VersionMap;

use super::errors::{ProjectionError, ProjectionResult};
use super::key::{PhysicalKey, QualifiedField, ID_KEY};

/// An explicit set of target versions, usually taken from a tag.
///
/// Built from fully qualified identifiers; lookups try the full dotted
/// path first, then the bare leaf name, mirroring how nested fields are
/// registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetVersions {
    versions: BTreeMap<String, BTreeSet<u32>>,
}

impl TargetVersions {
    /// Parses qualified identifiers (`{doc_type}__{field}__v{N}`).
    pub fn from_identifiers<I, S>(identifiers: I) -> ProjectionResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut versions: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        for identifier in identifiers {
            let identifier = identifier.as_ref();
            let qualified = QualifiedField::parse(identifier).ok_or_else(|| {
                ProjectionError::MalformedTargetVersion {
                    identifier: identifier.into(),
                }
            })?;
            versions
                .entry(qualified.field.clone())
                .or_default()
                .insert(qualified.version);
            let leaf = qualified.leaf().to_string();
            if leaf != qualified.field {
                versions.entry(leaf).or_default().insert(qualified.version);
            }
        }
        Ok(Self { versions })
    }

    /// Versions bound for a field, trying the dotted path before the name.
    pub fn versions_for(&self, path: &str, name: &str) -> Option<&BTreeSet<u32>> {
        self.versions.get(path).or_else(|| self.versions.get(name))
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Stateless projection engine scoped to one configuration.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionEngine<'a> {
    config: &'a EngineConfig,
}

impl<'a> ProjectionEngine<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Projects a physical document into logical form.
    ///
    /// With no target set, every field surfaces its maximum present
    /// version. With a target set, a field surfaces exactly the bound
    /// version; a field with no matching version is omitted, and a field
    /// matching more than one bound version fails as ambiguous.
    pub fn to_logical(
        &self,
        doc: &Value,
        targets: Option<&TargetVersions>,
    ) -> ProjectionResult<Value> {
        let obj = as_object(doc)?;
        Ok(Value::Object(self.logical_object(obj, "", targets)?))
    }

    fn logical_object(
        &self,
        obj: &Map<String, Value>,
        path: &str,
        targets: Option<&TargetVersions>,
    ) -> ProjectionResult<Map<String, Value>> {
        let mut out = Map::new();
        let mut grouped: BTreeMap<String, BTreeMap<u32, &Value>> = BTreeMap::new();

        for (key, value) in obj {
            if key == ID_KEY {
                out.insert(key.clone(), value.clone());
                continue;
            }
            match PhysicalKey::parse(key) {
                Some(parsed) => {
                    grouped
                        .entry(parsed.base)
                        .or_default()
                        .insert(parsed.version, value);
                }
                // A key without a version suffix is already logical; it
                // passes through with its children projected.
                None => {
                    let child_path = join_path(path, key);
                    out.insert(key.clone(), self.logical_value(value, &child_path, targets)?);
                }
            }
        }

        for (base, candidates) in grouped {
            let child_path = join_path(path, &base);
            let selected = match targets {
                None => candidates.iter().next_back().map(|(v, value)| (*v, *value)),
                Some(targets) => match targets.versions_for(&child_path, &base) {
                    // Not part of the release this target set pins.
                    None => None,
                    Some(bound) => {
                        let matching: Vec<(u32, &Value)> = candidates
                            .iter()
                            .filter(|(version, _)| bound.contains(version))
                            .map(|(v, value)| (*v, *value))
                            .collect();
                        match matching.len() {
                            0 => None,
                            1 => Some(matching[0]),
                            _ => {
                                return Err(ProjectionError::ambiguous(
                                    &base,
                                    matching.iter().map(|(v, _)| *v).collect(),
                                ))
                            }
                        }
                    }
                },
            };
            if let Some((_, value)) = selected {
                out.insert(base, self.logical_value(value, &child_path, targets)?);
            }
        }
        Ok(out)
    }

    fn logical_value(
        &self,
        value: &Value,
        path: &str,
        targets: Option<&TargetVersions>,
    ) -> ProjectionResult<Value> {
        match value {
            Value::Object(obj) => Ok(Value::Object(self.logical_object(obj, path, targets)?)),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.logical_value(item, path, targets)?);
                }
                Ok(Value::Array(out))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    /// Projects a logical document into physical form.
    ///
    /// `resolution` is the registry's answer for the document type,
    /// obtained with a single query. Fields the registry has never seen
    /// fall back to the default version.
    pub fn to_physical(&self, doc: &Value, resolution: &VersionMap) -> ProjectionResult<Value> {
        let obj = as_object(doc)?;
        Ok(Value::Object(self.physical_object(obj, "", resolution)))
    }

    fn physical_object(
        &self,
        obj: &Map<String, Value>,
        path: &str,
        resolution: &VersionMap,
    ) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in obj {
            if key == ID_KEY {
                out.insert(key.clone(), value.clone());
                continue;
            }
            let child_path = join_path(path, key);
            let version = resolution
                .version_for(&child_path, key)
                .unwrap_or(self.config.default_version);
            out.insert(
                PhysicalKey::encode(key, version),
                self.physical_value(value, &child_path, resolution),
            );
        }
        out
    }

    fn physical_value(&self, value: &Value, path: &str, resolution: &VersionMap) -> Value {
        match value {
            Value::Object(obj) => Value::Object(self.physical_object(obj, path, resolution)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.physical_value(item, path, resolution))
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }
}

fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn as_object(doc: &Value) -> ProjectionResult<&Map<String, Value>> {
    doc.as_object().ok_or(ProjectionError::NotAnObject {
        actual: json_type_name(doc),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine_config() -> EngineConfig {
        EngineConfig::new("app")
    }

    #[test]
    fn test_to_logical_takes_max_version() {
        let config = engine_config();
        let engine = ProjectionEngine::new(&config);
        let physical = json!({
            "id": "u1",
            "name__v1": "old",
            "name__v2": "older",
            "name__v5": "newest"
        });
        let logical = engine.to_logical(&physical, None).unwrap();
        assert_eq!(logical, json!({ "id": "u1", "name": "newest" }));
    }

    #[test]
    fn test_to_logical_tagged_selects_bound_version() {
        let config = engine_config();
        let engine = ProjectionEngine::new(&config);
        let targets = TargetVersions::from_identifiers(["user__name__v2"]).unwrap();
        let physical = json!({ "name__v2": "tagged", "name__v5": "newest" });
        let logical = engine.to_logical(&physical, Some(&targets)).unwrap();
        assert_eq!(logical, json!({ "name": "tagged" }));
    }

    #[test]
    fn test_to_logical_tagged_omits_unbound_fields() {
        let config = engine_config();
        let engine = ProjectionEngine::new(&config);
        let targets = TargetVersions::from_identifiers(["user__name__v2"]).unwrap();
        // name has no v2; age is not in the tag at all.
        let physical = json!({ "id": "u1", "name__v1": "x", "age__v1": 30 });
        let logical = engine.to_logical(&physical, Some(&targets)).unwrap();
        assert_eq!(logical, json!({ "id": "u1" }));
    }

    #[test]
    fn test_to_logical_ambiguous_under_targets() {
        let config = engine_config();
        let engine = ProjectionEngine::new(&config);
        let targets =
            TargetVersions::from_identifiers(["user__name__v1", "user__name__v2"]).unwrap();
        let physical = json!({ "name__v1": "a", "name__v2": "b" });
        let err = engine.to_logical(&physical, Some(&targets)).unwrap_err();
        assert!(matches!(err, ProjectionError::AmbiguousField { .. }));
    }

    #[test]
    fn test_to_logical_recurses_nested() {
        let config = engine_config();
        let engine = ProjectionEngine::new(&config);
        let physical = json!({
            "author__v1": { "name__v1": "old", "name__v3": "new" },
            "editions__v2": [ { "year__v1": 1990 }, { "year__v1": 2004 } ]
        });
        let logical = engine.to_logical(&physical, None).unwrap();
        assert_eq!(
            logical,
            json!({
                "author": { "name": "new" },
                "editions": [ { "year": 1990 }, { "year": 2004 } ]
            })
        );
    }

    #[test]
    fn test_to_logical_rejects_non_object() {
        let config = engine_config();
        let engine = ProjectionEngine::new(&config);
        assert!(engine.to_logical(&json!([1, 2]), None).is_err());
    }

    #[test]
    fn test_to_physical_resolves_and_falls_back() {
        let config = engine_config();
        let engine = ProjectionEngine::new(&config);
        let mut resolution = VersionMap::empty("user");
        resolution.insert("name", 3);

        let logical = json!({ "id": "u1", "name": "Ada", "unregistered": true });
        let physical = engine.to_physical(&logical, &resolution).unwrap();
        assert_eq!(
            physical,
            json!({ "id": "u1", "name__v3": "Ada", "unregistered__v1": true })
        );
    }

    #[test]
    fn test_to_physical_nested_path_precedence() {
        let config = engine_config();
        let engine = ProjectionEngine::new(&config);
        let mut resolution = VersionMap::empty("book");
        resolution.insert("author", 2);
        resolution.insert("author.name", 4);
        resolution.insert("name", 1);

        let logical = json!({ "author": { "name": "Woolf" }, "name": "title" });
        let physical = engine.to_physical(&logical, &resolution).unwrap();
        assert_eq!(
            physical,
            json!({
                "author__v2": { "name__v4": "Woolf" },
                "name__v1": "title"
            })
        );
    }

    #[test]
    fn test_malformed_target_identifier_rejected() {
        let err = TargetVersions::from_identifiers(["name__v2"]).unwrap_err();
        assert!(matches!(err, ProjectionError::MalformedTargetVersion { .. }));
    }
}
