//! Property group schema types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of a custom property field; decides how a filter value is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    SelectSingle,
    SelectMultiple,
    TextInput,
    DateInput,
    TextArea,
    /// Checkboxes, separators and anything else without dedicated rules
    Other,
}

impl FieldType {
    /// Parse a schema type tag. Unknown tags fall back to [`FieldType::Other`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "select_single" | "select" => FieldType::SelectSingle,
            "select_multiple" => FieldType::SelectMultiple,
            "text_input" | "input" => FieldType::TextInput,
            "date_input" | "date" => FieldType::DateInput,
            "text_area" | "textarea" => FieldType::TextArea,
            _ => FieldType::Other,
        }
    }
}

/// A single custom property field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Qualified field name, e.g. `okp:consulting.name`
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    /// Name of the owning property group
    pub group: String,
}

/// Named group of property fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyGroup {
    pub name: String,
    pub label: String,
    pub fields: Vec<FieldDefinition>,
}

/// Parsed, immutable property schema
#[derive(Debug, Clone, Default)]
pub struct Schema {
    groups: Vec<PropertyGroup>,
    lookup: HashMap<String, (usize, usize)>,
}

impl Schema {
    /// Build a schema from ordered groups. Field names must be unique across groups.
    pub fn new(groups: Vec<PropertyGroup>) -> std::result::Result<Self, String> {
        let mut lookup = HashMap::new();
        for (g, group) in groups.iter().enumerate() {
            for (f, field) in group.fields.iter().enumerate() {
                if lookup.insert(field.name.clone(), (g, f)).is_some() {
                    return Err(format!("duplicate field name: {}", field.name));
                }
            }
        }
        Ok(Self { groups, lookup })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[PropertyGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&PropertyGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Look up a field by its qualified name
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.lookup
            .get(name)
            .map(|&(g, f)| &self.groups[g].fields[f])
    }

    pub fn field_count(&self) -> usize {
        self.lookup.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, field_type: FieldType) -> FieldDefinition {
        FieldDefinition {
            name: name.to_string(),
            label: name.to_string(),
            field_type,
            group: "okg:test".to_string(),
        }
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(FieldType::from_tag("select_multiple"), FieldType::SelectMultiple);
        assert_eq!(FieldType::from_tag(" Date "), FieldType::DateInput);
        assert_eq!(FieldType::from_tag("checkbox"), FieldType::Other);
    }

    #[test]
    fn test_field_lookup() {
        let schema = Schema::new(vec![PropertyGroup {
            name: "okg:test".to_string(),
            label: "Test".to_string(),
            fields: vec![
                field("okp:test.a", FieldType::TextInput),
                field("okp:test.b", FieldType::DateInput),
            ],
        }])
        .unwrap();

        assert_eq!(schema.field_count(), 2);
        assert_eq!(
            schema.field("okp:test.b").map(|f| f.field_type),
            Some(FieldType::DateInput)
        );
        assert!(schema.field("okp:test.c").is_none());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Schema::new(vec![
            PropertyGroup {
                name: "okg:one".to_string(),
                label: "One".to_string(),
                fields: vec![field("okp:x", FieldType::Other)],
            },
            PropertyGroup {
                name: "okg:two".to_string(),
                label: "Two".to_string(),
                fields: vec![field("okp:x", FieldType::Other)],
            },
        ]);
        assert!(result.is_err());
    }
}
