//! Entity schema synthesis.
//!
//! Collects one field list per distinct entity type, taken from the first
//! instance of that type, and renders it through a [`SchemaWriter`].
//!
//! Fields every entity inherits from the engine's base entity record
//! ([`BASE_FIELDS`]) are tracked for statistics but left out of the emitted
//! field lists; writers emit a single base marker in their place.

mod writer;

use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use std::fmt::{self, Write as FmtWrite};
use std::str::FromStr;
use tracing::trace;

pub use writer::{CStructWriter, NullWriter, RenderConfig, SchemaWriter, StatsWriter};

/// Fields declared by the base entity record
pub const BASE_FIELDS: &[&str] = &[
    "position",
    "scale",
    "velocity",
    "updateRange",
    "angle",
    "alpha",
    "rotation",
    "groundVel",
    "zdepth",
    "group",
    "classID",
    "inRange",
    "isPermanent",
    "tileCollisions",
    "interaction",
    "onGround",
    "active",
    "filter",
    "direction",
    "drawGroup",
    "collisionLayers",
    "collisionPlane",
    "collisionMode",
    "drawFX",
    "inkEffect",
    "visible",
    "onScreen",
];

/// Returns true if the name belongs to the base entity record
pub fn is_base_field(name: &str) -> bool {
    BASE_FIELDS.contains(&name)
}

/// Editable variable types, with their on-disk tag values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VariableType {
    /// Unsigned 8-bit integer
    UInt8 = 0,
    /// Unsigned 16-bit integer
    UInt16 = 1,
    /// Unsigned 32-bit integer
    UInt32 = 2,
    /// Signed 8-bit integer
    Int8 = 3,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Signed 32-bit integer
    Int32 = 5,
    /// Enum value stored as a signed 32-bit integer
    Enum = 6,
    /// Boolean stored as 32 bits
    Bool = 7,
    /// Text
    String = 8,
    /// Fixed-point 2D vector
    Vector2 = 9,
    /// Single-precision float
    Float = 10,
    /// Packed RGB color
    Color = 11,
}

impl VariableType {
    /// Every variant in tag order
    pub const ALL: [VariableType; 12] = [
        VariableType::UInt8,
        VariableType::UInt16,
        VariableType::UInt32,
        VariableType::Int8,
        VariableType::Int16,
        VariableType::Int32,
        VariableType::Enum,
        VariableType::Bool,
        VariableType::String,
        VariableType::Vector2,
        VariableType::Float,
        VariableType::Color,
    ];

    /// Variant name as it appears in dumps
    pub fn name(&self) -> &'static str {
        match self {
            VariableType::UInt8 => "UInt8",
            VariableType::UInt16 => "UInt16",
            VariableType::UInt32 => "UInt32",
            VariableType::Int8 => "Int8",
            VariableType::Int16 => "Int16",
            VariableType::Int32 => "Int32",
            VariableType::Enum => "Enum",
            VariableType::Bool => "Bool",
            VariableType::String => "String",
            VariableType::Vector2 => "Vector2",
            VariableType::Float => "Float",
            VariableType::Color => "Color",
        }
    }

    /// C type used when rendering a schema
    ///
    /// Enums are plain `int32` fields in the engine structs.
    pub fn type_name(&self) -> &'static str {
        match self {
            VariableType::UInt8 => "uint8",
            VariableType::UInt16 => "uint16",
            VariableType::UInt32 => "uint32",
            VariableType::Int8 => "int8",
            VariableType::Int16 => "int16",
            VariableType::Int32 | VariableType::Enum => "int32",
            VariableType::Bool => "bool32",
            VariableType::String => "String",
            VariableType::Vector2 => "Vector2",
            VariableType::Float => "float",
            VariableType::Color => "color",
        }
    }
}

impl TryFrom<u8> for VariableType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(Error::UnknownVariableType { tag: value })
    }
}

impl FromStr for VariableType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownVariableTypeName {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, typed field of an entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Resolved name, or the hex digest when unresolved
    pub name: String,
    /// Stored type
    pub ty: VariableType,
}

impl FieldDescriptor {
    /// Creates a new field descriptor
    pub fn new(name: impl Into<String>, ty: VariableType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Field layout of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTypeSchema {
    /// Resolved type name, or the hex digest when unresolved
    pub name: String,
    /// Non-base fields in first-seen order
    pub fields: Vec<FieldDescriptor>,
}

impl EntityTypeSchema {
    /// Creates a schema with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct SchemaEntry {
    schema: EntityTypeSchema,
    sealed: bool,
}

/// Builds one schema per distinct entity type
///
/// The first instance of a type defines its schema: once a type is sealed,
/// further fields recorded under its name only feed the field name set.
#[derive(Debug, Default)]
pub struct SchemaSynthesizer {
    entries: IndexMap<String, SchemaEntry>,
    field_names: IndexSet<String>,
}

impl SchemaSynthesizer {
    /// Creates an empty synthesizer
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts recording an entity type, returning false if it was already known
    pub fn begin_entity(&mut self, key: &str) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        trace!("New entity type {}", key);
        self.entries.insert(
            key.to_string(),
            SchemaEntry {
                schema: EntityTypeSchema::new(key),
                sealed: false,
            },
        );
        true
    }

    /// Records a field of an entity type
    ///
    /// Returns true if the field was added to the type's emitted field list.
    pub fn record_field(&mut self, key: &str, field: FieldDescriptor) -> bool {
        if !self.field_names.contains(field.name.as_str()) {
            self.field_names.insert(field.name.clone());
        }

        self.begin_entity(key);
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        if entry.sealed || is_base_field(&field.name) {
            return false;
        }
        entry.schema.fields.push(field);
        true
    }

    /// Freezes the field list of an entity type
    pub fn seal(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.sealed = true;
        }
    }

    /// Returns true if the entity type has been seen
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of distinct entity types
    pub fn entity_count(&self) -> usize {
        self.entries.len()
    }

    /// Distinct field names seen across every instance, base fields included
    pub fn field_names(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.field_names.iter().map(String::as_str)
    }

    /// Number of distinct field names
    pub fn field_name_count(&self) -> usize {
        self.field_names.len()
    }

    /// Consumes the synthesizer, returning schemas in first-seen order
    pub fn finalize(self) -> Vec<EntityTypeSchema> {
        self.entries.into_values().map(|entry| entry.schema).collect()
    }
}

/// Render schemas through the default C struct writer
pub fn render_schemas(schemas: &[EntityTypeSchema], config: &RenderConfig) -> String {
    let mut output = String::new();
    write_schemas(&mut output, schemas, config).expect("String write cannot fail");
    output
}

/// Write schemas through the default C struct writer
pub fn write_schemas(
    w: &mut impl FmtWrite,
    schemas: &[EntityTypeSchema],
    config: &RenderConfig,
) -> fmt::Result {
    let mut writer = CStructWriter::new(w, config);
    writer.write_all(schemas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_rendering() {
        assert_eq!(VariableType::Enum.type_name(), VariableType::Int32.type_name());
        assert_eq!(VariableType::Enum.type_name(), "int32");
        assert_eq!(VariableType::Float.type_name(), "float");
        assert_eq!(VariableType::Bool.type_name(), "bool32");
    }

    #[test]
    fn test_variable_type_tags() {
        for (tag, ty) in VariableType::ALL.iter().enumerate() {
            assert_eq!(*ty as u8, tag as u8);
            assert_eq!(VariableType::try_from(tag as u8).unwrap(), *ty);
        }
        assert!(VariableType::try_from(12).is_err());
    }

    #[test]
    fn test_variable_type_from_str() {
        assert_eq!("Vector2".parse::<VariableType>().unwrap(), VariableType::Vector2);
        assert_eq!("uint8".parse::<VariableType>().unwrap(), VariableType::UInt8);
        assert!("Quaternion".parse::<VariableType>().is_err());
    }

    #[test]
    fn test_first_instance_defines_schema() {
        let mut synth = SchemaSynthesizer::new();
        assert!(synth.begin_entity("Spring"));
        synth.record_field("Spring", FieldDescriptor::new("type", VariableType::Enum));
        synth.record_field("Spring", FieldDescriptor::new("flipFlag", VariableType::UInt8));
        synth.seal("Spring");

        assert!(!synth.begin_entity("Spring"));
        assert!(!synth.record_field("Spring", FieldDescriptor::new("planeFilter", VariableType::Enum)));
        synth.seal("Spring");

        let schemas = synth.finalize();
        assert_eq!(schemas.len(), 1);
        assert_eq!(
            schemas[0].fields,
            vec![
                FieldDescriptor::new("type", VariableType::Enum),
                FieldDescriptor::new("flipFlag", VariableType::UInt8),
            ]
        );
    }

    #[test]
    fn test_base_fields_excluded_but_counted() {
        let mut synth = SchemaSynthesizer::new();
        for ty in [VariableType::Enum, VariableType::Vector2] {
            assert!(!synth.record_field("Ring", FieldDescriptor::new("angle", ty)));
        }
        synth.record_field("Ring", FieldDescriptor::new("type", VariableType::Enum));

        assert_eq!(synth.field_name_count(), 2);
        let schemas = synth.finalize();
        assert!(schemas[0].fields.iter().all(|f| f.name != "angle"));
        assert_eq!(schemas[0].fields.len(), 1);
    }

    #[test]
    fn test_schemas_keep_encounter_order() {
        let mut synth = SchemaSynthesizer::new();
        for key in ["Ring", "Player", "Spring", "Ring"] {
            synth.begin_entity(key);
            synth.seal(key);
        }
        let names: Vec<_> = synth.finalize().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Ring", "Player", "Spring"]);
    }

    #[test]
    fn test_render_schemas() {
        let schemas = vec![EntityTypeSchema {
            name: "Ring".to_string(),
            fields: vec![
                FieldDescriptor::new("type", VariableType::Enum),
                FieldDescriptor::new("planeFilter", VariableType::UInt8),
            ],
        }];

        let output = render_schemas(&schemas, &RenderConfig::default());
        assert_eq!(
            output,
            "struct EntityRing {\n\tRSDK_ENTITY\n\tint32 type;\n\tuint8 planeFilter;\n};\n\n"
        );
    }
}
