//! Extensible schema writing traits.
//!
//! This module provides the [`SchemaWriter`] trait for customizing how
//! entity schemas are written to output. [`CStructWriter`] produces the
//! decompilation-style struct listing:
//!
//! ```text
//! struct EntityRing {
//! 	RSDK_ENTITY
//! 	int32 type;
//! };
//! ```

use super::{EntityTypeSchema, FieldDescriptor};
use std::fmt::{Result, Write as FmtWrite};

/// Configuration for schema rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Indentation string (default: one tab)
    pub indent_str: String,
    /// Prefix prepended to every struct name
    pub struct_prefix: String,
    /// Line standing in for the inherited base fields
    pub base_marker: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent_str: "\t".to_string(),
            struct_prefix: "Entity".to_string(),
            base_marker: "RSDK_ENTITY".to_string(),
        }
    }
}

impl RenderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets the struct name prefix
    pub fn struct_prefix(mut self, s: impl Into<String>) -> Self {
        self.struct_prefix = s.into();
        self
    }

    /// Sets the base marker line
    pub fn base_marker(mut self, s: impl Into<String>) -> Self {
        self.base_marker = s.into();
        self
    }
}

/// Trait for writing schema elements to output.
///
/// Every method defaults to a no-op, so implementors only override what they need.
pub trait SchemaWriter {
    /// Open a schema block
    fn begin_schema(&mut self, schema: &EntityTypeSchema) -> Result {
        let _ = schema;
        Ok(())
    }

    /// Write the placeholder for the inherited base fields
    fn write_base_marker(&mut self) -> Result {
        Ok(())
    }

    /// Write a single field
    fn write_field(&mut self, field: &FieldDescriptor) -> Result {
        let _ = field;
        Ok(())
    }

    /// Close a schema block
    fn end_schema(&mut self, schema: &EntityTypeSchema) -> Result {
        let _ = schema;
        Ok(())
    }

    /// Write a complete schema
    fn write_schema(&mut self, schema: &EntityTypeSchema) -> Result {
        self.begin_schema(schema)?;
        self.write_base_marker()?;
        for field in &schema.fields {
            self.write_field(field)?;
        }
        self.end_schema(schema)
    }

    /// Write every schema in order
    fn write_all(&mut self, schemas: &[EntityTypeSchema]) -> Result {
        for schema in schemas {
            self.write_schema(schema)?;
        }
        Ok(())
    }
}

/// Writes schemas as C structs
pub struct CStructWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    config: &'a RenderConfig,
}

impl<'a, W: FmtWrite> CStructWriter<'a, W> {
    /// Creates a writer over the given output
    pub fn new(writer: &'a mut W, config: &'a RenderConfig) -> Self {
        Self { writer, config }
    }
}

impl<W: FmtWrite> SchemaWriter for CStructWriter<'_, W> {
    fn begin_schema(&mut self, schema: &EntityTypeSchema) -> Result {
        writeln!(
            self.writer,
            "struct {}{} {{",
            self.config.struct_prefix, schema.name
        )
    }

    fn write_base_marker(&mut self) -> Result {
        writeln!(self.writer, "{}{}", self.config.indent_str, self.config.base_marker)
    }

    fn write_field(&mut self, field: &FieldDescriptor) -> Result {
        writeln!(
            self.writer,
            "{}{} {};",
            self.config.indent_str,
            field.ty.type_name(),
            field.name
        )
    }

    fn end_schema(&mut self, _schema: &EntityTypeSchema) -> Result {
        writeln!(self.writer, "}};")?;
        writeln!(self.writer)
    }
}

/// A no-op writer that discards all output
pub struct NullWriter;

impl SchemaWriter for NullWriter {}

/// A writer that collects statistics about the schemas
#[derive(Debug, Default)]
pub struct StatsWriter {
    /// Number of schemas
    pub schema_count: usize,
    /// Number of emitted fields
    pub field_count: usize,
}

impl SchemaWriter for StatsWriter {
    fn begin_schema(&mut self, _schema: &EntityTypeSchema) -> Result {
        self.schema_count += 1;
        Ok(())
    }

    fn write_field(&mut self, _field: &FieldDescriptor) -> Result {
        self.field_count += 1;
        Ok(())
    }
}
