//! Line-based entity dump format.
//!
//! Scene readers hand entity instances over as text:
//!
//! ```text
//! ; Green Hill Zone act 1
//! known Sparkle
//! object Ring
//!   type Enum
//!   #f43e5cb7bdcc1a8b4d1f3bd0a1f5e1a2 UInt8
//! object #0123456789abcdef0123456789abcdef
//! ```
//!
//! - `;` starts a comment line
//! - `known <name>` lists a name the game config declares; these are seeded
//!   into the dictionary before any instance is resolved
//! - `object <name>` starts an instance
//! - indented `<name> <type>` lines are the fields of the current instance
//! - a name written as `#` followed by 32 hex digits is digest-only; any other
//!   name is inline text and gets hashed on load

use crate::digest::{DigestOracle, HashAlgorithm};
use crate::error::{Error, Result};
use crate::resolver::Symbol;
use crate::run::{EntityInstance, FieldRef};
use crate::schema::VariableType;
use std::path::Path;
use tracing::debug;

const OBJECT_KEYWORD: &str = "object";
const KNOWN_KEYWORD: &str = "known";

/// Contents of a parsed dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDump {
    /// Names declared by the game config, in file order
    pub known: Vec<String>,
    /// Entity instances in scene order
    pub instances: Vec<EntityInstance>,
}

fn parse_name<A: HashAlgorithm>(
    oracle: &DigestOracle<A>,
    token: &str,
    line: usize,
) -> Result<Symbol> {
    match token.strip_prefix('#') {
        Some(hex) => Symbol::from_hex(hex).map_err(|e| Error::dump_parse(line, e.to_string())),
        None => Ok(Symbol::from_text(oracle, token)),
    }
}

/// Parse a dump into known names and entity instances
pub fn parse_dump<A: HashAlgorithm>(
    contents: &str,
    oracle: &DigestOracle<A>,
) -> Result<EntityDump> {
    let mut known = Vec::new();
    let mut instances: Vec<EntityInstance> = Vec::new();

    for (i, raw) in contents.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        let indented = raw.starts_with(char::is_whitespace);
        let mut tokens = trimmed.split_whitespace();

        if !indented {
            let keyword = tokens.next().unwrap_or_default();
            let (Some(name), None) = (tokens.next(), tokens.next()) else {
                return Err(Error::dump_parse(
                    line,
                    format!("expected '{} <name>'", keyword),
                ));
            };
            match keyword {
                OBJECT_KEYWORD => {
                    instances.push(EntityInstance::new(parse_name(oracle, name, line)?));
                }
                KNOWN_KEYWORD if name.starts_with('#') => {
                    return Err(Error::dump_parse(line, "known names must be plain text"));
                }
                KNOWN_KEYWORD => known.push(name.to_string()),
                _ => {
                    return Err(Error::dump_parse(
                        line,
                        format!(
                            "expected '{}' or '{}', found '{}'",
                            OBJECT_KEYWORD, KNOWN_KEYWORD, keyword
                        ),
                    ));
                }
            }
            continue;
        }

        let (Some(name), Some(ty), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(Error::dump_parse(line, "expected '<name> <type>'"));
        };
        let ty: VariableType = ty
            .parse()
            .map_err(|e: Error| Error::dump_parse(line, e.to_string()))?;
        let name = parse_name(oracle, name, line)?;

        let Some(instance) = instances.last_mut() else {
            return Err(Error::dump_parse(line, "field outside of an object"));
        };
        instance.fields.push(FieldRef::new(name, ty));
    }

    debug!(
        "Parsed {} entity instances and {} known names",
        instances.len(),
        known.len()
    );
    Ok(EntityDump { known, instances })
}

/// Read and parse a dump file
pub fn load_dump<A: HashAlgorithm>(
    path: impl AsRef<Path>,
    oracle: &DigestOracle<A>,
) -> Result<EntityDump> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
    parse_dump(&contents, oracle)
}
