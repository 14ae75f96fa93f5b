//! Loader for machine-readable protocol descriptions.
//!
//! Backends publish their protocol as a JSON document listing each domain's
//! types, commands and events. The loader turns that document into the same
//! registration calls a host would otherwise make by hand.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::{EnumTable, ParamSpec, Registry, TypeTag};
use crate::errors::RegistrationError;

/// Errors raised while loading a protocol description.
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// The description file could not be read.
    #[error("failed to read protocol description '{path}': {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The description is not valid JSON or has the wrong shape.
    #[error("failed to parse protocol description: {0}")]
    Parse(#[from] serde_json::Error),

    /// An entry could not be registered.
    #[error(transparent)]
    Register(#[from] RegistrationError),
}

/// Top-level protocol description document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolDescription {
    /// Every domain the backend exposes.
    #[serde(default)]
    pub domains: Vec<DomainDescription>,
}

/// One domain of a protocol description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainDescription {
    /// Domain name, e.g. `"Page"`.
    pub domain: String,
    /// Named types declared by the domain.
    #[serde(default)]
    pub types: Vec<TypeDescription>,
    /// Commands the backend accepts.
    #[serde(default)]
    pub commands: Vec<CommandDescription>,
    /// Events the backend emits.
    #[serde(default)]
    pub events: Vec<EventDescription>,
}

/// A named type declared by a domain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeDescription {
    /// Type identifier, unique within the domain.
    pub id: String,
    /// Underlying JSON type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Allowed values when the type is an enumeration.
    #[serde(rename = "enum", default)]
    pub variants: Option<Vec<String>>,
}

/// A command entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandDescription {
    /// Command name within its domain.
    pub name: String,
    /// Parameters, in positional order.
    #[serde(default)]
    pub parameters: Vec<ParameterDescription>,
    /// Fields of the result object, in callback order.
    #[serde(default)]
    pub returns: Vec<ParameterDescription>,
}

/// An event entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventDescription {
    /// Event name within its domain.
    pub name: String,
    /// Parameters, in the order handlers receive them.
    #[serde(default)]
    pub parameters: Vec<ParameterDescription>,
}

/// A parameter or result field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterDescription {
    /// Field name.
    pub name: String,
    /// JSON type name, absent when `reference` is used.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Reference to a named type, either `Type` or `Domain.Type`.
    #[serde(rename = "$ref", default)]
    pub reference: Option<String>,
    /// Whether the field may be omitted.
    #[serde(default)]
    pub optional: bool,
}

impl ProtocolDescription {
    /// Parses a description from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptionError::Parse`] when the text is not a valid
    /// description document.
    pub fn from_json(text: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a description file.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptionError::Read`] when the file cannot be read and
    /// [`DescriptionError::Parse`] when its contents are invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DescriptionError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DescriptionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Registers every enum, command and event in the description.
    pub(crate) fn apply(&self, registry: &mut Registry) -> Result<(), DescriptionError> {
        let types = TypeIndex::new(&self.domains);

        for domain in &self.domains {
            for declared in &domain.types {
                if let Some(variants) = &declared.variants {
                    let table: EnumTable = variants
                        .iter()
                        .map(|value| (enum_key(value), value.clone()))
                        .collect();
                    registry.register_enum(&format!("{}.{}", domain.domain, declared.id), table)?;
                }
            }

            for command in &domain.commands {
                let params = command
                    .parameters
                    .iter()
                    .map(|param| {
                        let tag = types.resolve(&domain.domain, param)?;
                        Ok(if param.optional {
                            ParamSpec::optional(&param.name, tag)
                        } else {
                            ParamSpec::required(&param.name, tag)
                        })
                    })
                    .collect::<Result<Vec<_>, RegistrationError>>()?;
                let returns = command.returns.iter().map(|field| field.name.clone()).collect();
                registry.register_command(
                    &format!("{}.{}", domain.domain, command.name),
                    params,
                    returns,
                )?;
            }

            for event in &domain.events {
                let order = event.parameters.iter().map(|param| param.name.clone()).collect();
                registry.register_event(&format!("{}.{}", domain.domain, event.name), order)?;
            }
        }
        Ok(())
    }
}

/// Underlying JSON type of every named type, keyed by `Domain.Type`.
struct TypeIndex<'a> {
    kinds: HashMap<String, &'a str>,
}

impl<'a> TypeIndex<'a> {
    fn new(domains: &'a [DomainDescription]) -> Self {
        let kinds = domains
            .iter()
            .flat_map(|domain| {
                domain.types.iter().map(move |declared| {
                    (
                        format!("{}.{}", domain.domain, declared.id),
                        declared.kind.as_str(),
                    )
                })
            })
            .collect();
        Self { kinds }
    }

    fn resolve(
        &self,
        domain: &str,
        param: &ParameterDescription,
    ) -> Result<TypeTag, RegistrationError> {
        if let Some(kind) = &param.kind {
            return TypeTag::parse(kind);
        }
        let Some(reference) = &param.reference else {
            return Ok(TypeTag::Any);
        };
        let qualified = if reference.contains('.') {
            reference.clone()
        } else {
            format!("{domain}.{reference}")
        };
        match self.kinds.get(&qualified) {
            Some(kind) => TypeTag::parse(kind),
            None => Ok(TypeTag::Any),
        }
    }
}

/// Upper-camel-cases an enum value: `"object-id"` becomes `ObjectId`.
fn enum_key(value: &str) -> String {
    value
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::{fixture, rstest};

    use super::*;

    const DESCRIPTION: &str = r#"{
        "domains": [
            {
                "domain": "Runtime",
                "types": [
                    { "id": "RemoteObjectId", "type": "string" },
                    { "id": "RemoteObjectType", "type": "string",
                      "enum": ["object", "function", "object-id"] }
                ],
                "commands": [
                    {
                        "name": "releaseObject",
                        "parameters": [ { "name": "objectId", "$ref": "RemoteObjectId" } ]
                    }
                ]
            },
            {
                "domain": "DOM",
                "commands": [
                    {
                        "name": "resolveNode",
                        "parameters": [
                            { "name": "nodeId", "type": "integer" },
                            { "name": "objectGroup", "type": "string", "optional": true },
                            { "name": "hint", "$ref": "Unknown.Thing", "optional": true },
                            { "name": "type", "$ref": "Runtime.RemoteObjectType", "optional": true }
                        ],
                        "returns": [ { "name": "object", "$ref": "Runtime.RemoteObject" } ]
                    }
                ],
                "events": [
                    {
                        "name": "setChildNodes",
                        "parameters": [
                            { "name": "parentId", "type": "integer" },
                            { "name": "nodes", "type": "array" }
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[fixture]
    fn loaded() -> Registry {
        let description = ProtocolDescription::from_json(DESCRIPTION).expect("valid description");
        let mut registry = Registry::default();
        description.apply(&mut registry).expect("description applies");
        registry
    }

    #[rstest]
    fn resolves_local_and_qualified_references(loaded: Registry) {
        let release = loaded.command("Runtime.releaseObject").expect("command");
        assert_eq!(release.params()[0].type_tag(), TypeTag::String);
        assert!(!release.params()[0].is_optional());

        let resolve = loaded.command("DOM.resolveNode").expect("command");
        let tags: Vec<TypeTag> = resolve.params().iter().map(ParamSpec::type_tag).collect();
        assert_eq!(
            tags,
            vec![TypeTag::Integer, TypeTag::String, TypeTag::Any, TypeTag::String]
        );
        assert_eq!(resolve.reply_fields(), ["object"]);
    }

    #[rstest]
    fn registers_events_in_declared_order(loaded: Registry) {
        let schema = loaded.event("DOM.setChildNodes").expect("event");
        assert_eq!(schema.param_order(), ["parentId", "nodes"]);
    }

    #[rstest]
    fn enum_keys_are_upper_camel_cased(loaded: Registry) {
        let agent = loaded.agent("Runtime").expect("agent");
        let table = agent.enum_table("RemoteObjectType").expect("enum");
        assert_eq!(table.get("Object"), Some("object"));
        assert_eq!(table.get("ObjectId"), Some("object-id"));
        assert_eq!(table.len(), 3);
        assert!(agent.enum_table("RemoteObjectId").is_none());
    }

    #[rstest]
    fn unknown_type_names_are_rejected() {
        let description = ProtocolDescription::from_json(
            r#"{"domains":[{"domain":"Page","commands":[
                {"name":"navigate","parameters":[{"name":"url","type":"uri"}]}
            ]}]}"#,
        )
        .expect("valid description");
        let mut registry = Registry::default();
        let error = description
            .apply(&mut registry)
            .expect_err("unknown tag should fail");
        assert!(matches!(
            error,
            DescriptionError::Register(RegistrationError::UnknownTypeTag { ref tag }) if tag == "uri"
        ));
    }

    #[rstest]
    fn reads_descriptions_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("protocol.json");
        fs::write(&path, DESCRIPTION).expect("write description");

        let description = ProtocolDescription::from_path(&path).expect("load description");
        assert_eq!(description.domains.len(), 2);

        let missing = ProtocolDescription::from_path(dir.path().join("absent.json"))
            .expect_err("missing file should fail");
        assert!(matches!(missing, DescriptionError::Read { .. }));
    }

    #[rstest]
    #[case("log", "Log")]
    #[case("object-id", "ObjectId")]
    #[case("first_line", "FirstLine")]
    #[case("CSS", "CSS")]
    fn builds_enum_keys(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(enum_key(value), expected);
    }
}
