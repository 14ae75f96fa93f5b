//! Per-domain namespaces of commands and enum tables.

use std::collections::BTreeMap;
use std::rc::Rc;

use super::signature::CommandSignature;

/// Read-only table of named enum values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumTable {
    entries: BTreeMap<String, String>,
}

impl EnumTable {
    /// Looks up the wire value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for EnumTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Commands and enum tables registered for one domain.
///
/// Created the first time anything is registered for the domain and kept for
/// the lifetime of the connection.
#[derive(Debug, Default)]
pub(crate) struct Agent {
    commands: BTreeMap<String, Rc<CommandSignature>>,
    enums: BTreeMap<String, Rc<EnumTable>>,
}

impl Agent {
    pub(crate) fn insert_command(&mut self, signature: Rc<CommandSignature>) {
        self.commands
            .insert(signature.name().to_owned(), signature);
    }

    pub(crate) fn insert_enum(&mut self, name: &str, table: EnumTable) {
        self.enums.insert(name.to_owned(), Rc::new(table));
    }

    pub(crate) fn command(&self, name: &str) -> Option<Rc<CommandSignature>> {
        self.commands.get(name).cloned()
    }

    pub(crate) fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    pub(crate) fn enum_table(&self, name: &str) -> Option<Rc<EnumTable>> {
        self.enums.get(name).cloned()
    }

    pub(crate) fn enum_names(&self) -> Vec<String> {
        self.enums.keys().cloned().collect()
    }
}
