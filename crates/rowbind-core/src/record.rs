//! Field directory and record view over a row cursor.
//!
//! [`FieldIndex`] is built once per result set from cursor metadata and
//! reused across rows (it indexes ordinals, not values). [`Record`] is a
//! cheap per-row view pairing the index with the live cursor.

use crate::convert::FromValue;
use crate::cursor::RowCursor;
use crate::error::{Error, Result};
use crate::value::Value;
use std::collections::HashMap;

/// Strip non-alphanumeric characters (underscores included) and lowercase.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Case-insensitive name-to-ordinal index for one result set.
///
/// Every raw field name resolves by exact case-insensitive match. A
/// normalized form (non-alphanumerics stripped, lowercased) additionally
/// resolves only when it is unambiguous: exactly one raw field normalizes
/// to it and no raw field already owns that string case-insensitively.
/// Raw fields `"f_oo"` and `"fo_o"` both normalize to `"foo"`, so neither
/// gains the alias and only their exact names resolve.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    names: Vec<String>,
    exact: HashMap<String, usize>,
    aliases: HashMap<String, usize>,
}

impl FieldIndex {
    /// Build an index from an ordered list of raw field names.
    ///
    /// On a duplicate case-insensitive name the first ordinal wins.
    pub fn from_names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        let mut exact: HashMap<String, usize> = HashMap::with_capacity(names.len());
        for (ordinal, name) in names.iter().enumerate() {
            exact.entry(name.to_lowercase()).or_insert(ordinal);
        }

        // Group candidate aliases, then keep only the unambiguous ones.
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (ordinal, name) in names.iter().enumerate() {
            let norm = normalize(name);
            if !norm.is_empty() && norm != name.to_lowercase() {
                groups.entry(norm).or_default().push(ordinal);
            }
        }
        let mut aliases = HashMap::new();
        for (norm, group) in groups {
            if group.len() == 1 && !exact.contains_key(&norm) {
                aliases.insert(norm, group[0]);
            }
        }

        Self {
            names,
            exact,
            aliases,
        }
    }

    /// Build an index from a cursor's field metadata.
    pub fn from_cursor(cursor: &dyn RowCursor) -> Self {
        let names: Vec<String> = (0..cursor.field_count())
            .map(|i| cursor.field_name(i).unwrap_or("").to_string())
            .collect();
        Self::from_names(names)
    }

    /// Resolve a field name to its ordinal.
    ///
    /// The query is lowercased and checked against raw names first, then
    /// against the alias table. The query itself is never normalized.
    pub fn ordinal(&self, name: &str) -> Option<usize> {
        let lower = name.to_lowercase();
        self.exact
            .get(&lower)
            .or_else(|| self.aliases.get(&lower))
            .copied()
    }

    /// Check whether a name resolves.
    pub fn contains(&self, name: &str) -> bool {
        self.ordinal(name).is_some()
    }

    /// Raw field name at `ordinal`.
    pub fn name(&self, ordinal: usize) -> Option<&str> {
        self.names.get(ordinal).map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the result set has no fields.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A read-only view of the cursor's current row.
///
/// Values are fetched live from the cursor on each access; the record holds
/// no row data of its own.
#[derive(Clone, Copy)]
pub struct Record<'a> {
    cursor: &'a dyn RowCursor,
    index: &'a FieldIndex,
}

impl<'a> Record<'a> {
    pub fn new(cursor: &'a dyn RowCursor, index: &'a FieldIndex) -> Self {
        Self { cursor, index }
    }

    /// Number of fields in the row.
    pub fn field_count(&self) -> usize {
        self.index.len()
    }

    /// Resolve a field name to its ordinal.
    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.index.ordinal(name)
    }

    /// Check whether a field name resolves.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Raw field name at `ordinal`.
    pub fn field_name(&self, ordinal: usize) -> Option<&str> {
        self.index.name(ordinal)
    }

    /// Raw value at `ordinal`. Out-of-range ordinals read as null.
    pub fn value(&self, ordinal: usize) -> Value {
        self.cursor.value(ordinal)
    }

    /// Raw value by name, or null when the name does not resolve.
    pub fn value_named(&self, name: &str) -> Value {
        match self.index.ordinal(name) {
            Some(ordinal) => self.cursor.value(ordinal),
            None => Value::Null,
        }
    }

    /// Typed value at `ordinal`, converted through the standard rules.
    pub fn get<T: FromValue>(&self, ordinal: usize) -> Result<T> {
        let value = self.cursor.value(ordinal);
        T::from_value(&value).map_err(|e| match self.index.name(ordinal) {
            Some(name) => e.with_field(name),
            None => e,
        })
    }

    /// Typed value by name. An unresolvable name is an argument error.
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let ordinal = self
            .index
            .ordinal(name)
            .ok_or_else(|| Error::argument(format!("no field named '{name}'")))?;
        let value = self.cursor.value(ordinal);
        T::from_value(&value).map_err(|e| e.with_field(name))
    }

    pub fn get_bool(&self, ordinal: usize) -> Result<bool> {
        self.get(ordinal)
    }

    pub fn get_i32(&self, ordinal: usize) -> Result<i32> {
        self.get(ordinal)
    }

    pub fn get_i64(&self, ordinal: usize) -> Result<i64> {
        self.get(ordinal)
    }

    pub fn get_f64(&self, ordinal: usize) -> Result<f64> {
        self.get(ordinal)
    }

    pub fn get_string(&self, ordinal: usize) -> Result<String> {
        self.get(ordinal)
    }

    pub fn get_bytes(&self, ordinal: usize) -> Result<Vec<u8>> {
        self.get(ordinal)
    }

    pub fn get_uuid(&self, ordinal: usize) -> Result<[u8; 16]> {
        self.get(ordinal)
    }
}

impl std::fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("fields", &self.index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::MemoryCursor;

    #[test]
    fn exact_lookup_is_case_insensitive() {
        let index = FieldIndex::from_names(["Id", "UserName"]);
        assert_eq!(index.ordinal("id"), Some(0));
        assert_eq!(index.ordinal("ID"), Some(0));
        assert_eq!(index.ordinal("username"), Some(1));
        assert_eq!(index.ordinal("missing"), None);
    }

    #[test]
    fn unambiguous_alias_resolves() {
        let index = FieldIndex::from_names(["user_name", "id"]);
        assert_eq!(index.ordinal("username"), Some(0));
        assert_eq!(index.ordinal("user_name"), Some(0));
    }

    #[test]
    fn colliding_aliases_are_dropped() {
        let index = FieldIndex::from_names(["f_oo", "fo_o"]);
        assert_eq!(index.ordinal("foo"), None);
        assert_eq!(index.ordinal("f_oo"), Some(0));
        assert_eq!(index.ordinal("fo_o"), Some(1));
    }

    #[test]
    fn alias_never_shadows_a_raw_name() {
        // "user_name" normalizes to "username", but a raw field owns that
        // string, so the alias is not registered.
        let index = FieldIndex::from_names(["user_name", "UserName"]);
        assert_eq!(index.ordinal("username"), Some(1));
        assert_eq!(index.ordinal("user_name"), Some(0));
    }

    #[test]
    fn query_is_not_normalized() {
        let index = FieldIndex::from_names(["username"]);
        assert_eq!(index.ordinal("user_name"), None);
        assert_eq!(index.ordinal("USERNAME"), Some(0));
    }

    #[test]
    fn duplicate_names_keep_first_ordinal() {
        let index = FieldIndex::from_names(["id", "ID", "name"]);
        assert_eq!(index.ordinal("id"), Some(0));
        assert_eq!(index.ordinal("name"), Some(2));
    }

    fn sample() -> (MemoryCursor, FieldIndex) {
        let mut cursor = MemoryCursor::new(
            ["id", "full_name", "age"],
            vec![vec![
                Value::Int(7),
                Value::Text("Ada".to_string()),
                Value::Null,
            ]],
        );
        cursor.advance().unwrap();
        let index = FieldIndex::from_cursor(&cursor);
        (cursor, index)
    }

    #[test]
    fn record_reads_values_by_name_and_ordinal() {
        let (cursor, index) = sample();
        let record = Record::new(&cursor, &index);
        assert_eq!(record.get_i32(0).unwrap(), 7);
        assert_eq!(record.get_named::<String>("fullname").unwrap(), "Ada");
        assert_eq!(record.value_named("missing"), Value::Null);
        assert_eq!(record.value(99), Value::Null);
    }

    #[test]
    fn record_null_reads_default_or_none() {
        let (cursor, index) = sample();
        let record = Record::new(&cursor, &index);
        assert_eq!(record.get_i32(2).unwrap(), 0);
        assert_eq!(record.get::<Option<i32>>(2).unwrap(), None);
    }

    #[test]
    fn record_conversion_error_names_the_field() {
        let (cursor, index) = sample();
        let record = Record::new(&cursor, &index);
        let err = record.get::<i32>(1).unwrap_err();
        match err {
            Error::Binding(b) => assert_eq!(b.field.as_deref(), Some("full_name")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn record_unknown_name_is_argument_error() {
        let (cursor, index) = sample();
        let record = Record::new(&cursor, &index);
        assert!(matches!(
            record.get_named::<i32>("nope"),
            Err(Error::Argument(_))
        ));
    }
}
