//! Locally held GLPI items.
//!
//! A [`Record`] wraps the JSON object of one item. Records returned by a
//! search only hold the projected columns and start out
//! [`Hydration::Partial`]; the first read of a missing field fetches the
//! full item once and promotes the record to [`Hydration::Complete`].
//! Records from `get` are complete from the start.
//!
//! A field that is still missing is treated as a relation: reading
//! `locations` looks at `locations_id` and resolves it through the
//! `locations` resource client.
//!
//! Writes only touch local state; [`Record::save`] sends the modified
//! fields as a partial update.

use std::fmt;

use serde_json::{Map, Value};

use crate::criteria::{Criteria, Link, SearchType};
use crate::error::GlpiError;
use crate::registry::ID_FIELD;
use crate::resource::ResourceClient;

/// How much of the item a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// Only the columns a search projected.
    Partial,
    /// The full item, as returned by `GET /{endpoint}/{id}`.
    Complete,
}

/// Result of [`Record::read`].
#[derive(Debug, Clone)]
pub enum Field {
    /// A plain value held by the record.
    Value(Value),
    /// A relation pointing at one item.
    Record(Box<Record>),
    /// A relation pointing at zero or more items.
    Records(Vec<Record>),
}

impl Field {
    /// The plain value, if this is not a relation.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes the field, returning the plain value if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Related records: one, many, or none for a plain value.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Field::Value(_) => Vec::new(),
            Field::Record(record) => vec![*record],
            Field::Records(records) => records,
        }
    }
}

/// The ids held by a `<relation>_id` field.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RelationIds {
    One(u64),
    Many(Vec<u64>),
}

impl RelationIds {
    fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(parse_id)
                .collect::<Option<Vec<_>>>()
                .map(RelationIds::Many),
            other => parse_id(other).map(RelationIds::One),
        }
    }
}

/// Parses an item id given as a JSON number or numeric string.
pub(crate) fn parse_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One GLPI item.
#[derive(Debug, Clone)]
pub struct Record {
    id: Option<u64>,
    fields: Map<String, Value>,
    dirty: Map<String, Value>,
    client: ResourceClient,
    hydration: Hydration,
}

impl Record {
    pub(crate) fn complete(client: ResourceClient, fields: Map<String, Value>) -> Self {
        Self::with_hydration(client, fields, Hydration::Complete)
    }

    pub(crate) fn partial(client: ResourceClient, fields: Map<String, Value>) -> Self {
        Self::with_hydration(client, fields, Hydration::Partial)
    }

    fn with_hydration(client: ResourceClient, fields: Map<String, Value>, hydration: Hydration) -> Self {
        Self {
            id: fields.get("id").and_then(parse_id),
            fields,
            dirty: Map::new(),
            client,
            hydration,
        }
    }

    /// The item id, when known.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// GLPI endpoint / item type of this record.
    pub fn item_type(&self) -> &str {
        self.client.endpoint()
    }

    /// Current hydration state.
    pub fn hydration(&self) -> Hydration {
        self.hydration
    }

    /// Returns true once the record holds the full item.
    pub fn is_complete(&self) -> bool {
        self.hydration == Hydration::Complete
    }

    /// Every value currently held.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Values written since the last save.
    pub fn dirty(&self) -> &Map<String, Value> {
        &self.dirty
    }

    /// The client of this record's resource type.
    pub fn client(&self) -> &ResourceClient {
        &self.client
    }

    /// Returns a held value without any network call.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Reads a field, hydrating or resolving a relation when needed.
    ///
    /// 1. A held value is returned as-is.
    /// 2. A partial record fetches the full item once, then retries.
    /// 3. Otherwise `name` is resolved through its `{name}_id` sibling:
    ///    `0` yields no records, an id yields that record from the `name`
    ///    resource, a list of ids yields the matching records.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::FieldLookup` if neither `name` nor `{name}_id`
    /// exists, `GlpiError::UnknownResource` if no resource type is
    /// registered as `name`, and any error of the underlying calls.
    pub async fn read(&mut self, name: &str) -> Result<Field, GlpiError> {
        if let Some(value) = self.fields.get(name) {
            return Ok(Field::Value(value.clone()));
        }

        if self.refresh().await? {
            if let Some(value) = self.fields.get(name) {
                return Ok(Field::Value(value.clone()));
            }
        }

        self.resolve_relation(name).await
    }

    /// Sets a field locally and marks it for the next save.
    ///
    /// Writing `id` also changes the id this record fetches and saves under.
    pub fn write(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if name == "id" {
            self.id = parse_id(&value);
        }
        self.dirty.insert(name.clone(), value.clone());
        self.fields.insert(name, value);
    }

    /// Fetches the full item if the record is still partial.
    ///
    /// Returns true if a fetch happened. Locally written values are kept.
    /// A failed fetch leaves the record partial and does not use up the one
    /// refetch, so the next read of a missing field tries again.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::MissingId` for a partial record without id.
    pub async fn refresh(&mut self) -> Result<bool, GlpiError> {
        if self.is_complete() {
            return Ok(false);
        }
        let id = self.require_id()?;

        tracing::debug!(endpoint = %self.item_type(), id = id, "Hydrating partial record");

        let full = self.client.get_raw(id).await?;
        for (key, value) in full {
            if !self.dirty.contains_key(&key) {
                self.fields.insert(key, value);
            }
        }
        self.hydration = Hydration::Complete;
        Ok(true)
    }

    /// Sends the written fields as a partial update and clears them.
    ///
    /// Nothing is sent when no field was written.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Api` with GLPI's message if the update is rejected.
    pub async fn save(&mut self) -> Result<(), GlpiError> {
        let id = self.require_id()?;
        if self.dirty.is_empty() {
            tracing::debug!(endpoint = %self.item_type(), id = id, "Nothing to save");
            return Ok(());
        }

        self.client.update(id, &self.dirty).await?;
        self.dirty.clear();
        Ok(())
    }

    async fn resolve_relation(&self, name: &str) -> Result<Field, GlpiError> {
        let sibling = format!("{}_id", name);
        let value = self
            .fields
            .get(&sibling)
            .ok_or_else(|| GlpiError::field_lookup(self.item_type(), name))?;

        let ids = RelationIds::parse(value).ok_or_else(|| GlpiError::InvalidRelation {
            field: sibling.clone(),
            value: value.clone(),
        })?;

        match ids {
            RelationIds::One(0) => Ok(Field::Records(Vec::new())),
            RelationIds::Many(ids) if ids.is_empty() => Ok(Field::Records(Vec::new())),
            RelationIds::One(id) => {
                let target = self.client.glpi().resource(name)?;
                Ok(Field::Record(Box::new(target.get(id).await?)))
            }
            RelationIds::Many(ids) => {
                let target = self.client.glpi().resource(name)?;
                let criteria = ids.iter().fold(Criteria::new(), |criteria, id| {
                    criteria.rule(
                        Link::Or,
                        target.endpoint(),
                        ID_FIELD,
                        SearchType::Equals,
                        id.to_string(),
                    )
                });
                Ok(Field::Records(target.filter(&criteria).await?))
            }
        }
    }

    fn require_id(&self) -> Result<u64, GlpiError> {
        self.id.ok_or_else(|| GlpiError::MissingId {
            item_type: self.item_type().to_string(),
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::resource::Glpi;
    use serde_json::json;

    fn computers() -> ResourceClient {
        let config = Config::new("https://glpi.example.com/apirest.php", "user", "app").unwrap();
        Glpi::new(&config).unwrap().computers().unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_parse_id_accepts_numbers_and_strings() {
        assert_eq!(parse_id(&json!(7)), Some(7));
        assert_eq!(parse_id(&json!("12")), Some(12));
        assert_eq!(parse_id(&json!(-1)), None);
        assert_eq!(parse_id(&json!("HQ")), None);
    }

    #[test]
    fn test_relation_ids_parse() {
        assert_eq!(RelationIds::parse(&json!(0)), Some(RelationIds::One(0)));
        assert_eq!(RelationIds::parse(&json!([3, "5"])), Some(RelationIds::Many(vec![3, 5])));
        assert_eq!(RelationIds::parse(&json!([3, null])), None);
        assert_eq!(RelationIds::parse(&json!({"id": 3})), None);
    }

    #[test]
    fn test_write_updates_fields_and_dirty() {
        let mut record = Record::complete(computers(), object(json!({"id": 4, "name": "pc"})));
        record.write("name", "pc-renamed");
        assert_eq!(record.get("name"), Some(&json!("pc-renamed")));
        assert_eq!(record.dirty().len(), 1);
        assert!(record.dirty().keys().all(|k| record.fields().contains_key(k)));
    }

    #[test]
    fn test_writing_id_retargets_record() {
        let mut record = Record::partial(computers(), Map::new());
        assert_eq!(record.id(), None);
        record.write("id", 9);
        assert_eq!(record.id(), Some(9));
        record.write("id", "HQ");
        assert_eq!(record.id(), None);
        assert_eq!(record.get("id"), Some(&json!("HQ")));
    }

    #[test]
    fn test_id_is_taken_from_fields() {
        let record = Record::partial(computers(), object(json!({"id": "42", "1": "pc"})));
        assert_eq!(record.id(), Some(42));
        assert_eq!(record.hydration(), Hydration::Partial);
        assert_eq!(record.item_type(), "Computer");
    }

    #[test]
    fn test_display_is_json() {
        let record = Record::complete(computers(), object(json!({"id": 1})));
        assert_eq!(record.to_string(), r#"{"id":1}"#);
    }

    #[tokio::test]
    async fn test_read_missing_field_on_complete_record_is_lookup_error() {
        let mut record = Record::complete(computers(), object(json!({"id": 1})));
        let err = record.read("locations").await.unwrap_err();
        assert!(matches!(err, GlpiError::FieldLookup { .. }));
    }

    #[tokio::test]
    async fn test_zero_relation_is_empty_without_network() {
        let mut record =
            Record::complete(computers(), object(json!({"id": 1, "locations_id": 0})));
        let field = record.read("locations").await.unwrap();
        assert!(matches!(field, Field::Records(ref r) if r.is_empty()));
        assert!(!record.client().glpi().gateway().is_authenticated());
    }

    #[tokio::test]
    async fn test_save_without_id_fails() {
        let mut record = Record::partial(computers(), Map::new());
        record.write("name", "x");
        assert!(matches!(record.save().await, Err(GlpiError::MissingId { .. })));
    }

    #[tokio::test]
    async fn test_save_without_changes_skips_network() {
        let mut record = Record::complete(computers(), object(json!({"id": 1})));
        record.save().await.unwrap();
        assert!(!record.client().glpi().gateway().is_authenticated());
    }
}
