//! Resource types known to the client.
//!
//! Each resource type has a logical name (`computers`), the GLPI endpoint
//! it maps to (`Computer`), and a field map translating semantic field
//! names into GLPI search option ids. Every field map starts from the
//! common entries shared by all item types.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

/// Semantic field name → GLPI search option id.
pub type FieldMap = BTreeMap<String, u32>;

/// Search option id of the `id` field, identical for every item type.
pub const ID_FIELD: u32 = 2;

/// Fields shared by every item type.
pub const COMMON_FIELDS: &[(&str, u32)] = &[("name", 1), ("id", ID_FIELD), ("entity_name", 80)];

const TICKET_FIELDS: &[(&str, u32)] = &[("urgency", 3), ("users_id_recipient", 4)];

const COMPUTER_FIELDS: &[(&str, u32)] = &[
    ("location_complete_name", 3),
    ("otherserial", 6),
    ("status_name", 31),
    ("model_name", 40),
    ("mac_address", 21),
];

/// Static description of one resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    name: String,
    endpoint: String,
    fields: FieldMap,
}

impl ResourceSpec {
    /// Creates a resource type carrying only the common fields.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            fields: COMMON_FIELDS
                .iter()
                .map(|(field, id)| (field.to_string(), *id))
                .collect(),
        }
    }

    /// Adds a per-type field, replacing a common entry of the same name.
    pub fn with_field(mut self, name: impl Into<String>, id: u32) -> Self {
        self.fields.insert(name.into(), id);
        self
    }

    /// Adds several per-type fields.
    pub fn with_fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        fields
            .into_iter()
            .fold(self, |spec, (name, id)| spec.with_field(name, id))
    }

    /// Logical name (e.g., `tickets`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// GLPI endpoint / item type (e.g., `Ticket`).
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The merged field map.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Search option id for a semantic field name.
    pub fn field_id(&self, name: &str) -> Option<u32> {
        self.fields.get(name).copied()
    }

    /// Distinct search option ids, in ascending order.
    pub fn field_ids(&self) -> BTreeSet<u32> {
        self.fields.values().copied().collect()
    }
}

/// The resource types the client ships with.
pub fn default_resources() -> Vec<ResourceSpec> {
    vec![
        ResourceSpec::new("tickets", "Ticket").with_fields(TICKET_FIELDS.iter().copied()),
        ResourceSpec::new("computers", "Computer").with_fields(COMPUTER_FIELDS.iter().copied()),
        ResourceSpec::new("states", "State"),
        ResourceSpec::new("locations", "Location"),
    ]
}

/// Registered resource types plus every field name seen per endpoint.
///
/// The set of resource types is fixed at construction; the field catalog
/// grows as records are fetched.
#[derive(Debug)]
pub struct Registry {
    resources: BTreeMap<String, Arc<ResourceSpec>>,
    catalog: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl Registry {
    /// Builds a registry. A later spec with the same name replaces an earlier one.
    pub fn new(specs: impl IntoIterator<Item = ResourceSpec>) -> Self {
        let resources = specs
            .into_iter()
            .map(|spec| (spec.name.clone(), Arc::new(spec)))
            .collect();
        Self {
            resources,
            catalog: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up a resource type by logical name, falling back to a
    /// case-insensitive endpoint match.
    ///
    /// When several resource types share an endpoint, the fallback returns
    /// the one whose logical name sorts first.
    pub fn get(&self, name: &str) -> Option<&Arc<ResourceSpec>> {
        self.resources.get(name).or_else(|| {
            self.resources
                .values()
                .find(|spec| spec.endpoint.eq_ignore_ascii_case(name))
        })
    }

    /// Logical names of every registered resource type, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Records field names observed on a row of `endpoint`.
    pub fn observe_fields<'a>(&self, endpoint: &str, names: impl IntoIterator<Item = &'a String>) {
        let mut catalog = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);
        catalog
            .entry(endpoint.to_string())
            .or_default()
            .extend(names.into_iter().cloned());
    }

    /// Every field name seen so far for `endpoint`, sorted.
    pub fn known_fields(&self, endpoint: &str) -> Vec<String> {
        let catalog = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);
        catalog
            .get(endpoint)
            .map(|fields| fields.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(default_resources())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_fields_always_present() {
        let spec = ResourceSpec::new("states", "State");
        assert_eq!(spec.field_id("name"), Some(1));
        assert_eq!(spec.field_id("id"), Some(2));
        assert_eq!(spec.field_id("entity_name"), Some(80));
        assert_eq!(spec.fields().len(), 3);
    }

    #[test]
    fn test_per_type_fields_merge_on_top() {
        let spec = ResourceSpec::new("printers", "Printer")
            .with_field("serial", 5)
            .with_field("name", 100);
        assert_eq!(spec.field_id("serial"), Some(5));
        assert_eq!(spec.field_id("name"), Some(100));
        assert_eq!(spec.field_id("entity_name"), Some(80));
    }

    #[test]
    fn test_field_ids_are_distinct() {
        let spec = ResourceSpec::new("x", "X").with_field("alias", 1);
        assert_eq!(spec.field_ids().into_iter().collect::<Vec<_>>(), vec![1, 2, 80]);
    }

    #[test]
    fn test_default_computer_fields() {
        let registry = Registry::default();
        let computers = registry.get("computers").unwrap();
        assert_eq!(computers.endpoint(), "Computer");
        assert_eq!(computers.field_id("status_name"), Some(31));
        assert_eq!(computers.fields().len(), 8);
        assert_eq!(registry.names(), vec!["computers", "locations", "states", "tickets"]);
    }

    #[test]
    fn test_lookup_falls_back_to_endpoint() {
        let registry = Registry::default();
        assert_eq!(registry.get("location").unwrap().name(), "locations");
        assert_eq!(registry.get("Ticket").unwrap().name(), "tickets");
        assert!(registry.get("printers").is_none());
    }

    #[test]
    fn test_shared_endpoint_fallback_is_deterministic() {
        let registry = Registry::new([
            ResourceSpec::new("sites", "Location"),
            ResourceSpec::new("buildings", "Location"),
            ResourceSpec::new("rooms", "Location"),
        ]);
        for _ in 0..8 {
            assert_eq!(registry.get("location").unwrap().name(), "buildings");
        }
        assert_eq!(registry.get("sites").unwrap().name(), "sites");
    }

    #[test]
    fn test_field_catalog_accumulates() {
        let registry = Registry::default();
        let first = ["name".to_string(), "id".to_string()];
        let second = ["serial".to_string(), "id".to_string()];
        registry.observe_fields("Computer", first.iter());
        registry.observe_fields("Computer", second.iter());
        assert_eq!(registry.known_fields("Computer"), vec!["id", "name", "serial"]);
        assert!(registry.known_fields("Ticket").is_empty());
    }
}
