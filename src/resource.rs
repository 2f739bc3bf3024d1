//! Per-type entry points into the GLPI REST API.
//!
//! [`Glpi`] is the top-level handle: it owns the shared session gateway and
//! the resource registry. [`ResourceClient`] is a cheap view onto one
//! resource type, offering `get`, `filter` and `all`.
//!
//! # Example
//!
//! ```ignore
//! let glpi = Glpi::new(&Config::from_env()?)?;
//!
//! let printers = glpi.computers()?.filter_by(&[("name", "printer")]).await?;
//! for mut computer in printers {
//!     let location = computer.read("locations").await?;
//!     println!("{} -> {:?}", computer, location);
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::criteria::{Criteria, Link, SearchType};
use crate::error::{error_array_message, GlpiError};
use crate::record::Record;
use crate::registry::{default_resources, Registry, ResourceSpec};
use crate::session::{Body, SessionGateway};

/// Rows requested from the search endpoint; GLPI is never asked for more.
pub const SEARCH_RANGE: &str = "0-1000";

/// Top-level GLPI client.
///
/// Cloning is cheap: every clone shares one session and one registry.
#[derive(Clone)]
pub struct Glpi {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    gateway: SessionGateway,
    registry: Registry,
}

impl Glpi {
    /// Creates a client with the default resource types.
    ///
    /// No network call is made until the first request.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, GlpiError> {
        Self::builder(config).build()
    }

    /// Starts building a client with custom resource types.
    pub fn builder(config: &Config) -> GlpiBuilder {
        GlpiBuilder {
            config: config.clone(),
            resources: default_resources(),
        }
    }

    /// Returns the client for a resource type.
    ///
    /// `name` is the logical name (`computers`); an endpoint name
    /// (`Computer`, `computer`) is accepted as a fallback.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::UnknownResource` if nothing is registered under `name`.
    pub fn resource(&self, name: &str) -> Result<ResourceClient, GlpiError> {
        let spec = self
            .inner
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| GlpiError::UnknownResource {
                name: name.to_string(),
            })?;
        Ok(ResourceClient {
            glpi: self.clone(),
            spec,
        })
    }

    /// Tickets (`Ticket`).
    pub fn tickets(&self) -> Result<ResourceClient, GlpiError> {
        self.resource("tickets")
    }

    /// Computers (`Computer`).
    pub fn computers(&self) -> Result<ResourceClient, GlpiError> {
        self.resource("computers")
    }

    /// Statuses (`State`).
    pub fn states(&self) -> Result<ResourceClient, GlpiError> {
        self.resource("states")
    }

    /// Locations (`Location`).
    pub fn locations(&self) -> Result<ResourceClient, GlpiError> {
        self.resource("locations")
    }

    /// The shared session gateway.
    pub fn gateway(&self) -> &SessionGateway {
        &self.inner.gateway
    }

    /// The resource registry.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }
}

impl fmt::Debug for Glpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Glpi")
            .field("gateway", &self.inner.gateway)
            .field("resources", &self.inner.registry.names())
            .finish()
    }
}

/// Builder for [`Glpi`].
#[derive(Debug)]
pub struct GlpiBuilder {
    config: Config,
    resources: Vec<ResourceSpec>,
}

impl GlpiBuilder {
    /// Registers a resource type, replacing any with the same name.
    pub fn resource(mut self, spec: ResourceSpec) -> Self {
        self.resources.push(spec);
        self
    }

    /// Drops the default resource types.
    pub fn without_defaults(mut self) -> Self {
        self.resources.clear();
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::HttpClient` if the HTTP client fails to initialize.
    pub fn build(self) -> Result<Glpi, GlpiError> {
        let gateway = SessionGateway::new(&self.config)?;
        Ok(Glpi {
            inner: Arc::new(Inner {
                gateway,
                registry: Registry::new(self.resources),
            }),
        })
    }
}

/// Body of a `/search/{endpoint}/` response.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    count: u64,

    #[serde(default)]
    totalcount: Option<u64>,

    #[serde(default)]
    data: Vec<Map<String, Value>>,
}

/// Client for one resource type.
#[derive(Clone)]
pub struct ResourceClient {
    glpi: Glpi,
    spec: Arc<ResourceSpec>,
}

impl ResourceClient {
    /// The resource type this client serves.
    pub fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    /// GLPI endpoint / item type (e.g., `Computer`).
    pub fn endpoint(&self) -> &str {
        self.spec.endpoint()
    }

    /// The top-level client this resource belongs to.
    pub fn glpi(&self) -> &Glpi {
        &self.glpi
    }

    /// Fetches the full JSON object of one item without wrapping it.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Api` with GLPI's message if the item cannot be read.
    pub async fn get_raw(&self, id: u64) -> Result<Map<String, Value>, GlpiError> {
        let path = format!("/{}/{}", self.endpoint(), id);
        match self.glpi.gateway().request(Method::GET, &path, Body::Empty).await? {
            Value::Object(map) => {
                self.glpi.registry().observe_fields(self.endpoint(), map.keys());
                Ok(map)
            }
            Value::Array(items) => Err(GlpiError::api(error_array_message(&items))),
            other => Err(GlpiError::api(format!(
                "unexpected response for {}: {}",
                path, other
            ))),
        }
    }

    /// Fetches one item as a complete record.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Api` with GLPI's message if the item cannot be read.
    pub async fn get(&self, id: u64) -> Result<Record, GlpiError> {
        let fields = self.get_raw(id).await?;
        Ok(Record::complete(self.clone(), fields))
    }

    /// Searches with explicit criteria, returning partial records.
    ///
    /// An empty criteria set returns every item (see [`ResourceClient::all`]).
    /// At most the first 1000 matches are returned.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Api` if GLPI rejects the search.
    pub async fn filter(&self, criteria: &Criteria) -> Result<Vec<Record>, GlpiError> {
        let path = self.search_path(criteria);
        let value = self.glpi.gateway().request(Method::GET, &path, Body::Empty).await?;

        if let Value::Array(items) = &value {
            return Err(GlpiError::api(error_array_message(items)));
        }
        let response: SearchResponse = serde_json::from_value(value)?;

        if response.count == 0 {
            return Ok(Vec::new());
        }

        if let Some(total) = response.totalcount {
            if total > response.data.len() as u64 {
                tracing::warn!(
                    endpoint = %self.endpoint(),
                    total = total,
                    returned = response.data.len(),
                    "Search matched more items than were returned"
                );
            }
        }

        let records = response
            .data
            .into_iter()
            .map(|row| {
                let row = self.name_columns(row);
                self.glpi.registry().observe_fields(self.endpoint(), row.keys());
                Record::partial(self.clone(), row)
            })
            .collect();

        Ok(records)
    }

    /// Searches by semantic field names, ANDing one `contains` rule per pair.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::UnknownSearchField` if a name has no field map entry.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let hits = glpi.computers()?.filter_by(&[("name", "printer")]).await?;
    /// ```
    pub async fn filter_by(&self, fields: &[(&str, &str)]) -> Result<Vec<Record>, GlpiError> {
        let criteria = self.criteria_for(fields)?;
        self.filter(&criteria).await
    }

    /// Returns every item of this type (first 1000).
    pub async fn all(&self) -> Result<Vec<Record>, GlpiError> {
        self.filter(&Criteria::new()).await
    }

    /// Sends `{"input": fields}` as a partial update of one item.
    pub(crate) async fn update(&self, id: u64, fields: &Map<String, Value>) -> Result<(), GlpiError> {
        let path = format!("/{}/{}", self.endpoint(), id);
        let body = Body::Json(serde_json::json!({ "input": fields }));

        let value = self.glpi.gateway().request(Method::PUT, &path, body).await?;
        if let Value::Array(items) = &value {
            match items.first() {
                Some(Value::Object(status)) => {
                    let message = status.get("message").and_then(Value::as_str).unwrap_or("");
                    if !message.is_empty() {
                        return Err(GlpiError::api(message));
                    }
                }
                Some(Value::String(_)) => return Err(GlpiError::api(error_array_message(items))),
                _ => {}
            }
        }
        Ok(())
    }

    /// Builds `contains` rules from semantic field names.
    fn criteria_for(&self, fields: &[(&str, &str)]) -> Result<Criteria, GlpiError> {
        let mut criteria = Criteria::new();
        for (name, value) in fields {
            let field = self
                .spec
                .field_id(name)
                .ok_or_else(|| GlpiError::UnknownSearchField {
                    item_type: self.endpoint().to_string(),
                    field: name.to_string(),
                })?;
            criteria.add_rule(Link::And, self.endpoint(), field, SearchType::Contains, *value);
        }
        Ok(criteria)
    }

    fn search_path(&self, criteria: &Criteria) -> String {
        format!(
            "/search/{}/?expand_dropdowns=true&range={}{}{}",
            self.endpoint(),
            SEARCH_RANGE,
            criteria.compile(),
            self.forced_display()
        )
    }

    /// `&forcedisplay[i]=<id>` for every field id in the field map.
    fn forced_display(&self) -> String {
        self.spec
            .field_ids()
            .into_iter()
            .enumerate()
            .map(|(index, id)| format!("&forcedisplay[{}]={}", index, id))
            .collect()
    }

    /// Copies numeric-keyed search columns under their semantic names.
    fn name_columns(&self, mut row: Map<String, Value>) -> Map<String, Value> {
        for (name, id) in self.spec.fields() {
            if let Some(value) = row.get(&id.to_string()).cloned() {
                row.insert(name.clone(), value);
            }
        }
        row
    }
}

impl fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClient")
            .field("name", &self.spec.name())
            .field("endpoint", &self.spec.endpoint())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn test_glpi() -> Glpi {
        let config = Config::new("https://glpi.example.com/apirest.php", "user", "app").unwrap();
        Glpi::new(&config).unwrap()
    }

    #[test]
    fn test_resource_lookup() {
        let glpi = test_glpi();
        assert_eq!(glpi.tickets().unwrap().endpoint(), "Ticket");
        assert_eq!(glpi.resource("Location").unwrap().endpoint(), "Location");
        assert!(matches!(
            glpi.resource("printers"),
            Err(GlpiError::UnknownResource { .. })
        ));
    }

    #[test]
    fn test_builder_registers_custom_resource() {
        let config = Config::new("https://glpi.example.com", "user", "app").unwrap();
        let glpi = Glpi::builder(&config)
            .without_defaults()
            .resource(ResourceSpec::new("printers", "Printer").with_field("serial", 5))
            .build()
            .unwrap();
        assert!(glpi.tickets().is_err());
        assert_eq!(glpi.resource("printers").unwrap().spec().field_id("serial"), Some(5));
    }

    #[test]
    fn test_search_path_shape() {
        let locations = test_glpi().locations().unwrap();
        let criteria = Criteria::new().rule(Link::And, "Location", 1, SearchType::Contains, "hq");
        assert_eq!(
            locations.search_path(&criteria),
            "/search/Location/?expand_dropdowns=true&range=0-1000\
             &criteria[0][link]=AND&criteria[0][itemtype]=Location&criteria[0][field]=1\
             &criteria[0][searchtype]=contains&criteria[0][value]=hq\
             &forcedisplay[0]=1&forcedisplay[1]=2&forcedisplay[2]=80"
        );
    }

    #[test]
    fn test_criteria_for_unknown_field() {
        let tickets = test_glpi().tickets().unwrap();
        let err = tickets.criteria_for(&[("colour", "red")]).unwrap_err();
        assert!(matches!(err, GlpiError::UnknownSearchField { ref field, .. } if field == "colour"));
    }

    #[test]
    fn test_criteria_for_uses_field_map() {
        let tickets = test_glpi().tickets().unwrap();
        let criteria = tickets.criteria_for(&[("urgency", "5"), ("name", "vpn")]).unwrap();
        let rules = criteria.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].field, 3);
        assert_eq!(rules[1].field, 1);
        assert!(rules.iter().all(|r| r.link == Link::And && r.search_type == SearchType::Contains));
    }

    #[test]
    fn test_name_columns_copies_known_ids() {
        let computers = test_glpi().computers().unwrap();
        let row = json!({"1": "pc-01", "2": 17, "31": "In use", "999": "x"});
        let Value::Object(row) = row else { unreachable!() };
        let row = computers.name_columns(row);
        assert_eq!(row["name"], "pc-01");
        assert_eq!(row["id"], 17);
        assert_eq!(row["status_name"], "In use");
        assert_eq!(row["999"], "x");
        assert!(!row.contains_key("model_name"));
    }
}
