//! Search criteria for the GLPI `/search` endpoint.
//!
//! A [`Criteria`] set is an ordered list of rules. It compiles into the
//! `criteria[i][link]=...&criteria[i][itemtype]=...` query fragment GLPI
//! expects, one group of five pairs per rule in insertion order.

use std::fmt;
use std::str::FromStr;

/// Logical operator linking a rule to the rules before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// `AND`
    And,
    /// `AND NOT`
    AndNot,
    /// `OR`
    Or,
    /// Any other operator, passed to GLPI verbatim.
    Other(String),
}

impl Link {
    /// The wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Link::And => "AND",
            Link::AndNot => "AND NOT",
            Link::Or => "OR",
            Link::Other(raw) => raw.as_str(),
        }
    }
}

impl FromStr for Link {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "AND" => Link::And,
            "AND NOT" => Link::AndNot,
            "OR" => Link::Or,
            other => Link::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a rule's value is compared against the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchType {
    /// `contains`
    Contains,
    /// `equals`
    Equals,
    /// `notequals`
    NotEquals,
    /// `lessthan`
    LessThan,
    /// `morethan`
    MoreThan,
    /// `under` (tree dropdowns: the item or any descendant)
    Under,
    /// `notunder`
    NotUnder,
    /// Any other search type, passed to GLPI verbatim.
    Other(String),
}

impl SearchType {
    /// The wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            SearchType::Contains => "contains",
            SearchType::Equals => "equals",
            SearchType::NotEquals => "notequals",
            SearchType::LessThan => "lessthan",
            SearchType::MoreThan => "morethan",
            SearchType::Under => "under",
            SearchType::NotUnder => "notunder",
            SearchType::Other(raw) => raw.as_str(),
        }
    }
}

impl FromStr for SearchType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "contains" => SearchType::Contains,
            "equals" => SearchType::Equals,
            "notequals" => SearchType::NotEquals,
            "lessthan" => SearchType::LessThan,
            "morethan" => SearchType::MoreThan,
            "under" => SearchType::Under,
            "notunder" => SearchType::NotUnder,
            other => SearchType::Other(other.to_string()),
        })
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single search rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    /// Logical operator: `AND`, `AND NOT` or `OR`.
    pub link: Link,

    /// Item type the field belongs to (e.g., `Computer`).
    pub item_type: String,

    /// Numeric search option id of the field.
    pub field: u32,

    /// Comparison to apply.
    pub search_type: SearchType,

    /// Value to compare against.
    pub value: String,
}

impl Criterion {
    /// The five key/value pairs this rule contributes at position `index`.
    fn pairs(&self, index: usize) -> [(String, String); 5] {
        [
            (format!("criteria[{}][link]", index), self.link.to_string()),
            (format!("criteria[{}][itemtype]", index), self.item_type.clone()),
            (format!("criteria[{}][field]", index), self.field.to_string()),
            (
                format!("criteria[{}][searchtype]", index),
                self.search_type.to_string(),
            ),
            (format!("criteria[{}][value]", index), self.value.clone()),
        ]
    }
}

/// Ordered set of search rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    rules: Vec<Criterion>,
}

impl Criteria {
    /// Creates an empty criteria set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one rule.
    pub fn add_rule(
        &mut self,
        link: Link,
        item_type: impl Into<String>,
        field: u32,
        search_type: SearchType,
        value: impl Into<String>,
    ) -> &mut Self {
        self.rules.push(Criterion {
            link,
            item_type: item_type.into(),
            field,
            search_type,
            value: value.into(),
        });
        self
    }

    /// Chaining form of [`Criteria::add_rule`].
    pub fn rule(
        mut self,
        link: Link,
        item_type: impl Into<String>,
        field: u32,
        search_type: SearchType,
        value: impl Into<String>,
    ) -> Self {
        self.add_rule(link, item_type, field, search_type, value);
        self
    }

    /// The rules in application order.
    pub fn rules(&self) -> &[Criterion] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every key/value pair of the compiled query, values unencoded.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.rules
            .iter()
            .enumerate()
            .flat_map(|(index, rule)| rule.pairs(index))
            .collect()
    }

    /// Compiles the rules into a query-string fragment.
    ///
    /// Every pair is prefixed with `&` so the fragment can be appended after
    /// other parameters. Values are percent-encoded; keys are left as-is.
    pub fn compile(&self) -> String {
        self.pairs()
            .into_iter()
            .map(|(key, value)| format!("&{}={}", key, urlencoding::encode(&value)))
            .collect()
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compile())
    }
}
