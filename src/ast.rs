//! Structured query types produced by the extractor.

use serde::Serialize;
use std::fmt;

/// The literal `from` value that targets the dataset catalog.
pub const CATALOG_DOMAIN: &str = "catalog";

/// Sentinel name for `show` without an option name.
pub const ALL_OPTIONS: &str = "all";

/// One parsed statement: either a data query or a meta-command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    Data(DataQuery),
    Meta(MetaCommand),
}

/// A `select ... from ...` query split into its clauses.
///
/// Free-text clauses hold the exact source text of the clause, so the API
/// sees what the operator typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataQuery {
    pub select: String,
    pub from: String,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    pub has_aggregate: bool,
}

impl DataQuery {
    /// A `select * from <from>` query with every optional clause unset.
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            select: "*".to_string(),
            from: from.into(),
            where_clause: None,
            group_by: None,
            order_by: None,
            limit: None,
            offset: None,
            has_aggregate: false,
        }
    }

    pub fn is_catalog(&self) -> bool {
        self.from == CATALOG_DOMAIN
    }
}

impl Default for DataQuery {
    fn default() -> Self {
        Self::new("")
    }
}

/// CLI directives handled without a data request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaCommand {
    SetOption { name: String, value: OptionValue },
    /// Option name, or [`ALL_OPTIONS`].
    ShowOption(String),
    SchemaLookup(String),
}

/// Value of a session option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    String(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(n) => write!(f, "{}", n),
            OptionValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::String(v)
    }
}
