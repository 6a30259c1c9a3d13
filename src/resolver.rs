//! Endpoint resolution.
//!
//! Decides which Explore API operation a [`DataQuery`] maps to and how its
//! clauses become query-string parameters. Pure: same inputs, same decision.

use serde::Serialize;
use std::fmt;

use crate::ast::DataQuery;
use crate::options::OptionStore;

/// Placeholder spliced with the dataset identifier in dataset-domain paths.
pub const DATASET_PLACEHOLDER: &str = "{dataset}";

/// The four logical API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Records,
    Aggregates,
    CatalogDatasets,
    CatalogAggregates,
}

impl Endpoint {
    pub fn path_template(self) -> &'static str {
        match self {
            Endpoint::Records => "catalog/datasets/{dataset}/records",
            Endpoint::Aggregates => "catalog/datasets/{dataset}/aggregates",
            Endpoint::CatalogDatasets => "catalog/datasets",
            Endpoint::CatalogAggregates => "catalog/aggregates",
        }
    }

    pub fn is_catalog(self) -> bool {
        matches!(self, Endpoint::CatalogDatasets | Endpoint::CatalogAggregates)
    }

    pub fn is_aggregating(self) -> bool {
        matches!(self, Endpoint::Aggregates | Endpoint::CatalogAggregates)
    }

    /// The two endpoint families name the ordering parameter differently.
    pub fn order_parameter(self) -> &'static str {
        if self.is_aggregating() { "order_by" } else { "sort" }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Endpoint::Records => "records",
            Endpoint::Aggregates => "aggregates",
            Endpoint::CatalogDatasets => "catalog/datasets",
            Endpoint::CatalogAggregates => "catalog/aggregates",
        };
        write!(f, "{}", name)
    }
}

/// Where a query goes and with which parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointDecision {
    pub endpoint: Endpoint,
    /// Query-string parameters, in request order.
    pub parameters: Vec<(String, String)>,
    pub path_template: String,
    /// Dataset identifier to splice into the path, for dataset-domain endpoints.
    pub dataset: Option<String>,
}

impl EndpointDecision {
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Path segments relative to the API root, dataset spliced in.
    pub fn path_segments(&self) -> Vec<&str> {
        self.path_template
            .split('/')
            .map(|segment| match (&self.dataset, segment) {
                (Some(dataset), DATASET_PLACEHOLDER) => dataset.as_str(),
                _ => segment,
            })
            .collect()
    }

    /// Path relative to the API root, dataset spliced in (unencoded).
    pub fn path(&self) -> String {
        self.path_segments().join("/")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Dataset,
    Catalog,
}

/// Map a data query to its endpoint and request parameters.
pub fn resolve(q: &DataQuery, options: &OptionStore) -> EndpointDecision {
    let domain = if q.is_catalog() {
        Domain::Catalog
    } else {
        Domain::Dataset
    };

    let promote = q.group_by.is_some() || (q.has_aggregate && !options.force_records());

    let endpoint = match (domain, promote) {
        (Domain::Dataset, false) => Endpoint::Records,
        (Domain::Dataset, true) => Endpoint::Aggregates,
        (Domain::Catalog, false) => Endpoint::CatalogDatasets,
        (Domain::Catalog, true) => Endpoint::CatalogAggregates,
    };

    let mut parameters = vec![("select".to_string(), q.select.clone())];
    let mut push = |name: &str, value: Option<String>| {
        if let Some(value) = value {
            parameters.push((name.to_string(), value));
        }
    };
    push("where", q.where_clause.clone());
    push("rows", q.limit.map(|n| n.to_string()));
    push("start", q.offset.map(|n| n.to_string()));
    push("group_by", q.group_by.clone());
    push(endpoint.order_parameter(), q.order_by.clone());
    push("timezone", Some(options.timezone()));

    EndpointDecision {
        endpoint,
        parameters,
        path_template: endpoint.path_template().to_string(),
        dataset: match domain {
            Domain::Dataset => Some(q.from.clone()),
            Domain::Catalog => None,
        },
    }
}
