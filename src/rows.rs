//! Response bodies → uniform rows of `(field, rendered value)`.

use serde_json::Value;

use crate::error::{OdsqlError, OdsqlResult};
use crate::resolver::Endpoint;

/// One table row; columns keep the order the API sent them in.
pub type Row = Vec<(String, String)>;

/// Dataset attributes shown for plain catalog listings.
pub const CATALOG_COLUMNS: &[&str] = &["dataset_id", "dataset_uid", "has_records", "data_visible"];

/// Schema listing columns, read from each entry of a dataset's `fields`.
pub const SCHEMA_COLUMNS: &[&str] = &["name", "label", "type"];

/// Lazily unwrap the rows of a response body for `endpoint`.
pub fn extract_rows(
    endpoint: Endpoint,
    body: &Value,
) -> OdsqlResult<Box<dyn Iterator<Item = Row> + '_>> {
    let rows: Box<dyn Iterator<Item = Row> + '_> = match endpoint {
        Endpoint::Records => Box::new(list(body, "records")?.iter().map(|item| {
            item.pointer("/record/fields")
                .and_then(Value::as_object)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), render_value(v)))
                        .collect::<Row>()
                })
                .unwrap_or_default()
        })),
        Endpoint::Aggregates | Endpoint::CatalogAggregates => {
            Box::new(list(body, "aggregations")?.iter().map(object_row))
        }
        Endpoint::CatalogDatasets => Box::new(
            list(body, "datasets")?
                .iter()
                .map(|item| pick(item.get("dataset").unwrap_or(&Value::Null), CATALOG_COLUMNS)),
        ),
    };
    Ok(rows)
}

/// Field listing of the single dataset in a catalog response.
pub fn schema_rows(dataset: &str, body: &Value) -> OdsqlResult<Vec<Row>> {
    let entry = list(body, "datasets")?
        .first()
        .ok_or_else(|| OdsqlError::Response(format!("unknown dataset '{}'", dataset)))?;

    let fields = entry
        .pointer("/dataset/fields")
        .and_then(Value::as_array)
        .ok_or_else(|| OdsqlError::Response(format!("dataset '{}' has no fields", dataset)))?;

    Ok(fields.iter().map(|f| pick(f, SCHEMA_COLUMNS)).collect())
}

fn list<'a>(body: &'a Value, key: &str) -> OdsqlResult<&'a Vec<Value>> {
    body.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| OdsqlError::Response(format!("missing '{}' list", key)))
}

fn object_row(item: &Value) -> Row {
    match item.as_object() {
        Some(map) => map.iter().map(|(k, v)| (k.clone(), render_value(v))).collect(),
        None => vec![("value".to_string(), render_value(item))],
    }
}

fn pick(item: &Value, columns: &[&str]) -> Row {
    columns
        .iter()
        .map(|c| (c.to_string(), render_value(item.get(*c).unwrap_or(&Value::Null))))
        .collect()
}

/// Strings unquoted, `null` as `NULL`, everything else as JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => value.to_string(),
    }
}
