//! One statement cycle: parse, resolve, fetch, unwrap rows.

use crate::ast::{CATALOG_DOMAIN, DataQuery, MetaCommand, Statement};
use crate::client::Transport;
use crate::error::OdsqlResult;
use crate::options::OptionStore;
use crate::resolver::{EndpointDecision, resolve};
use crate::rows::{Row, extract_rows, schema_rows};

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Rows fetched with `decision`.
    Rows {
        decision: EndpointDecision,
        rows: Vec<Row>,
    },
    /// Option listing or confirmation.
    Message(String),
}

/// An interactive session: option store plus API transport.
pub struct Session<T> {
    transport: T,
    options: OptionStore,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, options: OptionStore) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &OptionStore {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one statement. Errors leave the session as it was.
    pub async fn execute(&mut self, text: &str) -> OdsqlResult<Output> {
        match crate::parse_statement(text)? {
            Statement::Meta(MetaCommand::SetOption { name, value }) => {
                self.options.set(&name, value)?;
                Ok(Output::Message(format!("{} = {}", name, self.options.get(&name))))
            }
            Statement::Meta(MetaCommand::ShowOption(name)) => {
                Ok(Output::Message(self.options.describe(&name)?))
            }
            Statement::Meta(MetaCommand::SchemaLookup(dataset)) => {
                let decision = resolve(&schema_query(&dataset), &self.options);
                let body = self.transport.fetch(&decision).await?;
                let rows = schema_rows(&dataset, &body)?;
                Ok(Output::Rows { decision, rows })
            }
            Statement::Data(query) => {
                let decision = resolve(&query, &self.options);
                tracing::debug!(endpoint = %decision.endpoint, path = %decision.path(), "resolved");
                let body = self.transport.fetch(&decision).await?;
                let rows = extract_rows(decision.endpoint, &body)?.collect();
                Ok(Output::Rows { decision, rows })
            }
        }
    }
}

/// The catalog query behind `describe <dataset>`.
pub fn schema_query(dataset: &str) -> DataQuery {
    let escaped = dataset.replace('\\', "\\\\").replace('\'', "\\'");
    DataQuery {
        where_clause: Some(format!("dataset_id = '{}'", escaped)),
        limit: Some(1),
        ..DataQuery::new(CATALOG_DOMAIN)
    }
}
