//! # ODSQL: SQL-like queries for the Explore API v2
//!
//! Turns statements such as
//!
//! ```text
//! select city, count(*) as n from sales where region = 'EU' group by city limit 10
//! ```
//!
//! into the endpoint and query-string parameters the API expects. Clause
//! text is forwarded exactly as typed; the API parses it again on its side.
//!
//! ## Pipeline
//!
//! | Stage      | Module       | Output                    |
//! |------------|--------------|---------------------------|
//! | Tokenize   | [`lexer`]    | `Vec<Token>` with spans   |
//! | Parse      | [`parser`]   | [`parser::ParseNode`]     |
//! | Extract    | [`extract`]  | [`ast::Statement`]        |
//! | Resolve    | [`resolver`] | [`resolver::EndpointDecision`] |
//!
//! ## Quick Example
//!
//! ```
//! use odsql::prelude::*;
//!
//! let plan = odsql::explain("select count(*) from catalog group by theme", &OptionStore::new()).unwrap();
//! let decision = plan.decision.unwrap();
//! assert_eq!(decision.endpoint, Endpoint::CatalogAggregates);
//! assert_eq!(decision.parameter("group_by"), Some("theme"));
//! ```

pub mod ast;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod render;
pub mod repl;
pub mod resolver;
pub mod rows;
pub mod session;

use serde::Serialize;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::client::{Credentials, HttpTransport, Transport};
    pub use crate::error::*;
    pub use crate::options::OptionStore;
    pub use crate::resolver::{Endpoint, EndpointDecision, resolve};
    pub use crate::session::{Output, Session};
    pub use crate::{Plan, explain, parse_statement};
}

/// Parse one statement into its structured form.
///
/// # Example
///
/// ```
/// use odsql::ast::Statement;
///
/// let Statement::Data(q) = odsql::parse_statement("select * from `my-set` limit 5").unwrap() else {
///     panic!("not a data query");
/// };
/// assert_eq!(q.from, "my-set");
/// assert_eq!(q.limit, Some(5));
/// ```
pub fn parse_statement(text: &str) -> error::OdsqlResult<ast::Statement> {
    let tree = parser::parse(text)?;
    Ok(extract::extract(&tree, text))
}

/// A statement and, for data queries, where it would be sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub statement: ast::Statement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<resolver::EndpointDecision>,
}

/// Parse and resolve without contacting the API.
pub fn explain(text: &str, options: &options::OptionStore) -> error::OdsqlResult<Plan> {
    let statement = parse_statement(text)?;
    let decision = match &statement {
        ast::Statement::Data(q) => Some(resolver::resolve(q, options)),
        ast::Statement::Meta(ast::MetaCommand::SchemaLookup(dataset)) => {
            Some(resolver::resolve(&session::schema_query(dataset), options))
        }
        ast::Statement::Meta(_) => None,
    };
    Ok(Plan {
        statement,
        decision,
    })
}
