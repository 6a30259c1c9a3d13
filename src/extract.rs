//! Parse tree → [`Statement`].
//!
//! One walk over the tree; each clause node fills the matching field. The
//! tree must come from [`crate::parser::parse`]: grammar invariants are
//! trusted here, not re-checked.

use crate::ast::{ALL_OPTIONS, DataQuery, MetaCommand, OptionValue, Statement};
use crate::lexer::TokenKind;
use crate::parser::{ParseNode, Rule};

/// Extract the structured statement from a parse tree of `source`.
///
/// # Panics
///
/// Panics if `tree` was not produced by the parser for `source`.
pub fn extract(tree: &ParseNode, source: &str) -> Statement {
    match tree.rule {
        Rule::DataQuery => {
            let mut walker = DataQueryWalker {
                source,
                query: DataQuery::default(),
                in_select: false,
            };
            walker.visit(tree);
            Statement::Data(walker.query)
        }
        Rule::SetOption => {
            let [name, value] = tree.children.as_slice() else {
                panic!("set node must have a name and a value");
            };
            Statement::Meta(MetaCommand::SetOption {
                name: name.text(source).to_string(),
                value: literal_value(value, source),
            })
        }
        Rule::ShowOption => {
            let name = tree
                .children
                .first()
                .map_or(ALL_OPTIONS, |n| n.text(source));
            Statement::Meta(MetaCommand::ShowOption(name.to_string()))
        }
        Rule::SchemaLookup => {
            let table = tree
                .child(Rule::Table)
                .expect("schema lookup node always has a table");
            Statement::Meta(MetaCommand::SchemaLookup(
                strip_backticks(table.text(source)).to_string(),
            ))
        }
        other => panic!("not a statement node: {:?}", other),
    }
}

struct DataQueryWalker<'s> {
    source: &'s str,
    query: DataQuery,
    in_select: bool,
}

impl DataQueryWalker<'_> {
    fn visit(&mut self, node: &ParseNode) {
        let text = node.text(self.source);
        match node.rule {
            Rule::SelectList => {
                self.query.select = text.to_string();
                self.in_select = true;
                self.visit_children(node);
                self.in_select = false;
                return;
            }
            Rule::Table => self.query.from = strip_backticks(text).to_string(),
            Rule::Condition => self.query.where_clause = Some(text.to_string()),
            Rule::GroupBy => self.query.group_by = Some(text.to_string()),
            Rule::OrderBy => self.query.order_by = Some(text.to_string()),
            Rule::Limit => self.query.limit = Some(parse_count(text)),
            Rule::Offset => self.query.offset = Some(parse_count(text)),
            Rule::AggregateCall if self.in_select => self.query.has_aggregate = true,
            _ => {}
        }
        self.visit_children(node);
    }

    fn visit_children(&mut self, node: &ParseNode) {
        for child in &node.children {
            self.visit(child);
        }
    }
}

fn parse_count(text: &str) -> u64 {
    text.parse()
        .expect("parser only accepts limit/offset literals that fit in u64")
}

/// `set` value: integer literal as-is, string literal without its quotes.
fn literal_value(node: &ParseNode, source: &str) -> OptionValue {
    let text = node.text(source);
    match node.rule {
        Rule::Token(TokenKind::Integer) => OptionValue::Int(
            text.parse()
                .expect("parser only accepts set literals that fit in i64"),
        ),
        Rule::Token(TokenKind::String) => OptionValue::String(text[1..text.len() - 1].to_string()),
        other => panic!("not a set value: {:?}", other),
    }
}

fn strip_backticks(text: &str) -> &str {
    text.strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn data(src: &str) -> DataQuery {
        match extract(&parse(src).unwrap(), src) {
            Statement::Data(q) => q,
            other => panic!("expected a data query, got {other:?}"),
        }
    }

    fn meta(src: &str) -> MetaCommand {
        match extract(&parse(src).unwrap(), src) {
            Statement::Meta(m) => m,
            other => panic!("expected a meta-command, got {other:?}"),
        }
    }

    #[test]
    fn test_scenario_records_query() {
        let q = data("select * from sales where region='EU' limit 10 offset 5;");
        assert_eq!(
            q,
            DataQuery {
                select: "*".to_string(),
                from: "sales".to_string(),
                where_clause: Some("region='EU'".to_string()),
                group_by: None,
                order_by: None,
                limit: Some(10),
                offset: Some(5),
                has_aggregate: false,
            }
        );
    }

    #[test]
    fn test_verbatim_preservation() {
        let q = data("select Count(*) as n from `my-set` where status='A' AND size > 3");
        assert_eq!(q.select, "Count(*) as n");
        assert_eq!(q.from, "my-set");
        assert_eq!(q.where_clause.as_deref(), Some("status='A' AND size > 3"));
        assert!(q.has_aggregate);
    }

    #[test]
    fn test_implicit_star() {
        let q = data("select from sales");
        assert_eq!(q.select, "*");
        assert!(!q.has_aggregate);
    }

    #[test]
    fn test_catalog_group_by() {
        let q = data("select count(*) from catalog group by theme;");
        assert_eq!(q.from, "catalog");
        assert_eq!(q.group_by.as_deref(), Some("theme"));
        assert!(q.has_aggregate);
        assert!(q.is_catalog());
    }

    #[test]
    fn test_aggregate_outside_select_is_ignored() {
        let q = data("select city from t group by city order by count(*) desc");
        assert!(!q.has_aggregate);
        assert_eq!(q.order_by.as_deref(), Some("count(*) desc"));
    }

    #[test]
    fn test_aggregate_after_plain_column_sticks() {
        let q = data("select max(price), city, upper(name) from t");
        assert!(q.has_aggregate);
    }

    #[test]
    fn test_unset_clauses_stay_unset() {
        let q = data("select a from t");
        assert_eq!(q.limit, None);
        assert_eq!(q.offset, None);
        assert_eq!(q.where_clause, None);
        assert_eq!(q.group_by, None);
        assert_eq!(q.order_by, None);
    }

    #[test]
    fn test_limit_zero_is_kept() {
        assert_eq!(data("select a from t limit 0").limit, Some(0));
    }

    #[test]
    fn test_set_integer() {
        assert_eq!(
            meta("set debug 1"),
            MetaCommand::SetOption {
                name: "debug".to_string(),
                value: OptionValue::Int(1),
            }
        );
    }

    #[test]
    fn test_set_string_is_dequoted() {
        assert_eq!(
            meta("set timezone \"Europe/Paris\""),
            MetaCommand::SetOption {
                name: "timezone".to_string(),
                value: OptionValue::String("Europe/Paris".to_string()),
            }
        );
    }

    #[test]
    fn test_show_defaults_to_all() {
        assert_eq!(meta("show"), MetaCommand::ShowOption("all".to_string()));
        assert_eq!(meta("show all"), MetaCommand::ShowOption("all".to_string()));
        assert_eq!(
            meta("show timezone"),
            MetaCommand::ShowOption("timezone".to_string())
        );
    }

    #[test]
    fn test_schema_lookup_strips_backticks() {
        assert_eq!(
            meta("describe `my-set`"),
            MetaCommand::SchemaLookup("my-set".to_string())
        );
    }

    #[test]
    fn test_meta_words_as_dataset_and_fields() {
        let q = data("select to from schema where all = 1");
        assert_eq!(q.select, "to");
        assert_eq!(q.from, "schema");
        assert_eq!(q.where_clause.as_deref(), Some("all = 1"));
        assert_eq!(meta("desc show"), MetaCommand::SchemaLookup("show".to_string()));
    }
}
