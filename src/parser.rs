//! ODSQL parser.
//!
//! Builds a [`ParseNode`] tree from the token stream. Two entry productions,
//! chosen by the leading keyword:
//!
//! ```text
//! select <list> from <table> [where ..] [group by ..] [order by ..] [limit n] [offset n]
//! set <option> [=|to] <int|string>   show [all|<option>]   describe|desc|schema <table>
//! ```
//!
//! Every node covers the source range of the tokens it consumed, so clause
//! text can be sliced out of the input unchanged.


use crate::error::{OdsqlError, OdsqlResult};
use crate::lexer::{Keyword, Span, Token, TokenKind, tokenize};

/// Function names that make a call an aggregate.
pub const AGGREGATE_FUNCTIONS: &[&str] = &[
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "median",
    "percentile",
    "envelope",
    "bbox",
];

pub fn is_aggregate_function(name: &str) -> bool {
    AGGREGATE_FUNCTIONS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(name))
}

/// Grammar rule a node was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    // Data query and its clauses
    DataQuery,
    SelectList,
    SelectItem,
    Alias,
    Table,
    Condition,
    GroupBy,
    GroupItem,
    OrderBy,
    OrderItem,
    Limit,
    Offset,

    // Expressions
    Or,
    And,
    Not,
    Comparison,
    Like,
    InList,
    IsNull,
    Arithmetic,
    Negate,
    Parenthesized,
    AggregateCall,
    FunctionCall,
    Field,

    // Meta-commands
    SetOption,
    ShowOption,
    SchemaLookup,

    /// A single token kept in the tree (literals, names, `*`).
    Token(TokenKind),
}

/// A node in the parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub rule: Rule,
    pub span: Span,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    /// Source text covered by this node.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        self.span.slice(source)
    }

    /// First direct child produced by `rule`.
    pub fn child(&self, rule: Rule) -> Option<&ParseNode> {
        self.children.iter().find(|c| c.rule == rule)
    }

    /// Depth-first search over the whole subtree, including `self`.
    pub fn any(&self, predicate: &impl Fn(&ParseNode) -> bool) -> bool {
        predicate(self) || self.children.iter().any(|c| c.any(predicate))
    }
}

/// Parse a complete statement.
pub fn parse(input: &str) -> OdsqlResult<ParseNode> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(&tokens, input.len());
    parser.statement()
}

struct Parser<'t, 's> {
    tokens: &'t [Token<'s>],
    pos: usize,
    input_len: usize,
}

impl<'t, 's> Parser<'t, 's> {
    fn new(tokens: &'t [Token<'s>], input_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            input_len,
        }
    }

    fn statement(&mut self) -> OdsqlResult<ParseNode> {
        let node = match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Select)) => self.data_query()?,
            Some(TokenKind::Keyword(Keyword::Set)) => self.set_option()?,
            Some(TokenKind::Keyword(Keyword::Show)) => self.show_option()?,
            Some(TokenKind::Keyword(Keyword::Describe | Keyword::Desc | Keyword::Schema)) => {
                self.schema_lookup()?
            }
            _ => return Err(self.error("SELECT, SET, SHOW or DESCRIBE")),
        };

        self.eat(TokenKind::Semicolon);
        if self.peek().is_some() {
            return Err(self.error("end of statement"));
        }
        Ok(node)
    }

    // ------------------------------------------------------------------
    // Data query
    // ------------------------------------------------------------------

    fn data_query(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        self.expect_keyword(Keyword::Select)?;

        let mut children = Vec::new();
        if !self.at_keyword(Keyword::From) {
            children.push(self.select_list()?);
        }

        self.expect_keyword(Keyword::From)?;
        children.push(self.table()?);

        if self.eat_keyword(Keyword::Where) {
            let cond_start = self.pos;
            let expr = self.expression()?;
            children.push(self.node(Rule::Condition, cond_start, vec![expr]));
        }

        if self.eat_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            children.push(self.group_by()?);
        }

        if self.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            children.push(self.order_by()?);
        }

        if self.eat_keyword(Keyword::Limit) {
            children.push(self.count(Rule::Limit)?);
        }

        if self.eat_keyword(Keyword::Offset) {
            children.push(self.count(Rule::Offset)?);
        }

        Ok(self.node(Rule::DataQuery, start, children))
    }

    fn select_list(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let mut items = vec![self.select_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.select_item()?);
        }
        Ok(self.node(Rule::SelectList, start, items))
    }

    fn select_item(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        if self.peek_kind() == Some(TokenKind::Star) {
            let star = self.leaf();
            return Ok(self.node(Rule::SelectItem, start, vec![star]));
        }

        let mut children = vec![self.expression()?];
        let explicit = self.eat_keyword(Keyword::As);
        if explicit || self.peek_kind() == Some(TokenKind::Identifier) {
            children.push(self.alias()?);
        }
        Ok(self.node(Rule::SelectItem, start, children))
    }

    fn alias(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let name = self.name("an alias")?;
        Ok(self.node(Rule::Alias, start, vec![name]))
    }

    fn table(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let name = self.name("a dataset identifier")?;
        Ok(self.node(Rule::Table, start, vec![name]))
    }

    fn group_by(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let mut items = vec![self.group_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.group_item()?);
        }
        Ok(self.node(Rule::GroupBy, start, items))
    }

    fn group_item(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let mut children = vec![self.expression()?];
        if self.eat_keyword(Keyword::As) {
            children.push(self.alias()?);
        }
        Ok(self.node(Rule::GroupItem, start, children))
    }

    fn order_by(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let mut items = vec![self.order_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.order_item()?);
        }
        Ok(self.node(Rule::OrderBy, start, items))
    }

    fn order_item(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let expr = self.expression()?;
        let _ = self.eat_keyword(Keyword::Asc) || self.eat_keyword(Keyword::Desc);
        Ok(self.node(Rule::OrderItem, start, vec![expr]))
    }

    /// `limit`/`offset` argument: an integer literal that fits in a u64.
    fn count(&mut self, rule: Rule) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        match self.peek() {
            Some(token) if token.kind == TokenKind::Integer => {
                if token.text.parse::<u64>().is_err() {
                    return Err(self.error("an integer that fits in 64 bits"));
                }
            }
            _ => return Err(self.error("an integer")),
        }
        let literal = self.leaf();
        Ok(self.node(rule, start, vec![literal]))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> OdsqlResult<ParseNode> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let mut operands = vec![self.and_expr()?];
        while self.eat_keyword(Keyword::Or) {
            operands.push(self.and_expr()?);
        }
        Ok(self.fold(Rule::Or, start, operands))
    }

    fn and_expr(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let mut operands = vec![self.not_expr()?];
        while self.eat_keyword(Keyword::And) {
            operands.push(self.not_expr()?);
        }
        Ok(self.fold(Rule::And, start, operands))
    }

    fn not_expr(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        if self.eat_keyword(Keyword::Not) {
            let operand = self.not_expr()?;
            return Ok(self.node(Rule::Not, start, vec![operand]));
        }
        self.predicate()
    }

    fn predicate(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let left = self.additive()?;

        if self.peek_kind().is_some_and(|k| k.is_comparison()) {
            let op = self.leaf();
            let right = self.additive()?;
            return Ok(self.node(Rule::Comparison, start, vec![left, op, right]));
        }

        if self.eat_keyword(Keyword::Is) {
            self.eat_keyword(Keyword::Not);
            self.expect_keyword(Keyword::Null)?;
            return Ok(self.node(Rule::IsNull, start, vec![left]));
        }

        let negated = self.at_keyword(Keyword::Not)
            && matches!(
                self.peek_kind_at(1),
                Some(TokenKind::Keyword(Keyword::Like | Keyword::In))
            );
        if negated {
            self.pos += 1;
        }

        if self.eat_keyword(Keyword::Like) {
            let pattern = self.additive()?;
            return Ok(self.node(Rule::Like, start, vec![left, pattern]));
        }

        if self.eat_keyword(Keyword::In) {
            self.expect(TokenKind::LParen, "'('")?;
            let mut children = vec![left, self.expression()?];
            while self.eat(TokenKind::Comma) {
                children.push(self.expression()?);
            }
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(self.node(Rule::InList, start, children));
        }

        Ok(left)
    }

    fn additive(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let mut operands = vec![self.term()?];
        while matches!(self.peek_kind(), Some(TokenKind::Plus | TokenKind::Minus)) {
            operands.push(self.leaf());
            operands.push(self.term()?);
        }
        Ok(self.fold(Rule::Arithmetic, start, operands))
    }

    fn term(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let mut operands = vec![self.unary()?];
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Star | TokenKind::Slash | TokenKind::Percent)
        ) {
            operands.push(self.leaf());
            operands.push(self.unary()?);
        }
        Ok(self.fold(Rule::Arithmetic, start, operands))
    }

    fn unary(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        if self.eat(TokenKind::Minus) {
            let operand = self.unary()?;
            return Ok(self.node(Rule::Negate, start, vec![operand]));
        }
        self.primary()
    }

    fn primary(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        match self.peek_kind() {
            Some(
                TokenKind::String
                | TokenKind::Integer
                | TokenKind::Decimal
                | TokenKind::Keyword(Keyword::True | Keyword::False | Keyword::Null),
            ) => Ok(self.leaf()),
            Some(TokenKind::LParen) => {
                self.pos += 1;
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(self.node(Rule::Parenthesized, start, vec![inner]))
            }
            Some(TokenKind::Identifier) if self.peek_kind_at(1) == Some(TokenKind::LParen) => {
                self.call()
            }
            Some(TokenKind::Identifier | TokenKind::QuotedIdentifier) => {
                let name = self.leaf();
                Ok(self.node(Rule::Field, start, vec![name]))
            }
            Some(TokenKind::Keyword(k)) if k.is_contextual() => {
                let name = self.leaf();
                Ok(self.node(Rule::Field, start, vec![name]))
            }
            _ => Err(self.error("an expression")),
        }
    }

    /// `name(args)`; `count(*)` is the only place a bare `*` argument is allowed.
    fn call(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        let rule = if is_aggregate_function(self.tokens[start].text) {
            Rule::AggregateCall
        } else {
            Rule::FunctionCall
        };
        let name = self.leaf();
        self.expect(TokenKind::LParen, "'('")?;

        let mut children = vec![name];
        if self.peek_kind() == Some(TokenKind::Star) {
            children.push(self.leaf());
        } else if self.peek_kind() != Some(TokenKind::RParen) {
            children.push(self.expression()?);
            while self.eat(TokenKind::Comma) {
                children.push(self.expression()?);
            }
        }

        self.expect(TokenKind::RParen, "')'")?;
        Ok(self.node(rule, start, children))
    }

    // ------------------------------------------------------------------
    // Meta-commands
    // ------------------------------------------------------------------

    fn set_option(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        self.expect_keyword(Keyword::Set)?;
        let name = self.option_name()?;

        if !self.eat(TokenKind::Eq) {
            self.eat_keyword(Keyword::To);
        }

        let value = match self.peek() {
            Some(token) if token.kind == TokenKind::Integer => {
                if token.text.parse::<i64>().is_err() {
                    return Err(self.error("an integer that fits in 64 bits"));
                }
                self.leaf()
            }
            Some(token) if token.kind == TokenKind::String => self.leaf(),
            _ => return Err(self.error("an integer or string literal")),
        };

        Ok(self.node(Rule::SetOption, start, vec![name, value]))
    }

    fn show_option(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        self.expect_keyword(Keyword::Show)?;

        let mut children = Vec::new();
        if !self.eat_keyword(Keyword::All) && self.peek_kind() == Some(TokenKind::Identifier) {
            children.push(self.leaf());
        }
        Ok(self.node(Rule::ShowOption, start, children))
    }

    fn schema_lookup(&mut self) -> OdsqlResult<ParseNode> {
        let start = self.pos;
        self.pos += 1; // describe | desc | schema
        let table = self.table()?;
        Ok(self.node(Rule::SchemaLookup, start, vec![table]))
    }

    fn option_name(&mut self) -> OdsqlResult<ParseNode> {
        match self.peek_kind() {
            Some(TokenKind::Identifier) => Ok(self.leaf()),
            _ => Err(self.error("an option name")),
        }
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| t.kind)
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat(TokenKind::Keyword(keyword))
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> OdsqlResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> OdsqlResult<()> {
        self.expect(TokenKind::Keyword(keyword), keyword.as_str())
    }

    /// An identifier, a backtick-quoted identifier, or a contextual keyword.
    fn name(&mut self, expected: &str) -> OdsqlResult<ParseNode> {
        match self.peek_kind() {
            Some(TokenKind::Identifier | TokenKind::QuotedIdentifier) => Ok(self.leaf()),
            Some(TokenKind::Keyword(k)) if k.is_contextual() => Ok(self.leaf()),
            _ => Err(self.error(expected)),
        }
    }

    /// Consume the current token as a leaf node. Callers check it exists.
    fn leaf(&mut self) -> ParseNode {
        let token = self.tokens[self.pos];
        self.pos += 1;
        ParseNode {
            rule: Rule::Token(token.kind),
            span: token.span,
            children: Vec::new(),
        }
    }

    /// Node covering tokens `start..self.pos`.
    fn node(&self, rule: Rule, start: usize, children: Vec<ParseNode>) -> ParseNode {
        let first = self.tokens[start].span;
        let last = self.tokens[self.pos - 1].span;
        ParseNode {
            rule,
            span: first.cover(last),
            children,
        }
    }

    /// Wrap `operands` in a `rule` node unless there is only one.
    fn fold(&self, rule: Rule, start: usize, mut operands: Vec<ParseNode>) -> ParseNode {
        if operands.len() == 1 {
            operands.remove(0)
        } else {
            self.node(rule, start, operands)
        }
    }

    fn error(&self, expected: &str) -> OdsqlError {
        let position = self.peek().map_or(self.input_len, |t| t.span.start);
        OdsqlError::syntax(position, expected)
    }
}
