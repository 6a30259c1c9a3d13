//! ODSQL tokenizer using nom.
//!
//! Splits raw query text into [`Token`]s, each carrying its byte span in the
//! original input so later stages can slice clauses out verbatim.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace1, not_line_ending, satisfy},
    combinator::{map, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::pair,
};

use crate::error::{OdsqlError, OdsqlResult};

/// Byte range `[start, end)` in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }
}

/// Reserved words. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    From,
    Where,
    Group,
    Order,
    By,
    Limit,
    Offset,
    As,
    Asc,
    Desc,
    And,
    Or,
    Not,
    In,
    Like,
    Is,
    Null,
    True,
    False,
    Set,
    Show,
    Describe,
    Schema,
    All,
    To,
}

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        let keyword = match word.to_ascii_lowercase().as_str() {
            "select" => Keyword::Select,
            "from" => Keyword::From,
            "where" => Keyword::Where,
            "group" => Keyword::Group,
            "order" => Keyword::Order,
            "by" => Keyword::By,
            "limit" => Keyword::Limit,
            "offset" => Keyword::Offset,
            "as" => Keyword::As,
            "asc" => Keyword::Asc,
            "desc" => Keyword::Desc,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "in" => Keyword::In,
            "like" => Keyword::Like,
            "is" => Keyword::Is,
            "null" => Keyword::Null,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "set" => Keyword::Set,
            "show" => Keyword::Show,
            "describe" => Keyword::Describe,
            "schema" => Keyword::Schema,
            "all" => Keyword::All,
            "to" => Keyword::To,
            _ => return None,
        };
        Some(keyword)
    }

    /// Words that only mean something at the start of a statement, inside
    /// `set`/`show`, or after an `order by` item. Elsewhere they are names.
    pub fn is_contextual(self) -> bool {
        matches!(
            self,
            Keyword::Set
                | Keyword::Show
                | Keyword::Describe
                | Keyword::Desc
                | Keyword::Schema
                | Keyword::All
                | Keyword::To
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Group => "GROUP",
            Keyword::Order => "ORDER",
            Keyword::By => "BY",
            Keyword::Limit => "LIMIT",
            Keyword::Offset => "OFFSET",
            Keyword::As => "AS",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::In => "IN",
            Keyword::Like => "LIKE",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Set => "SET",
            Keyword::Show => "SHOW",
            Keyword::Describe => "DESCRIBE",
            Keyword::Schema => "SCHEMA",
            Keyword::All => "ALL",
            Keyword::To => "TO",
        }
    }
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier,
    /// `` `my-dataset` `` (backticks included in the token text)
    QuotedIdentifier,
    /// `'...'` or `"..."` (quotes included in the token text)
    String,
    Integer,
    Decimal,

    // Operators
    Star,
    Plus,
    Minus,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,

    // Punctuation
    LParen,
    RParen,
    Comma,
    Semicolon,
}

impl TokenKind {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Lte
                | TokenKind::Gt
                | TokenKind::Gte
        )
    }
}

/// A single lexical unit with its source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub span: Span,
    pub text: &'s str,
}

impl Token<'_> {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}

/// Tokenize a complete input string.
pub fn tokenize(source: &str) -> OdsqlResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = source;

    loop {
        if let Ok((remaining, _)) = trivia(rest) {
            rest = remaining;
        }
        if rest.is_empty() {
            break;
        }

        let start = source.len() - rest.len();
        match next_token(rest) {
            Ok((remaining, kind)) => {
                let end = source.len() - remaining.len();
                tokens.push(Token {
                    kind,
                    span: Span::new(start, end),
                    text: &source[start..end],
                });
                rest = remaining;
            }
            Err(nom::Err::Failure(_)) => {
                return Err(OdsqlError::syntax(source.len(), "a closing quote"));
            }
            Err(_) => return Err(OdsqlError::syntax(start, "a token")),
        }
    }

    Ok(tokens)
}

/// Whitespace and `--` line comments.
fn trivia(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(tag("--"), not_line_ending)),
        ))),
    )(input)
}

fn next_token(input: &str) -> IResult<&str, TokenKind> {
    alt((
        map(word, |w| {
            Keyword::lookup(w).map_or(TokenKind::Identifier, TokenKind::Keyword)
        }),
        map(number, |n| {
            if n.contains('.') {
                TokenKind::Decimal
            } else {
                TokenKind::Integer
            }
        }),
        value(TokenKind::String, string_literal),
        value(TokenKind::QuotedIdentifier, quoted_identifier),
        operator,
        punctuation,
    ))(input)
}

/// `[A-Za-z_][A-Za-z0-9_]*` (unicode letters allowed).
fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, opt(pair(char('.'), digit1))))(input)
}

/// Quoted string; a backslash escapes the next character.
/// An unterminated string is a hard failure, not a backtrack.
fn string_literal(input: &str) -> IResult<&str, &str> {
    let quote = match input.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };

    let mut escaped = false;
    for (i, c) in input.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((&input[i + 1..], &input[..i + 1]));
        }
    }

    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

fn quoted_identifier(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('`') {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    }
    match input[1..].find('`') {
        Some(i) => Ok((&input[i + 2..], &input[..i + 2])),
        None => Err(nom::Err::Failure(Error::new(input, ErrorKind::Char))),
    }
}

fn operator(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::Lte, tag("<=")),
        value(TokenKind::Gte, tag(">=")),
        value(TokenKind::NotEq, tag("!=")),
        value(TokenKind::NotEq, tag("<>")),
        value(TokenKind::Lt, char('<')),
        value(TokenKind::Gt, char('>')),
        value(TokenKind::Eq, char('=')),
        value(TokenKind::Star, char('*')),
        value(TokenKind::Plus, char('+')),
        value(TokenKind::Minus, char('-')),
        value(TokenKind::Slash, char('/')),
        value(TokenKind::Percent, char('%')),
    ))(input)
}

fn punctuation(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::LParen, char('(')),
        value(TokenKind::RParen, char(')')),
        value(TokenKind::Comma, char(',')),
        value(TokenKind::Semicolon, char(';')),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("SeLeCt x FROM t"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Identifier,
                TokenKind::Keyword(Keyword::From),
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_spans_and_text() {
        let tokens = tokenize("select  n\tfrom t").unwrap();
        assert_eq!(tokens[1].span, Span::new(8, 9));
        assert_eq!(tokens[1].text, "n");
        assert_eq!(tokens[2].span, Span::new(10, 14));
        assert_eq!(tokens[2].text, "from");
    }

    #[test]
    fn test_string_literal_keeps_quotes_and_whitespace() {
        let tokens = tokenize("where name = 'Le  Havre'").unwrap();
        assert_eq!(tokens[3].kind, TokenKind::String);
        assert_eq!(tokens[3].text, "'Le  Havre'");
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let tokens = tokenize(r#""say \"hi\"" x"#).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, r#""say \"hi\"""#);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("select 'abc").unwrap_err();
        assert!(matches!(err, OdsqlError::Syntax { position: 11, .. }));
    }

    #[test]
    fn test_backtick_identifier() {
        let tokens = tokenize("from `my-set`;").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::QuotedIdentifier);
        assert_eq!(tokens[1].text, "`my-set`");
        assert_eq!(tokens[2].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a<=b >= c != d <> e < f > g = h"),
            vec![
                TokenKind::Identifier,
                TokenKind::Lte,
                TokenKind::Identifier,
                TokenKind::Gte,
                TokenKind::Identifier,
                TokenKind::NotEq,
                TokenKind::Identifier,
                TokenKind::NotEq,
                TokenKind::Identifier,
                TokenKind::Lt,
                TokenKind::Identifier,
                TokenKind::Gt,
                TokenKind::Identifier,
                TokenKind::Eq,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("10 3.25"),
            vec![TokenKind::Integer, TokenKind::Decimal]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize("select -- all of it\n* from t").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].kind, TokenKind::Star);
    }

    #[test]
    fn test_unknown_character() {
        let err = tokenize("select # from t").unwrap_err();
        assert!(matches!(err, OdsqlError::Syntax { position: 7, .. }));
    }
}
