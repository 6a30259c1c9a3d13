//! REPL mode for interactive ODSQL statements

use std::borrow::Cow;
use std::path::PathBuf;

use colored::*;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use crate::client::Transport;
use crate::error::{OdsqlError, OdsqlResult};
use crate::lexer::{TokenKind, tokenize};
use crate::options::OptionStore;
use crate::parser::{AGGREGATE_FUNCTIONS, is_aggregate_function};
use crate::render::{elide, render_table, table_width};
use crate::resolver::EndpointDecision;
use crate::session::{Output, Session};

const KEYWORDS: &[&str] = &[
    "select", "from", "where", "group", "order", "by", "limit", "offset", "as", "asc", "desc",
    "and", "or", "not", "in", "like", "is", "null", "true", "false", "set", "show", "describe",
    "schema", "all", "catalog",
];

pub struct ReplSettings {
    pub history_file: PathBuf,
    /// Fixed line width; `None` follows the terminal as it is resized.
    pub max_width: Option<usize>,
}

/// Collects input lines until a statement is terminated by `;`.
#[derive(Debug, Default)]
pub struct StatementBuffer {
    pending: String,
}

impl StatementBuffer {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Add a line. Returns the complete statement, without the trailing
    /// `;`, once a line ends with one.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if !self.pending.is_empty() {
            self.pending.push('\n');
        }
        self.pending.push_str(line);

        if !line.trim_end().ends_with(';') {
            return None;
        }

        let statement = self
            .pending
            .trim_matches(|c: char| c == ';' || c.is_whitespace())
            .to_string();
        self.pending.clear();
        Some(statement)
    }
}

/// Keyword, aggregate and option-name completion.
#[derive(Debug)]
pub struct OdsqlHelper {
    words: Vec<String>,
}

impl OdsqlHelper {
    pub fn new(options: &OptionStore) -> Self {
        let mut words: Vec<String> = KEYWORDS
            .iter()
            .chain(AGGREGATE_FUNCTIONS)
            .map(|w| w.to_string())
            .collect();
        words.extend(options.entries().iter().map(|e| e.name.to_string()));
        words.sort();
        words.dedup();
        Self { words }
    }

    /// Candidates for `prefix`, upper-cased when the operator types in caps.
    pub fn candidates(&self, prefix: &str) -> Vec<String> {
        if prefix.is_empty() {
            return Vec::new();
        }
        let upper = prefix.chars().all(|c| !c.is_lowercase());
        let lower = prefix.to_lowercase();
        self.words
            .iter()
            .filter(|w| w.starts_with(&lower))
            .map(|w| if upper { w.to_uppercase() } else { w.clone() })
            .collect()
    }
}

impl Completer for OdsqlHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = word_start(line, pos);
        let pairs = self
            .candidates(&line[start..pos])
            .into_iter()
            .map(|w| Pair {
                display: w.clone(),
                replacement: w,
            })
            .collect();
        Ok((start, pairs))
    }
}

/// Byte offset where the word ending at `pos` begins.
fn word_start(line: &str, pos: usize) -> usize {
    line[..pos]
        .char_indices()
        .rev()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(0, |(i, c)| i + c.len_utf8())
}

/// Colour keywords, literals and comments. Input that does not tokenize
/// (an unterminated string while typing) is returned unchanged.
pub fn highlight_line(line: &str) -> Option<String> {
    let tokens = tokenize(line).ok()?;
    let mut out = String::with_capacity(line.len() * 2);
    let mut last = 0;
    for token in &tokens {
        out.push_str(&dim_comments(&line[last..token.span.start]));
        let text = token.text;
        let painted = match token.kind {
            TokenKind::Keyword(_) => text.blue().bold().to_string(),
            TokenKind::String => text.green().to_string(),
            TokenKind::Integer | TokenKind::Decimal => text.yellow().to_string(),
            TokenKind::Identifier if is_aggregate_function(text) => text.magenta().to_string(),
            _ => text.to_string(),
        };
        out.push_str(&painted);
        last = token.span.end;
    }
    out.push_str(&dim_comments(&line[last..]));
    Some(out)
}

/// Gaps between tokens hold only whitespace and `--` comments.
fn dim_comments(gap: &str) -> String {
    match gap.find("--") {
        Some(i) => {
            let end = gap[i..].find('\n').map_or(gap.len(), |j| i + j);
            format!("{}{}{}", &gap[..i], gap[i..end].dimmed(), dim_comments(&gap[end..]))
        }
        None => gap.to_string(),
    }
}

impl Hinter for OdsqlHelper {
    type Hint = String;
}

impl Highlighter for OdsqlHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match highlight_line(line) {
            Some(painted) => Cow::Owned(painted),
            None => Cow::Borrowed(line),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        Cow::Owned(prompt.cyan().bold().to_string())
    }
}

impl Validator for OdsqlHelper {}

impl Helper for OdsqlHelper {}

/// Run the interactive REPL until Ctrl-D or `.exit`.
pub async fn run_repl<T: Transport>(
    session: &mut Session<T>,
    settings: &ReplSettings,
) -> OdsqlResult<()> {
    let mut rl: Editor<OdsqlHelper, DefaultHistory> = Editor::new().map_err(readline_error)?;
    rl.set_helper(Some(OdsqlHelper::new(session.options())));
    if rl.load_history(&settings.history_file).is_err() {
        tracing::debug!(path = %settings.history_file.display(), "no history loaded");
    }

    println!("Welcome. Type ODSQL queries ending with ';'");
    let mut buffer = StatementBuffer::default();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { ": " };
        match rl.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() {
                    match line.trim() {
                        "" => continue,
                        ".exit" | ".quit" => break,
                        ".help" => {
                            show_repl_help();
                            continue;
                        }
                        ".clear" => {
                            print!("\x1B[2J\x1B[1;1H");
                            continue;
                        }
                        _ => {}
                    }
                }

                let Some(statement) = buffer.push_line(&line) else {
                    continue;
                };
                let _ = rl.add_history_entry(format!("{};", statement));

                if session.options().debug() {
                    echo_request(&statement, session.options());
                }
                match session.execute(&statement).await {
                    Ok(output) => print_output(&output, table_width(settings.max_width)),
                    Err(e) => eprintln!("{} {}", "✗".red(), e.to_string().red()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red(), err);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&settings.history_file) {
        tracing::warn!(path = %settings.history_file.display(), "could not save history: {}", e);
    }
    println!("{}", "GoodBye!".green());
    Ok(())
}

/// Print where `statement` is about to be sent, if it goes anywhere.
pub fn echo_request(statement: &str, options: &OptionStore) {
    if let Ok(plan) = crate::explain(statement, options) {
        if let Some(decision) = plan.decision {
            print_decision(&decision);
        }
    }
}

pub fn print_decision(decision: &EndpointDecision) {
    println!("{} {}", "path:".dimmed(), decision.path());
    println!("{} {:?}", "params:".dimmed(), decision.parameters);
}

pub fn print_output(output: &Output, max_width: usize) {
    match output {
        Output::Message(text) => println!("{}", text),
        Output::Rows { rows, .. } => {
            for line in render_table(rows.iter().cloned()) {
                println!("{}", elide(&line, max_width));
            }
        }
    }
}

/// Show REPL help information.
pub fn show_repl_help() {
    println!("{}", "ODSQL REPL Commands:".cyan().bold());
    println!("  {}     - Exit the REPL", ".exit".yellow());
    println!("  {}     - Show this help", ".help".yellow());
    println!("  {}    - Clear screen", ".clear".yellow());
    println!();
    println!("{}", "Statements (end with ';'):".cyan().bold());
    println!("  select * from sales where region = 'EU' limit 10;");
    println!("  select city, count(*) as n from sales group by city order by n desc;");
    println!("  select * from catalog;");
    println!("  describe sales;");
    println!("  set force_records 1;   show all;");
    println!();
}

fn readline_error(err: ReadlineError) -> OdsqlError {
    OdsqlError::Io(std::io::Error::other(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_statement() {
        let mut buffer = StatementBuffer::default();
        assert_eq!(
            buffer.push_line("select * from t;"),
            Some("select * from t".to_string())
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multi_line_statement() {
        let mut buffer = StatementBuffer::default();
        assert_eq!(buffer.push_line("select *"), None);
        assert_eq!(buffer.push_line("from t"), None);
        assert_eq!(
            buffer.push_line("where a = 1 ;  "),
            Some("select *\nfrom t\nwhere a = 1".to_string())
        );
    }

    #[test]
    fn test_clear_discards_pending() {
        let mut buffer = StatementBuffer::default();
        buffer.push_line("select *");
        buffer.clear();
        assert_eq!(buffer.push_line("show;"), Some("show".to_string()));
    }

    #[test]
    fn test_word_start_after_multibyte_char() {
        let line = "select * from t where a = '€sel";
        let start = word_start(line, line.len());
        assert_eq!(&line[start..], "sel");
        assert_eq!(word_start("’", 3), 3);
        assert_eq!(word_start("sel", 3), 0);
        assert_eq!(word_start("", 0), 0);
    }

    #[test]
    fn test_complete_after_multibyte_char() {
        let helper = OdsqlHelper::new(&OptionStore::new());
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        let line = "select é’sel";
        let (start, pairs) = helper.complete(line, line.len(), &ctx).unwrap();
        assert_eq!(&line[start..], "sel");
        assert_eq!(pairs[0].replacement, "select");
    }

    fn strip_ansi(text: &str) -> String {
        let mut out = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\x1B' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_highlight_keeps_visible_text() {
        let line = "SELECT count(*)  from `my-set` where a = 'x y' -- note\n limit 3";
        let painted = highlight_line(line).unwrap();
        assert_eq!(strip_ansi(&painted), line);
    }

    #[test]
    fn test_highlight_skips_untokenizable_input() {
        assert_eq!(highlight_line("select 'unterminated"), None);
    }

    #[test]
    fn test_candidates() {
        let helper = OdsqlHelper::new(&OptionStore::new());
        assert_eq!(helper.candidates("sel"), vec!["select"]);
        assert_eq!(helper.candidates("SEL"), vec!["SELECT"]);
        assert!(helper.candidates("force").contains(&"force_records".to_string()));
        assert!(helper.candidates("co").contains(&"count".to_string()));
        assert!(helper.candidates("").is_empty());
    }
}
