//! Plain-text table rendering.

use crate::rows::Row;

/// Render rows as a bordered table. Columns come from the first row.
///
/// ```text
/// -------------------
/// | city  | pop     |
/// -------------------
/// | Paris | 2161000 |
/// -------------------
/// (1 row)
/// ```
pub fn render_table(rows: impl IntoIterator<Item = Row>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut widths: Vec<usize> = Vec::new();
    let mut cells: Vec<Vec<String>> = Vec::new();

    for (i, row) in rows.into_iter().enumerate() {
        if i == 0 {
            columns = row.iter().map(|(k, _)| k.clone()).collect();
            widths = columns.iter().map(|c| c.chars().count()).collect();
        }

        let line: Vec<String> = columns
            .iter()
            .map(|c| {
                row.iter()
                    .find(|(k, _)| k == c)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            })
            .collect();
        for (w, value) in widths.iter_mut().zip(&line) {
            *w = (*w).max(value.chars().count());
        }
        cells.push(line);
    }

    if cells.is_empty() {
        return vec!["<empty>".to_string()];
    }

    let total_width: usize = widths.iter().map(|w| w + 3).sum::<usize>() + 1;
    let border = "-".repeat(total_width);

    let mut lines = Vec::with_capacity(cells.len() + 5);
    lines.push(border.clone());
    lines.push(format_line(&columns, &widths));
    lines.push(border.clone());
    for line in &cells {
        lines.push(format_line(line, &widths));
    }
    lines.push(border);
    lines.push(format!(
        "({} row{})",
        cells.len(),
        if cells.len() == 1 { "" } else { "s" }
    ));
    lines
}

fn format_line(values: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (value, width) in values.iter().zip(widths) {
        let pad = width - value.chars().count();
        line.push(' ');
        line.push_str(value);
        line.push_str(&" ".repeat(pad));
        line.push_str(" |");
    }
    line
}

/// Line width used when the terminal size is unknown, e.g. output piped to a file.
pub const DEFAULT_MAX_WIDTH: usize = 120;

/// `explicit` if given, else the current terminal width, else [`DEFAULT_MAX_WIDTH`].
pub fn table_width(explicit: Option<usize>) -> usize {
    explicit
        .or_else(|| term_size::dimensions().map(|(w, _)| w))
        .unwrap_or(DEFAULT_MAX_WIDTH)
}

/// Cut `line` to `max_width` characters, ending in `...` when cut.
pub fn elide(line: &str, max_width: usize) -> String {
    if line.chars().count() <= max_width {
        return line.to_string();
    }
    let kept: String = line.chars().take(max_width.saturating_sub(4)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_table_layout() {
        let lines = render_table(vec![
            row(&[("city", "Paris"), ("n", "2")]),
            row(&[("city", "Lyon"), ("n", "10")]),
        ]);
        assert_eq!(
            lines,
            vec![
                "--------------",
                "| city  | n  |",
                "--------------",
                "| Paris | 2  |",
                "| Lyon  | 10 |",
                "--------------",
                "(2 rows)",
            ]
        );
    }

    #[test]
    fn test_single_row_footer() {
        let lines = render_table(vec![row(&[("a", "b")])]);
        assert_eq!(lines.last().unwrap(), "(1 row)");
    }

    #[test]
    fn test_explicit_width_wins() {
        assert_eq!(table_width(Some(40)), 40);
    }

    #[test]
    fn test_width_follows_terminal() {
        let expected = term_size::dimensions().map_or(DEFAULT_MAX_WIDTH, |(w, _)| w);
        assert_eq!(table_width(None), expected);
    }

    #[test]
    fn test_empty() {
        assert_eq!(render_table(Vec::new()), vec!["<empty>"]);
    }

    #[test]
    fn test_missing_column_renders_blank() {
        let lines = render_table(vec![row(&[("a", "1"), ("b", "2")]), row(&[("a", "3")])]);
        assert_eq!(lines[4], "| 3 |   |");
    }

    #[test]
    fn test_elide() {
        assert_eq!(elide("short", 10), "short");
        assert_eq!(elide("0123456789abc", 10), "012345...");
        assert_eq!(elide("0123456789", 3), "...");
    }
}
