//! Statement splitting for MySQL scripts.
//!
//! Scripts are split on `;`. Semicolons inside quoted text (`'…'`, `"…"`,
//! `` `…` ``) and block comments do not end a statement. `-- ` and `#`
//! comments are dropped up to the end of their line.

/// One statement extracted from a script, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Zero-based position among the kept statements.
    pub index: usize,
    pub sql: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Split `script` into executable statements.
///
/// Fragments that are empty once comments and whitespace are removed are
/// discarded.
#[must_use]
pub fn split_statements(script: &str) -> Vec<Statement> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut state = Scan::Code;
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Scan::Code => match c {
                ';' => fragments.push(std::mem::take(&mut current)),
                '\'' | '"' | '`' => {
                    state = Scan::Quoted(c);
                    current.push(c);
                }
                '-' if starts_line_comment(&chars) => {
                    chars.next();
                    state = Scan::LineComment;
                }
                '#' => state = Scan::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = Scan::BlockComment;
                    current.push_str("/*");
                }
                _ => current.push(c),
            },
            Scan::Quoted(quote) => {
                current.push(c);
                if c == '\\' && quote != '`' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == quote {
                    // A doubled quote closes and immediately reopens.
                    state = Scan::Code;
                }
            }
            Scan::LineComment => {
                if c == '\n' {
                    state = Scan::Code;
                    current.push('\n');
                }
            }
            Scan::BlockComment => {
                current.push(c);
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    current.push('/');
                    state = Scan::Code;
                }
            }
        }
    }
    fragments.push(current);

    fragments
        .iter()
        .filter_map(|fragment| tidy(fragment))
        .enumerate()
        .map(|(index, sql)| Statement { index, sql })
        .collect()
}

/// MySQL only treats `--` as a comment when followed by whitespace or the
/// end of input. `chars` is positioned just after the first dash.
fn starts_line_comment(chars: &std::iter::Peekable<std::str::Chars<'_>>) -> bool {
    let mut ahead = chars.clone();
    ahead.next() == Some('-') && ahead.next().is_none_or(char::is_whitespace)
}

/// Drop blank lines and surrounding whitespace; `None` if nothing is left.
fn tidy(fragment: &str) -> Option<String> {
    let lines: Vec<&str> = fragment
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();
    let sql = lines.join("\n");
    let sql = sql.trim();
    (!sql.is_empty()).then(|| sql.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql(script: &str) -> Vec<String> {
        split_statements(script).into_iter().map(|s| s.sql).collect()
    }

    #[test]
    fn test_basic_split() {
        assert_eq!(
            sql("CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);\n"),
            vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
        );
    }

    #[test]
    fn test_trailing_statement_without_semicolon() {
        assert_eq!(sql("SELECT 1; SELECT 2"), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_comment_only_fragments_dropped() {
        let script = "-- header\n-- more header\n;\n\n;ALTER TABLE t ADD c INT;\n-- trailing";
        assert_eq!(sql(script), vec!["ALTER TABLE t ADD c INT"]);
    }

    #[test]
    fn test_hash_comments_do_not_split() {
        let script = "# setup; do not edit\nCREATE TABLE t (id INT); # done; really\nSELECT '#';";
        assert_eq!(sql(script), vec!["CREATE TABLE t (id INT)", "SELECT '#'"]);
    }

    #[test]
    fn test_comment_lines_stripped_from_statements() {
        let script = "CREATE TABLE t (\n  -- primary key\n  id INT -- inline\n);";
        assert_eq!(sql(script), vec!["CREATE TABLE t (\n  id INT\n)"]);
    }

    #[test]
    fn test_semicolons_in_quotes_do_not_split() {
        let script = "INSERT INTO s VALUES ('a;b', \"c;d\");\nSELECT `we;ird` FROM s;";
        assert_eq!(
            sql(script),
            vec!["INSERT INTO s VALUES ('a;b', \"c;d\")", "SELECT `we;ird` FROM s"]
        );
    }

    #[test]
    fn test_escaped_and_doubled_quotes() {
        let script = r"INSERT INTO s VALUES ('it\'s; fine', 'o''clock;');SELECT 1;";
        assert_eq!(
            sql(script),
            vec![r"INSERT INTO s VALUES ('it\'s; fine', 'o''clock;')", "SELECT 1"]
        );
    }

    #[test]
    fn test_dashes_inside_quotes_are_not_comments() {
        assert_eq!(
            sql("INSERT INTO s VALUES ('--not a comment');"),
            vec!["INSERT INTO s VALUES ('--not a comment')"]
        );
    }

    #[test]
    fn test_double_minus_without_space_is_arithmetic() {
        assert_eq!(sql("SELECT 5--1;"), vec!["SELECT 5--1"]);
    }

    #[test]
    fn test_block_comment_kept_without_splitting() {
        assert_eq!(
            sql("/* a; b */ SELECT 1;"),
            vec!["/* a; b */ SELECT 1"]
        );
    }

    #[test]
    fn test_indices_follow_kept_statements() {
        let statements = split_statements("; SELECT 1; -- x\n; SELECT 2;");
        let indices: Vec<usize> = statements.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }
}
