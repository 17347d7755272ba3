// src/db/split.rs

/// Statements whose leading keyword means they return rows.
const ROW_KEYWORDS: &[&str] = &[
    "SELECT",
    "WITH",
    "VALUES",
    "PRAGMA",
    "SHOW",
    "DESCRIBE",
    "EXPLAIN",
    "SUMMARIZE",
    "FROM",
    "TABLE",
    "CALL",
    "PIVOT",
    "UNPIVOT",
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lex {
    Normal,
    Single,
    Double,
    LineComment,
    BlockComment,
}

/// Split a batch of SQL on top-level `;`, leaving quoted text and comments
/// intact. Pieces with nothing but whitespace/comments are dropped.
pub fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut state = Lex::Normal;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            Lex::Normal => match b {
                b'\'' => state = Lex::Single,
                b'"' => state = Lex::Double,
                b'-' if next == Some(b'-') => {
                    state = Lex::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = Lex::BlockComment;
                    i += 1;
                }
                b';' => {
                    push_piece(&mut out, &sql[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
            Lex::Single if b == b'\'' => state = Lex::Normal,
            Lex::Double if b == b'"' => state = Lex::Normal,
            Lex::LineComment if b == b'\n' => state = Lex::Normal,
            Lex::BlockComment if b == b'*' && next == Some(b'/') => {
                state = Lex::Normal;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    push_piece(&mut out, &sql[start..]);
    out
}

fn push_piece<'a>(out: &mut Vec<&'a str>, piece: &'a str) {
    if !strip_leading_noise(piece).is_empty() {
        out.push(piece.trim());
    }
}

/// Skip whitespace, comments and opening parentheses.
fn strip_leading_noise(mut s: &str) -> &str {
    loop {
        let trimmed = s.trim_start().trim_start_matches('(');
        if let Some(rest) = trimmed.strip_prefix("--") {
            s = rest.find('\n').map(|i| &rest[i + 1..]).unwrap_or("");
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            s = rest.find("*/").map(|i| &rest[i + 2..]).unwrap_or("");
        } else if trimmed.len() != s.len() {
            s = trimmed;
        } else {
            return s;
        }
    }
}

/// First bare word of the statement, upper-cased.
pub fn leading_keyword(stmt: &str) -> Option<String> {
    let body = strip_leading_noise(stmt);
    let word: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if word.is_empty() {
        None
    } else {
        Some(word.to_ascii_uppercase())
    }
}

/// True when `keyword` appears as a bare word outside quotes and comments.
pub fn has_keyword(stmt: &str, keyword: &str) -> bool {
    let bytes = stmt.as_bytes();
    let mut state = Lex::Normal;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            Lex::Normal => match b {
                b'\'' => state = Lex::Single,
                b'"' => state = Lex::Double,
                b'-' if next == Some(b'-') => {
                    state = Lex::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = Lex::BlockComment;
                    i += 1;
                }
                b if b.is_ascii_alphabetic() || b == b'_' => {
                    let start = i;
                    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                        i += 1;
                    }
                    if stmt[start..i].eq_ignore_ascii_case(keyword) {
                        return true;
                    }
                    continue;
                }
                _ => {}
            },
            Lex::Single if b == b'\'' => state = Lex::Normal,
            Lex::Double if b == b'"' => state = Lex::Normal,
            Lex::LineComment if b == b'\n' => state = Lex::Normal,
            Lex::BlockComment if b == b'*' && next == Some(b'/') => {
                state = Lex::Normal;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// Row-producing by leading keyword, or DML carrying a `RETURNING` clause.
pub fn returns_rows(stmt: &str) -> bool {
    let by_keyword = leading_keyword(stmt)
        .map(|kw| ROW_KEYWORDS.contains(&kw.as_str()))
        .unwrap_or(false);
    by_keyword || has_keyword(stmt, "RETURNING")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_top_level_semicolons() {
        let parts = split_statements("SELECT 1; SELECT 2;\nSELECT 3");
        assert_eq!(parts, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn keeps_quoted_semicolons() {
        let parts = split_statements("SELECT 'a;b', \"c;d\" FROM t; SELECT 'it''s;'");
        assert_eq!(parts, vec!["SELECT 'a;b', \"c;d\" FROM t", "SELECT 'it''s;'"]);
    }

    #[test]
    fn comments_do_not_split() {
        let parts = split_statements("-- first; not a split\nSELECT 1 /* ; */;");
        assert_eq!(parts.len(), 1);
        assert!(parts[0].ends_with("SELECT 1 /* ; */"));
    }

    #[test]
    fn empty_and_comment_only_pieces_are_dropped() {
        assert!(split_statements("").is_empty());
        assert!(split_statements("  ;; \n ;").is_empty());
        assert!(split_statements("-- nothing here").is_empty());
        assert!(split_statements("/* nor here */ ;").is_empty());
    }

    #[test]
    fn classifies_row_statements() {
        assert!(returns_rows("select * from covid_counties"));
        assert!(returns_rows("  -- lead\n  WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("(SELECT 1) UNION (SELECT 2)"));
        assert!(!returns_rows("CREATE TABLE t (a INTEGER)"));
        assert!(!returns_rows("insert into t values (1)"));
        assert_eq!(leading_keyword("/* c */ drop table t"), Some("DROP".into()));
        assert_eq!(leading_keyword("  "), None);
    }

    #[test]
    fn procedures_pivots_and_returning_produce_rows() {
        assert!(returns_rows("CALL pragma_version()"));
        assert!(returns_rows("PIVOT t ON a USING COUNT(*)"));
        assert!(returns_rows("unpivot t ON a, b INTO NAME k VALUE v"));
        assert!(returns_rows("INSERT INTO t VALUES (1) RETURNING a"));
        assert!(returns_rows("DELETE FROM t WHERE a = 1 returning *"));
    }

    #[test]
    fn returning_inside_quotes_or_identifiers_does_not_count() {
        assert!(!returns_rows("INSERT INTO t VALUES ('returning')"));
        assert!(!returns_rows("INSERT INTO t VALUES (1) -- RETURNING a"));
        assert!(!returns_rows("UPDATE t SET returning_flag = 1"));
        assert!(has_keyword("update t set a = 1 /* x */ RETURNING a", "returning"));
    }
}
