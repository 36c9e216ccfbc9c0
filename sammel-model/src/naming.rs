//! Table naming and quoting helpers for the query-text dialect.
//!
//! Query text exchanged with collaborators names tables in single quotes
//! (`SELECT * FROM 'books'`) and columns in brackets (`[Title]`). Internal
//! statements use double-quoted identifiers via [`quote_identifier`].

pub const TYPE_INFO_SUFFIX: &str = "_typeinfo";
pub const PICTURE_TABLE_SUFFIX: &str = "_pictures";
pub const INDEX_SUFFIX: &str = "_index";

/// Content table name for an album: lowercase, spaces replaced by `_`.
pub fn table_name(album_name: &str) -> String {
    album_name.trim().to_lowercase().replace(' ', "_")
}

pub fn type_info_table_name(album_name: &str) -> String {
    format!("{}{TYPE_INFO_SUFFIX}", table_name(album_name))
}

pub fn picture_table_name(album_name: &str) -> String {
    format!("{}{PICTURE_TABLE_SUFFIX}", table_name(album_name))
}

pub fn index_name(album_name: &str) -> String {
    format!("{}{INDEX_SUFFIX}", table_name(album_name))
}

/// Wrap a name in single quotes. Already-quoted names pass through unchanged.
pub fn enclose_name_with_quotes(name: &str) -> String {
    if is_enclosed(name, '\'', '\'') {
        name.to_string()
    } else {
        format!("'{}'", sanitize_single_quotes(name))
    }
}

pub fn remove_quotes_enclosing_name(name: &str) -> &str {
    if is_enclosed(name, '\'', '\'') {
        &name[1..name.len() - 1]
    } else {
        name
    }
}

/// Column reference for query text: `[name]`. Idempotent.
pub fn select_column_name(name: &str) -> String {
    if is_enclosed(name, '[', ']') {
        name.to_string()
    } else {
        format!("[{name}]")
    }
}

/// Escape single quotes inside a literal value.
pub fn sanitize_single_quotes(value: &str) -> String {
    value.replace('\'', "''")
}

/// Double-quoted SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn select_all_query(album_name: &str) -> String {
    format!(
        "SELECT * FROM {}",
        enclose_name_with_quotes(&table_name(album_name))
    )
}

/// Extract the table named by the first `FROM` clause of a query.
///
/// Accepts single-quoted, double-quoted, bracketed and bare names.
pub fn query_table_name(query: &str) -> Option<String> {
    let lower = query.to_ascii_lowercase();
    let start = find_keyword(&lower, "from")? + "from".len();
    let rest = query[start..].trim_start();

    let name = match rest.chars().next()? {
        '\'' => read_quoted(rest, '\'')?,
        '"' => read_quoted(rest, '"')?,
        '[' => rest[1..].split(']').next().map(str::to_string)?,
        _ => rest
            .split(|c: char| c.is_whitespace() || c == ';' || c == ')')
            .next()
            .map(str::to_string)?,
    };
    (!name.is_empty()).then_some(name)
}

fn is_enclosed(name: &str, open: char, close: char) -> bool {
    name.len() >= 2 && name.starts_with(open) && name.ends_with(close)
}

fn find_keyword(haystack: &str, keyword: &str) -> Option<usize> {
    haystack.match_indices(keyword).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + keyword.len()..].chars().next();
        before.is_none_or(|c| c.is_whitespace())
            && after.is_some_and(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '['))
    })
}

/// Read a quoted name starting at `s[0]`, treating a doubled quote as an
/// escaped one.
fn read_quoted(s: &str, quote: char) -> Option<String> {
    let mut out = String::new();
    let mut chars = s[1..].chars().peekable();
    while let Some(c) = chars.next() {
        if c == quote {
            if chars.peek() == Some(&quote) {
                out.push(quote);
                chars.next();
            } else {
                return Some(out);
            }
        } else {
            out.push(c);
        }
    }
    None
}
