//! Recognises the handful of GraphQL documents the board client sends.
//!
//! This is not a GraphQL parser. It finds the root field by name and reads
//! the named arguments textually, which is enough for the fixed templates
//! the client emits.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ListItems {
        board_id: String,
    },
    ListUsers,
    CreateItem {
        board_id: String,
        group_id: String,
        item_name: String,
        column_values: String,
    },
    ChangeColumnValues {
        board_id: String,
        item_id: String,
        column_values: String,
    },
    DeleteItem {
        item_id: String,
    },
}

pub fn parse(document: &str) -> Result<Operation, String> {
    let document = document.trim();
    if document.starts_with("mutation") {
        if document.contains("change_multiple_column_values") {
            return Ok(Operation::ChangeColumnValues {
                board_id: argument(document, "board_id")?,
                item_id: argument(document, "item_id")?,
                column_values: string_argument(document, "column_values")?,
            });
        }
        if document.contains("create_item") {
            return Ok(Operation::CreateItem {
                board_id: argument(document, "board_id")?,
                group_id: string_argument(document, "group_id")?,
                item_name: string_argument(document, "item_name")?,
                column_values: string_argument(document, "column_values")
                    .unwrap_or_else(|_| "{}".to_string()),
            });
        }
        if document.contains("delete_item") {
            return Ok(Operation::DeleteItem {
                item_id: argument(document, "item_id")?,
            });
        }
    } else if document.contains("boards(ids:") {
        return Ok(Operation::ListItems {
            board_id: argument(document, "ids")?,
        });
    } else if document.contains("users") {
        return Ok(Operation::ListUsers);
    }
    Err(format!("unsupported document: {document}"))
}

/// Locate `name:` and return the text after it, skipping whitespace.
fn after_name<'a>(document: &'a str, name: &str) -> Result<&'a str, String> {
    let needle = format!("{name}:");
    let start = document
        .match_indices(&needle)
        .find(|(i, _)| {
            document[..*i]
                .chars()
                .next_back()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
        })
        .map(|(i, _)| i + needle.len())
        .ok_or_else(|| format!("missing argument `{name}`"))?;
    Ok(document[start..].trim_start())
}

/// An unquoted argument such as an id.
fn argument(document: &str, name: &str) -> Result<String, String> {
    let rest = after_name(document, name)?;
    let value: String = rest
        .chars()
        .take_while(|&c| !(c.is_whitespace() || matches!(c, ',' | ')' | '{' | '}')))
        .collect();
    if value.is_empty() {
        return Err(format!("empty argument `{name}`"));
    }
    Ok(value)
}

/// A double-quoted string argument, unescaped.
fn string_argument(document: &str, name: &str) -> Result<String, String> {
    let rest = after_name(document, name)?;
    let mut chars = rest.chars();
    if chars.next() != Some('"') {
        return Err(format!("argument `{name}` is not a string"));
    }
    let mut value = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => value.push('\n'),
                Some('r') => value.push('\r'),
                Some('t') => value.push('\t'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    let decoded = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32);
                    match decoded {
                        Some(c) => value.push(c),
                        None => return Err(format!("bad unicode escape in `{name}`")),
                    }
                }
                Some(escaped) => value.push(escaped),
                None => break,
            },
            '"' => return Ok(value),
            c => value.push(c),
        }
    }
    Err(format!("unterminated string for `{name}`"))
}
