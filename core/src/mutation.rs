//! GraphQL documents sent to the board API.
//!
//! Every function here is a pure string template: no I/O, no escaping beyond
//! what `column::encode_column_values` already applied. Ids are interpolated
//! as-is, and item names must already be safe inside a quoted string.

use crate::column::{encode_column_values, ColumnValue, ColumnValueMap};
use crate::types::Decision;

/// Group every new item is created in.
pub const DEFAULT_GROUP_ID: &str = "topics";

/// Page size for the items and users queries.
pub const PAGE_LIMIT: u32 = 500;

/// Column id the approval decision is written to.
pub const STATUS_COLUMN_ID: &str = "status";

pub fn create_item(board_id: &str, item_name: &str, values: &ColumnValueMap) -> String {
    let column_values = encode_column_values(values);
    format!(
        r#"mutation {{ create_item (board_id: {board_id}, group_id: "{DEFAULT_GROUP_ID}", item_name: "{item_name}", column_values: "{{{column_values}}}") {{ id }} }}"#
    )
}

pub fn change_column_values(board_id: &str, item_id: &str, values: &ColumnValueMap) -> String {
    let column_values = encode_column_values(values);
    format!(
        r#"mutation {{ change_multiple_column_values (board_id: {board_id}, item_id: {item_id}, column_values: "{{{column_values}}}") {{ id }} }}"#
    )
}

pub fn delete_item(item_id: &str) -> String {
    format!("mutation {{ delete_item (item_id: {item_id}) {{ id }} }}")
}

pub fn status_decision(board_id: &str, item_id: &str, decision: Decision) -> String {
    let values: ColumnValueMap = [(STATUS_COLUMN_ID, ColumnValue::status(decision.label()))]
        .into_iter()
        .collect();
    change_column_values(board_id, item_id, &values)
}

pub fn board_items(board_id: &str) -> String {
    format!(
        "query {{ boards(ids: {board_id}) {{ items_page(limit: {PAGE_LIMIT}) {{ items {{ id name column_values {{ id text column {{ id title }} ... on PeopleValue {{ persons_and_teams {{ id kind }} }} }} }} }} }} }}"
    )
}

pub fn account_users() -> String {
    format!("query {{ users (limit: {PAGE_LIMIT}) {{ id name email }} }}")
}
