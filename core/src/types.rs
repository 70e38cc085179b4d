//! Records read back from the board API.
//!
//! # Design
//! These are read-only projections of the remote GraphQL schema, limited to
//! the fields the board queries select. Ids stay strings because the API
//! returns them as strings. Nothing here is mutated locally; after a write
//! the caller re-fetches.

use serde::{Deserialize, Serialize};

/// A single row of a board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub column_values: Vec<ColumnValueEntry>,
}

/// One column's value on an item, as the items query returns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnValueEntry {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    pub column: ColumnRef,
    /// Present only on people columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persons_and_teams: Option<Vec<PersonOrTeam>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnRef {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonOrTeam {
    pub id: String,
    pub kind: String,
}

/// An account user, as listed by the users query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// The `{ id }` selection every mutation returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRef {
    pub id: String,
}

/// Outcome of an approval step, written to the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::Rejected => "Rejected",
        }
    }
}
