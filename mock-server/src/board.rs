//! In-memory board with a fixed column schema.
//!
//! Column values arrive in the API's write format (`{"label": ..}`,
//! `{"hour": .., "minute": ..}` and so on) and are stored as the display text
//! the read query returns, the way the real service renders them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Name,
    Text,
    Status,
    Checkbox,
    People,
    Email,
    Hour,
    Timeline,
    BoardRelation,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub kind: ColumnKind,
}

impl Column {
    fn new(id: &str, title: &str, kind: ColumnKind) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default)]
struct Cell {
    text: Option<String>,
    persons: Vec<String>,
}

#[derive(Debug, Clone)]
struct StoredItem {
    name: String,
    group_id: String,
    cells: BTreeMap<String, Cell>,
}

/// Failures reported back in the API's `error_code` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    BoardNotFound(String),
    ItemNotFound(String),
    InvalidColumn(String),
    InvalidJson(String),
    InvalidValue { column: String, reason: String },
}

impl BoardError {
    pub fn code(&self) -> &'static str {
        match self {
            BoardError::BoardNotFound(_) | BoardError::ItemNotFound(_) => "ResourceNotFoundException",
            BoardError::InvalidColumn(_) => "InvalidColumnIdException",
            BoardError::InvalidJson(_) => "JsonParseException",
            BoardError::InvalidValue { .. } => "ColumnValueException",
        }
    }

    pub fn message(&self) -> String {
        match self {
            BoardError::BoardNotFound(id) => format!("Board {id} not found"),
            BoardError::ItemNotFound(id) => format!("Item {id} not found"),
            BoardError::InvalidColumn(id) => format!("This column ID doesn't exist for the board: {id}"),
            BoardError::InvalidJson(reason) => format!("column_values is not valid JSON: {reason}"),
            BoardError::InvalidValue { column, reason } => format!("invalid value for {column}: {reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Board {
    pub id: String,
    columns: Vec<Column>,
    items: BTreeMap<u64, StoredItem>,
    users: Vec<User>,
    next_item_id: u64,
}

impl Board {
    pub fn new(id: &str, columns: Vec<Column>, users: Vec<User>) -> Self {
        Self {
            id: id.to_string(),
            columns,
            items: BTreeMap::new(),
            users,
            next_item_id: 1001,
        }
    }

    /// Board `123` with one column of every supported type and three users.
    pub fn sample() -> Self {
        let columns = vec![
            Column::new("name", "Name", ColumnKind::Name),
            Column::new("person", "Person", ColumnKind::People),
            Column::new("text_first", "First Name", ColumnKind::Text),
            Column::new("text_last", "Last Name", ColumnKind::Text),
            Column::new("status", "Status", ColumnKind::Status),
            Column::new("email", "Email", ColumnKind::Email),
            Column::new("hour", "Start", ColumnKind::Hour),
            Column::new("timeline", "Timeline", ColumnKind::Timeline),
            Column::new("checkbox", "Done", ColumnKind::Checkbox),
            Column::new("link", "Related", ColumnKind::BoardRelation),
        ];
        let users = [("1", "Ada Lovelace"), ("2", "Grace Hopper"), ("3", "Alan Turing")]
            .into_iter()
            .map(|(id, name)| User {
                id: id.to_string(),
                name: name.to_string(),
                email: format!("{}@example.com", name.split(' ').next().unwrap_or(name).to_lowercase()),
            })
            .collect();
        Self::new("123", columns, users)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in the shape the items query selects.
    pub fn items_json(&self) -> Vec<Value> {
        self.items
            .iter()
            .map(|(id, item)| {
                let column_values: Vec<Value> = self
                    .columns
                    .iter()
                    .map(|column| {
                        let cell = item.cells.get(&column.id);
                        let text = match column.kind {
                            ColumnKind::Name => Some(item.name.clone()),
                            _ => cell.and_then(|cell| cell.text.clone()),
                        };
                        let mut entry = json!({
                            "id": column.id,
                            "text": text,
                            "column": { "id": column.id, "title": column.title },
                        });
                        if column.kind == ColumnKind::People {
                            let persons: Vec<Value> = cell
                                .map(|cell| cell.persons.as_slice())
                                .unwrap_or_default()
                                .iter()
                                .map(|id| json!({ "id": id, "kind": "person" }))
                                .collect();
                            entry["persons_and_teams"] = Value::Array(persons);
                        }
                        entry
                    })
                    .collect();
                json!({
                    "id": id.to_string(),
                    "name": item.name,
                    "group": { "id": item.group_id },
                    "column_values": column_values,
                })
            })
            .collect()
    }

    pub fn check_board(&self, board_id: &str) -> Result<(), BoardError> {
        if board_id == self.id {
            Ok(())
        } else {
            Err(BoardError::BoardNotFound(board_id.to_string()))
        }
    }

    pub fn create_item(
        &mut self,
        board_id: &str,
        group_id: &str,
        name: &str,
        column_values: &str,
    ) -> Result<u64, BoardError> {
        self.check_board(board_id)?;
        let mut item = StoredItem {
            name: name.to_string(),
            group_id: group_id.to_string(),
            cells: BTreeMap::new(),
        };
        self.apply(&mut item, column_values)?;
        let id = self.next_item_id;
        self.next_item_id += 1;
        self.items.insert(id, item);
        Ok(id)
    }

    /// Applies all values or none.
    pub fn change_column_values(
        &mut self,
        board_id: &str,
        item_id: &str,
        column_values: &str,
    ) -> Result<u64, BoardError> {
        self.check_board(board_id)?;
        let id = self.item_key(item_id)?;
        let mut item = self.items[&id].clone();
        self.apply(&mut item, column_values)?;
        self.items.insert(id, item);
        Ok(id)
    }

    pub fn delete_item(&mut self, item_id: &str) -> Result<u64, BoardError> {
        let id = self.item_key(item_id)?;
        self.items.remove(&id);
        Ok(id)
    }

    fn item_key(&self, item_id: &str) -> Result<u64, BoardError> {
        item_id
            .parse::<u64>()
            .ok()
            .filter(|id| self.items.contains_key(id))
            .ok_or_else(|| BoardError::ItemNotFound(item_id.to_string()))
    }

    fn apply(&self, item: &mut StoredItem, column_values: &str) -> Result<(), BoardError> {
        let values: Map<String, Value> =
            serde_json::from_str(column_values).map_err(|e| BoardError::InvalidJson(e.to_string()))?;
        for (column_id, value) in values {
            let column = self
                .columns
                .iter()
                .find(|column| column.id == column_id)
                .ok_or_else(|| BoardError::InvalidColumn(column_id.clone()))?;
            if column.kind == ColumnKind::Name {
                item.name = value.as_str().map(str::to_string).ok_or_else(|| invalid(column, "expected a string"))?;
                continue;
            }
            let cell = self.render(column, &value)?;
            item.cells.insert(column_id, cell);
        }
        Ok(())
    }

    /// Turn a write-format value into the stored display cell.
    fn render(&self, column: &Column, value: &Value) -> Result<Cell, BoardError> {
        if value.is_null() {
            return Ok(Cell::default());
        }
        let text = |s: String| -> Result<Cell, BoardError> {
            Ok(Cell {
                text: Some(s),
                persons: Vec::new(),
            })
        };
        match column.kind {
            ColumnKind::Name | ColumnKind::Text => match value {
                Value::String(s) => text(s.clone()),
                _ => Err(invalid(column, "expected a string")),
            },
            ColumnKind::Status => match value.get("label").and_then(Value::as_str).or(value.as_str()) {
                Some(label) => text(label.to_string()),
                None => Err(invalid(column, "expected {label}")),
            },
            ColumnKind::Checkbox => match value.get("checked").and_then(Value::as_str) {
                Some("true") => text("v".to_string()),
                _ => Ok(Cell::default()),
            },
            ColumnKind::Email => match value.get("email").and_then(Value::as_str) {
                Some(email) => {
                    let label = value.get("text").and_then(Value::as_str).unwrap_or(email);
                    text(label.to_string())
                }
                None => Err(invalid(column, "expected {email, text}")),
            },
            ColumnKind::Hour => {
                let hour = value.get("hour").and_then(Value::as_i64);
                let minute = value.get("minute").and_then(Value::as_i64);
                match (hour, minute) {
                    (Some(h), Some(m)) if (0..24).contains(&h) && (0..60).contains(&m) => {
                        text(format!("{h:02}:{m:02}"))
                    }
                    _ => Err(invalid(column, "expected {hour, minute} within a day")),
                }
            }
            ColumnKind::Timeline => {
                let from = value.get("from").and_then(Value::as_str);
                let to = value.get("to").and_then(Value::as_str);
                match (from, to) {
                    (Some(from), Some(to)) => text(format!("{from} - {to}")),
                    _ => Err(invalid(column, "expected {from, to}")),
                }
            }
            ColumnKind::People => {
                let ids: Vec<String> = value
                    .get("personsAndTeams")
                    .and_then(Value::as_array)
                    .ok_or_else(|| invalid(column, "expected {personsAndTeams}"))?
                    .iter()
                    .filter_map(|person| match person.get("id")? {
                        Value::String(id) => Some(id.clone()),
                        Value::Number(id) => Some(id.to_string()),
                        _ => None,
                    })
                    .collect();
                let names: Vec<&str> = ids
                    .iter()
                    .filter_map(|id| self.users.iter().find(|user| user.id == *id))
                    .map(|user| user.name.as_str())
                    .collect();
                Ok(Cell {
                    text: Some(names.join(", ")),
                    persons: ids,
                })
            }
            ColumnKind::BoardRelation => {
                let linked: Vec<String> = value
                    .get("linkedPulseIds")
                    .and_then(Value::as_array)
                    .ok_or_else(|| invalid(column, "expected {linkedPulseIds}"))?
                    .iter()
                    .filter_map(|link| link.get("linkedPulseId")?.as_u64())
                    .map(|id| match self.items.get(&id) {
                        Some(item) => item.name.clone(),
                        None => id.to_string(),
                    })
                    .collect();
                text(linked.join(", "))
            }
        }
    }
}

fn invalid(column: &Column, reason: &str) -> BoardError {
    BoardError::InvalidValue {
        column: column.id.clone(),
        reason: reason.to_string(),
    }
}
