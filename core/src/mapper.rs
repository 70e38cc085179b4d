//! Field-name ↔ column-id translation.
//!
//! Forms speak in column titles ("Status", "First Name"); the API speaks in
//! column ids ("status", "text_mkq2"). `KeyMapping` resolves the forward
//! direction for writes, `ColumnIndex` the reverse direction for reads. Both
//! look titles up exactly and report a missing title instead of guessing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::column::{ColumnType, ColumnValue, ColumnValueMap};
use crate::error::MapperError;
use crate::types::{ColumnValueEntry, Item};

pub const PERSON_TITLE: &str = "Person";
pub const FIRST_NAME_TITLE: &str = "First Name";
pub const LAST_NAME_TITLE: &str = "Last Name";
pub const NAME_TITLE: &str = "Name";
pub const STATUS_TITLE: &str = "Status";

/// One `{title, id, type}` row of a key mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub title: String,
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: ColumnType,
}

impl ColumnMapping {
    pub fn new(title: impl Into<String>, id: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
            kind,
        }
    }
}

/// Ordered title → column lookup. The first row with a matching title wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMapping {
    columns: Vec<ColumnMapping>,
}

impl KeyMapping {
    pub fn new(columns: Vec<ColumnMapping>) -> Self {
        Self { columns }
    }

    pub fn resolve(&self, title: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|column| column.title == title)
    }

    /// Turn `{field name → raw value}` pairs into typed column values.
    ///
    /// Unmapped field names are used as column ids verbatim, typed `text`.
    pub fn replace_keys<I, K, V>(&self, fields: I) -> ColumnValueMap
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        fields
            .into_iter()
            .map(|(field, raw)| {
                let field = field.as_ref();
                let (id, kind) = match self.resolve(field) {
                    Some(column) => (column.id.clone(), column.kind),
                    None => (field.to_string(), ColumnType::Text),
                };
                (id, ColumnValue::new(kind, raw))
            })
            .collect()
    }
}

/// Copy the form values named in `key_mapper` under their mapped keys.
///
/// `key_mapper` is `(form key, target key)` pairs; output follows its order
/// and omits form keys that are absent.
pub fn check_matches(form: &Map<String, Value>, key_mapper: &[(&str, &str)]) -> Vec<(String, Value)> {
    key_mapper
        .iter()
        .filter_map(|(form_key, target)| {
            form.get(*form_key)
                .map(|value| (target.to_string(), value.clone()))
        })
        .collect()
}

/// Exact-title index over one item's column values.
#[derive(Debug)]
pub struct ColumnIndex<'a> {
    item_id: &'a str,
    by_title: HashMap<&'a str, &'a ColumnValueEntry>,
}

impl<'a> ColumnIndex<'a> {
    pub fn new(item: &'a Item) -> Self {
        let mut by_title = HashMap::new();
        for entry in &item.column_values {
            if let Some(title) = entry.column.title.as_deref() {
                by_title.entry(title).or_insert(entry);
            }
        }
        Self {
            item_id: &item.id,
            by_title,
        }
    }

    pub fn get(&self, title: &str) -> Option<&'a ColumnValueEntry> {
        self.by_title.get(title).copied()
    }

    pub fn lookup(&self, title: &str) -> Result<&'a ColumnValueEntry, MapperError> {
        self.get(title).ok_or_else(|| MapperError::MissingColumn {
            item_id: self.item_id.to_string(),
            title: title.to_string(),
        })
    }

    /// Display text of the column titled `title`; empty when the API sent null.
    pub fn text(&self, title: &str) -> Result<String, MapperError> {
        Ok(self.lookup(title)?.text.clone().unwrap_or_default())
    }
}

/// Flattened display shape of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedItem {
    pub id: String,
    pub item_name: String,
    pub firstname: String,
    pub lastname: String,
    pub status: String,
    /// Id of the first person assigned in the `Person` column, if any.
    pub person: Option<String>,
}

pub fn format_item(item: &Item) -> Result<FormattedItem, MapperError> {
    let index = ColumnIndex::new(item);
    let person = index
        .get(PERSON_TITLE)
        .and_then(|entry| entry.persons_and_teams.as_ref())
        .and_then(|persons| persons.first())
        .map(|person| person.id.clone());

    Ok(FormattedItem {
        id: item.id.clone(),
        item_name: index.text(NAME_TITLE)?,
        firstname: index.text(FIRST_NAME_TITLE)?,
        lastname: index.text(LAST_NAME_TITLE)?,
        status: index.text(STATUS_TITLE)?,
        person,
    })
}

pub fn format_items(items: &[Item]) -> Result<Vec<FormattedItem>, MapperError> {
    items.iter().map(format_item).collect()
}

/// Fields of the "new item" form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItemForm {
    pub name: String,
    #[serde(default)]
    pub person: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

impl NewItemForm {
    /// The trimmed item name; creation requires one.
    pub fn item_name(&self) -> Result<&str, MapperError> {
        match self.name.trim() {
            "" => Err(MapperError::BlankName),
            name => Ok(name),
        }
    }
}

/// Build the create payload for `form`, taking column ids from `template`
/// (any existing item of the board) by the same titles `format_item` reads.
///
/// Empty form fields are left out, as are fields whose column the template
/// does not have.
pub fn new_item_values(form: &NewItemForm, template: Option<&Item>) -> ColumnValueMap {
    let mut values = ColumnValueMap::new();
    let Some(template) = template else {
        tracing::warn!("board has no items to take column ids from; sending no column values");
        return values;
    };
    let index = ColumnIndex::new(template);

    let fields = [
        (PERSON_TITLE, ColumnType::People, &form.person),
        (FIRST_NAME_TITLE, ColumnType::Text, &form.firstname),
        (LAST_NAME_TITLE, ColumnType::Text, &form.lastname),
    ];
    for (title, kind, value) in fields {
        if value.is_empty() {
            continue;
        }
        match index.get(title) {
            Some(column) => {
                values.insert(column.id.clone(), ColumnValue::new(kind, value.as_str()));
            }
            None => tracing::warn!(title, item_id = %template.id, "template item lacks column"),
        }
    }
    values
}
