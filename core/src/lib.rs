//! Synchronous client core for a work-management board API.
//!
//! # Overview
//! Translates typed form data into the board API's GraphQL mutations, builds
//! `HttpRequest` values and parses `HttpResponse` values without touching the
//! network (host-does-IO pattern). The host supplies a `Transport`; the core
//! stays deterministic and testable.
//!
//! # Design
//! - `column` encodes `{type, value}` column values into the escaped JSON
//!   fragment a mutation embeds; bad fields are skipped, never fatal.
//! - `mapper` resolves column titles to ids and flattens items for display.
//! - `mutation` holds the pure GraphQL templates.
//! - `BoardClient` is stateless: `build_*` produces a request, `parse_*`
//!   classifies the response.
//! - `BoardService` runs one call at a time through an injected `Transport`
//!   and `Notifier`, applying the same failure policy everywhere.

pub mod cache;
pub mod client;
pub mod column;
pub mod config;
pub mod error;
pub mod http;
pub mod mapper;
pub mod mutation;
pub mod service;
pub mod types;

pub use cache::UserDirectory;
pub use client::BoardClient;
pub use column::{
    encode_column_values, encode_fields, ColumnType, ColumnValue, ColumnValueMap, FieldOutcome,
    SkipReason,
};
pub use config::BoardConfig;
pub use error::{ApiError, ConfigError, MapperError, TransportError};
pub use http::{HttpRequest, HttpResponse, Transport};
pub use mapper::{format_item, format_items, ColumnIndex, ColumnMapping, FormattedItem, KeyMapping, NewItemForm};
pub use service::{BoardService, LogNotifier, Notice, NoticeLevel, Notifier, Outcome};
pub use types::{ColumnRef, ColumnValueEntry, Decision, Item, ItemRef, PersonOrTeam, User};
