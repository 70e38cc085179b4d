//! One-call-at-a-time board operations with a uniform failure policy.
//!
//! # Design
//! `BoardService` is the only place that talks to a `Transport`. Each method
//! builds one request, executes it, parses the response and folds the result
//! into an `Outcome`:
//! - authorization failures become `Unauthorized` and are not announced, so
//!   the caller simply shows no data;
//! - complexity and rate-limit errors become `Retryable` with a warning;
//! - every other failure becomes `Failed` with an error notice;
//! - with no board configured nothing is sent at all.
//!
//! Notices go through the `Notifier` the service was built with, and the
//! transport is likewise injected, so both can be replaced in tests.

use chrono::{DateTime, Utc};

use crate::cache::{replace_on_fetch, UserDirectory};
use crate::client::BoardClient;
use crate::column::{escape_for_string_literal, ColumnValueMap};
use crate::config::BoardConfig;
use crate::error::{ApiError, MapperError};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::mapper::{new_item_values, NewItemForm};
use crate::types::{Decision, Item, ItemRef, User};

/// How a board call ended.
#[derive(Debug)]
pub enum Outcome<T> {
    Done(T),
    /// The token may not read or write this board; treat as "no data".
    Unauthorized,
    /// The API asked us to back off; the same call may succeed later.
    Retryable { code: String, message: String },
    /// No board id is configured; nothing was sent.
    NotConfigured,
    /// Input failed a presence check; nothing was sent.
    Invalid(MapperError),
    Failed(ApiError),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn data(self) -> Option<T> {
        match self {
            Outcome::Done(data) => Some(data),
            _ => None,
        }
    }

    fn from_result(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Outcome::Done(data),
            Err(ApiError::Unauthorized) => Outcome::Unauthorized,
            Err(ApiError::Retryable { code, message }) => Outcome::Retryable { code, message },
            Err(e) => Outcome::Failed(e),
        }
    }
}

impl<T: Default> Outcome<T> {
    /// The fetched data, or an empty value for any non-success outcome.
    pub fn data_or_default(self) -> T {
        self.data().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A user-facing message about a finished call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub text: String,
}

impl Notice {
    fn new(level: NoticeLevel, text: &str) -> Self {
        let title = match level {
            NoticeLevel::Success => "Success",
            NoticeLevel::Warning => "Try again",
            NoticeLevel::Error => "Error",
        };
        Self {
            level,
            title: title.to_string(),
            text: text.to_string(),
        }
    }
}

/// Receives notices; the host decides how to show them.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice)
    }
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => tracing::info!(title = %notice.title, "{}", notice.text),
            NoticeLevel::Warning => tracing::warn!(title = %notice.title, "{}", notice.text),
            NoticeLevel::Error => tracing::error!(title = %notice.title, "{}", notice.text),
        }
    }
}

/// Texts shown for one kind of call.
struct Messages {
    action: &'static str,
    failure: &'static str,
    success: Option<&'static str>,
}

const FETCH_ITEMS: Messages = Messages {
    action: "fetch items",
    failure: "List items could not be fetched.",
    success: None,
};
const FETCH_USERS: Messages = Messages {
    action: "fetch users",
    failure: "Account users could not be loaded.",
    success: None,
};
const CREATE_ITEM: Messages = Messages {
    action: "create item",
    failure: "List item could not be created.",
    success: Some("List item created successfully."),
};
const UPDATE_ITEM: Messages = Messages {
    action: "update item",
    failure: "List item could not be updated.",
    success: Some("List item updated successfully."),
};
const DELETE_ITEM: Messages = Messages {
    action: "delete item",
    failure: "List item could not be deleted.",
    success: Some("List item deleted successfully."),
};
const RETRY_TEXT: &str = "The board is busy right now. Please try again shortly.";

pub struct BoardService<T, N> {
    client: BoardClient,
    config: BoardConfig,
    transport: T,
    notifier: N,
}

impl<T: Transport, N: Notifier> BoardService<T, N> {
    pub fn new(config: BoardConfig, transport: T, notifier: N) -> Self {
        Self {
            client: BoardClient::from_config(&config),
            config,
            transport,
            notifier,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn fetch_items(&self) -> Outcome<Vec<Item>> {
        let Some(board_id) = self.board_id(&FETCH_ITEMS) else {
            return Outcome::NotConfigured;
        };
        self.run(
            &FETCH_ITEMS,
            self.client.build_list_items(board_id),
            BoardClient::parse_list_items,
        )
    }

    pub fn fetch_users(&self) -> Outcome<Vec<User>> {
        self.run(
            &FETCH_USERS,
            self.client.build_list_users(),
            BoardClient::parse_list_users,
        )
    }

    /// Return the cached directory while fresh, otherwise fetch and replace.
    ///
    /// A failed or empty fetch keeps whatever was cached, stale or not.
    pub fn load_users(&self, cached: Option<UserDirectory>, now: DateTime<Utc>) -> Option<UserDirectory> {
        if let Some(directory) = cached.as_ref().filter(|d| d.is_fresh(now)) {
            tracing::debug!(users = directory.users.len(), "using cached user directory");
            return cached;
        }
        self.refresh_users(cached, now)
    }

    /// Fetch the directory regardless of freshness. A failed or empty fetch
    /// returns `cached` unchanged.
    pub fn refresh_users(&self, cached: Option<UserDirectory>, now: DateTime<Utc>) -> Option<UserDirectory> {
        let fetched = self.fetch_users().data_or_default();
        replace_on_fetch(cached, fetched, now)
    }

    /// Create an item. Double quotes and backslashes in `item_name` are
    /// escaped here since the mutation template embeds it verbatim.
    pub fn create_item(&self, item_name: &str, values: &ColumnValueMap) -> Outcome<ItemRef> {
        let Some(board_id) = self.board_id(&CREATE_ITEM) else {
            return Outcome::NotConfigured;
        };
        let item_name = escape_for_string_literal(item_name);
        self.run(
            &CREATE_ITEM,
            self.client.build_create_item(board_id, &item_name, values),
            BoardClient::parse_create_item,
        )
    }

    /// Create an item from the "new item" form, taking column ids from
    /// `template`.
    pub fn create_from_form(&self, form: &NewItemForm, template: Option<&Item>) -> Outcome<ItemRef> {
        let item_name = match form.item_name() {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "not creating item");
                return Outcome::Invalid(e);
            }
        };
        self.create_item(item_name, &new_item_values(form, template))
    }

    pub fn update_item(&self, item_id: &str, values: &ColumnValueMap) -> Outcome<ItemRef> {
        let Some(board_id) = self.board_id(&UPDATE_ITEM) else {
            return Outcome::NotConfigured;
        };
        self.run(
            &UPDATE_ITEM,
            self.client.build_update_item(board_id, item_id, values),
            BoardClient::parse_update_item,
        )
    }

    pub fn decide(&self, item_id: &str, decision: Decision) -> Outcome<ItemRef> {
        let Some(board_id) = self.board_id(&UPDATE_ITEM) else {
            return Outcome::NotConfigured;
        };
        self.run(
            &UPDATE_ITEM,
            self.client.build_status_decision(board_id, item_id, decision),
            BoardClient::parse_update_item,
        )
    }

    pub fn delete_item(&self, item_id: &str) -> Outcome<ItemRef> {
        self.run(
            &DELETE_ITEM,
            self.client.build_delete_item(item_id),
            BoardClient::parse_delete_item,
        )
    }

    fn board_id(&self, messages: &Messages) -> Option<&str> {
        match self.config.board_id() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(action = messages.action, "{e}");
                None
            }
        }
    }

    fn run<R>(
        &self,
        messages: &Messages,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&BoardClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Outcome<R> {
        let result = request.and_then(|request| {
            tracing::debug!(action = messages.action, url = %request.url, "sending request");
            let response = self.transport.execute(request)?;
            parse(&self.client, response)
        });

        let outcome = Outcome::from_result(result);
        match &outcome {
            Outcome::Done(_) => {
                tracing::info!(action = messages.action, "request succeeded");
                if let Some(text) = messages.success {
                    self.notifier.notify(Notice::new(NoticeLevel::Success, text));
                }
            }
            Outcome::Unauthorized => {
                tracing::debug!(action = messages.action, "not authorized; treating as no data");
            }
            Outcome::Retryable { code, message } => {
                tracing::warn!(action = messages.action, %code, %message, "retryable API error");
                self.notifier.notify(Notice::new(NoticeLevel::Warning, RETRY_TEXT));
            }
            Outcome::Failed(e) => {
                tracing::error!(action = messages.action, error = %e, "request failed");
                self.notifier.notify(Notice::new(NoticeLevel::Error, messages.failure));
            }
            Outcome::NotConfigured | Outcome::Invalid(_) => {}
        }
        outcome
    }
}
