//! Full item lifecycle test against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `BoardService`
//! over real HTTP using a ureq `Transport`. Validates that request building,
//! the encoder and response classification agree with the server end to end.

use std::cell::RefCell;

use board_core::{
    format_item, format_items, ApiError, BoardConfig, BoardService, ColumnType, ColumnValue,
    ColumnValueMap, Decision, HttpRequest, HttpResponse, NewItemForm, Notice, NoticeLevel, Notifier,
    Outcome, Transport, TransportError,
};
use mock_server::Board;

const TOKEN: &str = "secret";

/// Executes requests with ureq, returning 4xx/5xx responses as data so the
/// client does the status interpretation.
struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(|e| TransportError::new(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().unwrap_or_default();
        Ok(HttpResponse { status, body })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: RefCell<Vec<Notice>>,
}

impl RecordingNotifier {
    fn levels(&self) -> Vec<NoticeLevel> {
        self.notices.borrow().iter().map(|notice| notice.level).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}

/// Start the mock server on a random port and return its `/v2` URL.
fn start_server(token: Option<&'static str>) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, Board::sample(), token).await
        })
        .unwrap();
    });

    format!("http://{addr}/v2")
}

fn config(api_url: &str, token: Option<&str>) -> BoardConfig {
    BoardConfig {
        api_url: api_url.to_string(),
        api_token: token.map(str::to_string),
        ..BoardConfig::default()
    }
    .with_board_id("123")
}

fn done<T: std::fmt::Debug>(outcome: Outcome<T>, step: &str) -> T {
    match outcome {
        Outcome::Done(data) => data,
        other => panic!("{step}: expected Done, got {other:?}"),
    }
}

#[test]
fn item_lifecycle() {
    // Step 1: start mock server requiring a token.
    let api_url = start_server(Some(TOKEN));
    let notifier = RecordingNotifier::default();
    let service = BoardService::new(config(&api_url, Some(TOKEN)), UreqTransport::new(), &notifier);

    // Step 2: list, should be empty.
    let items = done(service.fetch_items(), "initial list");
    assert!(items.is_empty(), "expected empty board");

    // Step 3: create a bare item; no template yet, so no column values.
    let form = NewItemForm {
        name: "Walk dog".to_string(),
        ..NewItemForm::default()
    };
    let first = done(service.create_from_form(&form, None), "create first");

    // Step 4: create a second item using the first one as column template.
    let items = done(service.fetch_items(), "list after first create");
    let form = NewItemForm {
        name: "Hire \"Ada\"".to_string(),
        person: "2".to_string(),
        firstname: "Ada".to_string(),
        lastname: "Lovelace".to_string(),
    };
    let second = done(service.create_from_form(&form, items.first()), "create second");
    assert_ne!(first.id, second.id);

    // Step 5: list and format.
    let items = done(service.fetch_items(), "list after second create");
    let formatted = format_items(&items).unwrap();
    assert_eq!(formatted.len(), 2);
    let hire = formatted.iter().find(|item| item.id == second.id).unwrap();
    assert_eq!(hire.item_name, "Hire \"Ada\"");
    assert_eq!(hire.firstname, "Ada");
    assert_eq!(hire.lastname, "Lovelace");
    assert_eq!(hire.status, "");
    assert_eq!(hire.person.as_deref(), Some("2"));

    // Step 6: edit text and typed columns in one call.
    let mut values = ColumnValueMap::from_text_edits([("text_first", "Augusta")]);
    values.insert("hour", ColumnValue::hour("09:30"));
    values.insert("checkbox", ColumnValue::checkbox(true));
    values.insert("link", ColumnValue::board_relation(first.id.parse().unwrap()));
    values.insert("email", ColumnValue::null(ColumnType::Email));
    done(service.update_item(&second.id, &values), "update");

    // Step 7: approve.
    done(service.decide(&second.id, Decision::Approved), "decide");

    let items = done(service.fetch_items(), "list after update");
    let item = items.iter().find(|item| item.id == second.id).unwrap();
    let formatted = format_item(item).unwrap();
    assert_eq!(formatted.firstname, "Augusta");
    assert_eq!(formatted.status, "Approved");
    let text_of = |column: &str| {
        item.column_values
            .iter()
            .find(|entry| entry.id == column)
            .and_then(|entry| entry.text.clone())
    };
    assert_eq!(text_of("hour").as_deref(), Some("09:30"));
    assert_eq!(text_of("checkbox").as_deref(), Some("v"));
    assert_eq!(text_of("link").as_deref(), Some("Walk dog"));
    assert_eq!(text_of("person").as_deref(), Some("Grace Hopper"));

    // Step 8: an unknown column is a remote failure with an error notice.
    let values: ColumnValueMap = [("no_such_column", ColumnValue::text("x"))].into_iter().collect();
    match service.update_item(&second.id, &values) {
        Outcome::Failed(ApiError::Remote { code, .. }) => assert_eq!(code, "InvalidColumnIdException"),
        other => panic!("expected remote failure, got {other:?}"),
    }
    assert_eq!(notifier.levels().last(), Some(&NoticeLevel::Error));

    // Step 9: delete both; list should be empty again.
    done(service.delete_item(&first.id), "delete first");
    done(service.delete_item(&second.id), "delete second");
    assert!(done(service.fetch_items(), "final list").is_empty());

    // Step 10: deleting again reports the missing item.
    assert!(matches!(
        service.delete_item(&first.id),
        Outcome::Failed(ApiError::Remote { .. })
    ));

    // Step 11: users load into a fresh directory.
    let directory = service.load_users(None, chrono::Utc::now()).unwrap();
    assert_eq!(directory.users.len(), 3);
    assert_eq!(directory.users[1].name, "Grace Hopper");

    let successes = notifier
        .levels()
        .into_iter()
        .filter(|level| *level == NoticeLevel::Success)
        .count();
    assert_eq!(successes, 6, "two creates, update, decide, two deletes");
}

#[test]
fn missing_token_is_unauthorized() {
    let api_url = start_server(Some(TOKEN));
    let notifier = RecordingNotifier::default();
    let service = BoardService::new(config(&api_url, None), UreqTransport::new(), &notifier);

    assert!(matches!(service.fetch_items(), Outcome::Unauthorized));
    assert!(service.fetch_users().data_or_default().is_empty());
    assert!(notifier.notices.borrow().is_empty(), "unauthorized shows no notice");
}

#[test]
fn unconfigured_board_sends_nothing() {
    // Nothing listens on this port; a request would be a transport failure.
    let config = BoardConfig {
        api_url: "http://127.0.0.1:9/v2".to_string(),
        ..BoardConfig::default()
    };
    let notifier = RecordingNotifier::default();
    let service = BoardService::new(config, UreqTransport::new(), &notifier);

    assert!(matches!(service.fetch_items(), Outcome::NotConfigured));
    assert!(matches!(
        service.create_item("x", &ColumnValueMap::new()),
        Outcome::NotConfigured
    ));
    assert!(notifier.notices.borrow().is_empty());
}

#[test]
fn unreachable_server_is_a_failure() {
    let config = BoardConfig {
        api_url: "http://127.0.0.1:9/v2".to_string(),
        ..BoardConfig::default()
    }
    .with_board_id("123");
    let notifier = RecordingNotifier::default();
    let service = BoardService::new(config, UreqTransport::new(), &notifier);

    assert!(matches!(
        service.fetch_items(),
        Outcome::Failed(ApiError::Transport(_))
    ));
    assert_eq!(notifier.levels(), vec![NoticeLevel::Error]);
}
