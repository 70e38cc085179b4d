use anyhow::{anyhow, bail, Context, Result};
use board_core::config::BOARD_ID_VAR;
use board_core::{
    format_items, BoardConfig, BoardService, ColumnType, ColumnValue, ColumnValueMap, Decision,
    LogNotifier, NewItemForm, Notifier, Outcome, Transport, UserDirectory,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

mod transport;
mod user_cache;

use transport::UreqTransport;
use user_cache::UserCache;

#[derive(Parser, Debug)]
#[command(name = "board")]
#[command(version, about = "Manage items on a monday.com board", long_about = None)]
struct Cli {
    /// Log requests and skipped column values
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Board id; overrides MONDAY_BOARD_ID
    #[arg(long, global = true)]
    board: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the board's items
    Items {
        /// Print the raw items as JSON instead of the formatted table
        #[arg(long)]
        json: bool,
    },
    /// Show account users, from the daily cache when fresh
    Users {
        /// Fetch even when the cache is fresh. A failed fetch keeps the cache.
        #[arg(long)]
        refresh: bool,
    },
    /// Create an item from the new-item form fields
    Create {
        #[arg(long)]
        name: String,
        /// Person id to assign
        #[arg(long, default_value = "")]
        person: String,
        #[arg(long, default_value = "")]
        firstname: String,
        #[arg(long, default_value = "")]
        lastname: String,
    },
    /// Change column values of an item in one call
    Update {
        item_id: String,
        /// Text edit as COLUMN_ID=TEXT (repeatable)
        #[arg(long = "set", value_name = "COLUMN_ID=TEXT")]
        set: Vec<String>,
        /// Typed value as COLUMN_ID:TYPE=VALUE, VALUE parsed as JSON when it parses (repeatable)
        #[arg(long = "value", value_name = "COLUMN_ID:TYPE=VALUE")]
        values: Vec<String>,
    },
    /// Delete an item
    Delete { item_id: String },
    /// Approve or reject an item through its status column
    Decide {
        item_id: String,
        #[arg(value_enum)]
        decision: DecisionArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DecisionArg {
    Approve,
    Reject,
}

impl From<DecisionArg> for Decision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Approve => Decision::Approved,
            DecisionArg::Reject => Decision::Rejected,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let board = cli.board.clone();
    let config = BoardConfig::from_lookup(|key| match (key, &board) {
        (BOARD_ID_VAR, Some(board)) => Some(board.clone()),
        _ => std::env::var(key).ok(),
    })
    .context("reading board configuration")?;
    let service = BoardService::new(config, UreqTransport::new(), LogNotifier);

    match cli.command {
        Commands::Items { json } => {
            let items = finish(service.fetch_items())?.unwrap_or_default();
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
                return Ok(());
            }
            let formatted = format_items(&items).context("board is missing an expected column")?;
            for item in &formatted {
                println!(
                    "{:>12}  {:<24} {:<14} {:<14} {:<12} {}",
                    item.id,
                    item.item_name,
                    item.firstname,
                    item.lastname,
                    item.status,
                    item.person.as_deref().unwrap_or("-"),
                );
            }
            println!("{} item(s)", formatted.len());
        }
        Commands::Users { refresh } => {
            let cache = UserCache::default_location();
            match sync_users(&service, &cache, refresh, Utc::now())? {
                Some(directory) => {
                    for user in &directory.users {
                        println!("{:>10}  {:<28} {}", user.id, user.name, user.email);
                    }
                    println!(
                        "{} user(s), fetched {}",
                        directory.users.len(),
                        directory.fetched_at.format("%Y-%m-%d %H:%M UTC")
                    );
                }
                None => println!("no users available"),
            }
        }
        Commands::Create {
            name,
            person,
            firstname,
            lastname,
        } => {
            let form = NewItemForm {
                name,
                person,
                firstname,
                lastname,
            };
            // Column ids come from any existing item of the board.
            let items = finish(service.fetch_items())?.unwrap_or_default();
            if let Some(created) = finish(service.create_from_form(&form, items.first()))? {
                println!("created item {}", created.id);
            }
        }
        Commands::Update { item_id, set, values } => {
            let mut edits = ColumnValueMap::from_text_edits(
                set.iter()
                    .map(|edit| split_pair(edit, '='))
                    .collect::<Result<Vec<_>>>()?,
            );
            for raw in &values {
                let (column_id, value) = parse_typed_value(raw)?;
                edits.insert(column_id, value);
            }
            if edits.is_empty() {
                bail!("nothing to update; pass --set or --value");
            }
            if let Some(updated) = finish(service.update_item(&item_id, &edits))? {
                println!("updated item {}", updated.id);
            }
        }
        Commands::Delete { item_id } => {
            if let Some(deleted) = finish(service.delete_item(&item_id))? {
                println!("deleted item {}", deleted.id);
            }
        }
        Commands::Decide { item_id, decision } => {
            let decision = Decision::from(decision);
            if let Some(updated) = finish(service.decide(&item_id, decision))? {
                println!("item {} marked {}", updated.id, decision.label());
            }
        }
    }

    Ok(())
}

/// Map a service outcome to the process result. Unauthorized is not an
/// error here: it yields no data after a hint on stderr.
fn finish<T>(outcome: Outcome<T>) -> Result<Option<T>> {
    match outcome {
        Outcome::Done(data) => Ok(Some(data)),
        Outcome::Unauthorized => {
            eprintln!("not authorized for this board; check MONDAY_API_TOKEN");
            Ok(None)
        }
        Outcome::Retryable { code, message } => {
            bail!("the board API is busy ({code}): {message}; try again shortly")
        }
        Outcome::NotConfigured => bail!("no board configured; set MONDAY_BOARD_ID or pass --board"),
        Outcome::Invalid(e) => Err(anyhow!(e)),
        Outcome::Failed(e) => Err(anyhow!(e).context("board request failed")),
    }
}

/// Load the user directory through `cache`, fetching when it is stale or
/// `refresh` is set. The file is only rewritten when a fetch produced a new
/// directory, so a failed refresh leaves the previous one in place.
fn sync_users<T: Transport, N: Notifier>(
    service: &BoardService<T, N>,
    cache: &UserCache,
    refresh: bool,
    now: DateTime<Utc>,
) -> Result<Option<UserDirectory>> {
    let cached = cache.load();
    let loaded = if refresh {
        service.refresh_users(cached.clone(), now)
    } else {
        service.load_users(cached.clone(), now)
    };
    if let Some(directory) = &loaded {
        if cached.as_ref() != Some(directory) {
            cache.store(directory)?;
        }
    }
    Ok(loaded)
}

fn split_pair(raw: &str, separator: char) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once(separator)
        .ok_or_else(|| anyhow!("expected KEY{separator}VALUE, got {raw:?}"))?;
    if key.trim().is_empty() {
        bail!("empty column id in {raw:?}");
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn parse_typed_value(raw: &str) -> Result<(String, ColumnValue)> {
    let (target, value) = split_pair(raw, '=')?;
    let (column_id, kind) = target
        .split_once(':')
        .map(|(id, kind)| (id.to_string(), ColumnType::parse(kind.trim())))
        .unwrap_or((target.clone(), ColumnType::Text));
    let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
    Ok((column_id, ColumnValue::new(kind, value)))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use board_core::{HttpRequest, HttpResponse, TransportError, User};
    use chrono::TimeZone;

    use super::*;

    /// Answers every request with the same canned result and counts calls.
    struct FixedTransport {
        response: Option<HttpResponse>,
        calls: Cell<usize>,
    }

    impl FixedTransport {
        fn answering(body: &str) -> Self {
            Self {
                response: Some(HttpResponse::ok(body)),
                calls: Cell::new(0),
            }
        }

        fn unreachable() -> Self {
            Self {
                response: None,
                calls: Cell::new(0),
            }
        }
    }

    impl Transport for FixedTransport {
        fn execute(&self, _request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            self.calls.set(self.calls.get() + 1);
            self.response
                .clone()
                .ok_or_else(|| TransportError::new("connection refused"))
        }
    }

    struct Silent;

    impl Notifier for Silent {
        fn notify(&self, _notice: board_core::Notice) {}
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()
    }

    fn cached_directory(fetched_at: DateTime<Utc>) -> UserDirectory {
        UserDirectory::new(
            vec![User {
                id: "1".to_string(),
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
            }],
            fetched_at,
        )
    }

    fn service(transport: &FixedTransport) -> BoardService<&FixedTransport, Silent> {
        BoardService::new(BoardConfig::default(), transport, Silent)
    }

    #[test]
    fn failed_refresh_keeps_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UserCache::at(dir.path().join("users.json"));
        let stored = cached_directory(now() - chrono::Duration::hours(1));
        cache.store(&stored).unwrap();

        let transport = FixedTransport::unreachable();
        let loaded = sync_users(&service(&transport), &cache, true, now()).unwrap();

        assert_eq!(transport.calls.get(), 1);
        assert_eq!(loaded, Some(stored.clone()));
        assert_eq!(cache.load(), Some(stored));
    }

    #[test]
    fn empty_refresh_keeps_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UserCache::at(dir.path().join("users.json"));
        let stored = cached_directory(now() - chrono::Duration::hours(30));
        cache.store(&stored).unwrap();

        let transport = FixedTransport::answering(r#"{"data":{"users":[]}}"#);
        let loaded = sync_users(&service(&transport), &cache, true, now()).unwrap();

        assert_eq!(loaded, Some(stored.clone()));
        assert_eq!(cache.load(), Some(stored));
    }

    #[test]
    fn refresh_replaces_fresh_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UserCache::at(dir.path().join("users.json"));
        cache.store(&cached_directory(now())).unwrap();

        let transport = FixedTransport::answering(
            r#"{"data":{"users":[{"id":"2","name":"Grace Hopper","email":"grace@example.com"}]}}"#,
        );
        let loaded = sync_users(&service(&transport), &cache, true, now()).unwrap().unwrap();

        assert_eq!(loaded.users[0].name, "Grace Hopper");
        assert_eq!(cache.load(), Some(loaded));
    }

    #[test]
    fn fresh_cache_is_used_without_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UserCache::at(dir.path().join("users.json"));
        let stored = cached_directory(now() - chrono::Duration::hours(2));
        cache.store(&stored).unwrap();

        let transport = FixedTransport::unreachable();
        let loaded = sync_users(&service(&transport), &cache, false, now()).unwrap();

        assert_eq!(transport.calls.get(), 0);
        assert_eq!(loaded, Some(stored));
    }

    #[test]
    fn failed_fetch_without_cache_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UserCache::at(dir.path().join("users.json"));

        let transport = FixedTransport::unreachable();
        assert_eq!(sync_users(&service(&transport), &cache, false, now()).unwrap(), None);
        assert!(!cache.path().exists());
    }

    #[test]
    fn typed_value_parses_json_when_possible() {
        let (id, value) = parse_typed_value("done:checkbox=true").unwrap();
        assert_eq!(id, "done");
        assert_eq!(value, ColumnValue::checkbox(true));

        let (id, value) = parse_typed_value(r#"when:timeline={"from":"2024-01-01","to":"2024-01-02"}"#).unwrap();
        assert_eq!(id, "when");
        assert_eq!(value, ColumnValue::timeline("2024-01-01", "2024-01-02"));
    }

    #[test]
    fn typed_value_falls_back_to_string_and_text() {
        let (_, value) = parse_typed_value("start:hour=09:30").unwrap();
        assert_eq!(value, ColumnValue::hour("09:30"));

        let (id, value) = parse_typed_value("notes=hello world").unwrap();
        assert_eq!(id, "notes");
        assert_eq!(value, ColumnValue::text("hello world"));
    }

    #[test]
    fn pairs_need_a_key() {
        assert!(split_pair("=x", '=').is_err());
        assert!(split_pair("novalue", '=').is_err());
        assert_eq!(
            split_pair("text0=a=b", '=').unwrap(),
            ("text0".to_string(), "a=b".to_string())
        );
    }

    #[test]
    fn decision_argument_maps_to_label() {
        assert_eq!(Decision::from(DecisionArg::Approve).label(), "Approved");
        assert_eq!(Decision::from(DecisionArg::Reject).label(), "Rejected");
    }

    #[test]
    fn cli_parses_update() {
        let cli = Cli::try_parse_from([
            "board", "--board", "42", "update", "7", "--set", "text0=Ada", "--value", "status:status=Done",
        ])
        .unwrap();
        assert_eq!(cli.board.as_deref(), Some("42"));
        match cli.command {
            Commands::Update { item_id, set, values } => {
                assert_eq!(item_id, "7");
                assert_eq!(set, vec!["text0=Ada"]);
                assert_eq!(values, vec!["status:status=Done"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
