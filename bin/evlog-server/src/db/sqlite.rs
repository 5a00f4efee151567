//! SQLite implementation of [`EventStore`].
//!
//! Uses [`sqlx`] with the `sqlite` feature. The `events` table is created on
//! [`SqliteStore::connect`] if it is absent; an existing table is used as is.
//!
//! # Queries
//!
//! The `sqlx::query` (runtime-verified) form is used so that no
//! `DATABASE_URL` environment variable is needed at compile time.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use evlog_types::{CodecError, Event, NewEvent, codec};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, warn};

use super::{EventRecord, EventStore};

const CREATE_EVENTS_TABLE: &str = r#"CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    messages TEXT NOT NULL,
    response TEXT NOT NULL,
    model TEXT NOT NULL,
    stop_reason TEXT NOT NULL,
    content TEXT NOT NULL,
    type TEXT NOT NULL,
    role TEXT NOT NULL,
    cache_read_input_tokens INTEGER NOT NULL,
    input_tokens INTEGER NOT NULL,
    output_tokens INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)"#;

/// SQLite-backed event store.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and ensure the `events`
    /// table exists.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://events.db"`
    /// or `"sqlite::memory:"` for tests. An in-memory database lives only as
    /// long as its connection, so callers should pass `max_connections = 1`
    /// for it.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if url.contains(":memory:") {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        sqlx::query(CREATE_EVENTS_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl EventStore for SqliteStore {
    async fn insert_event(&self, record: EventRecord) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO events (session_id, messages, response, model, stop_reason, content, \
             type, role, cache_read_input_tokens, input_tokens, output_tokens) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&record.session_id)
        .bind(&record.messages)
        .bind(&record.response)
        .bind(&record.model)
        .bind(&record.stop_reason)
        .bind(&record.content)
        .bind(&record.kind)
        .bind(&record.role)
        .bind(record.cache_read_input_tokens)
        .bind(record.input_tokens)
        .bind(record.output_tokens)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_events(&self) -> Result<Vec<Event>, sqlx::Error> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT id, session_id, messages, response, model, stop_reason, content, type, role, \
             cache_read_input_tokens, input_tokens, output_tokens, created_at \
             FROM events ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let total = rows.len();
        let events: Vec<Event> = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                match row.into_event() {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!(event_id = id, error = %e, "skipping undecodable event row");
                        None
                    }
                }
            })
            .collect();
        debug!(total, returned = events.len(), "listed events");
        Ok(events)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// ── Row decoding ──────────────────────────────────────────────────────────────

/// Why a stored row could not be turned back into an [`Event`].
#[derive(Debug, Error)]
enum RowError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("{column} out of range: {value}")]
    TokenCount { column: &'static str, value: i64 },

    #[error("unparseable created_at {raw:?}: {source}")]
    CreatedAt {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i64,
    session_id: String,
    messages: String,
    response: String,
    model: String,
    stop_reason: String,
    content: String,
    #[sqlx(rename = "type")]
    kind: String,
    role: String,
    cache_read_input_tokens: i64,
    input_tokens: i64,
    output_tokens: i64,
    created_at: String,
}

impl EventRow {
    fn into_event(self) -> Result<Event, RowError> {
        let messages = codec::decode_messages(&self.messages)?;
        let response = codec::decode_response(&self.response)?;
        let created_at = parse_created_at(&self.created_at).map_err(|source| RowError::CreatedAt {
            raw: self.created_at.clone(),
            source,
        })?;
        Ok(Event {
            id: self.id,
            body: NewEvent {
                session_id: self.session_id,
                messages,
                response,
                model: self.model,
                stop_reason: self.stop_reason,
                content: self.content,
                kind: self.kind,
                role: self.role,
                cache_read_input_tokens: token_count(
                    "cache_read_input_tokens",
                    self.cache_read_input_tokens,
                )?,
                input_tokens: token_count("input_tokens", self.input_tokens)?,
                output_tokens: token_count("output_tokens", self.output_tokens)?,
            },
            created_at,
        })
    }
}

fn token_count(column: &'static str, value: i64) -> Result<u64, RowError> {
    u64::try_from(value).map_err(|_| RowError::TokenCount { column, value })
}

/// Accepts RFC 3339 text as well as SQLite's `CURRENT_TIMESTAMP` form
/// (`YYYY-MM-DD HH:MM:SS`, UTC), which older databases hold.
fn parse_created_at(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|dt| dt.and_utc())
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use evlog_types::{Message, ResponseContent};
    use tracing_test::traced_test;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:", 1)
            .await
            .expect("open in-memory sqlite")
    }

    fn sample(session: &str, text: &str) -> NewEvent {
        NewEvent {
            session_id: session.into(),
            messages: vec![Message {
                content: "hi".into(),
                role: "user".into(),
            }],
            response: vec![ResponseContent {
                kind: "text".into(),
                text: Some(text.into()),
                image: None,
            }],
            model: "m1".into(),
            stop_reason: "end".into(),
            content: text.into(),
            kind: "text".into(),
            role: "assistant".into(),
            cache_read_input_tokens: 0,
            input_tokens: 5,
            output_tokens: 3,
        }
    }

    async fn insert_raw(
        store: &SqliteStore,
        messages: &str,
        response: &str,
        created_at: Option<&str>,
    ) {
        let sql = match created_at {
            Some(_) => {
                "INSERT INTO events (session_id, messages, response, model, stop_reason, content, \
                 type, role, cache_read_input_tokens, input_tokens, output_tokens, created_at) \
                 VALUES ('raw', ?1, ?2, 'm', 'end', '', 'text', 'assistant', 0, 0, 0, ?3)"
            }
            None => {
                "INSERT INTO events (session_id, messages, response, model, stop_reason, content, \
                 type, role, cache_read_input_tokens, input_tokens, output_tokens) \
                 VALUES ('raw', ?1, ?2, 'm', 'end', '', 'text', 'assistant', 0, 0, 0)"
            }
        };
        let mut query = sqlx::query(sql).bind(messages).bind(response);
        if let Some(ts) = created_at {
            query = query.bind(ts);
        }
        query.execute(store.pool()).await.expect("raw insert");
    }

    #[tokio::test]
    async fn connect_is_idempotent_on_existing_table() {
        let store = memory_store().await;
        sqlx::query(CREATE_EVENTS_TABLE)
            .execute(store.pool())
            .await
            .expect("second create is a no-op");
    }

    #[tokio::test]
    async fn inserted_event_lists_back_unchanged() {
        let store = memory_store().await;
        let event = sample("s1", "hello");
        let id = store
            .insert_event(EventRecord::encode(event.clone()).unwrap())
            .await
            .unwrap();

        let listed = store.list_events().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].body, event);
    }

    #[tokio::test]
    async fn ids_increase_and_newest_lists_first() {
        let store = memory_store().await;
        let first = store
            .insert_event(EventRecord::encode(sample("s1", "one")).unwrap())
            .await
            .unwrap();
        let second = store
            .insert_event(EventRecord::encode(sample("s1", "two")).unwrap())
            .await
            .unwrap();
        assert!(second > first);

        let listed = store.list_events().await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert!(listed[0].created_at >= listed[1].created_at);
    }

    #[tokio::test]
    async fn empty_table_lists_nothing() {
        let store = memory_store().await;
        assert!(store.list_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn undecodable_rows_are_skipped_and_logged() {
        let store = memory_store().await;
        store
            .insert_event(EventRecord::encode(sample("s1", "good")).unwrap())
            .await
            .unwrap();
        insert_raw(&store, "{not json", "[]", None).await;

        let listed = store.list_events().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].body.content, "good");
        assert!(logs_contain("skipping undecodable event row"));
    }

    #[tokio::test]
    #[traced_test]
    async fn corrupt_response_column_is_skipped_and_logged() {
        let store = memory_store().await;
        insert_raw(&store, "[]", r#"[{"type": 7}]"#, None).await;
        store
            .insert_event(EventRecord::encode(sample("s1", "good")).unwrap())
            .await
            .unwrap();
        insert_raw(&store, "[]", "not json at all", None).await;

        let listed = store.list_events().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].body.session_id, "s1");
        assert!(logs_contain("skipping undecodable event row"));
        assert!(logs_contain("failed to decode response"));
    }

    #[tokio::test]
    async fn token_counts_beyond_u32_read_back() {
        let store = memory_store().await;
        let mut event = sample("s1", "big");
        event.input_tokens = 5_000_000_000;
        store
            .insert_event(EventRecord::encode(event).unwrap())
            .await
            .unwrap();
        let listed = store.list_events().await.unwrap();
        assert_eq!(listed[0].body.input_tokens, 5_000_000_000);
    }

    #[tokio::test]
    async fn legacy_rows_read_back() {
        let store = memory_store().await;
        insert_raw(&store, "null", "null", Some("2024-05-01 12:00:00")).await;

        let listed = store.list_events().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].body.messages.is_empty());
        assert!(listed[0].body.response.is_empty());
        assert_eq!(
            listed[0].created_at,
            "2024-05-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[tokio::test]
    async fn negative_token_count_skips_row() {
        let store = memory_store().await;
        sqlx::query(
            "INSERT INTO events (session_id, messages, response, model, stop_reason, content, \
             type, role, cache_read_input_tokens, input_tokens, output_tokens) \
             VALUES ('raw', '[]', '[]', 'm', 'end', '', 'text', 'assistant', 0, -4, 0)",
        )
        .execute(store.pool())
        .await
        .unwrap();
        assert!(store.list_events().await.unwrap().is_empty());
    }

    #[test]
    fn created_at_accepts_both_formats() {
        let a = parse_created_at("2024-05-01T12:00:00.250Z").unwrap();
        let b = parse_created_at("2024-05-01 12:00:00").unwrap();
        assert!(a > b);
        assert!(parse_created_at("yesterday").is_err());
    }
}
