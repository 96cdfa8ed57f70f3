#![allow(dead_code)]

use async_trait::async_trait;
use shared::errors::{Result, ServiceError};
use shared::{BotConfig, ChatId, FullName, TripEntry, User, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use trip_bot::sheets::{MemorySheet, Spreadsheet};
use trip_bot::state::ConversationState;
use trip_bot::store::{MemoryStore, StateRepository, StateStore};
use trip_bot::telegram::{Inbound, RecordingNotifier};
use trip_bot::Dispatcher;

pub const BOT_USERNAME: &str = "trip_journal_bot";
pub const ADMIN_ID: i64 = 1000;

pub fn test_config() -> BotConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("TELEGRAM_BOT_TOKEN", "123:test"),
        ("GOOGLE_SHEET_ID", "sheet-123"),
        ("ADMIN_IDS", "1000"),
        ("TIMEZONE", "Europe/Moscow"),
    ]);
    BotConfig::from_source(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

pub struct Harness {
    pub store: MemoryStore,
    pub notifier: RecordingNotifier,
    pub sheet: MemorySheet,
    pub repo: StateRepository,
    pub dispatcher: Arc<Dispatcher>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_parts(RecordingNotifier::new(), MemorySheet::with_header(TripEntry::headers()))
    }

    pub fn with_parts(notifier: RecordingNotifier, sheet: MemorySheet) -> Self {
        Self::with_sheet(notifier, sheet.clone(), Arc::new(sheet))
    }

    /// `sheet` is what the dispatcher writes to; `memory` is what tests inspect.
    pub fn with_sheet(notifier: RecordingNotifier, memory: MemorySheet, sheet: Arc<dyn Spreadsheet>) -> Self {
        let store = MemoryStore::new();
        Self::assemble(Arc::new(store.clone()), store, notifier, memory, sheet)
    }

    /// The dispatcher goes through `store`; tests read its backing memory directly.
    pub fn with_store(store: FailingStore) -> Self {
        let memory = MemorySheet::with_header(TripEntry::headers());
        let inner = store.inner.clone();
        Self::assemble(
            Arc::new(store),
            inner,
            RecordingNotifier::new(),
            memory.clone(),
            Arc::new(memory),
        )
    }

    fn assemble(
        dispatcher_store: Arc<dyn StateStore>,
        store: MemoryStore,
        notifier: RecordingNotifier,
        memory: MemorySheet,
        sheet: Arc<dyn Spreadsheet>,
    ) -> Self {
        let repo = StateRepository::new(Arc::new(store.clone()));
        let dispatcher = Dispatcher::new(
            dispatcher_store,
            Arc::new(notifier.clone()),
            sheet,
            Arc::new(test_config()),
            BOT_USERNAME,
        )
        .unwrap();

        Self {
            store,
            notifier,
            sheet: memory,
            repo,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub async fn text(&self, user_id: i64, text: &str) {
        self.dispatcher
            .handle(Inbound::Message {
                chat_id: ChatId(user_id),
                user_id: UserId(user_id),
                text: text.to_string(),
            })
            .await;
    }

    pub async fn press(&self, user_id: i64, data: &str) {
        self.dispatcher
            .handle(Inbound::ButtonPress {
                chat_id: ChatId(user_id),
                user_id: UserId(user_id),
                data: data.to_string(),
                press_id: format!("press-{}", data),
            })
            .await;
    }

    pub async fn state(&self, user_id: i64) -> ConversationState {
        self.repo.get_state(UserId(user_id)).await.unwrap()
    }

    pub async fn register(&self, user_id: i64, full_name: &str) {
        let user = User::new(UserId(user_id), FullName::new(full_name).unwrap());
        self.repo.save_user(&user).await.unwrap();
    }

    pub async fn last_text(&self) -> String {
        self.notifier.sent_texts().await.last().cloned().unwrap_or_default()
    }

    /// Walks a registered user from `/new` up to the confirmation screen.
    pub async fn fill_trip(&self, user_id: i64) {
        self.text(user_id, "/new").await;
        self.text(user_id, "21.09.2024 09:00").await;
        self.text(user_id, "55000").await;
        self.text(user_id, "21.09.2024 11:30").await;
        self.text(user_id, "55087").await;
        self.text(user_id, "Substation 7").await;
        self.press(user_id, "skip_address").await;
        self.text(user_id, "Replaced relay").await;
    }
}

fn storage_down() -> ServiceError {
    ServiceError::Storage("connection refused".to_string())
}

/// Memory-backed store that fails reads and/or writes to chosen keys.
#[derive(Clone)]
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_reads: bool,
    fail_write_prefix: Option<&'static str>,
}

impl FailingStore {
    pub fn unavailable(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_reads: true,
            fail_write_prefix: Some(""),
        }
    }

    pub fn rejecting_writes(inner: MemoryStore, prefix: &'static str) -> Self {
        Self {
            inner,
            fail_reads: false,
            fail_write_prefix: Some(prefix),
        }
    }

    fn write_fails(&self, key: &str) -> bool {
        self.fail_write_prefix
            .map(|prefix| key.starts_with(prefix))
            .unwrap_or(false)
    }
}

#[async_trait]
impl StateStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads {
            return Err(storage_down());
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        if self.write_fails(key) {
            return Err(storage_down());
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.write_fails(key) {
            return Err(storage_down());
        }
        self.inner.delete(key).await
    }

    async fn count_keys(&self, prefix: &str) -> Result<usize> {
        if self.fail_reads {
            return Err(storage_down());
        }
        self.inner.count_keys(prefix).await
    }
}

/// Sheet whose writes always fail with a transient error; reads optionally too.
#[derive(Clone)]
pub struct FailingSheet {
    pub inner: MemorySheet,
    fail_reads: bool,
}

impl FailingSheet {
    pub fn rejecting_appends(inner: MemorySheet) -> Self {
        Self {
            inner,
            fail_reads: false,
        }
    }

    pub fn unavailable(inner: MemorySheet) -> Self {
        Self {
            inner,
            fail_reads: true,
        }
    }
}

fn sheet_down() -> ServiceError {
    ServiceError::Spreadsheet("append failed with 503 Service Unavailable".to_string())
}

#[async_trait]
impl Spreadsheet for FailingSheet {
    async fn append_row(&self, _values: Vec<String>) -> Result<()> {
        Err(sheet_down())
    }

    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        if self.fail_reads {
            return Err(sheet_down());
        }
        self.inner.read_rows().await
    }

    async fn update_row(&self, _row_number: usize, _values: Vec<String>) -> Result<()> {
        Err(sheet_down())
    }
}
