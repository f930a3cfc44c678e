//! Test doubles shared by unit tests

use crate::api::{ApiClient, RecordStream};
use crate::backoff::Sleeper;
use crate::error::{Error, Result};
use crate::types::{FetchMode, Query, Record, RecordId};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Records with the given ids
pub(crate) fn records(ids: &[RecordId]) -> Vec<Record> {
    ids.iter()
        .map(|id| Record::new(*id, json!({ "id": id })))
        .collect()
}

type SubscribeHook = Box<dyn Fn(usize) + Send + Sync>;

/// API client that replays scripted responses
///
/// Pages are handed out in order to `search`/`timeline`; once the script
/// runs dry every call returns an empty page. Subscriptions work the same
/// way and default to a stream that ends immediately.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    pages: Mutex<VecDeque<Result<Vec<Record>>>>,
    subscriptions: Mutex<VecDeque<Result<Vec<Result<Record>>>>>,
    calls: Mutex<Vec<(FetchMode, Query)>>,
    subscribe_calls: AtomicUsize,
    on_subscribe: Option<SubscribeHook>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(self, page: Result<Vec<Record>>) -> Self {
        self.pages.lock().unwrap().push_back(page);
        self
    }

    pub(crate) fn with_records(self, ids: &[RecordId]) -> Self {
        self.with_page(Ok(records(ids)))
    }

    pub(crate) fn with_error(self, err: Error) -> Self {
        self.with_page(Err(err))
    }

    pub(crate) fn with_subscription(self, items: Vec<Result<Record>>) -> Self {
        self.subscriptions.lock().unwrap().push_back(Ok(items));
        self
    }

    pub(crate) fn with_failed_subscription(self, err: Error) -> Self {
        self.subscriptions.lock().unwrap().push_back(Err(err));
        self
    }

    /// Run `hook` with the 1-based call number on every subscribe
    pub(crate) fn on_subscribe(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_subscribe = Some(Box::new(hook));
        self
    }

    pub(crate) fn calls(&self) -> Vec<(FetchMode, Query)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn queries(&self) -> Vec<Query> {
        self.calls().into_iter().map(|(_, q)| q).collect()
    }

    pub(crate) fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    fn next_page(&self, mode: FetchMode, query: &Query) -> Result<Vec<Record>> {
        self.calls.lock().unwrap().push((mode, query.clone()));
        self.pages.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }
}

#[async_trait]
impl ApiClient for ScriptedClient {
    async fn search(&self, query: &Query) -> Result<Vec<Record>> {
        self.next_page(FetchMode::Search, query)
    }

    async fn timeline(&self, query: &Query) -> Result<Vec<Record>> {
        self.next_page(FetchMode::Timeline, query)
    }

    async fn lookup(&self, id: RecordId) -> Result<Record> {
        match self.pages.lock().unwrap().pop_front() {
            Some(Err(err)) => Err(err),
            _ => Ok(Record::new(id, json!({ "id": id }))),
        }
    }

    async fn subscribe(&self, _terms: &[String]) -> Result<RecordStream> {
        let call = self.subscribe_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(ref hook) = self.on_subscribe {
            hook(call);
        }

        let script = self
            .subscriptions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Vec::new()));
        let items = script?;
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

type SleepHook = Box<dyn Fn(usize) + Send + Sync>;

/// Sleeper that returns immediately and remembers what was asked of it
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
    on_sleep: Option<SleepHook>,
}

impl RecordingSleeper {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `hook` with the 1-based sleep number before each sleep returns
    pub(crate) fn on_sleep(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_sleep = Some(Box::new(hook));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(duration);
            calls.len()
        };
        if let Some(ref hook) = self.on_sleep {
            hook(count);
        }
        tokio::task::yield_now().await;
    }
}
