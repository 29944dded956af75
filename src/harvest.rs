//! Time-windowed conversation harvesting: list threads, drop the stale ones,
//! fetch messages per surviving thread, aggregate in order.

use chrono::{DateTime, Duration, Local, NaiveDateTime};
use futures::{stream, StreamExt};
use tracing::{info, instrument, warn};

use crate::graph::{Conversation, GraphApi, GraphError, Message};
use crate::token::TokenState;

/// Wire layout of `updated_time`: offset without a colon, e.g.
/// `2024-01-01T10:00:00+0000`.
const UPDATED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Trailing window in days; threads untouched for longer are skipped.
    pub window_days: i64,
    /// Per-request thread listing bound.
    pub thread_limit: u32,
    /// Per-request message listing bound.
    pub message_limit: u32,
    /// Cursor pages to follow per listing. 1 reproduces the single-page
    /// reference behavior; anything higher is an explicit opt-in.
    pub max_pages: u32,
    /// Concurrent per-thread message fetches. Results stay in thread order
    /// for any value; 1 keeps the fetches strictly sequential.
    pub fetch_concurrency: usize,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            window_days: 30,
            thread_limit: 25,
            message_limit: 100,
            max_pages: 1,
            fetch_concurrency: 1,
        }
    }
}

/// List conversation threads for a page, following cursors up to
/// `options.max_pages`. Typed failure so callers can tell "call failed"
/// apart from "no data"; the harvester maps both to an empty contribution.
pub async fn list_threads(
    graph: &dyn GraphApi,
    page_token: &str,
    page_id: &str,
    options: &HarvestOptions,
) -> Result<Vec<Conversation>, GraphError> {
    let mut threads = Vec::new();
    let mut after: Option<String> = None;
    for _ in 0..options.max_pages.max(1) {
        let page = graph
            .conversations(page_token, page_id, options.thread_limit, after.as_deref())
            .await?;
        after = page.next_cursor().map(str::to_owned);
        threads.extend(page.data);
        if after.is_none() {
            break;
        }
    }
    Ok(threads)
}

/// List messages for one conversation, same cursor bound and failure
/// contract as [`list_threads`].
pub async fn list_messages(
    graph: &dyn GraphApi,
    page_token: &str,
    conversation_id: &str,
    options: &HarvestOptions,
) -> Result<Vec<Message>, GraphError> {
    let mut messages = Vec::new();
    let mut after: Option<String> = None;
    for _ in 0..options.max_pages.max(1) {
        let page = graph
            .messages(
                page_token,
                conversation_id,
                options.message_limit,
                after.as_deref(),
            )
            .await?;
        after = page.next_cursor().map(str::to_owned);
        messages.extend(page.data);
        if after.is_none() {
            break;
        }
    }
    Ok(messages)
}

/// Collect all messages from threads updated within the trailing window,
/// using the local wall clock as "now". See [`harvest_at`].
pub async fn harvest(
    graph: &dyn GraphApi,
    tokens: &TokenState,
    page_id: &str,
    options: &HarvestOptions,
) -> Vec<Message> {
    harvest_at(graph, tokens, page_id, options, Local::now().naive_local()).await
}

/// [`harvest`] with an injectable clock.
///
/// Best-effort throughout: a missing page token or a failed thread listing
/// yields an empty result, and a failed per-thread message fetch contributes
/// nothing without aborting the rest. Aggregation order is thread listing
/// order, then per-thread fetch order.
#[instrument(skip_all, fields(page_id = %page_id))]
pub async fn harvest_at(
    graph: &dyn GraphApi,
    tokens: &TokenState,
    page_id: &str,
    options: &HarvestOptions,
    now: NaiveDateTime,
) -> Vec<Message> {
    let Some(page_token) = tokens.page_token() else {
        warn!("no page access token available; run token setup first");
        return Vec::new();
    };

    // try_days rejects windows chrono cannot represent; checked_sub_signed
    // rejects cutoffs outside the NaiveDateTime range. Either way there is no
    // meaningful cutoff, so nothing qualifies as recent.
    let cutoff = match Duration::try_days(options.window_days)
        .and_then(|window| now.checked_sub_signed(window))
    {
        Some(cutoff) => cutoff,
        None => {
            warn!(window_days = options.window_days, "window out of range; nothing to harvest");
            return Vec::new();
        }
    };

    let threads = match list_threads(graph, page_token, page_id, options).await {
        Ok(threads) => threads,
        Err(err) => {
            warn!(?err, "failed to list conversation threads");
            return Vec::new();
        }
    };
    let listed = threads.len();

    let recent: Vec<Conversation> = threads
        .into_iter()
        .filter(|thread| thread_is_recent(thread, cutoff))
        .collect();
    let retained = recent.len();

    // buffered() yields in input order, so the aggregate stays in thread
    // order regardless of fetch concurrency.
    let per_thread: Vec<Vec<Message>> = stream::iter(recent)
        .map(|thread| async move {
            match list_messages(graph, page_token, &thread.id, options).await {
                Ok(messages) => messages,
                Err(err) => {
                    warn!(?err, conversation = %thread.id, "failed to fetch messages; skipping thread");
                    Vec::new()
                }
            }
        })
        .buffered(options.fetch_concurrency.max(1))
        .collect()
        .await;

    let messages: Vec<Message> = per_thread.into_iter().flatten().collect();
    info!(listed, retained, messages = messages.len(), "harvest complete");
    messages
}

/// Recency check preserved exactly as the reference behaves: the remote
/// offset is parsed, then discarded, so a thread is classified by its
/// wall-clock reading rather than its UTC instant. A thread whose stamp does
/// not parse is skipped.
fn thread_is_recent(thread: &Conversation, cutoff: NaiveDateTime) -> bool {
    match DateTime::parse_from_str(&thread.updated_time, UPDATED_TIME_FORMAT) {
        Ok(updated) => updated.naive_local() >= cutoff,
        Err(err) => {
            warn!(
                %err,
                conversation = %thread.id,
                raw = %thread.updated_time,
                "unparseable updated_time; skipping thread"
            );
            false
        }
    }
}
