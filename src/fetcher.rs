use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::db::{self, FetchRow};
use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub fn build_client(settings: &Settings) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(FetchError::Client)
}

/// Fetch pages concurrently, saving each result to the cache as it arrives.
/// Order of arrival does not matter: pages are read back in page order.
pub async fn fetch_pages_streaming(
    conn: &Connection,
    pages: Vec<(u32, String)>,
    settings: &Settings,
) -> Result<FetchStats> {
    let client = build_client(settings)?;
    let semaphore = Arc::new(Semaphore::new(settings.concurrency.max(1)));
    let delay = Duration::from_millis(settings.request_delay_ms);
    let total = pages.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchRow>(settings.concurrency.max(1) * 2);

    for (page, url) in pages {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let row = fetch_one(&client, page, url).await;
            let _ = tx.send(row).await;
            // permit is held through the pause
            tokio::time::sleep(delay).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;
    while let Some(row) = rx.recv().await {
        if row.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }
        db::save_fetch(conn, &row)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} pages ({} ok, {} errors)", total, ok, errors);

    Ok(FetchStats { total, ok, errors })
}

async fn fetch_one(client: &reqwest::Client, page: u32, url: String) -> FetchRow {
    let start = Instant::now();
    let result = fetch_html(client, &url).await;
    let latency_ms = Some(start.elapsed().as_millis() as i64);

    match result {
        Ok((html, status)) => FetchRow {
            page,
            url,
            html: Some(html),
            status: Some(status),
            error: None,
            latency_ms,
        },
        Err(e) => {
            warn!("Page {} unavailable: {}", page, e);
            let status = match &e {
                FetchError::Status { status, .. } => Some(*status),
                _ => None,
            };
            FetchRow {
                page,
                url,
                html: None,
                status,
                error: Some(e.to_string()),
                latency_ms,
            }
        }
    }
}

/// Fetch one page's markup, decoded as UTF-8 regardless of the declared charset.
pub async fn fetch_html(client: &reqwest::Client, url: &str) -> Result<(String, u16), FetchError> {
    let request_err = |source| FetchError::Request {
        url: url.to_string(),
        source,
    };
    let response = client.get(url).send().await.map_err(request_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await.map_err(request_err)?;
    Ok((String::from_utf8_lossy(&bytes).into_owned(), status.as_u16()))
}
