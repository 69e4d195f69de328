//! # gradewatch
//!
//! Watches a university's grade-results site for each registered user and
//! sends a notification when new or changed results appear.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler → ScrapingAgent → Transport → ResultExtractor → Diff → Notifier
//!     ↑                                                        ↓
//!   Store  ←───────────────────── merge ───────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a user and a class to watch
//! gradewatch user add --email me@example.com --code ABCD12345678 --nip 1234 --notify me@example.com
//! gradewatch class add <user-id> INF1120 40 20143
//!
//! # Check once
//! gradewatch refresh <user-id>
//!
//! # Keep checking in the background
//! gradewatch daemon start
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration
//! - [`domain`]: Classes, results, users and crawl outcomes
//! - [`fetcher`]: Form POST transport
//! - [`scraper`]: Site contract, result extraction, scraping agent
//! - [`diff`]: Change detection and merging
//! - [`notify`]: Message rendering and delivery
//! - [`store`]: Persistence
//! - [`scheduler`]: Polling loop and worker pool

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, transport, notifier, renderer and scheduler.
pub mod app;

/// Configuration management.
///
/// Loads from `~/.config/gradewatch/config.toml`, supporting:
/// - Worker count, queue capacity and polling intervals
/// - Results site URL and timeout
/// - Database path and notifier
pub mod config;

/// Foreground daemon running the scheduler.
///
/// - `gradewatch daemon start` - Start the scheduler in the background
/// - `gradewatch daemon stop` - Stop the daemon
/// - `gradewatch daemon status` - Check if daemon is running
pub mod daemon;

/// Command-line interface using clap.
pub mod cli;

/// Core domain models.
///
/// - [`ClassSnapshot`](domain::ClassSnapshot): Known results of one class
/// - [`ClassOutcome`](domain::ClassOutcome): One crawl attempt, snapshot or error
/// - [`CrawlerConfig`](domain::CrawlerConfig): Per-user credentials and notification address
pub mod domain;

/// Positional diff between stored and fresh classes.
pub mod diff;

/// HTTP transport for the results form.
///
/// - [`Transport`](fetcher::Transport): Async trait, injected into the agent
/// - [`HttpTransport`](fetcher::HttpTransport): reqwest-based implementation
pub mod fetcher;

/// Notification rendering and delivery.
pub mod notify;

/// Polling loop, worker pool and per-job processing.
pub mod scheduler;

/// Results-site scraping.
///
/// - [`ScrapingAgent`](scraper::ScrapingAgent): Fans out one request per class
/// - [`ResultExtractor`](scraper::ResultExtractor): Page to snapshot or classified error
/// - [`ColumnLayout`](scraper::ColumnLayout): Column maps keyed by header width
pub mod scraper;

/// Persistence.
///
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`MemoryStore`](store::MemoryStore): In-memory implementation
pub mod store;
