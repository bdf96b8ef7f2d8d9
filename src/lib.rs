//! Hop Launcher - query understanding and ranking core for a desktop
//! quick-launcher.
//!
//! Free text goes through the [`router`], the registered [`providers`]
//! produce candidate rows, and [`ranking`] turns them into a deterministic,
//! deduplicated list. [`search::SearchSession`] ties the pieces together.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

// Lexical building blocks
pub mod fuzzy;
pub mod router;
pub mod timezone_lookup;

// Persisted user state
pub mod aliases;
pub mod learning;
pub mod web_search_config;

// Result sources and caching
pub mod http;
pub mod providers;
pub mod swr_cache;

pub mod ranking;
pub mod search;

pub use model::{resolve_enter_action, EnterAction, ResultItem, ResultKind, Route, SearchMode};
pub use search::{RankJob, SearchOutcome, SearchResults, SearchSession};
