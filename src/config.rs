//! Engine configuration loaded from environment variables.
//!
//! Both values are optional:
//! - `FATHOM_MAX_DEPTH` — levels per side kept by a depth-filtered view
//!   (positive integer, default 10)
//! - `FATHOM_PROCESS_ENTRIES` — whether to track individual entries within
//!   a level (`true`/`false`/`1`/`0`, default `true`)

use crate::error::FathomError;

/// Default number of visible levels per side.
const DEFAULT_MAX_DEPTH: usize = 10;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct BookConfig {
    pub max_depth: usize,
    pub process_entries: bool,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            process_entries: true,
        }
    }
}

/// Loads the engine configuration from environment variables.
///
/// Values are validated once here, not per event.
///
/// # Errors
///
/// Returns [`FathomError::Config`] when `FATHOM_MAX_DEPTH` is not a
/// positive integer or `FATHOM_PROCESS_ENTRIES` is not a recognized
/// boolean.
pub fn fetch_config() -> crate::Result<BookConfig> {
    let max_depth = match non_empty_var("FATHOM_MAX_DEPTH") {
        Some(raw) => match raw.parse::<usize>() {
            Ok(0) | Err(_) => {
                return Err(FathomError::Config(format!(
                    "FATHOM_MAX_DEPTH must be a positive integer, got {raw:?}"
                )));
            }
            Ok(n) => n,
        },
        None => DEFAULT_MAX_DEPTH,
    };

    let process_entries = match non_empty_var("FATHOM_PROCESS_ENTRIES") {
        Some(raw) => match raw.as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => {
                return Err(FathomError::Config(format!(
                    "FATHOM_PROCESS_ENTRIES must be a boolean, got {raw:?}"
                )));
            }
        },
        None => true,
    };

    Ok(BookConfig {
        max_depth,
        process_entries,
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
