//! Command handlers for the CLI
//!
//! This module provides the handlers invoked by the CLI entrypoint:
//!
//! - `serve`: run the relay server
//! - `chat`: interactive chat client
//! - `history`: conversation history management
//!
//! The handlers are intentionally small and use the library components:
//! the relay router, the session controller, and the stores.

pub mod chat;
pub mod history;
pub mod serve;

use crate::config::Config;
use crate::error::Result;
use crate::storage::{Repository, SledRepository};
use std::path::Path;
use std::sync::Arc;

/// Open the chat client's local repository.
///
/// Precedence: `KONDATE_DATA_DIR` env (mirrored from `--data-dir`), then
/// `chat.data_dir` from the config file, then the platform data directory.
pub(crate) fn open_repository(config: &Config) -> Result<Arc<dyn Repository>> {
    let repo = match &config.chat.data_dir {
        Some(dir) if std::env::var("KONDATE_DATA_DIR").is_err() => {
            SledRepository::open(Path::new(dir).join("kondate.db"))?
        }
        _ => SledRepository::open_default()?,
    };
    Ok(Arc::new(repo))
}
