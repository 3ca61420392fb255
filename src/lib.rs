//! Kondate - recipe-suggestion chat relay and terminal client
//!
//! This library provides the core functionality for Kondate: a relay
//! server that proxies chat turns to a hosted conversational-AI vendor,
//! and a terminal chat client with local conversation history and
//! shopping-list checklists.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `relay`: Relay HTTP surface, session-handle store, and relay client
//! - `vendor`: Vendor AI client abstraction and the Dify implementation
//! - `session`: Chat session controller and its send state machine
//! - `conversation`: Conversation and message storage
//! - `extractor`: Shopping-list extraction from assistant replies
//! - `checklist`: Per-message checklist check-state
//! - `storage`: Key/value persistence behind the `Repository` trait
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use kondate::config::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml")?;
//!     config.validate()?;
//!
//!     // Relay or chat client startup would go here
//!     Ok(())
//! }
//! ```

pub mod checklist;
pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extractor;
pub mod relay;
pub mod session;
pub mod storage;
pub mod vendor;

// Re-export commonly used types
pub use config::Config;
pub use conversation::{Conversation, ConversationStore, Message, Role};
pub use error::{KondateError, Result};
pub use extractor::extract_shopping_list;
pub use session::{ChatSession, SendOutcome, SessionState};
