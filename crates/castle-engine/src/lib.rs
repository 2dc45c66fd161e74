//! # castle-engine — Deal Lifecycle Engine
//!
//! Executes the escrow trade protocol over the persisted document:
//!
//! - **Repository** (`repository.rs`): committed state behind a writer lock;
//!   mutations commit only after a successful flush.
//! - **Engine** (`engine.rs`): create, preview, join, decline, cancel,
//!   confirm-shipped and confirm-received, plus account, query and chat
//!   operations.
//! - **Request** (`request.rs`): validated create-deal input.
//! - **Config** (`config.rs`): data file and operator identity.
//!
//! ## Crate Policy
//!
//! - Every operation returns `Result<_, EngineError>`; callers branch on
//!   [`EngineError::kind`].
//! - No `.unwrap()` outside tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod repository;
pub mod request;

pub use config::{ConfigError, EngineConfig, DEFAULT_DATA_FILE};
pub use engine::DealLifecycleEngine;
pub use error::{EngineError, ErrorKind};
pub use repository::Repository;
pub use request::CreateDealRequest;
