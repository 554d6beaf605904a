//! qbs-sdk: drive Qbs build sessions from Rust.
//!
//! # Overview
//!
//! `qbs-sdk` wraps a long-lived `qbs session` process behind a small async
//! facade. It resolves, builds, cleans and installs projects, queries run
//! environments, and exposes the resolved project model for code-completion
//! tooling.
//!
//! # Quickstart
//!
//! ```no_run
//! use qbs_sdk::{Client, OperationOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect("/path/to/workspace")?;
//! client.select_profile("gcc");
//! client.start().await?;
//!
//! let report = client.resolve(&OperationOptions::new()).await;
//! if report.is_success() {
//!     let report = client.build(&OperationOptions::new().max_jobs(4)).await;
//!     println!("build: {:?}", report.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! This SDK acts as a facade over:
//! - `qbs-types`: Wire requests, responses and packet framing
//! - `qbs-engine`: Project model, toolchain inference, code model
//! - `qbs-runtime`: Session lifecycle, settings and workspace discovery
//!
//! # Watching a session
//!
//! ```no_run
//! use qbs_sdk::{Client, SessionEvent};
//! use futures::stream::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect("/path/to/workspace")?;
//! let mut events = client.events();
//! client.start().await?;
//! while let Some(event) = events.next().await {
//!     if let SessionEvent::Progress(progress) = event {
//!         println!("{}", progress);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod events;
pub mod types;

pub use client::{Client, ClientBuilder};
pub use error::{Error, Result};
pub use events::{EventStream, SessionEvent, SessionStatus, TaskProgress};
pub use types::{OperationOptions, OperationReport};

// Re-export the domain types callers need to interpret reports.
pub use qbs_engine::{
    IntelliSenseMode, LanguageStandard, ProjectModel, RunnableProduct, SourceConfiguration,
};
pub use qbs_runtime::{SessionConfig, Settings};
pub use qbs_types::{
    LogLevel, Message, MessageItem, MessageKind, MessageList, Operation, OperationStatus,
    OperationType, ProcessOutput, RequestKind,
};
