pub mod config;
pub mod error;
pub mod events;
pub mod process;
pub mod session;
pub mod workspace;

pub use config::{CONFIG_ENV, ResolvedSettings, Settings};
pub use error::{Error, Result};
pub use events::{SessionEvent, SessionStatus, TaskProgress};
pub use process::{Connection, Launcher, QbsLauncher, locate_executable};
pub use session::{
    Completion, CompletionPayload, PendingOperation, SUPPORTED_API_LEVEL, Session, SessionConfig,
};
pub use workspace::{
    ProjectLocator, WorkspaceScanner, enumerate_configurations, enumerate_profiles,
    parse_profiles,
};
