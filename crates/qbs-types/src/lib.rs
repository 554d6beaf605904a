pub mod codec;
pub mod error;
pub mod operation;
pub mod request;
pub mod response;
pub mod settings;

pub use codec::{
    MAX_PACKET_LENGTH, PACKET_MAGIC, PacketReader, decode, decode_value, encode, encode_value,
};
pub use error::{Error, Result};
pub use operation::{Operation, OperationStatus, OperationType};
pub use request::{
    BuildRequest, CleanRequest, InstallRequest, MODULE_PROPERTIES, Request, RequestKind,
    ResolveRequest, RunEnvironmentRequest,
};
pub use response::{
    Message, MessageItem, MessageKind, MessageList, OperationResult, ProcessOutput, Response,
    RunEnvironment,
};
pub use settings::{
    CommandEchoMode, DefaultSettings, ErrorHandlingMode, LogLevel, SettingsProvider,
};
