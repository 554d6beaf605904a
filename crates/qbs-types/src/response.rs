//! Inbound packets.
//!
//! The build tool sends loosely-typed JSON objects; this module is the only
//! place that reads them by key. Everything past `Response::from_value` works
//! with typed records.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::operation::OperationType;

/// Decoded inbound packet
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Hello {
        api_level: i64,
        api_compat_level: i64,
    },
    ProcessOutput(ProcessOutput),
    TaskStarted {
        description: String,
        max_progress: i64,
    },
    TaskProgress {
        progress: i64,
    },
    TaskMaxProgress {
        max_progress: i64,
    },
    Message(Message),
    OperationResult(OperationResult),
    RunEnvironment(RunEnvironment),
    ProtocolError(MessageList),
    /// Packet with a `type` this client does not know
    Unknown(String),
}

impl Response {
    /// Translate a raw packet object. Never fails: unknown shapes become
    /// `Unknown`, malformed numbers become -1.
    pub fn from_value(value: &Value) -> Response {
        let Some(obj) = value.as_object() else {
            return Response::Unknown(String::new());
        };
        let kind = str_field(obj, "type");

        match kind.as_str() {
            "hello" => Response::Hello {
                api_level: int_field(obj, "api-level"),
                api_compat_level: int_field(obj, "api-compat-level"),
            },
            "process-result" => Response::ProcessOutput(ProcessOutput {
                executable: str_field(obj, "executable-file-path"),
                working_directory: str_field(obj, "working-directory"),
                arguments: string_list(obj.get("arguments")),
                stdout: string_list(obj.get("stdout")),
                stderr: string_list(obj.get("stderr")),
                success: bool_field(obj, "success"),
            }),
            "task-started" => Response::TaskStarted {
                description: str_field(obj, "description"),
                max_progress: int_field(obj, "max-progress"),
            },
            "task-progress" => Response::TaskProgress {
                progress: int_field(obj, "progress"),
            },
            "new-max-progress" => Response::TaskMaxProgress {
                max_progress: int_field(obj, "max-progress"),
            },
            "log-data" => Response::Message(Message {
                kind: MessageKind::Info,
                items: MessageList::from_value(obj.get("message")),
                highlight: None,
            }),
            "warning" => Response::Message(Message {
                kind: MessageKind::Warning,
                items: MessageList::from_value(obj.get("warning")),
                highlight: None,
            }),
            "command-description" => Response::Message(Message {
                kind: MessageKind::Command,
                items: MessageList::from_value(obj.get("message")),
                highlight: obj
                    .get("highlight")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            "project-resolved" => Response::OperationResult(OperationResult {
                operation: OperationType::Resolve,
                error: MessageList::from_value(obj.get("error")),
                project_data: obj.get("project-data").filter(|v| !v.is_null()).cloned(),
                build_system_files: obj
                    .get("build-system-files")
                    .filter(|v| !v.is_null())
                    .cloned(),
            }),
            "project-built" => operation_result(OperationType::Build, obj),
            "project-cleaned" => operation_result(OperationType::Clean, obj),
            "install-done" => operation_result(OperationType::Install, obj),
            "run-environment" => Response::RunEnvironment(RunEnvironment {
                environment: string_map(obj.get("full-environment")),
                error: MessageList::from_value(obj.get("error")),
            }),
            "protocol-error" => Response::ProtocolError(MessageList::from_value(obj.get("error"))),
            _ => Response::Unknown(kind),
        }
    }
}

fn operation_result(operation: OperationType, obj: &Map<String, Value>) -> Response {
    Response::OperationResult(OperationResult {
        operation,
        error: MessageList::from_value(obj.get("error")),
        project_data: None,
        build_system_files: None,
    })
}

/// Result of one command the build tool executed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutput {
    pub executable: String,
    pub working_directory: String,
    pub arguments: Vec<String>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Warning,
    /// Description of a command being run (`command-description`)
    Command,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub items: MessageList,
    pub highlight: Option<String>,
}

/// Terminal packet of resolve/build/clean/install
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub operation: OperationType,
    pub error: MessageList,
    pub project_data: Option<Value>,
    pub build_system_files: Option<Value>,
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunEnvironment {
    pub environment: BTreeMap<String, String>,
    pub error: MessageList,
}

/// One diagnostic line, optionally pointing into a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageItem {
    pub description: String,
    pub file_path: String,
    pub line: i64,
    pub column: i64,
}

impl MessageItem {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            file_path: String::new(),
            line: -1,
            column: -1,
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => MessageItem::new(text.clone()),
            Value::Object(obj) => {
                let location = obj.get("location").and_then(Value::as_object);
                MessageItem {
                    description: str_field(obj, "description"),
                    file_path: location
                        .map(|l| str_field(l, "file-path"))
                        .unwrap_or_default(),
                    line: location.map(|l| int_field(l, "line")).unwrap_or(-1),
                    column: location.map(|l| int_field(l, "column")).unwrap_or(-1),
                }
            }
            other => MessageItem::new(other.to_string()),
        }
    }

    pub fn has_location(&self) -> bool {
        !self.file_path.is_empty()
    }
}

impl fmt::Display for MessageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.file_path.is_empty() {
            f.write_str(&self.file_path)?;
            if self.line != -1 {
                write!(f, ":{}", self.line)?;
            }
            f.write_str(":")?;
        }
        f.write_str(&self.description)
    }
}

/// Normalized diagnostic list.
///
/// The wire carries either a bare string or `{items: [...]}`; both decode here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageList(pub Vec<MessageItem>);

impl MessageList {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => MessageList::default(),
            Some(Value::String(text)) => MessageList(vec![MessageItem::new(text.clone())]),
            Some(Value::Object(obj)) => MessageList(
                obj.get("items")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().map(MessageItem::from_value).collect())
                    .unwrap_or_default(),
            ),
            Some(Value::Array(items)) => {
                MessageList(items.iter().map(MessageItem::from_value).collect())
            }
            Some(other) => MessageList(vec![MessageItem::new(other.to_string())]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn items(&self) -> &[MessageItem] {
        &self.0
    }

    pub fn push(&mut self, item: MessageItem) {
        self.0.push(item);
    }

    pub fn into_items(self) -> Vec<MessageItem> {
        self.0
    }
}

impl fmt::Display for MessageList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Integer that may arrive as a number or a numeric string; -1 when unusable.
fn int_field(obj: &Map<String, Value>, key: &str) -> i64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(-1),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(-1),
        _ => -1,
    }
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim() == "true",
        _ => false,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| {
                    let text = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                    (k.clone(), text)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_string_message_matches_item_form() {
        let bare = MessageList::from_value(Some(&json!("Build failed")));
        let structured = MessageList::from_value(Some(&json!({
            "items": [{ "description": "Build failed" }]
        })));

        assert_eq!(bare, structured);
        assert_eq!(bare.len(), 1);
        assert_eq!(bare.items()[0].line, -1);
        assert_eq!(bare.items()[0].file_path, "");
    }

    #[test]
    fn test_message_item_with_location() {
        let list = MessageList::from_value(Some(&json!({
            "items": [
                { "description": "syntax error", "location": { "file-path": "/p/app.qbs", "line": 12, "column": 3 } },
                { "description": "second" }
            ]
        })));

        assert_eq!(list.items()[0].file_path, "/p/app.qbs");
        assert_eq!(list.items()[0].line, 12);
        assert_eq!(list.items()[0].column, 3);
        assert_eq!(list.to_string(), "/p/app.qbs:12:syntax error\nsecond");
    }

    #[test]
    fn test_missing_numbers_decode_to_sentinel() {
        let response = Response::from_value(&json!({ "type": "task-progress" }));
        assert_eq!(response, Response::TaskProgress { progress: -1 });

        let response = Response::from_value(&json!({ "type": "task-progress", "progress": "abc" }));
        assert_eq!(response, Response::TaskProgress { progress: -1 });
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let response = Response::from_value(&json!({
            "type": "task-started",
            "description": "Building",
            "max-progress": "10"
        }));
        assert_eq!(
            response,
            Response::TaskStarted {
                description: "Building".to_string(),
                max_progress: 10
            }
        );
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let response = Response::from_value(&json!({ "type": "files-added" }));
        assert_eq!(response, Response::Unknown("files-added".to_string()));

        let response = Response::from_value(&json!([1, 2, 3]));
        assert!(matches!(response, Response::Unknown(_)));
    }

    #[test]
    fn test_process_result() {
        let response = Response::from_value(&json!({
            "type": "process-result",
            "executable-file-path": "/usr/bin/g++",
            "working-directory": "/build",
            "arguments": ["-c", "main.cpp"],
            "stdout": [],
            "stderr": ["main.cpp:1: warning"],
            "success": "true"
        }));

        let Response::ProcessOutput(output) = response else {
            panic!("expected process output");
        };
        assert_eq!(output.executable, "/usr/bin/g++");
        assert_eq!(output.arguments, vec!["-c", "main.cpp"]);
        assert_eq!(output.stderr.len(), 1);
        assert!(output.success);
    }

    #[test]
    fn test_operation_results() {
        let resolved = Response::from_value(&json!({
            "type": "project-resolved",
            "project-data": { "name": "app" }
        }));
        let Response::OperationResult(result) = resolved else {
            panic!("expected operation result");
        };
        assert_eq!(result.operation, OperationType::Resolve);
        assert!(result.is_success());
        assert_eq!(result.project_data.unwrap()["name"], "app");

        let built = Response::from_value(&json!({
            "type": "project-built",
            "error": { "items": [{ "description": "compile failed" }] }
        }));
        let Response::OperationResult(result) = built else {
            panic!("expected operation result");
        };
        assert_eq!(result.operation, OperationType::Build);
        assert!(!result.is_success());
    }

    #[test]
    fn test_warning_and_command_description() {
        let warning = Response::from_value(&json!({ "type": "warning", "warning": "deprecated" }));
        let Response::Message(message) = warning else {
            panic!("expected message");
        };
        assert_eq!(message.kind, MessageKind::Warning);
        assert_eq!(message.items.to_string(), "deprecated");

        let command = Response::from_value(&json!({
            "type": "command-description",
            "highlight": "compiler",
            "message": "compiling main.cpp"
        }));
        let Response::Message(message) = command else {
            panic!("expected message");
        };
        assert_eq!(message.kind, MessageKind::Command);
        assert_eq!(message.highlight.as_deref(), Some("compiler"));
    }

    #[test]
    fn test_run_environment() {
        let response = Response::from_value(&json!({
            "type": "run-environment",
            "full-environment": { "PATH": "/usr/bin", "LD_LIBRARY_PATH": "/opt/lib" }
        }));
        let Response::RunEnvironment(env) = response else {
            panic!("expected run environment");
        };
        assert!(env.error.is_empty());
        assert_eq!(env.environment["PATH"], "/usr/bin");
    }
}
