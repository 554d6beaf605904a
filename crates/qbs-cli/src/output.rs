//! Terminal rendering of listings, reports and live session events.
//!
//! Results go to stdout; live events go to stderr so `--format json` output
//! stays parseable.

use anyhow::Result;
use is_terminal::IsTerminal;
use owo_colors::{OwoColorize, Style};
use qbs_sdk::{
    MessageItem, MessageKind, OperationReport, OperationStatus, RequestKind, RunnableProduct,
    SessionEvent, SourceConfiguration,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::OutputFormat;

#[derive(Debug, Clone, Copy)]
pub struct Printer {
    format: OutputFormat,
    color_stdout: bool,
    color_stderr: bool,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            color_stdout: format == OutputFormat::Plain && std::io::stdout().is_terminal(),
            color_stderr: std::io::stderr().is_terminal(),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn lines(&self, items: &[String]) -> Result<()> {
        match self.format {
            OutputFormat::Plain => {
                for item in items {
                    println!("{}", item);
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        }
        Ok(())
    }

    pub fn paths(&self, paths: &[PathBuf]) -> Result<()> {
        let items: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        self.lines(&items)
    }

    pub fn report(&self, report: &OperationReport) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report_json(report))?)
            }
            OutputFormat::Plain => {
                let name = operation_name(report.kind);
                if report.is_success() {
                    let mark = paint(self.color_stdout, "✓", Style::new().green().bold());
                    println!(
                        "{} {} completed in {:.2}s",
                        mark,
                        name,
                        report.elapsed.as_secs_f64()
                    );
                } else {
                    let mark = paint(self.color_stdout, "✗", Style::new().red().bold());
                    println!("{} {} failed", mark, name);
                }
                for item in report.messages.items() {
                    println!("  {}", item);
                }
            }
        }
        Ok(())
    }

    pub fn products(&self, products: &[RunnableProduct]) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(products)?),
            OutputFormat::Plain => {
                for product in products {
                    match &product.target_executable {
                        Some(exe) => println!(
                            "{}  {}",
                            paint(self.color_stdout, &product.full_display_name, Style::new().bold()),
                            exe
                        ),
                        None => println!("{}", product.full_display_name),
                    }
                }
            }
        }
        Ok(())
    }

    pub fn environment(&self, environment: &BTreeMap<String, String>) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(environment)?),
            OutputFormat::Plain => {
                for (key, value) in environment {
                    println!("{}={}", key, value);
                }
            }
        }
        Ok(())
    }

    pub fn source_configuration(&self, config: &SourceConfiguration) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
            OutputFormat::Plain => {
                let value = serde_json::to_value(config)?;
                println!("compiler:  {}", config.compiler_path);
                println!("standard:  {}", value["standard"].as_str().unwrap_or("-"));
                println!("mode:      {}", value["intellisense_mode"].as_str().unwrap_or("-"));
                print_list("include", &config.include_paths);
                print_list("define", &config.defines);
                print_list("prefix", &config.prefix_headers);
            }
        }
        Ok(())
    }

    /// Live rendering of one session event; silent in JSON mode.
    pub fn event(&self, event: &SessionEvent) {
        if self.format == OutputFormat::Json {
            return;
        }

        match event {
            SessionEvent::Progress(progress) if progress.progress == 0 => {
                eprintln!(
                    "{}",
                    paint(self.color_stderr, &progress.description, Style::new().dimmed())
                );
            }
            SessionEvent::Message(message) => {
                for item in message.items.items() {
                    self.message_line(message.kind, item);
                }
            }
            SessionEvent::ProcessOutput(output) => {
                for line in output.stdout.iter().chain(&output.stderr) {
                    eprintln!("{}", line);
                }
            }
            _ => {}
        }
    }

    fn message_line(&self, kind: MessageKind, item: &MessageItem) {
        match kind {
            MessageKind::Warning => eprintln!(
                "{} {}",
                paint(self.color_stderr, "warning:", Style::new().yellow().bold()),
                item
            ),
            MessageKind::Command => eprintln!("{}", item),
            MessageKind::Info => eprintln!(
                "{}",
                paint(self.color_stderr, &item.to_string(), Style::new().dimmed())
            ),
        }
    }
}

fn paint(enabled: bool, text: &str, style: Style) -> String {
    if enabled {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

fn print_list(label: &str, items: &[String]) {
    for item in items {
        println!("{:<9}  {}", format!("{}:", label), item);
    }
}

fn operation_name(kind: RequestKind) -> &'static str {
    match kind.operation_type() {
        Some(kind) => kind.as_str(),
        None => match kind {
            RequestKind::GetRunEnvironment => "run-environment",
            RequestKind::Cancel => "cancel",
            _ => "quit",
        },
    }
}

fn status_name(status: OperationStatus) -> &'static str {
    match status {
        OperationStatus::Started => "started",
        OperationStatus::Completed => "completed",
        OperationStatus::Failed => "failed",
    }
}

fn message_json(item: &MessageItem) -> Value {
    let mut value = json!({ "description": item.description });
    if item.has_location() {
        value["file"] = json!(item.file_path);
        if item.line != -1 {
            value["line"] = json!(item.line);
        }
        if item.column != -1 {
            value["column"] = json!(item.column);
        }
    }
    value
}

pub fn report_json(report: &OperationReport) -> Value {
    let messages: Vec<Value> = report.messages.items().iter().map(message_json).collect();
    let mut value = json!({
        "operation": operation_name(report.kind),
        "status": status_name(report.status),
        "elapsed_ms": report.elapsed.as_millis() as u64,
        "messages": messages,
    });
    if let Some(environment) = &report.environment {
        value["environment"] = json!(environment);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_failed_report_json() {
        let report = OperationReport::failed(RequestKind::Build, "session is not ready");
        let value = report_json(&report);

        assert_eq!(value["operation"], "build");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["messages"][0]["description"], "session is not ready");
        assert!(value["messages"][0].get("file").is_none());
    }

    #[test]
    fn test_message_location_in_json() {
        let mut report = OperationReport::failed(RequestKind::Resolve, "unused");
        report.messages.push(MessageItem {
            description: "expected ';'".to_string(),
            file_path: "main.cpp".to_string(),
            line: 3,
            column: -1,
        });
        report.elapsed = Duration::from_millis(1500);

        let value = report_json(&report);
        assert_eq!(value["elapsed_ms"], 1500);
        assert_eq!(value["messages"][1]["file"], "main.cpp");
        assert_eq!(value["messages"][1]["line"], 3);
        assert!(value["messages"][1].get("column").is_none());
    }

    #[test]
    fn test_run_environment_name() {
        assert_eq!(operation_name(RequestKind::GetRunEnvironment), "run-environment");
        assert_eq!(operation_name(RequestKind::Install), "install");
    }
}
