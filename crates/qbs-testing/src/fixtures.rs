//! Canned packets and the default script played by [`FakeBuildTool`](crate::FakeBuildTool).

use serde_json::{Value, json};

use crate::fake_tool::Reply;

pub fn hello(api_level: i64, api_compat_level: i64) -> Value {
    json!({"type": "hello", "api-level": api_level, "api-compat-level": api_compat_level})
}

pub fn task_started(description: &str, max_progress: i64) -> Value {
    // The tool sends max-progress as a string on some versions.
    json!({"type": "task-started", "description": description, "max-progress": max_progress.to_string()})
}

pub fn task_progress(progress: i64) -> Value {
    json!({"type": "task-progress", "progress": progress.to_string()})
}

pub fn log_data(message: &str) -> Value {
    json!({"type": "log-data", "message": message})
}

pub fn warning(description: &str, file_path: &str, line: i64) -> Value {
    json!({
        "type": "warning",
        "warning": {
            "items": [{
                "description": description,
                "location": {"file-path": file_path, "line": line, "column": 1}
            }]
        }
    })
}

pub fn command_description(message: &str) -> Value {
    json!({"type": "command-description", "highlight": "compiler", "message": message})
}

pub fn process_result(executable: &str, stdout: &[&str]) -> Value {
    json!({
        "type": "process-result",
        "executable-file-path": executable,
        "working-directory": "/work/demo/build",
        "arguments": ["-c", "main.cpp"],
        "stdout": stdout,
        "stderr": [],
        "success": true
    })
}

pub fn protocol_error(message: &str) -> Value {
    json!({"type": "protocol-error", "error": message})
}

/// Terminal packet for `operation`, failed when `error` is given.
pub fn operation_done(packet_type: &str, error: Option<&str>) -> Value {
    match error {
        Some(message) => json!({
            "type": packet_type,
            "error": {"items": [{"description": message}]}
        }),
        None => json!({"type": packet_type}),
    }
}

pub fn project_resolved(project_data: Value) -> Value {
    json!({
        "type": "project-resolved",
        "project-data": project_data,
        "build-system-files": ["/work/demo/demo.qbs", "/work/demo/app/app.qbs"]
    })
}

pub fn run_environment(product: &str) -> Value {
    json!({
        "type": "run-environment",
        "full-environment": {"PATH": "/usr/bin", "QBS_RUN_PRODUCT": product}
    })
}

/// Small resolved project: `demo` with a runnable `app` and a disabled `docs`.
pub fn sample_project_data() -> Value {
    json!({
        "name": "demo",
        "build-directory": "/work/demo/build/gcc_debug",
        "location": {"file-path": "/work/demo/demo.qbs", "line": 1, "column": 1},
        "products": [
            {
                "name": "app",
                "full-display-name": "app",
                "build-directory": "/work/demo/build/gcc_debug/app.1a2b3c4d",
                "target-executable": "/work/demo/build/gcc_debug/install-root/bin/app",
                "is-runnable": true,
                "is-enabled": true,
                "module-properties": {
                    "qbs.toolchain": ["gcc"],
                    "qbs.architecture": "x86_64",
                    "cpp.compilerVersionMajor": 11,
                    "cpp.compilerPath": "/usr/bin/g++"
                },
                "groups": [{
                    "name": "app",
                    "source-artifacts": [
                        {"file-path": "/work/demo/app/main.cpp", "file-tags": ["cpp"]}
                    ]
                }]
            },
            {
                "name": "docs",
                "full-display-name": "docs",
                "is-runnable": false,
                "is-enabled": false,
                "groups": []
            }
        ],
        "sub-projects": []
    })
}

/// Well-behaved tool: every operation reports some progress and succeeds.
pub fn standard_script(request: &Value) -> Vec<Reply> {
    match request["type"].as_str().unwrap_or_default() {
        "resolve-project" => vec![
            Reply::Send(task_started("Resolving project", 2)),
            Reply::Send(task_progress(1)),
            Reply::Send(log_data("Setting up build graph")),
            Reply::Send(task_progress(2)),
            Reply::Send(project_resolved(sample_project_data())),
        ],
        "build-project" => vec![
            Reply::Send(task_started("Building", 10)),
            Reply::Send(command_description("compiling main.cpp")),
            Reply::Send(process_result("/usr/bin/g++", &["ok"])),
            Reply::Send(task_progress(10)),
            Reply::Send(operation_done("project-built", None)),
        ],
        "clean-project" => vec![Reply::Send(operation_done("project-cleaned", None))],
        "install-project" => vec![
            Reply::Send(task_started("Installing", 1)),
            Reply::Send(operation_done("install-done", None)),
        ],
        "get-run-environment" => {
            let product = request["product"].as_str().unwrap_or_default();
            vec![Reply::Send(run_environment(product))]
        }
        _ => Vec::new(),
    }
}
