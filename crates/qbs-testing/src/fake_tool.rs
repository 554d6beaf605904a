//! In-memory stand-in for `qbs session`.
//!
//! The fake speaks the real wire format over a pair of `tokio::io::duplex`
//! pipes, so sessions under test exercise the same framing, decoding and
//! dispatch code as they would against the real tool.

use qbs_runtime::{Connection, Launcher};
use qbs_types::{PacketReader, decode_value, encode_value};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::{Notify, mpsc};

use crate::fixtures;

const PIPE_CAPACITY: usize = 256 * 1024;

/// One scripted step played back in response to a request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Send a packet carrying this JSON object
    Send(Value),
    /// Write raw bytes, e.g. garbage or a partial packet
    Raw(Vec<u8>),
    Sleep(Duration),
    /// Block until the client sends `cancel-job`
    UntilCanceled,
    /// Close the output pipe as if the process had died
    Exit,
}

type Script = dyn Fn(&Value) -> Vec<Reply> + Send + Sync;

enum Outgoing {
    Bytes(Vec<u8>),
    Close,
}

struct Inner {
    script: Box<Script>,
    hello: Mutex<Option<(i64, i64)>>,
    hello_delay: Mutex<Duration>,
    ignore_quit: AtomicBool,
    launches: AtomicUsize,
    requests: Mutex<Vec<Value>>,
    canceled: Notify,
}

/// Scripted build tool usable as a session [`Launcher`].
///
/// # Example
/// ```no_run
/// use qbs_runtime::Session;
/// use qbs_testing::FakeBuildTool;
///
/// # async fn demo() -> qbs_runtime::Result<()> {
/// let tool = FakeBuildTool::standard();
/// let session = Session::new(tool.clone());
/// session.start().await?;
/// assert_eq!(tool.launches(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FakeBuildTool {
    inner: Arc<Inner>,
}

impl FakeBuildTool {
    /// Tool answering each request with `script(request)`.
    pub fn new(script: impl Fn(&Value) -> Vec<Reply> + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                script: Box::new(script),
                hello: Mutex::new(Some((2, 2))),
                hello_delay: Mutex::new(Duration::ZERO),
                ignore_quit: AtomicBool::new(false),
                launches: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                canceled: Notify::new(),
            }),
        }
    }

    /// Tool driven by [`fixtures::standard_script`].
    pub fn standard() -> Self {
        Self::new(fixtures::standard_script)
    }

    /// Override the levels announced in the hello packet.
    pub fn with_hello(self, api_level: i64, api_compat_level: i64) -> Self {
        *self.inner.hello.lock().unwrap() = Some((api_level, api_compat_level));
        self
    }

    /// Never send a hello packet.
    pub fn without_hello(self) -> Self {
        *self.inner.hello.lock().unwrap() = None;
        self
    }

    /// Hold the hello packet back for `delay` after launch.
    pub fn with_hello_delay(self, delay: Duration) -> Self {
        *self.inner.hello_delay.lock().unwrap() = delay;
        self
    }

    /// Keep running after `quit`, forcing the session to kill it.
    pub fn ignoring_quit(self) -> Self {
        self.inner.ignore_quit.store(true, Ordering::SeqCst);
        self
    }

    /// Number of processes launched so far
    pub fn launches(&self) -> usize {
        self.inner.launches.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order
    pub fn requests(&self) -> Vec<Value> {
        self.inner.requests.lock().unwrap().clone()
    }

    /// Wire `type` of every request received
    pub fn request_types(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl Launcher for FakeBuildTool {
    fn launch(&self) -> qbs_runtime::Result<Connection> {
        self.inner.launches.fetch_add(1, Ordering::SeqCst);

        let (client_writer, tool_reader) = tokio::io::duplex(PIPE_CAPACITY);
        let (tool_writer, client_reader) = tokio::io::duplex(PIPE_CAPACITY);
        tokio::spawn(serve(self.inner.clone(), tool_reader, tool_writer));

        Ok(Connection {
            reader: Box::new(client_reader),
            writer: Box::new(client_writer),
            child: None,
        })
    }
}

async fn serve(inner: Arc<Inner>, mut input: DuplexStream, output: DuplexStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(write_loop(output, rx));

    let hello = *inner.hello.lock().unwrap();
    let delay = *inner.hello_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if let Some((api_level, api_compat_level)) = hello {
        let packet = encode_value(&fixtures::hello(api_level, api_compat_level));
        let _ = tx.send(Outgoing::Bytes(packet));
    }

    let mut packets = PacketReader::new();
    let mut buf = vec![0u8; 4096];
    loop {
        let n = match input.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        packets.push(&buf[..n]);
        while let Some(item) = packets.next_payload() {
            let Ok(request) = item.and_then(|payload| decode_value(&payload)) else {
                continue;
            };
            inner.requests.lock().unwrap().push(request.clone());

            match request["type"].as_str() {
                Some("quit") if !inner.ignore_quit.load(Ordering::SeqCst) => {
                    let _ = tx.send(Outgoing::Close);
                    return;
                }
                Some("cancel-job") => inner.canceled.notify_one(),
                _ => {}
            }

            let replies = (inner.script)(&request);
            tokio::spawn(play(replies, tx.clone(), inner.clone()));
        }
    }
    let _ = tx.send(Outgoing::Close);
}

async fn play(replies: Vec<Reply>, tx: mpsc::UnboundedSender<Outgoing>, inner: Arc<Inner>) {
    for reply in replies {
        let outgoing = match reply {
            Reply::Send(value) => Outgoing::Bytes(encode_value(&value)),
            Reply::Raw(bytes) => Outgoing::Bytes(bytes),
            Reply::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                continue;
            }
            Reply::UntilCanceled => {
                inner.canceled.notified().await;
                continue;
            }
            Reply::Exit => Outgoing::Close,
        };
        if tx.send(outgoing).is_err() {
            return;
        }
    }
}

async fn write_loop(mut output: DuplexStream, mut rx: mpsc::UnboundedReceiver<Outgoing>) {
    while let Some(outgoing) = rx.recv().await {
        match outgoing {
            Outgoing::Bytes(bytes) => {
                if output.write_all(&bytes).await.is_err() {
                    return;
                }
            }
            Outgoing::Close => {
                let _ = output.shutdown().await;
                return;
            }
        }
    }
}
