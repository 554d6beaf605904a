//! Build tool session: process lifecycle and the request multiplexer.
//!
//! The protocol carries no request identifiers, so replies are matched to
//! requests purely by order. The driver task keeps at most one operation in
//! flight and holds later submissions in a FIFO queue until the tool sends
//! the in-flight operation's terminal packet.

use qbs_engine::ProjectModel;
use qbs_types::{
    Message, MessageItem, MessageKind, MessageList, Operation, OperationResult, OperationStatus,
    PacketReader, Request, RequestKind, Response, RunEnvironment,
};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::events::{SessionEvent, SessionStatus, TaskProgress};
use crate::process::Launcher;
use crate::{Error, Result};

/// Highest protocol compatibility level this client understands
pub const SUPPORTED_API_LEVEL: i64 = 2;

const EVENT_CAPACITY: usize = 1024;
const READ_CHUNK: usize = 16 * 1024;

const CANCELED_MESSAGE: &str = "Operation canceled";
const EXITED_MESSAGE: &str = "Build tool process exited unexpectedly";
const STOPPED_MESSAGE: &str = "Session stopped before the operation completed";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long `start()` waits for the hello packet
    pub handshake_timeout: Duration,
    /// How long `stop()` waits after `quit` before killing the process
    pub shutdown_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Extra data carried by a successful completion
#[derive(Debug, Clone, Default)]
pub enum CompletionPayload {
    #[default]
    None,
    Project(Arc<ProjectModel>),
    RunEnvironment(BTreeMap<String, String>),
}

/// Terminal outcome of one submitted request.
#[derive(Debug, Clone)]
pub struct Completion {
    pub kind: RequestKind,
    pub status: OperationStatus,
    pub elapsed: Duration,
    pub messages: MessageList,
    pub payload: CompletionPayload,
}

impl Completion {
    pub fn failed(kind: RequestKind, message: impl Into<String>) -> Self {
        let mut messages = MessageList::default();
        messages.push(MessageItem::new(message));
        Self {
            kind,
            status: OperationStatus::Failed,
            elapsed: Duration::ZERO,
            messages,
            payload: CompletionPayload::None,
        }
    }

    fn completed(kind: RequestKind) -> Self {
        Self {
            kind,
            status: OperationStatus::Completed,
            elapsed: Duration::ZERO,
            messages: MessageList::default(),
            payload: CompletionPayload::None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Completed
    }

    /// Operation value for resolve/build/clean/install completions
    pub fn operation(&self) -> Option<Operation> {
        self.kind.operation_type().map(|kind| Operation {
            kind,
            status: self.status,
            elapsed: self.elapsed,
        })
    }
}

/// Handle to a submitted request, resolved by the session's driver task.
#[derive(Debug)]
pub struct PendingOperation {
    kind: RequestKind,
    rx: oneshot::Receiver<Completion>,
}

impl PendingOperation {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub async fn wait(self) -> Completion {
        match self.rx.await {
            Ok(completion) => completion,
            Err(_) => Completion::failed(self.kind, STOPPED_MESSAGE),
        }
    }
}

/// Published session state.
///
/// Every field is a watch channel so readers can either poll the current
/// value or await changes; `events` carries the same changes as a stream.
struct Shared {
    status: watch::Sender<SessionStatus>,
    project_file: watch::Sender<Option<PathBuf>>,
    profile: watch::Sender<String>,
    configuration: watch::Sender<String>,
    progress: watch::Sender<Option<TaskProgress>>,
    project: watch::Sender<Option<Arc<ProjectModel>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn new() -> Self {
        Self {
            status: watch::channel(SessionStatus::Stopped).0,
            project_file: watch::channel(None).0,
            profile: watch::channel(String::new()).0,
            configuration: watch::channel(String::new()).0,
            progress: watch::channel(None).0,
            project: watch::channel(None).0,
            events: broadcast::channel(EVENT_CAPACITY).0,
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn set_status(&self, status: SessionStatus) {
        if replace_if_changed(&self.status, status) {
            tracing::debug!("session status: {}", status);
            self.emit(SessionEvent::StatusChanged(status));
        }
    }

    fn update_progress(&self, update: impl FnOnce(&mut TaskProgress)) {
        let changed = self.progress.send_if_modified(|current| {
            let mut next = current.clone().unwrap_or(TaskProgress {
                description: String::new(),
                progress: 0,
                max_progress: -1,
            });
            update(&mut next);
            if current.as_ref() == Some(&next) {
                return false;
            }
            *current = Some(next);
            true
        });
        if !changed {
            return;
        }
        let progress = self.progress.borrow().clone();
        if let Some(progress) = progress {
            self.emit(SessionEvent::Progress(progress));
        }
    }
}

/// Puts a claimed session back to stopped if `start` is dropped mid-launch.
struct StartGuard<'a> {
    shared: &'a Shared,
    settled: bool,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("session start abandoned");
            self.shared.set_status(SessionStatus::Stopped);
        }
    }
}

fn replace_if_changed<T: PartialEq>(sender: &watch::Sender<T>, value: T) -> bool {
    sender.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    })
}

enum Command {
    Submit(Queued),
    Cancel,
    Stop { reply: oneshot::Sender<()> },
}

struct Queued {
    request: Request,
    reply: oneshot::Sender<Completion>,
}

enum Inbound {
    Response(Response),
    Closed,
}

struct Inner {
    launcher: Box<dyn Launcher>,
    config: SessionConfig,
    shared: Shared,
    commands: Mutex<Option<mpsc::UnboundedSender<Command>>>,
}

/// Client side of one `qbs session` process.
///
/// Cheap to clone; all clones drive the same process. The process is stopped
/// when the last clone is dropped.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(launcher: impl Launcher + 'static) -> Self {
        Self::with_config(launcher, SessionConfig::default())
    }

    pub fn with_config(launcher: impl Launcher + 'static, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                launcher: Box::new(launcher),
                config,
                shared: Shared::new(),
                commands: Mutex::new(None),
            }),
        }
    }

    pub fn status(&self) -> SessionStatus {
        *self.inner.shared.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.shared.status.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.shared.events.subscribe()
    }

    pub fn progress(&self) -> Option<TaskProgress> {
        self.inner.shared.progress.borrow().clone()
    }

    pub fn watch_progress(&self) -> watch::Receiver<Option<TaskProgress>> {
        self.inner.shared.progress.subscribe()
    }

    /// Latest successfully resolved project
    pub fn project(&self) -> Option<Arc<ProjectModel>> {
        self.inner.shared.project.borrow().clone()
    }

    pub fn watch_project(&self) -> watch::Receiver<Option<Arc<ProjectModel>>> {
        self.inner.shared.project.subscribe()
    }

    pub fn active_project(&self) -> Option<PathBuf> {
        self.inner.shared.project_file.borrow().clone()
    }

    pub fn set_active_project(&self, path: Option<PathBuf>) {
        let shared = &self.inner.shared;
        if replace_if_changed(&shared.project_file, path.clone()) {
            shared.emit(SessionEvent::ActiveProjectChanged(path));
        }
    }

    pub fn profile(&self) -> String {
        self.inner.shared.profile.borrow().clone()
    }

    pub fn set_profile(&self, profile: impl Into<String>) {
        let profile = profile.into();
        let shared = &self.inner.shared;
        if replace_if_changed(&shared.profile, profile.clone()) {
            shared.emit(SessionEvent::ProfileChanged(profile));
        }
    }

    pub fn configuration(&self) -> String {
        self.inner.shared.configuration.borrow().clone()
    }

    pub fn set_configuration(&self, configuration: impl Into<String>) {
        let configuration = configuration.into();
        let shared = &self.inner.shared;
        if replace_if_changed(&shared.configuration, configuration.clone()) {
            shared.emit(SessionEvent::ConfigurationChanged(configuration));
        }
    }

    /// Launch the build tool and wait for its hello.
    ///
    /// A no-op unless the session is stopped; on failure the session is
    /// stopped again and the error returned.
    pub async fn start(&self) -> Result<()> {
        let shared = &self.inner.shared;
        let claimed = shared.status.send_if_modified(|status| {
            if *status == SessionStatus::Stopped {
                *status = SessionStatus::Starting;
                true
            } else {
                false
            }
        });
        if !claimed {
            tracing::debug!("start ignored, session is {}", self.status());
            return Ok(());
        }
        shared.emit(SessionEvent::StatusChanged(SessionStatus::Starting));

        let mut guard = StartGuard {
            shared,
            settled: false,
        };
        let launched = self.launch().await;
        guard.settled = true;
        match launched {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!("session start failed: {}", err);
                shared.set_status(SessionStatus::Stopped);
                Err(err)
            }
        }
    }

    async fn launch(&self) -> Result<()> {
        let connection = self.inner.launcher.launch()?;
        let mut child = connection.child;

        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(connection.reader, inbound_tx));

        let handshake = tokio::time::timeout(
            self.inner.config.handshake_timeout,
            wait_for_hello(&mut inbound_rx),
        )
        .await
        .unwrap_or(Err(Error::HandshakeTimeout));

        if let Err(err) = handshake {
            reader.abort();
            if let Some(child) = child.as_mut() {
                let _ = child.kill().await;
            }
            return Err(err);
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        *self.lock_commands() = Some(command_tx);
        self.inner.shared.set_status(SessionStatus::Started);
        tracing::info!("build tool session started");

        let driver = Driver {
            session: Arc::downgrade(&self.inner),
            writer: connection.writer,
            child,
            commands: command_rx,
            inbound: inbound_rx,
            in_flight: None,
            queue: VecDeque::new(),
            shutdown_grace: self.inner.config.shutdown_grace,
        };
        tokio::spawn(driver.run());
        Ok(())
    }

    /// Queue `request` for the build tool.
    ///
    /// Fails with [`Error::NotReady`] unless the session is started. The
    /// returned handle resolves once the tool reports the outcome.
    pub fn submit(&self, request: Request) -> Result<PendingOperation> {
        let kind = request.kind();
        if kind == RequestKind::Quit {
            return Err(Error::InvalidRequest(
                "quit is sent by stop(), not submitted".to_string(),
            ));
        }
        let status = self.status();
        if status != SessionStatus::Started {
            return Err(Error::NotReady(status));
        }

        let (reply, rx) = oneshot::channel();
        let commands = self.lock_commands();
        let sender = commands.as_ref().ok_or(Error::NotReady(status))?;
        sender
            .send(Command::Submit(Queued { request, reply }))
            .map_err(|_| Error::NotReady(SessionStatus::Stopped))?;
        Ok(PendingOperation { kind, rx })
    }

    /// Ask the tool to abort the in-flight operation, if any.
    pub fn cancel(&self) {
        if let Some(sender) = self.lock_commands().as_ref() {
            let _ = sender.send(Command::Cancel);
        }
    }

    /// Shut the build tool down, killing it if it ignores `quit`.
    ///
    /// A start in progress is allowed to settle first, so the session
    /// always ends up stopped.
    pub async fn stop(&self) -> Result<()> {
        let mut status = self.watch_status();
        let _ = status.wait_for(|s| *s != SessionStatus::Starting).await;

        let sender = self.lock_commands().take();
        match sender {
            Some(sender) => {
                let (reply, done) = oneshot::channel();
                if sender.send(Command::Stop { reply }).is_ok() {
                    let _ = done.await;
                }
            }
            None => {
                let _ = status.wait_for(|s| *s == SessionStatus::Stopped).await;
            }
        }
        Ok(())
    }

    fn lock_commands(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Command>>> {
        match self.inner.commands.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

async fn wait_for_hello(inbound: &mut mpsc::UnboundedReceiver<Inbound>) -> Result<()> {
    loop {
        match inbound.recv().await {
            Some(Inbound::Response(Response::Hello {
                api_level,
                api_compat_level,
            })) => {
                tracing::debug!(
                    "build tool hello: api level {}, compat level {}",
                    api_level,
                    api_compat_level
                );
                if api_compat_level > SUPPORTED_API_LEVEL {
                    return Err(Error::IncompatibleProtocol {
                        api_level,
                        api_compat_level,
                    });
                }
                return Ok(());
            }
            Some(Inbound::Response(other)) => {
                tracing::debug!("ignoring packet before hello: {:?}", other);
            }
            Some(Inbound::Closed) | None => {
                return Err(Error::Startup(
                    "build tool exited before the handshake".to_string(),
                ));
            }
        }
    }
}

/// Decode packets from the tool until its output closes.
///
/// Runs on its own task so slow consumers never stall decoding.
async fn read_loop(
    mut reader: Box<dyn AsyncRead + Send + Unpin>,
    tx: mpsc::UnboundedSender<Inbound>,
) {
    let mut packets = PacketReader::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                tracing::warn!("failed to read from build tool: {}", err);
                break;
            }
        };
        packets.push(&buf[..n]);
        while let Some(item) = packets.next_payload() {
            match item.and_then(|payload| qbs_types::decode(&payload)) {
                Ok(response) => {
                    if tx.send(Inbound::Response(response)).is_err() {
                        return;
                    }
                }
                Err(err) => tracing::warn!("skipping packet: {}", err),
            }
        }
    }
    let _ = tx.send(Inbound::Closed);
}

struct InFlight {
    kind: RequestKind,
    started: Instant,
    canceled: bool,
    reply: oneshot::Sender<Completion>,
}

/// Owns the write side and the child process; the only writer on the wire.
struct Driver {
    session: std::sync::Weak<Inner>,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    child: Option<Child>,
    commands: mpsc::UnboundedReceiver<Command>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    in_flight: Option<InFlight>,
    queue: VecDeque<Queued>,
    shutdown_grace: Duration,
}

impl Driver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Submit(queued)) => self.submit(queued).await,
                    Some(Command::Cancel) => self.cancel().await,
                    Some(Command::Stop { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        return;
                    }
                    None => {
                        self.shutdown().await;
                        return;
                    }
                },
                inbound = self.inbound.recv() => match inbound {
                    Some(Inbound::Response(response)) => self.dispatch(response).await,
                    Some(Inbound::Closed) | None => {
                        self.on_exit().await;
                        return;
                    }
                },
            }
        }
    }

    fn with_shared(&self, f: impl FnOnce(&Shared)) {
        if let Some(inner) = self.session.upgrade() {
            f(&inner.shared);
        }
    }

    async fn write(&mut self, request: &Request) -> Result<()> {
        let packet = qbs_types::encode(request)?;
        self.writer.write_all(&packet).await?;
        self.writer.flush().await?;
        tracing::debug!("sent {}", request.type_name());
        Ok(())
    }

    async fn submit(&mut self, queued: Queued) {
        let kind = queued.request.kind();
        if kind == RequestKind::Cancel {
            self.cancel().await;
            let _ = queued.reply.send(Completion::completed(kind));
        } else if self.in_flight.is_some() {
            tracing::debug!("queueing {} behind in-flight operation", queued.request.type_name());
            self.queue.push_back(queued);
        } else {
            self.send(queued).await;
        }
    }

    async fn send(&mut self, queued: Queued) {
        let kind = queued.request.kind();
        if let Err(err) = self.write(&queued.request).await {
            tracing::warn!("failed to send {}: {}", queued.request.type_name(), err);
            let _ = queued.reply.send(Completion::failed(kind, err.to_string()));
            return;
        }

        self.in_flight = Some(InFlight {
            kind,
            started: Instant::now(),
            canceled: false,
            reply: queued.reply,
        });
        self.with_shared(|shared| {
            shared.progress.send_if_modified(|progress| progress.take().is_some());
            if let Some(op) = kind.operation_type() {
                shared.emit(SessionEvent::Operation(Operation::started(op)));
            }
        });
    }

    async fn release_next(&mut self) {
        while self.in_flight.is_none() {
            let Some(queued) = self.queue.pop_front() else {
                return;
            };
            self.send(queued).await;
        }
    }

    async fn cancel(&mut self) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            tracing::debug!("cancel ignored, nothing in flight");
            return;
        };
        in_flight.canceled = true;
        if let Err(err) = self.write(&Request::Cancel).await {
            tracing::warn!("failed to send cancel: {}", err);
        }
    }

    async fn dispatch(&mut self, response: Response) {
        match response {
            Response::Hello { .. } => tracing::debug!("ignoring repeated hello"),
            Response::ProcessOutput(output) => {
                self.with_shared(|shared| shared.emit(SessionEvent::ProcessOutput(output)));
            }
            Response::TaskStarted {
                description,
                max_progress,
            } => self.with_shared(|shared| {
                shared.update_progress(|p| {
                    p.description = description;
                    p.progress = 0;
                    p.max_progress = max_progress;
                })
            }),
            Response::TaskProgress { progress } => {
                self.with_shared(|shared| shared.update_progress(|p| p.progress = progress));
            }
            Response::TaskMaxProgress { max_progress } => {
                self.with_shared(|shared| shared.update_progress(|p| p.max_progress = max_progress));
            }
            Response::Message(message) => {
                self.with_shared(|shared| shared.emit(SessionEvent::Message(message)));
            }
            Response::OperationResult(result) => self.on_operation_result(result).await,
            Response::RunEnvironment(env) => self.on_run_environment(env).await,
            Response::ProtocolError(error) => {
                tracing::warn!("build tool reported a protocol error: {}", error);
                self.with_shared(|shared| {
                    shared.emit(SessionEvent::Message(Message {
                        kind: MessageKind::Warning,
                        items: error.clone(),
                        highlight: None,
                    }))
                });
                if self.in_flight.is_some() {
                    self.finish(false, error, CompletionPayload::None);
                    self.release_next().await;
                }
            }
            Response::Unknown(kind) => tracing::debug!("ignoring unknown packet type '{}'", kind),
        }
    }

    async fn on_operation_result(&mut self, result: OperationResult) {
        let expected = self.in_flight.as_ref().and_then(|f| f.kind.operation_type());
        if expected != Some(result.operation) {
            tracing::debug!("ignoring unexpected {} result", result.operation);
            return;
        }

        let success = result.is_success();
        let mut payload = CompletionPayload::None;
        if success && let Some(model) = ProjectModel::from_resolved(&result) {
            let model = Arc::new(model);
            self.with_shared(|shared| {
                shared.project.send_replace(Some(model.clone()));
                shared.emit(SessionEvent::ProjectUpdated(model.clone()));
            });
            payload = CompletionPayload::Project(model);
        }
        self.finish(success, result.error, payload);
        self.release_next().await;
    }

    async fn on_run_environment(&mut self, env: RunEnvironment) {
        if self.in_flight.as_ref().map(|f| f.kind) != Some(RequestKind::GetRunEnvironment) {
            tracing::debug!("ignoring unexpected run environment");
            return;
        }
        let success = env.error.is_empty();
        self.finish(
            success,
            env.error,
            CompletionPayload::RunEnvironment(env.environment),
        );
        self.release_next().await;
    }

    fn finish(&mut self, success: bool, mut messages: MessageList, payload: CompletionPayload) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };
        let success = success && !in_flight.canceled;
        if in_flight.canceled && messages.is_empty() {
            messages.push(MessageItem::new(CANCELED_MESSAGE));
        }

        let elapsed = in_flight.started.elapsed();
        if let Some(op) = in_flight.kind.operation_type() {
            self.with_shared(|shared| {
                shared.emit(SessionEvent::Operation(Operation::finished(
                    op, success, elapsed,
                )))
            });
        }

        let completion = Completion {
            kind: in_flight.kind,
            status: if success {
                OperationStatus::Completed
            } else {
                OperationStatus::Failed
            },
            elapsed,
            messages,
            payload,
        };
        let _ = in_flight.reply.send(completion);
    }

    fn fail_all(&mut self, reason: &str) {
        if self.in_flight.is_some() {
            let mut messages = MessageList::default();
            messages.push(MessageItem::new(reason));
            self.finish(false, messages, CompletionPayload::None);
        }
        for queued in self.queue.drain(..) {
            let _ = queued
                .reply
                .send(Completion::failed(queued.request.kind(), reason));
        }
    }

    /// Tool output closed without a `quit`.
    async fn on_exit(&mut self) {
        tracing::warn!("build tool session ended unexpectedly");
        self.with_shared(|shared| shared.set_status(SessionStatus::Stopping));
        self.fail_all(EXITED_MESSAGE);
        let grace = self.shutdown_grace;
        if let Some(child) = self.child.as_mut() {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => tracing::info!("build tool exited with {}", status),
                Ok(Err(err)) => tracing::warn!("failed to reap build tool: {}", err),
                Err(_) => {
                    tracing::warn!("build tool closed its output but kept running, killing it");
                    let _ = child.kill().await;
                }
            }
        }
        self.finish_stopped();
    }

    async fn shutdown(&mut self) {
        self.with_shared(|shared| shared.set_status(SessionStatus::Stopping));
        tracing::info!("stopping build tool session");

        if let Err(err) = self.write(&Request::Quit).await {
            tracing::debug!("failed to send quit: {}", err);
        }
        let grace = self.shutdown_grace;
        if tokio::time::timeout(grace, self.wait_for_exit()).await.is_err() {
            tracing::warn!("build tool did not exit within {:?}, killing it", grace);
            if let Some(child) = self.child.as_mut() {
                let _ = child.kill().await;
            }
        }

        self.fail_all(STOPPED_MESSAGE);
        self.finish_stopped();
    }

    async fn wait_for_exit(&mut self) {
        match self.child.as_mut() {
            Some(child) => {
                let _ = child.wait().await;
            }
            None => {
                while let Some(inbound) = self.inbound.recv().await {
                    if matches!(inbound, Inbound::Closed) {
                        break;
                    }
                }
            }
        }
    }

    /// The command channel is cleared before `Stopped` is published.
    fn finish_stopped(&mut self) {
        self.child = None;
        let Some(inner) = self.session.upgrade() else {
            return;
        };
        if let Ok(mut commands) = inner.commands.lock() {
            *commands = None;
        }
        inner
            .shared
            .progress
            .send_if_modified(|progress| progress.take().is_some());
        inner.shared.set_status(SessionStatus::Stopped);
    }
}
