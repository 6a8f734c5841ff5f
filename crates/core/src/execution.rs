//! Process runner.
//!
//! Each run executes one resolved command line through the configured shell on
//! its own tokio task. Standard output and standard error share one pipe and
//! are read as they arrive, decoded, classified and forwarded to an [`EventSink`] as
//! [`RunEvent::Output`]; exactly one [`RunEvent::Completed`] closes every run.
//!
//! The caller keeps a [`RunHandle`] to observe the run's [`RunState`], request
//! termination and collect the final [`CompletionEvent`].

use std::fmt::{Display, Formatter};
use std::io::{self, PipeReader, Read};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use crate::config::ShellSettings;
use crate::output::{OutputDecoder, OutputEvent};
use crate::resolution::ResolvedCommand;

const READ_BUFFER_SIZE: usize = 4096;

/// How long output is still collected once the process has exited.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl Display for RunId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Lifecycle of a single run. `Succeeded`, `Failed` and `Cancelled` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Spawning,
    Streaming,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub status: RunStatus,
    /// Exit code of the process, when it exited normally.
    pub exit_code: Option<i32>,
    pub message: String,
}

impl CompletionEvent {
    pub fn succeeded() -> Self {
        Self {
            status: RunStatus::Succeeded,
            exit_code: Some(0),
            message: "Command finished successfully".to_string(),
        }
    }

    pub fn failed(exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            exit_code,
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Cancelled,
            exit_code: None,
            message: message.into(),
        }
    }

    pub fn from_exit_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => Self::succeeded(),
            Some(code) => Self::failed(Some(code), format!("Command failed with exit code {code}")),
            None => Self::failed(None, format!("Command was terminated ({status})")),
        }
    }

    pub fn success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    fn final_state(&self) -> RunState {
        match self.status {
            RunStatus::Succeeded => RunState::Succeeded,
            RunStatus::Failed => RunState::Failed,
            RunStatus::Cancelled => RunState::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// The command line is about to be spawned.
    Started { run_id: RunId, command_line: String },
    Output { run_id: RunId, output: OutputEvent },
    /// Always the last event of a run.
    Completed {
        run_id: RunId,
        completion: CompletionEvent,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Started { run_id, .. }
            | Self::Output { run_id, .. }
            | Self::Completed { run_id, .. } => *run_id,
        }
    }
}

/// Consumer of run events. Implementations must not block.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: RunEvent);
}

impl EventSink for mpsc::UnboundedSender<RunEvent> {
    fn emit(&self, event: RunEvent) {
        if self.send(event).is_err() {
            debug!("Event receiver is gone, dropping run event");
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    shell: ShellSettings,
    run_timeout: Option<Duration>,
    encoding: &'static Encoding,
}

impl ProcessRunner {
    pub fn new(shell: ShellSettings, run_timeout: Option<Duration>) -> Self {
        Self {
            shell,
            run_timeout,
            encoding: UTF_8,
        }
    }

    /// Sets the primary encoding used to decode output.
    #[must_use]
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Starts running `command` on a new task and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn start(&self, id: RunId, command: ResolvedCommand, sink: Arc<dyn EventSink>) -> RunHandle {
        let (kill_tx, kill_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(RunState::Idle);
        let completed = Arc::new(AtomicBool::new(false));

        let run = Run {
            id,
            shell: self.shell.clone(),
            run_timeout: self.run_timeout,
            encoding: self.encoding,
            sink: Arc::clone(&sink),
            state: state_tx,
            completed: Arc::clone(&completed),
        };
        let command_line = command.command_line;
        let task = tokio::spawn(run.drive(command_line.clone(), kill_rx));

        RunHandle {
            id,
            command_line,
            kill: Some(kill_tx),
            cancelled: false,
            state: state_rx,
            completed,
            sink,
            task,
        }
    }
}

/// Sends the completion of a run unless one was already sent.
fn publish_completion(
    completed: &AtomicBool,
    sink: &dyn EventSink,
    run_id: RunId,
    completion: &CompletionEvent,
) -> bool {
    if completed.swap(true, Ordering::SeqCst) {
        return false;
    }

    sink.emit(RunEvent::Completed {
        run_id,
        completion: completion.clone(),
    });
    true
}

type Chunk = io::Result<Vec<u8>>;

enum Interruption {
    Cancelled,
    TimedOut(Duration),
}

enum Streamed {
    Exited(io::Result<ExitStatus>),
    Interrupted(Interruption),
}

/// Kills every process of a run when dropped while armed.
///
/// The shell is started as the leader of its own process group, so killing the
/// group also reaches the commands it forked. An aborted run task drops this
/// guard armed, which leaves nothing of the run behind.
struct ProcessGroup {
    leader: Option<u32>,
    armed: bool,
}

impl ProcessGroup {
    fn new(leader: Option<u32>) -> Self {
        Self {
            leader,
            armed: true,
        }
    }

    #[cfg(unix)]
    fn kill(&mut self) -> io::Result<()> {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        self.armed = false;
        let Some(leader) = self.leader else {
            return Ok(());
        };
        let leader = i32::try_from(leader).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        match killpg(Pid::from_raw(leader), Signal::SIGKILL) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(errno) => Err(errno.into()),
        }
    }

    // Without process groups only the shell itself is killed, through the child handle.
    #[cfg(not(unix))]
    fn kill(&mut self) -> io::Result<()> {
        self.armed = false;
        Ok(())
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if self.armed {
            if let Err(error) = self.kill() {
                debug!("Could not kill process group {:?}: {error}", self.leader);
            }
        }
    }
}

/// Reads the merged output pipe on a dedicated thread until it closes.
fn pump_output(mut reader: PipeReader, chunks: mpsc::UnboundedSender<Chunk>) {
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(count) => {
                if chunks.send(Ok(buffer[..count].to_vec())).is_err() {
                    break;
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => {
                let _ = chunks.send(Err(error));
                break;
            }
        }
    }
}

/// State owned by the task of a single run.
struct Run {
    id: RunId,
    shell: ShellSettings,
    run_timeout: Option<Duration>,
    encoding: &'static Encoding,
    sink: Arc<dyn EventSink>,
    state: watch::Sender<RunState>,
    completed: Arc<AtomicBool>,
}

impl Run {
    async fn drive(self, command_line: String, mut kill: oneshot::Receiver<()>) -> CompletionEvent {
        self.state.send_replace(RunState::Spawning);
        self.sink.emit(RunEvent::Started {
            run_id: self.id,
            command_line: command_line.clone(),
        });

        let (mut child, mut chunks) = match self.spawn(&command_line) {
            Ok(spawned) => spawned,
            Err(error) => {
                warn!("Run {} could not be started: {error}", self.id);
                return self.complete(CompletionEvent::failed(
                    None,
                    format!("Failed to start command: {error}"),
                ));
            }
        };
        let mut group = ProcessGroup::new(child.id());
        debug!("Run {} spawned process {:?}", self.id, child.id());
        self.state.send_replace(RunState::Streaming);

        let deadline = self.run_timeout.map(|timeout| (Instant::now() + timeout, timeout));

        let completion = match self.stream(&mut child, &mut chunks, &mut kill, deadline).await {
            Streamed::Interrupted(interruption) => {
                self.interrupt(&mut child, &mut group, interruption).await
            }
            Streamed::Exited(Ok(status)) => {
                group.disarm();
                CompletionEvent::from_exit_status(status)
            }
            Streamed::Exited(Err(error)) => {
                CompletionEvent::failed(None, format!("Failed to wait for command: {error}"))
            }
        };

        self.complete(completion)
    }

    /// Spawns the shell with stdout and stderr sharing one pipe, so output
    /// keeps the order in which the process wrote it.
    fn spawn(&self, command_line: &str) -> io::Result<(Child, mpsc::UnboundedReceiver<Chunk>)> {
        let (reader, writer) = io::pipe()?;
        let stderr_writer = writer.try_clone()?;

        let mut command = Command::new(&self.shell.program);
        command
            .args(&self.shell.args)
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn()?;
        // The write ends must close here, or the reader never sees the end of output.
        drop(command);

        let (chunks_tx, chunks_rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name(format!("run-{}-output", self.id.0))
            .spawn(move || pump_output(reader, chunks_tx))?;

        Ok((child, chunks_rx))
    }

    /// Forwards output until the process exits, or returns early on a kill
    /// request or an elapsed deadline.
    async fn stream(
        &self,
        child: &mut Child,
        chunks: &mut mpsc::UnboundedReceiver<Chunk>,
        kill: &mut oneshot::Receiver<()>,
        deadline: Option<(Instant, Duration)>,
    ) -> Streamed {
        let mut decoder = OutputDecoder::new(self.encoding);
        let mut open = true;

        loop {
            tokio::select! {
                biased;
                _ = &mut *kill => return Streamed::Interrupted(Interruption::Cancelled),
                timeout = expire(deadline) => {
                    return Streamed::Interrupted(Interruption::TimedOut(timeout));
                }
                chunk = chunks.recv(), if open => {
                    open = self.forward(chunk, &mut decoder);
                }
                status = child.wait() => {
                    if open {
                        self.drain(chunks, &mut decoder).await;
                    }
                    return Streamed::Exited(status);
                }
            }
        }
    }

    /// Collects output still in flight after the process exited. Commands it
    /// left running in the background may hold the pipe open, so this gives up
    /// after a short grace period.
    async fn drain(&self, chunks: &mut mpsc::UnboundedReceiver<Chunk>, decoder: &mut OutputDecoder) {
        let drained = tokio::time::timeout(OUTPUT_DRAIN_GRACE, async {
            while self.forward(chunks.recv().await, decoder) {}
        })
        .await;

        if drained.is_err() {
            debug!("Run {} exited with its output pipe still open", self.id);
            self.emit_output(decoder.finish());
        }
    }

    /// Returns whether the pipe is still open.
    fn forward(&self, chunk: Option<Chunk>, decoder: &mut OutputDecoder) -> bool {
        match chunk {
            Some(Ok(bytes)) => {
                self.emit_output(Some(decoder.decode(&bytes)));
                true
            }
            Some(Err(error)) => {
                debug!("Run {} stopped reading output: {error}", self.id);
                self.emit_output(decoder.finish());
                false
            }
            None => {
                self.emit_output(decoder.finish());
                false
            }
        }
    }

    fn emit_output(&self, text: Option<String>) {
        if let Some(text) = text.filter(|text| !text.is_empty()) {
            self.sink.emit(RunEvent::Output {
                run_id: self.id,
                output: OutputEvent::new(text),
            });
        }
    }

    async fn interrupt(
        &self,
        child: &mut Child,
        group: &mut ProcessGroup,
        interruption: Interruption,
    ) -> CompletionEvent {
        if let Err(error) = group.kill() {
            debug!("Run {} process group could not be killed: {error}", self.id);
        }
        if let Err(error) = child.start_kill() {
            debug!("Run {} could not be killed: {error}", self.id);
        }
        let status = child.wait().await;
        debug!("Run {} killed, wait returned {:?}", self.id, status);

        match interruption {
            Interruption::Cancelled => CompletionEvent::cancelled("Command was cancelled"),
            Interruption::TimedOut(timeout) => {
                CompletionEvent::failed(None, format!("Command timed out after {timeout:?}"))
            }
        }
    }

    fn complete(&self, completion: CompletionEvent) -> CompletionEvent {
        // No await between the state change and the emit, so an abort cannot split them.
        if !self.completed.load(Ordering::SeqCst) {
            self.state.send_replace(completion.final_state());
        }
        publish_completion(&self.completed, self.sink.as_ref(), self.id, &completion);
        completion
    }
}

/// Resolves with the configured timeout once the deadline passes; never without one.
async fn expire(deadline: Option<(Instant, Duration)>) -> Duration {
    match deadline {
        Some((at, timeout)) => {
            tokio::time::sleep_until(at).await;
            timeout
        }
        None => std::future::pending().await,
    }
}

/// Owner's side of a run started by [`ProcessRunner::start`].
pub struct RunHandle {
    id: RunId,
    command_line: String,
    kill: Option<oneshot::Sender<()>>,
    cancelled: bool,
    state: watch::Receiver<RunState>,
    completed: Arc<AtomicBool>,
    sink: Arc<dyn EventSink>,
    task: JoinHandle<CompletionEvent>,
}

impl RunHandle {
    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// True once the runner task has returned.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Asks the runner to kill its process. Returns without waiting for the exit.
    pub fn cancel(&mut self) {
        if let Some(kill) = self.kill.take() {
            self.cancelled = true;
            if kill.send(()).is_err() {
                debug!("Run {} already finished before cancellation", self.id);
            }
        }
    }

    /// Waits for the run to finish on its own.
    pub async fn join(mut self) -> CompletionEvent {
        let joined = (&mut self.task).await;
        self.settle(joined)
    }

    /// Waits at most `grace` for the run to finish. A run still going after
    /// that is abandoned: its task is aborted, which drops and kills the child,
    /// and a cancelled completion is published on its behalf.
    pub async fn join_within(mut self, grace: Duration) -> CompletionEvent {
        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(joined) => self.settle(joined),
            Err(_) => {
                warn!("Run {} did not stop within {grace:?}, abandoning it", self.id);
                self.task.abort();
                let joined = (&mut self.task).await;
                self.settle(joined)
            }
        }
    }

    fn settle(&self, joined: Result<CompletionEvent, JoinError>) -> CompletionEvent {
        match joined {
            Ok(completion) => completion,
            Err(error) => {
                let completion = if error.is_cancelled() {
                    CompletionEvent::cancelled("Command did not stop in time and was abandoned")
                } else {
                    CompletionEvent::failed(None, format!("Command runner failed: {error}"))
                };
                publish_completion(&self.completed, self.sink.as_ref(), self.id, &completion);
                completion
            }
        }
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("id", &self.id)
            .field("command_line", &self.command_line)
            .field("cancelled", &self.cancelled)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::command_definitions::{CommandKind, CommandTemplate};
    use crate::output::Classification;

    fn resolved(command_line: &str) -> ResolvedCommand {
        ResolvedCommand {
            source: CommandTemplate::new("test", command_line, CommandKind::Normal),
            command_line: command_line.to_string(),
        }
    }

    fn start(
        command_line: &str,
        run_timeout: Option<Duration>,
    ) -> (RunHandle, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = ProcessRunner::new(ShellSettings::posix(), run_timeout);
        let handle = runner.start(RunId(1), resolved(command_line), Arc::new(tx));
        (handle, rx)
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let is_last = matches!(event, RunEvent::Completed { .. });
            events.push(event);
            if is_last {
                break;
            }
        }
        events
    }

    fn output_text(events: &[RunEvent]) -> String {
        events
            .iter()
            .filter_map(|event| match event {
                RunEvent::Output { output, .. } => Some(output.text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_exit_zero_is_success() {
        let (handle, rx) = start("echo hello world", None);
        let completion = handle.join().await;

        assert!(completion.success());
        assert_eq!(completion.exit_code, Some(0));

        let events = drain(rx).await;
        assert!(matches!(events.first(), Some(RunEvent::Started { .. })));
        assert!(matches!(events.last(), Some(RunEvent::Completed { .. })));
        assert_eq!(output_text(&events), "hello world\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure_with_code() {
        let (handle, _rx) = start("exit 7", None);
        let completion = handle.join().await;

        assert_eq!(completion.status, RunStatus::Failed);
        assert_eq!(completion.exit_code, Some(7));
    }

    #[tokio::test]
    async fn test_stderr_is_merged_and_classified() {
        let (handle, rx) = start("echo 'Error: device not found' >&2", None);
        let completion = handle.join().await;
        assert!(completion.success());

        let events = drain(rx).await;
        let outputs: Vec<&OutputEvent> = events
            .iter()
            .filter_map(|event| match event {
                RunEvent::Output { output, .. } => Some(output),
                _ => None,
            })
            .collect();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].classification, Classification::Error);
    }

    #[tokio::test]
    async fn test_invalid_bytes_are_replaced() {
        let (handle, rx) = start("printf 'ok\\377\\n'", None);
        assert!(handle.join().await.success());

        let events = drain(rx).await;
        assert_eq!(output_text(&events), "ok\u{fffd}\n");
    }

    #[tokio::test]
    async fn test_spawn_failure_reports_without_output() {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = ProcessRunner::new(
            ShellSettings::new("/nonexistent/shell", &["-c"]),
            None,
        );
        let handle = runner.start(RunId(3), resolved("echo hi"), Arc::new(tx));
        let completion = handle.join().await;

        assert_eq!(completion.status, RunStatus::Failed);
        assert!(completion.exit_code.is_none());
        assert!(completion.message.starts_with("Failed to start command"));

        let events = drain(rx).await;
        assert!(events
            .iter()
            .all(|event| !matches!(event, RunEvent::Output { .. })));
    }

    #[tokio::test]
    async fn test_cancel_kills_running_process() {
        let (mut handle, mut rx) = start("echo started; exec sleep 30", None);

        // Wait until the process is producing output before cancelling.
        loop {
            match rx.recv().await {
                Some(RunEvent::Output { .. }) => break,
                Some(_) => {}
                None => panic!("channel closed early"),
            }
        }

        handle.cancel();
        assert!(handle.is_cancelled());
        let completion = handle.join_within(Duration::from_secs(5)).await;

        assert_eq!(completion.status, RunStatus::Cancelled);
        assert!(!completion.success());

        let rest = drain(rx).await;
        assert!(matches!(
            rest.last(),
            Some(RunEvent::Completed { completion, .. }) if completion.status == RunStatus::Cancelled
        ));
    }

    #[tokio::test]
    async fn test_run_timeout_fails_the_run() {
        let (handle, _rx) = start("exec sleep 30", Some(Duration::from_millis(200)));
        let completion = handle.join().await;

        assert_eq!(completion.status, RunStatus::Failed);
        assert!(completion.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_state_reaches_terminal() {
        let (handle, _rx) = start("true", None);
        let mut state = handle.state.clone();
        let completion = handle.join().await;

        assert!(completion.success());
        assert_eq!(*state.borrow_and_update(), RunState::Succeeded);
    }

    #[tokio::test]
    async fn test_stderr_and_stdout_keep_write_order() {
        for _ in 0..20 {
            let (handle, rx) = start("printf 'first-err\\n' >&2; printf 'second-out\\n'", None);
            assert!(handle.join().await.success());

            let events = drain(rx).await;
            assert_eq!(output_text(&events), "first-err\nsecond-out\n");
        }
    }

    #[tokio::test]
    async fn test_join_within_abandons_run_with_single_completion() {
        let (handle, mut rx) = start("exec sleep 30", None);
        assert!(matches!(rx.recv().await, Some(RunEvent::Started { .. })));

        let completion = handle.join_within(Duration::ZERO).await;
        assert_eq!(completion.status, RunStatus::Cancelled);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        let completions: Vec<&CompletionEvent> = events
            .iter()
            .filter_map(|event| match event {
                RunEvent::Completed { completion, .. } => Some(completion),
                _ => None,
            })
            .collect();

        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].status, RunStatus::Cancelled);
        assert!(matches!(events.last(), Some(RunEvent::Completed { .. })));
    }

    #[cfg(target_os = "linux")]
    fn is_alive(pid: i32) -> bool {
        std::fs::read_to_string(format!("/proc/{pid}/stat")).is_ok_and(|stat| {
            let state = stat
                .rsplit_once(") ")
                .and_then(|(_, rest)| rest.chars().next());
            !matches!(state, None | Some('Z' | 'X'))
        })
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_cancel_kills_forked_commands() {
        let (mut handle, mut rx) = start("sleep 30 & echo $!; wait", None);

        let pid = loop {
            match rx.recv().await {
                Some(RunEvent::Output { output, .. }) => {
                    break output.text.trim().parse::<i32>().unwrap();
                }
                Some(_) => {}
                None => panic!("channel closed early"),
            }
        };
        assert!(is_alive(pid));

        handle.cancel();
        let completion = handle.join_within(Duration::from_secs(5)).await;
        assert_eq!(completion.status, RunStatus::Cancelled);

        let mut alive = true;
        for _ in 0..50 {
            if !is_alive(pid) {
                alive = false;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!alive, "forked sleep {pid} survived cancellation");
    }

    #[tokio::test]
    async fn test_output_decoded_with_configured_encoding() {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner =
            ProcessRunner::new(ShellSettings::posix(), None).with_encoding(encoding_rs::GBK);
        // "设备" in GBK
        let handle = runner.start(
            RunId(4),
            resolved("printf '\\311\\350\\261\\270\\n'"),
            Arc::new(tx),
        );
        assert!(handle.join().await.success());

        let events = drain(rx).await;
        assert_eq!(output_text(&events), "设备\n");
    }
}
