//! Single-flight execution.
//!
//! The [`RunSupervisor`] holds at most one [`RunHandle`]. Submitting a new
//! command first stops the held run and waits for it to terminate, so two
//! processes started through one supervisor never overlap.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::config::SupervisorSettings;
use crate::execution::{CompletionEvent, EventSink, ProcessRunner, RunHandle, RunId, RunState};
use crate::resolution::ResolvedCommand;

pub struct RunSupervisor {
    runner: ProcessRunner,
    sink: Arc<dyn EventSink>,
    stop_timeout: Duration,
    active: Option<RunHandle>,
    last_id: u64,
}

impl RunSupervisor {
    pub fn new(settings: SupervisorSettings, sink: impl EventSink) -> Self {
        Self {
            runner: ProcessRunner::new(settings.shell, settings.run_timeout)
                .with_encoding(settings.encoding),
            sink: Arc::new(sink),
            stop_timeout: settings.stop_timeout,
            active: None,
            last_id: 0,
        }
    }

    /// Starts `command`, stopping the current run first if there is one.
    ///
    /// Returns the id carried by every event of the new run.
    pub async fn submit(&mut self, command: ResolvedCommand) -> RunId {
        if let Some(previous) = self.active.take() {
            let completion = self.stop(previous).await;
            debug!("Previous run ended before submit: {}", completion.message);
        }

        self.last_id += 1;
        let id = RunId(self.last_id);
        info!("Starting run {id}: {}", command.command_line);

        self.active = Some(self.runner.start(id, command, Arc::clone(&self.sink)));
        id
    }

    /// Stops the current run, if any, and returns how it ended.
    pub async fn cancel(&mut self) -> Option<CompletionEvent> {
        let handle = self.active.take()?;
        Some(self.stop(handle).await)
    }

    /// Waits for the current run, if any, to finish on its own.
    pub async fn wait(&mut self) -> Option<CompletionEvent> {
        let handle = self.active.take()?;
        Some(handle.join().await)
    }

    /// Id of the run held by the supervisor while it has not reached a final state.
    pub fn active_run(&self) -> Option<RunId> {
        self.active
            .as_ref()
            .filter(|handle| !handle.state().is_terminal())
            .map(RunHandle::id)
    }

    pub fn active_state(&self) -> Option<RunState> {
        self.active.as_ref().map(RunHandle::state)
    }

    async fn stop(&self, mut handle: RunHandle) -> CompletionEvent {
        if handle.is_finished() {
            return handle.join().await;
        }

        info!("Cancelling run {}", handle.id());
        handle.cancel();
        handle.join_within(self.stop_timeout).await
    }
}
