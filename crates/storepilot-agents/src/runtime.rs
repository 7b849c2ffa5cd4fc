use std::sync::Arc;

use chrono::Local;
use serde_json::Value;
use storepilot_common::{Error, MessageRole, Result, RunId, ThreadId, ThreadMessage, UserId};
use storepilot_config::AppConfig;
use storepilot_db::{LogStore, ThreadStore, TraceDirection};
use tracing::{debug, info, instrument, warn};

use crate::assistants::AssistantsClient;
use crate::context::{NUDGE_MESSAGE, feedback_message, priming_message};
use crate::dispatch::ActionDispatcher;
use crate::executor::{ApiExecutor, RestExecutor};
use crate::extract::{ActionRequest, extract_action};
use crate::journal::Journal;
use crate::poll::{PollOutcome, PollPolicy, poll_until};
use crate::skills::booking::{RestBookingBackend, register_booking_handlers};
use crate::transport::ConversationTransport;

/// Maximum number of chained actions executed for one task.
const MAX_ACTION_CYCLES: usize = 5;

/// Reply used when the thread has no message to show.
pub const NO_RESPONSE: &str = "No response.";

/// What the assistant did after an action result was fed back.
enum Followup {
    Action(ActionRequest, String),
    Answer(String),
    Stalled,
}

/// Drives one user task through thread, run, reply and action cycles.
///
/// Tasks for different users are independent. Two concurrent tasks for the
/// same user share a thread and rely on the service's one-active-run rule.
pub struct AssistantRuntime {
    config: AppConfig,
    transport: Arc<dyn ConversationTransport>,
    executor: Arc<dyn ApiExecutor>,
    dispatcher: ActionDispatcher,
    threads: Arc<dyn ThreadStore>,
    journal: Arc<Journal>,
}

impl AssistantRuntime {
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn ConversationTransport>,
        executor: Arc<dyn ApiExecutor>,
        dispatcher: ActionDispatcher,
        threads: Arc<dyn ThreadStore>,
        journal: Arc<Journal>,
    ) -> Self {
        Self {
            config,
            transport,
            executor,
            dispatcher,
            threads,
            journal,
        }
    }

    /// Wires the HTTP transport, the store executor and the booking actions.
    pub fn from_config(
        config: AppConfig,
        threads: Arc<dyn ThreadStore>,
        logs: Arc<dyn LogStore>,
    ) -> Self {
        let journal = Arc::new(Journal::new(logs, config.debug));
        let transport = Arc::new(AssistantsClient::new(
            config.assistant.api_key.clone().unwrap_or_default(),
            Some(config.assistant.base_url.clone()),
            journal.clone(),
        ));
        let executor: Arc<dyn ApiExecutor> =
            Arc::new(RestExecutor::from_config(&config.store, journal.clone()));

        let mut dispatcher = ActionDispatcher::new();
        register_booking_handlers(
            &mut dispatcher,
            Arc::new(RestBookingBackend::new(executor.clone())),
        );

        Self::new(config, transport, executor, dispatcher, threads, journal)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn current_thread(&self, user: &UserId) -> Result<Option<ThreadId>> {
        self.threads.get(user)
    }

    /// Runs a task and returns the text to show the user.
    ///
    /// Errors are reserved for missing configuration and for failing to
    /// create a thread or obtain a run; everything else is reported inside
    /// the returned text.
    #[instrument(skip(self, user, task), fields(user = %user))]
    pub async fn run_task(&self, user: &UserId, task: &str) -> Result<String> {
        self.config.ensure_task_ready()?;
        let task = task.trim();
        if task.is_empty() {
            return Err(Error::Action("task is empty".to_string()));
        }
        self.journal
            .record_trace(TraceDirection::Sent, &format!("User message: {task}"));

        let thread = self.ensure_thread(user).await?;

        if let Err(e) = self
            .transport
            .post_message(&thread, MessageRole::User, task)
            .await
        {
            warn!("failed to post task to thread {thread}: {e}");
            let answer = format!("Error sending message: {e}");
            self.journal.record_conversation(user, task, &answer);
            return Ok(answer);
        }

        let run = self.acquire_run(&thread).await?;
        self.wait_for_run(&thread, &run).await;

        let answer = match self.latest_message(&thread).await {
            Some(reply) if reply.role == MessageRole::Assistant => {
                match extract_action(&reply.text) {
                    Some(action) => self.action_cycle(&thread, action, reply.id).await,
                    None => reply.text,
                }
            }
            Some(message) => message.text,
            None => NO_RESPONSE.to_string(),
        };

        self.journal.record_conversation(user, task, &answer);
        Ok(answer)
    }

    /// Drops the user's thread and, when credentials are present, starts
    /// and primes a replacement right away.
    #[instrument(skip(self, user), fields(user = %user))]
    pub async fn reset_thread(&self, user: &UserId) -> Result<Option<ThreadId>> {
        self.threads.clear(user)?;
        self.journal.record_event(Some(user), "Thread reset by user");

        if let Err(e) = self.config.ensure_task_ready() {
            info!("not creating a replacement thread: {e}");
            return Ok(None);
        }
        match self.start_thread(user).await {
            Ok(thread) => Ok(Some(thread)),
            Err(e) => {
                warn!("replacement thread not created, next task will retry: {e}");
                Ok(None)
            }
        }
    }

    async fn ensure_thread(&self, user: &UserId) -> Result<ThreadId> {
        if let Some(thread) = self.threads.get(user)? {
            return Ok(thread);
        }
        self.start_thread(user).await
    }

    async fn start_thread(&self, user: &UserId) -> Result<ThreadId> {
        let thread = self
            .transport
            .create_thread()
            .await
            .map_err(|e| Error::ThreadCreation(e.to_string()))?;
        self.threads.set(user, &thread)?;
        self.journal.record_event(Some(user), "New thread created");
        self.prime(user, &thread).await;
        Ok(thread)
    }

    async fn prime(&self, user: &UserId, thread: &ThreadId) {
        let message = priming_message(
            Local::now().date_naive(),
            self.config.store.base_url.as_deref().unwrap_or_default(),
            &self.dispatcher.action_ids(),
        );
        self.journal
            .record_trace(TraceDirection::Sent, &format!("Sending context: {message}"));
        match self
            .transport
            .post_message(thread, MessageRole::User, &message)
            .await
        {
            Ok(()) => self
                .journal
                .record_event(Some(user), "Context with API details sent"),
            Err(e) => warn!("failed to send context to thread {thread}: {e}"),
        }
    }

    /// A fresh run, the run named in a conflict, or the first active run
    /// on the thread, in that order.
    async fn acquire_run(&self, thread: &ThreadId) -> Result<RunId> {
        let assistant_id = self
            .config
            .assistant
            .assistant_id
            .as_deref()
            .unwrap_or_default();

        match self.transport.create_run(thread, assistant_id).await {
            Ok(run) => return Ok(run),
            Err(Error::RunConflict {
                active_run_id: Some(run),
                ..
            }) => {
                info!("thread {thread} busy, resuming run {run}");
                self.journal.record_trace(
                    TraceDirection::Warning,
                    &format!("Run already active, continuing with {run}"),
                );
                return Ok(RunId::from(run));
            }
            Err(e) => {
                warn!("run creation failed on thread {thread}: {e}");
                self.journal.record_trace(
                    TraceDirection::Warning,
                    &format!("Run creation failed, looking for an active run: {e}"),
                );
            }
        }

        let runs = self.transport.list_runs(thread).await.unwrap_or_else(|e| {
            warn!("failed to list runs on thread {thread}: {e}");
            Vec::new()
        });
        runs.into_iter()
            .find(|r| r.status.is_active())
            .map(|r| r.id)
            .ok_or_else(|| Error::NoActiveRun(thread.to_string()))
    }

    async fn wait_for_run(&self, thread: &ThreadId, run: &RunId) {
        let policy = PollPolicy::new(
            self.config.polling.run_poll_attempts,
            self.config.polling.run_poll_interval(),
        );
        let transport = self.transport.as_ref();
        let outcome = poll_until(policy, move |attempt| async move {
            match transport.get_run(thread, run).await {
                Ok(status) if status.is_completed() => Some(()),
                Ok(status) => {
                    debug!(attempt, ?status, "run {run} not complete");
                    None
                }
                Err(e) => {
                    warn!("status check for run {run} failed: {e}");
                    None
                }
            }
        })
        .await;

        if let PollOutcome::Exhausted { attempts } = outcome {
            warn!("run {run} not complete after {attempts} checks, using latest message");
            self.journal.record_trace(
                TraceDirection::Warning,
                &format!("Run {run} not complete after {attempts} checks"),
            );
        }
    }

    /// Newest message on the thread, whoever wrote it.
    async fn latest_message(&self, thread: &ThreadId) -> Option<ThreadMessage> {
        self.transport
            .latest_message(thread)
            .await
            .unwrap_or_else(|e| {
                warn!("failed to read latest message on thread {thread}: {e}");
                None
            })
    }

    /// Latest assistant message. Follow-ups never act on the user's own text.
    async fn latest_reply(&self, thread: &ThreadId) -> Option<ThreadMessage> {
        self.latest_message(thread)
            .await
            .filter(|message| message.role == MessageRole::Assistant)
    }

    async fn action_cycle(&self, thread: &ThreadId, first: ActionRequest, reply_id: String) -> String {
        let mut action = first;
        let mut seen_reply = reply_id;
        let mut last_result = Value::Null;

        for cycle in 1..=MAX_ACTION_CYCLES {
            info!(cycle, action = action.name(), "executing assistant action");
            last_result = self.perform(&action).await;

            let run = match self.feed_back(thread, &last_result).await {
                Ok(run) => run,
                Err(e) => {
                    warn!("could not hand the action result back: {e}");
                    return executed_summary(&last_result);
                }
            };

            match self.await_followup(thread, &run, &seen_reply).await {
                Followup::Action(next, id) => {
                    action = next;
                    seen_reply = id;
                }
                Followup::Answer(text) => return text,
                Followup::Stalled => {
                    self.nudge(thread).await;
                    return executed_summary(&last_result);
                }
            }
        }

        warn!("stopped after {MAX_ACTION_CYCLES} chained actions");
        executed_summary(&last_result)
    }

    async fn perform(&self, action: &ActionRequest) -> Value {
        match action {
            ActionRequest::Http(request) => {
                let outcome = self.executor.execute(request).await;
                serde_json::to_value(&outcome).unwrap_or_default()
            }
            ActionRequest::Skill { action, params } => {
                self.journal.record_trace(
                    TraceDirection::Executed,
                    &format!("Dispatching {action}: {}", Value::Object(params.clone())),
                );
                let result = self.dispatcher.dispatch(action, params.clone()).await;
                if !result.success {
                    info!(action = action.as_str(), "action reported failure");
                }
                result.to_json()
            }
        }
    }

    async fn feed_back(&self, thread: &ThreadId, result: &Value) -> Result<RunId> {
        let message = feedback_message(&result.to_string());
        self.journal.record_trace(
            TraceDirection::Sent,
            &format!("Sending API result to Assistant: {result}"),
        );
        self.transport
            .post_message(thread, MessageRole::User, &message)
            .await?;
        self.acquire_run(thread).await
    }

    async fn await_followup(&self, thread: &ThreadId, run: &RunId, seen_reply: &str) -> Followup {
        let policy = PollPolicy::new(
            self.config.polling.followup_attempts,
            self.config.polling.followup_interval(),
        );
        let this = self;
        let outcome = poll_until(policy, move |_| async move {
            match this.transport.get_run(thread, run).await {
                Ok(status) if status.is_completed() => {}
                Ok(status) if status.is_active() => return None,
                Ok(status) => {
                    warn!(?status, "follow-up run {run} ended without completing");
                    return Some(Followup::Stalled);
                }
                Err(e) => {
                    warn!("status check for follow-up run {run} failed: {e}");
                    return None;
                }
            }
            let reply = this.latest_reply(thread).await?;
            if reply.id == seen_reply {
                return None;
            }
            Some(match extract_action(&reply.text) {
                Some(next) => Followup::Action(next, reply.id),
                None => Followup::Answer(reply.text),
            })
        })
        .await;

        outcome.into_value().unwrap_or(Followup::Stalled)
    }

    async fn nudge(&self, thread: &ThreadId) {
        info!("nudging assistant on thread {thread}");
        self.journal
            .record_trace(TraceDirection::Sent, &format!("Nudge: {NUDGE_MESSAGE}"));
        if let Err(e) = self
            .transport
            .post_message(thread, MessageRole::User, NUDGE_MESSAGE)
            .await
        {
            warn!("failed to nudge thread {thread}: {e}");
            return;
        }
        if let Err(e) = self.acquire_run(thread).await {
            warn!("no run after nudge on thread {thread}: {e}");
        }
    }
}

fn executed_summary(result: &Value) -> String {
    format!("API call executed. Result: {result}")
}
