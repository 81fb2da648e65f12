//! Conversation controller
//!
//! `ChatSession` owns the message log, input buffer, pending attachments,
//! settings and model catalog. Asynchronous work is started with a `begin_*`
//! call that updates state synchronously and returns a self-contained future;
//! its output is folded back in with the matching `finish_*`/`complete_*`.
//! Futures carry a ticket stamped with the session generation, and `dispose`
//! bumps the generation so late completions are dropped.

pub mod state;


use std::sync::Arc;

use tracing::{debug, error, info, warn};

pub use state::{SessionEvent, SessionState};

use crate::attachments::{IngestOutcome, PendingAttachment, SelectedFile, ingest_files};
use crate::composer::{ComposedRequest, OutgoingMessage, compose};
use crate::error::ChatResult;
use crate::message::{ConversationUsage, Message};
use crate::models::{ModelCatalog, ModelMetadata, ReasoningEffort, Reconciliation, reconcile};
use crate::settings::ChatSettings;
use crate::transport::{ChatResponse, ChatTransport, TransportFuture};

/// Proof that an operation was started by this session generation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

/// A send that has been committed to the log and is ready for the network
pub struct PendingSend {
    ticket: Ticket,
    /// Whether the answering model issues chaining tokens
    chains: bool,
    transport: Arc<dyn ChatTransport>,
    request: ComposedRequest,
}

impl PendingSend {
    pub fn request(&self) -> &ComposedRequest {
        &self.request
    }

    /// Perform the network call
    pub async fn run(self) -> SendCompletion {
        let result = self.transport.send_chat(self.request).await;
        SendCompletion {
            ticket: self.ticket,
            chains: self.chains,
            result,
        }
    }
}

pub struct SendCompletion {
    ticket: Ticket,
    chains: bool,
    result: ChatResult<ChatResponse>,
}

/// An attachment batch waiting to be validated and decoded
pub struct PendingIngest {
    ticket: Ticket,
    files: Vec<SelectedFile>,
    snapshot: Vec<PendingAttachment>,
}

impl PendingIngest {
    /// Validate against the pending set captured at selection time and decode
    pub async fn run(self) -> IngestCompletion {
        let outcome = ingest_files(self.files, &self.snapshot).await;
        IngestCompletion {
            ticket: self.ticket,
            outcome,
        }
    }
}

pub struct IngestCompletion {
    ticket: Ticket,
    outcome: IngestOutcome,
}

/// A catalog fetch started at startup
pub struct PendingCatalogRefresh {
    ticket: Ticket,
    fetch: TransportFuture<Vec<ModelMetadata>>,
}

impl PendingCatalogRefresh {
    pub async fn run(self) -> CatalogCompletion {
        let result = self.fetch.await;
        CatalogCompletion {
            ticket: self.ticket,
            result,
        }
    }
}

pub struct CatalogCompletion {
    ticket: Ticket,
    result: ChatResult<Vec<ModelMetadata>>,
}

pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    catalog: ModelCatalog,
    settings: ChatSettings,
    messages: Vec<Message>,
    input: String,
    pending: Vec<PendingAttachment>,
    attachment_error: Option<String>,
    catalog_warning: Option<String>,
    previous_response_id: Option<String>,
    state: SessionState,
    generation: u64,
    disposed: bool,
}

impl ChatSession {
    /// Start a session on the built-in catalog with default settings
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self::with_settings(transport, ChatSettings::default())
    }

    pub fn with_settings(transport: Arc<dyn ChatTransport>, settings: ChatSettings) -> Self {
        let mut session = Self {
            transport,
            catalog: ModelCatalog::builtin(),
            settings,
            messages: Vec::new(),
            input: String::new(),
            pending: Vec::new(),
            attachment_error: None,
            catalog_warning: None,
            previous_response_id: None,
            state: SessionState::Idle,
            generation: 0,
            disposed: false,
        };
        reconcile(&mut session.settings, &session.catalog);
        session
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the "assistant is composing" placeholder should be shown
    pub fn is_composing(&self) -> bool {
        self.state == SessionState::AwaitingResponse
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn pending_attachments(&self) -> &[PendingAttachment] {
        &self.pending
    }

    pub fn attachment_error(&self) -> Option<&str> {
        self.attachment_error.as_deref()
    }

    pub fn catalog_warning(&self) -> Option<&str> {
        self.catalog_warning.as_deref()
    }

    pub fn previous_response_id(&self) -> Option<&str> {
        self.previous_response_id.as_deref()
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Mutable settings for edits that do not depend on the model.
    /// Model and effort changes go through `select_model`/`set_reasoning_effort`.
    pub fn settings_mut(&mut self) -> &mut ChatSettings {
        &mut self.settings
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn active_model(&self) -> &ModelMetadata {
        self.catalog.resolve(self.settings.model())
    }

    pub fn usage(&self) -> ConversationUsage {
        ConversationUsage::from_messages(&self.messages)
    }

    /// Whether `begin_send` would currently produce a request
    pub fn can_send(&self) -> bool {
        !self.disposed
            && self.state.on(SessionEvent::SendRequested).is_some()
            && !(self.input.trim().is_empty() && self.pending.is_empty())
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        if self.disposed || ticket.generation != self.generation {
            debug!(
                ticket_generation = ticket.generation,
                generation = self.generation,
                "Dropping completion from a stale session"
            );
            return false;
        }
        true
    }

    fn apply(&mut self, event: SessionEvent) -> bool {
        match self.state.on(event) {
            Some(next) => {
                debug!(from = ?self.state, to = ?next, event = ?event, "Session transition");
                self.state = next;
                true
            }
            None => {
                debug!(state = ?self.state, event = ?event, "Event ignored in current state");
                false
            }
        }
    }

    // ── Model registry ──────────────────────────────────────────────────

    /// Switch the active model. Unknown ids are rejected.
    pub fn select_model(&mut self, id: &str) -> bool {
        if !self.catalog.contains(id) {
            warn!(model = %id, "Ignoring selection of unknown model");
            return false;
        }
        self.settings.model = id.to_string();
        reconcile(&mut self.settings, &self.catalog);
        info!(model = %id, "Selected model");
        true
    }

    /// Set the effort level if the active model lists it
    pub fn set_reasoning_effort(&mut self, effort: ReasoningEffort) -> bool {
        let model = self.active_model();
        if !model.supports_reasoning_effort || !model.reasoning_effort_options.contains(&effort) {
            debug!(model = %model.id, effort = %effort, "Reasoning effort not offered by model");
            return false;
        }
        self.settings.set_reasoning_effort(effort);
        true
    }

    /// Replace the catalog with fetched entries and reconcile settings.
    /// An empty list keeps the current catalog.
    pub fn apply_catalog(&mut self, models: Vec<ModelMetadata>) -> Option<Reconciliation> {
        match ModelCatalog::from_models(models) {
            Some(catalog) => {
                info!(count = catalog.len(), "Applying fetched model catalog");
                self.catalog = catalog;
                self.catalog_warning = None;
                Some(reconcile(&mut self.settings, &self.catalog))
            }
            None => {
                warn!("Fetched model catalog is empty, keeping current catalog");
                self.catalog_warning =
                    Some("Model list from server was empty; using built-in models.".to_string());
                None
            }
        }
    }

    pub fn begin_catalog_refresh(&self) -> Option<PendingCatalogRefresh> {
        if self.disposed {
            return None;
        }
        Some(PendingCatalogRefresh {
            ticket: self.ticket(),
            fetch: self.transport.fetch_models(),
        })
    }

    pub fn finish_catalog_refresh(&mut self, completion: CatalogCompletion) -> bool {
        if !self.is_current(completion.ticket) {
            return false;
        }
        match completion.result {
            Ok(models) => {
                self.apply_catalog(models);
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch model catalog, keeping built-in catalog");
                self.catalog_warning = Some(format!(
                    "Could not load model list ({}); using built-in models.",
                    e
                ));
            }
        }
        true
    }

    /// Fetch the remote catalog and apply it
    pub async fn refresh_catalog(&mut self) {
        if let Some(pending) = self.begin_catalog_refresh() {
            let completion = pending.run().await;
            self.finish_catalog_refresh(completion);
        }
    }

    // ── Attachments ─────────────────────────────────────────────────────

    /// Accept a file selection. Returns `None` unless the session is idle.
    pub fn begin_attachments(&mut self, files: Vec<SelectedFile>) -> Option<PendingIngest> {
        if self.disposed || !self.apply(SessionEvent::FilesSelected) {
            return None;
        }
        debug!(file_count = files.len(), "Attachment batch selected");
        Some(PendingIngest {
            ticket: self.ticket(),
            files,
            snapshot: self.pending.clone(),
        })
    }

    pub fn finish_attachments(&mut self, completion: IngestCompletion) -> bool {
        if !self.is_current(completion.ticket) || !self.apply(SessionEvent::DecodeSettled) {
            return false;
        }
        let summary = completion.outcome.error_summary();
        let added = completion.outcome.added;

        debug!(
            added = added.len(),
            has_errors = summary.is_some(),
            "Attachment batch settled"
        );
        self.pending.extend(added);
        self.attachment_error = summary;
        true
    }

    /// Select, validate and decode a batch of files
    pub async fn add_attachments(&mut self, files: Vec<SelectedFile>) -> bool {
        match self.begin_attachments(files) {
            Some(pending) => {
                let completion = pending.run().await;
                self.finish_attachments(completion)
            }
            None => false,
        }
    }

    /// Drop a pending attachment before sending. Clears the error banner.
    pub fn remove_attachment(&mut self, index: usize) -> Option<PendingAttachment> {
        if index >= self.pending.len() {
            return None;
        }
        self.attachment_error = None;
        Some(self.pending.remove(index))
    }

    pub fn dismiss_attachment_error(&mut self) {
        self.attachment_error = None;
    }

    // ── Sending ─────────────────────────────────────────────────────────

    /// Commit the current input as a user message and prepare the request.
    ///
    /// Returns `None` when sending is not possible (not idle, nothing to send,
    /// disposed) or when the request could not be serialized; in the latter
    /// case the failure has already been logged as an assistant error entry.
    pub fn begin_send(&mut self) -> Option<PendingSend> {
        if self.disposed {
            return None;
        }
        if self.state.on(SessionEvent::SendRequested).is_none() {
            debug!(state = ?self.state, "Send ignored while busy");
            return None;
        }

        let outgoing = OutgoingMessage {
            text: self.input.trim().to_string(),
            attachments: self.pending.clone(),
        };
        if outgoing.is_empty() {
            debug!("Nothing to send");
            return None;
        }

        let model = self.active_model().clone();
        let composed = compose(
            &self.messages,
            &outgoing,
            &self.settings,
            &model,
            self.previous_response_id.as_deref(),
        );

        self.apply(SessionEvent::SendRequested);
        let metas = outgoing.attachments.iter().map(PendingAttachment::to_meta).collect();
        self.messages.push(Message::user(outgoing.text, metas));
        self.input.clear();
        self.pending.clear();

        debug!(
            model = %model.id,
            attachment_count = self.messages.last().map(|m| m.attachments.len()).unwrap_or(0),
            "User message appended"
        );

        match composed {
            Ok(request) => Some(PendingSend {
                ticket: self.ticket(),
                chains: model.supports_previous_response,
                transport: self.transport.clone(),
                request,
            }),
            Err(e) => {
                error!(error = %e, "Failed to compose chat request");
                self.messages.push(Message::assistant_error(&e));
                self.apply(SessionEvent::ResponseSettled);
                None
            }
        }
    }

    /// Fold the outcome of a send into the log. Always returns to idle.
    pub fn complete_send(&mut self, completion: SendCompletion) -> bool {
        if !self.is_current(completion.ticket) || !self.apply(SessionEvent::ResponseSettled) {
            return false;
        }

        match completion.result {
            Ok(response) => {
                let metrics = response.metrics();
                debug!(
                    response_id = ?response.response_id,
                    input_tokens = ?metrics.input_tokens,
                    output_tokens = ?metrics.output_tokens,
                    "Assistant response received"
                );
                // Ids from models without chaining are not resumable tokens
                self.previous_response_id = response.response_id.filter(|_| completion.chains);
                self.messages.push(Message::assistant(response.message, Some(metrics)));
            }
            Err(e) => {
                error!(error = %e, "Chat request failed");
                self.messages.push(Message::assistant_error(&e));
            }
        }
        true
    }

    /// Send the current input and wait for the answer.
    /// Returns `false` when nothing was sent.
    pub async fn send_message(&mut self) -> bool {
        match self.begin_send() {
            Some(pending) => {
                let completion = pending.run().await;
                self.complete_send(completion)
            }
            None => false,
        }
    }

    // ── Teardown ────────────────────────────────────────────────────────

    /// Tear the session down. Outstanding completions become no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        info!(messages = self.messages.len(), "Disposing chat session");
        self.disposed = true;
        self.generation += 1;
        self.pending.clear();
        self.input.clear();
    }
}
