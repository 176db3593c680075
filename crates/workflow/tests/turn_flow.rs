//! End-to-end turn execution against in-memory collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use bizcanvas_checkpoint::InMemoryCheckpointStore;
use bizcanvas_core::attachment::{Attachment, AttachmentKind};
use bizcanvas_core::checkpoint::{Checkpoint, CheckpointStore};
use bizcanvas_core::error::{LookupError, ProviderError};
use bizcanvas_core::expert::{ExpertCatalog, ExpertProfile};
use bizcanvas_core::message::{Message, Role, ThreadId};
use bizcanvas_core::principal::{Principal, PrincipalLookup};
use bizcanvas_core::provider::{Provider, ProviderRequest, ProviderResponse};
use bizcanvas_profiles::InMemoryProfileStore;
use bizcanvas_security::audit::AuditLog;
use bizcanvas_telemetry::InMemoryTraceSink;
use bizcanvas_workflow::{ConversationWorkflow, TurnError, TurnRequest, WorkflowOptions};

/// Records every request and replies from a script (or a fixed fallback).
struct RecordingProvider {
    requests: Mutex<Vec<ProviderRequest>>,
    replies: Mutex<Vec<Result<String, ProviderError>>>,
}

impl RecordingProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
        })
    }

    fn script(self: &Arc<Self>, replies: Vec<Result<String, ProviderError>>) {
        *self.replies.lock().unwrap() = replies;
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let scripted = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok("scripted reply".to_string())
            } else {
                replies.remove(0)
            }
        };
        scripted.map(|content| ProviderResponse {
            message: Message::assistant(content),
            usage: None,
            model: "mock-model".into(),
        })
    }
}

/// Counts lookup calls so tests can assert the gate was (not) consulted.
struct CountingLookup {
    inner: Arc<InMemoryProfileStore>,
    calls: AtomicUsize,
}

impl CountingLookup {
    async fn seeded() -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(InMemoryProfileStore::seeded().await),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrincipalLookup for CountingLookup {
    fn name(&self) -> &str {
        "counting"
    }

    async fn lookup(&self, token: &str) -> Result<Option<Principal>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(token).await
    }
}

struct Harness {
    workflow: ConversationWorkflow,
    provider: Arc<RecordingProvider>,
    lookup: Arc<CountingLookup>,
    checkpoint: Arc<InMemoryCheckpointStore>,
    audit: Arc<AuditLog>,
    trace: Arc<InMemoryTraceSink>,
}

async fn harness() -> Harness {
    let provider = RecordingProvider::new();
    let lookup = CountingLookup::seeded().await;
    let checkpoint = Arc::new(InMemoryCheckpointStore::new());
    let audit = Arc::new(AuditLog::new());
    let trace = Arc::new(InMemoryTraceSink::new());

    let workflow = ConversationWorkflow::new(
        provider.clone(),
        lookup.clone(),
        checkpoint.clone(),
        audit.clone(),
        trace.clone(),
        WorkflowOptions::default(),
    );

    Harness {
        workflow,
        provider,
        lookup,
        checkpoint,
        audit,
        trace,
    }
}

fn expert(id: &str) -> ExpertProfile {
    ExpertCatalog::builtin().get(id).unwrap().clone()
}

fn small_png() -> Attachment {
    Attachment::new(AttachmentKind::Png, vec![0x89, 0x50, 0x4E, 0x47]).with_name("menu.png")
}

#[tokio::test]
async fn plain_turn_skips_gate_and_appends_reply() {
    let h = harness().await;

    let (reply, state) = h
        .workflow
        .run_turn(TurnRequest::new(expert("customer_segments"), "Hello"))
        .await
        .unwrap();

    assert_eq!(reply, "scripted reply");
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0].role, Role::User);
    assert_eq!(state.messages[1].role, Role::Assistant);
    assert!(state.summary.is_empty());
    assert!(state.attachment_validated);
    assert!(state.ingest_error.is_none());

    // No attachment → the security gate never consulted the lookup
    assert_eq!(h.lookup.calls(), 0);
    assert!(h.audit.is_empty());
}

#[tokio::test]
async fn thread_continuity_across_turns() {
    let h = harness().await;
    let mut request = TurnRequest::new(expert("channels"), "first question");
    request.token = Some("TechFix Solutions".into());

    h.workflow.run_turn(request.clone()).await.unwrap();

    request.message = "second question".into();
    let (_, state) = h.workflow.run_turn(request).await.unwrap();

    assert_eq!(state.messages.len(), 4);
    assert_eq!(state.messages[0].content, "first question");
    assert_eq!(state.messages[2].content, "second question");
}

#[tokio::test]
async fn new_thread_disconnects_history() {
    let h = harness().await;
    let mut request = TurnRequest::new(expert("channels"), "first");
    request.token = Some("TechFix Solutions".into());
    h.workflow.run_turn(request.clone()).await.unwrap();

    request.message = "fresh start".into();
    request.new_thread = true;
    let (_, state) = h.workflow.run_turn(request).await.unwrap();

    assert_eq!(state.messages.len(), 2);
    assert!(state.thread_id.as_str().starts_with("channels:TechFix Solutions:"));
}

#[tokio::test]
async fn valid_attachment_audited_once_with_size_and_kind() {
    let h = harness().await;
    let attachment = small_png();
    let size = attachment.size();

    let mut request = TurnRequest::new(expert("value_propositions"), "look at my menu");
    request.token = Some("Bloom & Co Florist".into());
    request.attachment = Some(attachment);

    let (_, state) = h.workflow.run_turn(request).await.unwrap();

    assert!(state.attachment_validated);
    assert!(state.ingest_error.is_none());

    let records = h.audit.records_for_token("Bloom & Co Florist");
    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert_eq!(records[0].file_size, size);
    assert_eq!(records[0].file_kind, "image");
    assert_eq!(records[0].file_name.as_deref(), Some("menu.png"));

    // The provider received the attachment alongside the text
    let generation = &h.provider.requests()[0];
    assert!(generation.attachment.is_some());
}

#[tokio::test]
async fn unknown_token_degrades_turn_without_audit() {
    let h = harness().await;
    let mut request = TurnRequest::new(expert("value_propositions"), "here's my deck");
    request.token = Some("no such business".into());
    request.attachment = Some(small_png());

    let (reply, state) = h.workflow.run_turn(request).await.unwrap();

    // The turn completes degraded rather than aborting
    assert_eq!(reply, "scripted reply");
    assert!(state.attachment_validated);
    assert!(state.ingest_error.as_deref().unwrap().contains("not recognized"));
    assert!(state.attachment.is_none());

    // Invalid token resolved no context, so no audit record
    assert!(h.audit.is_empty());
    // But the lookup was consulted exactly once
    assert_eq!(h.lookup.calls(), 1);

    // Generation ran without the attachment
    assert!(h.provider.requests()[0].attachment.is_none());
}

#[tokio::test]
async fn missing_token_with_attachment_degrades_without_lookup() {
    let h = harness().await;
    let mut request = TurnRequest::new(expert("value_propositions"), "here's my deck");
    request.attachment = Some(small_png());

    let (_, state) = h.workflow.run_turn(request).await.unwrap();

    assert!(state.ingest_error.as_deref().unwrap().contains("no access token"));
    assert_eq!(h.lookup.calls(), 0);
}

#[tokio::test]
async fn oversized_attachment_rejected_before_generation_sees_it() {
    let h = harness().await;
    let oversize = WorkflowOptions::default().max_attachment_bytes + 1;

    let mut request = TurnRequest::new(expert("key_resources"), "full business plan attached");
    request.token = Some("Craftworks Furniture".into());
    request.attachment = Some(
        Attachment::new(AttachmentKind::Pdf, vec![0u8; oversize]).with_name("plan.pdf"),
    );

    let (_, state) = h.workflow.run_turn(request).await.unwrap();

    assert!(state.ingest_error.as_deref().unwrap().contains("exceeds"));

    // Audit FAILURE attributed to the authenticated principal
    let records = h.audit.records_for_token("Craftworks Furniture");
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
    assert_eq!(records[0].file_size, oversize);

    // No generation call ever carried the payload
    assert!(h.provider.requests().iter().all(|r| r.attachment.is_none()));
}

#[tokio::test]
async fn long_history_triggers_compaction() {
    let h = harness().await;
    h.provider.script(vec![
        Ok("the reply".into()),
        Ok("a compact summary of the consultation".into()),
    ]);

    // Pre-seed 14 accumulated messages; the inbound turn makes 15
    let thread_id = ThreadId::derive("revenue_streams", None, false);
    let prior: Vec<Message> = (0..14)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("question {i}"))
            } else {
                Message::assistant(format!("answer {i}"))
            }
        })
        .collect();
    h.checkpoint
        .save(&thread_id, Checkpoint::new(prior, String::new()))
        .await
        .unwrap();

    let (reply, state) = h
        .workflow
        .run_turn(TurnRequest::new(expert("revenue_streams"), "question 14"))
        .await
        .unwrap();

    assert_eq!(reply, "the reply");
    assert_eq!(state.summary, "a compact summary of the consultation");
    assert!(state.messages.len() <= 5);

    // The most recent messages survive the prune
    assert_eq!(state.messages.last().unwrap().content, "the reply");

    // Fresh summary: the summarization request used the create prompt
    let requests = h.provider.requests();
    assert_eq!(requests.len(), 2);
    let summarize_prompt = &requests[1].messages.last().unwrap().content;
    assert!(summarize_prompt.starts_with("Create a summary"));
}

#[tokio::test]
async fn second_compaction_extends_rather_than_rederives() {
    let h = harness().await;
    h.provider.script(vec![
        Ok("reply one".into()),
        Ok("first summary".into()),
        Ok("reply two".into()),
        Ok("extended summary".into()),
    ]);

    let thread_id = ThreadId::derive("revenue_streams", None, false);
    let prior: Vec<Message> = (0..14).map(|i| Message::user(format!("m{i}"))).collect();
    h.checkpoint
        .save(&thread_id, Checkpoint::new(prior, String::new()))
        .await
        .unwrap();

    // First compaction produces a fresh summary
    let (_, state) = h
        .workflow
        .run_turn(TurnRequest::new(expert("revenue_streams"), "m14"))
        .await
        .unwrap();
    assert_eq!(state.summary, "first summary");

    // Grow the history past the trigger again
    let grown: Vec<Message> = (0..14).map(|i| Message::user(format!("n{i}"))).collect();
    h.checkpoint
        .save(&thread_id, Checkpoint::new(grown, state.summary.clone()))
        .await
        .unwrap();

    let (_, state) = h
        .workflow
        .run_turn(TurnRequest::new(expert("revenue_streams"), "n14"))
        .await
        .unwrap();
    assert_eq!(state.summary, "extended summary");

    // The second summarization conditioned on the prior summary
    let requests = h.provider.requests();
    let extend_prompt = &requests[3].messages.last().unwrap().content;
    assert!(extend_prompt.contains("first summary"));
    assert!(extend_prompt.contains("Extend the summary"));
}

#[tokio::test]
async fn generation_failure_aborts_turn_without_partial_commit() {
    let h = harness().await;
    h.provider
        .script(vec![Err(ProviderError::Network("connection reset".into()))]);

    let result = h
        .workflow
        .run_turn(TurnRequest::new(expert("cost_structure"), "hello"))
        .await;

    assert!(matches!(result, Err(TurnError::Generation(_))));

    // No assistant message was committed for the thread
    let thread_id = ThreadId::derive("cost_structure", None, false);
    let checkpoint = h.checkpoint.load(&thread_id).await.unwrap().unwrap();
    assert!(checkpoint
        .messages
        .iter()
        .all(|m| m.role != Role::Assistant));
}

#[tokio::test]
async fn streaming_turn_emits_fragments_and_skips_summarization() {
    let h = harness().await;

    // Long history that would trigger compaction in synchronous mode
    let thread_id = ThreadId::derive("key_activities", None, false);
    let prior: Vec<Message> = (0..14).map(|i| Message::user(format!("m{i}"))).collect();
    h.checkpoint
        .save(&thread_id, Checkpoint::new(prior, String::new()))
        .await
        .unwrap();

    let mut rx = h
        .workflow
        .run_turn_stream(TurnRequest::new(expert("key_activities"), "m14"))
        .await
        .unwrap();

    let mut reply = String::new();
    while let Some(fragment) = rx.recv().await {
        reply.push_str(&fragment.unwrap());
    }
    assert_eq!(reply, "scripted reply");

    // The full assistant message was checkpointed, with no compaction
    let checkpoint = h.checkpoint.load(&thread_id).await.unwrap().unwrap();
    assert_eq!(checkpoint.messages.len(), 16);
    assert_eq!(
        checkpoint.messages.last().unwrap().content,
        "scripted reply"
    );
    assert!(checkpoint.summary.is_empty());

    // Exactly one generation call, no summarization call
    assert_eq!(h.provider.requests().len(), 1);
}

#[tokio::test]
async fn trace_events_cover_nodes_and_turn() {
    let h = harness().await;

    h.workflow
        .run_turn(TurnRequest::new(expert("key_partnerships"), "hello"))
        .await
        .unwrap();

    assert_eq!(h.trace.events_named("node.ingest").len(), 1);
    assert_eq!(h.trace.events_named("node.generate").len(), 1);
    assert_eq!(h.trace.events_named("turn").len(), 1);
    assert!(h.trace.events().iter().all(|e| !e.is_error()));
}

#[tokio::test]
async fn concurrent_turns_on_same_thread_serialize() {
    let h = harness().await;
    let workflow = Arc::new(h.workflow);

    let mut handles = Vec::new();
    for i in 0..4 {
        let workflow = workflow.clone();
        handles.push(tokio::spawn(async move {
            workflow
                .run_turn(TurnRequest::new(
                    expert("customer_relationships"),
                    format!("double submit {i}"),
                ))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Every turn's user+assistant pair survived — no lost updates
    let thread_id = ThreadId::derive("customer_relationships", None, false);
    let checkpoint = h.checkpoint.load(&thread_id).await.unwrap().unwrap();
    assert_eq!(checkpoint.messages.len(), 8);
}
