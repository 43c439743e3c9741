use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;

use pr_guard::agent::{Completion, ResponseSchema, StructuredModel};
use pr_guard::error::{AppError, Result};
use pr_guard::event::PullRequestContext;
use pr_guard::platform::types::Comment;
use pr_guard::platform::CommentStore;
use pr_guard::protocol::codec;
use pr_guard::protocol::{Decision, QUESTIONS_MARKER, RESULT_MARKER};
use pr_guard::workflow::{Gate, GateOptions, GateOutcome};
use pr_guard::workspace::DiffProvider;

const REPO: &str = "octo/widgets";
const PR: u64 = 7;

#[derive(Default)]
struct MemoryStore {
    comments: Mutex<Vec<Comment>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl MemoryStore {
    fn with(bodies: &[&str]) -> Self {
        let store = Self::default();
        for body in bodies {
            store.push("someone", body);
        }
        store
    }

    fn push(&self, author: &str, body: &str) -> Comment {
        let mut comments = self.comments.lock().unwrap();
        let id = 100 + comments.len() as u64;
        let comment = Comment {
            id,
            author: author.to_string(),
            body: body.to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000 + id as i64, 0).unwrap(),
        };
        comments.push(comment.clone());
        comment
    }

    fn snapshot(&self) -> Vec<Comment> {
        self.comments.lock().unwrap().clone()
    }

    fn writes(&self) -> usize {
        self.creates.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn list_comments(&self, repo_full_name: &str, pr_number: u64) -> Result<Vec<Comment>> {
        assert_eq!((repo_full_name, pr_number), (REPO, PR));
        Ok(self.snapshot())
    }

    async fn create_comment(&self, _repo: &str, _pr: u64, body: &str) -> Result<Comment> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(self.push("pr-guard[bot]", body))
    }

    async fn update_comment(&self, _repo: &str, comment_id: u64, body: &str) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut comments = self.comments.lock().unwrap();
        let comment = comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| AppError::GitHubApi(format!("404 comment {comment_id}")))?;
        comment.body = body.to_string();
        Ok(())
    }
}

struct FixedDiff {
    diff: String,
    calls: AtomicUsize,
}

impl FixedDiff {
    fn new(diff: &str) -> Self {
        Self {
            diff: diff.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DiffProvider for FixedDiff {
    async fn diff(&self, base: &str, head: &str) -> Result<String> {
        assert_eq!((base, head), ("base123", "head456"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.diff.clone())
    }
}

#[derive(Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<Completion>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn replying(replies: Vec<Completion>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructuredModel for ScriptedModel {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _schema: &ResponseSchema,
    ) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::ModelApi("unexpected model call".to_string()))
    }
}

fn ctx() -> PullRequestContext {
    PullRequestContext {
        repo_full_name: REPO.to_string(),
        pr_number: PR,
        base_sha: "base123".to_string(),
        head_sha: "head456".to_string(),
    }
}

fn options() -> GateOptions {
    GateOptions {
        max_diff_bytes: 10_000,
        dry_run: false,
    }
}

const DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n+fn retry() {}\n";

fn three_questions() -> Completion {
    Completion::Structured(json!({
        "questions": [
            "Why retry three times rather than once?",
            "What happens if every attempt times out?",
            "How did you test the retry path?"
        ]
    }))
}

fn verdict(decision: &str, reason: &str) -> Completion {
    Completion::Structured(json!({ "decision": decision, "reason": reason }))
}

fn questions_body() -> String {
    codec::render_questions(&[
        "Why retry?".to_string(),
        "What fails?".to_string(),
        "How tested?".to_string(),
    ])
    .unwrap()
}

#[tokio::test]
async fn scenario_a_no_comments_posts_questions() {
    let store = MemoryStore::default();
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::replying(vec![three_questions()]);

    let outcome = Gate::new(&store, &diffs, &model, options())
        .run(&ctx())
        .await
        .unwrap();

    let comments = store.snapshot();
    assert_eq!(comments.len(), 1);
    assert_eq!(outcome, GateOutcome::QuestionsPosted { comment_id: comments[0].id });
    assert!(comments[0].body.contains(QUESTIONS_MARKER));
    assert_eq!(codec::parse_questions(&comments[0].body).unwrap().len(), 3);
    assert_ne!(outcome.exit_code(), 0);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn scenario_b_questions_without_answers_blocks_quietly() {
    let body = questions_body();
    let store = MemoryStore::with(&[body.as_str(), "looks good to me"]);
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::default();

    let outcome = Gate::new(&store, &diffs, &model, options())
        .run(&ctx())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        GateOutcome::AwaitingAnswers {
            questions_comment_id: 100
        }
    );
    assert_ne!(outcome.exit_code(), 0);
    assert_eq!(model.calls(), 0);
    assert_eq!(store.writes(), 0);
    assert_eq!(diffs.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scenario_c_answers_pass_creates_result() {
    let body = questions_body();
    let store = MemoryStore::with(&[body.as_str(), "/answers 1. flaky network 2. we give up 3. unit test"]);
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::replying(vec![verdict("PASS", "Concrete and consistent.")]);

    let outcome = Gate::new(&store, &diffs, &model, options())
        .run(&ctx())
        .await
        .unwrap();

    assert!(outcome.passed());
    assert_eq!(outcome.exit_code(), 0);
    match &outcome {
        GateOutcome::Evaluated {
            verdict,
            comment_id,
            updated,
        } => {
            assert_eq!(verdict.decision, Decision::Pass);
            assert_eq!(*comment_id, 102);
            assert!(!updated);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let comments = store.snapshot();
    assert_eq!(comments.len(), 3);
    assert!(comments[2].body.contains(RESULT_MARKER));
    assert!(comments[2].body.contains("Concrete and consistent."));
}

#[tokio::test]
async fn scenario_d_existing_result_is_updated_in_place() {
    let body = questions_body();
    let store = MemoryStore::with(&[
        body.as_str(),
        "/answers first attempt",
        "### ❌ pr-guard: FAIL\n<!-- pr-guard:result -->",
        "/answers second, better attempt",
    ]);
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::replying(vec![verdict("PASS", "Better.")]);

    let outcome = Gate::new(&store, &diffs, &model, options())
        .run(&ctx())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        GateOutcome::Evaluated {
            verdict: pr_guard::protocol::Verdict {
                decision: Decision::Pass,
                reason: "Better.".to_string(),
            },
            comment_id: 102,
            updated: true,
        }
    );
    let comments = store.snapshot();
    assert_eq!(comments.len(), 4);
    assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    assert!(comments[2].body.contains("PASS"));
    assert!(comments[2].body.contains("comment 103"));
}

#[tokio::test]
async fn evaluating_twice_keeps_a_single_result_comment() {
    let body = questions_body();
    let store = MemoryStore::with(&[body.as_str(), "/answers because"]);
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::replying(vec![
        verdict("FAIL", "Too vague."),
        verdict("FAIL", "Too vague."),
    ]);
    let gate = Gate::new(&store, &diffs, &model, options());

    let first = gate.run(&ctx()).await.unwrap();
    let second = gate.run(&ctx()).await.unwrap();

    let id_of = |outcome: &GateOutcome| match outcome {
        GateOutcome::Evaluated { comment_id, .. } => *comment_id,
        other => panic!("unexpected outcome {other:?}"),
    };
    assert_eq!(id_of(&first), id_of(&second));
    assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    assert_eq!(store.updates.load(Ordering::SeqCst), 1);
    assert_eq!(store.snapshot().len(), 3);
    assert_ne!(second.exit_code(), 0);
}

#[tokio::test]
async fn full_lifecycle_from_empty_thread_to_pass() {
    let store = MemoryStore::default();
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::replying(vec![three_questions(), verdict("PASS", "Good.")]);
    let gate = Gate::new(&store, &diffs, &model, options());

    assert!(matches!(
        gate.run(&ctx()).await.unwrap(),
        GateOutcome::QuestionsPosted { .. }
    ));
    // re-run before answering: no new questions
    assert!(matches!(
        gate.run(&ctx()).await.unwrap(),
        GateOutcome::AwaitingAnswers { .. }
    ));
    store.push("author", "/answers\n1. ...\n2. ...\n3. ...");
    let outcome = gate.run(&ctx()).await.unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(model.calls(), 2);
    assert_eq!(store.creates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn malformed_questions_payload_is_protocol_error() {
    let store = MemoryStore::with(&[
        "<!-- pr-guard:questions\n{\"questions\": [oops]}\n-->",
        "/answers here",
    ]);
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::default();

    let err = Gate::new(&store, &diffs, &model, options())
        .run(&ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Protocol(_)));
    assert_eq!(model.calls(), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn refusal_leaves_thread_untouched() {
    let store = MemoryStore::default();
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::replying(vec![Completion::Refused("no".to_string())]);

    let err = Gate::new(&store, &diffs, &model, options())
        .run(&ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ModelRefusal(_)));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn empty_diff_asks_nothing() {
    let store = MemoryStore::default();
    let diffs = FixedDiff::new("  \n");
    let model = ScriptedModel::default();

    let outcome = Gate::new(&store, &diffs, &model, options())
        .run(&ctx())
        .await
        .unwrap();

    assert_eq!(outcome, GateOutcome::NothingToAsk);
    assert_ne!(outcome.exit_code(), 0);
    assert_eq!(model.calls(), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn dry_run_never_calls_model_or_writes() {
    let body = questions_body();
    let store = MemoryStore::with(&[body.as_str(), "/answers yes"]);
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::default();
    let gate = Gate::new(
        &store,
        &diffs,
        &model,
        GateOptions {
            dry_run: true,
            ..options()
        },
    );

    let outcome = gate.run(&ctx()).await.unwrap();

    assert_eq!(
        outcome,
        GateOutcome::DryRun {
            phase: "READY_TO_EVALUATE"
        }
    );
    assert_ne!(outcome.exit_code(), 0);
    assert_eq!(diffs.calls.load(Ordering::SeqCst), 1);
    assert_eq!(model.calls(), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn dry_run_checks_diff_before_asking() {
    let store = MemoryStore::default();
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::default();
    let gate = Gate::new(
        &store,
        &diffs,
        &model,
        GateOptions {
            dry_run: true,
            ..options()
        },
    );

    let outcome = gate.run(&ctx()).await.unwrap();

    assert_eq!(
        outcome,
        GateOutcome::DryRun {
            phase: "NEEDS_QUESTIONS"
        }
    );
    assert_eq!(diffs.calls.load(Ordering::SeqCst), 1);
    assert_eq!(model.calls(), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn questions_naming_the_result_marker_are_never_overwritten() {
    let store = MemoryStore::default();
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::replying(vec![
        Completion::Structured(json!({
            "questions": [
                "Why rename RESULT_MARKER to `pr-guard:result`?",
                "What happens to old threads that still carry <!-- pr-guard:result -->?",
                "How did you test the rename?"
            ]
        })),
        verdict("FAIL", "Does not explain old threads."),
        verdict("PASS", "Covers old threads now."),
    ]);
    let gate = Gate::new(&store, &diffs, &model, options());

    gate.run(&ctx()).await.unwrap();
    let questions_before = store.snapshot()[0].body.clone();
    store.push("author", "/answers 1. clearer name 2. ignored 3. unit tests");

    let first = gate.run(&ctx()).await.unwrap();
    assert!(matches!(first, GateOutcome::Evaluated { comment_id: 102, updated: false, .. }));

    store.push("author", "/answers 1. clearer name 2. migrated by the new marker 3. unit tests");
    let second = gate.run(&ctx()).await.unwrap();
    assert!(matches!(second, GateOutcome::Evaluated { comment_id: 102, updated: true, .. }));
    assert_eq!(second.exit_code(), 0);

    let comments = store.snapshot();
    assert_eq!(comments[0].body, questions_before);
    assert_eq!(codec::parse_questions(&comments[0].body).unwrap().len(), 3);
    // one questions generation, two evaluations
    assert_eq!(model.calls(), 3);
    assert_eq!(store.creates.load(Ordering::SeqCst), 2);
    assert_eq!(store.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn answers_mentioning_the_questions_marker_are_evaluated() {
    let body = questions_body();
    let store = MemoryStore::with(&[
        body.as_str(),
        "/answers I changed the pr-guard:questions constant and quoted <!-- pr-guard:questions --> in the docs",
    ]);
    let diffs = FixedDiff::new(DIFF);
    let model = ScriptedModel::replying(vec![verdict("PASS", "Fine.")]);

    let outcome = Gate::new(&store, &diffs, &model, options())
        .run(&ctx())
        .await
        .unwrap();

    assert!(outcome.passed());
    assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    assert_eq!(store.updates.load(Ordering::SeqCst), 0);
}
