use crate::agent::prompt;
use crate::agent::{AnswerEvaluator, QuestionGenerator, StructuredModel};
use crate::error::{AppError, Result};
use crate::event::PullRequestContext;
use crate::platform::types::Comment;
use crate::platform::CommentStore;
use crate::protocol::codec;
use crate::protocol::phase::{resolve_phase, Phase};
use crate::workflow::types::GateOutcome;
use crate::workspace::DiffProvider;

#[derive(Debug, Clone)]
pub struct GateOptions {
    pub max_diff_bytes: usize,
    /// Resolve the phase and log the planned action without calling the
    /// model or writing comments.
    pub dry_run: bool,
}

/// One pass of the comment-driven state machine.
///
/// Every run re-reads the comment thread, acts on exactly one phase and writes
/// at most one comment, after all reads and model calls have succeeded.
///
/// Two overlapping runs that both see no questions comment will both post
/// one. Nothing here prevents that; the newest questions comment wins on
/// later runs.
pub struct Gate<'a> {
    store: &'a dyn CommentStore,
    diffs: &'a dyn DiffProvider,
    model: &'a dyn StructuredModel,
    options: GateOptions,
}

impl<'a> Gate<'a> {
    pub fn new(
        store: &'a dyn CommentStore,
        diffs: &'a dyn DiffProvider,
        model: &'a dyn StructuredModel,
        options: GateOptions,
    ) -> Self {
        Self {
            store,
            diffs,
            model,
            options,
        }
    }

    pub async fn run(&self, ctx: &PullRequestContext) -> Result<GateOutcome> {
        let comments = self
            .store
            .list_comments(&ctx.repo_full_name, ctx.pr_number)
            .await?;

        let resolution = resolve_phase(&comments);

        tracing::info!(
            repo = %ctx.repo_full_name,
            pr = ctx.pr_number,
            comments = comments.len(),
            phase = %resolution.phase,
            result_comment = ?resolution.result_comment_id,
            "Resolved phase"
        );

        match resolution.phase {
            Phase::NeedsQuestions => self.ask_questions(ctx).await,
            Phase::AwaitingAnswers { questions } => {
                tracing::info!(
                    questions_comment = questions.id,
                    "Waiting for the author to reply with /answers"
                );
                Ok(GateOutcome::AwaitingAnswers {
                    questions_comment_id: questions.id,
                })
            }
            Phase::ReadyToEvaluate { questions, answers } => {
                self.evaluate(ctx, questions, answers, resolution.result_comment_id)
                    .await
            }
        }
    }

    async fn ask_questions(&self, ctx: &PullRequestContext) -> Result<GateOutcome> {
        let diff = self.load_diff(ctx).await?;

        if self.options.dry_run {
            tracing::info!("Dry run: would generate and post questions");
            return Ok(GateOutcome::DryRun {
                phase: Phase::NeedsQuestions.name(),
            });
        }

        if diff.trim().is_empty() {
            tracing::warn!("Diff is empty, nothing to ask about");
            return Ok(GateOutcome::NothingToAsk);
        }

        let questions = QuestionGenerator::new(self.model).generate(&diff).await?;
        let body = codec::render_questions(&questions)?;

        let created = self
            .store
            .create_comment(&ctx.repo_full_name, ctx.pr_number, &body)
            .await?;

        tracing::info!(comment_id = created.id, "Posted questions");
        Ok(GateOutcome::QuestionsPosted {
            comment_id: created.id,
        })
    }

    async fn evaluate(
        &self,
        ctx: &PullRequestContext,
        questions_comment: &Comment,
        answers_comment: &Comment,
        result_comment_id: Option<u64>,
    ) -> Result<GateOutcome> {
        let questions = codec::parse_questions(&questions_comment.body)?;
        if questions.is_empty() {
            return Err(AppError::Protocol(format!(
                "Questions comment {} has an empty question list",
                questions_comment.id
            )));
        }

        let diff = self.load_diff(ctx).await?;

        if self.options.dry_run {
            tracing::info!(
                answers_comment = answers_comment.id,
                author = %answers_comment.author,
                update = ?result_comment_id,
                "Dry run: would evaluate answers"
            );
            let phase = Phase::ReadyToEvaluate {
                questions: questions_comment,
                answers: answers_comment,
            };
            return Ok(GateOutcome::DryRun {
                phase: phase.name(),
            });
        }

        let verdict = AnswerEvaluator::new(self.model)
            .evaluate(&diff, &questions, &answers_comment.body)
            .await?;

        tracing::info!(
            decision = %verdict.decision,
            answers_comment = answers_comment.id,
            author = %answers_comment.author,
            "Answers evaluated"
        );

        let body = codec::render_result(&verdict, answers_comment.id);

        let (comment_id, updated) = match result_comment_id {
            Some(id) => {
                self.store
                    .update_comment(&ctx.repo_full_name, id, &body)
                    .await?;
                (id, true)
            }
            None => {
                let created = self
                    .store
                    .create_comment(&ctx.repo_full_name, ctx.pr_number, &body)
                    .await?;
                (created.id, false)
            }
        };

        tracing::info!(comment_id, updated, "Wrote result comment");
        Ok(GateOutcome::Evaluated {
            verdict,
            comment_id,
            updated,
        })
    }

    async fn load_diff(&self, ctx: &PullRequestContext) -> Result<String> {
        let diff = self.diffs.diff(&ctx.base_sha, &ctx.head_sha).await?;
        tracing::info!(
            base = %ctx.base_sha,
            head = %ctx.head_sha,
            bytes = diff.len(),
            "Computed diff"
        );
        Ok(prompt::truncate_diff(&diff, self.options.max_diff_bytes).into_owned())
    }
}
