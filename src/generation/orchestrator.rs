use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::errors::PipelineError;

use super::db::{Artifact, DbHandle, StepUpdate};
use super::log::{GenerationLog, LogEntry, LogPhase};
use super::models::*;
use super::phase::PhaseRunner;

/// Slugs are cut to this many characters.
const SLUG_MAX_LEN: usize = 100;

pub const PROGRESS_RESEARCHED: u8 = 30;
pub const PROGRESS_DESIGNED: u8 = 50;
pub const PROGRESS_STORYBOARDED: u8 = 90;

/// Convert a topic to a URL-safe slug: lowercase ASCII letters and digits
/// joined by single dashes, at most `max_len` characters.
pub fn slugify(topic: &str, max_len: usize) -> String {
    let slug = topic
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.len() > max_len {
        // Only ASCII survives the map above, so any index is a char boundary.
        slug[..max_len].trim_end_matches('-').to_string()
    } else {
        slug
    }
}

/// Status transitions the orchestrator may perform.
///
/// `designing -> designing` is the progress bump after the design spec is
/// stored. `review -> complete` belongs to an external reviewer and is listed
/// so the table describes the whole lifecycle.
pub fn is_valid_transition(from: RunStatus, to: RunStatus) -> bool {
    use RunStatus::*;
    matches!(
        (from, to),
        (Pending, Researching)
            | (Researching, Designing)
            | (Designing, Designing)
            | (Designing, Review)
            | (Review, Complete)
    ) || (to == Failed && !from.is_terminal())
}

/// Returned by `start_run`. The run continues in `task` after this returns.
#[derive(Debug)]
pub struct StartedRun {
    pub course_id: String,
    pub status: RunStatus,
    pub task: JoinHandle<()>,
}

/// In-task view of where a run is. Every persisted status change goes
/// through `commit`, which enforces the transition table.
struct RunCursor {
    course_id: String,
    status: RunStatus,
    phase: GenerationPhase,
    progress: u8,
}

impl RunCursor {
    fn transition(
        &mut self,
        to: RunStatus,
        phase: GenerationPhase,
        progress: u8,
    ) -> Result<(), PipelineError> {
        if !is_valid_transition(self.status, to) {
            return Err(PipelineError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.phase = phase;
        self.progress = progress;
        Ok(())
    }

    /// Persist a step: artifact, new status and log entries in one write.
    async fn commit(
        &mut self,
        db: &DbHandle,
        to: RunStatus,
        phase: GenerationPhase,
        progress: u8,
        artifact: Option<Artifact>,
        entries: Vec<LogEntry>,
    ) -> Result<(), PipelineError> {
        if !is_valid_transition(self.status, to) {
            return Err(PipelineError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        let course_id = self.course_id.clone();
        let step = StepUpdate {
            artifact,
            status: to,
            phase,
            progress,
            entries,
        };
        let recorded = db.call(move |db| db.record_step(&course_id, &step)).await?;
        if !recorded {
            return Err(PipelineError::RunNotFound {
                course_id: self.course_id.clone(),
            });
        }
        self.transition(to, phase, progress)
    }
}

/// Drives course runs from request to storyboard.
#[derive(Clone)]
pub struct Orchestrator {
    db: DbHandle,
    runner: Arc<PhaseRunner>,
}

impl Orchestrator {
    pub fn new(db: DbHandle, runner: Arc<PhaseRunner>) -> Self {
        Self { db, runner }
    }

    pub fn db(&self) -> &DbHandle {
        &self.db
    }

    /// Record a new run and start its pipeline in the background.
    ///
    /// The request must already be validated. Returns as soon as the record
    /// exists; the caller polls `get_status` for progress.
    pub async fn start_run(&self, request: GenerationRequest) -> Result<StartedRun, PipelineError> {
        let course_id = uuid::Uuid::new_v4().to_string();
        let mut cursor = RunCursor {
            course_id: course_id.clone(),
            status: RunStatus::Pending,
            phase: GenerationPhase::Research,
            progress: 0,
        };
        cursor.transition(RunStatus::Researching, GenerationPhase::Research, 0)?;

        let now = chrono::Utc::now().to_rfc3339();
        let mut log = GenerationLog::new();
        log.push(LogEntry::new(LogPhase::Init, "Course generation started"));
        let run = CourseRun {
            course_id: course_id.clone(),
            slug: slugify(&request.topic, SLUG_MAX_LEN),
            title: request.topic.clone(),
            request: request.clone(),
            status: cursor.status,
            current_phase: cursor.phase,
            progress: cursor.progress,
            design_spec: None,
            storyboard: None,
            generation_log: log,
            created_at: now.clone(),
            updated_at: now,
        };
        self.db.call(move |db| db.create_run(&run)).await?;
        info!(course_id = %course_id, topic = %request.topic, "Course generation started");

        let status = cursor.status;
        let this = self.clone();
        let task = tokio::spawn(async move {
            this.run_pipeline(cursor, request).await;
        });

        Ok(StartedRun {
            course_id,
            status,
            task,
        })
    }

    pub async fn get_status(&self, course_id: &str) -> Result<Option<StatusView>, PipelineError> {
        let id = course_id.to_string();
        let run = self.db.call(move |db| db.read_run(&id)).await?;
        Ok(run.map(StatusView::from))
    }

    pub async fn get_design_spec(&self, course_id: &str) -> Result<Option<DesignSpec>, PipelineError> {
        let id = course_id.to_string();
        Ok(self.db.call(move |db| db.get_design_spec(&id)).await?)
    }

    pub async fn get_storyboard(&self, course_id: &str) -> Result<Option<Storyboard>, PipelineError> {
        let id = course_id.to_string();
        Ok(self.db.call(move |db| db.get_storyboard(&id)).await?)
    }

    /// Background body of a run. Every error ends here and is written as a
    /// `failed` status; nothing escapes the task unrecorded.
    async fn run_pipeline(&self, mut cursor: RunCursor, request: GenerationRequest) {
        match self.drive(&mut cursor, &request).await {
            Ok(()) => info!(course_id = %cursor.course_id, "Pipeline completed"),
            Err(e) => self.fail(&mut cursor, &e).await,
        }
    }

    async fn drive(
        &self,
        cursor: &mut RunCursor,
        request: &GenerationRequest,
    ) -> Result<(), PipelineError> {
        // Research
        info!(course_id = %cursor.course_id, "Starting research phase");
        let research = self.runner.research(request).await?;
        cursor
            .commit(
                &self.db,
                RunStatus::Designing,
                GenerationPhase::Design,
                PROGRESS_RESEARCHED,
                None,
                vec![
                    LogEntry::timed(LogPhase::Research, "Research completed", research.duration_ms),
                    LogEntry::new(
                        LogPhase::Research,
                        format!("Found {} main topics", research.artifact.main_topics.len()),
                    ),
                ],
            )
            .await?;

        // Design spec
        info!(course_id = %cursor.course_id, "Starting design phase");
        let design = self.runner.design(&research.artifact, request).await?;
        cursor
            .commit(
                &self.db,
                RunStatus::Designing,
                GenerationPhase::Storyboard,
                PROGRESS_DESIGNED,
                Some(Artifact::DesignSpec(design.artifact.clone())),
                vec![LogEntry::timed(
                    LogPhase::Design,
                    "Design spec generated",
                    design.duration_ms,
                )],
            )
            .await?;

        // Storyboard
        info!(course_id = %cursor.course_id, "Starting storyboard phase");
        let storyboard = self
            .runner
            .storyboard(&design.artifact, &research.artifact)
            .await?;

        let mut entries = vec![
            LogEntry::timed(LogPhase::Storyboard, "Storyboard generated", storyboard.duration_ms),
            LogEntry::new(
                LogPhase::Storyboard,
                format!("Created {} sections", storyboard.artifact.sections.len()),
            ),
            LogEntry::new(
                LogPhase::Storyboard,
                format!(
                    "Created {} quiz questions",
                    storyboard.artifact.final_quiz.questions.len()
                ),
            ),
        ];
        for warning in &storyboard.report.warnings {
            warn!(
                course_id = %cursor.course_id,
                objectives = ?warning.objective_ids,
                "{}",
                warning.message()
            );
            entries.push(LogEntry::new(LogPhase::Storyboard, warning.message()));
        }

        cursor
            .commit(
                &self.db,
                RunStatus::Review,
                GenerationPhase::Complete,
                PROGRESS_STORYBOARDED,
                Some(Artifact::Storyboard(storyboard.artifact)),
                entries,
            )
            .await
    }

    /// Record the terminal `failed` state. Phase and progress stay where the
    /// run stopped.
    async fn fail(&self, cursor: &mut RunCursor, err: &PipelineError) {
        error!(
            course_id = %cursor.course_id,
            phase = %cursor.phase,
            error = %err,
            "Pipeline failed"
        );
        let (phase, progress) = (cursor.phase, cursor.progress);
        let entry = LogEntry::new(LogPhase::Error, format!("Pipeline failed: {}", err));
        if let Err(write_err) = cursor
            .commit(&self.db, RunStatus::Failed, phase, progress, None, vec![entry])
            .await
        {
            error!(
                course_id = %cursor.course_id,
                error = %write_err,
                "Failed to record pipeline failure"
            );
        }
    }
}
