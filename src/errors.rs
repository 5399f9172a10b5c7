//! Typed error hierarchy for the course generator.
//!
//! Four enums cover the layers of a generation run:
//! - `GeneratorError`: failures talking to the structured-content generator
//! - `ValidationError`: structural violations in a generated artifact
//! - `PhaseError`: either of the above, tagged with the phase that raised it
//! - `PipelineError`: everything the orchestrator can see, including store failures

use std::time::Duration;

use thiserror::Error;

use crate::generation::models::{GenerationPhase, RunStatus};

/// Errors from the content generator adapter.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Generator misconfigured: {0}")]
    Misconfiguration(String),

    #[error("Generator request failed: {0}")]
    Transport(String),

    #[error("Generator request timed out after {}s", .duration.as_secs())]
    Timeout { duration: Duration },

    #[error("Generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No text response from generator")]
    EmptyResponse,

    #[error("Failed to parse JSON response ({message}): {snippet}...")]
    Parse { message: String, snippet: String },
}

/// Structural violations found by the validation engine.
///
/// Coverage gaps are not errors. They travel as `CoverageWarning`s inside a
/// `ValidationReport`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Research result missing topic")]
    MissingResearchTopic,

    #[error("Research result has no main topics")]
    NoMainTopics,

    #[error("Topic {index} missing title")]
    TopicMissingTitle { index: usize },

    #[error("Topic {index} (\"{title}\") has no key points")]
    TopicMissingKeyPoints { index: usize, title: String },

    #[error("Design spec missing title")]
    MissingDesignTitle,

    #[error("Design spec has no topics")]
    NoDesignTopics,

    #[error("Design spec has no learning objectives")]
    NoObjectives,

    #[error("Duplicate objective ID: {id}")]
    DuplicateObjectiveId { id: String },

    #[error("Storyboard has no sections")]
    NoSections,

    #[error("Storyboard final quiz has fewer than 5 questions (found {found})")]
    TooFewQuizQuestions { found: usize },

    #[error("Duplicate section ID: {id}")]
    DuplicateSectionId { id: String },
}

/// Failure of a single phase. The inner message is kept verbatim.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("{} failed: {source}", .phase.label())]
    Generator {
        phase: GenerationPhase,
        #[source]
        source: GeneratorError,
    },

    #[error("{} failed: {source}", .phase.label())]
    Validation {
        phase: GenerationPhase,
        #[source]
        source: ValidationError,
    },
}

impl PhaseError {
    pub fn phase(&self) -> GenerationPhase {
        match self {
            PhaseError::Generator { phase, .. } | PhaseError::Validation { phase, .. } => *phase,
        }
    }
}

/// Errors from the pipeline orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },

    #[error("Course run {course_id} not found")]
    RunNotFound { course_id: String },

    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_error_prefixes_phase_and_keeps_inner_message() {
        let err = PhaseError::Validation {
            phase: GenerationPhase::Design,
            source: ValidationError::DuplicateObjectiveId {
                id: "obj-1".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Design spec generation failed: Duplicate objective ID: obj-1"
        );
        assert_eq!(err.phase(), GenerationPhase::Design);
    }

    #[test]
    fn generator_error_status_is_matchable() {
        let err = GeneratorError::Status {
            status: 529,
            body: "overloaded".to_string(),
        };
        match &err {
            GeneratorError::Status { status, .. } => assert_eq!(*status, 529),
            _ => panic!("Expected Status variant"),
        }
        assert!(err.to_string().contains("529"));
    }

    #[test]
    fn too_few_questions_message_mentions_threshold() {
        let err = ValidationError::TooFewQuizQuestions { found: 4 };
        assert!(err.to_string().contains("fewer than 5 questions"));
        assert!(err.to_string().contains("found 4"));
    }

    #[test]
    fn pipeline_error_wraps_phase_transparently() {
        let err: PipelineError = PhaseError::Generator {
            phase: GenerationPhase::Research,
            source: GeneratorError::EmptyResponse,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Research failed: No text response from generator"
        );
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = PipelineError::InvalidTransition {
            from: RunStatus::Failed,
            to: RunStatus::Designing,
        };
        assert_eq!(err.to_string(), "Invalid status transition failed -> designing");
    }
}
