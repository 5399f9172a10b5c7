//! Phase runner: prompt, generate, validate.
//!
//! One method per phase. Each builds the phase prompt, calls the content
//! generator with the phase's tuning and system prompt, then runs the
//! validation engine over the parsed artifact. Errors are tagged with the
//! phase and returned as-is; nothing here retries.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::errors::{GeneratorError, PhaseError, ValidationError};

use super::generator::{ContentGenerator, GenerateOptions, generate_structured};
use super::models::{DesignSpec, GenerationPhase, GenerationRequest, ResearchResult, Storyboard};
use super::prompts::{self, SystemPrompts};
use super::validate::{self, ValidationReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Research,
    Design,
    Storyboard,
}

/// Generator tuning for one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseTuning {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl PhaseKind {
    pub fn tuning(&self) -> PhaseTuning {
        match self {
            // Low temperature for factual research.
            Self::Research => PhaseTuning {
                max_tokens: 8192,
                temperature: 0.3,
            },
            Self::Design => PhaseTuning {
                max_tokens: 8192,
                temperature: 0.5,
            },
            // Storyboards are the largest artifact.
            Self::Storyboard => PhaseTuning {
                max_tokens: 16384,
                temperature: 0.6,
            },
        }
    }

    pub fn phase(&self) -> GenerationPhase {
        match self {
            Self::Research => GenerationPhase::Research,
            Self::Design => GenerationPhase::Design,
            Self::Storyboard => GenerationPhase::Storyboard,
        }
    }
}

/// A validated artifact plus how long the phase took.
#[derive(Debug, Clone)]
pub struct PhaseOutput<T> {
    pub artifact: T,
    pub duration_ms: u64,
    /// Advisory findings. Only the storyboard phase produces any.
    pub report: ValidationReport,
}

pub struct PhaseRunner {
    generator: Arc<dyn ContentGenerator>,
    prompts: SystemPrompts,
}

impl PhaseRunner {
    pub fn new(generator: Arc<dyn ContentGenerator>, prompts: SystemPrompts) -> Self {
        Self { generator, prompts }
    }

    pub async fn research(
        &self,
        request: &GenerationRequest,
    ) -> Result<PhaseOutput<ResearchResult>, PhaseError> {
        let kind = PhaseKind::Research;
        let prompt = prompts::build_research_prompt(request);
        let started = Instant::now();

        let result: ResearchResult = self
            .generate(kind, &prompt, &self.prompts.researcher)
            .await?;
        validate::validate_research(&result).map_err(|e| validation_error(kind, e))?;

        let duration_ms = elapsed_ms(started);
        info!(
            phase = %kind.phase(),
            duration_ms,
            topics = result.main_topics.len(),
            "Research completed"
        );
        Ok(PhaseOutput {
            artifact: result,
            duration_ms,
            report: ValidationReport::default(),
        })
    }

    pub async fn design(
        &self,
        research: &ResearchResult,
        request: &GenerationRequest,
    ) -> Result<PhaseOutput<DesignSpec>, PhaseError> {
        let kind = PhaseKind::Design;
        let prompt = prompts::build_design_prompt(research, request);
        let started = Instant::now();

        let spec: DesignSpec = self.generate(kind, &prompt, &self.prompts.designer).await?;
        validate::validate_design_spec(&spec).map_err(|e| validation_error(kind, e))?;

        let duration_ms = elapsed_ms(started);
        info!(
            phase = %kind.phase(),
            duration_ms,
            topics = spec.topics.len(),
            objectives = spec.objective_count(),
            "Design spec generated"
        );
        Ok(PhaseOutput {
            artifact: spec,
            duration_ms,
            report: ValidationReport::default(),
        })
    }

    pub async fn storyboard(
        &self,
        spec: &DesignSpec,
        research: &ResearchResult,
    ) -> Result<PhaseOutput<Storyboard>, PhaseError> {
        let kind = PhaseKind::Storyboard;
        let prompt = prompts::build_storyboard_prompt(spec, research);
        let started = Instant::now();

        let storyboard: Storyboard = self.generate(kind, &prompt, &self.prompts.designer).await?;
        let report =
            validate::validate_storyboard(&storyboard, spec).map_err(|e| validation_error(kind, e))?;

        let duration_ms = elapsed_ms(started);
        info!(
            phase = %kind.phase(),
            duration_ms,
            sections = storyboard.sections.len(),
            questions = storyboard.final_quiz.questions.len(),
            coverage_clean = report.is_clean(),
            "Storyboard generated"
        );
        Ok(PhaseOutput {
            artifact: storyboard,
            duration_ms,
            report,
        })
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        kind: PhaseKind,
        prompt: &str,
        system: &str,
    ) -> Result<T, PhaseError> {
        let tuning = kind.tuning();
        let options = GenerateOptions {
            max_tokens: tuning.max_tokens,
            temperature: tuning.temperature,
            system: Some(system.to_string()),
        };
        debug!(phase = %kind.phase(), prompt_len = prompt.len(), "Starting phase");

        generate_structured(self.generator.as_ref(), prompt, &options)
            .await
            .map_err(|e| generator_error(kind, e))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn generator_error(kind: PhaseKind, source: GeneratorError) -> PhaseError {
    PhaseError::Generator {
        phase: kind.phase(),
        source,
    }
}

fn validation_error(kind: PhaseKind, source: ValidationError) -> PhaseError {
    PhaseError::Validation {
        phase: kind.phase(),
        source,
    }
}
