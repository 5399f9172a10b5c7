use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use super::log::{GenerationLog, LogEntry};

// ── Generation request ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CourseFormat {
    Elearning,
    Workshop,
    Scenario,
}

impl CourseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elearning => "elearning",
            Self::Workshop => "workshop",
            Self::Scenario => "scenario",
        }
    }
}

impl std::fmt::Display for CourseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "elearning" => Ok(Self::Elearning),
            "workshop" => Ok(Self::Workshop),
            "scenario" => Ok(Self::Scenario),
            _ => Err(format!("Invalid course format: {}", s)),
        }
    }
}

/// Caller input for a run. Validated at the HTTP boundary and never mutated
/// once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub topic: String,
    pub format: CourseFormat,
    pub audience: String,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curriculum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_urls: Vec<String>,
}

// ── Lenient artifact fields ───────────────────────────────────────────

/// Read an explicit `null` the same way as a missing field.
///
/// Generated artifacts are checked by the validation engine, so a `null`
/// title has to reach it as an empty string rather than fail the parse.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Non-negative whole number that may arrive as `15` or `15.0`.
/// Fractions are rounded.
fn lenient_whole_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if !value.is_finite() || value < 0.0 {
        return Err(D::Error::custom(format!(
            "expected a non-negative number, found {}",
            value
        )));
    }
    Ok(Some(value.round() as u64))
}

fn lenient_minutes<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match lenient_whole_number(deserializer)? {
        None => Ok(0),
        Some(n) => u32::try_from(n)
            .map_err(|_| D::Error::custom(format!("duration {} is out of range", n))),
    }
}

fn lenient_percentage<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    match lenient_whole_number(deserializer)? {
        None => Ok(default_pass_percentage()),
        Some(n) if n <= 100 => Ok(n as u8),
        Some(n) => Err(D::Error::custom(format!("percentage {} is above 100", n))),
    }
}

// ── Research ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResearchTopic {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub key_points: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub details: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeyTerm {
    #[serde(deserialize_with = "null_as_default")]
    pub term: String,
    #[serde(deserialize_with = "null_as_default")]
    pub definition: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Misconception {
    #[serde(deserialize_with = "null_as_default")]
    pub misconception: String,
    #[serde(deserialize_with = "null_as_default")]
    pub truth: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Statistic {
    #[serde(deserialize_with = "null_as_default")]
    pub stat: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegulatoryRequirement {
    #[serde(deserialize_with = "null_as_default")]
    pub requirement: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source: String,
}

/// Output of the research phase. Fields missing from the generator payload,
/// or sent as `null`, deserialize as empty so the validation engine, not
/// serde, reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResearchResult {
    #[serde(deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(deserialize_with = "null_as_default")]
    pub main_topics: Vec<ResearchTopic>,
    #[serde(deserialize_with = "null_as_default")]
    pub key_terms: Vec<KeyTerm>,
    #[serde(deserialize_with = "null_as_default")]
    pub common_misconceptions: Vec<Misconception>,
    #[serde(deserialize_with = "null_as_default")]
    pub statistics: Vec<Statistic>,
    #[serde(deserialize_with = "null_as_default")]
    pub regulatory_requirements: Vec<RegulatoryRequirement>,
}

// ── Design spec ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseMetadata {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub curriculum: String,
    pub prerequisite: Option<String>,
    /// Minutes.
    #[serde(deserialize_with = "lenient_minutes")]
    pub duration: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub audience: String,
    #[serde(deserialize_with = "null_as_default")]
    pub assessment_format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningObjective {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub bloom_level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DesignTopic {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub objectives: Vec<LearningObjective>,
    #[serde(deserialize_with = "null_as_default")]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignSpec {
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: CourseMetadata,
    #[serde(deserialize_with = "null_as_default")]
    pub topics: Vec<DesignTopic>,
    #[serde(deserialize_with = "null_as_default")]
    pub key_terms: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub misconceptions: Vec<String>,
}

impl DesignSpec {
    /// Objective ids in declaration order, duplicates included.
    pub fn objective_ids(&self) -> impl Iterator<Item = &str> {
        self.topics
            .iter()
            .flat_map(|t| t.objectives.iter())
            .map(|o| o.id.as_str())
    }

    pub fn objective_count(&self) -> usize {
        self.topics.iter().map(|t| t.objectives.len()).sum()
    }
}

// ── Storyboard ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Intro,
    Header,
    Content,
    Practice,
    Summary,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Single,
    Multiple,
    TrueFalse,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionItem {
    #[serde(deserialize_with = "null_as_default")]
    pub item_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuizAnswer {
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(deserialize_with = "null_as_default")]
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoryboardSection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub section_id: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub interaction_items: Vec<InteractionItem>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub objective_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    // Practice question fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub answers: Vec<QuizAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incorrect_feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    #[serde(default, deserialize_with = "null_as_default")]
    pub question_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instruction: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answers: Vec<QuizAnswer>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub correct_feedback: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub incorrect_feedback: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub objective_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub section_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub difficulty: Difficulty,
}

fn default_pass_percentage() -> u8 {
    80
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinalQuiz {
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<QuizQuestion>,
    #[serde(default = "default_pass_percentage", deserialize_with = "lenient_percentage")]
    pub pass_percentage: u8,
}

impl Default for FinalQuiz {
    fn default() -> Self {
        Self {
            questions: Vec::new(),
            pass_percentage: default_pass_percentage(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Storyboard {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<StoryboardSection>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub final_quiz: FinalQuiz,
}

// ── Run state ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Researching,
    Designing,
    Review,
    Complete,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Researching => "researching",
            Self::Designing => "designing",
            Self::Review => "review",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// `failed` and `complete` have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Complete)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "researching" => Ok(Self::Researching),
            "designing" => Ok(Self::Designing),
            "review" => Ok(Self::Review),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid run status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    Research,
    Design,
    Storyboard,
    Complete,
}

impl GenerationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Design => "design",
            Self::Storyboard => "storyboard",
            Self::Complete => "complete",
        }
    }

    /// Human-readable name used as the prefix of phase failure messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Research => "Research",
            Self::Design => "Design spec generation",
            Self::Storyboard => "Storyboard generation",
            Self::Complete => "Completion",
        }
    }
}

impl std::fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "research" => Ok(Self::Research),
            "design" => Ok(Self::Design),
            "storyboard" => Ok(Self::Storyboard),
            "complete" => Ok(Self::Complete),
            _ => Err(format!("Invalid generation phase: {}", s)),
        }
    }
}

/// Aggregate root for one generation run, as persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRun {
    pub course_id: String,
    pub slug: String,
    pub title: String,
    pub request: GenerationRequest,
    pub status: RunStatus,
    pub current_phase: GenerationPhase,
    pub progress: u8,
    pub design_spec: Option<DesignSpec>,
    pub storyboard: Option<Storyboard>,
    pub generation_log: GenerationLog,
    pub created_at: String,
    pub updated_at: String,
}

/// Read projection returned by `get_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub course_id: String,
    pub status: RunStatus,
    pub current_phase: GenerationPhase,
    pub progress: u8,
    pub log: Vec<LogEntry>,
}

impl From<CourseRun> for StatusView {
    fn from(run: CourseRun) -> Self {
        Self {
            course_id: run.course_id,
            status: run.status,
            current_phase: run.current_phase,
            progress: run.progress,
            log: run.generation_log.into_entries(),
        }
    }
}

// ── Knowledge base ────────────────────────────────────────────────────

/// Listing row for a curated example course.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleCourseSummary {
    pub id: i64,
    pub title: String,
    pub format: String,
    pub topics: Vec<String>,
    pub industries: Vec<String>,
    pub components_used: Vec<String>,
    pub quality_score: f64,
    pub times_used: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleCourse {
    #[serde(flatten)]
    pub summary: ExampleCourseSummary,
    pub design_spec: serde_json::Value,
    pub sample_pages: serde_json::Value,
}
