use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::models::{DesignSpec, GenerationRequest, ResearchResult};

const RESEARCHER_SYSTEM_PROMPT: &str = r#"You are an instructional researcher preparing source material for workplace eLearning courses.

Research the requested topic and respond with a single JSON object matching this schema:
{
  "topic": "The topic researched",
  "summary": "Two or three sentence overview",
  "mainTopics": [
    {
      "title": "Topic title",
      "keyPoints": ["Concise, factual point"],
      "details": "Supporting explanation",
      "sources": ["https://authoritative.source/page"]
    }
  ],
  "keyTerms": [{ "term": "Term", "definition": "Plain-language definition" }],
  "commonMisconceptions": [{ "misconception": "What people believe", "truth": "What is actually true" }],
  "statistics": [{ "stat": "Quantified fact", "source": "Where it comes from" }],
  "regulatoryRequirements": [{ "requirement": "Rule or standard", "source": "Issuing body" }]
}

Rules:
- Every main topic needs a title and at least one key point.
- Prefer government, industry-standard and peer-reviewed sources.
- Do not invent statistics; omit them when no reliable figure exists.
"#;

const DESIGNER_SYSTEM_PROMPT: &str = r#"You are an instructional designer who turns research into structured eLearning courses.

When asked for a design specification, respond with JSON matching:
{
  "metadata": {
    "title": "Course title",
    "curriculum": "Curriculum name",
    "prerequisite": null,
    "duration": 15,
    "audience": "Target audience",
    "assessmentFormat": "Final quiz format"
  },
  "topics": [
    {
      "title": "Topic title",
      "objectives": [{ "id": "obj-1", "text": "Identify ...", "bloomLevel": "remember" }],
      "sources": []
    }
  ],
  "keyTerms": ["Term"],
  "misconceptions": ["Misconception to address"]
}

When asked for a storyboard, respond with JSON matching:
{
  "sections": [
    {
      "sectionId": "section-1.1",
      "type": "intro | header | content | practice | summary",
      "title": "Section title",
      "content": "<p>HTML content</p>",
      "interactionType": "Component name",
      "interactionItems": [{ "itemId": "item-1", "label": "Label", "content": "<p>...</p>" }],
      "objectiveIds": ["obj-1"],
      "notes": "Notes for the developer",
      "questionText": "Practice sections only",
      "questionType": "single | multiple | true_false",
      "answers": [{ "label": "Answer", "correct": true }],
      "correctFeedback": "...",
      "incorrectFeedback": "..."
    }
  ],
  "finalQuiz": {
    "questions": [
      {
        "questionId": "q-1",
        "questionText": "...",
        "questionType": "single | multiple | true_false",
        "instruction": "Select the best answer.",
        "answers": [{ "label": "Answer", "correct": false }],
        "correctFeedback": "...",
        "incorrectFeedback": "...",
        "objectiveIds": ["obj-1"],
        "sectionIds": ["section-1.1"],
        "difficulty": "easy | medium | hard"
      }
    ],
    "passPercentage": 80
  }
}

Rules:
- Objective ids are unique across the whole course.
- Section ids are unique and follow section-X.Y.
- Every objective is taught by at least one section and assessed by at least one quiz question.
"#;

/// System prompts for the researcher and designer roles.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemPrompts {
    pub researcher: String,
    pub designer: String,
}

impl Default for SystemPrompts {
    fn default() -> Self {
        Self {
            researcher: RESEARCHER_SYSTEM_PROMPT.to_string(),
            designer: DESIGNER_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl SystemPrompts {
    /// Load `researcher.md` and `designer.md` from `dir`, falling back to the
    /// built-in prompt for any file that does not exist.
    pub fn load(dir: &Path) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            researcher: read_override(&dir.join("researcher.md"))?.unwrap_or(defaults.researcher),
            designer: read_override(&dir.join("designer.md"))?.unwrap_or(defaults.designer),
        })
    }
}

fn read_override(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt file {}", path.display()))?;
    Ok(Some(content))
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

pub fn build_research_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Research the following topic for an eLearning course:\n\n\
         ## Topic\n{}\n\n\
         ## Course Parameters\n\
         - Format: {}\n\
         - Target Audience: {}\n\
         - Duration: {} minutes\n",
        request.topic, request.format, request.audience, request.duration_minutes
    );

    if let Some(curriculum) = &request.curriculum {
        let _ = writeln!(prompt, "- Curriculum: {}", curriculum);
    }
    if let Some(prerequisite) = &request.prerequisite {
        let _ = writeln!(prompt, "- Prerequisite: {}", prerequisite);
    }
    if let Some(context) = &request.additional_context {
        let _ = write!(prompt, "\n## Additional Context\n{}\n", context);
    }
    if !request.source_urls.is_empty() {
        prompt.push_str("\n## Preferred Sources\nThe following URLs should be prioritized:\n");
        for url in &request.source_urls {
            let _ = writeln!(prompt, "- {}", url);
        }
    }

    let _ = write!(
        prompt,
        "\n## Research Requirements\n\n\
         Based on the {duration}-minute duration, identify:\n\
         - 2-4 main topics that can be covered effectively\n\
         - Key concepts and definitions for each topic\n\
         - Common misconceptions to address\n\
         - Any regulatory requirements (especially for workplace safety topics)\n\
         - Statistics or facts that support the learning content\n\n\
         Focus on information that is:\n\
         1. Authoritative (government, industry standards, peer-reviewed)\n\
         2. Current (within last 5 years unless historical)\n\
         3. Practical for workplace training\n\
         4. Suitable for the target audience: {audience}\n\n\
         Return your research as the specified JSON structure.",
        duration = request.duration_minutes,
        audience = request.audience,
    );
    prompt
}

pub fn build_design_prompt(research: &ResearchResult, request: &GenerationRequest) -> String {
    let mut parameters = format!(
        "- Topic: {}\n- Format: {}\n- Duration: {} minutes\n- Audience: {}\n",
        request.topic, request.format, request.duration_minutes, request.audience
    );
    if let Some(curriculum) = &request.curriculum {
        let _ = writeln!(parameters, "- Curriculum: {}", curriculum);
    }
    if let Some(prerequisite) = &request.prerequisite {
        let _ = writeln!(parameters, "- Prerequisite: {}", prerequisite);
    }

    format!(
        "Create a design specification for an eLearning course based on the following research.\n\n\
         ## Research Summary\n{summary}\n\n\
         ## Main Topics\n{topics}\n\n\
         ## Key Terms\n{terms}\n\n\
         ## Common Misconceptions\n{misconceptions}\n\n\
         ## Course Parameters\n{parameters}\n\
         ## Requirements\n\n\
         Create a design spec with:\n\
         1. Course metadata (title, duration, audience, etc.)\n\
         2. Learning objectives grouped by topic using Bloom's taxonomy verbs\n\
         3. Key terms to define\n\
         4. Misconceptions to address\n\n\
         Each objective should:\n\
         - Start with a measurable verb (Define, Recall, Recognize, Identify, Explain, Apply, Demonstrate)\n\
         - Be achievable within the time allocated\n\
         - Map to content from the research\n\n\
         Return the design spec as the specified JSON structure.",
        summary = research.summary,
        topics = pretty(&research.main_topics),
        terms = pretty(&research.key_terms),
        misconceptions = pretty(&research.common_misconceptions),
        parameters = parameters,
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResearchReference<'a> {
    key_terms: &'a [super::models::KeyTerm],
    common_misconceptions: &'a [super::models::Misconception],
    statistics: &'a [super::models::Statistic],
}

pub fn build_storyboard_prompt(spec: &DesignSpec, research: &ResearchResult) -> String {
    let reference = ResearchReference {
        key_terms: &research.key_terms,
        common_misconceptions: &research.common_misconceptions,
        statistics: &research.statistics,
    };

    format!(
        "Create a detailed storyboard for the following course design.\n\n\
         ## Design Specification\n{spec}\n\n\
         ## Research Reference\n{reference}\n\n\
         ## Interaction Component Reference\n\n\
         Use these components based on content type:\n\
         - ImgSingle2col: Section headers, intro screens (single concept with visual)\n\
         - H1ALeft: Section introductions, explanations (single definition/explanation)\n\
         - CR3A: Click-reveal interactions (3-4 related concepts)\n\
         - ClickRevealGrid: Grid of clickable items (5-8 related concepts)\n\
         - SS2ACarousel: Slideshow/carousel (3-6 sequential steps)\n\
         - KcCheckboxAnswerableBuilder: Quiz/practice questions\n\n\
         ## Requirements\n\n\
         Create a storyboard with:\n\n\
         1. **Introduction Section** (section-0.0)\n\
         \x20  - Hook to engage learners\n\
         \x20  - Brief overview of what they'll learn\n\
         \x20  - Preview of main topics\n\n\
         2. **For Each Topic** (section-N.1, section-N.2, etc.)\n\
         \x20  - Topic header with objectives listed\n\
         \x20  - Content sections using appropriate interactions\n\
         \x20  - At least one practice question per topic\n\n\
         3. **Summary Section**\n\
         \x20  - Key takeaways\n\
         \x20  - Transition to final quiz\n\n\
         4. **Final Quiz** (minimum 5 questions)\n\
         \x20  - Cover all learning objectives\n\
         \x20  - Mix of question types (single, multiple, true_false)\n\
         \x20  - Feedback for correct and incorrect answers\n\
         \x20  - 80% pass threshold\n\n\
         Each section must:\n\
         - Have a unique sectionId (format: section-X.Y)\n\
         - Map to at least one objective (except intro/summary)\n\
         - Include appropriate interaction type\n\
         - Have content as HTML (use <p>, <ul>, <li>, <strong>, <em>)\n\n\
         Return the storyboard as the specified JSON structure.",
        spec = pretty(spec),
        reference = pretty(&reference),
    )
}
