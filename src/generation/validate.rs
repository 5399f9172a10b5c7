//! Validation engine: structural and referential checks over generated artifacts.
//!
//! Structural violations are fatal and returned as `ValidationError`.
//! Objective coverage gaps in a storyboard are advisory: they come back as
//! warnings inside an `Ok(ValidationReport)` and never fail the run.

use std::collections::HashSet;

use crate::errors::ValidationError;

use super::models::{DesignSpec, ResearchResult, Storyboard};

/// Final quiz must have at least this many questions.
pub const MIN_QUIZ_QUESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageGap {
    /// Objective is not referenced by any storyboard section.
    NotCovered,
    /// Objective is not referenced by any final quiz question.
    NotAssessed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageWarning {
    pub gap: CoverageGap,
    /// Missing objective ids, in design spec declaration order.
    pub objective_ids: Vec<String>,
}

impl CoverageWarning {
    pub fn message(&self) -> String {
        let what = match self.gap {
            CoverageGap::NotCovered => "Objectives not covered by content",
            CoverageGap::NotAssessed => "Objectives not assessed by quiz",
        };
        format!("{}: {}", what, self.objective_ids.join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<CoverageWarning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn uncovered(&self) -> &[String] {
        self.gap(CoverageGap::NotCovered)
    }

    pub fn unassessed(&self) -> &[String] {
        self.gap(CoverageGap::NotAssessed)
    }

    fn gap(&self, gap: CoverageGap) -> &[String] {
        self.warnings
            .iter()
            .find(|w| w.gap == gap)
            .map(|w| w.objective_ids.as_slice())
            .unwrap_or(&[])
    }
}

pub fn validate_research(result: &ResearchResult) -> Result<(), ValidationError> {
    if result.topic.is_empty() {
        return Err(ValidationError::MissingResearchTopic);
    }
    if result.main_topics.is_empty() {
        return Err(ValidationError::NoMainTopics);
    }
    for (index, topic) in result.main_topics.iter().enumerate() {
        if topic.title.is_empty() {
            return Err(ValidationError::TopicMissingTitle { index });
        }
        if topic.key_points.is_empty() {
            return Err(ValidationError::TopicMissingKeyPoints {
                index,
                title: topic.title.clone(),
            });
        }
    }
    Ok(())
}

pub fn validate_design_spec(spec: &DesignSpec) -> Result<(), ValidationError> {
    if spec.metadata.title.is_empty() {
        return Err(ValidationError::MissingDesignTitle);
    }
    if spec.topics.is_empty() {
        return Err(ValidationError::NoDesignTopics);
    }
    if spec.objective_count() == 0 {
        return Err(ValidationError::NoObjectives);
    }

    let mut seen = HashSet::new();
    for id in spec.objective_ids() {
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateObjectiveId { id: id.to_string() });
        }
    }
    Ok(())
}

pub fn validate_storyboard(
    storyboard: &Storyboard,
    spec: &DesignSpec,
) -> Result<ValidationReport, ValidationError> {
    if storyboard.sections.is_empty() {
        return Err(ValidationError::NoSections);
    }
    let found = storyboard.final_quiz.questions.len();
    if found < MIN_QUIZ_QUESTIONS {
        return Err(ValidationError::TooFewQuizQuestions { found });
    }

    let mut section_ids = HashSet::new();
    for section in &storyboard.sections {
        if !section_ids.insert(section.section_id.as_str()) {
            return Err(ValidationError::DuplicateSectionId {
                id: section.section_id.clone(),
            });
        }
    }

    let covered: HashSet<&str> = storyboard
        .sections
        .iter()
        .flat_map(|s| s.objective_ids.iter())
        .map(String::as_str)
        .collect();
    let assessed: HashSet<&str> = storyboard
        .final_quiz
        .questions
        .iter()
        .flat_map(|q| q.objective_ids.iter())
        .map(String::as_str)
        .collect();

    let mut report = ValidationReport::default();
    for (gap, referenced) in [
        (CoverageGap::NotCovered, &covered),
        (CoverageGap::NotAssessed, &assessed),
    ] {
        let missing = missing_objectives(spec, referenced);
        if !missing.is_empty() {
            report.warnings.push(CoverageWarning {
                gap,
                objective_ids: missing,
            });
        }
    }
    Ok(report)
}

fn missing_objectives(spec: &DesignSpec, referenced: &HashSet<&str>) -> Vec<String> {
    let mut reported = HashSet::new();
    spec.objective_ids()
        .filter(|id| !referenced.contains(id) && reported.insert(*id))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::fixtures;
    use crate::generation::models::*;

    // ── research ──────────────────────────────────────────────────────

    #[test]
    fn test_research_valid() {
        assert_eq!(validate_research(&fixtures::research()), Ok(()));
    }

    #[test]
    fn test_research_missing_topic() {
        let mut r = fixtures::research();
        r.topic.clear();
        assert_eq!(validate_research(&r), Err(ValidationError::MissingResearchTopic));
    }

    #[test]
    fn test_research_no_main_topics() {
        let mut r = fixtures::research();
        r.main_topics.clear();
        assert_eq!(validate_research(&r), Err(ValidationError::NoMainTopics));
    }

    #[test]
    fn test_research_reports_first_offending_topic() {
        let mut r = fixtures::research();
        r.main_topics[1].key_points.clear();
        r.main_topics[2].title.clear();
        assert_eq!(
            validate_research(&r),
            Err(ValidationError::TopicMissingKeyPoints {
                index: 1,
                title: r.main_topics[1].title.clone(),
            })
        );
    }

    #[test]
    fn test_research_topic_missing_title() {
        let mut r = fixtures::research();
        r.main_topics[0].title.clear();
        assert_eq!(
            validate_research(&r),
            Err(ValidationError::TopicMissingTitle { index: 0 })
        );
    }

    // ── design spec ───────────────────────────────────────────────────

    #[test]
    fn test_design_spec_valid() {
        assert_eq!(validate_design_spec(&fixtures::design_spec()), Ok(()));
    }

    #[test]
    fn test_design_spec_missing_title() {
        let mut spec = fixtures::design_spec();
        spec.metadata.title.clear();
        assert_eq!(
            validate_design_spec(&spec),
            Err(ValidationError::MissingDesignTitle)
        );
    }

    #[test]
    fn test_design_spec_no_topics() {
        let mut spec = fixtures::design_spec();
        spec.topics.clear();
        assert_eq!(validate_design_spec(&spec), Err(ValidationError::NoDesignTopics));
    }

    #[test]
    fn test_design_spec_topics_without_objectives() {
        let mut spec = fixtures::design_spec();
        for topic in &mut spec.topics {
            topic.objectives.clear();
        }
        assert_eq!(validate_design_spec(&spec), Err(ValidationError::NoObjectives));
    }

    #[test]
    fn test_design_spec_duplicate_objective_across_topics() {
        let mut spec = fixtures::design_spec();
        spec.topics[1].objectives[0].id = "obj-1".to_string();
        assert_eq!(
            validate_design_spec(&spec),
            Err(ValidationError::DuplicateObjectiveId {
                id: "obj-1".to_string()
            })
        );
    }

    #[test]
    fn test_design_spec_reports_first_duplicate_in_scan_order() {
        let mut spec = fixtures::design_spec();
        // Scan order: obj-1, obj-4, obj-4, obj-1. The obj-4 repeat comes first.
        spec.topics[0].objectives.push(LearningObjective {
            id: "obj-4".to_string(),
            ..Default::default()
        });
        spec.topics[1].objectives.push(LearningObjective {
            id: "obj-1".to_string(),
            ..Default::default()
        });
        let err = validate_design_spec(&spec).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateObjectiveId {
                id: "obj-4".to_string()
            }
        );
    }

    // ── storyboard ────────────────────────────────────────────────────

    #[test]
    fn test_storyboard_full_coverage_is_clean() {
        let report =
            validate_storyboard(&fixtures::storyboard(), &fixtures::design_spec()).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn test_storyboard_no_sections() {
        let mut sb = fixtures::storyboard();
        sb.sections.clear();
        assert_eq!(
            validate_storyboard(&sb, &fixtures::design_spec()),
            Err(ValidationError::NoSections)
        );
    }

    #[test]
    fn test_storyboard_four_questions_fails() {
        let mut sb = fixtures::storyboard();
        sb.final_quiz.questions.truncate(4);
        let err = validate_storyboard(&sb, &fixtures::design_spec()).unwrap_err();
        assert_eq!(err, ValidationError::TooFewQuizQuestions { found: 4 });
        assert!(err.to_string().contains("fewer than 5 questions"));
    }

    #[test]
    fn test_storyboard_duplicate_section_id() {
        let mut sb = fixtures::storyboard();
        let dup = sb.sections[1].section_id.clone();
        sb.sections[2].section_id = dup.clone();
        assert_eq!(
            validate_storyboard(&sb, &fixtures::design_spec()),
            Err(ValidationError::DuplicateSectionId { id: dup })
        );
    }

    #[test]
    fn test_storyboard_uncovered_objective_is_warning_only() {
        let mut spec = fixtures::design_spec();
        spec.topics[1].objectives.push(LearningObjective {
            id: "obj-3".to_string(),
            text: "Recall the inspection checklist".to_string(),
            bloom_level: "remember".to_string(),
        });
        let mut sb = fixtures::storyboard();
        for section in &mut sb.sections {
            section.objective_ids.retain(|id| id != "obj-3");
        }

        let report = validate_storyboard(&sb, &spec).unwrap();
        assert_eq!(report.uncovered(), ["obj-3".to_string()]);
        assert_eq!(report.unassessed(), ["obj-3".to_string()]);
        assert_eq!(
            report.warnings[0].message(),
            "Objectives not covered by content: obj-3"
        );
    }

    #[test]
    fn test_storyboard_unassessed_objective_only() {
        let mut sb = fixtures::storyboard();
        for q in &mut sb.final_quiz.questions {
            q.objective_ids.retain(|id| id != "obj-4");
        }
        let report = validate_storyboard(&sb, &fixtures::design_spec()).unwrap();
        assert!(report.uncovered().is_empty());
        assert_eq!(report.unassessed(), ["obj-4".to_string()]);
    }

    #[test]
    fn test_storyboard_structural_error_wins_over_coverage() {
        let mut sb = fixtures::storyboard();
        for section in &mut sb.sections {
            section.objective_ids.clear();
        }
        sb.final_quiz.questions.truncate(2);
        assert_eq!(
            validate_storyboard(&sb, &fixtures::design_spec()),
            Err(ValidationError::TooFewQuizQuestions { found: 2 })
        );
    }

    #[test]
    fn test_storyboard_references_to_unknown_objectives_are_ignored() {
        let mut sb = fixtures::storyboard();
        sb.sections[1].objective_ids.push("obj-99".to_string());
        let report = validate_storyboard(&sb, &fixtures::design_spec()).unwrap();
        assert!(report.is_clean());
    }
}
