//! Canned artifacts shared by unit tests across the generation modules.
//!
//! The design spec declares `obj-1` (topic 0) and `obj-4` (topic 1). The
//! storyboard covers and assesses both, so it validates cleanly against it.

use super::models::*;

pub(crate) fn request() -> GenerationRequest {
    GenerationRequest {
        topic: "Ladder Safety".to_string(),
        format: CourseFormat::Elearning,
        audience: "Warehouse staff".to_string(),
        duration_minutes: 15,
        curriculum: None,
        prerequisite: None,
        additional_context: None,
        source_urls: Vec::new(),
    }
}

fn research_topic(title: &str, points: &[&str]) -> ResearchTopic {
    ResearchTopic {
        title: title.to_string(),
        key_points: points.iter().map(|p| p.to_string()).collect(),
        details: format!("Details about {}", title.to_lowercase()),
        sources: vec!["https://www.osha.gov/ladders".to_string()],
    }
}

pub(crate) fn research() -> ResearchResult {
    ResearchResult {
        topic: "Ladder Safety".to_string(),
        summary: "Falls from ladders are a leading cause of workplace injury.".to_string(),
        main_topics: vec![
            research_topic(
                "Choosing the right ladder",
                &["Match ladder type to task", "Check the duty rating"],
            ),
            research_topic(
                "Safe climbing",
                &["Keep three points of contact", "Face the ladder"],
            ),
            research_topic("Inspection", &["Inspect before each use"]),
        ],
        key_terms: vec![KeyTerm {
            term: "Duty rating".to_string(),
            definition: "Maximum safe load for a ladder".to_string(),
        }],
        common_misconceptions: vec![Misconception {
            misconception: "Short ladders are always safe".to_string(),
            truth: "Most falls happen from under ten feet".to_string(),
        }],
        statistics: vec![Statistic {
            stat: "Over 20% of fall injuries involve ladders".to_string(),
            source: "NIOSH".to_string(),
        }],
        regulatory_requirements: Vec::new(),
    }
}

fn objective(id: &str, text: &str, bloom_level: &str) -> LearningObjective {
    LearningObjective {
        id: id.to_string(),
        text: text.to_string(),
        bloom_level: bloom_level.to_string(),
    }
}

pub(crate) fn design_spec() -> DesignSpec {
    DesignSpec {
        metadata: CourseMetadata {
            title: "Ladder Safety Essentials".to_string(),
            curriculum: "Workplace Safety".to_string(),
            prerequisite: None,
            duration: 15,
            audience: "Warehouse staff".to_string(),
            assessment_format: "multiple choice".to_string(),
        },
        topics: vec![
            DesignTopic {
                title: "Choosing the right ladder".to_string(),
                objectives: vec![objective(
                    "obj-1",
                    "Select an appropriate ladder for a given task",
                    "apply",
                )],
                sources: Vec::new(),
            },
            DesignTopic {
                title: "Safe climbing".to_string(),
                objectives: vec![objective(
                    "obj-4",
                    "Demonstrate three points of contact",
                    "apply",
                )],
                sources: Vec::new(),
            },
        ],
        key_terms: vec!["Duty rating".to_string()],
        misconceptions: vec!["Short ladders are always safe".to_string()],
    }
}

fn section(id: &str, section_type: SectionType, title: &str, objectives: &[&str]) -> StoryboardSection {
    StoryboardSection {
        section_id: id.to_string(),
        section_type,
        title: title.to_string(),
        content: Some(format!("<p>{}</p>", title)),
        interaction_type: None,
        interaction_items: Vec::new(),
        objective_ids: objectives.iter().map(|o| o.to_string()).collect(),
        notes: None,
        question_text: None,
        question_type: None,
        answers: Vec::new(),
        correct_feedback: None,
        incorrect_feedback: None,
    }
}

fn question(n: usize, objectives: &[&str]) -> QuizQuestion {
    QuizQuestion {
        question_id: format!("q-{}", n),
        question_text: format!("Question {}", n),
        question_type: QuestionType::Single,
        instruction: "Select the best answer.".to_string(),
        answers: vec![
            QuizAnswer {
                label: "Right".to_string(),
                correct: true,
            },
            QuizAnswer {
                label: "Wrong".to_string(),
                correct: false,
            },
        ],
        correct_feedback: "Correct.".to_string(),
        incorrect_feedback: "Not quite.".to_string(),
        objective_ids: objectives.iter().map(|o| o.to_string()).collect(),
        section_ids: Vec::new(),
        difficulty: Difficulty::Medium,
    }
}

pub(crate) fn storyboard() -> Storyboard {
    Storyboard {
        sections: vec![
            section("section-0.0", SectionType::Intro, "Welcome", &[]),
            section("section-1.1", SectionType::Content, "Ladder types", &["obj-1"]),
            section("section-1.2", SectionType::Practice, "Pick a ladder", &["obj-1"]),
            section("section-2.1", SectionType::Content, "Climbing", &["obj-4"]),
            section("section-3.0", SectionType::Summary, "Summary", &[]),
        ],
        final_quiz: FinalQuiz {
            questions: vec![
                question(1, &["obj-1"]),
                question(2, &["obj-1"]),
                question(3, &["obj-4"]),
                question(4, &["obj-4"]),
                question(5, &["obj-1", "obj-4"]),
            ],
            pass_percentage: 80,
        },
    }
}

pub(crate) fn research_json() -> String {
    serde_json::to_string(&research()).unwrap()
}

pub(crate) fn design_spec_json() -> String {
    serde_json::to_string(&design_spec()).unwrap()
}

pub(crate) fn storyboard_json() -> String {
    serde_json::to_string(&storyboard()).unwrap()
}
