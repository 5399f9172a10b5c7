//! Course generation pipeline.
//!
//! ## Overview
//!
//! A caller submits a `GenerationRequest`; the orchestrator records a new
//! `CourseRun` and drives three phases in a background task. Each phase asks
//! the content generator for a JSON artifact, validates it, and persists it
//! together with its log entries before the next phase starts.
//!
//! ## Module Map
//!
//! ```text
//!  start_run()   ┌───────────────────────────────────────────────────────┐
//! ─────────────> │ orchestrator.rs  (Orchestrator, state machine)        │
//!                │        │                        │                     │
//!                │        │ PhaseRunner            │ DbHandle::call()    │
//!                │        v                        v                     │
//!                │ phase.rs (tuning)         db.rs (CourseDb, SQLite)    │
//!                │   │      │                                            │
//!                │   │      └─> prompts.rs   (prompt builders)           │
//!                │   │                                                   │
//!                │   ├─> generator.rs (ContentGenerator, Anthropic)      │
//!                │   └─> validate.rs  (structural + coverage checks)     │
//!                └───────────────────────────────────────────────────────┘
//! ```
//!
//! | Module         | Responsibility                                         |
//! |----------------|--------------------------------------------------------|
//! | `models`       | Request, artifacts, `CourseRun`, status enums          |
//! | `log`          | `LogEntry` + append-only `GenerationLog`               |
//! | `validate`     | Validation engine, `ValidationReport`                  |
//! | `prompts`      | Phase prompt builders, `SystemPrompts`                 |
//! | `generator`    | `ContentGenerator` trait, structured JSON variant      |
//! | `phase`        | `PhaseRunner`, per-phase tuning                        |
//! | `db`           | Durable store (`CourseDb`, async `DbHandle`)           |
//! | `orchestrator` | Run lifecycle, status transitions, background tasks    |
//!
//! ## Run Lifecycle
//!
//! 1. `researching` / progress 0: record created with an `init` log entry.
//! 2. Research succeeds: `designing` / 30.
//! 3. Design spec persisted: `designing` / 50.
//! 4. Storyboard persisted: `review` / 90.
//!
//! Any error ends the run in `failed` with a `Pipeline failed: ...` entry.

pub mod db;
pub mod generator;
pub mod log;
pub mod models;
pub mod orchestrator;
pub mod phase;
pub mod prompts;
pub mod validate;

#[cfg(test)]
pub(crate) mod fixtures;
