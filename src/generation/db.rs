use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;

use super::log::{GenerationLog, LogEntry, LogPhase};
use super::models::*;

/// Async-safe handle to the course database.
///
/// Wraps `CourseDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads. Runs for different courses share this one
/// connection and never lock each other for longer than a single call.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<CourseDb>>,
}

impl DbHandle {
    pub fn new(db: CourseDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&CourseDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

/// Generated artifact written onto a course record.
#[derive(Debug, Clone)]
pub enum Artifact {
    DesignSpec(DesignSpec),
    Storyboard(Storyboard),
}

impl Artifact {
    fn column(&self) -> &'static str {
        match self {
            Artifact::DesignSpec(_) => "design_spec",
            Artifact::Storyboard(_) => "storyboard",
        }
    }

    fn to_json(&self) -> Result<String> {
        match self {
            Artifact::DesignSpec(spec) => serde_json::to_string(spec),
            Artifact::Storyboard(storyboard) => serde_json::to_string(storyboard),
        }
        .context("Failed to serialize artifact")
    }
}

/// Everything one pipeline step persists, committed in a single transaction.
#[derive(Debug, Clone)]
pub struct StepUpdate {
    pub artifact: Option<Artifact>,
    pub status: RunStatus,
    pub phase: GenerationPhase,
    pub progress: u8,
    pub entries: Vec<LogEntry>,
}

/// Input row for the example course library.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExampleCourse {
    pub title: String,
    pub format: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub components_used: Vec<String>,
    #[serde(default)]
    pub design_spec: serde_json::Value,
    #[serde(default)]
    pub sample_pages: serde_json::Value,
    #[serde(default)]
    pub quality_score: f64,
}

pub struct CourseDb {
    conn: Connection,
}

impl CourseDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS courses (
                    id TEXT PRIMARY KEY,
                    slug TEXT NOT NULL,
                    title TEXT NOT NULL,
                    format TEXT NOT NULL,
                    audience TEXT NOT NULL,
                    duration_minutes INTEGER NOT NULL,
                    curriculum TEXT,
                    prerequisite TEXT,
                    request TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'pending',
                    current_phase TEXT NOT NULL DEFAULT 'research',
                    progress INTEGER NOT NULL DEFAULT 0,
                    design_spec TEXT,
                    storyboard TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS generation_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                    timestamp TEXT NOT NULL,
                    phase TEXT NOT NULL,
                    message TEXT NOT NULL,
                    duration_ms INTEGER
                );

                CREATE TABLE IF NOT EXISTS example_courses (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL UNIQUE,
                    format TEXT NOT NULL,
                    topics TEXT NOT NULL DEFAULT '[]',
                    industries TEXT NOT NULL DEFAULT '[]',
                    components_used TEXT NOT NULL DEFAULT '[]',
                    design_spec TEXT NOT NULL DEFAULT 'null',
                    sample_pages TEXT NOT NULL DEFAULT 'null',
                    quality_score REAL NOT NULL DEFAULT 0,
                    times_used INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_courses_status ON courses(status);
                CREATE INDEX IF NOT EXISTS idx_generation_log_course ON generation_log(course_id, id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    /// Cheap liveness probe used by the health endpoint.
    pub fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .context("Database ping failed")?;
        Ok(())
    }

    // ── Course runs ───────────────────────────────────────────────────

    /// Insert a new run together with the entries already in its log.
    pub fn create_run(&self, run: &CourseRun) -> Result<()> {
        let request =
            serde_json::to_string(&run.request).context("Failed to serialize request")?;

        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        tx.execute(
            "INSERT INTO courses (id, slug, title, format, audience, duration_minutes, curriculum, prerequisite,
                                  request, status, current_phase, progress, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                run.course_id,
                run.slug,
                run.title,
                run.request.format.as_str(),
                run.request.audience,
                run.request.duration_minutes,
                run.request.curriculum,
                run.request.prerequisite,
                request,
                run.status.as_str(),
                run.current_phase.as_str(),
                run.progress,
                run.created_at,
                run.updated_at,
            ],
        )
        .context("Failed to insert course")?;
        insert_log_entries(&tx, &run.course_id, run.generation_log.entries())?;
        tx.commit().context("Failed to commit course insert")?;
        Ok(())
    }

    pub fn read_run(&self, course_id: &str) -> Result<Option<CourseRun>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, slug, title, request, status, current_phase, progress, design_spec, storyboard, created_at, updated_at
                 FROM courses WHERE id = ?1",
                params![course_id],
                |row| {
                    Ok(CourseRow {
                        id: row.get(0)?,
                        slug: row.get(1)?,
                        title: row.get(2)?,
                        request: row.get(3)?,
                        status: row.get(4)?,
                        current_phase: row.get(5)?,
                        progress: row.get(6)?,
                        design_spec: row.get(7)?,
                        storyboard: row.get(8)?,
                        created_at: row.get(9)?,
                        updated_at: row.get(10)?,
                    })
                },
            )
            .optional()
            .context("Failed to query course")?;

        match row {
            Some(row) => {
                let log = self.read_log(course_id)?;
                Ok(Some(row.into_course_run(log)?))
            }
            None => Ok(None),
        }
    }

    pub fn read_log(&self, course_id: &str) -> Result<GenerationLog> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT timestamp, phase, message, duration_ms
                 FROM generation_log WHERE course_id = ?1 ORDER BY id",
            )
            .context("Failed to prepare read_log")?;
        let rows = stmt
            .query_map(params![course_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            })
            .context("Failed to query generation log")?;

        let mut log = GenerationLog::new();
        for row in rows {
            let (timestamp, phase, message, duration_ms) =
                row.context("Failed to read log row")?;
            let phase = LogPhase::from_str(&phase)
                .map_err(|e| anyhow::anyhow!(e))
                .context("Failed to parse log phase")?;
            log.push(LogEntry {
                timestamp,
                phase,
                message,
                duration_ms: duration_ms.and_then(|ms| u64::try_from(ms).ok()),
            });
        }
        Ok(log)
    }

    /// Append entries to a run's log without reading the existing sequence.
    pub fn append_log(&self, course_id: &str, entries: &[LogEntry]) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        touch_course(&tx, course_id)?;
        insert_log_entries(&tx, course_id, entries)?;
        tx.commit().context("Failed to commit log append")?;
        Ok(())
    }

    pub fn set_artifact(&self, course_id: &str, artifact: &Artifact) -> Result<()> {
        write_artifact(&self.conn, course_id, artifact)
    }

    pub fn set_status(
        &self,
        course_id: &str,
        status: RunStatus,
        phase: GenerationPhase,
        progress: u8,
    ) -> Result<()> {
        write_status(&self.conn, course_id, status, phase, progress)
    }

    /// Persist one pipeline step atomically: artifact, status and log entries
    /// are either all written or none are.
    /// Commit one pipeline step atomically. Returns `false`, writing
    /// nothing, when the course does not exist.
    pub fn record_step(&self, course_id: &str, step: &StepUpdate) -> Result<bool> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let exists = tx
            .query_row("SELECT 1 FROM courses WHERE id = ?1", params![course_id], |_| Ok(()))
            .optional()
            .context("Failed to look up course")?
            .is_some();
        if !exists {
            return Ok(false);
        }
        if let Some(artifact) = &step.artifact {
            write_artifact(&tx, course_id, artifact)?;
        }
        write_status(&tx, course_id, step.status, step.phase, step.progress)?;
        insert_log_entries(&tx, course_id, &step.entries)?;
        tx.commit().context("Failed to commit pipeline step")?;
        Ok(true)
    }

    pub fn get_design_spec(&self, course_id: &str) -> Result<Option<DesignSpec>> {
        self.read_artifact_column(course_id, "design_spec")
    }

    pub fn get_storyboard(&self, course_id: &str) -> Result<Option<Storyboard>> {
        self.read_artifact_column(course_id, "storyboard")
    }

    fn read_artifact_column<T: serde::de::DeserializeOwned>(
        &self,
        course_id: &str,
        column: &str,
    ) -> Result<Option<T>> {
        let json: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT {} FROM courses WHERE id = ?1", column),
                params![course_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .with_context(|| format!("Failed to query {}", column))?
            .flatten();
        json.map(|j| serde_json::from_str(&j))
            .transpose()
            .with_context(|| format!("Failed to parse stored {}", column))
    }

    // ── Example course library ────────────────────────────────────────

    pub fn insert_example_course(&self, example: &NewExampleCourse) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO example_courses (title, format, topics, industries, components_used, design_spec, sample_pages, quality_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(title) DO UPDATE SET
                    format = excluded.format,
                    topics = excluded.topics,
                    industries = excluded.industries,
                    components_used = excluded.components_used,
                    design_spec = excluded.design_spec,
                    sample_pages = excluded.sample_pages,
                    quality_score = excluded.quality_score",
                params![
                    example.title,
                    example.format,
                    serde_json::to_string(&example.topics)?,
                    serde_json::to_string(&example.industries)?,
                    serde_json::to_string(&example.components_used)?,
                    example.design_spec.to_string(),
                    example.sample_pages.to_string(),
                    example.quality_score,
                ],
            )
            .context("Failed to insert example course")?;
        self.conn
            .query_row(
                "SELECT id FROM example_courses WHERE title = ?1",
                params![example.title],
                |row| row.get(0),
            )
            .context("Example course not found after insert")
    }

    /// All examples, best first.
    pub fn list_example_courses(&self) -> Result<Vec<ExampleCourseSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, format, topics, industries, components_used, quality_score, times_used, created_at
                 FROM example_courses ORDER BY quality_score DESC, id",
            )
            .context("Failed to prepare list_example_courses")?;
        let rows = stmt
            .query_map([], example_summary_row)
            .context("Failed to query example courses")?;
        let mut examples = Vec::new();
        for row in rows {
            let r = row.context("Failed to read example row")?;
            examples.push(r.into_summary()?);
        }
        Ok(examples)
    }

    /// Look an example up by exact title and count the use.
    pub fn get_example_course_by_title(&self, title: &str) -> Result<Option<ExampleCourse>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let updated = tx
            .execute(
                "UPDATE example_courses SET times_used = times_used + 1 WHERE title = ?1",
                params![title],
            )
            .context("Failed to increment times_used")?;
        if updated == 0 {
            return Ok(None);
        }

        let (row, design_spec, sample_pages) = tx
            .query_row(
                "SELECT id, title, format, topics, industries, components_used, quality_score, times_used, created_at,
                        design_spec, sample_pages
                 FROM example_courses WHERE title = ?1",
                params![title],
                |row| {
                    Ok((
                        example_summary_row(row)?,
                        row.get::<_, String>(9)?,
                        row.get::<_, String>(10)?,
                    ))
                },
            )
            .context("Failed to query example course")?;
        tx.commit().context("Failed to commit example lookup")?;

        Ok(Some(ExampleCourse {
            summary: row.into_summary()?,
            design_spec: serde_json::from_str(&design_spec)
                .context("Failed to parse example design_spec")?,
            sample_pages: serde_json::from_str(&sample_pages)
                .context("Failed to parse example sample_pages")?,
        }))
    }
}

// ── Shared write helpers (work on a connection or a transaction) ─────

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn touch_course(conn: &Connection, course_id: &str) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE courses SET updated_at = ?1 WHERE id = ?2",
            params![now(), course_id],
        )
        .context("Failed to touch course")?;
    if updated == 0 {
        bail!("Course {} not found", course_id);
    }
    Ok(())
}

fn insert_log_entries(conn: &Connection, course_id: &str, entries: &[LogEntry]) -> Result<()> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO generation_log (course_id, timestamp, phase, message, duration_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .context("Failed to prepare log insert")?;
    for entry in entries {
        let duration_ms = entry.duration_ms.map(|ms| i64::try_from(ms).unwrap_or(i64::MAX));
        stmt.execute(params![
            course_id,
            entry.timestamp,
            entry.phase.as_str(),
            entry.message,
            duration_ms,
        ])
        .context("Failed to insert log entry")?;
    }
    Ok(())
}

fn write_artifact(conn: &Connection, course_id: &str, artifact: &Artifact) -> Result<()> {
    let json = artifact.to_json()?;
    let updated = conn
        .execute(
            &format!(
                "UPDATE courses SET {} = ?1, updated_at = ?2 WHERE id = ?3",
                artifact.column()
            ),
            params![json, now(), course_id],
        )
        .with_context(|| format!("Failed to write {}", artifact.column()))?;
    if updated == 0 {
        bail!("Course {} not found", course_id);
    }
    Ok(())
}

fn write_status(
    conn: &Connection,
    course_id: &str,
    status: RunStatus,
    phase: GenerationPhase,
    progress: u8,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE courses SET status = ?1, current_phase = ?2, progress = ?3, updated_at = ?4 WHERE id = ?5",
            params![status.as_str(), phase.as_str(), progress, now(), course_id],
        )
        .context("Failed to update course status")?;
    if updated == 0 {
        bail!("Course {} not found", course_id);
    }
    Ok(())
}

// ── Row mapping ───────────────────────────────────────────────────────

/// Intermediate row struct for courses.
struct CourseRow {
    id: String,
    slug: String,
    title: String,
    request: String,
    status: String,
    current_phase: String,
    progress: u8,
    design_spec: Option<String>,
    storyboard: Option<String>,
    created_at: String,
    updated_at: String,
}

impl CourseRow {
    fn into_course_run(self, generation_log: GenerationLog) -> Result<CourseRun> {
        let status = RunStatus::from_str(&self.status)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse course status")?;
        let current_phase = GenerationPhase::from_str(&self.current_phase)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse course phase")?;
        let request =
            serde_json::from_str(&self.request).context("Failed to parse stored request")?;
        let design_spec = self
            .design_spec
            .map(|j| serde_json::from_str(&j))
            .transpose()
            .context("Failed to parse stored design_spec")?;
        let storyboard = self
            .storyboard
            .map(|j| serde_json::from_str(&j))
            .transpose()
            .context("Failed to parse stored storyboard")?;

        Ok(CourseRun {
            course_id: self.id,
            slug: self.slug,
            title: self.title,
            request,
            status,
            current_phase,
            progress: self.progress,
            design_spec,
            storyboard,
            generation_log,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Intermediate row struct for example_courses listings.
struct ExampleRow {
    id: i64,
    title: String,
    format: String,
    topics: String,
    industries: String,
    components_used: String,
    quality_score: f64,
    times_used: i64,
    created_at: String,
}

fn example_summary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExampleRow> {
    Ok(ExampleRow {
        id: row.get(0)?,
        title: row.get(1)?,
        format: row.get(2)?,
        topics: row.get(3)?,
        industries: row.get(4)?,
        components_used: row.get(5)?,
        quality_score: row.get(6)?,
        times_used: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl ExampleRow {
    fn into_summary(self) -> Result<ExampleCourseSummary> {
        Ok(ExampleCourseSummary {
            id: self.id,
            title: self.title,
            format: self.format,
            topics: serde_json::from_str(&self.topics).context("Failed to parse topics")?,
            industries: serde_json::from_str(&self.industries)
                .context("Failed to parse industries")?,
            components_used: serde_json::from_str(&self.components_used)
                .context("Failed to parse components_used")?,
            quality_score: self.quality_score,
            times_used: self.times_used,
            created_at: self.created_at,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
