//! Database commands: `course-forge init-db` and `course-forge seed-examples`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use course_forge::config::{CliOverrides, CourseForgeConfig};
use course_forge::generation::db::{CourseDb, NewExampleCourse};

fn open_db(config_path: Option<&Path>, db_path: Option<PathBuf>) -> Result<(CourseDb, PathBuf)> {
    let config = CourseForgeConfig::resolve(
        config_path,
        &CliOverrides {
            db_path,
            ..Default::default()
        },
    )?;
    let db_path = config.database.path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = CourseDb::new(&db_path)?;
    Ok((db, db_path))
}

pub fn cmd_init_db(config_path: Option<&Path>, db_path: Option<PathBuf>) -> Result<()> {
    let (_db, db_path) = open_db(config_path, db_path)?;
    println!("Course database initialized at {}", db_path.display());
    Ok(())
}

pub fn cmd_seed_examples(
    config_path: Option<&Path>,
    db_path: Option<PathBuf>,
    file: &Path,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read examples file: {}", file.display()))?;
    let examples: Vec<NewExampleCourse> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse examples file: {}", file.display()))?;

    let (db, db_path) = open_db(config_path, db_path)?;
    for example in &examples {
        let id = db.insert_example_course(example)?;
        println!("  {} (id {})", example.title, id);
    }
    println!(
        "Seeded {} example course(s) into {}",
        examples.len(),
        db_path.display()
    );
    Ok(())
}
