//! CLI smoke tests for course-forge.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// course-forge command isolated from the caller's environment.
fn course_forge(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("course-forge");
    cmd.current_dir(dir.path())
        .env_remove("PORT")
        .env_remove("DATABASE_PATH")
        .env_remove("LOG_LEVEL")
        .env_remove("COURSE_FORGE_ENV")
        .env_remove("API_KEY_SECRET")
        .env_remove("ANTHROPIC_API_KEY");
    cmd
}

mod cli_basics {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("init-db"))
            .stdout(predicate::str::contains("seed-examples"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_unknown_command_fails() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir).arg("publish").assert().failure();
    }
}

mod database {
    use super::*;

    #[test]
    fn test_init_db_default_path() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir)
            .arg("init-db")
            .assert()
            .success()
            .stdout(predicate::str::contains("Course database initialized at"));
        assert!(dir.path().join(".course-forge/courses.db").exists());
    }

    #[test]
    fn test_init_db_explicit_path() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir)
            .args(["init-db", "--db-path", "data/test.db"])
            .assert()
            .success();
        assert!(dir.path().join("data/test.db").exists());
    }

    #[test]
    fn test_init_db_honors_database_path_env() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir)
            .arg("init-db")
            .env("DATABASE_PATH", "from-env.db")
            .assert()
            .success();
        assert!(dir.path().join("from-env.db").exists());
    }

    #[test]
    fn test_seed_examples() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("examples.json"),
            r#"[
                {"title": "Ladder Safety 101", "format": "elearning", "qualityScore": 0.9,
                 "topics": ["ladders"], "designSpec": {"metadata": {"title": "Ladder Safety 101"}}},
                {"title": "Forklift Basics", "format": "workshop"}
            ]"#,
        )
        .unwrap();

        course_forge(&dir)
            .args(["seed-examples", "--file", "examples.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Ladder Safety 101"))
            .stdout(predicate::str::contains("Seeded 2 example course(s)"));

        let db = course_forge::generation::db::CourseDb::new(
            &dir.path().join(".course-forge/courses.db"),
        )
        .unwrap();
        let examples = db.list_example_courses().unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].title, "Ladder Safety 101");
    }

    #[test]
    fn test_seed_examples_rejects_bad_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("examples.json"), "{not an array").unwrap();
        course_forge(&dir)
            .args(["seed-examples", "--file", "examples.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse examples file"));
    }
}

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No config.toml found"))
            .stdout(predicate::str::contains("port = 10000"))
            .stdout(predicate::str::contains("ANTHROPIC_API_KEY\" (not set)"));
    }

    #[test]
    fn test_config_show_never_prints_secrets() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir)
            .args(["config", "show"])
            .env("ANTHROPIC_API_KEY", "sk-very-secret")
            .env("API_KEY_SECRET", "boundary-secret")
            .assert()
            .success()
            .stdout(predicate::str::contains("sk-very-secret").not())
            .stdout(predicate::str::contains("boundary-secret").not())
            .stdout(predicate::str::contains("(set)"));
    }

    #[test]
    fn test_config_init_then_show_reads_file() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created config.toml"));
        assert!(dir.path().join(".course-forge/config.toml").exists());

        course_forge(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        course_forge(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Config file:"));
    }

    #[test]
    fn test_config_explicit_path_and_env_override() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("custom.toml"), "[server]\nport = 8080\n").unwrap();

        course_forge(&dir)
            .args(["config", "show", "--config", "custom.toml"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 8080"));

        course_forge(&dir)
            .args(["--config", "custom.toml", "config", "show"])
            .env("PORT", "9100")
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 9100"));
    }

    #[test]
    fn test_config_validate_reports_missing_key() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."))
            .stdout(predicate::str::contains("ai: false"))
            .stdout(predicate::str::contains("missing: ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_config_validate_fails_in_production_without_key() {
        let dir = TempDir::new().unwrap();
        course_forge(&dir)
            .args(["config", "validate"])
            .env("COURSE_FORGE_ENV", "production")
            .assert()
            .failure()
            .stderr(predicate::str::contains("API_KEY_SECRET must be set"));
    }

    #[test]
    fn test_invalid_config_file_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.toml"), "[server\nport = ").unwrap();
        course_forge(&dir)
            .args(["--config", "broken.toml", "config", "validate"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse config.toml"));
    }
}
