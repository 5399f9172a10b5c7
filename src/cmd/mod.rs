//! CLI command implementations.
//!
//! | Module   | Commands handled             |
//! |----------|------------------------------|
//! | `serve`  | `Serve`                      |
//! | `db`     | `InitDb`, `SeedExamples`     |
//! | `config` | `Config`                     |

pub mod config;
pub mod db;
pub mod serve;

pub use config::cmd_config;
pub use db::{cmd_init_db, cmd_seed_examples};
pub use serve::cmd_serve;
