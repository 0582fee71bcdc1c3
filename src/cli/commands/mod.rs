//! CLI command implementations.

mod apply;
mod backup;
mod config;
mod doctor;
mod review;
mod run;

pub use apply::run_apply;
pub use backup::run_backup;
pub use config::run_config;
pub use doctor::run_doctor;
pub use review::run_review;
pub use run::run_pipeline;
