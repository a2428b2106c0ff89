pub mod job;
pub mod logging;
pub mod run;
pub mod upsert_clap;
