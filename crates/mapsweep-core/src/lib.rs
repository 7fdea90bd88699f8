pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod monitor;
pub mod partition;
pub mod progress;
pub mod results;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod sources;
pub mod storage;
pub mod worker;
