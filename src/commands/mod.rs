pub mod answer;
pub mod debug_db;
pub mod endpoints;
pub mod exit_tax;
pub mod ping;
pub mod snapshot;
pub mod sync;
pub mod track;
