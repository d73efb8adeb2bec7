pub mod commands;
pub mod telemetry;
