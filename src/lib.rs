// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! flashguard: staged firmware verification and first-run filesystem gating.

pub mod config;
pub mod error;
pub mod types;
pub mod storage;
pub mod image;
pub mod verify;
pub mod bootsec;
pub mod corrupt;
pub mod dfu;
pub mod update;
pub mod setup;

pub use error::{FlashError, Result};

#[cfg(test)]
pub mod tests;
