// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod common;
pub mod verify_tests;
