// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod block;
pub mod region;

pub use block::{BlockLocation, BlockMap};
pub use region::RegionDescriptor;
