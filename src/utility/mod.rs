//! Helpers shared by the tasks.
pub mod bitmap;
pub mod string_utils;
