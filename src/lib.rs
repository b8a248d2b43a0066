#![allow(unused_assignments)] // thiserror/miette proc macros trigger false positives

pub mod cli;
pub mod config;
pub mod error;
pub mod inventory;
pub mod invoke;
pub mod listing;
pub mod logging;
pub mod ownership;
pub mod render;
