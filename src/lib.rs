//! # archive-decompiler
//!
//! Batch decompilation of Java deployments: JAR and WAR archives (including
//! Spring Boot fat jars and nested library jars), directories of class files,
//! and single class files.
//!
//! ## Architecture
//!
//! - **filter**: business-code filtering of class paths and library jars
//! - **extract**: zip extraction into scratch directories with a zip-slip guard
//! - **scan**: directory walks that classify classes, jars, wars and resources
//! - **dispatch**: per-archive state machine and the bounded worker pool
//! - **cfr**: the `Decompiler` capability and its CFR implementation
//! - **report**: concurrent result aggregation and the live progress line
//! - **render**: JSON and HTML report files
//! - **unicode**: decoding of unicode escapes in generated sources
//! - **pipeline**: one complete run from input classification to reports
//! - **config**, **cli**, **logging**: the command-line front end

pub mod cfr;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod filter;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod scan;
pub mod unicode;
