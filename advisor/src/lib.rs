//! macrofolio-advisor: command-line front end for macrofolio.
//!
//! Reads market data from local CSV/JSON files, classifies the macro
//! scenario, screens a watch-list, splits a monthly contribution across the
//! optimized candidates and replays the strategy historically. Every run is
//! appended to a JSONL journal.

pub mod config;
pub mod data;
pub mod error;
pub mod journal;
pub mod pipeline;
pub mod report;
