//! Workflow graph editor core for chatbot conversation trees.
//!
//! A workflow is a directed graph of typed blocks (start, message, option,
//! condition, user response, end). This crate holds the data model, the
//! consistency rules that keep option and condition blocks in step, the
//! connection rules, and an editor controller with a drag engine. The
//! egui canvas lives behind the `egui` feature.
//!
//! The binary `chatflow` checks, summarizes and creates workflow files.

pub mod color;
pub mod config;
pub mod editor;
pub mod error;
pub mod graph;
pub mod integrity;
pub mod model;
pub mod rules;
pub mod store;
