//! CLI infrastructure for the gridchase toolkit
//!
//! This module provides the command-line interface for building reward
//! matrices, training the pursuer agent, and playing against a trained
//! Q matrix.

pub mod commands;
pub mod output;
