// Copyright 2026 Feedharvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Feedharvest runtime: browser driving, login and search flows, and the
//! scroll-and-extract harvest loop.
//!
//! This library crate exposes the modules for integration testing.

pub mod cli;
pub mod config;
pub mod flow;
pub mod harvest;
pub mod progress;
pub mod renderer;
pub mod wait;
