//! Test module for roomcast-core
//!
//! This module contains tests for:
//! - Event routing across product and essential rooms
//! - Room sessions without a live connection (pending joins, leave, state)
//! - Configuration loading and defaults

mod fixtures;
mod router_tests;
