//! Tourguide - guided step-by-step walkthroughs over a page document
//!
//! The library resolves an ordered step sequence from page markup or a
//! caller-supplied list, navigates it forward and backward with conditional
//! skips, and keeps the highlighted element in step with the live document.

pub mod config;
pub mod dom;
pub mod logging;
pub mod tour;
