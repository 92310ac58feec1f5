// ABOUTME: Core types and constants for the course chat relay
// ABOUTME: Foundation crate with the error taxonomy, classifier, and service constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Course Chat Core
//!
//! Foundation crate shared by the chat relay. It holds the pieces that change
//! rarely and carry no I/O: the closed error taxonomy, the ordered
//! classification rules that turn raw upstream failures into stable error
//! kinds, and the constants the service advertises.
//!
//! ## Modules
//!
//! - **errors**: `ErrorType`, `Severity`, `ClassifiedError`, the rule chain and HTTP mapping
//! - **constants**: service identity, limits, and header names

/// Error taxonomy, classification, and response bodies
pub mod errors;

/// Service-wide constants organized by domain
pub mod constants;
