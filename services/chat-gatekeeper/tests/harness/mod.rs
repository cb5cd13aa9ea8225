// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for chat gatekeeper attack simulation.
//!
//! This module provides utilities for simulating abusive senders against
//! the admission pipeline and the web-app signature check.

pub mod attacks;
pub mod generators;
pub mod metrics;
