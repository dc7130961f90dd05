/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Tokenizers and the Bayesian scorer.
//!
//! This crate is purely computational: it turns text fragments into
//! classifier terms and combines per-term statistics into a spam
//! probability. Message parsing and persistence live elsewhere.

pub mod bayes;
pub mod tokenizers;
