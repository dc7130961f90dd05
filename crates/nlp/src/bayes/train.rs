/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::collections::BTreeSet;

use crate::tokenizers::Term;

/// Collapses a token stream to one vote per distinct term.
///
/// Training and scoring both count a term at most once per message, no
/// matter how often it appears. The result is sorted, which fixes the
/// traversal order for store updates and scoring alike.
pub fn collapse_votes<I>(tokens: I) -> Vec<Term>
where
    I: IntoIterator<Item = Term>,
{
    tokens
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
