// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Natural (numeric-aware) string ordering for tag names.
//!
//! Runs of ASCII digits compare by numeric value, everything else compares
//! byte-wise, so `v1.10` sorts after `v1.2`.

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

impl Ord for Chunk<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Chunk::Digits(a), Chunk::Digits(b)) => cmp_digits(a, b),
            (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Chunk<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare digit runs by value without overflowing on long runs.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn chunks(s: &str) -> impl Iterator<Item = Chunk<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(if digits {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    })
}

/// Natural ordering of two strings.
///
/// Strings that are naturally equal but differ in leading zeros fall back to
/// byte order, so the ordering is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    chunks(a).cmp(chunks(b)).then_with(|| a.cmp(b))
}

/// Sort in descending natural order, newest-looking tag first.
pub fn sort_descending<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| natural_cmp(b.as_ref(), a.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_runs_compare_by_value() {
        assert_eq!(natural_cmp("v1.2", "v1.10"), Ordering::Less);
        assert_eq!(natural_cmp("v2", "v10"), Ordering::Less);
        assert_eq!(natural_cmp("v1.10", "v1.10"), Ordering::Equal);
        assert_eq!(natural_cmp("release-9", "release-10a"), Ordering::Less);
    }

    #[test]
    fn test_sort_descending() {
        let mut tags = vec!["v1.2", "v1.10", "v1.1"];
        sort_descending(&mut tags);
        assert_eq!(tags, vec!["v1.10", "v1.2", "v1.1"]);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(natural_cmp("v1", "v1.0"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn test_leading_zeros_are_a_tie_break() {
        assert_eq!(natural_cmp("v01", "v1"), Ordering::Less);
        assert_eq!(natural_cmp("v002", "v10"), Ordering::Less);
    }

    #[test]
    fn test_long_digit_runs() {
        assert_eq!(
            natural_cmp("build-99999999999999999999999", "build-100000000000000000000000"),
            Ordering::Less
        );
    }
}
