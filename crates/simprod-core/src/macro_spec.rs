// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Parsing of a request's selected macro lines.
//!
//! Each line describes one simulation unit:
//!
//! ```text
//! <macro-path> <njobs> <nevents> <seed>
//! ```
//!
//! The parsed result is column-oriented: the backend splits a job into units
//! by zipping the four lists, so every list must have the same length.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of whitespace-separated fields in a macro spec line.
const FIELDS_PER_LINE: usize = 4;

/// Reasons a macro specification cannot be turned into a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacroSpecError {
    /// The specification contains no macro lines.
    #[error("no macro lines selected")]
    Empty,

    /// A line does not have the same number of fields as the others.
    #[error("line {line} has {found} fields, expected {expected}")]
    FieldCount {
        /// 1-based line number.
        line: usize,
        /// Number of fields found.
        found: usize,
        /// Number of fields expected.
        expected: usize,
    },

    /// An integer column could not be parsed.
    #[error("line {line}: invalid {field} value '{value}'")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// Column name.
        field: &'static str,
        /// Offending text.
        value: String,
    },
}

/// Column-aligned macro specification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MacroSpec {
    /// Macro paths, relative to the macro repository root.
    pub macros: Vec<String>,
    /// Number of grid jobs per macro.
    pub njobs: Vec<u32>,
    /// Number of events per job.
    pub nevents: Vec<u64>,
    /// Random seed per macro.
    pub seeds: Vec<i64>,
}

impl MacroSpec {
    /// Parse newline-delimited macro spec lines. Blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, MacroSpecError> {
        let mut spec = MacroSpec::default();

        for (index, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let line_no = index + 1;

            if fields.len() != FIELDS_PER_LINE {
                return Err(MacroSpecError::FieldCount {
                    line: line_no,
                    found: fields.len(),
                    expected: FIELDS_PER_LINE,
                });
            }

            spec.macros.push(fields[0].to_string());
            spec.njobs.push(parse_field(line_no, "njobs", fields[1])?);
            spec.nevents.push(parse_field(line_no, "nevents", fields[2])?);
            spec.seeds.push(parse_field(line_no, "seed", fields[3])?);
        }

        if spec.macros.is_empty() {
            return Err(MacroSpecError::Empty);
        }

        Ok(spec)
    }

    /// Number of simulation units.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Whether the spec has no units.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Total number of grid jobs across all units.
    pub fn total_jobs(&self) -> u64 {
        self.njobs.iter().map(|n| u64::from(*n)).sum()
    }
}

fn parse_field<T: std::str::FromStr>(
    line: usize,
    field: &'static str,
    value: &str,
) -> Result<T, MacroSpecError> {
    value.parse().map_err(|_| MacroSpecError::InvalidNumber {
        line,
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aligned_lines() {
        let spec = MacroSpec::parse(
            "BackgroundMacros/Kr85.mac 10 1000 42\nBackgroundMacros/Rn222.mac 5 200 7\n",
        )
        .unwrap();

        assert_eq!(spec.len(), 2);
        assert_eq!(
            spec.macros,
            vec!["BackgroundMacros/Kr85.mac", "BackgroundMacros/Rn222.mac"]
        );
        assert_eq!(spec.njobs, vec![10, 5]);
        assert_eq!(spec.nevents, vec![1000, 200]);
        assert_eq!(spec.seeds, vec![42, 7]);
        assert_eq!(spec.total_jobs(), 15);
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace_and_blank_lines() {
        let spec = MacroSpec::parse("\n  a.mac\t1   2 3  \n\n").unwrap();
        assert_eq!(spec.macros, vec!["a.mac"]);
        assert_eq!(spec.seeds, vec![3]);
    }

    #[test]
    fn test_mismatched_field_counts_are_malformed() {
        let err = MacroSpec::parse("a.mac 1 2\nb.mac 3 4 5 6").unwrap_err();
        assert_eq!(
            err,
            MacroSpecError::FieldCount {
                line: 1,
                found: 3,
                expected: 4
            }
        );
    }

    #[test]
    fn test_too_many_fields_is_malformed() {
        let err = MacroSpec::parse("a.mac 1 2 3\nb.mac 3 4 5 6").unwrap_err();
        assert!(matches!(err, MacroSpecError::FieldCount { line: 2, found: 5, .. }));
    }

    #[test]
    fn test_non_integer_column() {
        let err = MacroSpec::parse("a.mac many 2 3").unwrap_err();
        assert_eq!(
            err,
            MacroSpecError::InvalidNumber {
                line: 1,
                field: "njobs",
                value: "many".to_string()
            }
        );
    }

    #[test]
    fn test_empty_spec() {
        assert_eq!(MacroSpec::parse("").unwrap_err(), MacroSpecError::Empty);
        assert_eq!(MacroSpec::parse(" \n\n").unwrap_err(), MacroSpecError::Empty);
    }
}
