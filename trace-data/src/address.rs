// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path of child indices locating a call inside its transaction's call
/// tree. The empty path is the root call.
///
/// Ordering is component-wise numeric, so `[0, 2]` sorts before `[0, 10]`
/// and a path sorts before every path it prefixes.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct TraceAddress(Vec<usize>);

/// A trace address component that is not a non-negative integer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid trace address component {component:?} at index {index}")]
pub struct AddressParseError {
    pub component: String,
    pub index: usize,
    #[source]
    pub source: ParseIntError,
}

impl TraceAddress {
    pub fn new(path: Vec<usize>) -> Self {
        Self(path)
    }

    pub fn root() -> Self {
        Self::default()
    }

    /// Nesting depth of the call, `0` for the root call.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }

    /// Parses the textual form stored in the trace table (`[0,1]`,
    /// `[ 0, 1 ]`, `[]` or the empty string) without failing.
    ///
    /// Every component that is not a number is reported to `on_error` and
    /// recorded as `0`, so the depth of the resulting path always matches
    /// the number of components in `text`.
    pub fn parse_lossy<F>(text: &str, mut on_error: F) -> Self
    where
        F: FnMut(AddressParseError),
    {
        let stripped: String = text
            .chars()
            .filter(|c| !matches!(c, '[' | ']') && !c.is_whitespace())
            .collect();

        if stripped.is_empty() {
            return Self::root();
        }

        let path = stripped
            .split(',')
            .enumerate()
            .map(|(index, component)| {
                component.parse::<usize>().unwrap_or_else(|source| {
                    on_error(AddressParseError {
                        component: component.to_string(),
                        index,
                        source,
                    });
                    0
                })
            })
            .collect();

        Self(path)
    }
}

impl FromStr for TraceAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut first_error = None;
        let address = Self::parse_lossy(s, |e| {
            first_error.get_or_insert(e);
        });
        match first_error {
            Some(e) => Err(e),
            None => Ok(address),
        }
    }
}

impl fmt::Display for TraceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{component}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for TraceAddress {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parse(text: &str) -> Vec<usize> {
        TraceAddress::parse_lossy(text, |e| panic!("unexpected {e}"))
            .into_inner()
    }

    #[test]
    fn empty_text_is_root() {
        assert_eq!(parse(""), Vec::<usize>::new());
        assert_eq!(parse("[]"), Vec::<usize>::new());
        assert_eq!(parse("[ ]"), Vec::<usize>::new());
    }

    #[test]
    fn parses_nested_path() {
        assert_eq!(parse("[0,2,1]"), vec![0, 2, 1]);
        assert_eq!(parse("[ 0, 2 ]"), vec![0, 2]);
        assert_eq!(parse("7"), vec![7]);
    }

    #[test]
    fn bad_component_keeps_depth() {
        let mut errors = vec![];
        let address =
            TraceAddress::parse_lossy("[1,x,3]", |e| errors.push(e));

        assert_eq!(address.as_slice(), &[1, 0, 3]);
        assert_eq!(address.depth(), 3);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].component, "x");
        assert_eq!(errors[0].index, 1);
    }

    #[test]
    fn strict_parse_reports_first_error() {
        assert_matches!(
            "[0,a,b]".parse::<TraceAddress>(),
            Err(AddressParseError { index: 1, .. })
        );
        assert_matches!("[-1]".parse::<TraceAddress>(), Err(_));
        assert_eq!(
            "[4,5]".parse::<TraceAddress>().unwrap(),
            TraceAddress::new(vec![4, 5])
        );
    }

    #[test]
    fn orders_numerically() {
        let mut addresses: Vec<TraceAddress> =
            ["[0,10]", "[0,2]", "[]", "[0]", "[1]", "[0,2,0]"]
                .iter()
                .map(|s| s.parse().unwrap())
                .collect();
        addresses.sort();

        let rendered: Vec<String> =
            addresses.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["[]", "[0]", "[0,2]", "[0,2,0]", "[0,10]", "[1]"]
        );
    }

    #[test]
    fn serializes_as_plain_array() {
        let address = TraceAddress::new(vec![0, 3]);
        assert_eq!(serde_json::to_string(&address).unwrap(), "[0,3]");
    }
}
