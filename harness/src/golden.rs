// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Golden values: the two answers an independent reference computation
//! produced for the same input, used as ground truth for verification.

use std::fs;

use camino::Utf8Path;

use crate::error::HarnessError;

/// The expected answers. Read once, compared once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Golden {
    pub ans1: u64,
    pub ans2: u64,
}

impl Golden {
    /// Parses the first two whitespace-separated tokens of `text` as
    /// unsigned 64-bit decimal integers. Anything after the second token is
    /// ignored, matching the reference reader.
    pub fn parse(text: &str) -> Result<Self, HarnessError> {
        let mut values = [0u64; 2];
        let mut tokens = text.split_whitespace();
        for (index, value) in values.iter_mut().enumerate() {
            let token = tokens
                .next()
                .ok_or(HarnessError::GoldenCount { found: index })?;
            *value = token.parse().map_err(|source| {
                HarnessError::GoldenParse {
                    token: token.to_string(),
                    source,
                }
            })?;
        }
        Ok(Self {
            ans1: values[0],
            ans2: values[1],
        })
    }

    /// Reads and parses the golden-results source at `path`.
    pub fn load(path: &Utf8Path) -> Result<Self, HarnessError> {
        let contents = fs::read_to_string(path).map_err(|source| {
            HarnessError::GoldenSource {
                path: path.to_owned(),
                source,
            }
        })?;
        Self::parse(&contents)
    }
}
