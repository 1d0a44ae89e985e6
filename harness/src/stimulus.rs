// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Loading the input stream: newline-delimited lines of single-byte text,
//! consumed exactly once, front to back.

use std::fs;

use camino::Utf8Path;

use crate::error::HarnessError;

/// Reads the input source at `path` into owned lines, without their
/// delimiters. The driver re-appends a synthetic `\n` to every line at
/// injection time, so the device sees each delimiter exactly once.
pub fn load_lines(path: &Utf8Path) -> Result<Vec<String>, HarnessError> {
    let contents = fs::read_to_string(path).map_err(|source| {
        HarnessError::InputSource {
            path: path.to_owned(),
            source,
        }
    })?;
    Ok(contents.lines().map(str::to_owned).collect())
}
