// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::{io, num::ParseIntError};

use camino::Utf8PathBuf;
use snafu::Snafu;

use crate::device::DeviceError;

/// Fatal driver-level failures. Timeouts and golden mismatches are not
/// errors; they are recorded in [`Verification`](crate::Verification).
#[derive(Debug, Snafu)]
pub enum HarnessError {
    #[snafu(display("Could not read input stimulus from {path}"))]
    InputSource {
        path: Utf8PathBuf,
        source: io::Error,
    },
    #[snafu(display("Could not read golden results from {path}"))]
    GoldenSource {
        path: Utf8PathBuf,
        source: io::Error,
    },
    #[snafu(display(
        "Expected two unsigned 64-bit integers in the golden results, but found only {found}"
    ))]
    GoldenCount { found: usize },
    #[snafu(display(
        "Failed to parse golden results token `{token}` as an unsigned 64-bit integer"
    ))]
    GoldenParse {
        token: String,
        source: ParseIntError,
    },
    #[snafu(context(false))]
    #[snafu(display("Device rejected an access required by the signal contract"))]
    Device { source: DeviceError },
}
