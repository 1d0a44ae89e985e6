// Copyright (C) 2025 Ethan Uppal.
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3 of the License only.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use std::env;

use remora::{
    harness::{stimulus, Driver, DriverOptions, Golden, SIGNAL_CONTRACT},
    verilator::{VerilatorRuntime, VerilatorRuntimeOptions},
};
use snafu::{whatever, ResultExt, Whatever};

#[snafu::report]
fn main() -> Result<(), Whatever> {
    if env::var("RUST_LOG").is_ok() {
        env_logger::init();
    }

    let mut runtime = VerilatorRuntime::new(
        "artifacts".as_ref(),
        &["src/char_count.sv".as_ref()],
        &[],
        VerilatorRuntimeOptions::default_logging(),
    )?;

    let device = runtime.create_device(
        "char_count",
        "src/char_count.sv",
        SIGNAL_CONTRACT,
    )?;

    let lines = stimulus::load_lines("test/input.txt".as_ref())
        .whatever_context("input")?;
    let golden = Golden::load("test/golden_results.txt".as_ref())
        .whatever_context("golden")?;

    let mut driver = Driver::new(device, DriverOptions::default_logging());
    let verification =
        driver.run(&lines, &golden).whatever_context("run")?;

    println!(
        "hardware: {} {} / golden: {} {}",
        verification.ans1.actual,
        verification.ans2.actual,
        verification.ans1.expected,
        verification.ans2.expected
    );

    if !verification.passed() {
        whatever!("char_count disagreed with the golden results");
    }

    Ok(())
}
