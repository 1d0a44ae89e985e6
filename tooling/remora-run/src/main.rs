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

use std::{env, fs, time::Duration};

use argh::FromArgs;
use camino::Utf8PathBuf;
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use remora::{
    harness::{
        stimulus, Comparison, Driver, DriverOptions, Golden, SIGNAL_CONTRACT,
        DEFAULT_MAX_WAIT_CYCLES,
    },
    verilator::{VerilatorRuntime, VerilatorRuntimeOptions},
};
use snafu::{whatever, OptionExt, ResultExt, Whatever};

/// Drive a verilated device against golden results, as described by a
/// remora.toml manifest
#[derive(FromArgs)]
struct RemoraRunCommand {
    /// path to the manifest (defaults to remora.toml in the current
    /// directory)
    #[argh(option, short = 'm')]
    manifest: Option<Utf8PathBuf>,

    /// directory for verilated build artifacts (defaults to artifacts/)
    #[argh(option)]
    artifacts: Option<Utf8PathBuf>,

    /// override the completion-wait cycle bound from the manifest
    #[argh(option)]
    max_cycles: Option<u64>,
}

struct Manifest {
    device_name: String,
    device_source: Utf8PathBuf,
    input: Utf8PathBuf,
    golden: Utf8PathBuf,
    max_cycles: Option<u64>,
}

fn required_string(
    manifest: &toml::Value,
    section: &str,
    key: &str,
) -> Result<String, Whatever> {
    manifest
        .get(section)
        .and_then(|table| table.get(key))
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
        .whatever_context(format!(
            "Missing `{key}` string under [{section}] in the manifest"
        ))
}

fn parse_manifest(manifest: &toml::Value) -> Result<Manifest, Whatever> {
    let max_cycles = match manifest
        .get("test")
        .and_then(|test| test.get("max-cycles"))
    {
        None => None,
        Some(value) => {
            let cycles = value.as_integer().whatever_context(
                "`max-cycles` under [test] in the manifest is not an integer",
            )?;
            if cycles < 0 {
                whatever!("`max-cycles` under [test] in the manifest must be nonnegative");
            }
            Some(cycles as u64)
        }
    };

    Ok(Manifest {
        device_name: required_string(manifest, "device", "name")?,
        device_source: required_string(manifest, "device", "source")?.into(),
        input: required_string(manifest, "test", "input")?.into(),
        golden: required_string(manifest, "test", "golden")?.into(),
        max_cycles,
    })
}

fn report(part: usize, comparison: &Comparison) {
    if comparison.passed() {
        println!(
            "        {} Part {}: hardware {} matches golden {}",
            "PASS".bold().bright_green(),
            part,
            comparison.actual,
            comparison.expected
        );
    } else {
        eprintln!(
            "        {} Part {}: expected {} but got {}",
            "FAIL".bold().bright_red(),
            part,
            comparison.expected,
            comparison.actual
        );
    }
}

#[snafu::report]
fn main() -> Result<(), Whatever> {
    if env::var("RUST_LOG").is_ok() {
        env_logger::init();
    }

    let command: RemoraRunCommand = argh::from_env();

    let manifest_path = command
        .manifest
        .unwrap_or_else(|| "remora.toml".into());
    let manifest_contents =
        fs::read_to_string(&manifest_path).whatever_context(format!(
            "Failed to read manifest at {manifest_path}"
        ))?;
    let manifest: toml::Value = toml::from_str(&manifest_contents)
        .whatever_context(format!(
            "Failed to parse manifest at {manifest_path}"
        ))?;
    let manifest = parse_manifest(&manifest)?;

    // both external sources are validated before any simulation time is
    // spent
    let lines = stimulus::load_lines(&manifest.input)
        .whatever_context("Failed to load the input stimulus")?;
    let golden = Golden::load(&manifest.golden)
        .whatever_context("Failed to load the golden results")?;

    let artifacts = command
        .artifacts
        .unwrap_or_else(|| "artifacts".into());
    let mut runtime = VerilatorRuntime::new(
        &artifacts,
        &[manifest.device_source.as_path()],
        &[],
        VerilatorRuntimeOptions::default_logging(),
    )?;
    let device = runtime.create_device(
        &manifest.device_name,
        manifest.device_source.as_str(),
        SIGNAL_CONTRACT,
    )?;

    let options = DriverOptions {
        max_wait_cycles: command
            .max_cycles
            .or(manifest.max_cycles)
            .unwrap_or(DEFAULT_MAX_WAIT_CYCLES),
        ..DriverOptions::default()
    };
    let mut driver = Driver::new(device, options);

    driver.reset().whatever_context("Failed to reset the device")?;
    driver
        .inject(&lines)
        .whatever_context("Failed to inject stimulus")?;
    driver.drain().whatever_context("Failed to drain stimulus")?;

    println!(
        "{} {} ({})",
        "  Simulating".bold().cyan(),
        manifest.device_name,
        manifest.device_source
    );
    let spinner = ProgressBar::new_spinner().with_message("Simulating");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let outcome = driver
        .wait_for_finish()
        .whatever_context("Failed while waiting for the device to finish")?;
    spinner.finish_and_clear();

    if outcome.timed_out() {
        println!(
            "{} after {} cycles without `finished`",
            "TIMEOUT".bold().yellow(),
            outcome.cycles()
        );
    } else {
        println!("Finished in {} cycles.", outcome.cycles());
    }

    let verification = driver
        .verify(&golden, outcome)
        .whatever_context("Failed to read the answer registers")?;
    report(1, &verification.ans1);
    report(2, &verification.ans2);

    if !verification.passed() {
        whatever!("Exiting due to failed verification");
    }

    Ok(())
}
