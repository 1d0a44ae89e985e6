// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! The simulation driver. It advances a [`ClockedDevice`] through a strictly
//! linear run: reset, stimulus injection, drain, completion wait, and
//! verification against golden values.

use crate::{device::ClockedDevice, error::HarnessError, golden::Golden};

/// Completion-wait bound used when none is configured. Large enough for any
/// reasonable device, small enough that a wedged one fails the same day.
pub const DEFAULT_MAX_WAIT_CYCLES: u64 = 50_000_000;

/// Optional configuration for a [`Driver`]. Usually, you can just use
/// [`DriverOptions::default()`].
pub struct DriverOptions {
    /// Bound on the cycle counter before the completion wait gives up. The
    /// counter includes injection cycles, so this bounds the whole
    /// post-reset run.
    pub max_wait_cycles: u64,

    /// Whether to use the log crate.
    pub log: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            max_wait_cycles: DEFAULT_MAX_WAIT_CYCLES,
            log: false,
        }
    }
}

impl DriverOptions {
    /// The same as the [`Default`] implementation except that the log crate
    /// is used.
    pub fn default_logging() -> Self {
        Self {
            log: true,
            ..Default::default()
        }
    }
}

/// How the completion wait ended. Both exits lead to verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The device asserted `finished` with the cycle counter at `cycles`.
    Finished { cycles: u64 },
    /// The cycle counter reached the configured bound first. The answer
    /// registers hold whatever the device last latched.
    TimedOut { cycles: u64 },
}

impl WaitOutcome {
    pub fn cycles(&self) -> u64 {
        match *self {
            Self::Finished { cycles } | Self::TimedOut { cycles } => cycles,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// One answer register judged against its golden value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    pub actual: u64,
    pub expected: u64,
}

impl Comparison {
    /// Exact unsigned equality. No tolerance, no rounding.
    pub fn passed(&self) -> bool {
        self.actual == self.expected
    }
}

/// The verdict of a run: two independent judgments plus whether the wait
/// timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub ans1: Comparison,
    pub ans2: Comparison,
    pub timed_out: bool,
}

impl Verification {
    /// Whether the run as a whole succeeded: both comparisons pass and the
    /// device finished within the cycle budget. A timeout fails the run even
    /// if the latched values happen to match.
    pub fn passed(&self) -> bool {
        self.ans1.passed() && self.ans2.passed() && !self.timed_out
    }
}

/// Drives a [`ClockedDevice`] through one complete run. The phases are
/// exposed individually for tests and tooling; [`Driver::run`] applies them
/// in the only valid order.
pub struct Driver<D: ClockedDevice> {
    device: D,
    options: DriverOptions,
    cycle: u64,
}

impl<D: ClockedDevice> Driver<D> {
    /// Takes exclusive ownership of `device` for the lifetime of the run.
    pub fn new(device: D, options: DriverOptions) -> Self {
        Self {
            device,
            options,
            cycle: 0,
        }
    }

    /// Clock cycles elapsed since reset completed. Monotonic; never resets
    /// mid-run.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Releases the device, e.g. for post-run inspection.
    pub fn into_device(self) -> D {
        self.device
    }

    /// One full clock period: drive `clock` low then high, evaluating after
    /// each edge. The sole unit of time advancement.
    fn tick(&mut self) -> Result<(), HarnessError> {
        self.device.pin("clock", 0u8)?;
        self.device.eval();
        self.device.pin("clock", 1u8)?;
        self.device.eval();
        Ok(())
    }

    /// Establishes a well-defined initial device state: `clear` asserted for
    /// one cycle with `valid_in` low, then released for one cycle. The
    /// device must be quiescent (not asserting `finished`) afterwards; the
    /// driver relies on this without checking it. Neither cycle counts
    /// toward the cycle counter.
    pub fn reset(&mut self) -> Result<(), HarnessError> {
        if self.options.log {
            log::info!("Resetting device");
        }
        self.device.pin("clear", 1u8)?;
        self.device.pin("valid_in", 0u8)?;
        self.tick()?;
        self.device.pin("clear", 0u8)?;
        self.tick()?;
        Ok(())
    }

    /// Streams `lines` into the device in order, one byte per cycle with
    /// `valid_in` asserted, appending a synthetic `\n` to every line. After
    /// each line's newline the driver holds the stimulus for one further
    /// cycle, during which a conforming device commits the line to internal
    /// storage (see
    /// [`SIGNAL_CONTRACT`](crate::device::SIGNAL_CONTRACT)). Every cycle
    /// here counts toward the cycle counter.
    pub fn inject<I, S>(&mut self, lines: I) -> Result<(), HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.options.log {
            log::info!("Injecting stimulus");
        }
        for line in lines {
            for byte in
                line.as_ref().bytes().chain(std::iter::once(b'\n'))
            {
                self.device.pin("char_in", byte)?;
                self.device.pin("valid_in", 1u8)?;
                self.tick()?;
                self.cycle += 1;
            }
            // line-commit cycle, stimulus held at its last-driven values
            self.tick()?;
            self.cycle += 1;
        }
        if self.options.log {
            log::info!("Injected stimulus over {} cycles", self.cycle);
        }
        Ok(())
    }

    /// Deasserts `valid_in` and issues one final cycle, ending the stimulus
    /// phase. Happens even when the input was empty.
    pub fn drain(&mut self) -> Result<(), HarnessError> {
        self.device.pin("valid_in", 0u8)?;
        self.tick()?;
        self.cycle += 1;
        Ok(())
    }

    /// Ticks the device until it asserts `finished` or the cycle counter
    /// reaches the configured bound, whichever comes first. Blocking and
    /// synchronous: simulation is lock-step with the driver, so there is no
    /// useful work to overlap with it.
    pub fn wait_for_finish(&mut self) -> Result<WaitOutcome, HarnessError> {
        if self.options.log {
            log::info!(
                "Waiting for `finished` (bound: {} cycles)",
                self.options.max_wait_cycles
            );
        }
        while !self.finished()? && self.cycle < self.options.max_wait_cycles {
            self.tick()?;
            self.cycle += 1;
        }
        if self.finished()? {
            if self.options.log {
                log::info!("Device finished at cycle {}", self.cycle);
            }
            Ok(WaitOutcome::Finished { cycles: self.cycle })
        } else {
            if self.options.log {
                log::warn!("Timed out at cycle {}", self.cycle);
            }
            Ok(WaitOutcome::TimedOut { cycles: self.cycle })
        }
    }

    fn finished(&self) -> Result<bool, HarnessError> {
        Ok(self.device.read("finished")?.as_u64() != 0)
    }

    /// Reads both answer registers and judges each independently against
    /// `golden`. Performed regardless of how the wait ended: on a timeout
    /// the comparison still runs against whatever values are latched.
    pub fn verify(
        &self,
        golden: &Golden,
        outcome: WaitOutcome,
    ) -> Result<Verification, HarnessError> {
        let ans1 = self.device.read("ans1")?.as_u64();
        let ans2 = self.device.read("ans2")?.as_u64();
        if self.options.log {
            log::info!("Device answers: ans1={ans1}, ans2={ans2}");
        }
        Ok(Verification {
            ans1: Comparison {
                actual: ans1,
                expected: golden.ans1,
            },
            ans2: Comparison {
                actual: ans2,
                expected: golden.ans2,
            },
            timed_out: outcome.timed_out(),
        })
    }

    /// Applies every phase in order: reset, injection, drain, wait, verify.
    pub fn run<I, S>(
        &mut self,
        lines: I,
        golden: &Golden,
    ) -> Result<Verification, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.reset()?;
        self.inject(lines)?;
        self.drain()?;
        let outcome = self.wait_for_finish()?;
        self.verify(golden, outcome)
    }
}
