// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! This crate turns (System)Verilog modules into [`ClockedDevice`]s the
//! remora driver can run: it invokes Verilator to build a shared library for
//! the module, loads it, and resolves one C accessor per port so that pins
//! and reads are plain function calls afterwards.
//!
//! [`ClockedDevice`]: remora_harness::ClockedDevice

use std::{
    collections::{hash_map::Entry, HashMap},
    ffi::OsString,
    fs,
    io::Write,
    os::fd::FromRawFd,
    sync::{LazyLock, Mutex},
    time::Instant,
};

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use libloading::Library;
use owo_colors::OwoColorize;
use snafu::{whatever, ResultExt, Whatever};

use build_library::build_library;
pub use device::VerilatedDevice;
pub use remora_harness::device::PortDirection;

mod build_library;
mod device;

/// Verilator-defined types for C FFI.
pub mod types {
    /// From the Verilator documentation: "Data representing 'bit' of 1-8 packed
    /// bits."
    pub type CData = u8;

    /// From the Verilator documentation: "Data representing 'bit' of 9-16
    /// packed bits"
    pub type SData = u16;

    /// From the Verilator documentation: "Data representing 'bit' of 17-32
    /// packed bits."
    pub type IData = u32;

    /// From the Verilator documentation: "Data representing 'bit' of 33-64
    /// packed bits."
    pub type QData = u64;
}

/// Optional configuration for creating a [`VerilatorRuntime`]. Usually, you
/// can just use [`VerilatorRuntimeOptions::default()`].
pub struct VerilatorRuntimeOptions {
    /// The name of the `verilator` executable, interpreted in some way by the
    /// OS/shell.
    pub verilator_executable: OsString,

    /// If `None`, there will be no optimization. If a value from `0` to `3`
    /// inclusive, the flag `-O<level>` will be passed. Enabling will slow
    /// compilation times.
    pub verilator_optimization: Option<usize>,

    /// Whether Verilator should always be invoked instead of only when the
    /// source files change.
    pub force_verilator_rebuild: bool,

    /// A list of warnings to disable.
    pub ignored_warnings: Vec<String>,

    /// Whether to use the log crate.
    pub log: bool,
}

impl Default for VerilatorRuntimeOptions {
    fn default() -> Self {
        Self {
            verilator_executable: "verilator".into(),
            verilator_optimization: None,
            force_verilator_rebuild: false,
            ignored_warnings: vec![],
            log: false,
        }
    }
}

impl VerilatorRuntimeOptions {
    /// The same as the [`Default`] implementation except that the log crate is
    /// used.
    pub fn default_logging() -> Self {
        Self {
            log: true,
            ..Default::default()
        }
    }
}

/// Builds and loads verilated devices, caching the underlying shared
/// libraries per (module, source path) pair.
pub struct VerilatorRuntime {
    artifact_directory: Utf8PathBuf,
    source_files: Vec<Utf8PathBuf>,
    include_directories: Vec<Utf8PathBuf>,
    options: VerilatorRuntimeOptions,
    libraries: HashMap<(String, String), Library>,
}

// The test harness captures stderr through the usual macros, but build
// progress should reach the terminal even mid-test, so these lines go
// straight to file descriptor 2.
// TODO: make cross-platform
static STDERR: LazyLock<Mutex<fs::File>> =
    LazyLock::new(|| Mutex::new(unsafe { fs::File::from_raw_fd(2) }));

macro_rules! eprintln_nocapture {
    ($($contents:tt)*) => {{
        use snafu::ResultExt;

        writeln!(
            &mut STDERR.lock().expect("poisoned"),
            $($contents)*
        )
        .whatever_context("Failed to write to non-captured stderr")
    }};
}

#[derive(Default)]
struct ThreadLocalFileLock;

/// The file_guard handles locking across processes, but does not guarantee
/// locking between threads in one process.
static THREAD_LOCK: LazyLock<DashMap<Utf8PathBuf, Mutex<ThreadLocalFileLock>>> =
    LazyLock::new(DashMap::default);

impl VerilatorRuntime {
    /// Creates a new runtime for instantiating (System)Verilog modules as
    /// devices. Every module built later must come from one of
    /// `source_files`.
    pub fn new(
        artifact_directory: &Utf8Path,
        source_files: &[&Utf8Path],
        include_directories: &[&Utf8Path],
        options: VerilatorRuntimeOptions,
    ) -> Result<Self, Whatever> {
        if options.log {
            log::info!("Validating source files");
        }
        for source_file in source_files {
            if !source_file.is_file() {
                whatever!(
                    "Source file {} does not exist or is not a file. Note that if it's a relative path, you must be in the correct directory",
                    source_file
                );
            }
        }

        Ok(Self {
            artifact_directory: artifact_directory.to_owned(),
            source_files: source_files
                .iter()
                .map(|path| path.to_path_buf())
                .collect(),
            include_directories: include_directories
                .iter()
                .map(|path| path.to_path_buf())
                .collect(),
            options,
            libraries: HashMap::new(),
        })
    }

    /// Constructs a device for the Verilog module `name` defined in
    /// `source_path`, with the signature `ports`. Uses lazy and incremental
    /// building for efficiency.
    ///
    /// You must guarantee the correctness of the supplied information:
    /// `name` is precisely the name of the module, `source_path` is the
    /// relative/absolute path to the Verilog file defining it, and `ports`
    /// is a correct subset of the module's ports (for a remora DUT, pass
    /// [`SIGNAL_CONTRACT`](remora_harness::SIGNAL_CONTRACT)).
    pub fn create_device<'ctx>(
        &'ctx mut self,
        name: &str,
        source_path: &str,
        ports: &[(&str, usize, usize, PortDirection)],
    ) -> Result<VerilatedDevice<'ctx>, Whatever> {
        let library = self
            .build_or_retrieve_library(name, source_path, ports)
            .whatever_context(
                "Failed to build or retrieve verilator dynamic library",
            )?;

        VerilatedDevice::load(library, name, ports).whatever_context(format!(
            "Failed to bind the verilated module {name} as a device"
        ))
    }

    /// Invokes verilator to build a dynamic library for the Verilog module
    /// named `name` defined in the file `source_path` and with signature
    /// `ports`.
    ///
    /// If the library is already cached for the given module name/source path
    /// pair, then it is returned immediately. Otherwise, it is rebuilt only
    /// on (a conservative definition of) change, namely, edits to Verilog
    /// source code, unless `self.options.force_verilator_rebuild` is set.
    ///
    /// # Safety
    ///
    /// This function is thread-safe.
    fn build_or_retrieve_library(
        &mut self,
        name: &str,
        source_path: &str,
        ports: &[(&str, usize, usize, PortDirection)],
    ) -> Result<&Library, Whatever> {
        if name.chars().any(|c| c == '\\' || c == ' ') {
            whatever!("Escaped module names are not supported");
        }

        if self.options.log {
            log::info!("Validating device source file");
        }
        if !self.source_files.iter().any(|source_file| {
            match (
                source_file.canonicalize_utf8(),
                Utf8Path::new(source_path).canonicalize_utf8(),
            ) {
                (Ok(lhs), Ok(rhs)) => lhs == rhs,
                _ => false,
            }
        }) {
            whatever!("Module `{}` requires source file {}, which was not provided to the runtime", name, source_path);
        }

        if let Some((port, _, _, _)) =
            ports.iter().find(|(_, msb, lsb, _)| msb < lsb)
        {
            whatever!(
                "Port {} on module {} was specified with the high bit less than the low bit",
                port,
                name
            );
        }
        if let Some((port, _, _, _)) =
            ports.iter().find(|(_, msb, lsb, _)| msb + 1 - lsb > 64)
        {
            whatever!(
                "Port {} on module {} is greater than 64 bits",
                port,
                name
            );
        }

        if let Entry::Vacant(entry) = self
            .libraries
            .entry((name.to_string(), source_path.to_string()))
        {
            let local_directory_name = format!(
                "{name}_{}",
                source_path.replace("_", "__").replace("/", "_")
            );
            let local_artifacts_directory =
                self.artifact_directory.join(&local_directory_name);

            if self.options.log {
                log::info!(
                    "Creating artifacts directory {}",
                    local_artifacts_directory
                );
            }
            fs::create_dir_all(&local_artifacts_directory).whatever_context(
                format!(
                    "Failed to create artifacts directory {}",
                    local_artifacts_directory,
                ),
            )?;

            eprintln_nocapture!(
                "{} waiting for file lock on build directory",
                "    Blocking".bold().cyan(),
            )?;

            // build_library is not thread-safe, so the directory is locked
            // across processes (file_guard) and across threads (THREAD_LOCK)
            if self.options.log {
                log::info!("Acquiring file lock on artifact directory");
            }
            let file_lock = fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(self.artifact_directory.join(format!("{local_directory_name}.lock")))
                .whatever_context(
                    "Failed to open file lock file for artifacts directory (this is not the actual lock itself, it is an I/O error)",
                )?;

            let _file_lock =
                file_guard::lock(&file_lock, file_guard::Lock::Exclusive, 0, 1)
                    .whatever_context(
                        "Failed to acquire file lock for artifacts directory",
                    )?;

            let thread_mutex = THREAD_LOCK
                .entry(local_artifacts_directory.clone())
                .or_default();
            let Ok(_thread_lock) = thread_mutex.lock() else {
                whatever!("Failed to acquire thread-local lock for artifacts directory");
            };

            eprintln_nocapture!(
                "{} {} ({})",
                "   Compiling".bold().green(),
                name,
                source_path
            )?;
            let start = Instant::now();

            if self.options.log {
                log::info!("Building the dynamic library with verilator");
            }
            let library_path = build_library(
                &self.source_files,
                &self.include_directories,
                name,
                ports,
                &local_artifacts_directory,
                &self.options,
            )
            .whatever_context("Failed to build verilator dynamic library")?;

            if self.options.log {
                log::info!("Opening the dynamic library");
            }
            let library = unsafe { Library::new(library_path) }
                .whatever_context("Failed to load verilator dynamic library")?;

            entry.insert(library);

            let end = Instant::now();
            let duration = end - start;
            eprintln_nocapture!(
                "{} `verilator-{}` profile target(s) in {}.{:02}s",
                "    Finished".bold().green(),
                self.options
                    .verilator_optimization
                    .map(|level| format!("O{level}"))
                    .unwrap_or("unoptimized".into()),
                duration.as_secs(),
                duration.subsec_millis() / 10
            )?;
        }

        Ok(self
            .libraries
            .get(&(name.to_string(), source_path.to_string()))
            .expect(
                "If it didn't exist, we just inserted it into the hash map",
            ))
    }
}
