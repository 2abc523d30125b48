//! Toolchain boundary
//!
//! The pipeline never spawns processes itself; it hands each [`Invocation`]
//! to a [`Toolchain`]. Tests substitute a recording implementation.

use crate::targets::Invocation;
use std::io;
use std::process::Command;
use tracing::debug;

/// Exit status reported for a compiler killed by a signal
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// Runs compiler invocations
pub trait Toolchain {
    /// Run `invocation` to completion and return its exit code
    ///
    /// An `Err` means the compiler could not be launched at all.
    fn invoke(&mut self, invocation: &Invocation) -> io::Result<i32>;
}

impl<T: Toolchain + ?Sized> Toolchain for Box<T> {
    fn invoke(&mut self, invocation: &Invocation) -> io::Result<i32> {
        (**self).invoke(invocation)
    }
}

/// Toolchain that runs the compiler as a child process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessToolchain;

impl ProcessToolchain {
    pub fn new() -> Self {
        Self
    }
}

impl Toolchain for ProcessToolchain {
    fn invoke(&mut self, invocation: &Invocation) -> io::Result<i32> {
        debug!(
            program = %invocation.program,
            cwd = %invocation.cwd.display(),
            "spawning compiler"
        );
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .status()?;
        Ok(status.code().unwrap_or(SIGNAL_EXIT_CODE))
    }
}
