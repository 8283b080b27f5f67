//! termshim - raw terminal control primitives
//!
//! Thin wrappers over POSIX terminal and signal APIs for interactive tools
//! (line editors, history search, REPLs):
//!
//! - `terminal`: raw mode on/off, window size, input queue injection
//! - `signal`: blocking SIGINT so it can be waited on synchronously
//! - `config`: options for how the primitives behave
//!
//! State that a C shim would keep in globals (the saved termios snapshot,
//! the last error) lives in the caller's `Terminal` value and in the
//! returned `Result`.

#[cfg(not(unix))]
compile_error!("termshim only supports unix-like targets");

pub mod config;
pub mod error;
pub mod signal;
pub mod size;
pub mod terminal;

pub use config::{ApplyMode, Config};
pub use error::{Error, ErrorKind, Result};
pub use signal::{
    mask_interrupt_signal, unmask_interrupt_signal, wait_for_interrupt_signal,
    wait_for_interrupt_timeout, CancelHandle, InterruptMask, InterruptWaiter, WaitOutcome,
};
pub use size::WindowSize;
pub use terminal::{get_terminal_size, inject_input, RawMode, Terminal};
