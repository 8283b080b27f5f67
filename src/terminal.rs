//! Raw mode, window size and input injection
//!
//! A `Terminal` borrows two descriptors: the control descriptor, whose
//! attributes and window size are read and changed, and the input
//! descriptor, whose input queue receives injected bytes. For the process's
//! own terminal these are stdout and stdin.

use std::ops::Deref;
use std::os::fd::{AsRawFd, BorrowedFd};

use nix::errno::Errno;
use nix::libc;
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::size::WindowSize;

/// Handle to a terminal plus the attributes saved by [`Terminal::prepare`]
#[derive(Debug)]
pub struct Terminal<'fd> {
    /// Descriptor for attributes and window size
    control: BorrowedFd<'fd>,
    /// Descriptor whose input queue receives injected bytes
    input: BorrowedFd<'fd>,
    /// Attributes captured by the last successful read in `prepare`
    saved: Option<Termios>,
    config: Config,
}

impl Terminal<'static> {
    /// Terminal on stdout (control) and stdin (input) with default options
    pub fn stdio() -> Self {
        Self::stdio_with_config(Config::default())
    }

    /// Terminal on stdout (control) and stdin (input)
    pub fn stdio_with_config(config: Config) -> Self {
        // SAFETY: the standard descriptors stay open for the life of the process
        let (control, input) = unsafe {
            (
                BorrowedFd::borrow_raw(libc::STDOUT_FILENO),
                BorrowedFd::borrow_raw(libc::STDIN_FILENO),
            )
        };
        Terminal::new(control, input).with_config(config)
    }
}

impl<'fd> Terminal<'fd> {
    pub fn new(control: BorrowedFd<'fd>, input: BorrowedFd<'fd>) -> Self {
        Self {
            control,
            input,
            saved: None,
            config: Config::default(),
        }
    }

    /// Replace the options used by this handle
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether attributes have been saved by `prepare`
    pub fn is_prepared(&self) -> bool {
        self.saved.is_some()
    }

    /// Save the current attributes and switch to raw mode
    ///
    /// Clears ICANON and ECHO. If reading the attributes fails nothing is
    /// saved; if applying the change fails the saved copy is kept.
    pub fn prepare(&mut self) -> Result<()> {
        tracing::debug!("Preparing terminal");

        let original = termios::tcgetattr(self.control).map_err(Error::GetAttributes)?;
        let mut raw = original.clone();
        self.saved = Some(original);

        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);

        termios::tcsetattr(self.control, self.config.apply_mode.set_arg(), &raw)
            .map_err(Error::SetAttributes)
    }

    /// Reapply the attributes saved by `prepare`, immediately
    ///
    /// The saved attributes are kept, so this can be called repeatedly.
    pub fn restore(&self) -> Result<()> {
        tracing::debug!("Restoring terminal");

        let saved = self.saved.as_ref().ok_or(Error::NotPrepared)?;
        termios::tcsetattr(self.control, SetArg::TCSANOW, saved).map_err(Error::RestoreAttributes)
    }

    /// Enter raw mode until the returned guard is dropped
    pub fn raw_mode(&mut self) -> Result<RawMode<'_, 'fd>> {
        self.prepare()?;
        Ok(RawMode { terminal: self })
    }

    /// Query the window size of the control descriptor
    pub fn size(&self) -> Result<WindowSize> {
        tracing::debug!("Getting terminal size");
        window_size(self.control)
    }

    /// Push `text` onto the input queue as if typed, one byte at a time
    ///
    /// Stops at the first byte the kernel rejects. Bytes before it stay
    /// queued; the error carries their count.
    pub fn inject_input(&self, text: &str) -> Result<()> {
        tracing::debug!(len = text.len(), "Injecting input");

        let fd = self.input.as_raw_fd();
        for (offset, byte) in text.bytes().enumerate() {
            tracing::trace!(offset, byte, "TIOCSTI");

            // SAFETY: TIOCSTI reads a single byte through the pointer
            let result = unsafe { libc::ioctl(fd, libc::TIOCSTI as _, &byte as *const u8) };
            if result < 0 {
                return Err(Error::InjectInput {
                    offset,
                    source: Errno::last(),
                });
            }
        }

        Ok(())
    }
}

/// Raw mode guard returned by [`Terminal::raw_mode`]
///
/// Restores the saved attributes on drop unless `Config::restore_on_drop`
/// is off. A failed restore is logged.
#[derive(Debug)]
pub struct RawMode<'t, 'fd> {
    terminal: &'t mut Terminal<'fd>,
}

impl<'fd> Deref for RawMode<'_, 'fd> {
    type Target = Terminal<'fd>;

    fn deref(&self) -> &Self::Target {
        &*self.terminal
    }
}

impl Drop for RawMode<'_, '_> {
    fn drop(&mut self) {
        if !self.terminal.config.restore_on_drop {
            return;
        }
        if let Err(e) = self.terminal.restore() {
            tracing::warn!("Failed to restore terminal: {}", e);
        }
    }
}

fn window_size(fd: BorrowedFd<'_>) -> Result<WindowSize> {
    let mut winsize = WindowSize::new(0, 0).to_winsize();

    // SAFETY: TIOCGWINSZ writes a winsize into the pointed-to struct
    let result = unsafe { libc::ioctl(fd.as_raw_fd(), libc::TIOCGWINSZ as _, &mut winsize) };

    if result < 0 {
        Err(Error::WindowSize(Errno::last()))
    } else {
        Ok(WindowSize::from(winsize))
    }
}

/// Window size of the terminal on stdout
pub fn get_terminal_size() -> Result<WindowSize> {
    Terminal::stdio().size()
}

/// Inject `text` into the input queue of the terminal on stdin
pub fn inject_input(text: &str) -> Result<()> {
    Terminal::stdio().inject_input(text)
}
