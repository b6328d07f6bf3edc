//! Where the command line gets key text from

use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::link::ShareLink;
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Trait for obtaining base-58 key text
pub trait KeySource {
    /// Returns the key text, wrapped in `Zeroizing` so it is wiped from
    /// memory when dropped. Surrounding whitespace is already removed.
    fn read_key(&mut self) -> Result<Zeroizing<String>>;
}

/// Returns a fixed key (from a flag, the environment, or a test)
pub struct ConstantKeySource {
    key: Zeroizing<String>,
}

impl ConstantKeySource {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Zeroizing::new(key.into()),
        }
    }
}

impl KeySource for ConstantKeySource {
    fn read_key(&mut self) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new(self.key.trim().to_owned()))
    }
}

/// Reads the key from any io::Read source, such as stdin
pub struct ReaderKeySource {
    reader: Box<dyn Read>,
}

impl ReaderKeySource {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl KeySource for ReaderKeySource {
    fn read_key(&mut self) -> Result<Zeroizing<String>> {
        let mut data = Zeroizing::new(String::new());
        self.reader.read_to_string(&mut data).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::KeyUnavailable,
                "error reading key",
                e,
            )
        })?;
        Ok(Zeroizing::new(data.trim().to_owned()))
    }
}

/// Takes the key from the fragment of a share link
pub struct LinkKeySource {
    link: Zeroizing<String>,
}

impl LinkKeySource {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: Zeroizing::new(link.into()),
        }
    }
}

impl KeySource for LinkKeySource {
    fn read_key(&mut self) -> Result<Zeroizing<String>> {
        let link = ShareLink::parse(&self.link)?;
        Ok(link.key)
    }
}

/// Reads the key from the terminal with no echo
#[derive(Default)]
pub struct TerminalKeySource;

impl TerminalKeySource {
    pub fn new() -> Self {
        Self
    }
}

impl KeySource for TerminalKeySource {
    fn read_key(&mut self) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Err(SealnoteError::with_kind(
                ErrorCategory::User,
                ErrorKind::KeyUnavailable,
                "cannot read key from terminal - stdin is not a terminal",
            ));
        }

        io::stderr().write_all(b"Key (sealnote): ").map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to write prompt",
                e,
            )
        })?;
        io::stderr().flush().map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to flush prompt",
                e,
            )
        })?;

        let key = Zeroizing::new(rpassword::read_password().map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::KeyUnavailable,
                "failure reading key",
                e,
            )
        })?);

        Ok(Zeroizing::new(key.trim().to_owned()))
    }
}
