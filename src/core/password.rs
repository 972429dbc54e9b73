//! Password sources: where master passwords come from.
//!
//! A [`PasswordSource`] is handed to the safe controller for the duration of
//! one command. [`CachedPassword`] lets a load followed by a save share one
//! prompt; [`OneShot`] is the guard the cipher uses so that a single decrypt
//! never asks twice.

use crate::error::{Result, SafeError};
use zeroize::Zeroizing;

/// Yields a candidate master password on demand.
pub trait PasswordSource {
    fn supply(&mut self) -> Result<Zeroizing<String>>;
}

impl<F> PasswordSource for F
where
    F: FnMut() -> Result<Zeroizing<String>>,
{
    fn supply(&mut self) -> Result<Zeroizing<String>> {
        self()
    }
}

/// Allows exactly one `supply()` per instance; later calls fail closed.
pub struct OneShot<'a> {
    source: &'a mut dyn PasswordSource,
    calls: usize,
}

impl<'a> OneShot<'a> {
    pub fn new(source: &'a mut dyn PasswordSource) -> Self {
        Self { source, calls: 0 }
    }

    pub fn take(&mut self) -> Result<Zeroizing<String>> {
        if self.calls > 0 {
            return Err(SafeError::Authentication);
        }
        self.calls += 1;
        self.source.supply()
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

/// Remembers the first password it obtains for the rest of its lifetime.
///
/// Scope one of these to a single command invocation; it is never stored
/// anywhere else.
pub struct CachedPassword<S> {
    inner: S,
    cached: Option<Zeroizing<String>>,
}

impl<S: PasswordSource> CachedPassword<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cached: None,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }
}

impl<S: PasswordSource> PasswordSource for CachedPassword<S> {
    fn supply(&mut self) -> Result<Zeroizing<String>> {
        if let Some(password) = &self.cached {
            return Ok(password.clone());
        }
        let password = self.inner.supply()?;
        self.cached = Some(password.clone());
        Ok(password)
    }
}
