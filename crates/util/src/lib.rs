use std::ops::{Deref, DerefMut};

/// Pads and aligns a value to the size of a cache line, so that hot atomics
/// do not false-share with their neighbors.
#[cfg_attr(
    any(target_arch = "x86_64", target_arch = "aarch64",),
    repr(align(128))
)]
#[cfg_attr(
    not(any(target_arch = "x86_64", target_arch = "aarch64",)),
    repr(align(64))
)]
pub struct Padded<T>(T);

impl<T> Padded<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Padded<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Padded<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
