/// Sentinel address installed in the gate while a guard is outstanding.
/// Never a valid allocation, so a decoded address is always dereferenceable.
pub(crate) const fn claimed<T>() -> *mut T {
    -1isize as *mut T
}

/// Decoded state of the gate word.
pub(crate) enum Gate<T> {
    /// No guard outstanding; the address identifies the current value.
    Available(*mut T),
    /// Some participant holds the value checked out.
    Claimed,
}

impl<T> Gate<T> {
    pub(crate) fn decode(word: *mut T) -> Self {
        if word == claimed::<T>() {
            Gate::Claimed
        } else {
            Gate::Available(word)
        }
    }
}
