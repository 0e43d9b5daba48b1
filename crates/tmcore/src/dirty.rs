//! # Dirty-State Tracking
//!
//! A model has unsaved changes as soon as any tracked field changes value.
//! The host reads the flag to decide whether a save is needed and resets it
//! after saving.
//!
//! ## One Mutation Primitive
//!
//! Every tracked setter in the crate goes through [`DirtyFlag::assign`]:
//!
//! 1. Compare the new value with the stored one. Equal values are a silent no-op.
//! 2. Store the new value.
//! 3. Mark the flag.
//!
//! Setters that also notify observers (see [`crate::properties::Property`]) store,
//! notify, and only then call [`DirtyFlag::mark`], so an observer always sees the
//! new value in place.
//!
//! ## Scope
//!
//! [`DirtyFlag::global`] is the process-wide flag, `false` at startup. Models bind
//! to it unless they are built with an explicit flag ([`DirtyFlag::new`]), which is
//! how tests and embedders hosting several models keep them apart.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static GLOBAL: Lazy<DirtyFlag> = Lazy::new(DirtyFlag::new);

/// Cloneable handle to a shared "unsaved changes" flag.
#[derive(Clone)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl DirtyFlag {
    /// A fresh, clean flag not shared with anything else.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// The process-wide flag.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn mark(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Signals that the model has been saved.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether both handles point at the same flag.
    pub fn same_as(&self, other: &DirtyFlag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stores `value` into `slot` and marks the flag, unless the two are equal.
    ///
    /// Returns whether anything changed.
    pub fn assign<T: PartialEq>(&self, slot: &mut T, value: T) -> bool {
        self.assign_with(slot, value, |_, _| {})
    }

    /// Like [`assign`](Self::assign), calling `on_change(old, new)` after the
    /// value is stored and before the flag is marked.
    pub fn assign_with<T: PartialEq>(
        &self,
        slot: &mut T,
        value: T,
        on_change: impl FnOnce(&T, &T),
    ) -> bool {
        if *slot == value {
            return false;
        }
        let old = std::mem::replace(slot, value);
        on_change(&old, slot);
        self.mark();
        true
    }
}

impl Default for DirtyFlag {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for DirtyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DirtyFlag").field(&self.is_dirty()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_flag_starts_clean() {
        assert!(!DirtyFlag::new().is_dirty());
    }

    #[test]
    fn assign_marks_only_on_change() {
        let flag = DirtyFlag::new();
        let mut name = String::from("Web Server");

        assert!(!flag.assign(&mut name, "Web Server".to_string()));
        assert!(!flag.is_dirty());

        assert!(flag.assign(&mut name, "Database".to_string()));
        assert_eq!(name, "Database");
        assert!(flag.is_dirty());
    }

    #[test]
    fn assign_with_sees_new_value_before_mark() {
        let flag = DirtyFlag::new();
        let mut level = 1;
        let observed = flag.clone();

        let changed = flag.assign_with(&mut level, 2, |old, new| {
            assert_eq!((*old, *new), (1, 2));
            assert!(!observed.is_dirty());
        });

        assert!(changed);
        assert!(flag.is_dirty());
    }

    #[test]
    fn reset_clears_the_flag() {
        let flag = DirtyFlag::new();
        flag.mark();
        flag.reset();
        assert!(!flag.is_dirty());
    }

    #[test]
    fn clones_share_state() {
        let flag = DirtyFlag::new();
        let other = flag.clone();
        other.mark();
        assert!(flag.is_dirty());
        assert!(flag.same_as(&other));
        assert!(!flag.same_as(&DirtyFlag::new()));
    }

    #[test]
    fn global_is_a_single_instance() {
        assert!(DirtyFlag::global().same_as(&DirtyFlag::global()));
        assert!(DirtyFlag::default().same_as(&DirtyFlag::global()));
    }
}
