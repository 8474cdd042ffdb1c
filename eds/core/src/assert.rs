//! Fatal assertion policy.
//!
//! Configuration and programmer errors are not recoverable on a
//! microcontroller: they mean a static budget (queue depth, priority map,
//! hierarchy depth) was miscalculated. They all funnel through
//! [`on_assert`], which logs the failing location and panics; the platform's
//! panic handler decides between halting and resetting.
//!
//! With the `asserts` feature disabled the checks are compiled out. Every
//! guarded path in the executive stays memory safe in that mode; the
//! offending operation simply degrades to a no-op.

/// Whether [`eds_assert!`](crate::eds_assert) checks are compiled in.
pub const ENABLED: bool = cfg!(feature = "asserts");

/// Reports a failed assertion and never returns.
#[cold]
#[inline(never)]
#[track_caller]
pub fn on_assert(module: &'static str, label: &'static str) -> ! {
    log::error!("assertion failed in {}: {}", module, label);
    panic!("eds assertion failed: {}: {}", module, label)
}

/// Checks a contract and calls [`on_assert`] when it does not hold.
///
/// ```should_panic
/// eds_core::eds_assert!(1 + 1 == 3, "doc", "arithmetic");
/// ```
#[macro_export]
macro_rules! eds_assert {
    ($cond:expr, $module:expr, $label:expr $(,)?) => {
        if $crate::assert::ENABLED && !($cond) {
            $crate::assert::on_assert($module, $label);
        }
    };
}

/// Unconditional failure, for match arms that must never be reached.
#[macro_export]
macro_rules! eds_error {
    ($module:expr, $label:expr $(,)?) => {
        if $crate::assert::ENABLED {
            $crate::assert::on_assert($module, $label);
        }
    };
}
