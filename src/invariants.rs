//! Runtime invariant checking with contract-test support
//!
//! Safety-relevant invariants are asserted in production code with
//! [`assert_invariant!`]. Every checked invariant is recorded in a
//! thread-local log so a test can prove, via [`contract_test`], that the
//! paths it exercised actually went through the check.
//!
//! ```rust,ignore
//! use scanguard::invariants::*;
//!
//! assert_invariant!(
//!     from == CalibrationState::Ready,
//!     CAPTURE_FROM_READY,
//!     "calibration"
//! );
//!
//! #[test]
//! fn contract_capture() {
//!     // ... drive the machine into Capturing ...
//!     contract_test("capture", &[CAPTURE_FROM_READY]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::thread_local;

/// Capturing may only be entered from Ready.
pub const CAPTURE_FROM_READY: &str = "Capturing is entered only from Ready";

/// A plan point must have cleared every zone test at insertion time.
pub const PLAN_POINT_ZONE_CLEAR: &str = "Plan points are outside every danger zone";

/// A plan point may only be added while the selected procedure has no conflict.
pub const PLAN_POINT_NO_CONFLICT: &str = "Plan points require a conflict-free procedure";

thread_local! {
    static INVARIANT_LOG: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Assert an invariant and log it for contract testing.
///
/// # Panics
/// Panics if the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariants::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariants::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &str, context: Option<&str>) {
    INVARIANT_LOG.with(|log| {
        log.borrow_mut().insert(message.to_string());
    });

    if !condition {
        let ctx = context.unwrap_or("unknown");
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// Check that specific invariants were verified on this thread.
///
/// # Panics
/// Panics if any required invariant was not checked.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let log = INVARIANT_LOG.with(|log| log.borrow().clone());

    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|invariant| !log.contains(*invariant))
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

/// Clear the invariant log for the current thread
pub fn clear_invariant_log() {
    INVARIANT_LOG.with(|log| {
        log.borrow_mut().clear();
    });
}
