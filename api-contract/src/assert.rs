//! Field assertions that fail a step instead of panicking.
//!
//! `check!`, `check_eq!` and `check_ne!` return early with
//! [`Error::AssertionFailed`], so they can be used with `?` semantics inside
//! [`Scenario::step`](crate::Scenario::step) closures and the failure shows up
//! as the step's cause.

use crate::error::Error;

pub fn ensure<M: Into<String>>(condition: bool, message: M) -> Result<(), Error> {
    if condition {
        Ok(())
    } else {
        Err(Error::AssertionFailed(message.into()))
    }
}

#[macro_export]
macro_rules! check {
    ($cond:expr $(,)?) => {{
        $crate::assert::ensure($cond, stringify!($cond))?;
    }};
    ($cond:expr, $($arg:tt)+) => {{
        $crate::assert::ensure($cond, format!($($arg)+))?;
    }};
}

#[macro_export]
macro_rules! check_eq {
    ($left:expr, $right:expr $(,)?) => {{
        let left_val = &$left;
        let right_val = &$right;
        $crate::assert::ensure(
            left_val == right_val,
            format!(
                "{} == {}: {:?} != {:?}",
                stringify!($left),
                stringify!($right),
                left_val,
                right_val
            ),
        )?;
    }};
    ($left:expr, $right:expr, $($arg:tt)+) => {{
        let left_val = &$left;
        let right_val = &$right;
        $crate::assert::ensure(left_val == right_val, format!($($arg)+))?;
    }};
}

#[macro_export]
macro_rules! check_ne {
    ($left:expr, $right:expr $(,)?) => {{
        let left_val = &$left;
        let right_val = &$right;
        $crate::assert::ensure(
            left_val != right_val,
            format!(
                "{} != {}: both are {:?}",
                stringify!($left),
                stringify!($right),
                left_val
            ),
        )?;
    }};
    ($left:expr, $right:expr, $($arg:tt)+) => {{
        let left_val = &$left;
        let right_val = &$right;
        $crate::assert::ensure(left_val != right_val, format!($($arg)+))?;
    }};
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use serde_json::json;

    fn per_page_is(body: &serde_json::Value, expected: u64) -> Result<(), Error> {
        check!(body.is_object());
        check_eq!(body["per_page"], json!(expected));
        check_ne!(body["data"], json!(null), "data must be present");
        Ok(())
    }

    #[test]
    fn passing_checks_return_ok() {
        assert!(per_page_is(&json!({"per_page": 6, "data": []}), 6).is_ok());
    }

    #[test]
    fn failing_check_eq_names_both_sides() {
        let error = per_page_is(&json!({"per_page": 3, "data": []}), 6).unwrap_err();

        match error {
            Error::AssertionFailed(message) => {
                assert!(message.contains("body[\"per_page\"]"));
                assert!(message.contains("Number(3)"));
                assert!(message.contains("Number(6)"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn custom_messages_are_kept() {
        let error = per_page_is(&json!({"per_page": 6}), 6).unwrap_err();

        assert_eq!(error.to_string(), "Assertion failed: data must be present");
    }

    #[test]
    fn check_reports_the_condition() {
        let error = per_page_is(&json!([]), 6).unwrap_err();

        assert_eq!(error.to_string(), "Assertion failed: body.is_object()");
    }
}
