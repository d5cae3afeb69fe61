// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Testing helper macros.
//!
//! The diagnostic assertions work on any iterable of values with `code`
//! and `severity` fields, so they apply to analyzer diagnostics without
//! this crate depending on the analyzer.

/// Assert that an expression matches a pattern.
///
/// # Example
///
/// ```
/// use modshim_macros::assert_matches;
///
/// #[derive(Debug)]
/// enum Shape { Named(usize), Default }
///
/// let shape = Shape::Named(2);
/// assert_matches!(shape, Shape::Named(n) if n > 0);
/// ```
#[macro_export]
macro_rules! assert_matches {
    ($expr:expr, $pat:pat) => {
        match $expr {
            $pat => {}
            ref e => panic!(
                "assertion failed: `{}` does not match pattern `{}`\n  value: {:?}",
                stringify!($expr),
                stringify!($pat),
                e
            ),
        }
    };
    ($expr:expr, $pat:pat if $guard:expr) => {
        match $expr {
            $pat if $guard => {}
            ref e => panic!(
                "assertion failed: `{}` does not match pattern `{} if {}`\n  value: {:?}",
                stringify!($expr),
                stringify!($pat),
                stringify!($guard),
                e
            ),
        }
    };
}

/// Assert that a Result is Ok and extract the value.
///
/// # Example
///
/// ```
/// use modshim_macros::assert_ok;
///
/// let value: Result<i32, String> = Ok(5);
/// assert_eq!(assert_ok!(value), 5);
/// ```
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!(
                "assertion failed: expected Ok, got Err\n  expression: `{}`\n  error: {:?}",
                stringify!($expr),
                e
            ),
        }
    };
}

/// Assert that a string contains a substring.
///
/// # Example
///
/// ```
/// use modshim_macros::assert_contains;
///
/// assert_contains!("export default qux;", "export default");
/// ```
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        if !$haystack.contains($needle) {
            panic!(
                "assertion failed: string does not contain substring\n  string: `{}`\n  expected: `{}`",
                $haystack, $needle
            );
        }
    };
}

/// Assert that at least one diagnostic carries `code`.
///
/// # Example
///
/// ```
/// use modshim_macros::assert_diagnostic;
///
/// #[derive(Debug, PartialEq)]
/// enum Code { Link, Cycle }
/// #[derive(Debug)]
/// struct Diag { code: Code, severity: u8 }
///
/// let diagnostics = vec![Diag { code: Code::Link, severity: 2 }];
/// assert_diagnostic!(diagnostics, Code::Link);
/// ```
#[macro_export]
macro_rules! assert_diagnostic {
    ($diagnostics:expr, $code:expr) => {{
        let diagnostics = &$diagnostics;
        if !diagnostics.iter().any(|d| d.code == $code) {
            panic!(
                "assertion failed: no diagnostic with code `{}`\n  diagnostics: {:#?}",
                stringify!($code),
                diagnostics
            );
        }
    }};
}

/// Assert that no diagnostic carries `code`.
///
/// # Example
///
/// ```
/// use modshim_macros::assert_no_diagnostic;
///
/// #[derive(Debug, PartialEq)]
/// enum Code { Link, Cycle }
/// #[derive(Debug)]
/// struct Diag { code: Code, severity: u8 }
///
/// let diagnostics = vec![Diag { code: Code::Link, severity: 2 }];
/// assert_no_diagnostic!(diagnostics, Code::Cycle);
/// ```
#[macro_export]
macro_rules! assert_no_diagnostic {
    ($diagnostics:expr, $code:expr) => {{
        let diagnostics = &$diagnostics;
        if let Some(found) = diagnostics.iter().find(|d| d.code == $code) {
            panic!(
                "assertion failed: unexpected diagnostic with code `{}`\n  found: {:#?}",
                stringify!($code),
                found
            );
        }
    }};
}

/// Assert that no diagnostic has Error severity. The severity type must
/// have an `Error` variant reachable through the given path.
///
/// # Example
///
/// ```
/// use modshim_macros::assert_no_errors;
///
/// #[derive(Debug, PartialEq)]
/// enum Severity { Info, Error }
/// #[derive(Debug)]
/// struct Diag { severity: Severity }
///
/// let diagnostics = vec![Diag { severity: Severity::Info }];
/// assert_no_errors!(diagnostics, Severity::Error);
/// ```
#[macro_export]
macro_rules! assert_no_errors {
    ($diagnostics:expr, $error:expr) => {{
        let diagnostics = &$diagnostics;
        let errors: Vec<_> = diagnostics.iter().filter(|d| d.severity == $error).collect();
        if !errors.is_empty() {
            panic!("assertion failed: expected no errors\n  errors: {:#?}", errors);
        }
    }};
}

#[cfg(test)]
mod tests {
    #[derive(Debug, PartialEq)]
    enum Code {
        A,
        B,
    }

    #[derive(Debug)]
    struct Diag {
        code: Code,
    }

    #[test]
    fn test_assert_diagnostic_finds_code() {
        let diagnostics = vec![Diag { code: Code::A }];
        assert_diagnostic!(diagnostics, Code::A);
        assert_no_diagnostic!(diagnostics, Code::B);
    }

    #[test]
    #[should_panic(expected = "no diagnostic with code")]
    fn test_assert_diagnostic_panics_when_missing() {
        let diagnostics: Vec<Diag> = Vec::new();
        assert_diagnostic!(diagnostics, Code::A);
    }

    #[test]
    fn test_assert_matches_with_guard() {
        let value = Some(3);
        assert_matches!(value, Some(n) if n == 3);
    }
}
