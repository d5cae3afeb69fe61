// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collection creation macros.

/// Creates an ordered `Vec<String>` from string-like values.
///
/// # Example
///
/// ```
/// use modshim_macros::names;
///
/// let names: Vec<String> = names!["a", "b"];
/// assert_eq!(names.len(), 2);
/// let empty: Vec<String> = names![];
/// assert!(empty.is_empty());
/// ```
#[macro_export]
macro_rules! names {
    () => {
        ::std::vec::Vec::<::std::string::String>::new()
    };
    ($($name:expr),+ $(,)?) => {
        vec![$(::std::string::String::from($name)),+]
    };
}

/// Creates a HashSet from values.
///
/// # Example
///
/// ```
/// use modshim_macros::hashset;
///
/// let set = hashset! { 1, 2, 3 };
/// assert!(set.contains(&2));
/// ```
#[macro_export]
macro_rules! hashset {
    () => {
        ::std::collections::HashSet::new()
    };
    ($($value:expr),+ $(,)?) => {{
        let mut set = ::std::collections::HashSet::new();
        $(set.insert($value);)+
        set
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_names_preserves_order() {
        let names = names!["z", "a", "m"];
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_hashset_dedupes() {
        let set = hashset! { "a", "a", "b" };
        assert_eq!(set.len(), 2);
    }
}
