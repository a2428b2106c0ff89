//! Builder utilities

use adbc_core::options::OptionValue;
use std::iter::{Chain, Flatten};

/// Iterator over the options collected by a builder.
///
/// The `COUNT` fixed slots (e.g. uri, username, password) come first, with
/// empty slots skipped, followed by the free-form options in insertion order.
pub struct BuilderIter<T, const COUNT: usize>(
    #[allow(clippy::type_complexity)]
    Chain<
        Flatten<<[Option<(T, OptionValue)>; COUNT] as IntoIterator>::IntoIter>,
        <Vec<(T, OptionValue)> as IntoIterator>::IntoIter,
    >,
);

impl<T, const COUNT: usize> BuilderIter<T, COUNT> {
    pub(crate) fn new(
        fixed: [Option<(T, OptionValue)>; COUNT],
        other: Vec<(T, OptionValue)>,
    ) -> Self {
        Self(fixed.into_iter().flatten().chain(other))
    }
}

impl<T, const COUNT: usize> Iterator for BuilderIter<T, COUNT> {
    type Item = (T, OptionValue);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}
