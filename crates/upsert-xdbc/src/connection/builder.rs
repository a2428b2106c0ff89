//! A builder for a [`Connection`]

use std::fmt;

use adbc_core::{
    error::Result,
    options::{OptionConnection, OptionValue},
};

use crate::{Connection, Database, builder::BuilderIter};

/// A builder for [`Connection`].
///
/// Connections carry no fixed options here; everything goes into `other`
/// and is handed to the driver in insertion order.
#[derive(Clone, Default)]
pub struct Builder {
    /// Ordered list of connection options.
    pub other: Vec<(OptionConnection, OptionValue)>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Builder");
        for (name, value) in &self.other {
            dbg.field(name.as_ref(), &value);
        }
        dbg.finish()
    }
}

impl Builder {
    pub fn with_typed_option(&mut self, option: OptionConnection, value: OptionValue) -> &mut Self {
        self.other.push((option, value));
        self
    }

    pub fn with_named_option(
        &mut self,
        name: impl AsRef<str>,
        value: impl Into<String>,
    ) -> &mut Self {
        let option = OptionConnection::Other(name.as_ref().to_string());
        self.with_typed_option(option, OptionValue::String(value.into()))
    }

    /// Attempt to initialize a [`Connection`] using the values provided to
    /// this builder using the provided [`Database`].
    pub fn build(self, database: &mut Box<dyn Database>) -> Result<Box<dyn Connection>> {
        let opts = self.into_iter().collect::<Vec<_>>();
        database.new_connection_with_opts(opts)
    }
}

impl IntoIterator for Builder {
    type Item = (OptionConnection, OptionValue);
    type IntoIter = BuilderIter<OptionConnection, 0>;

    fn into_iter(self) -> Self::IntoIter {
        BuilderIter::new([], self.other)
    }
}
