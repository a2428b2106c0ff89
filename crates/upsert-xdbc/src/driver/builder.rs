//! A builder for [`Driver`]

use super::AdbcDriver;
use crate::{Backend, Driver};
use adbc_core::{error::Result, options::AdbcVersion};

/// A builder for [`Driver`].
#[derive(Clone, Debug)]
pub struct Builder {
    /// The backend target of the driver.
    pub backend: Backend,

    /// The ADBC API version requested from the driver. Bulk ingestion into a
    /// named schema needs 1.1.
    pub adbc_version: AdbcVersion,
}

impl Builder {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            adbc_version: AdbcVersion::V110,
        }
    }

    /// Try to load the [`Driver`] using the values provided to this builder.
    pub fn try_load(&self) -> Result<Box<dyn Driver>> {
        let adbc_driver = AdbcDriver::try_load_dynamic(self.backend, self.adbc_version)?;
        Ok(Box::new(adbc_driver))
    }
}
