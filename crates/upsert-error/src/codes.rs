use std::fmt::Display;

use int_enum::IntEnum;

/// Error codes for the upsert workspace.
///
/// Error codes define the general "semantic type" of an [crate::UpsertError].
/// Each error code is a 4-digit number stored as a u16 type.
#[repr(u16)]
#[non_exhaustive]
#[derive(Debug, Copy, Clone, Eq, PartialEq, IntEnum)]
pub enum ErrorCode {
    // ----------------- Reconciliation errors [1000, 1999] -------------------
    //
    // User-facing errors raised while validating and reconciling the two
    // input datasets.
    /// Default catch-all code for when you're too lazy to specify a proper code
    Generic = 1000,
    /// A primary key or compared column is absent from one of the datasets.
    SchemaMismatch = 1001,
    /// The primary key is empty or does not identify rows uniquely.
    AmbiguousPrimaryKey = 1002,
    /// The dataframe engine failed to plan or execute the reconciliation.
    EngineError = 1003,
    ArrowError = 1004,

    // ----------------- Destination errors [2000, 2999] ----------------------
    //
    // Errors raised by the destination side of an upsert.
    /// The destination driver failed to load, the destination cannot be
    /// reached, or it rejected the write.
    ConnectionError = 2000,

    // ----------------- CLI errors [3000, 8999] ------------------------------
    IoError = 3000,
    InvalidConfig = 3001,
    InvalidArgument = 3002,
    SerializationError = 3003,
    UnsupportedFileFormat = 3004,

    // ----------------- Internal errors [9000, 9999] -------------------------
    //
    // Error codes in this range are "bugs" -- they should never be raised in
    // normal operation.
    OperationCanceled = 9001,
    /// Catch-all for unexpected conditions.
    Unexpected = 9999,
}

impl Default for ErrorCode {
    fn default() -> Self {
        Self::Generic
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:04}", *self as u16)
    }
}

impl ErrorCode {
    pub fn is_bug(&self) -> bool {
        (9000..).contains(&(*self as u16))
    }

    /// True for errors that originate from the destination side of an upsert.
    pub fn is_destination(&self) -> bool {
        (2000..3000).contains(&(*self as u16))
    }
}
