// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Error types

use thiserror::Error;

/// Configuration errors
///
/// These are reported synchronously by configuration setters, which leave the
/// previous configuration unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Page size is not an integer or is less than 1
    #[error("page size must be an integer > 0 (got {0})")]
    InvalidPageSize(String),
    /// A static item list and a data provider were used together
    #[error("using static items and a data provider together is not supported")]
    ConflictingDataSource,
}
