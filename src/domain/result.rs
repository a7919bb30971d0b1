//! Result type alias for Shelfpack

use super::errors::ShelfpackError;

/// Result type alias for Shelfpack operations
///
/// # Examples
///
/// ```
/// use shelfpack::domain::result::Result;
/// use shelfpack::domain::errors::ShelfpackError;
///
/// fn failing_function() -> Result<()> {
///     Err(ShelfpackError::Validation("Invalid input".to_string()))
/// }
///
/// assert!(failing_function().is_err());
/// ```
pub type Result<T> = std::result::Result<T, ShelfpackError>;
