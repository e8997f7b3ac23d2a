//! Type alias for operations that may partially fail.
//! Failed parts are reported next to the result instead of aborting the operation.

/// Represents a successful operation where some parts failed but didn't prevent overall success.
/// The `Vec<E>` contains errors from the failed parts that were handled gracefully.
pub type PartialSuccess<T, E> = ( T, Vec<E> );
