//! Result shapes shared across modules.

/// An operation that completed, together with the non-fatal problems it
/// worked around along the way.
pub type PartialSuccess<T, E> = ( T, Vec<E> );
