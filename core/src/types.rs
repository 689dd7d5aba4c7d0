//! Shared primitive types used across the scoring core.

/// A stable, unique identifier for the individual being evaluated.
pub type SubjectId = String;

/// A stable, unique identifier for one uploaded document.
pub type DocumentId = String;

/// Identifier of one immutable risk profile snapshot.
pub type ProfileId = String;

/// Identifier of one monitoring alert.
pub type AlertId = String;
