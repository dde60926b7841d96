/*!
 * Core Types
 * Common types used across the toolkit
 */

/// Size type for arena and element accounting, in bytes
pub type Size = usize;

/// Position of an entry within a table's flat entry sequence
pub type EntryIndex = usize;
