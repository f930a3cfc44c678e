//! Cursor module
//!
//! Cursor strategies decide what a polling collector asks for next and how
//! the answer moves its cursor.
//!
//! # Strategies
//!
//! - `NewCursor` - follows a search forward (`since_id`)
//! - `BackfillCursor` - walks a search backwards (`max_id`) until empty
//! - `SubjectRotation` - one subject timeline per cycle, optionally bounded

mod strategies;
mod types;

pub use strategies::{BackfillCursor, NewCursor, Stance, SubjectRotation};
pub use types::{CursorSnapshot, CursorStrategy, Progress};

#[cfg(test)]
mod tests;
