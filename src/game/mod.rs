//! Client-side model of the game: board, peer-confirmed state, outcomes.
//!
//! Nothing here knows the rules. The peer decides legality and results;
//! these types only hold and validate what it reports.

pub mod types;

pub use types::*;
