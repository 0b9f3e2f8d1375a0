//! Chain access for the wallet engine.
//!
//! The wallet never decides which chain is canonical. It reads headers and
//! transactions through the [`Chain`] trait and uses [`ChainFollower`] to
//! turn "move from position A to head B" into an ordered list of
//! disconnect/connect steps that survives reorganizations.

pub mod chain;
pub mod error;
pub mod follower;

pub use chain::Chain;
pub use error::{ChainError, FollowError};
pub use follower::{Advance, ChainFollower, Step};
