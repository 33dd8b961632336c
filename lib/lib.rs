//! Index combinatorial prediction markets: derive each market's atomic
//! outcome positions and keep per-holder ledgers over them as chain
//! records stream in.

pub mod config;
pub mod indexer;
pub mod math;
pub mod oracle;
pub mod positions;
pub mod state;
pub mod types;

pub use heed;
pub use sneed;

pub use config::{CommitmentMode, Config};
pub use indexer::Indexer;
