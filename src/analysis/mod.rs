pub mod builder;
pub mod identifier;
pub mod miner;

pub use builder::{build_graph, BuilderOptions, GraphBuilder};
pub use identifier::{check_identifier, IdentifierPolicy, Verdict};
pub use miner::{mine_findings, LeakMiner, Mined, MinerOptions, Truncation};
