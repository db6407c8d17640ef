//! Gadget-chain domain: discovered chains and chain-graph nodes

pub mod chain;
pub mod chain_node;

pub use chain::{ChainHop, ChainReport, GadgetChain};
pub use chain_node::GadgetChainNode;
