//! Feature slices, bottom-up:
//! program model → rules → controllability → pointer flow → call graph →
//! gadget chains → summaries (the engine tying them together)

pub mod call_graph;
pub mod controllability;
pub mod gadget_chain;
pub mod pointer_flow;
pub mod program;
pub mod rules;
pub mod summary;
