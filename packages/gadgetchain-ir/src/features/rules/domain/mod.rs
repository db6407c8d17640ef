//! Rule domain: index references, imitated behaviors, the resolved table

pub mod behavior;
pub mod index_ref;
pub mod rule_table;

pub use behavior::{CallerFilter, ImitatedBehavior, Jump};
pub use index_ref::{
    index_name, parse_index, parse_index_ref, IndexKind, IndexRef, IndexSelector, BASE, RESULT,
};
pub use rule_table::{
    deserialization_entries, RuleStats, RuleTable, TransferRule, DESERIALIZATION_CALLBACKS,
};
