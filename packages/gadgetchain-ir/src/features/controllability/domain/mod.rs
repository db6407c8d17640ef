//! Controllability domain types

pub mod contr;
pub mod contr_fact;
pub mod contr_value;

pub use contr::Contr;
pub use contr_fact::ContrFact;
pub use contr_value::{
    is_any_match, ContrValue, Controllability, FieldPath, NOT_POLLUTED, POLLUTED, THIS,
};
