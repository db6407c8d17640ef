//! Three-address statements
//!
//! One variant per statement shape the transfer function distinguishes.
//! Branch targets are statement indices within the same body.

use super::ids::VarId;
use super::signature::{FieldRef, MethodRef};
use super::types::JavaType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Virtual,
    Interface,
    Static,
    Special,
    Dynamic,
}

impl CallKind {
    pub fn is_static(self) -> bool {
        matches!(self, CallKind::Static)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeExpr {
    pub kind: CallKind,
    pub method: MethodRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<VarId>,
    #[serde(default)]
    pub args: Vec<VarId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<VarId>,
}

impl InvokeExpr {
    /// Receiver followed by arguments; `None` in slot 0 for static calls
    pub fn call_site_vars(&self) -> Vec<Option<VarId>> {
        std::iter::once(self.base)
            .chain(self.args.iter().copied().map(Some))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StmtKind {
    New {
        lhs: VarId,
        ty: JavaType,
    },
    Copy {
        lhs: VarId,
        rhs: VarId,
    },
    Cast {
        lhs: VarId,
        rhs: VarId,
        ty: JavaType,
    },
    /// `lhs = base.field`, static when `base` is absent
    LoadField {
        lhs: VarId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base: Option<VarId>,
        field: FieldRef,
    },
    /// `base.field = rhs`, static when `base` is absent
    StoreField {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base: Option<VarId>,
        field: FieldRef,
        rhs: VarId,
    },
    LoadArray {
        lhs: VarId,
        base: VarId,
    },
    StoreArray {
        base: VarId,
        rhs: VarId,
    },
    /// `if (lhs <op> rhs) goto target`
    If {
        lhs: VarId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rhs: Option<VarId>,
        target: usize,
    },
    Goto {
        target: usize,
    },
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<VarId>,
    },
    Invoke(InvokeExpr),
    Nop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stmt {
    pub line: u32,
    #[serde(flatten)]
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(line: u32, kind: StmtKind) -> Self {
        Self { line, kind }
    }

    /// Branch target, if the statement can jump
    pub fn jump_target(&self) -> Option<usize> {
        match self.kind {
            StmtKind::If { target, .. } | StmtKind::Goto { target } => Some(target),
            _ => None,
        }
    }

    /// Whether control can reach the next statement in order
    pub fn falls_through(&self) -> bool {
        !matches!(self.kind, StmtKind::Goto { .. } | StmtKind::Return { .. })
    }

    pub fn vars(&self) -> Vec<VarId> {
        match &self.kind {
            StmtKind::New { lhs, .. } => vec![*lhs],
            StmtKind::Copy { lhs, rhs } | StmtKind::Cast { lhs, rhs, .. } => vec![*lhs, *rhs],
            StmtKind::LoadField { lhs, base, .. } => std::iter::once(*lhs).chain(*base).collect(),
            StmtKind::StoreField { base, rhs, .. } => std::iter::once(*rhs).chain(*base).collect(),
            StmtKind::LoadArray { lhs, base } => vec![*lhs, *base],
            StmtKind::StoreArray { base, rhs } => vec![*base, *rhs],
            StmtKind::If { lhs, rhs, .. } => std::iter::once(*lhs).chain(*rhs).collect(),
            StmtKind::Return { value } => value.iter().copied().collect(),
            StmtKind::Invoke(inv) => inv
                .base
                .iter()
                .chain(inv.args.iter())
                .chain(inv.result.iter())
                .copied()
                .collect(),
            StmtKind::Goto { .. } | StmtKind::Nop => Vec::new(),
        }
    }
}
