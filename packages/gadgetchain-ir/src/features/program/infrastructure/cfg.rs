//! Control-flow graph over a method body
//!
//! Statement `i` flows to `i + 1` unless it is a `goto`/`return`, and to its
//! branch target if it has one. Exceptional edges are not modeled.

use crate::features::program::domain::MethodBody;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cfg {
    succs: Vec<Vec<usize>>,
    preds: Vec<Vec<usize>>,
}

impl Cfg {
    pub fn build(body: &MethodBody) -> Self {
        let n = body.stmts.len();
        let mut succs = vec![Vec::new(); n];
        let mut preds = vec![Vec::new(); n];

        for (i, stmt) in body.stmts.iter().enumerate() {
            let mut targets = Vec::with_capacity(2);
            if stmt.falls_through() && i + 1 < n {
                targets.push(i + 1);
            }
            if let Some(t) = stmt.jump_target() {
                if t < n && !targets.contains(&t) {
                    targets.push(t);
                }
            }
            for t in targets {
                succs[i].push(t);
                preds[t].push(i);
            }
        }

        Self { succs, preds }
    }

    pub fn len(&self) -> usize {
        self.succs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.succs.is_empty()
    }

    pub fn succs(&self, node: usize) -> &[usize] {
        self.succs.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn preds(&self, node: usize) -> &[usize] {
        self.preds.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_entry(&self, node: usize) -> bool {
        node == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::program::domain::{Stmt, StmtKind, VarId};

    fn body(kinds: Vec<StmtKind>) -> MethodBody {
        MethodBody {
            stmts: kinds
                .into_iter()
                .enumerate()
                .map(|(i, k)| Stmt::new(i as u32 + 1, k))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_branch_edges() {
        let cfg = Cfg::build(&body(vec![
            StmtKind::If {
                lhs: VarId(0),
                rhs: None,
                target: 2,
            },
            StmtKind::Nop,
            StmtKind::Return { value: None },
        ]));
        assert_eq!(cfg.succs(0), &[1, 2]);
        assert_eq!(cfg.preds(2), &[0, 1]);
        assert!(cfg.succs(2).is_empty());
    }

    #[test]
    fn test_goto_does_not_fall_through() {
        let cfg = Cfg::build(&body(vec![
            StmtKind::Goto { target: 2 },
            StmtKind::Nop,
            StmtKind::Nop,
        ]));
        assert_eq!(cfg.succs(0), &[2]);
        assert!(cfg.preds(1).is_empty());
    }

    #[test]
    fn test_loop_back_edge() {
        let cfg = Cfg::build(&body(vec![
            StmtKind::Nop,
            StmtKind::If {
                lhs: VarId(0),
                rhs: None,
                target: 0,
            },
        ]));
        assert_eq!(cfg.preds(0), &[1]);
        assert_eq!(cfg.len(), 2);
    }
}
