//! Chain-graph node

use crate::features::program::domain::MethodId;
use rustc_hash::FxHashMap;

/// Method known to reach at least one sink.
///
/// `tc` memoizes, per sink, which of the method's inputs must be controllable
/// for the sink's required arguments to be. The first vector recorded for a
/// sink is kept.
#[derive(Debug, Clone)]
pub struct GadgetChainNode {
    pub method: MethodId,
    tc: FxHashMap<MethodId, Vec<i32>>,
}

impl GadgetChainNode {
    pub fn new(method: MethodId) -> Self {
        Self {
            method,
            tc: FxHashMap::default(),
        }
    }

    pub fn tc(&self, sink: MethodId) -> Option<&[i32]> {
        self.tc.get(&sink).map(Vec::as_slice)
    }

    /// Returns whether the vector was stored
    pub fn update_tc(&mut self, sink: MethodId, tc: Vec<i32>) -> bool {
        if self.tc.contains_key(&sink) {
            return false;
        }
        self.tc.insert(sink, tc);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_write_wins() {
        let mut node = GadgetChainNode::new(MethodId(1));
        assert!(node.update_tc(MethodId(9), vec![0]));
        assert!(!node.update_tc(MethodId(9), vec![-1]));
        assert_eq!(node.tc(MethodId(9)), Some(&[0][..]));
        assert_eq!(node.tc(MethodId(8)), None);
    }
}
