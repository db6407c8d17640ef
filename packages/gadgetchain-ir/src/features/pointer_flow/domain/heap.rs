//! Heap objects: allocation sites and controllable mock objects

use super::pointer::PointerId;
use crate::features::controllability::domain::ContrValue;
use crate::features::program::domain::{JavaType, MethodId};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeapObj {
    /// `new T` at statement `stmt` of `method`
    Alloc {
        method: MethodId,
        stmt: usize,
        ty: JavaType,
    },
    /// Placeholder standing for a value of known controllability, e.g. the
    /// `param-0` seed of a formal parameter
    Mock {
        pointer: PointerId,
        value: ContrValue,
        ty: JavaType,
    },
}

impl HeapObj {
    pub fn ty(&self) -> &JavaType {
        match self {
            HeapObj::Alloc { ty, .. } | HeapObj::Mock { ty, .. } => ty,
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, HeapObj::Mock { .. })
    }
}

/// Allocation-site heap model; one object per site, one mock per
/// (pointer, value)
#[derive(Debug, Default)]
pub struct HeapModel {
    objs: Vec<HeapObj>,
    index: FxHashMap<HeapObj, ObjId>,
}

impl HeapModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, obj: HeapObj) -> ObjId {
        if let Some(&id) = self.index.get(&obj) {
            return id;
        }
        let id = ObjId(self.objs.len() as u32);
        self.objs.push(obj.clone());
        self.index.insert(obj, id);
        id
    }

    pub fn alloc(&mut self, method: MethodId, stmt: usize, ty: JavaType) -> ObjId {
        self.intern(HeapObj::Alloc { method, stmt, ty })
    }

    pub fn mock(&mut self, pointer: PointerId, value: ContrValue, ty: JavaType) -> ObjId {
        self.intern(HeapObj::Mock { pointer, value, ty })
    }

    pub fn get(&self, id: ObjId) -> &HeapObj {
        &self.objs[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.objs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_object_per_site() {
        let mut heap = HeapModel::new();
        let a = heap.alloc(MethodId(0), 3, JavaType::from("A"));
        let b = heap.alloc(MethodId(0), 3, JavaType::from("A"));
        let c = heap.alloc(MethodId(0), 4, JavaType::from("A"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!heap.get(a).is_mock());
    }

    #[test]
    fn test_mock_objects_keyed_by_value() {
        let mut heap = HeapModel::new();
        let p0 = heap.mock(PointerId(1), ContrValue::param(0), JavaType::string());
        let this = heap.mock(PointerId(1), ContrValue::this(), JavaType::string());
        assert_ne!(p0, this);
        assert!(heap.get(p0).is_mock());
        assert_eq!(heap.len(), 2);
    }
}
