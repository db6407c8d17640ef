//! Per-pointer controllability descriptor

use super::contr_value::ContrValue;
use crate::features::pointer_flow::domain::{PointerArena, PointerId, PointerKind};
use crate::features::program::domain::JavaType;
use crate::features::program::ports::TypeOracle;

/// What is known about the value held by one pointer at one program point.
///
/// `value` is the classification; the flags and `ty` refine call resolution
/// (an exact `new T` type allows single dispatch, a cast receiver cannot be a
/// dynamic proxy). Array variables also keep the contributions of their
/// stored elements.
#[derive(Debug, Clone, Default)]
pub struct Contr {
    origin: Option<PointerId>,
    name: String,
    ty: Option<JavaType>,
    value: ContrValue,
    const_string: Option<String>,
    is_transient: bool,
    is_serializable: bool,
    is_new: bool,
    is_casted: bool,
    array_elements: Vec<Contr>,
}

impl Contr {
    /// Descriptor not tied to a location (static receivers, missing fields)
    pub fn detached() -> Self {
        Self::default()
    }

    /// Fresh `null` descriptor for `origin`, typed and flagged from the pointer
    pub fn for_pointer(arena: &PointerArena, origin: PointerId, oracle: &dyn TypeOracle) -> Self {
        let pointer = arena.get(origin);
        let serializable_ty = match pointer.kind {
            PointerKind::ArrayIndex { .. } => {
                arena.base_of(origin).and_then(|b| arena.get(b).ty.element_type().cloned())
            }
            _ => Some(pointer.ty.clone()),
        };
        Self {
            origin: Some(origin),
            name: pointer.name.clone(),
            ty: Some(pointer.ty.clone()),
            is_transient: pointer.is_transient,
            is_serializable: serializable_ty.map_or(false, |t| oracle.is_serializable(&t)),
            ..Self::default()
        }
    }

    pub fn origin(&self) -> Option<PointerId> {
        self.origin
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Option<&JavaType> {
        self.ty.as_ref()
    }

    pub fn set_type(&mut self, ty: JavaType) {
        self.ty = Some(ty);
    }

    pub fn value(&self) -> &ContrValue {
        &self.value
    }

    pub fn set_value(&mut self, value: ContrValue) {
        self.value = value;
        self.const_string = None;
    }

    /// Append to the current value, see [`ContrValue::concat`]
    pub fn update_value(&mut self, next: &ContrValue) {
        self.value = self.value.concat(next);
        self.const_string = None;
    }

    pub fn const_string(&self) -> Option<&str> {
        self.const_string.as_deref()
    }

    /// Value of a string literal; also becomes the value
    pub fn set_const_string(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.value = ContrValue::Literal(text.clone());
        self.const_string = Some(text);
    }

    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    pub fn is_serializable(&self) -> bool {
        self.is_serializable
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn set_new(&mut self) {
        self.is_new = true;
    }

    pub fn is_casted(&self) -> bool {
        self.is_casted
    }

    pub fn set_casted(&mut self) {
        self.is_casted = true;
    }

    pub fn is_controllable(&self) -> bool {
        self.value.is_controllable()
    }

    pub fn array_elements(&self) -> &[Contr] {
        &self.array_elements
    }

    /// Record a stored element; the array's own value joins the element's
    pub fn add_array_element(&mut self, element: Contr) {
        self.merge_from(&element);
        self.array_elements.push(element);
    }

    /// Join `newer` into `self`: its value and typing win when at least as
    /// controllable
    pub fn merge_from(&mut self, newer: &Contr) {
        if newer.value.kind() < self.value.kind() {
            return;
        }
        self.value = newer.value.clone();
        self.const_string = newer.const_string.clone();
        if newer.ty.is_some() {
            self.ty = newer.ty.clone();
        }
        self.is_new = newer.is_new;
        self.is_casted = newer.is_casted;
    }

    /// Copy for another location: keeps typing, value and elements, takes
    /// the name and origin of `origin`
    pub fn copy_to(&self, arena: &PointerArena, origin: Option<PointerId>, oracle: &dyn TypeOracle) -> Contr {
        let mut copy = match origin {
            Some(p) => Contr::for_pointer(arena, p, oracle),
            None => Contr::detached(),
        };
        copy.ty = self.ty.clone();
        copy.value = self.value.clone();
        copy.const_string = self.const_string.clone();
        copy.is_casted = self.is_casted;
        copy.is_new = self.is_new;
        copy.is_transient |= self.is_transient;
        copy.array_elements = self.array_elements.clone();
        copy
    }
}

impl PartialEq for Contr {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin && self.ty == other.ty && self.value == other.value
    }
}

impl Eq for Contr {}
