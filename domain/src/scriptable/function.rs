use super::{ClassId, ScriptableHelper, ScriptableObject, ScriptableRef, object_key};
use crate::error::BridgeResult;
use crate::slot::SlotRef;
use crate::variant::Variant;
use std::any::Any;
use std::rc::{Rc, Weak};

/// A callable scriptable object wrapping a slot.
///
/// Dynamically resolved methods are handed to scripts this way, because a
/// dynamic member has no static method entry the engine could bind. The
/// optional owner lets `owner:method()` calls drop the leading receiver.
pub struct ScriptableFunction {
    helper: ScriptableHelper,
    slot: SlotRef,
    owner: Option<Weak<dyn ScriptableObject>>,
}

impl ScriptableFunction {
    pub const CLASS_ID: ClassId = ClassId(0x2a1c_d05e_7f39_4b16);

    pub fn new(slot: SlotRef) -> Rc<Self> {
        Rc::new(Self {
            helper: ScriptableHelper::new(),
            slot,
            owner: None,
        })
    }

    pub fn with_owner(slot: SlotRef, owner: Weak<dyn ScriptableObject>) -> Rc<Self> {
        Rc::new(Self {
            helper: ScriptableHelper::new(),
            slot,
            owner: Some(owner),
        })
    }

    pub fn slot(&self) -> &SlotRef {
        &self.slot
    }

    pub fn owner(&self) -> Option<ScriptableRef> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    /// Whether `object` is the owner this function was fetched from.
    pub fn is_owned_by(&self, object: &ScriptableRef) -> bool {
        self.owner()
            .is_some_and(|owner| object_key(&owner) == object_key(object))
    }

    pub fn call(&self, args: &[Variant]) -> BridgeResult<Variant> {
        self.slot.call(args)
    }
}

impl ScriptableObject for ScriptableFunction {
    fn class_id(&self) -> ClassId {
        Self::CLASS_ID
    }

    fn helper(&self) -> &ScriptableHelper {
        &self.helper
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
