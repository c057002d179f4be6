use super::{ArrayHandler, ClassId, ScriptableHelper, ScriptableObject, ScriptableRef};
use crate::error::{BridgeError, BridgeResult};
use crate::slot::{MethodSlot, Signature};
use crate::variant::{Variant, VariantType};
use std::any::Any;
use std::rc::{Rc, Weak};

/// Fixed-size, read-only array of variants.
///
/// Exposes `count`/`length` constants, an `item(i)` method, `toArray()` and
/// positional access. The converter turns it into a script-native array.
pub struct ScriptableArray {
    helper: ScriptableHelper,
    items: Vec<Variant>,
    this: Weak<ScriptableArray>,
}

impl ScriptableArray {
    pub const CLASS_ID: ClassId = ClassId(0x65cf_2ba4_22c3_4a8e);

    pub fn new(items: Vec<Variant>) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Self>| {
            let helper = ScriptableHelper::new();
            helper.register_constant("count", items.len() as i64);
            helper.register_constant("length", items.len() as i64);
            helper.register_method(
                "item",
                Rc::new(MethodSlot::new(
                    this.clone(),
                    "item",
                    Signature::new(vec![VariantType::Int64], VariantType::Variant),
                    Self::item_method,
                )),
            );
            helper.register_method(
                "toArray",
                Rc::new(MethodSlot::new(
                    this.clone(),
                    "toArray",
                    Signature::new(vec![], VariantType::Scriptable),
                    Self::to_array_method,
                )),
            );
            helper.set_array_handler(this.clone());
            Self {
                helper,
                items,
                this: this.clone(),
            }
        })
    }

    pub fn from_strings<I, S>(items: I) -> Rc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(items.into_iter().map(|s| Variant::String(Some(s.into()))).collect())
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn item(&self, index: usize) -> Variant {
        self.items.get(index).cloned().unwrap_or_default()
    }

    pub fn items(&self) -> &[Variant] {
        &self.items
    }

    fn item_method(&self, args: &[Variant]) -> BridgeResult<Variant> {
        let index = args.first().and_then(Variant::as_i64).unwrap_or(-1);
        Ok(usize::try_from(index).map(|i| self.item(i)).unwrap_or_default())
    }

    fn to_array_method(&self, _args: &[Variant]) -> BridgeResult<Variant> {
        let this: ScriptableRef = self.this.upgrade().ok_or(BridgeError::ObjectDeleted)?;
        Ok(Variant::Scriptable(Some(this)))
    }
}

impl ArrayHandler for ScriptableArray {
    fn item_count(&self) -> usize {
        self.count()
    }

    fn get_item(&self, index: usize) -> Variant {
        self.item(index)
    }
}

impl ScriptableObject for ScriptableArray {
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
