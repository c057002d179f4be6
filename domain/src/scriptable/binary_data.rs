use super::{ClassId, ScriptableHelper, ScriptableObject};
use std::any::Any;
use std::rc::Rc;

/// Opaque byte buffer handed to scripts.
///
/// Scripts only see its `size`. Assigning it to a string-typed parameter
/// yields its bytes up to the first NUL.
pub struct ScriptableBinaryData {
    helper: ScriptableHelper,
    data: Vec<u8>,
}

impl ScriptableBinaryData {
    pub const CLASS_ID: ClassId = ClassId(0x381b_8c27_5e4f_4c53);

    pub fn new(data: impl Into<Vec<u8>>) -> Rc<Self> {
        let data = data.into();
        let helper = ScriptableHelper::new();
        helper.register_constant("size", data.len() as i64);
        Rc::new(Self { helper, data })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes before the first NUL.
    pub fn until_nul(&self) -> &[u8] {
        match self.data.iter().position(|&b| b == 0) {
            Some(end) => &self.data[..end],
            None => &self.data,
        }
    }
}

impl ScriptableObject for ScriptableBinaryData {
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
