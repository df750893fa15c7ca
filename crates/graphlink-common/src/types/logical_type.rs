//! Declared (logical) types of native values and result columns.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TypeTag;

/// A native value's declared type, as far as the boundary layer can read it.
///
/// Carries the raw native id so that ids without a [`TypeTag`] are still
/// reported faithfully.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalType {
    native_id: u32,
    child: Option<Box<LogicalType>>,
    array_size: Option<u64>,
}

impl LogicalType {
    /// Creates a type from a raw native id with no child information.
    #[must_use]
    pub fn from_native_id(native_id: u32) -> Self {
        Self {
            native_id,
            child: None,
            array_size: None,
        }
    }

    /// Creates a scalar type.
    #[must_use]
    pub fn scalar(tag: TypeTag) -> Self {
        Self::from_native_id(tag.native_id())
    }

    /// Creates a list type.
    #[must_use]
    pub fn list(child: LogicalType) -> Self {
        Self::scalar(TypeTag::List).with_child(child)
    }

    /// Creates a fixed-size array type.
    #[must_use]
    pub fn array(child: LogicalType, size: u64) -> Self {
        Self {
            array_size: Some(size),
            ..Self::scalar(TypeTag::Array).with_child(child)
        }
    }

    /// Attaches a child (element) type.
    #[must_use]
    pub fn with_child(mut self, child: LogicalType) -> Self {
        self.child = Some(Box::new(child));
        self
    }

    /// Sets the fixed array arity.
    #[must_use]
    pub fn with_array_size(mut self, size: u64) -> Self {
        self.array_size = Some(size);
        self
    }

    /// Returns the raw native type id.
    #[must_use]
    pub fn native_id(&self) -> u32 {
        self.native_id
    }

    /// Returns the tag, or `None` if the id is not one this layer models.
    #[must_use]
    pub fn tag(&self) -> Option<TypeTag> {
        TypeTag::from_native_id(self.native_id)
    }

    /// Returns the element type of a list or array.
    #[must_use]
    pub fn child(&self) -> Option<&LogicalType> {
        self.child.as_deref()
    }

    /// Returns the fixed arity of an array type.
    #[must_use]
    pub fn array_size(&self) -> Option<u64> {
        self.array_size
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Some(tag) => write!(f, "{tag}")?,
            None => write!(f, "UNKNOWN({})", self.native_id)?,
        }
        if let Some(child) = &self.child {
            write!(f, "<{child}>")?;
        }
        if let Some(size) = self.array_size {
            write!(f, "[{size}]")?;
        }
        Ok(())
    }
}

impl From<TypeTag> for LogicalType {
    fn from(tag: TypeTag) -> Self {
        Self::scalar(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ty = LogicalType::array(LogicalType::scalar(TypeTag::Float), 3);
        assert_eq!(ty.to_string(), "ARRAY<FLOAT>[3]");
        assert_eq!(ty.array_size(), Some(3));

        let list = LogicalType::list(TypeTag::String.into());
        assert_eq!(list.to_string(), "LIST<STRING>");
        assert_eq!(list.child().and_then(LogicalType::tag), Some(TypeTag::String));

        assert_eq!(LogicalType::from_native_id(41).to_string(), "UNKNOWN(41)");
    }
}
