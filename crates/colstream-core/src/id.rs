//! Strongly-typed identifiers handed out by layouts and readers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(v: u32) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u32 {
                self.0
            }
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

// Assigned by a `FieldLayout` when a column is registered.
new_id!(FieldId);
// Position of a column inside one reader (mapping order).
new_id!(ColumnIndex);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_id_kind() {
        assert_eq!(FieldId::new(3).to_string(), "FieldId(3)");
        assert_eq!(ColumnIndex::new(0).index(), 0);
    }

    #[test]
    fn serializes_transparently() {
        let s = serde_json::to_string(&FieldId::new(7)).unwrap();
        assert_eq!(s, "7");
    }
}
