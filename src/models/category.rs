use serde_repr::{Deserialize_repr, Serialize_repr};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Categories known to the upstream news API. The discriminant is the wire id;
/// `Display` gives the human-readable name, and both that name and the bare
/// variant name parse back.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize_repr,
    Deserialize_repr,
    EnumIter,
    EnumString,
    Display,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum Category {
    Technology = 1,
    Business = 2,
    Science = 3,
    Health = 4,
    Sports = 5,
    Entertainment = 6,
    Politics = 7,
    #[strum(to_string = "World News", serialize = "World")]
    World = 8,
}

impl Category {
    pub fn id(self) -> i64 {
        i64::from(self as u8)
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::iter().find(|c| c.id() == id)
    }

    pub fn display_name(self) -> &'static str {
        self.into()
    }

    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

impl From<Category> for i64 {
    fn from(value: Category) -> Self {
        value.id()
    }
}
