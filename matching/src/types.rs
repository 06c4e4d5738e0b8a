use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Lost,
    Found,
}

impl Polarity {
    pub fn opposite(self) -> Self {
        match self {
            Polarity::Lost => Polarity::Found,
            Polarity::Found => Polarity::Lost,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Lost => "lost",
            Polarity::Found => "found",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lost" => Ok(Polarity::Lost),
            "found" => Ok(Polarity::Found),
            _ => Err(ParseEnumError::new("polarity", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Resolved,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Resolved,
}

/// Error returned when a category, location or polarity name is not one of
/// the fixed values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Declares a closed set of named values serialized as their display names.
macro_rules! named_set {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $label:tt),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| ParseEnumError::new($kind, s))
            }
        }
    };
}

named_set!(
    /// Item categories offered by the posting form.
    Category, "category", {
        Electronics => "Electronics",
        Documents => "Documents",
        Accessories => "Accessories",
        Books => "Books",
        Keys => "Keys",
        Clothing => "Clothing",
        Others => "Others",
    }
);

named_set!(
    /// Campus locations offered by the posting form.
    Location, "location", {
        ItBlockFloor1 => "IT Block Floor 1",
        ItBlockFloor2 => "IT Block Floor 2",
        Library => "Library",
        Canteen => "Canteen",
        MainBlock => "Main Block",
        SportsComplex => "Sports Complex",
        Parking => "Parking",
    }
);

/// A single lost-or-found posting.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub polarity: Polarity,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub location: Location,
    #[serde(default)]
    pub image: Option<String>,
    /// Opaque identity of the posting user.
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("malformed item {id:?}: {reason}")]
    Malformed { id: String, reason: &'static str },
}

impl Item {
    /// Reject records the scorer cannot work with. An empty description is
    /// fine; a blank title, id or owner is not.
    pub fn validate(&self) -> Result<(), ItemError> {
        let reason = if self.id.trim().is_empty() {
            "id is blank"
        } else if self.title.trim().is_empty() {
            "title is blank"
        } else if self.owner.trim().is_empty() {
            "owner is blank"
        } else {
            return Ok(());
        };
        Err(ItemError::Malformed {
            id: self.id.clone(),
            reason,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }
}

/// A proposed pairing between one lost and one found item.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Match {
    pub id: String,
    pub lost_item_id: String,
    pub found_item_id: String,
    pub lost_owner: String,
    pub found_owner: String,
    /// Confidence in `0..=10`.
    pub score: u8,
    pub created_at: DateTime<Utc>,
    pub status: MatchStatus,
}

/// Identifier of the match between `lost_id` and `found_id`.
///
/// A match always has exactly one participant of each polarity, so the id
/// does not depend on which of the two items was posted last. The lost id's
/// byte length prefixes the id, so ids that contain `_` cannot collide.
pub fn match_id(lost_id: &str, found_id: &str) -> String {
    format!("{}:{lost_id}_{found_id}", lost_id.len())
}

impl Match {
    /// Build a pending match for a lost/found pair. The caller guarantees the
    /// polarities; `score` is clamped to the valid range.
    pub fn pending(lost: &Item, found: &Item, score: u8, created_at: DateTime<Utc>) -> Self {
        Self {
            id: match_id(&lost.id, &found.id),
            lost_item_id: lost.id.clone(),
            found_item_id: found.id.clone(),
            lost_owner: lost.owner.clone(),
            found_owner: found.owner.clone(),
            score: score.min(crate::score::MAX_SCORE),
            created_at,
            status: MatchStatus::Pending,
        }
    }

    pub fn involves(&self, user: &str) -> bool {
        self.lost_owner == user || self.found_owner == user
    }

    pub fn references_item(&self, item_id: &str) -> bool {
        self.lost_item_id == item_id || self.found_item_id == item_id
    }

    pub fn is_pending(&self) -> bool {
        self.status == MatchStatus::Pending
    }
}
