//! Metadata field set.
//!
//! A fixed-width bit set with one flag per metadata field. `ALL` is the
//! complement of `NONE`, so any flag added later is included in `ALL`
//! without touching its definition.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Set of metadata fields requested from the metadata server.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataField(u32);

impl MetadataField {
    /// No fields.
    pub const NONE: Self = Self(0);

    /// Project ID (`project/project-id`).
    pub const PROJECT_ID: Self = Self(1 << 0);

    /// Project number (`project/numeric-project-id`).
    pub const PROJECT_NUMBER: Self = Self(1 << 1);

    /// Region (`instance/region`).
    pub const REGION: Self = Self(1 << 2);

    /// Instance ID (`instance/id`).
    pub const INSTANCE_ID: Self = Self(1 << 3);

    /// Default service account email.
    pub const SERVICE_ACCOUNT_EMAIL: Self = Self(1 << 4);

    /// Every field, including fields added in the future.
    pub const ALL: Self = Self(!0);

    /// The five individual fields, in declaration order.
    pub const FIELDS: [Self; 5] = [
        Self::PROJECT_ID,
        Self::PROJECT_NUMBER,
        Self::REGION,
        Self::INSTANCE_ID,
        Self::SERVICE_ACCOUNT_EMAIL,
    ];

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Builds a set from raw bits. Unknown bits are kept.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// True if any flag in `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True if no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Union of two sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Stable name of a single-field value, used for log and metric labels.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NONE => "none",
            Self::PROJECT_ID => "project_id",
            Self::PROJECT_NUMBER => "project_number",
            Self::REGION => "region",
            Self::INSTANCE_ID => "instance_id",
            Self::SERVICE_ACCOUNT_EMAIL => "service_account_email",
            Self::ALL => "all",
            _ => "multiple",
        }
    }
}

impl Default for MetadataField {
    /// Loaders request every field unless told otherwise.
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for MetadataField {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for MetadataField {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for MetadataField {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for MetadataField {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => f.write_str("MetadataField(NONE)"),
            Self::ALL => f.write_str("MetadataField(ALL)"),
            _ => {
                let names: Vec<&str> = Self::FIELDS
                    .iter()
                    .filter(|field| self.contains(**field))
                    .map(|field| field.name())
                    .collect();
                write!(f, "MetadataField({})", names.join(" | "))
            }
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
