//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data in the
//! corresponding `*_statuses` table, and its label is the value exposed
//! over the API.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// The upper-case label used on the wire.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }

            /// Parse an upper-case label.
            pub fn from_label(label: &str) -> Option<Self> {
                match label {
                    $( $label => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let label = String::deserialize(deserializer)?;
                Self::from_label(&label).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        concat!("unknown ", stringify!($name), ": {}"),
                        label
                    ))
                })
            }
        }
    };
}

define_status_enum! {
    /// Orchestration-level process lifecycle status.
    ///
    /// `Running` is the only non-terminal state.
    ProcessStatus {
        Running = 1 => "RUNNING",
        Finished = 2 => "FINISHED",
        Failed = 3 => "FAILED",
    }
}

define_status_enum! {
    /// Outcome of a named log segment.
    SegmentStatus {
        Running = 1 => "RUNNING",
        Ok = 2 => "OK",
        Failed = 3 => "FAILED",
    }
}

impl ProcessStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

/// Terminal process statuses, for `NOT IN` guards.
pub const TERMINAL_PROCESS_STATUSES: [StatusId; 2] = [
    ProcessStatus::Finished as StatusId,
    ProcessStatus::Failed as StatusId,
];
