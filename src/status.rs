//! Per-entity status enums.
//!
//! All four share the `statuses` lookup table (1 and 2), but the meaning of
//! each id depends on the entity, so each gets its own type.

use serde::{Deserialize, Serialize};

/// A status as nested in expanded records: `{"id": 1, "nombre": "presente"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusLabel {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub label: &'static str,
}

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $on:ident => $on_label:literal, $off:ident => $off_label:literal }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(try_from = "i32", into = "i32")]
        #[repr(i32)]
        pub enum $name {
            $on = 1,
            $off = 2,
        }

        impl $name {
            pub fn label(self) -> &'static str {
                match self {
                    $name::$on => $on_label,
                    $name::$off => $off_label,
                }
            }

            pub fn expanded(self) -> StatusLabel {
                StatusLabel {
                    id: self as i32,
                    label: self.label(),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$on
            }
        }

        impl TryFrom<i32> for $name {
            type Error = String;

            fn try_from(id: i32) -> Result<Self, Self::Error> {
                match id {
                    1 => Ok($name::$on),
                    2 => Ok($name::$off),
                    other => Err(format!(
                        "estadoId {} no es válido para {}",
                        other,
                        stringify!($name)
                    )),
                }
            }
        }

        impl From<$name> for i32 {
            fn from(status: $name) -> i32 {
                status as i32
            }
        }
    };
}

status_enum!(
    StudentStatus { Active => "activo", Inactive => "inactivo" }
);

status_enum!(
    CourseStatus { Active => "activo", Inactive => "inactivo" }
);

status_enum!(
    /// Inactive enrollments are cancelled ones.
    EnrollmentStatus { Active => "activo", Inactive => "inactivo" }
);

status_enum!(
    AttendanceStatus { Present => "presente", Absent => "ausente" }
);
