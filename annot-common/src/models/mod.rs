//! Domain models shared by the repositories and the HTTP layer

/// Implements `as_str`, `Display` and `FromStr` for a unit-only enum stored as TEXT
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            /// All variants in declaration order
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Canonical text form (as stored and serialized)
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<Self> {
                match s {
                    $($label => Ok($ty::$variant),)+
                    other => Err(crate::Error::InvalidInput(format!(
                        "Invalid {} '{}' (expected one of: {})",
                        stringify!($ty),
                        other,
                        [$($label),+].join(", ")
                    ))),
                }
            }
        }
    };
}

pub(crate) use text_enum;

pub mod action_log;
pub mod annotation;
pub mod import;
pub mod lookup;
pub mod project;
pub mod user;

pub use action_log::{ActionLog, ActionType, EntityType};
pub use annotation::{
    AnnotationPatch, AnnotationRecord, AnnotationStatus, AuditEntry, AuditMetadata, FieldChange,
    FunctionType, NewAnnotation, NoveltyType,
};
pub use import::{ImportBatch, ImportRowError};
pub use lookup::{
    Domain, DomainPatch, DomainRelation, DomainRelationPatch, DomainType, NewDomain, NewDomainRelation,
    Pos, RelationType,
};
pub use project::{Document, DocumentPatch, DocumentStatus, NewDocument, NewProject, Project, ProjectPatch};
pub use user::{IdentityProfile, NewUser, User, UserPatch, UserRole};
