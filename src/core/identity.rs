//! Identifier newtypes for archive records.
//!
//! Identifiers originate in the master document store; the engine treats
//! them as opaque strings but rejects values that could not have come
//! from the store (empty, embedded whitespace or control characters).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{CoreError, InvalidId};

fn check_id(raw: &str) -> Option<&'static str> {
    if raw.is_empty() {
        return Some("empty");
    }
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Some("contains whitespace or control character");
    }
    None
}

macro_rules! string_id {
    ($name:ident, $variant:ident, $what:literal) => {
        #[doc = concat!($what, " identifier.")]
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
                let raw = s.into();
                match check_id(&raw) {
                    Some(reason) => Err(InvalidId::$variant {
                        raw,
                        reason: reason.into(),
                    }
                    .into()),
                    None => Ok(Self(raw)),
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:?})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                $name::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

string_id!(TemplateId, Template, "Template");
string_id!(PropertyId, Property, "Template property");
string_id!(EntityId, Entity, "Entity");
string_id!(ConnectionId, Connection, "Connection (relationship edge)");
string_id!(ThesaurusId, Thesaurus, "Thesaurus (dictionary)");
string_id!(RelationTypeId, RelationType, "Relation type");
string_id!(HubId, Hub, "Relationship hub");
string_id!(FileId, File, "File");
string_id!(TranslationId, Translation, "Translation record");
