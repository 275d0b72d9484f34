//! Change-log namespace tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which kind of record a change-log entry refers to.
///
/// Unknown tags are preserved verbatim so the pass-through projection
/// rule can still address them by name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    Settings,
    Templates,
    Entities,
    Connections,
    Files,
    Dictionaries,
    Relationtypes,
    Translations,
    Other(String),
}

impl Namespace {
    /// The namespaces with a dedicated redaction rule.
    pub const KNOWN: [Namespace; 8] = [
        Namespace::Settings,
        Namespace::Templates,
        Namespace::Entities,
        Namespace::Connections,
        Namespace::Files,
        Namespace::Dictionaries,
        Namespace::Relationtypes,
        Namespace::Translations,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Namespace::Settings => "settings",
            Namespace::Templates => "templates",
            Namespace::Entities => "entities",
            Namespace::Connections => "connections",
            Namespace::Files => "files",
            Namespace::Dictionaries => "dictionaries",
            Namespace::Relationtypes => "relationtypes",
            Namespace::Translations => "translations",
            Namespace::Other(tag) => tag.as_str(),
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag {
            "settings" => Namespace::Settings,
            "templates" => Namespace::Templates,
            "entities" => Namespace::Entities,
            "connections" => Namespace::Connections,
            "files" => Namespace::Files,
            "dictionaries" => Namespace::Dictionaries,
            "relationtypes" => Namespace::Relationtypes,
            "translations" => Namespace::Translations,
            other => Namespace::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Namespace::parse(s))
    }
}

impl Serialize for Namespace {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Namespace::parse(&raw))
    }
}
