//! Static page content: one explicit section schema per known page slug.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageSlug {
    About,
    People,
    Reports,
}

impl PageSlug {
    pub const ALL: [PageSlug; 3] = [PageSlug::About, PageSlug::People, PageSlug::Reports];

    pub fn as_str(self) -> &'static str {
        match self {
            PageSlug::About => "about",
            PageSlug::People => "people",
            PageSlug::Reports => "reports",
        }
    }

    pub fn default_title(self) -> &'static str {
        match self {
            PageSlug::About => "About",
            PageSlug::People => "People",
            PageSlug::Reports => "Reports",
        }
    }
}

impl fmt::Display for PageSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageSlug {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "about" => Ok(PageSlug::About),
            "people" => Ok(PageSlug::People),
            "reports" => Ok(PageSlug::Reports),
            _ => Err(DomainError::not_found("page")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AboutSections {
    #[serde(default)]
    pub subsections: Vec<Subsection>,
    #[serde(default)]
    pub stats: Vec<StatBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Subsection {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatBlock {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PeopleSections {
    #[serde(default)]
    pub groups: Vec<PeopleGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PeopleGroup {
    pub title: String,
    #[serde(default)]
    pub people: Vec<Person>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Person {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReportsSections {
    #[serde(default)]
    pub reports: Vec<Report>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Report {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// Page sections tagged by the page they belong to.
#[derive(Debug, Clone, PartialEq)]
pub enum PageSections {
    About(AboutSections),
    People(PeopleSections),
    Reports(ReportsSections),
}

impl PageSections {
    /// Validate a raw JSON document against the schema for `slug`.
    pub fn parse(slug: PageSlug, raw: Value) -> Result<Self, DomainError> {
        let invalid =
            |err: serde_json::Error| DomainError::validation(format!("invalid {slug} sections: {err}"));
        match slug {
            PageSlug::About => serde_json::from_value(raw).map(Self::About).map_err(invalid),
            PageSlug::People => serde_json::from_value(raw).map(Self::People).map_err(invalid),
            PageSlug::Reports => serde_json::from_value(raw)
                .map(Self::Reports)
                .map_err(invalid),
        }
    }

    pub fn empty(slug: PageSlug) -> Self {
        match slug {
            PageSlug::About => Self::About(AboutSections {
                subsections: Vec::new(),
                stats: Vec::new(),
            }),
            PageSlug::People => Self::People(PeopleSections { groups: Vec::new() }),
            PageSlug::Reports => Self::Reports(ReportsSections {
                reports: Vec::new(),
            }),
        }
    }

    pub fn slug(&self) -> PageSlug {
        match self {
            Self::About(_) => PageSlug::About,
            Self::People(_) => PageSlug::People,
            Self::Reports(_) => PageSlug::Reports,
        }
    }

    /// Normalised JSON for storage.
    pub fn to_value(&self) -> Value {
        let result = match self {
            Self::About(sections) => serde_json::to_value(sections),
            Self::People(sections) => serde_json::to_value(sections),
            Self::Reports(sections) => serde_json::to_value(sections),
        };
        result.unwrap_or(Value::Null)
    }
}
