//! The closed set of topical areas an affirmation can be filed under.
//!
//! Every area has three spellings:
//! - `key`: the lowercase token used in permalinks, tags, and the counter table
//! - `menu_label`: the short label shown in the area picker
//! - `filed_under_label`: the longer label printed on the card kicker
//!
//! `general` is the fallback for unknown tags and for empty sub-pools.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    #[default]
    General,
    Agency,
    Brand,
    Email,
    Events,
    Growth,
    Performance,
    Product,
    Seo,
    Social,
}

impl Area {
    /// All areas in menu order.
    pub const ALL: [Area; 10] = [
        Area::General,
        Area::Agency,
        Area::Brand,
        Area::Email,
        Area::Events,
        Area::Growth,
        Area::Performance,
        Area::Product,
        Area::Seo,
        Area::Social,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Area::General => "general",
            Area::Agency => "agency",
            Area::Brand => "brand",
            Area::Email => "email",
            Area::Events => "events",
            Area::Growth => "growth",
            Area::Performance => "performance",
            Area::Product => "product",
            Area::Seo => "seo",
            Area::Social => "social",
        }
    }

    pub fn menu_label(self) -> &'static str {
        match self {
            Area::General => "General",
            Area::Agency => "Agency",
            Area::Brand => "Brand",
            Area::Email => "Email/CRM",
            Area::Events => "Events",
            Area::Growth => "Growth",
            Area::Performance => "Performance",
            Area::Product => "Product",
            Area::Seo => "SEO",
            Area::Social => "Social",
        }
    }

    /// Label used on the card: `Filed under: {label}`.
    pub fn filed_under_label(self) -> &'static str {
        match self {
            Area::General => "General Marketing",
            Area::Email => "Email / CRM",
            other => other.menu_label(),
        }
    }

    /// Look up an area by its exact key. Keys are case-sensitive, matching
    /// how tags and path segments are compared.
    pub fn from_key(key: &str) -> Option<Area> {
        Area::ALL.into_iter().find(|a| a.key() == key)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown area '{0}'")]
pub struct UnknownArea(pub String);

impl FromStr for Area {
    type Err = UnknownArea;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Area::from_key(s).ok_or_else(|| UnknownArea(s.to_string()))
    }
}
