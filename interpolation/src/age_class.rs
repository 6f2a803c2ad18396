//! Age brackets reported alongside each entry

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::AgeBounds;

/// Competition age bracket, derived from resolved age bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgeClass {
    #[serde(rename = "0-18")]
    Class0_18,
    #[serde(rename = "19-23")]
    Class19_23,
    #[serde(rename = "39-44")]
    Class39_44,
    #[serde(rename = "45-49")]
    Class45_49,
    #[serde(rename = "50-54")]
    Class50_54,
    #[serde(rename = "55-59")]
    Class55_59,
    #[serde(rename = "60-64")]
    Class60_64,
    #[serde(rename = "65-69")]
    Class65_69,
    #[serde(rename = "70-74")]
    Class70_74,
    #[serde(rename = "75-79")]
    Class75_79,
    #[serde(rename = "80-999")]
    Class80_999,
    #[default]
    #[serde(rename = "")]
    None,
}

/// Master brackets as (exclusive lower age, inclusive upper age)
const MASTERS: &[(u32, u32, AgeClass)] = &[
    (44, 49, AgeClass::Class45_49),
    (49, 54, AgeClass::Class50_54),
    (54, 59, AgeClass::Class55_59),
    (59, 64, AgeClass::Class60_64),
    (64, 69, AgeClass::Class65_69),
    (69, 74, AgeClass::Class70_74),
    (74, 79, AgeClass::Class75_79),
];

impl AgeClass {
    /// First matching bracket wins. A missing bound never satisfies a
    /// condition that names it.
    pub fn from_bounds(bounds: AgeBounds) -> AgeClass {
        let AgeBounds { min, max } = bounds;

        if let Some(max) = max {
            if max <= 18 {
                return AgeClass::Class0_18;
            }
            if max <= 23 {
                return AgeClass::Class19_23;
            }
        }

        let Some(min) = min else {
            return AgeClass::None;
        };

        if let Some(max) = max {
            if min >= 39 && max <= 44 {
                return AgeClass::Class39_44;
            }
            if let Some(&(_, _, class)) = MASTERS
                .iter()
                .find(|(above, upto, _)| min > *above && max <= *upto)
            {
                return class;
            }
        }

        if min > 79 {
            AgeClass::Class80_999
        } else {
            AgeClass::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeClass::Class0_18 => "0-18",
            AgeClass::Class19_23 => "19-23",
            AgeClass::Class39_44 => "39-44",
            AgeClass::Class45_49 => "45-49",
            AgeClass::Class50_54 => "50-54",
            AgeClass::Class55_59 => "55-59",
            AgeClass::Class60_64 => "60-64",
            AgeClass::Class65_69 => "65-69",
            AgeClass::Class70_74 => "70-74",
            AgeClass::Class75_79 => "75-79",
            AgeClass::Class80_999 => "80-999",
            AgeClass::None => "",
        }
    }
}

impl fmt::Display for AgeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
