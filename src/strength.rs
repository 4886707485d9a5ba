use std::{fmt, str::FromStr};

use anyhow::bail;
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// How confident a comparison is that a data item and a map element are the
/// same real-world object.
///
/// `Unmatched` is not a weak match: a candidate scoring it is never paired.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    DeserializeFromStr,
    SerializeDisplay,
)]
pub enum MatchStrength {
    Unmatched,
    Regular,
    Good,
    Strong,
}

impl MatchStrength {
    pub fn all() -> Vec<Self> {
        vec![Self::Unmatched, Self::Regular, Self::Good, Self::Strong]
    }

    pub fn is_match(&self) -> bool {
        *self >= Self::Regular
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Unmatched => "unmatched",
            Self::Regular => "regular",
            Self::Good => "good",
            Self::Strong => "strong",
        }
    }
}

impl fmt::Display for MatchStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for MatchStrength {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "unmatched" => Self::Unmatched,
            "regular" => Self::Regular,
            "good" => Self::Good,
            "strong" => Self::Strong,
            _ => bail!("Unknown match strength: {s}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(MatchStrength::Unmatched < MatchStrength::Regular);
        assert!(MatchStrength::Regular < MatchStrength::Good);
        assert!(MatchStrength::Good < MatchStrength::Strong);
        assert!(!MatchStrength::Unmatched.is_match());
        assert!(MatchStrength::Regular.is_match());
    }

    #[test]
    fn parse() {
        for x in MatchStrength::all() {
            assert_eq!(x.slug().parse::<MatchStrength>().unwrap(), x);
        }
        assert!("Strong".parse::<MatchStrength>().is_err());
        assert_eq!(
            serde_json::to_string(&MatchStrength::Good).unwrap(),
            "\"good\""
        );
    }
}
