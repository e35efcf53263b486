//! Toggleable audio filters applied to the outgoing stream before it reaches
//! the transport.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::music_manager::MusicError;

/// A named audio transform.
///
/// Variant order is the canonical application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterName {
    BassBoost,
    Nightcore,
    Vaporwave,
}

impl FilterName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BassBoost => "bassboost",
            Self::Nightcore => "nightcore",
            Self::Vaporwave => "vaporwave",
        }
    }

    /// ffmpeg `-af` expression for this transform.
    pub fn ffmpeg_expr(&self) -> &'static str {
        match self {
            Self::BassBoost => "bass=g=20:f=110:w=0.3",
            Self::Nightcore => "aresample=48000,asetrate=48000*1.25",
            Self::Vaporwave => "aresample=48000,asetrate=48000*0.8",
        }
    }

    /// Media seconds consumed per wall-clock second.
    pub fn speed(&self) -> f64 {
        match self {
            Self::BassBoost => 1.0,
            Self::Nightcore => 1.25,
            Self::Vaporwave => 0.8,
        }
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterName {
    type Err = MusicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bassboost" | "bass-boost" | "bass_boost" | "bass" => Ok(Self::BassBoost),
            "nightcore" | "speed" => Ok(Self::Nightcore),
            "vaporwave" | "slowed" => Ok(Self::Vaporwave),
            _ => Err(MusicError::UnknownFilter(s.to_string())),
        }
    }
}

/// The set of active filters. Iteration and the composed ffmpeg expression
/// always follow the canonical order, whatever order filters were toggled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    active: BTreeSet<FilterName>,
}

impl FilterChain {
    /// Flips membership of `name`. Returns whether it is now active.
    pub fn toggle(&mut self, name: FilterName) -> bool {
        if self.active.remove(&name) {
            false
        } else {
            self.active.insert(name);
            true
        }
    }

    pub fn contains(&self, name: FilterName) -> bool {
        self.active.contains(&name)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FilterName> + '_ {
        self.active.iter().copied()
    }

    /// Composed `-af` argument, or `None` when no filter is active.
    pub fn ffmpeg_filter(&self) -> Option<String> {
        if self.active.is_empty() {
            return None;
        }

        Some(
            self.iter()
                .map(|name| name.ffmpeg_expr())
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Combined playback speed of all active filters.
    pub fn speed_factor(&self) -> f64 {
        self.iter().map(|name| name.speed()).product()
    }
}

impl FromIterator<FilterName> for FilterChain {
    fn from_iter<I: IntoIterator<Item = FilterName>>(iter: I) -> Self {
        Self {
            active: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.active.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(|name| name.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("bassboost", FilterName::BassBoost)]
    #[case("Bass-Boost", FilterName::BassBoost)]
    #[case("speed", FilterName::Nightcore)]
    #[case("nightcore", FilterName::Nightcore)]
    #[case(" slowed ", FilterName::Vaporwave)]
    fn parses_filter_aliases(#[case] input: &str, #[case] expected: FilterName) {
        assert_eq!(input.parse::<FilterName>().unwrap(), expected);
    }

    #[test]
    fn unknown_filter_is_rejected() {
        assert_matches!("8d".parse::<FilterName>(), Err(MusicError::UnknownFilter(name)) if name == "8d");
    }

    #[test]
    fn toggling_twice_restores_composition() {
        let mut chain: FilterChain = [FilterName::Nightcore].into_iter().collect();
        let original = chain.clone();

        assert!(chain.toggle(FilterName::BassBoost));
        assert!(!chain.toggle(FilterName::BassBoost));

        assert_eq!(chain, original);
    }

    #[test]
    fn composition_is_independent_of_toggle_order() {
        let mut forward = FilterChain::default();
        forward.toggle(FilterName::BassBoost);
        forward.toggle(FilterName::Vaporwave);

        let mut backward = FilterChain::default();
        backward.toggle(FilterName::Vaporwave);
        backward.toggle(FilterName::BassBoost);

        assert_eq!(forward.ffmpeg_filter(), backward.ffmpeg_filter());
        assert_eq!(
            forward.ffmpeg_filter().unwrap(),
            "bass=g=20:f=110:w=0.3,aresample=48000,asetrate=48000*0.8"
        );
    }

    #[test]
    fn empty_chain_has_no_filter_and_unit_speed() {
        let chain = FilterChain::default();

        assert_eq!(chain.ffmpeg_filter(), None);
        assert_eq!(chain.speed_factor(), 1.0);
        assert_eq!(chain.to_string(), "none");
    }

    #[test]
    fn speed_factor_multiplies() {
        let chain: FilterChain = [FilterName::Nightcore, FilterName::BassBoost]
            .into_iter()
            .collect();

        assert_eq!(chain.speed_factor(), 1.25);
        assert_eq!(chain.to_string(), "bassboost, nightcore");
    }
}
