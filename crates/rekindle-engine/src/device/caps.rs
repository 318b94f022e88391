use std::cmp::Ordering;
use std::fmt;

/// Feature tier negotiated at device creation.
///
/// Tiers are totally ordered; `Full` is the highest. Downstream code must only
/// rely on the tier that was granted, never on the one that was requested.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CapabilityLevel {
    /// WebGPU-compliant adapter with default limits.
    Full,
    /// Downlevel limits (older desktop/mobile GPUs).
    Downlevel,
    /// The WebGL2-compatible floor.
    WebGl2,
}

impl CapabilityLevel {
    /// Every tier, highest first.
    pub const ALL: [CapabilityLevel; 3] = [Self::Full, Self::Downlevel, Self::WebGl2];

    fn rank(self) -> u8 {
        match self {
            Self::Full => 2,
            Self::Downlevel => 1,
            Self::WebGl2 => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Downlevel => "downlevel",
            Self::WebGl2 => "webgl2",
        }
    }
}

impl PartialOrd for CapabilityLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CapabilityLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for CapabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks that a preference list is non-empty and strictly descending.
///
/// A list that climbs would let negotiation grant a higher tier after a lower
/// one was acceptable.
pub(crate) fn validate_preferences(levels: &[CapabilityLevel]) -> Result<(), String> {
    if levels.is_empty() {
        return Err("no capability levels configured".to_string());
    }

    for pair in levels.windows(2) {
        if pair[0] <= pair[1] {
            return Err(format!(
                "capability levels must be listed highest first; `{}` is followed by `{}`",
                pair[0], pair[1]
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered_highest_first() {
        assert!(CapabilityLevel::Full > CapabilityLevel::Downlevel);
        assert!(CapabilityLevel::Downlevel > CapabilityLevel::WebGl2);

        let mut sorted = CapabilityLevel::ALL;
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(sorted, CapabilityLevel::ALL);
    }

    #[test]
    fn full_list_is_valid() {
        assert!(validate_preferences(&CapabilityLevel::ALL).is_ok());
        assert!(validate_preferences(&[CapabilityLevel::WebGl2]).is_ok());
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(validate_preferences(&[]).is_err());
    }

    #[test]
    fn climbing_list_is_rejected() {
        let err = validate_preferences(&[CapabilityLevel::Downlevel, CapabilityLevel::Full])
            .unwrap_err();
        assert!(err.contains("highest first"));
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        assert!(validate_preferences(&[CapabilityLevel::Full, CapabilityLevel::Full]).is_err());
    }
}
