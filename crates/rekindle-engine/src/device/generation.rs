use std::fmt;

/// Identifies one device generation.
///
/// A new generation starts every time a device is created; everything created
/// under the previous one is released before that happens.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Placeholder before any device exists. Never handed out by [`next`](Self::next).
    pub(crate) const NONE: Generation = Generation(0);

    pub(crate) fn next(self) -> Self {
        Generation(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// A value created under a specific device generation.
///
/// Access goes through [`get`](Self::get)/[`get_mut`](Self::get_mut) with the
/// caller's current generation; debug builds reject stale access.
#[derive(Debug)]
pub struct Tagged<T> {
    generation: Generation,
    value: T,
}

impl<T> Tagged<T> {
    pub fn new(generation: Generation, value: T) -> Self {
        Self { generation, value }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[track_caller]
    pub fn get(&self, current: Generation) -> &T {
        debug_assert_eq!(
            self.generation, current,
            "stale handle from {} used under {}",
            self.generation, current
        );
        &self.value
    }

    #[track_caller]
    pub fn get_mut(&mut self, current: Generation) -> &mut T {
        debug_assert_eq!(
            self.generation, current,
            "stale handle from {} used under {}",
            self.generation, current
        );
        &mut self.value
    }

    /// Unwraps the value for release. No generation check.
    pub fn into_inner(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase() {
        let first = Generation::NONE.next();
        let second = first.next();
        assert_eq!(first.get(), 1);
        assert!(second > first);
        assert_eq!(second.to_string(), "gen#2");
    }

    #[test]
    fn matching_generation_grants_access() {
        let g = Generation::NONE.next();
        let mut tagged = Tagged::new(g, 7u32);
        *tagged.get_mut(g) += 1;
        assert_eq!(*tagged.get(g), 8);
        assert_eq!(tagged.into_inner(), 8);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "stale handle")]
    fn stale_generation_is_rejected_in_debug() {
        let old = Generation::NONE.next();
        let tagged = Tagged::new(old, ());
        tagged.get(old.next());
    }
}
