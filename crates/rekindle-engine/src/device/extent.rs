/// Output dimensions in physical pixels.
///
/// Both sides are at least 1; the constructors clamp.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Builds an extent from signed host dimensions, clamping to 1.
    pub fn clamped(width: i32, height: i32) -> Self {
        Self::new(width.max(1) as u32, height.max(1) as u32)
    }
}

/// Display rotation reported by the host.
///
/// Stored and handed to the scene; the surface itself is never rotated.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Rotation {
    #[default]
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Self::Identity => 0,
            Self::Rotate90 => 90,
            Self::Rotate180 => 180,
            Self::Rotate270 => 270,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_raises_zero_and_negative_to_one() {
        assert_eq!(Extent::clamped(0, 0), Extent { width: 1, height: 1 });
        assert_eq!(Extent::clamped(-20, 480), Extent { width: 1, height: 480 });
        assert_eq!(Extent::clamped(640, i32::MIN), Extent { width: 640, height: 1 });
    }

    #[test]
    fn clamped_keeps_positive_sizes() {
        assert_eq!(Extent::clamped(800, 600), Extent { width: 800, height: 600 });
    }

    #[test]
    fn new_clamps_zero() {
        assert_eq!(Extent::new(0, 7), Extent { width: 1, height: 7 });
    }
}
