use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// How far below a starting path a traversal reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Depth {
    /// Only the starting path itself.
    Zero,
    /// The starting path and its direct children.
    One,
    /// The starting path and every descendant.
    Infinite,
}

impl Depth {
    /// Numeric level count; `Infinite` maps to `u32::MAX`.
    pub fn levels(self) -> u32 {
        match self {
            Depth::Zero => 0,
            Depth::One => 1,
            Depth::Infinite => u32::MAX,
        }
    }

    /// Returns `true` if entries one level below the start are in scope.
    pub fn includes_children(self) -> bool {
        !matches!(self, Depth::Zero)
    }

    /// The depth remaining after stepping one level down.
    pub fn below(self) -> Depth {
        match self {
            Depth::Zero | Depth::One => Depth::Zero,
            Depth::Infinite => Depth::Infinite,
        }
    }

    /// Returns `true` if a path `levels` segments below the start is in scope.
    pub fn reaches(self, levels: usize) -> bool {
        match self {
            Depth::Zero => levels == 0,
            Depth::One => levels <= 1,
            Depth::Infinite => true,
        }
    }
}

impl TryFrom<u32> for Depth {
    type Error = TypeError;

    fn try_from(levels: u32) -> Result<Self, Self::Error> {
        match levels {
            0 => Ok(Depth::Zero),
            1 => Ok(Depth::One),
            u32::MAX => Ok(Depth::Infinite),
            other => Err(TypeError::InvalidDepth(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_steps_down() {
        assert_eq!(Depth::One.below(), Depth::Zero);
        assert_eq!(Depth::Infinite.below(), Depth::Infinite);
        assert_eq!(Depth::Zero.below(), Depth::Zero);
    }

    #[test]
    fn reaches_matches_levels() {
        assert!(Depth::Zero.reaches(0));
        assert!(!Depth::Zero.reaches(1));
        assert!(Depth::One.reaches(1));
        assert!(!Depth::One.reaches(2));
        assert!(Depth::Infinite.reaches(1000));
    }

    #[test]
    fn levels_roundtrip() {
        for depth in [Depth::Zero, Depth::One, Depth::Infinite] {
            assert_eq!(Depth::try_from(depth.levels()), Ok(depth));
        }
        assert_eq!(Depth::try_from(7), Err(TypeError::InvalidDepth(7)));
    }
}
