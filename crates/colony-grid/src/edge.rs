//! Spatial edge (boundary) behavior for the grid.

/// How the grid treats coordinates beyond its extent.
///
/// # Examples
///
/// ```
/// use colony_grid::EdgeBehavior;
///
/// assert_eq!(EdgeBehavior::Wrap.adjust(-1, 10), 9);
/// assert_eq!(EdgeBehavior::Wrap.adjust(10, 10), 0);
/// assert_eq!(EdgeBehavior::Clamp.adjust(-1, 10), 0);
/// assert_eq!(EdgeBehavior::Clamp.adjust(10, 10), 9);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EdgeBehavior {
    /// Out-of-range coordinates are barrier. Placement helpers clamp to
    /// the nearest edge voxel.
    #[default]
    Clamp,
    /// Every axis wraps modulo its extent (toroidal world).
    Wrap,
}

impl EdgeBehavior {
    /// Map one axis value into `[0, len)`.
    ///
    /// Wrap takes the value modulo `len`; Clamp pins it to the nearest
    /// edge. `len` must be non-zero.
    pub fn adjust(self, val: i32, len: u32) -> i32 {
        let n = len as i32;
        match self {
            Self::Wrap => val.rem_euclid(n),
            Self::Clamp => val.clamp(0, n - 1),
        }
    }

    /// Resolve one axis value for storage access.
    ///
    /// In-range values pass through. Out-of-range values wrap under
    /// `Wrap` and are rejected (`None`) under `Clamp`, since off-grid
    /// voxels are never stored.
    pub fn resolve(self, val: i32, len: u32) -> Option<i32> {
        let n = len as i32;
        if val >= 0 && val < n {
            return Some(val);
        }
        match self {
            Self::Wrap => Some(val.rem_euclid(n)),
            Self::Clamp => None,
        }
    }

    /// Whether this is the toroidal policy.
    pub fn is_toroidal(self) -> bool {
        matches!(self, Self::Wrap)
    }
}

impl From<bool> for EdgeBehavior {
    /// `true` selects [`EdgeBehavior::Wrap`] (the `toroidalworld` flag).
    fn from(toroidal: bool) -> Self {
        if toroidal {
            Self::Wrap
        } else {
            Self::Clamp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wrap_adjusts_both_ends() {
        assert_eq!(EdgeBehavior::Wrap.adjust(-1, 7), 6);
        assert_eq!(EdgeBehavior::Wrap.adjust(7, 7), 0);
        assert_eq!(EdgeBehavior::Wrap.adjust(-15, 7), 6);
    }

    #[test]
    fn clamp_resolve_rejects_out_of_range() {
        assert_eq!(EdgeBehavior::Clamp.resolve(-1, 5), None);
        assert_eq!(EdgeBehavior::Clamp.resolve(5, 5), None);
        assert_eq!(EdgeBehavior::Clamp.resolve(4, 5), Some(4));
        assert_eq!(EdgeBehavior::Wrap.resolve(5, 5), Some(0));
    }

    proptest! {
        #[test]
        fn adjust_always_lands_in_range(val in -10_000i32..10_000, len in 1u32..500) {
            for edge in [EdgeBehavior::Wrap, EdgeBehavior::Clamp] {
                let a = edge.adjust(val, len);
                prop_assert!(a >= 0 && a < len as i32);
            }
        }

        #[test]
        fn wrap_is_periodic(val in -1_000i32..1_000, len in 1u32..100) {
            let n = len as i32;
            prop_assert_eq!(
                EdgeBehavior::Wrap.adjust(val, len),
                EdgeBehavior::Wrap.adjust(val + n, len)
            );
        }
    }
}
