//! Per-voxel and grid-wide media overrides.
//!
//! Refresh rules add a fixed amount of media every cycle; static rules
//! pin selected media components to a fixed value every cycle. Both are
//! consulted by the grid each cycle and never changed by the controller.

use colony_core::Coord;

/// Adds `amounts` to the media at `coord` every cycle, on top of the
/// grid-wide refresh vector.
#[derive(Clone, Debug, PartialEq)]
pub struct RefreshPoint {
    /// Voxel this rule applies to.
    pub coord: Coord,
    /// Per-medium amount added each cycle (may be negative).
    pub amounts: Vec<f64>,
}

/// Pins the masked media components at `coord` to `values` every cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticPoint {
    /// Voxel this rule applies to.
    pub coord: Coord,
    /// Pinned value per medium; ignored where `mask` is false.
    pub values: Vec<f64>,
    /// Which media are pinned.
    pub mask: Vec<bool>,
}

/// Grid-wide static media: the masked components are pinned in every
/// voxel.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticMedia {
    /// Pinned value per medium.
    pub values: Vec<f64>,
    /// Which media are pinned.
    pub mask: Vec<bool>,
}

impl StaticMedia {
    /// No medium pinned.
    pub fn none(num_media: usize) -> Self {
        Self {
            values: vec![0.0; num_media],
            mask: vec![false; num_media],
        }
    }

    /// Whether any medium is pinned.
    pub fn is_active(&self) -> bool {
        self.mask.iter().any(|&m| m)
    }
}

/// Overwrite the masked entries of `media` with `values`, floored at 0.
pub(crate) fn pin(media: &mut [f64], values: &[f64], mask: &[bool]) {
    for ((m, &v), &on) in media.iter_mut().zip(values).zip(mask) {
        if on {
            *m = v.max(0.0);
        }
    }
}

/// Add `amounts` to `media` component-wise, flooring at 0.
pub(crate) fn add_clamped(media: &mut [f64], amounts: &[f64]) {
    for (m, &a) in media.iter_mut().zip(amounts) {
        *m = (*m + a).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_only_touches_masked_entries() {
        let mut media = vec![1.0, 2.0, 3.0];
        pin(&mut media, &[9.0, 9.0, -4.0], &[true, false, true]);
        assert_eq!(media, vec![9.0, 2.0, 0.0]);
    }

    #[test]
    fn add_clamped_never_goes_negative() {
        let mut media = vec![1.0, 0.5];
        add_clamped(&mut media, &[-2.0, 0.25]);
        assert_eq!(media, vec![0.0, 0.75]);
    }

    #[test]
    fn static_none_is_inactive() {
        assert!(!StaticMedia::none(3).is_active());
    }
}
