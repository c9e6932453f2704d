use crate::source::Asset;
use crate::types::VersionSize;

/// Which rendition to request for an asset, and whether it was substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantChoice {
    Requested(VersionSize),
    FellBack {
        requested: VersionSize,
        used: VersionSize,
    },
}

impl VariantChoice {
    /// The size to actually fetch.
    pub fn size(&self) -> VersionSize {
        match self {
            VariantChoice::Requested(size) => *size,
            VariantChoice::FellBack { used, .. } => *used,
        }
    }
}

/// Pick the size to request.
///
/// The requested size is kept when `force_exact` is set, when it is the
/// original, or when the asset has it. Otherwise the original is used
/// instead; at most one substitution happens.
pub fn select_variant(asset: &Asset, requested: VersionSize, force_exact: bool) -> VariantChoice {
    let mut candidate = requested;
    let mut force = force_exact;
    let mut substituted = false;

    loop {
        if force || candidate == VersionSize::Original || asset.has_version(candidate) {
            break;
        }
        debug_assert!(!substituted, "size fallback substitutes at most once");
        candidate = VersionSize::Original;
        force = true;
        substituted = true;
    }

    if substituted {
        VariantChoice::FellBack {
            requested,
            used: candidate,
        }
    } else {
        VariantChoice::Requested(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::image_asset;

    #[test]
    fn test_available_size_is_kept() {
        let asset = image_asset("A", "a.jpg", &[VersionSize::Original, VersionSize::Medium]);
        assert_eq!(
            select_variant(&asset, VersionSize::Medium, false),
            VariantChoice::Requested(VersionSize::Medium)
        );
    }

    #[test]
    fn test_missing_size_falls_back_to_original() {
        let asset = image_asset("A", "a.jpg", &[VersionSize::Original]);
        let choice = select_variant(&asset, VersionSize::Thumb, false);
        assert_eq!(
            choice,
            VariantChoice::FellBack {
                requested: VersionSize::Thumb,
                used: VersionSize::Original
            }
        );
        assert_eq!(choice.size(), VersionSize::Original);
    }

    #[test]
    fn test_force_keeps_missing_size() {
        let asset = image_asset("A", "a.jpg", &[VersionSize::Original]);
        assert_eq!(
            select_variant(&asset, VersionSize::Thumb, true),
            VariantChoice::Requested(VersionSize::Thumb)
        );
    }

    #[test]
    fn test_original_never_substituted() {
        // Even an asset with no original at all keeps the original request.
        let asset = image_asset("A", "a.jpg", &[VersionSize::Thumb]);
        assert_eq!(
            select_variant(&asset, VersionSize::Original, false),
            VariantChoice::Requested(VersionSize::Original)
        );
    }

    #[test]
    fn test_fallback_with_no_original_stops_after_one_substitution() {
        let asset = image_asset("A", "a.jpg", &[]);
        assert_eq!(
            select_variant(&asset, VersionSize::Medium, false).size(),
            VersionSize::Original
        );
    }
}
