use trippilot_core::TourOption;
use uuid::Uuid;

/// Bundles generated per candidate.
pub(crate) const MAX_TOUR_BUNDLES: usize = 5;

/// Largest number of tours attached to one package.
pub(crate) const MAX_TOURS_PER_BUNDLE: usize = 3;

/// Index patterns over the first four tours, in the order they are tried.
const PATTERNS: [&[usize]; 8] = [
    &[],
    &[0],
    &[1],
    &[0, 1],
    &[2],
    &[0, 1, 2],
    &[1, 2],
    &[2, 3],
];

/// Tour bundle variants for one candidate.
///
/// Always starts with the empty bundle. Patterns that reach past the end of
/// `tours` are skipped, duplicates (by id sequence) are dropped, and at most
/// [`MAX_TOUR_BUNDLES`] bundles are returned.
pub(crate) fn tour_bundle_variants<'a>(tours: &[&'a TourOption]) -> Vec<Vec<&'a TourOption>> {
    let top = &tours[..tours.len().min(4)];
    let mut seen: Vec<Vec<Uuid>> = Vec::new();
    let mut bundles = Vec::new();

    for pattern in PATTERNS {
        if pattern.len() > MAX_TOURS_PER_BUNDLE || pattern.iter().any(|&i| i >= top.len()) {
            continue;
        }
        let bundle: Vec<&TourOption> = pattern.iter().map(|&i| top[i]).collect();
        let ids: Vec<Uuid> = bundle.iter().map(|t| t.offer.id).collect();
        if seen.contains(&ids) {
            continue;
        }
        seen.push(ids);
        bundles.push(bundle);
        if bundles.len() >= MAX_TOUR_BUNDLES {
            break;
        }
    }
    bundles
}
