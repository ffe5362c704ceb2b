use std::cmp::Ordering;

use rust_decimal::Decimal;
use trippilot_core::SortMode;

/// The fields every sort mode reads from a priced combination.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SortKey<'a> {
    pub total: Decimal,
    pub score: f64,
    pub price_score: f64,
    pub quality_score: f64,
    pub family_friendly: f64,
    pub duration_minutes: u32,
    pub stops: u32,
    pub signature: &'a str,
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Total order for `mode`.
///
/// Every mode ends with ascending total, descending score and finally the
/// content signature, so equal-looking combinations still sort the same way
/// on every run.
pub(crate) fn compare(mode: SortMode, a: &SortKey<'_>, b: &SortKey<'_>) -> Ordering {
    let primary = match mode {
        SortMode::Cheapest => a
            .total
            .cmp(&b.total)
            .then_with(|| descending(a.score, b.score)),
        SortMode::Fastest => a
            .duration_minutes
            .cmp(&b.duration_minutes)
            .then_with(|| a.total.cmp(&b.total)),
        SortMode::FewestStops => a
            .stops
            .cmp(&b.stops)
            .then_with(|| a.duration_minutes.cmp(&b.duration_minutes))
            .then_with(|| a.total.cmp(&b.total)),
        SortMode::FamilyFriendly => descending(a.family_friendly, b.family_friendly)
            .then_with(|| a.total.cmp(&b.total)),
        SortMode::BestHotel => {
            descending(a.quality_score, b.quality_score).then_with(|| a.total.cmp(&b.total))
        }
        SortMode::BestValue | SortMode::BudgetFirst => descending(a.price_score, b.price_score)
            .then_with(|| descending(a.score, b.score))
            .then_with(|| a.total.cmp(&b.total)),
    };
    primary
        .then_with(|| a.total.cmp(&b.total))
        .then_with(|| descending(a.score, b.score))
        .then_with(|| a.signature.cmp(b.signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(total: i64, score: f64, signature: &str) -> SortKey<'_> {
        SortKey {
            total: Decimal::from(total),
            score,
            price_score: 50.0,
            quality_score: 50.0,
            family_friendly: 70.0,
            duration_minutes: 400,
            stops: 1,
            signature,
        }
    }

    fn sorted(mode: SortMode, mut keys: Vec<SortKey<'_>>) -> Vec<&str> {
        keys.sort_by(|a, b| compare(mode, a, b));
        keys.iter().map(|k| k.signature).collect()
    }

    #[test]
    fn cheapest_orders_by_total_then_score() {
        let keys = vec![key(900, 80.0, "a"), key(700, 60.0, "b"), key(700, 70.0, "c")];
        assert_eq!(sorted(SortMode::Cheapest, keys), vec!["c", "b", "a"]);
    }

    #[test]
    fn fewest_stops_treats_zero_as_best() {
        let mut nonstop = key(900, 50.0, "nonstop");
        nonstop.stops = 0;
        let mut two = key(500, 50.0, "two");
        two.stops = 2;
        let one = key(600, 50.0, "one");
        assert_eq!(
            sorted(SortMode::FewestStops, vec![two, one, nonstop]),
            vec!["nonstop", "one", "two"]
        );
    }

    #[test]
    fn fastest_breaks_ties_on_total() {
        let mut quick = key(900, 50.0, "quick");
        quick.duration_minutes = 200;
        let mut slow_cheap = key(400, 50.0, "slow");
        slow_cheap.duration_minutes = 600;
        let mut quick_cheap = key(800, 50.0, "quick-cheap");
        quick_cheap.duration_minutes = 200;
        assert_eq!(
            sorted(SortMode::Fastest, vec![slow_cheap, quick, quick_cheap]),
            vec!["quick-cheap", "quick", "slow"]
        );
    }

    #[test]
    fn value_modes_prefer_price_score_then_score() {
        let mut a = key(1000, 60.0, "a");
        a.price_score = 90.0;
        let mut b = key(800, 75.0, "b");
        b.price_score = 90.0;
        let mut c = key(500, 99.0, "c");
        c.price_score = 40.0;
        for mode in [SortMode::BestValue, SortMode::BudgetFirst] {
            assert_eq!(sorted(mode, vec![c, a, b]), vec!["b", "a", "c"]);
        }
    }

    #[test]
    fn family_and_hotel_modes_sort_descending() {
        let mut a = key(1000, 60.0, "a");
        a.family_friendly = 95.0;
        a.quality_score = 10.0;
        let mut b = key(800, 60.0, "b");
        b.family_friendly = 80.0;
        b.quality_score = 90.0;
        assert_eq!(sorted(SortMode::FamilyFriendly, vec![b, a]), vec!["a", "b"]);
        assert_eq!(sorted(SortMode::BestHotel, vec![a, b]), vec!["b", "a"]);
    }

    #[test]
    fn full_ties_fall_back_to_signature() {
        let keys = vec![key(700, 60.0, "zz"), key(700, 60.0, "aa")];
        for mode in SortMode::ALL {
            assert_eq!(sorted(mode, keys.clone()), vec!["aa", "zz"]);
        }
    }
}
