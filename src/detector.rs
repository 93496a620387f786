use std::fmt;

/// Classification of a freshly extracted price against the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// No price on the page this cycle. Nothing is written or sent.
    Unextractable,
    /// First known price. Stored silently.
    FirstObservation(i64),
    Unchanged(i64),
    Changed(PriceChange),
}

impl ChangeOutcome {
    /// Price to persist, if any.
    pub fn price_to_store(&self) -> Option<i64> {
        match self {
            ChangeOutcome::FirstObservation(p) => Some(*p),
            ChangeOutcome::Changed(c) => Some(c.new),
            ChangeOutcome::Unextractable | ChangeOutcome::Unchanged(_) => None,
        }
    }
}

pub fn decide(stored_price: Option<i64>, new_price: Option<i64>) -> ChangeOutcome {
    match (stored_price, new_price) {
        (_, None) => ChangeOutcome::Unextractable,
        (None, Some(new)) => ChangeOutcome::FirstObservation(new),
        (Some(old), Some(new)) if old == new => ChangeOutcome::Unchanged(new),
        (Some(old), Some(new)) => ChangeOutcome::Changed(PriceChange { old, new }),
    }
}

/// Title to write back. Stored titles are sticky; only a missing one is filled.
pub fn merge_title<'a>(stored: Option<&str>, fresh: Option<&'a str>) -> Option<&'a str> {
    match stored {
        Some(_) => None,
        None => fresh.filter(|t| !t.trim().is_empty()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceChange {
    pub old: i64,
    pub new: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rose,
    Fell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Rose => "rose",
            Direction::Fell => "fell",
        })
    }
}

impl PriceChange {
    pub fn delta(&self) -> i64 {
        self.new - self.old
    }

    pub fn magnitude(&self) -> u64 {
        self.delta().unsigned_abs()
    }

    pub fn direction(&self) -> Direction {
        if self.delta() > 0 {
            Direction::Rose
        } else {
            Direction::Fell
        }
    }
}

/// Owner-facing notification text for a price change.
pub fn format_change_message(display_name: &str, change: &PriceChange) -> String {
    format!(
        "Price changed for:\n{}\n\nWas: {} ₽\nNow: {} ₽\nPrice {} by {} ₽",
        display_name,
        change.old,
        change.new,
        change.direction(),
        change.magnitude()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_new_price_is_unextractable() {
        assert_eq!(decide(None, None), ChangeOutcome::Unextractable);
        assert_eq!(decide(Some(5000), None), ChangeOutcome::Unextractable);
        assert_eq!(ChangeOutcome::Unextractable.price_to_store(), None);
    }

    #[test]
    fn first_observation_never_changed() {
        for p in [0, 1, 5000, i64::MAX] {
            let outcome = decide(None, Some(p));
            assert_eq!(outcome, ChangeOutcome::FirstObservation(p));
            assert_eq!(outcome.price_to_store(), Some(p));
        }
    }

    #[test]
    fn equal_prices_unchanged() {
        assert_eq!(decide(Some(5000), Some(5000)), ChangeOutcome::Unchanged(5000));
        assert_eq!(decide(Some(5000), Some(5000)).price_to_store(), None);
    }

    #[test]
    fn decrease() {
        let outcome = decide(Some(5000), Some(4500));
        let ChangeOutcome::Changed(change) = outcome else {
            panic!("expected Changed, got {:?}", outcome);
        };
        assert_eq!(change, PriceChange { old: 5000, new: 4500 });
        assert_eq!(change.magnitude(), 500);
        assert_eq!(change.direction(), Direction::Fell);
        assert_eq!(outcome.price_to_store(), Some(4500));
    }

    #[test]
    fn changes_over_a_grid() {
        let prices = [0, 1, 999, 1000, 4500, 5000, 12990, 1_000_000];
        for &old in &prices {
            for &new in &prices {
                let outcome = decide(Some(old), Some(new));
                assert_eq!(outcome, decide(Some(old), Some(new)), "not idempotent");
                if old == new {
                    assert_eq!(outcome, ChangeOutcome::Unchanged(new));
                    continue;
                }
                let ChangeOutcome::Changed(c) = outcome else {
                    panic!("{} -> {} gave {:?}", old, new, outcome);
                };
                assert_eq!((c.old, c.new), (old, new));
                assert_eq!(c.magnitude(), (new - old).unsigned_abs());
                assert_eq!(c.direction() == Direction::Rose, new > old);
            }
        }
    }

    #[test]
    fn stored_title_is_sticky() {
        assert_eq!(merge_title(Some("Old"), Some("New")), None);
        assert_eq!(merge_title(Some("Old"), None), None);
    }

    #[test]
    fn missing_title_is_filled() {
        assert_eq!(merge_title(None, Some("New")), Some("New"));
        assert_eq!(merge_title(None, Some("  ")), None);
        assert_eq!(merge_title(None, None), None);
    }

    #[test]
    fn message_for_decrease() {
        let msg = format_change_message("Widget 3000", &PriceChange { old: 5000, new: 4500 });
        assert!(msg.contains("Widget 3000"));
        assert!(msg.contains("Was: 5000 ₽"));
        assert!(msg.contains("Now: 4500 ₽"));
        assert!(msg.ends_with("Price fell by 500 ₽"));
    }

    #[test]
    fn message_for_increase() {
        let msg = format_change_message("https://shop.example/a", &PriceChange { old: 100, new: 1100 });
        assert!(msg.ends_with("Price rose by 1000 ₽"));
    }
}
