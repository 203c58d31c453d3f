//! Loadout slot ordinals.
//!
//! The current slot model is a free numeric ordinal stored as a string:
//! dropping onto the loadout appends at max+1, and display order is the
//! ordinal. An older server generation used a fixed nine-slot grid with
//! named size tiers (B1, M1-M3, S1-S5); those codes still appear on old
//! records and are still the only slot identifiers that generation accepts,
//! so both the rank table and the ordinal-to-legacy translation live here.

/// Legacy fixed-slot display order: B1=1, M1-M3=2-4, S1-S5=5-9.
const LEGACY_SLOTS: [&str; 9] = ["B1", "M1", "M2", "M3", "S1", "S2", "S3", "S4", "S5"];

/// Sort rank for a slot value. Numeric ordinals rank numerically, legacy
/// codes rank through the fixed table, anything else sorts last.
pub fn slot_rank(slot: &str) -> u64 {
    let trimmed = slot.trim();
    if let Ok(n) = trimmed.parse::<u64>() {
        return n;
    }
    let upper = trimmed.to_ascii_uppercase();
    match LEGACY_SLOTS.iter().position(|s| *s == upper) {
        Some(i) => i as u64 + 1,
        None => u64::MAX,
    }
}

/// Translate a numeric ordinal to the legacy fixed-slot code, if one
/// exists. Used by the gateway's one-shot compatibility retry.
pub fn to_legacy_slot(slot: &str) -> Option<&'static str> {
    let n: usize = slot.trim().parse().ok()?;
    LEGACY_SLOTS.get(n.checked_sub(1)?).copied()
}

/// Next free ordinal for an append: max(existing ordinals) + 1, starting
/// at 1 for an empty loadout. Legacy codes count through their rank so an
/// append never collides with an old-style slot.
pub fn next_ordinal<'a>(occupied: impl Iterator<Item = &'a str>) -> String {
    let max = occupied
        .map(slot_rank)
        .filter(|&r| r != u64::MAX)
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ordinals_rank_numerically() {
        assert_eq!(slot_rank("1"), 1);
        assert_eq!(slot_rank("12"), 12);
        assert!(slot_rank("2") < slot_rank("10"));
    }

    #[test]
    fn legacy_codes_rank_through_table() {
        assert_eq!(slot_rank("B1"), 1);
        assert_eq!(slot_rank("M2"), 3);
        assert_eq!(slot_rank("S5"), 9);
        assert_eq!(slot_rank("s1"), 5);
    }

    #[test]
    fn unknown_slots_rank_last() {
        assert_eq!(slot_rank("X9"), u64::MAX);
        assert_eq!(slot_rank(""), u64::MAX);
    }

    #[test]
    fn ordinal_translates_to_legacy_code() {
        assert_eq!(to_legacy_slot("1"), Some("B1"));
        assert_eq!(to_legacy_slot("3"), Some("M2"));
        assert_eq!(to_legacy_slot("9"), Some("S5"));
        assert_eq!(to_legacy_slot("10"), None);
        assert_eq!(to_legacy_slot("0"), None);
        assert_eq!(to_legacy_slot("B1"), None);
    }

    #[test]
    fn append_takes_max_plus_one() {
        assert_eq!(next_ordinal([].into_iter()), "1");
        assert_eq!(next_ordinal(["1", "2", "5"].into_iter()), "6");
        // Legacy codes participate through their rank.
        assert_eq!(next_ordinal(["B1", "M1"].into_iter()), "3");
    }
}
