/// Quota allocation across sources
///
/// Phase 1 takes up to each slot's quota in slot order and pools the surplus.
/// Phase 2 tops up from the front of the pool until the target is reached.
/// Phase 3 truncates to the target.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation<T> {
    pub selected: Vec<T>,
    /// Items taken within quota
    pub from_quota: usize,
    /// Items taken from the leftover pool
    pub from_leftover: usize,
}

pub fn allocate<T>(slots: Vec<Vec<T>>, quotas: &[usize], target: usize) -> Allocation<T> {
    let mut selected = Vec::with_capacity(target);
    let mut leftover = Vec::new();

    for (slot, items) in slots.into_iter().enumerate() {
        let quota = quotas.get(slot).copied().unwrap_or(0);
        let mut items = items.into_iter();
        selected.extend(items.by_ref().take(quota));
        leftover.extend(items);
    }
    let from_quota = selected.len();

    let shortfall = target.saturating_sub(selected.len());
    selected.extend(leftover.into_iter().take(shortfall));
    selected.truncate(target);

    let from_quota = from_quota.min(selected.len());
    Allocation {
        from_leftover: selected.len() - from_quota,
        from_quota,
        selected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(sizes: &[usize]) -> Vec<Vec<String>> {
        sizes
            .iter()
            .enumerate()
            .map(|(slot, size)| (0..*size).map(|i| format!("s{}q{}", slot, i)).collect())
            .collect()
    }

    #[test]
    fn test_surplus_fills_shortfall_in_slot_order() {
        let allocation = allocate(slots(&[5, 1, 4, 6]), &[2, 3, 2, 3], 10);

        assert_eq!(allocation.selected.len(), 10);
        assert_eq!(allocation.from_quota, 8);
        assert_eq!(allocation.from_leftover, 2);
        assert_eq!(
            allocation.selected,
            vec!["s0q0", "s0q1", "s1q0", "s2q0", "s2q1", "s3q0", "s3q1", "s3q2", "s0q2", "s0q3"]
        );
    }

    #[test]
    fn test_fewer_available_than_target() {
        let allocation = allocate(slots(&[1, 0, 2, 1]), &[2, 3, 2, 3], 10);
        assert_eq!(allocation.selected, vec!["s0q0", "s2q0", "s2q1", "s3q0"]);
        assert_eq!(allocation.from_leftover, 0);
    }

    #[test]
    fn test_exact_quotas_need_no_leftover() {
        let allocation = allocate(slots(&[3, 3, 3, 3]), &[2, 3, 2, 3], 10);
        assert_eq!(allocation.selected.len(), 10);
        assert_eq!(allocation.from_leftover, 0);
        assert!(!allocation.selected.contains(&"s0q2".to_string()));
    }

    #[test]
    fn test_quotas_above_target_are_truncated() {
        let allocation = allocate(slots(&[4, 4]), &[4, 4], 5);
        assert_eq!(allocation.selected, vec!["s0q0", "s0q1", "s0q2", "s0q3", "s1q0"]);
    }

    #[test]
    fn test_all_slots_empty() {
        let allocation: Allocation<String> = allocate(vec![vec![], vec![], vec![], vec![]], &[2, 3, 2, 3], 10);
        assert!(allocation.selected.is_empty());
    }
}
