//! Random selection with a no-immediate-repeat guarantee.

use rand::Rng;

/// Pick an index in `0..len` that differs from `previous` whenever `len > 1`.
///
/// One uniform draw; if it lands on `previous` it is shifted by a second draw
/// in `1..len`, which can never wrap back onto `previous`. No retry loop.
pub fn pick_next<R: Rng + ?Sized>(len: usize, previous: Option<usize>, rng: &mut R) -> usize {
    if len <= 1 {
        return 0;
    }
    let i = rng.gen_range(0..len);
    match previous {
        Some(prev) if prev == i => (i + 1 + rng.gen_range(0..=len - 2)) % len,
        _ => i,
    }
}

/// [`pick_next`] over a slice, returning the item and its index.
pub fn pick_from<'a, T, R: Rng + ?Sized>(
    items: &'a [T],
    previous: Option<usize>,
    rng: &mut R,
) -> Option<(&'a T, usize)> {
    let index = pick_next(items.len(), previous, rng);
    items.get(index).map(|item| (item, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn never_repeats_previous() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 2..12 {
            let mut prev = None;
            for _ in 0..500 {
                let next = pick_next(len, prev, &mut rng);
                assert!(next < len);
                assert_ne!(Some(next), prev);
                prev = Some(next);
            }
        }
    }

    #[test]
    fn tiny_pools_always_pick_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        for prev in [None, Some(0), Some(3)] {
            assert_eq!(pick_next(0, prev, &mut rng), 0);
            assert_eq!(pick_next(1, prev, &mut rng), 0);
        }
    }

    #[test]
    fn every_other_index_is_reachable() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 5];
        for _ in 0..1000 {
            seen[pick_next(5, Some(2), &mut rng)] = true;
        }
        assert_eq!(seen, [true, true, false, true, true]);
    }

    #[test]
    fn out_of_range_previous_is_ignored() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(pick_next(3, Some(99), &mut rng) < 3);
        }
    }

    #[test]
    fn pick_from_returns_item_and_index() {
        let mut rng = StdRng::seed_from_u64(9);
        let items = ["a", "b"];
        let (item, index) = pick_from(&items, Some(0), &mut rng).unwrap();
        assert_eq!((*item, index), ("b", 1));
        assert!(pick_from::<&str, _>(&[], None, &mut rng).is_none());
    }
}
