/// Weighted random selection over keyed or ordered collections.

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChoiceError {
    #[error("invalid weighted collection: {0}")]
    InvalidInput(String),
}

/// Anything that carries a positive selection weight.
pub trait Weighted {
    fn weight(&self) -> u32;
}

impl<T: Weighted + ?Sized> Weighted for &T {
    fn weight(&self) -> u32 {
        (**self).weight()
    }
}

/// Pick one item with probability `weight_i / total`.
///
/// Accepts any iterable of references, so map values, slices and chained
/// buckets all work.
pub fn choose_weighted<'a, T, I, R>(items: I, rng: &mut R) -> Result<&'a T, ChoiceError>
where
    T: Weighted + 'a,
    I: IntoIterator<Item = &'a T>,
    R: Rng,
{
    let items: Vec<&'a T> = items.into_iter().collect();
    let index = weighted_index(&items, rng)?;
    Ok(items[index])
}

/// Index of the chosen item.
///
/// Builds the cumulative weight table, draws `r` uniformly from
/// `1..=total` and returns the first position whose cumulative weight
/// reaches `r`.
pub fn weighted_index<T: Weighted, R: Rng>(items: &[T], rng: &mut R) -> Result<usize, ChoiceError> {
    if items.is_empty() {
        return Err(ChoiceError::InvalidInput(
            "collection is empty".to_string(),
        ));
    }

    let mut cumulative = Vec::with_capacity(items.len());
    let mut total: u64 = 0;
    for (i, item) in items.iter().enumerate() {
        let weight = item.weight();
        if weight == 0 {
            return Err(ChoiceError::InvalidInput(format!(
                "item {} has a non-positive weight",
                i
            )));
        }
        total += u64::from(weight);
        cumulative.push(total);
    }

    let r = rng.gen_range(1..=total);
    Ok(cumulative.partition_point(|&c| c < r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq)]
    struct Item {
        name: &'static str,
        weight: u32,
    }

    impl Weighted for Item {
        fn weight(&self) -> u32 {
            self.weight
        }
    }

    fn items() -> Vec<Item> {
        vec![
            Item { name: "a", weight: 1 },
            Item { name: "b", weight: 2 },
            Item { name: "c", weight: 7 },
        ]
    }

    #[test]
    fn distribution_matches_weights() {
        let items = items();
        let mut rng = StdRng::seed_from_u64(7);
        let draws = 100_000;
        let mut counts = [0usize; 3];

        for _ in 0..draws {
            let picked = choose_weighted(&items, &mut rng).unwrap();
            let idx = items.iter().position(|i| i == picked).unwrap();
            counts[idx] += 1;
        }

        for (count, expected) in counts.iter().zip([0.1, 0.2, 0.7]) {
            let observed = *count as f64 / draws as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "observed {} vs expected {}",
                observed,
                expected
            );
        }
    }

    #[test]
    fn deterministic_with_seed() {
        let items = items();
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            assert_eq!(
                choose_weighted(&items, &mut rng1).unwrap().name,
                choose_weighted(&items, &mut rng2).unwrap().name
            );
        }
    }

    #[test]
    fn single_item_always_chosen() {
        let items = vec![Item { name: "only", weight: 3 }];
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(choose_weighted(&items, &mut rng).unwrap().name, "only");
        }
    }

    #[test]
    fn keyed_collection() {
        let mut map = BTreeMap::new();
        map.insert("x", Item { name: "x", weight: 1 });
        map.insert("y", Item { name: "y", weight: 1 });
        let mut rng = StdRng::seed_from_u64(3);
        let picked = choose_weighted(map.values(), &mut rng).unwrap();
        assert!(picked.name == "x" || picked.name == "y");
    }

    #[test]
    fn index_of_heaviest_dominates() {
        let items = vec![Item { name: "light", weight: 1 }, Item { name: "heavy", weight: 999 }];
        let mut rng = StdRng::seed_from_u64(5);
        let heavy = (0..1000)
            .filter(|_| weighted_index(&items, &mut rng).unwrap() == 1)
            .count();
        assert!(heavy > 980, "heavy chosen {} times", heavy);
    }

    #[test]
    fn empty_collection_is_invalid() {
        let items: Vec<Item> = Vec::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            choose_weighted(&items, &mut rng),
            Err(ChoiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_weight_is_invalid() {
        let items = vec![Item { name: "a", weight: 2 }, Item { name: "b", weight: 0 }];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(choose_weighted(&items, &mut rng).is_err());
    }
}
