//! Problem and option generation.
//!
//! Both generators take the RNG as a parameter so sessions can be seeded
//! (`StdRng::seed_from_u64`) for reproducible tests.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{OptionSet, Problem, QuestionVariant, Theme};
use crate::seeds::hard_fallback_theme;

/// Lower bound for the option search range, so Easy still has room for distractors.
pub const MIN_SEARCH_RANGE: u32 = 5;
/// Random draws before switching to the deterministic fill.
pub const MAX_OPTION_DRAWS: usize = 50;
const OPTION_COUNT: usize = 3;

/// Draw a new addition fact whose sum lies in `[2, max_sum]`.
pub fn generate_problem<R: Rng + ?Sized>(
  rng: &mut R,
  max_sum: u32,
  themes: &[Theme],
  variants_enabled: bool,
) -> Problem {
  let sum = rng.gen_range(2..=max_sum.max(2));
  let addend1 = rng.gen_range(1..sum);
  let theme = themes.choose(rng).cloned().unwrap_or_else(hard_fallback_theme);
  let variant = if variants_enabled {
    QuestionVariant::ALL.choose(rng).copied().unwrap_or_default()
  } else {
    QuestionVariant::FindSum
  };
  Problem::new(addend1, sum - addend1, theme, variant)
}

/// Range the option generator samples distractors from.
pub fn search_range(max_sum: u32) -> u32 {
  max_sum.max(MIN_SEARCH_RANGE)
}

/// Three distinct candidates, one of them `target`, in random order.
///
/// Sampling is bounded; whatever is still missing afterwards is filled by
/// scanning upwards from 1, so this always terminates.
pub fn generate_options<R: Rng + ?Sized>(rng: &mut R, target: u32, search_range: u32) -> OptionSet {
  let mut picked = BTreeSet::from([target]);
  let upper = search_range.max(1);

  for _ in 0..MAX_OPTION_DRAWS {
    if picked.len() == OPTION_COUNT {
      break;
    }
    picked.insert(rng.gen_range(1..=upper));
  }

  // Only reachable when the range holds fewer than three values.
  let mut candidate = 1;
  while picked.len() < OPTION_COUNT {
    picked.insert(candidate);
    candidate += 1;
  }

  let mut values: Vec<u32> = picked.into_iter().collect();
  values.shuffle(rng);
  OptionSet::new([values[0], values[1], values[2]])
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DifficultyRanges;
  use crate::domain::Difficulty;
  use crate::seeds::seed_themes;
  use rand::{rngs::StdRng, SeedableRng};
  use std::collections::HashSet;

  const SEEDS: [u64; 5] = [1, 42, 999, 0xDEAD_BEEF, 7];

  #[test]
  fn problems_respect_range_and_sum_invariants() {
    let ranges = DifficultyRanges::default();
    let themes = seed_themes();
    for seed in SEEDS {
      let mut rng = StdRng::seed_from_u64(seed);
      for difficulty in Difficulty::ALL {
        let max = ranges.max_sum(difficulty);
        for _ in 0..500 {
          let p = generate_problem(&mut rng, max, &themes, true);
          assert_eq!(p.addend1 + p.addend2, p.sum);
          assert!(p.addend1 >= 1 && p.addend1 < p.sum, "{p:?}");
          assert!(p.addend2 >= 1, "{p:?}");
          assert!((2..=max).contains(&p.sum), "{p:?} at {difficulty}");
        }
      }
    }
  }

  #[test]
  fn sums_cover_the_whole_easy_range() {
    let mut rng = StdRng::seed_from_u64(3);
    let sums: HashSet<u32> = (0..500).map(|_| generate_problem(&mut rng, 5, &seed_themes(), false).sum).collect();
    assert_eq!(sums, HashSet::from([2, 3, 4, 5]));
  }

  #[test]
  fn variants_disabled_always_asks_for_the_sum() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
      let p = generate_problem(&mut rng, 10, &seed_themes(), false);
      assert_eq!(p.variant, QuestionVariant::FindSum);
      assert_eq!(p.target(), p.sum);
    }
  }

  #[test]
  fn variants_enabled_produces_every_variant() {
    let mut rng = StdRng::seed_from_u64(5);
    let seen: HashSet<QuestionVariant> =
      (0..300).map(|_| generate_problem(&mut rng, 10, &seed_themes(), true).variant).collect();
    assert_eq!(seen.len(), 3);
  }

  #[test]
  fn empty_theme_table_uses_fallback_theme() {
    let mut rng = StdRng::seed_from_u64(1);
    let p = generate_problem(&mut rng, 5, &[], true);
    assert_eq!(p.theme, hard_fallback_theme());
  }

  #[test]
  fn tiny_max_sum_is_clamped() {
    let mut rng = StdRng::seed_from_u64(1);
    let p = generate_problem(&mut rng, 0, &seed_themes(), false);
    assert_eq!((p.addend1, p.addend2, p.sum), (1, 1, 2));
  }

  fn assert_valid(options: &OptionSet, target: u32) {
    let distinct: HashSet<u32> = options.values().iter().copied().collect();
    assert_eq!(distinct.len(), 3, "{options:?}");
    assert!(options.contains(target), "{options:?} misses {target}");
    assert!(options.values().iter().all(|v| *v >= 1), "{options:?}");
  }

  #[test]
  fn options_are_three_distinct_and_include_target() {
    for seed in SEEDS {
      let mut rng = StdRng::seed_from_u64(seed);
      for max in [5, 10, 20] {
        let range = search_range(max);
        for target in 1..=max {
          let options = generate_options(&mut rng, target, range);
          assert_valid(&options, target);
          assert!(options.values().iter().all(|v| *v <= range));
        }
      }
    }
  }

  #[test]
  fn search_range_has_a_floor_of_five() {
    assert_eq!(search_range(2), 5);
    assert_eq!(search_range(5), 5);
    assert_eq!(search_range(20), 20);
  }

  #[test]
  fn smallest_ranges_still_terminate() {
    for seed in SEEDS {
      let mut rng = StdRng::seed_from_u64(seed);
      for target in 1..=3 {
        let options = generate_options(&mut rng, target, 3);
        assert_valid(&options, target);
        let mut sorted = *options.values();
        sorted.sort_unstable();
        assert_eq!(sorted, [1, 2, 3]);
      }
      assert_valid(&generate_options(&mut rng, 1, 1), 1);
      assert_valid(&generate_options(&mut rng, 2, 2), 2);
    }
  }

  #[test]
  fn order_is_shuffled_across_rounds() {
    let mut rng = StdRng::seed_from_u64(9);
    let positions: HashSet<usize> = (0..100)
      .map(|_| generate_options(&mut rng, 4, 10).values().iter().position(|v| *v == 4).unwrap_or(99))
      .collect();
    assert_eq!(positions, HashSet::from([0, 1, 2]));
  }
}
