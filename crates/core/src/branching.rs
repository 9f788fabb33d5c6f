//! How many side branches each main-path tile grows.

use crate::flow::BranchMode;
use crate::random::RandomStream;
use crate::types::IntRange;

/// Absorbs rounding drift in the fractional carry before flooring.
const CARRY_EPSILON: f64 = 1e-9;

/// A main-path tile that may host branches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchSite {
    pub free_doorways: usize,
    /// The owning archetype's branch count range.
    pub branch_count: IntRange,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BranchPlan {
    /// Branch count per site, in site order.
    pub counts: Vec<usize>,
    /// The dungeon-wide total drawn in global mode.
    pub global_total: Option<usize>,
}

impl BranchPlan {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

pub fn plan_branches(
    mode: BranchMode,
    global_count: IntRange,
    sites: &[BranchSite],
    random: &mut RandomStream,
) -> BranchPlan {
    match mode {
        BranchMode::Local => BranchPlan {
            counts: sites
                .iter()
                .map(|site| clamp_count(site.branch_count.random(random), site.free_doorways))
                .collect(),
            global_total: None,
        },
        BranchMode::Global => plan_global(global_count, sites, random),
    }
}

fn clamp_count(drawn: i32, limit: usize) -> usize {
    usize::try_from(drawn.max(0)).unwrap_or(0).min(limit)
}

/// Spreads one drawn total over the eligible sites with a fractional carry, so
/// the remainder is granted probabilistically rather than always rounding the
/// same way. The granted sum never exceeds the drawn total.
fn plan_global(
    global_count: IntRange,
    sites: &[BranchSite],
    random: &mut RandomStream,
) -> BranchPlan {
    let total = usize::try_from(global_count.random(random).max(0)).unwrap_or(0);
    let eligible = sites.iter().filter(|site| site.free_doorways > 0).count();
    let mut counts = vec![0; sites.len()];
    if eligible == 0 || total == 0 {
        return BranchPlan { counts, global_total: Some(total) };
    }

    let per_tile = total as f64 / eligible as f64;
    let mut chance = per_tile;
    let mut remaining = total;
    for (site, count) in sites.iter().zip(counts.iter_mut()) {
        if site.free_doorways == 0 {
            continue;
        }
        let capacity = site
            .free_doorways
            .min(clamp_count(site.branch_count.max, usize::MAX))
            .min(remaining);
        let guaranteed = ((chance + CARRY_EPSILON).floor().max(0.0) as usize).min(capacity);
        chance -= guaranteed as f64;
        let mut granted = guaranteed;
        if granted < capacity && chance > 0.0 && random.next_double() < chance {
            granted += 1;
            chance -= 1.0;
        }
        *count = granted;
        remaining -= granted;
        chance += per_tile;
    }
    BranchPlan { counts, global_total: Some(total) }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn site(free_doorways: usize, min: i32, max: i32) -> BranchSite {
        BranchSite { free_doorways, branch_count: IntRange::new(min, max) }
    }

    #[test]
    fn local_counts_are_clamped_to_free_doorways() {
        let mut random = RandomStream::new(8);
        let sites = [site(1, 3, 3), site(0, 2, 2), site(5, 2, 2)];
        let plan = plan_branches(BranchMode::Local, IntRange::default(), &sites, &mut random);
        assert_eq!(plan.counts, vec![1, 0, 2]);
        assert_eq!(plan.global_total, None);
    }

    #[test]
    fn global_budget_of_three_over_five_sites_grants_exactly_three() {
        let sites = [site(3, 0, 3); 5];
        for seed in 0..200 {
            let mut random = RandomStream::new(seed);
            let plan = plan_branches(BranchMode::Global, IntRange::exactly(3), &sites, &mut random);
            assert_eq!(plan.total(), 3, "seed {seed} produced {:?}", plan.counts);
            assert_eq!(plan.global_total, Some(3));
        }
    }

    #[test]
    fn global_mode_skips_sites_without_free_doorways() {
        let mut random = RandomStream::new(5);
        let sites = [site(0, 0, 5), site(4, 0, 5), site(0, 0, 5)];
        let plan = plan_branches(BranchMode::Global, IntRange::exactly(2), &sites, &mut random);
        assert_eq!(plan.counts, vec![0, 2, 0]);
    }

    #[test]
    fn global_mode_with_no_eligible_sites_grants_nothing() {
        let mut random = RandomStream::new(5);
        let sites = [site(0, 0, 2)];
        let plan = plan_branches(BranchMode::Global, IntRange::exactly(4), &sites, &mut random);
        assert_eq!(plan.total(), 0);
    }

    proptest! {
        #[test]
        fn global_total_is_never_exceeded(
            seed in any::<u64>(),
            total in 0_i32..12,
            sites in prop::collection::vec((0_usize..4, 0_i32..4), 0..10),
        ) {
            let sites: Vec<BranchSite> =
                sites.into_iter().map(|(free, max)| site(free, 0, max)).collect();
            let mut random = RandomStream::new(seed);
            let plan =
                plan_branches(BranchMode::Global, IntRange::exactly(total), &sites, &mut random);
            prop_assert!(plan.total() <= total as usize);
            for (count, site) in plan.counts.iter().zip(&sites) {
                prop_assert!(*count <= site.free_doorways);
                prop_assert!(*count <= site.branch_count.max as usize);
            }
        }
    }
}
