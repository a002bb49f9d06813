//! Property tests for the reward terms.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use mmo_shaping::shaping::{
    shannon_entropy, AgentSnapshot, CombatSkill, EpisodeState, Position, RewardShaper,
    ShapingConfig,
};

fn agent() -> AgentSnapshot {
    AgentSnapshot::spawned(Position::new(4, 4))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// The unique-event bonus never exceeds `clip * weight` and is never
    /// negative, even if counts go backwards.
    #[test]
    fn unique_event_bonus_is_clipped(
        prev in 0usize..50,
        curr in 0usize..50,
        clip in 0u32..10,
        weight in 0.0f32..2.0,
    ) {
        let config = ShapingConfig {
            clip_unique_event: clip,
            unique_event_bonus_weight: weight,
            ..ShapingConfig::default()
        };
        let mut state = EpisodeState {
            prev_unique_count: prev,
            curr_unique_count: curr,
            ..EpisodeState::default()
        };
        let bonus = RewardShaper::compute(&mut state, &agent(), CombatSkill::Mage, 3.0, &config);
        prop_assert!(bonus.unique_event >= 0.0);
        prop_assert!(bonus.unique_event <= clip as f32 * weight + 1e-5);
    }

    /// Fewer than six recorded moves never produce a meander term.
    #[test]
    fn meander_needs_six_moves(moves in prop::collection::vec(0i32..5, 0..6)) {
        let config = ShapingConfig {
            meander_bonus_weight: 1.0,
            ..ShapingConfig::default()
        };
        let mut state = EpisodeState::default();
        for m in &moves {
            state.record_action(*m, 0);
        }
        let bonus = RewardShaper::compute(&mut state, &agent(), CombatSkill::Melee, 3.0, &config);
        prop_assert_eq!(bonus.meander, 0.0);
    }

    /// Entropy is bounded by the log of the number of distinct symbols and
    /// is maximal for the uniform spread.
    #[test]
    fn entropy_bounds(moves in prop::collection::vec(0i32..5, 1..40)) {
        let h = shannon_entropy(moves.iter().copied());
        let mut distinct = moves.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert!(h >= 0.0);
        prop_assert!(h <= (distinct.len() as f64).log2() + 1e-9);

        let uniform: Vec<i32> = (0..distinct.len() as i32).cycle().take(distinct.len() * 4).collect();
        prop_assert!(shannon_entropy(uniform) + 1e-9 >= h);
    }

    /// Survival recovery with a non-negative weight is never a penalty.
    #[test]
    fn survival_term_non_negative(
        last_food in 0i32..=100,
        curr_food in 0i32..=100,
        last_water in 0i32..=100,
        curr_water in 0i32..=100,
        restore in 0i32..60,
    ) {
        let config = ShapingConfig {
            survival_bonus_weight: 0.1,
            get_resource_weight: 0.1,
            ..ShapingConfig::default()
        };
        let mut state = EpisodeState {
            last_food,
            curr_food,
            last_water,
            curr_water,
            last_health: 20,
            ..EpisodeState::default()
        };
        let mut agent = agent();
        agent.health_restore = restore;
        let bonus = RewardShaper::compute(&mut state, &agent, CombatSkill::Range, 3.0, &config);
        prop_assert!(bonus.survival >= 0.0);
    }
}
