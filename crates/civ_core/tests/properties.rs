//! Property tests for the spatial queries, units, map generation and the
//! calendar.

use std::collections::HashSet;

use civ_core::calendar::START_YEAR;
use civ_core::civilization::CivId;
use civ_core::enemy_search::{calculate_scout_zones, find_nearest_enemy};
use civ_core::grid::{Coord, Rect};
use civ_core::map::{TerrainKind, TileLookup};
use civ_core::map_generation::{generate_map, MapGenConfig};
use civ_core::pathfinding::find_path;
use civ_core::settlement::{exclusion_radius, find_best_settlement_location, SettlementPreset, SettlementQuery};
use civ_core::turn::TurnState;
use civ_core::unit::UnitKind;
use civ_test_utils::determinism::strategies::{arb_coord, arb_map, arb_rect, arb_seed, arb_terrain, arb_unit_kind};
use civ_test_utils::fixtures::{context_with_map, flat_context};
use proptest::prelude::*;

const SIZE: u32 = 15;

proptest! {
    #[test]
    fn rounds_and_years_advance_monotonically(rotations in 0u32..400) {
        let mut turn = TurnState::new(CivId(0));
        let mut last_year = turn.year;
        prop_assert_eq!(last_year, START_YEAR);
        for _ in 0..rotations {
            turn.advance_round();
            prop_assert_ne!(turn.year, 0);
            prop_assert!(turn.year > last_year);
            last_year = turn.year;
        }
        prop_assert_eq!(turn.round, rotations);
    }

    #[test]
    fn path_to_self_is_single_tile(a in arb_coord(SIZE, SIZE)) {
        let bounds = Rect::from_size(SIZE, SIZE);
        prop_assert_eq!(find_path(bounds, a, a, &HashSet::new()), vec![a]);
    }

    #[test]
    fn open_paths_are_shortest_orthogonal_walks(a in arb_coord(SIZE, SIZE), b in arb_coord(SIZE, SIZE)) {
        let bounds = Rect::from_size(SIZE, SIZE);
        let path = find_path(bounds, a, b, &HashSet::new());
        let manhattan = a.col.abs_diff(b.col) + a.row.abs_diff(b.row);
        prop_assert_eq!(path.len() as u32, manhattan + 1);
        prop_assert_eq!(path.first(), Some(&a));
        prop_assert_eq!(path.last(), Some(&b));
        for pair in path.windows(2) {
            let step = pair[0].col.abs_diff(pair[1].col) + pair[0].row.abs_diff(pair[1].row);
            prop_assert_eq!(step, 1);
        }
    }

    #[test]
    fn paths_avoid_blocked_tiles(
        a in arb_coord(SIZE, SIZE),
        b in arb_coord(SIZE, SIZE),
        walls in prop::collection::hash_set(arb_coord(SIZE, SIZE), 0..60),
    ) {
        let bounds = Rect::from_size(SIZE, SIZE);
        let path = find_path(bounds, a, b, &walls);
        if let Some(first) = path.first() {
            prop_assert_eq!(*first, a);
            prop_assert_eq!(path.last(), Some(&b));
            prop_assert!(path.iter().skip(1).all(|c| !walls.contains(c) && bounds.contains(*c)));
        }
    }

    #[test]
    fn scout_zones_are_disjoint(n in 1u32..20, width in 1u32..48, height in 1u32..48) {
        let zones = calculate_scout_zones(n, width, height);
        let bounds = Rect::from_size(width, height);
        prop_assert_eq!(zones.len(), n as usize);

        let live: Vec<Rect> = zones.into_iter().filter(|z| !z.is_empty()).collect();
        for (i, a) in live.iter().enumerate() {
            prop_assert!(a.iter().all(|c| bounds.contains(c)));
            for b in &live[i + 1..] {
                prop_assert!(a.is_disjoint(b), "{:?} overlaps {:?}", a, b);
            }
        }
        if n <= width {
            let covered: u32 = live.iter().map(Rect::area).sum();
            prop_assert_eq!(covered, bounds.area());
        }
    }

    #[test]
    fn nearest_enemy_is_visible_and_in_range(
        origin in arb_coord(SIZE, SIZE),
        enemies in prop::collection::vec(arb_coord(SIZE, SIZE), 0..8),
        visible in prop::collection::hash_set(arb_coord(SIZE, SIZE), 0..120),
        max_radius in prop::option::of(0u32..10),
    ) {
        let mut ctx = flat_context(SIZE, SIZE, &[false, false]);
        for c in &enemies {
            ctx.spawn_unit(CivId(1), UnitKind::Warrior, *c);
        }
        let found = find_nearest_enemy(origin, ctx.bounds(), &ctx.world, |c| visible.contains(&c), CivId(0), max_radius);
        if let Some(sighting) = found {
            prop_assert!(visible.contains(&sighting.coord));
            prop_assert!(enemies.contains(&sighting.coord));
            prop_assert_eq!(sighting.distance, origin.distance(sighting.coord));
            if let Some(limit) = max_radius {
                prop_assert!(sighting.distance <= limit);
            }
        }
    }

    #[test]
    fn settlement_sites_are_always_legal(
        map in arb_map(SIZE, SIZE),
        origin in arb_coord(SIZE, SIZE),
        cities in prop::collection::vec(arb_coord(SIZE, SIZE), 0..4),
        min_distance in 1u32..6,
    ) {
        let mut ctx = context_with_map(map, &[false, false]);
        for (i, c) in cities.iter().enumerate() {
            ctx.place_city(CivId((i % 2) as u8), *c);
        }
        let query = SettlementQuery::new(origin, CivId(0), SettlementPreset::BalancedGrowth, min_distance);
        if let Some(site) = find_best_settlement_location(&query, &ctx.map, &ctx.rules, &ctx.world) {
            let terrain = ctx.map.tile(site.coord).map(|t| t.terrain);
            prop_assert!(terrain.is_some_and(|t| !t.is_water() && t != TerrainKind::Mountain));
            prop_assert!(!cities.contains(&site.coord));
            prop_assert!(site.coord.distance(origin) <= 5);
            let radius = exclusion_radius(min_distance);
            for (i, c) in cities.iter().enumerate() {
                if i % 2 == 0 {
                    prop_assert!(c.distance(site.coord) > radius);
                }
            }
        }
    }
}

proptest! {
    #[test]
    fn rect_center_is_inside(a in arb_rect(SIZE, SIZE), b in arb_rect(SIZE, SIZE)) {
        prop_assert!(a.contains(a.center()));
        prop_assert_eq!(a.is_disjoint(&b), b.is_disjoint(&a));
        if a.is_disjoint(&b) {
            prop_assert!(!b.contains(a.center()));
        }
    }

    #[test]
    fn spent_moves_stay_in_bounds(
        kind in arb_unit_kind(),
        costs in prop::collection::vec(0u32..4, 0..6),
    ) {
        let mut ctx = flat_context(SIZE, SIZE, &[false]);
        let id = ctx.spawn_unit(CivId(0), kind, Coord::new(3, 3));
        let unit = ctx.world.unit_mut(id).unwrap();
        prop_assert_eq!(unit.moves_remaining, unit.max_moves);
        for cost in costs {
            unit.spend_moves(cost);
            prop_assert!(unit.moves_remaining <= unit.max_moves);
        }
        unit.reset_for_turn();
        prop_assert_eq!(unit.moves_remaining, unit.max_moves);
    }

    #[test]
    fn terrain_glyphs_identify_terrain(terrain in arb_terrain()) {
        let matches: Vec<TerrainKind> = TerrainKind::ALL
            .into_iter()
            .filter(|t| t.glyph() == terrain.glyph())
            .collect();
        prop_assert_eq!(matches, vec![terrain]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn map_generation_depends_only_on_seed(seed in arb_seed(), civs in 1usize..5) {
        let config = MapGenConfig::sized(24, 16).with_seed(seed);
        let first = generate_map(&config, civs).unwrap();
        let second = generate_map(&config, civs).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.spawn_points.len(), civs);
        for spawn in &first.spawn_points {
            prop_assert_eq!(first.map.terrain(*spawn), Some(TerrainKind::Grassland));
        }
    }
}
