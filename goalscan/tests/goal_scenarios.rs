use anyhow::{Context, Result, bail};
use goalscan::GoalReport;
use goalscan::scenario::{LoadedScenario, parse_scenario};
use goalscan::spoiler::get_spoiler_goals;
use goalscan::update_goal_items;
use goalscan_game::{ErrorKind, LocationKey, ScanError};
use goalscan_logic::RequiredLocation;
use serde_json::{Value, json};

fn run(scenario: &Value) -> Result<(LoadedScenario, GoalReport)> {
    let mut loaded = parse_scenario(&scenario.to_string())?.build()?;
    let report = update_goal_items(&loaded.worlds, &mut loaded.goals, &loaded.settings)?;
    Ok((loaded, report))
}

fn required<'a>(
    loaded: &'a LoadedScenario,
    world: usize,
    category: &str,
    goal: &str,
) -> Result<&'a [RequiredLocation]> {
    let goal = loaded.goals[world].category(category)?.get_goal(goal)?;
    Ok(&goal.required_locations)
}

fn location_names(loaded: &LoadedScenario, records: &[RequiredLocation]) -> Vec<String> {
    records
        .iter()
        .map(|r| loaded.worlds[r.location.world].locations[r.location.idx].name.clone())
        .collect()
}

fn key(world: usize, idx: usize) -> LocationKey {
    LocationKey { world, idx }
}

fn item(name: &str) -> Value {
    json!({"name": name, "major": true})
}

fn gate(item: &str) -> Value {
    json!({"Item": {"item": item}})
}

// Root --(Key-A)--> Vault; Chest-1 in Root holds the key, the Triforce waits in the vault.
fn vault_world() -> Value {
    json!({
        "regions": ["Vault"],
        "entrances": [{"name": "Root -> Vault", "from": "Root", "to": "Vault", "requirement": gate("Key-A")}],
        "locations": [
            {"name": "Chest-1", "item": item("Key-A")},
            {"name": "Vault Chest", "region": "Vault", "item": item("Triforce")}
        ]
    })
}

fn door_category() -> Value {
    json!({
        "name": "door", "priority": 10, "goal_count": 1, "minimum_goals": 1,
        "goals": [{"name": "key", "hint_text": "of the key", "color": "Yellow", "items": [{"name": "Key-A"}]}]
    })
}

#[test]
fn test_single_required_location() -> Result<()> {
    let (loaded, report) = run(&json!({
        "goal_categories": [door_category()],
        "worlds": [vault_world()]
    }))?;
    let records = required(&loaded, 0, "door", "key")?;
    assert_eq!(
        records,
        &[RequiredLocation {
            location: key(0, 0),
            weight: 1,
            bottleneck_weight: 1,
            hintable_worlds: vec![0],
        }]
    );
    let door = loaded.goals[0].category("door")?;
    assert_eq!(door.weight, 1);
    assert_eq!(door.get_goal("key")?.weight, 1);
    assert_eq!(report.goal_locations[&0]["door"]["key"][&0], vec![key(0, 0)]);
    // Both the key and the Triforce itself are on the way of the hero.
    assert_eq!(report.woth_locations, vec![vec![key(0, 0), key(0, 1)]]);
    assert!(!loaded.goals[0].contains("ganon"));
    Ok(())
}

#[test]
fn test_always_hinted_location_has_zero_weight() -> Result<()> {
    let (loaded, _) = run(&json!({
        "settings": {"always_hinted": ["Chest-1"]},
        "goal_categories": [door_category()],
        "worlds": [vault_world()]
    }))?;
    let records = required(&loaded, 0, "door", "key")?;
    assert_eq!(records.len(), 1);
    assert_eq!((records[0].weight, records[0].bottleneck_weight), (0, 0));

    let mut world = vault_world();
    world["hint_exclusions"] = json!(["Chest-1"]);
    let (loaded, _) = run(&json!({"goal_categories": [door_category()], "worlds": [world]}))?;
    assert_eq!(required(&loaded, 0, "door", "key")?[0].weight, 0);
    Ok(())
}

fn bridge_scenario(starting_items: Value) -> Value {
    json!({
        "settings": {"use_default_goals": false},
        "goal_categories": [{
            "name": "bridge", "priority": 10, "goal_count": 1, "minimum_goals": 1,
            "lock_entrances": ["Root -> Bridge"],
            "goals": [{"name": "forest", "hint_text": "of the forest", "color": "Green",
                       "items": [{"name": "Forest Medallion"}]}]
        }],
        "worlds": [{
            "regions": ["Bridge"],
            "entrances": [{"name": "Root -> Bridge", "from": "Root", "to": "Bridge"}],
            "locations": [
                {"name": "Temple Chest", "item": item("Forest Medallion")},
                {"name": "Castle Chest", "region": "Bridge", "item": item("Triforce")}
            ],
            "starting_items": starting_items
        }]
    })
}

#[test]
fn test_locked_category_beaten_by_starting_items() -> Result<()> {
    let (loaded, report) = run(&bridge_scenario(json!([{"name": "Forest Medallion"}])))?;
    assert!(!report.required_locations.contains_key("bridge"));
    assert!(required(&loaded, 0, "bridge", "forest")?.is_empty());
    assert_eq!(loaded.goals[0].category("bridge")?.weight, 0);
    Ok(())
}

#[test]
fn test_locked_category_scanned_inside_lock_window() -> Result<()> {
    let (loaded, report) = run(&bridge_scenario(json!([])))?;
    let records = required(&loaded, 0, "bridge", "forest")?;
    assert_eq!(location_names(&loaded, records), vec!["Temple Chest"]);
    // The medallion does not gate the Triforce once the bridge is open.
    assert_eq!(report.woth_locations, vec![vec![key(0, 1)]]);
    Ok(())
}

#[test]
fn test_earlier_priority_claims_shared_location() -> Result<()> {
    // Declared out of order; evaluation follows priority, not declaration.
    let category = |name: &str, priority: i32| {
        json!({
            "name": name, "priority": priority, "goal_count": 1, "minimum_goals": 1,
            "goals": [{"name": format!("{name} gem"), "color": "Blue", "items": [{"name": "Gem"}]}]
        })
    };
    let (loaded, _) = run(&json!({
        "goal_categories": [category("late", 20), category("early", 5)],
        "worlds": [{
            "locations": [
                {"name": "Chest-1", "item": item("Bow")},
                {"name": "Chest-9", "item": item("Gem")}
            ]
        }]
    }))?;
    let early = required(&loaded, 0, "early", "early gem")?;
    assert_eq!(location_names(&loaded, early), vec!["Chest-9"]);
    assert!(required(&loaded, 0, "late", "late gem")?.is_empty());
    assert_eq!(loaded.goals[0].category("late")?.weight, 0);
    Ok(())
}

fn badge_scenario(badges: usize, hintable: bool) -> Value {
    let locations: Vec<Value> = (0..badges)
        .map(|i| json!({"name": format!("Badge Chest {i}"), "item": item("Badge")}))
        .collect();
    json!({
        "goal_categories": [{
            "name": "gym", "priority": 10, "goal_count": 1, "minimum_goals": 1,
            "goals": [{"name": "badges", "color": "Pink",
                       "items": [{"name": "Badge", "quantity": 5, "minimum": 3, "hintable": hintable}]}]
        }],
        "worlds": [{"locations": locations}]
    })
}

fn badge_quantity(loaded: &LoadedScenario) -> Result<i32> {
    let goal = loaded.goals[0].category("gym")?.get_goal("badges")?;
    Ok(goal.get_item("Badge")?.quantity)
}

#[test]
fn test_goal_quantity_lowered_to_reachable_count() -> Result<()> {
    let (loaded, _) = run(&badge_scenario(4, false))?;
    assert_eq!(badge_quantity(&loaded)?, 4);

    // Below the minimum the configured quantity stays.
    let (loaded, _) = run(&badge_scenario(2, false))?;
    assert_eq!(badge_quantity(&loaded)?, 5);
    Ok(())
}

#[test]
fn test_non_hintable_items_never_required() -> Result<()> {
    let (loaded, _) = run(&badge_scenario(4, false))?;
    assert!(required(&loaded, 0, "gym", "badges")?.is_empty());

    // The same layout with hintable badges makes every badge chest necessary.
    let (loaded, _) = run(&badge_scenario(4, true))?;
    assert_eq!(required(&loaded, 0, "gym", "badges")?.len(), 4);
    Ok(())
}

#[test]
fn test_rerun_is_idempotent() -> Result<()> {
    let scenario = json!({
        "goal_categories": [door_category()],
        "worlds": [vault_world(), vault_world()]
    });
    let mut loaded = parse_scenario(&scenario.to_string())?.build()?;
    let first = update_goal_items(&loaded.worlds, &mut loaded.goals, &loaded.settings)?;
    let goals_after_first = loaded.goals.clone();
    let second = update_goal_items(&loaded.worlds, &mut loaded.goals, &loaded.settings)?;
    assert_eq!(first.required_locations, second.required_locations);
    assert_eq!(first.goal_locations, second.goal_locations);
    assert_eq!(first.woth_locations, second.woth_locations);
    for (a, b) in goals_after_first.iter().zip(&loaded.goals) {
        let (a, b) = (a.category("door")?, b.category("door")?);
        assert_eq!(a.get_goal("key")?.required_locations, b.get_goal("key")?.required_locations);
        assert_eq!(a.get_goal("key")?.items, b.get_goal("key")?.items);
    }
    Ok(())
}

#[test]
fn test_rerun_after_default_goal_fallback() -> Result<()> {
    let mut loaded = parse_scenario(&json!({"worlds": [vault_world()]}).to_string())?.build()?;
    let first = update_goal_items(&loaded.worlds, &mut loaded.goals, &loaded.settings)?;
    let hero_first = required(&loaded, 0, "ganon", "the hero")?.to_vec();
    let second = update_goal_items(&loaded.worlds, &mut loaded.goals, &loaded.settings)?;

    // The synthesized category is replaced, not scanned as a configured one.
    assert!(first.required_locations.is_empty());
    assert!(second.required_locations.is_empty());
    assert_eq!(first.goal_locations, second.goal_locations);
    assert_eq!(first.woth_locations, second.woth_locations);
    assert_eq!(required(&loaded, 0, "ganon", "the hero")?, hero_first.as_slice());
    assert_eq!(loaded.goals[0].categories().len(), 1);
    Ok(())
}

#[test]
fn test_rerun_clears_stale_results() -> Result<()> {
    let scenario = json!({"goal_categories": [door_category()], "worlds": [vault_world()]});
    let mut loaded = parse_scenario(&scenario.to_string())?.build()?;
    update_goal_items(&loaded.worlds, &mut loaded.goals, &loaded.settings)?;
    assert_eq!(required(&loaded, 0, "door", "key")?.len(), 1);

    // Same goals against a placement where the key is fixed in place and never a candidate.
    let mut world = vault_world();
    world["locations"][0]["locked"] = json!(true);
    let relocked = parse_scenario(&json!({"worlds": [world]}).to_string())?.build()?;
    let report = update_goal_items(&relocked.worlds, &mut loaded.goals, &loaded.settings)?;
    assert!(!report.required_locations.contains_key("door"));
    assert!(required(&loaded, 0, "door", "key")?.is_empty());
    let door = loaded.goals[0].category("door")?;
    assert_eq!((door.weight, door.get_goal("key")?.weight), (0, 0));
    Ok(())
}

fn gem_scenario(lock_locations: Value) -> Value {
    json!({
        "goal_categories": [{
            "name": "sealed", "priority": 10, "goal_count": 1, "minimum_goals": 1,
            "lock_locations": lock_locations,
            "goals": [{"name": "gem", "color": "Blue", "items": [{"name": "Gem"}]}]
        }],
        "worlds": [{
            "locations": [
                {"name": "Chest-A", "item": item("Gem")},
                {"name": "Chest-B", "item": item("Gem")}
            ]
        }]
    })
}

#[test]
fn test_lock_locations_hide_chest_inside_window() -> Result<()> {
    // Two gems make either chest redundant.
    let (loaded, _) = run(&gem_scenario(json!([])))?;
    assert!(required(&loaded, 0, "sealed", "gem")?.is_empty());

    // With Chest-A sealed off, Chest-B is the only source left.
    let (loaded, report) = run(&gem_scenario(json!(["Chest-A"])))?;
    let records = required(&loaded, 0, "sealed", "gem")?;
    assert_eq!(location_names(&loaded, records), vec!["Chest-B"]);
    assert_eq!(report.goal_locations[&0]["sealed"]["gem"][&0], vec![key(0, 1)]);
    Ok(())
}

#[test]
fn test_location_target_records_gating_item() -> Result<()> {
    let (loaded, _) = run(&json!({
        "goal_categories": [{
            "name": "tower", "priority": 10, "goal_count": 1, "minimum_goals": 1,
            "goals": [{"name": "summit", "color": "Black", "locations": ["Tower Chest"]}]
        }],
        "worlds": [{
            "regions": ["Tower"],
            "entrances": [{"name": "Root -> Tower", "from": "Root", "to": "Tower", "requirement": gate("Hookshot")}],
            "locations": [
                {"name": "Hookshot Chest", "item": item("Hookshot")},
                {"name": "Tower Chest", "region": "Tower", "item": item("Triforce")},
                {"name": "Bow Chest", "item": item("Bow")}
            ]
        }]
    }))?;
    let records = required(&loaded, 0, "tower", "summit")?;
    assert_eq!(location_names(&loaded, records), vec!["Hookshot Chest"]);
    assert_eq!(records[0].hintable_worlds, vec![0]);
    Ok(())
}

#[test]
fn test_locked_pass_claim_carries_into_unlocked_pass() -> Result<()> {
    // The unlocked category has the lower priority number, but the locked pass runs first.
    let (loaded, _) = run(&json!({
        "goal_categories": [
            {"name": "bridge", "priority": 10, "goal_count": 1, "minimum_goals": 1,
             "lock_entrances": ["Root -> Castle"],
             "goals": [{"name": "forest", "color": "Green", "items": [{"name": "Gem"}]}]},
            {"name": "castle", "priority": 5, "goal_count": 1, "minimum_goals": 1,
             "goals": [{"name": "gem", "color": "Blue", "items": [{"name": "Gem"}]}]}
        ],
        "worlds": [{
            "regions": ["Castle"],
            "entrances": [{"name": "Root -> Castle", "from": "Root", "to": "Castle"}],
            "locations": [
                {"name": "Chest-9", "item": item("Gem")},
                {"name": "Castle Chest", "region": "Castle", "item": item("Triforce")}
            ]
        }]
    }))?;
    let records = required(&loaded, 0, "bridge", "forest")?;
    assert_eq!(location_names(&loaded, records), vec!["Chest-9"]);
    assert!(required(&loaded, 0, "castle", "gem")?.is_empty());
    assert_eq!(loaded.goals[0].category("castle")?.weight, 0);
    Ok(())
}

#[test]
fn test_negative_starting_count_rejected() -> Result<()> {
    let mut world = vault_world();
    world["starting_items"] = json!([{"name": "Key-A", "count": -2}]);
    let result = parse_scenario(&json!({"worlds": [world]}).to_string())?.build();
    let err = match result {
        Ok(_) => bail!("expected a starting count error"),
        Err(err) => err,
    };
    let scan_err = err
        .downcast_ref::<ScanError>()
        .context("expected a ScanError")?;
    assert!(matches!(scan_err, ScanError::InvalidStartingCount { count: -2, .. }));
    assert_eq!(scan_err.kind(), ErrorKind::Configuration);
    Ok(())
}

#[test]
fn test_cross_world_attribution() -> Result<()> {
    // Each world's key sits in the other world.
    let mut world0 = vault_world();
    world0["locations"][0]["item"]["world"] = json!(1);
    let mut world1 = vault_world();
    world1["locations"][0]["item"]["world"] = json!(0);
    let (loaded, report) = run(&json!({
        "goal_categories": [door_category()],
        "worlds": [world0, world1]
    }))?;

    let records = required(&loaded, 0, "door", "key")?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].location, key(0, 0));
    assert_eq!(records[0].hintable_worlds, vec![1]);
    let records = required(&loaded, 1, "door", "key")?;
    assert_eq!(records[0].location, key(1, 0));
    assert_eq!(records[0].hintable_worlds, vec![0]);

    assert_eq!(report.goal_locations[&0]["door"]["key"][&1], vec![key(1, 0)]);
    assert_eq!(report.goal_locations[&1]["door"]["key"][&0], vec![key(0, 0)]);
    assert_eq!(report.woth_locations[0], vec![key(0, 0), key(0, 1)]);
    assert_eq!(report.woth_locations[1], vec![key(1, 0), key(1, 1)]);
    Ok(())
}

#[test]
fn test_default_goal_fallback() -> Result<()> {
    let (loaded, report) = run(&json!({"worlds": [vault_world()]}))?;
    let hero = loaded.goals[0].category("ganon")?.get_goal("the hero")?;
    assert_eq!(location_names(&loaded, &hero.required_locations), vec!["Chest-1", "Vault Chest"]);
    assert_eq!(report.goal_locations[&0]["ganon"]["the hero"][&0], report.woth_locations[0]);

    let spoiler = get_spoiler_goals(&loaded.worlds, &loaded.goals, &report);
    let Some(ganon) = spoiler.worlds[0].categories.iter().find(|c| c.name == "ganon") else {
        bail!("fallback category missing from spoiler");
    };
    assert_eq!(ganon.goals[0].color, "White");
    assert_eq!(ganon.goals[0].required_locations[1].location.item.as_deref(), Some("Triforce"));
    Ok(())
}

#[test]
fn test_no_fallback_when_default_category_configured() -> Result<()> {
    let (loaded, report) = run(&json!({
        "goal_categories": [{
            "name": "ganon", "priority": 30, "goal_count": 1, "minimum_goals": 1,
            "goals": [{"name": "boss", "color": "Red", "items": [{"name": "Master Sword"}]}]
        }],
        "worlds": [vault_world()]
    }))?;
    // Master Sword is nowhere to be found, so nothing is required, and no hero goal appears.
    assert!(!report.has_required_locations());
    assert!(loaded.goals[0].category("ganon")?.get_goal("the hero").is_err());
    assert!(report.goal_locations.is_empty());
    Ok(())
}

#[test]
fn test_unknown_lock_entrance_is_configuration_error() -> Result<()> {
    let result = run(&json!({
        "goal_categories": [{
            "name": "bridge", "priority": 10, "lock_entrances": ["Root -> Moon"],
            "goals": [{"name": "forest", "color": "Green", "items": [{"name": "Forest Medallion"}]}]
        }],
        "worlds": [vault_world()]
    }));
    let err = match result {
        Ok(_) => bail!("expected an unknown entrance error"),
        Err(err) => err,
    };
    let scan_err = err
        .downcast_ref::<ScanError>()
        .context("expected a ScanError")?;
    assert_eq!(scan_err.kind(), ErrorKind::Configuration);
    Ok(())
}
