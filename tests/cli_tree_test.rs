//! Integration tests for the `gy tree` command.
//!
//! Verifies stage grouping, derived display identifiers, orphan
//! promotion, and collapsed-branch pruning.

mod common;

use assert_cmd::Command;
use common::TestEnv;
use predicates::prelude::*;
use predicates::str::contains;

fn gy_in(env: &TestEnv) -> Command {
    env.gy()
}

#[test]
fn test_tree_groups_by_stage() {
    let env = TestEnv::init();
    env.create_activity("Set out", Some("4.0 PRELIMINARY"));
    env.create_activity("Frame", Some("5.0 STRUCTURE"));

    gy_in(&env)
        .args(["tree"])
        .assert()
        .success()
        .stdout(contains("\"stage\":\"4.0 PRELIMINARY\""))
        .stdout(contains("\"stage\":\"5.0 STRUCTURE\""))
        .stdout(contains("\"display_id\":\"4.1\""))
        .stdout(contains("\"display_id\":\"5.1\""));
}

#[test]
fn test_tree_nests_children() {
    let env = TestEnv::init();
    let parent = env.create_activity("Frame level 1", Some("5.0 STRUCTURE"));

    gy_in(&env)
        .args(["activity", "create", "Stand columns", "-p", parent.as_str()])
        .assert()
        .success();

    gy_in(&env)
        .args(["tree"])
        .assert()
        .success()
        .stdout(contains("\"display_id\":\"5.1.1\""))
        .stdout(contains("Stand columns"));
}

#[test]
fn test_tree_single_stage_filter() {
    let env = TestEnv::init();
    env.create_activity("Set out", Some("4.0 PRELIMINARY"));
    env.create_activity("Frame", Some("5.0 STRUCTURE"));

    gy_in(&env)
        .args(["tree", "--stage", "5.0 STRUCTURE"])
        .assert()
        .success()
        .stdout(contains("5.0 STRUCTURE"))
        .stdout(contains("Frame"))
        .stdout(predicates::str::contains("4.0 PRELIMINARY").not());
}

#[test]
fn test_tree_promotes_orphans() {
    let env = TestEnv::init();
    let parent = env.create_activity("Frame level 1", Some("5.0 STRUCTURE"));

    let output = gy_in(&env)
        .args(["activity", "create", "Stand columns", "-p", parent.as_str()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let child: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let child_id = child["id"].as_str().unwrap().to_string();

    gy_in(&env)
        .args(["activity", "delete", parent.as_str()])
        .assert()
        .success();

    // The child keeps its record but renders as a promoted root.
    gy_in(&env)
        .args(["tree"])
        .assert()
        .success()
        .stdout(contains(child_id.as_str()))
        .stdout(contains("\"orphaned\":true"));
}

#[test]
fn test_tree_human_marks_orphans() {
    let env = TestEnv::init();
    let parent = env.create_activity("Frame level 1", Some("5.0 STRUCTURE"));

    gy_in(&env)
        .args(["activity", "create", "Stand columns", "-p", parent.as_str()])
        .assert()
        .success();

    gy_in(&env)
        .args(["activity", "delete", parent.as_str()])
        .assert()
        .success();

    gy_in(&env)
        .args(["tree", "-H"])
        .assert()
        .success()
        .stdout(contains("(orphan)"));
}

#[test]
fn test_tree_prunes_collapsed_branches() {
    let env = TestEnv::init();
    let parent = env.create_activity("Frame level 1", Some("5.0 STRUCTURE"));

    gy_in(&env)
        .args(["activity", "create", "Stand columns", "-p", parent.as_str()])
        .assert()
        .success();

    gy_in(&env)
        .args(["activity", "update", parent.as_str(), "--expanded", "false"])
        .assert()
        .success();

    gy_in(&env)
        .args(["tree"])
        .assert()
        .success()
        .stdout(contains("Stand columns").not());

    gy_in(&env)
        .args(["tree", "--all"])
        .assert()
        .success()
        .stdout(contains("Stand columns"));
}

#[test]
fn test_tree_sibling_order_follows_sort_key() {
    let env = TestEnv::init();
    env.create_activity("Set out", Some("4.0 PRELIMINARY"));
    let second = env.create_activity("Excavate", Some("4.0 PRELIMINARY"));

    gy_in(&env)
        .args(["move", second.as_str(), "--index", "0"])
        .assert()
        .success();

    let output = gy_in(&env)
        .args(["tree"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let excavate = stdout.find("Excavate").unwrap();
    let set_out = stdout.find("Set out").unwrap();
    assert!(excavate < set_out);
}
