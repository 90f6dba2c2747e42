//! Reorder controller: moves an activity to a new slot.
//!
//! A move is captured as a command object (source slot, destination slot,
//! payload id) and executed against storage, decoupling gesture or CLI
//! capture from the persistence calls. The protocol:
//!
//! 1. Identical source and destination slots: no-op, nothing persisted.
//! 2. Fetch the destination stage's sibling order.
//! 3. Compute the insertion key via the ordering engine.
//! 4. Persist sort key (and stage, when it changed) in one record update.
//!    Failure here aborts the move.
//! 5. When keys have crowded, run a corrective rebalance over the
//!    destination group. Rebalance failures are warnings, not rollbacks:
//!    the move already succeeded and a later move repairs spacing.

use crate::models::Activity;
use crate::ordering::OrderedCollection;
use crate::storage::Storage;
use crate::Result;

/// A position within a stage group.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Slot {
    /// Stage label
    pub stage: String,
    /// Index within the stage's display order
    pub index: usize,
}

impl Slot {
    pub fn new(stage: impl Into<String>, index: usize) -> Self {
        Self {
            stage: stage.into(),
            index,
        }
    }
}

/// A user-initiated move, queued for execution.
#[derive(Debug, Clone)]
pub struct MoveCommand {
    /// Activity being moved
    pub activity_id: String,
    /// Where the activity currently sits
    pub from: Slot,
    /// Where it should land
    pub to: Slot,
}

/// Result of executing a move.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MoveOutcome {
    /// False when the move was a same-slot no-op
    pub moved: bool,
    /// The sort key written for the moved activity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_sort_key: Option<i64>,
    /// True when the activity changed stages
    pub stage_changed: bool,
    /// True when a corrective rebalance pass ran
    pub rebalanced: bool,
}

impl MoveCommand {
    pub fn new(activity_id: impl Into<String>, from: Slot, to: Slot) -> Self {
        Self {
            activity_id: activity_id.into(),
            from,
            to,
        }
    }

    /// Execute the move against storage.
    pub fn execute(&self, storage: &mut Storage) -> Result<MoveOutcome> {
        // Verify the payload exists before touching anything
        storage.get_activity(&self.activity_id)?;

        if self.from == self.to {
            return Ok(MoveOutcome {
                moved: false,
                new_sort_key: None,
                stage_changed: false,
                rebalanced: false,
            });
        }

        // Destination sibling order, excluding the moved activity itself so
        // an in-stage move computes its key against its future neighbors.
        let siblings: Vec<(String, i64)> = storage
            .list_stage(&self.to.stage)?
            .iter()
            .filter(|a| a.id != self.activity_id)
            .map(|a| (a.id.clone(), a.sort_key))
            .collect();

        let engine = OrderedCollection::new();
        let target = self.to.index.min(siblings.len());
        let new_key = engine.insertion_key(&siblings, target);

        let stage_changed = self.from.stage != self.to.stage;
        storage.update_order(
            &self.activity_id,
            stage_changed.then_some(self.to.stage.as_str()),
            new_key,
        )?;

        let prev_key = target.checked_sub(1).map(|i| siblings[i].1);
        let mut rebalanced = false;
        if engine.needs_rebalance(new_key, prev_key) {
            rebalanced = true;
            rebalance_stage(storage, &self.to.stage, &engine);
        }

        Ok(MoveOutcome {
            moved: true,
            new_sort_key: Some(new_key),
            stage_changed,
            rebalanced,
        })
    }
}

/// Respace an entire stage group, one record at a time.
///
/// Individual write failures are reported and skipped: the move itself has
/// already been persisted, and a partial respace still orders correctly.
fn rebalance_stage(storage: &mut Storage, stage: &str, engine: &OrderedCollection) {
    let members: Vec<(String, i64)> = match storage.list_stage(stage) {
        Ok(members) => members
            .iter()
            .map(|a: &Activity| (a.id.clone(), a.sort_key))
            .collect(),
        Err(e) => {
            eprintln!("Warning: rebalance skipped, could not list stage {}: {}", stage, e);
            return;
        }
    };

    for (id, key) in engine.rebalance(&members) {
        if let Err(e) = storage.update_order(&id, None, key) {
            eprintln!("Warning: rebalance write failed for {}: {}", id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Activity;
    use crate::test_utils::TestEnv;

    fn seed_stage(storage: &mut Storage, stage: &str, ids_keys: &[(&str, i64)]) {
        for (id, key) in ids_keys {
            let mut a = Activity::new(id.to_string(), format!("Activity {}", id));
            a.stage = stage.to_string();
            a.sort_key = *key;
            storage.create_activity(&a).unwrap();
        }
    }

    fn stage_order(storage: &Storage, stage: &str) -> Vec<(String, i64)> {
        storage
            .list_stage(stage)
            .unwrap()
            .iter()
            .map(|a| (a.id.clone(), a.sort_key))
            .collect()
    }

    #[test]
    fn test_same_slot_is_noop() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed_stage(&mut storage, "4.0 PRELIMINARY", &[("act-0001", 100)]);
        let before = storage.get_activity("act-0001").unwrap();

        let cmd = MoveCommand::new(
            "act-0001",
            Slot::new("4.0 PRELIMINARY", 0),
            Slot::new("4.0 PRELIMINARY", 0),
        );
        let outcome = cmd.execute(&mut storage).unwrap();

        assert!(!outcome.moved);
        assert!(outcome.new_sort_key.is_none());
        // No persistence call: the record is untouched
        let after = storage.get_activity("act-0001").unwrap();
        assert_eq!(after.sort_key, before.sort_key);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[test]
    fn test_move_third_to_front() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed_stage(
            &mut storage,
            "4.0 PRELIMINARY",
            &[("act-0001", 100), ("act-0002", 200), ("act-0003", 300)],
        );

        let cmd = MoveCommand::new(
            "act-0003",
            Slot::new("4.0 PRELIMINARY", 2),
            Slot::new("4.0 PRELIMINARY", 0),
        );
        let outcome = cmd.execute(&mut storage).unwrap();

        assert!(outcome.moved);
        // max(0, 100 - 100) = 0, which also triggers the corrective pass
        assert_eq!(outcome.new_sort_key, Some(0));
        assert!(outcome.rebalanced);

        let order = stage_order(&storage, "4.0 PRELIMINARY");
        let ids: Vec<&str> = order.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["act-0003", "act-0001", "act-0002"]);
        let keys: Vec<i64> = order.iter().map(|(_, k)| *k).collect();
        assert_eq!(keys, vec![100, 200, 300]);
    }

    #[test]
    fn test_move_between_collision_rebalances() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed_stage(
            &mut storage,
            "4.0 PRELIMINARY",
            &[("act-0001", 100), ("act-0002", 101), ("act-0003", 500)],
        );

        // Move the third activity between the crowded pair
        let cmd = MoveCommand::new(
            "act-0003",
            Slot::new("4.0 PRELIMINARY", 2),
            Slot::new("4.0 PRELIMINARY", 1),
        );
        let outcome = cmd.execute(&mut storage).unwrap();

        assert!(outcome.moved);
        assert_eq!(outcome.new_sort_key, Some(100));
        assert!(outcome.rebalanced);

        let order = stage_order(&storage, "4.0 PRELIMINARY");
        let ids: Vec<&str> = order.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["act-0001", "act-0003", "act-0002"]);
        let keys: Vec<i64> = order.iter().map(|(_, k)| *k).collect();
        assert_eq!(keys, vec![100, 200, 300]);
    }

    #[test]
    fn test_move_to_end_no_rebalance() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed_stage(
            &mut storage,
            "4.0 PRELIMINARY",
            &[("act-0001", 100), ("act-0002", 200)],
        );

        let cmd = MoveCommand::new(
            "act-0001",
            Slot::new("4.0 PRELIMINARY", 0),
            Slot::new("4.0 PRELIMINARY", 2),
        );
        let outcome = cmd.execute(&mut storage).unwrap();

        assert!(outcome.moved);
        assert_eq!(outcome.new_sort_key, Some(300));
        assert!(!outcome.rebalanced);

        let order = stage_order(&storage, "4.0 PRELIMINARY");
        let ids: Vec<&str> = order.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["act-0002", "act-0001"]);
    }

    #[test]
    fn test_move_across_stages_reassigns_stage() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed_stage(&mut storage, "4.0 PRELIMINARY", &[("act-0001", 100)]);
        seed_stage(
            &mut storage,
            "5.0 STRUCTURE",
            &[("act-0002", 100), ("act-0003", 200)],
        );

        let cmd = MoveCommand::new(
            "act-0001",
            Slot::new("4.0 PRELIMINARY", 0),
            Slot::new("5.0 STRUCTURE", 1),
        );
        let outcome = cmd.execute(&mut storage).unwrap();

        assert!(outcome.moved);
        assert!(outcome.stage_changed);
        assert_eq!(outcome.new_sort_key, Some(150));

        assert!(storage.list_stage("4.0 PRELIMINARY").unwrap().is_empty());
        let ids: Vec<String> = storage
            .list_stage("5.0 STRUCTURE")
            .unwrap()
            .iter()
            .map(|a| a.id.clone())
            .collect();
        assert_eq!(ids, vec!["act-0002", "act-0001", "act-0003"]);
    }

    #[test]
    fn test_move_into_empty_stage() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed_stage(&mut storage, "4.0 PRELIMINARY", &[("act-0001", 100)]);

        let cmd = MoveCommand::new(
            "act-0001",
            Slot::new("4.0 PRELIMINARY", 0),
            Slot::new("9.0 HANDOVER", 0),
        );
        let outcome = cmd.execute(&mut storage).unwrap();

        assert!(outcome.moved);
        assert_eq!(outcome.new_sort_key, Some(100));
        assert_eq!(storage.list_stage("9.0 HANDOVER").unwrap().len(), 1);
    }

    #[test]
    fn test_move_missing_activity_fails() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();

        let cmd = MoveCommand::new(
            "act-0000",
            Slot::new("4.0 PRELIMINARY", 0),
            Slot::new("4.0 PRELIMINARY", 1),
        );
        assert!(cmd.execute(&mut storage).is_err());
    }

    #[test]
    fn test_index_clamped_to_group_size() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        seed_stage(
            &mut storage,
            "4.0 PRELIMINARY",
            &[("act-0001", 100), ("act-0002", 200)],
        );

        let cmd = MoveCommand::new(
            "act-0001",
            Slot::new("4.0 PRELIMINARY", 0),
            Slot::new("4.0 PRELIMINARY", 99),
        );
        let outcome = cmd.execute(&mut storage).unwrap();
        assert_eq!(outcome.new_sort_key, Some(300));
    }
}
