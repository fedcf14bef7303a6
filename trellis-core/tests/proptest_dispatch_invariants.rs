//! Property-based invariant tests for dispatch.
//!
//! 1. Setting an equal value never reports the cell and never reevaluates
//!    dependents; setting a different value does both exactly once.
//! 2. A readonly provider runs once at creation plus once per reevaluation.
//! 3. A batch reports each distinct changed cell once, in first-changed
//!    order, and reevaluates a shared dependent once.
//! 4. A guarded command fires exactly once per executability transition.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;

use trellis_core::reactive::{Command, ReadonlyCell};
use trellis_core::Registry;

fn recording_registry() -> (Registry, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    let registry = Registry::builder()
        .on_property_changed(move |cell| l.lock().push(cell.name().to_string()))
        .build();
    (registry, log)
}

proptest! {
    #[test]
    fn equal_sets_are_silent(initial in any::<i32>(), writes in proptest::collection::vec(any::<i32>(), 0..32)) {
        let (registry, log) = recording_registry();
        let runs = Arc::new(AtomicI32::new(0));

        let cell = registry.create_writable("Cell", initial).unwrap();
        let r = runs.clone();
        registry
            .create_action(move || { r.fetch_add(1, Ordering::SeqCst); }, &[&cell])
            .unwrap();

        let mut current = initial;
        let mut changes = 0;
        for value in writes {
            if value != current {
                changes += 1;
                current = value;
            }
            cell.set(value);
        }

        prop_assert_eq!(cell.get(), current);
        prop_assert_eq!(log.lock().len(), changes);
        prop_assert_eq!(runs.load(Ordering::SeqCst), changes as i32);
    }

    #[test]
    fn provider_runs_once_per_reevaluate(reevaluations in 0usize..64) {
        let calls = Arc::new(AtomicI32::new(0));
        let c = calls.clone();
        let cell = ReadonlyCell::new("Cell", move || c.fetch_add(1, Ordering::SeqCst)).unwrap();

        for _ in 0..reevaluations {
            cell.reevaluate();
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst) as usize, reevaluations + 1);
    }

    #[test]
    fn batch_reports_distinct_cells_in_first_changed_order(
        writes in proptest::collection::vec((0usize..4, 1i32..100), 1..24),
    ) {
        let (registry, log) = recording_registry();
        let cells: Vec<_> = (0..4)
            .map(|i| registry.create_writable(format!("Cell{i}"), 0).unwrap())
            .collect();

        let runs = Arc::new(AtomicI32::new(0));
        let r = runs.clone();
        let deps: Vec<&dyn trellis_core::Property> = cells.iter().map(|cell| cell as &dyn trellis_core::Property).collect();
        registry
            .create_action(move || { r.fetch_add(1, Ordering::SeqCst); }, &deps)
            .unwrap();

        let mut expected: Vec<String> = Vec::new();
        let mut values = [0i32; 4];
        for (index, value) in &writes {
            if values[*index] != *value {
                values[*index] = *value;
                let name = format!("Cell{index}");
                if !expected.contains(&name) {
                    expected.push(name);
                }
            }
        }

        registry
            .batch_update(|| {
                for (index, value) in &writes {
                    cells[*index].set(*value);
                }
            })
            .unwrap();

        prop_assert_eq!(&*log.lock(), &expected);
        prop_assert_eq!(runs.load(Ordering::SeqCst), i32::from(!expected.is_empty()));
    }

    #[test]
    fn command_fires_once_per_transition(results in proptest::collection::vec(any::<bool>(), 0..32)) {
        let next = Arc::new(AtomicBool::new(true));
        let n = next.clone();
        let command = Command::guarded(|| {}, move || n.load(Ordering::SeqCst));

        let fired = Arc::new(AtomicI32::new(0));
        let f = fired.clone();
        let _subscription = command.on_can_execute_changed(move || { f.fetch_add(1, Ordering::SeqCst); });

        let mut cached = true;
        let mut transitions = 0;
        for result in results {
            if result != cached {
                transitions += 1;
                cached = result;
            }
            next.store(result, Ordering::SeqCst);
            command.reevaluate();
        }

        prop_assert_eq!(fired.load(Ordering::SeqCst), transitions);
        prop_assert_eq!(command.can_execute(), cached);
    }
}
