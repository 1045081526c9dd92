//! Property-based invariant tests for `Store`.
//!
//! 1. The final state is the left fold of the reducer over the actions.
//! 2. Every dispatch notifies each subscriber exactly once, including
//!    dispatches that leave state identity unchanged.
//! 3. State identity changes exactly when the reducer returns a new snapshot.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cascade_core::{StateSource, Subscribable};
use cascade_store::Store;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Action {
    Add(i64),
    Keep,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![(-50i64..50).prop_map(Action::Add), Just(Action::Keep)]
}

fn reducer(state: &Rc<i64>, action: &Action) -> Rc<i64> {
    match action {
        Action::Add(n) => Rc::new(**state + n),
        Action::Keep => Rc::clone(state),
    }
}

proptest! {
    #[test]
    fn state_is_fold_of_actions(actions in proptest::collection::vec(action(), 0..64)) {
        let store = Store::new(reducer, 0i64);
        for a in &actions {
            store.dispatch(*a);
        }
        let expected: i64 = actions
            .iter()
            .map(|a| match a {
                Action::Add(n) => *n,
                Action::Keep => 0,
            })
            .sum();
        prop_assert_eq!(*store.get_state(), expected);
    }

    #[test]
    fn each_dispatch_notifies_each_subscriber_once(
        actions in proptest::collection::vec(action(), 0..32),
        subscribers in 0usize..6,
    ) {
        let store = Store::new(reducer, 0i64);
        let hits: Vec<Rc<Cell<usize>>> = (0..subscribers).map(|_| Rc::new(Cell::new(0))).collect();
        let handles: Vec<_> = hits
            .iter()
            .map(|hit| {
                let hit = Rc::clone(hit);
                store.subscribe(Rc::new(move || hit.set(hit.get() + 1)))
            })
            .collect();

        for a in &actions {
            store.dispatch(*a);
        }
        for hit in &hits {
            prop_assert_eq!(hit.get(), actions.len());
        }
        prop_assert_eq!(store.listener_count(), handles.len());
    }

    #[test]
    fn identity_changes_only_on_new_snapshot(actions in proptest::collection::vec(action(), 1..32)) {
        let store = Store::new(reducer, 0i64);
        let log = Rc::new(RefCell::new(Vec::new()));
        for a in &actions {
            let before = store.get_state();
            store.dispatch(*a);
            log.borrow_mut().push(Rc::ptr_eq(&before, &store.get_state()));
        }
        for (a, same) in actions.iter().zip(log.borrow().iter()) {
            prop_assert_eq!(*same, matches!(a, Action::Keep));
        }
    }
}
