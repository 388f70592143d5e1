//! Whole-graph checks over the canonical transition table.

use std::collections::{BTreeSet, VecDeque};

use domain::{InventoryEffect, OrderStateMachine, OrderStatus, Rejection, TransitionTable};

fn successors(machine: &OrderStateMachine, from: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|&to| machine.can_transition(from, to).is_allowed())
        .collect()
}

/// Every path from `pending_confirmation` to a terminal status.
fn all_paths(machine: &OrderStateMachine) -> Vec<Vec<OrderStatus>> {
    let mut complete = Vec::new();
    let mut stack = vec![vec![OrderStatus::PendingConfirmation]];
    while let Some(path) = stack.pop() {
        let last = *path.last().unwrap();
        let next = successors(machine, last);
        if next.is_empty() {
            complete.push(path);
            continue;
        }
        for status in next {
            assert!(!path.contains(&status), "cycle through {status}");
            let mut extended = path.clone();
            extended.push(status);
            stack.push(extended);
        }
    }
    complete
}

#[test]
fn canonical_table_is_well_formed() {
    TransitionTable::canonical().validate().unwrap();
}

#[test]
fn every_status_reachable_from_pending() {
    let machine = OrderStateMachine::new();
    let mut seen = BTreeSet::from([OrderStatus::PendingConfirmation.as_str()]);
    let mut queue = VecDeque::from([OrderStatus::PendingConfirmation]);

    while let Some(status) = queue.pop_front() {
        for next in successors(&machine, status) {
            if seen.insert(next.as_str()) {
                queue.push_back(next);
            }
        }
    }
    assert_eq!(seen.len(), OrderStatus::ALL.len());
}

#[test]
fn only_terminal_statuses_are_dead_ends() {
    let machine = OrderStateMachine::new();
    for status in OrderStatus::ALL {
        assert_eq!(
            successors(&machine, status).is_empty(),
            status.is_terminal(),
            "{status}"
        );
    }
}

#[test]
fn terminal_statuses_reject_everything() {
    let machine = OrderStateMachine::new();
    for from in [OrderStatus::Returned, OrderStatus::Canceled] {
        for to in OrderStatus::ALL {
            let err = machine.decide(from, to).unwrap_err();
            let expected = if from == to {
                Rejection::SameStatus
            } else {
                Rejection::Terminal
            };
            assert!(
                matches!(err, domain::DomainError::InvalidTransition { reason, .. } if reason == expected),
                "{from} -> {to}"
            );
        }
    }
}

/// Stock is reserved at most once per path, only released while reserved,
/// and held exactly while the order is in fulfillment.
#[test]
fn inventory_effects_balance_along_every_path() {
    let machine = OrderStateMachine::new();
    let paths = all_paths(&machine);
    assert!(paths.len() > 10);

    for path in paths {
        let mut reserved = 0;
        let mut delivered = false;

        for pair in path.windows(2) {
            let transition = machine.decide(pair[0], pair[1]).unwrap();
            match transition.effect {
                Some(InventoryEffect::Reserve) => reserved += 1,
                Some(InventoryEffect::Release(_)) => reserved -= 1,
                None => {}
            }
            assert!((0..=1).contains(&reserved), "{path:?}");

            let status = pair[1];
            delivered |= status == OrderStatus::Delivered;
            assert_eq!(
                reserved == 1 && !delivered,
                status.holds_reserved_stock(),
                "{path:?} at {status}"
            );
        }

        let end = *path.last().unwrap();
        match end {
            OrderStatus::Returned => assert_eq!(reserved, 0, "{path:?}"),
            OrderStatus::Canceled if !delivered => assert_eq!(reserved, 0, "{path:?}"),
            // Canceling a return request leaves the goods with the customer.
            OrderStatus::Canceled => assert_eq!(reserved, 1, "{path:?}"),
            other => panic!("path ended at non-terminal {other}"),
        }
    }
}
