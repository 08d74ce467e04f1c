mod common;

use proptest::prelude::*;
use uuid::Uuid;

use common::approver_step;
use leavecore::approval::{active_approvers, sort_approvers};
use leavecore::models::{ApprovalPolicy, ApproverStatus, RequestApprover};

/// A well-formed chain of `len` steps, in chain order.
fn linked_chain(len: usize) -> Vec<RequestApprover> {
    let request_id = Uuid::new_v4();
    let mut chain = Vec::with_capacity(len);
    let mut predecessor: Option<Uuid> = None;
    for _ in 0..len {
        let approver = Uuid::new_v4();
        chain.push(approver_step(
            request_id,
            approver,
            predecessor,
            ApproverStatus::Pending,
        ));
        predecessor = Some(approver);
    }
    chain
}

fn permutation(max_len: usize) -> impl Strategy<Value = Vec<usize>> {
    (1..=max_len).prop_flat_map(|len| Just((0..len).collect::<Vec<usize>>()).prop_shuffle())
}

proptest! {
    /// Any storage permutation of a well-formed chain reconstructs the same
    /// order, with nothing lost.
    #[test]
    fn test_sort_recovers_order_from_any_permutation(perm in permutation(8)) {
        let chain = linked_chain(perm.len());
        let shuffled: Vec<RequestApprover> =
            perm.iter().map(|&i| chain[i].clone()).collect();

        let sorted = sort_approvers(&shuffled);
        prop_assert_eq!(sorted.len(), chain.len());
        for (sorted_step, original) in sorted.iter().zip(&chain) {
            prop_assert_eq!(sorted_step.id, original.id);
        }
    }

    /// Arbitrary predecessor wiring (including cycles and dangling links)
    /// always terminates and never yields a duplicated step.
    #[test]
    fn test_sort_terminates_on_arbitrary_links(
        preds in prop::collection::vec(prop::option::of(0usize..8), 1..8)
    ) {
        let request_id = Uuid::new_v4();
        let approvers: Vec<Uuid> = (0..preds.len()).map(|_| Uuid::new_v4()).collect();
        let steps: Vec<RequestApprover> = preds
            .iter()
            .enumerate()
            .map(|(i, pred)| {
                let predecessor = pred.map(|p| approvers[p % approvers.len()]);
                approver_step(request_id, approvers[i], predecessor, ApproverStatus::Pending)
            })
            .collect();

        let sorted = sort_approvers(&steps);
        prop_assert!(sorted.len() <= steps.len());

        let mut ids: Vec<Uuid> = sorted.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), sorted.len());
    }

    /// Sequential policies never activate more than one approver, whatever
    /// the mix of settled statuses.
    #[test]
    fn test_linear_policies_activate_at_most_one(
        statuses in prop::collection::vec(0u8..3, 1..8)
    ) {
        let len = statuses.len();
        let mut chain = linked_chain(len);
        for (step, s) in chain.iter_mut().zip(&statuses) {
            step.status = match s {
                0 => ApproverStatus::Pending,
                1 => ApproverStatus::Approved,
                _ => ApproverStatus::ApprovedByAnotherManager,
            };
        }

        let active = active_approvers(&chain, ApprovalPolicy::LinearAllHaveToAgree);
        prop_assert!(active.len() <= 1);
        if let Some(step) = active.first() {
            prop_assert_eq!(step.status, ApproverStatus::Pending);
        }
    }
}
