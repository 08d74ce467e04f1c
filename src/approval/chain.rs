use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use crate::models::{ApprovalPolicy, ApproverStatus, RequestApprover};

/// Reconstruct chain order from predecessor links.
///
/// The root is the unique step with no predecessor; each successor is the
/// step whose predecessor equals the previous step's approver member id.
/// The lookup index is built once, so the walk is linear in the number of
/// steps.
///
/// Defensive contract:
/// - no root found → empty vec (malformed chain; callers skip notification)
/// - cycle detected → the walk stops and the partial chain is returned
///
/// Both cases log a warning: a corrupted approval chain should reach an
/// operator, not silently under-notify.
pub fn sort_approvers(steps: &[RequestApprover]) -> Vec<RequestApprover> {
    if steps.is_empty() {
        return Vec::new();
    }

    let Some(root) = steps
        .iter()
        .find(|s| s.predecessor_approver_member_id.is_none())
    else {
        warn!(
            request_details_id = %steps[0].request_details_id,
            step_count = steps.len(),
            "approver chain has no root step, treating as malformed"
        );
        return Vec::new();
    };

    // predecessor member id -> step; duplicates keep the first encountered.
    let mut by_predecessor: HashMap<Uuid, &RequestApprover> = HashMap::with_capacity(steps.len());
    for step in steps {
        if let Some(pred) = step.predecessor_approver_member_id {
            by_predecessor.entry(pred).or_insert(step);
        }
    }

    let mut ordered: Vec<RequestApprover> = Vec::with_capacity(steps.len());
    let mut seen: Vec<Uuid> = Vec::with_capacity(steps.len());
    ordered.push(root.clone());
    seen.push(root.id);

    let mut cursor = root;
    loop {
        let Some(approver_id) = cursor.approver_member_id else {
            break;
        };
        let Some(next) = by_predecessor.get(&approver_id) else {
            break;
        };
        if seen.contains(&next.id) {
            warn!(
                request_details_id = %next.request_details_id,
                step_id = %next.id,
                "cycle detected in approver chain, returning partial chain"
            );
            break;
        }
        ordered.push((*next).clone());
        seen.push(next.id);
        cursor = next;
    }

    ordered
}

/// The approver step(s) allowed to act right now.
///
/// Sequential policies gate on the earliest step still pending; parallel
/// policies let every pending approver act. Policies that resolve on a
/// single agreement return nothing once any approver has decided.
pub fn active_approvers(
    chain: &[RequestApprover],
    policy: ApprovalPolicy,
) -> Vec<&RequestApprover> {
    if policy.resolves_on_single_agreement()
        && chain.iter().any(|s| s.status.is_own_decision())
    {
        return Vec::new();
    }

    if policy.is_sequential() {
        chain
            .iter()
            .find(|s| s.status == ApproverStatus::Pending)
            .into_iter()
            .collect()
    } else {
        chain
            .iter()
            .filter(|s| s.status == ApproverStatus::Pending)
            .collect()
    }
}
