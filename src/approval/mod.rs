//! # Approver Chain Resolver
//!
//! Approval steps for one request form a singly-linked chain through their
//! predecessor references. This module reconstructs the ordered sequence
//! from the unordered step set and determines which approver(s) may act,
//! depending on the workspace's approval policy.
//!
//! The resolver never mutates its input; it returns a snapshot ordering
//! usable for both notification fan-out and gatekeeper determination.

pub mod chain;

pub use chain::{active_approvers, sort_approvers};
