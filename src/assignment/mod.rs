//! Reviewer assignment rules.
//!
//! Everything here is pure: callers pass the candidate pool and a random
//! source, and get back the new reviewer list. Persisting the result is the
//! caller's job.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::models::{PullRequest, REVIEWER_SLOTS};

/// Reasons a single-reviewer replacement cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("user {reviewer_id} is not a reviewer of {pr_id}")]
    NotAssigned { pr_id: String, reviewer_id: String },
    #[error("no active candidate available for {pr_id}")]
    NoCandidate { pr_id: String },
}

/// Hands out an independent uniform generator per service call.
pub trait RandomSource: Send + Sync {
    fn rng(&self) -> StdRng;
}

/// Seeds every generator from OS entropy.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntropySource;

impl RandomSource for EntropySource {
    fn rng(&self) -> StdRng {
        StdRng::from_entropy()
    }
}

/// Deterministic source: the n-th generator is seeded with `base + n`.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct SeededSource {
    next: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl SeededSource {
    pub fn new(base: u64) -> Self {
        Self {
            next: std::sync::atomic::AtomicU64::new(base),
        }
    }
}

#[cfg(test)]
impl RandomSource for SeededSource {
    fn rng(&self) -> StdRng {
        let seed = self
            .next
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        StdRng::seed_from_u64(seed)
    }
}

/// A pull request is short of reviewers while it has fewer than two.
pub fn needs_more_reviewers(reviewers: &[String]) -> bool {
    reviewers.len() < REVIEWER_SLOTS
}

/// Pick up to `slots` reviewers uniformly from `pool`, never the author and
/// never anyone in `excluded`.
pub fn select_reviewers<R: Rng + ?Sized>(
    author_id: &str,
    pool: &[String],
    slots: usize,
    excluded: &HashSet<String>,
    rng: &mut R,
) -> Vec<String> {
    let mut candidates: Vec<String> = pool
        .iter()
        .filter(|id| id.as_str() != author_id && !excluded.contains(id.as_str()))
        .cloned()
        .collect();

    candidates.shuffle(rng);
    candidates.truncate(slots);
    candidates
}

/// Result of replacing one reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub reviewers: Vec<String>,
    pub replaced_by: String,
}

impl Replacement {
    pub fn need_more_reviewers(&self) -> bool {
        needs_more_reviewers(&self.reviewers)
    }
}

/// Swap `old` for a uniformly chosen member of `pool`.
///
/// The author and every current reviewer (including `old`) are ineligible.
/// The new reviewer takes `old`'s slot; the other slot keeps its position.
pub fn replace_reviewer<R: Rng + ?Sized>(
    pr: &PullRequest,
    old: &str,
    pool: &[String],
    rng: &mut R,
) -> Result<Replacement, AssignmentError> {
    let Some(slot) = pr.reviewers.iter().position(|r| r == old) else {
        return Err(AssignmentError::NotAssigned {
            pr_id: pr.id.clone(),
            reviewer_id: old.to_string(),
        });
    };

    let excluded = exclusion_set(pr);
    let candidates: Vec<&String> = pool
        .iter()
        .filter(|id| !excluded.contains(id.as_str()))
        .collect();

    let replaced_by = candidates
        .choose(rng)
        .map(|id| (*id).clone())
        .ok_or_else(|| AssignmentError::NoCandidate {
            pr_id: pr.id.clone(),
        })?;

    let mut reviewers = pr.reviewers.clone();
    reviewers[slot] = replaced_by.clone();

    Ok(Replacement {
        reviewers,
        replaced_by,
    })
}

/// Repair the reviewer list of an open pull request after the users in
/// `deactivated` lost their active flag.
///
/// Returns `None` when none of the reviewers was deactivated. Otherwise each
/// deactivated reviewer, in list order, is replaced by a fresh candidate from
/// `pool`, or dropped when the pool has nobody left.
pub fn repair_reviewers<R: Rng + ?Sized>(
    pr: &PullRequest,
    deactivated: &HashSet<String>,
    pool: &[String],
    rng: &mut R,
) -> Option<Vec<String>> {
    let stale: Vec<String> = pr
        .reviewers
        .iter()
        .filter(|r| deactivated.contains(r.as_str()))
        .cloned()
        .collect();
    if stale.is_empty() {
        return None;
    }

    let mut excluded = exclusion_set(pr);
    let mut candidates: Vec<String> = pool
        .iter()
        .filter(|id| !excluded.contains(id.as_str()))
        .cloned()
        .collect();

    if candidates.is_empty() {
        let kept = pr
            .reviewers
            .iter()
            .filter(|r| !deactivated.contains(r.as_str()))
            .cloned()
            .collect();
        return Some(kept);
    }

    let mut reviewers = pr.reviewers.clone();
    for old in &stale {
        candidates.shuffle(rng);
        let fresh = candidates
            .iter()
            .find(|id| !excluded.contains(id.as_str()))
            .cloned();

        match fresh {
            Some(new_id) => {
                if let Some(slot) = reviewers.iter().position(|r| r == old) {
                    reviewers[slot] = new_id.clone();
                }
                excluded.insert(new_id);
            }
            None => reviewers.retain(|r| r != old),
        }
    }

    Some(reviewers)
}

fn exclusion_set(pr: &PullRequest) -> HashSet<String> {
    std::iter::once(pr.author_id.clone())
        .chain(pr.reviewers.iter().cloned())
        .collect()
}
