//! Slot matching.
//!
//! Inputs are credited against a flattened arena of every accepted
//! alternative. Consumed flags are indexed into that arena and live only for
//! the duration of one `assign` call, so an alternative credited to one
//! input can never be credited to another in the same call.

use std::collections::HashSet;

use crate::equivalence::{EquivalenceChecker, Strategy};
use crate::model::{
    AlternativeId, AnswerAlternative, AnswerSlot, MatchResult, ShapeMismatch, SlotOutcome,
    SlotStatus,
};
use crate::normalize::normalize;

/// What a matcher needs besides the inputs and slots.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub checker: &'a EquivalenceChecker,
    pub sentinel: &'a str,
}

/// Assigns inputs to slots.
///
/// Implementations must keep all bookkeeping local to the call.
pub trait SlotMatcher: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    fn assign(&self, inputs: &[String], slots: &[AnswerSlot], ctx: &MatchContext<'_>)
        -> MatchResult;
}

/// One accepted value in the arena.
#[derive(Debug)]
struct Entry {
    id: AlternativeId,
    value: String,
    pooled: bool,
}

/// How a slot may be satisfied.
#[derive(Debug, Clone, Copy)]
enum Candidate {
    /// A fixed alternative of the slot itself.
    Fixed(usize),
    /// Any unconsumed pooled entry.
    Pool,
}

/// The flattened alternatives of one call.
#[derive(Debug)]
struct Arena {
    entries: Vec<Entry>,
    /// Candidates per slot; `None` for sentinel slots.
    slots: Vec<Option<Vec<Candidate>>>,
}

impl Arena {
    fn build(slots: &[AnswerSlot], sentinel: &str) -> Self {
        let mut entries = Vec::new();
        let mut seen_pools = HashSet::new();
        let mut per_slot = Vec::with_capacity(slots.len());

        for (slot_idx, slot) in slots.iter().enumerate() {
            if slot.is_not_required(sentinel) {
                per_slot.push(None);
                continue;
            }
            let mut candidates = Vec::new();
            for (alt_idx, alternative) in slot.alternatives.iter().enumerate() {
                match alternative {
                    AnswerAlternative::Fixed(value) => {
                        candidates.push(Candidate::Fixed(entries.len()));
                        entries.push(Entry {
                            id: AlternativeId {
                                slot: slot_idx,
                                alternative: alt_idx,
                                member: None,
                            },
                            value: value.clone(),
                            pooled: false,
                        });
                    }
                    AnswerAlternative::Pool(members) => {
                        candidates.push(Candidate::Pool);
                        // the same pool declared on several slots is one pool
                        if !seen_pools.insert(pool_key(members)) {
                            continue;
                        }
                        for (member_idx, value) in members.iter().enumerate() {
                            entries.push(Entry {
                                id: AlternativeId {
                                    slot: slot_idx,
                                    alternative: alt_idx,
                                    member: Some(member_idx),
                                },
                                value: value.clone(),
                                pooled: true,
                            });
                        }
                    }
                }
            }
            per_slot.push(Some(candidates));
        }

        Arena {
            entries,
            slots: per_slot,
        }
    }

    /// Entry indices a slot may use, in preference order.
    fn reachable(&self, candidates: &[Candidate]) -> Vec<usize> {
        let mut out = Vec::new();
        for candidate in candidates {
            match candidate {
                Candidate::Fixed(idx) => out.push(*idx),
                Candidate::Pool => out.extend(
                    self.entries
                        .iter()
                        .enumerate()
                        .filter(|(_, e)| e.pooled)
                        .map(|(i, _)| i),
                ),
            }
        }
        let mut seen = vec![false; self.entries.len()];
        out.retain(|&i| !std::mem::replace(&mut seen[i], true));
        out
    }
}

fn pool_key(members: &[String]) -> Vec<String> {
    let mut key: Vec<String> = members.iter().map(|m| normalize(m)).collect();
    key.sort();
    key
}

/// Handle the count check; `None` means matching may proceed.
fn reject_shape(inputs: &[String], slots: &[AnswerSlot]) -> Option<MatchResult> {
    if inputs.len() == slots.len() {
        return None;
    }
    tracing::debug!(
        expected = slots.len(),
        actual = inputs.len(),
        "input count does not match slot count"
    );
    Some(MatchResult {
        passed: false,
        slots: (0..slots.len())
            .map(|slot| SlotOutcome {
                slot,
                input: inputs.get(slot).cloned(),
                status: SlotStatus::Unmatched,
            })
            .collect(),
        mismatch: Some(ShapeMismatch::InputCount {
            expected: slots.len(),
            actual: inputs.len(),
        }),
    })
}

fn finish(inputs: &[String], arena: &Arena, assigned: &[Option<(usize, Strategy)>]) -> MatchResult {
    let slots: Vec<SlotOutcome> = arena
        .slots
        .iter()
        .enumerate()
        .map(|(slot, candidates)| {
            let status = match (candidates, assigned[slot]) {
                (None, _) => SlotStatus::NotRequired,
                (Some(_), Some((entry, strategy))) => SlotStatus::Matched {
                    alternative: arena.entries[entry].id,
                    value: arena.entries[entry].value.clone(),
                    strategy,
                },
                (Some(_), None) => SlotStatus::Unmatched,
            };
            SlotOutcome {
                slot,
                input: inputs.get(slot).cloned(),
                status,
            }
        })
        .collect();
    MatchResult {
        passed: slots.iter().all(SlotOutcome::is_satisfied),
        slots,
        mismatch: None,
    }
}

/// First-match greedy assignment, slot by slot in index order.
///
/// Fast and predictable, but an early slot can take a pooled value a later
/// slot needed; see [`OptimalMatcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyMatcher;

impl SlotMatcher for GreedyMatcher {
    fn name(&self) -> &str {
        "greedy"
    }

    fn assign(
        &self,
        inputs: &[String],
        slots: &[AnswerSlot],
        ctx: &MatchContext<'_>,
    ) -> MatchResult {
        if let Some(rejected) = reject_shape(inputs, slots) {
            return rejected;
        }
        let arena = Arena::build(slots, ctx.sentinel);
        let mut consumed = vec![false; arena.entries.len()];
        let mut assigned = vec![None; slots.len()];

        for (slot, candidates) in arena.slots.iter().enumerate() {
            let Some(candidates) = candidates else { continue };
            let input = &inputs[slot];
            for entry in arena.reachable(candidates) {
                if consumed[entry] {
                    continue;
                }
                if let Some(strategy) = ctx.checker.compare(input, &arena.entries[entry].value) {
                    consumed[entry] = true;
                    assigned[slot] = Some((entry, strategy));
                    break;
                }
            }
            tracing::trace!(slot, matched = assigned[slot].is_some(), "greedy slot");
        }
        finish(inputs, &arena, &assigned)
    }
}

/// Maximum bipartite matching between slots and alternatives.
///
/// Finds an assignment whenever one exists, where the greedy matcher may
/// miss it. Among maximum matchings, earlier slots keep their earlier
/// declared alternatives where possible.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimalMatcher;

impl SlotMatcher for OptimalMatcher {
    fn name(&self) -> &str {
        "optimal"
    }

    fn assign(
        &self,
        inputs: &[String],
        slots: &[AnswerSlot],
        ctx: &MatchContext<'_>,
    ) -> MatchResult {
        if let Some(rejected) = reject_shape(inputs, slots) {
            return rejected;
        }
        let arena = Arena::build(slots, ctx.sentinel);

        // every equivalence check is done once, up front
        let edges: Vec<Vec<(usize, Strategy)>> = arena
            .slots
            .iter()
            .enumerate()
            .map(|(slot, candidates)| match candidates {
                None => Vec::new(),
                Some(candidates) => arena
                    .reachable(candidates)
                    .into_iter()
                    .filter_map(|entry| {
                        ctx.checker
                            .compare(&inputs[slot], &arena.entries[entry].value)
                            .map(|strategy| (entry, strategy))
                    })
                    .collect(),
            })
            .collect();

        let mut owner: Vec<Option<usize>> = vec![None; arena.entries.len()];
        for slot in 0..edges.len() {
            let mut visited = vec![false; arena.entries.len()];
            augment(slot, &edges, &mut owner, &mut visited);
        }

        let mut assigned = vec![None; slots.len()];
        for (entry, slot) in owner.iter().enumerate() {
            if let Some(slot) = *slot {
                let strategy = edges[slot]
                    .iter()
                    .find(|(e, _)| *e == entry)
                    .map(|(_, s)| *s);
                assigned[slot] = strategy.map(|s| (entry, s));
            }
        }
        finish(inputs, &arena, &assigned)
    }
}

/// Kuhn's augmenting path step: try to give `slot` an entry, displacing
/// earlier owners along an alternating path.
fn augment(
    slot: usize,
    edges: &[Vec<(usize, Strategy)>],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for &(entry, _) in &edges[slot] {
        if visited[entry] {
            continue;
        }
        visited[entry] = true;
        let free = match owner[entry] {
            None => true,
            Some(other) => augment(other, edges, owner, visited),
        };
        if free {
            owner[entry] = Some(slot);
            return true;
        }
    }
    false
}
