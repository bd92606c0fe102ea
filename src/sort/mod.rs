//! Topological sort of a plan's operations into dependency-respecting
//! batches: Kahn's algorithm, with operations inside the same batch
//! ordered by [`OperationId`] so batch contents are deterministic across
//! runs (and therefore safe to execute in parallel within a batch).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{DotError, Result};
use crate::plan::{OperationId, PlannedOperation};

/// Order `operations` into batches: every id in batch `N` depends only on
/// ids in batches `0..N`, so a batch's operations can run concurrently.
pub fn sort(operations: &[PlannedOperation]) -> Result<Vec<Vec<OperationId>>> {
    let mut indegree: HashMap<OperationId, usize> = HashMap::new();
    let mut dependents: HashMap<OperationId, Vec<OperationId>> = HashMap::new();

    for op in operations {
        indegree.entry(op.id).or_insert(0);
        for dep in &op.depends_on {
            *indegree.entry(op.id).or_insert(0) += 1;
            dependents.entry(*dep).or_default().push(op.id);
        }
    }

    let mut ready: BinaryHeap<Reverse<OperationId>> = indegree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| Reverse(id))
        .collect();

    let mut batches = Vec::new();
    let mut processed = 0usize;

    while !ready.is_empty() {
        let mut batch = Vec::new();
        let mut next_candidates = Vec::new();
        while let Some(Reverse(id)) = ready.pop() {
            batch.push(id);
            processed += 1;
            if let Some(children) = dependents.get(&id) {
                next_candidates.extend(children.iter().copied());
            }
        }
        for child in next_candidates {
            let deg = indegree.get_mut(&child).expect("dependent id must be tracked");
            *deg -= 1;
            if *deg == 0 {
                ready.push(Reverse(child));
            }
        }
        batches.push(batch);
    }

    if processed != operations.len() {
        let stuck: Vec<OperationId> = indegree
            .into_iter()
            .filter(|(_, deg)| *deg > 0)
            .map(|(id, _)| id)
            .collect();
        return Err(DotError::CyclicDependency(stuck));
    }

    Ok(batches)
}
