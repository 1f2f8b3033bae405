//! The generational reference-count-plus-cycle collector (spec §3
//! component H, §4.H).
//!
//! Three generations (0 = youngest, 2 = oldest) each track their own set
//! of GC-managed [`VariableHandle`]s and an allocation-count threshold
//! for auto-collection. A collection walks, for each tracked root, the
//! object graph reachable through one-hop [`Value::enumerate_variables`]
//! steps, counting how many internal edges land on each reachable
//! variable. A variable whose `Rc` strong count is fully accounted for
//! by those internal edges (plus the one the generation's own tracked
//! set holds) is part of a cycle with nothing pointing in from outside
//! it, and gets reclaimed; everything else survives and is promoted to
//! the next generation.
//!
//! The internal-edge count can undercount a variable reached more than
//! once from already-visited parents (the `seen` set that bounds BFS
//! expansion also, conservatively, bounds how many times a target gets
//! counted) -- that only ever makes the collector keep something alive
//! it could have freed, never the reverse.

use crate::variable::{Variable, VariableHandle, VariableSet};
use std::rc::Rc;
use tracing::trace;

const GENERATION_COUNT: usize = 3;
const DEFAULT_THRESHOLDS: [usize; GENERATION_COUNT] = [1024, 8192, 65536];

#[derive(Debug)]
pub struct GarbageCollector {
    generations: [VariableSet; GENERATION_COUNT],
    thresholds: [usize; GENERATION_COUNT],
    allocated_since_collect: [usize; GENERATION_COUNT],
}

impl Default for GarbageCollector {
    fn default() -> Self {
        GarbageCollector {
            generations: [VariableSet::new(), VariableSet::new(), VariableSet::new()],
            thresholds: DEFAULT_THRESHOLDS,
            allocated_since_collect: [0; GENERATION_COUNT],
        }
    }
}

impl GarbageCollector {
    pub fn new() -> Self {
        GarbageCollector::default()
    }

    /// Allocate a new GC-managed variable tracked in generation
    /// `gen_hint` (clamped to the oldest generation). New variables
    /// start in the youngest generation in virtually all call sites; a
    /// non-zero hint exists for the rare case of an allocation the
    /// caller already knows will outlive a young collection (e.g. a
    /// value installed directly into the global context).
    pub fn create_variable(&mut self, gen_hint: usize) -> VariableHandle {
        let gen = gen_hint.min(GENERATION_COUNT - 1);
        let handle = Variable::new(true).handle();
        self.generations[gen].insert(handle.clone());
        self.allocated_since_collect[gen] += 1;
        handle
    }

    pub fn threshold(&self, gen: usize) -> usize {
        self.thresholds[gen.min(GENERATION_COUNT - 1)]
    }

    pub fn set_threshold(&mut self, gen: usize, value: usize) {
        self.thresholds[gen.min(GENERATION_COUNT - 1)] = value;
    }

    /// Whether generation `gen` has accumulated enough allocations since
    /// its last sweep to warrant an automatic collection.
    pub fn should_auto_collect(&self, gen: usize) -> bool {
        let gen = gen.min(GENERATION_COUNT - 1);
        self.allocated_since_collect[gen] >= self.thresholds[gen]
    }

    /// Collect generations `0..=gen_limit` (spec §4.H `collect(gen_limit)`),
    /// oldest-affected-generation semantics: collecting a younger
    /// generation does not touch older ones. Returns the number of
    /// variables reclaimed.
    pub fn collect(&mut self, gen_limit: usize) -> usize {
        let mut reclaimed = 0;
        for gen in 0..=gen_limit.min(GENERATION_COUNT - 1) {
            reclaimed += self.collect_generation(gen);
        }
        reclaimed
    }

    fn collect_generation(&mut self, gen: usize) -> usize {
        // Drop the generation's own tracked set *before* counting strong
        // references: moving (not cloning) each handle out of `taken`
        // into `tracked` leaves exactly one collection-held clone per
        // handle, so `internal + 1` correctly accounts for that single
        // hold and a variable with zero internal edges and no outside
        // holder has `use_count == 1`, matching `0 + 1 >= 1`.
        let mut taken = std::mem::take(&mut self.generations[gen]);
        let mut tracked: Vec<VariableHandle> = Vec::with_capacity(taken.len());
        while let Some(v) = taken.extract_one() {
            tracked.push(v);
        }
        for v in &tracked {
            v.borrow().set_gc_ref(0);
        }

        let mut seen = VariableSet::new();
        let mut queue: Vec<VariableHandle> = Vec::new();
        for v in &tracked {
            discover(v, &mut seen, &mut queue);
        }
        while let Some(v) = queue.pop() {
            discover(&v, &mut seen, &mut queue);
        }

        let mut reclaimed = 0;
        let mut survivors = VariableSet::new();
        for v in tracked {
            let use_count = Rc::strong_count(&v);
            let internal = v.borrow().gc_ref() as usize;
            if internal + 1 >= use_count {
                v.borrow_mut().uninitialize();
                reclaimed += 1;
            } else {
                survivors.insert(v);
            }
        }

        if gen + 1 < GENERATION_COUNT {
            for v in survivors.iter() {
                self.generations[gen + 1].insert(v.clone());
            }
        } else {
            self.generations[gen] = survivors;
        }
        self.allocated_since_collect[gen] = 0;
        trace!("gc sweep: generation {gen} reclaimed {reclaimed}");
        reclaimed
    }

    /// Break every remaining cycle by uninitialising all tracked
    /// variables across all generations, without regard to reachability.
    /// Called once, when the owning [`crate::global_context::GlobalContext`]
    /// is torn down (spec §4.H "destruction runs `finalize()`").
    pub fn finalize(&mut self) {
        for gen in &mut self.generations {
            for v in gen.iter() {
                v.borrow_mut().uninitialize();
            }
            gen.clear();
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.generations.iter().map(VariableSet::len).sum()
    }
}

/// One hop of discovery from `v`'s value, staging newly-seen targets for
/// further expansion and crediting each with one internal edge.
fn discover(v: &VariableHandle, seen: &mut VariableSet, queue: &mut Vec<VariableHandle>) {
    let mut staged = VariableSet::new();
    v.borrow().value().enumerate_variables(&mut staged, seen);
    for d in staged.iter() {
        d.borrow().set_gc_ref(d.borrow().gc_ref() + 1);
        queue.push(d.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn unreferenced_variable_is_reclaimed() {
        let mut gc = GarbageCollector::new();
        let handle = gc.create_variable(0);
        handle.borrow_mut().initialize(Value::Integer(1));
        let reclaimed = gc.collect(2);
        assert_eq!(reclaimed, 1);
        assert!(!handle.borrow().initialized());
    }

    #[test]
    fn externally_held_variable_survives() {
        let mut gc = GarbageCollector::new();
        let handle = gc.create_variable(0);
        handle.borrow_mut().initialize(Value::Integer(1));
        let _kept = handle.clone();
        let reclaimed = gc.collect(2);
        assert_eq!(reclaimed, 0);
        assert!(handle.borrow().initialized());
    }

    #[test]
    fn survivor_promotes_to_next_generation() {
        let mut gc = GarbageCollector::new();
        let handle = gc.create_variable(0);
        handle.borrow_mut().initialize(Value::Integer(1));
        let _kept = handle.clone();
        gc.collect(0);
        assert_eq!(gc.generations[0].len(), 0);
        assert_eq!(gc.generations[1].len(), 1);
    }

    #[test]
    fn auto_collect_threshold() {
        let mut gc = GarbageCollector::new();
        gc.set_threshold(0, 2);
        assert!(!gc.should_auto_collect(0));
        gc.create_variable(0);
        gc.create_variable(0);
        assert!(gc.should_auto_collect(0));
    }
}
