use sc3_ids::ThreadID;

use crate::thread::ScriptThread;

enum Slot {
    Vacant,
    Occupied(ScriptThread),
    /// Live, but currently lent out to the scheduler.
    CheckedOut,
}

impl Slot {
    #[inline]
    fn is_live(&self) -> bool {
        !matches!(self, Slot::Vacant)
    }
}

/// Generational storage for script threads. Index 0 is the nil sentinel.
pub struct ThreadArena {
    slots: Vec<Slot>,
    generations: Vec<u32>,
    free_indices: Vec<usize>,
    live: usize,
}

impl Default for ThreadArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadArena {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity.saturating_add(1));
        let mut generations = Vec::with_capacity(capacity.saturating_add(1));
        slots.push(Slot::Vacant);
        generations.push(0);
        Self {
            slots,
            generations,
            free_indices: Vec::new(),
            live: 0,
        }
    }

    pub fn insert(&mut self, thread: ScriptThread) -> ThreadID {
        self.live += 1;
        if let Some(index) = self.free_indices.pop() {
            self.slots[index] = Slot::Occupied(thread);
            return ThreadID::from_parts(index as u32, self.generations[index]);
        }

        let index = self.slots.len();
        self.slots.push(Slot::Occupied(thread));
        self.generations.push(0);
        ThreadID::from_parts(index as u32, 0)
    }

    fn slot_index(&self, id: ThreadID) -> Option<usize> {
        let index = id.index() as usize;
        if id.is_nil()
            || index == 0
            || index >= self.slots.len()
            || self.generations[index] != id.generation()
        {
            return None;
        }
        Some(index)
    }

    pub fn get(&self, id: ThreadID) -> Option<&ScriptThread> {
        match &self.slots[self.slot_index(id)?] {
            Slot::Occupied(thread) => Some(thread),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: ThreadID) -> Option<&mut ScriptThread> {
        let index = self.slot_index(id)?;
        match &mut self.slots[index] {
            Slot::Occupied(thread) => Some(thread),
            _ => None,
        }
    }

    /// Takes the thread out while it runs. The slot stays live.
    pub fn checkout(&mut self, id: ThreadID) -> Option<ScriptThread> {
        let index = self.slot_index(id)?;
        match std::mem::replace(&mut self.slots[index], Slot::CheckedOut) {
            Slot::Occupied(thread) => Some(thread),
            other => {
                self.slots[index] = other;
                None
            }
        }
    }

    pub fn checkin(&mut self, id: ThreadID, thread: ScriptThread) {
        if let Some(index) = self.slot_index(id) {
            if matches!(self.slots[index], Slot::CheckedOut) {
                self.slots[index] = Slot::Occupied(thread);
            }
        }
    }

    /// Removes a thread, bumping the slot generation so old IDs go stale.
    pub fn remove(&mut self, id: ThreadID) -> Option<ScriptThread> {
        let index = self.slot_index(id)?;
        if !self.slots[index].is_live() {
            return None;
        }
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free_indices.push(index);
        self.live -= 1;
        match std::mem::replace(&mut self.slots[index], Slot::Vacant) {
            Slot::Occupied(thread) => Some(thread),
            _ => None,
        }
    }

    pub fn contains(&self, id: ThreadID) -> bool {
        self.slot_index(id)
            .is_some_and(|index| self.slots[index].is_live())
    }

    /// Maps a script-visible handle back to a live thread, if it still names one.
    pub fn resolve_script_handle(&self, handle: i32) -> Option<ThreadID> {
        let partial = ThreadID::from_script_handle(handle);
        let index = partial.index() as usize;
        if index == 0 || index >= self.slots.len() || !self.slots[index].is_live() {
            return None;
        }
        let generation = self.generations[index];
        partial
            .matches_script_generation(generation)
            .then(|| ThreadID::from_parts(index as u32, generation))
    }

    /// Number of live threads, including any checked out.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
