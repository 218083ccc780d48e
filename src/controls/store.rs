use super::{Control, ControlBounds, ControlSnapshot};
use log::debug;

type Listener = Box<dyn FnMut(&ControlSnapshot)>;

/// Live control values. Out-of-range input is clamped, never rejected.
pub struct ParameterStore {
    bounds: ControlBounds,
    values: ControlSnapshot,
    listeners: Vec<Listener>,
    revision: u64,
}

impl ParameterStore {
    pub fn new(bounds: ControlBounds) -> Self {
        let values = bounds.defaults();
        Self {
            bounds,
            values,
            listeners: Vec::new(),
            revision: 0,
        }
    }

    pub fn bounds(&self) -> &ControlBounds {
        &self.bounds
    }

    pub fn get(&self, control: Control) -> f64 {
        self.values.get(control)
    }

    /// Copy of the current values.
    pub fn snapshot(&self) -> ControlSnapshot {
        self.values
    }

    /// Incremented on every effective change; lets callers detect stale results.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Stores the clamped value. Returns false when nothing changed.
    pub fn set(&mut self, control: Control, value: f64) -> bool {
        let clamped = self.bounds.spec(control).clamp(value);
        if clamped != value {
            debug!("Clamped {} from {} to {}", control, value, clamped);
        }

        if self.values.get(control) == clamped {
            return false;
        }

        self.values.set(control, clamped);
        debug!("{} = {}", control, clamped);
        self.commit();
        true
    }

    /// Applies a full snapshot. Listeners observe only the final state.
    pub fn set_all(&mut self, snapshot: &ControlSnapshot) -> bool {
        let next = snapshot.clamped(&self.bounds);
        if next == self.values {
            return false;
        }

        self.values = next;
        debug!("Applied control snapshot {:?}", next);
        self.commit();
        true
    }

    /// Registers a callback invoked with the full snapshot after every change.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&ControlSnapshot) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn commit(&mut self) {
        self.revision += 1;
        let values = self.values;
        for listener in self.listeners.iter_mut() {
            listener(&values);
        }
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(ControlBounds::default())
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("values", &self.values)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
