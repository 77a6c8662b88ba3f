//! Latency-aware sensor control scheduling.
//!
//! Sensor controls take effect a fixed number of frames after they are
//! written; the delay differs per control. This helper queues values the
//! pipeline pushes, writes each one to the device early enough to land on
//! the intended frame, and can report which values were in effect for any
//! recent sensor sequence number.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::consts::CONTROL_RING_SIZE;
use crate::controls::{ControlList, SensorControlId};
use crate::error::Result;
use crate::sensor::SensorDevice;

#[derive(Clone, Copy, Debug, Default)]
struct Entry {
    value: i32,
    updated: bool,
}

/// Fixed-depth value history; indices wrap modulo the ring size.
#[derive(Clone, Debug, Default)]
struct Ring {
    entries: [Entry; CONTROL_RING_SIZE],
}

impl Ring {
    fn at(&self, index: u32) -> Entry {
        self.entries[index as usize % CONTROL_RING_SIZE]
    }

    fn at_mut(&mut self, index: u32) -> &mut Entry {
        &mut self.entries[index as usize % CONTROL_RING_SIZE]
    }
}

struct State {
    running: bool,
    first_sequence: u32,
    last_sequence: u32,
    queue_count: u32,
    write_count: u32,
    values: HashMap<SensorControlId, Ring>,
}

/// Scheduler aligning sensor control writes with their application delay.
pub struct DelayedControls {
    device: Arc<dyn SensorDevice>,
    delays: Vec<(SensorControlId, u32)>,
    max_delay: u32,
    state: Mutex<State>,
}

impl DelayedControls {
    /// `delays` maps each handled control to the number of frames the
    /// sensor needs before a written value takes effect. Controls not
    /// listed are never written.
    pub fn new(device: Arc<dyn SensorDevice>, delays: &[(SensorControlId, u32)]) -> Self {
        let max_delay = delays.iter().map(|&(_, d)| d).max().unwrap_or(0);
        for &(id, delay) in delays {
            debug!(control = %id, delay, "delayed control registered");
        }
        Self {
            device,
            delays: delays.to_vec(),
            max_delay,
            state: Mutex::new(State {
                running: false,
                first_sequence: 0,
                last_sequence: 0,
                queue_count: 1,
                write_count: 0,
                values: HashMap::new(),
            }),
        }
    }

    /// Reset the history from the device's current values, optionally
    /// programming `initial` first.
    ///
    /// The seeded entries are not marked updated: the device already holds
    /// them, so the first frame start has nothing to write.
    pub fn reset(&self, initial: Option<&ControlList>) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        state.running = false;
        state.first_sequence = 0;
        state.last_sequence = 0;
        state.queue_count = 1;
        state.write_count = 0;

        if let Some(controls) = initial {
            self.device.set_controls(controls)?;
        }

        let ids: Vec<SensorControlId> = self.delays.iter().map(|&(id, _)| id).collect();
        let current = self.device.get_controls(&ids)?;

        state.values.clear();
        for (id, value) in current.iter() {
            let mut ring = Ring::default();
            *ring.at_mut(0) = Entry {
                value,
                updated: false,
            };
            state.values.insert(id, ring);
        }

        Ok(())
    }

    /// Queue a set of controls for the next frame. Returns false, leaving
    /// the queue untouched, when any control is not handled.
    pub fn push(&self, controls: &ControlList) -> bool {
        let mut state = self.state.lock().unwrap();

        for (id, _) in controls.iter() {
            if !self.delays.iter().any(|&(known, _)| known == id) {
                warn!(control = %id, "push of unhandled control rejected");
                return false;
            }
        }

        self.queue(&mut state, controls);
        true
    }

    fn queue(&self, state: &mut State, controls: &ControlList) {
        let index = state.queue_count;

        // Carry the previous frame's values forward.
        for ring in state.values.values_mut() {
            let previous = ring.at(index - 1);
            *ring.at_mut(index) = Entry {
                value: previous.value,
                updated: false,
            };
        }

        for (id, value) in controls.iter() {
            if let Some(ring) = state.values.get_mut(&id) {
                *ring.at_mut(index) = Entry {
                    value,
                    updated: true,
                };
                debug!(control = %id, value, index, "queued control");
            }
        }

        state.queue_count += 1;
    }

    /// The control values in effect at sensor sequence `sequence`.
    ///
    /// Only the most recent `CONTROL_RING_SIZE` minus queued entries are
    /// retrievable; the caller must not ask about sequences that old.
    pub fn get(&self, sequence: u32) -> ControlList {
        let state = self.state.lock().unwrap();

        let adjusted = sequence as i64 - state.first_sequence as i64 + 2 - self.max_delay as i64;
        let index = adjusted.max(0) as u32;

        let mut out = ControlList::new();
        for &(id, _) in &self.delays {
            if let Some(ring) = state.values.get(&id) {
                out.set(id, ring.at(index).value);
            }
        }
        out
    }

    /// Note the start of sensor frame `sequence` and write whichever
    /// queued values must reach the device now to land on time.
    pub fn frame_start(&self, sequence: u32) {
        let mut state = self.state.lock().unwrap();

        if !state.running {
            state.first_sequence = sequence;
            state.running = true;
        } else {
            assert!(
                sequence >= state.last_sequence,
                "frame start sequence went backwards: {} after {}",
                sequence,
                state.last_sequence
            );
        }
        state.last_sequence = sequence;

        let mut out = ControlList::new();
        for &(id, delay) in &self.delays {
            let delay_diff = self.max_delay - delay;
            let index = (state.write_count as i64 - delay_diff as i64).max(0) as u32;
            if let Some(ring) = state.values.get(&id) {
                let entry = ring.at(index);
                if entry.updated {
                    out.set(id, entry.value);
                    debug!(control = %id, value = entry.value, index, sequence, "writing control");
                }
            }
        }

        if !out.is_empty() {
            if let Err(error) = self.device.set_controls(&out) {
                warn!(%error, sequence, "failed to write sensor controls");
            }
        }

        state.write_count += 1;

        while state.write_count >= state.queue_count {
            self.queue(&mut state, &ControlList::new());
        }
    }
}
