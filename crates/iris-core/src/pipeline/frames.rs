use std::collections::{HashMap, VecDeque};

use tracing::{error, warn};

use crate::context::FrameContext;
use crate::error::{IrisError, Result};

/// Book-keeping for one in-flight frame.
///
/// A frame completes once its parameters were filled and consumed and its
/// metadata was delivered; only then do its buffers return to the pools.
#[derive(Debug)]
pub struct FrameInfo {
    pub id: u64,
    pub param_buffer: u32,
    pub stat_buffer: u32,
    /// Per-frame inputs resolved from the request's controls.
    pub context: FrameContext,
    pub param_filled: bool,
    pub param_dequeued: bool,
    pub metadata_done: bool,
    pub cancelled: bool,
}

impl FrameInfo {
    fn is_complete(&self) -> bool {
        self.param_filled && self.param_dequeued && self.metadata_done
    }
}

/// The table of in-flight frames and the free lists of parameter and
/// statistics buffers they draw from.
#[derive(Default)]
pub struct FrameTable {
    available_param_buffers: VecDeque<u32>,
    available_stat_buffers: VecDeque<u32>,
    frames: HashMap<u64, FrameInfo>,
}

impl FrameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_param_buffer(&mut self, id: u32) {
        self.available_param_buffers.push_back(id);
    }

    pub fn add_stat_buffer(&mut self, id: u32) {
        self.available_stat_buffers.push_back(id);
    }

    pub fn remove_buffer(&mut self, id: u32) {
        self.available_param_buffers.retain(|&b| b != id);
        self.available_stat_buffers.retain(|&b| b != id);
    }

    /// Number of frames currently in flight.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Admit a frame, drawing one parameter and one statistics buffer.
    pub fn create(&mut self, id: u64, context: FrameContext) -> Result<&mut FrameInfo> {
        if self.frames.contains_key(&id) {
            warn!(frame = id, "frame admitted twice, keeping first entry");
            return Ok(self.frames.get_mut(&id).unwrap());
        }
        if self.available_param_buffers.is_empty() {
            error!(frame = id, "parameter buffer underrun");
            return Err(IrisError::ParamBufferUnderrun);
        }
        if self.available_stat_buffers.is_empty() {
            error!(frame = id, "statistics buffer underrun");
            return Err(IrisError::StatBufferUnderrun);
        }

        let param_buffer = self.available_param_buffers.pop_front().unwrap();
        let stat_buffer = self.available_stat_buffers.pop_front().unwrap();

        let info = FrameInfo {
            id,
            param_buffer,
            stat_buffer,
            context,
            param_filled: false,
            param_dequeued: false,
            metadata_done: false,
            cancelled: false,
        };
        Ok(self.frames.entry(id).or_insert(info))
    }

    pub fn find(&mut self, id: u64) -> Option<&mut FrameInfo> {
        self.frames.get_mut(&id)
    }

    /// Destroy the frame and recycle its buffers once every completion
    /// flag is set. Returns whether the frame completed.
    pub fn try_complete(&mut self, id: u64) -> bool {
        let Some(info) = self.frames.get(&id) else {
            return false;
        };
        if !info.is_complete() {
            return false;
        }

        let info = self.frames.remove(&id).unwrap();
        self.available_param_buffers.push_back(info.param_buffer);
        self.available_stat_buffers.push_back(info.stat_buffer);
        true
    }

    /// Cancel and destroy every in-flight frame.
    pub fn drain(&mut self) {
        for (id, info) in self.frames.drain() {
            warn!(frame = id, "cancelling in-flight frame");
            self.available_param_buffers.push_back(info.param_buffer);
            self.available_stat_buffers.push_back(info.stat_buffer);
        }
    }
}
