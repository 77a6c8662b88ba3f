use std::collections::HashMap;
use std::fs::File;

use memmap2::MmapMut;
use tracing::debug;

use crate::error::{IrisError, Result};

/// What a shared buffer is used for; decides the size it must satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    Params,
    Stats,
}

/// A shared buffer handed over by the pipeline for mapping.
#[derive(Debug)]
pub struct IpaBuffer {
    pub id: u32,
    pub kind: BufferKind,
    pub file: File,
}

/// Read/write mappings of the pipeline's shared statistics and parameter
/// buffers, keyed by buffer id.
///
/// Mappings are only dereferenced for the duration of a single event; no
/// slice into them is retained across events.
#[derive(Default)]
pub struct MappedBuffers {
    maps: HashMap<u32, MmapMut>,
}

impl MappedBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map one buffer read/write and check it is large enough for its
    /// role. A buffer that cannot be mapped poisons only itself.
    pub fn map(&mut self, buffer: &IpaBuffer, min_len: usize) -> Result<()> {
        let map = unsafe { MmapMut::map_mut(&buffer.file) }.map_err(|e| {
            IrisError::BufferMappingFailed {
                id: buffer.id,
                reason: e.to_string(),
            }
        })?;
        if map.len() < min_len {
            return Err(IrisError::BufferMappingFailed {
                id: buffer.id,
                reason: format!("{} bytes mapped, {} required", map.len(), min_len),
            });
        }
        debug!(id = buffer.id, kind = ?buffer.kind, len = map.len(), "mapped shared buffer");
        self.maps.insert(buffer.id, map);
        Ok(())
    }

    pub fn unmap(&mut self, ids: &[u32]) {
        for id in ids {
            self.maps.remove(id);
        }
    }

    pub fn get(&self, id: u32) -> Option<&[u8]> {
        self.maps.get(&id).map(|m| &m[..])
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut [u8]> {
        self.maps.get_mut(&id).map(|m| &mut m[..])
    }
}
