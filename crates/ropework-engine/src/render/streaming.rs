//! Ring-allocated GPU buffers for per-frame geometry.
//!
//! Writes append behind a cursor with `NoOverwrite`; the first write after a
//! reset (creation, growth or wrap-around) uses `Discard`. The GPU never waits
//! on earlier draws and earlier draws never see later data.

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::render::backend::{BufferId, BufferKind, GpuBackend, WriteHint};
use crate::render::command::BufferRange;
use crate::render::error::RenderError;

/// Result of reserving `count` elements from a [`RingCursor`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub offset: u32,
    pub hint: WriteHint,
    /// The cursor ran past the end and restarted at 0.
    pub wrapped: bool,
}

/// Cursor bookkeeping of a streaming buffer, in elements.
#[derive(Debug, Clone)]
pub struct RingCursor {
    capacity: u32,
    cursor: u32,
    generation: u64,
    alignment: u32,
}

impl RingCursor {
    pub fn new() -> Self {
        Self::with_alignment(1)
    }

    /// Every allocation starts on a multiple of `alignment` elements.
    pub fn with_alignment(alignment: u32) -> Self {
        Self {
            capacity: 0,
            cursor: 0,
            generation: 0,
            alignment: alignment.max(1),
        }
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Bumped on every reset; ranges from older generations are dead.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Grows to the next power of two ≥ `count` if needed. Returns `true`
    /// when the backing storage has to be reallocated.
    pub fn ensure_capacity(&mut self, count: u32) -> bool {
        self.ensure_capacity_within(count, u32::MAX)
    }

    /// Like [`ensure_capacity`](Self::ensure_capacity), but never grows past
    /// `max` elements. Requires `count <= max`.
    pub fn ensure_capacity_within(&mut self, count: u32, max: u32) -> bool {
        debug_assert!(count <= max, "ring request {count} above limit {max}");
        if count <= self.capacity {
            return false;
        }

        let limit = max - max % self.alignment;
        let grown = count
            .checked_next_power_of_two()
            .unwrap_or(u32::MAX)
            .max(self.alignment)
            .min(limit.max(count));
        self.capacity = grown;
        self.cursor = 0;
        self.generation += 1;
        true
    }

    /// Reserves `count` contiguous elements. Requires `count <= capacity`.
    pub fn allocate(&mut self, count: u32) -> Allocation {
        debug_assert!(count <= self.capacity, "allocate({count}) above capacity {}", self.capacity);

        let mut wrapped = false;
        if self.cursor as u64 + count as u64 > self.capacity as u64 {
            self.cursor = 0;
            self.generation += 1;
            wrapped = true;
        }

        let hint = if self.cursor == 0 {
            WriteHint::Discard
        } else {
            WriteHint::NoOverwrite
        };
        let offset = self.cursor;
        if count > 0 {
            let end = offset + count;
            self.cursor = end.div_ceil(self.alignment).saturating_mul(self.alignment).min(self.capacity);
        }

        Allocation { offset, hint, wrapped }
    }
}

impl Default for RingCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed streaming buffer backed by one device buffer.
#[derive(Debug)]
pub struct StreamingBuffer<T: Pod> {
    kind: BufferKind,
    buffer: Option<BufferId>,
    cursor: RingCursor,
    _marker: PhantomData<T>,
}

impl<T: Pod> StreamingBuffer<T> {
    const STRIDE: u64 = std::mem::size_of::<T>() as u64;

    pub fn new(kind: BufferKind) -> Self {
        // Device writes go in 4-byte units; keep element offsets on that grid.
        let alignment = (4 / gcd(Self::STRIDE, 4)) as u32;
        Self {
            kind,
            buffer: None,
            cursor: RingCursor::with_alignment(alignment),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.cursor.capacity()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.cursor.generation()
    }

    /// Makes room for `count` elements and returns the backing buffer.
    pub fn ensure_capacity<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        count: u32,
    ) -> Result<BufferId, RenderError> {
        let max_bytes = backend.max_buffer_bytes();
        let requested = count as u64 * Self::STRIDE;
        if requested > max_bytes {
            return Err(RenderError::BufferTooLarge { requested, max: max_bytes });
        }

        let max_elems = (max_bytes / Self::STRIDE).min(u32::MAX as u64) as u32;
        let grown = self.cursor.ensure_capacity_within(count, max_elems);
        if let (false, Some(id)) = (grown, self.buffer) {
            return Ok(id);
        }

        if let Some(old) = self.buffer.take() {
            backend.destroy_buffer(old);
        }
        let size_bytes = (self.cursor.capacity() as u64 * Self::STRIDE).max(4);
        log::debug!(
            "streaming {:?} buffer: {} elements ({} bytes)",
            self.kind,
            self.cursor.capacity(),
            size_bytes
        );
        let id = backend.create_buffer(self.kind, size_bytes);
        self.buffer = Some(id);
        Ok(id)
    }

    /// Writes `data` behind the cursor and returns where it landed.
    pub fn upload<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        data: &[T],
    ) -> Result<BufferRange, RenderError> {
        if data.is_empty() {
            return Ok(BufferRange {
                offset: self.cursor.cursor(),
                count: 0,
                generation: self.cursor.generation(),
            });
        }

        let count = u32::try_from(data.len()).map_err(|_| RenderError::BufferTooLarge {
            requested: data.len() as u64 * Self::STRIDE,
            max: backend.max_buffer_bytes(),
        })?;
        let buffer = self.ensure_capacity(backend, count)?;
        let alloc = self.cursor.allocate(count);
        if alloc.wrapped {
            log::trace!("streaming {:?} buffer wrapped", self.kind);
        }
        backend.write_buffer(buffer, alloc.offset as u64 * Self::STRIDE, bytemuck::cast_slice(data), alloc.hint);

        Ok(BufferRange {
            offset: alloc.offset,
            count,
            generation: self.cursor.generation(),
        })
    }

    /// Buffer holding `range`, provided it has not been reset since.
    pub fn resolve(&self, range: &BufferRange) -> Result<BufferId, RenderError> {
        match self.buffer {
            Some(id) if range.generation == self.cursor.generation() => Ok(id),
            _ => Err(RenderError::StaleBufferRange {
                range_generation: range.generation,
                buffer_generation: self.cursor.generation(),
            }),
        }
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}
