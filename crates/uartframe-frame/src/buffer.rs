use bytes::{BufMut, BytesMut};

use crate::codec::{BufferAllocation, MAX_WIRE_PAYLOAD};
use crate::error::DecodeError;

/// Capacity-bounded storage for the payload of the frame being decoded.
///
/// Owned by the decoder. A completed payload is only ever lent out as a
/// borrow of this buffer, so nothing can hold on to it across the next
/// decode step.
#[derive(Debug)]
pub struct PayloadBuffer {
    buf: BytesMut,
    capacity: usize,
    allocation: BufferAllocation,
}

impl PayloadBuffer {
    /// Create a buffer that accepts payloads of up to `capacity` bytes.
    pub fn new(capacity: usize, allocation: BufferAllocation) -> Self {
        let buf = match allocation {
            BufferAllocation::Fixed => BytesMut::with_capacity(capacity.min(MAX_WIRE_PAYLOAD)),
            BufferAllocation::Dynamic => BytesMut::new(),
        };
        Self {
            buf,
            capacity,
            allocation,
        }
    }

    /// Prepare for a payload of `len` bytes, discarding previous content.
    pub fn begin(&mut self, len: usize) -> Result<(), DecodeError> {
        if len > self.capacity {
            self.release();
            return Err(DecodeError::Memory {
                declared: len,
                capacity: self.capacity,
            });
        }
        match self.allocation {
            BufferAllocation::Fixed => self.buf.clear(),
            BufferAllocation::Dynamic => self.buf = BytesMut::with_capacity(len),
        }
        Ok(())
    }

    /// Append one payload byte.
    ///
    /// Bytes past the capacity are dropped; the decoder never asks for more
    /// than the length accepted by [`begin`](Self::begin).
    pub fn push(&mut self, byte: u8) {
        if self.buf.len() < self.capacity {
            self.buf.put_u8(byte);
        }
    }

    /// Payload bytes written since the last `begin`.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Largest payload this buffer accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn allocation(&self) -> BufferAllocation {
        self.allocation
    }

    /// Drop the current content. Dynamic buffers also give back their memory.
    pub fn release(&mut self) {
        match self.allocation {
            BufferAllocation::Fixed => self.buf.clear(),
            BufferAllocation::Dynamic => self.buf = BytesMut::new(),
        }
    }

    /// Bytes currently reserved by the backing storage.
    pub fn allocated(&self) -> usize {
        self.buf.capacity()
    }
}
