use std::io;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;

/// A synchronous `Write` target that collects bytes until they are taken out as a chunk.
///
/// This bridges writers that only speak `std::io::Write` (like the zip writer) to an async
///  sink: the writer gets one clone, the async side keeps another and periodically takes
///  whatever has been written so far. The lock is never held across an await point.
#[derive(Clone, Default)]
pub struct ChunkBuffer {
    data: Arc<Mutex<Vec<u8>>>,
}
impl ChunkBuffer {
    /// Removes and returns everything written since the last call.
    pub fn take(&self) -> Bytes {
        let mut data = self.data.lock()
            .unwrap_or_else(PoisonError::into_inner);
        Bytes::from(std::mem::take(&mut *data))
    }
}

impl Write for ChunkBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
