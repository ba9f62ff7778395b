use std::io::{self, Read, Seek, SeekFrom};

/// A `Read + Seek` wrapper that bounds an underlying stream to the next `n`
/// bytes, while still allowing seeks within that bounded range.
///
/// `std::io::Take` alone only bounds `read`, not `seek`, which makes it
/// useless for the chunked binary formats in this workspace where a reader
/// routinely needs to seek backwards within a sub-block (e.g. SimData's
/// two-pass schema resolution). This wrapper tracks the start/limit itself
/// and translates seeks back onto the inner stream.
pub struct SeekableTake<T> {
    inner: T,
    start: u64,
    limit: u64,
}

impl<T: Seek> SeekableTake<T> {
    pub fn new(mut inner: T, limit: u64) -> io::Result<Self> {
        let start = inner.stream_position()?;
        Ok(Self {
            inner,
            start,
            limit,
        })
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Seek> Read for SeekableTake<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.inner.stream_position()?;
        let remaining = self.start + self.limit - pos;
        if remaining == 0 {
            return Ok(0);
        }
        let max = remaining.min(buf.len() as u64) as usize;
        self.inner.read(&mut buf[..max])
    }
}

impl<T: Read + Seek> Seek for SeekableTake<T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => self.start + n,
            SeekFrom::End(n) => (self.start as i64 + self.limit as i64 + n) as u64,
            SeekFrom::Current(n) => {
                let cur = self.inner.stream_position()?;
                (cur as i64 + n) as u64
            }
        };
        self.inner.seek(SeekFrom::Start(target))?;
        Ok(target - self.start)
    }
}

/// Extension trait for bounding a seekable reader to its next `n` bytes.
pub trait SeekableTakeExt: Read + Seek + Sized {
    fn seekable_take(self, n: u64) -> io::Result<SeekableTake<Self>>;
}

impl<T: Read + Seek> SeekableTakeExt for T {
    fn seekable_take(self, n: u64) -> io::Result<SeekableTake<Self>> {
        SeekableTake::new(self, n)
    }
}
