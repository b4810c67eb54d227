//! Streaming line reader over monthly raw files, plain or zstd-compressed.
//! Memory use is bounded by the read buffer; files are never loaded whole.

use crate::paths::{RawEncoding, RawInput};
use crate::util::open_with_backoff;
use anyhow::{Context, Result};
use std::io::{self, BufRead, BufReader, Read};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use zstd::stream::read::Decoder;

/// A `Read` wrapper that counts on-disk bytes read.
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Stream `input` line by line. `on_line` receives the 1-based physical line number and the
/// line without its `\r?\n` terminator; blank lines are skipped but still counted.
/// `on_progress(delta)` reports on-disk bytes consumed.
/// Decode and read errors are returned, never skipped.
pub fn for_each_line(
    input: &RawInput,
    read_buf_bytes: usize,
    mut on_progress: impl FnMut(u64),
    mut on_line: impl FnMut(u64, &str) -> Result<()>,
) -> Result<()> {
    let file = open_with_backoff(&input.path, 16, 50)
        .with_context(|| format!("open {}", input.path.display()))?;
    let counter = Arc::new(AtomicU64::new(0));
    let cnt = CountingReader { inner: file, counter: counter.clone() };
    let cap = read_buf_bytes.max(8 * 1024);

    let mut reader: Box<dyn BufRead> = match input.encoding {
        RawEncoding::Plain => Box::new(BufReader::with_capacity(cap, cnt)),
        RawEncoding::Zstd => {
            let mut decoder = Decoder::new(cnt)?;
            // Reddit dumps use long windows; the default limit rejects them.
            decoder.window_log_max(31)?;
            Box::new(BufReader::with_capacity(cap, decoder))
        }
    };

    let mut buf = String::with_capacity(16 * 1024);
    let mut line_no = 0u64;
    let mut last = 0u64;
    loop {
        buf.clear();
        let n = reader
            .read_line(&mut buf)
            .with_context(|| format!("read {} after line {}", input.path.display(), line_no))?;
        let cur = counter.load(Ordering::Relaxed);
        if cur > last {
            on_progress(cur - last);
            last = cur;
        }
        if n == 0 {
            break;
        }
        line_no += 1;
        if buf.ends_with('\n') {
            let _ = buf.pop();
            if buf.ends_with('\r') { let _ = buf.pop(); }
        }
        if buf.trim().is_empty() {
            continue;
        }
        on_line(line_no, &buf)?;
    }
    Ok(())
}
