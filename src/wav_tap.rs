//! Write-only 16-bit mono PCM debug sink ("WAV tap").
//!
//! Missing taps are silently skipped at the write call (spec §4.7/§7); a
//! tap that fails to open is simply absent, never a hard error to the
//! detector's caller.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const RIFF_HEADER_LEN: u64 = 44;

/// Buffered, write-only 16-bit mono little-endian PCM sink.
///
/// Fabricates a RIFF/WAVE header with placeholder chunk sizes on creation;
/// the header is patched with the exact sample count on [`WavTap::close`]
/// (or `Drop`). Unlike the original C implementation, the sample count is
/// tracked precisely — no double-counting of the trailing partial buffer.
pub struct WavTap {
    path: PathBuf,
    file: File,
    buffer: Vec<i16>,
    samples_written: u64,
    closed: bool,
}

impl WavTap {
    /// Create a tap at `path`, buffering `buffer_len` samples before each
    /// flush to disk.
    pub fn create(path: impl AsRef<Path>, sample_rate: u32, buffer_len: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::create(&path).map_err(|source| Error::WavTapCreate {
            path: path.clone(),
            source,
        })?;

        write_placeholder_header(&mut file, sample_rate).map_err(|source| Error::WavTapCreate {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            file,
            buffer: Vec::with_capacity(buffer_len.max(1)),
            samples_written: 0,
            closed: false,
        })
    }

    /// Write one sample, buffering until `buffer_len` samples accumulate.
    pub fn write_sample(&mut self, sample: i16) {
        if self.closed {
            return;
        }
        self.buffer.push(sample);
        self.samples_written += 1;
        if self.buffer.len() == self.buffer.capacity() {
            if let Err(e) = self.flush_buffer() {
                tracing::warn!(path = %self.path.display(), error = %e, "wav tap write failed, disabling tap");
                self.closed = true;
            }
        }
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        for &s in &self.buffer {
            self.file.write_all(&s.to_le_bytes())?;
        }
        self.buffer.clear();
        Ok(())
    }

    /// Flush remaining buffered samples and patch the RIFF/WAVE header with
    /// the true sample count. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.finish().map_err(|source| Error::WavTapWrite {
            path: self.path.clone(),
            source,
        })
    }

    fn finish(&mut self) -> io::Result<()> {
        self.flush_buffer()?;
        self.closed = true;

        let data_size = self.samples_written * 2; // 16-bit samples
        let chunk_size = 36 + data_size;

        self.file.seek(SeekFrom::Start(4))?;
        self.file.write_all(&(chunk_size as u32).to_le_bytes())?;
        self.file.seek(SeekFrom::Start(40))?;
        self.file.write_all(&(data_size as u32).to_le_bytes())?;
        self.file.flush()
    }

    /// Exact number of samples written so far (including buffered-not-yet-
    /// flushed samples).
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }
}

impl Drop for WavTap {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.finish() {
                tracing::warn!(path = %self.path.display(), error = %e, "wav tap finalize failed");
            }
        }
    }
}

fn write_placeholder_header(file: &mut File, sample_rate: u32) -> io::Result<()> {
    file.write_all(b"RIFF")?;
    file.write_all(&0x0FFF_FFFFu32.to_le_bytes())?; // placeholder chunk_size
    file.write_all(b"WAVE")?;
    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?; // subchunk1_size
    file.write_all(&1u16.to_le_bytes())?; // audio_format = PCM
    file.write_all(&1u16.to_le_bytes())?; // num_channels = mono
    file.write_all(&sample_rate.to_le_bytes())?;
    let byte_rate = sample_rate * 2;
    file.write_all(&byte_rate.to_le_bytes())?;
    file.write_all(&2u16.to_le_bytes())?; // block_align
    file.write_all(&16u16.to_le_bytes())?; // bits_per_sample
    file.write_all(b"data")?;
    file.write_all(&0x0FFF_FFFFu32.to_le_bytes())?; // placeholder subchunk2_size
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile_path::temp_wav_path;

    mod tempfile_path {
        use std::path::PathBuf;
        use std::sync::atomic::{AtomicU32, Ordering};

        static COUNTER: AtomicU32 = AtomicU32::new(0);

        pub fn temp_wav_path(name: &str) -> PathBuf {
            let n = COUNTER.fetch_add(1, Ordering::Relaxed);
            std::env::temp_dir().join(format!("pulse_core_test_{}_{}.wav", name, n))
        }
    }

    #[test]
    fn header_is_patched_with_exact_sample_count() {
        let path = temp_wav_path("exact_count");
        {
            let mut tap = WavTap::create(&path, 250_000, 4).unwrap();
            for i in 0..10i16 {
                tap.write_sample(i);
            }
            tap.close().unwrap();
        }

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len() as u64, RIFF_HEADER_LEN + 10 * 2);

        let data_size = u32::from_le_bytes(bytes[40..44].try_into().unwrap());
        assert_eq!(data_size, 20);

        let chunk_size = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(chunk_size, 36 + 20);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn close_is_idempotent() {
        let path = temp_wav_path("idempotent");
        let mut tap = WavTap::create(&path, 250_000, 4).unwrap();
        tap.write_sample(1);
        tap.close().unwrap();
        tap.close().unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn samples_written_tracks_exact_count_across_partial_buffers() {
        let path = temp_wav_path("partial_buffer");
        let mut tap = WavTap::create(&path, 8000, 4).unwrap();
        for i in 0..13i16 {
            tap.write_sample(i);
        }
        assert_eq!(tap.samples_written(), 13);
        tap.close().unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
