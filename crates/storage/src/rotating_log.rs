//! Append-only log file with size-capped numbered-backup rotation and
//! random-access / tail reads.
//!
//! For base path `P` and backup count `N`: the live file is `P`; rotated
//! backups are `P.1 .. P.N`. Rotation never leaves a `P.(N+1)` behind.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use supd_core::SupdError;

struct Inner {
    file: File,
    cur_size: u64,
}

pub struct RotatingLog {
    path: PathBuf,
    max_bytes: u64,
    backups: u32,
    inner: Mutex<Inner>,
}

impl RotatingLog {
    /// Opens (creating parent directories and the file as needed) for
    /// append, picking up the current size from disk.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backups: u32) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .append(true)
            .open(&path)?;
        let cur_size = file.metadata()?.len();
        Ok(Self {
            path,
            max_bytes,
            backups,
            inner: Mutex::new(Inner { file, cur_size }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `data`, rotating when the post-write size reaches
    /// `max_bytes`. Returns the number of bytes written to the pre-rotation
    /// file.
    pub fn write(&self, data: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        let n = inner.file.write(data)?;
        inner.cur_size += n as u64;
        if self.max_bytes > 0 && inner.cur_size >= self.max_bytes {
            self.rotate(&mut inner)?;
        }
        Ok(n)
    }

    fn rotate(&self, inner: &mut Inner) -> io::Result<()> {
        inner.file.flush()?;

        if self.backups == 0 {
            // No backups kept: rotation degenerates to a truncating reopen.
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)?;
            inner.file = file;
            inner.cur_size = 0;
            return Ok(());
        }

        let last = self.backup_path(self.backups);
        ignore_not_found(fs::remove_file(&last))?;

        for i in (1..self.backups).rev() {
            let from = self.backup_path(i);
            let to = self.backup_path(i + 1);
            ignore_not_found(fs::rename(&from, &to))?;
        }

        ignore_not_found(fs::rename(&self.path, self.backup_path(1)))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        inner.file = file;
        inner.cur_size = 0;
        Ok(())
    }

    fn backup_path(&self, n: u32) -> PathBuf {
        let mut s = self.path.clone().into_os_string();
        s.push(format!(".{n}"));
        PathBuf::from(s)
    }

    /// Random-access read. `offset < 0` counts from the end of the file;
    /// `length == 0` reads to EOF. Out-of-range reads return an empty
    /// string rather than erroring.
    pub fn read_at(&self, offset: i64, length: i64) -> Result<String, SupdError> {
        if offset < 0 && length != 0 {
            return Err(SupdError::BadArguments(
                "offset < 0 requires length == 0".into(),
            ));
        }
        if offset >= 0 && length < 0 {
            return Err(SupdError::BadArguments("length must be >= 0".into()));
        }

        let _guard = self.inner.lock();
        let file_len = fs::metadata(&self.path).map(|m| m.len() as i64).unwrap_or(0);

        let (mut offset, mut length) = (offset, length);
        if offset < 0 {
            offset = (file_len + offset).max(0);
            length = file_len - offset;
        } else if length == 0 {
            if offset > file_len {
                return Ok(String::new());
            }
            length = file_len - offset;
        } else {
            if offset >= file_len {
                return Ok(String::new());
            }
            if offset + length > file_len {
                length = file_len - offset;
            }
        }

        if length <= 0 {
            return Ok(String::new());
        }

        let mut file = File::open(&self.path).map_err(SupdError::from)?;
        file.seek(SeekFrom::Start(offset as u64))
            .map_err(SupdError::from)?;
        let mut buf = vec![0u8; length as usize];
        let n = file.read(&mut buf).map_err(SupdError::from)?;
        buf.truncate(n);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Incremental tail read: callers track `offset` across calls. When
    /// `offset >= size` (a rotation happened underneath, or nothing new has
    /// been written) returns `(empty, size, true)`. Unlike `read_at`,
    /// `length == 0` is not "read to EOF" — it reads nothing, returning the
    /// offset unchanged with no overflow.
    pub fn tail_read(&self, offset: i64, length: i64) -> Result<(String, i64, bool), SupdError> {
        if offset < 0 {
            return Err(SupdError::BadArguments("offset must be >= 0".into()));
        }
        if length < 0 {
            return Err(SupdError::BadArguments("length must be >= 0".into()));
        }

        let _guard = self.inner.lock();
        let file_len = fs::metadata(&self.path).map(|m| m.len() as i64).unwrap_or(0);

        if offset >= file_len {
            return Ok((String::new(), file_len, true));
        }

        let mut length = length;
        if offset + length > file_len {
            length = file_len - offset;
        }

        let mut file = File::open(&self.path).map_err(SupdError::from)?;
        file.seek(SeekFrom::Start(offset as u64))
            .map_err(SupdError::from)?;
        let mut buf = vec![0u8; length as usize];
        let n = file.read(&mut buf).map_err(SupdError::from)?;
        buf.truncate(n);
        Ok((
            String::from_utf8_lossy(&buf).into_owned(),
            offset + n as i64,
            false,
        ))
    }

    /// Truncates the live file and removes every numbered backup.
    pub fn clear(&self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        inner.file = file;
        inner.cur_size = 0;
        for i in 1..=self.backups {
            ignore_not_found(fs::remove_file(self.backup_path(i)))?;
        }
        Ok(())
    }

    pub fn current_size(&self) -> u64 {
        self.inner.lock().cur_size
    }

    /// Forces a rotation regardless of current size, the way an external
    /// reload/reopen signal does.
    pub fn rotate_now(&self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        self.rotate(&mut inner)
    }
}

fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
#[path = "rotating_log_tests.rs"]
mod tests;
