//! image: backing store эмулируемой SRAM.
//!
//! SramImage описывает random-access хэндл, в который ядро пишет save RAM:
//! - open_scratch: создать/усечь приватный scratch-файл (путь стабилен для слота);
//! - read_all / write_at: байт-точный доступ (позиция курсора сохраняется);
//! - set_dynamic: регион без фиксированного размера (растёт по мере записи);
//! - path: метка пути для логов.
//!
//! Реализации:
//! - FileImage: обычный файл (std::fs), sync_data после записи;
//! - MemImage : Vec<u8> в памяти (хосты без ФС, тесты).

use anyhow::{anyhow, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::consts::ERASED_BYTE;

pub trait SramImage {
    /// Create or truncate the scratch backing at `path` and bind to it.
    fn open_scratch(&mut self, path: &Path) -> Result<()>;

    /// Current size in bytes.
    fn size(&self) -> Result<u64>;

    /// Whole content from offset 0. The handle position is left unchanged.
    fn read_all(&mut self) -> Result<Vec<u8>>;

    /// Write `data` at `offset` (extends the region if needed).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()>;

    /// Mark the region as dynamically sized (no preallocation).
    fn set_dynamic(&mut self);

    fn is_dynamic(&self) -> bool;

    fn path(&self) -> Option<&Path>;

    /// Release the backing (file handle etc.).
    fn close(&mut self);
}

/// Заполнить [offset, offset+len) байтом 0xFF (стёртая flash/SRAM).
pub fn fill_erased(img: &mut dyn SramImage, offset: u64, len: usize) -> Result<()> {
    const CHUNK: usize = 4096;
    let buf = [ERASED_BYTE; CHUNK];
    let mut pos = offset;
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(CHUNK);
        img.write_at(pos, &buf[..n])?;
        pos += n as u64;
        remaining -= n;
    }
    Ok(())
}

// ------------------------------ FileImage ------------------------------

#[derive(Debug, Default)]
pub struct FileImage {
    file: Option<File>,
    path: Option<PathBuf>,
    dynamic: bool,
}

impl FileImage {
    pub fn new() -> Self {
        Self::default()
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| anyhow!("image: no backing file bound"))
    }
}

impl SramImage for FileImage {
    fn open_scratch(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let f = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("open scratch image {}", path.display()))?;
        self.file = Some(f);
        self.path = Some(path.to_path_buf());
        self.dynamic = false;
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        let f = self
            .file
            .as_ref()
            .ok_or_else(|| anyhow!("image: no backing file bound"))?;
        Ok(f.metadata()?.len())
    }

    fn read_all(&mut self) -> Result<Vec<u8>> {
        let size = self.size()?;
        let len = usize::try_from(size).map_err(|_| anyhow!("image too large: {} B", size))?;
        let f = self.file_mut()?;

        let old = f.stream_position()?;
        let mut buf = vec![0u8; len];
        let res = f
            .seek(SeekFrom::Start(0))
            .and_then(|_| f.read_exact(&mut buf));
        // курсор возвращаем даже при ошибке чтения
        f.seek(SeekFrom::Start(old))?;
        res.context("read image")?;
        Ok(buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let f = self.file_mut()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)?;
        f.sync_data()?;
        f.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    fn set_dynamic(&mut self) {
        self.dynamic = true;
    }

    fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn close(&mut self) {
        self.file = None;
    }
}

// ------------------------------ MemImage ------------------------------

#[derive(Debug, Default, Clone)]
pub struct MemImage {
    data: Vec<u8>,
    path: Option<PathBuf>,
    dynamic: bool,
}

impl MemImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl SramImage for MemImage {
    fn open_scratch(&mut self, path: &Path) -> Result<()> {
        self.data.clear();
        self.path = Some(path.to_path_buf());
        self.dynamic = false;
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn read_all(&mut self) -> Result<Vec<u8>> {
        Ok(self.data.clone())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let start = usize::try_from(offset).map_err(|_| anyhow!("offset out of range"))?;
        let end = start
            .checked_add(data.len())
            .ok_or_else(|| anyhow!("write past address space"))?;
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn set_dynamic(&mut self) {
        self.dynamic = true;
    }

    fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn close(&mut self) {}
}
