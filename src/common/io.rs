use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read};
use std::ops::Deref;
use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
use std::sync::atomic::{AtomicBool, Ordering};

use memmap2::{Mmap, MmapOptions};

/// Extension of the per-segment hash parse (one `u64` per word).
pub const EXT_PARSE_OLD: &str = "parse_old";
/// Extension of the last-char stream (one byte per word).
pub const EXT_LAST: &str = "last";
/// Extension of the suffix-info stream (`IBYTES` per word).
pub const EXT_SAI: &str = "sai";
/// Extension of the sorted dictionary.
pub const EXT_DICT: &str = "dict";
/// Extension of the occurrence counts (one `u32` per dictionary word).
pub const EXT_OCC: &str = "occ";
/// Extension of the rank parse (one `u32` per word).
pub const EXT_PARSE: &str = "parse";

/// Buffer size for every output stream.
pub const WRITE_BUF: usize = 256 * 1024;

/// Holds file data: either a zero-copy mmap or an owned Vec.
/// Dereferences to `&[u8]` for transparent use.
pub enum FileData {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Deref for FileData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileData::Mmap(m) => m,
            FileData::Owned(v) => v,
        }
    }
}

/// Below this size read() beats mmap setup and teardown.
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// After the first EPERM we never try O_NOATIME again. Every scanner thread
/// opens the input on its own, so this saves one failed open per thread.
#[cfg(target_os = "linux")]
static NOATIME_SUPPORTED: AtomicBool = AtomicBool::new(true);

/// Open a file read-only with O_NOATIME on Linux to avoid atime inode writes.
#[cfg(target_os = "linux")]
pub fn open_noatime(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    if NOATIME_SUPPORTED.load(Ordering::Relaxed) {
        match fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOATIME)
            .open(path)
        {
            Ok(f) => return Ok(f),
            Err(ref e) if e.raw_os_error() == Some(libc::EPERM) => {
                // O_NOATIME requires file ownership or CAP_FOWNER
                NOATIME_SUPPORTED.store(false, Ordering::Relaxed);
            }
            Err(e) => return Err(e),
        }
    }
    File::open(path)
}

#[cfg(not(target_os = "linux"))]
pub fn open_noatime(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// Read a whole file, mmap for large files and read() for small ones.
/// Used for the intermediate per-segment files, which are consumed once front
/// to back.
pub fn read_file(path: &Path) -> io::Result<FileData> {
    let file = open_noatime(path)?;
    let len = file.metadata()?.len();

    if len == 0 {
        return Ok(FileData::Owned(Vec::new()));
    }
    if len < MMAP_THRESHOLD {
        let mut buf = vec![0u8; len as usize];
        let n = read_full(&mut &file, &mut buf)?;
        buf.truncate(n);
        return Ok(FileData::Owned(buf));
    }

    // SAFETY: read-only mapping of a file this process created and no longer
    // writes to.
    match unsafe { MmapOptions::new().map(&file) } {
        Ok(mmap) => {
            #[cfg(target_os = "linux")]
            {
                let _ = mmap.advise(memmap2::Advice::Sequential);
                let _ = mmap.advise(memmap2::Advice::WillNeed);
            }
            Ok(FileData::Mmap(mmap))
        }
        Err(_) => {
            let mut buf = Vec::with_capacity(len as usize);
            let mut reader = file;
            reader.read_to_end(&mut buf)?;
            Ok(FileData::Owned(buf))
        }
    }
}

/// Get file size without reading it.
pub fn file_size(path: &Path) -> io::Result<u64> {
    Ok(fs::metadata(path)?.len())
}

/// `<base>.<ext>`
pub fn aux_path(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// `<base>.<ext>.<n>`, the name of segment `n`'s copy of a stream.
pub fn aux_path_num(base: &Path, ext: &str, n: usize) -> PathBuf {
    let mut name = aux_path(base, ext).into_os_string();
    name.push(format!(".{}", n));
    PathBuf::from(name)
}

/// Create (truncating) an output file behind a large write buffer.
pub fn create_output(path: &Path) -> io::Result<BufWriter<File>> {
    let file = File::create(path)?;
    Ok(BufWriter::with_capacity(WRITE_BUF, file))
}

/// Read as many bytes as possible into buf, retrying on partial reads.
/// Returns short only at EOF.
#[inline]
pub fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    // Fast path: first read() usually fills the entire buffer for regular files
    let n = reader.read(buf)?;
    if n == buf.len() || n == 0 {
        return Ok(n);
    }
    let mut total = n;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
