use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

/// Writes data to a temporary sibling first, then renames it over the target.
/// 先寫入暫存檔再以 rename 覆蓋目標檔案，確保寫入為原子操作。
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp_name = path.file_name().map(OsString::from).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
