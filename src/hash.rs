use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const CHUNK: u64 = 65536;

/// OpenSubtitles-style content hash: file size plus the wrapping sum of
/// 64-bit little-endian words from the first and last 64 KiB, rendered as a
/// 16-character hex string. Returned together with the file size.
pub fn content_hash(path: &Path) -> std::io::Result<(String, u64)> {
    let mut file = File::open(path)?;
    let file_size = file.metadata()?.len();

    let mut hash = file_size;
    hash = hash.wrapping_add(sum_words(&mut file)?);

    file.seek(SeekFrom::Start(file_size.saturating_sub(CHUNK)))?;
    hash = hash.wrapping_add(sum_words(&mut file)?);

    Ok((format!("{:016x}", hash), file_size))
}

fn sum_words(file: &mut File) -> std::io::Result<u64> {
    let mut sum: u64 = 0;
    let mut buf = [0u8; 8];
    for _ in 0..(CHUNK / 8) {
        match file.read_exact(&mut buf) {
            Ok(()) => sum = sum.wrapping_add(u64::from_le_bytes(buf)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("introseek-hash-{}", name));
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn hash_is_stable_and_sized() {
        let path = temp_file("stable", &vec![0xabu8; 200_000]);
        let (first, size) = content_hash(&path).unwrap();
        let (second, _) = content_hash(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
        assert_eq!(size, 200_000);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn hash_of_small_file_includes_size() {
        // For an all-zero file both 64 KiB sums are zero, leaving the size
        let path = temp_file("small", &[0u8; 1024]);
        let (hash, size) = content_hash(&path).unwrap();
        assert_eq!(size, 1024);
        assert_eq!(hash, format!("{:016x}", 1024u64));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn different_content_changes_hash() {
        let a = temp_file("a", &vec![1u8; 100_000]);
        let b = temp_file("b", &vec![2u8; 100_000]);
        let (ha, _) = content_hash(&a).unwrap();
        let (hb, _) = content_hash(&b).unwrap();
        assert_ne!(ha, hb);
        std::fs::remove_file(a).ok();
        std::fs::remove_file(b).ok();
    }
}
