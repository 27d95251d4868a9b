use pcat_schemas::FileSignature;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const READ_BUF: usize = 64 * 1024;

/// Stream a file through SHA-256. Zero-length files get the empty-input digest.
pub fn compute_signature(path: &Path) -> io::Result<FileSignature> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(READ_BUF, file);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUF];
    let mut size: u64 = 0;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        size += n as u64;
        hasher.update(&buf[..n]);
    }

    Ok(FileSignature {
        size,
        sha256: hex::encode(hasher.finalize()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_has_well_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("empty.txt");
        std::fs::write(&p, b"").unwrap();

        let sig = compute_signature(&p).unwrap();
        assert_eq!(sig.size, 0);
        assert_eq!(
            sig.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn one_byte_change_changes_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, b"hello world").unwrap();
        std::fs::write(&b, b"hello worle").unwrap();

        let sa = compute_signature(&a).unwrap();
        let sb = compute_signature(&b).unwrap();
        assert_eq!(sa.size, sb.size);
        assert_ne!(sa.sha256, sb.sha256);
    }
}
