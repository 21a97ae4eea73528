//! Streaming archive extraction with single-pass hashing.

use crate::error::{IndexError, IndexResult};
use bzip2::read::BzDecoder;
use rlookup_core::hash::{Checksum, ChecksumKind};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tracing::trace;

/// Tee adapter: every byte read from `inner` also feeds the checksum.
struct HashingReader<R> {
    inner: R,
    hasher: Checksum,
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

/// Extract the allow-listed members of a bzip2-compressed tar stream into
/// `dest_dir` while hashing the full compressed stream in the same pass.
///
/// Only regular-file entries are written (with the permission bits from
/// their tar header, parent directories created as needed); everything else
/// is skipped but still flows through the hasher. After the tar stream ends
/// the remaining compressed bytes are drained so the returned hex digest
/// covers the entire archive, not just the bytes consumed before the last
/// interesting member.
///
/// On error the state of `dest_dir` is unspecified; callers treat the
/// directory as invalid until the next successful extraction overwrites it.
pub fn extract_and_hash(
    reader: impl Read,
    dest_dir: &Path,
    allowed: &[&str],
    kind: ChecksumKind,
) -> IndexResult<String> {
    let allowed: HashSet<&str> = allowed.iter().copied().collect();

    let tee = HashingReader {
        inner: reader,
        hasher: Checksum::new(kind),
    };
    let mut archive = tar::Archive::new(BzDecoder::new(tee));

    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = match entry.path() {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(err) => return Err(corrupt(err)),
        };
        if !allowed.contains(name.as_str()) {
            continue;
        }

        let target = dest_dir.join(&name);
        trace!(member = %name, "extracting archive member");
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out).map_err(corrupt)?;

        #[cfg(unix)]
        if let Ok(mode) = entry.header().mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
        }
    }

    // Drain the rest of the compressed stream through the hasher; the tar
    // reader stops at the end-of-archive marker, which may leave trailing
    // bytes unread.
    let mut tee = archive.into_inner().into_inner();
    io::copy(&mut tee, &mut io::sink())?;

    Ok(tee.hasher.finalize_hex())
}

fn corrupt(err: impl std::fmt::Display) -> IndexError {
    IndexError::ArchiveCorrupt(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::Compression;
    use bzip2::write::BzEncoder;
    use rlookup_core::hash::ContentHash;

    fn build_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = BzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *contents).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_extracts_only_allowed_members() {
        let archive = build_archive(&[
            ("info/files", b"lib/a.so\n"),
            ("info/index.json", b"{}"),
            ("lib/a.so", b"\x7fELF"),
        ]);
        let dest = tempfile::tempdir().unwrap();

        extract_and_hash(
            archive.as_slice(),
            dest.path(),
            &["info/files", "info/index.json"],
            ChecksumKind::Sha256,
        )
        .unwrap();

        assert_eq!(
            std::fs::read(dest.path().join("info/files")).unwrap(),
            b"lib/a.so\n"
        );
        assert!(dest.path().join("info/index.json").exists());
        assert!(!dest.path().join("lib/a.so").exists());
    }

    #[test]
    fn test_hash_covers_full_compressed_stream() {
        // The interesting member comes first; the digest must still cover
        // the trailing entries and padding.
        let archive = build_archive(&[
            ("info/files", b"x\n"),
            ("lib/big.bin", &[0u8; 8192]),
            ("lib/other.bin", &[1u8; 4096]),
        ]);
        let dest = tempfile::tempdir().unwrap();

        let digest = extract_and_hash(
            archive.as_slice(),
            dest.path(),
            &["info/files"],
            ChecksumKind::Sha256,
        )
        .unwrap();

        assert_eq!(digest, ContentHash::compute(&archive).to_hex());
    }

    #[test]
    fn test_md5_checksum_kind() {
        let archive = build_archive(&[("info/files", b"x\n")]);
        let dest = tempfile::tempdir().unwrap();

        let digest = extract_and_hash(
            archive.as_slice(),
            dest.path(),
            &["info/files"],
            ChecksumKind::Md5,
        )
        .unwrap();

        let mut expected = Checksum::new(ChecksumKind::Md5);
        expected.update(&archive);
        assert_eq!(digest, expected.finalize_hex());
    }

    #[test]
    fn test_garbage_input_is_archive_corrupt() {
        let dest = tempfile::tempdir().unwrap();
        let result = extract_and_hash(
            &b"this is not a bzip2 stream"[..],
            dest.path(),
            &["info/files"],
            ChecksumKind::Sha256,
        );
        assert!(matches!(result, Err(IndexError::ArchiveCorrupt(_))));
    }

    #[test]
    fn test_truncated_archive_is_archive_corrupt() {
        let archive = build_archive(&[("info/files", b"lib/a.so\n")]);
        let dest = tempfile::tempdir().unwrap();
        let result = extract_and_hash(
            &archive[..archive.len() / 2],
            dest.path(),
            &["info/files"],
            ChecksumKind::Sha256,
        );
        assert!(matches!(result, Err(IndexError::ArchiveCorrupt(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_bits_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let encoder = BzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(3);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "info/files", &b"x\n\n"[..])
            .unwrap();
        let archive = builder.into_inner().unwrap().finish().unwrap();

        let dest = tempfile::tempdir().unwrap();
        extract_and_hash(
            archive.as_slice(),
            dest.path(),
            &["info/files"],
            ChecksumKind::Sha256,
        )
        .unwrap();

        let mode = std::fs::metadata(dest.path().join("info/files"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
