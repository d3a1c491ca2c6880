//! # Archive extraction.
//!
//! The vendor tunnels ship as `.zip` (BrowserStack, TestingBot) or `.tar.gz`
//! archives; the format is chosen from the download URL's path, falling back
//! to the archive's magic bytes when the URL is inconclusive (CDNs sometimes
//! serve archives from extensionless redirect targets).

use std::io::{self, Cursor};
use std::path::Path;

use crate::error::TunnelError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Zip,
    TarGz,
}

/// Unpacks an in-memory archive into `target`, which must already exist.
pub(crate) fn unpack(url: &str, bytes: &[u8], target: &Path) -> Result<(), TunnelError> {
    match detect(url, bytes)? {
        Format::Zip => unpack_zip(bytes, target),
        Format::TarGz => unpack_tar_gz(bytes, target),
    }
}

fn detect(url: &str, bytes: &[u8]) -> Result<Format, TunnelError> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if path.ends_with(".zip") {
        return Ok(Format::Zip);
    }
    if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
        return Ok(Format::TarGz);
    }
    match bytes {
        [b'P', b'K', 0x03, 0x04, ..] => Ok(Format::Zip),
        [0x1f, 0x8b, ..] => Ok(Format::TarGz),
        _ => Err(TunnelError::Archive {
            message: format!("unrecognized archive format for {url}"),
        }),
    }
}

fn unpack_zip(bytes: &[u8], target: &Path) -> Result<(), TunnelError> {
    let archive_err = |e: zip::result::ZipError| TunnelError::Archive { message: e.to_string() };
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(archive_err)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(archive_err)?;
        // enclosed_name rejects entries that would escape the target dir
        let Some(rel) = file.enclosed_name() else {
            continue;
        };
        let out = target.join(rel);

        if file.is_dir() {
            std::fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut dest = std::fs::File::create(&out)?;
        io::copy(&mut file, &mut dest)?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out, std::fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

fn unpack_tar_gz(bytes: &[u8], target: &Path) -> Result<(), TunnelError> {
    let gz = flate2::read::GzDecoder::new(Cursor::new(bytes));
    let mut archive = tar::Archive::new(gz);
    archive.unpack(target).map_err(|e| TunnelError::Archive {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn zip_with_file(name: &str, contents: &[u8]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        writer
            .start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
        writer.finish().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn detects_format_from_url_extension() {
        assert_eq!(detect("https://x.test/a.zip", &[]).unwrap(), Format::Zip);
        assert_eq!(detect("https://x.test/a.tar.gz", &[]).unwrap(), Format::TarGz);
        assert_eq!(
            detect("https://x.test/a.zip?token=abc", &[]).unwrap(),
            Format::Zip
        );
    }

    #[test]
    fn detects_format_from_magic_bytes() {
        assert_eq!(
            detect("https://x.test/download", &[b'P', b'K', 0x03, 0x04, 0x00]).unwrap(),
            Format::Zip
        );
        assert_eq!(
            detect("https://x.test/download", &[0x1f, 0x8b, 0x08]).unwrap(),
            Format::TarGz
        );
        assert!(detect("https://x.test/download", b"hello").is_err());
    }

    #[test]
    fn unpacks_zip_into_target() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_with_file("BinaryName", b"#!/bin/sh\n");

        unpack("https://x.test/archive.zip", &bytes, dir.path()).unwrap();

        let extracted = dir.path().join("BinaryName");
        assert!(extracted.exists());
        assert_eq!(std::fs::read(extracted).unwrap(), b"#!/bin/sh\n");
    }

    #[test]
    fn unpacks_tar_gz_into_target() {
        let dir = tempfile::tempdir().unwrap();

        let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
            Vec::new(),
            flate2::Compression::default(),
        ));
        let mut header = tar::Header::new_gnu();
        header.set_size(5);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "nested/file.txt", &b"hello"[..]).unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();

        unpack("https://x.test/archive.tar.gz", &bytes, dir.path()).unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("nested/file.txt")).unwrap(),
            b"hello"
        );
    }
}
