//! Artifact fetching: download a resolved mod version into the server's
//! mods directory and verify its checksum.
//!
//! Downloads are a single attempt. On checksum mismatch the partial file is
//! deleted and the fetch fails; on transport errors no cleanup beyond that
//! is guaranteed.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use sha1::{Digest, Sha1};
use sha2::Sha512;
use std::io::Write;
use std::path::Path;

use crate::http::HttpClient;
use crate::runtime::Runtime;
use crate::source::{Checksum, ModVersion};

enum ArtifactHasher {
    Sha1(Sha1),
    Sha512(Sha512),
}

impl ArtifactHasher {
    fn for_checksum(checksum: &Checksum) -> Self {
        match checksum {
            Checksum::Sha1(_) => ArtifactHasher::Sha1(Sha1::new()),
            Checksum::Sha512(_) => ArtifactHasher::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            ArtifactHasher::Sha1(h) => h.update(bytes),
            ArtifactHasher::Sha512(h) => h.update(bytes),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            ArtifactHasher::Sha1(h) => hex::encode(h.finalize()),
            ArtifactHasher::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Writer that hashes everything it passes through to the inner writer.
struct HashingWriter<W: Write> {
    inner: W,
    hasher: Option<ArtifactHasher>,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W, checksum: Option<&Checksum>) -> Self {
        Self {
            inner,
            hasher: checksum.map(ArtifactHasher::for_checksum),
        }
    }

    fn digest_hex(&mut self) -> Option<String> {
        self.hasher.take().map(ArtifactHasher::finalize_hex)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(hasher) = &mut self.hasher {
            hasher.update(buf);
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

fn expected_hex(checksum: &Checksum) -> &str {
    match checksum {
        Checksum::Sha1(hex) | Checksum::Sha512(hex) => hex,
    }
}

/// Downloads the artifact for a resolved version into `mods_dir`.
#[tracing::instrument(skip(runtime, http, version, mods_dir))]
pub async fn fetch_artifact<R: Runtime>(
    runtime: &R,
    http: &HttpClient,
    version: &ModVersion,
    mods_dir: &Path,
) -> Result<()> {
    let target = mods_dir.join(&version.file_name);
    info!("Downloading {} from {}", version.file_name, version.url);

    let file = runtime.create_file(&target)?;
    let mut writer = HashingWriter::new(file, version.checksum.as_ref());

    http.download_file(&version.url, &mut writer)
        .await
        .with_context(|| format!("Failed to download {}", version.file_name))?;
    writer.flush().context("Failed to flush downloaded file")?;

    if let (Some(checksum), Some(actual)) = (&version.checksum, writer.digest_hex()) {
        let expected = expected_hex(checksum).to_lowercase();
        if actual != expected {
            runtime.remove_file(&target).with_context(|| {
                format!("Failed to delete corrupt download {}", target.display())
            })?;
            bail!(
                "Checksum mismatch for {}: expected {}, got {}",
                version.file_name,
                expected,
                actual
            );
        }
        debug!("Checksum of {} verified", version.file_name);
    }

    Ok(())
}

/// Deletes the on-disk artifact of a tracked mod. Missing files are fine;
/// the entry may have been cleaned up manually.
pub fn remove_artifact<R: Runtime>(runtime: &R, mods_dir: &Path, file_name: &str) -> Result<()> {
    let path = mods_dir.join(file_name);
    if runtime.exists(&path) {
        runtime.remove_file(&path)?;
    } else {
        debug!("Artifact {} already absent", path.display());
    }
    Ok(())
}
