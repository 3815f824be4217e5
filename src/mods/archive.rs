use std::io::Write;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::mods::{ChecksumHandling, ModsSettings};
use crate::mods::remote_repo::{DirectoryEntry, ListError, RemoteModsRepo};
use crate::mods::version::ModsVersion;
use crate::util::chunk_buffer::ChunkBuffer;
use crate::util::git_blob::verify_git_blob;

/// Append-only destination for archive bytes, owned by the caller (e.g. an HTTP response body).
#[async_trait]
pub trait ArchiveSink: Send {
    async fn write_chunk(&mut self, chunk: Bytes) -> anyhow::Result<()>;
}

#[async_trait]
impl ArchiveSink for Vec<u8> {
    async fn write_chunk(&mut self, chunk: Bytes) -> anyhow::Result<()> {
        self.extend_from_slice(&chunk);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("version {0} not found upstream")]
    VersionNotFound(ModsVersion),
    #[error("no archive members for version {0}")]
    NoMembers(ModsVersion),
    #[error("failed to list version directory: {0}")]
    UpstreamFailure(#[source] ListError),
    /// Once this happens after bytes reached the sink, the sink holds a truncated archive.
    #[error("failed to write archive: {0:#}")]
    ArchiveFailure(anyhow::Error),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MemberOutcome {
    Included { name: String, bytes: usize },
    Skipped { name: String, reason: String },
}

/// What happened to each member, in upstream listing order.
#[derive(Debug, Default)]
pub struct AssemblyReport {
    pub outcomes: Vec<MemberOutcome>,
}
impl AssemblyReport {
    pub fn included(&self) -> Vec<&str> {
        self.outcomes.iter()
            .filter_map(|o| match o {
                MemberOutcome::Included { name, .. } => Some(name.as_str()),
                MemberOutcome::Skipped { .. } => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.outcomes.iter()
            .filter_map(|o| match o {
                MemberOutcome::Skipped { name, .. } => Some(name.as_str()),
                MemberOutcome::Included { .. } => None,
            })
            .collect()
    }
}

/// The members of one version's archive, determined before any byte is written. Splitting this
///  from the actual writing lets a caller pick a response status while nothing is committed yet.
#[derive(Debug)]
pub struct ArchivePlan {
    version: ModsVersion,
    members: Vec<DirectoryEntry>,
    checksum_handling: ChecksumHandling,
}

/// Lists the version's directory and selects the archive members.
pub async fn prepare_archive<R: RemoteModsRepo + ?Sized>(repo: &R, settings: &ModsSettings, version: &ModsVersion) -> Result<ArchivePlan, AssembleError> {
    let entries = match repo.list_directory(&settings.version_path(version)).await {
        Ok(entries) => entries,
        Err(ListError::NotFound(_)) => return Err(AssembleError::VersionNotFound(version.clone())),
        Err(e) => return Err(AssembleError::UpstreamFailure(e)),
    };

    let members = entries.into_iter()
        .filter(|entry| settings.is_member(entry))
        .collect::<Vec<_>>();
    if members.is_empty() {
        return Err(AssembleError::NoMembers(version.clone()));
    }

    debug!("{} archive members for version {}", members.len(), version);
    Ok(ArchivePlan {
        version: version.clone(),
        members,
        checksum_handling: settings.checksum_handling,
    })
}

/// Lists, fetches and streams all members of a version into `sink` as a zip archive.
pub async fn assemble_archive<R, S>(repo: &R, settings: &ModsSettings, version: &ModsVersion, sink: &mut S) -> Result<AssemblyReport, AssembleError>
where
    R: RemoteModsRepo + ?Sized,
    S: ArchiveSink + ?Sized,
{
    prepare_archive(repo, settings, version)
        .await?
        .write_to(repo, sink)
        .await
}

fn member_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(5))
}

impl ArchivePlan {
    pub fn version(&self) -> &ModsVersion {
        &self.version
    }

    pub fn members(&self) -> &[DirectoryEntry] {
        &self.members
    }

    /// Fetches the members one after the other and appends each to the archive as soon as it
    ///  arrives. A member that can not be fetched (or fails checksum verification) is left out;
    ///  only errors of the archive itself or of the sink abort the operation.
    pub async fn write_to<R, S>(self, repo: &R, sink: &mut S) -> Result<AssemblyReport, AssembleError>
    where
        R: RemoteModsRepo + ?Sized,
        S: ArchiveSink + ?Sized,
    {
        let ArchivePlan { version, members, checksum_handling } = self;

        let buffer = ChunkBuffer::default();
        let mut zip = ZipWriter::new_stream(buffer.clone());
        let mut report = AssemblyReport::default();

        for entry in members {
            let data = match fetch_verified(repo, &entry, checksum_handling).await {
                Ok(data) => data,
                Err(e) => {
                    warn!("skipping {} for version {}: {:#}", entry.name, version, e);
                    report.outcomes.push(MemberOutcome::Skipped { name: entry.name, reason: format!("{:#}", e) });
                    continue;
                }
            };

            zip.start_file(entry.name.as_str(), member_options())
                .map_err(|e| AssembleError::ArchiveFailure(e.into()))?;
            zip.write_all(&data)
                .map_err(|e| AssembleError::ArchiveFailure(e.into()))?;

            // the compressor may still hold back part of this member; that part is flushed
            //  with the next member or by finish()
            sink.write_chunk(buffer.take())
                .await
                .map_err(AssembleError::ArchiveFailure)?;

            report.outcomes.push(MemberOutcome::Included { name: entry.name, bytes: data.len() });
        }

        zip.finish()
            .map_err(|e| AssembleError::ArchiveFailure(e.into()))?;
        sink.write_chunk(buffer.take())
            .await
            .map_err(AssembleError::ArchiveFailure)?;

        info!("archive for version {}: {} members included, {} skipped", version, report.included().len(), report.skipped().len());
        Ok(report)
    }
}

async fn fetch_verified<R: RemoteModsRepo + ?Sized>(repo: &R, entry: &DirectoryEntry, checksum_handling: ChecksumHandling) -> anyhow::Result<Bytes> {
    let data = repo.fetch_member(entry)
        .await?;

    if let (ChecksumHandling::VerifyIfPresent, Some(sha)) = (checksum_handling, &entry.sha) {
        verify_git_blob(&data, sha)?;
    }
    Ok(data)
}
