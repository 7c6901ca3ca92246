//! maven-metadata.xml parsing for version discovery and SNAPSHOT resolution.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use quarry_util::errors::QuarryError;

/// A parsed `maven-metadata.xml`, either artifact level (version listing) or
/// version level (snapshot builds).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MavenMetadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub versioning: Versioning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Versioning {
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Vec<String>,
    /// `yyyyMMddHHmmss` in UTC; fixed width, so lexical order is time order.
    pub last_updated: Option<String>,
    pub snapshot: Option<Snapshot>,
    pub snapshot_versions: Vec<SnapshotVersion>,
}

/// The newest build of a snapshot version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// `yyyyMMdd.HHmmss`
    pub timestamp: Option<String>,
    pub build_number: Option<u32>,
    /// Set for metadata written by a local install rather than a deploy.
    pub local_copy: bool,
}

impl Snapshot {
    /// The `timestamp-buildNumber` qualifier that replaces `SNAPSHOT`, when
    /// both parts are known.
    pub fn qualifier(&self) -> Option<String> {
        let ts = self.timestamp.as_deref().filter(|t| !t.is_empty())?;
        let bn = self.build_number.filter(|n| *n > 0)?;
        Some(format!("{ts}-{bn}"))
    }
}

/// A per-file snapshot entry (`<snapshotVersions>`), keyed by classifier and
/// extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotVersion {
    pub classifier: String,
    pub extension: String,
    pub value: String,
    pub updated: String,
}

impl SnapshotVersion {
    /// `classifier:extension` key of the file this entry describes.
    pub fn key(&self) -> String {
        format!("{}:{}", self.classifier, self.extension)
    }
}

impl MavenMetadata {
    pub fn last_updated(&self) -> &str {
        self.versioning.last_updated.as_deref().unwrap_or("")
    }
}

/// Read and parse a metadata file from disk.
pub fn read_metadata(path: &Path) -> Result<MavenMetadata, QuarryError> {
    let xml = std::fs::read_to_string(path)?;
    parse_metadata(&xml)
}

/// Parse a `maven-metadata.xml` document.
pub fn parse_metadata(xml: &str) -> Result<MavenMetadata, QuarryError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut meta = MavenMetadata::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();
    let mut snapshot: Option<Snapshot> = None;
    let mut snapshot_version: Option<SnapshotVersion> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                text_buf.clear();
                match path.join(">").as_str() {
                    "metadata>versioning>snapshot" => snapshot = Some(Snapshot::default()),
                    "metadata>versioning>snapshotVersions>snapshotVersion" => {
                        snapshot_version = Some(SnapshotVersion::default());
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                let ctx = path.join(">");
                let versioning = &mut meta.versioning;

                match ctx.as_str() {
                    "metadata>groupId" => meta.group_id = Some(text_buf.clone()),
                    "metadata>artifactId" => meta.artifact_id = Some(text_buf.clone()),
                    "metadata>version" => meta.version = Some(text_buf.clone()),
                    "metadata>versioning>latest" => versioning.latest = Some(text_buf.clone()),
                    "metadata>versioning>release" => versioning.release = Some(text_buf.clone()),
                    "metadata>versioning>lastUpdated" => {
                        versioning.last_updated = Some(text_buf.clone());
                    }
                    "metadata>versioning>versions>version" => {
                        versioning.versions.push(text_buf.clone());
                    }
                    "metadata>versioning>snapshot" => versioning.snapshot = snapshot.take(),
                    "metadata>versioning>snapshotVersions>snapshotVersion" => {
                        if let Some(sv) = snapshot_version.take() {
                            versioning.snapshot_versions.push(sv);
                        }
                    }
                    _ => {}
                }

                if let Some(ref mut s) = snapshot {
                    match ctx.as_str() {
                        "metadata>versioning>snapshot>timestamp" => {
                            s.timestamp = Some(text_buf.clone());
                        }
                        "metadata>versioning>snapshot>buildNumber" => {
                            s.build_number = text_buf.trim().parse().ok();
                        }
                        "metadata>versioning>snapshot>localCopy" => {
                            s.local_copy = text_buf.trim() == "true";
                        }
                        _ => {}
                    }
                }

                if let Some(ref mut sv) = snapshot_version {
                    match path.last().map(|s| s.as_str()) {
                        Some("classifier") => sv.classifier = text_buf.clone(),
                        Some("extension") => sv.extension = text_buf.clone(),
                        Some("value") => sv.value = text_buf.clone(),
                        Some("updated") => sv.updated = text_buf.clone(),
                        _ => {}
                    }
                }

                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(QuarryError::parse("maven-metadata.xml", e)),
            _ => {}
        }
    }

    if meta.group_id.is_none() && meta.artifact_id.is_none() && meta.versioning == Versioning::default() {
        return Err(QuarryError::parse(
            "maven-metadata.xml",
            "document has no <metadata> content",
        ));
    }
    Ok(meta)
}
