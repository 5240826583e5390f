//! Data models for share resolution and upstream API responses.

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};

/// A caller-supplied share URL together with its derived short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReference {
    raw_url: String,
    short_code: String,
}

impl ShareReference {
    /// Create a reference, rejecting an empty short code.
    pub fn new(raw_url: impl Into<String>, short_code: impl Into<String>) -> Result<Self> {
        let raw_url = raw_url.into();
        let short_code = short_code.into();
        if short_code.trim().is_empty() {
            return Err(ResolveError::NoShortCode(raw_url));
        }
        Ok(Self {
            raw_url,
            short_code,
        })
    }

    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn short_code(&self) -> &str {
        &self.short_code
    }
}

/// Ephemeral tokens obtained for one resolution call.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub js_token: String,
    pub browser_id: Option<String>,
    pub session_cookie: String,
}

impl AuthContext {
    /// Cookie header combining the caller's credential with the negotiated session.
    pub fn cookie_header(&self, credentials: Option<&str>) -> String {
        match credentials.map(str::trim).filter(|c| !c.is_empty()) {
            Some(creds) => format!("{};{}", creds.trim_end_matches(';'), self.session_cookie),
            None => self.session_cookie.clone(),
        }
    }
}

/// A node of a shared folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub fs_id: u64,
    pub name: String,
    /// Absent for directories.
    pub size_bytes: Option<u64>,
    pub is_directory: bool,
    pub children: Vec<FileEntry>,
}

impl FileEntry {
    /// Build an entry from a raw listing item, or `None` if required fields are missing.
    pub fn from_raw(raw: &RawEntry) -> Option<Self> {
        let path = raw.path.clone().filter(|p| !p.is_empty())?;
        let fs_id = raw.fs_id?;
        let name = raw
            .server_filename
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| path.rsplit('/').next().map(str::to_string))?;
        let is_directory = raw.is_directory();

        Some(Self {
            path,
            fs_id,
            name,
            size_bytes: if is_directory {
                None
            } else {
                Some(raw.size.unwrap_or(0))
            },
            is_directory,
            children: Vec::new(),
        })
    }
}

/// Sharing metadata needed to generate per-file links in a folder share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareMeta {
    pub share_id: String,
    pub uk: String,
    pub sign: String,
    pub timestamp: String,
}

/// Root listing of a share.
#[derive(Debug, Clone)]
pub struct ShareListing {
    pub meta: ShareMeta,
    pub entries: Vec<FileEntry>,
}

/// Terminal artifact handed to the downloader. The link is time-limited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFile {
    pub filename: String,
    pub size_bytes: Option<u64>,
    pub direct_link: String,
}

impl std::fmt::Display for ResolvedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size_str = self
            .size_bytes
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        write!(f, "{}\t{}\t{}", size_str, self.filename, self.direct_link)
    }
}

/// A folder entry whose link could not be generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Successful resolution of a share.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    Single(ResolvedFile),
    Folder {
        files: Vec<ResolvedFile>,
        skipped: Vec<SkippedFile>,
    },
}

impl Resolution {
    /// All resolved files, in order.
    pub fn files(&self) -> &[ResolvedFile] {
        match self {
            Resolution::Single(file) => std::slice::from_ref(file),
            Resolution::Folder { files, .. } => files,
        }
    }
}

/// Outcome of resolving one share link.
pub type ResolutionOutcome = Result<Resolution>;

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// Upstream responses. Numeric fields arrive as numbers or strings depending
// on the endpoint, hence the lenient deserializers.

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(u64),
    Str(String),
}

fn deserialize_flexible_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<NumOrString> = Option::deserialize(deserializer)?;
    match opt {
        Some(NumOrString::Num(n)) => Ok(Some(n)),
        Some(NumOrString::Str(s)) if s.is_empty() => Ok(None),
        Some(NumOrString::Str(s)) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_flexible_string<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<NumOrString> = Option::deserialize(deserializer)?;
    Ok(opt.map(|v| match v {
        NumOrString::Num(n) => n.to_string(),
        NumOrString::Str(s) => s,
    }))
}

/// One item of a share listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntry {
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub isdir: Option<u64>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub fs_id: Option<u64>,
    #[serde(default)]
    pub server_filename: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub size: Option<u64>,
}

impl RawEntry {
    pub fn is_directory(&self) -> bool {
        self.isdir.unwrap_or(0) != 0
    }
}

/// Response of the `shorturlinfo` root listing.
#[derive(Debug, Deserialize)]
pub struct ShareInfoResponse {
    #[serde(default)]
    pub errno: i64,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub shareid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub uk: Option<String>,
    #[serde(default)]
    pub sign: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub list: Vec<RawEntry>,
}

/// Response of listing endpoints (`share/list`, `api/filemetas`).
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub errno: i64,
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub list: Vec<RawEntry>,
}

/// `dlink` is either a plain URL or a list of `{fs_id, dlink}` items.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DlinkField {
    Link(String),
    List(Vec<DlinkItem>),
}

#[derive(Debug, Deserialize)]
pub struct DlinkItem {
    #[serde(default)]
    pub dlink: Option<String>,
}

impl DlinkField {
    /// First non-empty link.
    pub fn first(&self) -> Option<&str> {
        let link = match self {
            DlinkField::Link(link) => Some(link.as_str()),
            DlinkField::List(items) => items.iter().find_map(|i| i.dlink.as_deref()),
        };
        link.filter(|link| !link.is_empty())
    }
}

/// Response of link endpoints (`api/download`, `share/download`).
#[derive(Debug, Deserialize)]
pub struct DownloadResponse {
    #[serde(default)]
    pub errno: i64,
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub dlink: Option<DlinkField>,
}

/// Response of the `api/sharedownload` endpoint.
#[derive(Debug, Deserialize)]
pub struct ShareDownloadResponse {
    #[serde(default)]
    pub errno: i64,
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub dlink: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub size: Option<u64>,
    #[serde(default)]
    pub list: Vec<RawEntry>,
}
