//! Location of the frame files backing a stream over a time span, and the cache (manifest)
//! files handed to the trigger tool.
use crate::config::{DataFindConfig, LocatorKind};
use crate::constants::FILE_URL_PREFIX;
use crate::segments::query::QueryError;
use crate::segments::{Interval, StreamId};
use glitchflow_common::fs::write_atomic;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;
use walkdir::WalkDir;

const FRAME_EXTENSION: &str = "gwf";

/// A source of input data file locations.
pub trait DataLocator {
    fn locate(
        &self,
        stream: &str,
        frame_type: &str,
        span: Interval,
    ) -> impl Future<Output = Result<Vec<String>, QueryError>> + Send;
}

/// Full frame type tag as used by the data-location service, e.g. `H1_HOFT_C00`.
pub fn frame_tag(stream: &str, frame_type: &str) -> String {
    format!("{stream}_{frame_type}")
}

/// Client for the GWDataFind REST interface.
#[derive(Debug, Clone)]
pub struct DataFindClient {
    base: Url,
    urltype: String,
    client: reqwest::Client,
}

impl DataFindClient {
    pub fn new(base: &str, urltype: &str, timeout: Duration) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(QueryError::Client)?;
        Ok(Self {
            base: Url::parse(base)?,
            urltype: urltype.to_string(),
            client,
        })
    }

    fn urls_endpoint(&self, stream: &str, frame_type: &str, span: Interval) -> Result<Url, QueryError> {
        let site = stream.get(..1).unwrap_or(stream);
        let tag = frame_tag(stream, frame_type);
        let range = format!("{},{}", span.start(), span.end());
        let format = format!("{}.json", self.urltype);

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["api", "v1", "gwf", site, tag.as_str(), range.as_str(), format.as_str()]);
        Ok(url)
    }
}

impl DataLocator for DataFindClient {
    async fn locate(&self, stream: &str, frame_type: &str, span: Interval) -> Result<Vec<String>, QueryError> {
        let url = self.urls_endpoint(stream, frame_type, span)?;
        debug!(%url, "querying frame file locations");

        let http_err = |source| QueryError::Http {
            url: url.to_string(),
            source,
        };
        let urls: Vec<String> = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?
            .json()
            .await
            .map_err(http_err)?;

        Ok(urls
            .into_iter()
            .map(|u| u.strip_prefix(FILE_URL_PREFIX).map(str::to_string).unwrap_or(u))
            .collect())
    }
}

/// Frame files found by scanning a local directory tree. File names are expected to follow the
/// `<site>-<frame tag>-<gps start>-<duration>.gwf` convention.
#[derive(Debug, Clone)]
pub struct FrameDirectory {
    root: PathBuf,
}

impl FrameDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn scan(&self, tag: &str, span: Interval) -> Result<Vec<String>, QueryError> {
        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| QueryError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone()),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some((file_tag, coverage)) = parse_frame_name(entry.path()) {
                if file_tag == tag && coverage.overlaps(&span) {
                    found.push(entry.path().display().to_string());
                }
            }
        }
        Ok(found)
    }
}

impl DataLocator for FrameDirectory {
    async fn locate(&self, stream: &str, frame_type: &str, span: Interval) -> Result<Vec<String>, QueryError> {
        let directory = self.clone();
        let tag = frame_tag(stream, frame_type);
        tokio::task::spawn_blocking(move || directory.scan(&tag, span))
            .await
            .map_err(|e| QueryError::Io {
                path: self.root.clone(),
                source: std::io::Error::other(e),
            })?
    }
}

/// Parses `H-H1_HOFT_C00-1238163456-4096.gwf` into its frame tag and covered interval.
fn parse_frame_name(path: &Path) -> Option<(String, Interval)> {
    if path.extension()? != FRAME_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.rsplitn(3, '-');
    let duration: i64 = parts.next()?.parse().ok()?;
    let start: i64 = parts.next()?.parse().ok()?;
    let (_site, tag) = parts.next()?.split_once('-')?;
    Some((tag.to_string(), Interval::try_from_pair(start, start.checked_add(duration)?)?))
}

/// The locator selected by configuration.
#[derive(Debug, Clone)]
pub enum LocatorProvider {
    DataFind(DataFindClient),
    Directory(FrameDirectory),
}

impl LocatorProvider {
    pub fn from_config(config: &DataFindConfig) -> Result<Self, QueryError> {
        match config.source {
            LocatorKind::Gwdatafind => Ok(Self::DataFind(DataFindClient::new(
                &config.url,
                &config.urltype,
                Duration::from_secs(config.timeout_secs),
            )?)),
            LocatorKind::Directory => {
                let root = config.directory.clone().ok_or_else(|| {
                    QueryError::Misconfigured(
                        "datafind.directory must be set when datafind.source = \"directory\""
                            .to_string(),
                    )
                })?;
                Ok(Self::Directory(FrameDirectory::new(root)))
            }
        }
    }
}

impl DataLocator for LocatorProvider {
    async fn locate(&self, stream: &str, frame_type: &str, span: Interval) -> Result<Vec<String>, QueryError> {
        match self {
            Self::DataFind(client) => client.locate(stream, frame_type, span).await,
            Self::Directory(dir) => dir.locate(stream, frame_type, span).await,
        }
    }
}

/// Looks up the data files for one stream and writes them, one per line, to `cache_path`.
/// An empty lookup result is an error: the tool cannot run without input data.
pub async fn write_cache<L: DataLocator>(
    locator: &L,
    stream: &StreamId,
    frame_type: &str,
    span: Interval,
    cache_path: &Path,
) -> Result<usize, QueryError> {
    let files = locator.locate(stream, frame_type, span).await?;
    if files.is_empty() {
        return Err(QueryError::NoDataFiles {
            stream: stream.clone(),
            frame_type: frame_type.to_string(),
            interval: span,
        });
    }

    let mut contents = files.join("\n");
    contents.push('\n');
    write_atomic(cache_path, contents.as_bytes()).map_err(|source| QueryError::Io {
        path: cache_path.to_path_buf(),
        source,
    })?;
    Ok(files.len())
}
