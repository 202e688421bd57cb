//! Retrieval of per-stream valid-data intervals from a segment database or a local file.
use super::{Interval, StreamId};
use crate::config::{SegmentSourceKind, SegmentsConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

const DEFAULT_FLAG_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid segment flag `{0}`, expected NAME[:VERSION]")]
    InvalidFlag(String),

    #[error("invalid service url: {0}")]
    Url(#[from] url::ParseError),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no segment list for stream {0}")]
    MissingStream(StreamId),

    #[error("no coincident segments between {start} and {end}")]
    NoCoincidentSegments { start: i64, end: i64 },

    #[error("no data files for {stream} ({frame_type}) in {interval}")]
    NoDataFiles {
        stream: StreamId,
        frame_type: String,
        interval: Interval,
    },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{0}")]
    Misconfigured(String),
}

/// The data-quality flag whose active segments mark a stream as usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFlag {
    pub stream: StreamId,
    /// Flag name without the stream prefix, optionally with a version: `DMT-ANALYSIS_READY:1`.
    pub flag: String,
}

impl StreamFlag {
    pub fn new(stream: impl Into<StreamId>, flag: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            flag: flag.into(),
        }
    }

    /// Splits the flag into its name and version, defaulting the version to 1.
    pub fn name_and_version(&self) -> Result<(&str, &str), QueryError> {
        let mut parts = self.flag.split(':');
        let name = parts.next().filter(|n| !n.is_empty());
        let version = parts.next().unwrap_or(DEFAULT_FLAG_VERSION);
        match (name, parts.next()) {
            (Some(name), None) if version.parse::<u32>().is_ok() => Ok((name, version)),
            _ => Err(QueryError::InvalidFlag(self.flag.clone())),
        }
    }

    pub fn qualified(&self) -> String {
        format!("{}:{}", self.stream, self.flag)
    }
}

pub type StreamSegments = BTreeMap<StreamId, Vec<Interval>>;

/// A source of per-stream active segments.
pub trait SegmentSource {
    fn query(
        &self,
        flags: &[StreamFlag],
        span: Interval,
    ) -> impl Future<Output = Result<StreamSegments, QueryError>> + Send;
}

/// Client for the DQSegDB REST interface.
#[derive(Debug, Clone)]
pub struct DqSegDbClient {
    base: Url,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FlagResponse {
    #[serde(default)]
    active: Vec<(f64, f64)>,
}

impl DqSegDbClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(QueryError::Client)?;
        Ok(Self {
            base: Url::parse(base)?,
            client,
        })
    }

    fn flag_url(&self, flag: &StreamFlag, span: Interval) -> Result<Url, QueryError> {
        let (name, version) = flag.name_and_version()?;
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["dq", flag.stream.as_str(), name, version]);
        url.query_pairs_mut()
            .append_pair("s", &span.start().to_string())
            .append_pair("e", &span.end().to_string())
            .append_pair("include", "active");
        Ok(url)
    }

    async fn query_flag(&self, flag: &StreamFlag, span: Interval) -> Result<Vec<Interval>, QueryError> {
        let url = self.flag_url(flag, span)?;
        debug!(%url, flag = %flag.qualified(), "querying segments");

        let http_err = |source| QueryError::Http {
            url: url.to_string(),
            source,
        };
        let response: FlagResponse = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?
            .json()
            .await
            .map_err(http_err)?;

        // segment boundaries may be fractional; round inward so no invalid time is included
        Ok(response
            .active
            .into_iter()
            .filter_map(|(start, end)| {
                Interval::try_from_pair(start.ceil() as i64, end.floor() as i64)
            })
            .filter_map(|interval| interval.clip(&span))
            .collect())
    }
}

impl SegmentSource for DqSegDbClient {
    async fn query(&self, flags: &[StreamFlag], span: Interval) -> Result<StreamSegments, QueryError> {
        let mut segments = StreamSegments::new();
        for flag in flags {
            let intervals = self.query_flag(flag, span).await?;
            debug!(stream = %flag.stream, count = intervals.len(), "received segments");
            segments.insert(flag.stream.clone(), intervals);
        }
        Ok(segments)
    }
}

/// Segments read from a JSON document of the form `{"H1": [[start, end], ...], ...}`.
#[derive(Debug, Clone)]
pub struct SegmentFile {
    path: PathBuf,
}

impl SegmentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<BTreeMap<StreamId, Vec<(i64, i64)>>, QueryError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| QueryError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| QueryError::Json {
            path: self.path.clone(),
            source,
        })
    }
}

impl SegmentSource for SegmentFile {
    async fn query(&self, flags: &[StreamFlag], span: Interval) -> Result<StreamSegments, QueryError> {
        let mut all = self.read()?;
        flags
            .iter()
            .map(|flag| {
                let pairs = all
                    .remove(&flag.stream)
                    .ok_or_else(|| QueryError::MissingStream(flag.stream.clone()))?;
                let intervals = pairs
                    .into_iter()
                    .filter_map(|(start, end)| Interval::try_from_pair(start, end))
                    .filter_map(|interval| interval.clip(&span))
                    .collect();
                Ok((flag.stream.clone(), intervals))
            })
            .collect()
    }
}

/// The segment source selected by configuration.
#[derive(Debug, Clone)]
pub enum SegmentProvider {
    DqSegDb(DqSegDbClient),
    File(SegmentFile),
}

impl SegmentProvider {
    pub fn from_config(config: &SegmentsConfig) -> Result<Self, QueryError> {
        match config.source {
            SegmentSourceKind::Dqsegdb => {
                let timeout = Duration::from_secs(config.timeout_secs);
                Ok(Self::DqSegDb(DqSegDbClient::new(&config.url, timeout)?))
            }
            SegmentSourceKind::File => {
                let path = config.file.clone().ok_or_else(|| {
                    QueryError::Misconfigured(
                        "segments.file must be set when segments.source = \"file\"".to_string(),
                    )
                })?;
                Ok(Self::File(SegmentFile::new(path)))
            }
        }
    }
}

impl SegmentSource for SegmentProvider {
    async fn query(&self, flags: &[StreamFlag], span: Interval) -> Result<StreamSegments, QueryError> {
        match self {
            Self::DqSegDb(client) => client.query(flags, span).await,
            Self::File(file) => file.query(flags, span).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path as UrlPath, Query};
    use axum::routing::get;
    use axum::{Json, Router};
    use rstest::rstest;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use tempfile::TempDir;

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        addr
    }

    async fn flag_handler(
        UrlPath((ifo, name, version)): UrlPath<(String, String, String)>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        assert_eq!(params.get("include").map(String::as_str), Some("active"));
        assert_eq!(name, "DMT-ANALYSIS_READY");
        assert_eq!(version, "1");
        let active = match ifo.as_str() {
            "H1" => json!([[0.0, 100.5], [150.0, 200.0]]),
            _ => json!([[49.2, 180.0]]),
        };
        Json(json!({ "ifo": ifo, "active": active, "known": [] }))
    }

    fn span(start: i64, end: i64) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[rstest]
    #[case("DMT-ANALYSIS_READY:1", Some(("DMT-ANALYSIS_READY", "1")))]
    #[case("DMT-ANALYSIS_READY", Some(("DMT-ANALYSIS_READY", "1")))]
    #[case("DMT-ANALYSIS_READY:x", None)]
    #[case(":1", None)]
    #[case("A:1:2", None)]
    fn test_flag_parsing(#[case] flag: &str, #[case] expected: Option<(&str, &str)>) {
        let flag = StreamFlag::new("H1", flag);
        assert_eq!(flag.name_and_version().ok(), expected);
    }

    #[tokio::test]
    async fn test_dqsegdb_query_rounds_inward_and_clips() {
        let router = Router::new().route("/dq/{ifo}/{name}/{version}", get(flag_handler));
        let addr = serve(router).await;
        let client =
            DqSegDbClient::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();

        let flags = [
            StreamFlag::new("H1", "DMT-ANALYSIS_READY:1"),
            StreamFlag::new("L1", "DMT-ANALYSIS_READY"),
        ];
        let segments = client.query(&flags, span(10, 190)).await.unwrap();

        assert_eq!(segments["H1"], vec![span(10, 100), span(150, 190)]);
        assert_eq!(segments["L1"], vec![span(50, 180)]);
    }

    #[tokio::test]
    async fn test_dqsegdb_http_error_is_a_query_error() {
        let addr = serve(Router::new()).await;
        let client =
            DqSegDbClient::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();

        let err = client
            .query(&[StreamFlag::new("H1", "DMT-ANALYSIS_READY:1")], span(0, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Http { .. }));
    }

    #[tokio::test]
    async fn test_segment_file_filters_streams_and_clips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("segments.json");
        std::fs::write(
            &path,
            r#"{"H1": [[0, 100], [150, 200], [300, 300]], "L1": [[50, 180]], "V1": [[0, 10]]}"#,
        )
        .unwrap();

        let source = SegmentFile::new(&path);
        let flags = [StreamFlag::new("H1", "READY"), StreamFlag::new("L1", "READY")];
        let segments = source.query(&flags, span(0, 160)).await.unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments["H1"], vec![span(0, 100), span(150, 160)]);
        assert_eq!(segments["L1"], vec![span(50, 160)]);
    }

    #[tokio::test]
    async fn test_segment_file_missing_stream() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("segments.json");
        std::fs::write(&path, r#"{"H1": [[0, 100]]}"#).unwrap();

        let err = SegmentFile::new(&path)
            .query(&[StreamFlag::new("K1", "READY")], span(0, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::MissingStream(stream) if stream == "K1"));
    }
}
