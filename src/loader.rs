//! Loading of the box and block data sets.
//!
//! Each data set is a JSON array of records and can come from an
//! `http(s)://` URL or from a local file. Records are validated here, before
//! they reach the engine, unless validation is switched off.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio_stream::StreamExt;

use crate::config::LoaderConfig;
use crate::model::{BlockRecord, BoxRecord, Record, ValidationError, validate_records};

fn user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    format!("ffd-packer/{version} ({os}; {arch})")
}

/// Location of a data set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    Url(String),
    File(PathBuf),
}

impl DataSource {
    /// Interprets `http://` and `https://` values as URLs, everything else as a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Url(url) => write!(f, "{}", url),
            DataSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Errors while loading a data set.
#[derive(Debug)]
pub enum LoadError {
    Http(reqwest::Error),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        source: String,
        error: serde_json::Error,
    },
    TooLarge {
        source: String,
        limit_bytes: u64,
    },
    Invalid(ValidationError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Http(err) => write!(f, "HTTP request failed: {}", err),
            LoadError::Io { path, source } => {
                write!(f, "Could not read {}: {}", path.display(), source)
            }
            LoadError::Parse { source, error } => {
                write!(f, "Could not parse records from {}: {}", source, error)
            }
            LoadError::TooLarge {
                source,
                limit_bytes,
            } => write!(
                f,
                "Data set {} exceeds the download limit of {} MB",
                source,
                limit_bytes / (1024 * 1024)
            ),
            LoadError::Invalid(err) => write!(f, "Invalid records: {}", err),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Http(err) => Some(err),
            LoadError::Io { source, .. } => Some(source),
            LoadError::Parse { error, .. } => Some(error),
            LoadError::TooLarge { .. } => None,
            LoadError::Invalid(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        LoadError::Http(err)
    }
}

impl From<ValidationError> for LoadError {
    fn from(err: ValidationError) -> Self {
        LoadError::Invalid(err)
    }
}

/// Builds the HTTP client used for URL sources.
pub fn http_client(config: &LoaderConfig) -> Result<reqwest::Client, LoadError> {
    let client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .user_agent(user_agent())
        .build()?;
    Ok(client)
}

/// Loads both data sets concurrently.
pub async fn load_inputs(
    config: &LoaderConfig,
) -> Result<(Vec<BoxRecord>, Vec<BlockRecord>), LoadError> {
    let client = http_client(config)?;
    let boxes_source = DataSource::parse(config.boxes_source());
    let blocks_source = DataSource::parse(config.blocks_source());

    let (boxes, blocks) = tokio::try_join!(
        load_records::<BoxRecord>(&client, &boxes_source, config),
        load_records::<BlockRecord>(&client, &blocks_source, config),
    )?;

    println!(
        "📥 Loaded {} boxes from {} and {} blocks from {}",
        boxes.len(),
        boxes_source,
        blocks.len(),
        blocks_source
    );
    Ok((boxes, blocks))
}

/// Loads and (optionally) validates one data set.
pub async fn load_records<T>(
    client: &reqwest::Client,
    source: &DataSource,
    config: &LoaderConfig,
) -> Result<Vec<T>, LoadError>
where
    T: Record + DeserializeOwned,
{
    let limit = config.max_download_bytes();
    let bytes = match source {
        DataSource::Url(url) => fetch_bytes(client, url, limit).await?,
        DataSource::File(path) => read_file(path, limit).await?,
    };

    let records: Vec<T> = serde_json::from_slice(&bytes).map_err(|error| LoadError::Parse {
        source: source.to_string(),
        error,
    })?;

    if config.validate_input() {
        validate_records(&records)?;
    }
    Ok(records)
}

async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    limit: Option<u64>,
) -> Result<Vec<u8>, LoadError> {
    let response = client.get(url).send().await?.error_for_status()?;
    let too_large = |limit_bytes| LoadError::TooLarge {
        source: url.to_string(),
        limit_bytes,
    };

    if let (Some(limit_bytes), Some(content_length)) = (limit, response.content_length()) {
        if content_length > limit_bytes {
            return Err(too_large(limit_bytes));
        }
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if let Some(limit_bytes) = limit {
            if (body.len() + chunk.len()) as u64 > limit_bytes {
                return Err(too_large(limit_bytes));
            }
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

async fn read_file(path: &Path, limit: Option<u64>) -> Result<Vec<u8>, LoadError> {
    let io_error = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(limit_bytes) = limit {
        let metadata = tokio::fs::metadata(path).await.map_err(io_error)?;
        if metadata.len() > limit_bytes {
            return Err(LoadError::TooLarge {
                source: path.display().to_string(),
                limit_bytes,
            });
        }
    }

    tokio::fs::read(path).await.map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dims;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    fn file_config(
        boxes: &tempfile::NamedTempFile,
        blocks: &tempfile::NamedTempFile,
    ) -> LoaderConfig {
        LoaderConfig::new(
            boxes.path().display().to_string(),
            blocks.path().display().to_string(),
        )
    }

    #[test]
    fn data_source_parse() {
        assert_eq!(
            DataSource::parse("https://example.com/boxes.json"),
            DataSource::Url("https://example.com/boxes.json".to_string())
        );
        assert_eq!(
            DataSource::parse("HTTP://example.com/x"),
            DataSource::Url("HTTP://example.com/x".to_string())
        );
        assert_eq!(
            DataSource::parse(" data/blocks.json "),
            DataSource::File(PathBuf::from("data/blocks.json"))
        );
    }

    #[tokio::test]
    async fn loads_both_data_sets_from_files() {
        let boxes = write_temp(
            r#"[{"length": 10, "width": 10, "height": 10, "boxid": "B1"},
                {"length": 4, "width": 5, "height": 6, "boxid": "B2"}]"#,
        );
        let blocks = write_temp(r#"[{"length": 5, "width": 5, "height": 5, "blockid": "b1"}]"#);

        let (boxes, blocks) = load_inputs(&file_config(&boxes, &blocks))
            .await
            .expect("inputs should load");
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[1].id, "B2");
        assert_eq!(boxes[1].dims, Dims::new(4.0, 5.0, 6.0));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].id, "b1");
    }

    #[tokio::test]
    async fn rejects_duplicate_ids_when_validating() {
        let boxes = write_temp(r#"[{"length": 1, "width": 1, "height": 1, "boxid": "B1"}]"#);
        let blocks = write_temp(
            r#"[{"length": 1, "width": 1, "height": 1, "blockid": "b1"},
                {"length": 2, "width": 2, "height": 2, "blockid": "b1"}]"#,
        );

        let err = load_inputs(&file_config(&boxes, &blocks))
            .await
            .expect_err("duplicate ids must be rejected");
        assert!(matches!(
            err,
            LoadError::Invalid(ValidationError::DuplicateIdentifier(_))
        ));

        let lenient = file_config(&boxes, &blocks).with_validation(false);
        let (_, blocks) = load_inputs(&lenient)
            .await
            .expect("validation disabled");
        assert_eq!(blocks.len(), 2);
    }

    #[tokio::test]
    async fn rejects_negative_dimensions() {
        let file = write_temp(r#"[{"length": -1, "width": 1, "height": 1, "boxid": "B1"}]"#);
        let config = LoaderConfig::new(file.path().display().to_string(), "unused");
        let client = http_client(&config).expect("client");
        let err = load_records::<BoxRecord>(
            &client,
            &DataSource::parse(config.boxes_source()),
            &config,
        )
        .await
        .expect_err("negative length must be rejected");
        assert!(matches!(
            err,
            LoadError::Invalid(ValidationError::InvalidDimension(_))
        ));
    }

    #[tokio::test]
    async fn reports_parse_errors_with_source() {
        let file = write_temp("{ not json");
        let config = LoaderConfig::new(file.path().display().to_string(), "unused");
        let client = http_client(&config).expect("client");
        let source = DataSource::parse(config.boxes_source());
        let err = load_records::<BoxRecord>(&client, &source, &config)
            .await
            .expect_err("malformed JSON must fail");
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.to_string().contains(&source.to_string()));
    }

    #[tokio::test]
    async fn enforces_size_limit_for_files() {
        let file = write_temp(r#"[{"length": 1, "width": 1, "height": 1, "blockid": "b1"}]"#);
        let config = LoaderConfig::new("unused", file.path().display().to_string())
            .with_max_download_bytes(Some(8));
        let client = http_client(&config).expect("client");
        let err = load_records::<BlockRecord>(
            &client,
            &DataSource::parse(config.blocks_source()),
            &config,
        )
        .await
        .expect_err("file exceeds limit");
        assert!(matches!(err, LoadError::TooLarge { limit_bytes: 8, .. }));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.json");
        let config = LoaderConfig::new(path.display().to_string(), "unused");
        let client = http_client(&config).expect("client");
        let err = load_records::<BoxRecord>(&client, &DataSource::File(path), &config)
            .await
            .expect_err("missing file");
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
