use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use shared::domain::DocumentNaming;
use tracing::{debug, warn};
use url::Url;
use viewer_core::{ResponsePolicy, ViewerConfig, DEFAULT_TOTAL_PAGES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub source: String,
    pub total_pages: u32,
    pub document_prefix: String,
    pub document_extension: String,
    pub response_policy: ResponsePolicy,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        let naming = DocumentNaming::default();
        Self {
            source: "http://127.0.0.1:8000/".into(),
            total_pages: DEFAULT_TOTAL_PAGES,
            document_prefix: naming.prefix,
            document_extension: naming.extension,
            response_policy: ResponsePolicy::Strict,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn viewer_config(&self) -> ViewerConfig {
        ViewerConfig {
            total_pages: self.total_pages,
            naming: DocumentNaming {
                prefix: self.document_prefix.clone(),
                extension: self.document_extension.clone(),
            },
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn chapter_source(&self) -> anyhow::Result<ChapterSource> {
        ChapterSource::parse(&self.source)
    }
}

/// Where chapters come from: a hosted base path or a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterSource {
    Http(Url),
    Directory(PathBuf),
}

impl ChapterSource {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(anyhow!("chapter source must not be empty"));
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = Url::parse(raw).with_context(|| format!("invalid chapter url '{raw}'"))?;
            return Ok(Self::Http(url));
        }

        if let Some(path) = raw.strip_prefix("file://") {
            return Ok(Self::Directory(PathBuf::from(path)));
        }

        Ok(Self::Directory(PathBuf::from(raw)))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    source: Option<String>,
    total_pages: Option<u32>,
    document_prefix: Option<String>,
    document_extension: Option<String>,
    response_policy: Option<ResponsePolicy>,
    request_timeout_secs: Option<u64>,
}

pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file_settings(&mut settings, &raw)
            .with_context(|| format!("failed to parse config '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("config: no file at {}, using defaults", path.display());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config '{}'", path.display()))
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.source {
        settings.source = v;
    }
    if let Some(v) = file_cfg.total_pages {
        settings.total_pages = v;
    }
    if let Some(v) = file_cfg.document_prefix {
        settings.document_prefix = v;
    }
    if let Some(v) = file_cfg.document_extension {
        settings.document_extension = v;
    }
    if let Some(v) = file_cfg.response_policy {
        settings.response_policy = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = Some(v);
    }

    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("VIEWER__SOURCE") {
        settings.source = v;
    }

    if let Some(v) = var("VIEWER__TOTAL_PAGES") {
        match v.parse::<u32>() {
            Ok(parsed) => settings.total_pages = parsed,
            Err(_) => warn!("config: ignoring VIEWER__TOTAL_PAGES={v}, not a page count"),
        }
    }

    if let Some(v) = var("VIEWER__DOCUMENT_PREFIX") {
        settings.document_prefix = v;
    }
    if let Some(v) = var("VIEWER__DOCUMENT_EXTENSION") {
        settings.document_extension = v;
    }

    if let Some(v) = var("VIEWER__RESPONSE_POLICY") {
        match v.parse::<ResponsePolicy>() {
            Ok(parsed) => settings.response_policy = parsed,
            Err(err) => warn!("config: ignoring VIEWER__RESPONSE_POLICY: {err}"),
        }
    }

    if let Some(v) = var("VIEWER__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = Some(parsed),
            Err(_) => warn!("config: ignoring VIEWER__REQUEST_TIMEOUT_SECS={v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = load_settings(&dir.path().join("viewer.toml")).expect("load");
        assert_eq!(settings.total_pages, 17);
        assert_eq!(settings.viewer_config(), ViewerConfig::default());
        assert_eq!(settings.response_policy, ResponsePolicy::Strict);
        assert_eq!(settings.request_timeout(), None);
    }

    #[test]
    fn file_values_replace_defaults() {
        let mut settings = Settings::default();
        apply_file_settings(
            &mut settings,
            r#"
                source = "./chapters"
                total_pages = 5
                document_prefix = "CHAPTER_"
                response_policy = "permissive"
                request_timeout_secs = 10
            "#,
        )
        .expect("parse");

        assert_eq!(settings.total_pages, 5);
        assert_eq!(settings.response_policy, ResponsePolicy::Permissive);
        assert_eq!(settings.request_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(
            settings
                .viewer_config()
                .naming
                .document_for(shared::domain::PageNumber(2))
                .as_str(),
            "CHAPTER_2.md"
        );
        assert_eq!(
            settings.chapter_source().expect("source"),
            ChapterSource::Directory(PathBuf::from("./chapters"))
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        fs::write(&path, "total_pages = \"many\"").expect("write");

        let err = load_settings(&path).expect_err("must fail");
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut settings = Settings::default();
        assert!(apply_file_settings(&mut settings, "bind_addr = \"0.0.0.0\"").is_err());
    }

    #[test]
    fn env_overrides_file_and_skips_bad_values() {
        let mut settings = Settings::default();
        apply_file_settings(&mut settings, "total_pages = 5").expect("parse");
        apply_env_overrides(
            &mut settings,
            env_from(&[
                ("VIEWER__SOURCE", "https://docs.example.com/tutorial"),
                ("VIEWER__TOTAL_PAGES", "12"),
                ("VIEWER__RESPONSE_POLICY", "sometimes"),
                ("VIEWER__REQUEST_TIMEOUT_SECS", "soon"),
            ]),
        );

        assert_eq!(settings.total_pages, 12);
        assert_eq!(settings.response_policy, ResponsePolicy::Strict);
        assert_eq!(settings.request_timeout_secs, None);
        match settings.chapter_source().expect("source") {
            ChapterSource::Http(url) => assert_eq!(url.host_str(), Some("docs.example.com")),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_means_no_timeout() {
        let settings = Settings {
            request_timeout_secs: Some(0),
            ..Settings::default()
        };
        assert_eq!(settings.request_timeout(), None);
    }

    #[test]
    fn parses_chapter_sources() {
        assert_eq!(
            ChapterSource::parse("file:///srv/book").expect("file"),
            ChapterSource::Directory(PathBuf::from("/srv/book"))
        );
        assert!(matches!(
            ChapterSource::parse(" http://localhost:8000/ ").expect("http"),
            ChapterSource::Http(_)
        ));
        assert!(ChapterSource::parse("   ").is_err());
        assert!(ChapterSource::parse("http://exa mple.com").is_err());
    }
}
