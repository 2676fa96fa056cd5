//! Media source classification: stored upload vs. external link.

use url::Url;

use crate::domain::error::DomainError;

/// Hostnames served by the upload service. A URL is a stored file when its
/// host equals one of these or is a subdomain of one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageHosts {
    hosts: Vec<String>,
}

impl StorageHosts {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|host| host.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|host| !host.is_empty())
            .collect();
        Self { hosts }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn is_storage_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.hosts.iter().any(|known| {
            host == *known
                || host
                    .strip_suffix(known.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Classify `raw` into exactly one of `fileUrl` / `externalLink`.
    pub fn classify(&self, raw: &str) -> Result<MediaSource, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("mediaUrl must not be empty"));
        }

        let parsed = Url::parse(trimmed)
            .map_err(|err| DomainError::validation(format!("mediaUrl is not a valid URL: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DomainError::validation("mediaUrl must use http or https"));
        }

        let stored = parsed
            .host_str()
            .is_some_and(|host| self.is_storage_host(host));

        if stored {
            Ok(MediaSource::File(trimmed.to_string()))
        } else {
            Ok(MediaSource::External(trimmed.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    File(String),
    External(String),
}

impl MediaSource {
    /// Split into the `(file_url, external_link)` column pair.
    pub fn into_columns(self) -> (Option<String>, Option<String>) {
        match self {
            MediaSource::File(url) => (Some(url), None),
            MediaSource::External(url) => (None, Some(url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> StorageHosts {
        StorageHosts::new(["utfs.io", "ufs.sh"])
    }

    #[test]
    fn storage_host_url_becomes_file_url() {
        let source = hosts()
            .classify("https://utfs.io/f/abc123.mp3")
            .expect("valid url");
        assert_eq!(
            source.into_columns(),
            (Some("https://utfs.io/f/abc123.mp3".to_string()), None)
        );
    }

    #[test]
    fn storage_subdomain_is_recognised() {
        let source = hosts().classify("https://x7.ufs.sh/f/key").unwrap();
        assert!(matches!(source, MediaSource::File(_)));
    }

    #[test]
    fn foreign_host_becomes_external_link() {
        let source = hosts()
            .classify("https://www.youtube.com/watch?v=abc")
            .unwrap();
        assert_eq!(
            source.into_columns(),
            (None, Some("https://www.youtube.com/watch?v=abc".to_string()))
        );
    }

    #[test]
    fn lookalike_host_is_not_storage() {
        assert!(!hosts().is_storage_host("notutfs.io"));
        assert!(!hosts().is_storage_host("utfs.io.evil.example"));
    }

    #[test]
    fn malformed_urls_are_rejected() {
        assert!(hosts().classify("").is_err());
        assert!(hosts().classify("not a url").is_err());
        assert!(hosts().classify("ftp://utfs.io/file").is_err());
    }
}
