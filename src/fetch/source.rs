use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// NYT county-level case counts, refreshed daily upstream.
pub const DEFAULT_DATASET_URL: &str =
    "https://raw.githubusercontent.com/nytimes/covid-19-data/master/us-counties.csv";

/// Where the CSV body comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    Remote(Url),
    Local(PathBuf),
}

impl DataSource {
    /// `http://` and `https://` select a remote source, anything else is a path.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(trimmed).with_context(|| format!("parsing dataset URL {}", trimmed))?;
            Ok(DataSource::Remote(url))
        } else {
            Ok(DataSource::Local(PathBuf::from(trimmed)))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, DataSource::Remote(_))
    }
}

impl Default for DataSource {
    fn default() -> Self {
        // constant is a valid URL
        DataSource::Remote(Url::parse(DEFAULT_DATASET_URL).expect("default dataset URL parses"))
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Remote(url) => write!(f, "{}", url),
            DataSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_prefix_selects_remote() -> Result<()> {
        let src = DataSource::parse("https://example.com/data.csv")?;
        assert!(src.is_remote());
        assert_eq!(src.to_string(), "https://example.com/data.csv");

        let src = DataSource::parse("  HTTP://example.com/a.csv ")?;
        assert!(src.is_remote());
        Ok(())
    }

    #[test]
    fn anything_else_is_a_path() -> Result<()> {
        let src = DataSource::parse("data/us-counties.csv")?;
        assert_eq!(src, DataSource::Local(PathBuf::from("data/us-counties.csv")));
        Ok(())
    }

    #[test]
    fn default_points_at_nyt_csv() {
        assert_eq!(DataSource::default().to_string(), DEFAULT_DATASET_URL);
    }
}
