use crate::config::{NetworkConfig, PathsConfig};
use crate::error::{ProcessingError, Result};
use crate::fetch::noaa_client::{FileFetcher, HttpFetcher};
use crate::fetch::staging::write_plain;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct GeoIndex {
    features: Vec<GeoFeature>,
}

#[derive(Debug, Deserialize)]
struct GeoFeature {
    properties: GeoProperties,
}

#[derive(Debug, Deserialize)]
struct GeoProperties {
    title: String,
    #[serde(default)]
    epw: Option<String>,
}

/// One weather file listed in the EnergyPlus index.
#[derive(Debug, Clone, PartialEq)]
pub struct TmyEntry {
    pub title: String,
    pub epw_url: String,
}

/// `<COUNTRY>_[<STATE>_]<name with spaces replaced by '.'>`
pub fn lookup_string(country: &str, state: Option<&str>, name: &str) -> String {
    let mut lookup = format!("{}_", country.trim());
    if let Some(state) = state.map(str::trim).filter(|s| !s.is_empty()) {
        lookup.push_str(state);
        lookup.push('_');
    }
    lookup.push_str(&name.trim().replace(' ', "."));
    lookup
}

/// Pull the URL out of an `<a href=...>` fragment.
pub fn epw_url_from_link(link: &str) -> Option<String> {
    let after = link.split("href=").nth(1)?;
    let url = after.split('>').next()?.trim().trim_matches(|c| c == '"' || c == '\'');
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

pub fn parse_index(body: &[u8]) -> Result<Vec<TmyEntry>> {
    let index: GeoIndex = serde_json::from_slice(body)?;
    Ok(index
        .features
        .into_iter()
        .filter_map(|feature| {
            let url = feature.properties.epw.as_deref().and_then(epw_url_from_link)?;
            Some(TmyEntry {
                title: feature.properties.title,
                epw_url: url,
            })
        })
        .collect())
}

/// Pick the single entry whose title contains `lookup`. A title equal to
/// `lookup` is taken as is; any other multiple match is an error listing the
/// candidates.
pub fn select_entry<'a>(entries: &'a [TmyEntry], lookup: &str) -> Result<&'a TmyEntry> {
    let matches: Vec<&TmyEntry> = entries.iter().filter(|e| e.title.contains(lookup)).collect();

    match matches.len() {
        0 => Err(ProcessingError::NoStationMatch {
            query: lookup.to_string(),
        }),
        1 => Ok(matches[0]),
        _ => match matches.iter().find(|e| e.title == lookup) {
            Some(&exact) => Ok(exact),
            None => Err(ProcessingError::AmbiguousMatch {
                query: lookup.to_string(),
                candidates: matches.iter().map(|e| e.title.clone()).collect(),
            }),
        },
    }
}

fn collect_epw_files(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_epw_files(&path, found)?;
        } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("epw")) {
            found.push(path);
        }
    }
    Ok(())
}

/// Search `dir` recursively for an EPW whose name contains `lookup`.
pub fn locate_local_epw(dir: &Path, lookup: &str) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut files = Vec::new();
    collect_epw_files(dir, &mut files)?;
    let mut matches: Vec<PathBuf> = files
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(lookup))
        })
        .collect();
    matches.sort();

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        _ => Err(ProcessingError::AmbiguousMatch {
            query: lookup.to_string(),
            candidates: matches.iter().map(|p| p.display().to_string()).collect(),
        }),
    }
}

/// Finds TMY weather files, downloading them into the cache on first use.
pub struct TmyClient<F: FileFetcher> {
    fetcher: F,
    index_url: String,
    cache_dir: PathBuf,
}

impl TmyClient<HttpFetcher> {
    pub fn from_config(network: &NetworkConfig, paths: &PathsConfig) -> Result<Self> {
        Ok(Self::new(
            HttpFetcher::new(network.timeout())?,
            &network.tmy_index_url,
            paths.tmy_dir(),
        ))
    }
}

impl<F: FileFetcher> TmyClient<F> {
    pub fn new(fetcher: F, index_url: &str, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            index_url: index_url.to_string(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Path of the EPW matching `lookup`, from the cache or freshly downloaded.
    pub async fn locate(&self, lookup: &str) -> Result<PathBuf> {
        if let Some(path) = locate_local_epw(&self.cache_dir, lookup)? {
            debug!("Using cached TMY file {}", path.display());
            return Ok(path);
        }

        info!("Looking up {} in {}", lookup, self.index_url);
        let index = parse_index(&self.fetcher.fetch(&self.index_url).await?)?;
        let entry = select_entry(&index, lookup)?;

        let file_name = entry
            .epw_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ProcessingError::InvalidFormat(format!("no file name in {}", entry.epw_url)))?;
        let path = self.cache_dir.join(file_name);

        let body = self.fetcher.fetch(&entry.epw_url).await?;
        if body.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "empty response from {}",
                entry.epw_url
            )));
        }
        write_plain(&body, &path)?;
        info!("Saved {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const INDEX_URL: &str = "https://example.test/master.geojson";
    const EPW_URL: &str =
        "https://example.test/USA/NY/USA_NY_New.York-J.F.Kennedy.Intl.AP.744860_TMY3.epw";

    fn index_json() -> String {
        format!(
            r#"{{"type":"FeatureCollection","features":[
                {{"type":"Feature","properties":{{"title":"USA_NY_New.York-J.F.Kennedy.Intl.AP.744860_TMY3","epw":"<a href={}>Download Weather File</a>"}}}},
                {{"type":"Feature","properties":{{"title":"USA_NY_New.York-J.F.Kennedy.Intl.AP.744860_TMY","epw":"<a href=https://example.test/jfk_tmy.epw>Download Weather File</a>"}}}},
                {{"type":"Feature","properties":{{"title":"USA_NY_New.York-LaGuardia.AP.725030_TMY3","epw":"<a href=https://example.test/lga.epw>Download Weather File</a>"}}}},
                {{"type":"Feature","properties":{{"title":"USA_NY_New.York-LaGuardia.AP.725030_TMY3","epw":"<a href=https://example.test/lga2.epw>Download Weather File</a>"}}}}
            ]}}"#,
            EPW_URL
        )
    }

    #[derive(Default)]
    struct MockFetcher {
        bodies: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FileFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| ProcessingError::MissingData(url.to_string()))
        }
    }

    #[test]
    fn test_lookup_string() {
        assert_eq!(
            lookup_string("USA", Some("NY"), "New York-J F Kennedy Intl AP"),
            "USA_NY_New.York-J.F.Kennedy.Intl.AP"
        );
        assert_eq!(lookup_string("FRA", None, "Paris-Orly"), "FRA_Paris-Orly");
        assert_eq!(lookup_string("FRA", Some(""), "Paris-Orly"), "FRA_Paris-Orly");
    }

    #[test]
    fn test_epw_url_from_link() {
        assert_eq!(
            epw_url_from_link("<a href=https://example.test/a.epw>Download</a>").as_deref(),
            Some("https://example.test/a.epw")
        );
        assert_eq!(
            epw_url_from_link("<a href=\"https://example.test/b.epw\">x</a>").as_deref(),
            Some("https://example.test/b.epw")
        );
        assert_eq!(epw_url_from_link("no link"), None);
    }

    #[test]
    fn test_select_unique_and_exact_titles() {
        let entries = parse_index(index_json().as_bytes()).unwrap();
        assert_eq!(entries.len(), 4);

        let entry = select_entry(&entries, "USA_NY_New.York-J.F.Kennedy.Intl.AP.744860_TMY3").unwrap();
        assert_eq!(entry.epw_url, EPW_URL);

        // "..._TMY" is also a prefix of the TMY3 title; the exact title decides.
        let entry = select_entry(&entries, "USA_NY_New.York-J.F.Kennedy.Intl.AP.744860_TMY").unwrap();
        assert_eq!(entry.epw_url, "https://example.test/jfk_tmy.epw");
    }

    #[test]
    fn test_select_never_guesses_between_series() {
        let entries = parse_index(index_json().as_bytes()).unwrap();

        match select_entry(&entries, "USA_NY_New.York-J.F.Kennedy.Intl.AP") {
            Err(ProcessingError::AmbiguousMatch { candidates, .. }) => assert_eq!(
                candidates,
                vec![
                    "USA_NY_New.York-J.F.Kennedy.Intl.AP.744860_TMY3".to_string(),
                    "USA_NY_New.York-J.F.Kennedy.Intl.AP.744860_TMY".to_string(),
                ]
            ),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_select_reports_ambiguity_and_absence() {
        let entries = parse_index(index_json().as_bytes()).unwrap();

        match select_entry(&entries, "USA_NY_New.York-LaGuardia") {
            Err(ProcessingError::AmbiguousMatch { candidates, .. }) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other),
        }
        assert!(matches!(
            select_entry(&entries, "GBR_London"),
            Err(ProcessingError::NoStationMatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_locate_downloads_then_uses_cache() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = MockFetcher::default();
        fetcher.bodies.insert(INDEX_URL.to_string(), index_json().into_bytes());
        fetcher.bodies.insert(EPW_URL.to_string(), b"LOCATION,JFK\n".to_vec());

        let client = TmyClient::new(fetcher, INDEX_URL, dir.path().join("tmy"));
        let lookup = "USA_NY_New.York-J.F.Kennedy.Intl.AP.744860_TMY3";

        let first = client.locate(lookup).await.unwrap();
        assert_eq!(
            first,
            dir.path().join("tmy/USA_NY_New.York-J.F.Kennedy.Intl.AP.744860_TMY3.epw")
        );
        assert_eq!(client.fetcher().calls.load(Ordering::SeqCst), 2);

        let second = client.locate(lookup).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(client.fetcher().calls.load(Ordering::SeqCst), 2);
    }
}
