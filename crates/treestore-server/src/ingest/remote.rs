//! Remote loader: paginated Paris open-data records.
//!
//! Pages are requested with `limit`/`offset` until the corpus is covered.
//! Records get id `index * 10`, where `index` is 1-based over all pages
//! concatenated, so the whole dataset lands in the dataset partition.
//!
//! Nothing reaches the store until every page has been fetched: a failure
//! on any page means this source contributes no records. Inside a page,
//! one record that cannot be mapped is skipped on its own. It still uses
//! up its index, so later ids do not shift.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use treestore_core::{Tree, TreeStore, DATASET_ID_STRIDE};

use crate::config::RemoteConfig;
use crate::error::{ServiceError, ServiceResult};

/// `geom_x_y` of an external record
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct GeoPoint {
    #[serde(default, deserialize_with = "lenient_number")]
    pub lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lat: Option<f64>,
}

/// One record as the open-data API serves it.
///
/// Only the fields the catalog maps are declared; the rest are ignored.
/// Every field tolerates being absent, null, or of the other scalar type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteTree {
    pub geom_x_y: Option<GeoPoint>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub arbres_libellefrancais: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub arbres_adresse: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub arbres_circonferenceencm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub arbres_hauteurenm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub arbres_stadedeveloppement: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub arbres_genre: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub arbres_espece: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub arbres_varieteoucultivar: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_site: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_adresse: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_arrondissement: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_nom_usuel: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_nom_latin: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_annee_plantation: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_qualification_rem: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_resume: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_descriptif: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_url_pdf: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub com_url_photo1: Option<String>,
}

/// One page of the records endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    /// Corpus size as reported by the server
    #[serde(default)]
    pub total_count: Option<usize>,
    /// Raw records, mapped one by one so a bad record cannot sink the page
    #[serde(default)]
    pub results: Vec<Value>,
}

/// Anything that can serve pages of the remote dataset.
pub trait PageSource: Send + Sync {
    /// Fetch up to `limit` records starting at `offset`.
    fn fetch(&self, offset: usize, limit: usize) -> ServiceResult<Page>;
}

/// `PageSource` over HTTP with a blocking client.
pub struct HttpPageSource {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpPageSource {
    /// Client for `config.endpoint`, each request bounded by `config.timeout`.
    pub fn new(config: &RemoteConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Self {
            agent,
            endpoint: config.endpoint.clone(),
        }
    }

    fn remote_error(&self, reason: String) -> ServiceError {
        ServiceError::Remote {
            url: self.endpoint.clone(),
            reason,
        }
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&self, offset: usize, limit: usize) -> ServiceResult<Page> {
        debug!(endpoint = %self.endpoint, offset, limit, "requesting dataset page");
        let response = self
            .agent
            .get(&self.endpoint)
            .query("limit", limit.to_string())
            .query("offset", offset.to_string())
            .call()
            .map_err(|e| self.remote_error(format!("request at offset {} failed: {}", offset, e)))?;

        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| self.remote_error(format!("failed reading page body: {}", e)))?;

        serde_json::from_str(&body)
            .map_err(|e| self.remote_error(format!("failed parsing page at offset {}: {}", offset, e)))
    }
}

impl RemoteTree {
    /// Map to the catalog schema under `id`.
    ///
    /// The name is the French label, else the common name, else the latin
    /// name. `None` when all three are blank.
    pub fn into_tree(self, id: u64) -> Option<Tree> {
        let address = non_blank(self.com_adresse)
            .or_else(|| non_blank(self.com_site))
            .or_else(|| non_blank(self.arbres_adresse.clone()));
        let address_bis = non_blank(self.arbres_adresse).map(|raw| {
            match non_blank(self.com_arrondissement) {
                Some(district) => format!("{}(district {})", raw, district),
                None => raw,
            }
        });
        let name = non_blank(self.arbres_libellefrancais)
            .or_else(|| non_blank(self.com_nom_usuel.clone()))
            .or_else(|| non_blank(self.com_nom_latin.clone()))?;
        let geom = self.geom_x_y.unwrap_or_default();

        Some(Tree {
            id,
            name,
            common_name: self.com_nom_usuel,
            botanic_name: self.com_nom_latin,
            height: self.arbres_hauteurenm,
            circumference: self.arbres_circonferenceencm,
            development_stage: self.arbres_stadedeveloppement,
            plantation_year: self
                .com_annee_plantation
                .and_then(|year| year.trim().parse::<i32>().ok()),
            outstanding_qualification: self.com_qualification_rem,
            summary: self.com_resume,
            description: self.com_descriptif,
            genus: self.arbres_genre,
            species: self.arbres_espece,
            variety: self.arbres_varieteoucultivar,
            sign: self.com_url_pdf,
            picture: self.com_url_photo1,
            longitude: geom.lon,
            latitude: geom.lat,
            address,
            address_bis,
        })
    }
}

/// Fetch and map the whole corpus.
///
/// The corpus size is the first page's `total_count` when the server sends
/// one, `config.corpus_size` otherwise. An empty page ends the walk early.
pub fn fetch_all(source: &dyn PageSource, config: &RemoteConfig) -> ServiceResult<Vec<Tree>> {
    let mut trees: Vec<Tree> = Vec::new();
    let mut corpus_size = config.corpus_size;
    let mut offset = 0;
    let mut position: u64 = 0;

    while offset < corpus_size {
        let page = source.fetch(offset, config.page_size)?;
        if offset == 0 {
            if let Some(total) = page.total_count {
                corpus_size = total;
            }
        }
        if page.results.is_empty() {
            break;
        }
        for record in page.results {
            position += 1;
            match map_record(record, position * DATASET_ID_STRIDE) {
                Ok(tree) => trees.push(tree),
                Err(reason) => warn!(position, reason = %reason, "skipping remote record"),
            }
        }
        offset += config.page_size;
    }
    Ok(trees)
}

fn map_record(record: Value, id: u64) -> Result<Tree, String> {
    let remote: RemoteTree = serde_json::from_value(record).map_err(|e| e.to_string())?;
    remote.into_tree(id).ok_or_else(|| "record has no name".to_string())
}

/// Load the remote dataset into the store. Returns how many records were inserted.
///
/// Never fails: network or parse errors are logged and contribute nothing.
pub fn load_remote(store: &TreeStore, source: &dyn PageSource, config: &RemoteConfig) -> usize {
    let trees = match fetch_all(source, config) {
        Ok(trees) => trees,
        Err(e) => {
            warn!(error = %e, "remote ingestion skipped");
            return 0;
        }
    };

    let count = trees.len();
    for tree in trees {
        store.insert_with_id(tree);
    }
    info!(endpoint = %config.endpoint, count, "loaded remote trees");
    count
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// String field that the API sometimes serves as a number.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Numeric field that the API sometimes serves as a string.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn record(name: &str) -> Value {
        json!({
            "arbres_libellefrancais": name,
            "arbres_adresse": "GRANDE CASCADE - CARREFOUR DE LONGCHAMP",
            "arbres_hauteurenm": 25.0,
            "arbres_circonferenceencm": 468.0,
            "com_adresse": "Carrefour de Longchamp",
            "com_site": "Bois de Boulogne. Grande Cascade",
            "com_arrondissement": "16",
            "com_annee_plantation": "1862",
            "geom_x_y": {"lon": 2.2404811309796573, "lat": 48.86339073126113}
        })
    }

    /// Serves `total` records in pages, recording every requested offset.
    struct FakePages {
        total: usize,
        report_total: bool,
        fail_at: Option<usize>,
        offsets: Mutex<Vec<usize>>,
    }

    impl FakePages {
        fn new(total: usize) -> Self {
            Self { total, report_total: true, fail_at: None, offsets: Mutex::new(Vec::new()) }
        }
    }

    impl PageSource for FakePages {
        fn fetch(&self, offset: usize, limit: usize) -> ServiceResult<Page> {
            self.offsets.lock().push(offset);
            if self.fail_at == Some(offset) {
                return Err(ServiceError::Remote { url: "fake".into(), reason: "boom".into() });
            }
            let end = (offset + limit).min(self.total);
            let results = (offset..end)
                .map(|i| record(&format!("Arbre {}", i + 1)))
                .collect();
            Ok(Page {
                total_count: self.report_total.then_some(self.total),
                results,
            })
        }
    }

    fn remote_config(page_size: usize, corpus_size: usize) -> RemoteConfig {
        RemoteConfig { page_size, corpus_size, ..RemoteConfig::default() }
    }

    #[test]
    fn test_mapping() {
        let remote: RemoteTree = serde_json::from_value(record("Cèdre")).unwrap();
        let tree = remote.into_tree(10).unwrap();
        assert_eq!(tree.id, 10);
        assert_eq!(tree.name, "Cèdre");
        assert_eq!(tree.height, Some(25.0));
        assert_eq!(tree.circumference, Some(468.0));
        assert_eq!(tree.plantation_year, Some(1862));
        assert_eq!(tree.address.as_deref(), Some("Carrefour de Longchamp"));
        assert_eq!(
            tree.address_bis.as_deref(),
            Some("GRANDE CASCADE - CARREFOUR DE LONGCHAMP(district 16)")
        );
        assert_eq!(tree.longitude, Some(2.2404811309796573));
        assert_eq!(tree.latitude, Some(48.86339073126113));
    }

    #[test]
    fn test_address_fallbacks() {
        let mut value = record("If");
        value["com_adresse"] = json!("  ");
        let tree = serde_json::from_value::<RemoteTree>(value.clone()).unwrap().into_tree(10).unwrap();
        assert_eq!(tree.address.as_deref(), Some("Bois de Boulogne. Grande Cascade"));

        value["com_site"] = Value::Null;
        let tree = serde_json::from_value::<RemoteTree>(value).unwrap().into_tree(10).unwrap();
        assert_eq!(tree.address.as_deref(), Some("GRANDE CASCADE - CARREFOUR DE LONGCHAMP"));
    }

    #[test]
    fn test_lenient_fields() {
        let remote: RemoteTree = serde_json::from_value(json!({
            "arbres_libellefrancais": "Platane",
            "arbres_hauteurenm": "30",
            "com_arrondissement": 12,
            "arbres_adresse": "AVENUE DAUMESNIL",
            "com_annee_plantation": "Inconnue"
        }))
        .unwrap();
        let tree = remote.into_tree(20).unwrap();
        assert_eq!(tree.height, Some(30.0));
        assert_eq!(tree.plantation_year, None);
        assert_eq!(tree.address_bis.as_deref(), Some("AVENUE DAUMESNIL(district 12)"));
    }

    #[test]
    fn test_name_fallbacks() {
        let tree = RemoteTree {
            com_nom_latin: Some("Fagus sylvatica".into()),
            ..RemoteTree::default()
        }
        .into_tree(10)
        .unwrap();
        assert_eq!(tree.name, "Fagus sylvatica");

        let nameless = RemoteTree {
            arbres_libellefrancais: Some(" ".into()),
            com_resume: Some("x".into()),
            ..RemoteTree::default()
        };
        assert!(nameless.into_tree(10).is_none());
    }

    #[test]
    fn test_partial_geometry() {
        let mut value = record("Orme");
        value["geom_x_y"] = json!({"lon": 2.24});
        let tree = serde_json::from_value::<RemoteTree>(value).unwrap().into_tree(10).unwrap();
        assert_eq!(tree.longitude, Some(2.24));
        assert_eq!(tree.latitude, None);
    }

    /// Serves one fixed page of raw records.
    struct OnePage(Vec<Value>);

    impl PageSource for OnePage {
        fn fetch(&self, offset: usize, _limit: usize) -> ServiceResult<Page> {
            let results = if offset == 0 { self.0.clone() } else { Vec::new() };
            Ok(Page { total_count: Some(self.0.len()), results })
        }
    }

    #[test]
    fn test_bad_record_skipped_alone() {
        let mut odd = record("Bizarre");
        odd["geom_x_y"] = json!("48.8,2.3");
        let pages = OnePage(vec![
            record("Cèdre"),
            odd,
            json!({"com_resume": "sans nom"}),
            record("Platane"),
        ]);

        let store = TreeStore::new();
        assert_eq!(load_remote(&store, &pages, &remote_config(100, 200)), 2);
        assert_eq!(store.get(10).unwrap().name, "Cèdre");
        assert!(!store.contains(20));
        assert!(!store.contains(30));
        assert_eq!(store.get(40).unwrap().name, "Platane");
    }

    #[test]
    fn test_fetch_all_paginates() {
        let pages = FakePages::new(250);
        let trees = fetch_all(&pages, &remote_config(100, 200)).unwrap();
        // Server-reported total wins over the configured corpus size
        assert_eq!(trees.len(), 250);
        assert_eq!(*pages.offsets.lock(), vec![0, 100, 200]);
        assert_eq!(trees[0].id, 10);
        assert_eq!(trees[0].name, "Arbre 1");
        assert_eq!(trees[249].id, 2500);
        assert_eq!(trees[100].name, "Arbre 101");
        assert_eq!(trees[100].id, 1010);
    }

    #[test]
    fn test_fetch_all_configured_corpus() {
        let mut pages = FakePages::new(500);
        pages.report_total = false;
        let trees = fetch_all(&pages, &remote_config(100, 200)).unwrap();
        assert_eq!(trees.len(), 200);
        assert_eq!(*pages.offsets.lock(), vec![0, 100]);
    }

    #[test]
    fn test_fetch_all_stops_on_empty_page() {
        let mut pages = FakePages::new(30);
        pages.report_total = false;
        let trees = fetch_all(&pages, &remote_config(20, 200)).unwrap();
        assert_eq!(trees.len(), 30);
        assert_eq!(*pages.offsets.lock(), vec![0, 20, 40]);
    }

    #[test]
    fn test_failure_loads_nothing() {
        let mut pages = FakePages::new(250);
        pages.fail_at = Some(200);
        let store = TreeStore::new();
        assert_eq!(load_remote(&store, &pages, &remote_config(100, 200)), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_remote_dataset_partition() {
        let pages = FakePages::new(42);
        let store = TreeStore::new();
        assert_eq!(load_remote(&store, &pages, &remote_config(10, 200)), 42);
        assert!(store.list().iter().all(|t| t.id % 10 == 0));
        assert!(store.contains(420));
    }
}
