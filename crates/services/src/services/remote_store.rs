//! [`EntityStore`] adapter for the hosted backend-as-a-service document
//! database.
//!
//! Documents live in one collection per entity and use the service's own
//! shape: camelCase attributes, `$id` identity, site coordinates grouped
//! under `location`, and project sub-documents serialised as JSON strings.

use std::{
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, NaiveDate, Utc};
use db::{
    models::{
        energy_production::EnergyProduction,
        epc_project::{
            EpcProject, OverallStatus, Phases, Priority, ProjectType, QualityControl, Resources,
            Risk,
        },
        railway_site::{RailwaySite, SiteStatus},
    },
    store::{BackendKind, EnergyProductionStore, Entity, EntityStore, StoreError, Stores},
};
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::RemoteStoreConfig;

#[derive(Debug, Clone, Error)]
pub enum RemoteStoreError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key or missing scope")]
    Unauthorized,
    #[error("json error: {0}")]
    Serde(String),
}

impl RemoteStoreError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    fn is_conflict(&self) -> bool {
        matches!(self, Self::Http { status: 409, .. })
    }
}

impl From<RemoteStoreError> for StoreError {
    fn from(err: RemoteStoreError) -> Self {
        match err {
            RemoteStoreError::Serde(msg) => StoreError::Document(msg),
            other => StoreError::Remote(other.to_string()),
        }
    }
}

/// Thin HTTP client for the document REST API.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    endpoint: String,
    project_id: String,
    database_id: String,
    api_key: SecretString,
}

impl RemoteClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    /// Largest page the service hands out per list call.
    pub const PAGE_SIZE: usize = 100;

    pub fn new(config: &RemoteStoreConfig) -> Result<Self, RemoteStoreError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("railway-solar-epc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteStoreError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            project_id: config.project_id.clone(),
            database_id: config.database_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint, self.database_id, collection
        )
    }

    pub fn document_url(&self, collection: &str, id: Uuid) -> String {
        format!("{}/{}", self.documents_url(collection), id)
    }

    /// Send one request with retries on transient failures. A 404 answer is
    /// reported as `Ok(None)`.
    async fn request(
        &self,
        method: Method,
        url: &str,
        queries: &[String],
        body: Option<&Value>,
    ) -> Result<Option<Value>, RemoteStoreError> {
        self.request_counted(method, url, queries, body).await.0
    }

    /// [`Self::request`], also reporting how many attempts were sent.
    async fn request_counted(
        &self,
        method: Method,
        url: &str,
        queries: &[String],
        body: Option<&Value>,
    ) -> (Result<Option<Value>, RemoteStoreError>, usize) {
        let attempts = AtomicUsize::new(0);
        let result = (|| async {
            attempts.fetch_add(1, Ordering::Relaxed);
            self.send_request(method.clone(), url, queries, body).await
        })
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(250))
                    .with_max_delay(Duration::from_secs(10))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &RemoteStoreError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "Remote store call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await;
        (result, attempts.into_inner())
    }

    async fn send_request(
        &self,
        method: Method,
        url: &str,
        queries: &[String],
        body: Option<&Value>,
    ) -> Result<Option<Value>, RemoteStoreError> {
        let mut req = self
            .http
            .request(method.clone(), url)
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", self.api_key.expose_secret())
            .header("content-type", "application/json");
        if !queries.is_empty() {
            let params: Vec<(&str, &str)> = queries.iter().map(|q| ("queries[]", q.as_str())).collect();
            req = req.query(&params);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        debug!(%method, url, "remote store request");
        let res = req.send().await.map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => {
                let bytes = res.bytes().await.map_err(map_reqwest_error)?;
                if bytes.is_empty() {
                    return Ok(Some(Value::Null));
                }
                serde_json::from_slice(&bytes)
                    .map(Some)
                    .map_err(|e| RemoteStoreError::Serde(e.to_string()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteStoreError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(RemoteStoreError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(RemoteStoreError::Http { status, body })
            }
        }
    }

    /// Every document of a collection matching `filters`, oldest first.
    async fn list_documents(
        &self,
        collection: &str,
        filters: &[String],
    ) -> Result<Vec<Value>, RemoteStoreError> {
        let url = self.documents_url(collection);
        let mut documents = Vec::new();

        loop {
            let mut queries = filters.to_vec();
            queries.push(query_limit(Self::PAGE_SIZE));
            queries.push(query_offset(documents.len()));
            queries.push(query_order_asc("$createdAt"));

            let page: DocumentList = match self.request(Method::GET, &url, &queries, None).await? {
                Some(value) => decode(value)?,
                None => return Err(RemoteStoreError::Http {
                    status: 404,
                    body: format!("collection {collection} not found"),
                }),
            };
            let fetched = page.documents.len();
            documents.extend(page.documents);
            if fetched < Self::PAGE_SIZE || documents.len() as u64 >= page.total {
                break;
            }
        }

        Ok(documents)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> RemoteStoreError {
    if e.is_timeout() {
        RemoteStoreError::Timeout
    } else {
        RemoteStoreError::Transport(e.to_string())
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, RemoteStoreError> {
    serde_json::from_value(value).map_err(|e| RemoteStoreError::Serde(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, RemoteStoreError> {
    serde_json::to_value(value).map_err(|e| RemoteStoreError::Serde(e.to_string()))
}

fn query_limit(limit: usize) -> String {
    json!({ "method": "limit", "values": [limit] }).to_string()
}

fn query_offset(offset: usize) -> String {
    json!({ "method": "offset", "values": [offset] }).to_string()
}

fn query_order_asc(attribute: &str) -> String {
    json!({ "method": "orderAsc", "attribute": attribute }).to_string()
}

fn query_equal(attribute: &str, value: impl Serialize) -> String {
    json!({ "method": "equal", "attribute": attribute, "values": [value] }).to_string()
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    total: u64,
    documents: Vec<Value>,
}

/// Mapping between a domain entity and its document shape.
pub trait RemoteDocument: Entity {
    /// Document attributes without the `$id` identity.
    fn to_document(&self) -> Result<Value, RemoteStoreError>;

    fn from_document(document: Value) -> Result<Self, RemoteStoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDocument {
    #[serde(rename = "$id", skip_serializing)]
    pub id: Uuid,
    pub name: String,
    pub station_code: String,
    pub cluster: String,
    pub zone: Option<String>,
    pub location: Location,
    pub feasible_capacity: f64,
    pub feasible_area: f64,
    pub status: SiteStatus,
    pub energy_generated: f64,
    pub efficiency: f64,
    pub carbon_offset: f64,
    pub monthly_energy_target: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&RailwaySite> for SiteDocument {
    fn from(site: &RailwaySite) -> Self {
        Self {
            id: site.id,
            name: site.name.clone(),
            station_code: site.station_code.clone(),
            cluster: site.cluster.clone(),
            zone: site.zone.clone(),
            location: Location {
                latitude: site.latitude,
                longitude: site.longitude,
                address: site.address.clone(),
            },
            feasible_capacity: site.feasible_capacity,
            feasible_area: site.feasible_area,
            status: site.status,
            energy_generated: site.energy_generated,
            efficiency: site.efficiency,
            carbon_offset: site.carbon_offset_kg,
            monthly_energy_target: site.monthly_energy_target,
            created_at: site.created_at,
            updated_at: site.updated_at,
        }
    }
}

impl From<SiteDocument> for RailwaySite {
    fn from(doc: SiteDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            station_code: doc.station_code,
            cluster: doc.cluster,
            zone: doc.zone,
            latitude: doc.location.latitude,
            longitude: doc.location.longitude,
            address: doc.location.address,
            feasible_capacity: doc.feasible_capacity,
            feasible_area: doc.feasible_area,
            status: doc.status,
            energy_generated: doc.energy_generated,
            efficiency: doc.efficiency,
            carbon_offset_kg: doc.carbon_offset,
            monthly_energy_target: doc.monthly_energy_target,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

impl RemoteDocument for RailwaySite {
    fn to_document(&self) -> Result<Value, RemoteStoreError> {
        encode(&SiteDocument::from(self))
    }

    fn from_document(document: Value) -> Result<Self, RemoteStoreError> {
        Ok(decode::<SiteDocument>(document)?.into())
    }
}

/// Phases, resources, quality control and risks travel as JSON strings.
/// The site `location` group is the only nested object the collections use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    #[serde(rename = "$id", skip_serializing)]
    pub id: Uuid,
    pub project_id: String,
    pub project_name: String,
    pub description: Option<String>,
    pub site_id: Uuid,
    pub project_type: ProjectType,
    pub priority: Priority,
    pub phases: String,
    pub resources: String,
    pub quality_control: String,
    pub risks: String,
    pub overall_status: OverallStatus,
    pub health_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&EpcProject> for ProjectDocument {
    type Error = RemoteStoreError;

    fn try_from(project: &EpcProject) -> Result<Self, Self::Error> {
        let to_string = |value: Value| value.to_string();
        Ok(Self {
            id: project.id,
            project_id: project.project_id.clone(),
            project_name: project.project_name.clone(),
            description: project.description.clone(),
            site_id: project.site_id,
            project_type: project.project_type,
            priority: project.priority,
            phases: to_string(encode(&project.phases)?),
            resources: to_string(encode(&project.resources)?),
            quality_control: to_string(encode(&project.quality_control)?),
            risks: to_string(encode(&project.risks)?),
            overall_status: project.overall_status,
            health_score: project.health_score,
            created_at: project.created_at,
            updated_at: project.updated_at,
        })
    }
}

fn parse_embedded<T: DeserializeOwned>(field: &str, raw: &str) -> Result<T, RemoteStoreError> {
    serde_json::from_str(raw).map_err(|e| RemoteStoreError::Serde(format!("{field}: {e}")))
}

impl TryFrom<ProjectDocument> for EpcProject {
    type Error = RemoteStoreError;

    fn try_from(doc: ProjectDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc.id,
            project_id: doc.project_id,
            project_name: doc.project_name,
            description: doc.description,
            site_id: doc.site_id,
            project_type: doc.project_type,
            priority: doc.priority,
            phases: parse_embedded::<Phases>("phases", &doc.phases)?,
            resources: parse_embedded::<Resources>("resources", &doc.resources)?,
            quality_control: parse_embedded::<QualityControl>("qualityControl", &doc.quality_control)?,
            risks: parse_embedded::<Vec<Risk>>("risks", &doc.risks)?,
            overall_status: doc.overall_status,
            health_score: doc.health_score,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

impl RemoteDocument for EpcProject {
    fn to_document(&self) -> Result<Value, RemoteStoreError> {
        encode(&ProjectDocument::try_from(self)?)
    }

    fn from_document(document: Value) -> Result<Self, RemoteStoreError> {
        decode::<ProjectDocument>(document)?.try_into()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionDocument {
    #[serde(rename = "$id", skip_serializing)]
    pub id: Uuid,
    pub site_id: Uuid,
    pub date: NaiveDate,
    pub energy_kwh: f64,
    pub peak_power_kw: Option<f64>,
    pub irradiance: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl RemoteDocument for EnergyProduction {
    fn to_document(&self) -> Result<Value, RemoteStoreError> {
        encode(&ProductionDocument {
            id: self.id,
            site_id: self.site_id,
            date: self.date,
            energy_kwh: self.energy_kwh,
            peak_power_kw: self.peak_power_kw,
            irradiance: self.irradiance,
            created_at: self.created_at,
        })
    }

    fn from_document(document: Value) -> Result<Self, RemoteStoreError> {
        let doc: ProductionDocument = decode(document)?;
        Ok(Self {
            id: doc.id,
            site_id: doc.site_id,
            date: doc.date,
            energy_kwh: doc.energy_kwh,
            peak_power_kw: doc.peak_power_kw,
            irradiance: doc.irradiance,
            created_at: doc.created_at,
        })
    }
}

/// One remote collection holding entities of type `E`.
pub struct RemoteCollection<E> {
    client: Arc<RemoteClient>,
    collection: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E> RemoteCollection<E> {
    pub fn new(client: Arc<RemoteClient>, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E: RemoteDocument> EntityStore<E> for RemoteCollection<E> {
    async fn create(&self, entity: &E) -> Result<E, StoreError> {
        let body = json!({
            "documentId": entity.id().to_string(),
            "data": entity.to_document()?,
        });
        let url = self.client.documents_url(&self.collection);
        let (result, attempts) = self
            .client
            .request_counted(Method::POST, &url, &[], Some(&body))
            .await;
        match result {
            Ok(Some(doc)) => Ok(E::from_document(doc)?),
            Ok(None) => Err(StoreError::Remote(format!(
                "collection {} not found",
                self.collection
            ))),
            // An earlier attempt may have been stored before its answer was
            // lost; the conflict is then with our own write.
            Err(e) if e.is_conflict() && attempts > 1 => {
                warn!(
                    kind = E::KIND,
                    id = %entity.id(),
                    attempts,
                    "Create conflicted after a retry, reading back the stored document"
                );
                self.get(entity.id()).await?.ok_or(StoreError::AlreadyExists {
                    kind: E::KIND,
                    id: entity.id(),
                })
            }
            Err(e) if e.is_conflict() => Err(StoreError::AlreadyExists {
                kind: E::KIND,
                id: entity.id(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<E>, StoreError> {
        let url = self.client.document_url(&self.collection, id);
        match self.client.request(Method::GET, &url, &[], None).await? {
            Some(doc) => Ok(Some(E::from_document(doc)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, entity: &E) -> Result<E, StoreError> {
        let body = json!({ "data": entity.to_document()? });
        let url = self.client.document_url(&self.collection, entity.id());
        match self.client.request(Method::PATCH, &url, &[], Some(&body)).await? {
            Some(doc) => Ok(E::from_document(doc)?),
            None => Err(StoreError::NotFound {
                kind: E::KIND,
                id: entity.id(),
            }),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let url = self.client.document_url(&self.collection, id);
        Ok(self
            .client
            .request(Method::DELETE, &url, &[], None)
            .await?
            .is_some())
    }

    async fn list(&self) -> Result<Vec<E>, StoreError> {
        let documents = self.client.list_documents(&self.collection, &[]).await?;
        documents
            .into_iter()
            .map(|doc| E::from_document(doc).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl EnergyProductionStore for RemoteCollection<EnergyProduction> {
    async fn list_by_site(&self, site_id: Uuid) -> Result<Vec<EnergyProduction>, StoreError> {
        let filters = [query_equal("siteId", site_id.to_string())];
        let documents = self.client.list_documents(&self.collection, &filters).await?;
        let mut rows = documents
            .into_iter()
            .map(|doc| EnergyProduction::from_document(doc).map_err(StoreError::from))
            .collect::<Result<Vec<_>, _>>()?;
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }

    async fn delete_by_site(&self, site_id: Uuid) -> Result<u64, StoreError> {
        let mut removed = 0;
        for row in self.list_by_site(site_id).await? {
            if self.delete(row.id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Stores backed by the remote document database.
pub fn remote_stores(config: &RemoteStoreConfig) -> Result<Stores, RemoteStoreError> {
    let client = Arc::new(RemoteClient::new(config)?);
    Ok(Stores {
        backend: BackendKind::Remote,
        projects: Arc::new(RemoteCollection::<EpcProject>::new(
            client.clone(),
            &config.projects_collection,
        )),
        sites: Arc::new(RemoteCollection::<RailwaySite>::new(
            client.clone(),
            &config.sites_collection,
        )),
        production: Arc::new(RemoteCollection::<EnergyProduction>::new(
            client,
            &config.production_collection,
        )),
    })
}
