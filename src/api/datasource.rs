//! API operations concerning data sources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::api::{ApiRequest, DataResponse, Unknown, int, is_zero, segment};

/// A configured connection to a metrics or logs backend.
///
/// `json_data` and `secure_json_data` are plugin-specific and passed through
/// as-is. `secure_json_data` is write-only: the server never returns it, and
/// reports which secure fields are set in `secureJsonFields` instead (kept in
/// `unknown`).
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    /// The numeric ID. Zero when creating.
    #[serde(default, deserialize_with = "int", skip_serializing_if = "is_zero")]
    pub id: i64,
    /// The UID. Assigned by the server if left empty when creating.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// The organization the data source belongs to.
    #[serde(default, deserialize_with = "int", skip_serializing_if = "is_zero")]
    pub org_id: i64,
    /// The display name, unique within an organization.
    pub name: String,
    /// The plugin type, for example `prometheus`.
    pub r#type: String,
    /// The backend URL.
    #[serde(default)]
    pub url: String,
    /// `proxy` (server-side) or `direct` (browser) access.
    #[serde(default)]
    pub access: String,
    /// The database name, for backends that have one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database: String,
    /// The backend user.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Whether this is the organization's default data source.
    #[serde(default)]
    pub is_default: bool,
    /// Whether basic auth is used against the backend.
    #[serde(default)]
    pub basic_auth: bool,
    /// The basic auth user for the backend.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub basic_auth_user: String,
    /// Whether browser credentials are sent with direct requests.
    #[serde(default)]
    pub with_credentials: bool,
    /// Plugin-specific settings.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub json_data: Unknown,
    /// Plugin-specific secrets.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub secure_json_data: Unknown,
    /// Fields not named above.
    #[serde(flatten)]
    pub unknown: Unknown,
}

impl DataResponse for DataSource {}

/// Add custom HTTP headers to a data source's settings. Header names go into
/// `jsonData` as `httpHeaderName1`, `httpHeaderName2`, ... and values into
/// `secureJsonData` as `httpHeaderValue1`, ..., numbered in name order.
pub fn json_data_with_headers(
    mut json_data: Unknown,
    mut secure_json_data: Unknown,
    headers: &BTreeMap<String, String>,
) -> (Unknown, Unknown) {
    for (idx, (name, value)) in headers.iter().enumerate() {
        let n = idx + 1;
        json_data.insert(format!("httpHeaderName{n}"), name.clone().into());
        secure_json_data.insert(format!("httpHeaderValue{n}"), value.clone().into());
    }

    (json_data, secure_json_data)
}

/// The response to creating a data source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreatedDataSource {
    /// The assigned ID.
    #[serde(deserialize_with = "int")]
    pub id: i64,
    /// The assigned UID, on servers that return it at the top level.
    #[serde(default)]
    pub uid: String,
    /// The data source name.
    #[serde(default)]
    pub name: String,
    /// A human-readable status message.
    pub message: Option<String>,
    /// The full record, on servers that return it.
    #[serde(rename = "datasource")]
    pub data_source: Option<DataSource>,
    /// Fields not named above.
    #[serde(flatten)]
    pub unknown: Unknown,
}

impl CreatedDataSource {
    /// The assigned UID, wherever the server put it.
    pub fn uid(&self) -> &str {
        match &self.data_source {
            Some(ds) if self.uid.is_empty() => &ds.uid,
            _ => &self.uid,
        }
    }
}

impl DataResponse for CreatedDataSource {}

/// The response to looking up a data source ID by name.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct DataSourceId {
    /// The data source ID.
    pub id: i64,
}

impl DataResponse for DataSourceId {}

/// Create a data source.
#[derive(Debug, Clone)]
pub struct CreateDataSource<'a> {
    /// The data source to create. `id` and `uid` may be left empty.
    pub data_source: &'a DataSource,
}

impl ApiRequest for CreateDataSource<'_> {
    type Response = CreatedDataSource;

    fn method(&self) -> http::Method {
        http::Method::POST
    }

    fn path(&self) -> String {
        "/api/datasources".to_string()
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(self.data_source)
    }
}

/// List all data sources.
#[derive(Debug, Clone, Copy)]
pub struct GetDataSources;

impl ApiRequest for GetDataSources {
    type Response = Vec<DataSource>;

    fn path(&self) -> String {
        "/api/datasources".to_string()
    }
}

/// Get a single data source by ID.
#[derive(Debug, Clone, Copy)]
pub struct GetDataSource {
    /// The data source ID.
    pub id: i64,
}

impl ApiRequest for GetDataSource {
    type Response = DataSource;

    fn path(&self) -> String {
        format!("/api/datasources/{}", self.id)
    }
}

/// Get a single data source by UID.
#[derive(Debug, Clone)]
pub struct GetDataSourceByUid<'a> {
    /// The data source UID.
    pub uid: &'a str,
}

impl ApiRequest for GetDataSourceByUid<'_> {
    type Response = DataSource;

    fn path(&self) -> String {
        format!("/api/datasources/uid/{}", segment(self.uid))
    }
}

/// Get a single data source by name.
#[derive(Debug, Clone)]
pub struct GetDataSourceByName<'a> {
    /// The data source name.
    pub name: &'a str,
}

impl ApiRequest for GetDataSourceByName<'_> {
    type Response = DataSource;

    fn path(&self) -> String {
        format!("/api/datasources/name/{}", segment(self.name))
    }
}

/// Look up a data source's ID by its name.
#[derive(Debug, Clone)]
pub struct GetDataSourceIdByName<'a> {
    /// The data source name.
    pub name: &'a str,
}

impl ApiRequest for GetDataSourceIdByName<'_> {
    type Response = DataSourceId;

    fn path(&self) -> String {
        format!("/api/datasources/id/{}", segment(self.name))
    }
}

/// Replace a data source, addressed by the record's `id`. Fields in
/// `unknown` are sent back as they were received.
#[derive(Debug, Clone)]
pub struct UpdateDataSource<'a> {
    /// The new state of the data source.
    pub data_source: &'a DataSource,
}

impl ApiRequest for UpdateDataSource<'_> {
    type Response = ();

    fn method(&self) -> http::Method {
        http::Method::PUT
    }

    fn path(&self) -> String {
        format!("/api/datasources/{}", self.data_source.id)
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(self.data_source)
    }
}

/// Replace a data source, addressed by the record's `uid`.
#[derive(Debug, Clone)]
pub struct UpdateDataSourceByUid<'a> {
    /// The new state of the data source.
    pub data_source: &'a DataSource,
}

impl ApiRequest for UpdateDataSourceByUid<'_> {
    type Response = ();

    fn method(&self) -> http::Method {
        http::Method::PUT
    }

    fn path(&self) -> String {
        format!("/api/datasources/uid/{}", segment(&self.data_source.uid))
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(self.data_source)
    }
}

/// Delete a data source by ID.
#[derive(Debug, Clone, Copy)]
pub struct DeleteDataSource {
    /// The data source ID.
    pub id: i64,
}

impl ApiRequest for DeleteDataSource {
    type Response = ();

    fn method(&self) -> http::Method {
        http::Method::DELETE
    }

    fn path(&self) -> String {
        format!("/api/datasources/{}", self.id)
    }
}

/// Delete a data source by UID.
#[derive(Debug, Clone)]
pub struct DeleteDataSourceByUid<'a> {
    /// The data source UID.
    pub uid: &'a str,
}

impl ApiRequest for DeleteDataSourceByUid<'_> {
    type Response = ();

    fn method(&self) -> http::Method {
        http::Method::DELETE
    }

    fn path(&self) -> String {
        format!("/api/datasources/uid/{}", segment(self.uid))
    }
}

/// Delete a data source by name.
#[derive(Debug, Clone)]
pub struct DeleteDataSourceByName<'a> {
    /// The data source name.
    pub name: &'a str,
}

impl ApiRequest for DeleteDataSourceByName<'_> {
    type Response = ();

    fn method(&self) -> http::Method {
        http::Method::DELETE
    }

    fn path(&self) -> String {
        format!("/api/datasources/name/{}", segment(self.name))
    }
}
