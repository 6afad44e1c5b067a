//! Query execution against a data source, returning data frames.

use std::{collections::BTreeMap, io::Read};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{
    ApiError, ApiRequest, ApiResponse, Unknown, decode_json, int, is_false, is_zero, opt_int,
    read_body,
};

/// The `queryType` used by most time series data sources.
pub const QUERY_TYPE_TIME_SERIES: &str = "timeSeriesQuery";

/// The window a query covers. Both ends are passed to the server verbatim,
/// so they may be RFC 3339 timestamps or relative expressions like `now-5m`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// The start of the range.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    /// The end of the range.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    /// The range as the user originally typed it.
    #[serde(default)]
    pub raw: Option<RawTimeRange>,
}

/// A relative time range, as typed into a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTimeRange {
    pub from: String,
    pub to: String,
}

impl TimeRange {
    /// A range relative to the server's clock, e.g. `("now-1h", "now")`.
    pub fn relative(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            raw: None,
        }
    }

    /// A fixed range between two instants.
    pub fn absolute(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: from.to_rfc3339_opts(SecondsFormat::Millis, true),
            to: to.to_rfc3339_opts(SecondsFormat::Millis, true),
            raw: None,
        }
    }

    /// Attach the range as originally typed.
    pub fn with_raw(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            raw: Some(RawTimeRange {
                from: from.into(),
                to: to.into(),
            }),
            ..self
        }
    }
}

// The top-level from/to take epoch milliseconds, but relative expressions
// are accepted as-is.
fn epoch_millis(bound: &str) -> String {
    match DateTime::parse_from_rfc3339(bound) {
        Ok(t) => t.timestamp_millis().to_string(),
        Err(_) => bound.to_owned(),
    }
}

/// Identifies the data source a query runs against.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceRef {
    /// The data source UID.
    pub uid: String,
    /// The plugin type, e.g. `prometheus`.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(flatten)]
    pub unknown: Unknown,
}

impl DataSourceRef {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Default::default()
        }
    }
}

/// A single query. Most fields are specific to some data source plugins;
/// anything not named here can be set through `unknown`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Identifies this query's entry in the response.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ref_id: String,
    pub datasource: DataSourceRef,
    /// The query expression, e.g. PromQL.
    #[serde(default, rename = "expr", skip_serializing_if = "String::is_empty")]
    pub expression: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interval: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub legend_format: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scenario_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query_type: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exemplar: bool,
    #[serde(default, deserialize_with = "int", skip_serializing_if = "is_zero")]
    pub utc_offset_sec: i64,
    #[serde(default, deserialize_with = "int", skip_serializing_if = "is_zero")]
    pub datasource_id: i64,
    #[serde(default, deserialize_with = "int", skip_serializing_if = "is_zero")]
    pub interval_ms: i64,
    #[serde(default, deserialize_with = "int", skip_serializing_if = "is_zero")]
    pub max_data_points: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub string_input: String,
    #[serde(flatten)]
    pub unknown: Unknown,
}

impl Query {
    /// A query with the given ref ID and expression.
    pub fn new(
        ref_id: impl Into<String>,
        datasource: DataSourceRef,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            ref_id: ref_id.into(),
            datasource,
            expression: expression.into(),
            ..Default::default()
        }
    }
}

/// A batch of queries sharing one time range.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceQuery {
    pub queries: Vec<Query>,
    pub range: TimeRange,
}

impl DataSourceQuery {
    /// The request that runs this batch.
    pub fn request(&self) -> QueryDataSource<'_> {
        QueryDataSource {
            queries: &self.queries,
            range: &self.range,
        }
    }
}

/// Run queries against one or more data sources.
#[derive(Debug, Clone, Copy)]
pub struct QueryDataSource<'a> {
    pub queries: &'a [Query],
    pub range: &'a TimeRange,
}

#[derive(Serialize)]
struct QueryDataSourceBody<'a> {
    queries: &'a [Query],
    range: &'a TimeRange,
    from: String,
    to: String,
}

impl ApiRequest for QueryDataSource<'_> {
    type Response = QueryResponse;

    fn method(&self) -> http::Method {
        http::Method::POST
    }

    fn path(&self) -> String {
        "/api/ds/query".to_string()
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(QueryDataSourceBody {
            queries: self.queries,
            range: self.range,
            from: epoch_millis(&self.range.from),
            to: epoch_millis(&self.range.to),
        })
    }
}

/// The results of a query request, keyed by ref ID.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: BTreeMap<String, QueryResult>,
}

impl QueryResponse {
    /// The result for the given ref ID.
    pub fn get(&self, ref_id: &str) -> Option<&QueryResult> {
        self.results.get(ref_id)
    }
}

impl ApiResponse for QueryResponse {
    fn from_response_parts(
        parts: http::response::Parts,
        body: impl Read,
    ) -> Result<Self, ApiError> {
        let bytes = read_body(body)?;
        if parts.status.is_success() {
            return decode_json(parts.status, &bytes);
        }

        // When some queries fail, the server may answer 400 with a full
        // results map. Those failures belong to their entries.
        if parts.status == http::StatusCode::BAD_REQUEST {
            if let Ok(resp) = serde_json::from_slice::<QueryResponse>(&bytes) {
                if !resp.results.is_empty() {
                    tracing::debug!(
                        failed = resp.results.values().filter(|r| r.error.is_some()).count(),
                        "partial query failure"
                    );
                    return Ok(resp);
                }
            }
        }

        Err(ApiError::from_status(parts.status, &bytes))
    }
}

/// The outcome of one query.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub frames: Vec<Frame>,
    /// Set if this query failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The HTTP-style status of this query alone.
    #[serde(
        default,
        deserialize_with = "opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<u16>,
    #[serde(flatten)]
    pub unknown: Unknown,
}

/// A data frame violated the one-column-per-field shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameShapeError {
    #[error("frame has {fields} fields but {columns} value columns")]
    ColumnCount { fields: usize, columns: usize },
    #[error("column {column} has {len} values, expected {expected}")]
    RaggedColumn {
        column: usize,
        len: usize,
        expected: usize,
    },
}

/// A table of values: one column per schema field, all of equal length.
///
/// Anything else the server sends alongside the schema and values (such as
/// `data.nanos` for sub-millisecond timestamps) is kept and written back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame", into = "RawFrame")]
pub struct Frame {
    schema: Schema,
    values: Vec<Vec<Value>>,
    unknown: Unknown,
    data_unknown: Unknown,
}

#[derive(Serialize, Deserialize)]
struct RawFrame {
    schema: Schema,
    #[serde(default)]
    data: Option<RawFrameData>,
    #[serde(flatten)]
    unknown: Unknown,
}

#[derive(Serialize, Deserialize)]
struct RawFrameData {
    #[serde(default)]
    values: Vec<Vec<Value>>,
    #[serde(flatten)]
    unknown: Unknown,
}

impl TryFrom<RawFrame> for Frame {
    type Error = FrameShapeError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        let (values, data_unknown) = match raw.data {
            Some(data) if !data.values.is_empty() => (data.values, data.unknown),
            Some(data) => (vec![Vec::new(); raw.schema.fields.len()], data.unknown),
            None => (vec![Vec::new(); raw.schema.fields.len()], Unknown::new()),
        };

        let mut frame = Frame::new(raw.schema, values)?;
        frame.unknown = raw.unknown;
        frame.data_unknown = data_unknown;
        Ok(frame)
    }
}

impl From<Frame> for RawFrame {
    fn from(frame: Frame) -> Self {
        RawFrame {
            schema: frame.schema,
            data: Some(RawFrameData {
                values: frame.values,
                unknown: frame.data_unknown,
            }),
            unknown: frame.unknown,
        }
    }
}

impl Frame {
    /// Build a frame, checking that there is exactly one column per field and
    /// that all columns have the same length.
    pub fn new(schema: Schema, values: Vec<Vec<Value>>) -> Result<Self, FrameShapeError> {
        if values.len() != schema.fields.len() {
            return Err(FrameShapeError::ColumnCount {
                fields: schema.fields.len(),
                columns: values.len(),
            });
        }

        if let Some(expected) = values.first().map(Vec::len) {
            for (column, col) in values.iter().enumerate() {
                if col.len() != expected {
                    return Err(FrameShapeError::RaggedColumn {
                        column,
                        len: col.len(),
                        expected,
                    });
                }
            }
        }

        Ok(Self {
            schema,
            values,
            unknown: Unknown::new(),
            data_unknown: Unknown::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.schema.fields
    }

    /// The value columns, in field order.
    pub fn values(&self) -> &[Vec<Value>] {
        &self.values
    }

    pub fn row_count(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    /// The first field with the given name.
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.schema.fields.iter().find(|f| f.name == name)
    }

    /// The values of the first field with the given name.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        let idx = self.schema.fields.iter().position(|f| f.name == name)?;
        Some(&self.values[idx])
    }

    /// Iterate over rows, each holding one value per field.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count()).map(|i| self.values.iter().map(|col| &col[i]).collect())
    }

    /// Frame-level fields other than `schema` and `data`.
    pub fn unknown(&self) -> &Unknown {
        &self.unknown
    }

    /// Fields of the `data` block other than `values`, e.g. `nanos`.
    pub fn data_unknown(&self) -> &Unknown {
        &self.data_unknown
    }

    pub fn into_parts(self) -> (Schema, Vec<Vec<Value>>) {
        (self.schema, self.values)
    }
}

/// Describes the fields of a frame.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub ref_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
    #[serde(flatten)]
    pub unknown: Unknown,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub executed_query_string: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preferred_visualisation_type: String,
    /// Plugin-specific metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
    #[serde(flatten)]
    pub unknown: Unknown,
}

/// One field (column) of a frame.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub name: String,
    #[serde(default, rename = "type")]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_info: Option<Unknown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Unknown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub unknown: Unknown,
}
