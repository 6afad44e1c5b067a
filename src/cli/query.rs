use std::{
    fmt::Write as _,
    io::{Write, stdout},
};

use anyhow::bail;
use chrono::{DateTime, Utc};
use grafana_api::query::{
    DataSourceQuery, DataSourceRef, Frame, Query, QueryResponse, TimeRange,
};
use serde_json::Value;
use tabwriter::TabWriter;
use tracing::debug;

use crate::cli::{
    Cli, KeyValue, Output,
    color::{CliExamples, HEADER, RED},
};

#[derive(Debug, clap::Args)]
#[command(after_long_help = CliExamples("
  # Query the last hour of a Prometheus data source
  grafana-api query --datasource prom-uid --expr 'rate(http_requests_total[5m])'

  # Query a fixed window
  grafana-api query --datasource prom-uid --expr up \\
    --from 2024-01-01T00:00:00Z --to 2024-01-01T06:00:00Z
"))]
pub(crate) struct QueryArgs {
    /// UID of the data source to query
    #[arg(long)]
    pub datasource: String,
    /// Plugin type of the data source, if the server needs it
    #[arg(long = "datasource-type")]
    pub datasource_type: Option<String>,
    /// The query expression
    #[arg(long)]
    pub expr: String,
    /// Start of the range: relative (now-1h) or RFC 3339
    #[arg(long, default_value = "now-1h")]
    pub from: String,
    /// End of the range: relative (now) or RFC 3339
    #[arg(long, default_value = "now")]
    pub to: String,
    /// Ref ID for the query
    #[arg(long, default_value = "A")]
    pub ref_id: String,
    /// Maximum number of points per series
    #[arg(long)]
    pub max_data_points: Option<i64>,
    /// Step between points, in milliseconds
    #[arg(long)]
    pub interval_ms: Option<i64>,
    /// Extra query field as key=value; values that parse as JSON are sent as JSON
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<KeyValue>,
    /// Limit the number of rows printed per frame
    #[arg(long, default_value = "100")]
    pub max_rows: usize,
    /// Do not truncate output
    #[arg(long)]
    pub no_trunc: bool,
}

pub(crate) fn handle(cli: &Cli, args: QueryArgs) -> anyhow::Result<()> {
    let QueryArgs {
        datasource,
        datasource_type,
        expr,
        from,
        to,
        ref_id,
        max_data_points,
        interval_ms,
        fields,
        max_rows,
        no_trunc,
    } = args;

    let mut query = Query::new(
        ref_id,
        DataSourceRef {
            r#type: datasource_type.unwrap_or_default(),
            ..DataSourceRef::new(datasource)
        },
        expr,
    );
    query.max_data_points = max_data_points.unwrap_or_default();
    query.interval_ms = interval_ms.unwrap_or_default();
    for kv in fields {
        let (k, v) = kv.into_strings();
        let value = serde_json::from_str(&v).unwrap_or(Value::String(v));
        query.unknown.insert(k, value);
    }

    let dsq = DataSourceQuery {
        queries: vec![query],
        range: time_range(&from, &to),
    };

    debug!(range = ?dsq.range, "running query");
    let resp = cli.roundtrip(dsq.request())?;

    match cli.output() {
        Output::Json => {
            serde_json::to_writer(stdout(), &resp)?;
            println!();
        }
        Output::Tty => print_tty(&resp, max_rows, !no_trunc)?,
    }

    let failed = resp
        .results
        .values()
        .filter(|r| r.error.is_some())
        .count();
    if failed > 0 {
        bail!("{failed} of {} queries failed", resp.results.len());
    }

    Ok(())
}

/// RFC 3339 bounds are normalized to UTC, with the original text kept as the
/// raw range. Anything else goes to the server as typed.
fn time_range(from: &str, to: &str) -> TimeRange {
    let parse = |s: &str| DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc));
    match (parse(from), parse(to)) {
        (Ok(f), Ok(t)) => TimeRange::absolute(f, t).with_raw(from, to),
        _ => TimeRange::relative(from, to),
    }
}

fn print_tty(resp: &QueryResponse, max_rows: usize, truncate: bool) -> anyhow::Result<()> {
    let mut stdout = anstream::stdout().lock();
    let mut truncation_occurred = false;

    for (ref_id, result) in &resp.results {
        writeln!(stdout, "{HEADER}{ref_id}{HEADER:#}")?;

        if let Some(err) = &result.error {
            writeln!(stdout, "{RED}error{RED:#}: {err}")?;
            continue;
        }

        if result.frames.iter().all(|f| f.row_count() == 0) {
            eprintln!("No results!");
            continue;
        }

        for frame in result.frames.iter().filter(|f| f.row_count() > 0) {
            truncation_occurred |= print_frame(&mut stdout, frame, max_rows, truncate)?;
            writeln!(stdout)?;
        }
    }

    if truncation_occurred {
        eprintln!("\nNote: some values were truncated. Use --no-trunc to see full values.");
    }

    Ok(())
}

fn print_frame(
    out: &mut impl Write,
    frame: &Frame,
    max_rows: usize,
    truncate: bool,
) -> anyhow::Result<bool> {
    const TRUNCATE_TO_COLUMN_WIDTH: usize = 32;

    let mut truncated = false;
    let mut tw = TabWriter::new(out);
    let mut buf = String::new();

    let headers: Vec<String> = frame.fields().iter().map(column_header).collect();
    writeln!(tw, "{}", headers.join("\t"))?;

    for row in frame.rows().take(max_rows) {
        for (i, value) in row.into_iter().enumerate() {
            if i > 0 {
                write!(tw, "\t")?;
            }

            buf.clear();
            match value {
                Value::Null => buf.push_str("(null)"),
                Value::String(s) => buf.push_str(s),
                v => write!(buf, "{v}")?,
            }

            if truncate && buf.chars().count() > TRUNCATE_TO_COLUMN_WIDTH {
                truncated = true;
                let short: String = buf.chars().take(TRUNCATE_TO_COLUMN_WIDTH - 3).collect();
                write!(tw, "{short}...")?;
            } else {
                write!(tw, "{buf}")?;
            }
        }

        writeln!(tw)?;
    }

    tw.flush()?;

    if frame.row_count() > max_rows {
        eprintln!(
            "({} of {} rows shown; use --max-rows to see more)",
            max_rows,
            frame.row_count()
        );
    }

    Ok(truncated)
}

fn column_header(field: &grafana_api::query::SchemaField) -> String {
    match &field.labels {
        Some(labels) if !labels.is_empty() => {
            let labels: Vec<_> = labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{}{{{}}}", field.name, labels.join(","))
        }
        _ => field.name.clone(),
    }
}
