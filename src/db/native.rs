//! tokio-postgres driver backend.
//!
//! Statements are prepared first so each parameter can be encoded as the
//! type the server inferred for its placeholder.

use super::numeric::{BoxError, PgNumeric};
use super::params::{coerce_params, Param, ParamType};
use super::{connection_error, ColumnInfo, ConnectParams, Driver, Fetched, Row, Session, Value};
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use bytes::BytesMut;
use tokio::task::JoinHandle;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use tokio_postgres::{Client, Config, NoTls, Statement};
use tracing::debug;

type BoundParam = Box<dyn ToSql + Sync + Send>;

/// Driver backed by tokio-postgres.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPostgresDriver;

impl TokioPostgresDriver {
    /// Creates the tokio-postgres driver.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for TokioPostgresDriver {
    fn name(&self) -> &'static str {
        "tokio-postgres"
    }

    async fn open_session(&self, params: &ConnectParams) -> Result<Box<dyn Session>> {
        let mut config = Config::new();
        config
            .host(&params.host)
            .port(params.port)
            .dbname(&params.database)
            .user(&params.user)
            .password(&params.password)
            .connect_timeout(params.connect_timeout);

        debug!("Opening tokio-postgres session to {}", params.target());

        let (client, connection) =
            tokio::time::timeout(params.connect_timeout, config.connect(NoTls))
                .await
                .map_err(|_| {
                    connection_error(
                        format!(
                            "connection timed out after {} seconds",
                            params.connect_timeout.as_secs()
                        ),
                        params,
                    )
                })?
                .map_err(|e| connection_error(e.to_string(), params))?;

        let task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("Connection task ended with error: {}", e);
            }
        });

        Ok(Box::new(NativeSession { client, task }))
    }
}

/// A session over one tokio-postgres client and its connection task.
pub struct NativeSession {
    client: Client,
    task: JoinHandle<()>,
}

#[async_trait]
impl Session for NativeSession {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Fetched> {
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| WardenError::query(format_query_error(&e)))?;

        let bound = bind_params(&statement, params)?;
        let refs: Vec<&(dyn ToSql + Sync)> = bound
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = self
            .client
            .query(&statement, &refs)
            .await
            .map_err(|e| WardenError::query(format_query_error(&e)))?;

        let description = (!statement.columns().is_empty()).then(|| {
            statement
                .columns()
                .iter()
                .map(|c| ColumnInfo::new(c.name(), c.type_().name()))
                .collect()
        });

        Ok(Fetched {
            description,
            rows: rows.iter().map(convert_row).collect(),
        })
    }

    async fn rollback(&mut self) -> Result<()> {
        self.client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| WardenError::query(format_query_error(&e)))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let NativeSession { client, task } = *self;
        // Dropping the client terminates the connection task.
        drop(client);
        task.await
            .map_err(|e| WardenError::disconnect(e.to_string()))
    }
}

/// Maps a placeholder type to the shared coercion table.
fn param_type(ty: &Type) -> ParamType {
    match *ty {
        Type::BOOL => ParamType::Bool,
        Type::INT2 => ParamType::Int2,
        Type::INT4 => ParamType::Int4,
        Type::INT8 => ParamType::Int8,
        Type::OID => ParamType::Oid,
        Type::FLOAT4 => ParamType::Float4,
        Type::FLOAT8 => ParamType::Float8,
        Type::NUMERIC => ParamType::Numeric,
        Type::DATE => ParamType::Date,
        Type::TIME => ParamType::Time,
        Type::TIMESTAMP => ParamType::Timestamp,
        Type::TIMESTAMPTZ => ParamType::TimestampTz,
        Type::JSON | Type::JSONB => ParamType::Json,
        Type::BYTEA => ParamType::Bytea,
        _ if <String as ToSql>::accepts(ty) => ParamType::Text,
        _ => ParamType::Other,
    }
}

/// Encodes every parameter as the type inferred for its placeholder.
fn bind_params(statement: &Statement, params: &[Value]) -> Result<Vec<BoundParam>> {
    let types: Vec<(ParamType, &str)> = statement
        .params()
        .iter()
        .map(|ty| (param_type(ty), ty.name()))
        .collect();

    Ok(coerce_params(&types, params)?
        .into_iter()
        .map(into_bound)
        .collect())
}

fn into_bound(param: Param) -> BoundParam {
    match param {
        Param::Null => Box::new(PgNull),
        Param::Bool(v) => Box::new(v),
        Param::Int2(v) => Box::new(v),
        Param::Int4(v) => Box::new(v),
        Param::Int8(v) => Box::new(v),
        Param::Oid(v) => Box::new(v),
        Param::Float4(v) => Box::new(v),
        Param::Float8(v) => Box::new(v),
        Param::Numeric(v) => Box::new(v),
        Param::Text(v) => Box::new(v),
        Param::Date(v) => Box::new(v),
        Param::Time(v) => Box::new(v),
        Param::Timestamp(v) => Box::new(v),
        Param::TimestampTz(v) => Box::new(v),
        Param::Json(v) => Box::new(v),
        Param::Bytes(v) => Box::new(v),
    }
}

/// Converts a tokio-postgres row to our Row type.
fn convert_row(row: &tokio_postgres::Row) -> Row {
    (0..row.len())
        .map(|idx| convert_value(row, idx))
        .collect()
}

/// Converts a single column value to our Value type.
fn convert_value(row: &tokio_postgres::Row, idx: usize) -> Value {
    fn get<'a, T: FromSql<'a>>(row: &'a tokio_postgres::Row, idx: usize) -> Option<T> {
        row.try_get::<_, Option<T>>(idx).ok().flatten()
    }

    let ty = row.columns()[idx].type_();

    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx).map(Value::Bool),
        Type::INT2 => get::<i16>(row, idx).map(Value::from),
        Type::INT4 => get::<i32>(row, idx).map(Value::from),
        Type::INT8 => get::<i64>(row, idx).map(Value::Int),
        Type::OID => get::<u32>(row, idx).map(|v| Value::Int(v as i64)),
        Type::FLOAT4 => get::<f32>(row, idx).map(|v| Value::Float(v as f64)),
        Type::FLOAT8 => get::<f64>(row, idx).map(Value::Float),
        Type::NUMERIC => get::<PgNumeric>(row, idx).map(|v| Value::Decimal(v.0)),
        Type::JSON | Type::JSONB => {
            get::<serde_json::Value>(row, idx).map(|v| Value::String(v.to_string()))
        }
        Type::BYTEA => get::<Vec<u8>>(row, idx).map(Value::Bytes),
        Type::TIMESTAMP => {
            get::<chrono::NaiveDateTime>(row, idx).map(|v| Value::String(v.to_string()))
        }
        Type::TIMESTAMPTZ => {
            get::<chrono::DateTime<chrono::Utc>>(row, idx).map(|v| Value::String(v.to_rfc3339()))
        }
        Type::DATE => get::<chrono::NaiveDate>(row, idx).map(|v| Value::String(v.to_string())),
        Type::TIME => get::<chrono::NaiveTime>(row, idx).map(|v| Value::String(v.to_string())),
        // Default: try to get as string
        _ => get::<String>(row, idx).map(Value::String),
    };

    value.unwrap_or(Value::Null)
}

/// Formats a driver error with detail and hint lines if available.
fn format_query_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut result = db_error.message().to_string();
    if let Some(detail) = db_error.detail() {
        result.push_str("\n  DETAIL: ");
        result.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        result.push_str("\n  HINT: ");
        result.push_str(hint);
    }
    result
}

/// A NULL that encodes as any parameter type.
#[derive(Debug)]
struct PgNull;

impl ToSql for PgNull {
    fn to_sql(&self, _ty: &Type, _out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        PgNumeric::from_binary(raw)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

impl ToSql for PgNumeric {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        self.write_binary(out)?;
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }

    to_sql_checked!();
}
