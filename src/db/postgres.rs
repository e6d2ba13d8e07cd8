//! sqlx driver backend.
//!
//! Each session owns a single `PgConnection`; there is no pool. Statements
//! are prepared before binding, and every parameter is sent as the type the
//! server inferred for its placeholder.

use super::numeric::PgNumeric;
use super::params::{coerce_params, Param, ParamType};
use super::{connection_error, ColumnInfo, ConnectParams, Driver, Fetched, Row, Session, Value};
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{
    PgArgumentBuffer, PgArguments, PgConnectOptions, PgConnection, PgRow, PgSslMode, PgTypeInfo,
    PgValueFormat, PgValueRef,
};
use sqlx::query::Query;
use sqlx::{
    Column as SqlxColumn, Connection, Decode, Encode, Executor, Postgres, Row as SqlxRow,
    Statement, Type, TypeInfo,
};
use tracing::debug;

/// Driver backed by sqlx.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxDriver;

impl SqlxDriver {
    /// Creates the sqlx driver.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for SqlxDriver {
    fn name(&self) -> &'static str {
        "sqlx"
    }

    async fn open_session(&self, params: &ConnectParams) -> Result<Box<dyn Session>> {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.database)
            .username(&params.user)
            .password(&params.password)
            .ssl_mode(PgSslMode::Prefer);

        debug!("Opening sqlx session to {}", params.target());

        let connect = PgConnection::connect_with(&options);
        let conn = tokio::time::timeout(params.connect_timeout, connect)
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

        Ok(Box::new(SqlxSession { conn }))
    }
}

/// A session over one sqlx connection.
pub struct SqlxSession {
    conn: PgConnection,
}

#[async_trait]
impl Session for SqlxSession {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Fetched> {
        let statement = (&mut self.conn)
            .prepare(sql)
            .await
            .map_err(|e| WardenError::query(format_query_error(e)))?;

        let inferred: &[PgTypeInfo] = statement
            .parameters()
            .and_then(|p| p.left())
            .unwrap_or_default();
        let types: Vec<(ParamType, &str)> = inferred
            .iter()
            .map(|ty| (param_type(ty), ty.name()))
            .collect();
        let bound = coerce_params(&types, params)?;

        let query = bound
            .into_iter()
            .zip(inferred)
            .fold(sqlx::query(sql), |query, (param, ty)| bind_param(query, param, ty));

        let rows: Vec<PgRow> = query
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| WardenError::query(format_query_error(e)))?;

        let columns: Vec<ColumnInfo> = statement
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect();

        Ok(Fetched {
            description: (!columns.is_empty()).then_some(columns),
            rows: rows.iter().map(convert_row).collect(),
        })
    }

    async fn rollback(&mut self) -> Result<()> {
        sqlx::query("ROLLBACK")
            .execute(&mut self.conn)
            .await
            .map(|_| ())
            .map_err(|e| WardenError::query(format_query_error(e)))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| WardenError::disconnect(e.to_string()))
    }
}

/// Maps a placeholder type to the shared coercion table.
fn param_type(ty: &PgTypeInfo) -> ParamType {
    match ty.name().to_uppercase().as_str() {
        "BOOL" => ParamType::Bool,
        "INT2" => ParamType::Int2,
        "INT4" => ParamType::Int4,
        "INT8" => ParamType::Int8,
        "OID" => ParamType::Oid,
        "FLOAT4" => ParamType::Float4,
        "FLOAT8" => ParamType::Float8,
        "NUMERIC" => ParamType::Numeric,
        // sqlx reports bpchar as CHAR
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "UNKNOWN" | "CITEXT" => ParamType::Text,
        "DATE" => ParamType::Date,
        "TIME" => ParamType::Time,
        "TIMESTAMP" => ParamType::Timestamp,
        "TIMESTAMPTZ" => ParamType::TimestampTz,
        "JSON" | "JSONB" => ParamType::Json,
        "BYTEA" => ParamType::Bytea,
        _ => ParamType::Other,
    }
}

/// Binds one coerced parameter, declared as its placeholder's type.
fn bind_param<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: Param,
    ty: &PgTypeInfo,
) -> Query<'q, Postgres, PgArguments> {
    let ty = ty.clone();
    match param {
        Param::Null => query.bind(Inferred::new(None::<String>, ty)),
        Param::Bool(v) => query.bind(Inferred::new(v, ty)),
        Param::Int2(v) => query.bind(Inferred::new(v, ty)),
        Param::Int4(v) => query.bind(Inferred::new(v, ty)),
        Param::Int8(v) => query.bind(Inferred::new(v, ty)),
        Param::Oid(v) => query.bind(Inferred::new(Oid(v), ty)),
        Param::Float4(v) => query.bind(Inferred::new(v, ty)),
        Param::Float8(v) => query.bind(Inferred::new(v, ty)),
        Param::Numeric(v) => query.bind(Inferred::new(v, ty)),
        Param::Text(v) => query.bind(Inferred::new(v, ty)),
        Param::Date(v) => query.bind(Inferred::new(v, ty)),
        Param::Time(v) => query.bind(Inferred::new(v, ty)),
        Param::Timestamp(v) => query.bind(Inferred::new(v, ty)),
        Param::TimestampTz(v) => query.bind(Inferred::new(v, ty)),
        Param::Json(v) => query.bind(Inferred::new(v, ty)),
        Param::Bytes(v) => query.bind(Inferred::new(v, ty)),
    }
}

/// A bound value that declares the server-inferred type instead of its own.
///
/// This is what lets a NULL bind to any placeholder, and keeps varchar or
/// name placeholders from being redeclared as text.
struct Inferred<T> {
    value: T,
    ty: PgTypeInfo,
}

impl<T> Inferred<T> {
    fn new(value: T, ty: PgTypeInfo) -> Self {
        Self { value, ty }
    }
}

impl<T: Type<Postgres>> Type<Postgres> for Inferred<T> {
    fn type_info() -> PgTypeInfo {
        T::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        T::compatible(ty)
    }
}

impl<'q, T: Encode<'q, Postgres>> Encode<'q, Postgres> for Inferred<T> {
    fn encode_by_ref(
        &self,
        buf: &mut PgArgumentBuffer,
    ) -> std::result::Result<IsNull, BoxDynError> {
        self.value.encode_by_ref(buf)
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(self.ty.clone())
    }

    fn size_hint(&self) -> usize {
        self.value.size_hint()
    }
}

impl Type<Postgres> for PgNumeric {
    fn type_info() -> PgTypeInfo {
        <BigDecimal as Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for PgNumeric {
    fn decode(value: PgValueRef<'r>) -> std::result::Result<Self, BoxDynError> {
        match value.format() {
            PgValueFormat::Binary => PgNumeric::from_binary(value.as_bytes()?),
            PgValueFormat::Text => Ok(PgNumeric(value.as_str()?.to_string())),
        }
    }
}

impl Encode<'_, Postgres> for PgNumeric {
    fn encode_by_ref(
        &self,
        buf: &mut PgArgumentBuffer,
    ) -> std::result::Result<IsNull, BoxDynError> {
        self.write_binary(&mut **buf)?;
        Ok(IsNull::No)
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    fn get<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
    where
        T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    {
        row.try_get::<Option<T>, _>(index).ok().flatten()
    }

    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => get::<bool>(row, index).map(Value::Bool),
        "INT2" | "SMALLINT" => get::<i16>(row, index).map(Value::from),
        "INT4" | "INT" | "INTEGER" => get::<i32>(row, index).map(Value::from),
        "INT8" | "BIGINT" => get::<i64>(row, index).map(Value::Int),
        "FLOAT4" | "REAL" => get::<f32>(row, index).map(|v| Value::Float(v as f64)),
        "FLOAT8" | "DOUBLE PRECISION" => get::<f64>(row, index).map(Value::Float),
        "NUMERIC" => get::<PgNumeric>(row, index).map(|v| Value::Decimal(v.0)),
        "DATE" => get::<chrono::NaiveDate>(row, index).map(|v| Value::String(v.to_string())),
        "TIME" => get::<chrono::NaiveTime>(row, index).map(|v| Value::String(v.to_string())),
        "TIMESTAMP" => {
            get::<chrono::NaiveDateTime>(row, index).map(|v| Value::String(v.to_string()))
        }
        "TIMESTAMPTZ" => get::<chrono::DateTime<chrono::Utc>>(row, index)
            .map(|v| Value::String(v.to_rfc3339())),
        "JSON" | "JSONB" => {
            get::<serde_json::Value>(row, index).map(|v| Value::String(v.to_string()))
        }
        "BYTEA" => get::<Vec<u8>>(row, index).map(Value::Bytes),
        // For all other types, try to get as string
        _ => get::<String>(row, index).map(Value::String),
    };

    value.unwrap_or(Value::Null)
}

/// Formats a query error with detail and hint lines if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
