use std::sync::Arc;

use storeadmin_core::ServiceError;
use storeadmin_paging::{ListQuery, Page};
use storeadmin_sql::{Executor, Row, SQLError, SQLStore, Value};
use tracing::debug;

use crate::collection::{Collection, Record};

const SCHEMA: &[&str] = &["CREATE TABLE IF NOT EXISTS sequences (
        name TEXT PRIMARY KEY,
        value INTEGER NOT NULL
    )"];

/// Map a store error onto the service taxonomy.
pub fn storage_error(e: SQLError) -> ServiceError {
    match e {
        SQLError::Constraint(msg) => ServiceError::Conflict(msg),
        other => ServiceError::Storage(other.to_string()),
    }
}

/// Data store gateway: filtered, counted, paged reads and single-row writes
/// against the collections of a [`SQLStore`].
#[derive(Clone)]
pub struct Gateway {
    sql: Arc<dyn SQLStore>,
}

impl Gateway {
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        let gateway = Self { sql };
        gateway.apply_schema(SCHEMA)?;
        Ok(gateway)
    }

    /// Run DDL statements one at a time.
    pub fn apply_schema(&self, statements: &[&str]) -> Result<(), ServiceError> {
        for stmt in statements {
            self.sql
                .exec(stmt, &[])
                .map_err(|e| ServiceError::Storage(format!("schema init failed: {}", e)))?;
        }
        Ok(())
    }

    /// Run `body` in one store transaction.
    ///
    /// `Ok` commits; `Err` rolls back and is returned unchanged. The store is
    /// locked for the duration, so the body must only use the given [`Tx`].
    pub fn transaction<R>(
        &self,
        body: impl FnOnce(&Tx<'_>) -> Result<R, ServiceError>,
    ) -> Result<R, ServiceError> {
        let mut body = Some(body);
        let mut outcome: Option<Result<R, ServiceError>> = None;

        let result = self.sql.transaction(&mut |exec: &dyn Executor| {
            let body = body
                .take()
                .ok_or_else(|| SQLError::Aborted("transaction body already ran".into()))?;
            match body(&Tx { exec }) {
                Ok(value) => {
                    outcome = Some(Ok(value));
                    Ok(())
                }
                Err(e) => {
                    let reason = e.to_string();
                    outcome = Some(Err(e));
                    Err(SQLError::Aborted(reason))
                }
            }
        });

        match (result, outcome) {
            (_, Some(Err(e))) => Err(e),
            (Ok(()), Some(Ok(value))) => Ok(value),
            (Err(e), _) => Err(storage_error(e)),
            (Ok(()), None) => Err(ServiceError::Internal(
                "transaction finished without running its body".into(),
            )),
        }
    }

    pub fn list<R: Record>(&self, query: &ListQuery) -> Result<Page<R>, ServiceError> {
        self.transaction(|tx| tx.list(query))
    }

    pub fn count<R: Record>(&self, search: Option<&str>) -> Result<u64, ServiceError> {
        self.transaction(|tx| tx.count::<R>(search))
    }

    pub fn get<R: Record>(&self, id: &str) -> Result<R, ServiceError> {
        self.transaction(|tx| tx.get(id))
    }

    pub fn insert<R: Record>(&self, record: &R) -> Result<(), ServiceError> {
        self.transaction(|tx| tx.insert(record))
    }

    pub fn update<R: Record>(&self, id: &str, changes: &[(&str, Value)]) -> Result<(), ServiceError> {
        self.transaction(|tx| tx.update::<R>(id, changes))
    }

    pub fn delete<R: Record>(&self, id: &str) -> Result<(), ServiceError> {
        self.transaction(|tx| tx.delete::<R>(id))
    }

    /// Read-only query outside any collection, e.g. aggregates.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ServiceError> {
        self.sql.query(sql, params).map_err(storage_error)
    }
}

/// Operations inside one open transaction.
pub struct Tx<'a> {
    exec: &'a dyn Executor,
}

impl Tx<'_> {
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ServiceError> {
        self.exec.query(sql, params).map_err(storage_error)
    }

    pub fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, ServiceError> {
        self.exec.exec(sql, params).map_err(storage_error)
    }

    /// One page of `R` plus the number of rows matching the same filter.
    pub fn list<R: Record>(&self, query: &ListQuery) -> Result<Page<R>, ServiceError> {
        let c = R::COLLECTION;
        let (where_sql, mut params) = filter_clause(&c, query.search.as_deref());

        let total = count_where(self, &c, &where_sql, &params)?;

        let range = query.range();
        let limit_idx = params.len() + 1;
        let offset_idx = params.len() + 2;
        params.push(Value::Integer(to_i64(range.limit())));
        params.push(Value::Integer(to_i64(range.offset())));

        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT ?{} OFFSET ?{}",
            c.select_list(),
            c.name,
            where_sql,
            c.order_by,
            limit_idx,
            offset_idx,
        );
        debug!(collection = c.name, page = query.page, total, "list");

        let rows = self
            .query(&sql, &params)?
            .iter()
            .map(R::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page { rows, total })
    }

    pub fn count<R: Record>(&self, search: Option<&str>) -> Result<u64, ServiceError> {
        let c = R::COLLECTION;
        let (where_sql, params) = filter_clause(&c, search);
        count_where(self, &c, &where_sql, &params)
    }

    pub fn get<R: Record>(&self, id: &str) -> Result<R, ServiceError> {
        let c = R::COLLECTION;
        let sql = format!("SELECT {} FROM {} WHERE id = ?1", c.select_list(), c.name);
        let rows = self.query(&sql, &[Value::from(id)])?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("{}/{}", c.name, id)))?;
        R::from_row(row)
    }

    pub fn insert<R: Record>(&self, record: &R) -> Result<(), ServiceError> {
        let c = R::COLLECTION;
        let values = record.values();
        if values.len() != c.columns.len() {
            return Err(ServiceError::Internal(format!(
                "{}: {} values for {} columns",
                c.name,
                values.len(),
                c.columns.len()
            )));
        }
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            c.name,
            c.select_list(),
            placeholders.join(", "),
        );
        self.exec(&sql, &values)?;
        Ok(())
    }

    /// Overwrite the given columns of one row. Columns not named keep
    /// their values.
    pub fn update<R: Record>(&self, id: &str, changes: &[(&str, Value)]) -> Result<(), ServiceError> {
        let c = R::COLLECTION;
        if changes.is_empty() {
            return self.get::<R>(id).map(|_| ());
        }

        let mut sets = Vec::with_capacity(changes.len());
        let mut params = Vec::with_capacity(changes.len() + 1);
        for (i, (column, value)) in changes.iter().enumerate() {
            if *column == "id" || !c.has_column(column) {
                return Err(ServiceError::Validation(format!(
                    "{}: cannot update column {}",
                    c.name, column
                )));
            }
            sets.push(format!("{} = ?{}", column, i + 1));
            params.push(value.clone());
        }
        let id_idx = params.len() + 1;
        params.push(Value::from(id));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            c.name,
            sets.join(", "),
            id_idx
        );
        if self.exec(&sql, &params)? == 0 {
            return Err(ServiceError::NotFound(format!("{}/{}", c.name, id)));
        }
        Ok(())
    }

    pub fn delete<R: Record>(&self, id: &str) -> Result<(), ServiceError> {
        let c = R::COLLECTION;
        let sql = format!("DELETE FROM {} WHERE id = ?1", c.name);
        if self.exec(&sql, &[Value::from(id)])? == 0 {
            return Err(ServiceError::NotFound(format!("{}/{}", c.name, id)));
        }
        Ok(())
    }

    /// Next value of the named counter, never below `floor + 1`.
    ///
    /// Values are never handed out twice, even after the rows that used
    /// them are deleted.
    pub fn next_sequence(&self, name: &str, floor: i64) -> Result<i64, ServiceError> {
        self.exec(
            "INSERT INTO sequences (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = MAX(value + 1, ?2)",
            &[Value::from(name), Value::Integer(floor + 1)],
        )?;
        let rows = self.query(
            "SELECT value FROM sequences WHERE name = ?1",
            &[Value::from(name)],
        )?;
        rows.first()
            .and_then(|r| r.get_i64("value"))
            .ok_or_else(|| ServiceError::Internal(format!("sequence {} missing", name)))
    }
}

fn count_where(
    tx: &Tx<'_>,
    c: &Collection,
    where_sql: &str,
    params: &[Value],
) -> Result<u64, ServiceError> {
    let sql = format!("SELECT COUNT(*) AS cnt FROM {}{}", c.name, where_sql);
    let rows = tx.query(&sql, params)?;
    let count = rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0);
    Ok(u64::try_from(count).unwrap_or(0))
}

/// `WHERE` clause for a search, shared by the count and the page query so
/// both always see the same filtered set.
///
/// Both sides are lowered with the store's `fold_case` so the match ignores
/// case beyond ASCII.
fn filter_clause(c: &Collection, search: Option<&str>) -> (String, Vec<Value>) {
    let text = match search.map(str::trim) {
        Some(t) if !t.is_empty() && !c.search.is_empty() => t,
        _ => return (String::new(), Vec::new()),
    };
    let ors: Vec<String> = c
        .search
        .iter()
        .map(|expr| format!("fold_case({}) LIKE ?1 ESCAPE '\\'", expr))
        .collect();
    let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
    (format!(" WHERE ({})", ors.join(" OR ")), vec![Value::Text(pattern)])
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
