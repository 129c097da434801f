use storeadmin_core::{new_id, now_rfc3339, ServiceError};
use storeadmin_gateway::{Gateway, Record, Tx};
use storeadmin_paging::{ListQuery, Page};
use storeadmin_sql::Value;

use crate::model::{DeliveryStatus, Notification, NotificationQuery, NotifyAction};

/// What a notification is about.
#[derive(Debug, Clone, Copy)]
pub struct ItemRef<'a> {
    pub ml_id: i64,
    pub category: Option<&'a str>,
    pub image_key: Option<&'a str>,
}

/// Queue one notification per service, inside the caller's transaction.
///
/// Rows become due immediately. Returns the number queued.
pub fn enqueue(
    tx: &Tx<'_>,
    services: &[String],
    action: NotifyAction,
    item: ItemRef<'_>,
    now_unix: i64,
) -> Result<usize, ServiceError> {
    let now = now_rfc3339();
    for service in services {
        tx.insert(&Notification {
            id: new_id(),
            service: service.clone(),
            action,
            ml_id: item.ml_id,
            category: item.category.map(str::to_string),
            image_key: item.image_key.map(str::to_string),
            status: DeliveryStatus::Pending,
            attempts: 0,
            last_error: None,
            next_attempt_at: now_unix,
            created_at: now.clone(),
            updated_at: now.clone(),
        })?;
    }
    Ok(services.len())
}

/// Persistent outbox queue.
#[derive(Clone)]
pub struct OutboxStore {
    gateway: Gateway,
}

impl OutboxStore {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Claim up to `limit` due rows by moving them `PENDING → DELIVERING`.
    ///
    /// A row is only due once every earlier undelivered row for the same
    /// service and item has finished, so a removal is never sent ahead of
    /// the registration it undoes. Claimed rows are leased until
    /// `lease_until`; after that [`reset_stale`](Self::reset_stale) hands
    /// them out again.
    pub fn claim_due(
        &self,
        now_unix: i64,
        lease_until: i64,
        limit: u32,
    ) -> Result<Vec<Notification>, ServiceError> {
        let cols = Notification::COLLECTION.select_list();
        let sql = format!(
            "SELECT {cols} FROM notifications n \
             WHERE n.status = 'PENDING' AND n.next_attempt_at <= ?1 \
             AND NOT EXISTS (SELECT 1 FROM notifications p \
                 WHERE p.service = n.service AND p.ml_id = n.ml_id \
                 AND p.status IN ('PENDING', 'DELIVERING') AND p.rowid < n.rowid) \
             ORDER BY n.rowid LIMIT ?2"
        );

        self.gateway.transaction(|tx| {
            let rows = tx.query(&sql, &[Value::Integer(now_unix), Value::Integer(i64::from(limit))])?;
            let now = now_rfc3339();
            let mut claimed = Vec::with_capacity(rows.len());
            for row in &rows {
                let mut n = Notification::from_row(row)?;
                // CAS: only one claimer wins a PENDING row.
                let affected = tx.exec(
                    "UPDATE notifications SET status = 'DELIVERING', next_attempt_at = ?1, updated_at = ?2 \
                     WHERE id = ?3 AND status = 'PENDING'",
                    &[Value::Integer(lease_until), Value::from(now.as_str()), Value::from(n.id.as_str())],
                )?;
                if affected > 0 {
                    n.status = DeliveryStatus::Delivering;
                    n.next_attempt_at = lease_until;
                    n.updated_at = now.clone();
                    claimed.push(n);
                }
            }
            Ok(claimed)
        })
    }

    pub fn mark_delivered(&self, id: &str) -> Result<(), ServiceError> {
        self.gateway.transaction(|tx| {
            tx.exec(
                "UPDATE notifications SET status = 'DELIVERED', last_error = NULL, updated_at = ?1 \
                 WHERE id = ?2 AND status = 'DELIVERING'",
                &[Value::from(now_rfc3339()), Value::from(id)],
            )?;
            Ok(())
        })
    }

    /// Record a failed attempt: back to `PENDING` at `retry_at`, or `FAILED`
    /// when `give_up` is set. Returns the new status.
    pub fn record_failure(
        &self,
        n: &Notification,
        error: &str,
        retry_at: i64,
        give_up: bool,
    ) -> Result<DeliveryStatus, ServiceError> {
        let status = if give_up {
            DeliveryStatus::Failed
        } else {
            DeliveryStatus::Pending
        };
        self.gateway.transaction(|tx| {
            tx.exec(
                "UPDATE notifications SET status = ?1, attempts = attempts + 1, last_error = ?2, \
                 next_attempt_at = ?3, updated_at = ?4 WHERE id = ?5 AND status = 'DELIVERING'",
                &[
                    Value::from(status.as_str()),
                    Value::from(error),
                    Value::Integer(retry_at),
                    Value::from(now_rfc3339()),
                    Value::from(n.id.as_str()),
                ],
            )?;
            Ok(status)
        })
    }

    /// Return expired `DELIVERING` leases to `PENDING`. Returns how many.
    pub fn reset_stale(&self, now_unix: i64) -> Result<u64, ServiceError> {
        self.gateway.transaction(|tx| {
            tx.exec(
                "UPDATE notifications SET status = 'PENDING', updated_at = ?1 \
                 WHERE status = 'DELIVERING' AND next_attempt_at <= ?2",
                &[Value::from(now_rfc3339()), Value::Integer(now_unix)],
            )
        })
    }

    pub fn get(&self, id: &str) -> Result<Notification, ServiceError> {
        self.gateway.get(id)
    }

    /// Newest first, optionally only one status.
    pub fn list(&self, query: &NotificationQuery) -> Result<Page<Notification>, ServiceError> {
        let page = ListQuery::new(None, query.effective_page(), query.effective_page_size());
        let (where_sql, mut params) = match query.status {
            Some(s) => (" WHERE status = ?1".to_string(), vec![Value::from(s.as_str())]),
            None => (String::new(), Vec::new()),
        };
        let range = page.range();

        self.gateway.transaction(|tx| {
            let rows = tx.query(
                &format!("SELECT COUNT(*) AS cnt FROM notifications{where_sql}"),
                &params,
            )?;
            let total = rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0);

            let idx = params.len() + 1;
            params.push(Value::Integer(i64::try_from(range.limit()).unwrap_or(i64::MAX)));
            params.push(Value::Integer(i64::try_from(range.offset()).unwrap_or(i64::MAX)));
            let sql = format!(
                "SELECT {} FROM notifications{where_sql} ORDER BY rowid DESC LIMIT ?{idx} OFFSET ?{}",
                Notification::COLLECTION.select_list(),
                idx + 1
            );
            let rows = tx
                .query(&sql, &params)?
                .iter()
                .map(Notification::from_row)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page {
                rows,
                total: u64::try_from(total).unwrap_or(0),
            })
        })
    }

    /// Put a `FAILED` row back in the queue with a fresh attempt budget.
    pub fn retry(&self, id: &str, now_unix: i64) -> Result<Notification, ServiceError> {
        self.gateway.transaction(|tx| {
            let current: Notification = tx.get(id)?;
            if current.status != DeliveryStatus::Failed {
                return Err(ServiceError::Conflict(format!(
                    "notification {} is {}, only FAILED can be retried",
                    id, current.status
                )));
            }
            tx.exec(
                "UPDATE notifications SET status = 'PENDING', attempts = 0, last_error = NULL, \
                 next_attempt_at = ?1, updated_at = ?2 WHERE id = ?3",
                &[Value::Integer(now_unix), Value::from(now_rfc3339()), Value::from(id)],
            )?;
            tx.get(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storeadmin_sql::SqliteStore;

    use super::*;
    use crate::service::schema::init_schema;

    fn store() -> (OutboxStore, Gateway) {
        let gw = Gateway::new(Arc::new(SqliteStore::open_in_memory().unwrap())).unwrap();
        init_schema(&gw).unwrap();
        (OutboxStore::new(gw.clone()), gw)
    }

    fn services(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn queue(gw: &Gateway, names: &[&str], action: NotifyAction, ml_id: i64, now: i64) {
        gw.transaction(|tx| {
            enqueue(
                tx,
                &services(names),
                action,
                ItemRef {
                    ml_id,
                    category: Some("Tops"),
                    image_key: None,
                },
                now,
            )
        })
        .unwrap();
    }

    #[test]
    fn enqueue_writes_one_row_per_service() {
        let (outbox, gw) = store();
        queue(&gw, &["similarity", "outfit"], NotifyAction::Register, 1, 100);

        let page = outbox.list(&NotificationQuery::default()).unwrap();
        assert_eq!(page.total, 2);
        assert!(page.rows.iter().all(|n| n.status == DeliveryStatus::Pending));
        assert!(page.rows.iter().all(|n| n.category.as_deref() == Some("Tops")));
    }

    #[test]
    fn claim_is_exclusive() {
        let (outbox, gw) = store();
        queue(&gw, &["similarity", "outfit"], NotifyAction::Register, 1, 100);

        let first = outbox.claim_due(100, 160, 10).unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|n| n.status == DeliveryStatus::Delivering));

        let second = outbox.claim_due(100, 160, 10).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn not_due_rows_are_skipped() {
        let (outbox, gw) = store();
        queue(&gw, &["similarity"], NotifyAction::Register, 1, 200);
        assert!(outbox.claim_due(199, 300, 10).unwrap().is_empty());
        assert_eq!(outbox.claim_due(200, 300, 10).unwrap().len(), 1);
    }

    #[test]
    fn removal_waits_for_earlier_registration() {
        let (outbox, gw) = store();
        queue(&gw, &["similarity"], NotifyAction::Register, 7, 100);
        queue(&gw, &["similarity"], NotifyAction::Remove, 7, 100);

        let claimed = outbox.claim_due(100, 160, 10).unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].action, NotifyAction::Register);

        // Still in flight: the removal stays queued.
        assert!(outbox.claim_due(100, 160, 10).unwrap().is_empty());

        outbox.mark_delivered(&claimed[0].id).unwrap();
        let next = outbox.claim_due(100, 160, 10).unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].action, NotifyAction::Remove);
    }

    #[test]
    fn failure_reschedules_then_gives_up() {
        let (outbox, gw) = store();
        queue(&gw, &["similarity"], NotifyAction::Remove, 3, 100);

        let n = outbox.claim_due(100, 160, 10).unwrap().remove(0);
        let status = outbox.record_failure(&n, "HTTP 503", 130, false).unwrap();
        assert_eq!(status, DeliveryStatus::Pending);

        let stored = outbox.get(&n.id).unwrap();
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.next_attempt_at, 130);
        assert_eq!(stored.last_error.as_deref(), Some("HTTP 503"));
        assert!(outbox.claim_due(129, 200, 10).unwrap().is_empty());

        let n = outbox.claim_due(130, 200, 10).unwrap().remove(0);
        assert_eq!(outbox.record_failure(&n, "HTTP 503", 0, true).unwrap(), DeliveryStatus::Failed);
        assert_eq!(outbox.get(&n.id).unwrap().status, DeliveryStatus::Failed);
        assert!(outbox.claim_due(10_000, 10_060, 10).unwrap().is_empty());
    }

    #[test]
    fn expired_leases_are_reset() {
        let (outbox, gw) = store();
        queue(&gw, &["similarity"], NotifyAction::Register, 1, 100);
        let n = outbox.claim_due(100, 160, 10).unwrap().remove(0);

        assert_eq!(outbox.reset_stale(159).unwrap(), 0);
        assert_eq!(outbox.reset_stale(160).unwrap(), 1);
        assert_eq!(outbox.get(&n.id).unwrap().status, DeliveryStatus::Pending);
        // Lost worker's late result is ignored.
        outbox.mark_delivered(&n.id).unwrap();
        assert_eq!(outbox.get(&n.id).unwrap().status, DeliveryStatus::Pending);
    }

    #[test]
    fn retry_only_failed_rows() {
        let (outbox, gw) = store();
        queue(&gw, &["similarity"], NotifyAction::Register, 1, 100);
        let n = outbox.claim_due(100, 160, 10).unwrap().remove(0);

        assert!(matches!(outbox.retry(&n.id, 100), Err(ServiceError::Conflict(_))));
        assert!(matches!(outbox.retry("missing", 100), Err(ServiceError::NotFound(_))));

        outbox.record_failure(&n, "boom", 0, true).unwrap();
        let retried = outbox.retry(&n.id, 500).unwrap();
        assert_eq!(retried.status, DeliveryStatus::Pending);
        assert_eq!(retried.attempts, 0);
        assert_eq!(retried.last_error, None);
        assert_eq!(retried.next_attempt_at, 500);
    }

    #[test]
    fn list_filters_by_status() {
        let (outbox, gw) = store();
        queue(&gw, &["a", "b", "c"], NotifyAction::Register, 1, 100);
        let claimed = outbox.claim_due(100, 160, 1).unwrap();
        outbox.mark_delivered(&claimed[0].id).unwrap();

        let delivered = outbox
            .list(&NotificationQuery {
                status: Some(DeliveryStatus::Delivered),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(delivered.total, 1);
        assert_eq!(delivered.rows[0].id, claimed[0].id);

        let pending = outbox
            .list(&NotificationQuery {
                status: Some(DeliveryStatus::Pending),
                page: Some(1),
                page_size: Some(1),
            })
            .unwrap();
        assert_eq!(pending.total, 2);
        assert_eq!(pending.rows.len(), 1);
    }
}
