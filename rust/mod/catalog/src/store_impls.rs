//! Table mappings for the gateway.

use storeadmin_core::ServiceError;
use storeadmin_gateway::collection::{integer, opt_real, opt_text, real, text};
use storeadmin_gateway::{Collection, Record};
use storeadmin_sql::{Row, Value};

use crate::model::{Customer, DeliveryStatus, Gender, Notification, NotifyAction, Product};

impl Record for Product {
    const COLLECTION: Collection = Collection {
        name: "products",
        columns: &[
            "id",
            "name",
            "image_url",
            "image_key",
            "price",
            "category",
            "gender",
            "ml_id",
            "created_at",
            "updated_at",
        ],
        search: &["name", "category", "gender", "CAST(ml_id AS TEXT)"],
        order_by: "ml_id DESC",
    };

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.as_str()),
            Value::from(self.name.as_str()),
            Value::from(self.image_url.clone()),
            Value::from(self.image_key.clone()),
            Value::Real(self.price),
            Value::from(self.category.as_str()),
            Value::from(self.gender.as_str()),
            Value::Integer(self.ml_id),
            Value::from(self.created_at.as_str()),
            Value::from(self.updated_at.as_str()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, ServiceError> {
        let gender = text(row, "gender")?;
        Ok(Self {
            id: text(row, "id")?,
            name: text(row, "name")?,
            image_url: opt_text(row, "image_url"),
            image_key: opt_text(row, "image_key"),
            price: real(row, "price")?,
            category: text(row, "category")?,
            gender: Gender::parse(&gender)
                .ok_or_else(|| ServiceError::Internal(format!("stored gender {:?}", gender)))?,
            ml_id: integer(row, "ml_id")?,
            created_at: text(row, "created_at")?,
            updated_at: text(row, "updated_at")?,
        })
    }
}

impl Record for Customer {
    const COLLECTION: Collection = Collection {
        name: "profiles",
        columns: &[
            "id",
            "phone",
            "height",
            "weight",
            "body_shape",
            "skin_tone",
            "gender",
            "created_at",
        ],
        search: &["phone", "body_shape", "skin_tone", "gender"],
        order_by: "created_at ASC, id ASC",
    };

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.as_str()),
            Value::from(self.phone.clone()),
            Value::from(self.height),
            Value::from(self.weight),
            Value::from(self.body_shape.clone()),
            Value::from(self.skin_tone.clone()),
            Value::from(self.gender.clone()),
            Value::from(self.created_at.as_str()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, ServiceError> {
        Ok(Self {
            id: text(row, "id")?,
            phone: opt_text(row, "phone"),
            height: opt_real(row, "height"),
            weight: opt_real(row, "weight"),
            body_shape: opt_text(row, "body_shape"),
            skin_tone: opt_text(row, "skin_tone"),
            gender: opt_text(row, "gender"),
            created_at: text(row, "created_at")?,
        })
    }
}

impl Record for Notification {
    const COLLECTION: Collection = Collection {
        name: "notifications",
        columns: &[
            "id",
            "service",
            "action",
            "ml_id",
            "category",
            "image_key",
            "status",
            "attempts",
            "last_error",
            "next_attempt_at",
            "created_at",
            "updated_at",
        ],
        search: &["service"],
        order_by: "rowid DESC",
    };

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.as_str()),
            Value::from(self.service.as_str()),
            Value::from(self.action.as_str()),
            Value::Integer(self.ml_id),
            Value::from(self.category.clone()),
            Value::from(self.image_key.clone()),
            Value::from(self.status.as_str()),
            Value::Integer(i64::from(self.attempts)),
            Value::from(self.last_error.clone()),
            Value::Integer(self.next_attempt_at),
            Value::from(self.created_at.as_str()),
            Value::from(self.updated_at.as_str()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, ServiceError> {
        let action = text(row, "action")?;
        let status = text(row, "status")?;
        Ok(Self {
            id: text(row, "id")?,
            service: text(row, "service")?,
            action: NotifyAction::from_str(&action)
                .ok_or_else(|| ServiceError::Internal(format!("stored action {:?}", action)))?,
            ml_id: integer(row, "ml_id")?,
            category: opt_text(row, "category"),
            image_key: opt_text(row, "image_key"),
            status: DeliveryStatus::from_str(&status)
                .ok_or_else(|| ServiceError::Internal(format!("stored status {:?}", status)))?,
            attempts: u32::try_from(integer(row, "attempts")?).unwrap_or(0),
            last_error: opt_text(row, "last_error"),
            next_attempt_at: integer(row, "next_attempt_at")?,
            created_at: text(row, "created_at")?,
            updated_at: text(row, "updated_at")?,
        })
    }
}
