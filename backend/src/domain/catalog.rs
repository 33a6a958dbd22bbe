//! Service catalogue for a tenant. The public booking page only sees
//! active services; duration and price are frozen onto the
//! appointment at admission time.

use anyhow::{anyhow, Result};
use shared::{CreateServiceRequest, Service};
use tracing::info;
use uuid::Uuid;

use crate::db::DbConnection;

#[derive(Clone)]
pub struct CatalogService {
    db: DbConnection,
}

impl CatalogService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn create_service(&self, tenant_id: &str, request: CreateServiceRequest) -> Result<Service> {
        if request.name.trim().is_empty() {
            return Err(anyhow!("Service name cannot be empty"));
        }
        if request.duration_minutes == 0 {
            return Err(anyhow!("Service duration must be at least 1 minute"));
        }
        if request.price < 0.0 {
            return Err(anyhow!("Service price cannot be negative"));
        }

        let service = Service {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            name: request.name,
            duration_minutes: request.duration_minutes,
            price: request.price,
            is_active: request.is_active,
        };
        self.db.create_service(&service).await?;

        info!(tenant_id, id = %service.id, name = %service.name, "service created");
        Ok(service)
    }

    /// Services offered on the public booking page
    pub async fn list_active(&self, tenant_id: &str) -> Result<Vec<Service>> {
        self.db.list_active_services(tenant_id).await
    }
}
