//! Supply chain audit trail service

use chrono::Utc;
use uuid::Uuid;

use shared::{
    Actor, Capability, NewSupplyChainEvent, SupplyChainEvent, SupplyChainMetadata,
    SupplyChainStage,
};

use super::{authorize, ServiceContext};
use crate::error::{AppError, AppResult};
use crate::external::put_json;

#[derive(Clone)]
pub struct SupplyChainService {
    ctx: ServiceContext,
}

impl SupplyChainService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Append an event to a product's trail
    pub async fn record_event(
        &self,
        actor: &Actor,
        product_id: Uuid,
        input: NewSupplyChainEvent,
    ) -> AppResult<SupplyChainEvent> {
        authorize(actor, Capability::RecordSupplyChainEvent)?;

        let product = self
            .ctx
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        if !actor.is_admin() && product.vendor_id != actor.id {
            return Err(AppError::forbidden(
                "Only the product's vendor can record supply chain events",
            ));
        }

        let stage: SupplyChainStage = input
            .stage
            .parse()
            .map_err(|e: shared::ParseEnumError| AppError::validation("stage", e.to_string()))?;
        shared::validate_coordinates(&input.location)
            .map_err(|m| AppError::validation("location", m))?;
        if let Some(humidity) = input
            .sensor_readings
            .as_ref()
            .and_then(|r| r.humidity_percent)
        {
            shared::validate_humidity(humidity)
                .map_err(|m| AppError::validation("sensor_readings.humidity_percent", m))?;
        }

        let now = Utc::now();
        let mut event = SupplyChainEvent {
            id: Uuid::new_v4(),
            product_id: product.id,
            stage,
            actor_id: actor.id,
            location: input.location,
            occurred_at: input.occurred_at.unwrap_or(now),
            description: input.description,
            attachments: input.attachments,
            sensor_readings: input.sensor_readings,
            extra: input.extra,
            ledger_tx_hash: None,
            metadata_ref: None,
            created_at: now,
        };

        let metadata = SupplyChainMetadata::from(&event);
        event.metadata_ref = self
            .ctx
            .effects
            .run(
                "supply_chain_metadata",
                event.id,
                put_json(self.ctx.adapters.content.as_ref(), &metadata),
            )
            .await;

        let receipt = self
            .ctx
            .effects
            .run(
                "ledger_supply_chain_event",
                event.id,
                self.ctx.adapters.ledger.record_supply_chain_event(
                    event.product_id,
                    event.stage,
                    event.metadata_ref.as_deref(),
                ),
            )
            .await;
        event.ledger_tx_hash = receipt.map(|r| r.tx_hash);

        self.ctx.store.append_event(&event).await?;

        tracing::info!(
            event_id = %event.id,
            product_id = %event.product_id,
            stage = %event.stage,
            "Supply chain event recorded"
        );

        Ok(event)
    }

    /// Public trail in chronological order
    pub async fn list_events(&self, product_id: Uuid) -> AppResult<Vec<SupplyChainEvent>> {
        if self.ctx.store.find_product(product_id).await?.is_none() {
            return Err(AppError::NotFound("Product".to_string()));
        }

        self.ctx.store.list_events(product_id).await
    }
}
