// ── Remote state seam ──
//
// The engine and worker talk to the server only through this trait so
// tests can substitute a scripted fake for `HassClient`.

use std::future::Future;

use hasslink_api::{ApiError, ApiResponse, ConfigError, EntityState, HassClient, ServiceCall};

pub trait StateApi: Send + Sync + 'static {
    fn init(&mut self) -> Result<(), ConfigError>;

    fn deinit(&mut self);

    fn is_initialized(&self) -> bool;

    fn get_entity_state(
        &self,
        entity_id: &str,
    ) -> impl Future<Output = Result<EntityState, ApiError>> + Send;

    fn get_multiple_entity_states(
        &self,
        entity_ids: &[String],
    ) -> impl Future<Output = Result<Vec<EntityState>, ApiError>> + Send;

    fn call_service(
        &self,
        call: &ServiceCall,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;

    fn get_sensor_value(&self, entity_id: &str)
    -> impl Future<Output = Result<f32, ApiError>> + Send;
}

impl StateApi for HassClient {
    fn init(&mut self) -> Result<(), ConfigError> {
        HassClient::init(self)
    }

    fn deinit(&mut self) {
        HassClient::deinit(self);
    }

    fn is_initialized(&self) -> bool {
        HassClient::is_initialized(self)
    }

    fn get_entity_state(
        &self,
        entity_id: &str,
    ) -> impl Future<Output = Result<EntityState, ApiError>> + Send {
        HassClient::get_entity_state(self, entity_id)
    }

    fn get_multiple_entity_states(
        &self,
        entity_ids: &[String],
    ) -> impl Future<Output = Result<Vec<EntityState>, ApiError>> + Send {
        HassClient::get_multiple_entity_states(self, entity_ids)
    }

    fn call_service(
        &self,
        call: &ServiceCall,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send {
        HassClient::call_service(self, call)
    }

    fn get_sensor_value(
        &self,
        entity_id: &str,
    ) -> impl Future<Output = Result<f32, ApiError>> + Send {
        HassClient::get_sensor_value(self, entity_id)
    }
}
