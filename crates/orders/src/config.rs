use std::time::Duration;

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on one mutating operation, scope included.
    pub operation_timeout: Duration,

    /// Create an empty shipment row alongside each new order.
    pub create_shipment_placeholder: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(10),
            create_shipment_placeholder: true,
        }
    }
}

impl EngineConfig {
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_shipment_placeholder(mut self, enabled: bool) -> Self {
        self.create_shipment_placeholder = enabled;
        self
    }
}
