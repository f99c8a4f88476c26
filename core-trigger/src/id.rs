use uuid::Uuid;

/// Mint a fresh request identifier for a trigger, purchase or restore flow.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
