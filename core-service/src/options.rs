//! Optional arguments of the client's pass-through calls.

use bridge_traits::trigger::JsonObject;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifyOptions {
    pub user_properties: Option<JsonObject>,
    pub user_properties_set_once: Option<JsonObject>,
}

impl IdentifyOptions {
    pub fn with_user_properties(mut self, properties: JsonObject) -> Self {
        self.user_properties = Some(properties);
        self
    }

    pub fn with_user_properties_set_once(mut self, properties: JsonObject) -> Self {
        self.user_properties_set_once = Some(properties);
        self
    }
}

/// Arguments of `has_feature`, `check_feature` and `refresh_feature`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureQuery {
    pub required_balance: Option<f64>,
    pub entity_id: Option<String>,
}

impl FeatureQuery {
    pub fn with_required_balance(mut self, balance: f64) -> Self {
        self.required_balance = Some(balance);
        self
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }
}

/// Arguments of `use_feature` and `use_feature_and_wait`.
///
/// `set_usage` is only forwarded by `use_feature_and_wait`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureUsage {
    pub amount: Option<f64>,
    pub entity_id: Option<String>,
    pub set_usage: Option<bool>,
    pub metadata: Option<JsonObject>,
}

impl FeatureUsage {
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_set_usage(mut self, set_usage: bool) -> Self {
        self.set_usage = Some(set_usage);
        self
    }

    pub fn with_metadata(mut self, metadata: JsonObject) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
