use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use flowgate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProviderAdapter;

/// Presence requirement declared for one input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRequirement {
    /// Field key must be present in the payload.
    Required,
    /// Field key may be omitted.
    Optional,
}

/// Declared input schema of an action.
///
/// The schema only declares key presence. Value shapes are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionInputSchema {
    fields: BTreeMap<String, FieldRequirement>,
}

impl ActionInputSchema {
    /// Creates a validated schema from field declarations.
    pub fn new(fields: BTreeMap<String, FieldRequirement>) -> AppResult<Self> {
        if let Some(blank) = fields.keys().find(|name| name.trim().is_empty()) {
            return Err(AppError::Validation(format!(
                "input schema field name '{blank}' must not be empty"
            )));
        }

        Ok(Self { fields })
    }

    /// Parses the stored JSON representation, e.g. `{"customer_id": "required"}`.
    pub fn from_json(value: Value) -> AppResult<Self> {
        let fields = serde_json::from_value::<BTreeMap<String, FieldRequirement>>(value)
            .map_err(|error| AppError::Validation(format!("invalid input schema: {error}")))?;
        Self::new(fields)
    }

    /// Returns the stored JSON representation.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, requirement)| {
                    let requirement = match requirement {
                        FieldRequirement::Required => "required",
                        FieldRequirement::Optional => "optional",
                    };
                    (name.clone(), Value::String(requirement.to_owned()))
                })
                .collect(),
        )
    }

    /// Returns all declared fields.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, FieldRequirement> {
        &self.fields
    }

    /// Returns required field names in stable order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, requirement)| **requirement == FieldRequirement::Required)
            .map(|(name, _)| name.as_str())
    }

    /// Returns required field names that are absent from the payload object.
    ///
    /// A non-object payload is missing every required field.
    #[must_use]
    pub fn missing_fields(&self, payload: &Value) -> Vec<String> {
        let object = payload.as_object();
        self.required_fields()
            .filter(|name| object.is_none_or(|object| !object.contains_key(*name)))
            .map(ToOwned::to_owned)
            .collect()
    }
}

/// Tenant-scoped callable action bound to one provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    app_key: NonEmptyString,
    action_key: NonEmptyString,
    version: u32,
    display_name: Option<String>,
    provider: ProviderAdapter,
    enabled: bool,
    input_schema: ActionInputSchema,
    output_schema: Option<Value>,
    created_at: DateTime<Utc>,
}

/// Input payload used to construct a validated action definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinitionInput {
    /// Application namespace, e.g. `erp`.
    pub app_key: String,
    /// Action name inside the application, e.g. `sync_customers`.
    pub action_key: String,
    /// Positive definition version.
    pub version: u32,
    /// Optional label for admin screens.
    pub display_name: Option<String>,
    /// Provider adapter the action dispatches through.
    pub provider: ProviderAdapter,
    /// Enabled/disabled flag.
    pub enabled: bool,
    /// Required/optional field declarations.
    pub input_schema: ActionInputSchema,
    /// Advisory output schema, never enforced.
    pub output_schema: Option<Value>,
    /// Creation timestamp used for latest-version selection.
    pub created_at: DateTime<Utc>,
}

impl ActionDefinition {
    /// Creates a validated action definition.
    pub fn new(input: ActionDefinitionInput) -> AppResult<Self> {
        let ActionDefinitionInput {
            app_key,
            action_key,
            version,
            display_name,
            provider,
            enabled,
            input_schema,
            output_schema,
            created_at,
        } = input;

        validate_key("app_key", app_key.as_str())?;
        validate_key("action_key", action_key.as_str())?;

        if version == 0 {
            return Err(AppError::Validation(
                "action version must be greater than zero".to_owned(),
            ));
        }

        let display_name = display_name.and_then(|value| {
            let trimmed = value.trim().to_owned();
            (!trimmed.is_empty()).then_some(trimmed)
        });

        Ok(Self {
            app_key: NonEmptyString::new(app_key)?,
            action_key: NonEmptyString::new(action_key)?,
            version,
            display_name,
            provider,
            enabled,
            input_schema,
            output_schema,
            created_at,
        })
    }

    /// Returns the application namespace.
    #[must_use]
    pub fn app_key(&self) -> &NonEmptyString {
        &self.app_key
    }

    /// Returns the action key inside the application.
    #[must_use]
    pub fn action_key(&self) -> &NonEmptyString {
        &self.action_key
    }

    /// Returns the definition version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the optional admin label.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the provider adapter.
    #[must_use]
    pub fn provider(&self) -> &ProviderAdapter {
        &self.provider
    }

    /// Returns whether the definition may be dispatched.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the declared input schema.
    #[must_use]
    pub fn input_schema(&self) -> &ActionInputSchema {
        &self.input_schema
    }

    /// Returns the advisory output schema.
    #[must_use]
    pub fn output_schema(&self) -> Option<&Value> {
        self.output_schema.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the same definition stamped with another creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns the `app.action_key` name sent to providers and written to the ledger.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.app_key.as_str(), self.action_key.as_str())
    }

    /// Checks that every required input field is present in the payload.
    pub fn validate_payload(&self, payload: &Value) -> AppResult<()> {
        if !payload.is_object() {
            return Err(AppError::Validation(format!(
                "input for action '{}' must be a JSON object",
                self.qualified_name()
            )));
        }

        let missing_fields = self.input_schema.missing_fields(payload);
        if !missing_fields.is_empty() {
            return Err(AppError::Validation(format!(
                "input for action '{}' is missing required fields: {}",
                self.qualified_name(),
                missing_fields.join(", ")
            )));
        }

        Ok(())
    }
}

fn validate_key(label: &str, value: &str) -> AppResult<()> {
    let is_valid = !value.is_empty()
        && value.chars().all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        });

    if !is_valid {
        return Err(AppError::Validation(format!(
            "{label} '{value}' must use lowercase letters, digits or underscores"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use proptest::prelude::*;
    use serde_json::{Map, Value, json};

    use super::{ActionDefinition, ActionDefinitionInput, ActionInputSchema, FieldRequirement};
    use crate::ProviderAdapter;

    fn sync_customers(input_schema: ActionInputSchema) -> ActionDefinitionInput {
        ActionDefinitionInput {
            app_key: "erp".to_owned(),
            action_key: "sync_customers".to_owned(),
            version: 1,
            display_name: Some("Sync customers".to_owned()),
            provider: ProviderAdapter::webhook_workflow(),
            enabled: true,
            input_schema,
            output_schema: None,
            created_at: Utc::now(),
        }
    }

    fn customer_schema() -> ActionInputSchema {
        let schema = ActionInputSchema::from_json(json!({
            "customer_id": "required",
            "note": "optional"
        }));
        assert!(schema.is_ok());
        schema.unwrap_or_default()
    }

    #[test]
    fn qualified_name_joins_app_and_action() {
        let definition = ActionDefinition::new(sync_customers(customer_schema()));
        assert!(definition.is_ok());
        assert_eq!(
            definition.map(|value| value.qualified_name()).unwrap_or_default(),
            "erp.sync_customers"
        );
    }

    #[test]
    fn dotted_keys_are_rejected() {
        let mut input = sync_customers(customer_schema());
        input.action_key = "sync.customers".to_owned();
        assert!(ActionDefinition::new(input).is_err());
    }

    #[test]
    fn zero_version_is_rejected() {
        let mut input = sync_customers(customer_schema());
        input.version = 0;
        assert!(ActionDefinition::new(input).is_err());
    }

    #[test]
    fn payload_missing_required_field_is_rejected() {
        let definition = ActionDefinition::new(sync_customers(customer_schema()));
        assert!(definition.is_ok());
        let Ok(definition) = definition else {
            return;
        };

        let result = definition.validate_payload(&json!({"note": "hello"}));
        let message = result.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("customer_id"));
    }

    #[test]
    fn optional_fields_and_null_values_are_accepted() {
        let definition = ActionDefinition::new(sync_customers(customer_schema()));
        assert!(definition.is_ok());
        let Ok(definition) = definition else {
            return;
        };

        assert!(
            definition
                .validate_payload(&json!({"customer_id": null}))
                .is_ok()
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let definition = ActionDefinition::new(sync_customers(customer_schema()));
        assert!(definition.is_ok());
        let Ok(definition) = definition else {
            return;
        };

        assert!(definition.validate_payload(&json!(["c-1"])).is_err());
    }

    #[test]
    fn schema_json_round_trips_through_storage_shape() {
        let schema = customer_schema();
        assert_eq!(
            schema.to_json(),
            json!({"customer_id": "required", "note": "optional"})
        );
    }

    #[test]
    fn unknown_requirement_is_rejected() {
        assert!(ActionInputSchema::from_json(json!({"customer_id": "maybe"})).is_err());
    }

    proptest! {
        #[test]
        fn missing_fields_are_exactly_the_absent_required_keys(
            required in proptest::collection::btree_set("[a-z]{1,6}", 0..6),
            present in proptest::collection::btree_set("[a-z]{1,6}", 0..6),
        ) {
            let fields: BTreeMap<String, FieldRequirement> = required
                .iter()
                .map(|name| (name.clone(), FieldRequirement::Required))
                .collect();
            let schema = ActionInputSchema::new(fields);
            prop_assert!(schema.is_ok());
            let schema = schema.unwrap_or_default();

            let payload: Map<String, Value> = present
                .iter()
                .map(|name| (name.clone(), Value::Bool(true)))
                .collect();
            let missing = schema.missing_fields(&Value::Object(payload));

            let expected: Vec<String> = required.difference(&present).cloned().collect();
            prop_assert_eq!(missing, expected);
        }
    }
}
