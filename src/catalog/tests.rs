use super::*;
use crate::core::error::ToolError;
use crate::core::permission::PermissionTier;
use crate::core::tool::*;
use async_trait::async_trait;
use serde_json::json;

struct StubTool {
    name: &'static str,
    risk: RiskLevel,
    permission: PermissionRequirement,
}

#[async_trait]
impl Tool for StubTool {
    fn definition(&self) -> ToolDefinition {
        let mut params = HashMap::new();
        params.insert("path".into(), ParamSchema::new("string", "Target path"));
        params.insert("limit".into(), ParamSchema::new("integer", "Max items"));
        params.insert(
            "mode".into(),
            ParamSchema::new("string", "Access mode").with_enum(&["read", "write"]),
        );

        ToolDefinition {
            name: self.name.into(),
            description: format!("Stub tool {}", self.name),
            risk_level: self.risk,
            permission: self.permission,
            parameters: params,
            required: vec!["path".into()],
        }
    }

    async fn run(&self, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::success("ok".into()))
    }
}

fn stub(name: &'static str, risk: RiskLevel) -> Arc<dyn Tool> {
    Arc::new(StubTool {
        name,
        risk,
        permission: PermissionRequirement::Prompt,
    })
}

#[test]
fn test_register_and_lookup() {
    let mut catalog = ToolCatalog::new();
    catalog.register(stub("alpha", RiskLevel::Low)).unwrap();
    catalog.register(stub("beta", RiskLevel::High)).unwrap();

    assert_eq!(catalog.count(), 2);
    assert_eq!(catalog.names(), vec!["alpha".to_string(), "beta".to_string()]);

    let entry = catalog.lookup("beta").unwrap();
    assert_eq!(entry.definition.risk_level, RiskLevel::High);
    assert!(catalog.lookup("gamma").is_none());
}

#[test]
fn test_duplicate_registration_leaves_catalog_unchanged() {
    let mut catalog = ToolCatalog::new();
    catalog.register(stub("alpha", RiskLevel::Low)).unwrap();

    let err = catalog
        .register(stub("alpha", RiskLevel::High))
        .unwrap_err();
    assert_eq!(err, CatalogError::DuplicateTool("alpha".into()));

    assert_eq!(catalog.count(), 1);
    // The original definition survives
    assert_eq!(
        catalog.lookup("alpha").unwrap().definition.risk_level,
        RiskLevel::Low
    );
}

#[test]
fn test_export_schemas() {
    let mut catalog = ToolCatalog::new();
    catalog.register(stub("writer", RiskLevel::Medium)).unwrap();

    let schemas = catalog.export_schemas();
    assert_eq!(schemas.len(), 1);

    let schema = &schemas[0];
    assert_eq!(schema.name, "writer");
    assert_eq!(schema.risk_level, RiskLevel::Medium);
    assert_eq!(schema.permission, PermissionRequirement::Prompt);
    assert_eq!(schema.parameters["type"], "object");
    assert_eq!(schema.parameters["required"], json!(["path"]));
    assert_eq!(schema.parameters["properties"]["limit"]["type"], "integer");
    assert_eq!(
        schema.parameters["properties"]["mode"]["enum"],
        json!(["read", "write"])
    );

    let serialized = serde_json::to_value(&schemas).unwrap();
    assert_eq!(serialized[0]["risk_level"], "medium");
    assert_eq!(serialized[0]["permission"], "prompt");
}

#[test]
fn test_default_tiers_follow_risk() {
    let mut catalog = ToolCatalog::new();
    catalog.register(stub("reader", RiskLevel::Low)).unwrap();
    catalog.register(stub("writer", RiskLevel::Medium)).unwrap();
    catalog.register(stub("shell", RiskLevel::High)).unwrap();

    let tiers = catalog.default_tiers();
    assert_eq!(tiers["reader"], PermissionTier::AlwaysAllow);
    assert_eq!(tiers["writer"], PermissionTier::Prompt);
    assert_eq!(tiers["shell"], PermissionTier::Prompt);
}

#[test]
fn test_validate_accepts_valid_params() {
    let def = stub("alpha", RiskLevel::Low).definition();
    let errors = validate_params(&def, &json!({"path": "a.txt", "limit": 3, "mode": "read"}));
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");

    // Undeclared fields and null optionals are tolerated
    let errors = validate_params(&def, &json!({"path": "a.txt", "limit": null, "extra": 1}));
    assert!(errors.is_empty());
}

#[test]
fn test_validate_reports_each_field() {
    let def = stub("alpha", RiskLevel::Low).definition();
    let errors = validate_params(&def, &json!({"limit": "ten", "mode": "delete"}));

    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0].field, "path");
    assert_eq!(errors[0].received, "missing");

    let limit = errors.iter().find(|e| e.field == "limit").unwrap();
    assert_eq!(limit.expected, "integer");
    assert_eq!(limit.received, "string");

    let mode = errors.iter().find(|e| e.field == "mode").unwrap();
    assert_eq!(mode.expected, "one of [read, write]");
    assert_eq!(mode.received, "\"delete\"");
}

#[test]
fn test_validate_rejects_non_object() {
    let def = stub("alpha", RiskLevel::Low).definition();

    let errors = validate_params(&def, &json!(["path"]));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].expected, "object");
    assert_eq!(errors[0].received, "array");

    // Null is read as an empty object
    let errors = validate_params(&def, &serde_json::Value::Null);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "path");
}

#[test]
fn test_validate_integer_vs_number() {
    let def = stub("alpha", RiskLevel::Low).definition();
    let errors = validate_params(&def, &json!({"path": "x", "limit": 2.5}));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].received, "number");
}
