//! Tool registry and typed tool descriptors.
//!
//! The registry is filled once at startup and then shared behind an `Arc`;
//! there is no mutation API reachable through a shared reference, so
//! concurrent lookups need no locking.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::tools::handler::ToolHandler;
use crate::types::{Error, Result};

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    /// Integer within an inclusive range.
    BoundedInt { min: i64, max: i64 },
    Float,
    Bool,
    StringList,
    Enum(Vec<String>),
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Validate a JSON value against this parameter type.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            ParamType::String => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("expected string, got {}", value_type_name(value)))
                }
            }
            ParamType::Int => {
                if value.is_i64() || value.is_u64() {
                    Ok(())
                } else {
                    Err(format!("expected integer, got {}", value_type_name(value)))
                }
            }
            ParamType::BoundedInt { min, max } => match value.as_i64() {
                Some(n) if n >= *min && n <= *max => Ok(()),
                Some(n) => Err(format!("expected integer in {}..={}, got {}", min, max, n)),
                None => Err(format!("expected integer, got {}", value_type_name(value))),
            },
            ParamType::Float => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err(format!("expected number, got {}", value_type_name(value)))
                }
            }
            ParamType::Bool => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("expected boolean, got {}", value_type_name(value)))
                }
            }
            ParamType::StringList => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| format!("expected array, got {}", value_type_name(value)))?;
                for (i, item) in arr.iter().enumerate() {
                    if !item.is_string() {
                        return Err(format!(
                            "expected string at index {}, got {}",
                            i,
                            value_type_name(item)
                        ));
                    }
                }
                Ok(())
            }
            ParamType::Enum(variants) => match value.as_str() {
                Some(s) if variants.iter().any(|v| v == s) => Ok(()),
                Some(s) => Err(format!(
                    "invalid enum value '{}', expected one of: {}",
                    s,
                    variants.join(", ")
                )),
                None => Err(format!(
                    "expected string for enum, got {}",
                    value_type_name(value)
                )),
            },
            ParamType::Optional(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate(value)
                }
            }
        }
    }

    /// Human-readable type name for prompt generation.
    pub fn display_name(&self) -> String {
        match self {
            ParamType::String => "string".to_string(),
            ParamType::Int => "integer".to_string(),
            ParamType::BoundedInt { min, max } => format!("integer({}..={})", min, max),
            ParamType::Float => "number".to_string(),
            ParamType::Bool => "boolean".to_string(),
            ParamType::StringList => "string[]".to_string(),
            ParamType::Enum(variants) => format!("enum({})", variants.join("|")),
            ParamType::Optional(inner) => format!("{}?", inner.display_name()),
        }
    }

    /// JSON Schema fragment for discovery.
    pub fn json_schema(&self) -> Value {
        match self {
            ParamType::String => serde_json::json!({ "type": "string" }),
            ParamType::Int => serde_json::json!({ "type": "integer" }),
            ParamType::BoundedInt { min, max } => {
                serde_json::json!({ "type": "integer", "minimum": min, "maximum": max })
            }
            ParamType::Float => serde_json::json!({ "type": "number" }),
            ParamType::Bool => serde_json::json!({ "type": "boolean" }),
            ParamType::StringList => {
                serde_json::json!({ "type": "array", "items": { "type": "string" } })
            }
            ParamType::Enum(variants) => serde_json::json!({ "type": "string", "enum": variants }),
            ParamType::Optional(inner) => {
                serde_json::json!({ "anyOf": [inner.json_schema(), { "type": "null" }] })
            }
        }
    }

    /// Structural problems that make the type unusable.
    fn check(&self) -> std::result::Result<(), String> {
        match self {
            ParamType::Enum(variants) if variants.is_empty() => {
                Err("enum must declare at least one variant".to_string())
            }
            ParamType::Enum(variants) => {
                let unique: HashSet<&String> = variants.iter().collect();
                if unique.len() != variants.len() {
                    Err("enum variants must be unique".to_string())
                } else {
                    Ok(())
                }
            }
            ParamType::BoundedInt { min, max } if min > max => {
                Err(format!("empty integer range {}..={}", min, max))
            }
            ParamType::Optional(inner) => match inner.as_ref() {
                ParamType::Optional(_) => Err("nested optional type".to_string()),
                other => other.check(),
            },
            _ => Ok(()),
        }
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn required(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            default: None,
        }
    }

    /// Optional parameter; `param_type` is wrapped in `Optional`.
    pub fn optional(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self::required(name, ParamType::Optional(Box::new(param_type)), description)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !matches!(self.param_type, ParamType::Optional(_))
    }

    fn json_schema(&self) -> Value {
        let mut schema = self.param_type.json_schema();
        if let Some(obj) = schema.as_object_mut() {
            obj.insert("description".into(), Value::String(self.description.clone()));
            if let Some(default) = &self.default {
                obj.insert("default".into(), default.clone());
            }
        }
        schema
    }
}

// =============================================================================
// Tool descriptor
// =============================================================================

/// Tool category. Analysis, computation and detection tools share one
/// descriptor/handler abstraction and differ only in this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Analysis,
    Computation,
    Detection,
}

/// Whether the dispatcher must lease a graph session for the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRequirement {
    Graph,
    None,
}

/// Immutable tool record: metadata plus handler reference.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub parameters: Vec<ParamDef>,
    pub session: SessionRequirement,
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("parameters", &self.parameters)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Public metadata returned by discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: ToolCategory,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            parameters: Vec::new(),
            session: SessionRequirement::Graph,
            handler,
        }
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = ParamDef>) -> Self {
        self.parameters.extend(params);
        self
    }

    pub fn without_session(mut self) -> Self {
        self.session = SessionRequirement::None;
        self
    }

    /// JSON Schema of the tool's arguments object.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    pub fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            input_schema: self.input_schema(),
        }
    }

    /// Generate a prompt line for this tool.
    ///
    /// Format: `- tool_name(param1: type, param2?: type): description`
    pub fn to_prompt_line(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let optional = if p.is_required() { "" } else { "?" };
                format!("{}{}: {}", p.name, optional, p.param_type.display_name())
            })
            .collect();

        format!("- {}({}): {}", self.name, params.join(", "), self.description)
    }

    /// Self-consistency of the declared input schema.
    fn check_schema(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_schema("tool name cannot be empty"));
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if param.name.trim().is_empty() {
                return Err(Error::invalid_schema(format!(
                    "tool '{}': parameter name cannot be empty",
                    self.name
                )));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(Error::invalid_schema(format!(
                    "tool '{}': duplicate parameter '{}'",
                    self.name, param.name
                )));
            }
            param.param_type.check().map_err(|e| {
                Error::invalid_schema(format!("tool '{}', parameter '{}': {}", self.name, param.name, e))
            })?;
            if let Some(default) = &param.default {
                param.param_type.validate(default).map_err(|e| {
                    Error::invalid_schema(format!(
                        "tool '{}', parameter '{}': default does not match type: {}",
                        self.name, param.name, e
                    ))
                })?;
            }
        }

        jsonschema::validator_for(&self.input_schema()).map_err(|e| {
            Error::invalid_schema(format!("tool '{}': generated schema rejected: {}", self.name, e))
        })?;
        Ok(())
    }

    /// Check arguments against the declared parameters.
    ///
    /// Collects every problem; the error names each offending parameter.
    pub fn validate_arguments(&self, args: &Map<String, Value>) -> Result<()> {
        let mut params = Vec::new();
        let mut problems = Vec::new();

        // Check required parameters are present
        for param_def in &self.parameters {
            if param_def.is_required() && !args.contains_key(&param_def.name) {
                params.push(param_def.name.clone());
                problems.push(format!("Missing required parameter: {}", param_def.name));
            }
        }

        let known_names: HashMap<&str, &ParamDef> = self
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p))
            .collect();

        // Validate types of provided parameters
        for (key, value) in args {
            match known_names.get(key.as_str()) {
                Some(param_def) => {
                    if let Err(e) = param_def.param_type.validate(value) {
                        params.push(key.clone());
                        problems.push(format!("Parameter '{}': {}", key, e));
                    }
                }
                None => {
                    params.push(key.clone());
                    problems.push(format!("Unknown parameter: {}", key));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::ArgumentValidation { params, problems })
        }
    }

    /// Fill in default values for missing (or null) optional parameters.
    pub fn fill_defaults(&self, args: &mut Map<String, Value>) {
        for param_def in &self.parameters {
            if let Some(default) = &param_def.default {
                let missing = args.get(&param_def.name).map_or(true, Value::is_null);
                if missing {
                    args.insert(param_def.name.clone(), default.clone());
                }
            }
        }
    }
}

// =============================================================================
// Tool registry
// =============================================================================

/// In-memory tool registry keyed by tool name.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    entries: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a tool. Rejects duplicates and malformed schemas.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        descriptor.check_schema()?;
        if self.entries.contains_key(&descriptor.name) {
            return Err(Error::duplicate_tool(descriptor.name));
        }
        tracing::debug!(tool = %descriptor.name, category = ?descriptor.category, "tool registered");
        self.entries.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Resolve a tool by name.
    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::unknown_tool(name))
    }

    /// Check `args` against the named descriptor's schema.
    pub fn validate_arguments(&self, descriptor: &ToolDescriptor, args: &Map<String, Value>) -> Result<()> {
        descriptor.validate_arguments(args)
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All descriptors, sorted by name.
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        let mut entries: Vec<&ToolDescriptor> = self.entries.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Discovery metadata for every registered tool, sorted by name.
    pub fn metadata(&self) -> Vec<ToolMetadata> {
        self.descriptors().into_iter().map(ToolDescriptor::metadata).collect()
    }

    /// Generate formatted prompt section for LLM consumption.
    ///
    /// If `allowed_tools` is Some, only include those tools.
    pub fn generate_prompt(&self, allowed_tools: Option<&[String]>) -> String {
        let entries: Vec<&ToolDescriptor> = match allowed_tools {
            Some(allowed) => allowed.iter().filter_map(|name| self.entries.get(name)).collect(),
            None => self.descriptors(),
        };

        if entries.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(entries.len() + 1);
        lines.push("Available tools:".to_string());
        lines.extend(entries.iter().map(|e| e.to_prompt_line()));
        lines.join("\n")
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::handler::FnHandler;
    use crate::types::ErrorKind;
    use proptest::prelude::*;

    fn noop() -> Arc<dyn ToolHandler> {
        Arc::new(FnHandler::new(|_args| Ok(Value::Null)))
    }

    fn shortest_path_entry() -> ToolDescriptor {
        ToolDescriptor::new(
            "find_shortest_path",
            "Shortest path between two entities",
            ToolCategory::Computation,
            noop(),
        )
        .param(ParamDef::required("from", ParamType::String, "Start entity id"))
        .param(ParamDef::required("to", ParamType::String, "End entity id"))
        .param(
            ParamDef::optional("max_tier", ParamType::BoundedInt { min: 1, max: 10 }, "Maximum tiers")
                .with_default(10),
        )
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn params_of(err: Error) -> Vec<String> {
        match err {
            Error::ArgumentValidation { params, .. } => params,
            other => panic!("expected argument validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(shortest_path_entry()).unwrap();

        assert!(registry.has_tool("find_shortest_path"));
        assert_eq!(registry.len(), 1);
        let entry = registry.lookup("find_shortest_path").unwrap();
        assert_eq!(entry.category, ToolCategory::Computation);
    }

    #[test]
    fn test_lookup_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("nonexistent").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownTool);
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(shortest_path_entry()).unwrap();
        let err = registry.register(shortest_path_entry()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateTool);
    }

    #[test]
    fn test_register_empty_name_fails() {
        let mut registry = ToolRegistry::new();
        let mut entry = shortest_path_entry();
        entry.name = String::new();
        assert_eq!(registry.register(entry).unwrap_err().kind(), ErrorKind::InvalidSchema);
    }

    #[test]
    fn test_register_duplicate_param_fails() {
        let mut registry = ToolRegistry::new();
        let entry = shortest_path_entry().param(ParamDef::required("to", ParamType::Int, "again"));
        let err = registry.register(entry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
        assert!(err.message().contains("duplicate parameter 'to'"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_self_contradictory_types_fail() {
        let bad_types = [
            ParamType::Enum(vec![]),
            ParamType::Enum(vec!["a".into(), "a".into()]),
            ParamType::BoundedInt { min: 5, max: 1 },
            ParamType::Optional(Box::new(ParamType::Optional(Box::new(ParamType::Int)))),
        ];
        for bad in bad_types {
            let mut registry = ToolRegistry::new();
            let entry = ToolDescriptor::new("t", "d", ToolCategory::Analysis, noop())
                .param(ParamDef::required("p", bad, "p"));
            assert_eq!(registry.register(entry).unwrap_err().kind(), ErrorKind::InvalidSchema);
        }
    }

    #[test]
    fn test_register_bad_default_fails() {
        let mut registry = ToolRegistry::new();
        let entry = ToolDescriptor::new("t", "d", ToolCategory::Analysis, noop())
            .param(ParamDef::optional("limit", ParamType::Int, "limit").with_default("ten"));
        let err = registry.register(entry).unwrap_err();
        assert!(err.message().contains("default does not match type"));
    }

    #[test]
    fn test_validate_missing_required_names_param() {
        let entry = shortest_path_entry();
        let err = entry.validate_arguments(&args(serde_json::json!({"from": "A"}))).unwrap_err();
        assert!(err.message().contains("Missing required parameter: to"));
        assert_eq!(params_of(err), vec!["to".to_string()]);
    }

    #[test]
    fn test_validate_wrong_type_names_param() {
        let entry = shortest_path_entry();
        let err = entry
            .validate_arguments(&args(serde_json::json!({"from": "A", "to": 42})))
            .unwrap_err();
        assert!(err.message().contains("expected string"));
        assert_eq!(params_of(err), vec!["to".to_string()]);
    }

    #[test]
    fn test_validate_unknown_param_names_param() {
        let entry = shortest_path_entry();
        let err = entry
            .validate_arguments(&args(serde_json::json!({"from": "A", "to": "B", "bogus": true})))
            .unwrap_err();
        assert!(err.message().contains("Unknown parameter: bogus"));
        assert_eq!(params_of(err), vec!["bogus".to_string()]);
    }

    #[test]
    fn test_validate_bounded_int() {
        let entry = shortest_path_entry();
        let err = entry
            .validate_arguments(&args(serde_json::json!({"from": "A", "to": "B", "max_tier": 11})))
            .unwrap_err();
        assert_eq!(params_of(err), vec!["max_tier".to_string()]);
        entry
            .validate_arguments(&args(serde_json::json!({"from": "A", "to": "B", "max_tier": null})))
            .unwrap();
    }

    #[test]
    fn test_fill_defaults() {
        let entry = shortest_path_entry();
        let mut a = args(serde_json::json!({"from": "A", "to": "B"}));
        entry.fill_defaults(&mut a);
        assert_eq!(a["max_tier"], 10);

        let mut a = args(serde_json::json!({"from": "A", "to": "B", "max_tier": 3}));
        entry.fill_defaults(&mut a);
        assert_eq!(a["max_tier"], 3);
    }

    #[test]
    fn test_input_schema_shape() {
        let schema = shortest_path_entry().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], serde_json::json!(["from", "to"]));
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["properties"]["max_tier"]["default"], 10);

        let validator = jsonschema::validator_for(&schema).unwrap();
        assert!(validator.is_valid(&serde_json::json!({"from": "A", "to": "B"})));
        assert!(!validator.is_valid(&serde_json::json!({"from": "A"})));
    }

    #[test]
    fn test_prompt_line_format() {
        let line = shortest_path_entry().to_prompt_line();
        assert_eq!(
            line,
            "- find_shortest_path(from: string, to: string, max_tier?: integer(1..=10)?): Shortest path between two entities"
        );
    }

    #[test]
    fn test_generate_prompt_filtered() {
        let mut registry = ToolRegistry::new();
        registry.register(shortest_path_entry()).unwrap();

        assert!(registry.generate_prompt(None).starts_with("Available tools:"));
        assert!(registry
            .generate_prompt(Some(&["nonexistent".to_string()]))
            .is_empty());
    }

    #[test]
    fn test_metadata_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(ToolDescriptor::new(name, "d", ToolCategory::Detection, noop()))
                .unwrap();
        }
        let names: Vec<String> = registry.metadata().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_param_type_enum_validation() {
        let pt = ParamType::Enum(vec!["inbound".to_string(), "outbound".to_string()]);
        assert!(pt.validate(&serde_json::json!("inbound")).is_ok());
        assert!(pt.validate(&serde_json::json!("sideways")).is_err());
        assert!(pt.validate(&serde_json::json!(42)).is_err());
    }

    #[test]
    fn test_param_type_string_list_validation() {
        let pt = ParamType::StringList;
        assert!(pt.validate(&serde_json::json!(["a", "b"])).is_ok());
        assert!(pt.validate(&serde_json::json!([1, 2])).is_err());
        assert!(pt.validate(&serde_json::json!("not array")).is_err());
    }

    proptest! {
        #[test]
        fn prop_undeclared_names_are_always_reported(extra in "[a-z]{1,12}") {
            prop_assume!(extra != "from" && extra != "to" && extra != "max_tier");
            let entry = shortest_path_entry();
            let mut a = args(serde_json::json!({"from": "A", "to": "B"}));
            a.insert(extra.clone(), Value::Bool(true));
            let params = params_of(entry.validate_arguments(&a).unwrap_err());
            prop_assert_eq!(params, vec![extra]);
        }

        #[test]
        fn prop_non_string_endpoints_rejected(n in any::<i64>()) {
            let entry = shortest_path_entry();
            let a = args(serde_json::json!({"from": n, "to": "B"}));
            let params = params_of(entry.validate_arguments(&a).unwrap_err());
            prop_assert_eq!(params, vec!["from".to_string()]);
        }

        #[test]
        fn prop_conformant_arguments_accepted(from in ".*", to in ".*", tier in 1i64..=10) {
            let entry = shortest_path_entry();
            let a = args(serde_json::json!({"from": from, "to": to, "max_tier": tier}));
            prop_assert!(entry.validate_arguments(&a).is_ok());
        }
    }
}
