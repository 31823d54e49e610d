//! Domain access policy documents.
//!
//! Context files carry the policy as a JSON object (the validator also accepts
//! its JSON text). `Statement` may be a single object or an array; both
//! normalize to a non-empty statement list.

use serde::Serialize;
use serde_json::{Map, Value};

/// Why a policy document was rejected
pub type PolicyError = String;

const REQUIRED_FIELDS: [&str; 4] = ["Effect", "Principal", "Action", "Resource"];

/// A single policy statement; every field is required and non-empty
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: String,
    pub principal: Value,
    pub action: Value,
    pub resource: Value,
}

/// A validated access policy with at least one statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessPolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Statement")]
    pub statements: Vec<Statement>,
}

impl AccessPolicyDocument {
    /// Version string stamped on generated policies
    pub const DEFAULT_VERSION: &'static str = "2012-10-17";

    /// Parse and validate a raw policy value.
    pub fn from_value(value: &Value) -> Result<Self, PolicyError> {
        let doc = value
            .as_object()
            .ok_or_else(|| "access policy must be a JSON object".to_string())?;

        let version = match doc.get("Version") {
            None => Self::DEFAULT_VERSION.to_string(),
            Some(Value::String(v)) if !v.is_empty() => v.clone(),
            Some(_) => return Err("'Version' must be a non-empty string".to_string()),
        };

        let raw_statements = match doc.get("Statement") {
            None => return Err("'Statement' is required".to_string()),
            Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
            Some(single @ Value::Object(_)) => vec![single],
            Some(_) => return Err("'Statement' must be an object or an array of objects".to_string()),
        };

        if raw_statements.is_empty() {
            return Err("'Statement' must contain at least one statement".to_string());
        }

        let statements = raw_statements
            .into_iter()
            .enumerate()
            .map(|(i, raw)| parse_statement(raw).map_err(|e| format!("statement {i}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version,
            statements,
        })
    }

    /// Policy that lets any principal call any domain API on the named domain.
    pub fn open(domain_name: &str) -> Self {
        Self {
            version: Self::DEFAULT_VERSION.to_string(),
            statements: vec![Statement {
                effect: "Allow".to_string(),
                principal: serde_json::json!({ "AWS": "*" }),
                action: Value::String("es:*".to_string()),
                resource: Value::String(format!("arn:aws:es:*:*:domain/{domain_name}/*")),
            }],
        }
    }

    /// Compact JSON form handed to the provisioner
    pub fn to_json(&self) -> String {
        serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

fn parse_statement(raw: &Value) -> Result<Statement, PolicyError> {
    let obj: &Map<String, Value> = raw
        .as_object()
        .ok_or_else(|| "statement must be an object".to_string())?;

    if obj.is_empty() {
        return Err("statement block is empty".to_string());
    }

    for field in REQUIRED_FIELDS {
        match obj.get(field) {
            None => return Err(format!("missing required field '{field}'")),
            Some(v) if is_blank(v) => return Err(format!("field '{field}' is empty")),
            Some(_) => {}
        }
    }

    let effect = match &obj["Effect"] {
        Value::String(e) if e == "Allow" || e == "Deny" => e.clone(),
        other => return Err(format!("'Effect' must be \"Allow\" or \"Deny\", got {other}")),
    };

    Ok(Statement {
        effect,
        principal: obj["Principal"].clone(),
        action: obj["Action"].clone(),
        resource: obj["Resource"].clone(),
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
