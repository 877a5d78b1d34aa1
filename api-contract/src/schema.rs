//! JSON Schema contract validation.
//!
//! Schemas are looked up by a logical identifier (`"GetUserSchema"`) and
//! compiled on first use. The compiled form is cached for the lifetime of the
//! [`SchemaStore`]; concurrent first use of the same identifier compiles it
//! exactly once.

use crate::error::Error;
use jsonschema::{
    error::{TypeKind, ValidationErrorKind},
    Draft, JSONSchema, ValidationError,
};
use lazy_static::lazy_static;
use serde_json::Value;
use std::{
    collections::HashMap,
    fmt::{self, Debug, Display},
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

const BUNDLED_SCHEMAS: &[(&str, &str)] = &[
    (
        "UserRegistrationSchema",
        include_str!("../schemas/UserRegistrationSchema.json"),
    ),
    (
        "RegistrationErrorSchema",
        include_str!("../schemas/RegistrationErrorSchema.json"),
    ),
    ("GetUserSchema", include_str!("../schemas/GetUserSchema.json")),
    ("ListUsersSchema", include_str!("../schemas/ListUsersSchema.json")),
    ("UpdateUserSchema", include_str!("../schemas/UpdateUserSchema.json")),
];

lazy_static! {
    static ref SHARED_STORE: Arc<SchemaStore> = Arc::new(SchemaStore::new(SchemaSource::Bundled));
}

/// Where schema documents are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// Documents compiled into the crate from `schemas/`.
    Bundled,
    /// `<dir>/<schema id>.json` files read at validation time.
    Directory(PathBuf),
}

impl SchemaSource {
    fn load(&self, schema_id: &str) -> Result<String, Error> {
        match self {
            SchemaSource::Bundled => BUNDLED_SCHEMAS
                .iter()
                .find(|(id, _)| *id == schema_id)
                .map(|(_, document)| document.to_string())
                .ok_or_else(|| Error::SchemaNotFound(schema_id.to_string())),
            SchemaSource::Directory(dir) => {
                if !is_plain_schema_id(schema_id) {
                    return Err(Error::SchemaNotFound(schema_id.to_string()));
                }
                let path = dir.join(format!("{}.json", schema_id));
                if !path.is_file() {
                    return Err(Error::SchemaNotFound(schema_id.to_string()));
                }
                Ok(fs::read_to_string(path)?)
            }
        }
    }
}

/// Identifiers name a file directly inside the schema directory.
fn is_plain_schema_id(schema_id: &str) -> bool {
    !schema_id.is_empty()
        && !schema_id.contains(['/', '\\'])
        && !schema_id.contains("..")
}

struct CompiledSchema {
    validator: JSONSchema,
}

impl CompiledSchema {
    fn compile(schema_id: &str, document: &str) -> Result<Self, Error> {
        let document: Value =
            serde_json::from_str(document).map_err(|e| Error::InvalidSchema {
                schema_id: schema_id.to_string(),
                message: e.to_string(),
            })?;

        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&document)
            .map_err(|e| Error::InvalidSchema {
                schema_id: schema_id.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { validator })
    }
}

/// One place where a body breaks its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer of the offending value. For a missing required property
    /// this is the pointer the property would have had.
    pub pointer: String,
    pub expected: String,
    pub actual: String,
    pub message: String,
}

impl SchemaViolation {
    fn from_error(error: ValidationError<'_>) -> Self {
        let message = error.to_string();
        let mut pointer = error.instance_path.to_string();

        let (expected, actual) = match &error.kind {
            ValidationErrorKind::Required { property } => {
                let name = property
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| property.to_string());
                pointer = format!("{}/{}", pointer, escape_pointer_token(&name));
                ("required property".to_string(), "missing".to_string())
            }
            ValidationErrorKind::Type { kind } => {
                let expected = match kind {
                    TypeKind::Single(primitive) => primitive.to_string(),
                    TypeKind::Multiple(_) => "one of the allowed types".to_string(),
                };
                (expected, json_type_name(&error.instance).to_string())
            }
            ValidationErrorKind::AdditionalProperties { unexpected } => (
                "no additional properties".to_string(),
                unexpected.join(", "),
            ),
            _ => (
                format!("constraint at {}", error.schema_path),
                crate::util::truncate(&error.instance.to_string(), 80),
            ),
        };

        Self {
            pointer,
            expected,
            actual,
            message,
        }
    }
}

impl Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pointer = if self.pointer.is_empty() {
            "/"
        } else {
            self.pointer.as_str()
        };
        write!(
            f,
            "{}: expected {}, actual {}",
            pointer, self.expected, self.actual
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub schema_id: String,
    pub violations: Vec<SchemaViolation>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violation_at(&self, pointer: &str) -> Option<&SchemaViolation> {
        self.violations.iter().find(|v| v.pointer == pointer)
    }

    pub fn into_result(self) -> Result<(), Error> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::SchemaValidation {
                schema_id: self.schema_id,
                violations: self.violations,
            })
        }
    }
}

pub struct SchemaStore {
    source: SchemaSource,
    cache: RwLock<HashMap<String, Arc<CompiledSchema>>>,
    compilations: AtomicUsize,
}

impl SchemaStore {
    pub fn new(source: SchemaSource) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
            compilations: AtomicUsize::new(0),
        }
    }

    /// The process-wide store over the bundled schemas.
    pub fn shared() -> Arc<SchemaStore> {
        SHARED_STORE.clone()
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }

    pub fn validate(&self, body: &Value, schema_id: &str) -> Result<ValidationResult, Error> {
        let schema = self.compiled(schema_id)?;

        let violations = match schema.validator.validate(body) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.map(SchemaViolation::from_error).collect(),
        };

        tracing::debug!(
            schema_id,
            violations = violations.len(),
            "validated body against schema"
        );

        Ok(ValidationResult {
            schema_id: schema_id.to_string(),
            violations,
        })
    }

    /// Number of cached schemas.
    pub fn cached(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Number of times a document has been parsed and compiled.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }

    fn compiled(&self, schema_id: &str) -> Result<Arc<CompiledSchema>, Error> {
        let cached = self.cache.read()?.get(schema_id).cloned();
        if let Some(schema) = cached {
            return Ok(schema);
        }

        let mut cache = self.cache.write()?;
        // another thread may have compiled it while we waited for the write guard
        if let Some(schema) = cache.get(schema_id) {
            return Ok(schema.clone());
        }

        let document = self.source.load(schema_id)?;
        let schema = Arc::new(CompiledSchema::compile(schema_id, &document)?);
        self.compilations.fetch_add(1, Ordering::SeqCst);
        cache.insert(schema_id.to_string(), schema.clone());

        Ok(schema)
    }
}

impl Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaStore")
            .field("source", &self.source)
            .field("cached", &self.cached())
            .finish()
    }
}

fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
