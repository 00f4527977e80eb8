//! Function schema generation.
//!
//! The schema tells the model which functions exist and how to call them.
//! Its wire shape is:
//!
//! ```json
//! {
//!   "multiply": {
//!     "description": "Multiplies two numbers.",
//!     "parameters": {
//!       "a": {
//!         "type": "integer",
//!         "default value": "None",
//!         "description": "..."
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Functions appear in registration order and parameters in declaration
//! order. Missing descriptions and defaults are reported as the string
//! `"None"`.

mod doc;

use std::fmt::{self, Display};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub use doc::{DocComment, DocParam};

/// Placeholder for a missing description or default value.
pub const NONE_SENTINEL: &str = "None";

/// How parameter descriptions are matched to declared parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DescriptionMatching {
    /// The n-th documented parameter describes the n-th declared one.
    #[default]
    Positional,
    /// A declared parameter takes the description of the documented
    /// parameter with the same name.
    ByName,
}

/// A parameter as declared by a function's input type.
#[derive(Clone, Debug, PartialEq)]
pub struct DeclaredParameter {
    /// Parameter name.
    pub name: String,
    /// Display string of the parameter type.
    pub ty: String,
    /// Default value, if the parameter has one.
    pub default: Option<Value>,
}

impl DeclaredParameter {
    /// Reads the declared parameters from the JSON schema of an input type.
    ///
    /// Parameters are the schema's `properties`, in order. A schema without
    /// properties declares no parameters.
    pub fn from_input_schema(schema: &Value) -> Vec<Self> {
        let Some(properties) =
            schema.get("properties").and_then(Value::as_object)
        else {
            return vec![];
        };
        properties
            .iter()
            .map(|(name, property)| DeclaredParameter {
                name: name.clone(),
                ty: type_name(property),
                default: property.get("default").cloned(),
            })
            .collect()
    }
}

fn type_name(property: &Value) -> String {
    match property.get("type") {
        Some(Value::String(ty)) => return ty.clone(),
        Some(Value::Array(types)) => {
            return types
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" | ");
        }
        _ => {}
    }
    if let Some(reference) = property.get("$ref").and_then(Value::as_str) {
        return reference.rsplit('/').next().unwrap_or(reference).to_owned();
    }
    let variants = ["anyOf", "oneOf"]
        .iter()
        .find_map(|key| property.get(*key).and_then(Value::as_array));
    if let Some(variants) = variants {
        return variants.iter().map(type_name).collect::<Vec<_>>().join(" | ");
    }
    "any".to_owned()
}

/// The schema entry of one parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSchema {
    /// Parameter name.
    pub name: String,
    /// Display string of the parameter type.
    pub ty: String,
    /// Default value, or the `"None"` sentinel.
    pub default: Value,
    /// Description, or the `"None"` sentinel.
    pub description: String,
}

/// The schema entry of one function.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSpec {
    /// Function name.
    pub name: String,
    /// Short description, or the `"None"` sentinel.
    pub description: String,
    /// Parameters in declaration order.
    pub parameters: Vec<ParameterSchema>,
}

impl FunctionSpec {
    /// Builds the entry of one function from its declared parameters and
    /// documentation. Never fails: anything missing becomes `"None"`.
    pub fn new(
        name: &str,
        doc: &str,
        declared: Vec<DeclaredParameter>,
        matching: DescriptionMatching,
    ) -> Self {
        let doc = DocComment::parse(doc);
        let parameters = declared
            .into_iter()
            .enumerate()
            .map(|(idx, param)| {
                let documented = match matching {
                    DescriptionMatching::Positional => doc.params.get(idx),
                    DescriptionMatching::ByName => {
                        doc.params.iter().find(|p| p.name == param.name)
                    }
                };
                ParameterSchema {
                    description: documented
                        .map(|p| p.description.clone())
                        .unwrap_or_else(|| NONE_SENTINEL.to_owned()),
                    default: param
                        .default
                        .unwrap_or_else(|| Value::from(NONE_SENTINEL)),
                    name: param.name,
                    ty: param.ty,
                }
            })
            .collect();
        Self {
            name: name.to_owned(),
            description: doc
                .short_description
                .unwrap_or_else(|| NONE_SENTINEL.to_owned()),
            parameters,
        }
    }

    fn to_value(&self) -> Value {
        let mut parameters = Map::new();
        for param in &self.parameters {
            let mut entry = Map::new();
            entry.insert("type".to_owned(), Value::from(param.ty.as_str()));
            entry.insert("default value".to_owned(), param.default.clone());
            entry.insert(
                "description".to_owned(),
                Value::from(param.description.as_str()),
            );
            parameters.insert(param.name.clone(), Value::Object(entry));
        }
        let mut spec = Map::new();
        spec.insert(
            "description".to_owned(),
            Value::from(self.description.as_str()),
        );
        spec.insert("parameters".to_owned(), Value::Object(parameters));
        Value::Object(spec)
    }
}

/// The schema of a set of functions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionSchema {
    functions: Vec<FunctionSpec>,
}

impl FunctionSchema {
    /// Creates a schema from function entries, keeping their order.
    #[inline]
    pub fn new(functions: Vec<FunctionSpec>) -> Self {
        Self { functions }
    }

    /// Returns the entry of the named function.
    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.iter().find(|spec| spec.name == name)
    }

    /// Returns all entries in order.
    #[inline]
    pub fn functions(&self) -> &[FunctionSpec] {
        &self.functions
    }

    /// Returns the schema as a JSON value.
    pub fn to_value(&self) -> Value {
        let functions = self
            .functions
            .iter()
            .map(|spec| (spec.name.clone(), spec.to_value()))
            .collect::<Map<_, _>>();
        Value::Object(functions)
    }
}

impl Display for FunctionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl Serialize for FunctionSchema {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
