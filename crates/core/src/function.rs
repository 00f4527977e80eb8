//! Callable functions and the registry the model chooses from.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use schemars::{JsonSchema, schema_for};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::{
    DeclaredParameter, DescriptionMatching, FunctionSchema, FunctionSpec,
};

/// A function that can be offered to the model.
///
/// The declared parameters are the fields of [`Function::Input`], in
/// declaration order, as described by its [`JsonSchema`]. Parameter
/// descriptions and the function description come from [`Function::doc`].
///
/// # Example
///
/// ```
/// use schemars::JsonSchema;
/// use serde::Deserialize;
/// use verdict_core::function::Function;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct Operands {
///     a: i64,
///     b: i64,
/// }
///
/// struct Multiply;
///
/// impl Function for Multiply {
///     type Input = Operands;
///     type Output = i64;
///
///     fn name(&self) -> &str {
///         "multiply"
///     }
///
///     fn doc(&self) -> &str {
///         "Multiplies two numbers.\n\n\
///          Args:\n    a: the multiplicand\n    b: the multiplier"
///     }
///
///     fn call(&self, input: Operands) -> i64 {
///         input.a * input.b
///     }
/// }
/// ```
pub trait Function: Send + Sync + 'static {
    /// The parameters of the function.
    type Input: DeserializeOwned + JsonSchema;

    /// The return value of the function.
    type Output: Serialize;

    /// Returns the name the model refers to the function by.
    fn name(&self) -> &str;

    /// Returns the documentation comment of the function.
    ///
    /// See [`DocComment::parse`](crate::schema::DocComment::parse) for the
    /// recognized parameter list styles.
    fn doc(&self) -> &str {
        ""
    }

    /// Runs the function.
    ///
    /// Agents never call this, it is here for the caller.
    fn call(&self, input: Self::Input) -> Self::Output;
}

/// Input type for functions without parameters.
#[derive(Clone, Copy, Debug, Default, serde::Deserialize, JsonSchema)]
pub struct NoParameters {}

trait FunctionObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn doc(&self) -> &str;

    fn declared_parameters(&self) -> Vec<DeclaredParameter>;

    fn invoke(&self, arguments: Value) -> Result<Value>;
}

struct FunctionObjectImpl<F: Function> {
    function: F,
    input_schema: Value,
}

impl<F: Function> FunctionObject for FunctionObjectImpl<F> {
    #[inline]
    fn name(&self) -> &str {
        self.function.name()
    }

    #[inline]
    fn doc(&self) -> &str {
        self.function.doc()
    }

    #[inline]
    fn declared_parameters(&self) -> Vec<DeclaredParameter> {
        DeclaredParameter::from_input_schema(&self.input_schema)
    }

    fn invoke(&self, arguments: Value) -> Result<Value> {
        let input: F::Input = serde_json::from_value(arguments)
            .map_err(|err| Error::InvalidInput(format!("{err}")))?;
        Ok(serde_json::to_value(self.function.call(input))?)
    }
}

/// A shared handle to a registered function.
#[derive(Clone)]
pub struct FunctionRef(Arc<dyn FunctionObject>);

impl FunctionRef {
    /// Returns the function name.
    #[inline]
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Returns the documentation comment.
    #[inline]
    pub fn doc(&self) -> &str {
        self.0.doc()
    }

    /// Deserializes `parameters` into the function input and calls it.
    ///
    /// This is the caller's explicit decision: model-chosen parameters are
    /// only coerced here, never by the agents.
    #[inline]
    pub fn invoke(&self, parameters: &Map<String, Value>) -> Result<Value> {
        self.0.invoke(Value::Object(parameters.clone()))
    }
}

impl Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FunctionRef").field(&self.name()).finish()
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for FunctionRef {}

/// An immutable name → function table.
///
/// Built once by the caller with [`FunctionRegistry::builder`] and handed to
/// a [`FunctionCaller`](crate::FunctionCaller). Lookups are exact and
/// case-sensitive.
#[derive(Clone, Debug)]
pub struct FunctionRegistry {
    functions: Vec<FunctionRef>,
    index: HashMap<String, usize>,
}

impl FunctionRegistry {
    /// Creates a builder.
    #[inline]
    pub fn builder() -> FunctionRegistryBuilder {
        FunctionRegistryBuilder::default()
    }

    /// Looks up a function by name.
    pub fn get(&self, name: &str) -> Option<&FunctionRef> {
        self.index.get(name).map(|&idx| &self.functions[idx])
    }

    /// Returns `true` if a function with this name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the functions in registration order.
    #[inline]
    pub fn functions(&self) -> &[FunctionRef] {
        &self.functions
    }

    /// Returns the number of functions.
    #[inline]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Always `false`; an empty registry cannot be built.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Generates the schema of all registered functions.
    pub fn schema(&self, matching: DescriptionMatching) -> FunctionSchema {
        let specs = self
            .functions
            .iter()
            .map(|function| {
                FunctionSpec::new(
                    function.name(),
                    function.doc(),
                    function.0.declared_parameters(),
                    matching,
                )
            })
            .collect();
        FunctionSchema::new(specs)
    }
}

/// [`FunctionRegistry`] builder.
#[derive(Default)]
pub struct FunctionRegistryBuilder {
    functions: Vec<FunctionRef>,
}

impl FunctionRegistryBuilder {
    /// Registers a function.
    #[inline]
    pub fn with_function<F: Function>(mut self, function: F) -> Self {
        let input_schema = schema_for!(F::Input).to_value();
        self.functions.push(FunctionRef(Arc::new(FunctionObjectImpl {
            function,
            input_schema,
        })));
        self
    }

    /// Builds the registry.
    ///
    /// Fails if no function was registered or two share a name.
    pub fn build(self) -> Result<FunctionRegistry> {
        if self.functions.is_empty() {
            return Err(Error::MissingConfiguration(
                "no functions registered".to_owned(),
            ));
        }
        let mut index = HashMap::with_capacity(self.functions.len());
        for (idx, function) in self.functions.iter().enumerate() {
            let name = function.name().to_owned();
            if index.insert(name, idx).is_some() {
                return Err(Error::MissingConfiguration(format!(
                    "function `{}` registered twice",
                    function.name()
                )));
            }
        }
        Ok(FunctionRegistry {
            functions: self.functions,
            index,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Deserialize, JsonSchema)]
    pub struct Operands {
        a: i64,
        b: i64,
    }

    pub struct Add;

    impl Function for Add {
        type Input = Operands;
        type Output = i64;

        fn name(&self) -> &str {
            "add"
        }

        fn doc(&self) -> &str {
            "Adds two numbers.\n\n\
             Args:\n    \
                 a (int): the first addend\n    \
                 b (int): the second addend"
        }

        fn call(&self, input: Operands) -> i64 {
            input.a + input.b
        }
    }

    pub struct Multiply;

    impl Function for Multiply {
        type Input = Operands;
        type Output = i64;

        fn name(&self) -> &str {
            "multiply"
        }

        fn doc(&self) -> &str {
            "Multiplies two numbers.\n\n\
             # Arguments\n\n\
             * `a` - the multiplicand\n\
             * `b` - the multiplier"
        }

        fn call(&self, input: Operands) -> i64 {
            input.a * input.b
        }
    }

    pub struct CurrentLocation;

    impl Function for CurrentLocation {
        type Input = NoParameters;
        type Output = &'static str;

        fn name(&self) -> &str {
            "get_location"
        }

        fn call(&self, _input: NoParameters) -> &'static str {
            "USA"
        }
    }

    pub fn arithmetic() -> FunctionRegistry {
        FunctionRegistry::builder()
            .with_function(Add)
            .with_function(Multiply)
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookup_and_invoke() {
        let registry = arithmetic();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("add"));
        assert!(!registry.contains("Add"));

        let multiply = registry.get("multiply").unwrap();
        let params = json!({ "a": 4, "b": 5 });
        let result = multiply.invoke(params.as_object().unwrap()).unwrap();
        assert_eq!(result, json!(20));

        let params = json!({ "a": "four" });
        let err = multiply.invoke(params.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_no_parameters() {
        let registry = FunctionRegistry::builder()
            .with_function(CurrentLocation)
            .build()
            .unwrap();
        let location = registry.get("get_location").unwrap();
        assert_eq!(location.invoke(&Map::new()).unwrap(), json!("USA"));

        let schema =
            registry.schema(DescriptionMatching::Positional).to_value();
        assert_eq!(
            schema,
            json!({
                "get_location": { "description": "None", "parameters": {} }
            })
        );
    }

    #[test]
    fn test_schema_from_input_type() {
        let schema = arithmetic().schema(DescriptionMatching::Positional);
        let value: Value = serde_json::from_str(&schema.to_string()).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 2);
        assert_eq!(
            value["add"],
            json!({
                "description": "Adds two numbers.",
                "parameters": {
                    "a": {
                        "type": "integer",
                        "default value": "None",
                        "description": "the first addend"
                    },
                    "b": {
                        "type": "integer",
                        "default value": "None",
                        "description": "the second addend"
                    }
                }
            })
        );
        assert_eq!(
            value["multiply"]["parameters"]["b"]["description"],
            "the multiplier"
        );
    }

    #[test]
    fn test_invalid_registry() {
        let err = FunctionRegistry::builder().build().unwrap_err();
        assert!(matches!(err, Error::MissingConfiguration(_)));

        let err = FunctionRegistry::builder()
            .with_function(Add)
            .with_function(Add)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingConfiguration(_)));
    }
}
