//! Executable schema construction.
//!
//! Turns a GraphQL SDL document plus a table of field resolvers into a
//! dynamic schema that can be shared read-only by every request handler:
//! - Object types, interfaces, unions, enums, input objects and custom
//!   scalars are supported
//! - Field arguments and their default values are carried over
//! - Fields without a registered resolver read the same-named entry of the
//!   parent value, or resolve to `null` when there is none
//! - Values of interface or union fields pick their concrete type from the
//!   `__typename` entry
//!
//! The schema is built once at startup; there is no way to rebuild it.

use async_graphql::dynamic::{
    self, Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface,
    InterfaceField, Object, ResolverContext, Scalar, TypeRef, Union,
};
use async_graphql::parser::types::{
    BaseType, FieldDefinition, InputValueDefinition, SchemaDefinition, Type, TypeDefinition,
    TypeKind, TypeSystemDefinition,
};
use async_graphql::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Value returned by `Query.greeting`.
pub const GREETING: &str = "Hello World";

const DEFAULT_QUERY_ROOT: &str = "Query";
const DEFAULT_MUTATION_ROOT: &str = "Mutation";
const TYPENAME: &str = "__typename";

/// A synchronous field resolver.
pub type Resolver =
    Arc<dyn Fn(&ResolverContext<'_>) -> async_graphql::Result<Option<Value>> + Send + Sync>;

/// Resolvers keyed by `(type name, field name)`.
#[derive(Clone, Default)]
pub struct Resolvers {
    fields: HashMap<(String, String), Resolver>,
}

impl Resolvers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver for `type_name.field_name`, replacing any previous one.
    pub fn field<F>(mut self, type_name: &str, field_name: &str, resolver: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> async_graphql::Result<Option<Value>>
            + Send
            + Sync
            + 'static,
    {
        self.fields.insert(
            (type_name.to_string(), field_name.to_string()),
            Arc::new(resolver),
        );
        self
    }

    /// Register a resolver that always returns `value`.
    pub fn constant(self, type_name: &str, field_name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.field(type_name, field_name, move |_| Ok(Some(value.clone())))
    }

    fn take(&mut self, type_name: &str, field_name: &str) -> Option<Resolver> {
        self.fields
            .remove(&(type_name.to_string(), field_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The resolver table served by the gateway.
pub fn default_resolvers() -> Resolvers {
    Resolvers::new().constant("Query", "greeting", GREETING)
}

/// Schema construction errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema file '{}': {}", .0.display(), .1)]
    Read(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse schema document: {0}")]
    Parse(#[source] async_graphql::parser::Error),
    #[error("Unsupported {kind} in schema document: {name}")]
    Unsupported { kind: &'static str, name: String },
    #[error("Failed to build schema: {0}")]
    Build(String),
}

/// Read the SDL document at `path` and build the schema from it.
pub fn load(path: &Path, resolvers: Resolvers) -> Result<dynamic::Schema, SchemaError> {
    let sdl =
        std::fs::read_to_string(path).map_err(|e| SchemaError::Read(path.to_path_buf(), e))?;
    build(&sdl, resolvers)
}

/// Build an executable schema from an SDL document.
pub fn build(sdl: &str, mut resolvers: Resolvers) -> Result<dynamic::Schema, SchemaError> {
    let document = async_graphql::parser::parse_schema(sdl).map_err(SchemaError::Parse)?;

    let mut roots: Option<SchemaDefinition> = None;
    let mut types = Vec::new();

    for definition in document.definitions {
        match definition {
            TypeSystemDefinition::Schema(schema) => roots = Some(schema.node),
            TypeSystemDefinition::Type(ty) => types.push(ty.node),
            TypeSystemDefinition::Directive(directive) => {
                return Err(SchemaError::Unsupported {
                    kind: "directive definition",
                    name: directive.node.name.node.to_string(),
                })
            }
        }
    }

    let (query_root, mutation_root) = root_names(roots, &types)?;
    debug!(
        query = %query_root,
        mutation = ?mutation_root,
        resolvers = resolvers.len(),
        "Building schema"
    );

    let abstract_types: HashSet<String> = types
        .iter()
        .filter(|ty| matches!(ty.kind, TypeKind::Interface(_) | TypeKind::Union(_)))
        .map(|ty| ty.name.node.to_string())
        .collect();

    let mut builder = dynamic::Schema::build(&query_root, mutation_root.as_deref(), None);

    for definition in &types {
        if definition.extend {
            return Err(SchemaError::Unsupported {
                kind: "type extension",
                name: definition.name.node.to_string(),
            });
        }

        let name = definition.name.node.as_str();
        let description = definition.description.as_ref().map(|d| d.node.clone());

        builder = match &definition.kind {
            TypeKind::Object(object) => {
                let mut ty = Object::new(name);
                for interface in &object.implements {
                    ty = ty.implement(interface.node.as_str());
                }
                for field in &object.fields {
                    ty = ty.field(object_field(
                        name,
                        &field.node,
                        &abstract_types,
                        &mut resolvers,
                    ));
                }
                if let Some(description) = description {
                    ty = ty.description(description);
                }
                builder.register(ty)
            }
            TypeKind::Enum(enumeration) => {
                let mut ty = Enum::new(name);
                for value in &enumeration.values {
                    let mut item = EnumItem::new(value.node.value.node.as_str());
                    if let Some(description) = &value.node.description {
                        item = item.description(description.node.clone());
                    }
                    ty = ty.item(item);
                }
                if let Some(description) = description {
                    ty = ty.description(description);
                }
                builder.register(ty)
            }
            TypeKind::InputObject(input) => {
                let mut ty = InputObject::new(name);
                for field in &input.fields {
                    ty = ty.field(input_value(&field.node));
                }
                if let Some(description) = description {
                    ty = ty.description(description);
                }
                builder.register(ty)
            }
            TypeKind::Scalar => {
                let mut ty = Scalar::new(name);
                if let Some(description) = description {
                    ty = ty.description(description);
                }
                builder.register(ty)
            }
            TypeKind::Interface(interface) => {
                if let Some(parent) = interface.implements.first() {
                    return Err(SchemaError::Unsupported {
                        kind: "interface inheritance",
                        name: format!("{name} implements {}", parent.node),
                    });
                }
                let mut ty = Interface::new(name);
                for field in &interface.fields {
                    ty = ty.field(interface_field(&field.node));
                }
                if let Some(description) = description {
                    ty = ty.description(description);
                }
                builder.register(ty)
            }
            TypeKind::Union(union_type) => {
                let mut ty = Union::new(name);
                for member in &union_type.members {
                    ty = ty.possible_type(member.node.as_str());
                }
                if let Some(description) = description {
                    ty = ty.description(description);
                }
                builder.register(ty)
            }
        };
    }

    for (type_name, field_name) in resolvers.fields.keys() {
        warn!(
            type_name = %type_name,
            field = %field_name,
            "Resolver has no matching field in schema document"
        );
    }

    builder
        .finish()
        .map_err(|e| SchemaError::Build(e.0))
}

/// Pick the query and mutation root type names.
///
/// An explicit `schema { ... }` block wins; otherwise the conventional
/// `Query`/`Mutation` names are used.
fn root_names(
    roots: Option<SchemaDefinition>,
    types: &[TypeDefinition],
) -> Result<(String, Option<String>), SchemaError> {
    if let Some(roots) = roots {
        if let Some(subscription) = roots.subscription {
            return Err(SchemaError::Unsupported {
                kind: "subscription root",
                name: subscription.node.to_string(),
            });
        }
        let query = roots
            .query
            .map(|name| name.node.to_string())
            .unwrap_or_else(|| DEFAULT_QUERY_ROOT.to_string());
        let mutation = roots.mutation.map(|name| name.node.to_string());
        return Ok((query, mutation));
    }

    let has_mutation = types.iter().any(|ty| {
        ty.name.node.as_str() == DEFAULT_MUTATION_ROOT && matches!(ty.kind, TypeKind::Object(_))
    });

    Ok((
        DEFAULT_QUERY_ROOT.to_string(),
        has_mutation.then(|| DEFAULT_MUTATION_ROOT.to_string()),
    ))
}

fn object_field(
    type_name: &str,
    definition: &FieldDefinition,
    abstract_types: &HashSet<String>,
    resolvers: &mut Resolvers,
) -> Field {
    let field_name = definition.name.node.as_str();
    let ty = type_ref(&definition.ty.node);
    let is_abstract = abstract_types.contains(named_type(&definition.ty.node));

    let resolver = resolvers.take(type_name, field_name);
    let key = field_name.to_string();

    let mut field = Field::new(field_name, ty, move |ctx| {
        let result = match &resolver {
            Some(resolver) => resolver(&ctx),
            None => Ok(parent_entry(&ctx, &key)),
        };
        FieldFuture::new(async move {
            result.map(|value| {
                value.map(|value| {
                    if is_abstract {
                        typed(value)
                    } else {
                        FieldValue::value(value)
                    }
                })
            })
        })
    });

    for argument in &definition.arguments {
        field = field.argument(input_value(&argument.node));
    }
    if let Some(description) = &definition.description {
        field = field.description(description.node.clone());
    }
    field
}

fn interface_field(definition: &FieldDefinition) -> InterfaceField {
    let mut field = InterfaceField::new(
        definition.name.node.as_str(),
        type_ref(&definition.ty.node),
    );
    for argument in &definition.arguments {
        field = field.argument(input_value(&argument.node));
    }
    if let Some(description) = &definition.description {
        field = field.description(description.node.clone());
    }
    field
}

/// Default resolution: the same-named entry of an object parent, else `null`.
fn parent_entry(ctx: &ResolverContext<'_>, key: &str) -> Option<Value> {
    match ctx.parent_value.as_value() {
        Some(Value::Object(entries)) => entries
            .iter()
            .find(|(name, _)| name.as_str() == key)
            .map(|(_, value)| value.clone()),
        _ => None,
    }
}

/// Attach the concrete type named by `__typename` to a value of an
/// interface or union field. Lists are typed item by item.
fn typed<'a>(value: Value) -> FieldValue<'a> {
    match value {
        Value::List(items) => FieldValue::list(items.into_iter().map(typed)),
        Value::Object(entries) => {
            let ty = entries
                .iter()
                .find(|(name, _)| name.as_str() == TYPENAME)
                .and_then(|(_, value)| match value {
                    Value::String(ty) => Some(ty.clone()),
                    _ => None,
                });
            let value = FieldValue::value(Value::Object(entries));
            match ty {
                Some(ty) => value.with_type(ty),
                None => value,
            }
        }
        other => FieldValue::value(other),
    }
}

fn named_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}

fn input_value(definition: &InputValueDefinition) -> InputValue {
    let mut value = InputValue::new(
        definition.name.node.as_str(),
        type_ref(&definition.ty.node),
    );
    if let Some(default) = &definition.default_value {
        value = value.default_value(default.node.clone());
    }
    if let Some(description) = &definition.description {
        value = value.description(description.node.clone());
    }
    value
}

fn type_ref(ty: &Type) -> TypeRef {
    let base = match &ty.base {
        BaseType::Named(name) => TypeRef::named(name.to_string()),
        BaseType::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
    };
    if ty.nullable {
        base
    } else {
        TypeRef::NonNull(Box::new(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::{Request, Variables};
    use serde_json::json;

    const GREETING_SDL: &str = "type Query {\n  greeting: String\n}\n";

    async fn run(schema: &dynamic::Schema, query: &str) -> serde_json::Value {
        let response = schema.execute(Request::new(query)).await;
        serde_json::to_value(&response).unwrap()
    }

    #[tokio::test]
    async fn test_greeting() {
        let schema = build(GREETING_SDL, default_resolvers()).unwrap();
        let body = run(&schema, "{ greeting }").await;
        assert_eq!(body, json!({ "data": { "greeting": "Hello World" } }));
    }

    #[tokio::test]
    async fn test_unresolved_field_is_null() {
        let schema = build("type Query { greeting: String, farewell: String }", default_resolvers())
            .unwrap();
        let body = run(&schema, "{ greeting farewell }").await;
        assert_eq!(
            body,
            json!({ "data": { "greeting": "Hello World", "farewell": null } })
        );
    }

    #[tokio::test]
    async fn test_nested_fields_read_parent_value() {
        let sdl = "type Person { name: String, age: Int }\ntype Query { me: Person }";
        let me = Value::from_json(json!({ "name": "Ada" })).unwrap();
        let schema = build(sdl, Resolvers::new().constant("Query", "me", me)).unwrap();

        let body = run(&schema, "{ me { name age } }").await;
        assert_eq!(
            body,
            json!({ "data": { "me": { "name": "Ada", "age": null } } })
        );
    }

    #[tokio::test]
    async fn test_nested_resolver_wins_over_parent_value() {
        let sdl = "type Person { name: String }\ntype Query { me: Person }";
        let me = Value::from_json(json!({ "name": "Ada" })).unwrap();
        let resolvers = Resolvers::new()
            .constant("Query", "me", me)
            .constant("Person", "name", "Grace");
        let schema = build(sdl, resolvers).unwrap();

        let body = run(&schema, "{ me { name } }").await;
        assert_eq!(body, json!({ "data": { "me": { "name": "Grace" } } }));
    }

    #[tokio::test]
    async fn test_unresolved_non_null_field_errors() {
        let schema = build("type Query { required: String! }", Resolvers::new()).unwrap();
        let body = run(&schema, "{ required }").await;
        assert!(!body["errors"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_arguments_and_defaults() {
        let sdl = r#"
            type Query {
                shout(text: String!, times: Int = 2): String
            }
        "#;
        let resolvers = Resolvers::new().field("Query", "shout", |ctx| {
            let text = ctx.args.try_get("text")?.string()?.to_uppercase();
            let times = ctx.args.try_get("times")?.i64()?;
            Ok(Some(Value::from(text.repeat(times as usize))))
        });
        let schema = build(sdl, resolvers).unwrap();

        let request = Request::new("query Shout($t: String!) { shout(text: $t, times: 3) }")
            .variables(Variables::from_json(json!({ "t": "hi" })));
        let body = serde_json::to_value(schema.execute(request).await).unwrap();
        assert_eq!(body, json!({ "data": { "shout": "HIHIHI" } }));

        let body = run(
            &schema,
            r#"{ __type(name: "Query") { fields { args { name defaultValue } } } }"#,
        )
        .await;
        assert_eq!(
            body["data"]["__type"]["fields"][0]["args"],
            json!([
                { "name": "text", "defaultValue": null },
                { "name": "times", "defaultValue": "2" },
            ])
        );
    }

    #[tokio::test]
    async fn test_enum_and_input_object() {
        let sdl = r#"
            enum Tone { WARM COLD }
            input Greeting { name: String!, tone: Tone! }
            type Query { greet(input: Greeting!): String }
        "#;
        let resolvers = Resolvers::new().field("Query", "greet", |ctx| {
            let input = ctx.args.try_get("input")?.object()?;
            let name = input.try_get("name")?.string()?.to_string();
            let tone = input.try_get("tone")?.enum_name()?.to_string();
            Ok(Some(Value::from(format!("{tone} {name}"))))
        });
        let schema = build(sdl, resolvers).unwrap();

        let body = run(&schema, r#"{ greet(input: { name: "Ada", tone: COLD }) }"#).await;
        assert_eq!(body, json!({ "data": { "greet": "COLD Ada" } }));
    }

    #[tokio::test]
    async fn test_explicit_schema_roots() {
        let sdl = r#"
            schema { query: Root, mutation: Change }
            type Root { greeting: String }
            type Change { touch: Boolean }
        "#;
        let resolvers = Resolvers::new()
            .constant("Root", "greeting", "hey")
            .constant("Change", "touch", true);
        let schema = build(sdl, resolvers).unwrap();

        assert_eq!(
            run(&schema, "{ greeting }").await,
            json!({ "data": { "greeting": "hey" } })
        );
        assert_eq!(
            run(&schema, "mutation { touch }").await,
            json!({ "data": { "touch": true } })
        );
    }

    #[test]
    fn test_conventional_mutation_root() {
        let types = match async_graphql::parser::parse_schema(
            "type Query { a: Int }\ntype Mutation { b: Int }",
        ) {
            Ok(doc) => doc
                .definitions
                .into_iter()
                .filter_map(|d| match d {
                    TypeSystemDefinition::Type(ty) => Some(ty.node),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            Err(e) => panic!("unexpected: {e}"),
        };
        let (query, mutation) = root_names(None, &types).unwrap();
        assert_eq!(query, "Query");
        assert_eq!(mutation.as_deref(), Some("Mutation"));
    }

    #[test]
    fn test_parse_error() {
        let result = build("type Query {", default_resolvers());
        assert!(matches!(result, Err(SchemaError::Parse(_))));
    }

    #[tokio::test]
    async fn test_interface_and_union() {
        let sdl = r#"
            interface Named { name: String }
            type Person implements Named { name: String, age: Int }
            type Robot implements Named { name: String, model: String }
            union Anyone = Person | Robot
            type Query { named: Named, everyone: [Anyone] }
        "#;
        let ada = Value::from_json(json!({ "__typename": "Person", "name": "Ada", "age": 36 }));
        let bot = Value::from_json(json!({ "__typename": "Robot", "name": "R2", "model": "D2" }));
        let (ada, bot) = (ada.unwrap(), bot.unwrap());
        let resolvers = Resolvers::new()
            .constant("Query", "named", ada.clone())
            .constant("Query", "everyone", Value::List(vec![ada, bot]));
        let schema = build(sdl, resolvers).unwrap();

        let body = run(
            &schema,
            r#"{
                named { name ... on Person { age } }
                everyone {
                    __typename
                    ... on Person { name }
                    ... on Robot { model }
                }
            }"#,
        )
        .await;
        assert_eq!(
            body,
            json!({ "data": {
                "named": { "name": "Ada", "age": 36 },
                "everyone": [
                    { "__typename": "Person", "name": "Ada" },
                    { "__typename": "Robot", "model": "D2" },
                ],
            } })
        );
    }

    #[tokio::test]
    async fn test_abstract_value_without_typename_errors() {
        let sdl = "type A { a: Int }\ntype B { b: Int }\nunion AB = A | B\ntype Query { ab: AB }";
        let value = Value::from_json(json!({ "a": 1 })).unwrap();
        let schema = build(sdl, Resolvers::new().constant("Query", "ab", value)).unwrap();
        let body = run(&schema, "{ ab { ... on A { a } } }").await;
        assert!(!body["errors"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_interface_inheritance() {
        let sdl = "interface Node { id: ID! }\ninterface Named implements Node { id: ID!, name: String }\ntype Query { node: Node }";
        assert!(matches!(
            build(sdl, Resolvers::new()),
            Err(SchemaError::Unsupported { kind: "interface inheritance", .. })
        ));
    }

    #[test]
    fn test_rejects_subscription_root() {
        let sdl = "schema { query: Query, subscription: Events }\ntype Query { a: Int }\ntype Events { e: Int }";
        assert!(matches!(
            build(sdl, Resolvers::new()),
            Err(SchemaError::Unsupported { kind: "subscription root", .. })
        ));
    }

    #[test]
    fn test_missing_query_root() {
        let result = build("type Other { a: Int }", Resolvers::new());
        assert!(matches!(result, Err(SchemaError::Build(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load(Path::new("/nonexistent/schema.graphql"), default_resolvers());
        assert!(matches!(result, Err(SchemaError::Read(..))));
    }

    #[test]
    fn test_load_shipped_schema() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("schema.graphql");
        assert!(load(&path, default_resolvers()).is_ok());
    }

    #[test]
    fn test_resolvers_builder() {
        let resolvers = default_resolvers().constant("Query", "greeting", "again");
        assert_eq!(resolvers.len(), 1);
        assert!(Resolvers::new().is_empty());
    }
}
