//! In-process self-test harness for generated routes.
//!
//! A [`FlowTask`] describes one request against a model; the [`FlowRunner`]
//! sends it once per registered validator, with that validator's content
//! type, and checks each response against the task's [`Expectation`].

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use axum::http::Method;
use futures::future::join_all;
use route_forge_core::types::{
    AttributeKind, FieldType, ModelDescriptor, Verb,
};
use serde_json::{json, Map, Value};

use crate::headers::HeaderValidator;
use crate::router::{InjectRequest, RequestInjector};
use crate::validation::{SchemaValidator, ValidatorRegistry};
use crate::verbs;

/// A named check on one part of a response.
#[derive(Clone)]
pub struct Predicate<T: ?Sized> {
    description: String,
    check: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: ?Sized> Predicate<T> {
    pub fn new(
        description: impl Into<String>,
        check: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            check: Arc::new(check),
        }
    }

    /// Accepts everything.
    pub fn any() -> Self {
        Self::new("any", |_| true)
    }

    pub fn test(&self, value: &T) -> bool {
        (self.check)(value)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<T: PartialEq + fmt::Debug + Send + Sync + 'static> Predicate<T> {
    pub fn equals(expected: T) -> Self {
        Self::new(format!("{expected:?}"), move |v| *v == expected)
    }
}

impl Predicate<u16> {
    pub fn range(range: Range<u16>) -> Self {
        Self::new(
            format!("[{}, {})", range.start, range.end),
            move |code| range.contains(code),
        )
    }
}

impl<T: ?Sized> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.description).finish()
    }
}

/// What a task's responses must satisfy.
#[derive(Debug, Clone)]
pub struct Expectation {
    pub code: Predicate<u16>,
    /// Sees the parsed body. An empty 204 body is presented as `Some(null)`.
    pub result: Predicate<Option<Value>>,
}

impl Default for Expectation {
    fn default() -> Self {
        Self {
            code: Predicate::range(200..400),
            result: Predicate::new("present", Option::is_some),
        }
    }
}

impl Expectation {
    pub fn with_code(mut self, code: Predicate<u16>) -> Self {
        self.code = code;
        self
    }

    pub fn with_result(mut self, result: Predicate<Option<Value>>) -> Self {
        self.result = result;
        self
    }

    fn describe(&self) -> String {
        format!(
            "code {} and result {}",
            self.code.description(),
            self.result.description()
        )
    }
}

#[derive(Debug, Clone)]
pub struct FlowTask {
    pub model: String,
    pub verb: Verb,
    pub payload: Option<Value>,
    /// `id` selects the target record; other keys become the query string.
    pub search: Map<String, Value>,
    pub expected: Expectation,
}

impl FlowTask {
    pub fn new(model: impl Into<String>, verb: Verb) -> Self {
        Self {
            model: model.into(),
            verb,
            payload: None,
            search: Map::new(),
            expected: Expectation::default(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_search(mut self, key: impl Into<String>, value: Value) -> Self {
        self.search.insert(key.into(), value);
        self
    }

    pub fn expect(mut self, expected: Expectation) -> Self {
        self.expected = expected;
        self
    }

    /// POST a synthesized record, then list the collection.
    pub fn smoke(model: &ModelDescriptor) -> Vec<FlowTask> {
        let name = model.name().to_string();
        let mut tasks = Vec::new();
        if model.verb_enabled(Verb::Post) {
            tasks.push(FlowTask::new(name.clone(), Verb::Post).with_payload(synthesize_payload(model)));
        }
        if model.verb_enabled(Verb::Get) {
            tasks.push(FlowTask::new(name, Verb::Get));
        }
        tasks
    }
}

/// One validator's mismatch.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowFailure {
    pub validator: String,
    pub payload: Option<Value>,
    pub expected: String,
    /// `{ status, result }` as received, or `{ error }` when the request
    /// could not be dispatched.
    pub actual: Value,
}

impl fmt::Display for FlowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] expected {}, got {}",
            self.validator, self.expected, self.actual
        )
    }
}

pub struct FlowRunner {
    injector: Arc<dyn RequestInjector>,
    headers: Arc<HeaderValidator>,
    validators: Arc<ValidatorRegistry>,
    prefix: String,
}

impl fmt::Debug for FlowRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowRunner")
            .field("validators", &self.validators)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl FlowRunner {
    pub fn new(
        injector: Arc<dyn RequestInjector>,
        headers: Arc<HeaderValidator>,
        validators: Arc<ValidatorRegistry>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            injector,
            headers,
            validators,
            prefix: prefix.into(),
        }
    }

    /// Header defaults with `accept` and `content-type` set to the
    /// validator's content type.
    pub fn default_headers(&self, validator: &dyn SchemaValidator) -> BTreeMap<String, String> {
        let mut headers = self.headers.defaults();
        headers.insert("accept".into(), validator.content_type().to_string());
        headers.insert("content-type".into(), validator.content_type().to_string());
        headers
    }

    pub fn url(&self, task: &FlowTask) -> String {
        let id = task.search.get("id").and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        });
        let id = id.map(|id| encode_segment(&id));
        let mut url = format!("{}/{}", self.prefix, task.model);
        match (task.verb, id) {
            (Verb::Post, _) | (_, None) => {}
            (Verb::Upload, Some(id)) => url.push_str(&format!("/{id}/upload")),
            (_, Some(id)) => url.push_str(&format!("/{id}")),
        }

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (key, value) in task.search.iter().filter(|(k, _)| k.as_str() != "id") {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            query.append_pair(key, &value);
            has_query = true;
        }
        if has_query {
            url.push('?');
            url.push_str(&query.finish());
        }
        url
    }

    pub async fn run(&self, task: FlowTask) -> Result<FlowTask, Vec<FlowFailure>> {
        let url = self.url(&task);
        let method = verbs::spec(task.verb).method;
        let attempts = self
            .validators
            .iter()
            .map(|validator| self.attempt(validator.as_ref(), &task, method.clone(), &url));
        let failures: Vec<FlowFailure> = join_all(attempts).await.into_iter().flatten().collect();

        if failures.is_empty() {
            tracing::info!(model = %task.model, verb = %task.verb, path = %url, "flow task passed");
            Ok(task)
        } else {
            tracing::warn!(
                model = %task.model,
                verb = %task.verb,
                path = %url,
                failures = failures.len(),
                "flow task failed"
            );
            Err(failures)
        }
    }

    /// Callback form of [`run`](Self::run).
    pub async fn run_with<R>(
        &self,
        task: FlowTask,
        callback: impl FnOnce(Option<Vec<FlowFailure>>, FlowTask) -> R,
    ) -> R {
        let retained = task.clone();
        match self.run(task).await {
            Ok(task) => callback(None, task),
            Err(failures) => callback(Some(failures), retained),
        }
    }

    async fn attempt(
        &self,
        validator: &dyn SchemaValidator,
        task: &FlowTask,
        method: Method,
        url: &str,
    ) -> Option<FlowFailure> {
        let payload = match task.verb {
            Verb::Get => None,
            _ => task.payload.clone(),
        };
        let request = InjectRequest {
            method,
            url: url.to_string(),
            headers: self.default_headers(validator),
            payload: payload.clone(),
        };
        let failure = |actual: Value| FlowFailure {
            validator: validator.name().to_string(),
            payload: payload.clone(),
            expected: task.expected.describe(),
            actual,
        };

        let response = match self.injector.inject(request).await {
            Ok(response) => response,
            Err(err) => return Some(failure(json!({ "error": err.to_string() }))),
        };
        let result = match (response.status, response.result) {
            (204, None) => Some(Value::Null),
            (_, result) => result,
        };
        let passed = task.expected.code.test(&response.status) && task.expected.result.test(&result);
        tracing::debug!(
            validator = validator.name(),
            status = response.status,
            passed,
            "flow attempt"
        );
        (!passed).then(|| failure(json!({ "status": response.status, "result": result })))
    }
}

/// Percent-encodes one path segment. `byte_serialize` writes spaces as `+`,
/// which a path reads literally, so those become `%20`.
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Longest string [`synthesize_payload`] pads to.
const MAX_SAMPLE_LEN: usize = 4096;

/// A payload accepted by the model's POST schema: every scalar attribute
/// gets the smallest value its constraints allow; relations appear only
/// when required.
pub fn synthesize_payload(model: &ModelDescriptor) -> Value {
    let mut payload = Map::new();
    for (name, attribute) in model.attributes() {
        let value = match &attribute.kind {
            AttributeKind::Scalar(field_type) => sample(field_type),
            AttributeKind::Relation(relation) if attribute.required => {
                if relation.is_collection() {
                    json!(["1"])
                } else {
                    json!("1")
                }
            }
            AttributeKind::Relation(_) => continue,
        };
        payload.insert(name.as_str().to_string(), value);
    }
    Value::Object(payload)
}

fn sample(field_type: &FieldType) -> Value {
    match field_type {
        FieldType::String(constraints) => {
            let mut text = String::from("test");
            if let Some(min) = constraints.min_length {
                let min = (min as usize).min(MAX_SAMPLE_LEN);
                text.push_str(&"x".repeat(min.saturating_sub(text.len())));
            }
            if let Some(max) = constraints.max_length {
                text = text.chars().take(max as usize).collect();
            }
            Value::String(text)
        }
        FieldType::Integer(constraints) => {
            let value = constraints.min.unwrap_or(0);
            json!(constraints.max.map_or(value, |max| value.min(max)))
        }
        FieldType::Float => json!(0.0),
        FieldType::Boolean => json!(true),
        FieldType::Date => json!("1970-01-01"),
        FieldType::DateTime => json!("1970-01-01T00:00:00Z"),
        FieldType::Enum(variants) => variants.first().cloned().map_or(Value::Null, Value::String),
        FieldType::Array => json!([]),
        _ => json!({}),
    }
}
