use std::path::Path;

use route_forge_axum::{Expectation, FlowFailure, FlowTask, HeaderRule, Predicate};
use route_forge_core::Verb;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::cli::{CheckArgs, GlobalOpts};
use crate::commands::build_server;
use crate::config::{load_config, parse_toml, read_file};
use crate::error::CliError;
use crate::output::{OutputContext, OutputMode};
use crate::progress;

#[derive(Debug, Deserialize)]
struct TaskFile {
    #[serde(default)]
    tasks: Vec<TaskSpec>,
}

/// One `[[tasks]]` entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskSpec {
    model: String,
    verb: Verb,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    search: Map<String, Value>,
    #[serde(default)]
    expect: ExpectSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExpectSpec {
    #[serde(default)]
    code: Option<CodeSpec>,
    #[serde(default)]
    result: Option<ResultSpec>,
}

/// `201`, `"2xx"` or `"any"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CodeSpec {
    Exact(u16),
    Pattern(String),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ResultSpec {
    Present,
    Absent,
    Any,
}

impl CodeSpec {
    fn predicate(&self) -> Result<Predicate<u16>, CliError> {
        match self {
            Self::Exact(code) => Ok(Predicate::equals(*code)),
            Self::Pattern(p) if p.eq_ignore_ascii_case("any") => Ok(Predicate::any()),
            Self::Pattern(p) => {
                let class = p
                    .strip_suffix("xx")
                    .and_then(|d| d.parse::<u16>().ok())
                    .filter(|d| (1..=5).contains(d))
                    .ok_or_else(|| CliError::Config {
                        message: format!("invalid expected code '{p}' (use 201, \"2xx\" or \"any\")"),
                    })?;
                Ok(Predicate::range(class * 100..class * 100 + 100))
            }
        }
    }
}

impl ResultSpec {
    fn predicate(self) -> Predicate<Option<Value>> {
        match self {
            Self::Present => Expectation::default().result,
            Self::Absent => Predicate::new("absent", |r: &Option<Value>| {
                r.as_ref().map_or(true, Value::is_null)
            }),
            Self::Any => Predicate::any(),
        }
    }
}

impl TaskSpec {
    fn into_task(self) -> Result<FlowTask, CliError> {
        let mut expected = Expectation::default();
        if let Some(code) = &self.expect.code {
            expected = expected.with_code(code.predicate()?);
        }
        if let Some(result) = self.expect.result {
            expected = expected.with_result(result.predicate());
        }
        let mut task = FlowTask::new(self.model, self.verb).expect(expected);
        if let Some(payload) = self.payload {
            task = task.with_payload(payload);
        }
        for (key, value) in self.search {
            task = task.with_search(key, value);
        }
        Ok(task)
    }
}

fn load_tasks(path: &Path) -> Result<Vec<FlowTask>, CliError> {
    let source = read_file(path)?;
    let file: TaskFile = parse_toml(&source, path)?;
    file.tasks.into_iter().map(TaskSpec::into_task).collect()
}

/// Outcome of one task, kept for reporting.
struct TaskReport {
    label: String,
    failures: Vec<FlowFailure>,
}

pub async fn run(args: CheckArgs, global: &GlobalOpts, output: &OutputContext) -> Result<(), CliError> {
    let loaded = load_config(global.config.as_deref())?;
    let uploads = tempfile::tempdir().map_err(|e| CliError::Io {
        path: std::env::temp_dir(),
        source: e,
    })?;
    let mut server = build_server(&loaded, uploads.path())?;
    if let Some(token) = &args.token {
        server.headers_mut().set(
            "authorization",
            HeaderRule::optional().with_default(format!("Bearer {token}")),
        );
    }
    server.generate_routes()?;

    let tasks = match &args.tasks {
        Some(path) => load_tasks(path)?,
        None => server
            .models()
            .iter()
            .filter(|r| r.descriptor.is_routable() && !r.descriptor.is_junction())
            .flat_map(|r| FlowTask::smoke(&r.descriptor))
            .collect(),
    };
    let runner = server.flow_runner()?;

    let spinner = progress::maybe_spinner(
        output.show_progress(),
        &format!("Running {} flow tasks...", tasks.len()),
    );
    let mut reports = Vec::with_capacity(tasks.len());
    // Sequential: later tasks read what earlier ones wrote.
    for task in tasks {
        let label = task_label(&task);
        let failures = runner.run(task).await.err().unwrap_or_default();
        reports.push(TaskReport { label, failures });
    }

    let failed = reports.iter().filter(|r| !r.failures.is_empty()).count();
    let total = reports.len();
    if let Some(sp) = &spinner {
        if failed == 0 {
            progress::finish_spinner(sp, &format!("{total} flow tasks passed"));
        } else {
            progress::finish_spinner_error(sp, &format!("{failed} of {total} flow tasks failed"));
        }
    }
    report(&reports, output);

    if failed > 0 {
        return Err(CliError::FlowFailed { failed, total });
    }
    output.success(&format!("{total} flow tasks passed"));
    Ok(())
}

fn task_label(task: &FlowTask) -> String {
    match task.search.get("id") {
        Some(Value::String(id)) => format!("{} {}/{id}", task.verb, task.model),
        Some(id) => format!("{} {}/{id}", task.verb, task.model),
        None => format!("{} {}", task.verb, task.model),
    }
}

fn report(reports: &[TaskReport], output: &OutputContext) {
    match output.mode {
        OutputMode::Json => {
            let tasks: Vec<Value> = reports
                .iter()
                .map(|r| {
                    json!({
                        "task": r.label,
                        "passed": r.failures.is_empty(),
                        "failures": r.failures.iter().map(|f| json!({
                            "validator": f.validator,
                            "expected": f.expected,
                            "actual": f.actual,
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect();
            let failed = reports.iter().filter(|r| !r.failures.is_empty()).count();
            output.print_json(&json!({
                "total": reports.len(),
                "passed": reports.len() - failed,
                "failed": failed,
                "tasks": tasks,
            }));
        }
        OutputMode::Plain => {
            for r in reports {
                if r.failures.is_empty() {
                    println!("ok\t{}", r.label);
                }
                for failure in &r.failures {
                    println!("fail\t{}\t{failure}", r.label);
                }
            }
        }
        OutputMode::Human => {
            for r in reports {
                if r.failures.is_empty() {
                    output.success(&r.label);
                } else {
                    output.failure(&r.label);
                    for failure in &r.failures {
                        output.status(&format!("    {failure}"));
                    }
                }
            }
        }
    }
}
