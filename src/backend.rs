use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CPUS_PER_TASK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("cpus-per-task pattern compiles"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueFields {
    pub job_queue: String,
    pub job_definition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerFields {
    pub cpus_per_task: String,
    pub partition: String,
    pub time: String,
    pub other_opts: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueOptions {
    pub job_queue: String,
    pub job_definition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus_per_task: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_opts: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackendSpec {
    #[default]
    None,
    Queue(QueueOptions),
    Scheduler(SchedulerOptions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    Local,
    Queue,
    Scheduler,
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionKind::Local => write!(f, "local"),
            ExecutionKind::Queue => write!(f, "aws_batch"),
            ExecutionKind::Scheduler => write!(f, "slurm"),
        }
    }
}

impl BackendSpec {
    pub fn execution_kind(&self) -> ExecutionKind {
        match self {
            BackendSpec::None => ExecutionKind::Local,
            BackendSpec::Queue(_) => ExecutionKind::Queue,
            BackendSpec::Scheduler(_) => ExecutionKind::Scheduler,
        }
    }

    pub fn to_fields(&self) -> (QueueFields, SchedulerFields) {
        match self {
            BackendSpec::None => (QueueFields::default(), SchedulerFields::default()),
            BackendSpec::Queue(opts) => (
                QueueFields {
                    job_queue: opts.job_queue.clone(),
                    job_definition: opts.job_definition.clone(),
                },
                SchedulerFields::default(),
            ),
            BackendSpec::Scheduler(opts) => (
                QueueFields::default(),
                SchedulerFields {
                    cpus_per_task: opts
                        .cpus_per_task
                        .map(|cpus| cpus.to_string())
                        .unwrap_or_default(),
                    partition: opts.partition.clone().unwrap_or_default(),
                    time: opts.time.clone().unwrap_or_default(),
                    other_opts: opts.other_opts.clone().unwrap_or_default(),
                },
            ),
        }
    }

    pub fn queue(&self) -> Option<&QueueOptions> {
        match self {
            BackendSpec::Queue(opts) => Some(opts),
            _ => None,
        }
    }

    pub fn scheduler(&self) -> Option<&SchedulerOptions> {
        match self {
            BackendSpec::Scheduler(opts) => Some(opts),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantState<T> {
    Absent,
    Present(T),
    Invalid(String),
}

pub fn check_queue(fields: &QueueFields) -> VariantState<QueueOptions> {
    match (fields.job_queue.is_empty(), fields.job_definition.is_empty()) {
        (true, true) => VariantState::Absent,
        (false, false) => VariantState::Present(QueueOptions {
            job_queue: fields.job_queue.clone(),
            job_definition: fields.job_definition.clone(),
        }),
        (false, true) => {
            VariantState::Invalid("job definition is required with a job queue".to_string())
        }
        (true, false) => {
            VariantState::Invalid("job queue is required with a job definition".to_string())
        }
    }
}

pub fn check_scheduler(fields: &SchedulerFields) -> VariantState<SchedulerOptions> {
    let cpus_per_task = if fields.cpus_per_task.is_empty() {
        None
    } else {
        if !CPUS_PER_TASK.is_match(&fields.cpus_per_task) {
            return VariantState::Invalid(format!(
                "cpus per task must be a non-negative integer: {}",
                fields.cpus_per_task
            ));
        }
        match fields.cpus_per_task.parse::<u64>() {
            Ok(cpus) => Some(cpus),
            Err(_) => {
                return VariantState::Invalid(format!(
                    "cpus per task is out of range: {}",
                    fields.cpus_per_task
                ));
            }
        }
    };

    let opts = SchedulerOptions {
        cpus_per_task,
        partition: non_empty(&fields.partition),
        time: non_empty(&fields.time),
        other_opts: non_empty(&fields.other_opts),
    };
    if opts == SchedulerOptions::default() {
        VariantState::Absent
    } else {
        VariantState::Present(opts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendValidation {
    pub spec: BackendSpec,
    pub valid: bool,
    pub issues: Vec<String>,
}

pub fn validate_backend(queue: &QueueFields, scheduler: &SchedulerFields) -> BackendValidation {
    let mut issues = Vec::new();
    let queue = check_queue(queue);
    let scheduler = check_scheduler(scheduler);

    if let VariantState::Invalid(issue) = &queue {
        issues.push(issue.clone());
    }
    if let VariantState::Invalid(issue) = &scheduler {
        issues.push(issue.clone());
    }

    let spec = match (queue, scheduler) {
        (VariantState::Present(_), VariantState::Present(_)) => {
            issues.push("queue and scheduler options cannot both be set".to_string());
            BackendSpec::None
        }
        _ if !issues.is_empty() => BackendSpec::None,
        (VariantState::Present(opts), _) => BackendSpec::Queue(opts),
        (_, VariantState::Present(opts)) => BackendSpec::Scheduler(opts),
        _ => BackendSpec::None,
    };

    BackendValidation {
        spec,
        valid: issues.is_empty(),
        issues,
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
