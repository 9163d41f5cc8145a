mod apply;
mod events;
mod result;

pub use apply::{ApplyError, ApplyExecutor, ApplyRequest, EchoExecutor, InstanceKey};
pub use events::{CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink};
pub use result::{ExecutionResult, NodeStatus, RunError};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use uuid::Uuid;

use strata_core::planner::Plan;
use strata_core::types::{Manifest, NodeDecl, TagMap};

use crate::resolve::{
    decide_instantiation, resolve_inputs, Instantiation, NodeOutputs, ResolveContext, ResolveError,
};
use crate::secrets::{preflight_secrets, SecretSource, SecretValue};
use crate::vars::{MemoizedVars, VariableSource};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound on node tasks applying at once, across the whole run.
    pub max_concurrency: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { max_concurrency: 10 }
    }
}

/// Cooperative cancellation, checked at tier boundaries. Nodes already
/// running finish; nodes not yet started end up skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Executor {
    config: ExecutorConfig,
    apply: Arc<dyn ApplyExecutor>,
    vars: Arc<dyn VariableSource>,
    secrets: Arc<dyn SecretSource>,
    event_sink: Arc<dyn EventSink>,
}

enum NodeOutcome {
    Applied(NodeOutputs),
    Disabled,
    Failed(String),
    /// Resolution broke an invariant the planner should have upheld; the
    /// run aborts once the current tier has drained.
    Fatal(ResolveError),
}

impl Executor {
    pub fn new(
        config: ExecutorConfig,
        apply: Arc<dyn ApplyExecutor>,
        vars: Arc<dyn VariableSource>,
        secrets: Arc<dyn SecretSource>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        Self { config, apply, vars, secrets, event_sink }
    }

    pub async fn run(
        &self,
        manifest: &Manifest,
        plan: &Plan,
        cancel: &CancelFlag,
    ) -> Result<ExecutionResult, RunError> {
        let run_id = Uuid::new_v4();
        self.event_sink
            .emit(Event::RunStarted { run_id, nodes: manifest.nodes.len() })
            .await;

        // All secret values must exist before the first apply call.
        let bundle = match preflight_secrets(manifest, &*self.secrets).await {
            Ok(bundle) => bundle,
            Err(e) => {
                self.event_sink
                    .emit(Event::RunFinished { run_id, succeeded: false })
                    .await;
                return Err(e.into());
            }
        };

        let vars: Arc<dyn VariableSource> = Arc::new(MemoizedVars::new(self.vars.clone()));
        // A zero permit count would deadlock the first acquire.
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        let mut statuses: BTreeMap<String, NodeStatus> = BTreeMap::new();
        let mut outputs: BTreeMap<String, NodeOutputs> = BTreeMap::new();
        let mut errors: Vec<String> = Vec::new();
        let mut fatal: Option<ResolveError> = None;

        'tiers: for (tier, tier_nodes) in plan.graph.tiers.iter().enumerate() {
            if cancel.is_cancelled() || fatal.is_some() {
                for node_id in plan.graph.tiers[tier..].iter().flatten() {
                    statuses.insert(node_id.clone(), NodeStatus::Skipped);
                    self.event_sink
                        .emit(Event::NodeSkipped { run_id, node: node_id.clone() })
                        .await;
                }
                break 'tiers;
            }

            self.event_sink.emit(Event::TierStarted { run_id, tier }).await;

            // Every node in this tier resolves against the same snapshot of
            // earlier tiers' outputs.
            let snapshot = Arc::new(outputs.clone());
            let mut handles = Vec::new();

            for node_id in tier_nodes {
                if let Some(failed_dep) = self.blocked_by(node_id, plan, &statuses) {
                    statuses.insert(node_id.clone(), NodeStatus::Blocked);
                    self.event_sink
                        .emit(Event::NodeBlocked {
                            run_id,
                            node: node_id.clone(),
                            failed_dependency: failed_dep,
                        })
                        .await;
                    continue;
                }

                let node = manifest
                    .node(node_id)
                    .ok_or_else(|| {
                        RunError::TaskJoin(format!("node '{node_id}' missing from manifest"))
                    })?
                    .clone();
                let tags = plan.node(node_id).map(|n| n.tags.clone()).unwrap_or_default();
                let node_secrets = bundle.get(node_id).cloned();

                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| RunError::TaskJoin(e.to_string()))?;

                let ctx = NodeTask {
                    run_id,
                    node,
                    tags,
                    node_secrets,
                    snapshot: snapshot.clone(),
                    vars: vars.clone(),
                    apply: self.apply.clone(),
                    event_sink: self.event_sink.clone(),
                };

                let handle = tokio::spawn(async move {
                    let outcome = run_node(ctx).await;
                    drop(permit);
                    outcome
                });
                handles.push((node_id.clone(), handle));
            }

            for (node_id, handle) in handles {
                match handle.await {
                    Ok(NodeOutcome::Applied(node_outputs)) => {
                        statuses.insert(node_id.clone(), NodeStatus::Applied);
                        outputs.insert(node_id, node_outputs);
                    }
                    Ok(NodeOutcome::Disabled) => {
                        statuses.insert(node_id.clone(), NodeStatus::Disabled);
                        outputs.insert(node_id, NodeOutputs::Absent);
                    }
                    Ok(NodeOutcome::Failed(message)) => {
                        statuses.insert(node_id.clone(), NodeStatus::Failed);
                        errors.push(format!("{node_id}: {message}"));
                    }
                    Ok(NodeOutcome::Fatal(e)) => {
                        statuses.insert(node_id.clone(), NodeStatus::Failed);
                        if fatal.is_none() {
                            fatal = Some(e);
                        }
                    }
                    Err(e) => {
                        return Err(RunError::TaskJoin(format!("node {node_id}: {e}")));
                    }
                }
            }
        }

        if let Some(e) = fatal {
            self.event_sink
                .emit(Event::RunFinished { run_id, succeeded: false })
                .await;
            return Err(e.into());
        }

        let result = ExecutionResult { run_id, statuses, outputs, errors };
        self.event_sink
            .emit(Event::RunFinished { run_id, succeeded: result.succeeded() })
            .await;
        Ok(result)
    }

    fn blocked_by(
        &self,
        node_id: &str,
        plan: &Plan,
        statuses: &BTreeMap<String, NodeStatus>,
    ) -> Option<String> {
        let deps = plan.graph.depends_on.get(node_id)?;
        deps.iter()
            .find(|dep| {
                matches!(
                    statuses.get(dep.as_str()),
                    Some(NodeStatus::Failed | NodeStatus::Blocked)
                )
            })
            .cloned()
    }
}

struct NodeTask {
    run_id: Uuid,
    node: NodeDecl,
    tags: TagMap,
    node_secrets: Option<BTreeMap<String, SecretValue>>,
    snapshot: Arc<BTreeMap<String, NodeOutputs>>,
    vars: Arc<dyn VariableSource>,
    apply: Arc<dyn ApplyExecutor>,
    event_sink: Arc<dyn EventSink>,
}

async fn run_node(task: NodeTask) -> NodeOutcome {
    let run_id = task.run_id;
    let node_id = task.node.id.clone();
    task.event_sink
        .emit(Event::NodeStarted { run_id, node: node_id.clone() })
        .await;

    let ctx = ResolveContext {
        node: &task.node,
        outputs: &task.snapshot,
        vars: &*task.vars,
        each_key: None,
    };

    let instantiation = match decide_instantiation(&ctx).await {
        Ok(i) => i,
        Err(e) => return NodeOutcome::Fatal(e),
    };

    let outcome = match instantiation {
        Instantiation::Disabled => {
            task.event_sink
                .emit(Event::NodeDisabled { run_id, node: node_id.clone() })
                .await;
            return NodeOutcome::Disabled;
        }
        Instantiation::Single => apply_single(&task).await,
        Instantiation::Keyed { keys } => apply_keyed(&task, &keys).await,
    };

    match &outcome {
        NodeOutcome::Applied(_) => {
            task.event_sink
                .emit(Event::NodeApplied { run_id, node: node_id })
                .await;
        }
        NodeOutcome::Failed(message) => {
            task.event_sink
                .emit(Event::NodeFailed { run_id, node: node_id, message: message.clone() })
                .await;
        }
        _ => {}
    }
    outcome
}

async fn apply_single(task: &NodeTask) -> NodeOutcome {
    let ctx = ResolveContext {
        node: &task.node,
        outputs: &task.snapshot,
        vars: &*task.vars,
        each_key: None,
    };
    let inputs = match resolve_inputs(&ctx).await {
        Ok(inputs) => inputs,
        Err(e) => return NodeOutcome::Fatal(e),
    };

    let request = ApplyRequest {
        node: task.node.id.clone(),
        instance: InstanceKey::Single,
        inputs,
        tags: task.tags.clone(),
        secret: None,
    };
    match task.apply.apply(request).await {
        Ok(produced) => match check_outputs(&task.node, produced) {
            Ok(produced) => NodeOutcome::Applied(NodeOutputs::Single(produced)),
            Err(e) => NodeOutcome::Fatal(e),
        },
        Err(e) => NodeOutcome::Failed(e.message),
    }
}

/// Keys of one node run strictly in declared order; the first failing key
/// fails the node and leaves the remaining keys unattempted.
async fn apply_keyed(task: &NodeTask, keys: &[String]) -> NodeOutcome {
    let mut by_key = BTreeMap::new();
    for key in keys {
        let ctx = ResolveContext {
            node: &task.node,
            outputs: &task.snapshot,
            vars: &*task.vars,
            each_key: Some(key),
        };
        let inputs = match resolve_inputs(&ctx).await {
            Ok(inputs) => inputs,
            Err(e) => return NodeOutcome::Fatal(e),
        };

        let secret = task
            .node_secrets
            .as_ref()
            .and_then(|s| s.get(key))
            .cloned();

        let request = ApplyRequest {
            node: task.node.id.clone(),
            instance: InstanceKey::Key(key.clone()),
            inputs,
            tags: task.tags.clone(),
            secret,
        };
        match task.apply.apply(request).await {
            Ok(produced) => match check_outputs(&task.node, produced) {
                Ok(produced) => {
                    by_key.insert(key.clone(), produced);
                }
                Err(e) => return NodeOutcome::Fatal(e),
            },
            Err(e) => return NodeOutcome::Failed(format!("key '{key}': {}", e.message)),
        }
    }
    NodeOutcome::Applied(NodeOutputs::Keyed(by_key))
}

fn check_outputs(
    node: &NodeDecl,
    produced: BTreeMap<String, strata_core::types::AnyValue>,
) -> Result<BTreeMap<String, strata_core::types::AnyValue>, ResolveError> {
    for declared in &node.outputs {
        if !produced.contains_key(declared) {
            return Err(ResolveError::MissingOutput {
                node: node.id.clone(),
                output: declared.clone(),
            });
        }
    }
    Ok(produced)
}
