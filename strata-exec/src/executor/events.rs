use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum Event {
    RunStarted {
        run_id: Uuid,
        nodes: usize,
    },
    RunFinished {
        run_id: Uuid,
        succeeded: bool,
    },
    TierStarted {
        run_id: Uuid,
        tier: usize,
    },
    NodeStarted {
        run_id: Uuid,
        node: String,
    },
    NodeApplied {
        run_id: Uuid,
        node: String,
    },
    NodeDisabled {
        run_id: Uuid,
        node: String,
    },
    NodeFailed {
        run_id: Uuid,
        node: String,
        message: String,
    },
    NodeBlocked {
        run_id: Uuid,
        node: String,
        failed_dependency: String,
    },
    NodeSkipped {
        run_id: Uuid,
        node: String,
    },
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// JSON lines on stdout. Events only ever carry node ids and key names,
/// never secret material.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        let json = match event {
            Event::RunStarted { run_id, nodes } => {
                json!({ "type": "run.started", "run_id": run_id.to_string(), "nodes": nodes })
            }
            Event::RunFinished { run_id, succeeded } => {
                json!({ "type": "run.finished", "run_id": run_id.to_string(), "succeeded": succeeded })
            }
            Event::TierStarted { run_id, tier } => {
                json!({ "type": "tier.started", "run_id": run_id.to_string(), "tier": tier })
            }
            Event::NodeStarted { run_id, node } => {
                json!({ "type": "node.started", "run_id": run_id.to_string(), "node": node })
            }
            Event::NodeApplied { run_id, node } => {
                json!({ "type": "node.applied", "run_id": run_id.to_string(), "node": node })
            }
            Event::NodeDisabled { run_id, node } => {
                json!({ "type": "node.disabled", "run_id": run_id.to_string(), "node": node })
            }
            Event::NodeFailed {
                run_id,
                node,
                message,
            } => {
                json!({ "type": "node.failed", "run_id": run_id.to_string(), "node": node, "message": message })
            }
            Event::NodeBlocked {
                run_id,
                node,
                failed_dependency,
            } => {
                json!({ "type": "node.blocked", "run_id": run_id.to_string(), "node": node, "failed_dependency": failed_dependency })
            }
            Event::NodeSkipped { run_id, node } => {
                json!({ "type": "node.skipped", "run_id": run_id.to_string(), "node": node })
            }
        };
        println!("{}", serde_json::to_string(&json).unwrap_or_default());
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}
