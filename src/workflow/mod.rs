//! Sequential tool workflows.
//!
//! A workflow is an ordered list of named steps, each invoking one registered
//! tool. Step outputs accumulate in a JSON context keyed by step name, and a
//! step may build its input from that context. Execution is fail-fast: the
//! first structured tool failure aborts the run and names the step.

use serde_json::{json, Value};

use crate::tools::ToolRegistry;
use crate::{Error, Result};

/// How a step derives its tool input
pub enum StepInput {
    /// Input known when the workflow is built
    Fixed(Value),
    /// Input computed from the accumulated context
    FromContext(Box<dyn Fn(&Value) -> Value + Send + Sync>),
}

pub struct WorkflowStep {
    pub name: String,
    pub tool: String,
    pub input: StepInput,
}

impl WorkflowStep {
    pub fn fixed(name: &str, tool: &str, input: Value) -> Self {
        Self {
            name: name.to_string(),
            tool: tool.to_string(),
            input: StepInput::Fixed(input),
        }
    }

    pub fn from_context<F>(name: &str, tool: &str, build: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            tool: tool.to_string(),
            input: StepInput::FromContext(Box::new(build)),
        }
    }
}

pub struct Workflow {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(name: &str, steps: Vec<WorkflowStep>) -> Self {
        Self {
            name: name.to_string(),
            steps,
        }
    }

    /// Run all steps in order. Returns the accumulated context on success;
    /// the first failing step aborts the run with the remaining steps unrun.
    pub async fn run(&self, registry: &ToolRegistry) -> Result<Value> {
        let mut context = json!({});

        for step in &self.steps {
            let input = match &step.input {
                StepInput::Fixed(value) => value.clone(),
                StepInput::FromContext(build) => build(&context),
            };

            log::info!("workflow {}: running step {}", self.name, step.name);
            let output = registry.invoke(&step.tool, input).await;

            if let Some(failure) = output.get("error") {
                return Err(Error::DataError(format!(
                    "workflow '{}' aborted at step '{}' ({}): {}",
                    self.name,
                    step.name,
                    step.tool,
                    failure["message"].as_str().unwrap_or("unknown failure")
                )));
            }

            context[&step.name] = output;
        }

        Ok(context)
    }
}

/// Prebuilt portfolio review: native balance, token balances, market prices
/// for the named terms, then a risk assessment per held mint.
pub fn portfolio_workflow(owner: &str, mints: &[String], price_terms: &[String]) -> Workflow {
    let mut steps = vec![
        WorkflowStep::fixed("balance", "wallet_balance", json!({ "address": owner })),
        WorkflowStep::fixed(
            "token_balances",
            "token_balances",
            json!({ "owner": owner, "mints": mints }),
        ),
    ];

    for term in price_terms {
        steps.push(WorkflowStep::fixed(
            &format!("price_{}", term),
            "token_price",
            json!({ "token": term }),
        ));
    }

    for mint in mints {
        steps.push(WorkflowStep::fixed(
            &format!("risk_{}", mint),
            "token_risk",
            json!({ "mint": mint }),
        ));
    }

    Workflow::new("portfolio_review", steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Echoes its input back under an "echo" key.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "echoes input"
        }

        async fn call(&self, input: Value) -> crate::Result<Value> {
            Ok(json!({ "echo": input }))
        }
    }

    /// Always fails, counting how often it was reached.
    struct FailTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for FailTool {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn description(&self) -> &'static str {
            "always fails"
        }

        async fn call(&self, _input: Value) -> crate::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::DataError("synthetic failure".to_string()))
        }
    }

    struct CountTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountTool {
        fn name(&self) -> &'static str {
            "count"
        }

        fn description(&self) -> &'static str {
            "counts calls"
        }

        async fn call(&self, _input: Value) -> crate::Result<Value> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "call": n }))
        }
    }

    fn registry_with(tools: Vec<Arc<dyn Tool>>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    #[tokio::test]
    async fn test_context_accumulates_by_step_name() {
        let registry = registry_with(vec![Arc::new(EchoTool)]);
        let workflow = Workflow::new(
            "two_echoes",
            vec![
                WorkflowStep::fixed("first", "echo", json!({ "v": 1 })),
                WorkflowStep::from_context("second", "echo", |ctx| {
                    json!({ "prior": ctx["first"]["echo"]["v"] })
                }),
            ],
        );

        let context = workflow.run(&registry).await.unwrap();
        assert_eq!(context["first"]["echo"]["v"], 1);
        assert_eq!(context["second"]["echo"]["prior"], 1);
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining_steps() {
        let fail_calls = Arc::new(AtomicUsize::new(0));
        let count_calls = Arc::new(AtomicUsize::new(0));
        let registry = registry_with(vec![
            Arc::new(FailTool {
                calls: fail_calls.clone(),
            }),
            Arc::new(CountTool {
                calls: count_calls.clone(),
            }),
        ]);

        let workflow = Workflow::new(
            "aborts",
            vec![
                WorkflowStep::fixed("before", "count", json!({})),
                WorkflowStep::fixed("boom", "fail", json!({})),
                WorkflowStep::fixed("after", "count", json!({})),
            ],
        );

        let err = workflow.run(&registry).await.unwrap_err();
        assert!(err.to_string().contains("aborted at step 'boom'"));
        assert_eq!(fail_calls.load(Ordering::SeqCst), 1);
        // The step after the failure never ran.
        assert_eq!(count_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_aborts_run() {
        let registry = registry_with(vec![]);
        let workflow = Workflow::new(
            "missing",
            vec![WorkflowStep::fixed("only", "nope", json!({}))],
        );
        assert!(workflow.run(&registry).await.is_err());
    }

    #[test]
    fn test_portfolio_workflow_shape() {
        let mints = vec!["m1".to_string(), "m2".to_string()];
        let terms = vec!["solana".to_string()];
        let workflow = portfolio_workflow("owner", &mints, &terms);

        let tools: Vec<&str> = workflow.steps.iter().map(|s| s.tool.as_str()).collect();
        assert_eq!(
            tools,
            vec![
                "wallet_balance",
                "token_balances",
                "token_price",
                "token_risk",
                "token_risk",
            ]
        );
    }
}
