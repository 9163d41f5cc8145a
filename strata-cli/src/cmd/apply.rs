use std::path::Path;
use std::sync::Arc;

use strata_core::{parse_manifest_str, plan_manifest, ManifestFormat, PlanError, PlanOptions};
use strata_exec::resolve::ResolveError;
use strata_exec::{
    CancelFlag, ChainedVars, EchoExecutor, EnvSecrets, EnvVars, EventSink, Executor,
    ExecutorConfig, NoOpEventSink, RunError, SecretSource, SecretValue, StaticSecrets, StaticVars,
    StdoutEventSink, VariableSource,
};

use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::{ConcurrencyArgs, OutputArgs, SecretsArgs, VarsArgs};

pub async fn apply_cmd(
    path: &Path,
    vars: &VarsArgs,
    secrets: &SecretsArgs,
    concurrency: &ConcurrencyArgs,
    dry_run: bool,
    output: OutputArgs,
) -> i32 {
    let content = match std::fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let Ok(supplied_vars) = super::config::load_vars(vars, &output) else {
        return exit_codes::RUNTIME_ERROR;
    };

    let parsed = match parse_manifest_str(&content, ManifestFormat::Auto) {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let options = PlanOptions {
        vars: supplied_vars.clone(),
    };
    let outcome = match plan_manifest(&parsed.manifest, options) {
        Ok(o) => o,
        Err(PlanError::Parse(e)) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::VALIDATION_FAILED;
        }
        Err(PlanError::Graph(e)) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::CYCLE;
        }
    };

    if !outcome.validation.is_valid {
        for e in &outcome.validation.errors {
            print_error(output.format, output.quiet, e);
        }
        return exit_codes::VALIDATION_FAILED;
    }
    let Some(plan) = outcome.plan else {
        return exit_codes::VALIDATION_FAILED;
    };

    let secret_source: Arc<dyn SecretSource> = match build_secret_source(secrets, &output) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let mut var_sources: Vec<Arc<dyn VariableSource>> = Vec::new();
    if let Some(v) = supplied_vars {
        var_sources.push(Arc::new(StaticVars::from_value(v)));
    }
    var_sources.push(Arc::new(EnvVars::default()));
    let var_source: Arc<dyn VariableSource> = Arc::new(ChainedVars::new(var_sources));

    let event_sink: Arc<dyn EventSink> = if dry_run || output.quiet {
        Arc::new(NoOpEventSink)
    } else {
        Arc::new(StdoutEventSink)
    };

    let executor = Executor::new(
        ExecutorConfig {
            max_concurrency: concurrency.max_concurrency,
        },
        Arc::new(EchoExecutor::new(&parsed.manifest)),
        var_source,
        secret_source,
        event_sink,
    );

    let cancel = CancelFlag::new();
    match executor.run(&parsed.manifest, &plan, &cancel).await {
        Ok(result) => {
            print_result(output.format, output.quiet, &result);
            if result.succeeded() {
                exit_codes::SUCCESS
            } else {
                exit_codes::APPLY_FAILED
            }
        }
        Err(RunError::Resolve(e)) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            match e {
                ResolveError::MissingSecretValues { .. } | ResolveError::SecretSource { .. } => {
                    exit_codes::MISSING_SECRET
                }
                ResolveError::RequiredInputMissing { .. } => exit_codes::MISSING_INPUT,
                _ => exit_codes::RUNTIME_ERROR,
            }
        }
        Err(e @ RunError::TaskJoin(_)) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            exit_codes::RUNTIME_ERROR
        }
    }
}

/// `env` reads STRATA_SECRET_<NODE>_<KEY>; any other value is a JSON/YAML
/// file of `node -> key -> value`.
fn build_secret_source(
    args: &SecretsArgs,
    output: &OutputArgs,
) -> Result<Arc<dyn SecretSource>, i32> {
    if args.secrets == "env" {
        return Ok(Arc::new(EnvSecrets::default()));
    }

    let content = std::fs::read_to_string(&args.secrets).map_err(|e| {
        print_error(
            output.format,
            output.quiet,
            &format!("failed to read secrets file {}: {e}", args.secrets),
        );
        exit_codes::RUNTIME_ERROR
    })?;

    let parsed: std::collections::BTreeMap<String, std::collections::BTreeMap<String, String>> =
        match serde_json::from_str(&content).or_else(|_| serde_yaml::from_str(&content)) {
            Ok(v) => v,
            Err(_) => {
                print_error(
                    output.format,
                    output.quiet,
                    "secrets file is neither valid JSON nor YAML",
                );
                return Err(exit_codes::RUNTIME_ERROR);
            }
        };

    let mut source = StaticSecrets::new();
    for (node, keys) in parsed {
        for (key, value) in keys {
            source.insert(node.clone(), key, SecretValue::from_string(value));
        }
    }
    Ok(Arc::new(source))
}
