use std::path::Path;

use strata_core::{
    diff_plans, plan_from_str, ManifestFormat, Plan, PlanError, PlanInstantiation, PlanOptions,
    PlanningOutcome,
};

use crate::exit_codes;
use crate::output::{print_error, OutputFormat};
use crate::{OutputArgs, VarsArgs};

pub async fn plan_cmd(
    path: &Path,
    vars: &VarsArgs,
    diff_against: Option<&Path>,
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

    let Ok(vars) = super::config::load_vars(vars, &output) else {
        return exit_codes::RUNTIME_ERROR;
    };

    let outcome = match plan_from_str(&content, ManifestFormat::Auto, PlanOptions { vars }) {
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

    let prior = match diff_against {
        None => None,
        Some(path) => match load_prior_plan(path, &output) {
            Ok(plan) => Some(plan),
            Err(code) => return code,
        },
    };

    match output.format {
        OutputFormat::Json => print_json(&outcome, prior.as_ref(), output.quiet),
        OutputFormat::Text => print_text(&outcome, prior.as_ref(), output.quiet),
        OutputFormat::Dot => print_dot(&outcome, output.quiet),
    }
}

fn load_prior_plan(path: &Path, output: &OutputArgs) -> Result<Plan, i32> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        print_error(
            output.format,
            output.quiet,
            &format!("failed to read {}: {e}", path.display()),
        );
        exit_codes::RUNTIME_ERROR
    })?;
    serde_json::from_str(&content).map_err(|e| {
        print_error(
            output.format,
            output.quiet,
            &format!("prior plan is not valid plan JSON: {e}"),
        );
        exit_codes::RUNTIME_ERROR
    })
}

#[derive(serde::Serialize)]
struct PlanJsonOutput<'a> {
    #[serde(flatten)]
    outcome: &'a PlanningOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<Vec<String>>,
}

fn print_json(outcome: &PlanningOutcome, prior: Option<&Plan>, quiet: bool) -> i32 {
    if quiet {
        return if outcome.validation.is_valid {
            exit_codes::SUCCESS
        } else {
            exit_codes::VALIDATION_FAILED
        };
    }

    let diff = match (prior, &outcome.plan) {
        (Some(prev), Some(next)) => Some(diff_plans(prev, next)),
        _ => None,
    };
    let payload = PlanJsonOutput { outcome, diff };
    match serde_json::to_string_pretty(&payload) {
        Ok(s) => {
            println!("{s}");
            if outcome.validation.is_valid {
                exit_codes::SUCCESS
            } else {
                exit_codes::VALIDATION_FAILED
            }
        }
        Err(e) => {
            eprintln!("error: failed to serialize plan as JSON: {e}");
            exit_codes::RUNTIME_ERROR
        }
    }
}

fn print_text(outcome: &PlanningOutcome, prior: Option<&Plan>, quiet: bool) -> i32 {
    if quiet {
        return if outcome.validation.is_valid {
            exit_codes::SUCCESS
        } else {
            exit_codes::VALIDATION_FAILED
        };
    }

    if outcome.validation.is_valid {
        println!("validation: valid");
    } else {
        println!("validation: invalid");
        println!("errors: {}", outcome.validation.errors.len());
        for e in &outcome.validation.errors {
            println!("- {e}");
        }
        return exit_codes::VALIDATION_FAILED;
    }

    let Some(plan) = &outcome.plan else {
        return exit_codes::VALIDATION_FAILED;
    };

    if !plan.summary.missing_vars.is_empty() {
        println!(
            "missing vars: {}",
            plan.summary
                .missing_vars
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if !plan.summary.spanning_nodes.is_empty() {
        println!("spanning nodes: {}", plan.summary.spanning_nodes.join(", "));
    }

    println!("\nexecution tiers:");
    for (idx, tier) in plan.graph.tiers.iter().enumerate() {
        if !tier.is_empty() {
            println!("  Tier {idx}: {}", tier.join(", "));
        }
    }

    println!("\nper-node intent:");
    for n in &plan.nodes {
        println!("- node: {}", n.id);
        if !n.depends_on.is_empty() {
            println!("  dependsOn: {}", n.depends_on.join(", "));
        }
        match &n.instantiation {
            PlanInstantiation::Always => {}
            PlanInstantiation::Conditional { toggle, enabled } => match enabled {
                Some(enabled) => println!("  when: {toggle} ({enabled})"),
                None => println!("  when: {toggle} (decided at apply)"),
            },
            PlanInstantiation::Keyed { keys } => {
                println!("  forEach: {}", keys.join(", "));
            }
        }
        for (name, rendered) in &n.inputs {
            println!("  input {name}: {rendered}");
        }
        if !n.declared_outputs.is_empty() {
            println!("  outputs: {}", n.declared_outputs.join(", "));
        }
        if n.secrets {
            println!("  secrets: yes");
        }
    }

    if let Some(prev) = prior {
        println!("\nchanges since prior plan:");
        let diff = diff_plans(prev, plan);
        if diff.is_empty() {
            println!("  (none)");
        }
        for line in diff {
            println!("  {line}");
        }
    }

    exit_codes::SUCCESS
}

fn print_dot(outcome: &PlanningOutcome, quiet: bool) -> i32 {
    if quiet {
        return if outcome.validation.is_valid {
            exit_codes::SUCCESS
        } else {
            exit_codes::VALIDATION_FAILED
        };
    }

    if !outcome.validation.is_valid {
        eprintln!("error: cannot generate DOT graph for an invalid manifest");
        return exit_codes::VALIDATION_FAILED;
    }

    let Some(plan) = &outcome.plan else {
        eprintln!("error: no plan available");
        return exit_codes::VALIDATION_FAILED;
    };

    println!("{}", plan.graph.to_dot(&plan.summary.manifest_version));
    exit_codes::SUCCESS
}
