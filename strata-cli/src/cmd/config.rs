use std::path::Path;

use crate::output::print_error;
use crate::{OutputArgs, VarsArgs};

pub fn load_vars(args: &VarsArgs, output: &OutputArgs) -> Result<Option<serde_json::Value>, ()> {
    let mut vars = match &args.vars {
        None => None,
        Some(path) => match read_vars_file(path, output) {
            Some(v) => Some(v),
            None => return Err(()),
        },
    };
    merge_set_vars(&mut vars, &args.set_vars);
    Ok(vars)
}

fn read_vars_file(path: &Path, output: &OutputArgs) -> Option<serde_json::Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read vars: {e}"),
            );
            return None;
        }
    };
    if let Ok(v) = serde_json::from_str(&content) {
        return Some(v);
    }
    if let Ok(v) = serde_yaml::from_str(&content) {
        return Some(v);
    }
    print_error(
        output.format,
        output.quiet,
        "vars file is neither valid JSON nor YAML",
    );
    None
}

fn merge_set_vars(vars: &mut Option<serde_json::Value>, set_vars: &[String]) {
    if set_vars.is_empty() {
        return;
    }
    let obj = vars.get_or_insert(serde_json::json!({}));
    if let Some(map) = obj.as_object_mut() {
        for s in set_vars {
            if let Some((k, v)) = s.split_once('=') {
                map.insert(k.to_string(), serde_json::Value::String(v.to_string()));
            }
        }
    }
}
