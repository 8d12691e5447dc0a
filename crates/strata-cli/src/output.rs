//! Formatted output helpers for CLI commands.

use clap::ValueEnum;
use serde::Serialize;
use strata_buildpack::Group;
use strata_env::Env;

/// Output format of `strata env`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvFormat {
    /// `NAME=value` lines.
    Text,
    /// A JSON array of `{name, value}` objects, in variable order.
    Json,
}

#[derive(Serialize)]
struct Variable<'a> {
    name: &'a str,
    value: &'a str,
}

/// Renders a composed environment.
///
/// # Errors
///
/// Returns an error if JSON encoding fails.
pub fn render_env(env: &Env, format: EnvFormat) -> serde_json::Result<String> {
    match format {
        EnvFormat::Text => Ok(env.list().join("\n")),
        EnvFormat::Json => {
            let vars: Vec<Variable<'_>> = env
                .vars
                .iter()
                .map(|(name, value)| Variable { name, value })
                .collect();
            serde_json::to_string_pretty(&vars)
        }
    }
}

/// Renders a resolved group as an aligned table.
#[must_use]
pub fn format_group(group: &Group) -> String {
    let width = group
        .members
        .iter()
        .map(|m| m.id.len())
        .max()
        .unwrap_or(0)
        .max("ID".len());
    let mut lines = vec![format!("{:<width$}  {:<10}  {:<9}  API", "ID", "VERSION", "KIND")];
    for member in &group.members {
        lines.push(format!(
            "{:<width$}  {:<10}  {:<9}  {}",
            member.id,
            member.version,
            member.kind.as_str(),
            member.api
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use strata_buildpack::GroupElement;

    use super::*;

    fn env() -> Env {
        Env::filtered(vec![("PATH", "/bin"), ("HOME", "/home/cnb")], false, &[])
    }

    #[test]
    fn text_env_lists_variables_in_order() {
        assert_eq!(render_env(&env(), EnvFormat::Text).expect("render"), "PATH=/bin\nHOME=/home/cnb");
    }

    #[test]
    fn json_env_keeps_order() {
        let json = render_env(&env(), EnvFormat::Json).expect("render");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(parsed[0]["name"], "PATH");
        assert_eq!(parsed[1]["value"], "/home/cnb");
    }

    #[test]
    fn group_table_has_header_and_rows() {
        let group = Group::new(vec![
            GroupElement {
                api: "0.10".into(),
                ..GroupElement::buildpack("example/node", "1.0.0")
            },
            GroupElement::extension("e", "2"),
        ]);
        let table = format_group(&group);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].starts_with("example/node  1.0.0"));
        assert!(lines[2].contains("extension"));
    }
}
