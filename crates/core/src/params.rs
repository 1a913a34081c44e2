//! Combined view over the argument and flag stores.
//!
//! Adds free-form metadata (`cli.name`, `cli.version`, ...) and the JSON
//! placeholders `${args.json}`, `${flags.json}` and `${params.json}`.

use indexmap::IndexMap;
use log::debug;

use crate::interpolation::{env_name, substitute, EnvVar};
use crate::store::{Entry, ParameterStore, Scope};
use crate::value::Value;

#[derive(Debug)]
pub struct Params<'a> {
    pub args: ParameterStore<'a>,
    pub flags: ParameterStore<'a>,
    metadata: IndexMap<String, String>,
}

impl<'a> Params<'a> {
    pub fn new(args: ParameterStore<'a>, flags: ParameterStore<'a>) -> Self {
        Self {
            args,
            flags,
            metadata: IndexMap::new(),
        }
    }

    pub fn store(&self, scope: Scope) -> &ParameterStore<'a> {
        match scope {
            Scope::Args => &self.args,
            Scope::Flags => &self.flags,
        }
    }

    /// Adds a metadata entry, available as `${key}` and as an environment
    /// variable.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn metadata(&self) -> &IndexMap<String, String> {
        &self.metadata
    }

    /// Resolves a parameter reference as written in `depends-on`:
    /// `args.<name>`, `flags.<name>`, `args[N]`, or a bare name looked up in
    /// `scope`.
    pub fn lookup_entry(&self, scope: Scope, reference: &str) -> Option<Entry<'a>> {
        if let Some(name) = reference.strip_prefix("args.") {
            return self.args.get(name);
        }
        if let Some(name) = reference.strip_prefix("flags.") {
            return self.flags.get(name);
        }
        if let Some(index) = reference
            .strip_prefix("args[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return index.parse().ok().and_then(|i| self.args.get_at(i));
        }
        self.store(scope).get(reference)
    }

    pub fn lookup(&self, scope: Scope, reference: &str) -> Option<Value> {
        self.lookup_entry(scope, reference).map(|entry| entry.value)
    }

    pub fn interpolate(&self, script: &str) -> String {
        debug!("Interpolating script of {} byte(s)", script.len());
        let params_json = self.to_json_string();

        substitute(script, |key| {
            if key == "params.json" {
                return Some(params_json.clone());
            }

            let scoped = key.split_once('.').and_then(|(scope, rest)| {
                let store = match scope {
                    "args" => &self.args,
                    "flags" => &self.flags,
                    _ => return None,
                };
                match store.get_val(rest) {
                    Some(value) => Some(value.to_string()),
                    None if rest == "json" => Some(store.to_json_string()),
                    None => None,
                }
            });

            scoped.or_else(|| self.metadata.get(key).cloned())
        })
    }

    /// Argument variables, flag variables, the three JSON snapshots, then
    /// metadata.
    pub fn env_vars(&self) -> Vec<EnvVar> {
        let mut vars = self.args.env_vars();
        vars.extend(self.flags.env_vars());
        vars.push(EnvVar::new("ARGS_JSON", self.args.to_json_string()));
        vars.push(EnvVar::new("FLAGS_JSON", self.flags.to_json_string()));
        vars.push(EnvVar::new("PARAMS_JSON", self.to_json_string()));
        vars.extend(
            self.metadata
                .iter()
                .map(|(key, value)| EnvVar::new(env_name(key), value.clone())),
        );
        vars
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "args": self.args.to_json(),
            "flags": self.flags.to_json(),
        })
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.to_json()).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_definitions::ParameterDefinition;
    use crate::types::TypeRegistry;
    use pretty_assertions::assert_eq;

    fn with_params(test: impl FnOnce(&mut Params<'_>)) {
        let registry = TypeRegistry::with_builtins();
        let arg_defs = vec![
            ParameterDefinition::new("source"),
            ParameterDefinition::new("count").of_type("int"),
        ];
        let flag_defs = vec![ParameterDefinition::new("mode").with_default("fast")];
        let raw = vec!["in.txt".to_string(), "2".to_string()];

        let args = ParameterStore::for_args(&registry, &arg_defs, &raw).unwrap();
        let flags = ParameterStore::for_flags(&registry, &flag_defs, &IndexMap::new()).unwrap();
        let mut params = Params::new(args, flags);
        test(&mut params);
    }

    #[test]
    fn test_lookup_references() {
        with_params(|params| {
            assert_eq!(params.lookup(Scope::Flags, "args.source"), Some(Value::from("in.txt")));
            assert_eq!(params.lookup(Scope::Args, "flags.mode"), Some(Value::from("fast")));
            assert_eq!(params.lookup(Scope::Flags, "args[1]"), Some(Value::Int(2)));
            assert_eq!(params.lookup(Scope::Args, "count"), Some(Value::Int(2)));
            assert_eq!(params.lookup(Scope::Args, "mode"), None);
            assert_eq!(params.lookup(Scope::Flags, "mode"), Some(Value::from("fast")));
            assert_eq!(params.lookup(Scope::Args, "args[x]"), None);
        });
    }

    #[test]
    fn test_interpolate_everything() {
        with_params(|params| {
            params.set("cli.name", "tool");
            let script = "${cli.name} ${args.source} ${args.list[1]} ${flags.mode} ${flags.json} ${other}";
            assert_eq!(
                params.interpolate(script),
                "tool in.txt 2 fast {\"mode\":\"fast\"} ${other}"
            );
        });
    }

    #[test]
    fn test_params_json() {
        with_params(|params| {
            let expected = serde_json::json!({
                "args": {"list": ["in.txt", 2], "source": "in.txt", "count": 2},
                "flags": {"mode": "fast"},
            });
            assert_eq!(params.to_json(), expected);

            let interpolated = params.interpolate("${params.json}");
            let parsed: serde_json::Value = serde_json::from_str(&interpolated).unwrap();
            assert_eq!(parsed, expected);
        });
    }

    #[test]
    fn test_env_vars_order() {
        with_params(|params| {
            params.set("cli.version", "1.2.3");
            let names: Vec<String> = params.env_vars().into_iter().map(|v| v.name).collect();
            assert_eq!(
                names,
                vec![
                    "ARGS_SOURCE",
                    "ARGS_LIST_0",
                    "ARGS_COUNT",
                    "ARGS_LIST_1",
                    "FLAGS_MODE",
                    "ARGS_JSON",
                    "FLAGS_JSON",
                    "PARAMS_JSON",
                    "CLI_VERSION",
                ]
            );
        });
    }
}
