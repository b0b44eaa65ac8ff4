//! Conversion between a live [`App`] tree and the serde definition model.

use std::path::PathBuf;

use argbind_metadata::{AppSchema, OptionSchema};
use tracing::debug;

use crate::app::App;
use crate::convert::Bindable;
use crate::error::{ArgError, Result};
use crate::option::{Arity, Opt, OptionMut};
use crate::validator::{CASELESS_MEMBER_NAME, IsMember};

impl App {
    /// Build an app (and its subcommands) from a definition.
    pub fn from_schema(schema: &AppSchema) -> Result<App> {
        let mut app = App::new(schema.name.as_str());
        app.aliases = schema.aliases.clone();
        app.fill_from_schema(schema)?;
        Ok(app)
    }

    fn fill_from_schema(&mut self, schema: &AppSchema) -> Result<()> {
        self.description(schema.description.as_str())
            .footer(schema.footer.as_str())
            .allow_extras(schema.allow_extras)
            .require_subcommand(schema.require_subcommand);
        if !schema.version.trim().is_empty() {
            self.set_version_flag("-V,--version", schema.version.as_str())?;
        }
        for option in &schema.options {
            add_schema_option(self, option)?;
        }
        for sub in &schema.subcommands {
            self.add_subcommand(&sub.name, &sub.description)?;
            for alias in &sub.aliases {
                self.alias_subcommand(&sub.name, alias)?;
            }
            if let Some(child) = self.subcommand_mut(&sub.name) {
                child.fill_from_schema(sub)?;
            }
        }
        debug!(app = %self.name, options = schema.options.len(), subcommands = schema.subcommands.len(), "loaded definition");
        Ok(())
    }

    /// Export the current definition. Allowed-value sets are read at call time.
    pub fn to_schema(&self) -> AppSchema {
        AppSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            footer: self.footer.clone(),
            version: self.version.clone().unwrap_or_default(),
            aliases: self.aliases.clone(),
            allow_extras: self.allow_extras,
            require_subcommand: self.require_subcommand,
            options: self
                .options
                .iter()
                .filter(|o| !self.is_builtin(o.id()))
                .map(option_schema)
                .collect(),
            subcommands: self.subcommands.iter().map(App::to_schema).collect(),
        }
    }
}

fn option_schema(opt: &Opt) -> OptionSchema {
    let member_check = opt.validators().iter().find(|v| v.members().is_some());
    let default_value = opt.has_default().then(|| {
        let values = opt.default_values().unwrap_or_default();
        let sep = opt.delimiter().unwrap_or(',').to_string();
        values.join(&sep)
    });
    OptionSchema {
        names: opt.names().all().collect::<Vec<_>>().join(","),
        description: opt.description().to_string(),
        flag: opt.is_flag(),
        value_type: (!opt.is_flag()).then(|| opt.type_name().to_string()),
        multiple: opt.is_vector(),
        expected: (opt.is_vector() && opt.arity() != Arity::UNBOUNDED)
            .then(|| opt.get_expected()),
        expected_min: opt
            .arity()
            .max
            .filter(|max| opt.is_vector() && opt.arity().min < *max)
            .map(|_| opt.arity().min),
        delimiter: opt.delimiter(),
        default_value,
        required: opt.is_required(),
        env: opt.envname().map(str::to_string),
        choices: member_check
            .and_then(|v| v.members())
            .unwrap_or_default(),
        ignore_case: member_check.is_some_and(|v| v.name().contains(CASELESS_MEMBER_NAME)),
        needs: opt.needs().to_vec(),
        excludes: opt.excludes().to_vec(),
        hidden: opt.is_hidden(),
    }
}

fn add_schema_option(app: &mut App, schema: &OptionSchema) -> Result<()> {
    if schema.flag {
        let flag = app.add_flag(&schema.names, &schema.description)?;
        configure(flag, schema, false)?;
        return Ok(());
    }
    let ty = schema.value_type.as_deref().unwrap_or("TEXT");
    match (ty, schema.multiple) {
        ("TEXT", false) => add_typed::<String>(app, schema),
        ("TEXT", true) => add_typed::<Vec<String>>(app, schema),
        ("INT", false) => add_typed::<i64>(app, schema),
        ("INT", true) => add_typed::<Vec<i64>>(app, schema),
        ("UINT", false) => add_typed::<u64>(app, schema),
        ("UINT", true) => add_typed::<Vec<u64>>(app, schema),
        ("FLOAT", false) => add_typed::<f64>(app, schema),
        ("FLOAT", true) => add_typed::<Vec<f64>>(app, schema),
        ("BOOLEAN", false) => add_typed::<bool>(app, schema),
        ("BOOLEAN", true) => add_typed::<Vec<bool>>(app, schema),
        ("CHAR", false) => add_typed::<char>(app, schema),
        ("CHAR", true) => add_typed::<Vec<char>>(app, schema),
        ("PATH", false) => add_typed::<PathBuf>(app, schema),
        ("PATH", true) => add_typed::<Vec<PathBuf>>(app, schema),
        (other, _) => Err(ArgError::configuration(format!(
            "option '{}' has unknown value-type '{other}' (expected one of: {})",
            schema.names,
            argbind_metadata::VALUE_TYPES.join(", ")
        ))),
    }
}

fn add_typed<T: Bindable>(app: &mut App, schema: &OptionSchema) -> Result<()> {
    let opt = app.add_option_of::<T>(&schema.names, &schema.description)?;
    configure(opt, schema, true)
}

fn configure<T>(mut opt: OptionMut<'_, T>, schema: &OptionSchema, takes_values: bool) -> Result<()> {
    if takes_values {
        match (schema.expected_min, schema.expected) {
            (Some(min), Some(max)) if max >= 1 => {
                opt = opt.expected_range(min, max as usize)?;
            }
            (Some(min), _) => {
                return Err(ArgError::configuration(format!(
                    "option '{}' has expected-min {min} without a positive expected",
                    schema.names
                )));
            }
            (None, Some(n)) => opt = opt.expected(n)?,
            (None, None) => {}
        }
        if let Some(delim) = schema.delimiter {
            opt = opt.delimiter(delim)?;
        }
        if let Some(default) = &schema.default_value {
            opt = if opt.get().is_vector() {
                let sep = schema.delimiter.unwrap_or(',');
                opt.default_strs(default.split(sep).map(str::trim).filter(|s| !s.is_empty()))
            } else {
                opt.default_str(default.as_str())
            };
        }
    }
    if !schema.choices.is_empty() {
        let mut members = IsMember::new(schema.choices.iter());
        if schema.ignore_case {
            members = members.ignore_case();
        }
        members = match schema.value_type.as_deref() {
            Some("INT") => members.parse_as::<i64>(),
            Some("UINT") => members.parse_as::<u64>(),
            Some("FLOAT") => members.parse_as::<f64>(),
            _ => members,
        };
        opt = opt.check(members);
    }
    if schema.required {
        opt = opt.required();
    }
    if let Some(env) = &schema.env {
        opt = opt.envname(env.as_str());
    }
    for name in &schema.needs {
        opt = opt.needs(name.as_str());
    }
    for name in &schema.excludes {
        opt = opt.excludes(name.as_str());
    }
    if schema.hidden {
        opt.hidden();
    }
    Ok(())
}
