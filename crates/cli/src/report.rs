use argbind::{App, Bindable, Opt};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Typed view of one parsed app, nested through the selected subcommand.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Report {
    pub app: String,
    pub options: IndexMap<String, OptionReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<Box<Report>>,
}

#[derive(Debug, Serialize)]
pub struct OptionReport {
    pub count: usize,
    pub value: Value,
}

pub fn build_report(app: &App) -> argbind::Result<Report> {
    let mut options = IndexMap::new();
    for opt in app.options().iter().filter(|o| !app.is_builtin(o.id())) {
        options.insert(
            opt.display_name(),
            OptionReport {
                count: opt.count(),
                value: option_value(opt)?,
            },
        );
    }
    let subcommand = match app.selected_subcommand() {
        Some(sub) => Some(Box::new(build_report(sub)?)),
        None => None,
    };
    Ok(Report {
        app: app.name().to_string(),
        options,
        extras: app.extras().to_vec(),
        subcommand,
    })
}

fn option_value(opt: &Opt) -> argbind::Result<Value> {
    if opt.count() == 0 && opt.default_values().is_none() {
        return Ok(Value::Null);
    }
    if opt.is_flag() {
        return typed::<bool>(opt);
    }
    match (opt.type_name(), opt.is_vector()) {
        ("INT", false) => typed::<i64>(opt),
        ("INT", true) => typed::<Vec<i64>>(opt),
        ("UINT", false) => typed::<u64>(opt),
        ("UINT", true) => typed::<Vec<u64>>(opt),
        ("FLOAT", false) => typed::<f64>(opt),
        ("FLOAT", true) => typed::<Vec<f64>>(opt),
        ("BOOLEAN", false) => typed::<bool>(opt),
        ("BOOLEAN", true) => typed::<Vec<bool>>(opt),
        (_, false) => typed::<String>(opt),
        (_, true) => typed::<Vec<String>>(opt),
    }
}

fn typed<T: Bindable + Serialize>(opt: &Opt) -> argbind::Result<Value> {
    let value = opt.results::<T>()?;
    Ok(serde_json::to_value(value).unwrap_or(Value::Null))
}
