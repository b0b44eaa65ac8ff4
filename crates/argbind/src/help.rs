//! Help rendering.
//!
//! Everything is computed at render time: validator descriptions re-read
//! their sources, so a live member set shows its current contents.

use crate::app::App;
use crate::option::Opt;

fn arity_suffix(opt: &Opt) -> String {
    let arity = opt.arity();
    match arity.max {
        None => " ...".to_string(),
        Some(max) if max > 1 && max == arity.min => format!(" x {max}"),
        Some(max) if max > 1 => format!(" x {}-{max}", arity.min),
        _ => String::new(),
    }
}

/// Left column: names, type, validator descriptions, default, arity, `REQUIRED`.
fn format_opt_left(opt: &Opt, positional: bool) -> String {
    let mut out = if positional {
        opt.names().positional().unwrap_or_default().to_string()
    } else {
        opt.names().flag_list()
    };
    if !opt.is_flag() && !opt.type_name().is_empty() {
        out.push(' ');
        out.push_str(opt.type_name());
    }
    for desc in opt.validators().iter().filter_map(|v| v.description()) {
        out.push(':');
        out.push_str(&desc);
    }
    if let Some(default) = opt.default_display() {
        out.push('=');
        out.push_str(&default);
    }
    out.push_str(&arity_suffix(opt));
    if opt.is_required() {
        out.push_str(" REQUIRED");
    }
    out
}

fn format_opt_help(opt: &Opt) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !opt.description().trim().is_empty() {
        parts.push(opt.description().trim().to_string());
    }
    if let Some(env) = opt.envname() {
        parts.push(format!("(env: {env})"));
    }
    if !opt.needs().is_empty() {
        parts.push(format!("Needs: {}", opt.needs().join(" ")));
    }
    if !opt.excludes().is_empty() {
        parts.push(format!("Excludes: {}", opt.excludes().join(" ")));
    }
    parts.join(" ")
}

fn push_rows(out: &mut String, title: &str, rows: &[(String, String)]) {
    if rows.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}:\n"));
    let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (left, help) in rows {
        if help.is_empty() {
            out.push_str(&format!("  {left}\n"));
        } else {
            out.push_str(&format!("  {left:width$}  {help}\n"));
        }
    }
}

impl App {
    fn usage(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.name.is_empty() {
            parts.push(self.name.clone());
        }
        if self
            .options
            .iter()
            .any(|o| o.names().has_flag_name() && !o.is_hidden())
        {
            parts.push("[OPTIONS]".to_string());
        }
        if !self.subcommands.is_empty() {
            parts.push(if self.require_subcommand {
                "SUBCOMMAND".to_string()
            } else {
                "[SUBCOMMAND]".to_string()
            });
        }
        for opt in self.options.iter().filter(|o| !o.is_hidden()) {
            if let Some(name) = opt.names().positional() {
                let name = if opt.arity().max.is_none() {
                    format!("{name}...")
                } else {
                    name.to_string()
                };
                parts.push(if opt.is_required() {
                    name
                } else {
                    format!("[{name}]")
                });
            }
        }
        parts.join(" ")
    }

    /// Render help for this app.
    pub fn help(&self) -> String {
        let mut out = String::new();
        let description = self.description.trim();
        match (self.name.is_empty(), description.is_empty()) {
            (false, false) => out.push_str(&format!("{} - {description}\n", self.name)),
            (false, true) => out.push_str(&format!("{}\n", self.name)),
            (true, false) => out.push_str(&format!("{description}\n")),
            (true, true) => {}
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("Usage: {}\n", self.usage()));

        let visible = || self.options.iter().filter(|o| !o.is_hidden());
        let positionals: Vec<(String, String)> = visible()
            .filter(|o| !o.names().has_flag_name())
            .map(|o| (format_opt_left(o, true), format_opt_help(o)))
            .collect();
        let options: Vec<(String, String)> = visible()
            .filter(|o| o.names().has_flag_name())
            .map(|o| (format_opt_left(o, false), format_opt_help(o)))
            .collect();
        push_rows(&mut out, "Positionals", &positionals);
        push_rows(&mut out, "Options", &options);

        let subcommands: Vec<(String, String)> = self
            .subcommands
            .iter()
            .map(|s| {
                let mut left = s.name.clone();
                if !s.aliases.is_empty() {
                    left.push_str(&format!(" ({})", s.aliases.join(", ")));
                }
                (left, s.description.trim().to_string())
            })
            .collect();
        push_rows(&mut out, "Subcommands", &subcommands);

        if !self.footer.trim().is_empty() {
            out.push('\n');
            out.push_str(self.footer.trim_end());
            out.push('\n');
        }
        out
    }
}
