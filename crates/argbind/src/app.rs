//! The app tree: options, subcommands and the per-run state they accumulate.

use tracing::debug;

use crate::convert::Bindable;
use crate::error::{ArgError, Result};
use crate::option::{Opt, OptionHandle, OptionId, OptionMut, OptionNames};

const HELP_NAMES: &str = "-h,--help";
const HELP_DESCRIPTION: &str = "Print this help message and exit";
const VERSION_DESCRIPTION: &str = "Display program version information and exit";

/// Result of a successful [`App::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed,
    /// The help flag was given; the rendered help of the app it was given to.
    Help(String),
    Version(String),
}

/// A command with its options and nested subcommands.
#[derive(Debug, Clone)]
pub struct App {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) footer: String,
    pub(crate) version: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) options: Vec<Opt>,
    pub(crate) subcommands: Vec<App>,
    pub(crate) allow_extras: bool,
    pub(crate) require_subcommand: bool,
    pub(crate) help_flag: Option<OptionId>,
    pub(crate) version_flag: Option<OptionId>,
    pub(crate) extras: Vec<String>,
    pub(crate) selected: Option<usize>,
}

impl App {
    /// A new app with the default `-h,--help` flag.
    pub fn new(name: impl Into<String>) -> Self {
        let mut app = Self::bare(name.into());
        if let Ok(help) = Opt::new_flag(builtin_names(HELP_NAMES), HELP_DESCRIPTION) {
            app.help_flag = Some(help.id());
            app.options.push(help);
        }
        app
    }

    fn bare(name: String) -> Self {
        Self {
            name,
            description: String::new(),
            footer: String::new(),
            version: None,
            aliases: Vec::new(),
            options: Vec::new(),
            subcommands: Vec::new(),
            allow_extras: true,
            require_subcommand: false,
            help_flag: None,
            version_flag: None,
            extras: Vec::new(),
            selected: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn get_footer(&self) -> &str {
        &self.footer
    }

    pub fn get_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&mut self, text: impl Into<String>) -> &mut Self {
        self.description = text.into();
        self
    }

    pub fn footer(&mut self, text: impl Into<String>) -> &mut Self {
        self.footer = text.into();
        self
    }

    /// Whether unmatched tokens are collected (`true`, the default) or rejected.
    pub fn allow_extras(&mut self, allow: bool) -> &mut Self {
        self.allow_extras = allow;
        self
    }

    pub fn require_subcommand(&mut self, required: bool) -> &mut Self {
        self.require_subcommand = required;
        self
    }

    pub fn extras_allowed(&self) -> bool {
        self.allow_extras
    }

    pub fn subcommand_required(&self) -> bool {
        self.require_subcommand
    }

    /// Replace the help flag. Empty `names` removes it.
    pub fn set_help_flag(&mut self, names: &str, description: &str) -> Result<&mut Self> {
        self.help_flag = self.replace_flag(self.help_flag, names, description)?;
        Ok(self)
    }

    /// Add (or replace) a version flag printing `version`. Empty `names` removes it.
    pub fn set_version_flag(&mut self, names: &str, version: impl Into<String>) -> Result<&mut Self> {
        self.version_flag = self.replace_flag(self.version_flag, names, VERSION_DESCRIPTION)?;
        self.version = Some(version.into());
        Ok(self)
    }

    pub fn version_text(&self) -> String {
        match self.version.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => format!("{} {v}\n", self.name),
            _ => format!("{}\n", self.name),
        }
    }

    /// Swap the flag `old` for one named `names`. Nothing changes on error.
    fn replace_flag(
        &mut self,
        old: Option<OptionId>,
        names: &str,
        description: &str,
    ) -> Result<Option<OptionId>> {
        let flag = if names.trim().is_empty() {
            None
        } else {
            let names = OptionNames::parse(names)?;
            self.check_unique_except(&names, old)?;
            Some(Opt::new_flag(names, description)?)
        };
        if let Some(id) = old {
            self.options.retain(|o| o.id() != id);
        }
        Ok(flag.map(|opt| {
            let id = opt.id();
            self.options.push(opt);
            id
        }))
    }

    /// Bind an option to the type of `target`.
    ///
    /// With `defaulted`, the current value of `target` becomes the default
    /// shown in help and returned by `results()` when nothing is given.
    pub fn add_option<T: Bindable>(
        &mut self,
        names: &str,
        target: &T,
        description: &str,
        defaulted: bool,
    ) -> Result<OptionMut<'_, T>> {
        let opt = self.add_option_of::<T>(names, description)?;
        Ok(if defaulted { opt.default_val(target) } else { opt })
    }

    /// Register an option of type `T` with no default.
    pub fn add_option_of<T: Bindable>(
        &mut self,
        names: &str,
        description: &str,
    ) -> Result<OptionMut<'_, T>> {
        let names = OptionNames::parse(names)?;
        self.check_unique(&names)?;
        let opt = Opt::new::<T>(names, description);
        debug!(app = %self.name, option = %opt.display_name(), ty = T::type_name(), "registered option");
        Ok(self.push_option(opt))
    }

    /// Register a zero-arity boolean flag.
    pub fn add_flag(&mut self, names: &str, description: &str) -> Result<OptionMut<'_, bool>> {
        let names = OptionNames::parse(names)?;
        self.check_unique(&names)?;
        let opt = Opt::new_flag(names, description)?;
        debug!(app = %self.name, option = %opt.display_name(), "registered flag");
        Ok(self.push_option(opt))
    }

    fn push_option<T>(&mut self, opt: Opt) -> OptionMut<'_, T> {
        self.options.push(opt);
        let last = self.options.len() - 1;
        OptionMut::new(&mut self.options[last])
    }

    fn check_unique(&self, names: &OptionNames) -> Result<()> {
        self.check_unique_except(names, None)
    }

    fn check_unique_except(&self, names: &OptionNames, skip: Option<OptionId>) -> Result<()> {
        for existing in self.options.iter().filter(|o| Some(o.id()) != skip) {
            let taken = existing.names();
            let clash = names
                .shorts()
                .iter()
                .find(|c| taken.matches_short(**c))
                .map(|c| format!("-{c}"))
                .or_else(|| {
                    names
                        .longs()
                        .iter()
                        .find(|l| taken.matches_long(l))
                        .map(|l| format!("--{l}"))
                })
                .or_else(|| {
                    names
                        .positional()
                        .filter(|p| taken.positional() == Some(*p))
                        .map(str::to_string)
                });
            if let Some(name) = clash {
                return Err(ArgError::DuplicateName { name });
            }
        }
        Ok(())
    }

    /// Detach an option so its names can be registered again.
    pub fn remove_option<T>(&mut self, handle: &OptionHandle<T>) -> bool {
        let id = handle.id();
        let before = self.options.len();
        self.options.retain(|o| o.id() != id);
        if self.options.len() == before {
            return false;
        }
        if self.help_flag == Some(id) {
            self.help_flag = None;
        }
        if self.version_flag == Some(id) {
            self.version_flag = None;
        }
        true
    }

    /// Add a child app dispatched when `name` (or an alias) appears as a bare token.
    pub fn add_subcommand(&mut self, name: &str, description: &str) -> Result<&mut App> {
        let name = self.check_subcommand_name(name)?;
        let mut child = App::new(name);
        child.description = description.to_string();
        self.subcommands.push(child);
        let last = self.subcommands.len() - 1;
        Ok(&mut self.subcommands[last])
    }

    /// Another name the subcommand `name` answers to. No sibling may already answer to `alias`.
    pub fn alias_subcommand(&mut self, name: &str, alias: &str) -> Result<&mut App> {
        let alias = self.check_subcommand_name(alias)?;
        let Some(index) = self.subcommand_index(name) else {
            return Err(ArgError::configuration(format!("unknown subcommand: '{name}'")));
        };
        let child = &mut self.subcommands[index];
        child.aliases.push(alias.to_string());
        Ok(child)
    }

    fn check_subcommand_name<'n>(&self, name: &'n str) -> Result<&'n str> {
        let name = name.trim();
        if name.is_empty() || name.starts_with('-') || name.contains(char::is_whitespace) {
            return Err(ArgError::configuration(format!(
                "invalid subcommand name: '{name}'"
            )));
        }
        if self.subcommand_index(name).is_some() {
            return Err(ArgError::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(name)
    }

    /// Parse `tokens` with no environment.
    pub fn run<I, S>(&mut self, tokens: I) -> Result<ParseOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_with_env(tokens, &[])
    }

    /// Parse `tokens`, filling options that declare an `envname` from `env` when the tokens give them no value.
    pub fn run_with_env<I, S>(&mut self, tokens: I, env: &[(String, String)]) -> Result<ParseOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        self.clear();
        debug!(app = %self.name, tokens = tokens.len(), "run");
        let outcome = self.parse_tokens(&tokens, env)?;
        debug!(app = %self.name, ?outcome, "run finished");
        Ok(outcome)
    }

    /// Drop every result of the previous run, recursively.
    pub fn clear(&mut self) {
        for opt in &mut self.options {
            opt.clear();
        }
        self.extras.clear();
        self.selected = None;
        for sub in &mut self.subcommands {
            sub.clear();
        }
    }

    /// Values stored for the option answering to `name` (`-s`, `--string` or `s`); `0` if none does.
    pub fn count(&self, name: &str) -> usize {
        self.find_option(name).map_or(0, Opt::count)
    }

    pub fn find_option(&self, name: &str) -> Option<&Opt> {
        self.options.iter().find(|o| o.names().matches(name))
    }

    /// Typed results of the option behind `handle`, searched in this app and its subcommands.
    pub fn get<T: Bindable>(&self, handle: &OptionHandle<T>) -> Result<T> {
        self.option(handle)?.results::<T>()
    }

    pub fn option<T>(&self, handle: &OptionHandle<T>) -> Result<&Opt> {
        self.find_by_id(handle.id()).ok_or_else(|| not_found(handle))
    }

    pub fn option_mut<T>(&mut self, handle: &OptionHandle<T>) -> Result<OptionMut<'_, T>> {
        match self.find_by_id_mut(handle.id()) {
            Some(opt) => Ok(OptionMut::new(opt)),
            None => Err(not_found(handle)),
        }
    }

    fn find_by_id(&self, id: OptionId) -> Option<&Opt> {
        self.options
            .iter()
            .find(|o| o.id() == id)
            .or_else(|| self.subcommands.iter().find_map(|s| s.find_by_id(id)))
    }

    fn find_by_id_mut(&mut self, id: OptionId) -> Option<&mut Opt> {
        if let Some(pos) = self.options.iter().position(|o| o.id() == id) {
            return Some(&mut self.options[pos]);
        }
        self.subcommands
            .iter_mut()
            .find_map(|s| s.find_by_id_mut(id))
    }

    pub fn options(&self) -> &[Opt] {
        &self.options
    }

    /// Whether `id` is this app's help or version flag.
    pub fn is_builtin(&self, id: OptionId) -> bool {
        self.help_flag == Some(id) || self.version_flag == Some(id)
    }

    /// Unmatched tokens of the last run, in encounter order.
    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    pub fn selected_subcommand(&self) -> Option<&App> {
        self.selected.and_then(|i| self.subcommands.get(i))
    }

    pub fn got_subcommand(&self, name: &str) -> bool {
        self.selected_subcommand().is_some_and(|s| s.answers_to(name))
    }

    pub fn subcommand(&self, name: &str) -> Option<&App> {
        self.subcommands.iter().find(|s| s.answers_to(name))
    }

    pub fn subcommand_mut(&mut self, name: &str) -> Option<&mut App> {
        self.subcommands.iter_mut().find(|s| s.answers_to(name))
    }

    pub fn subcommands(&self) -> &[App] {
        &self.subcommands
    }

    pub(crate) fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    pub(crate) fn subcommand_index(&self, token: &str) -> Option<usize> {
        self.subcommands.iter().position(|s| s.answers_to(token))
    }
}

fn builtin_names(spec: &str) -> OptionNames {
    OptionNames::parse(spec).unwrap_or_default()
}

fn not_found<T>(handle: &OptionHandle<T>) -> ArgError {
    ArgError::OptionNotFound {
        name: format!("{:?}", handle.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let mut app = App::new("prog");
        app.add_option_of::<i32>("-c,--count", "").unwrap();
        for dup in ["-c", "--count", "-x,--count"] {
            let err = app.add_option_of::<i32>(dup, "").err().unwrap();
            assert!(matches!(err, ArgError::DuplicateName { .. }), "{dup}");
        }
        let err = app.add_flag("-h", "").err().unwrap();
        assert_eq!(
            err,
            ArgError::DuplicateName {
                name: "-h".to_string()
            }
        );
        assert!(app.add_option_of::<i32>("count", "").is_ok());
    }

    #[test]
    fn remove_then_register_again() {
        let mut app = App::new("prog");
        let handle = app.add_option_of::<i32>("--idx", "").unwrap().handle();
        assert!(app.remove_option(&handle));
        assert!(!app.remove_option(&handle));
        assert!(app.add_option_of::<i32>("--idx", "").is_ok());
        assert!(matches!(
            app.get(&handle),
            Err(ArgError::OptionNotFound { .. })
        ));
    }

    #[test]
    fn subcommands_are_found_by_name_and_alias() {
        let mut app = App::new("prog");
        app.add_subcommand("start", "Start things").unwrap();
        app.alias_subcommand("start", "go").unwrap();
        assert!(app.subcommand("go").is_some());
        assert_eq!(app.subcommand("go").unwrap().aliases(), &["go".to_string()]);
        assert!(app.subcommand("stop").is_none());
        assert!(matches!(
            app.add_subcommand("start", ""),
            Err(ArgError::DuplicateName { .. })
        ));
        assert!(app.add_subcommand("-bad", "").is_err());
        assert!(matches!(
            app.add_subcommand("go", ""),
            Err(ArgError::DuplicateName { .. })
        ));
    }

    #[test]
    fn alias_clashing_with_a_sibling_is_rejected() {
        let mut app = App::new("prog");
        app.add_subcommand("start", "").unwrap();
        app.add_subcommand("stop", "").unwrap();
        app.alias_subcommand("stop", "halt").unwrap();

        for taken in ["start", "halt", "stop"] {
            let err = app.alias_subcommand("stop", taken).err().unwrap();
            assert_eq!(
                err,
                ArgError::DuplicateName {
                    name: taken.to_string()
                }
            );
        }
        assert!(app.alias_subcommand("missing", "m").unwrap_err().is_configuration());
        assert!(app.alias_subcommand("stop", "-s").unwrap_err().is_configuration());

        app.run(["start"]).unwrap();
        assert!(app.got_subcommand("start"));
        app.run(["halt"]).unwrap();
        assert!(app.got_subcommand("stop"));
    }

    #[test]
    fn help_flag_can_be_replaced_and_removed() {
        let mut app = App::new("prog");
        app.set_help_flag("--usage", "Show usage").unwrap();
        assert!(app.find_option("-h").is_none());
        assert!(app.find_option("--usage").is_some());
        app.set_help_flag("", "").unwrap();
        assert!(app.find_option("--usage").is_none());
        assert!(app.help_flag.is_none());
    }

    #[test]
    fn failed_flag_replacement_keeps_the_old_flag() {
        let mut app = App::new("prog");
        app.add_flag("--usage", "").unwrap();
        let err = app.set_help_flag("--usage", "Show usage").err().unwrap();
        assert_eq!(
            err,
            ArgError::DuplicateName {
                name: "--usage".to_string()
            }
        );
        assert!(app.find_option("--help").is_some());
        assert!(app.help_flag.is_some());
        assert!(matches!(app.run(["-h"]).unwrap(), ParseOutcome::Help(_)));

        app.set_help_flag("-h,--help,--info", "Help").unwrap();
        assert!(app.find_option("--info").is_some());

        app.set_version_flag("-V", "1.0").unwrap();
        assert!(app.set_version_flag("--usage", "2.0").is_err());
        assert_eq!(app.version_text(), "prog 1.0
");
        assert!(app.find_option("-V").is_some());
    }

    #[test]
    fn version_text_uses_name_and_version() {
        let mut app = App::new("prog");
        app.set_version_flag("-V,--version", "1.2.3").unwrap();
        assert_eq!(app.version_text(), "prog 1.2.3\n");
        assert!(app.version_flag.is_some());
    }
}
