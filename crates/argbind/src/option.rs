//! Option definitions and their raw-result storage.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::convert::{self, Bindable};
use crate::error::{ArgError, Result};
use crate::validator::Validator;

static NEXT_OPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a registered option, unique across every app in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionId(u64);

impl OptionId {
    fn next() -> Self {
        Self(NEXT_OPTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Typed reference to an option, returned at registration.
pub struct OptionHandle<T> {
    id: OptionId,
    _target: PhantomData<fn() -> T>,
}

impl<T> OptionHandle<T> {
    pub(crate) fn new(id: OptionId) -> Self {
        Self {
            id,
            _target: PhantomData,
        }
    }

    pub fn id(&self) -> OptionId {
        self.id
    }
}

impl<T> Clone for OptionHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OptionHandle<T> {}

impl<T> fmt::Debug for OptionHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OptionHandle").field(&self.id).finish()
    }
}

/// What to do when a single-valued option is given more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiOptionPolicy {
    /// Fail with [`ArgError::ArgumentMismatch`].
    #[default]
    Throw,
    TakeLast,
    TakeFirst,
}

/// Values one invocation must/may absorb. `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub const FLAG: Arity = Arity {
        min: 0,
        max: Some(0),
    };
    pub const SINGLE: Arity = Arity {
        min: 1,
        max: Some(1),
    };
    pub const UNBOUNDED: Arity = Arity { min: 1, max: None };

    pub fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// `-1` for unbounded, otherwise the maximum.
    pub fn expected(&self) -> i32 {
        match self.max {
            None => -1,
            Some(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }

    pub fn allows_more(&self, have: usize) -> bool {
        self.max.is_none_or(|max| have < max)
    }
}

/// The names an option answers to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionNames {
    shorts: Vec<char>,
    longs: Vec<String>,
    positional: Option<String>,
    /// Names in declaration order with their dashes, for display.
    declared: Vec<String>,
}

impl OptionNames {
    /// Parse a comma separated list like `-s,--string` or `-i,i`.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut names = Self::default();
        for raw in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(long) = raw.strip_prefix("--") {
                if long.is_empty() || long.starts_with('-') || !valid_word(long) {
                    return Err(ArgError::configuration(format!(
                        "invalid long option name: {raw}"
                    )));
                }
                names.longs.push(long.to_string());
            } else if let Some(short) = raw.strip_prefix('-') {
                let mut chars = short.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if valid_short(c) => names.shorts.push(c),
                    _ => {
                        return Err(ArgError::configuration(format!(
                            "invalid short option name: {raw} (expected a dash and one character)"
                        )));
                    }
                }
            } else {
                if !valid_word(raw) {
                    return Err(ArgError::configuration(format!(
                        "invalid positional name: {raw}"
                    )));
                }
                if names.positional.is_some() {
                    return Err(ArgError::configuration(format!(
                        "more than one positional name in '{spec}'"
                    )));
                }
                names.positional = Some(raw.to_string());
            }
            names.declared.push(raw.to_string());
        }
        if names.declared.is_empty() {
            return Err(ArgError::configuration(
                "an option needs at least one name",
            ));
        }
        Ok(names)
    }

    pub fn shorts(&self) -> &[char] {
        &self.shorts
    }

    pub fn longs(&self) -> &[String] {
        &self.longs
    }

    pub fn positional(&self) -> Option<&str> {
        self.positional.as_deref()
    }

    pub fn has_flag_name(&self) -> bool {
        !self.shorts.is_empty() || !self.longs.is_empty()
    }

    pub fn matches_short(&self, c: char) -> bool {
        self.shorts.contains(&c)
    }

    /// `name` without the leading `--`.
    pub fn matches_long(&self, name: &str) -> bool {
        self.longs.iter().any(|l| l == name)
    }

    /// Match a name as written by a caller: `-s`, `--string` or `s`.
    pub fn matches(&self, name: &str) -> bool {
        if let Some(long) = name.strip_prefix("--") {
            self.matches_long(long)
        } else if let Some(short) = name.strip_prefix('-') {
            let mut chars = short.chars();
            matches!((chars.next(), chars.next()), (Some(c), None) if self.matches_short(c))
        } else {
            self.positional.as_deref() == Some(name)
        }
    }

    /// Every name in `--long`/`-s`/`pos` form.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(String::as_str)
    }

    /// Best name for messages: the first long, then short, then positional.
    pub fn display_name(&self) -> String {
        if let Some(long) = self.longs.first() {
            format!("--{long}")
        } else if let Some(short) = self.shorts.first() {
            format!("-{short}")
        } else {
            self.positional.clone().unwrap_or_default()
        }
    }

    /// Flag names joined for help, e.g. `-q,--quick`.
    pub fn flag_list(&self) -> String {
        self.declared
            .iter()
            .filter(|n| n.starts_with('-'))
            .cloned()
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn valid_short(c: char) -> bool {
    !c.is_whitespace() && !c.is_ascii_digit() && !matches!(c, '-' | '=' | ',')
}

fn valid_word(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c == '=' || c == ',')
}

/// A registered option: names, arity, validators, default and the raw values of the last run.
#[derive(Debug, Clone)]
pub struct Opt {
    id: OptionId,
    names: OptionNames,
    description: String,
    type_name: String,
    arity: Arity,
    flag: bool,
    vector: bool,
    delimiter: Option<char>,
    default: Option<Vec<String>>,
    show_default: bool,
    validators: Vec<Validator>,
    required: bool,
    envname: Option<String>,
    needs: Vec<String>,
    excludes: Vec<String>,
    hidden: bool,
    policy: MultiOptionPolicy,
    results: Vec<String>,
    invocations: usize,
}

impl Opt {
    pub(crate) fn new<T: Bindable>(names: OptionNames, description: &str) -> Self {
        Self {
            id: OptionId::next(),
            names,
            description: description.to_string(),
            type_name: T::type_name().to_string(),
            arity: if T::is_vector() {
                Arity::UNBOUNDED
            } else {
                Arity::SINGLE
            },
            flag: false,
            vector: T::is_vector(),
            delimiter: None,
            default: None,
            show_default: false,
            validators: Vec::new(),
            required: false,
            envname: None,
            needs: Vec::new(),
            excludes: Vec::new(),
            hidden: false,
            policy: MultiOptionPolicy::default(),
            results: Vec::new(),
            invocations: 0,
        }
    }

    pub(crate) fn new_flag(names: OptionNames, description: &str) -> Result<Self> {
        if names.positional().is_some() {
            return Err(ArgError::configuration(format!(
                "flag {} cannot have a positional name",
                names.display_name()
            )));
        }
        let mut opt = Self::new::<bool>(names, description);
        opt.flag = true;
        opt.arity = Arity::FLAG;
        opt.type_name = String::new();
        opt.default = Some(vec!["false".to_string()]);
        Ok(opt)
    }

    pub fn id(&self) -> OptionId {
        self.id
    }

    pub fn names(&self) -> &OptionNames {
        &self.names
    }

    pub fn display_name(&self) -> String {
        self.names.display_name()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// `-1` for unbounded vectors, `0` for flags, otherwise the maximum count per invocation.
    pub fn get_expected(&self) -> i32 {
        self.arity.expected()
    }

    pub fn is_flag(&self) -> bool {
        self.flag
    }

    pub fn is_vector(&self) -> bool {
        self.vector
    }

    pub fn is_positional(&self) -> bool {
        self.names.positional().is_some()
    }

    pub fn delimiter(&self) -> Option<char> {
        self.delimiter
    }

    pub fn default_values(&self) -> Option<&[String]> {
        self.default.as_deref()
    }

    /// A default the caller supplied, as opposed to the implicit `false` of a flag.
    pub fn has_default(&self) -> bool {
        self.default.is_some() && !self.flag
    }

    /// Default as help renders it, if it is shown at all.
    pub fn default_display(&self) -> Option<String> {
        if !self.show_default {
            return None;
        }
        self.default
            .as_deref()
            .map(|d| convert::render_default(d, self.vector))
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn envname(&self) -> Option<&str> {
        self.envname.as_deref()
    }

    pub fn needs(&self) -> &[String] {
        &self.needs
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn policy(&self) -> MultiOptionPolicy {
        self.policy
    }

    /// Number of raw values stored by the last run.
    pub fn count(&self) -> usize {
        self.results.len()
    }

    /// Invocations of the last run that consumed at least one value.
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    pub fn raw_results(&self) -> &[String] {
        &self.results
    }

    /// Convert the stored values, falling back to the default when nothing was given.
    pub fn results<T: Bindable>(&self) -> Result<T> {
        let raw: &[String] = if self.results.is_empty() {
            match self.default.as_deref() {
                Some(default) => default,
                None => {
                    return Err(ArgError::Conversion {
                        option: self.display_name(),
                        value: None,
                        reason: "no value given and no default".to_string(),
                    });
                }
            }
        } else {
            &self.results
        };
        T::from_results(raw).map_err(|failure| ArgError::Conversion {
            option: self.display_name(),
            value: failure.value,
            reason: failure.reason,
        })
    }

    pub(crate) fn clear(&mut self) {
        self.results.clear();
        self.invocations = 0;
    }

    /// Split a token on the delimiter, trimming pieces and dropping trailing empties.
    pub(crate) fn split(&self, token: &str) -> Vec<String> {
        let Some(delim) = self.delimiter else {
            return vec![token.to_string()];
        };
        let mut parts: Vec<String> = token
            .split(delim)
            .map(|p| p.trim().to_string())
            .collect();
        while parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
        parts
    }

    /// Positional slot still open for another value.
    pub(crate) fn wants_positional(&self) -> bool {
        self.is_positional() && self.arity.allows_more(self.results.len())
    }

    fn validate(&self, value: String) -> Result<String> {
        self.validators
            .iter()
            .try_fold(value, |current, validator| {
                validator
                    .validate(&current)
                    .map_err(|reason| ArgError::Validation {
                        option: self.display_name(),
                        value: current.clone(),
                        reason,
                    })
            })
    }

    fn push_validated(&mut self, values: Vec<String>) -> Result<()> {
        for value in values {
            let value = self.validate(value)?;
            self.results.push(value);
        }
        Ok(())
    }

    /// Record one `--name`/`-n` invocation of a value-taking option.
    pub(crate) fn record_invocation(&mut self, values: Vec<String>) -> Result<()> {
        let got = values.len();
        if got < self.arity.min || self.arity.max.is_some_and(|max| got > max) {
            return Err(ArgError::mismatch(
                self.display_name(),
                self.arity_message(got),
            ));
        }
        if !self.vector && !self.results.is_empty() {
            match self.policy {
                MultiOptionPolicy::Throw => {
                    return Err(ArgError::mismatch(
                        self.display_name(),
                        "single-valued option given more than once",
                    ));
                }
                MultiOptionPolicy::TakeLast => self.results.clear(),
                MultiOptionPolicy::TakeFirst => {
                    self.invocations += 1;
                    return Ok(());
                }
            }
        }
        self.push_validated(values)?;
        self.invocations += 1;
        Ok(())
    }

    /// Record a zero-arity flag, optionally with an explicit `--flag=value`.
    pub(crate) fn record_flag(&mut self, inline: Option<&str>) -> Result<()> {
        let value = inline.unwrap_or("true").to_string();
        self.push_validated(vec![value])?;
        self.invocations += 1;
        Ok(())
    }

    /// Absorb values from one bare token into a positional slot.
    pub(crate) fn record_positional(&mut self, values: Vec<String>) -> Result<()> {
        let total = self.results.len() + values.len();
        if self.arity.max.is_some_and(|max| total > max) {
            return Err(ArgError::mismatch(
                self.display_name(),
                self.arity_message(total),
            ));
        }
        let was_empty = self.results.is_empty();
        self.push_validated(values)?;
        if was_empty && !self.results.is_empty() {
            self.invocations += 1;
        }
        Ok(())
    }

    /// Values taken from the environment when the command line gave none.
    pub(crate) fn record_env(&mut self, values: Vec<String>) -> Result<()> {
        if self.flag {
            let value = values.into_iter().last().unwrap_or_else(|| "true".to_string());
            return self.push_validated(vec![value]);
        }
        let got = values.len();
        if got < self.arity.min || self.arity.max.is_some_and(|max| got > max) {
            return Err(ArgError::mismatch(
                self.display_name(),
                format!("environment {}", self.arity_message(got)),
            ));
        }
        self.push_validated(values)
    }

    /// A positional that stopped between values, e.g. 1 of an expected 2.
    pub(crate) fn partially_filled(&self) -> bool {
        let n = self.results.len();
        n > 0 && n < self.arity.min
    }

    pub(crate) fn arity_message(&self, got: usize) -> String {
        match self.arity.max {
            Some(max) if max == self.arity.min => {
                format!("expected {max} value(s), got {got}")
            }
            Some(max) => format!(
                "expected between {} and {max} values, got {got}",
                self.arity.min
            ),
            None => format!("expected at least {} value(s), got {got}", self.arity.min),
        }
    }
}

/// Mutable access to an option, typed by its bound target.
///
/// Returned by [`App::add_option`](crate::App::add_option) and friends so
/// configuration reads as a chain:
///
/// ```
/// # use argbind::App;
/// let mut app = App::new("prog");
/// let vals: Vec<i32> = Vec::new();
/// let idx = app
///     .add_option("--idx", &vals, "indices", false)?
///     .delimiter(',')?
///     .handle();
/// app.run(["--idx", "1,2,3"])?;
/// assert_eq!(app.get(&idx)?, vec![1, 2, 3]);
/// # Ok::<(), argbind::ArgError>(())
/// ```
pub struct OptionMut<'a, T> {
    opt: &'a mut Opt,
    _target: PhantomData<fn() -> T>,
}

impl<'a, T> OptionMut<'a, T> {
    pub(crate) fn new(opt: &'a mut Opt) -> Self {
        Self {
            opt,
            _target: PhantomData,
        }
    }

    pub fn handle(&self) -> OptionHandle<T> {
        OptionHandle::new(self.opt.id)
    }

    pub fn get(&self) -> &Opt {
        self.opt
    }

    /// Values per invocation: exactly `n`, or `-1` for unbounded. Only vectors accept values other than 1.
    pub fn expected(self, n: i32) -> Result<Self> {
        let arity = match n {
            -1 => Arity::UNBOUNDED,
            n if n >= 1 => Arity::exactly(n as usize),
            _ => {
                return Err(ArgError::configuration(format!(
                    "invalid expected count {n} for {}",
                    self.opt.display_name()
                )));
            }
        };
        self.set_arity(arity)
    }

    /// Between `min` and `max` values per invocation (vectors only).
    pub fn expected_range(self, min: usize, max: usize) -> Result<Self> {
        if min == 0 || min > max {
            return Err(ArgError::configuration(format!(
                "invalid expected range {min}..={max} for {}",
                self.opt.display_name()
            )));
        }
        self.set_arity(Arity {
            min,
            max: Some(max),
        })
    }

    fn set_arity(self, arity: Arity) -> Result<Self> {
        if self.opt.flag {
            return Err(ArgError::configuration(format!(
                "flag {} takes no values",
                self.opt.display_name()
            )));
        }
        if !self.opt.vector && arity != Arity::SINGLE {
            return Err(ArgError::configuration(format!(
                "{} binds a single value; only vectors can change arity",
                self.opt.display_name()
            )));
        }
        self.opt.arity = arity;
        Ok(self)
    }

    pub fn delimiter(self, ch: char) -> Result<Self> {
        if self.opt.flag {
            return Err(ArgError::configuration(format!(
                "flag {} takes no values to split",
                self.opt.display_name()
            )));
        }
        if ch.is_whitespace() || ch == '-' {
            return Err(ArgError::configuration(format!(
                "invalid delimiter {ch:?} for {}",
                self.opt.display_name()
            )));
        }
        self.opt.delimiter = Some(ch);
        Ok(self)
    }

    pub fn check(self, validator: impl Into<Validator>) -> Self {
        self.opt.validators.push(validator.into());
        self
    }

    pub fn required(self) -> Self {
        self.opt.required = true;
        self
    }

    pub fn envname(self, name: impl Into<String>) -> Self {
        self.opt.envname = Some(name.into());
        self
    }

    /// This option is only valid together with `name`.
    pub fn needs(self, name: impl Into<String>) -> Self {
        self.opt.needs.push(name.into());
        self
    }

    /// This option may not be combined with `name`.
    pub fn excludes(self, name: impl Into<String>) -> Self {
        self.opt.excludes.push(name.into());
        self
    }

    pub fn hidden(self) -> Self {
        self.opt.hidden = true;
        self
    }

    pub fn description(self, text: impl Into<String>) -> Self {
        self.opt.description = text.into();
        self
    }

    /// Override the type descriptor shown in help.
    pub fn type_name(self, name: impl Into<String>) -> Self {
        self.opt.type_name = name.into();
        self
    }

    pub fn multi_option_policy(self, policy: MultiOptionPolicy) -> Self {
        self.opt.policy = policy;
        self
    }

    /// Replace the default with an explicit raw string and show it in help.
    pub fn default_str(self, value: impl Into<String>) -> Self {
        self.opt.default = Some(vec![value.into()]);
        self.opt.show_default = true;
        self
    }

    /// Replace the default with several raw values (vector options).
    pub fn default_strs<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.opt.default = Some(values.into_iter().map(Into::into).collect());
        self.opt.show_default = true;
        self
    }

    pub fn default_val(self, value: &T) -> Self
    where
        T: Bindable,
    {
        self.opt.default = Some(value.default_values());
        self.opt.show_default = true;
        self
    }

    /// Keep the default for `results()` but leave it out of help.
    pub fn hide_default(self) -> Self {
        self.opt.show_default = false;
        self
    }
}

impl<T> From<OptionMut<'_, T>> for OptionHandle<T> {
    fn from(opt: OptionMut<'_, T>) -> Self {
        opt.handle()
    }
}
