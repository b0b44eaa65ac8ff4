//! Value validators.
//!
//! A [`Validator`] is a named `&str -> Result<String, String>` function. On
//! success it returns the (possibly canonicalised) value that gets stored;
//! on failure it returns a message. Validators built from a [`Shared`]
//! container never copy it: the container is read each time a value is
//! checked and each time help is rendered, so mutations made after the
//! option was registered are always visible. The container must stay alive
//! for as long as the option does, which holding the `Arc` guarantees.

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::{self, Display};
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;
use std::sync::Arc;

/// Externally owned container a validator may reference live.
pub type Shared<T> = Arc<RwLock<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

type CheckFn = dyn Fn(&str) -> Result<String, String> + Send + Sync;
type TextFn = dyn Fn() -> String + Send + Sync;
type ListFn = dyn Fn() -> Vec<String> + Send + Sync;
type FilterFn = dyn Fn(&str) -> String + Send + Sync;
type PairsFn = dyn Fn() -> Vec<(String, String)> + Send + Sync;

#[derive(Clone)]
pub struct Validator {
    name: String,
    check: Arc<CheckFn>,
    description: Option<Arc<TextFn>>,
    members: Option<Arc<ListFn>>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .field("description", &self.description())
            .finish()
    }
}

impl Validator {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
            description: None,
            members: None,
        }
    }

    /// Attach a description. The closure runs every time help is rendered.
    pub fn describe_with<F>(mut self, description: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.description = Some(Arc::new(description));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn validate(&self, value: &str) -> Result<String, String> {
        (self.check)(value)
    }

    pub fn description(&self) -> Option<String> {
        self.description.as_ref().map(|d| d())
    }

    /// Current allowed values, for validators that restrict to a set.
    pub fn members(&self) -> Option<Vec<String>> {
        self.members.as_ref().map(|m| m())
    }

    /// Both must pass; the output of `self` is fed to `other`.
    pub fn and(self, other: Validator) -> Validator {
        let name = format!("{} AND {}", self.name, other.name);
        let description = joined_description(&self, &other, " AND ");
        let (first, second) = (self.check, other.check);
        let mut out = Validator::new(name, move |value| second(first(value)?.as_str()));
        out.description = description;
        out.members = self.members.or(other.members);
        out
    }

    /// Either may pass; `self` is tried first.
    pub fn or(self, other: Validator) -> Validator {
        let name = format!("{} OR {}", self.name, other.name);
        let description = joined_description(&self, &other, " OR ");
        let (first, second) = (self.check, other.check);
        let mut out = Validator::new(name, move |value| match first(value) {
            Ok(v) => Ok(v),
            Err(a) => second(value).map_err(|b| format!("{a} OR {b}")),
        });
        out.description = description;
        // Only a set when both sides are.
        out.members = match (self.members, other.members) {
            (Some(a), Some(b)) => Some(Arc::new(move || {
                let mut all = a();
                for m in b() {
                    if !all.contains(&m) {
                        all.push(m);
                    }
                }
                all
            })),
            _ => None,
        };
        out
    }

    /// Inclusive numeric range.
    pub fn range<T>(min: T, max: T) -> Validator
    where
        T: PartialOrd + Display + FromStr + Send + Sync + 'static,
    {
        let text = format!("[{min} - {max}]");
        let reason = text.clone();
        Validator::new("RANGE", move |value| {
            let parsed = value
                .parse::<T>()
                .map_err(|_| format!("{value} is not a number"))?;
            if parsed < min || parsed > max {
                return Err(format!("value {value} not in range {reason}"));
            }
            Ok(value.to_string())
        })
        .describe_with(move || text.clone())
    }

    pub fn number() -> Validator {
        Validator::new("NUMBER", |value| {
            parse_number(value)?;
            Ok(value.to_string())
        })
        .describe_with(|| "NUMBER".to_string())
    }

    pub fn positive_number() -> Validator {
        Validator::new("POSITIVE", |value| {
            if parse_number(value)? <= 0.0 {
                return Err(format!("number less or equal to 0: ({value})"));
            }
            Ok(value.to_string())
        })
        .describe_with(|| "POSITIVE".to_string())
    }

    pub fn non_negative_number() -> Validator {
        Validator::new("NONNEGATIVE", |value| {
            if parse_number(value)? < 0.0 {
                return Err(format!("number less than 0: ({value})"));
            }
            Ok(value.to_string())
        })
        .describe_with(|| "NONNEGATIVE".to_string())
    }
}

fn parse_number(value: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("failed parsing number: ({value})"))
}

fn joined_description(a: &Validator, b: &Validator, sep: &'static str) -> Option<Arc<TextFn>> {
    match (a.description.clone(), b.description.clone()) {
        (Some(x), Some(y)) => Some(Arc::new(move || format!("{}{sep}{}", x(), y()))),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

impl BitAnd for Validator {
    type Output = Validator;

    fn bitand(self, rhs: Validator) -> Validator {
        self.and(rhs)
    }
}

impl BitOr for Validator {
    type Output = Validator;

    fn bitor(self, rhs: Validator) -> Validator {
        self.or(rhs)
    }
}

/// Containers whose elements can serve as an allowed-value set.
pub trait MemberSet {
    fn member_strings(&self) -> Vec<String>;
}

impl<T: Display> MemberSet for Vec<T> {
    fn member_strings(&self) -> Vec<String> {
        self.iter().map(|v| v.to_string()).collect()
    }
}

impl<T: Display> MemberSet for BTreeSet<T> {
    fn member_strings(&self) -> Vec<String> {
        self.iter().map(|v| v.to_string()).collect()
    }
}

impl<T: Display, S> MemberSet for HashSet<T, S> {
    fn member_strings(&self) -> Vec<String> {
        self.iter().map(|v| v.to_string()).collect()
    }
}

impl<T: Display, S> MemberSet for IndexSet<T, S> {
    fn member_strings(&self) -> Vec<String> {
        self.iter().map(|v| v.to_string()).collect()
    }
}

impl<K: Display, V> MemberSet for BTreeMap<K, V> {
    fn member_strings(&self) -> Vec<String> {
        self.keys().map(|k| k.to_string()).collect()
    }
}

impl<K: Display, V, S> MemberSet for HashMap<K, V, S> {
    fn member_strings(&self) -> Vec<String> {
        self.keys().map(|k| k.to_string()).collect()
    }
}

impl<K: Display, V, S> MemberSet for IndexMap<K, V, S> {
    fn member_strings(&self) -> Vec<String> {
        self.keys().map(|k| k.to_string()).collect()
    }
}

/// Key/value containers usable by [`Transformer`].
pub trait MemberMap {
    fn member_pairs(&self) -> Vec<(String, String)>;
}

impl<K: Display, V: Display> MemberMap for BTreeMap<K, V> {
    fn member_pairs(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }
}

impl<K: Display, V: Display, S> MemberMap for HashMap<K, V, S> {
    fn member_pairs(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }
}

impl<K: Display, V: Display, S> MemberMap for IndexMap<K, V, S> {
    fn member_pairs(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }
}

impl<K: Display, V: Display> MemberMap for Vec<(K, V)> {
    fn member_pairs(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }
}

#[derive(Clone, Default)]
struct Filters(Vec<Arc<FilterFn>>);

impl Filters {
    fn push<F>(&mut self, f: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.0.push(Arc::new(f));
    }

    fn apply(&self, value: &str) -> String {
        self.0
            .iter()
            .fold(value.to_string(), |acc, filter| filter(&acc))
    }
}

fn braces(items: &[String]) -> String {
    format!("{{{}}}", items.join(","))
}

pub(crate) const MEMBER_NAME: &str = "IsMember";
pub(crate) const CASELESS_MEMBER_NAME: &str = "IsMember(ignore_case)";

/// Restrict values to a set, returning the stored spelling on match.
#[derive(Clone)]
pub struct IsMember {
    source: Arc<ListFn>,
    filters: Filters,
    caseless: bool,
}

impl IsMember {
    /// Copy `items` into the validator.
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Display,
    {
        let items: Vec<String> = items.into_iter().map(|v| v.to_string()).collect();
        Self {
            source: Arc::new(move || items.clone()),
            filters: Filters::default(),
            caseless: false,
        }
    }

    /// Copy `items` and compare as `T`, so `02` matches a member `2`.
    pub fn typed<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: FromStr + Display + 'static,
    {
        Self::new(items).parse_as::<T>()
    }

    /// Reference `source` without copying; every check reads its current contents.
    pub fn live<S>(source: &Shared<S>) -> Self
    where
        S: MemberSet + Send + Sync + 'static,
    {
        let source = Arc::clone(source);
        Self {
            source: Arc::new(move || source.read().member_strings()),
            filters: Filters::default(),
            caseless: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.filters.push(|v| v.to_lowercase());
        self.caseless = true;
        self
    }

    pub fn ignore_underscore(mut self) -> Self {
        self.filters.push(|v| v.replace('_', ""));
        self
    }

    /// Compare values that parse as `T` by their canonical rendering. Others compare as given.
    pub fn parse_as<T>(mut self) -> Self
    where
        T: FromStr + Display + 'static,
    {
        self.filters
            .push(|v| v.parse::<T>().map_or_else(|_| v.to_string(), |t| t.to_string()));
        self
    }

    /// Custom normalisation applied to both the candidate and each member.
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.filters.push(f);
        self
    }
}

impl From<IsMember> for Validator {
    fn from(m: IsMember) -> Self {
        let IsMember {
            source,
            filters,
            caseless,
        } = m;
        let name = if caseless {
            CASELESS_MEMBER_NAME
        } else {
            MEMBER_NAME
        };
        let check_source = Arc::clone(&source);
        let desc_source = Arc::clone(&source);
        let mut v = Validator::new(name, move |value| {
            let members = check_source();
            let wanted = filters.apply(value);
            members
                .iter()
                .find(|m| filters.apply(m) == wanted)
                .cloned()
                .ok_or_else(|| format!("{value} not in {}", braces(&members)))
        })
        .describe_with(move || braces(&desc_source()));
        v.members = Some(source);
        v
    }
}

/// Map keys to values; the mapped value is what gets stored.
#[derive(Clone)]
pub struct Transformer {
    source: Arc<PairsFn>,
    filters: Filters,
    checked: bool,
}

impl Transformer {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Display,
        V: Display,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            source: Arc::new(move || pairs.clone()),
            filters: Filters::default(),
            checked: false,
        }
    }

    pub fn live<M>(source: &Shared<M>) -> Self
    where
        M: MemberMap + Send + Sync + 'static,
    {
        let source = Arc::clone(source);
        Self {
            source: Arc::new(move || source.read().member_pairs()),
            filters: Filters::default(),
            checked: false,
        }
    }

    /// Reject values that are neither a key nor an already mapped value.
    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.filters.push(|v| v.to_lowercase());
        self
    }

    pub fn ignore_underscore(mut self) -> Self {
        self.filters.push(|v| v.replace('_', ""));
        self
    }
}

fn render_pairs(pairs: &[(String, String)]) -> String {
    let items: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}->{v}")).collect();
    braces(&items)
}

impl From<Transformer> for Validator {
    fn from(t: Transformer) -> Self {
        let Transformer {
            source,
            filters,
            checked,
        } = t;
        let desc_source = Arc::clone(&source);
        let name = if checked { "CheckedTransformer" } else { "Transformer" };
        Validator::new(name, move |value| {
            let pairs = source();
            let wanted = filters.apply(value);
            if let Some((_, mapped)) = pairs.iter().find(|(k, _)| filters.apply(k) == wanted) {
                return Ok(mapped.clone());
            }
            if !checked || pairs.iter().any(|(_, v)| v == value) {
                return Ok(value.to_string());
            }
            Err(format!("{value} not in {}", render_pairs(&pairs)))
        })
        .describe_with(move || render_pairs(&desc_source()))
    }
}
