//! Typed conversion of raw option results.
//!
//! Matching only ever stores strings. Conversion happens when a caller asks
//! for a value, through [`Bindable`]: scalars implement [`Scalar`], and
//! `Vec<T>` of any scalar binds to every raw value.

use std::path::PathBuf;

/// Why a raw string could not be turned into the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    pub value: Option<String>,
    pub reason: String,
}

impl ConversionFailure {
    fn new(value: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            value: value.map(|v| v.to_string()),
            reason: reason.into(),
        }
    }
}

/// A single command-line value.
pub trait Scalar: Sized {
    /// Type descriptor rendered in help (`INT`, `TEXT`, ...).
    fn type_name() -> &'static str;
    fn parse_scalar(raw: &str) -> Result<Self, String>;
    fn render(&self) -> String;
}

/// A target an option can bind to.
pub trait Bindable: Sized {
    fn type_name() -> &'static str;

    /// Vectors accept any number of invocations and default to unbounded arity.
    fn is_vector() -> bool {
        false
    }

    /// Raw strings that reproduce `self` when fed back through [`Bindable::from_results`].
    fn default_values(&self) -> Vec<String>;

    fn from_results(raw: &[String]) -> Result<Self, ConversionFailure>;
}

macro_rules! impl_scalar_from_str {
    ($name:literal => $($t:ty),+ $(,)?) => {
        $(
            impl Scalar for $t {
                fn type_name() -> &'static str {
                    $name
                }

                fn parse_scalar(raw: &str) -> Result<Self, String> {
                    raw.parse::<$t>().map_err(|e| e.to_string())
                }

                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )+
    };
}

impl_scalar_from_str!("INT" => i8, i16, i32, i64, i128, isize);
impl_scalar_from_str!("UINT" => u8, u16, u32, u64, u128, usize);
impl_scalar_from_str!("FLOAT" => f32, f64);
impl_scalar_from_str!("CHAR" => char);
impl_scalar_from_str!("TEXT" => String);

impl Scalar for bool {
    fn type_name() -> &'static str {
        "BOOLEAN"
    }

    fn parse_scalar(raw: &str) -> Result<Self, String> {
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(format!("'{raw}' is not a boolean")),
        }
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl Scalar for PathBuf {
    fn type_name() -> &'static str {
        "PATH"
    }

    fn parse_scalar(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("empty path".to_string());
        }
        Ok(PathBuf::from(raw))
    }

    fn render(&self) -> String {
        self.display().to_string()
    }
}

macro_rules! impl_bindable_scalar {
    ($($t:ty),+ $(,)?) => {
        $(
            impl Bindable for $t {
                fn type_name() -> &'static str {
                    <$t as Scalar>::type_name()
                }

                fn default_values(&self) -> Vec<String> {
                    vec![self.render()]
                }

                fn from_results(raw: &[String]) -> Result<Self, ConversionFailure> {
                    scalar_from_results(raw)
                }
            }
        )+
    };
}

impl_bindable_scalar!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char, String,
    bool, PathBuf,
);

/// Scalars take the last value, so a repeated flag or a `TakeLast` policy reads naturally.
fn scalar_from_results<T: Scalar>(raw: &[String]) -> Result<T, ConversionFailure> {
    let Some(last) = raw.last() else {
        return Err(ConversionFailure::new(None, "no value to convert"));
    };
    T::parse_scalar(last).map_err(|reason| ConversionFailure::new(Some(last), reason))
}

impl<T: Scalar> Bindable for Vec<T> {
    fn type_name() -> &'static str {
        T::type_name()
    }

    fn is_vector() -> bool {
        true
    }

    fn default_values(&self) -> Vec<String> {
        self.iter().map(Scalar::render).collect()
    }

    fn from_results(raw: &[String]) -> Result<Self, ConversionFailure> {
        raw.iter()
            .map(|v| T::parse_scalar(v).map_err(|reason| ConversionFailure::new(Some(v), reason)))
            .collect()
    }
}

/// Render default values the way help shows them: `x` for scalars, `[a,b]` for vectors.
pub(crate) fn render_default(values: &[String], vector: bool) -> String {
    if vector {
        format!("[{}]", values.join(","))
    } else {
        values.last().cloned().unwrap_or_default()
    }
}
