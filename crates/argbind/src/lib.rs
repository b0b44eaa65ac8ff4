//! Declarative command-line option binding.
//!
//! An [`App`] owns options and nested subcommands. [`App::run`] matches a
//! token list against them, storing raw strings per option; typed values are
//! produced on demand through [`Bindable`]. Validators and help text read
//! their sources at use time, so a [`Shared`] container mutated between runs
//! is seen by the next check and the next [`App::help`].
//!
//! ```
//! use argbind::{App, IsMember, ParseOutcome};
//!
//! let mut app = App::new("greet");
//! let name = app.add_option("-n,--name", &"world".to_string(), "Who to greet", true)?.handle();
//! let lang = app
//!     .add_option_of::<String>("--lang", "Language")?
//!     .check(IsMember::new(["en", "fr"]))
//!     .handle();
//!
//! assert_eq!(app.run(["--lang", "fr"])?, ParseOutcome::Parsed);
//! assert_eq!(app.get(&name)?, "world");
//! assert_eq!(app.get(&lang)?, "fr");
//! assert!(app.help().contains("--lang TEXT:{en,fr}"));
//! # Ok::<(), argbind::ArgError>(())
//! ```

pub mod app;
pub mod convert;
pub mod error;
mod help;
mod matcher;
pub mod option;
mod schema;
pub mod validator;

pub use app::{App, ParseOutcome};
pub use convert::{Bindable, ConversionFailure, Scalar};
pub use error::{ArgError, Result};
pub use option::{Arity, MultiOptionPolicy, Opt, OptionHandle, OptionId, OptionMut, OptionNames};
pub use validator::{IsMember, MemberMap, MemberSet, Shared, Transformer, Validator, shared};
