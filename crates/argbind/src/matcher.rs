//! Token matching: assigns each token to an option, a subcommand or the extras.
//!
//! One pass per app, left to right. `--` switches to positional-only mode,
//! `--name[=value]` and `-abc` clusters resolve against this app's options,
//! bare tokens fill positionals, then dispatch to a subcommand, then land in
//! the extras. After the pass the environment, required, needs/excludes and
//! extras rules are checked in that order.

use tracing::{debug, trace};

use crate::app::{App, ParseOutcome};
use crate::error::{ArgError, Result};
use crate::option::{Opt, OptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'t> {
    /// `--` on its own.
    Separator,
    /// `--name` or `--name=value`.
    Long { name: &'t str, inline: Option<&'t str> },
    /// `-abc` without the dash.
    Short(&'t str),
    Bare,
}

fn classify(token: &str) -> Token<'_> {
    if token == "--" {
        return Token::Separator;
    }
    if let Some(body) = token.strip_prefix("--") {
        return match body.split_once('=') {
            Some((name, value)) => Token::Long {
                name,
                inline: Some(value),
            },
            None => Token::Long {
                name: body,
                inline: None,
            },
        };
    }
    if let Some(body) = token.strip_prefix('-') {
        // `-` alone and negative numbers are values.
        match body.chars().next() {
            Some(c) if !c.is_ascii_digit() && c != '.' => return Token::Short(body),
            _ => {}
        }
    }
    Token::Bare
}

fn env_lookup<'e>(env: &'e [(String, String)], key: &str) -> Option<&'e str> {
    env.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

impl App {
    pub(crate) fn parse_tokens(
        &mut self,
        tokens: &[String],
        env: &[(String, String)],
    ) -> Result<ParseOutcome> {
        let mut pos = 0usize;
        let mut positional_only = false;
        let mut child_outcome = None;

        while pos < tokens.len() {
            let token = tokens[pos].as_str();
            if positional_only {
                self.match_bare(token)?;
                pos += 1;
                continue;
            }
            match classify(token) {
                Token::Separator => {
                    trace!(app = %self.name, "positional-only from here");
                    positional_only = true;
                    pos += 1;
                }
                Token::Long { name, inline } => {
                    pos = self.match_long(token, name, inline, tokens, pos + 1)?;
                }
                Token::Short(cluster) => {
                    pos = self.match_short(cluster, tokens, pos + 1)?;
                }
                Token::Bare => {
                    if self.fill_positional(token)? {
                        pos += 1;
                        continue;
                    }
                    if let Some(index) = self.subcommand_index(token) {
                        if self.flag_given(self.help_flag) {
                            break;
                        }
                        debug!(app = %self.name, subcommand = %self.subcommands[index].name, "dispatch");
                        self.selected = Some(index);
                        let outcome = self.subcommands[index].parse_tokens(&tokens[pos + 1..], env)?;
                        child_outcome = Some(outcome);
                        break;
                    }
                    trace!(app = %self.name, token, "extra");
                    self.extras.push(token.to_string());
                    pos += 1;
                }
            }
        }

        if self.flag_given(self.help_flag) {
            return Ok(ParseOutcome::Help(self.help()));
        }
        if self.flag_given(self.version_flag) {
            return Ok(ParseOutcome::Version(self.version_text()));
        }
        if let Some(outcome @ (ParseOutcome::Help(_) | ParseOutcome::Version(_))) = child_outcome {
            return Ok(outcome);
        }

        self.finish(env)?;
        Ok(ParseOutcome::Parsed)
    }

    fn flag_given(&self, id: Option<OptionId>) -> bool {
        id.is_some_and(|id| self.options.iter().any(|o| o.id() == id && o.count() > 0))
    }

    fn match_long(
        &mut self,
        token: &str,
        name: &str,
        inline: Option<&str>,
        tokens: &[String],
        next: usize,
    ) -> Result<usize> {
        let Some(index) = self.options.iter().position(|o| o.names().matches_long(name)) else {
            trace!(app = %self.name, token, "unknown long option");
            self.extras.push(token.to_string());
            return Ok(next);
        };
        if self.options[index].is_flag() {
            trace!(app = %self.name, flag = name, "flag");
            self.options[index].record_flag(inline)?;
            return Ok(next);
        }
        self.consume_values(index, inline, tokens, next)
    }

    fn match_short(&mut self, cluster: &str, tokens: &[String], next: usize) -> Result<usize> {
        for (at, c) in cluster.char_indices() {
            let Some(index) = self.options.iter().position(|o| o.names().matches_short(c)) else {
                let rest = format!("-{}", &cluster[at..]);
                trace!(app = %self.name, token = %rest, "unknown short option");
                self.extras.push(rest);
                return Ok(next);
            };
            if self.options[index].is_flag() {
                trace!(app = %self.name, flag = %c, "flag");
                self.options[index].record_flag(None)?;
                continue;
            }
            let rest = &cluster[at + c.len_utf8()..];
            let inline = (!rest.is_empty()).then_some(rest);
            return self.consume_values(index, inline, tokens, next);
        }
        Ok(next)
    }

    /// Collect the values of one invocation and record them. Returns the next unread position.
    fn consume_values(
        &mut self,
        index: usize,
        inline: Option<&str>,
        tokens: &[String],
        mut next: usize,
    ) -> Result<usize> {
        let opt = &self.options[index];
        let arity = opt.arity();
        let mut values = inline.map(|v| opt.split(v)).unwrap_or_default();
        // An inline value only pulls further tokens while the minimum is unmet.
        let wants_more = |have: usize| match inline {
            Some(_) => have < arity.min,
            None => arity.allows_more(have),
        };
        while next < tokens.len() && wants_more(values.len()) && self.absorbable(&tokens[next]) {
            values.extend(opt.split(&tokens[next]));
            next += 1;
        }
        trace!(app = %self.name, option = %opt.display_name(), ?values, "absorbed");
        self.options[index].record_invocation(values)?;
        Ok(next)
    }

    fn absorbable(&self, token: &str) -> bool {
        classify(token) == Token::Bare && self.subcommand_index(token).is_none()
    }

    /// Offer a bare token to the first positional with room left.
    fn fill_positional(&mut self, token: &str) -> Result<bool> {
        let Some(index) = self.options.iter().position(|o| o.wants_positional()) else {
            return Ok(false);
        };
        let values = self.options[index].split(token);
        trace!(app = %self.name, option = %self.options[index].display_name(), token, "positional");
        self.options[index].record_positional(values)?;
        Ok(true)
    }

    /// After `--`: positionals, else extras.
    fn match_bare(&mut self, token: &str) -> Result<()> {
        if !self.fill_positional(token)? {
            self.extras.push(token.to_string());
        }
        Ok(())
    }

    fn finish(&mut self, env: &[(String, String)]) -> Result<()> {
        for opt in &mut self.options {
            if opt.count() > 0 {
                continue;
            }
            let Some(value) = opt.envname().and_then(|key| env_lookup(env, key)) else {
                continue;
            };
            trace!(app = %self.name, option = %opt.display_name(), "value from environment");
            let values = if opt.is_flag() {
                vec![value.to_string()]
            } else {
                opt.split(value)
            };
            opt.record_env(values)?;
        }

        if let Some(opt) = self.options.iter().find(|o| o.partially_filled()) {
            return Err(ArgError::mismatch(
                opt.display_name(),
                opt.arity_message(opt.count()),
            ));
        }

        if let Some(opt) = self
            .options
            .iter()
            .find(|o| o.is_required() && o.count() == 0 && !o.has_default())
        {
            return Err(ArgError::RequiredMissing {
                option: opt.display_name(),
            });
        }

        self.check_relations()?;

        if self.require_subcommand && self.selected.is_none() {
            return Err(ArgError::RequiredSubcommand {
                app: self.name.clone(),
            });
        }

        if !self.allow_extras && !self.extras.is_empty() {
            return Err(ArgError::Extras {
                tokens: self.extras.clone(),
            });
        }
        Ok(())
    }

    fn check_relations(&self) -> Result<()> {
        for opt in self.options.iter().filter(|o| o.count() > 0) {
            for name in opt.needs() {
                let other = self.related(opt.display_name(), name)?;
                if other.count() == 0 {
                    return Err(ArgError::Requires {
                        option: opt.display_name(),
                        other: other.display_name(),
                    });
                }
            }
            for name in opt.excludes() {
                let other = self.related(opt.display_name(), name)?;
                if other.count() > 0 {
                    return Err(ArgError::Excludes {
                        option: opt.display_name(),
                        other: other.display_name(),
                    });
                }
            }
        }
        Ok(())
    }

    fn related(&self, from: String, name: &str) -> Result<&Opt> {
        self.find_option(name).ok_or_else(|| {
            ArgError::configuration(format!("{from} refers to unknown option '{name}'"))
        })
    }
}
