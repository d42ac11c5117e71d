//! The evaluator behind the `xs` binary
//!
//! A deliberately small command language: `$name` expands to a variable's
//! words, `name = words` assigns, `fn name words` defines a function whose
//! body runs with its arguments in `$*`, a handful of builtins, and anything
//! else is looked up on `$path` and run as a child process.

use crate::vars::Vars;
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;
use xs_input::{Evaluator, Input, Namespace, RunFlags, Signal, Tree, Value, true_value};

fn false_value() -> Value {
    vec!["1".to_string()]
}

pub struct Shell {
    vars: Vars,
    out: Box<dyn Write>,
}

impl Shell {
    pub fn new(vars: Vars) -> Self {
        Shell {
            vars,
            out: Box::new(io::stdout()),
        }
    }

    /// Send builtin output somewhere other than stdout
    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    fn expand(&self, words: &[String]) -> Vec<String> {
        let mut expanded = Vec::with_capacity(words.len());
        for word in words {
            match word.strip_prefix('$') {
                Some(name) if !name.is_empty() => {
                    expanded.extend(self.vars.get(name).unwrap_or_default());
                }
                _ => expanded.push(word.clone()),
            }
        }
        expanded
    }

    fn run_command(&mut self, words: &[String], input: &mut Input) -> Result<Value, Signal> {
        if words.is_empty() {
            return Ok(true_value());
        }
        // Assignment and definition see their words unexpanded on the left.
        if words.len() >= 2 && words[1] == "=" {
            let value = self.expand(&words[2..]);
            self.vars.set(&words[0], value);
            return Ok(true_value());
        }
        if words[0] == "fn" {
            let Some(name) = words.get(1) else {
                return Err(Signal::error("fn", "usage: fn name [body]"));
            };
            self.vars.define_function(name, words[2..].to_vec());
            return Ok(true_value());
        }

        let words = self.expand(words);
        let Some((name, args)) = words.split_first() else {
            return Ok(true_value());
        };

        if let Some(body) = self.vars.function(name) {
            return self.call_function(name, &body, args, input);
        }

        match name.as_str() {
            "echo" => {
                writeln!(self.out, "{}", args.join(" "))?;
                self.out.flush()?;
                Ok(true_value())
            }
            "true" => Ok(true_value()),
            "false" => Ok(false_value()),
            "exit" => {
                let status = match args.first() {
                    Some(n) => n
                        .parse()
                        .map_err(|_| Signal::error("exit", format!("bad status: {}", n)))?,
                    None => 0,
                };
                Err(Signal::Exit(status))
            }
            "cd" => self.change_directory(args),
            "." => self.source_file(args, input),
            "history" => {
                input.set_history_path(args.first().map(PathBuf::from));
                Ok(true_value())
            }
            _ => self.run_external(name, args),
        }
    }

    fn call_function(
        &mut self,
        name: &str,
        body: &[String],
        args: &[String],
        input: &mut Input,
    ) -> Result<Value, Signal> {
        let saved = self.vars.get("*");
        self.vars.set("*", args.to_vec());
        let text = Tree::Command(body.to_vec()).to_string();
        let result = input.run_from_string(&text, Some(name), RunFlags::empty(), self);
        self.vars.set("*", saved.unwrap_or_default());
        result
    }

    fn change_directory(&mut self, args: &[String]) -> Result<Value, Signal> {
        let dir = match args.first() {
            Some(dir) => PathBuf::from(dir),
            None => self
                .vars
                .get("home")
                .and_then(|h| h.into_iter().next())
                .map(PathBuf::from)
                .or_else(home::home_dir)
                .ok_or_else(|| Signal::error("cd", "no home directory"))?,
        };
        std::env::set_current_dir(&dir)
            .map_err(|e| Signal::error("cd", format!("{}: {}", dir.display(), e)))?;
        Ok(true_value())
    }

    fn source_file(&mut self, args: &[String], input: &mut Input) -> Result<Value, Signal> {
        let Some(path) = args.first() else {
            return Err(Signal::error(".", "usage: . file"));
        };
        let file = File::open(path).map_err(|e| Signal::error(".", format!("{}: {}", path, e)))?;
        debug!(path = %path, "sourcing file");
        input.run_from_descriptor(
            OwnedFd::from(file),
            Some(path.as_str()),
            RunFlags::empty(),
            self,
        )
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.contains('/') {
            return Some(PathBuf::from(name));
        }
        self.vars
            .search_path()
            .into_iter()
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }

    fn run_external(&mut self, name: &str, args: &[String]) -> Result<Value, Signal> {
        let Some(program) = self.resolve(name) else {
            return Err(Signal::error(name, format!("{}: command not found", name)));
        };
        self.out.flush()?;
        let status = Command::new(&program)
            .args(args)
            .status()
            .map_err(|e| Signal::error(name, format!("{}: {}", program.display(), e)))?;
        debug!(program = %program.display(), ?status, "child exited");
        Ok(match status.code() {
            Some(code) => vec![code.to_string()],
            None => vec!["signaled".to_string()],
        })
    }
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

impl Evaluator for Shell {
    fn eval(&mut self, tree: &Tree, input: &mut Input) -> Result<Value, Signal> {
        match tree {
            Tree::Empty => Ok(true_value()),
            Tree::Command(words) => self.run_command(words, input),
            Tree::Sequence(trees) => {
                let mut result = true_value();
                for tree in trees {
                    result = self.eval(tree, input)?;
                }
                Ok(result)
            }
        }
    }
}
