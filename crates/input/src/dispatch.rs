//! Evaluation dispatch and the command loops
//!
//! A run picks one of four evaluation modes from its flags (print or not,
//! evaluate or not), optionally wrapped so that a false result ends the
//! run. The command loop then parses and dispatches until end of input.

use crate::config::RunFlags;
use crate::error::Signal;
use crate::grammar::Tree;
use crate::input::{Input, Parsed};
use tracing::debug;

/// Result of evaluating a command: a list of words
pub type Value = Vec<String>;

/// The canonical true result
pub fn true_value() -> Value {
    vec!["0".to_string()]
}

/// A value is true when it is empty or every element is `""` or `"0"`.
pub fn is_true(value: &[String]) -> bool {
    value.iter().all(|w| w.is_empty() || w == "0")
}

/// Process exit status for a value: 0 when true, the number when the value
/// is a single small integer, 1 otherwise.
pub fn exit_status(value: &[String]) -> i32 {
    if is_true(value) {
        return 0;
    }
    match value {
        [single] => single
            .parse::<i32>()
            .ok()
            .filter(|n| (0..=255).contains(n))
            .unwrap_or(1),
        _ => 1,
    }
}

/// The tree evaluator the loops hand parsed commands to
pub trait Evaluator {
    fn eval(&mut self, tree: &Tree, input: &mut Input) -> Result<Value, Signal>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    Eval,
    PrintEval,
    NoEval,
    PrintNoEval,
}

impl EvalMode {
    fn prints(self) -> bool {
        matches!(self, EvalMode::PrintEval | EvalMode::PrintNoEval)
    }

    fn evaluates(self) -> bool {
        matches!(self, EvalMode::Eval | EvalMode::PrintEval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub mode: EvalMode,
    pub exit_on_false: bool,
}

impl Dispatch {
    pub fn from_flags(flags: RunFlags) -> Self {
        let print = flags.contains(RunFlags::PRINT_COMMANDS);
        let noexec = flags.contains(RunFlags::NO_EXEC);
        let mode = match (print, noexec) {
            (false, false) => EvalMode::Eval,
            (true, false) => EvalMode::PrintEval,
            (false, true) => EvalMode::NoEval,
            (true, true) => EvalMode::PrintNoEval,
        };
        Dispatch {
            mode,
            exit_on_false: flags.contains(RunFlags::EXIT_ON_FALSE),
        }
    }

    /// Run one tree under this dispatch
    pub fn apply(
        &self,
        tree: &Tree,
        input: &mut Input,
        evaluator: &mut dyn Evaluator,
    ) -> Result<Value, Signal> {
        if self.mode.prints() {
            input.diagnostics_mut().line(&tree.to_string());
        }
        let value = if self.mode.evaluates() {
            evaluator.eval(tree, input)?
        } else {
            true_value()
        };
        if self.exit_on_false && !is_true(&value) {
            let status = exit_status(&value);
            debug!(status, "false result under exit-on-false");
            return Err(Signal::Exit(status));
        }
        Ok(value)
    }
}

/// Parse and dispatch until end of input, returning the last result.
///
/// In interactive mode errors are reported and the loop carries on;
/// an interrupt abandons the command being read. Otherwise every signal
/// propagates to the caller.
pub fn command_loop(
    input: &mut Input,
    evaluator: &mut dyn Evaluator,
    dispatch: Dispatch,
    interactive: bool,
) -> Result<Value, Signal> {
    let mut result = true_value();
    loop {
        let outcome = match input.parse(None, None) {
            Ok(Parsed::EndOfInput) => return Ok(result),
            Ok(Parsed::Tree(tree)) if tree.is_empty() => continue,
            Ok(Parsed::Tree(tree)) => dispatch.apply(&tree, input, evaluator),
            Err(signal) => Err(signal),
        };
        match outcome {
            Ok(value) => result = value,
            Err(signal) if interactive => recover(input, signal)?,
            Err(signal) => return Err(signal),
        }
    }
}

fn recover(input: &mut Input, signal: Signal) -> Result<(), Signal> {
    if !signal.is_recoverable() {
        return Err(signal);
    }
    input.reset_parser();
    if signal == Signal::Interrupt {
        debug!("command abandoned after interrupt");
        input.discard_pending();
        input.diagnostics_mut().line("");
    } else {
        input.diagnostics_mut().line(&signal.to_string());
    }
    Ok(())
}
